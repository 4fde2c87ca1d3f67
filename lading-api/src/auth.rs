//! Connection Authentication
//!
//! Validates the optional bearer credential presented at WebSocket
//! handshake time and derives a connection identity from it.
//!
//! The two failure-free paths are deliberately different:
//! - no credential at all ⇒ an anonymous guest identity (the portal allows
//!   observers without a session)
//! - a credential that fails verification ⇒ the connection is refused, not
//!   downgraded to guest

use crate::error::{ApiError, ApiResult};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// Ephemeral identifier minted per live connection at handshake.
pub type ConnectionId = Uuid;

// ============================================================================
// CLOCK ABSTRACTION (FOR DETERMINISTIC TESTS)
// ============================================================================

/// Clock abstraction for JWT time validation.
///
/// Owning time validation ourselves (instead of letting `jsonwebtoken` do
/// it) makes expiry tests fully deterministic.
pub trait JwtClock: Send + Sync {
    /// Get current time as Unix epoch seconds.
    fn now_epoch_secs(&self) -> i64;
}

/// Production clock using system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl JwtClock for SystemClock {
    fn now_epoch_secs(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Fixed clock for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl JwtClock for FixedClock {
    fn now_epoch_secs(&self) -> i64 {
        self.0
    }
}

// ============================================================================
// JWT SECRET (TYPE-SAFE)
// ============================================================================

const INSECURE_DEFAULT_SECRET: &str = "INSECURE_DEFAULT_SECRET_CHANGE_IN_PRODUCTION";

/// Type-safe JWT secret that prevents accidental logging.
#[derive(Clone)]
pub struct JwtSecret(SecretString);

impl JwtSecret {
    /// Create a new JWT secret; empty strings fall back to the insecure
    /// development default.
    pub fn new(secret: String) -> Self {
        let normalized = if secret.trim().is_empty() {
            INSECURE_DEFAULT_SECRET.to_string()
        } else {
            secret
        };
        Self(SecretString::new(normalized.into()))
    }

    /// Expose the secret value (only for cryptographic operations).
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Get the length of the secret without exposing it.
    pub fn len(&self) -> usize {
        self.0.expose_secret().len()
    }

    /// Check if the secret is empty without exposing it.
    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }

    /// Check if the secret is the insecure default.
    pub fn is_insecure_default(&self) -> bool {
        self.0.expose_secret() == INSECURE_DEFAULT_SECRET
    }
}

impl fmt::Debug for JwtSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JwtSecret([REDACTED, {} chars])", self.len())
    }
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Authentication configuration.
#[derive(Clone)]
pub struct AuthConfig {
    /// JWT secret key for signing and verification
    pub jwt_secret: JwtSecret,

    /// JWT algorithm (default: HS256)
    pub jwt_algorithm: Algorithm,

    /// JWT token expiration in seconds (default: 1 hour)
    pub jwt_expiration_secs: i64,

    /// JWT clock skew tolerance in seconds (default: 60)
    pub jwt_clock_skew_secs: i64,

    /// Clock for JWT time validation (injected for testing)
    pub clock: Arc<dyn JwtClock>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &self.jwt_secret)
            .field("jwt_algorithm", &self.jwt_algorithm)
            .field("jwt_expiration_secs", &self.jwt_expiration_secs)
            .field("jwt_clock_skew_secs", &self.jwt_clock_skew_secs)
            .field("clock", &"<JwtClock>")
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: JwtSecret::new(
                std::env::var("LADING_JWT_SECRET").unwrap_or_default(),
            ),
            jwt_algorithm: Algorithm::HS256,
            jwt_expiration_secs: 3600,
            jwt_clock_skew_secs: 60,
            clock: Arc::new(SystemClock),
        }
    }
}

impl AuthConfig {
    /// Create authentication configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `LADING_JWT_SECRET`: JWT signing secret
    /// - `LADING_JWT_EXPIRATION_SECS`: JWT token expiration (default: 3600)
    /// - `LADING_JWT_CLOCK_SKEW_SECS`: JWT clock skew tolerance (default: 60)
    pub fn from_env() -> Self {
        Self {
            jwt_secret: JwtSecret::new(
                std::env::var("LADING_JWT_SECRET").unwrap_or_default(),
            ),
            jwt_algorithm: Algorithm::HS256,
            jwt_expiration_secs: std::env::var("LADING_JWT_EXPIRATION_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3600),
            jwt_clock_skew_secs: std::env::var("LADING_JWT_CLOCK_SKEW_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
            clock: Arc::new(SystemClock),
        }
    }

    /// Validate the authentication configuration for production use.
    ///
    /// Called at server startup; refuses to start a production server on
    /// the insecure default secret, warns in development.
    pub fn validate_for_production(&self) -> ApiResult<()> {
        let environment = std::env::var("LADING_ENVIRONMENT")
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase();
        let is_production = environment == "production" || environment == "prod";

        if self.jwt_secret.is_insecure_default() {
            if is_production {
                return Err(ApiError::invalid_input(format!(
                    "Cannot start server in production with insecure JWT secret. \
                     Set LADING_JWT_SECRET to a secure value. LADING_ENVIRONMENT={}",
                    environment
                )));
            }
            tracing::warn!(
                "Using insecure default JWT secret; set LADING_JWT_SECRET before deploying"
            );
        } else if self.jwt_secret.len() < 32 {
            if is_production {
                return Err(ApiError::invalid_input(format!(
                    "JWT secret is too short for production use ({} chars); \
                     it must be at least 32 characters long",
                    self.jwt_secret.len()
                )));
            }
            tracing::warn!(
                secret_len = self.jwt_secret.len(),
                "JWT secret is short; use at least 32 characters for production"
            );
        }

        Ok(())
    }
}

// ============================================================================
// ROLES & CLAIMS
// ============================================================================

/// Role carried by a connection identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Anonymous observer, no credential presented
    Guest,
    User,
    Admin,
    Supplier,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Guest => "guest",
            Role::User => "user",
            Role::Admin => "admin",
            Role::Supplier => "supplier",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "guest" => Ok(Role::Guest),
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            "supplier" => Ok(Role::Supplier),
            other => Err(ApiError::invalid_token(format!("Unknown role: {}", other))),
        }
    }
}

/// JWT claims structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Role granted to the user
    pub role: Role,

    /// Display name shown to other watchers
    #[serde(default)]
    pub name: Option<String>,
}

impl Claims {
    /// Create new claims for a user using a clock.
    pub fn new(user_id: String, role: Role, expiration_secs: i64, clock: &dyn JwtClock) -> Self {
        let now = clock.now_epoch_secs();
        Self {
            sub: user_id,
            iat: now,
            exp: now + expiration_secs,
            role,
            name: None,
        }
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

// ============================================================================
// CONNECTION IDENTITY
// ============================================================================

/// The authenticated-or-guest principal behind one live connection.
///
/// Created at connection handshake, destroyed at disconnect, never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionIdentity {
    /// Generated per-connection identifier
    pub connection_id: ConnectionId,

    /// User ID from the credential; `None` for anonymous guests
    pub user_id: Option<String>,

    pub role: Role,

    /// Display name shown in watcher notices
    pub display_name: Option<String>,
}

impl ConnectionIdentity {
    /// Anonymous guest identity for credential-less connections.
    pub fn guest() -> Self {
        Self {
            connection_id: Uuid::now_v7(),
            user_id: None,
            role: Role::Guest,
            display_name: None,
        }
    }

    /// Identity derived from verified claims.
    pub fn from_claims(claims: &Claims) -> Self {
        Self {
            connection_id: Uuid::now_v7(),
            user_id: Some(claims.sub.clone()),
            role: claims.role,
            display_name: claims.name.clone(),
        }
    }

    pub fn is_guest(&self) -> bool {
        self.role == Role::Guest && self.user_id.is_none()
    }
}

// ============================================================================
// TOKEN VALIDATION
// ============================================================================

/// Validate a JWT and return its claims.
///
/// Signature verification is delegated to `jsonwebtoken`; expiry is
/// checked against the injected clock with skew tolerance.
pub fn validate_token(config: &AuthConfig, token: &str) -> ApiResult<Claims> {
    let decoding_key = DecodingKey::from_secret(config.jwt_secret.expose().as_bytes());

    // Decode with signature validation only; expiry is checked below with
    // our own clock.
    let mut validation = Validation::new(config.jwt_algorithm);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.required_spec_claims = std::collections::HashSet::from(["exp".to_string()]);

    let token_data =
        decode::<Claims>(token, &decoding_key, &validation).map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::InvalidToken => {
                ApiError::invalid_token("Token is invalid")
            }
            jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                ApiError::invalid_token("Token signature is invalid")
            }
            _ => ApiError::invalid_token(format!("Token validation failed: {}", e)),
        })?;

    let claims = token_data.claims;
    let now = config.clock.now_epoch_secs();
    if claims.exp + config.jwt_clock_skew_secs < now {
        return Err(ApiError::token_expired());
    }

    Ok(claims)
}

/// Generate a JWT token for a user. Used by tests and operator tooling.
pub fn generate_token(
    config: &AuthConfig,
    user_id: String,
    role: Role,
    name: Option<String>,
) -> ApiResult<String> {
    let mut claims = Claims::new(user_id, role, config.jwt_expiration_secs, &*config.clock);
    claims.name = name;

    let encoding_key = EncodingKey::from_secret(config.jwt_secret.expose().as_bytes());
    let header = Header::new(config.jwt_algorithm);

    encode(&header, &claims, &encoding_key)
        .map_err(|e| ApiError::internal_error(format!("Failed to generate token: {}", e)))
}

/// Authenticate an inbound connection's handshake credential.
///
/// - `None` ⇒ guest identity
/// - `Some(valid token)` ⇒ identity decoded from the claims
/// - `Some(invalid token)` ⇒ error; the connection attempt is refused
pub fn authenticate(config: &AuthConfig, credential: Option<&str>) -> ApiResult<ConnectionIdentity> {
    match credential {
        None => Ok(ConnectionIdentity::guest()),
        Some(token) => {
            let claims = validate_token(config, token)?;
            Ok(ConnectionIdentity::from_claims(&claims))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(clock: FixedClock) -> AuthConfig {
        AuthConfig {
            jwt_secret: JwtSecret::new("test-secret-0123456789-0123456789".to_string()),
            jwt_algorithm: Algorithm::HS256,
            jwt_expiration_secs: 3600,
            jwt_clock_skew_secs: 60,
            clock: Arc::new(clock),
        }
    }

    // 2024-01-01 00:00:00 UTC
    const T0: i64 = 1704067200;

    #[test]
    fn missing_credential_yields_guest() {
        let config = test_config(FixedClock(T0));
        let identity = authenticate(&config, None).unwrap();
        assert!(identity.is_guest());
        assert_eq!(identity.role, Role::Guest);
        assert_eq!(identity.user_id, None);
    }

    #[test]
    fn valid_token_yields_user_identity() {
        let config = test_config(FixedClock(T0));
        let token = generate_token(
            &config,
            "u-42".to_string(),
            Role::Supplier,
            Some("Acme Imports".to_string()),
        )
        .unwrap();

        let identity = authenticate(&config, Some(&token)).unwrap();
        assert_eq!(identity.user_id.as_deref(), Some("u-42"));
        assert_eq!(identity.role, Role::Supplier);
        assert_eq!(identity.display_name.as_deref(), Some("Acme Imports"));
        assert!(!identity.is_guest());
    }

    #[test]
    fn garbage_token_is_refused_not_downgraded() {
        let config = test_config(FixedClock(T0));
        let err = authenticate(&config, Some("not-a-jwt")).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::InvalidToken);
    }

    #[test]
    fn wrong_signature_is_refused() {
        let issuing = AuthConfig {
            jwt_secret: JwtSecret::new("a-completely-different-secret-value".to_string()),
            ..test_config(FixedClock(T0))
        };
        let verifying = test_config(FixedClock(T0));

        let token = generate_token(&issuing, "u-1".to_string(), Role::User, None).unwrap();
        let err = authenticate(&verifying, Some(&token)).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::InvalidToken);
    }

    #[test]
    fn expired_token_is_refused() {
        let issuing = test_config(FixedClock(T0));
        let token = generate_token(&issuing, "u-1".to_string(), Role::User, None).unwrap();

        // Two hours later: past the 1h expiry plus skew.
        let verifying = test_config(FixedClock(T0 + 7200));
        let err = authenticate(&verifying, Some(&token)).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::TokenExpired);
    }

    #[test]
    fn expiry_tolerates_clock_skew() {
        let issuing = test_config(FixedClock(T0));
        let token = generate_token(&issuing, "u-1".to_string(), Role::User, None).unwrap();

        // 30s past expiry is within the 60s skew window.
        let verifying = test_config(FixedClock(T0 + 3630));
        assert!(authenticate(&verifying, Some(&token)).is_ok());
    }

    #[test]
    fn each_handshake_mints_a_fresh_connection_id() {
        let a = ConnectionIdentity::guest();
        let b = ConnectionIdentity::guest();
        assert_ne!(a.connection_id, b.connection_id);
    }
}
