//! API Configuration Module
//!
//! Server-level settings loaded from environment variables with sensible
//! defaults for development.

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bind host for the HTTP listener.
    pub bind_host: String,

    /// Bind port for the HTTP listener.
    pub port: u16,

    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 3000,
            cors_origins: Vec::new(), // Empty = allow all
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `LADING_BIND`: Bind host (default: 0.0.0.0)
    /// - `PORT` / `LADING_PORT`: Bind port (default: 3000)
    /// - `LADING_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let cors_origins = std::env::var("LADING_CORS_ORIGINS")
            .ok()
            .map(|value| {
                value
                    .split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            bind_host: std::env::var("LADING_BIND").unwrap_or(defaults.bind_host),
            port: std::env::var("PORT")
                .ok()
                .or_else(|| std::env::var("LADING_PORT").ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            cors_origins,
        }
    }
}
