//! Error Types for the LADING API
//!
//! This module defines error handling for the service layer, including:
//! - ApiError struct for structured error responses
//! - ErrorCode enum for categorizing errors
//! - IntoResponse implementation for Axum HTTP responses
//!
//! All errors are serialized as JSON with appropriate HTTP status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use lading_core::{DomainValidationError, TransitionError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
///
/// Each error code maps to a specific HTTP status code and represents
/// a category of error that can occur during workflow or channel operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Authentication Errors (401)
    // ========================================================================
    /// Request lacks valid authentication credentials
    Unauthorized,

    /// Authentication token is invalid or malformed
    InvalidToken,

    /// Authentication token has expired
    TokenExpired,

    // ========================================================================
    // Validation Errors (400)
    // ========================================================================
    /// Request validation failed
    ValidationFailed,

    /// Request contains invalid input data
    InvalidInput,

    /// Required field is missing from request
    MissingField,

    // ========================================================================
    // Not Found Errors (404)
    // ========================================================================
    /// Requested shipment does not exist
    ShipmentNotFound,

    // ========================================================================
    // Conflict Errors (409)
    // ========================================================================
    /// Workflow transition attempted from an invalid source status
    StateConflict,

    /// Shipment with the same order reference already exists
    DuplicateOrderRef,

    // ========================================================================
    // Server Errors (500, 503)
    // ========================================================================
    /// Internal server error
    InternalError,

    /// Service is temporarily unavailable
    ServiceUnavailable,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::Unauthorized | ErrorCode::InvalidToken | ErrorCode::TokenExpired => {
                StatusCode::UNAUTHORIZED
            }

            ErrorCode::ValidationFailed | ErrorCode::InvalidInput | ErrorCode::MissingField => {
                StatusCode::BAD_REQUEST
            }

            ErrorCode::ShipmentNotFound => StatusCode::NOT_FOUND,

            ErrorCode::StateConflict | ErrorCode::DuplicateOrderRef => StatusCode::CONFLICT,

            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,

            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get a default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::Unauthorized => "Authentication required",
            ErrorCode::InvalidToken => "Invalid authentication token",
            ErrorCode::TokenExpired => "Authentication token has expired",

            ErrorCode::ValidationFailed => "Request validation failed",
            ErrorCode::InvalidInput => "Invalid input data",
            ErrorCode::MissingField => "Required field is missing",

            ErrorCode::ShipmentNotFound => "Shipment not found",

            ErrorCode::StateConflict => "Operation conflicts with current shipment status",
            ErrorCode::DuplicateOrderRef => "Order reference already exists",

            ErrorCode::InternalError => "Internal server error",
            ErrorCode::ServiceUnavailable => "Service temporarily unavailable",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error response for API operations.
///
/// This type is returned by all service entry points when an error occurs.
/// It provides a consistent error format across HTTP and WebSocket surfaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details (valid source states, field errors, etc.)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Create a new API error with the given code, using the default message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self {
            code,
            message: code.default_message().to_string(),
            details: None,
        }
    }

    /// Add additional details to the error.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors for common errors
    // ========================================================================

    /// Create an Unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// Create an InvalidToken error.
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidToken, message)
    }

    /// Create a TokenExpired error.
    pub fn token_expired() -> Self {
        Self::from_code(ErrorCode::TokenExpired)
    }

    /// Create a ValidationFailed error.
    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message)
    }

    /// Create an InvalidInput error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Create a MissingField error.
    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingField,
            format!("Required field '{}' is missing", field),
        )
    }

    /// Create a ShipmentNotFound error.
    pub fn shipment_not_found(shipment_id: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::ShipmentNotFound,
            format!("Shipment {} not found", shipment_id),
        )
    }

    /// Create a StateConflict error.
    pub fn state_conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StateConflict, message)
    }

    /// Create a DuplicateOrderRef error.
    pub fn duplicate_order_ref(order_ref: &str) -> Self {
        Self::new(
            ErrorCode::DuplicateOrderRef,
            format!("Order reference '{}' already exists", order_ref),
        )
    }

    /// Create an InternalError.
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Map a workflow rejection to a 409 conflict naming the valid source states.
impl From<TransitionError> for ApiError {
    fn from(err: TransitionError) -> Self {
        let allowed: Vec<&'static str> = err
            .allowed_statuses()
            .iter()
            .map(|s| s.as_db_str())
            .collect();
        ApiError::state_conflict(err.to_string())
            .with_details(serde_json::json!({ "valid_source_statuses": allowed }))
    }
}

impl From<DomainValidationError> for ApiError {
    fn from(err: DomainValidationError) -> Self {
        ApiError::validation_failed(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lading_core::ShipmentStatus;

    #[test]
    fn error_codes_map_to_expected_statuses() {
        assert_eq!(
            ErrorCode::Unauthorized.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ErrorCode::StateConflict.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ErrorCode::ShipmentNotFound.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ErrorCode::ValidationFailed.status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn transition_error_becomes_conflict_with_valid_states() {
        let err = TransitionError::InvalidSourceStatus {
            operation: "start_receiving",
            current: ShipmentStatus::Inspecting,
            allowed: vec![ShipmentStatus::InspectionPassed],
        };
        let api_err: ApiError = err.into();
        assert_eq!(api_err.code, ErrorCode::StateConflict);
        let details = api_err.details.unwrap();
        assert_eq!(
            details["valid_source_statuses"],
            serde_json::json!(["inspection_passed"])
        );
    }
}
