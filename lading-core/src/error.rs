//! Error types for LADING domain operations

use crate::shipment::ShipmentStatus;
use thiserror::Error;

/// Workflow transition errors.
///
/// A rejected transition carries the operation name and the set of statuses
/// it is legal from, so the caller can surface a precise conflict message.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Cannot {operation} while shipment is {current}; requires one of: {}",
        .allowed.iter().map(|s| s.as_db_str()).collect::<Vec<_>>().join(", "))]
    InvalidSourceStatus {
        operation: &'static str,
        current: ShipmentStatus,
        allowed: Vec<ShipmentStatus>,
    },

    #[error("Cannot unarchive: no pre-archive status recorded")]
    MissingRestoreStatus,
}

impl TransitionError {
    /// The statuses the rejected operation would have been legal from.
    pub fn allowed_statuses(&self) -> &[ShipmentStatus] {
        match self {
            TransitionError::InvalidSourceStatus { allowed, .. } => allowed,
            TransitionError::MissingRestoreStatus => &[],
        }
    }
}

/// Validation errors for domain input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainValidationError {
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },
}
