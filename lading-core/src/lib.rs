//! LADING Core - Shipment Types & Workflow Engine
//!
//! Pure data structures and the workflow decision logic. No I/O lives in
//! this crate: persistence and real-time delivery are layered on top by
//! `lading-api`, which keeps the engine independently unit-testable.

use chrono::{DateTime, Utc};
use uuid::Uuid;

pub mod error;
pub mod shipment;
pub mod workflow;

pub use error::{DomainValidationError, TransitionError};
pub use shipment::{
    InspectionProgress, InspectionStage, ReceivingProgress, ReceivingStage, RejectionRecord,
    Shipment, ShipmentStatus, UnloadingStage,
};
pub use workflow::{apply_transition, TransitionRequest};

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Shipment identifier using UUIDv7 for timestamp-sortable IDs.
pub type ShipmentId = Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Generate a new UUIDv7 ShipmentId (timestamp-sortable).
pub fn new_shipment_id() -> ShipmentId {
    Uuid::now_v7()
}
