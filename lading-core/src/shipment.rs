//! Shipment entity and workflow status types.
//!
//! A shipment is created in a `Planned*` status and moves through the
//! physical handling lifecycle exclusively via workflow transitions
//! (see `workflow.rs`). Records are never deleted: retirement is the
//! terminal `Archived` status with data retained.

use crate::{ShipmentId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// STATUS ENUM
// ============================================================================

/// Workflow status of a shipment.
///
/// Ordered by lifecycle position; not every status is reachable from every
/// other. The legality of each move is decided by the workflow engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    /// Booked on an airfreight carrier, not yet moving
    PlannedAirfreight,
    /// Booked on a seafreight carrier, not yet moving
    PlannedSeafreight,
    /// In the air
    InTransitAirfreight,
    /// On the water
    InTransitSeafreight,
    /// Landed at the PTA warehouse
    ArrivedPta,
    /// Landed at the KLM warehouse
    ArrivedKlm,
    /// Delivered to an offsite location
    ArrivedOffsite,
    /// Being unloaded from the container/pallet
    Unloading,
    /// Unloaded, waiting for an inspector
    InspectionPending,
    /// Inspection in progress
    Inspecting,
    /// Inspection passed, eligible for receiving
    InspectionPassed,
    /// Inspection failed; may branch to rejection
    InspectionFailed,
    /// Goods being booked into stock
    Receiving,
    /// Fully received
    Received,
    /// Rejected after a failed inspection
    Rejected,
    /// Put away in storage
    Stored,
    /// Soft-retired; restorable via unarchive
    Archived,
}

impl ShipmentStatus {
    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            ShipmentStatus::PlannedAirfreight => "planned_airfreight",
            ShipmentStatus::PlannedSeafreight => "planned_seafreight",
            ShipmentStatus::InTransitAirfreight => "in_transit_airfreight",
            ShipmentStatus::InTransitSeafreight => "in_transit_seafreight",
            ShipmentStatus::ArrivedPta => "arrived_pta",
            ShipmentStatus::ArrivedKlm => "arrived_klm",
            ShipmentStatus::ArrivedOffsite => "arrived_offsite",
            ShipmentStatus::Unloading => "unloading",
            ShipmentStatus::InspectionPending => "inspection_pending",
            ShipmentStatus::Inspecting => "inspecting",
            ShipmentStatus::InspectionPassed => "inspection_passed",
            ShipmentStatus::InspectionFailed => "inspection_failed",
            ShipmentStatus::Receiving => "receiving",
            ShipmentStatus::Received => "received",
            ShipmentStatus::Rejected => "rejected",
            ShipmentStatus::Stored => "stored",
            ShipmentStatus::Archived => "archived",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Result<Self, ShipmentStatusParseError> {
        match s.to_lowercase().as_str() {
            "planned_airfreight" => Ok(ShipmentStatus::PlannedAirfreight),
            "planned_seafreight" => Ok(ShipmentStatus::PlannedSeafreight),
            "in_transit_airfreight" => Ok(ShipmentStatus::InTransitAirfreight),
            "in_transit_seafreight" => Ok(ShipmentStatus::InTransitSeafreight),
            "arrived_pta" => Ok(ShipmentStatus::ArrivedPta),
            "arrived_klm" => Ok(ShipmentStatus::ArrivedKlm),
            "arrived_offsite" => Ok(ShipmentStatus::ArrivedOffsite),
            "unloading" => Ok(ShipmentStatus::Unloading),
            "inspection_pending" => Ok(ShipmentStatus::InspectionPending),
            "inspecting" => Ok(ShipmentStatus::Inspecting),
            "inspection_passed" => Ok(ShipmentStatus::InspectionPassed),
            "inspection_failed" => Ok(ShipmentStatus::InspectionFailed),
            "receiving" => Ok(ShipmentStatus::Receiving),
            "received" => Ok(ShipmentStatus::Received),
            "rejected" => Ok(ShipmentStatus::Rejected),
            "stored" => Ok(ShipmentStatus::Stored),
            "archived" => Ok(ShipmentStatus::Archived),
            _ => Err(ShipmentStatusParseError(s.to_string())),
        }
    }

    /// Every declared status, in lifecycle order.
    pub fn all() -> [ShipmentStatus; 17] {
        [
            ShipmentStatus::PlannedAirfreight,
            ShipmentStatus::PlannedSeafreight,
            ShipmentStatus::InTransitAirfreight,
            ShipmentStatus::InTransitSeafreight,
            ShipmentStatus::ArrivedPta,
            ShipmentStatus::ArrivedKlm,
            ShipmentStatus::ArrivedOffsite,
            ShipmentStatus::Unloading,
            ShipmentStatus::InspectionPending,
            ShipmentStatus::Inspecting,
            ShipmentStatus::InspectionPassed,
            ShipmentStatus::InspectionFailed,
            ShipmentStatus::Receiving,
            ShipmentStatus::Received,
            ShipmentStatus::Rejected,
            ShipmentStatus::Stored,
            ShipmentStatus::Archived,
        ]
    }

    /// Check if the shipment has physically arrived at a handling site.
    pub fn is_arrived(&self) -> bool {
        matches!(
            self,
            ShipmentStatus::ArrivedPta | ShipmentStatus::ArrivedKlm | ShipmentStatus::ArrivedOffsite
        )
    }

    /// Check if this is a terminal status (no further workflow moves
    /// other than archiving).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ShipmentStatus::Stored | ShipmentStatus::Rejected | ShipmentStatus::Archived
        )
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for ShipmentStatus {
    type Err = ShipmentStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

/// Error when parsing an invalid shipment status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShipmentStatusParseError(pub String);

impl fmt::Display for ShipmentStatusParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid shipment status: {}", self.0)
    }
}

impl std::error::Error for ShipmentStatusParseError {}

// ============================================================================
// STAGE SUB-STATUS ENUMS
// ============================================================================

/// Progress of the inspection stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InspectionProgress {
    InProgress,
    Passed,
    Failed,
}

/// Progress of the receiving stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceivingProgress {
    InProgress,
    Completed,
}

// ============================================================================
// STAGE METADATA
// ============================================================================

/// Unloading stage timestamps.
///
/// Populated only once the shipment has entered the unloading stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnloadingStage {
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

/// Inspection stage metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InspectionStage {
    pub progress: Option<InspectionProgress>,
    /// Acting inspector; once recorded it survives later transitions that
    /// omit an explicit inspector.
    pub inspector: Option<String>,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub notes: Option<String>,
}

/// Receiving stage metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReceivingStage {
    pub progress: Option<ReceivingProgress>,
    pub receiver: Option<String>,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub received_quantity: Option<i32>,
}

/// Recorded when a failed inspection branches to the rejection path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectionRecord {
    pub reason: String,
    pub rejected_by: String,
    pub rejected_at: Timestamp,
}

// ============================================================================
// SHIPMENT ENTITY
// ============================================================================

/// Shipment - an inbound consignment moving through the warehouse workflow.
///
/// Mutated exclusively through workflow-approved transitions; never deleted,
/// only moved to the terminal `Archived` status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    pub shipment_id: ShipmentId,
    /// Purchase-order reference; unique across shipments.
    pub order_ref: String,
    pub supplier_ref: String,
    pub quantity: i32,
    pub status: ShipmentStatus,
    #[serde(default)]
    pub unloading: UnloadingStage,
    #[serde(default)]
    pub inspection: InspectionStage,
    #[serde(default)]
    pub receiving: ReceivingStage,
    pub rejection: Option<RejectionRecord>,
    pub archived_at: Option<Timestamp>,
    /// Status held before archiving; unarchive restores it.
    pub archived_from: Option<ShipmentStatus>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Shipment {
    /// Create a new shipment in the given planned status.
    pub fn new(
        order_ref: impl Into<String>,
        supplier_ref: impl Into<String>,
        quantity: i32,
        status: ShipmentStatus,
        now: Timestamp,
    ) -> Self {
        Self {
            shipment_id: crate::new_shipment_id(),
            order_ref: order_ref.into(),
            supplier_ref: supplier_ref.into(),
            quantity,
            status,
            unloading: UnloadingStage::default(),
            inspection: InspectionStage::default(),
            receiving: ReceivingStage::default(),
            rejection: None,
            archived_at: None,
            archived_from: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_db_str() {
        let all = [
            ShipmentStatus::PlannedAirfreight,
            ShipmentStatus::PlannedSeafreight,
            ShipmentStatus::InTransitAirfreight,
            ShipmentStatus::InTransitSeafreight,
            ShipmentStatus::ArrivedPta,
            ShipmentStatus::ArrivedKlm,
            ShipmentStatus::ArrivedOffsite,
            ShipmentStatus::Unloading,
            ShipmentStatus::InspectionPending,
            ShipmentStatus::Inspecting,
            ShipmentStatus::InspectionPassed,
            ShipmentStatus::InspectionFailed,
            ShipmentStatus::Receiving,
            ShipmentStatus::Received,
            ShipmentStatus::Rejected,
            ShipmentStatus::Stored,
            ShipmentStatus::Archived,
        ];
        for status in all {
            assert_eq!(ShipmentStatus::from_db_str(status.as_db_str()), Ok(status));
        }
    }

    #[test]
    fn unknown_status_string_is_rejected() {
        let err = ShipmentStatus::from_db_str("teleported").unwrap_err();
        assert_eq!(err.0, "teleported");
    }

    #[test]
    fn arrived_statuses() {
        assert!(ShipmentStatus::ArrivedPta.is_arrived());
        assert!(ShipmentStatus::ArrivedKlm.is_arrived());
        assert!(ShipmentStatus::ArrivedOffsite.is_arrived());
        assert!(!ShipmentStatus::Unloading.is_arrived());
    }
}
