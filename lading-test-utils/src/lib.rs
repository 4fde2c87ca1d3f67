//! LADING Test Utilities
//!
//! Centralized test infrastructure for the LADING workspace:
//! - Proptest generators for shipment types
//! - Fixtures for common workflow scenarios

// Re-export core types for convenience
pub use lading_core::{
    new_shipment_id, InspectionProgress, ReceivingProgress, Shipment, ShipmentId, ShipmentStatus,
    Timestamp, TransitionRequest,
};

// ============================================================================
// GENERATORS
// ============================================================================

pub mod generators {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use uuid::Uuid;

    pub fn arb_shipment_id() -> impl Strategy<Value = ShipmentId> {
        any::<u128>().prop_map(Uuid::from_u128)
    }

    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        // 2020-01-01 .. 2030-01-01
        (1_577_836_800i64..1_893_456_000i64)
            .prop_map(|secs| chrono::Utc.timestamp_opt(secs, 0).unwrap())
    }

    pub fn arb_shipment_status() -> impl Strategy<Value = ShipmentStatus> {
        proptest::sample::select(ShipmentStatus::all().to_vec())
    }

    /// Statuses in which the shipment sits at a handling site, eligible
    /// for unloading.
    pub fn arb_arrived_status() -> impl Strategy<Value = ShipmentStatus> {
        prop_oneof![
            Just(ShipmentStatus::ArrivedPta),
            Just(ShipmentStatus::ArrivedKlm),
            Just(ShipmentStatus::ArrivedOffsite),
        ]
    }

    pub fn arb_order_ref() -> impl Strategy<Value = String> {
        "PO-[0-9]{4,6}".prop_map(String::from)
    }

    pub fn arb_shipment() -> impl Strategy<Value = Shipment> {
        (
            arb_order_ref(),
            "SUP-[0-9]{1,3}",
            1..10_000i32,
            arb_shipment_status(),
            arb_timestamp(),
        )
            .prop_map(|(order_ref, supplier_ref, quantity, status, created)| {
                let mut shipment =
                    Shipment::new(order_ref, supplier_ref, quantity, status, created);
                if status == ShipmentStatus::Archived {
                    shipment.archived_from = Some(ShipmentStatus::Stored);
                    shipment.archived_at = Some(created);
                }
                shipment
            })
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    use super::*;
    use chrono::TimeZone;

    /// A stable timestamp for deterministic assertions.
    pub fn fixed_now() -> Timestamp {
        chrono::Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    /// Shipment parked in the given status, with consistent archive
    /// metadata when the status is `Archived`.
    pub fn shipment_with_status(status: ShipmentStatus) -> Shipment {
        let mut shipment = Shipment::new("PO-1001", "SUP-7", 240, status, fixed_now());
        if status == ShipmentStatus::Archived {
            shipment.archived_from = Some(ShipmentStatus::Stored);
            shipment.archived_at = Some(fixed_now());
        }
        shipment
    }

    /// Freshly planned seafreight shipment.
    pub fn planned_shipment(order_ref: &str) -> Shipment {
        Shipment::new(
            order_ref,
            "SUP-7",
            240,
            ShipmentStatus::PlannedSeafreight,
            fixed_now(),
        )
    }
}
