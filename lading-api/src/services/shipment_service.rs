//! Shipment workflow service.
//!
//! The synchronous request surface consumed by the transport layer: one
//! function per workflow operation, each taking the shipment id, the
//! acting-user reference, and operation-specific inputs, and returning the
//! updated record or a rejection.

use crate::channel::Broadcaster;
use crate::error::{ApiError, ApiResult};
use crate::events::ChannelEvent;
use crate::traits::ShipmentStore;
use chrono::Utc;
use lading_core::{
    apply_transition, DomainValidationError, Shipment, ShipmentId, ShipmentStatus,
    TransitionRequest,
};
use tracing::info;

/// Create a shipment in one of the planned statuses.
pub async fn create_shipment(
    store: &dyn ShipmentStore,
    order_ref: String,
    supplier_ref: String,
    quantity: i32,
    status: ShipmentStatus,
) -> ApiResult<Shipment> {
    if quantity <= 0 {
        return Err(DomainValidationError::InvalidValue {
            field: "quantity".to_string(),
            reason: "must be positive".to_string(),
        }
        .into());
    }
    if !matches!(
        status,
        ShipmentStatus::PlannedAirfreight | ShipmentStatus::PlannedSeafreight
    ) {
        return Err(ApiError::invalid_input(format!(
            "Shipments are created in a planned status, not {}",
            status
        )));
    }

    let shipment = Shipment::new(order_ref, supplier_ref, quantity, status, Utc::now());
    store.insert(shipment).await
}

/// Run one workflow transition end to end.
///
/// The engine decides legality before anything is persisted or announced:
/// a rejection propagates as a 409 and never reaches the broadcast path.
async fn transition(
    store: &dyn ShipmentStore,
    bus: &dyn Broadcaster,
    shipment_id: ShipmentId,
    actor: &str,
    request: TransitionRequest,
) -> ApiResult<Shipment> {
    let current = store.get(shipment_id).await?;
    let updated = apply_transition(&current, &request, actor, Utc::now())?;
    let updated = store.update(updated).await?;

    info!(
        shipment_id = %shipment_id,
        operation = request.operation(),
        status = %updated.status,
        actor,
        "Workflow transition applied"
    );

    bus.publish(
        shipment_id,
        ChannelEvent::ShipmentUpdated {
            shipment_id,
            status: Some(updated.status),
            changed_by: Some(actor.to_string()),
            shipment: Some(Box::new(updated.clone())),
            timestamp: updated.updated_at,
        },
    );

    Ok(updated)
}

/// Begin unloading an arrived shipment.
pub async fn start_unloading(
    store: &dyn ShipmentStore,
    bus: &dyn Broadcaster,
    shipment_id: ShipmentId,
    actor: &str,
) -> ApiResult<Shipment> {
    transition(store, bus, shipment_id, actor, TransitionRequest::StartUnloading).await
}

/// Finish unloading; the shipment becomes ready for inspection.
pub async fn complete_unloading(
    store: &dyn ShipmentStore,
    bus: &dyn Broadcaster,
    shipment_id: ShipmentId,
    actor: &str,
) -> ApiResult<Shipment> {
    transition(store, bus, shipment_id, actor, TransitionRequest::CompleteUnloading).await
}

/// Begin inspecting a pending shipment.
pub async fn start_inspection(
    store: &dyn ShipmentStore,
    bus: &dyn Broadcaster,
    shipment_id: ShipmentId,
    actor: &str,
    inspector: Option<String>,
) -> ApiResult<Shipment> {
    let updated = transition(
        store,
        bus,
        shipment_id,
        actor,
        TransitionRequest::StartInspection { inspector },
    )
    .await?;
    publish_inspection_status(bus, &updated);
    Ok(updated)
}

/// Record the inspection outcome.
pub async fn complete_inspection(
    store: &dyn ShipmentStore,
    bus: &dyn Broadcaster,
    shipment_id: ShipmentId,
    actor: &str,
    passed: bool,
    notes: Option<String>,
    inspector: Option<String>,
) -> ApiResult<Shipment> {
    let updated = transition(
        store,
        bus,
        shipment_id,
        actor,
        TransitionRequest::CompleteInspection {
            passed,
            notes,
            inspector,
        },
    )
    .await?;
    publish_inspection_status(bus, &updated);
    Ok(updated)
}

/// Begin booking a passed shipment into stock.
pub async fn start_receiving(
    store: &dyn ShipmentStore,
    bus: &dyn Broadcaster,
    shipment_id: ShipmentId,
    actor: &str,
    receiver: Option<String>,
) -> ApiResult<Shipment> {
    transition(
        store,
        bus,
        shipment_id,
        actor,
        TransitionRequest::StartReceiving { receiver },
    )
    .await
}

/// Finish receiving with the counted quantity.
pub async fn complete_receiving(
    store: &dyn ShipmentStore,
    bus: &dyn Broadcaster,
    shipment_id: ShipmentId,
    actor: &str,
    received_quantity: i32,
) -> ApiResult<Shipment> {
    if received_quantity <= 0 {
        return Err(DomainValidationError::InvalidValue {
            field: "received_quantity".to_string(),
            reason: "must be positive".to_string(),
        }
        .into());
    }
    transition(
        store,
        bus,
        shipment_id,
        actor,
        TransitionRequest::CompleteReceiving { received_quantity },
    )
    .await
}

/// Send a failed-inspection shipment down the rejection path.
pub async fn reject_shipment(
    store: &dyn ShipmentStore,
    bus: &dyn Broadcaster,
    shipment_id: ShipmentId,
    actor: &str,
    reason: String,
) -> ApiResult<Shipment> {
    let updated = transition(
        store,
        bus,
        shipment_id,
        actor,
        TransitionRequest::Reject {
            reason: reason.clone(),
        },
    )
    .await?;
    bus.publish(
        shipment_id,
        ChannelEvent::ShipmentRejected {
            shipment_id,
            reason,
            rejected_by: actor.to_string(),
            timestamp: updated.updated_at,
        },
    );
    Ok(updated)
}

/// Soft-retire a shipment; data is retained and the move is reversible.
pub async fn archive_shipment(
    store: &dyn ShipmentStore,
    bus: &dyn Broadcaster,
    shipment_id: ShipmentId,
    actor: &str,
) -> ApiResult<Shipment> {
    transition(store, bus, shipment_id, actor, TransitionRequest::Archive).await
}

/// Restore an archived shipment to its pre-archive status.
pub async fn unarchive_shipment(
    store: &dyn ShipmentStore,
    bus: &dyn Broadcaster,
    shipment_id: ShipmentId,
    actor: &str,
) -> ApiResult<Shipment> {
    transition(store, bus, shipment_id, actor, TransitionRequest::Unarchive).await
}

// ============================================================================
// NOTIFICATION ENTRY POINTS
// ============================================================================
// Producers outside the workflow (upload handling, stock counts, capacity
// monitors) announce through these; the channel layer stamps delivery time.

/// Announce a document attached to a shipment.
pub fn notify_document_uploaded(
    bus: &dyn Broadcaster,
    shipment_id: ShipmentId,
    document: serde_json::Value,
) {
    bus.publish(
        shipment_id,
        ChannelEvent::DocumentUploaded {
            shipment_id,
            document,
            timestamp: Utc::now(),
        },
    );
}

/// Announce a stock count for a shipment's goods.
pub fn notify_inventory_count(
    bus: &dyn Broadcaster,
    shipment_id: ShipmentId,
    counted_quantity: i32,
    counted_by: Option<String>,
) {
    bus.publish(
        shipment_id,
        ChannelEvent::InventoryCount {
            shipment_id,
            counted_quantity,
            counted_by,
            timestamp: Utc::now(),
        },
    );
}

/// Announce warehouse capacity to every live connection; capacity is not
/// shipment-scoped.
pub fn notify_warehouse_capacity(
    bus: &dyn Broadcaster,
    location: String,
    total_capacity: i32,
    available_bins: i32,
    used_capacity: i32,
) {
    bus.publish_global(ChannelEvent::WarehouseCapacity {
        location,
        total_capacity,
        available_bins,
        used_capacity,
        timestamp: Utc::now(),
    });
}

fn publish_inspection_status(bus: &dyn Broadcaster, shipment: &Shipment) {
    if let Some(progress) = shipment.inspection.progress {
        bus.publish(
            shipment.shipment_id,
            ChannelEvent::InspectionStatus {
                shipment_id: shipment.shipment_id,
                progress,
                inspector: shipment.inspection.inspector.clone(),
                timestamp: shipment.updated_at,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::store::InMemoryShipmentStore;
    use lading_core::InspectionProgress;
    use std::sync::Mutex;

    /// Captures published events instead of delivering them.
    #[derive(Default)]
    struct RecordingBus {
        published: Mutex<Vec<(Option<ShipmentId>, ChannelEvent)>>,
    }

    impl RecordingBus {
        fn events(&self) -> Vec<(Option<ShipmentId>, ChannelEvent)> {
            self.published.lock().unwrap().clone()
        }
    }

    impl Broadcaster for RecordingBus {
        fn publish(&self, shipment_id: ShipmentId, event: ChannelEvent) {
            self.published.lock().unwrap().push((Some(shipment_id), event));
        }

        fn publish_global(&self, event: ChannelEvent) {
            self.published.lock().unwrap().push((None, event));
        }
    }

    async fn seeded(status: ShipmentStatus) -> (InMemoryShipmentStore, Shipment) {
        let store = InMemoryShipmentStore::new();
        let shipment = store
            .insert(Shipment::new("PO-7001", "SUP-9", 64, status, Utc::now()))
            .await
            .unwrap();
        (store, shipment)
    }

    #[tokio::test]
    async fn create_rejects_non_positive_quantity() {
        let store = InMemoryShipmentStore::new();
        let err = create_shipment(
            &store,
            "PO-1".to_string(),
            "SUP-1".to_string(),
            0,
            ShipmentStatus::PlannedAirfreight,
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }

    #[tokio::test]
    async fn create_rejects_non_planned_status() {
        let store = InMemoryShipmentStore::new();
        let err = create_shipment(
            &store,
            "PO-1".to_string(),
            "SUP-1".to_string(),
            10,
            ShipmentStatus::Unloading,
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
    }

    #[tokio::test]
    async fn transition_persists_before_announcing() {
        let (store, shipment) = seeded(ShipmentStatus::ArrivedPta).await;
        let bus = RecordingBus::default();

        let updated = start_unloading(&store, &bus, shipment.shipment_id, "wh-1")
            .await
            .unwrap();
        assert_eq!(updated.status, ShipmentStatus::Unloading);

        // Reloading sees the persisted transition.
        let reloaded = store.get(shipment.shipment_id).await.unwrap();
        assert_eq!(reloaded, updated);

        let events = bus.events();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0].1,
            ChannelEvent::ShipmentUpdated { status: Some(ShipmentStatus::Unloading), .. }
        ));
    }

    #[tokio::test]
    async fn rejected_transition_publishes_nothing() {
        let (store, shipment) = seeded(ShipmentStatus::InTransitAirfreight).await;
        let bus = RecordingBus::default();

        let err = start_unloading(&store, &bus, shipment.shipment_id, "wh-1")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::StateConflict);
        assert!(bus.events().is_empty());
    }

    #[tokio::test]
    async fn unknown_shipment_is_not_found() {
        let store = InMemoryShipmentStore::new();
        let bus = RecordingBus::default();
        let err = start_unloading(&store, &bus, lading_core::new_shipment_id(), "wh-1")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ShipmentNotFound);
        assert!(bus.events().is_empty());
    }

    #[tokio::test]
    async fn inspection_operations_add_progress_notice() {
        let (store, shipment) = seeded(ShipmentStatus::InspectionPending).await;
        let bus = RecordingBus::default();

        start_inspection(&store, &bus, shipment.shipment_id, "qa-4", None)
            .await
            .unwrap();
        complete_inspection(
            &store,
            &bus,
            shipment.shipment_id,
            "qa-4",
            false,
            Some("crushed cartons".to_string()),
            None,
        )
        .await
        .unwrap();

        let events = bus.events();
        let progress: Vec<_> = events
            .iter()
            .filter_map(|(_, event)| match event {
                ChannelEvent::InspectionStatus { progress, .. } => Some(*progress),
                _ => None,
            })
            .collect();
        assert_eq!(
            progress,
            vec![InspectionProgress::InProgress, InspectionProgress::Failed]
        );
    }

    #[tokio::test]
    async fn complete_receiving_validates_quantity() {
        let (store, shipment) = seeded(ShipmentStatus::Receiving).await;
        let bus = RecordingBus::default();

        let err = complete_receiving(&store, &bus, shipment.shipment_id, "wh-2", -5)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert!(bus.events().is_empty());

        let ok = complete_receiving(&store, &bus, shipment.shipment_id, "wh-2", 64)
            .await
            .unwrap();
        assert_eq!(ok.status, ShipmentStatus::Received);
        assert_eq!(ok.receiving.received_quantity, Some(64));
    }

    #[tokio::test]
    async fn document_notice_targets_the_shipment_room() {
        let bus = RecordingBus::default();
        let shipment_id = lading_core::new_shipment_id();
        notify_document_uploaded(&bus, shipment_id, serde_json::json!({ "name": "bol.pdf" }));

        let events = bus.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, Some(shipment_id));
    }

    #[tokio::test]
    async fn capacity_notice_is_global() {
        let bus = RecordingBus::default();
        notify_warehouse_capacity(&bus, "KLM".to_string(), 800, 120, 680);

        let events = bus.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, None);
    }
}
