//! Channel Event Types
//!
//! Defines the bidirectional wire vocabulary of the real-time channel:
//! outbound `ChannelEvent`s fanned out to watchers, and inbound
//! `ClientRequest`s parsed from client frames.
//!
//! Every outbound event (except `Error`) carries a `timestamp` that the
//! bus overwrites at send time; callers that care about the occurrence
//! time of the underlying fact must carry it as a payload field.

use crate::auth::{ConnectionId, ConnectionIdentity, Role};
use lading_core::{InspectionProgress, Shipment, ShipmentId, ShipmentStatus, Timestamp};
use serde::{Deserialize, Serialize};

// ============================================================================
// IDENTITY REFERENCE
// ============================================================================

/// Compact identity reference embedded in watcher notices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatcherRef {
    pub user_id: Option<String>,
    pub role: Role,
    pub display_name: Option<String>,
}

impl From<&ConnectionIdentity> for WatcherRef {
    fn from(identity: &ConnectionIdentity) -> Self {
        Self {
            user_id: identity.user_id.clone(),
            role: identity.role,
            display_name: identity.display_name.clone(),
        }
    }
}

// ============================================================================
// OUTBOUND EVENTS
// ============================================================================

/// Events delivered to connected viewers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelEvent {
    /// Private confirmation to a connection that just joined a room.
    Joined {
        shipment_id: ShipmentId,
        viewer_count: usize,
        timestamp: Timestamp,
    },

    /// Another viewer started watching the shipment.
    WatcherArrived {
        user: WatcherRef,
        connection_id: ConnectionId,
        timestamp: Timestamp,
    },

    /// A viewer stopped watching (left the room or disconnected).
    WatcherDeparted {
        user: WatcherRef,
        connection_id: ConnectionId,
        viewer_count: usize,
        timestamp: Timestamp,
    },

    /// Shipment status or fields changed.
    ShipmentUpdated {
        shipment_id: ShipmentId,
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<ShipmentStatus>,
        #[serde(skip_serializing_if = "Option::is_none")]
        changed_by: Option<String>,
        /// Updated record, included when the producer has it on hand.
        #[serde(skip_serializing_if = "Option::is_none")]
        shipment: Option<Box<Shipment>>,
        timestamp: Timestamp,
    },

    /// A document was attached to the shipment.
    DocumentUploaded {
        shipment_id: ShipmentId,
        document: serde_json::Value,
        timestamp: Timestamp,
    },

    /// Inspection progress notice.
    InspectionStatus {
        shipment_id: ShipmentId,
        progress: InspectionProgress,
        #[serde(skip_serializing_if = "Option::is_none")]
        inspector: Option<String>,
        timestamp: Timestamp,
    },

    /// The shipment was rejected after a failed inspection.
    ShipmentRejected {
        shipment_id: ShipmentId,
        reason: String,
        rejected_by: String,
        timestamp: Timestamp,
    },

    /// Stock count update for the shipment's goods.
    InventoryCount {
        shipment_id: ShipmentId,
        counted_quantity: i32,
        #[serde(skip_serializing_if = "Option::is_none")]
        counted_by: Option<String>,
        timestamp: Timestamp,
    },

    /// Warehouse capacity update; broadcast globally since capacity is not
    /// shipment-scoped.
    WarehouseCapacity {
        location: String,
        total_capacity: i32,
        available_bins: i32,
        used_capacity: i32,
        timestamp: Timestamp,
    },

    /// Channel-level error surfaced to a single connection.
    Error { message: String },
}

impl ChannelEvent {
    /// Event type tag, for logging.
    pub fn event_type(&self) -> &'static str {
        match self {
            ChannelEvent::Joined { .. } => "joined",
            ChannelEvent::WatcherArrived { .. } => "watcher_arrived",
            ChannelEvent::WatcherDeparted { .. } => "watcher_departed",
            ChannelEvent::ShipmentUpdated { .. } => "shipment_updated",
            ChannelEvent::DocumentUploaded { .. } => "document_uploaded",
            ChannelEvent::InspectionStatus { .. } => "inspection_status",
            ChannelEvent::ShipmentRejected { .. } => "shipment_rejected",
            ChannelEvent::InventoryCount { .. } => "inventory_count",
            ChannelEvent::WarehouseCapacity { .. } => "warehouse_capacity",
            ChannelEvent::Error { .. } => "error",
        }
    }

    /// Stamp the delivery timestamp. The bus applies this at send time so
    /// the wire timestamp reflects delivery, not occurrence.
    pub fn stamped(mut self, at: Timestamp) -> Self {
        match &mut self {
            ChannelEvent::Joined { timestamp, .. }
            | ChannelEvent::WatcherArrived { timestamp, .. }
            | ChannelEvent::WatcherDeparted { timestamp, .. }
            | ChannelEvent::ShipmentUpdated { timestamp, .. }
            | ChannelEvent::DocumentUploaded { timestamp, .. }
            | ChannelEvent::InspectionStatus { timestamp, .. }
            | ChannelEvent::ShipmentRejected { timestamp, .. }
            | ChannelEvent::InventoryCount { timestamp, .. }
            | ChannelEvent::WarehouseCapacity { timestamp, .. } => *timestamp = at,
            ChannelEvent::Error { .. } => {}
        }
        self
    }
}

// ============================================================================
// INBOUND REQUESTS
// ============================================================================

/// Requests a client may issue over the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientRequest {
    JoinShipment { shipment_id: ShipmentId },
    LeaveShipment { shipment_id: ShipmentId },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn t(secs: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, secs).unwrap()
    }

    #[test]
    fn events_serialize_with_snake_case_tags() {
        let event = ChannelEvent::Joined {
            shipment_id: uuid::Uuid::nil(),
            viewer_count: 2,
            timestamp: t(0),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "joined");
        assert_eq!(json["viewer_count"], 2);
    }

    #[test]
    fn stamped_overwrites_delivery_timestamp() {
        let event = ChannelEvent::WarehouseCapacity {
            location: "PTA".to_string(),
            total_capacity: 1200,
            available_bins: 340,
            used_capacity: 860,
            timestamp: t(0),
        };
        let stamped = event.stamped(t(30));
        match stamped {
            ChannelEvent::WarehouseCapacity { timestamp, .. } => assert_eq!(timestamp, t(30)),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn error_event_has_no_timestamp_field() {
        let event = ChannelEvent::Error {
            message: "joinShipment requires shipmentId".to_string(),
        };
        let json = serde_json::to_value(event.clone().stamped(t(30))).unwrap();
        assert_eq!(json["type"], "error");
        assert!(json.get("timestamp").is_none());
    }

    #[test]
    fn join_request_parses_from_wire_form() {
        let id = uuid::Uuid::now_v7();
        let raw = format!(r#"{{"type":"join_shipment","shipment_id":"{id}"}}"#);
        let req: ClientRequest = serde_json::from_str(&raw).unwrap();
        assert_eq!(req, ClientRequest::JoinShipment { shipment_id: id });
    }

    #[test]
    fn join_request_without_shipment_id_fails_to_parse() {
        let err = serde_json::from_str::<ClientRequest>(r#"{"type":"join_shipment"}"#);
        assert!(err.is_err());
    }
}
