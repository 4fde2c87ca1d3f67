//! Channel Manager & Broadcast Fan-Out
//!
//! Orchestrates the real-time layer: accepts authenticated connections,
//! routes join/leave requests into the presence registry, and fans events
//! out to every connection watching a shipment.
//!
//! ## Architecture
//!
//! - One unbounded outbox per connection; the socket loop in `ws.rs`
//!   drains it into the transport.
//! - Delivery targets are resolved snapshot-consistently: a broadcast
//!   reaches exactly the connections registered at the moment of the call,
//!   never late joiners.
//! - Fan-out for a shipment executes under the presence lock, so per-room
//!   delivery order equals broadcast call order. No ordering is guaranteed
//!   across different shipments.
//! - A send into a dropped outbox is logged and skipped; one connection's
//!   fault never tears down the others, and partial delivery during a
//!   concurrent disconnect is accepted degradation.

use crate::auth::{ConnectionId, ConnectionIdentity};
use crate::events::{ChannelEvent, ClientRequest, WatcherRef};
use crate::presence::PresenceRegistry;
use dashmap::DashMap;
use lading_core::ShipmentId;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

// ============================================================================
// BROADCASTER SEAM
// ============================================================================

/// Broadcast entry points used by the workflow layer and other producers.
///
/// `ChannelManager` is the single-process implementation; a pub/sub
/// backplane can be substituted here to fan out across processes without
/// touching the workflow engine or the presence registry.
pub trait Broadcaster: Send + Sync {
    /// Deliver `event` to every connection watching `shipment_id`.
    /// A no-op when nobody is watching.
    fn publish(&self, shipment_id: ShipmentId, event: ChannelEvent);

    /// Deliver `event` to every live connection, for facts that are not
    /// shipment-scoped (warehouse capacity).
    fn publish_global(&self, event: ChannelEvent);
}

// ============================================================================
// CHANNEL MANAGER
// ============================================================================

struct ConnectionHandle {
    identity: ConnectionIdentity,
    outbox: mpsc::UnboundedSender<ChannelEvent>,
}

/// Process-wide owner of live connections and their shipment rooms.
pub struct ChannelManager {
    registry: Arc<PresenceRegistry>,
    connections: DashMap<ConnectionId, ConnectionHandle>,
}

impl ChannelManager {
    /// Build a manager over an externally constructed registry, so tests
    /// can inspect the same registry instance they hand in.
    pub fn new(registry: Arc<PresenceRegistry>) -> Self {
        Self {
            registry,
            connections: DashMap::new(),
        }
    }

    /// The presence registry backing this manager.
    pub fn registry(&self) -> &Arc<PresenceRegistry> {
        &self.registry
    }

    /// Register an authenticated connection and hand back the receiving
    /// end of its outbox.
    pub fn connect(
        &self,
        identity: ConnectionIdentity,
    ) -> mpsc::UnboundedReceiver<ChannelEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let connection_id = identity.connection_id;
        debug!(
            connection_id = %connection_id,
            user_id = ?identity.user_id,
            role = %identity.role,
            "Connection registered"
        );
        self.connections.insert(
            connection_id,
            ConnectionHandle {
                identity,
                outbox: tx,
            },
        );
        rx
    }

    /// Dispatch one inbound client request to its handler.
    pub fn handle_request(&self, connection_id: ConnectionId, request: ClientRequest) {
        match request {
            ClientRequest::JoinShipment { shipment_id } => self.join(connection_id, shipment_id),
            ClientRequest::LeaveShipment { shipment_id } => self.leave(connection_id, shipment_id),
        }
    }

    /// Join a connection to a shipment room.
    ///
    /// The joiner receives a private confirmation with the current viewer
    /// count; every other watcher receives an arrival notice. The joiner
    /// never receives its own arrival notice. Re-joining repeats both,
    /// which clients must tolerate.
    pub fn join(&self, connection_id: ConnectionId, shipment_id: ShipmentId) {
        let Some(identity) = self.identity_for(connection_id) else {
            warn!(connection_id = %connection_id, "Join from unregistered connection");
            return;
        };

        let outcome = self.registry.join(&identity, shipment_id);
        debug!(
            connection_id = %connection_id,
            shipment_id = %shipment_id,
            viewer_count = outcome.viewer_count,
            newly_joined = outcome.newly_joined,
            "Joined shipment room"
        );

        let now = chrono::Utc::now();
        self.send_to(
            connection_id,
            ChannelEvent::Joined {
                shipment_id,
                viewer_count: outcome.viewer_count,
                timestamp: now,
            },
        );

        let arrival = ChannelEvent::WatcherArrived {
            user: WatcherRef::from(&identity),
            connection_id,
            timestamp: now,
        };
        for other in outcome.others {
            self.send_to(other, arrival.clone());
        }
    }

    /// Remove a connection from a shipment room.
    ///
    /// Idempotent: leaving a room the connection is not in is a silent
    /// no-op. The departing connection is not notified of its own leave.
    pub fn leave(&self, connection_id: ConnectionId, shipment_id: ShipmentId) {
        let Some(identity) = self.identity_for(connection_id) else {
            return;
        };
        let Some(outcome) = self.registry.leave(connection_id, shipment_id) else {
            return;
        };
        debug!(
            connection_id = %connection_id,
            shipment_id = %shipment_id,
            viewer_count = outcome.viewer_count,
            "Left shipment room"
        );
        self.notify_departure(&identity, outcome.viewer_count, &outcome.remaining);
    }

    /// Tear down a connection: drop its outbox and sweep it out of every
    /// room it was watching, notifying the remaining watchers of each.
    ///
    /// Must be called on every exit path of the socket loop, including
    /// abrupt network loss.
    pub fn disconnect(&self, connection_id: ConnectionId) {
        // Drop the outbox first so the sweep's notices cannot loop back to
        // the departing connection.
        let identity = self
            .connections
            .remove(&connection_id)
            .map(|(_, handle)| handle.identity);
        let departures = self.registry.disconnect(connection_id);
        debug!(
            connection_id = %connection_id,
            affected_rooms = departures.len(),
            "Connection disconnected"
        );
        let Some(identity) = identity else {
            return;
        };
        for departure in departures {
            self.notify_departure(&identity, departure.viewer_count, &departure.remaining);
        }
    }

    /// Broadcast to every watcher of a shipment. No-op with zero watchers.
    pub fn broadcast(&self, shipment_id: ShipmentId, event: ChannelEvent) {
        let event = event.stamped(chrono::Utc::now());
        let event_type = event.event_type();
        let mut receivers = 0usize;
        self.registry.with_watchers(shipment_id, |connection_id| {
            self.send_to(connection_id, event.clone());
            receivers += 1;
        });
        if receivers == 0 {
            debug!(shipment_id = %shipment_id, event_type, "No watchers for event");
        } else {
            debug!(shipment_id = %shipment_id, event_type, receivers, "Broadcast event");
        }
    }

    /// Broadcast to every live connection regardless of room membership.
    pub fn broadcast_global(&self, event: ChannelEvent) {
        let event = event.stamped(chrono::Utc::now());
        let event_type = event.event_type();
        let mut receivers = 0usize;
        for handle in self.connections.iter() {
            if handle.outbox.send(event.clone()).is_ok() {
                receivers += 1;
            }
        }
        debug!(event_type, receivers, "Broadcast global event");
    }

    /// Surface a channel-level error to one connection, leaving it open.
    pub fn send_error(&self, connection_id: ConnectionId, message: impl Into<String>) {
        self.send_to(
            connection_id,
            ChannelEvent::Error {
                message: message.into(),
            },
        );
    }

    /// Current viewer count for a shipment room.
    pub fn viewer_count(&self, shipment_id: ShipmentId) -> usize {
        self.registry.viewer_count(shipment_id)
    }

    fn identity_for(&self, connection_id: ConnectionId) -> Option<ConnectionIdentity> {
        self.connections
            .get(&connection_id)
            .map(|handle| handle.identity.clone())
    }

    fn notify_departure(
        &self,
        identity: &ConnectionIdentity,
        viewer_count: usize,
        remaining: &[ConnectionId],
    ) {
        let notice = ChannelEvent::WatcherDeparted {
            user: WatcherRef::from(identity),
            connection_id: identity.connection_id,
            viewer_count,
            timestamp: chrono::Utc::now(),
        };
        // The departed connection is never in `remaining`; it is already gone.
        for watcher in remaining {
            self.send_to(*watcher, notice.clone());
        }
    }

    fn send_to(&self, connection_id: ConnectionId, event: ChannelEvent) {
        let Some(handle) = self.connections.get(&connection_id) else {
            return;
        };
        let event_type = event.event_type();
        if handle.outbox.send(event).is_err() {
            warn!(
                connection_id = %connection_id,
                event_type,
                "Failed to deliver event; receiver dropped"
            );
        }
    }
}

impl Broadcaster for ChannelManager {
    fn publish(&self, shipment_id: ShipmentId, event: ChannelEvent) {
        self.broadcast(shipment_id, event);
    }

    fn publish_global(&self, event: ChannelEvent) {
        self.broadcast_global(event);
    }
}
