//! Presence Registry
//!
//! In-memory bookkeeping of which connections are watching which
//! shipments, held as two inverse indexes: shipment → watching connection
//! ids, and connection → watched shipment ids. Both sides are owned by one
//! structure and only ever touched through paired insert/remove helpers,
//! so they cannot drift apart.
//!
//! All mutations are synchronous, non-blocking data-structure operations
//! executed under a single lock: once a mutation starts it runs to
//! completion without a suspension point, which is what keeps the inverse
//! indexes mutually consistent under concurrent handlers.
//!
//! The registry is constructed once at process startup and passed by
//! reference into the channel manager; its lifecycle is bound to the
//! server process and nothing here is persisted.

use crate::auth::{ConnectionId, ConnectionIdentity};
use lading_core::ShipmentId;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

// ============================================================================
// OUTCOMES
// ============================================================================

/// Result of a join: the post-join viewer count plus the snapshot of the
/// *other* watchers to notify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    pub viewer_count: usize,
    /// False when the connection had already joined this shipment. The
    /// confirmation and arrival notices are still emitted; clients must
    /// tolerate duplicates.
    pub newly_joined: bool,
    pub others: Vec<ConnectionId>,
}

/// Result of a leave that actually removed a member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveOutcome {
    pub viewer_count: usize,
    pub remaining: Vec<ConnectionId>,
}

/// One shipment affected by a disconnect sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub shipment_id: ShipmentId,
    pub viewer_count: usize,
    pub remaining: Vec<ConnectionId>,
}

/// Read-only copy of both indexes, for diagnostics and invariant checks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresenceSnapshot {
    pub watchers: HashMap<ShipmentId, HashSet<ConnectionId>>,
    pub watching: HashMap<ConnectionId, HashSet<ShipmentId>>,
}

// ============================================================================
// REGISTRY
// ============================================================================

#[derive(Debug, Default)]
struct PresenceMaps {
    /// shipment → connections currently watching it
    watchers: HashMap<ShipmentId, HashSet<ConnectionId>>,
    /// connection → identity + shipments it watches
    connections: HashMap<ConnectionId, ConnectionEntry>,
}

#[derive(Debug)]
struct ConnectionEntry {
    identity: ConnectionIdentity,
    shipments: HashSet<ShipmentId>,
}

/// Live presence state for one server process.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    inner: Mutex<PresenceMaps>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn maps(&self) -> MutexGuard<'_, PresenceMaps> {
        // Mutations never panic mid-update, so a poisoned lock still holds
        // consistent maps; recover the guard.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a shipment to a connection's watch set.
    ///
    /// Idempotent: re-joining an already-joined shipment changes nothing
    /// in the indexes but still reports the outcome so the caller can
    /// re-emit the confirmation and arrival notices.
    pub fn join(&self, identity: &ConnectionIdentity, shipment_id: ShipmentId) -> JoinOutcome {
        let mut guard = self.maps();
        let maps = &mut *guard;
        let connection_id = identity.connection_id;

        let entry = maps
            .connections
            .entry(connection_id)
            .or_insert_with(|| ConnectionEntry {
                identity: identity.clone(),
                shipments: HashSet::new(),
            });
        let newly_joined = entry.shipments.insert(shipment_id);

        let room = maps.watchers.entry(shipment_id).or_default();
        room.insert(connection_id);

        let viewer_count = room.len();
        let others = room
            .iter()
            .copied()
            .filter(|id| *id != connection_id)
            .collect();

        JoinOutcome {
            viewer_count,
            newly_joined,
            others,
        }
    }

    /// Remove a shipment from a connection's watch set.
    ///
    /// Returns `None` when the connection was not a member; that case is a
    /// silent no-op with no notices.
    pub fn leave(
        &self,
        connection_id: ConnectionId,
        shipment_id: ShipmentId,
    ) -> Option<LeaveOutcome> {
        let mut maps = self.maps();
        if !maps
            .connections
            .get(&connection_id)
            .is_some_and(|entry| entry.shipments.contains(&shipment_id))
        {
            return None;
        }
        Some(remove_membership(&mut maps, connection_id, shipment_id))
    }

    /// Remove the connection from every shipment it was watching, in one
    /// atomic sweep, and drop its entry entirely.
    ///
    /// Runs for abrupt network loss too, when the connection never
    /// explicitly left any room.
    pub fn disconnect(&self, connection_id: ConnectionId) -> Vec<Departure> {
        let mut maps = self.maps();
        let Some(entry) = maps.connections.get(&connection_id) else {
            return Vec::new();
        };

        let mut watched: Vec<ShipmentId> = entry.shipments.iter().copied().collect();
        watched.sort_unstable();

        let mut departures = Vec::with_capacity(watched.len());
        for shipment_id in watched {
            let outcome = remove_membership(&mut maps, connection_id, shipment_id);
            departures.push(Departure {
                shipment_id,
                viewer_count: outcome.viewer_count,
                remaining: outcome.remaining,
            });
        }

        departures
    }

    // ========================================================================
    // Read-only queries
    // ========================================================================

    /// Number of connections currently watching the shipment.
    pub fn viewer_count(&self, shipment_id: ShipmentId) -> usize {
        self.maps()
            .watchers
            .get(&shipment_id)
            .map_or(0, |room| room.len())
    }

    /// Shipments the connection is currently watching.
    pub fn watched_shipments(&self, connection_id: ConnectionId) -> Vec<ShipmentId> {
        self.maps()
            .connections
            .get(&connection_id)
            .map(|entry| entry.shipments.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Identity that owns the connection, if it is known to the registry.
    pub fn identity_of(&self, connection_id: ConnectionId) -> Option<ConnectionIdentity> {
        self.maps()
            .connections
            .get(&connection_id)
            .map(|entry| entry.identity.clone())
    }

    /// Run `f` for every watcher of the shipment while holding the
    /// presence lock. Fan-out through this keeps per-room delivery order
    /// equal to call order.
    pub fn with_watchers<F: FnMut(ConnectionId)>(&self, shipment_id: ShipmentId, mut f: F) {
        let maps = self.maps();
        if let Some(room) = maps.watchers.get(&shipment_id) {
            for connection_id in room {
                f(*connection_id);
            }
        }
    }

    /// Read-only copy of both indexes.
    pub fn snapshot(&self) -> PresenceSnapshot {
        let maps = self.maps();
        PresenceSnapshot {
            watchers: maps.watchers.clone(),
            watching: maps
                .connections
                .iter()
                .map(|(id, entry)| (*id, entry.shipments.clone()))
                .collect(),
        }
    }
}

/// Remove one (connection, shipment) pair from both indexes, pruning empty
/// sets. Caller guarantees the pair exists.
fn remove_membership(
    maps: &mut PresenceMaps,
    connection_id: ConnectionId,
    shipment_id: ShipmentId,
) -> LeaveOutcome {
    if let Some(entry) = maps.connections.get_mut(&connection_id) {
        entry.shipments.remove(&shipment_id);
        if entry.shipments.is_empty() {
            // Empty watch sets are deleted, not kept as placeholders; a
            // later join re-inserts the entry from the identity it carries.
            maps.connections.remove(&connection_id);
        }
    }

    let (viewer_count, remaining) = match maps.watchers.get_mut(&shipment_id) {
        Some(room) => {
            room.remove(&connection_id);
            if room.is_empty() {
                // Empty rooms are deleted, not kept as placeholders.
                maps.watchers.remove(&shipment_id);
                (0, Vec::new())
            } else {
                (room.len(), room.iter().copied().collect())
            }
        }
        None => (0, Vec::new()),
    };

    LeaveOutcome {
        viewer_count,
        remaining,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::ConnectionIdentity;
    use uuid::Uuid;

    fn shipment() -> ShipmentId {
        Uuid::now_v7()
    }

    #[test]
    fn join_reports_count_and_others() {
        let registry = PresenceRegistry::new();
        let a = ConnectionIdentity::guest();
        let b = ConnectionIdentity::guest();
        let s = shipment();

        let first = registry.join(&a, s);
        assert_eq!(first.viewer_count, 1);
        assert!(first.newly_joined);
        assert!(first.others.is_empty());

        let second = registry.join(&b, s);
        assert_eq!(second.viewer_count, 2);
        assert_eq!(second.others, vec![a.connection_id]);
    }

    #[test]
    fn duplicate_join_is_data_noop_but_still_reported() {
        let registry = PresenceRegistry::new();
        let a = ConnectionIdentity::guest();
        let s = shipment();

        registry.join(&a, s);
        let again = registry.join(&a, s);
        assert!(!again.newly_joined);
        assert_eq!(again.viewer_count, 1);
        assert_eq!(registry.viewer_count(s), 1);
    }

    #[test]
    fn leave_twice_is_idempotent() {
        let registry = PresenceRegistry::new();
        let a = ConnectionIdentity::guest();
        let b = ConnectionIdentity::guest();
        let s = shipment();
        registry.join(&a, s);
        registry.join(&b, s);

        let first = registry.leave(a.connection_id, s);
        assert_eq!(first.map(|o| o.viewer_count), Some(1));

        // Second leave is a silent no-op and the count is unaffected.
        assert!(registry.leave(a.connection_id, s).is_none());
        assert_eq!(registry.viewer_count(s), 1);
    }

    #[test]
    fn leave_of_non_member_is_silent() {
        let registry = PresenceRegistry::new();
        let a = ConnectionIdentity::guest();
        assert!(registry.leave(a.connection_id, shipment()).is_none());
    }

    #[test]
    fn disconnect_sweeps_every_watched_shipment() {
        let registry = PresenceRegistry::new();
        let a = ConnectionIdentity::guest();
        let b = ConnectionIdentity::guest();
        let (s1, s2, s3) = (shipment(), shipment(), shipment());

        registry.join(&a, s1);
        registry.join(&a, s2);
        registry.join(&a, s3);
        registry.join(&b, s2);

        let departures = registry.disconnect(a.connection_id);
        assert_eq!(departures.len(), 3);
        for departure in &departures {
            if departure.shipment_id == s2 {
                assert_eq!(departure.viewer_count, 1);
                assert_eq!(departure.remaining, vec![b.connection_id]);
            } else {
                assert_eq!(departure.viewer_count, 0);
            }
        }

        assert!(registry.watched_shipments(a.connection_id).is_empty());
        assert!(registry.identity_of(a.connection_id).is_none());
    }

    #[test]
    fn disconnect_of_unknown_connection_is_empty_sweep() {
        let registry = PresenceRegistry::new();
        assert!(registry.disconnect(Uuid::now_v7()).is_empty());
    }

    #[test]
    fn empty_sets_are_pruned_from_both_indexes() {
        let registry = PresenceRegistry::new();
        let a = ConnectionIdentity::guest();
        let s = shipment();

        registry.join(&a, s);
        registry.leave(a.connection_id, s);

        let snapshot = registry.snapshot();
        assert!(snapshot.watchers.is_empty());
        assert!(snapshot.watching.is_empty());

        // Re-joining after a full prune works from the carried identity.
        let rejoined = registry.join(&a, s);
        assert_eq!(rejoined.viewer_count, 1);
        assert!(rejoined.newly_joined);
    }

    #[test]
    fn viewer_count_for_unknown_shipment_is_zero() {
        let registry = PresenceRegistry::new();
        assert_eq!(registry.viewer_count(shipment()), 0);
    }
}
