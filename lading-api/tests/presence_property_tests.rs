//! Property-Based Tests for Presence Bookkeeping
//!
//! **Property: Inverse-Index Consistency**
//!
//! After any sequence of join/leave/disconnect calls, the shipment →
//! connections and connection → shipments indexes SHALL be mutually
//! consistent, and empty sets SHALL be pruned from both sides.

use lading_api::{ConnectionIdentity, PresenceRegistry};
use lading_core::ShipmentId;
use proptest::prelude::*;
use uuid::Uuid;

#[path = "support/presence.rs"]
mod presence_support;
use presence_support::assert_presence_consistent;

const POOL: usize = 5;

/// One step of a randomized presence session, indexing into small pools of
/// connections and shipments so collisions (re-joins, double leaves,
/// repeated disconnects) actually happen.
#[derive(Debug, Clone)]
enum Step {
    Join { conn: usize, shipment: usize },
    Leave { conn: usize, shipment: usize },
    Disconnect { conn: usize },
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => (0..POOL, 0..POOL).prop_map(|(conn, shipment)| Step::Join { conn, shipment }),
        2 => (0..POOL, 0..POOL).prop_map(|(conn, shipment)| Step::Leave { conn, shipment }),
        1 => (0..POOL).prop_map(|conn| Step::Disconnect { conn }),
    ]
}

fn pools() -> (Vec<ConnectionIdentity>, Vec<ShipmentId>) {
    let identities = (0..POOL).map(|_| ConnectionIdentity::guest()).collect();
    let shipments = (0..POOL).map(|_| Uuid::now_v7()).collect();
    (identities, shipments)
}

proptest! {
    /// The dual index survives arbitrary operation sequences.
    #[test]
    fn indexes_stay_consistent(steps in proptest::collection::vec(step_strategy(), 1..80)) {
        let registry = PresenceRegistry::new();
        let (identities, shipments) = pools();

        for step in steps {
            match step {
                Step::Join { conn, shipment } => {
                    registry.join(&identities[conn], shipments[shipment]);
                }
                Step::Leave { conn, shipment } => {
                    registry.leave(identities[conn].connection_id, shipments[shipment]);
                }
                Step::Disconnect { conn } => {
                    registry.disconnect(identities[conn].connection_id);
                }
            }
            assert_presence_consistent(&registry);
        }
    }

    /// Viewer counts always equal the watcher index row size.
    #[test]
    fn viewer_count_matches_index(steps in proptest::collection::vec(step_strategy(), 1..80)) {
        let registry = PresenceRegistry::new();
        let (identities, shipments) = pools();

        for step in steps {
            match step {
                Step::Join { conn, shipment } => {
                    registry.join(&identities[conn], shipments[shipment]);
                }
                Step::Leave { conn, shipment } => {
                    registry.leave(identities[conn].connection_id, shipments[shipment]);
                }
                Step::Disconnect { conn } => {
                    registry.disconnect(identities[conn].connection_id);
                }
            }
        }

        let snapshot = registry.snapshot();
        for shipment_id in &shipments {
            let expected = snapshot.watchers.get(shipment_id).map_or(0, |room| room.len());
            prop_assert_eq!(registry.viewer_count(*shipment_id), expected);
        }
    }

    /// A second identical leave never changes state.
    #[test]
    fn leave_is_idempotent(
        steps in proptest::collection::vec(step_strategy(), 0..40),
        conn in 0..POOL,
        shipment in 0..POOL,
    ) {
        let registry = PresenceRegistry::new();
        let (identities, shipments) = pools();

        for step in steps {
            match step {
                Step::Join { conn, shipment } => {
                    registry.join(&identities[conn], shipments[shipment]);
                }
                Step::Leave { conn, shipment } => {
                    registry.leave(identities[conn].connection_id, shipments[shipment]);
                }
                Step::Disconnect { conn } => {
                    registry.disconnect(identities[conn].connection_id);
                }
            }
        }

        registry.leave(identities[conn].connection_id, shipments[shipment]);
        let after_first = registry.snapshot();
        let second = registry.leave(identities[conn].connection_id, shipments[shipment]);
        prop_assert!(second.is_none());
        prop_assert_eq!(registry.snapshot(), after_first);
    }
}
