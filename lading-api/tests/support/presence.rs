//! Shared presence invariant checker.

use lading_api::PresenceRegistry;

/// Assert the two inverse indexes are mutually consistent: every
/// connection listed under a shipment also lists that shipment, and vice
/// versa, with no empty placeholder sets on either side.
pub fn assert_presence_consistent(registry: &PresenceRegistry) {
    let snapshot = registry.snapshot();

    for (shipment_id, room) in &snapshot.watchers {
        assert!(
            !room.is_empty(),
            "shipment {shipment_id} kept as an empty placeholder"
        );
        for connection_id in room {
            let watched = snapshot
                .watching
                .get(connection_id)
                .unwrap_or_else(|| panic!("connection {connection_id} missing from inverse index"));
            assert!(
                watched.contains(shipment_id),
                "connection {connection_id} listed under {shipment_id} but not inversely"
            );
        }
    }

    for (connection_id, watched) in &snapshot.watching {
        assert!(
            !watched.is_empty(),
            "connection {connection_id} kept as an empty placeholder"
        );
        for shipment_id in watched {
            let room = snapshot
                .watchers
                .get(shipment_id)
                .unwrap_or_else(|| panic!("shipment {shipment_id} missing from watcher index"));
            assert!(
                room.contains(connection_id),
                "connection {connection_id} watches {shipment_id} but is not in its room"
            );
        }
    }
}
