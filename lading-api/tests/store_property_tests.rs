//! Property-Based Tests for the In-Memory Shipment Store
//!
//! **Property: Repository Contract**
//!
//! Inserted records round-trip by id and by order reference, order
//! references stay unique, and `list` reflects exactly the inserted set.

use lading_api::{ErrorCode, InMemoryShipmentStore, ShipmentStore};
use lading_test_utils::generators::arb_shipment;
use proptest::prelude::*;
use std::collections::HashSet;

proptest! {
    #[test]
    fn inserted_shipments_round_trip(shipments in proptest::collection::vec(arb_shipment(), 1..8)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime");
        runtime.block_on(async {
            let store = InMemoryShipmentStore::new();
            let mut seen_refs = HashSet::new();

            for shipment in &shipments {
                let result = store.insert(shipment.clone()).await;
                if seen_refs.insert(shipment.order_ref.clone()) {
                    let inserted = result.expect("unique order ref must insert");

                    let by_id = store.get(inserted.shipment_id).await.expect("get by id");
                    assert_eq!(by_id, inserted);

                    let by_ref = store
                        .find_by_order_ref(&inserted.order_ref)
                        .await
                        .expect("lookup by order ref");
                    assert_eq!(by_ref.as_ref().map(|s| s.shipment_id), Some(inserted.shipment_id));
                } else {
                    let err = result.expect_err("duplicate order ref must be rejected");
                    assert_eq!(err.code, ErrorCode::DuplicateOrderRef);
                }
            }

            let listed = store.list().await.expect("list");
            assert_eq!(listed.len(), seen_refs.len());
        });
    }
}
