//! In-memory shipment store.
//!
//! Backs the development server and the test suites. Production deploys
//! substitute a database-backed implementation of `ShipmentStore`.

use crate::error::{ApiError, ApiResult};
use crate::traits::ShipmentStore;
use async_trait::async_trait;
use lading_core::{Shipment, ShipmentId};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// `ShipmentStore` over a process-local map.
#[derive(Debug, Default)]
pub struct InMemoryShipmentStore {
    inner: RwLock<HashMap<ShipmentId, Shipment>>,
}

impl InMemoryShipmentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ShipmentStore for InMemoryShipmentStore {
    async fn get(&self, shipment_id: ShipmentId) -> ApiResult<Shipment> {
        self.inner
            .read()
            .await
            .get(&shipment_id)
            .cloned()
            .ok_or_else(|| ApiError::shipment_not_found(shipment_id))
    }

    async fn insert(&self, shipment: Shipment) -> ApiResult<Shipment> {
        let mut map = self.inner.write().await;
        if map.values().any(|s| s.order_ref == shipment.order_ref) {
            return Err(ApiError::duplicate_order_ref(&shipment.order_ref));
        }
        map.insert(shipment.shipment_id, shipment.clone());
        Ok(shipment)
    }

    async fn update(&self, shipment: Shipment) -> ApiResult<Shipment> {
        let mut map = self.inner.write().await;
        if !map.contains_key(&shipment.shipment_id) {
            return Err(ApiError::shipment_not_found(shipment.shipment_id));
        }
        map.insert(shipment.shipment_id, shipment.clone());
        Ok(shipment)
    }

    async fn find_by_order_ref(&self, order_ref: &str) -> ApiResult<Option<Shipment>> {
        Ok(self
            .inner
            .read()
            .await
            .values()
            .find(|s| s.order_ref == order_ref)
            .cloned())
    }

    async fn list(&self) -> ApiResult<Vec<Shipment>> {
        Ok(self.inner.read().await.values().cloned().collect())
    }
}
