//! Storage seam for shipment records.
//!
//! Persistence is an external collaborator: the workflow service only ever
//! talks to this trait, so any backing store (Postgres, the in-memory test
//! store) can sit behind it.

use crate::error::ApiResult;
use async_trait::async_trait;
use lading_core::{Shipment, ShipmentId};

/// Repository of shipment records.
#[async_trait]
pub trait ShipmentStore: Send + Sync {
    /// Load a shipment by id; `ShipmentNotFound` when absent.
    async fn get(&self, shipment_id: ShipmentId) -> ApiResult<Shipment>;

    /// Insert a new shipment; `DuplicateOrderRef` when the order reference
    /// is already taken.
    async fn insert(&self, shipment: Shipment) -> ApiResult<Shipment>;

    /// Persist an updated shipment; `ShipmentNotFound` when absent.
    async fn update(&self, shipment: Shipment) -> ApiResult<Shipment>;

    /// Look up a shipment by its unique order reference.
    async fn find_by_order_ref(&self, order_ref: &str) -> ApiResult<Option<Shipment>>;

    /// All shipments, unordered.
    async fn list(&self) -> ApiResult<Vec<Shipment>>;
}
