//! Shared application state for Axum routers.

use std::sync::Arc;

use crate::auth::AuthConfig;
use crate::channel::ChannelManager;
use crate::traits::ShipmentStore;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// Shipment repository; an external collaborator behind the
    /// `ShipmentStore` seam.
    pub store: Arc<dyn ShipmentStore>,

    /// Channel manager owning live connections and shipment rooms.
    pub manager: Arc<ChannelManager>,

    /// Handshake authentication configuration.
    pub auth: AuthConfig,

    pub start_time: std::time::Instant,
}
