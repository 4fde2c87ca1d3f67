//! LADING API - Real-Time Shipment Channel Layer
//!
//! This crate provides the real-time side of the LADING shipment tracker:
//! WebSocket connections are authenticated, joined to per-shipment rooms,
//! and fed every state change the workflow service produces, so connected
//! viewers stay synchronized without polling.
//!
//! The workflow operations themselves live in [`services`] and are exposed
//! to the (external) HTTP CRUD layer as plain function calls.

pub mod auth;
pub mod channel;
pub mod config;
pub mod error;
pub mod events;
pub mod presence;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
pub mod traits;
pub mod ws;

// Re-export commonly used types
pub use auth::{
    authenticate, generate_token, validate_token, AuthConfig, Claims, ConnectionId,
    ConnectionIdentity, FixedClock, JwtClock, JwtSecret, Role, SystemClock,
};
pub use channel::{Broadcaster, ChannelManager};
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use events::{ChannelEvent, ClientRequest, WatcherRef};
pub use presence::{Departure, JoinOutcome, LeaveOutcome, PresenceRegistry, PresenceSnapshot};
pub use routes::create_api_router;
pub use state::AppState;
pub use store::InMemoryShipmentStore;
pub use traits::ShipmentStore;
