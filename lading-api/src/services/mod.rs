//! Service Layer
//!
//! Workflow orchestration: each operation loads the record, asks the
//! engine for the transition, persists the result, and only then notifies
//! the watchers. A rejected transition returns before any broadcast.

mod shipment_service;

pub use shipment_service::*;
