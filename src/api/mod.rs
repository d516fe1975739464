//! HTTP API for the tedit relay
//!
//! - `health`: Liveness endpoint
//! - `snapshots`: Document snapshot storage (GET/POST per document)

mod health;
mod snapshots;

pub use health::health_routes;
pub use snapshots::{snapshot_routes, SnapshotStore};
