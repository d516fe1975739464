//! Tedit Sync - Real-Time Document Synchronization
//!
//! This crate provides the collaboration layer of tedit:
//! - Protocol: Client/server message types for the relay WebSocket API
//! - Room: Document-keyed membership registry with empty-room teardown
//! - Relay: Axum WebSocket handler that fans events out to room peers
//! - Client: Reconnecting WebSocket client used by editor sessions
//!
//! The relay does not interpret canvas content. It routes draw events and
//! snapshot payloads between the peers of a document room; convergence is
//! the editors' job.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod error;
pub mod protocol;
pub mod relay;
pub mod room;

// Re-export main types
pub use client::{ClientConfig, SyncClient};
pub use error::{Error, Result};
pub use protocol::{BlendOp, ClientMessage, ServerMessage, StrokeCap, WirePoint};
pub use relay::{relay_ws_handler, RelayBroadcast, RelayState};
pub use room::RoomRegistry;
