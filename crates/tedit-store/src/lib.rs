//! Tedit Store - Persistence and Restore Plumbing
//!
//! This crate provides the durable side of tedit:
//! - Codec: PNG data-URL encoding/decoding of raster buffers
//! - Snapshot: The flattened document payload shared by cache, remote
//!   store and the sync catch-up handshake
//! - Cache: SQLite key/value store, the durable offline fallback
//! - Remote: HTTP client for the document snapshot service
//! - Persist: Cache-first, best-effort-remote persister with debounce
//!
//! The remote store is a mirror: its failures are logged and never block
//! local operation.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
pub mod codec;
pub mod error;
pub mod persist;
pub mod remote;
pub mod snapshot;

// Re-export main types
pub use cache::LocalCache;
pub use codec::{decode_data_url, encode_png_data_url};
pub use error::{Error, Result};
pub use persist::Persister;
pub use remote::{RemoteStore, SnapshotFetch, SnapshotPayload};
pub use snapshot::DocumentSnapshot;
