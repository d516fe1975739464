//! Error types for tedit-sync

use thiserror::Error;

/// Sync error type
#[derive(Debug, Error)]
pub enum Error {
    /// Connection could not be established
    #[error("connect failed: {0}")]
    Connect(String),

    /// Operation attempted without a live connection
    #[error("not connected")]
    NotConnected,

    /// Outgoing message could not be sent
    #[error("send failed: {0}")]
    Send(String),

    /// Malformed wire message
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Protocol(err.to_string())
    }
}

/// Result type alias for sync operations
pub type Result<T> = std::result::Result<T, Error>;
