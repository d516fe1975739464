//! Error types for tedit-editor

use thiserror::Error;

/// Editor error type
#[derive(Debug, Error)]
pub enum Error {
    /// Raster engine error
    #[error(transparent)]
    Engine(#[from] tedit_engine::Error),

    /// Persistence error
    #[error(transparent)]
    Store(#[from] tedit_store::Error),

    /// Sync error
    #[error(transparent)]
    Sync(#[from] tedit_sync::Error),

    /// Malformed color string on an incoming draw event
    #[error("invalid color: {0}")]
    InvalidColor(String),
}

/// Result type alias for editor operations
pub type Result<T> = std::result::Result<T, Error>;
