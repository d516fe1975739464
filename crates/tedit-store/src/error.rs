//! Error types for tedit-store

use thiserror::Error;

/// Store error type
#[derive(Debug, Error)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// Remote store unreachable or returned an error
    #[error("remote store error: {0}")]
    Remote(String),

    /// Stored image could not be decoded
    #[error("decode error: {0}")]
    Decode(String),

    /// Buffer could not be encoded
    #[error("encode error: {0}")]
    Encode(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Transient errors degrade to the cache fallback and continue.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Remote(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, Error>;
