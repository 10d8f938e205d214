//! Error types for store operations.

use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while talking to a remote or settings store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The remote backend could not be reached.
    #[error("remote store unavailable: {0}")]
    Unavailable(String),

    /// The remote backend rejected or failed the request.
    #[error("backend error: {0}")]
    Backend(String),

    /// A listen/subscription channel reported an error.
    #[error("listen error: {0}")]
    Listen(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Persisted data could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
