//! Error type for store operations.

use thiserror::Error;

/// Errors raised by [`crate::Store`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to (de)serialize record: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("could not acquire exclusive lock on store at {0}")]
    Locked(String),
}
