//! Error types for the taint store.

use thiserror::Error;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in the taint store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The on-disk store is corrupted and cannot be used.
    #[error("store corrupted at {path}: {message}")]
    Corrupt {
        /// Directory of the broken store.
        path: String,
        /// Backend diagnostic.
        message: String,
    },

    /// A backend read or write failed.
    #[error("storage backend error: {0}")]
    Backend(String),

    /// A stored value failed to decode.
    #[error("value decode failed for key {key}: {source}")]
    Codec {
        /// Key whose value failed to decode.
        key: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A value failed to encode.
    #[error("value encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// Store directory could not be created.
    #[error("store path error: {0}")]
    Path(#[from] std::io::Error),
}

impl From<rocksdb::Error> for StoreError {
    fn from(e: rocksdb::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

impl StoreError {
    /// Whether retrying the same operation can succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Backend(_))
    }
}
