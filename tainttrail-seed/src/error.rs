//! Error types for seed materialization.

use thiserror::Error;

/// Result type for seed operations.
pub type Result<T> = std::result::Result<T, SeedError>;

/// Errors that can occur while materializing the seed set.
#[derive(Debug, Error)]
pub enum SeedError {
    /// A node call failed after retries.
    #[error("node error: {0}")]
    Node(#[from] tainttrail_rpc::NodeError),

    /// A store operation failed.
    #[error("store error: {0}")]
    Store(#[from] tainttrail_store::StoreError),

    /// A fetched block was malformed.
    #[error("bad block data: {0}")]
    Data(String),

    /// A fetch task died.
    #[error("internal error: {0}")]
    Internal(String),
}
