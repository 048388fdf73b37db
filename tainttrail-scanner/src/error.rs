//! Error types for the scanner.

use thiserror::Error;

/// Result type for scanner operations.
pub type Result<T> = std::result::Result<T, ScanError>;

/// Errors that can occur while scanning.
#[derive(Debug, Error)]
pub enum ScanError {
    /// A node call failed after retries.
    #[error("node error: {0}")]
    Node(#[from] tainttrail_rpc::NodeError),

    /// A store operation failed.
    #[error("store error: {0}")]
    Store(#[from] tainttrail_store::StoreError),

    /// A block did not have the expected shape.
    #[error("bad block data: {0}")]
    Data(String),

    /// A store invariant would be violated; indicates corruption.
    ///
    /// The scanner aborts on these instead of writing through them.
    #[error("invariant violation: {0}")]
    Invariant(String),
}

impl ScanError {
    /// Whether the outer loop may retry after backing off.
    ///
    /// Everything except an invariant violation is recoverable: transient
    /// node and store failures retry the same height on the next tick.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ScanError::Invariant(_))
    }
}
