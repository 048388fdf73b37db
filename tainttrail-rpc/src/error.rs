//! Error types for the node client.

use thiserror::Error;

/// Result type for node operations.
pub type Result<T> = std::result::Result<T, NodeError>;

/// Bitcoin Core RPC error code for "invalid address or key" (unknown hash).
const RPC_INVALID_ADDRESS_OR_KEY: i32 = -5;
/// Bitcoin Core RPC error code for "invalid parameter" (height out of range).
const RPC_INVALID_PARAMETER: i32 = -8;
/// Bitcoin Core RPC error code while the node is warming up.
const RPC_IN_WARMUP: i32 = -28;
/// JSON-RPC error code for an unknown method.
const RPC_METHOD_NOT_FOUND: i32 = -32601;

/// Errors that can occur talking to the node.
#[derive(Debug, Error)]
pub enum NodeError {
    /// The node could not be reached (connect, transport, timeout).
    #[error("node unreachable: {0}")]
    Unreachable(String),

    /// The node is still in initial block download.
    #[error("node is still in initial block download")]
    Syncing,

    /// The node is warming up and will accept calls shortly.
    #[error("node warming up: {0}")]
    Warmup(String),

    /// The requested block or transaction does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The node serves a different chain than configured.
    #[error("wrong chain: expected {expected}, got {got}")]
    WrongChain {
        /// Configured network.
        expected: String,
        /// Network the node reported.
        got: String,
    },

    /// The node has no transaction index.
    #[error("transaction index unavailable: {0}")]
    MissingTxIndex(String),

    /// The node does not know the requested RPC method.
    #[error("node does not support {0}")]
    Unsupported(String),

    /// Any other RPC-level failure.
    #[error("RPC call failed: {0}")]
    RpcCall(String),

    /// The node's response did not decode.
    #[error("invalid node response: {0}")]
    InvalidResponse(String),

    /// Client configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal client failure (task join, closed limiter).
    #[error("internal error: {0}")]
    Internal(String),
}

impl NodeError {
    /// Whether retrying the same call can succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, NodeError::Unreachable(_) | NodeError::Warmup(_))
    }
}

impl From<bitcoincore_rpc::Error> for NodeError {
    fn from(e: bitcoincore_rpc::Error) -> Self {
        use bitcoincore_rpc::jsonrpc::error::Error as JsonRpcError;

        match e {
            bitcoincore_rpc::Error::JsonRpc(JsonRpcError::Rpc(rpc)) => match rpc.code {
                RPC_INVALID_ADDRESS_OR_KEY | RPC_INVALID_PARAMETER => {
                    NodeError::NotFound(rpc.message)
                }
                RPC_IN_WARMUP => NodeError::Warmup(rpc.message),
                RPC_METHOD_NOT_FOUND => NodeError::Unsupported(rpc.message),
                code => NodeError::RpcCall(format!("{} (code {code})", rpc.message)),
            },
            bitcoincore_rpc::Error::JsonRpc(JsonRpcError::Transport(e)) => {
                NodeError::Unreachable(e.to_string())
            }
            bitcoincore_rpc::Error::JsonRpc(JsonRpcError::Json(e)) => {
                NodeError::InvalidResponse(e.to_string())
            }
            bitcoincore_rpc::Error::JsonRpc(e) => NodeError::RpcCall(e.to_string()),
            bitcoincore_rpc::Error::Json(e) => NodeError::InvalidResponse(e.to_string()),
            bitcoincore_rpc::Error::Io(e) => NodeError::Unreachable(e.to_string()),
            other => NodeError::RpcCall(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoincore_rpc::jsonrpc;

    fn rpc_error(code: i32, message: &str) -> bitcoincore_rpc::Error {
        bitcoincore_rpc::Error::JsonRpc(jsonrpc::error::Error::Rpc(jsonrpc::error::RpcError {
            code,
            message: message.to_string(),
            data: None,
        }))
    }

    #[test]
    fn not_found_codes() {
        assert!(matches!(
            NodeError::from(rpc_error(-5, "Block not found")),
            NodeError::NotFound(_)
        ));
        assert!(matches!(
            NodeError::from(rpc_error(-8, "Block height out of range")),
            NodeError::NotFound(_)
        ));
    }

    #[test]
    fn warmup_is_transient() {
        let err = NodeError::from(rpc_error(-28, "Loading block index..."));
        assert!(matches!(err, NodeError::Warmup(_)));
        assert!(err.is_transient());
    }

    #[test]
    fn method_not_found_maps_to_unsupported() {
        assert!(matches!(
            NodeError::from(rpc_error(-32601, "Method not found")),
            NodeError::Unsupported(_)
        ));
    }

    #[test]
    fn not_found_is_not_transient() {
        assert!(!NodeError::NotFound("x".into()).is_transient());
        assert!(NodeError::Unreachable("x".into()).is_transient());
    }
}
