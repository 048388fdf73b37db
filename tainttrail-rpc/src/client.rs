//! The retrying, concurrency-limited node client.

use std::sync::Arc;
use std::time::Duration;

use bitcoincore_rpc::jsonrpc;
use bitcoincore_rpc::{Client, RpcApi};
use rand::Rng;
use serde_json::{json, Value};
use tokio::sync::Semaphore;
use tokio::task::spawn_blocking;
use tracing::{info, warn};

use crate::config::NodeConfig;
use crate::error::{NodeError, Result};
use crate::types::{ChainInfo, MempoolInfo, NetworkInfo, VerboseBlock, VerboseTx};

/// `getblock` verbosity returning every input's prevout (Core >= 25).
const GETBLOCK_VERBOSITY: i64 = 3;

/// Upper bound on the random jitter added to each retry delay.
const RETRY_JITTER: Duration = Duration::from_secs(1);

/// Async wrapper around a Bitcoin Core JSON-RPC endpoint.
///
/// Blocking RPC calls run on the tokio blocking pool; a semaphore caps the
/// number in flight so the scanner and query side together never exceed the
/// node's work queue. Transient failures retry with capped exponential
/// backoff and jitter.
pub struct NodeClient {
    inner: Arc<Inner>,
}

struct Inner {
    client: Client,
    config: NodeConfig,
    permits: Semaphore,
}

impl Clone for NodeClient {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl NodeClient {
    /// Create a client for the configured endpoint.
    pub fn new(config: NodeConfig) -> Result<Self> {
        config.validate()?;

        let transport = jsonrpc::simple_http::SimpleHttpTransport::builder()
            .url(&config.url())
            .map_err(|e| NodeError::Config(e.to_string()))?
            .timeout(config.timeout)
            .auth(&config.user, Some(&config.pass))
            .build();
        let client = Client::from_jsonrpc(jsonrpc::Client::with_transport(transport));

        Ok(Self {
            inner: Arc::new(Inner {
                client,
                permits: Semaphore::new(config.max_parallel),
                config,
            }),
        })
    }

    /// The client's configuration.
    pub fn config(&self) -> &NodeConfig {
        &self.inner.config
    }

    /// Run one RPC closure with concurrency limiting and retries.
    async fn call<T, F>(&self, rpc: &'static str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: Fn(&Client) -> bitcoincore_rpc::Result<T> + Send + Sync + 'static,
    {
        let _permit = self
            .inner
            .permits
            .acquire()
            .await
            .map_err(|e| NodeError::Internal(e.to_string()))?;

        let f = Arc::new(f);
        let mut attempt: u32 = 0;
        loop {
            let f = Arc::clone(&f);
            let inner = Arc::clone(&self.inner);
            let result = spawn_blocking(move || f(&inner.client))
                .await
                .map_err(|e| NodeError::Internal(e.to_string()))?;

            match result {
                Ok(value) => return Ok(value),
                Err(e) => {
                    let err = NodeError::from(e);
                    attempt += 1;
                    if !err.is_transient() || attempt >= self.inner.config.max_retries {
                        return Err(err);
                    }
                    let delay = retry_delay(
                        attempt - 1,
                        self.inner.config.retry_base,
                        self.inner.config.retry_cap,
                    );
                    warn!(%err, rpc, attempt, delay_ms = delay.as_millis() as u64, "node RPC failed, retrying");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Current chain state.
    pub async fn chain_info(&self) -> Result<ChainInfo> {
        let info = self
            .call("getblockchaininfo", |c| c.get_blockchain_info())
            .await?;
        Ok(ChainInfo {
            chain: info.chain,
            height: info.blocks,
            headers: info.headers,
            best_block_hash: info.best_block_hash.to_string(),
            verification_progress: info.verification_progress,
            initial_block_download: info.initial_block_download,
        })
    }

    /// Hash of the block at `height`; `NotFound` beyond the tip.
    pub async fn block_hash(&self, height: u64) -> Result<String> {
        let hash = self
            .call("getblockhash", move |c| c.get_block_hash(height))
            .await?;
        Ok(hash.to_string())
    }

    /// Fetch a verbose-with-prevouts block by hash.
    pub async fn block(&self, hash: &str) -> Result<VerboseBlock> {
        let hash = hash.to_string();
        self.call("getblock", move |c| {
            c.call("getblock", &[Value::String(hash.clone()), json!(GETBLOCK_VERBOSITY)])
        })
        .await
    }

    /// Fetch a verbose-with-prevouts block by height.
    pub async fn block_at(&self, height: u64) -> Result<VerboseBlock> {
        let hash = self.block_hash(height).await?;
        self.block(&hash).await
    }

    /// Fetch one transaction verbosely (query-side enrichment fallback).
    pub async fn raw_transaction(&self, txid: &str) -> Result<VerboseTx> {
        let txid = txid.to_string();
        self.call("getrawtransaction", move |c| {
            c.call("getrawtransaction", &[Value::String(txid.clone()), json!(true)])
        })
        .await
    }

    /// Snapshot of `getnetworkinfo`.
    pub async fn network_info(&self) -> Result<NetworkInfo> {
        self.call("getnetworkinfo", |c| c.call("getnetworkinfo", &[]))
            .await
    }

    /// Snapshot of `getmempoolinfo`.
    pub async fn mempool_info(&self) -> Result<MempoolInfo> {
        self.call("getmempoolinfo", |c| c.call("getmempoolinfo", &[]))
            .await
    }

    /// Refuse to proceed against an unusable node.
    ///
    /// Fails with [`NodeError::Syncing`] while the node is in initial block
    /// download (the scanner relies on stable historical blocks), with
    /// [`NodeError::WrongChain`] on a network mismatch, and with
    /// [`NodeError::MissingTxIndex`] when the node lacks `txindex=1`.
    pub async fn ensure_ready(&self) -> Result<ChainInfo> {
        let info = self.chain_info().await?;

        if info.initial_block_download {
            return Err(NodeError::Syncing);
        }
        if info.chain != self.inner.config.network {
            return Err(NodeError::WrongChain {
                expected: self.inner.config.network.to_string(),
                got: info.chain.to_string(),
            });
        }

        match self
            .call("getindexinfo", |c| {
                c.call::<Value>("getindexinfo", &[])
            })
            .await
        {
            Ok(indexes) => {
                if indexes.get("txindex").is_none() {
                    return Err(NodeError::MissingTxIndex(
                        "node is not running with txindex=1".into(),
                    ));
                }
            }
            Err(NodeError::Unsupported(_)) => {
                warn!("node does not support getindexinfo; skipping txindex check");
            }
            Err(e) => return Err(e),
        }

        info!(
            chain = %info.chain,
            height = info.height,
            progress = info.verification_progress,
            "node ready"
        );
        Ok(info)
    }
}

/// Capped exponential backoff with uniform jitter.
fn retry_delay(attempt: u32, base: Duration, cap: Duration) -> Duration {
    let exp = base
        .as_millis()
        .saturating_mul(1u128 << attempt.min(20)) as u64;
    let backoff = Duration::from_millis(exp).min(cap);
    let jitter = Duration::from_millis(
        rand::thread_rng().gen_range(0..=RETRY_JITTER.as_millis() as u64),
    );
    backoff + jitter
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_and_caps() {
        let base = Duration::from_millis(500);
        let cap = Duration::from_secs(120);

        let d0 = retry_delay(0, base, cap);
        assert!(d0 >= Duration::from_millis(500));
        assert!(d0 <= Duration::from_millis(500) + RETRY_JITTER);

        let d3 = retry_delay(3, base, cap);
        assert!(d3 >= Duration::from_secs(4));

        let huge = retry_delay(30, base, cap);
        assert!(huge <= cap + RETRY_JITTER);
    }

    #[test]
    fn client_rejects_invalid_config() {
        let config = NodeConfig::new("", 8332);
        assert!(matches!(NodeClient::new(config), Err(NodeError::Config(_))));
    }
}
