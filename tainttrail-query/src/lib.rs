//! Read-only taint lookups.
//!
//! Answers one question per call: is this address a seed, tainted with some
//! degree and witness path, or unconnected? Reads are point lookups against
//! the taint store, wall-clock bounded to shield callers from pathological
//! store latency, and independent of the scanner's liveness.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

use std::time::Duration;

use thiserror::Error;
use tokio::time::timeout;
use tracing::debug;

use tainttrail_core::{PathHop, TaintRecord, TxRecord, TxRecordInput, TxRecordOutput};
use tainttrail_rpc::{address, NodeClient};
use tainttrail_store::TaintStore;

/// Result type for query operations.
pub type Result<T> = std::result::Result<T, QueryError>;

/// Errors that can occur during a lookup.
#[derive(Debug, Error)]
pub enum QueryError {
    /// A store read failed.
    #[error("store error: {0}")]
    Store(#[from] tainttrail_store::StoreError),

    /// The lookup exceeded its wall-clock budget.
    #[error("lookup timed out after {0:?}")]
    Timeout(Duration),

    /// The queried address was empty.
    #[error("address must be non-empty")]
    InvalidAddress,
}

/// Query service configuration.
#[derive(Debug, Clone)]
pub struct QueryConfig {
    /// Wall-clock budget per lookup.
    pub timeout: Duration,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
        }
    }
}

impl QueryConfig {
    /// Set the per-lookup budget.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// One resolved hop transaction.
#[derive(Debug, Clone)]
pub struct TxSummary {
    /// Transaction id of the hop.
    pub hash: String,
    /// Value of the hop's output, in satoshis.
    pub amount_sat: u64,
    /// Cached or node-fetched detail, when available.
    pub detail: Option<TxRecord>,
}

/// Outcome of an address check.
#[derive(Debug, Clone)]
pub enum CheckResult {
    /// The address belongs to the seed set.
    Seed {
        /// The queried address.
        address: String,
        /// Human-readable explanation.
        note: String,
    },
    /// The address is reachable from a seed.
    Tainted {
        /// The queried address.
        address: String,
        /// Minimum hop distance from the seed set.
        degree: u32,
        /// Witness path from the seed to the address.
        path: Vec<PathHop>,
        /// Best-effort per-hop transaction detail.
        transactions: Vec<TxSummary>,
    },
    /// No known connection to the seed set.
    Unconnected {
        /// The queried address.
        address: String,
    },
}

/// Read-only lookup service over the taint store.
///
/// Never mutates; the scanner may or may not be running. An attached node
/// client is used only to enrich path transactions the store has not cached,
/// and its failures never fail a lookup.
pub struct QueryService {
    store: TaintStore,
    node: Option<NodeClient>,
    config: QueryConfig,
}

impl QueryService {
    /// Create a service over the store.
    pub fn new(store: TaintStore) -> Self {
        Self {
            store,
            node: None,
            config: QueryConfig::default(),
        }
    }

    /// Attach a node client for transaction enrichment.
    pub fn with_node(mut self, node: NodeClient) -> Self {
        self.node = Some(node);
        self
    }

    /// Set the query configuration.
    pub fn with_config(mut self, config: QueryConfig) -> Self {
        self.config = config;
        self
    }

    /// Check one address, bounded by the configured timeout.
    pub async fn check(&self, address: &str) -> Result<CheckResult> {
        if address.trim().is_empty() {
            return Err(QueryError::InvalidAddress);
        }
        match timeout(self.config.timeout, self.lookup(address)).await {
            Ok(result) => result,
            Err(_) => Err(QueryError::Timeout(self.config.timeout)),
        }
    }

    async fn lookup(&self, address: &str) -> Result<CheckResult> {
        let Some(record) = self.store.taint_record(address)? else {
            return Ok(CheckResult::Unconnected {
                address: address.to_string(),
            });
        };

        if record.is_seed() {
            return Ok(CheckResult::Seed {
                address: address.to_string(),
                note: "address belongs to the curated Satoshi coinbase set".to_string(),
            });
        }

        let transactions = self.resolve_path(&record).await?;
        Ok(CheckResult::Tainted {
            address: address.to_string(),
            degree: record.degree,
            path: record.path,
            transactions,
        })
    }

    async fn resolve_path(&self, record: &TaintRecord) -> Result<Vec<TxSummary>> {
        let mut transactions = Vec::with_capacity(record.path.len());
        for (index, hop) in record.path.iter().enumerate() {
            let detail = match self.store.tx_record(&hop.tx_hash)? {
                Some(cached) => Some(cached),
                None => self.fetch_detail(hop, index).await,
            };
            transactions.push(TxSummary {
                hash: hop.tx_hash.clone(),
                amount_sat: hop.amount_sat,
                detail,
            });
        }
        Ok(transactions)
    }

    /// Node-side enrichment for hops the store never cached. Best effort.
    async fn fetch_detail(&self, hop: &PathHop, index: usize) -> Option<TxRecord> {
        let node = self.node.as_ref()?;
        let network = node.config().network;
        match node.raw_transaction(&hop.tx_hash).await {
            Ok(tx) => Some(TxRecord {
                txid: tx.txid.clone(),
                height: 0,
                time: tx.time,
                degree: (index + 1) as u32,
                inputs: tx
                    .vin
                    .iter()
                    .filter(|input| !input.is_coinbase())
                    .map(|input| TxRecordInput {
                        address: input
                            .prevout
                            .as_ref()
                            .and_then(|p| address::output_address(&p.script_pub_key, network)),
                        amount_sat: input.prevout.as_ref().map_or(0, |p| p.value.to_sat()),
                    })
                    .collect(),
                outputs: tx
                    .vout
                    .iter()
                    .map(|output| TxRecordOutput {
                        address: address::output_address(&output.script_pub_key, network),
                        amount_sat: output.value.to_sat(),
                        vout: output.n,
                    })
                    .collect(),
            }),
            Err(e) => {
                debug!(%e, tx = %hop.tx_hash, "hop transaction enrichment failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tainted_store() -> TaintStore {
        let store = TaintStore::open_temp().unwrap();
        let seed = TaintRecord::seed("1Seed");
        store.put_taint_record("1Seed", &seed).unwrap();

        let a = TaintRecord::extend(&seed, "1Seed", "1A", "tx1", 1_000, 1);
        store.put_taint_record("1A", &a).unwrap();

        let b = TaintRecord::extend(&a, "1A", "1B", "tx2", 500, 2);
        store.put_taint_record("1B", &b).unwrap();

        store
            .put(
                tainttrail_store::Keyspace::Main,
                "tx:tx1",
                &cached_tx1_bytes(),
            )
            .unwrap();
        store
    }

    fn cached_tx1_bytes() -> Vec<u8> {
        let record = TxRecord {
            txid: "tx1".to_string(),
            height: 170,
            time: Some(1_231_731_025),
            degree: 1,
            inputs: vec![],
            outputs: vec![TxRecordOutput {
                address: Some("1A".to_string()),
                amount_sat: 1_000,
                vout: 0,
            }],
        };
        serde_json::to_vec(&record).unwrap()
    }

    #[tokio::test]
    async fn seed_lookup() {
        let service = QueryService::new(tainted_store());
        match service.check("1Seed").await.unwrap() {
            CheckResult::Seed { address, note } => {
                assert_eq!(address, "1Seed");
                assert!(!note.is_empty());
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn tainted_lookup_resolves_cached_transactions() {
        let service = QueryService::new(tainted_store());
        match service.check("1B").await.unwrap() {
            CheckResult::Tainted {
                degree,
                path,
                transactions,
                ..
            } => {
                assert_eq!(degree, 2);
                assert_eq!(path.len(), 2);
                assert_eq!(transactions.len(), 2);
                // tx1 is cached, tx2 falls back to the path stub
                assert!(transactions[0].detail.is_some());
                assert_eq!(transactions[0].detail.as_ref().unwrap().height, 170);
                assert!(transactions[1].detail.is_none());
                assert_eq!(transactions[1].hash, "tx2");
                assert_eq!(transactions[1].amount_sat, 500);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_address_is_unconnected() {
        let service = QueryService::new(tainted_store());
        assert!(matches!(
            service.check("1NeverSeen").await.unwrap(),
            CheckResult::Unconnected { .. }
        ));
    }

    #[tokio::test]
    async fn empty_address_is_rejected() {
        let service = QueryService::new(tainted_store());
        assert!(matches!(
            service.check("  ").await,
            Err(QueryError::InvalidAddress)
        ));
    }
}
