//! One-shot materialization of the seed set.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinSet;
use tracing::info;

use tainttrail_core::{Outpoint, OutpointRecord, SeedInitFlag, TaintRecord};
use tainttrail_rpc::{address, types::VerboseBlock, BlockSource};
use tainttrail_store::{StoreBatch, TaintStore};

use crate::error::{Result, SeedError};
use crate::list::SeedList;

/// Heights fetched concurrently per round.
const FETCH_CHUNK: usize = 64;

/// Coarse progress logging granularity.
const PROGRESS_EVERY: usize = 1_000;

/// Result of a seed builder run.
#[derive(Debug)]
pub enum SeedOutcome {
    /// The marker was present; nothing was written.
    AlreadyInitialized(SeedInitFlag),
    /// The seed set was materialized by this run.
    Initialized {
        /// Seed outpoints written.
        outpoints: u64,
        /// Distinct seed addresses written.
        addresses: u64,
    },
}

/// Writes the curated coinbase outputs into the store as degree-0 seeds.
///
/// Idempotent and one-shot: the `satoshi_coinbase_initialized` marker is
/// checked first and written last, so an interrupted run redoes its work
/// with identical upserts and a completed run is never repeated.
pub struct SeedBuilder<S> {
    source: Arc<S>,
    store: TaintStore,
    list: SeedList,
    network: bitcoin::Network,
}

impl<S: BlockSource> SeedBuilder<S> {
    /// Create a builder over the given node, store and curated list.
    pub fn new(source: Arc<S>, store: TaintStore, list: SeedList) -> Self {
        Self {
            source,
            store,
            list,
            network: bitcoin::Network::Bitcoin,
        }
    }

    /// Set the network used for local script decoding.
    pub fn with_network(mut self, network: bitcoin::Network) -> Self {
        self.network = network;
        self
    }

    /// Materialize the seed set, unless it already exists.
    pub async fn run(&self) -> Result<SeedOutcome> {
        if let Some(flag) = self.store.seed_initialized()? {
            info!(
                outpoints = flag.outpoint_count,
                initialized_at = %flag.timestamp,
                "seed set already initialized"
            );
            return Ok(SeedOutcome::AlreadyInitialized(flag));
        }

        info!(heights = self.list.len(), "materializing seed set");

        let mut outpoints = 0u64;
        let mut addresses: HashSet<String> = HashSet::new();
        let mut processed = 0usize;

        for chunk in self.list.heights().chunks(FETCH_CHUNK) {
            let mut tasks = JoinSet::new();
            for &height in chunk {
                let source = Arc::clone(&self.source);
                tasks.spawn(async move { source.block_at(height).await });
            }

            let mut batch = self.store.batch();
            while let Some(joined) = tasks.join_next().await {
                let block = joined.map_err(|e| SeedError::Internal(e.to_string()))??;
                outpoints += self.stage_block(&block, &mut batch, &mut addresses)?;
            }
            self.store.commit(batch)?;

            processed += chunk.len();
            if processed % PROGRESS_EVERY < chunk.len() {
                info!(processed, total = self.list.len(), "seed extraction progress");
            }
        }

        // Well-known early addresses, in case the node returned non-standard
        // scripts for blocks 0-2. The completion marker rides in the same
        // final batch, after every chunk above is durable.
        let mut batch = self.store.batch();
        for addr in self.list.extra_addresses() {
            batch.put_taint_record(addr.clone(), TaintRecord::seed(addr.clone()));
            batch.put_seed_address(addr.clone());
            addresses.insert(addr.clone());
        }
        let flag = SeedInitFlag {
            timestamp: Utc::now(),
            outpoint_count: outpoints,
        };
        batch.set_seed_init(flag);
        self.store.commit(batch)?;

        info!(
            outpoints,
            addresses = addresses.len(),
            "seed set initialized"
        );
        Ok(SeedOutcome::Initialized {
            outpoints,
            addresses: addresses.len() as u64,
        })
    }

    /// Stage one curated block's coinbase outputs as degree-0 seeds.
    fn stage_block(
        &self,
        block: &VerboseBlock,
        batch: &mut StoreBatch,
        addresses: &mut HashSet<String>,
    ) -> Result<u64> {
        let coinbase = block.coinbase().ok_or_else(|| {
            SeedError::Data(format!("block {} has no coinbase transaction", block.height))
        })?;

        let mut count = 0u64;
        for output in &coinbase.vout {
            let addr = address::output_address(&output.script_pub_key, self.network);
            batch.put_outpoint(
                Outpoint::new(coinbase.txid.clone(), output.n),
                OutpointRecord {
                    degree: 0,
                    address: addr.clone(),
                    height: block.height,
                },
            );
            count += 1;

            // Non-standard scripts stay address-less: the node is
            // authoritative, the outpoint is still a degree-0 seed.
            if let Some(addr) = addr {
                batch.put_taint_record(addr.clone(), TaintRecord::seed(addr.clone()));
                batch.put_seed_address(addr.clone());
                addresses.insert(addr);
            }
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    use async_trait::async_trait;
    use bitcoin::Amount;

    use tainttrail_rpc::types::{ScriptPubKey, TxInput, TxOutput, VerboseTx};
    use tainttrail_rpc::NodeError;

    use crate::list::WELL_KNOWN_ADDRESSES;
    use crate::set::SeedSet;

    struct StaticChain {
        blocks: HashMap<u64, VerboseBlock>,
    }

    #[async_trait]
    impl BlockSource for StaticChain {
        async fn chain_height(&self) -> tainttrail_rpc::Result<u64> {
            Ok(self.blocks.keys().copied().max().unwrap_or(0))
        }

        async fn block_at(&self, height: u64) -> tainttrail_rpc::Result<VerboseBlock> {
            self.blocks
                .get(&height)
                .cloned()
                .ok_or_else(|| NodeError::NotFound(format!("block {height}")))
        }
    }

    fn coinbase_block(height: u64, txid: &str, outputs: &[Option<&str>]) -> VerboseBlock {
        let vout = outputs
            .iter()
            .enumerate()
            .map(|(n, addr)| TxOutput {
                value: Amount::from_sat(5_000_000_000),
                n: n as u32,
                script_pub_key: ScriptPubKey {
                    address: addr.map(str::to_string),
                    ..Default::default()
                },
            })
            .collect();
        VerboseBlock {
            hash: format!("hash{height}"),
            height,
            time: 1_231_006_505 + height * 600,
            previous_block_hash: None,
            tx: vec![VerboseTx {
                txid: txid.to_string(),
                vin: vec![TxInput {
                    coinbase: Some("04ffff001d".to_string()),
                    txid: None,
                    vout: None,
                    prevout: None,
                }],
                vout,
                time: None,
                blockhash: None,
            }],
        }
    }

    fn chain() -> Arc<StaticChain> {
        let mut blocks = HashMap::new();
        blocks.insert(0, coinbase_block(0, "cb0", &[Some("1Genesis")]));
        blocks.insert(1, coinbase_block(1, "cb1", &[None])); // non-standard script
        blocks.insert(2, coinbase_block(2, "cb2", &[Some("1Early")]));
        Arc::new(StaticChain { blocks })
    }

    #[tokio::test]
    async fn run_materializes_seeds() {
        let store = TaintStore::open_temp().unwrap();
        let list = SeedList::new(vec![0, 1, 2], ["1WellKnown"]);
        let builder = SeedBuilder::new(chain(), store.clone(), list);

        let outcome = builder.run().await.unwrap();
        match outcome {
            SeedOutcome::Initialized {
                outpoints,
                addresses,
            } => {
                assert_eq!(outpoints, 3);
                // 1Genesis, 1Early, 1WellKnown - block 1 decoded no address
                assert_eq!(addresses, 3);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        let genesis = store.taint_record("1Genesis").unwrap().unwrap();
        assert!(genesis.is_seed());
        assert!(genesis.path.is_empty());

        // the non-standard coinbase output is still a degree-0 outpoint
        let op = store.outpoint(&Outpoint::new("cb1", 0)).unwrap().unwrap();
        assert_eq!(op.degree, 0);
        assert!(op.address.is_none());

        // well-known augmentation is seeded even without a matching block
        assert!(store.taint_record("1WellKnown").unwrap().unwrap().is_seed());

        let seeds = SeedSet::load(&store).unwrap();
        assert!(seeds.contains("1Genesis"));
        assert!(seeds.contains("1WellKnown"));
        assert!(!seeds.contains("1Unrelated"));

        assert_eq!(
            store.seed_initialized().unwrap().unwrap().outpoint_count,
            3
        );
    }

    #[tokio::test]
    async fn second_run_is_a_point_read() {
        let store = TaintStore::open_temp().unwrap();
        let list = SeedList::new(vec![0, 1, 2], WELL_KNOWN_ADDRESSES);
        let builder = SeedBuilder::new(chain(), store.clone(), list);

        builder.run().await.unwrap();
        let outcome = builder.run().await.unwrap();
        assert!(matches!(outcome, SeedOutcome::AlreadyInitialized(_)));
    }

    #[tokio::test]
    async fn missing_block_surfaces_error() {
        let store = TaintStore::open_temp().unwrap();
        let list = SeedList::new(vec![0, 99], Vec::<String>::new());
        let builder = SeedBuilder::new(chain(), store.clone(), list);

        assert!(builder.run().await.is_err());
        // incomplete runs leave the marker unset so the next start retries
        assert!(store.seed_initialized().unwrap().is_none());
    }
}
