//! The scanner state machine.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use tainttrail_core::ScanProgress;
use tainttrail_rpc::BlockSource;
use tainttrail_seed::SeedSet;
use tainttrail_store::{BatchOp, StoreBatch, TaintStore};

use crate::cache::ParentCache;
use crate::config::ScannerConfig;
use crate::error::{Result, ScanError};
use crate::status::{ScanState, SyncStatusHandle};
use crate::taint::{BlockProcessor, StagedBlock};

/// Fixed backoff after a recoverable error.
const ERROR_BACKOFF: Duration = Duration::from_secs(30);

/// Sleep chosen from how far behind the tip the checkpoint is.
pub fn poll_interval(blocks_behind: u64, idle_interval: Duration) -> Duration {
    if blocks_behind > 1000 {
        Duration::from_secs(5)
    } else if blocks_behind > 100 {
        Duration::from_secs(30)
    } else if blocks_behind > 0 {
        Duration::from_secs(120)
    } else {
        idle_interval
    }
}

/// The taint scanner: extends coverage from the checkpoint to the tip, then
/// keeps extending as blocks arrive.
///
/// Single writer of the taint store. The loop never terminates on transient
/// or block-local errors; only an explicit stop or an invariant violation
/// ends it.
pub struct Scanner<S> {
    source: Arc<S>,
    store: TaintStore,
    seeds: Arc<SeedSet>,
    config: ScannerConfig,
    status: SyncStatusHandle,
    parents: ParentCache,
    network: bitcoin::Network,
    last_flush: Instant,
}

impl<S: BlockSource> Scanner<S> {
    /// Create a scanner over the given node, store and seed set.
    pub fn new(
        source: Arc<S>,
        store: TaintStore,
        seeds: Arc<SeedSet>,
        config: ScannerConfig,
    ) -> Self {
        let parents = ParentCache::new(config.parent_cache_max);
        Self {
            source,
            store,
            seeds,
            config,
            status: SyncStatusHandle::new(),
            parents,
            network: bitcoin::Network::Bitcoin,
            last_flush: Instant::now(),
        }
    }

    /// Set the network used for local script decoding.
    pub fn with_network(mut self, network: bitcoin::Network) -> Self {
        self.network = network;
        self
    }

    /// Handle for status snapshots; clone freely.
    pub fn status(&self) -> SyncStatusHandle {
        self.status.clone()
    }

    /// Run until `stop` flips to true or an invariant violation aborts.
    ///
    /// The stop signal is honored at block boundaries: the block in flight
    /// commits (or is discarded with the checkpoint unmoved) before the loop
    /// exits.
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) -> Result<()> {
        if let Some(progress) = self.store.scan_progress()? {
            self.status.set_last_processed(progress.last_block);
        }
        self.status.set_running(true);
        info!("taint scanner started");

        let result = self.scan_loop(&mut stop).await;
        self.status.set_running(false);
        match &result {
            Ok(()) => info!("taint scanner stopped"),
            Err(e) => error!(%e, "taint scanner aborted"),
        }
        result
    }

    async fn scan_loop(&mut self, stop: &mut watch::Receiver<bool>) -> Result<()> {
        loop {
            if *stop.borrow() {
                return Ok(());
            }

            let sleep = match self.tick(stop).await {
                Ok(sleep) => sleep,
                Err(e) if e.is_recoverable() => {
                    warn!(%e, "scan pass failed; backing off");
                    self.status.record_error(&e);
                    self.status.set_state(ScanState::Idle);
                    ERROR_BACKOFF
                }
                Err(fatal) => return Err(fatal),
            };

            tokio::select! {
                _ = tokio::time::sleep(sleep) => {}
                _ = stop.changed() => {}
            }
        }
    }

    /// One pass: check the tip, process at most one window, pick a sleep.
    async fn tick(&mut self, stop: &watch::Receiver<bool>) -> Result<Duration> {
        let tip = self.source.chain_height().await?;
        self.status.set_chain_height(tip);
        let target = tip.saturating_sub(self.config.tip_lag_blocks);

        let next = match self.store.scan_progress()? {
            Some(progress) => progress.last_block + 1,
            None => 0,
        };
        if next > target {
            self.status.set_state(ScanState::Idle);
            return Ok(self.config.idle_interval);
        }

        self.status.set_state(ScanState::Catchup);
        let window_end = next
            .saturating_add(self.config.chunk_size_blocks.saturating_sub(1))
            .min(target);

        let mut processed_up_to = None;
        for height in next..=window_end {
            if *stop.borrow() {
                break;
            }
            self.process_height(height).await?;
            processed_up_to = Some(height);
        }

        let behind = match processed_up_to {
            Some(height) => target - height,
            None => target + 1 - next,
        };
        self.status.set_state(if behind == 0 {
            ScanState::Tail
        } else {
            ScanState::Catchup
        });
        Ok(poll_interval(behind, self.config.idle_interval))
    }

    /// Fetch, classify, commit and checkpoint one block.
    async fn process_height(&mut self, height: u64) -> Result<()> {
        let block = self.source.block_at(height).await?;
        if block.height != height {
            return Err(ScanError::Data(format!(
                "asked for block {height}, node returned {}",
                block.height
            )));
        }

        let staged =
            BlockProcessor::new(&self.store, &self.seeds, &mut self.parents, self.network)
                .process(&block)?;
        let stats = staged.stats.clone();

        self.commit(staged)?;
        self.status.record_block(height, &stats);
        debug!(
            height,
            txs = stats.txs,
            tainting_txs = stats.tainting_txs,
            outpoints = stats.outpoints,
            addresses = stats.addresses,
            "block processed"
        );
        Ok(())
    }

    /// Commit a block's staged writes, checkpoint riding in the final batch.
    ///
    /// Batches are bounded by `batch_size` and the flush timer so a single
    /// commit never stalls the loop. If any commit fails the block is
    /// dropped and retried from scratch next tick; the checkpoint only moves
    /// in the last batch, after every effect of the block is durable.
    fn commit(&mut self, staged: StagedBlock) -> Result<()> {
        if let Some(progress) = self.store.scan_progress()? {
            if staged.height <= progress.last_block {
                return Err(ScanError::Invariant(format!(
                    "scan progress would move backward: at {}, committing {}",
                    progress.last_block, staged.height
                )));
            }
        }

        let mut ops = staged.ops;
        ops.push(BatchOp::ScanProgress(ScanProgress::at(staged.height)));

        let mut batch = StoreBatch::with_capacity(self.config.batch_size.min(ops.len()));
        for op in ops {
            batch.push(op);
            if batch.len() >= self.config.batch_size.max(1)
                || self.last_flush.elapsed() >= self.config.batch_flush
            {
                let full = std::mem::take(&mut batch);
                self.store.commit(full)?;
                self.last_flush = Instant::now();
            }
        }
        if !batch.is_empty() {
            self.store.commit(batch)?;
            self.last_flush = Instant::now();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_interval_tiers() {
        let idle = Duration::from_secs(600);
        assert_eq!(poll_interval(5_000, idle), Duration::from_secs(5));
        assert_eq!(poll_interval(1_001, idle), Duration::from_secs(5));
        assert_eq!(poll_interval(1_000, idle), Duration::from_secs(30));
        assert_eq!(poll_interval(101, idle), Duration::from_secs(30));
        assert_eq!(poll_interval(100, idle), Duration::from_secs(120));
        assert_eq!(poll_interval(1, idle), Duration::from_secs(120));
        assert_eq!(poll_interval(0, idle), idle);
    }
}
