//! Shared view of the scanner's runtime state.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use crate::error::ScanError;
use crate::taint::BlockStats;

/// Scanner state machine position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    /// Loaded but not yet ticked.
    Starting,
    /// Working through a backlog of blocks.
    Catchup,
    /// At the tip, polling for new blocks.
    Tail,
    /// Nothing new; sleeping on the idle interval.
    Idle,
}

/// Cumulative scanner counters.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanStats {
    /// Blocks fully processed this run.
    pub blocks_processed: u64,
    /// Transactions examined.
    pub txs_processed: u64,
    /// Transactions that spread taint.
    pub tainting_txs: u64,
    /// Outpoint records written.
    pub outpoints_written: u64,
    /// Address records upserted.
    pub addresses_updated: u64,
    /// Recoverable errors since start.
    pub errors: u64,
    /// Most recent error, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Point-in-time snapshot served to the HTTP layer.
#[derive(Debug, Clone, Serialize)]
pub struct SyncStatus {
    /// Whether the scanner loop is alive.
    pub is_running: bool,
    /// State machine position.
    pub state: ScanState,
    /// Whether a backlog remains.
    pub is_syncing: bool,
    /// Last fully persisted block, if any.
    pub last_processed_block: Option<u64>,
    /// The node's current tip height.
    pub current_height: u64,
    /// Blocks between checkpoint and tip.
    pub blocks_behind: u64,
    /// Fraction of the chain covered, 0..=1.
    pub progress: f64,
    /// Cumulative counters.
    pub stats: ScanStats,
    /// When this scanner process started.
    pub started_at: DateTime<Utc>,
}

struct Inner {
    running: AtomicBool,
    chain_height: AtomicU64,
    state: RwLock<ScanState>,
    last_processed: RwLock<Option<u64>>,
    stats: RwLock<ScanStats>,
    started_at: DateTime<Utc>,
}

/// Cheaply cloneable handle onto the scanner's runtime state.
///
/// The scanner writes, the HTTP layer reads; neither blocks the other for
/// more than a field copy.
#[derive(Clone)]
pub struct SyncStatusHandle {
    inner: Arc<Inner>,
}

impl Default for SyncStatusHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncStatusHandle {
    /// Create a fresh handle.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                running: AtomicBool::new(false),
                chain_height: AtomicU64::new(0),
                state: RwLock::new(ScanState::Starting),
                last_processed: RwLock::new(None),
                stats: RwLock::new(ScanStats::default()),
                started_at: Utc::now(),
            }),
        }
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.inner.running.store(running, Ordering::Relaxed);
    }

    pub(crate) fn set_state(&self, state: ScanState) {
        *self.inner.state.write() = state;
    }

    pub(crate) fn set_chain_height(&self, height: u64) {
        self.inner.chain_height.store(height, Ordering::Relaxed);
    }

    pub(crate) fn set_last_processed(&self, height: u64) {
        *self.inner.last_processed.write() = Some(height);
    }

    pub(crate) fn record_block(&self, height: u64, block: &BlockStats) {
        self.set_last_processed(height);
        let mut stats = self.inner.stats.write();
        stats.blocks_processed += 1;
        stats.txs_processed += block.txs;
        stats.tainting_txs += block.tainting_txs;
        stats.outpoints_written += block.outpoints;
        stats.addresses_updated += block.addresses;
    }

    pub(crate) fn record_error(&self, error: &ScanError) {
        let mut stats = self.inner.stats.write();
        stats.errors += 1;
        stats.last_error = Some(error.to_string());
    }

    /// Take a consistent-enough snapshot for the status endpoint.
    pub fn snapshot(&self) -> SyncStatus {
        let last_processed = *self.inner.last_processed.read();
        let current_height = self.inner.chain_height.load(Ordering::Relaxed);
        let blocks_behind = match last_processed {
            Some(h) => current_height.saturating_sub(h),
            None => current_height,
        };
        let progress = match (last_processed, current_height) {
            (Some(h), tip) if tip > 0 => (h as f64 / tip as f64).min(1.0),
            _ => 0.0,
        };

        SyncStatus {
            is_running: self.inner.running.load(Ordering::Relaxed),
            state: *self.inner.state.read(),
            is_syncing: blocks_behind > 0,
            last_processed_block: last_processed,
            current_height,
            blocks_behind,
            progress,
            stats: self.inner.stats.read().clone(),
            started_at: self.inner.started_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_progress() {
        let handle = SyncStatusHandle::new();
        handle.set_running(true);
        handle.set_chain_height(200);
        handle.record_block(
            100,
            &BlockStats {
                txs: 10,
                tainting_txs: 2,
                outpoints: 5,
                addresses: 3,
            },
        );

        let snap = handle.snapshot();
        assert!(snap.is_running);
        assert!(snap.is_syncing);
        assert_eq!(snap.last_processed_block, Some(100));
        assert_eq!(snap.blocks_behind, 100);
        assert_eq!(snap.stats.blocks_processed, 1);
        assert_eq!(snap.stats.txs_processed, 10);
        assert!((snap.progress - 0.5).abs() < 1e-9);
    }

    #[test]
    fn fresh_handle_is_fully_behind() {
        let handle = SyncStatusHandle::new();
        handle.set_chain_height(50);

        let snap = handle.snapshot();
        assert!(!snap.is_running);
        assert_eq!(snap.last_processed_block, None);
        assert_eq!(snap.blocks_behind, 50);
        assert_eq!(snap.progress, 0.0);
    }

    #[test]
    fn errors_accumulate() {
        let handle = SyncStatusHandle::new();
        handle.record_error(&ScanError::Data("bad".into()));
        handle.record_error(&ScanError::Data("worse".into()));

        let snap = handle.snapshot();
        assert_eq!(snap.stats.errors, 2);
        assert!(snap.stats.last_error.as_deref().unwrap().contains("worse"));
    }
}
