//! Scanner configuration.

use std::time::Duration;

use serde::Serialize;

/// Configuration for the taint scanner.
#[derive(Debug, Clone, Serialize)]
pub struct ScannerConfig {
    /// Whether the scanner runs at all.
    pub enabled: bool,
    /// Sleep between polls once the tip is reached and quiet.
    #[serde(rename = "idle_interval_ms", serialize_with = "as_millis")]
    pub idle_interval: Duration,
    /// Blocks processed per catch-up window before re-checking the tip.
    pub chunk_size_blocks: u64,
    /// Maximum operations per committed write batch.
    pub batch_size: usize,
    /// Maximum time between batch commits while draining a block.
    #[serde(rename = "batch_flush_ms", serialize_with = "as_millis")]
    pub batch_flush: Duration,
    /// Hard cap of the parent taint record cache.
    pub parent_cache_max: usize,
    /// Trail the node's tip by this many blocks (reorg safety margin).
    pub tip_lag_blocks: u64,
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            idle_interval: Duration::from_secs(600),
            chunk_size_blocks: 100,
            batch_size: 1000,
            batch_flush: Duration::from_secs(5),
            parent_cache_max: 10_000,
            tip_lag_blocks: 0,
        }
    }
}

impl ScannerConfig {
    /// Set the idle poll interval.
    pub fn with_idle_interval(mut self, idle: Duration) -> Self {
        self.idle_interval = idle;
        self
    }

    /// Set the catch-up window size.
    pub fn with_chunk_size(mut self, blocks: u64) -> Self {
        self.chunk_size_blocks = blocks;
        self
    }

    /// Set the batch commit thresholds.
    pub fn with_batching(mut self, batch_size: usize, flush: Duration) -> Self {
        self.batch_size = batch_size;
        self.batch_flush = flush;
        self
    }

    /// Set the parent cache cap.
    pub fn with_parent_cache_max(mut self, max: usize) -> Self {
        self.parent_cache_max = max;
        self
    }

    /// Set the tip lag.
    pub fn with_tip_lag(mut self, blocks: u64) -> Self {
        self.tip_lag_blocks = blocks;
        self
    }
}
