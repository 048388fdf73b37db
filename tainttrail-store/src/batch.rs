//! Batch staging for atomic block commits.

use tainttrail_core::{Outpoint, OutpointRecord, ScanProgress, SeedInitFlag, TaintRecord, TxRecord};

/// An operation staged into a [`StoreBatch`].
#[derive(Debug, Clone)]
pub enum BatchOp {
    /// Upsert an address-level taint record (main store).
    TaintRecord {
        /// Address the record belongs to.
        address: String,
        /// The record.
        record: TaintRecord,
    },
    /// Cache a transaction record (main store).
    TxRecord(TxRecord),
    /// Record a tainted outpoint (scan store).
    Outpoint {
        /// The outpoint.
        outpoint: Outpoint,
        /// Its taint record.
        record: OutpointRecord,
    },
    /// Add a seed address to the membership index (scan store).
    SeedAddress(String),
    /// Advance the scan checkpoint (scan store).
    ScanProgress(ScanProgress),
    /// Flip the one-shot seed initialization marker (scan store).
    SeedInit(SeedInitFlag),
}

impl BatchOp {
    /// Whether the operation targets the scan store.
    pub fn is_scan(&self) -> bool {
        matches!(
            self,
            BatchOp::Outpoint { .. }
                | BatchOp::SeedAddress(_)
                | BatchOp::ScanProgress(_)
                | BatchOp::SeedInit(_)
        )
    }
}

/// A set of operations committed as one main-store write followed by one
/// scan-store write.
///
/// Every operation is a keyed upsert whose value is a pure function of the
/// inputs observed so far, so replaying a batch is idempotent.
#[derive(Debug, Default)]
pub struct StoreBatch {
    ops: Vec<BatchOp>,
}

impl StoreBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self { ops: Vec::new() }
    }

    /// Create a batch with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ops: Vec::with_capacity(capacity),
        }
    }

    /// Stage an address-level taint record.
    pub fn put_taint_record(&mut self, address: impl Into<String>, record: TaintRecord) -> &mut Self {
        self.ops.push(BatchOp::TaintRecord {
            address: address.into(),
            record,
        });
        self
    }

    /// Stage a cached transaction record.
    pub fn put_tx_record(&mut self, record: TxRecord) -> &mut Self {
        self.ops.push(BatchOp::TxRecord(record));
        self
    }

    /// Stage a tainted outpoint.
    pub fn put_outpoint(&mut self, outpoint: Outpoint, record: OutpointRecord) -> &mut Self {
        self.ops.push(BatchOp::Outpoint { outpoint, record });
        self
    }

    /// Stage a seed membership entry.
    pub fn put_seed_address(&mut self, address: impl Into<String>) -> &mut Self {
        self.ops.push(BatchOp::SeedAddress(address.into()));
        self
    }

    /// Stage the scan checkpoint.
    pub fn set_scan_progress(&mut self, progress: ScanProgress) -> &mut Self {
        self.ops.push(BatchOp::ScanProgress(progress));
        self
    }

    /// Stage the seed initialization marker.
    pub fn set_seed_init(&mut self, flag: SeedInitFlag) -> &mut Self {
        self.ops.push(BatchOp::SeedInit(flag));
        self
    }

    /// Stage a pre-built operation.
    pub fn push(&mut self, op: BatchOp) -> &mut Self {
        self.ops.push(op);
        self
    }

    /// Number of staged operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether the batch holds no operations.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Drop all staged operations.
    pub fn clear(&mut self) {
        self.ops.clear();
    }

    /// Borrow the staged operations.
    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    /// Take ownership of the staged operations.
    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }
}
