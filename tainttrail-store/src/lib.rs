//! Taint store for tainttrail.
//!
//! Crash-consistent ordered KV storage for taint records, split over two
//! RocksDB instances under one base directory:
//!
//! - `<base>/` - the *main* store: `tainted:<address>`, `tx:<txid>`
//! - `<base>/scan_progress/` - the *scan* store: `tainted_out:<txid>:<vout>`,
//!   `seed_addr:<address>`, `scan_progress`, `satoshi_coinbase_initialized`
//!
//! The split isolates the very large outpoint namespace from the
//! lookup-critical address namespace and lets each compact independently.
//!
//! # Batch Operations
//!
//! All mutating work on a block is staged into a [`StoreBatch`] and committed
//! before the scan checkpoint advances:
//!
//! ```ignore
//! use tainttrail_store::TaintStore;
//!
//! let store = TaintStore::open("./data")?;
//! let mut batch = store.batch();
//!
//! batch.put_outpoint(outpoint, record);
//! batch.put_taint_record("bc1q...", taint);
//! batch.set_scan_progress(ScanProgress::at(170));
//!
//! store.commit(batch)?; // main batch first, then scan batch
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod batch;
mod error;
mod rocks;

pub use batch::{BatchOp, StoreBatch};
pub use error::{Result, StoreError};
pub use rocks::{Keyspace, TaintStore};
