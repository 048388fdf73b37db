//! The taint propagation engine.
//!
//! Walks the chain in height order from the last checkpoint to the tip,
//! classifying every transaction output as tainted or not:
//!
//! - an output is tainted when its creating transaction spends any tainted
//!   outpoint (all outputs taint at the transaction boundary), or when it is
//!   a seed coinbase output;
//! - its degree is one more than the minimum degree over the tainted inputs;
//! - the first newly tainted address gets a taint record carrying a witness
//!   path chained from the chosen source address back to a seed.
//!
//! The scanner is the single writer of the taint store. All staged writes
//! for a block commit before the checkpoint advances, so a crash replays the
//! block with identical upserts.
//!
//! ```text
//! INIT -> [load scan_progress] -> CATCHUP --+
//!                                           +-> TAIL <-> IDLE
//! CATCHUP: process a window of blocks, then re-check the tip.
//! TAIL:    tip reached; adaptive sleep, re-check.
//! IDLE:    nothing new; sleep the configured idle interval.
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod cache;
mod config;
mod error;
mod scanner;
mod status;
mod taint;

pub use cache::ParentCache;
pub use config::ScannerConfig;
pub use error::{Result, ScanError};
pub use scanner::{poll_interval, Scanner};
pub use status::{ScanState, ScanStats, SyncStatus, SyncStatusHandle};
pub use taint::{BlockProcessor, BlockStats, StagedBlock};
