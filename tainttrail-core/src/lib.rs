//! Tainttrail Core - Fundamental types for the Satoshi taint database.
//!
//! This crate provides the data structures shared by every other tainttrail
//! crate:
//!
//! - [`types`] - Taint records, outpoints, witness paths, scan progress
//! - [`keys`] - The byte-exact key layout of the taint store
//!
//! A *taint record* captures the best-known connection of one address back to
//! the curated Satoshi seed set: the seed it descends from, the minimum hop
//! distance (degree), and one witness path of address-to-address hops that
//! realizes that distance.
//!
//! # Example
//!
//! ```rust
//! use tainttrail_core::{keys, Outpoint, TaintRecord};
//!
//! let seed = TaintRecord::seed("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa");
//! assert!(seed.is_seed());
//! assert!(seed.path.is_empty());
//!
//! let outpoint = Outpoint::new("4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b", 0);
//! assert_eq!(
//!     keys::tainted_out(&outpoint),
//!     "tainted_out:4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b:0"
//! );
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod keys;
pub mod types;

pub use types::{
    Outpoint, OutpointRecord, PathHop, ScanProgress, SeedInitFlag, TaintRecord, TxRecord,
    TxRecordInput, TxRecordOutput,
};
