//! Seed set materialization for tainttrail.
//!
//! The seed set is the curated collection of coinbase outputs attributed to
//! Satoshi Nakamoto: the Patoshi-pattern block heights plus blocks 0-2. This
//! crate turns that static height list into degree-0 records in the taint
//! store, exactly once:
//!
//! - [`SeedList`] - the immutable, injectable source of curated heights and
//!   well-known early addresses (the built-in list ships inside the binary)
//! - [`SeedBuilder`] - the one-shot, idempotent materialization pass
//! - [`SeedSet`] - the in-memory address membership set the scanner consults
//!
//! The first run costs hours of RPC work; every later start is a single
//! point read of the `satoshi_coinbase_initialized` marker.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod builder;
mod error;
mod list;
mod set;

pub use builder::{SeedBuilder, SeedOutcome};
pub use error::{Result, SeedError};
pub use list::{SeedList, WELL_KNOWN_ADDRESSES};
pub use set::SeedSet;
