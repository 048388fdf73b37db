//! HTTP query surface for tainttrail.
//!
//! Endpoints:
//! - `GET /check/{address}` - taint check for one address
//! - `GET /sync-status` - scanner runtime state and checkpoint
//!
//! The HTTP layer only reads: lookups go through the query service, status
//! through the scanner's shared handle. It never invokes a mutating
//! operation.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod rest;
mod server;

pub use rest::{ApiError, CheckResponse, HopDto, StatsDto, SyncStatusResponse, TxDto};
pub use server::{ApiConfig, ApiServer, ApiState};
