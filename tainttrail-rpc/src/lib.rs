//! Bitcoin Core JSON-RPC client for tainttrail.
//!
//! Provides a reliable, rate-limited, typed view of a Bitcoin Core node:
//!
//! - [`NodeClient`] - retrying, concurrency-limited async wrapper over
//!   `bitcoincore_rpc`
//! - [`types`] - verbose-with-prevouts block shapes (`getblock` verbosity 3)
//! - [`address`] - output script to address decoding
//! - [`BlockSource`] - the seam the scanner and seed builder consume, so
//!   tests can drive the engine with synthetic chains
//!
//! Every block is fetched with each input annotated by the script and value
//! of the output it spends; the engine never needs a second RPC to resolve
//! an input address.
//!
//! # Example
//!
//! ```ignore
//! use tainttrail_rpc::{NodeClient, NodeConfig};
//!
//! let config = NodeConfig::new("127.0.0.1", 8332).with_auth("user", "pass");
//! let client = NodeClient::new(config)?;
//!
//! let info = client.ensure_ready().await?;
//! let block = client.block_at(170).await?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod address;
mod client;
mod config;
mod error;
mod source;
pub mod types;

pub use client::NodeClient;
pub use config::NodeConfig;
pub use error::{NodeError, Result};
pub use source::BlockSource;
pub use types::{ChainInfo, Prevout, ScriptPubKey, TxInput, TxOutput, VerboseBlock, VerboseTx};
