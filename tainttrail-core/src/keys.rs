//! Key layout of the taint store.
//!
//! Two keyspaces live in separate physical stores:
//!
//! - *main*: `tainted:<address>`, `tx:<txid>`
//! - *scan*: `tainted_out:<txid>:<vout>`, `seed_addr:<address>`,
//!   `scan_progress`, `satoshi_coinbase_initialized`
//!
//! Keys are UTF-8; addresses are stored exactly as the node emits them (case
//! preserved for bech32).

use crate::types::Outpoint;

/// Prefix for address-level taint records (main store).
pub const TAINTED_PREFIX: &str = "tainted:";

/// Prefix for cached transaction records (main store).
pub const TX_PREFIX: &str = "tx:";

/// Prefix for tainted outpoint records (scan store).
pub const TAINTED_OUT_PREFIX: &str = "tainted_out:";

/// Prefix for the seed address membership index (scan store).
pub const SEED_ADDR_PREFIX: &str = "seed_addr:";

/// Key holding the last fully persisted block height (scan store).
pub const SCAN_PROGRESS: &str = "scan_progress";

/// One-shot idempotence marker for the seed builder (scan store).
pub const SEED_INIT_FLAG: &str = "satoshi_coinbase_initialized";

/// Key for an address-level taint record.
pub fn tainted(address: &str) -> String {
    format!("{TAINTED_PREFIX}{address}")
}

/// Key for a tainted outpoint record.
pub fn tainted_out(outpoint: &Outpoint) -> String {
    format!("{TAINTED_OUT_PREFIX}{}:{}", outpoint.txid, outpoint.vout)
}

/// Key for a cached transaction record.
pub fn tx(txid: &str) -> String {
    format!("{TX_PREFIX}{txid}")
}

/// Key for a seed address membership entry.
pub fn seed_addr(address: &str) -> String {
    format!("{SEED_ADDR_PREFIX}{address}")
}

/// Extract the address from a `tainted:<address>` key.
pub fn address_from_tainted(key: &str) -> Option<&str> {
    key.strip_prefix(TAINTED_PREFIX)
}

/// Extract the address from a `seed_addr:<address>` key.
pub fn address_from_seed_addr(key: &str) -> Option<&str> {
    key.strip_prefix(SEED_ADDR_PREFIX)
}
