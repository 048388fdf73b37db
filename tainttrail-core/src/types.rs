//! Taint database records.
//!
//! All amounts are integer satoshis. Degrees are unsigned; the seed set is
//! degree 0. Addresses and txids are the node's canonical string forms.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A transaction output reference: `(txid, vout)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Outpoint {
    /// Hex transaction id, as the node emits it.
    pub txid: String,
    /// Output index within the transaction.
    pub vout: u32,
}

impl Outpoint {
    /// Create an outpoint.
    pub fn new(txid: impl Into<String>, vout: u32) -> Self {
        Self {
            txid: txid.into(),
            vout,
        }
    }
}

impl std::fmt::Display for Outpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.txid, self.vout)
    }
}

/// One hop of a witness path: `from` paid `to` through transaction `tx_hash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathHop {
    /// Sending address.
    pub from: String,
    /// Receiving address.
    pub to: String,
    /// Transaction realizing the hop.
    pub tx_hash: String,
    /// Value of the output paying `to`, in satoshis.
    pub amount_sat: u64,
}

/// The best-known tainting of one address.
///
/// `degree` is the minimum hop count ever discovered for the address and only
/// decreases over time. `path` is one witness chain from `seed_address` to
/// the address; seed records carry an empty path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaintRecord {
    /// The seed this record descends from (the address itself for seeds).
    pub seed_address: String,
    /// Minimum hop distance from the seed set.
    pub degree: u32,
    /// Witness path realizing the connection; empty for seeds.
    pub path: Vec<PathHop>,
    /// Transaction that produced the final hop, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_tx: Option<String>,
    /// Value of the final hop's output, in satoshis.
    pub amount_sat: u64,
    /// When this record was last upserted.
    pub last_updated: DateTime<Utc>,
}

impl TaintRecord {
    /// Degree-0 record for a seed address.
    pub fn seed(address: impl Into<String>) -> Self {
        let address = address.into();
        Self {
            seed_address: address,
            degree: 0,
            path: Vec::new(),
            source_tx: None,
            amount_sat: 0,
            last_updated: Utc::now(),
        }
    }

    /// Whether this record belongs to the seed set.
    pub fn is_seed(&self) -> bool {
        self.degree == 0
    }

    /// Extend a parent record by one hop to `to`.
    ///
    /// `source_address` is the address the parent record belongs to; the new
    /// path is the parent's path plus the `source_address → to` hop, and the
    /// seed address carries forward.
    pub fn extend(
        parent: &TaintRecord,
        source_address: &str,
        to: &str,
        tx_hash: &str,
        amount_sat: u64,
        degree: u32,
    ) -> Self {
        let mut path = parent.path.clone();
        path.push(PathHop {
            from: source_address.to_string(),
            to: to.to_string(),
            tx_hash: tx_hash.to_string(),
            amount_sat,
        });
        Self {
            seed_address: parent.seed_address.clone(),
            degree,
            path,
            source_tx: Some(tx_hash.to_string()),
            amount_sat,
            last_updated: Utc::now(),
        }
    }
}

/// A tainted transaction output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutpointRecord {
    /// Hop distance of the output from the seed set.
    pub degree: u32,
    /// Address the output pays, when the script decodes to one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Height of the block that created the output.
    pub height: u64,
}

/// One input of a cached transaction record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRecordInput {
    /// Address of the spent prevout, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Value of the spent prevout, in satoshis.
    pub amount_sat: u64,
}

/// One output of a cached transaction record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRecordOutput {
    /// Receiving address, when the script decodes to one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Output value, in satoshis.
    pub amount_sat: u64,
    /// Output index.
    pub vout: u32,
}

/// Compact cache of a taint-spreading transaction.
///
/// Best-effort lookup aid for the query side; carries no invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRecord {
    /// Transaction id.
    pub txid: String,
    /// Block height the transaction confirmed at.
    pub height: u64,
    /// Block time, if the node reported one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<u64>,
    /// Taint degree of the transaction's outputs at store time.
    pub degree: u32,
    /// Inputs with prevout addresses and values.
    pub inputs: Vec<TxRecordInput>,
    /// Outputs with addresses and values.
    pub outputs: Vec<TxRecordOutput>,
}

/// Last fully persisted block height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanProgress {
    /// Every effect of blocks `<= last_block` is durably applied.
    pub last_block: u64,
    /// When the checkpoint was written.
    pub updated_at: DateTime<Utc>,
}

impl ScanProgress {
    /// Checkpoint at `last_block`, stamped now.
    pub fn at(last_block: u64) -> Self {
        Self {
            last_block,
            updated_at: Utc::now(),
        }
    }
}

/// One-shot marker written when the seed set has been materialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedInitFlag {
    /// When seeding completed.
    pub timestamp: DateTime<Utc>,
    /// Number of seed outpoints written.
    pub outpoint_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_record_shape() {
        let rec = TaintRecord::seed("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa");
        assert!(rec.is_seed());
        assert_eq!(rec.degree, 0);
        assert_eq!(rec.seed_address, "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa");
        assert!(rec.path.is_empty());
        assert!(rec.source_tx.is_none());
    }

    #[test]
    fn extend_chains_hops() {
        let seed = TaintRecord::seed("seedaddr");
        let a = TaintRecord::extend(&seed, "seedaddr", "addr_a", "tx1", 5_000_000_000, 1);
        assert_eq!(a.degree, 1);
        assert_eq!(a.seed_address, "seedaddr");
        assert_eq!(a.path.len(), 1);
        assert_eq!(a.path[0].from, "seedaddr");
        assert_eq!(a.path[0].to, "addr_a");

        let b = TaintRecord::extend(&a, "addr_a", "addr_b", "tx2", 100, 2);
        assert_eq!(b.degree, 2);
        assert_eq!(b.seed_address, "seedaddr");
        assert_eq!(b.path.len(), 2);
        // consecutive hops share the intermediate address
        assert_eq!(b.path[0].to, b.path[1].from);
        assert_eq!(b.source_tx.as_deref(), Some("tx2"));
        assert_eq!(b.amount_sat, 100);
    }

    #[test]
    fn record_json_roundtrip() {
        let seed = TaintRecord::seed("s");
        let rec = TaintRecord::extend(&seed, "s", "a", "tx1", 42, 1);
        let json = serde_json::to_string(&rec).unwrap();
        let back: TaintRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rec);
    }

    #[test]
    fn outpoint_display() {
        let op = Outpoint::new("deadbeef", 3);
        assert_eq!(op.to_string(), "deadbeef:3");
    }
}
