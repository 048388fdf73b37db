//! Typed shapes of the node's verbose JSON responses.
//!
//! These mirror `getblock(hash, 3)`: every transaction expanded, every
//! non-coinbase input annotated with the `prevout` it spends (value and
//! script). Amounts travel through [`bitcoin::Amount`] BTC serde so no
//! floating-point arithmetic ever touches a satoshi value.

use bitcoin::Amount;
use serde::Deserialize;

use tainttrail_core::Outpoint;

/// Snapshot of `getblockchaininfo`.
#[derive(Debug, Clone)]
pub struct ChainInfo {
    /// Network the node serves.
    pub chain: bitcoin::Network,
    /// Current block height.
    pub height: u64,
    /// Current header height.
    pub headers: u64,
    /// Hash of the chain tip.
    pub best_block_hash: String,
    /// Verification progress, 0..=1.
    pub verification_progress: f64,
    /// Whether the node is still in initial block download.
    pub initial_block_download: bool,
}

/// A block with fully expanded transactions and prevouts.
#[derive(Debug, Clone, Deserialize)]
pub struct VerboseBlock {
    /// Block hash.
    pub hash: String,
    /// Block height.
    pub height: u64,
    /// Block time (unix seconds).
    pub time: u64,
    /// Previous block hash; absent for genesis.
    #[serde(default, rename = "previousblockhash")]
    pub previous_block_hash: Option<String>,
    /// Transactions in block order; the first is the coinbase.
    pub tx: Vec<VerboseTx>,
}

impl VerboseBlock {
    /// The block's coinbase transaction, when the block is well-formed.
    pub fn coinbase(&self) -> Option<&VerboseTx> {
        self.tx.first().filter(|tx| tx.is_coinbase())
    }
}

/// A fully expanded transaction.
#[derive(Debug, Clone, Deserialize)]
pub struct VerboseTx {
    /// Transaction id.
    pub txid: String,
    /// Inputs.
    pub vin: Vec<TxInput>,
    /// Outputs.
    pub vout: Vec<TxOutput>,
    /// Block time; only present on `getrawtransaction` responses.
    #[serde(default)]
    pub time: Option<u64>,
    /// Containing block; only present on `getrawtransaction` responses.
    #[serde(default)]
    pub blockhash: Option<String>,
}

impl VerboseTx {
    /// Whether this is a coinbase transaction.
    pub fn is_coinbase(&self) -> bool {
        self.vin.first().is_some_and(TxInput::is_coinbase)
    }
}

/// One transaction input.
#[derive(Debug, Clone, Deserialize)]
pub struct TxInput {
    /// Coinbase script; present only on coinbase inputs.
    #[serde(default)]
    pub coinbase: Option<String>,
    /// Funding transaction id; absent on coinbase inputs.
    #[serde(default)]
    pub txid: Option<String>,
    /// Funding output index; absent on coinbase inputs.
    #[serde(default)]
    pub vout: Option<u32>,
    /// The spent output, as annotated by the node.
    #[serde(default)]
    pub prevout: Option<Prevout>,
}

impl TxInput {
    /// Whether this input creates new coins.
    pub fn is_coinbase(&self) -> bool {
        self.coinbase.is_some()
    }

    /// The outpoint this input spends, when it spends one.
    pub fn outpoint(&self) -> Option<Outpoint> {
        match (&self.txid, self.vout) {
            (Some(txid), Some(vout)) => Some(Outpoint::new(txid.clone(), vout)),
            _ => None,
        }
    }
}

/// The output spent by an input.
#[derive(Debug, Clone, Deserialize)]
pub struct Prevout {
    /// Value of the spent output.
    #[serde(with = "bitcoin::amount::serde::as_btc")]
    pub value: Amount,
    /// Height of the block that created the output.
    #[serde(default)]
    pub height: Option<u64>,
    /// Script of the spent output.
    #[serde(rename = "scriptPubKey")]
    pub script_pub_key: ScriptPubKey,
}

/// One transaction output.
#[derive(Debug, Clone, Deserialize)]
pub struct TxOutput {
    /// Output value.
    #[serde(with = "bitcoin::amount::serde::as_btc")]
    pub value: Amount,
    /// Output index.
    pub n: u32,
    /// Output script.
    #[serde(rename = "scriptPubKey")]
    pub script_pub_key: ScriptPubKey,
}

/// A decoded output script.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScriptPubKey {
    /// Raw script hex.
    #[serde(default)]
    pub hex: String,
    /// Script type as classified by the node.
    #[serde(default, rename = "type")]
    pub script_type: Option<String>,
    /// Decoded address (Core >= 22).
    #[serde(default)]
    pub address: Option<String>,
    /// Decoded addresses (pre-22 nodes).
    #[serde(default)]
    pub addresses: Option<Vec<String>>,
}

/// Snapshot of `getnetworkinfo`.
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkInfo {
    /// Node version number.
    pub version: u64,
    /// Node user agent.
    pub subversion: String,
    /// Peer connection count.
    #[serde(default)]
    pub connections: u64,
}

/// Snapshot of `getmempoolinfo`.
#[derive(Debug, Clone, Deserialize)]
pub struct MempoolInfo {
    /// Number of mempool transactions.
    pub size: u64,
    /// Mempool size in bytes.
    #[serde(default)]
    pub bytes: u64,
}
