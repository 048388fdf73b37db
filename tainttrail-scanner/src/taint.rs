//! Per-block taint classification.
//!
//! A transaction is *tainting* when it spends at least one tainted outpoint,
//! or when any of its outputs pays a seed address (catching seed-side spends
//! whose inputs are unknown). Every output of a tainting transaction is
//! recorded in `tainted_out`, taint is all-output at the transaction
//! boundary.

use std::collections::HashMap;

use tracing::{debug, warn};

use tainttrail_core::{
    Outpoint, OutpointRecord, TaintRecord, TxRecord, TxRecordInput, TxRecordOutput,
};
use tainttrail_rpc::address;
use tainttrail_rpc::types::{TxInput, VerboseBlock, VerboseTx};
use tainttrail_seed::SeedSet;
use tainttrail_store::{BatchOp, TaintStore};

use crate::cache::ParentCache;
use crate::error::{Result, ScanError};

/// Sentinel input degree for the pays-a-seed rule; derives degree 0 outputs.
const SEED_PAY_DEGREE: i64 = -1;

/// Counters produced while classifying one block.
#[derive(Debug, Clone, Default)]
pub struct BlockStats {
    /// Transactions examined.
    pub txs: u64,
    /// Transactions that spread taint.
    pub tainting_txs: u64,
    /// New outpoint records staged.
    pub outpoints: u64,
    /// Address records staged.
    pub addresses: u64,
}

/// The staged effects of one classified block, not yet committed.
#[derive(Debug)]
pub struct StagedBlock {
    /// Height the effects belong to.
    pub height: u64,
    /// Store operations in staging order.
    pub ops: Vec<BatchOp>,
    /// Classification counters.
    pub stats: BlockStats,
}

/// Classifies one block's transactions against the store and the seed set.
///
/// Holds no cross-block state of its own; the parent cache it borrows is the
/// only thing that outlives a call, and eviction there never affects
/// correctness.
pub struct BlockProcessor<'a> {
    store: &'a TaintStore,
    seeds: &'a SeedSet,
    parents: &'a mut ParentCache,
    network: bitcoin::Network,
}

impl<'a> BlockProcessor<'a> {
    /// Create a processor over the given store, seed set and parent cache.
    pub fn new(
        store: &'a TaintStore,
        seeds: &'a SeedSet,
        parents: &'a mut ParentCache,
        network: bitcoin::Network,
    ) -> Self {
        Self {
            store,
            seeds,
            parents,
            network,
        }
    }

    /// Classify every transaction of `block` and stage the resulting writes.
    ///
    /// Outputs tainted by an earlier transaction of the same block are
    /// visible to later ones through the in-block outpoint map.
    pub fn process(&mut self, block: &VerboseBlock) -> Result<StagedBlock> {
        let mut ops = Vec::new();
        let mut stats = BlockStats::default();
        let mut in_block: HashMap<Outpoint, u32> = HashMap::new();
        let mut staged_records: HashMap<String, TaintRecord> = HashMap::new();

        for tx in &block.tx {
            stats.txs += 1;
            self.process_tx(tx, block, &mut ops, &mut stats, &mut in_block, &mut staged_records)?;
        }

        Ok(StagedBlock {
            height: block.height,
            ops,
            stats,
        })
    }

    fn process_tx(
        &mut self,
        tx: &VerboseTx,
        block: &VerboseBlock,
        ops: &mut Vec<BatchOp>,
        stats: &mut BlockStats,
        in_block: &mut HashMap<Outpoint, u32>,
        staged_records: &mut HashMap<String, TaintRecord>,
    ) -> Result<()> {
        let tainted_inputs = self.tainted_inputs(tx, in_block)?;

        let output_addrs: Vec<Option<String>> = tx
            .vout
            .iter()
            .map(|out| address::output_address(&out.script_pub_key, self.network))
            .collect();

        let mut min_degree: Option<i64> = tainted_inputs.iter().map(|(d, _)| *d as i64).min();
        // Fallback only: catches seed-side spends whose inputs are unknown.
        // A known tainted input keeps its real degree.
        if min_degree.is_none()
            && output_addrs
                .iter()
                .flatten()
                .any(|addr| self.seeds.contains(addr))
        {
            min_degree = Some(SEED_PAY_DEGREE);
        }
        let Some(min_degree) = min_degree else {
            return Ok(());
        };
        stats.tainting_txs += 1;
        let current_degree = (min_degree + 1) as u32;

        // The witness path continues from the first minimum-degree input
        // whose spent prevout decodes to an address.
        let source_address: Option<String> = tainted_inputs
            .iter()
            .filter(|(degree, _)| *degree as i64 == min_degree)
            .find_map(|(_, input)| {
                input
                    .prevout
                    .as_ref()
                    .and_then(|p| address::output_address(&p.script_pub_key, self.network))
            });

        let mut tx_cached = false;
        for (output, out_addr) in tx.vout.iter().zip(&output_addrs) {
            let outpoint = Outpoint::new(tx.txid.clone(), output.n);
            // First write wins: a recorded degree is never raised, and
            // replaying a block skips everything it already produced.
            if in_block.contains_key(&outpoint) || self.store.outpoint(&outpoint)?.is_some() {
                continue;
            }

            let out_addr = out_addr.clone();
            ops.push(BatchOp::Outpoint {
                outpoint: outpoint.clone(),
                record: OutpointRecord {
                    degree: current_degree,
                    address: out_addr.clone(),
                    height: block.height,
                },
            });
            in_block.insert(outpoint, current_degree);
            stats.outpoints += 1;

            let Some(out_addr) = out_addr else {
                continue;
            };
            // Seed records stay degree 0 forever.
            if self.seeds.contains(&out_addr) {
                continue;
            }
            if let Some(existing) = self.record_of(&out_addr, staged_records)? {
                if existing.degree <= current_degree {
                    continue;
                }
            }
            let Some(source) = source_address.as_deref() else {
                continue;
            };
            let Some(parent) = self.record_of(source, staged_records)? else {
                debug!(address = %out_addr, source, "source has no taint record; path abandoned");
                continue;
            };

            let record = TaintRecord::extend(
                &parent,
                source,
                &out_addr,
                &tx.txid,
                output.value.to_sat(),
                current_degree,
            );
            self.parents.insert(out_addr.clone(), record.clone());
            staged_records.insert(out_addr.clone(), record.clone());
            ops.push(BatchOp::TaintRecord {
                address: out_addr,
                record,
            });
            stats.addresses += 1;

            if !tx_cached {
                ops.push(BatchOp::TxRecord(compact_tx_record(
                    tx,
                    block,
                    current_degree,
                    self.network,
                )));
                tx_cached = true;
            }
        }

        Ok(())
    }

    /// Degrees of the tainted outpoints this transaction spends.
    fn tainted_inputs<'t>(
        &self,
        tx: &'t VerboseTx,
        in_block: &HashMap<Outpoint, u32>,
    ) -> Result<Vec<(u32, &'t TxInput)>> {
        let mut found = Vec::new();
        for input in &tx.vin {
            if input.is_coinbase() {
                continue;
            }
            let Some(outpoint) = input.outpoint() else {
                warn!(txid = %tx.txid, "non-coinbase input without outpoint; treating as untainted");
                continue;
            };
            if input.prevout.is_none() {
                warn!(txid = %tx.txid, %outpoint, "non-coinbase input missing prevout; treating as untainted");
                continue;
            }
            let degree = match in_block.get(&outpoint) {
                Some(d) => Some(*d),
                None => self.store.outpoint(&outpoint)?.map(|rec| rec.degree),
            };
            if let Some(degree) = degree {
                found.push((degree, input));
            }
        }
        Ok(found)
    }

    /// Best-known record of an address: staged this block, cached, or stored.
    fn record_of(
        &mut self,
        address: &str,
        staged_records: &HashMap<String, TaintRecord>,
    ) -> Result<Option<TaintRecord>> {
        if let Some(record) = staged_records.get(address) {
            return Ok(Some(record.clone()));
        }
        if let Some(record) = self.parents.get(address) {
            return Ok(Some(record));
        }
        let record = self.store.taint_record(address).map_err(ScanError::from)?;
        if let Some(record) = &record {
            self.parents.insert(address.to_string(), record.clone());
        }
        Ok(record)
    }
}

/// Compact cacheable form of a tainting transaction.
fn compact_tx_record(
    tx: &VerboseTx,
    block: &VerboseBlock,
    degree: u32,
    network: bitcoin::Network,
) -> TxRecord {
    TxRecord {
        txid: tx.txid.clone(),
        height: block.height,
        time: Some(block.time),
        degree,
        inputs: tx
            .vin
            .iter()
            .filter(|input| !input.is_coinbase())
            .map(|input| TxRecordInput {
                address: input
                    .prevout
                    .as_ref()
                    .and_then(|p| address::output_address(&p.script_pub_key, network)),
                amount_sat: input.prevout.as_ref().map_or(0, |p| p.value.to_sat()),
            })
            .collect(),
        outputs: tx
            .vout
            .iter()
            .map(|output| TxRecordOutput {
                address: address::output_address(&output.script_pub_key, network),
                amount_sat: output.value.to_sat(),
                vout: output.n,
            })
            .collect(),
    }
}
