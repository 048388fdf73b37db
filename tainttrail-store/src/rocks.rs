//! RocksDB implementation of the taint store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rocksdb::{Direction, IteratorMode, Options, WriteBatch, DB};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use tainttrail_core::{
    keys, Outpoint, OutpointRecord, ScanProgress, SeedInitFlag, TaintRecord, TxRecord,
};

use crate::batch::{BatchOp, StoreBatch};
use crate::error::{Result, StoreError};

/// Subdirectory of the base path holding the scan store.
const SCAN_DIR: &str = "scan_progress";

/// Which physical store a key lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyspace {
    /// Address-level records: `tainted:`, `tx:`.
    Main,
    /// Outpoint and checkpoint records: `tainted_out:`, `seed_addr:`,
    /// `scan_progress`, `satoshi_coinbase_initialized`.
    Scan,
}

/// The dual RocksDB taint store.
///
/// Cheap to clone; all clones share the same database handles. Single
/// process, single writer: only the scanner (and the one-shot seed builder
/// before it) mutates, readers never do.
pub struct TaintStore {
    main: Arc<DB>,
    scan: Arc<DB>,
}

impl Clone for TaintStore {
    fn clone(&self) -> Self {
        Self {
            main: Arc::clone(&self.main),
            scan: Arc::clone(&self.scan),
        }
    }
}

impl TaintStore {
    /// Open or create both stores under `base`.
    pub fn open(base: impl AsRef<Path>) -> Result<Self> {
        let base = base.as_ref();
        std::fs::create_dir_all(base)?;
        info!(path = %base.display(), "opening taint store");

        let main = Self::open_db(base)?;
        let scan = Self::open_db(&base.join(SCAN_DIR))?;

        Ok(Self {
            main: Arc::new(main),
            scan: Arc::new(scan),
        })
    }

    /// Open a store in a fresh temporary directory (for testing).
    pub fn open_temp() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let path: PathBuf = dir.path().to_path_buf();
        // Keep the temp dir alive for the process lifetime.
        std::mem::forget(dir);
        Self::open(path)
    }

    fn open_db(path: &Path) -> Result<DB> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        DB::open(&opts, path).map_err(|e| {
            if e.kind() == rocksdb::ErrorKind::Corruption {
                StoreError::Corrupt {
                    path: path.display().to_string(),
                    message: e.to_string(),
                }
            } else {
                StoreError::Backend(e.to_string())
            }
        })
    }

    fn db(&self, keyspace: Keyspace) -> &DB {
        match keyspace {
            Keyspace::Main => &self.main,
            Keyspace::Scan => &self.scan,
        }
    }

    /// Point read of a raw value.
    pub fn get(&self, keyspace: Keyspace, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.db(keyspace).get(key.as_bytes())?)
    }

    /// Raw upsert.
    pub fn put(&self, keyspace: Keyspace, key: &str, value: &[u8]) -> Result<()> {
        Ok(self.db(keyspace).put(key.as_bytes(), value)?)
    }

    /// Raw delete.
    pub fn delete(&self, keyspace: Keyspace, key: &str) -> Result<()> {
        Ok(self.db(keyspace).delete(key.as_bytes())?)
    }

    /// Ordered scan of every key starting with `prefix`.
    pub fn scan_prefix(&self, keyspace: Keyspace, prefix: &str) -> Result<Vec<(String, Vec<u8>)>> {
        let mode = IteratorMode::From(prefix.as_bytes(), Direction::Forward);
        let mut out = Vec::new();
        for item in self.db(keyspace).iterator(mode) {
            let (key, value) = item?;
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            let key = String::from_utf8_lossy(&key).into_owned();
            out.push((key, value.into_vec()));
        }
        Ok(out)
    }

    fn get_json<T: DeserializeOwned>(&self, keyspace: Keyspace, key: &str) -> Result<Option<T>> {
        match self.get(keyspace, key)? {
            Some(bytes) => {
                let value = serde_json::from_slice(&bytes).map_err(|source| StoreError::Codec {
                    key: key.to_string(),
                    source,
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn put_json<T: Serialize>(&self, keyspace: Keyspace, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value).map_err(StoreError::Encode)?;
        self.put(keyspace, key, &bytes)
    }

    /// Read the taint record of an address.
    pub fn taint_record(&self, address: &str) -> Result<Option<TaintRecord>> {
        self.get_json(Keyspace::Main, &keys::tainted(address))
    }

    /// Upsert the taint record of an address.
    pub fn put_taint_record(&self, address: &str, record: &TaintRecord) -> Result<()> {
        self.put_json(Keyspace::Main, &keys::tainted(address), record)
    }

    /// Read a cached transaction record.
    pub fn tx_record(&self, txid: &str) -> Result<Option<TxRecord>> {
        self.get_json(Keyspace::Main, &keys::tx(txid))
    }

    /// Read a tainted outpoint record.
    pub fn outpoint(&self, outpoint: &Outpoint) -> Result<Option<OutpointRecord>> {
        self.get_json(Keyspace::Scan, &keys::tainted_out(outpoint))
    }

    /// Read the scan checkpoint.
    pub fn scan_progress(&self) -> Result<Option<ScanProgress>> {
        self.get_json(Keyspace::Scan, keys::SCAN_PROGRESS)
    }

    /// Write the scan checkpoint outside a batch.
    pub fn set_scan_progress(&self, progress: &ScanProgress) -> Result<()> {
        self.put_json(Keyspace::Scan, keys::SCAN_PROGRESS, progress)
    }

    /// Read the one-shot seed initialization marker.
    pub fn seed_initialized(&self) -> Result<Option<SeedInitFlag>> {
        self.get_json(Keyspace::Scan, keys::SEED_INIT_FLAG)
    }

    /// Enumerate the seed address membership index.
    pub fn seed_addresses(&self) -> Result<Vec<String>> {
        let entries = self.scan_prefix(Keyspace::Scan, keys::SEED_ADDR_PREFIX)?;
        Ok(entries
            .into_iter()
            .filter_map(|(key, _)| keys::address_from_seed_addr(&key).map(str::to_string))
            .collect())
    }

    /// Create an empty batch.
    pub fn batch(&self) -> StoreBatch {
        StoreBatch::new()
    }

    /// Commit a batch: one atomic main-store write, then one atomic
    /// scan-store write.
    ///
    /// Main before scan keeps address records durable no later than the
    /// outpoint writes and checkpoint that reference them, so a crash
    /// between the two writes replays the block instead of losing records.
    pub fn commit(&self, batch: StoreBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut main = WriteBatch::default();
        let mut scan = WriteBatch::default();
        let total = batch.len();

        for op in batch.into_ops() {
            match op {
                BatchOp::TaintRecord { address, record } => {
                    let bytes = serde_json::to_vec(&record).map_err(StoreError::Encode)?;
                    main.put(keys::tainted(&address).as_bytes(), &bytes);
                }
                BatchOp::TxRecord(record) => {
                    let bytes = serde_json::to_vec(&record).map_err(StoreError::Encode)?;
                    main.put(keys::tx(&record.txid).as_bytes(), &bytes);
                }
                BatchOp::Outpoint { outpoint, record } => {
                    let bytes = serde_json::to_vec(&record).map_err(StoreError::Encode)?;
                    scan.put(keys::tainted_out(&outpoint).as_bytes(), &bytes);
                }
                BatchOp::SeedAddress(address) => {
                    scan.put(keys::seed_addr(&address).as_bytes(), b"");
                }
                BatchOp::ScanProgress(progress) => {
                    let bytes = serde_json::to_vec(&progress).map_err(StoreError::Encode)?;
                    scan.put(keys::SCAN_PROGRESS.as_bytes(), &bytes);
                }
                BatchOp::SeedInit(flag) => {
                    let bytes = serde_json::to_vec(&flag).map_err(StoreError::Encode)?;
                    scan.put(keys::SEED_INIT_FLAG.as_bytes(), &bytes);
                }
            }
        }

        if !main.is_empty() {
            self.main.write(main)?;
        }
        if !scan.is_empty() {
            self.scan.write(scan)?;
        }

        debug!(ops = total, "committed store batch");
        Ok(())
    }

    /// Write the seed initialization marker outside a batch.
    pub fn mark_seed_initialized(&self, flag: &SeedInitFlag) -> Result<()> {
        self.put_json(Keyspace::Scan, keys::SEED_INIT_FLAG, flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn outpoint_record(degree: u32) -> OutpointRecord {
        OutpointRecord {
            degree,
            address: Some("addr".to_string()),
            height: 170,
        }
    }

    #[test]
    fn taint_record_roundtrip() {
        let store = TaintStore::open_temp().unwrap();
        assert!(store.taint_record("a").unwrap().is_none());

        let rec = TaintRecord::seed("a");
        store.put_taint_record("a", &rec).unwrap();
        assert_eq!(store.taint_record("a").unwrap().unwrap(), rec);
    }

    #[test]
    fn outpoint_roundtrip_via_batch() {
        let store = TaintStore::open_temp().unwrap();
        let op = Outpoint::new("ff".repeat(32), 1);

        let mut batch = store.batch();
        batch.put_outpoint(op.clone(), outpoint_record(3));
        store.commit(batch).unwrap();

        let rec = store.outpoint(&op).unwrap().unwrap();
        assert_eq!(rec.degree, 3);
        assert_eq!(rec.height, 170);
    }

    #[test]
    fn batch_writes_nothing_until_commit() {
        let store = TaintStore::open_temp().unwrap();
        let op = Outpoint::new("aa".repeat(32), 0);

        let mut batch = store.batch();
        batch
            .put_outpoint(op.clone(), outpoint_record(1))
            .put_taint_record("addr", TaintRecord::seed("addr"))
            .set_scan_progress(ScanProgress::at(5));

        assert!(store.outpoint(&op).unwrap().is_none());
        assert!(store.taint_record("addr").unwrap().is_none());
        assert!(store.scan_progress().unwrap().is_none());

        store.commit(batch).unwrap();

        assert!(store.outpoint(&op).unwrap().is_some());
        assert!(store.taint_record("addr").unwrap().is_some());
        assert_eq!(store.scan_progress().unwrap().unwrap().last_block, 5);
    }

    #[test]
    fn empty_batch_commits() {
        let store = TaintStore::open_temp().unwrap();
        store.commit(StoreBatch::new()).unwrap();
    }

    #[test]
    fn seed_addresses_enumerate_in_order() {
        let store = TaintStore::open_temp().unwrap();
        let mut batch = store.batch();
        batch
            .put_seed_address("1C")
            .put_seed_address("1A")
            .put_seed_address("1B");
        store.commit(batch).unwrap();

        assert_eq!(store.seed_addresses().unwrap(), vec!["1A", "1B", "1C"]);
    }

    #[test]
    fn prefix_scan_does_not_leak_neighbors() {
        let store = TaintStore::open_temp().unwrap();
        store.put(Keyspace::Scan, "seed_addr:1A", b"").unwrap();
        store.put(Keyspace::Scan, "tainted_out:aa:0", b"1").unwrap();

        let seeds = store
            .scan_prefix(Keyspace::Scan, keys::SEED_ADDR_PREFIX)
            .unwrap();
        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds[0].0, "seed_addr:1A");
    }

    #[test]
    fn raw_put_get_delete() {
        let store = TaintStore::open_temp().unwrap();
        store.put(Keyspace::Main, "tx:abc", b"{}").unwrap();
        assert_eq!(
            store.get(Keyspace::Main, "tx:abc").unwrap().as_deref(),
            Some(&b"{}"[..])
        );

        store.delete(Keyspace::Main, "tx:abc").unwrap();
        assert!(store.get(Keyspace::Main, "tx:abc").unwrap().is_none());
    }

    #[test]
    fn seed_init_flag_roundtrip() {
        let store = TaintStore::open_temp().unwrap();
        assert!(store.seed_initialized().unwrap().is_none());

        let flag = SeedInitFlag {
            timestamp: Utc::now(),
            outpoint_count: 21_953,
        };
        store.mark_seed_initialized(&flag).unwrap();
        assert_eq!(
            store.seed_initialized().unwrap().unwrap().outpoint_count,
            21_953
        );
    }

    #[test]
    fn reopen_preserves_data() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = TaintStore::open(dir.path()).unwrap();
            store
                .put_taint_record("addr", &TaintRecord::seed("addr"))
                .unwrap();
        }
        let store = TaintStore::open(dir.path()).unwrap();
        assert!(store.taint_record("addr").unwrap().is_some());
    }
}
