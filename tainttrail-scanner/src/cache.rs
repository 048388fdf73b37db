//! Bounded cache of parent taint records.

use schnellru::{ByLength, LruMap};

use tainttrail_core::TaintRecord;

/// LRU cache of address taint records consulted while extending paths.
///
/// Strictly a read-amplification shield: eviction never affects
/// correctness, a miss falls through to the store.
pub struct ParentCache {
    inner: LruMap<String, TaintRecord>,
}

impl ParentCache {
    /// Create a cache holding at most `max` records.
    pub fn new(max: usize) -> Self {
        Self {
            inner: LruMap::new(ByLength::new(max.max(1) as u32)),
        }
    }

    /// Look up a record, marking it most recently used.
    pub fn get(&mut self, address: &str) -> Option<TaintRecord> {
        self.inner.get(&address.to_owned()).map(|rec| rec.clone())
    }

    /// Insert or refresh a record.
    pub fn insert(&mut self, address: String, record: TaintRecord) {
        self.inner.insert(address, record);
    }

    /// Number of cached records.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caches_and_evicts_oldest() {
        let mut cache = ParentCache::new(2);
        cache.insert("a".into(), TaintRecord::seed("a"));
        cache.insert("b".into(), TaintRecord::seed("b"));
        cache.insert("c".into(), TaintRecord::seed("c"));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn get_refreshes_recency() {
        let mut cache = ParentCache::new(2);
        cache.insert("a".into(), TaintRecord::seed("a"));
        cache.insert("b".into(), TaintRecord::seed("b"));

        assert!(cache.get("a").is_some());
        cache.insert("c".into(), TaintRecord::seed("c"));

        // "b" was least recently used
        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
    }
}
