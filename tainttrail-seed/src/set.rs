//! In-memory seed address membership.

use std::collections::HashSet;

use tainttrail_store::{Result, TaintStore};

/// The set of seed addresses, held in memory for O(1) membership checks.
///
/// The scanner consults this for every output of every transaction, so it
/// must not touch the store; ~22k short strings fit comfortably.
#[derive(Debug, Default)]
pub struct SeedSet {
    addresses: HashSet<String>,
}

impl SeedSet {
    /// Load the membership set from the store's `seed_addr:` index.
    pub fn load(store: &TaintStore) -> Result<Self> {
        Ok(Self {
            addresses: store.seed_addresses()?.into_iter().collect(),
        })
    }

    /// Build a set from explicit addresses (tests, tooling).
    pub fn from_addresses(addresses: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            addresses: addresses.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `address` belongs to the seed set.
    pub fn contains(&self, address: &str) -> bool {
        self.addresses.contains(address)
    }

    /// Number of seed addresses.
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership() {
        let set = SeedSet::from_addresses(["1A", "1B"]);
        assert!(set.contains("1A"));
        assert!(!set.contains("1C"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn load_from_store() {
        let store = TaintStore::open_temp().unwrap();
        let mut batch = store.batch();
        batch.put_seed_address("1A").put_seed_address("1B");
        store.commit(batch).unwrap();

        let set = SeedSet::load(&store).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains("1B"));
    }
}
