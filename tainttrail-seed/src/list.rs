//! The curated seed height list.

use std::sync::OnceLock;

/// Payout addresses of blocks 0, 1 and 2.
///
/// Seeded unconditionally: the nodes of those eras used raw-pubkey coinbase
/// scripts the node may decline to decode, and these attributions are well
/// established.
pub const WELL_KNOWN_ADDRESSES: [&str; 3] = [
    "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa",
    "12c6DSiU4Rq3P4ZxziKxzrL5LmMBrzjrJX",
    "1HLoD9E4SDFFPDiYfNYnkBLQ85Y51J3Zb1",
];

/// Block heights attributed to Satoshi (Patoshi pattern plus blocks 0-2),
/// one decimal height per line, ascending.
const BUILTIN_HEIGHTS: &str = include_str!("../data/patoshi_heights.txt");

/// An immutable source of curated seed block heights.
///
/// The engine never fetches the list at runtime; the built-in copy ships
/// with the binary. Tests construct their own lists.
#[derive(Debug, Clone)]
pub struct SeedList {
    heights: Vec<u64>,
    extra_addresses: Vec<String>,
}

impl SeedList {
    /// Build a list from explicit heights and extra addresses.
    pub fn new(
        mut heights: Vec<u64>,
        extra_addresses: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        heights.sort_unstable();
        heights.dedup();
        Self {
            heights,
            extra_addresses: extra_addresses.into_iter().map(Into::into).collect(),
        }
    }

    /// The built-in curated list.
    pub fn builtin() -> &'static SeedList {
        static LIST: OnceLock<SeedList> = OnceLock::new();
        LIST.get_or_init(|| {
            let heights = BUILTIN_HEIGHTS
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(|line| line.parse().expect("built-in seed list is well-formed"))
                .collect();
            SeedList::new(heights, WELL_KNOWN_ADDRESSES)
        })
    }

    /// Curated heights, ascending and unique.
    pub fn heights(&self) -> &[u64] {
        &self.heights
    }

    /// Addresses seeded regardless of what the node decodes.
    pub fn extra_addresses(&self) -> &[String] {
        &self.extra_addresses
    }

    /// Number of curated heights.
    pub fn len(&self) -> usize {
        self.heights.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.heights.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_list_parses() {
        let list = SeedList::builtin();
        assert!(list.len() > 20_000);
        assert_eq!(&list.heights()[..3], &[0, 1, 2]);
        assert_eq!(list.extra_addresses().len(), 3);
    }

    #[test]
    fn builtin_list_is_ascending_and_unique() {
        let heights = SeedList::builtin().heights();
        assert!(heights.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn custom_list_sorts_and_dedups() {
        let list = SeedList::new(vec![9, 3, 3, 1], ["addr"]);
        assert_eq!(list.heights(), &[1, 3, 9]);
        assert_eq!(list.extra_addresses(), &["addr".to_string()]);
    }
}
