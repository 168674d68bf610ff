//! Per-word metadata that the word graph cannot answer on its own.

mod memory;

use serde::{Deserialize, Serialize};

pub use self::memory::{MemoryStore, StoreExtras};

use crate::error::StoreError;
use crate::query::SearchSet;

/// Rank of a word among words of the same length, plus the span of ranks tied with it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRange {
    pub order: u32,
    pub min: u32,
    pub max: u32,
}

impl OrderRange {
    /// Strict matching tests the rank itself, lax matching any overlap of the tied span
    pub fn matches(&self, min: u32, max: u32, lax: bool) -> bool {
        if lax {
            self.max >= min && self.min <= max
        } else {
            self.order >= min && self.order <= max
        }
    }
}

/// Gives each index its 1-based position in `sorted` along with the span of positions
/// holding the same value
pub(crate) fn assign_tie_spans(sorted: &[usize], values: &[f64], out: &mut [OrderRange]) {
    let mut start = 0;
    while start < sorted.len() {
        let mut end = start;
        while end + 1 < sorted.len() && values[sorted[end + 1]] == values[sorted[start]] {
            end += 1;
        }
        for (k, &i) in sorted.iter().enumerate().take(end + 1).skip(start) {
            out[i] = OrderRange {
                order: k as u32 + 1,
                min: start as u32 + 1,
                max: end as u32 + 1,
            };
        }
        start = end + 1;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WordInfo {
    pub word: String,
    pub definition: Option<String>,
    /// Letters that can be put in front, in alphabetical order
    pub front_hooks: String,
    /// Letters that can be put at the back, in alphabetical order
    pub back_hooks: String,
    /// The word minus its first letter is a word
    pub is_front_hook: bool,
    /// The word minus its last letter is a word
    pub is_back_hook: bool,
    /// Words sharing this word's letters, itself included
    pub num_anagrams: u32,
    pub playability: u64,
    pub playability_order: OrderRange,
    /// Indexed by the number of blanks in the bag, 0 to 2
    pub probability_order: [OrderRange; 3],
    pub groups: Vec<SearchSet>,
}

impl WordInfo {
    pub fn in_group(&self, group: SearchSet) -> bool {
        self.groups.contains(&group)
    }
}

/// Query surface of a metadata store. Implementations must be safe to share between threads.
pub trait AuxiliaryStore: Send + Sync {
    fn is_connected(&self) -> bool {
        true
    }

    /// Point lookup. `None` if the store has no entry for the word.
    fn word_info(&self, word: &str) -> Result<Option<WordInfo>, StoreError>;

    /// Lookup of many words in one round trip, results in input order
    fn lookup_batch(&self, words: &[&str]) -> Result<Vec<Option<WordInfo>>, StoreError> {
        words.iter().map(|w| self.word_info(w)).collect()
    }

    /// Words with `start <= word < end`, in order
    fn words_in_range(&self, start: &str, end: &str) -> Result<Vec<String>, StoreError>;
}
