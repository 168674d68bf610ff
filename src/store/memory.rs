use std::cmp::Ordering as CmpOrdering;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use fst::{IntoStreamer, Map, Streamer};
use rayon::prelude::*;

use super::{assign_tie_spans, AuxiliaryStore, OrderRange, WordInfo};
use crate::error::StoreError;
use crate::graph::WordGraph;
use crate::letters::{alphagram, letter_from_index, missing_letters, LetterBag, ALPHABET_SIZE};
use crate::query::SearchSet;
use crate::utils::serialization;

/// Letters a type two word's alphagram must be drawn from, in order
const TYPE_TWO_LETTERS: &str = "AAADEEEEGIIILNNOORRSSTTU";

/// Optional inputs besides the word list
#[derive(Debug, Clone, Default)]
pub struct StoreExtras {
    /// Six and seven letter stems used for the type one and stem groups
    pub stems: Vec<String>,
    pub playability: HashMap<String, u64>,
    pub definitions: HashMap<String, String>,
}

/// In-process metadata store keyed by an fst map from word to entry index
pub struct MemoryStore {
    index: Map<Vec<u8>>,
    entries: Vec<WordInfo>,
    connected: AtomicBool,
}

/// Everything needed to decide group membership
struct GroupContext<'a> {
    graph: &'a WordGraph,
    bag: LetterBag,
    six_stems: HashSet<String>,
    seven_stems: HashSet<String>,
    type_three_sevens: f64,
    type_three_eights: f64,
}

impl<'a> GroupContext<'a> {
    fn new(graph: &'a WordGraph, stems: &[String]) -> Self {
        let bag = LetterBag::default();
        let stems_of = |len: usize| -> HashSet<String> {
            stems
                .iter()
                .filter(|s| s.len() == len)
                .map(|s| alphagram(&s.to_ascii_uppercase()))
                .collect()
        };
        Self {
            graph,
            six_stems: stems_of(6),
            seven_stems: stems_of(7),
            type_three_sevens: bag.num_combinations("HUNTERS", 2),
            type_three_eights: bag.num_combinations("NOTIFIED", 2),
            bag,
        }
    }

    /// Some single-letter deletion of the alphagram is in `stems`
    fn deletion_in(agram: &str, stems: &HashSet<String>) -> bool {
        (0..agram.len()).any(|i| {
            let mut shorter = String::with_capacity(agram.len() - 1);
            shorter.push_str(&agram[..i]);
            shorter.push_str(&agram[i + 1..]);
            stems.contains(&shorter)
        })
    }

    fn type_one(&self, word: &str, agram: &str) -> bool {
        match word.len() {
            7 => Self::deletion_in(agram, &self.six_stems),
            8 => self
                .six_stems
                .iter()
                .any(|stem| missing_letters(stem, agram) == 0),
            _ => false,
        }
    }

    fn type_two(&self, word: &str, agram: &str) -> bool {
        let mut pool = TYPE_TWO_LETTERS.chars();
        let drawn = agram.chars().all(|c| pool.any(|t| t == c));
        drawn && !self.type_one(word, agram)
    }

    fn type_three(&self, word: &str, agram: &str) -> bool {
        let threshold = match word.len() {
            7 => self.type_three_sevens,
            8 => self.type_three_eights,
            _ => return false,
        };
        self.bag.num_combinations(word, 2) >= threshold
            && !self.type_one(word, agram)
            && !self.type_two(word, agram)
    }

    fn high_five(&self, word: &str) -> bool {
        if word.len() != 5 {
            return false;
        }
        let values: Vec<u32> = word.chars().map(|c| self.bag.score(c)).collect();
        let heavy_end = |v: u32| v == 4 || v == 5;
        values.iter().all(|&v| v <= 5) && (heavy_end(values[0]) || heavy_end(values[4]))
    }

    fn groups(&self, word: &str) -> Vec<SearchSet> {
        let agram = alphagram(word);
        let len = word.len();
        let front = len > 1 && self.graph.contains(&word[1..]);
        let back = len > 1 && self.graph.contains(&word[..len - 1]);
        SearchSet::ALL
            .iter()
            .copied()
            .filter(|set| match set {
                SearchSet::HookWords => front || back,
                SearchSet::FrontHooks => front,
                SearchSet::BackHooks => back,
                SearchSet::HighFives => self.high_five(word),
                SearchSet::TypeOneSevens => len == 7 && self.type_one(word, &agram),
                SearchSet::TypeOneEights => len == 8 && self.type_one(word, &agram),
                SearchSet::TypeTwoSevens => len == 7 && self.type_two(word, &agram),
                SearchSet::TypeTwoEights => len == 8 && self.type_two(word, &agram),
                SearchSet::TypeThreeSevens => len == 7 && self.type_three(word, &agram),
                SearchSet::TypeThreeEights => len == 8 && self.type_three(word, &agram),
                SearchSet::EightsFromSevenLetterStems => {
                    len == 8 && Self::deletion_in(&agram, &self.seven_stems)
                }
            })
            .collect()
    }
}

/// Ranks words by descending value among words of the same length. Ties share a span of ranks.
fn assign_orders(words: &[String], values: &[f64]) -> Vec<OrderRange> {
    let mut out = vec![OrderRange::default(); words.len()];
    let mut by_len: HashMap<usize, Vec<usize>> = HashMap::new();
    for (i, w) in words.iter().enumerate() {
        by_len.entry(w.len()).or_default().push(i);
    }
    for idxs in by_len.values_mut() {
        idxs.sort_by(|&a, &b| {
            values[b]
                .partial_cmp(&values[a])
                .unwrap_or(CmpOrdering::Equal)
                .then_with(|| words[a].cmp(&words[b]))
        });
        assign_tie_spans(idxs, values, &mut out);
    }
    out
}

impl MemoryStore {
    /// Computes metadata for every word in the graph
    pub fn build(graph: &WordGraph, extras: &StoreExtras) -> Result<Self, StoreError> {
        let mut words: Vec<String> = graph.words().map(|m| m.word).collect();
        words.sort_unstable();

        let mut anagram_counts: HashMap<String, u32> = HashMap::new();
        for w in words.iter() {
            *anagram_counts.entry(alphagram(w)).or_insert(0) += 1;
        }
        let groups = GroupContext::new(graph, &extras.stems);

        let mut entries: Vec<WordInfo> = words
            .par_iter()
            .map(|word| {
                let mut front_hooks = String::new();
                let mut back_hooks = String::new();
                for i in 0..ALPHABET_SIZE {
                    let letter = letter_from_index(i);
                    if graph.contains(&format!("{}{}", letter, word)) {
                        front_hooks.push(letter);
                    }
                    if graph.contains(&format!("{}{}", word, letter)) {
                        back_hooks.push(letter);
                    }
                }
                let len = word.len();
                WordInfo {
                    word: word.clone(),
                    definition: extras.definitions.get(word).cloned(),
                    front_hooks,
                    back_hooks,
                    is_front_hook: len > 1 && graph.contains(&word[1..]),
                    is_back_hook: len > 1 && graph.contains(&word[..len - 1]),
                    num_anagrams: anagram_counts.get(&alphagram(word)).copied().unwrap_or(1),
                    playability: extras.playability.get(word).copied().unwrap_or(0),
                    playability_order: OrderRange::default(),
                    probability_order: [OrderRange::default(); 3],
                    groups: groups.groups(word),
                }
            })
            .collect();

        for blanks in 0..3u8 {
            let combos: Vec<f64> = words
                .par_iter()
                .map(|w| groups.bag.num_combinations(w, blanks))
                .collect();
            for (entry, range) in entries.iter_mut().zip(assign_orders(&words, &combos)) {
                entry.probability_order[blanks as usize] = range;
            }
        }
        let playability: Vec<f64> = entries.iter().map(|e| e.playability as f64).collect();
        for (entry, range) in entries.iter_mut().zip(assign_orders(&words, &playability)) {
            entry.playability_order = range;
        }

        log::info!("built auxiliary store for {} words", entries.len());
        Self::from_entries(entries)
    }

    pub fn from_entries(mut entries: Vec<WordInfo>) -> Result<Self, StoreError> {
        entries.sort_by(|a, b| a.word.cmp(&b.word));
        entries.dedup_by(|a, b| a.word == b.word);
        let index = Map::from_iter(
            entries
                .iter()
                .enumerate()
                .map(|(i, e)| (e.word.as_bytes(), i as u64)),
        )?;
        Ok(Self {
            index,
            entries,
            connected: AtomicBool::new(true),
        })
    }

    pub fn save_to_disk<P: AsRef<Path>>(&self, path: P) -> Result<(), StoreError> {
        serialization::save_to_disk(&self.entries, path)
    }

    pub fn load_from_disk<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let entries: Vec<WordInfo> = serialization::load_from_disk(path)?;
        Self::from_entries(entries)
    }

    /// Simulates the backing store going away or coming back
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl AuxiliaryStore for MemoryStore {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn word_info(&self, word: &str) -> Result<Option<WordInfo>, StoreError> {
        if !self.is_connected() {
            return Err(StoreError::Unavailable);
        }
        Ok(self
            .index
            .get(word.to_ascii_uppercase())
            .map(|i| self.entries[i as usize].clone()))
    }

    fn words_in_range(&self, start: &str, end: &str) -> Result<Vec<String>, StoreError> {
        if !self.is_connected() {
            return Err(StoreError::Unavailable);
        }
        let mut stream = self.index.range().ge(start).lt(end).into_stream();
        let mut out = Vec::new();
        while let Some((key, _)) = stream.next() {
            out.push(String::from_utf8_lossy(key).into_owned());
        }
        Ok(out)
    }
}
