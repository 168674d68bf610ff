use crate::error::QueryWarning;
use crate::graph::Match;

/// Deduplicated, alphabetically ordered query results
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSet {
    matches: Vec<Match>,
    /// Problems that narrowed the result without failing the query
    pub warnings: Vec<QueryWarning>,
}

impl CandidateSet {
    pub fn new(mut matches: Vec<Match>, warnings: Vec<QueryWarning>) -> Self {
        matches.sort_by(|a, b| a.word.cmp(&b.word));
        matches.dedup_by(|a, b| a.word == b.word);
        Self { matches, warnings }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    pub fn words(&self) -> Vec<&str> {
        self.matches.iter().map(|m| m.word.as_str()).collect()
    }

    pub fn into_words(self) -> Vec<String> {
        self.matches.into_iter().map(|m| m.word).collect()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.matches
            .binary_search_by(|m| m.word.as_str().cmp(word))
            .is_ok()
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Match> {
        self.matches.iter()
    }
}

impl IntoIterator for CandidateSet {
    type Item = Match;
    type IntoIter = std::vec::IntoIter<Match>;

    fn into_iter(self) -> Self::IntoIter {
        self.matches.into_iter()
    }
}
