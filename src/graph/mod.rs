//! Arena-backed directed acyclic word graph.
//!
//! Nodes live in one flat vector and refer to each other by index. Index 0 is a
//! null record so that a `next` or `child` of 0 means "none", and the root
//! sibling chain always starts at index 1.

mod builder;
mod loader;
mod traversal;

use std::collections::HashMap;

pub use self::builder::GraphBuilder;
pub use self::loader::{
    checksum16, load_graph, read_checksum_file, write_checksum_file, write_graph, ByteOrder,
    LoadOptions, LoadedGraph,
};
pub use self::traversal::{BlankAssignmentList, Fragment, Match, Matches, Shape, Token};

use crate::letters::normalize_word;

/// Index meaning "no node"
pub const NULL: u32 = 0;
/// Index of the first node of the root sibling chain
pub const ROOT: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Node {
    /// Upper case ASCII letter on the edge into this node
    pub letter: u8,
    /// A word ends at this node
    pub eow: bool,
    /// Next sibling in the chain, sorted by letter
    pub next: u32,
    /// First node of the child chain
    pub child: u32,
}

impl Node {
    pub const NULL: Node = Node {
        letter: 0,
        eow: false,
        next: NULL,
        child: NULL,
    };
}

/// An immutable word set. A reversed graph stores every word back to front but
/// answers queries in normal reading order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordGraph {
    nodes: Vec<Node>,
    n_words: usize,
    reversed: bool,
}

impl WordGraph {
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GraphBuilder::new();
        builder.extend(words);
        builder.build()
    }

    pub fn from_words_reversed<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GraphBuilder::reversed();
        builder.extend(words);
        builder.build()
    }

    /// Assumes the nodes have already been validated as an acyclic graph
    pub(crate) fn from_nodes(nodes: Vec<Node>, reversed: bool) -> Self {
        let n_words = count_words(&nodes);
        Self {
            nodes,
            n_words,
            reversed,
        }
    }

    pub(crate) fn from_parts(nodes: Vec<Node>, n_words: usize, reversed: bool) -> Self {
        Self {
            nodes,
            n_words,
            reversed,
        }
    }

    pub fn empty() -> Self {
        Self::from_parts(vec![Node::NULL], 0, false)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, index: u32) -> &Node {
        &self.nodes[index as usize]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of distinct words stored
    pub fn len(&self) -> usize {
        self.n_words
    }

    pub fn is_empty(&self) -> bool {
        self.n_words == 0
    }

    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    pub(crate) fn root(&self) -> u32 {
        if self.nodes.len() > ROOT as usize {
            ROOT
        } else {
            NULL
        }
    }

    /// Finds the sibling carrying `letter` in the chain starting at `head`
    pub(crate) fn find_sibling(&self, head: u32, letter: u8) -> u32 {
        let mut cur = head;
        while cur != NULL {
            let node = self.node(cur);
            if node.letter == letter {
                return cur;
            }
            cur = node.next;
        }
        NULL
    }

    /// Membership test, case insensitive. Anything outside A-Z is never a word.
    pub fn contains(&self, word: &str) -> bool {
        let word = match normalize_word(word) {
            Some(w) => w,
            None => return false,
        };
        let mut last = NULL;
        let mut head = self.root();
        let mut step = |b: u8| -> bool {
            last = self.find_sibling(head, b);
            if last == NULL {
                return false;
            }
            head = self.node(last).child;
            true
        };
        let found = if self.reversed {
            word.bytes().rev().all(&mut step)
        } else {
            word.bytes().all(&mut step)
        };
        found && last != NULL && self.node(last).eow
    }

    /// Lazily yields every word matching the fragment, each once.
    pub fn search<'a>(&'a self, fragment: &Fragment) -> Matches<'a> {
        Matches::new(self, fragment, None)
    }

    /// Same as [`WordGraph::search`] but stops early once `cancel` is set.
    pub fn search_with_cancel<'a>(
        &'a self,
        fragment: &Fragment,
        cancel: &'a std::sync::atomic::AtomicBool,
    ) -> Matches<'a> {
        Matches::new(self, fragment, Some(cancel))
    }

    /// Every word in the graph
    pub fn words(&self) -> Matches<'_> {
        self.search(&Fragment::all())
    }
}

/// Counts the paths ending at an end-of-word node, sharing work between merged sub-graphs
fn count_words(nodes: &[Node]) -> usize {
    if nodes.len() <= ROOT as usize {
        return 0;
    }
    let mut memo: HashMap<u32, usize> = HashMap::new();
    memo.insert(NULL, 0);
    let mut stack = vec![(ROOT, false)];
    while let Some((i, ready)) = stack.pop() {
        if memo.contains_key(&i) {
            continue;
        }
        let node = nodes[i as usize];
        if ready {
            let here = node.eow as usize + memo[&node.child] + memo[&node.next];
            memo.insert(i, here);
        } else {
            stack.push((i, true));
            stack.push((node.next, false));
            stack.push((node.child, false));
        }
    }
    memo[&ROOT]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::SliceRandom;

    const WORDS: [&str; 10] = [
        "CAT", "CATS", "ACT", "ACTS", "DOG", "DOGS", "COT", "CUT", "SCAT", "TACT",
    ];

    #[test]
    fn test_contains_every_inserted_word() {
        let graph = WordGraph::from_words(WORDS.iter());
        assert_eq!(graph.len(), WORDS.len());
        for w in WORDS.iter() {
            assert!(graph.contains(w), "{} missing", w);
            assert!(graph.contains(&w.to_lowercase()));
        }
    }

    #[test]
    fn test_no_false_positives() {
        let graph = WordGraph::from_words(WORDS.iter());
        for w in ["CA", "C", "", "CATSS", "DOGE", "TAC", "CAT!", "SCATS"] {
            assert!(!graph.contains(w), "{} should not be a word", w);
        }
    }

    #[test]
    fn test_insertion_order_does_not_matter() {
        let graph = WordGraph::from_words(WORDS.iter());
        let mut shuffled = WORDS.to_vec();
        let mut rng = rand::thread_rng();
        for _ in 0..10 {
            shuffled.shuffle(&mut rng);
            let other = WordGraph::from_words(shuffled.iter());
            assert_eq!(graph, other);
        }
    }

    #[test]
    fn test_reversed_graph_contains() {
        let graph = WordGraph::from_words_reversed(WORDS.iter());
        assert!(graph.is_reversed());
        for w in WORDS.iter() {
            assert!(graph.contains(w));
        }
        assert!(!graph.contains("TAC"));
        assert!(!graph.contains("GOD"));
    }

    #[test]
    fn test_empty_graph() {
        let graph = WordGraph::from_words(Vec::<String>::new());
        assert!(graph.is_empty());
        assert_eq!(graph.node_count(), 1);
        assert!(!graph.contains("A"));
        assert_eq!(graph.words().count(), 0);
    }

    #[test]
    fn test_count_words_after_merging() {
        let graph = WordGraph::from_words(WORDS.iter());
        let recounted = WordGraph::from_nodes(graph.nodes().to_vec(), false);
        assert_eq!(recounted.len(), WORDS.len());
    }
}
