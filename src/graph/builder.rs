use std::collections::{HashMap, VecDeque};

use super::{Node, WordGraph, NULL, ROOT};
use crate::letters::normalize_word;

/// Builds a prefix tree with letter-sorted sibling chains, then merges identical
/// sub-graphs into a compact word graph.
#[derive(Debug)]
pub struct GraphBuilder {
    nodes: Vec<Node>,
    root: u32,
    n_words: usize,
    skipped: usize,
    reversed: bool,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::NULL],
            root: NULL,
            n_words: 0,
            skipped: 0,
            reversed: false,
        }
    }

    /// Stores every word back to front
    pub fn reversed() -> Self {
        Self {
            reversed: true,
            ..Self::new()
        }
    }

    /// Adds a word. Returns false if it was already present or is not made of letters.
    pub fn add_word(&mut self, word: &str) -> bool {
        let word = match normalize_word(word) {
            Some(w) => w,
            None => {
                self.skipped += 1;
                return false;
            }
        };
        let bytes: Vec<u8> = if self.reversed {
            word.bytes().rev().collect()
        } else {
            word.into_bytes()
        };

        let mut parent = NULL;
        for &b in bytes.iter() {
            parent = self.find_or_insert(parent, b);
        }
        let last = &mut self.nodes[parent as usize];
        if last.eow {
            false
        } else {
            last.eow = true;
            self.n_words += 1;
            true
        }
    }

    pub fn extend<I, S>(&mut self, words: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for w in words {
            self.add_word(w.as_ref());
        }
    }

    /// Words rejected because of characters outside A-Z
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn len(&self) -> usize {
        self.n_words
    }

    pub fn is_empty(&self) -> bool {
        self.n_words == 0
    }

    /// Child chain of `parent`, or the root chain when `parent` is null
    fn find_or_insert(&mut self, parent: u32, letter: u8) -> u32 {
        let head = if parent == NULL {
            self.root
        } else {
            self.nodes[parent as usize].child
        };
        let mut prev = NULL;
        let mut cur = head;
        while cur != NULL && self.nodes[cur as usize].letter < letter {
            prev = cur;
            cur = self.nodes[cur as usize].next;
        }
        if cur != NULL && self.nodes[cur as usize].letter == letter {
            return cur;
        }

        let idx = self.nodes.len() as u32;
        self.nodes.push(Node {
            letter,
            eow: false,
            next: cur,
            child: NULL,
        });
        if prev != NULL {
            self.nodes[prev as usize].next = idx;
        } else if parent == NULL {
            self.root = idx;
        } else {
            self.nodes[parent as usize].child = idx;
        }
        idx
    }

    /// Merges structurally identical nodes bottom up and lays the result out
    /// breadth first with the root chain at index 1.
    pub fn build(self) -> WordGraph {
        if self.skipped > 0 {
            log::warn!("skipped {} entries containing non-letters", self.skipped);
        }

        // Canonical class of every trie node, class 0 being null
        let mut canon = vec![NULL; self.nodes.len()];
        let mut classes = vec![Node::NULL];
        let mut register: HashMap<Node, u32> = HashMap::new();
        let mut stack = vec![(self.root, false)];
        while let Some((i, ready)) = stack.pop() {
            if i == NULL {
                continue;
            }
            let node = self.nodes[i as usize];
            if ready {
                let key = Node {
                    letter: node.letter,
                    eow: node.eow,
                    next: canon[node.next as usize],
                    child: canon[node.child as usize],
                };
                let id = *register.entry(key).or_insert_with(|| {
                    classes.push(key);
                    (classes.len() - 1) as u32
                });
                canon[i as usize] = id;
            } else {
                stack.push((i, true));
                stack.push((node.next, false));
                stack.push((node.child, false));
            }
        }

        let mut out = vec![Node::NULL];
        let root_class = canon[self.root as usize];
        if root_class != NULL {
            let mut remap = vec![NULL; classes.len()];
            remap[root_class as usize] = ROOT;
            out.push(Node::NULL);
            let mut queue = VecDeque::from([root_class]);
            while let Some(c) = queue.pop_front() {
                let class = classes[c as usize];
                for link in [class.next, class.child] {
                    if link != NULL && remap[link as usize] == NULL {
                        remap[link as usize] = out.len() as u32;
                        out.push(Node::NULL);
                        queue.push_back(link);
                    }
                }
            }
            for (c, class) in classes.iter().enumerate().skip(1) {
                let at = remap[c];
                if at != NULL {
                    out[at as usize] = Node {
                        letter: class.letter,
                        eow: class.eow,
                        next: remap[class.next as usize],
                        child: remap[class.child as usize],
                    };
                }
            }
        }

        log::debug!(
            "built word graph: {} words, {} trie nodes merged into {}",
            self.n_words,
            self.nodes.len() - 1,
            out.len() - 1
        );
        WordGraph::from_parts(out, self.n_words, self.reversed)
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}
