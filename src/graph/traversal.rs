use std::collections::{HashSet, VecDeque};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{WordGraph, NULL};
use crate::letters::{LetterSet, Rack};

/*
    Generalized traversal over the word graph. A work list of partial states is
    expanded one sibling chain at a time, each state carrying what is left of the
    constraint: either a position in a token sequence or the letters remaining in
    a rack.
*/

/// How often the cancel flag is polled, in expanded states
const CANCEL_POLL_INTERVAL: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Literal(char),
    /// `?`
    Any,
    /// `[...]` or `[^...]`
    Class(LetterSet),
    /// `*`, zero or more letters
    Gap,
}

impl Token {
    fn accepts(&self, letter: char) -> bool {
        match self {
            Token::Literal(l) => *l == letter,
            Token::Any | Token::Gap => true,
            Token::Class(set) => set.contains(letter),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Letters must line up with the tokens in order
    Positional(Vec<Token>),
    /// Letters are drawn from the rack in any order. A partial match may leave
    /// letters unused.
    Multiset { rack: Rack, partial: bool },
}

/// A traversal constraint plus the pruning bounds applied while walking the graph
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub shape: Shape,
    pub min_len: usize,
    pub max_len: usize,
    /// Edges with letters outside this set are never followed
    pub allowed: LetterSet,
}

impl Fragment {
    pub fn positional(tokens: Vec<Token>) -> Self {
        let mut collapsed: Vec<Token> = Vec::with_capacity(tokens.len());
        for t in tokens {
            if t == Token::Gap && collapsed.last() == Some(&Token::Gap) {
                continue;
            }
            collapsed.push(t);
        }
        let fixed = collapsed.iter().filter(|t| **t != Token::Gap).count();
        let has_gap = collapsed.len() != fixed;
        Self {
            shape: Shape::Positional(collapsed),
            min_len: fixed.max(1),
            max_len: if has_gap { usize::MAX } else { fixed },
            allowed: LetterSet::any(),
        }
    }

    /// Every word in the graph
    pub fn all() -> Self {
        Self::positional(vec![Token::Gap])
    }

    pub fn prefix(letters: &str) -> Self {
        let mut tokens: Vec<Token> = letters.chars().map(Token::Literal).collect();
        tokens.push(Token::Gap);
        Self::positional(tokens)
    }

    pub fn suffix(letters: &str) -> Self {
        let mut tokens = vec![Token::Gap];
        tokens.extend(letters.chars().map(Token::Literal));
        Self::positional(tokens)
    }

    /// Words using every letter of the rack
    pub fn anagram(rack: Rack) -> Self {
        let n = rack.n_total as usize;
        let max_len = if rack.unlimited { usize::MAX } else { n };
        Self {
            allowed: rack.allowed_letters(),
            shape: Shape::Multiset {
                rack,
                partial: false,
            },
            min_len: n.max(1),
            max_len,
        }
    }

    /// Words using some of the letters of the rack
    pub fn subanagram(rack: Rack) -> Self {
        let max_len = if rack.unlimited {
            usize::MAX
        } else {
            rack.n_total as usize
        };
        Self {
            allowed: rack.allowed_letters(),
            shape: Shape::Multiset {
                rack,
                partial: true,
            },
            min_len: 1,
            max_len,
        }
    }

    /// Words containing at least the letters of the rack
    pub fn include(mut rack: Rack) -> Self {
        rack.unlimited = true;
        Self::anagram(rack)
    }

    /// Narrows the length window
    pub fn with_length(mut self, min_len: usize, max_len: usize) -> Self {
        self.min_len = self.min_len.max(min_len);
        self.max_len = self.max_len.min(max_len);
        self
    }

    /// Narrows the set of letters that may appear anywhere in a match
    pub fn restrict(mut self, allowed: LetterSet) -> Self {
        self.allowed = self.allowed.intersection(&allowed);
        self
    }

    /// The same constraint expressed for words read back to front
    pub fn reversed(&self) -> Self {
        let mut tmp = self.clone();
        if let Shape::Positional(tokens) = &mut tmp.shape {
            tokens.reverse();
        }
        tmp
    }

    /// Whether a single word satisfies the fragment, without consulting a graph
    pub fn matches(&self, word: &str) -> bool {
        let len = word.len();
        if len < self.min_len || len > self.max_len {
            return false;
        }
        if !word.chars().all(|c| self.allowed.contains(c)) {
            return false;
        }
        let mut cursors = vec![(start_cursor(&self.shape), BlankAssignmentList::Empty)];
        for (pos, letter) in word.chars().enumerate() {
            cursors = advance_all(&self.shape, &cursors, letter, pos);
            if cursors.is_empty() {
                return false;
            }
        }
        cursors.iter().any(|(c, _)| satisfied(&self.shape, c))
    }

    /// Number of literal tokens the fragment starts with
    pub fn leading_literals(&self) -> usize {
        match &self.shape {
            Shape::Positional(tokens) => tokens
                .iter()
                .take_while(|t| matches!(t, Token::Literal(_)))
                .count(),
            Shape::Multiset { .. } => 0,
        }
    }

    /// Number of literal tokens the fragment ends with
    pub fn trailing_literals(&self) -> usize {
        match &self.shape {
            Shape::Positional(tokens) => tokens
                .iter()
                .rev()
                .take_while(|t| matches!(t, Token::Literal(_)))
                .count(),
            Shape::Multiset { .. } => 0,
        }
    }
}

/// Letters matched by a blank along with their positions in the word
#[derive(Debug, Clone, PartialEq)]
pub enum BlankAssignmentList {
    Empty,
    Elem((char, usize), Rc<BlankAssignmentList>),
}

impl BlankAssignmentList {
    fn push(&self, letter: char, position: usize) -> Self {
        BlankAssignmentList::Elem((letter, position), Rc::new(self.clone()))
    }

    /// Positions in ascending order
    pub fn positions(&self) -> Vec<usize> {
        let mut out = Vec::new();
        let mut cur = self;
        while let BlankAssignmentList::Elem((_, pos), rest) = cur {
            out.push(*pos);
            cur = rest.as_ref();
        }
        out.sort_unstable();
        out
    }
}

/// A matched word and the positions filled by blanks
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Match {
    pub word: String,
    pub blanks: Vec<usize>,
}

impl Match {
    pub fn new(word: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            blanks: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Cursor {
    Tokens(usize),
    Rack(Rack),
}

/// Every cursor position reachable by one prefix, each kept once with the
/// first blank assignment that reached it
type Cursors = Vec<(Cursor, BlankAssignmentList)>;

#[derive(Debug, Clone)]
struct State {
    /// First node of the sibling chain to expand
    head: u32,
    word: String,
    cursors: Cursors,
}

/// Every way the cursor can move past `letter` at position `pos`
fn advance(
    shape: &Shape,
    cursor: &Cursor,
    blanks: &BlankAssignmentList,
    letter: char,
    pos: usize,
) -> Vec<(Cursor, BlankAssignmentList)> {
    match cursor {
        Cursor::Tokens(i) => {
            let tokens = match shape {
                Shape::Positional(tokens) => tokens,
                Shape::Multiset { .. } => return Vec::new(),
            };
            let mut out = Vec::new();
            match tokens.get(*i) {
                None => {}
                Some(Token::Gap) => {
                    // Either the gap swallows the letter or the gap ends here
                    out.push((Cursor::Tokens(*i), blanks.clone()));
                    if let Some(t) = tokens.get(*i + 1) {
                        if t.accepts(letter) {
                            out.push((Cursor::Tokens(*i + 2), blanks.clone()));
                        }
                    }
                }
                Some(t) => {
                    if t.accepts(letter) {
                        out.push((Cursor::Tokens(*i + 1), blanks.clone()));
                    }
                }
            }
            out
        }
        Cursor::Rack(rack) => {
            if let Some(r) = rack.remove(letter) {
                return vec![(Cursor::Rack(r), blanks.clone())];
            }
            let classes = rack.remove_class(letter);
            if !classes.is_empty() {
                return classes
                    .into_iter()
                    .map(|r| (Cursor::Rack(r), blanks.clone()))
                    .collect();
            }
            if let Some(r) = rack.remove_wildcard() {
                return vec![(Cursor::Rack(r), blanks.push(letter, pos))];
            }
            if rack.unlimited {
                return vec![(Cursor::Rack(rack.clone()), blanks.clone())];
            }
            Vec::new()
        }
    }
}

/// Moves every cursor past `letter`, merging cursors that land in the same place
fn advance_all(
    shape: &Shape,
    cursors: &[(Cursor, BlankAssignmentList)],
    letter: char,
    pos: usize,
) -> Cursors {
    let mut out: Cursors = Vec::new();
    for (cursor, blanks) in cursors {
        for (next, blanks) in advance(shape, cursor, blanks, letter, pos) {
            if !out.iter().any(|(c, _)| *c == next) {
                out.push((next, blanks));
            }
        }
    }
    out
}

fn satisfied(shape: &Shape, cursor: &Cursor) -> bool {
    match (cursor, shape) {
        (Cursor::Tokens(i), Shape::Positional(tokens)) => {
            tokens.iter().skip(*i).all(|t| *t == Token::Gap)
        }
        (Cursor::Rack(rack), Shape::Multiset { partial, .. }) => *partial || rack.is_exhausted(),
        _ => false,
    }
}

fn can_continue(shape: &Shape, cursor: &Cursor) -> bool {
    match (cursor, shape) {
        (Cursor::Tokens(i), Shape::Positional(tokens)) => *i < tokens.len(),
        (Cursor::Rack(rack), _) => !rack.is_exhausted() || rack.unlimited,
        _ => false,
    }
}

fn start_cursor(shape: &Shape) -> Cursor {
    match shape {
        Shape::Positional(_) => Cursor::Tokens(0),
        Shape::Multiset { rack, .. } => Cursor::Rack(rack.clone()),
    }
}

/// Lazy iterator over the words matching a fragment
pub struct Matches<'a> {
    graph: &'a WordGraph,
    fragment: Fragment,
    stack: Vec<State>,
    pending: VecDeque<Match>,
    seen: HashSet<String>,
    cancel: Option<&'a AtomicBool>,
    cancelled: bool,
    steps: usize,
}

impl<'a> Matches<'a> {
    pub(crate) fn new(
        graph: &'a WordGraph,
        fragment: &Fragment,
        cancel: Option<&'a AtomicBool>,
    ) -> Self {
        let fragment = if graph.is_reversed() {
            fragment.reversed()
        } else {
            fragment.clone()
        };
        let mut stack = Vec::new();
        let root = graph.root();
        if root != NULL && fragment.max_len > 0 && fragment.min_len <= fragment.max_len {
            stack.push(State {
                head: root,
                word: String::new(),
                cursors: vec![(start_cursor(&fragment.shape), BlankAssignmentList::Empty)],
            });
        }
        Self {
            graph,
            fragment,
            stack,
            pending: VecDeque::new(),
            seen: HashSet::new(),
            cancel,
            cancelled: false,
            steps: 0,
        }
    }

    /// Whether the traversal stopped because the cancel flag was raised
    pub fn cancelled(&self) -> bool {
        self.cancelled
    }

    fn emit(&mut self, word: &str, blanks: &BlankAssignmentList) {
        let (word, blanks) = if self.graph.is_reversed() {
            let last = word.len() - 1;
            let mut positions: Vec<usize> = blanks.positions().iter().map(|p| last - p).collect();
            positions.sort_unstable();
            (word.chars().rev().collect::<String>(), positions)
        } else {
            (word.to_string(), blanks.positions())
        };
        if self.seen.insert(word.clone()) {
            self.pending.push_back(Match { word, blanks });
        }
    }

    fn expand(&mut self, state: State) {
        let depth = state.word.len() + 1;
        let mut cur = state.head;
        while cur != NULL {
            let node = *self.graph.node(cur);
            cur = node.next;
            let letter = node.letter as char;
            if !self.fragment.allowed.contains(letter) {
                continue;
            }
            let shape = &self.fragment.shape;
            let mut cursors = advance_all(shape, &state.cursors, letter, depth - 1);
            if cursors.is_empty() {
                continue;
            }
            let mut word = state.word.clone();
            word.push(letter);
            if node.eow && depth >= self.fragment.min_len {
                if let Some((_, blanks)) = cursors.iter().find(|(c, _)| satisfied(shape, c)) {
                    self.emit(&word, blanks);
                }
            }
            let shape = &self.fragment.shape;
            cursors.retain(|(c, _)| can_continue(shape, c));
            if node.child != NULL && depth < self.fragment.max_len && !cursors.is_empty() {
                self.stack.push(State {
                    head: node.child,
                    word,
                    cursors,
                });
            }
        }
    }
}

impl<'a> Iterator for Matches<'a> {
    type Item = Match;

    fn next(&mut self) -> Option<Match> {
        loop {
            if let Some(m) = self.pending.pop_front() {
                return Some(m);
            }
            if self.cancelled {
                return None;
            }
            if let Some(flag) = self.cancel {
                if self.steps % CANCEL_POLL_INTERVAL == 0 && flag.load(Ordering::Relaxed) {
                    self.cancelled = true;
                    self.stack.clear();
                    return None;
                }
            }
            self.steps += 1;
            let state = self.stack.pop()?;
            self.expand(state);
        }
    }
}
