//! Splits a query into graph, store and post-filter phases and runs them in that order.
//!
//! One non-negated graph condition is chosen to drive a traversal of the word
//! graph. Every other condition is checked per candidate, so a negated
//! condition simply flips its own check. Store-backed conditions are resolved
//! with a single batched lookup for all surviving candidates.

use std::cmp::Ordering as CmpOrdering;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use super::pattern::{parse_letters, parse_pattern, parse_rack};
use super::{CandidateSet, Condition, ConditionKind, Query, SearchSet};
use crate::error::{PatternError, QueryError, QueryWarning};
use crate::graph::{Fragment, Match};
use crate::letters::{
    alphagram, count_unique_letters, count_vowels, normalize_word, LetterSet, Rack,
};
use crate::lexicon::Lexicon;
use crate::store::{assign_tie_spans, OrderRange, WordInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Answerable by walking the word graph
    GraphNative,
    /// Needs per-word metadata from the auxiliary store
    AuxiliaryStore,
    /// Computed from the word itself after the other phases
    PostFilter,
}

pub fn classify(kind: &ConditionKind) -> Phase {
    match kind {
        ConditionKind::PatternMatch { .. }
        | ConditionKind::AnagramMatch { .. }
        | ConditionKind::SubanagramMatch { .. }
        | ConditionKind::Prefix { .. }
        | ConditionKind::Suffix { .. }
        | ConditionKind::Length { .. }
        | ConditionKind::IncludeLetters { .. }
        | ConditionKind::ExcludeLetters { .. } => Phase::GraphNative,
        ConditionKind::BelongToGroup { .. }
        | ConditionKind::InWordList { .. }
        | ConditionKind::ProbabilityOrder { .. }
        | ConditionKind::PlayabilityOrder { .. }
        | ConditionKind::NumAnagrams { .. }
        | ConditionKind::Definition { .. }
        | ConditionKind::PartOfSpeech { .. }
        | ConditionKind::LimitByPlayabilityOrder { .. } => Phase::AuxiliaryStore,
        ConditionKind::NumVowels { .. }
        | ConditionKind::NumUniqueLetters { .. }
        | ConditionKind::PointValue { .. }
        | ConditionKind::ConsistOf { .. }
        | ConditionKind::TakesPrefix { .. }
        | ConditionKind::TakesSuffix { .. }
        | ConditionKind::LimitByProbabilityOrder { .. } => Phase::PostFilter,
    }
}

/// Inclusive numeric window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Window {
    min: u32,
    max: u32,
}

impl Window {
    fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    fn from_lengths(min: usize, max: usize) -> Self {
        let clamp = |n: usize| u32::try_from(n).unwrap_or(u32::MAX);
        Self::new(clamp(min), clamp(max))
    }

    fn contains(&self, value: u32) -> bool {
        value >= self.min && value <= self.max
    }

    fn intersect(&self, other: &Window) -> Self {
        Self::new(self.min.max(other.min), self.max.min(other.max))
    }

    fn is_empty(&self) -> bool {
        self.min > self.max
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ranking {
    Probability { blanks: u8 },
    Playability,
}

/// Keeps the candidates whose rank among all candidates falls in the window
#[derive(Debug, Clone, Copy)]
struct Limit {
    ranking: Ranking,
    window: Window,
    lax: bool,
}

#[derive(Debug, Clone)]
enum Check {
    Shape(Fragment),
    Exclude(LetterSet),
    Length(Window),
    NumVowels(Window),
    NumUniqueLetters(Window),
    PointValue(Window),
    ConsistOf { window: Window, letters: LetterSet },
    NumAnagrams(Window),
    ProbabilityOrder { window: Window, blanks: u8, lax: bool },
    PlayabilityOrder { window: Window, lax: bool },
    Group(SearchSet),
    /// Upper-cased text to find in the definition
    Definition(String),
    PartOfSpeech(String),
    Limit(Limit),
    InWordList(HashSet<String>),
    TakesPrefix(String),
    TakesSuffix(String),
}

/// A compiled condition
#[derive(Debug, Clone)]
struct Step {
    check: Check,
    negated: bool,
    phase: Phase,
    /// Lower is more selective when driving a traversal
    rank: u8,
}

impl Step {
    fn needs_store(&self) -> bool {
        matches!(
            self.check,
            Check::NumAnagrams(_)
                | Check::ProbabilityOrder { .. }
                | Check::PlayabilityOrder { .. }
                | Check::Group(_)
                | Check::Definition(_)
                | Check::PartOfSpeech(_)
        )
    }

    /// Result of the check itself, `None` when store data it needs is missing
    fn raw(&self, word: &str, info: Option<&WordInfo>, lexicon: &Lexicon) -> Option<bool> {
        let len = word.len() as u32;
        Some(match &self.check {
            Check::Shape(fragment) => fragment.matches(word),
            Check::Exclude(set) => !word.chars().any(|c| set.contains(c)),
            Check::Length(w) => w.contains(len),
            Check::NumVowels(w) => w.contains(count_vowels(word) as u32),
            Check::NumUniqueLetters(w) => w.contains(count_unique_letters(word) as u32),
            Check::PointValue(w) => w.contains(lexicon.bag().word_value(word)),
            Check::ConsistOf { window, letters } => {
                let n = word.chars().filter(|&c| letters.contains(c)).count() as u64;
                let len = len as u64;
                n * 100 >= window.min as u64 * len && n * 100 <= window.max as u64 * len
            }
            Check::TakesPrefix(prefix) => lexicon.contains(&format!("{}{}", prefix, word)),
            Check::TakesSuffix(suffix) => lexicon.contains(&format!("{}{}", word, suffix)),
            Check::InWordList(words) => words.contains(word),
            Check::NumAnagrams(w) => w.contains(info?.num_anagrams),
            Check::ProbabilityOrder { window, blanks, lax } => info?.probability_order
                [(*blanks).min(2) as usize]
                .matches(window.min, window.max, *lax),
            Check::PlayabilityOrder { window, lax } => {
                info?.playability_order.matches(window.min, window.max, *lax)
            }
            Check::Group(group) => info?.in_group(*group),
            Check::Definition(text) => info?
                .definition
                .as_deref()
                .map_or(false, |d| d.to_ascii_uppercase().contains(text.as_str())),
            Check::PartOfSpeech(tag) => info?.definition.as_deref().map_or(false, |d| {
                let d = d.to_ascii_uppercase();
                d.contains(&format!("[{} ", tag)) || d.contains(&format!("[{}]", tag))
            }),
            // Applied to the whole candidate set in `apply_limits`
            Check::Limit(_) => true,
        })
    }

    /// A word the store knows nothing about fails regardless of negation
    fn holds(&self, word: &str, info: Option<&WordInfo>, lexicon: &Lexicon) -> bool {
        match self.raw(word, info, lexicon) {
            Some(v) => v != self.negated,
            None => false,
        }
    }
}

fn invalid_pattern(pattern: &str) -> impl FnOnce(PatternError) -> QueryError + '_ {
    move |source| QueryError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    }
}

fn compile(condition: &Condition) -> Result<Step, QueryError> {
    let kind = condition.kind();
    if condition.is_negated() && kind.is_range() {
        return Err(QueryError::InvalidCondition(format!(
            "range condition {} cannot be negated",
            condition
        )));
    }
    let (check, rank) = match kind {
        ConditionKind::AnagramMatch { letters } => {
            let rack = parse_rack(letters).map_err(invalid_pattern(letters))?;
            (Check::Shape(Fragment::anagram(rack)), 0)
        }
        ConditionKind::PatternMatch { pattern } => {
            let tokens = parse_pattern(pattern).map_err(invalid_pattern(pattern))?;
            (Check::Shape(Fragment::positional(tokens)), 1)
        }
        ConditionKind::SubanagramMatch { letters } => {
            let rack = parse_rack(letters).map_err(invalid_pattern(letters))?;
            (Check::Shape(Fragment::subanagram(rack)), 2)
        }
        ConditionKind::Prefix { letters } => {
            let letters = parse_letters(letters).map_err(invalid_pattern(letters))?;
            (Check::Shape(Fragment::prefix(&letters)), 3)
        }
        ConditionKind::Suffix { letters } => {
            let letters = parse_letters(letters).map_err(invalid_pattern(letters))?;
            (Check::Shape(Fragment::suffix(&letters)), 3)
        }
        ConditionKind::IncludeLetters { letters } => {
            let letters = parse_letters(letters).map_err(invalid_pattern(letters))?;
            let rack: Rack = letters.chars().collect();
            (Check::Shape(Fragment::include(rack)), 4)
        }
        ConditionKind::ExcludeLetters { letters } => {
            let letters = parse_letters(letters).map_err(invalid_pattern(letters))?;
            (Check::Exclude(letters.chars().collect()), u8::MAX)
        }
        ConditionKind::Length { min, max } => (Check::Length(Window::new(*min, *max)), u8::MAX),
        ConditionKind::NumVowels { min, max } => {
            (Check::NumVowels(Window::new(*min, *max)), u8::MAX)
        }
        ConditionKind::NumUniqueLetters { min, max } => {
            (Check::NumUniqueLetters(Window::new(*min, *max)), u8::MAX)
        }
        ConditionKind::PointValue { min, max } => {
            (Check::PointValue(Window::new(*min, *max)), u8::MAX)
        }
        ConditionKind::ConsistOf { min, max, letters } => {
            let letters = parse_letters(letters).map_err(invalid_pattern(letters))?;
            let check = Check::ConsistOf {
                window: Window::new(*min, *max),
                letters: letters.chars().collect(),
            };
            (check, u8::MAX)
        }
        ConditionKind::NumAnagrams { min, max } => {
            (Check::NumAnagrams(Window::new(*min, *max)), u8::MAX)
        }
        ConditionKind::ProbabilityOrder {
            min,
            max,
            blanks,
            lax,
        } => {
            let check = Check::ProbabilityOrder {
                window: Window::new(*min, *max),
                blanks: *blanks,
                lax: *lax,
            };
            (check, u8::MAX)
        }
        ConditionKind::PlayabilityOrder { min, max, lax } => {
            let check = Check::PlayabilityOrder {
                window: Window::new(*min, *max),
                lax: *lax,
            };
            (check, u8::MAX)
        }
        ConditionKind::BelongToGroup { group } => (Check::Group(*group), u8::MAX),
        ConditionKind::Definition { text } => {
            let text = text.trim().to_ascii_uppercase();
            if text.is_empty() {
                return Err(invalid_pattern("")(PatternError::Empty));
            }
            (Check::Definition(text), u8::MAX)
        }
        ConditionKind::PartOfSpeech { tag } => {
            let tag = tag.trim().to_ascii_uppercase();
            if tag.is_empty() {
                return Err(invalid_pattern("")(PatternError::Empty));
            }
            (Check::PartOfSpeech(tag), u8::MAX)
        }
        ConditionKind::LimitByProbabilityOrder {
            min,
            max,
            blanks,
            lax,
        } => {
            let limit = Limit {
                ranking: Ranking::Probability { blanks: *blanks },
                window: Window::new(*min, *max),
                lax: *lax,
            };
            (Check::Limit(limit), u8::MAX)
        }
        ConditionKind::LimitByPlayabilityOrder { min, max, lax } => {
            let limit = Limit {
                ranking: Ranking::Playability,
                window: Window::new(*min, *max),
                lax: *lax,
            };
            (Check::Limit(limit), u8::MAX)
        }
        ConditionKind::InWordList { words } => {
            let words = words.iter().filter_map(|w| normalize_word(w)).collect();
            (Check::InWordList(words), u8::MAX)
        }
        ConditionKind::TakesPrefix { letters } => {
            let letters = parse_letters(letters).map_err(invalid_pattern(letters))?;
            (Check::TakesPrefix(letters), u8::MAX)
        }
        ConditionKind::TakesSuffix { letters } => {
            let letters = parse_letters(letters).map_err(invalid_pattern(letters))?;
            (Check::TakesSuffix(letters), u8::MAX)
        }
    };
    Ok(Step {
        check,
        negated: condition.is_negated(),
        phase: classify(kind),
        rank,
    })
}

#[derive(Debug)]
enum Driver {
    /// Traverse the forward or reverse graph
    Graph { fragment: Fragment, reverse: bool },
    /// Words of an explicit list that the lexicon contains
    WordList(Vec<String>),
    /// Enumerate every word
    Lexicon,
}

#[derive(Debug)]
struct Plan {
    driver: Driver,
    /// All length bounds, stated and implied
    length: Window,
    /// Letters no result may contain
    excluded: LetterSet,
    graph_steps: Vec<Step>,
    store_steps: Vec<Step>,
    post_steps: Vec<Step>,
    /// Rank limits, applied once every other condition has been checked
    limits: Vec<Limit>,
    /// Set when the conditions cannot all hold at once
    contradiction: Option<String>,
}

/// Compiles and optimizes the query: folds length bounds, detects contradictions and picks a driver
fn plan(lexicon: &Lexicon, query: &Query) -> Result<Plan, QueryError> {
    let mut steps = query
        .conditions
        .iter()
        .map(compile)
        .collect::<Result<Vec<Step>, QueryError>>()?;

    let mut length = Window::new(1, u32::MAX);
    let mut excluded = LetterSet::empty();
    let mut required = LetterSet::empty();
    let mut contradiction = None;
    for (condition, step) in query.conditions.iter().zip(steps.iter()) {
        if step.negated {
            continue;
        }
        match (&step.check, condition.kind()) {
            (Check::Length(w), _) => length = length.intersect(w),
            (Check::Shape(f), kind) => {
                length = length.intersect(&Window::from_lengths(f.min_len, f.max_len));
                if let ConditionKind::IncludeLetters { letters } = kind {
                    required = required.union(&letters.to_ascii_uppercase().chars().collect());
                }
            }
            (Check::Exclude(set), _) => excluded = excluded.union(set),
            (Check::Group(group), _) => {
                if let Some(n) = group.implied_length() {
                    length = length.intersect(&Window::new(n, n));
                }
            }
            (Check::ConsistOf { window, .. }, _)
            | (Check::ProbabilityOrder { window, .. }, _)
            | (Check::PlayabilityOrder { window, .. }, _)
            | (Check::Limit(Limit { window, .. }), _) => {
                if window.is_empty() {
                    contradiction = Some(format!("empty range in {}", condition));
                }
            }
            _ => {}
        }
    }
    // Windows of the same kind must overlap
    let mut merged: HashMap<&'static str, Window> = HashMap::new();
    for step in steps.iter() {
        let (name, w) = match &step.check {
            Check::NumVowels(w) => ("vowel count", w),
            Check::NumUniqueLetters(w) => ("unique letter count", w),
            Check::PointValue(w) => ("point value", w),
            Check::NumAnagrams(w) => ("anagram count", w),
            _ => continue,
        };
        let window = merged.entry(name).or_insert(Window::new(0, u32::MAX));
        *window = window.intersect(w);
        if window.is_empty() {
            contradiction = Some(format!("{} windows do not overlap", name));
        }
    }
    for name in ["vowel count", "unique letter count"] {
        if merged.get(name).map_or(false, |w| w.min > length.max) {
            contradiction = Some(format!("{} exceeds the longest allowed word", name));
        }
    }
    if length.is_empty() {
        contradiction = Some("length bounds exclude every word".into());
    }
    if !required.intersection(&excluded).is_empty() {
        contradiction = Some(format!(
            "letters {:?} are both required and excluded",
            required.intersection(&excluded)
        ));
    }
    // Stated length bounds live on in the folded window
    steps.retain(|s| !matches!(s.check, Check::Length(_)));
    let mut limits = Vec::new();
    steps.retain(|s| match s.check {
        Check::Limit(limit) => {
            limits.push(limit);
            false
        }
        _ => true,
    });

    let driver_at = steps
        .iter()
        .enumerate()
        .filter(|(_, s)| !s.negated && matches!(s.check, Check::Shape(_)))
        .min_by_key(|(i, s)| (s.rank, *i))
        .map(|(i, _)| i);
    let driver = match driver_at {
        Some(i) => {
            let step = steps.remove(i);
            match step.check {
                Check::Shape(fragment) => {
                    let reverse = lexicon.reverse_graph().is_some()
                        && fragment.trailing_literals() > fragment.leading_literals();
                    Driver::Graph { fragment, reverse }
                }
                _ => Driver::Lexicon,
            }
        }
        None => {
            let list = steps.iter().find_map(|s| match &s.check {
                Check::InWordList(words) if !s.negated => Some(words),
                _ => None,
            });
            match list {
                Some(words) => {
                    let mut words: Vec<String> = words.iter().cloned().collect();
                    words.sort_unstable();
                    Driver::WordList(words)
                }
                None => Driver::Lexicon,
            }
        }
    };

    let mut graph_steps = Vec::new();
    let mut store_steps = Vec::new();
    let mut post_steps = Vec::new();
    for step in steps {
        match step.phase {
            Phase::GraphNative => graph_steps.push(step),
            Phase::AuxiliaryStore => store_steps.push(step),
            Phase::PostFilter => post_steps.push(step),
        }
    }

    Ok(Plan {
        driver,
        length,
        excluded,
        graph_steps,
        store_steps,
        post_steps,
        limits,
        contradiction,
    })
}

fn check_cancel(cancel: Option<&AtomicBool>) -> Result<(), QueryError> {
    match cancel {
        Some(flag) if flag.load(Ordering::Relaxed) => Err(QueryError::Cancelled),
        _ => Ok(()),
    }
}

fn drive(lexicon: &Lexicon, plan: &Plan, cancel: Option<&AtomicBool>) -> Result<Vec<Match>, QueryError> {
    let (fragment, reverse) = match &plan.driver {
        Driver::WordList(words) => {
            return Ok(words
                .iter()
                .filter(|w| lexicon.contains(w))
                .map(Match::new)
                .collect())
        }
        Driver::Graph { fragment, reverse } => (fragment.clone(), *reverse),
        Driver::Lexicon => {
            log::debug!("no graph condition to drive the query, enumerating {} words", lexicon.len());
            (Fragment::all(), false)
        }
    };
    let fragment = fragment
        .with_length(plan.length.min as usize, plan.length.max as usize)
        .restrict(plan.excluded.complement());
    let graph = match (reverse, lexicon.reverse_graph()) {
        (true, Some(reverse)) => reverse,
        _ => lexicon.graph(),
    };
    let mut matches = match cancel {
        Some(flag) => graph.search_with_cancel(&fragment, flag),
        None => graph.search(&fragment),
    };
    let found: Vec<Match> = matches.by_ref().collect();
    if matches.cancelled() {
        return Err(QueryError::Cancelled);
    }
    Ok(found)
}

/// Fetches store entries for every candidate, or explains why that was impossible
fn fetch_infos(lexicon: &Lexicon, candidates: &[Match]) -> Result<Vec<Option<WordInfo>>, String> {
    let store = lexicon
        .store()
        .ok_or_else(|| format!("lexicon {} has no auxiliary store", lexicon.name()))?;
    if !store.is_connected() {
        return Err("auxiliary store is not connected".into());
    }
    let words: Vec<&str> = candidates.iter().map(|m| m.word.as_str()).collect();
    let infos = store.lookup_batch(&words).map_err(|e| e.to_string())?;
    if infos.len() != words.len() {
        return Err(format!(
            "store answered {} of {} lookups",
            infos.len(),
            words.len()
        ));
    }
    Ok(infos)
}

/// Ranks the candidates by descending value, ties broken by alphagram then spelling
fn rank(words: &[&str], values: &[f64]) -> Vec<OrderRange> {
    let keys: Vec<String> = words.iter().map(|w| alphagram(w)).collect();
    let mut sorted: Vec<usize> = (0..words.len()).collect();
    sorted.sort_by(|&a, &b| {
        values[b]
            .partial_cmp(&values[a])
            .unwrap_or(CmpOrdering::Equal)
            .then_with(|| keys[a].cmp(&keys[b]))
            .then_with(|| words[a].cmp(words[b]))
    });
    let mut out = vec![OrderRange::default(); words.len()];
    assign_tie_spans(&sorted, values, &mut out);
    out
}

/// Keeps the candidates that every limit ranks inside its window. Each limit ranks the
/// same set, all lengths together.
fn apply_limits(
    lexicon: &Lexicon,
    limits: &[Limit],
    candidates: Vec<Match>,
    warnings: &mut Vec<QueryWarning>,
) -> Vec<Match> {
    let playability: Vec<f64> = if limits.iter().any(|l| l.ranking == Ranking::Playability) {
        match fetch_infos(lexicon, &candidates) {
            Ok(infos) => infos
                .iter()
                .map(|info| info.as_ref().map_or(0.0, |i| i.playability as f64))
                .collect(),
            Err(reason) => {
                log::warn!("playability limits cannot be applied: {}", reason);
                warnings.push(QueryWarning::StoreUnavailable(reason));
                return Vec::new();
            }
        }
    } else {
        Vec::new()
    };

    let words: Vec<&str> = candidates.iter().map(|m| m.word.as_str()).collect();
    let mut keep = vec![true; words.len()];
    for limit in limits {
        let ranks = match limit.ranking {
            Ranking::Probability { blanks } => {
                let values: Vec<f64> = words
                    .iter()
                    .map(|w| lexicon.bag().num_combinations(w, blanks))
                    .collect();
                rank(&words, &values)
            }
            Ranking::Playability => rank(&words, &playability),
        };
        for (k, r) in keep.iter_mut().zip(ranks.iter()) {
            *k = *k && r.matches(limit.window.min, limit.window.max, limit.lax);
        }
    }
    let kept: Vec<Match> = candidates
        .into_iter()
        .zip(keep)
        .filter(|(_, k)| *k)
        .map(|(m, _)| m)
        .collect();
    log::trace!("rank limits kept {} candidates", kept.len());
    kept
}

fn run(lexicon: &Lexicon, query: &Query, cancel: Option<&AtomicBool>) -> Result<CandidateSet, QueryError> {
    let plan = plan(lexicon, query)?;
    if let Some(reason) = &plan.contradiction {
        log::debug!("query cannot match anything: {}", reason);
        return Ok(CandidateSet::empty());
    }
    log::debug!(
        "query plan: driver {:?}, {} graph, {} store and {} post conditions",
        plan.driver,
        plan.graph_steps.len(),
        plan.store_steps.len(),
        plan.post_steps.len()
    );

    let start = Instant::now();
    let mut candidates = drive(lexicon, &plan, cancel)?;
    log::trace!("driver found {} candidates in {:?}", candidates.len(), start.elapsed());

    candidates.retain(|m| {
        plan.length.contains(m.word.len() as u32)
            && plan.graph_steps.iter().all(|s| s.holds(&m.word, None, lexicon))
    });
    check_cancel(cancel)?;

    let mut warnings = Vec::new();
    if !plan.store_steps.is_empty() && !candidates.is_empty() {
        let start = Instant::now();
        let infos = if plan.store_steps.iter().any(Step::needs_store) {
            match fetch_infos(lexicon, &candidates) {
                Ok(infos) => Some(infos),
                Err(reason) => {
                    log::warn!("store-backed conditions cannot be checked: {}", reason);
                    warnings.push(QueryWarning::StoreUnavailable(reason));
                    candidates.clear();
                    None
                }
            }
        } else {
            None
        };
        if !candidates.is_empty() {
            candidates = candidates
                .into_iter()
                .enumerate()
                .filter(|(i, m)| {
                    let info = infos.as_ref().and_then(|v| v[*i].as_ref());
                    plan.store_steps.iter().all(|s| s.holds(&m.word, info, lexicon))
                })
                .map(|(_, m)| m)
                .collect();
        }
        log::trace!("store phase kept {} candidates in {:?}", candidates.len(), start.elapsed());
    }
    check_cancel(cancel)?;

    candidates.retain(|m| plan.post_steps.iter().all(|s| s.holds(&m.word, None, lexicon)));
    if !plan.limits.is_empty() && !candidates.is_empty() {
        check_cancel(cancel)?;
        candidates = apply_limits(lexicon, &plan.limits, candidates, &mut warnings);
    }
    Ok(CandidateSet::new(candidates, warnings))
}

/// Runs the query against the lexicon
pub fn evaluate(lexicon: &Lexicon, query: &Query) -> Result<CandidateSet, QueryError> {
    run(lexicon, query, None)
}

/// Same as [`evaluate`], giving up with [`QueryError::Cancelled`] once `cancel` is set
pub fn evaluate_with_cancel(
    lexicon: &Lexicon,
    query: &Query,
    cancel: &AtomicBool,
) -> Result<CandidateSet, QueryError> {
    run(lexicon, query, Some(cancel))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::graph::{Shape, WordGraph};
    use crate::store::{MemoryStore, StoreExtras};

    const WORDS: [&str; 16] = [
        "CAT", "ACT", "DOG", "COT", "CUT", "CATS", "SCAT", "ACTS", "CAST", "TACT", "AT", "TA",
        "GOD", "DOGS", "QAT", "ZA",
    ];

    fn lexicon() -> Lexicon {
        Lexicon::from_words("test", WORDS)
    }

    fn lexicon_with_store() -> (Lexicon, Arc<MemoryStore>) {
        let lexicon = lexicon();
        let store = Arc::new(MemoryStore::build(lexicon.graph(), &StoreExtras::default()).unwrap());
        (lexicon.with_store(store.clone()), store)
    }

    fn lexicon_with_extras() -> Lexicon {
        let lexicon = lexicon();
        let mut extras = StoreExtras::default();
        extras.definitions.insert("CAT".into(), "a small Feline [n CATS]".into());
        extras.definitions.insert("DOG".into(), "a canine [n DOGS] / to follow [v DOGGED]".into());
        extras.definitions.insert("CUT".into(), "to sever [v CUT]".into());
        extras.definitions.insert("ZA".into(), "pizza [n]".into());
        extras.playability.insert("CAT".into(), 900);
        extras.playability.insert("ACT".into(), 800);
        extras.playability.insert("DOG".into(), 800);
        extras.playability.insert("ZA".into(), 50);
        let store = Arc::new(MemoryStore::build(lexicon.graph(), &extras).unwrap());
        lexicon.with_store(store)
    }

    fn words(lexicon: &Lexicon, query: &Query) -> Vec<String> {
        evaluate(lexicon, query).unwrap().into_words()
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(Condition::anagram("CAT").kind()), Phase::GraphNative);
        assert_eq!(classify(Condition::length(1, 2).kind()), Phase::GraphNative);
        assert_eq!(
            classify(Condition::group(SearchSet::HookWords).kind()),
            Phase::AuxiliaryStore
        );
        assert_eq!(
            classify(&ConditionKind::PointValue { min: 1, max: 5 }),
            Phase::PostFilter
        );
    }

    #[test]
    fn test_anagram_law() {
        let lexicon = Lexicon::from_words("test", ["CAT", "ACT", "DOG"]);
        let query = Query::new().with(Condition::anagram("CAT"));
        assert_eq!(words(&lexicon, &query), vec!["ACT", "CAT"]);
    }

    #[test]
    fn test_pattern_wildcard() {
        let lexicon = Lexicon::from_words("test", ["CAT", "COT", "CUT", "CATS"]);
        let query = Query::new().with(Condition::pattern("C?T"));
        assert_eq!(words(&lexicon, &query), vec!["CAT", "COT", "CUT"]);
    }

    #[test]
    fn test_suffix_driven_by_reverse_graph() {
        let query = Query::new().with(Condition::suffix("AT"));
        let plan = plan(&lexicon(), &query).unwrap();
        assert!(matches!(plan.driver, Driver::Graph { reverse: true, .. }));
        assert_eq!(words(&lexicon(), &query), vec!["AT", "CAT", "QAT", "SCAT"]);

        let forward_only = Lexicon::new("fwd", WordGraph::from_words(WORDS));
        assert_eq!(
            words(&forward_only, &query),
            vec!["AT", "CAT", "QAT", "SCAT"]
        );
    }

    #[test]
    fn test_driver_preference() {
        let query = Query::new()
            .with(Condition::prefix("C"))
            .with(Condition::anagram("TAC"))
            .with(Condition::pattern("??T"));
        let plan = plan(&lexicon(), &query).unwrap();
        match &plan.driver {
            Driver::Graph { fragment, .. } => {
                assert!(matches!(fragment.shape, Shape::Multiset { partial: false, .. }))
            }
            other => panic!("unexpected driver {:?}", other),
        }
        assert_eq!(plan.graph_steps.len(), 2);
        assert_eq!(words(&lexicon(), &query), vec!["CAT"]);
    }

    #[test]
    fn test_conjunction_is_order_independent() {
        let conditions = vec![
            Condition::subanagram("CATS"),
            Condition::exclude("S"),
            Condition::length(2, 3),
            Condition::new(ConditionKind::NumVowels { min: 1, max: 1 }),
            Condition::pattern("*T").negate().unwrap(),
        ];
        let expected = vec!["TA"];
        let mut permuted = conditions.clone();
        for _ in 0..conditions.len() {
            permuted.rotate_left(1);
            let query: Query = permuted.iter().cloned().collect();
            assert_eq!(words(&lexicon(), &query), expected);
            permuted.reverse();
            let query: Query = permuted.iter().cloned().collect();
            assert_eq!(words(&lexicon(), &query), expected);
        }
    }

    #[test]
    fn test_store_conjunction_is_order_independent() {
        let (lexicon, _store) = lexicon_with_store();
        let conditions = vec![
            Condition::length(3, 4),
            Condition::new(ConditionKind::NumAnagrams { min: 2, max: 4 }),
            Condition::group(SearchSet::FrontHooks).negate().unwrap(),
            Condition::include("C"),
            Condition::pattern("*T"),
        ];
        let expected = vec!["ACT", "CAST"];
        let mut permuted = conditions.clone();
        for _ in 0..conditions.len() {
            permuted.rotate_left(1);
            let query: Query = permuted.iter().cloned().collect();
            assert_eq!(words(&lexicon, &query), expected);
            permuted.reverse();
            let query: Query = permuted.iter().cloned().collect();
            assert_eq!(words(&lexicon, &query), expected);
        }
    }

    #[test]
    fn test_negation_partitions_the_lexicon() {
        let lexicon = lexicon();
        let everything = words(&lexicon, &Query::new());
        assert_eq!(everything.len(), WORDS.len());
        let conditions = vec![
            Condition::pattern("C?T"),
            Condition::anagram("TAC"),
            Condition::subanagram("DOGS"),
            Condition::prefix("CA"),
            Condition::suffix("S"),
            Condition::include("T"),
            Condition::exclude("AEIOU"),
            Condition::in_words(["CAT", "DOG", "NOTAWORD"]),
            Condition::new(ConditionKind::TakesSuffix { letters: "S".into() }),
        ];
        for c in conditions {
            let positive = words(&lexicon, &Query::new().with(c.clone()));
            let negative = words(&lexicon, &Query::new().with(c.clone().negate().unwrap()));
            assert!(positive.iter().all(|w| !negative.contains(w)), "{} overlaps", c);
            let mut union: Vec<String> = positive.into_iter().chain(negative).collect();
            union.sort();
            assert_eq!(union, everything, "{} does not cover the lexicon", c);
        }
    }

    #[test]
    fn test_word_list_driver() {
        let query = Query::new()
            .with(Condition::in_words(["cat", "dog", "nope"]))
            .with(Condition::new(ConditionKind::PointValue { min: 5, max: 5 }));
        let plan = plan(&lexicon(), &query).unwrap();
        assert!(matches!(plan.driver, Driver::WordList(_)));
        assert_eq!(words(&lexicon(), &query), vec!["CAT", "DOG"]);
    }

    #[test]
    fn test_contradictions_short_circuit() {
        let query = Query::new()
            .with(Condition::include("Q"))
            .with(Condition::exclude("Q"));
        assert!(plan(&lexicon(), &query).unwrap().contradiction.is_some());
        assert!(evaluate(&lexicon(), &query).unwrap().is_empty());

        let query = Query::new()
            .with(Condition::anagram("CAT"))
            .with(Condition::length(4, 5));
        assert!(plan(&lexicon(), &query).unwrap().contradiction.is_some());

        let query = Query::new()
            .with(Condition::group(SearchSet::TypeOneSevens))
            .with(Condition::length(2, 3));
        assert!(evaluate(&lexicon(), &query).unwrap().is_empty());

        let query = Query::new()
            .with(Condition::new(ConditionKind::NumVowels { min: 1, max: 1 }))
            .with(Condition::new(ConditionKind::NumVowels { min: 2, max: 3 }));
        assert!(plan(&lexicon(), &query).unwrap().contradiction.is_some());
    }

    #[test]
    fn test_length_folding() {
        let query = Query::new()
            .with(Condition::pattern("*A*"))
            .with(Condition::length(2, 5))
            .with(Condition::length(3, 9));
        let plan = plan(&lexicon(), &query).unwrap();
        assert_eq!(plan.length, Window::new(3, 5));
        assert!(plan.graph_steps.is_empty());
    }

    #[test]
    fn test_post_filters() {
        let query = Query::new()
            .with(Condition::length(3, 3))
            .with(Condition::new(ConditionKind::PointValue { min: 11, max: 20 }));
        assert_eq!(words(&lexicon(), &query), vec!["QAT"]);

        let query = Query::new().with(Condition::new(ConditionKind::ConsistOf {
            min: 100,
            max: 100,
            letters: "ACT".into(),
        }));
        assert_eq!(words(&lexicon(), &query), vec!["ACT", "AT", "CAT", "TA", "TACT"]);

        let query = Query::new().with(Condition::new(ConditionKind::TakesPrefix {
            letters: "S".into(),
        }));
        assert_eq!(words(&lexicon(), &query), vec!["CAT"]);

        let query = Query::new().with(Condition::new(ConditionKind::NumUniqueLetters {
            min: 2,
            max: 2,
        }));
        assert_eq!(words(&lexicon(), &query), vec!["AT", "TA", "ZA"]);
    }

    #[test]
    fn test_store_conditions() {
        let (lexicon, _store) = lexicon_with_store();
        let query = Query::new().with(Condition::new(ConditionKind::NumAnagrams { min: 4, max: 4 }));
        assert_eq!(words(&lexicon, &query), vec!["ACTS", "CAST", "CATS", "SCAT"]);

        let query = Query::new()
            .with(Condition::length(3, 3))
            .with(Condition::group(SearchSet::FrontHooks));
        assert_eq!(words(&lexicon, &query), vec!["CAT", "QAT"]);

        let query = Query::new()
            .with(Condition::length(2, 2))
            .with(Condition::group(SearchSet::HookWords).negate().unwrap());
        assert_eq!(words(&lexicon, &query), vec!["AT", "TA", "ZA"]);

        let query = Query::new()
            .with(Condition::length(2, 2))
            .with(Condition::new(ConditionKind::ProbabilityOrder {
                min: 1,
                max: 1,
                blanks: 0,
                lax: false,
            }));
        assert_eq!(words(&lexicon, &query).len(), 1);
    }

    #[test]
    fn test_definition_conditions() {
        let lexicon = lexicon_with_extras();
        let query = Query::new().with(Condition::new(ConditionKind::Definition {
            text: "feline".into(),
        }));
        assert_eq!(words(&lexicon, &query), vec!["CAT"]);

        // Words without a definition never match, so they pass the negation
        let query = Query::new()
            .with(Condition::length(3, 3))
            .with(
                Condition::new(ConditionKind::Definition {
                    text: "FELINE".into(),
                })
                .negate()
                .unwrap(),
            );
        assert_eq!(
            words(&lexicon, &query),
            vec!["ACT", "COT", "CUT", "DOG", "GOD", "QAT"]
        );

        let pos = |tag: &str| {
            Query::new().with(Condition::new(ConditionKind::PartOfSpeech { tag: tag.into() }))
        };
        assert_eq!(words(&lexicon, &pos("n")), vec!["CAT", "DOG", "ZA"]);
        assert_eq!(words(&lexicon, &pos("V")), vec!["CUT", "DOG"]);

        let err = evaluate(&lexicon, &pos(" ")).unwrap_err();
        assert!(matches!(err, QueryError::InvalidPattern { .. }));
    }

    #[test]
    fn test_limit_by_playability_order() {
        let lexicon = lexicon_with_extras();
        let limit = |min, max, lax| {
            Query::new()
                .with(Condition::length(3, 3))
                .with(Condition::new(ConditionKind::LimitByPlayabilityOrder { min, max, lax }))
        };
        assert_eq!(words(&lexicon, &limit(1, 2, false)), vec!["ACT", "CAT"]);
        // DOG ties with ACT for second place
        assert_eq!(words(&lexicon, &limit(1, 2, true)), vec!["ACT", "CAT", "DOG"]);
        assert_eq!(words(&lexicon, &limit(3, 3, false)), vec!["DOG"]);
        assert!(words(&lexicon, &limit(20, 30, false)).is_empty());

        // Limits rank what the other conditions left
        let query = limit(1, 1, false).with(Condition::anagram("GOD"));
        assert_eq!(words(&lexicon, &query), vec!["DOG"]);

        let bare = Lexicon::from_words("bare", WORDS);
        let result = evaluate(&bare, &limit(1, 2, false)).unwrap();
        assert!(result.is_empty());
        assert!(matches!(
            result.warnings.as_slice(),
            [QueryWarning::StoreUnavailable(_)]
        ));
    }

    #[test]
    fn test_limit_by_probability_order() {
        let limit = |min, max, lax| {
            Query::new()
                .with(Condition::length(2, 2))
                .with(Condition::new(ConditionKind::LimitByProbabilityOrder {
                    min,
                    max,
                    blanks: 0,
                    lax,
                }))
        };
        // AT and TA share an alphagram and outrank ZA, no store needed
        assert_eq!(words(&lexicon(), &limit(1, 1, false)), vec!["AT"]);
        assert_eq!(words(&lexicon(), &limit(1, 1, true)), vec!["AT", "TA"]);
        assert_eq!(words(&lexicon(), &limit(3, 3, false)), vec!["ZA"]);

        let query = limit(3, 1, false);
        assert!(plan(&lexicon(), &query).unwrap().contradiction.is_some());
        assert!(words(&lexicon(), &query).is_empty());
    }

    #[test]
    fn test_store_unavailable_degrades_to_empty() {
        let (lexicon, store) = lexicon_with_store();
        store.set_connected(false);
        let query = Query::new()
            .with(Condition::anagram("TAC"))
            .with(Condition::group(SearchSet::HookWords));
        let result = evaluate(&lexicon, &query).unwrap();
        assert!(result.is_empty());
        assert!(matches!(
            result.warnings.as_slice(),
            [QueryWarning::StoreUnavailable(_)]
        ));

        let no_store = Lexicon::from_words("bare", WORDS);
        let result = evaluate(&no_store, &query).unwrap();
        assert!(result.is_empty());
        assert_eq!(result.warnings.len(), 1);

        // Word lists need no store
        let query = Query::new().with(Condition::in_words(["ZA"]));
        assert_eq!(evaluate(&no_store, &query).unwrap().words(), vec!["ZA"]);
    }

    #[test]
    fn test_invalid_input() {
        let err = evaluate(&lexicon(), &Query::new().with(Condition::pattern("C[AT"))).unwrap_err();
        assert!(matches!(err, QueryError::InvalidPattern { .. }));
        let err = evaluate(&lexicon(), &Query::new().with(Condition::prefix("C?"))).unwrap_err();
        assert!(matches!(err, QueryError::InvalidPattern { .. }));
        let long = "A".repeat(256);
        let err = evaluate(&lexicon(), &Query::new().with(Condition::subanagram(&long))).unwrap_err();
        assert!(matches!(
            err,
            QueryError::InvalidPattern {
                source: PatternError::RackTooLong { len: 256, .. },
                ..
            }
        ));
    }

    #[test]
    fn test_cancelled_query() {
        let flag = AtomicBool::new(true);
        let err = evaluate_with_cancel(&lexicon(), &Query::new(), &flag).unwrap_err();
        assert!(matches!(err, QueryError::Cancelled));
        let flag = AtomicBool::new(false);
        assert_eq!(
            evaluate_with_cancel(&lexicon(), &Query::new(), &flag).unwrap().len(),
            WORDS.len()
        );
    }

    #[test]
    fn test_blank_positions_survive() {
        let query = Query::new().with(Condition::anagram("DO?"));
        let result = evaluate(&lexicon(), &query).unwrap();
        let dog = result.iter().find(|m| m.word == "DOG").unwrap();
        assert_eq!(dog.blanks, vec![2]);
        let god = result.iter().find(|m| m.word == "GOD").unwrap();
        assert_eq!(god.blanks, vec![0]);
    }
}
