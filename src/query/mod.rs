//! Query conditions and their evaluation against a lexicon.

pub mod candidates;
pub mod compiler;
pub mod pattern;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use self::candidates::CandidateSet;
pub use self::compiler::{classify, evaluate, evaluate_with_cancel, Phase};

use crate::error::QueryError;

/// Named word groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SearchSet {
    /// Words that are a hook of another word at either end
    HookWords,
    /// Words that remain words without their first letter
    FrontHooks,
    /// Words that remain words without their last letter
    BackHooks,
    /// Five letter words with a four or five point letter at one end and nothing worth more
    HighFives,
    TypeOneSevens,
    TypeTwoSevens,
    TypeThreeSevens,
    TypeOneEights,
    TypeTwoEights,
    TypeThreeEights,
    EightsFromSevenLetterStems,
}

impl SearchSet {
    pub const ALL: [SearchSet; 11] = [
        SearchSet::HookWords,
        SearchSet::FrontHooks,
        SearchSet::BackHooks,
        SearchSet::HighFives,
        SearchSet::TypeOneSevens,
        SearchSet::TypeTwoSevens,
        SearchSet::TypeThreeSevens,
        SearchSet::TypeOneEights,
        SearchSet::TypeTwoEights,
        SearchSet::TypeThreeEights,
        SearchSet::EightsFromSevenLetterStems,
    ];

    /// Length every member of the group has, if fixed
    pub fn implied_length(&self) -> Option<u32> {
        match self {
            SearchSet::HighFives => Some(5),
            SearchSet::TypeOneSevens | SearchSet::TypeTwoSevens | SearchSet::TypeThreeSevens => {
                Some(7)
            }
            SearchSet::TypeOneEights
            | SearchSet::TypeTwoEights
            | SearchSet::TypeThreeEights
            | SearchSet::EightsFromSevenLetterStems => Some(8),
            SearchSet::HookWords | SearchSet::FrontHooks | SearchSet::BackHooks => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConditionKind {
    /// `?` matches one letter, `*` any run of letters, `[..]` and `[^..]` one letter of a class
    PatternMatch { pattern: String },
    /// Every letter used exactly once. `?` is a blank, `*` allows extra letters.
    AnagramMatch { letters: String },
    /// Some of the letters, each at most once
    SubanagramMatch { letters: String },
    Prefix { letters: String },
    Suffix { letters: String },
    /// The word contains at least these letters, with multiplicity
    IncludeLetters { letters: String },
    /// The word contains none of these letters
    ExcludeLetters { letters: String },
    Length { min: u32, max: u32 },
    NumVowels { min: u32, max: u32 },
    NumUniqueLetters { min: u32, max: u32 },
    PointValue { min: u32, max: u32 },
    /// Percentage of the word made of the given letters
    ConsistOf { min: u32, max: u32, letters: String },
    NumAnagrams { min: u32, max: u32 },
    /// Lax matching accepts words whose tied range overlaps the window
    ProbabilityOrder {
        min: u32,
        max: u32,
        #[serde(default)]
        blanks: u8,
        #[serde(default)]
        lax: bool,
    },
    PlayabilityOrder {
        min: u32,
        max: u32,
        #[serde(default)]
        lax: bool,
    },
    BelongToGroup { group: SearchSet },
    /// The definition contains the text, ignoring case
    Definition { text: String },
    /// The definition carries a part of speech tag such as `[n` or `[v]`
    PartOfSpeech { tag: String },
    /// Keeps the results ranked `min..=max` by probability among all the other results
    LimitByProbabilityOrder {
        min: u32,
        max: u32,
        #[serde(default)]
        blanks: u8,
        #[serde(default)]
        lax: bool,
    },
    LimitByPlayabilityOrder {
        min: u32,
        max: u32,
        #[serde(default)]
        lax: bool,
    },
    InWordList { words: Vec<String> },
    /// Prepending the letters yields a word
    TakesPrefix { letters: String },
    /// Appending the letters yields a word
    TakesSuffix { letters: String },
}

impl ConditionKind {
    /// Pure numeric windows. These are never negated.
    pub fn is_range(&self) -> bool {
        matches!(
            self,
            ConditionKind::Length { .. }
                | ConditionKind::NumVowels { .. }
                | ConditionKind::NumUniqueLetters { .. }
                | ConditionKind::PointValue { .. }
                | ConditionKind::ConsistOf { .. }
                | ConditionKind::NumAnagrams { .. }
                | ConditionKind::ProbabilityOrder { .. }
                | ConditionKind::PlayabilityOrder { .. }
                | ConditionKind::LimitByProbabilityOrder { .. }
                | ConditionKind::LimitByPlayabilityOrder { .. }
        )
    }

    pub fn phase(&self) -> Phase {
        classify(self)
    }
}

/// A single constraint on the words returned by a query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCondition")]
pub struct Condition {
    #[serde(flatten)]
    kind: ConditionKind,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    negated: bool,
}

#[derive(Deserialize)]
struct RawCondition {
    #[serde(flatten)]
    kind: ConditionKind,
    #[serde(default)]
    negated: bool,
}

impl TryFrom<RawCondition> for Condition {
    type Error = QueryError;

    fn try_from(raw: RawCondition) -> Result<Self, Self::Error> {
        let condition = Condition::new(raw.kind);
        if raw.negated {
            condition.negate()
        } else {
            Ok(condition)
        }
    }
}

impl Condition {
    pub fn new(kind: ConditionKind) -> Self {
        Self {
            kind,
            negated: false,
        }
    }

    /// Flips the condition. Numeric range conditions cannot be negated.
    pub fn negate(self) -> Result<Self, QueryError> {
        if self.kind.is_range() {
            return Err(QueryError::InvalidCondition(format!(
                "range condition {:?} cannot be negated",
                self.kind
            )));
        }
        Ok(Self {
            negated: !self.negated,
            ..self
        })
    }

    pub fn kind(&self) -> &ConditionKind {
        &self.kind
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    pub fn pattern(pattern: &str) -> Self {
        Self::new(ConditionKind::PatternMatch {
            pattern: pattern.into(),
        })
    }
    pub fn anagram(letters: &str) -> Self {
        Self::new(ConditionKind::AnagramMatch {
            letters: letters.into(),
        })
    }
    pub fn subanagram(letters: &str) -> Self {
        Self::new(ConditionKind::SubanagramMatch {
            letters: letters.into(),
        })
    }
    pub fn prefix(letters: &str) -> Self {
        Self::new(ConditionKind::Prefix {
            letters: letters.into(),
        })
    }
    pub fn suffix(letters: &str) -> Self {
        Self::new(ConditionKind::Suffix {
            letters: letters.into(),
        })
    }
    pub fn include(letters: &str) -> Self {
        Self::new(ConditionKind::IncludeLetters {
            letters: letters.into(),
        })
    }
    pub fn exclude(letters: &str) -> Self {
        Self::new(ConditionKind::ExcludeLetters {
            letters: letters.into(),
        })
    }
    pub fn length(min: u32, max: u32) -> Self {
        Self::new(ConditionKind::Length { min, max })
    }
    pub fn group(group: SearchSet) -> Self {
        Self::new(ConditionKind::BelongToGroup { group })
    }
    pub fn in_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(ConditionKind::InWordList {
            words: words.into_iter().map(Into::into).collect(),
        })
    }
}

impl From<ConditionKind> for Condition {
    fn from(kind: ConditionKind) -> Self {
        Condition::new(kind)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.negated {
            write!(f, "not ")?;
        }
        match &self.kind {
            ConditionKind::PatternMatch { pattern } => write!(f, "pattern {}", pattern),
            ConditionKind::AnagramMatch { letters } => write!(f, "anagram {}", letters),
            ConditionKind::SubanagramMatch { letters } => write!(f, "subanagram {}", letters),
            ConditionKind::Prefix { letters } => write!(f, "prefix {}", letters),
            ConditionKind::Suffix { letters } => write!(f, "suffix {}", letters),
            ConditionKind::IncludeLetters { letters } => write!(f, "include {}", letters),
            ConditionKind::ExcludeLetters { letters } => write!(f, "exclude {}", letters),
            ConditionKind::Length { min, max } => write!(f, "length {}-{}", min, max),
            ConditionKind::NumVowels { min, max } => write!(f, "vowels {}-{}", min, max),
            ConditionKind::NumUniqueLetters { min, max } => {
                write!(f, "unique letters {}-{}", min, max)
            }
            ConditionKind::PointValue { min, max } => write!(f, "points {}-{}", min, max),
            ConditionKind::ConsistOf { min, max, letters } => {
                write!(f, "{}-{}% of {}", min, max, letters)
            }
            ConditionKind::NumAnagrams { min, max } => write!(f, "anagrams {}-{}", min, max),
            ConditionKind::ProbabilityOrder {
                min,
                max,
                blanks,
                lax,
            } => write!(
                f,
                "probability {}-{} ({} blanks{})",
                min,
                max,
                blanks,
                if *lax { ", lax" } else { "" }
            ),
            ConditionKind::PlayabilityOrder { min, max, lax } => write!(
                f,
                "playability {}-{}{}",
                min,
                max,
                if *lax { " (lax)" } else { "" }
            ),
            ConditionKind::BelongToGroup { group } => write!(f, "in group {:?}", group),
            ConditionKind::Definition { text } => write!(f, "definition has {}", text),
            ConditionKind::PartOfSpeech { tag } => write!(f, "part of speech {}", tag),
            ConditionKind::LimitByProbabilityOrder {
                min,
                max,
                blanks,
                lax,
            } => write!(
                f,
                "top {}-{} by probability ({} blanks{})",
                min,
                max,
                blanks,
                if *lax { ", lax" } else { "" }
            ),
            ConditionKind::LimitByPlayabilityOrder { min, max, lax } => write!(
                f,
                "top {}-{} by playability{}",
                min,
                max,
                if *lax { " (lax)" } else { "" }
            ),
            ConditionKind::InWordList { words } => write!(f, "in list of {} words", words.len()),
            ConditionKind::TakesPrefix { letters } => write!(f, "takes prefix {}", letters),
            ConditionKind::TakesSuffix { letters } => write!(f, "takes suffix {}", letters),
        }
    }
}

/// Conjunction of conditions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub conditions: Vec<Condition>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, condition: impl Into<Condition>) -> Self {
        self.conditions.push(condition.into());
        self
    }

    pub fn push(&mut self, condition: impl Into<Condition>) {
        self.conditions.push(condition.into());
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

impl std::iter::FromIterator<Condition> for Query {
    fn from_iter<T: IntoIterator<Item = Condition>>(iter: T) -> Self {
        Self {
            conditions: iter.into_iter().collect(),
        }
    }
}
