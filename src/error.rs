use std::path::PathBuf;

use thiserror::Error;

/// Fatal failure to load a lexicon. The previously published lexicon, if any, stays in place.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("graph file is truncated: {len} bytes do not match the declared record count")]
    Truncated { len: usize },
    #[error("graph file has an out of range root record")]
    InvalidRoot,
    #[error("graph file is corrupt: {0}")]
    Corrupt(String),
    #[error("lexicon {name:?} has neither a word list nor a graph file")]
    MissingSource { name: String },
    #[error("could not load auxiliary store: {0}")]
    Store(#[from] StoreError),
}

/// Non-fatal problem found while loading. The graph is still usable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadWarning {
    #[error("checksum mismatch for {path}: expected {expected}, computed {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: u16,
        actual: u16,
    },
    #[error("checksum for {path} unavailable: {reason}")]
    ChecksumUnavailable { path: PathBuf, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("pattern is empty")]
    Empty,
    #[error("unterminated character class starting at position {0}")]
    UnterminatedClass(usize),
    #[error("character class at position {0} matches no letters")]
    EmptyClass(usize),
    #[error("unexpected character {found:?} at position {position}")]
    InvalidCharacter { found: char, position: usize },
    #[error("rack holds {len} tiles, at most {max} are supported")]
    RackTooLong { len: usize, max: usize },
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: PatternError,
    },
    #[error("invalid condition: {0}")]
    InvalidCondition(String),
    #[error("unknown lexicon {0:?}")]
    UnknownLexicon(String),
    #[error("query was cancelled")]
    Cancelled,
}

/// Non-fatal condition attached to a query result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryWarning {
    #[error("auxiliary store unavailable, store-backed conditions matched nothing: {0}")]
    StoreUnavailable(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("auxiliary store is not connected")]
    Unavailable,
    #[error("store i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store serialization error: {0}")]
    Serialization(#[from] bincode::Error),
    #[error("store index error: {0}")]
    Index(#[from] fst::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}
