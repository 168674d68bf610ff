pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod letters;
pub mod lexicon;
pub mod query;
pub mod store;
pub mod utils;

pub use crate::config::{EngineConfig, LexiconConfig};
pub use crate::engine::Engine;
pub use crate::error::{
    ConfigError, LoadError, LoadWarning, PatternError, QueryError, QueryWarning, StoreError,
};
pub use crate::graph::{Fragment, Match, WordGraph};
pub use crate::lexicon::Lexicon;
pub use crate::query::{CandidateSet, Condition, ConditionKind, Query, SearchSet};
pub use crate::store::{AuxiliaryStore, MemoryStore, WordInfo};
