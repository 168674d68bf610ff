use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, PoisonError, RwLock};

use crate::config::{EngineConfig, LexiconConfig};
use crate::error::{LoadError, QueryError};
use crate::lexicon::Lexicon;
use crate::query::{evaluate_with_cancel, CandidateSet, Query};

/// Registry of named lexicons.
///
/// Lexicons are built completely before they are published, so a reader either
/// sees the previous lexicon or the new one. Readers clone the `Arc` and
/// release the lock before searching.
#[derive(Debug, Default)]
pub struct Engine {
    lexicons: RwLock<HashMap<String, Arc<Lexicon>>>,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every configured lexicon. A lexicon that fails to load is
    /// skipped and its error returned, the others are still published.
    pub fn from_config(config: &EngineConfig) -> (Self, Vec<(String, LoadError)>) {
        let engine = Self::new();
        let failures = engine.load_all(config);
        (engine, failures)
    }

    pub fn load_all(&self, config: &EngineConfig) -> Vec<(String, LoadError)> {
        let mut failures = Vec::new();
        for lexicon in config.lexicons.iter() {
            if let Err(e) = self.load(lexicon) {
                log::error!("could not load lexicon {}: {}", lexicon.name, e);
                failures.push((lexicon.name.clone(), e));
            }
        }
        failures
    }

    /// Builds the lexicon then publishes it, replacing any lexicon of the same name
    pub fn load(&self, config: &LexiconConfig) -> Result<Arc<Lexicon>, LoadError> {
        let lexicon = Lexicon::load(config)?;
        for warning in lexicon.warnings() {
            log::warn!("{}: {}", config.name, warning);
        }
        Ok(self.publish(lexicon))
    }

    pub fn publish(&self, lexicon: Lexicon) -> Arc<Lexicon> {
        let lexicon = Arc::new(lexicon);
        log::info!(
            "publishing lexicon {} with {} words",
            lexicon.name(),
            lexicon.len()
        );
        let mut lexicons = self.lexicons.write().unwrap_or_else(PoisonError::into_inner);
        lexicons.insert(lexicon.name().to_string(), lexicon.clone());
        lexicon
    }

    pub fn remove(&self, name: &str) -> Option<Arc<Lexicon>> {
        let mut lexicons = self.lexicons.write().unwrap_or_else(PoisonError::into_inner);
        lexicons.remove(name)
    }

    /// Current snapshot of the named lexicon
    pub fn lexicon(&self, name: &str) -> Result<Arc<Lexicon>, QueryError> {
        let lexicons = self.lexicons.read().unwrap_or_else(PoisonError::into_inner);
        lexicons
            .get(name)
            .cloned()
            .ok_or_else(|| QueryError::UnknownLexicon(name.to_string()))
    }

    /// Names of the published lexicons, sorted
    pub fn names(&self) -> Vec<String> {
        let lexicons = self.lexicons.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = lexicons.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn contains(&self, name: &str, word: &str) -> Result<bool, QueryError> {
        Ok(self.lexicon(name)?.contains(word))
    }

    pub fn search(&self, name: &str, query: &Query) -> Result<CandidateSet, QueryError> {
        self.lexicon(name)?.search(query)
    }

    pub fn search_with_cancel(
        &self,
        name: &str,
        query: &Query,
        cancel: &AtomicBool,
    ) -> Result<CandidateSet, QueryError> {
        let lexicon = self.lexicon(name)?;
        evaluate_with_cancel(&lexicon, query, cancel)
    }

    pub fn front_hooks(&self, name: &str, word: &str) -> Result<String, QueryError> {
        Ok(self.lexicon(name)?.front_hooks(word))
    }

    pub fn back_hooks(&self, name: &str, word: &str) -> Result<String, QueryError> {
        Ok(self.lexicon(name)?.back_hooks(word))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::thread;

    use tempfile::NamedTempFile;

    use crate::query::Condition;

    #[test]
    fn test_unknown_lexicon() {
        let engine = Engine::new();
        assert!(matches!(
            engine.contains("TWL", "CAT"),
            Err(QueryError::UnknownLexicon(_))
        ));
        assert!(matches!(
            engine.search("TWL", &Query::new()),
            Err(QueryError::UnknownLexicon(_))
        ));
    }

    #[test]
    fn test_publish_replaces_snapshot() {
        let engine = Engine::new();
        engine.publish(Lexicon::from_words("TWL", ["CAT", "ACT"]));
        let before = engine.lexicon("TWL").unwrap();
        engine.publish(Lexicon::from_words("TWL", ["DOG", "GOD"]));

        // A reader holding the old snapshot keeps seeing it
        assert!(before.contains("CAT"));
        assert!(!engine.contains("TWL", "CAT").unwrap());
        assert!(engine.contains("TWL", "DOG").unwrap());
        assert_eq!(engine.names(), vec!["TWL"]);

        assert!(engine.remove("TWL").is_some());
        assert!(engine.lexicon("TWL").is_err());
    }

    #[test]
    fn test_concurrent_readers_see_whole_lexicons() {
        let engine = Arc::new(Engine::new());
        engine.publish(Lexicon::from_words("L", ["CAT", "ACT"]));
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let engine = engine.clone();
                thread::spawn(move || {
                    for _ in 0..50 {
                        let found = engine
                            .search("L", &Query::new().with(Condition::anagram("TAC")))
                            .unwrap();
                        assert!(found.words() == vec!["ACT", "CAT"] || found.words() == vec!["TAC"]);
                    }
                })
            })
            .collect();
        engine.publish(Lexicon::from_words("L", ["TAC"]));
        for r in readers {
            r.join().unwrap();
        }
    }

    #[test]
    fn test_search_with_cancel() {
        let engine = Engine::new();
        engine.publish(Lexicon::from_words("L", ["CAT", "ACT", "DOG"]));
        let query = Query::new().with(Condition::anagram("TAC"));
        let running = AtomicBool::new(false);
        let found = engine.search_with_cancel("L", &query, &running).unwrap();
        assert_eq!(found.words(), vec!["ACT", "CAT"]);
        let stopped = AtomicBool::new(true);
        assert!(matches!(
            engine.search_with_cancel("L", &query, &stopped),
            Err(QueryError::Cancelled)
        ));
        assert!(matches!(
            engine.search_with_cancel("nope", &query, &running),
            Err(QueryError::UnknownLexicon(_))
        ));
    }

    #[test]
    fn test_load_all_skips_failures() {
        let mut words = NamedTempFile::new().unwrap();
        writeln!(words, "AT\nTA\nZA").unwrap();
        let config = EngineConfig {
            lexicons: vec![
                LexiconConfig::from_word_list("good", words.path()),
                LexiconConfig::from_word_list("bad", "/nonexistent/words.txt"),
            ],
        };
        let (engine, failures) = Engine::from_config(&config);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "bad");
        assert_eq!(engine.back_hooks("good", "Z").unwrap(), "A");
        assert_eq!(engine.front_hooks("good", "A").unwrap(), "TZ");
    }
}
