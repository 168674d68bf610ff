use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use crate::config::LexiconConfig;
use crate::error::{LoadError, LoadWarning, QueryError};
use crate::graph::{load_graph, Fragment, LoadOptions, Token, WordGraph};
use crate::letters::{normalize_word, LetterBag};
use crate::query::{evaluate, CandidateSet, Query};
use crate::store::{AuxiliaryStore, MemoryStore, StoreExtras};

/// A loaded word list with everything needed to answer queries against it. Immutable once built.
pub struct Lexicon {
    name: String,
    forward: WordGraph,
    reverse: Option<WordGraph>,
    store: Option<Arc<dyn AuxiliaryStore>>,
    bag: LetterBag,
    warnings: Vec<LoadWarning>,
}

impl std::fmt::Debug for Lexicon {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Lexicon")
            .field("name", &self.name)
            .field("words", &self.forward.len())
            .field("reverse", &self.reverse.is_some())
            .field("store", &self.store.is_some())
            .field("warnings", &self.warnings)
            .finish()
    }
}

/// Non-empty, non-comment lines of a text file
fn read_lines(path: &Path) -> Result<Vec<String>, LoadError> {
    let io_err = |source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(io_err)?;
    let reader = BufReader::new(file);
    let mut lines = Vec::new();
    for line in reader.lines() {
        let line = line.map_err(io_err)?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        lines.push(line.to_string());
    }
    Ok(lines)
}

/// First whitespace separated field of each line, upper cased
fn read_words(path: &Path) -> Result<Vec<String>, LoadError> {
    Ok(read_lines(path)?
        .into_iter()
        .filter_map(|l| l.split_whitespace().next().map(|w| w.to_uppercase()))
        .collect())
}

/// `WORD rest of line` pairs
fn read_keyed(path: &Path) -> Result<Vec<(String, String)>, LoadError> {
    Ok(read_lines(path)?
        .into_iter()
        .filter_map(|l| {
            let mut parts = l.splitn(2, char::is_whitespace);
            let word = normalize_word(parts.next()?)?;
            Some((word, parts.next().unwrap_or("").trim().to_string()))
        })
        .collect())
}

fn read_extras(config: &LexiconConfig) -> Result<StoreExtras, LoadError> {
    let mut extras = StoreExtras::default();
    for path in config.stems.iter() {
        extras.stems.extend(read_words(path)?);
    }
    if let Some(path) = &config.playability {
        for (word, value) in read_keyed(path)? {
            match value.parse::<u64>() {
                Ok(v) => {
                    extras.playability.insert(word, v);
                }
                Err(_) => log::warn!("ignoring playability value {:?} for {}", value, word),
            }
        }
    }
    if let Some(path) = &config.definitions {
        extras.definitions = read_keyed(path)?.into_iter().collect::<HashMap<_, _>>();
    }
    Ok(extras)
}

impl Lexicon {
    pub fn new(name: &str, forward: WordGraph) -> Self {
        Self {
            name: name.to_string(),
            forward,
            reverse: None,
            store: None,
            bag: LetterBag::default(),
            warnings: Vec::new(),
        }
    }

    /// Builds the forward and reverse graphs from a word list
    pub fn from_words<I, S>(name: &str, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words: Vec<S> = words.into_iter().collect();
        let forward = WordGraph::from_words(words.iter().map(|w| w.as_ref()));
        let reverse = WordGraph::from_words_reversed(words.iter().map(|w| w.as_ref()));
        Self::new(name, forward).with_reverse(reverse)
    }

    pub fn with_reverse(mut self, reverse: WordGraph) -> Self {
        self.reverse = Some(reverse);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn AuxiliaryStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Loads graphs and store as described by the config
    pub fn load(config: &LexiconConfig) -> Result<Self, LoadError> {
        let mut warnings = Vec::new();
        let forward = if let Some(path) = &config.graph {
            let options = LoadOptions {
                reversed: false,
                checksum_path: config.checksum.clone(),
            };
            let loaded = load_graph(path, &options)?;
            warnings.extend(loaded.warnings);
            loaded.graph
        } else if let Some(path) = &config.words {
            let graph = WordGraph::from_words(read_words(path)?);
            log::info!("built {} words from {}", graph.len(), path.display());
            graph
        } else {
            return Err(LoadError::MissingSource {
                name: config.name.clone(),
            });
        };

        let reverse = if let Some(path) = &config.reverse_graph {
            let options = LoadOptions {
                reversed: true,
                checksum_path: config.reverse_checksum.clone(),
            };
            let loaded = load_graph(path, &options)?;
            if loaded.graph.len() != forward.len() {
                return Err(LoadError::Corrupt(format!(
                    "reverse graph {} holds {} words, forward graph holds {}",
                    path.display(),
                    loaded.graph.len(),
                    forward.len()
                )));
            }
            warnings.extend(loaded.warnings);
            loaded.graph
        } else {
            WordGraph::from_words_reversed(forward.words().map(|m| m.word))
        };

        let store: Option<Arc<dyn AuxiliaryStore>> = if let Some(path) = &config.store {
            Some(Arc::new(MemoryStore::load_from_disk(path)?))
        } else if config.build_store {
            let extras = read_extras(config)?;
            Some(Arc::new(MemoryStore::build(&forward, &extras)?))
        } else {
            None
        };

        let mut lexicon = Self::new(&config.name, forward).with_reverse(reverse);
        lexicon.store = store;
        lexicon.warnings = warnings;
        Ok(lexicon)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn graph(&self) -> &WordGraph {
        &self.forward
    }

    pub fn reverse_graph(&self) -> Option<&WordGraph> {
        self.reverse.as_ref()
    }

    pub fn store(&self) -> Option<&dyn AuxiliaryStore> {
        self.store.as_deref()
    }

    pub fn bag(&self) -> &LetterBag {
        &self.bag
    }

    /// Warnings raised while loading
    pub fn warnings(&self) -> &[LoadWarning] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.forward.contains(word)
    }

    pub fn search(&self, query: &Query) -> Result<CandidateSet, QueryError> {
        evaluate(self, query)
    }

    /// Letters that can be put in front of the word to make another word, in order
    pub fn front_hooks(&self, word: &str) -> String {
        let word = match normalize_word(word) {
            Some(w) => w,
            None => return String::new(),
        };
        let mut tokens = vec![Token::Any];
        tokens.extend(word.chars().map(Token::Literal));
        let graph = self.reverse.as_ref().unwrap_or(&self.forward);
        let mut letters: Vec<char> = graph
            .search(&Fragment::positional(tokens))
            .filter_map(|m| m.word.chars().next())
            .collect();
        letters.sort_unstable();
        letters.into_iter().collect()
    }

    /// Letters that can be put after the word to make another word, in order
    pub fn back_hooks(&self, word: &str) -> String {
        let word = match normalize_word(word) {
            Some(w) => w,
            None => return String::new(),
        };
        let mut tokens: Vec<Token> = word.chars().map(Token::Literal).collect();
        tokens.push(Token::Any);
        let mut letters: Vec<char> = self
            .forward
            .search(&Fragment::positional(tokens))
            .filter_map(|m| m.word.chars().last())
            .collect();
        letters.sort_unstable();
        letters.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use tempfile::{tempdir, NamedTempFile};

    use crate::graph::{write_checksum_file, write_graph, ByteOrder};

    #[test]
    fn test_hooks() {
        let lexicon = Lexicon::from_words("test", ["AT", "CAT", "BAT", "ATE", "ATS", "HAT"]);
        assert_eq!(lexicon.front_hooks("at"), "BCH");
        assert_eq!(lexicon.back_hooks("AT"), "ES");
        assert_eq!(lexicon.front_hooks("CAT"), "");
        assert_eq!(lexicon.back_hooks("??"), "");
    }

    #[test]
    fn test_load_from_word_list() {
        let mut words = NamedTempFile::new().unwrap();
        writeln!(words, "# comment\ncat\nACT\n\ndog\nno-go").unwrap();
        let config = LexiconConfig::from_word_list("mini", words.path());
        let lexicon = Lexicon::load(&config).unwrap();
        assert_eq!(lexicon.name(), "mini");
        assert_eq!(lexicon.len(), 3);
        assert!(lexicon.contains("DOG"));
        assert!(lexicon.reverse_graph().unwrap().contains("DOG"));
        assert!(lexicon.store().is_some());
    }

    #[test]
    fn test_load_from_graph_files() {
        let dir = tempdir().unwrap();
        let forward = WordGraph::from_words(["QI", "QAT", "QATS"]);
        let graph_path = dir.path().join("lex.dwg");
        let sum_path = dir.path().join("lex.sum");
        let checksum = write_graph(&forward, &graph_path, ByteOrder::Big).unwrap();
        write_checksum_file(&sum_path, checksum ^ 1).unwrap();

        let mut stems = File::create(dir.path().join("stems.txt")).unwrap();
        writeln!(stems, "SATIRE").unwrap();

        let config = LexiconConfig {
            graph: Some(graph_path),
            checksum: Some(sum_path),
            words: None,
            stems: vec![dir.path().join("stems.txt")],
            ..LexiconConfig::from_word_list("q", "unused")
        };
        let lexicon = Lexicon::load(&config).unwrap();
        assert_eq!(lexicon.warnings().len(), 1);
        assert!(lexicon.contains("QATS"));
        assert!(lexicon.reverse_graph().unwrap().contains("QAT"));
    }

    #[test]
    fn test_reverse_graph_must_match_forward() {
        let dir = tempdir().unwrap();
        let words = ["QI", "QAT", "QATS"];
        let graph_path = dir.path().join("lex.dwg");
        let rev_path = dir.path().join("lex.rev");
        let rev_sum_path = dir.path().join("lex.rev.sum");
        write_graph(&WordGraph::from_words(words), &graph_path, ByteOrder::Little).unwrap();
        let config = LexiconConfig {
            graph: Some(graph_path),
            reverse_graph: Some(rev_path.clone()),
            reverse_checksum: Some(rev_sum_path.clone()),
            words: None,
            build_store: false,
            ..LexiconConfig::from_word_list("q", "unused")
        };

        // Reverse file from another word list
        write_graph(&WordGraph::from_words_reversed(["QI", "QAT"]), &rev_path, ByteOrder::Little)
            .unwrap();
        assert!(matches!(Lexicon::load(&config), Err(LoadError::Corrupt(_))));

        let checksum = write_graph(
            &WordGraph::from_words_reversed(words),
            &rev_path,
            ByteOrder::Little,
        )
        .unwrap();
        write_checksum_file(&rev_sum_path, checksum).unwrap();
        let lexicon = Lexicon::load(&config).unwrap();
        assert!(lexicon.warnings().is_empty());
        assert_eq!(lexicon.front_hooks("AT"), "Q");

        write_checksum_file(&rev_sum_path, checksum.wrapping_add(1)).unwrap();
        let lexicon = Lexicon::load(&config).unwrap();
        assert!(matches!(
            lexicon.warnings(),
            [LoadWarning::ChecksumMismatch { .. }]
        ));
    }

    #[test]
    fn test_missing_source() {
        let config = LexiconConfig {
            words: None,
            ..LexiconConfig::from_word_list("none", "unused")
        };
        assert!(matches!(
            Lexicon::load(&config),
            Err(LoadError::MissingSource { .. })
        ));
    }
}
