use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

fn default_true() -> bool {
    true
}

/// Where to find the files making up one lexicon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LexiconConfig {
    pub name: String,
    /// Plain text word list, one word per line. Used when no graph file is given.
    #[serde(default)]
    pub words: Option<PathBuf>,
    /// Binary word graph
    #[serde(default)]
    pub graph: Option<PathBuf>,
    /// Binary word graph of the reversed words
    #[serde(default)]
    pub reverse_graph: Option<PathBuf>,
    /// Text file holding the expected checksum of `graph`
    #[serde(default)]
    pub checksum: Option<PathBuf>,
    /// Text file holding the expected checksum of `reverse_graph`
    #[serde(default)]
    pub reverse_checksum: Option<PathBuf>,
    /// Saved auxiliary store. When absent the store is computed at load time.
    #[serde(default)]
    pub store: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub build_store: bool,
    /// Stem lists, one stem per line
    #[serde(default)]
    pub stems: Vec<PathBuf>,
    /// Lines of `WORD VALUE`
    #[serde(default)]
    pub playability: Option<PathBuf>,
    /// Lines of `WORD definition text`
    #[serde(default)]
    pub definitions: Option<PathBuf>,
}

impl LexiconConfig {
    /// A lexicon built from a plain word list
    pub fn from_word_list<P: AsRef<Path>>(name: &str, words: P) -> Self {
        Self {
            name: name.to_string(),
            words: Some(words.as_ref().to_path_buf()),
            graph: None,
            reverse_graph: None,
            checksum: None,
            reverse_checksum: None,
            store: None,
            build_store: true,
            stems: Vec::new(),
            playability: None,
            definitions: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub lexicons: Vec<LexiconConfig>,
}

impl EngineConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut data = String::new();
        File::open(path)
            .and_then(|mut file| file.read_to_string(&mut data))
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_json(&data)
    }

    pub fn from_json(data: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(data)?)
    }
}
