use include_dir::{include_dir, Dir};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use thiserror::Error;

static PASSAGE_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/passages");

pub const BUILTIN: &str = "english";

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("corpus has no passages")]
    Empty,
    #[error("passage {index} is blank")]
    BlankPassage { index: usize },
    #[error("passage set not found: {0}")]
    NotFound(String),
    #[error("unable to read passage set {name}: {source}")]
    Parse {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Deserialize, Debug)]
struct PassageSet {
    #[allow(dead_code)]
    name: String,
    passages: Vec<String>,
}

/// Fixed, non-empty list of passages a session can be asked to type
#[derive(Debug, Clone, PartialEq)]
pub struct Corpus {
    passages: Vec<String>,
}

impl Corpus {
    pub fn new(passages: Vec<String>) -> Result<Self, CorpusError> {
        if passages.is_empty() {
            return Err(CorpusError::Empty);
        }
        if let Some(index) = passages.iter().position(|p| p.trim().is_empty()) {
            return Err(CorpusError::BlankPassage { index });
        }
        Ok(Self { passages })
    }

    /// Passage set compiled into the binary
    pub fn builtin(name: &str) -> Result<Self, CorpusError> {
        let file = PASSAGE_DIR
            .get_file(format!("{name}.json"))
            .and_then(|f| f.contents_utf8())
            .ok_or_else(|| CorpusError::NotFound(name.to_string()))?;

        let set: PassageSet = serde_json::from_str(file).map_err(|source| CorpusError::Parse {
            name: name.to_string(),
            source,
        })?;

        Self::new(set.passages)
    }

    /// Single-passage corpus for a user supplied prompt
    pub fn from_prompt(prompt: impl Into<String>) -> Result<Self, CorpusError> {
        Self::new(vec![prompt.into()])
    }

    pub fn passages(&self) -> &[String] {
        &self.passages
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    /// Draws a passage uniformly at random
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        // non-empty by construction
        self.passages
            .choose(rng)
            .map(String::as_str)
            .unwrap_or_default()
    }
}
