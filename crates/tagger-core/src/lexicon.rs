//! Lexical resources
//!
//! Stop words, name particles and init words are loaded once per process
//! and shared read-only (`Arc<LexicalResources>`) by every tagging run.

use std::collections::HashSet;
use std::path::Path;

use crate::config::LexiconConfig;
use crate::{Result, TaggerError};

/// Built-in Danish stop-word list
const DEFAULT_STOP_WORDS: &str = include_str!("../resources/stopwords_da.txt");

/// Default name prefixes and infixes
pub const DEFAULT_PARTICLES: &[&str] = &[
    "bin", "de", "du", "van", "der", "von", "mc", "mac", "le", "for",
];

/// Immutable word lists used for rating and matching
#[derive(Debug, Clone, Default)]
pub struct LexicalResources {
    /// Lowercase stop words
    stop_words: HashSet<String>,
    /// Lowercase particles
    particles: HashSet<String>,
    /// Init words, case-sensitive
    init_words: HashSet<String>,
}

impl LexicalResources {
    /// Built-in stop words and particles, no init words
    pub fn builtin() -> Self {
        Self {
            stop_words: parse_word_list(DEFAULT_STOP_WORDS, true),
            particles: DEFAULT_PARTICLES.iter().map(|p| p.to_string()).collect(),
            init_words: HashSet::new(),
        }
    }

    /// Load the lists named in the configuration.
    ///
    /// Missing paths fall back to the built-in lists.
    pub fn from_config(config: &LexiconConfig) -> Result<Self> {
        let mut resources = Self::builtin();

        if let Some(path) = &config.stop_word_list_path {
            resources.stop_words = load_word_list(path, true)?;
        }
        if let Some(path) = &config.init_word_list_path {
            resources.init_words = load_word_list(path, false)?;
        }
        resources.particles = config
            .particles
            .iter()
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();

        tracing::debug!(
            stop_words = resources.stop_words.len(),
            particles = resources.particles.len(),
            init_words = resources.init_words.len(),
            "Lexical resources loaded"
        );
        Ok(resources)
    }

    /// Replace the stop-word list
    pub fn with_stop_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.stop_words = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .collect();
        self
    }

    /// Replace the particle list
    pub fn with_particles<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.particles = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .collect();
        self
    }

    /// Replace the init-word list
    pub fn with_init_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.init_words = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_string())
            .collect();
        self
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(&word.to_lowercase())
    }

    pub fn is_particle(&self, word: &str) -> bool {
        self.particles.contains(&word.to_lowercase())
    }

    /// Init words are compared case-sensitively
    pub fn is_init_word(&self, word: &str) -> bool {
        self.init_words.contains(word)
    }
}

/// Read a word list with one entry per line
pub fn load_word_list(path: &Path, lowercase: bool) -> Result<HashSet<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| TaggerError::Lexicon {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(parse_word_list(&content, lowercase))
}

fn parse_word_list(content: &str, lowercase: bool) -> HashSet<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            if lowercase {
                line.to_lowercase()
            } else {
                line.to_string()
            }
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
