//! Tagger Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout the tagger:
//! - Document model (fragments and tokens addressed by index)
//! - Tag model (occurrences, synonym groups, tag collections)
//! - Lexical resources (stop words, particles, init words)
//! - Common error types
//! - Collaborator traits (disambiguation, keywords, linked data)
//! - Configuration management

pub mod config;
pub mod document;
pub mod lexicon;
pub mod tags;

pub use config::{
    ConfigError, LexiconConfig, LinkedDataConfig, LinkedDataSource, LoggingConfig,
    MarkerConfig, MatchingConfig, RatingConfig, StopWordPolicy, TagRatingCombinator,
    TaggerConfig,
};
pub use document::{Emphasis, Fragment, FragmentKind, FragmentRange, Token, TokenizedDocument};
pub use lexicon::LexicalResources;
pub use tags::{
    CategoryTags, MatchResult, Occurrence, SynonymGroup, Tag, TagCollection, TagId, VocabularyId,
};

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for tagging operations
#[derive(Error, Debug)]
pub enum TaggerError {
    #[error("No text to find tags in has been supplied")]
    EmptyDocument,

    #[error("Invalid vocabulary {id}: {reason}")]
    InvalidVocabulary { id: String, reason: String },

    #[error("Failed to read vocabulary file {path}: {message}")]
    VocabularyFile { path: PathBuf, message: String },

    #[error("Failed to read word list {path}: {source}")]
    Lexicon {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Tag {category}/{id} is produced by both entity matching and keyword extraction")]
    MergeConflict { category: String, id: String },

    #[error("Linked data error: {0}")]
    LinkedData(String),

    #[error("Disambiguation failed: {0}")]
    Disambiguation(String),

    #[error("Keyword extraction failed: {0}")]
    KeywordExtraction(String),

    #[error("Unmatched log error: {0}")]
    UnmatchedLog(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, TaggerError>;

// ============================================================================
// Request Types
// ============================================================================

/// Per-call switches for a tagging run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagOptions {
    /// Resolve conflicting identifications of the same span
    pub disambiguate: bool,

    /// Attach linked-data URIs to every tag
    pub return_uris: bool,

    /// Report capitalized runs that matched no vocabulary entry
    pub return_unmatched: bool,

    /// Treat the document as HTML instead of plain text
    pub structure_aware: bool,

    /// Render newlines as `<br />` in the marked-up text
    pub normalize_newlines: bool,

    /// Return the document with matched tokens wrapped in markers
    pub return_marked_text: bool,
}

impl TagOptions {
    /// Options with every switch off
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_disambiguation(mut self) -> Self {
        self.disambiguate = true;
        self
    }

    pub fn with_uris(mut self) -> Self {
        self.return_uris = true;
        self
    }

    pub fn with_unmatched(mut self) -> Self {
        self.return_unmatched = true;
        self
    }

    pub fn structure_aware(mut self) -> Self {
        self.structure_aware = true;
        self
    }

    pub fn with_newline_normalization(mut self) -> Self {
        self.normalize_newlines = true;
        self
    }

    pub fn with_marked_text(mut self) -> Self {
        self.return_marked_text = true;
        self
    }
}

/// Vocabularies selected for one tagging run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VocabularySelection {
    /// Vocabularies searched by the entity matcher
    pub ner: Vec<VocabularyId>,

    /// Vocabularies searched by the keyword extractor
    pub keywords: Vec<VocabularyId>,
}

impl VocabularySelection {
    /// Select entity vocabularies
    pub fn ner<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<VocabularyId>,
    {
        Self {
            ner: ids.into_iter().map(Into::into).collect(),
            keywords: Vec::new(),
        }
    }

    /// Add keyword vocabularies
    pub fn with_keywords<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<VocabularyId>,
    {
        self.keywords.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ner.is_empty() && self.keywords.is_empty()
    }
}

/// Outcome of a tagging run
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaggingResult {
    /// Recognized tags, grouped by category then id
    pub tags: TagCollection,

    /// Document with markers around matched tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markedup_text: Option<String>,

    /// Capitalized candidates that matched nothing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unmatched: Option<BTreeSet<String>>,
}

// ============================================================================
// Linked Data
// ============================================================================

/// One row returned by a linked-data lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedDataRow {
    /// Destination (source) identifier
    pub destination_id: i64,

    /// URI of the tag in that destination
    pub uri: String,
}

// ============================================================================
// Traits
// ============================================================================

/// Resolves conflicting identifications of the same span.
///
/// Implementations may only remove tags or occurrences, never add them.
pub trait Disambiguator: Send + Sync {
    fn disambiguate(&self, tags: TagCollection, text: &str) -> Result<TagCollection>;
}

/// Finds keyword tags among words no entity vocabulary covered
pub trait KeywordExtractor: Send + Sync {
    /// `words` are indices into `document.tokens()`
    fn extract(
        &self,
        document: &TokenizedDocument,
        words: &[usize],
        vocabularies: &[VocabularyId],
    ) -> Result<TagCollection>;
}

/// Store holding linked-data URIs for tag ids
pub trait LinkedDataStore: Send + Sync {
    /// Rows for `tag_id`, ordered by destination id ascending
    fn lookup(&self, tag_id: &TagId) -> Result<Vec<LinkedDataRow>>;

    /// Get store name for logging
    fn name(&self) -> &str;
}

/// Receives candidates that matched no vocabulary entry
pub trait UnmatchedSink: Send + Sync {
    fn record(&self, unmatched: &BTreeSet<String>) -> Result<()>;
}

// ============================================================================
// Tests
// ============================================================================
