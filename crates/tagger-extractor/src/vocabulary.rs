//! Vocabularies and the registry the matcher searches
//!
//! A vocabulary belongs to one category and lists entries, each with a
//! canonical name and optional synonyms. On registration every surface
//! form is split into normalized words the same way documents are, so a
//! lookup is a plain slice comparison against token texts.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use tagger_core::{Result, TagId, TaggerError, VocabularyId};
use tagger_text::normalized_words;

// ============================================================================
// Vocabulary Definitions
// ============================================================================

/// One entity of a vocabulary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyEntry {
    pub id: TagId,

    /// Canonical name
    pub name: String,

    #[serde(default)]
    pub synonyms: Vec<String>,
}

impl VocabularyEntry {
    pub fn new(id: impl Into<TagId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            synonyms: Vec::new(),
        }
    }

    pub fn with_synonyms<I, S>(mut self, synonyms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.synonyms.extend(synonyms.into_iter().map(Into::into));
        self
    }

    /// Canonical name followed by synonyms
    pub fn surface_forms(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.synonyms.iter().map(String::as_str))
    }
}

/// A category-bound dictionary of entities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    pub id: VocabularyId,
    pub category: String,

    #[serde(default)]
    pub entries: Vec<VocabularyEntry>,
}

impl Vocabulary {
    pub fn new(id: impl Into<VocabularyId>, category: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            category: category.into(),
            entries: Vec::new(),
        }
    }

    pub fn with_entry(mut self, entry: VocabularyEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Load a vocabulary from a `.toml` or `.json` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file_error = |message: String| TaggerError::VocabularyFile {
            path: path.to_path_buf(),
            message,
        };

        let content = std::fs::read_to_string(path).map_err(|e| file_error(e.to_string()))?;
        let is_toml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("toml"));

        if is_toml {
            toml::from_str(&content).map_err(|e| file_error(e.to_string()))
        } else {
            serde_json::from_str(&content).map_err(|e| file_error(e.to_string()))
        }
    }
}

// ============================================================================
// Compiled Vocabulary
// ============================================================================

/// A surface form registered for one entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceHit {
    /// Index into [`CompiledVocabulary::entries`]
    pub entry: usize,

    /// Surface form as written in the vocabulary
    pub surface_form: String,
}

/// A vocabulary indexed by normalized surface words
#[derive(Debug, Clone)]
pub struct CompiledVocabulary {
    vocabulary: Vocabulary,
    index: HashMap<Vec<String>, Vec<SurfaceHit>>,
    max_tokens: usize,
}

impl CompiledVocabulary {
    /// Validate and index `vocabulary`
    pub fn compile(vocabulary: Vocabulary) -> Result<Self> {
        let invalid = |reason: String| TaggerError::InvalidVocabulary {
            id: vocabulary.id.to_string(),
            reason,
        };

        if vocabulary.id.as_str().trim().is_empty() {
            return Err(invalid("vocabulary id is empty".to_string()));
        }
        if vocabulary.category.trim().is_empty() {
            return Err(invalid("category is empty".to_string()));
        }

        let mut seen_ids = HashSet::new();
        let mut index: HashMap<Vec<String>, Vec<SurfaceHit>> = HashMap::new();
        let mut max_tokens = 0;

        for (position, entry) in vocabulary.entries.iter().enumerate() {
            if entry.id.as_str().trim().is_empty() {
                return Err(invalid(format!("entry {} has an empty id", position)));
            }
            if !seen_ids.insert(&entry.id) {
                return Err(invalid(format!("duplicate entry id {}", entry.id)));
            }

            for surface in entry.surface_forms() {
                let words = normalized_words(surface);
                if words.is_empty() {
                    return Err(invalid(format!(
                        "entry {} has a blank surface form",
                        entry.id
                    )));
                }
                max_tokens = max_tokens.max(words.len());

                let hits = index.entry(words).or_default();
                if !hits.iter().any(|h| h.entry == position) {
                    hits.push(SurfaceHit {
                        entry: position,
                        surface_form: surface.to_string(),
                    });
                }
            }
        }

        Ok(Self {
            vocabulary,
            index,
            max_tokens,
        })
    }

    pub fn id(&self) -> &VocabularyId {
        &self.vocabulary.id
    }

    pub fn category(&self) -> &str {
        &self.vocabulary.category
    }

    pub fn entries(&self) -> &[VocabularyEntry] {
        &self.vocabulary.entries
    }

    /// Longest surface form, in words
    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Entries registered under exactly these normalized words
    pub fn lookup(&self, words: &[String]) -> &[SurfaceHit] {
        self.index.get(words).map(Vec::as_slice).unwrap_or(&[])
    }
}

// ============================================================================
// Registry
// ============================================================================

/// All vocabularies known to a tagger, by id
#[derive(Debug, Clone, Default)]
pub struct VocabularyRegistry {
    vocabularies: HashMap<VocabularyId, CompiledVocabulary>,
}

impl VocabularyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile and add a vocabulary; ids must be unique
    pub fn register(&mut self, vocabulary: Vocabulary) -> Result<()> {
        if self.vocabularies.contains_key(&vocabulary.id) {
            return Err(TaggerError::InvalidVocabulary {
                id: vocabulary.id.to_string(),
                reason: "already registered".to_string(),
            });
        }
        let compiled = CompiledVocabulary::compile(vocabulary)?;
        tracing::debug!(
            vocabulary = %compiled.id(),
            category = compiled.category(),
            entries = compiled.entries().len(),
            "Registered vocabulary"
        );
        self.vocabularies.insert(compiled.id().clone(), compiled);
        Ok(())
    }

    /// Load a vocabulary file and register it, returning its id
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<VocabularyId> {
        let vocabulary = Vocabulary::from_file(path)?;
        let id = vocabulary.id.clone();
        self.register(vocabulary)?;
        Ok(id)
    }

    pub fn get(&self, id: &VocabularyId) -> Option<&CompiledVocabulary> {
        self.vocabularies.get(id)
    }

    /// Registered ids, sorted
    pub fn ids(&self) -> Vec<&VocabularyId> {
        let mut ids: Vec<_> = self.vocabularies.keys().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.vocabularies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vocabularies.is_empty()
    }
}
