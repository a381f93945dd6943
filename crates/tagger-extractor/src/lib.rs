//! Tagger Extractor - Entity and keyword tagging pipeline
//!
//! Implements vocabulary-driven named entity recognition over tokenized
//! documents, keyword extraction over the words entity matching left over,
//! and reinsertion of markers into the original document text.
//!
//! [`Tagger`] wires the phases together; each phase is also usable on its
//! own.

pub mod disambiguate;
pub mod enrich;
pub mod keywords;
pub mod matcher;
pub mod pipeline;
pub mod rating;
pub mod rebuild;
pub mod tag_rating;
pub mod unmatched;
pub mod vocabulary;

pub use disambiguate::ContextDisambiguator;
pub use enrich::LinkedDataEnricher;
pub use keywords::VocabularyKeywordExtractor;
pub use matcher::EntityMatcher;
pub use pipeline::Tagger;
pub use rating::TokenRater;
pub use rebuild::TextRebuilder;
pub use tag_rating::rate_tags;
pub use unmatched::{FileUnmatchedSink, TracingUnmatchedSink};
pub use vocabulary::{CompiledVocabulary, Vocabulary, VocabularyEntry, VocabularyRegistry};
