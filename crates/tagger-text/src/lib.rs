//! Tagger Text - Document tokenization
//!
//! Turns raw text into a [`TokenizedDocument`]: an ordered fragment arena
//! that concatenates back to the input, plus the token stream used for
//! rating and matching.
//!
//! Two tokenizers are provided:
//! - [`PlainTokenizer`]: blank lines separate paragraphs
//! - [`HtmlTokenizer`]: markup is kept as opaque fragments, inline tags
//!   do not split words, block tags separate paragraphs
//!
//! Both implement the `DocumentTokenizer` trait.

mod builder;
pub mod decode;
pub mod html;
pub mod plain;

pub use decode::decode_document;
pub use html::HtmlTokenizer;
pub use plain::PlainTokenizer;

use tagger_core::TokenizedDocument;

/// Trait for document tokenizers
pub trait DocumentTokenizer: Send + Sync {
    /// Split `text` into fragments and tokens
    fn tokenize(&self, text: &str) -> TokenizedDocument;

    /// Get tokenizer name for logging
    fn name(&self) -> &str;
}

/// Tokenizer for the requested mode
pub fn tokenizer_for(structure_aware: bool) -> &'static dyn DocumentTokenizer {
    if structure_aware {
        &HtmlTokenizer
    } else {
        &PlainTokenizer
    }
}

/// Lowercased token texts of `text`, as the plain tokenizer splits them.
///
/// Vocabulary surface forms are normalized with this so that they compare
/// equal to token spans of a tokenized document.
pub fn normalized_words(text: &str) -> Vec<String> {
    PlainTokenizer
        .tokenize(text)
        .tokens()
        .iter()
        .map(|t| t.normalized())
        .collect()
}
