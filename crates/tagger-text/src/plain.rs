//! Plain-text tokenizer

use tagger_core::{Emphasis, TokenizedDocument};

use crate::builder::DocumentBuilder;
use crate::DocumentTokenizer;

/// Tokenizer for plain text; blank lines separate paragraphs
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTokenizer;

impl DocumentTokenizer for PlainTokenizer {
    fn tokenize(&self, text: &str) -> TokenizedDocument {
        let mut builder = DocumentBuilder::new(true);
        builder.push_text(text, Emphasis::None);
        builder.finish()
    }

    fn name(&self) -> &str {
        "plain"
    }
}
