//! Incremental document assembly shared by the tokenizers

use tagger_core::document::is_boundary_char;
use tagger_core::{Emphasis, Fragment, FragmentKind, FragmentRange, Token, TokenizedDocument};

/// A word still accepting fragments
struct OpenWord {
    text: String,
    head: usize,
    tail: usize,
}

/// Appends fragments in source order and cuts tokens out of them
pub(crate) struct DocumentBuilder {
    fragments: Vec<Fragment>,
    tokens: Vec<Token>,
    paragraph: usize,
    paragraph_has_tokens: bool,
    word: Option<OpenWord>,
    /// Two or more newlines in a whitespace run start a new paragraph
    blank_line_paragraphs: bool,
}

impl DocumentBuilder {
    pub(crate) fn new(blank_line_paragraphs: bool) -> Self {
        Self {
            fragments: Vec::new(),
            tokens: Vec::new(),
            paragraph: 0,
            paragraph_has_tokens: false,
            word: None,
            blank_line_paragraphs,
        }
    }

    /// Split a text run into word, punctuation and whitespace fragments
    pub(crate) fn push_text(&mut self, text: &str, emphasis: Emphasis) {
        let mut rest = text;
        while let Some(c) = rest.chars().next() {
            let end = if c.is_whitespace() {
                let end = rest
                    .find(|c: char| !c.is_whitespace())
                    .unwrap_or(rest.len());
                self.push_whitespace(&rest[..end]);
                end
            } else if is_boundary_char(c) {
                let end = c.len_utf8();
                self.push_punctuation(&rest[..end], &rest[..end], FragmentKind::Text, emphasis);
                end
            } else {
                let end = rest.find(is_boundary_char).unwrap_or(rest.len());
                self.push_word_part(&rest[..end], &rest[..end], FragmentKind::Text, emphasis);
                end
            };
            rest = &rest[end..];
        }
    }

    /// A decoded character reference; `raw` is kept in the fragment
    pub(crate) fn push_char_ref(&mut self, raw: &str, decoded: char, emphasis: Emphasis) {
        let mut buf = [0u8; 4];
        let visible: &str = decoded.encode_utf8(&mut buf);
        if decoded.is_whitespace() {
            self.close_word();
            self.fragments
                .push(Fragment::new(FragmentKind::CharRef, raw).with_emphasis(emphasis));
        } else if is_boundary_char(decoded) {
            self.push_punctuation(visible, raw, FragmentKind::CharRef, emphasis);
        } else {
            self.push_word_part(visible, raw, FragmentKind::CharRef, emphasis);
        }
    }

    /// Opaque structural content
    pub(crate) fn push_markup(&mut self, raw: &str, breaks_word: bool) {
        if breaks_word {
            self.close_word();
        }
        self.fragments.push(Fragment::new(FragmentKind::Markup, raw));
    }

    /// Following tokens belong to the next paragraph
    pub(crate) fn break_paragraph(&mut self) {
        self.close_word();
        if self.paragraph_has_tokens {
            self.paragraph += 1;
            self.paragraph_has_tokens = false;
        }
    }

    pub(crate) fn finish(mut self) -> TokenizedDocument {
        self.close_word();
        let paragraph_count = self
            .tokens
            .last()
            .map(|t| t.paragraph_number + 1)
            .unwrap_or(0);
        TokenizedDocument::new(self.fragments, self.tokens, paragraph_count)
    }

    fn push_whitespace(&mut self, text: &str) {
        self.close_word();
        self.fragments
            .push(Fragment::new(FragmentKind::Whitespace, text));
        if self.blank_line_paragraphs && text.matches('\n').count() >= 2 {
            self.break_paragraph();
        }
    }

    fn push_punctuation(&mut self, visible: &str, raw: &str, kind: FragmentKind, emphasis: Emphasis) {
        self.close_word();
        let index = self.fragments.len();
        self.fragments
            .push(Fragment::new(kind, raw).with_emphasis(emphasis));
        self.push_token(visible.to_string(), FragmentRange::single(index));
    }

    fn push_word_part(&mut self, visible: &str, raw: &str, kind: FragmentKind, emphasis: Emphasis) {
        let index = self.fragments.len();
        self.fragments
            .push(Fragment::new(kind, raw).with_emphasis(emphasis));
        if let Some(word) = self.word.as_mut() {
            word.text.push_str(visible);
            word.tail = index;
            return;
        }
        self.word = Some(OpenWord {
            text: visible.to_string(),
            head: index,
            tail: index,
        });
    }

    fn close_word(&mut self) {
        if let Some(word) = self.word.take() {
            let range = FragmentRange::new(word.head, word.tail)
                .unwrap_or_else(|| FragmentRange::single(word.head));
            self.push_token(word.text, range);
        }
    }

    fn push_token(&mut self, text: String, range: FragmentRange) {
        let number = self.tokens.len();
        self.tokens
            .push(Token::new(text, number, self.paragraph, range));
        self.paragraph_has_tokens = true;
    }
}
