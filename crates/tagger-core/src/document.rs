//! Document model
//!
//! A tokenized document keeps two views of the same text: the fragment
//! arena, which concatenates back to the original, and the token stream
//! used for rating and matching. Tokens address fragments by index.

use serde::Serialize;

// ============================================================================
// Fragments
// ============================================================================

/// What a fragment holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentKind {
    /// Word characters or a single punctuation character
    Text,
    /// A run of whitespace
    Whitespace,
    /// A character reference such as `&aring;`, raw in the fragment
    CharRef,
    /// Opaque structural content (tags, comments, scripts)
    Markup,
}

/// Markup emphasis in effect for a fragment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Emphasis {
    #[default]
    None,
    /// Inside `b`, `strong`, `em`, `i`, ...
    Inline,
    /// Inside a heading or the document title
    Heading,
}

impl Emphasis {
    /// Structural score contributed by this emphasis level
    pub fn score(&self) -> f32 {
        match self {
            Self::None => 0.0,
            Self::Inline => 0.5,
            Self::Heading => 1.0,
        }
    }
}

/// An indivisible piece of the original document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fragment {
    pub kind: FragmentKind,
    pub text: String,
    pub emphasis: Emphasis,
}

impl Fragment {
    pub fn new(kind: FragmentKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            emphasis: Emphasis::None,
        }
    }

    pub fn with_emphasis(mut self, emphasis: Emphasis) -> Self {
        self.emphasis = emphasis;
        self
    }

    /// Whether this fragment carries token text
    pub fn is_textual(&self) -> bool {
        matches!(self.kind, FragmentKind::Text | FragmentKind::CharRef)
    }
}

/// Inclusive `[head, tail]` range into the fragment arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FragmentRange {
    head: usize,
    tail: usize,
}

impl FragmentRange {
    /// Returns `None` when `tail < head`
    pub fn new(head: usize, tail: usize) -> Option<Self> {
        (head <= tail).then_some(Self { head, tail })
    }

    pub fn single(index: usize) -> Self {
        Self {
            head: index,
            tail: index,
        }
    }

    pub fn head(&self) -> usize {
        self.head
    }

    pub fn tail(&self) -> usize {
        self.tail
    }

    pub fn indices(&self) -> std::ops::RangeInclusive<usize> {
        self.head..=self.tail
    }
}

// ============================================================================
// Tokens
// ============================================================================

/// Characters that separate words
pub const WORD_BOUNDARY: &[char] = &[
    '?', ',', '"', ':', '.', '«', '»', '\'', '(', ')', '!', ';', '“', '”', '[', ']',
];

/// Whether `c` splits words
pub fn is_boundary_char(c: char) -> bool {
    c.is_whitespace() || WORD_BOUNDARY.contains(&c)
}

/// A word-like unit with position metadata and a rating
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    /// Visible text (character references decoded)
    pub text: String,

    /// Document-order index, strictly increasing
    pub token_number: usize,

    /// Zero-based paragraph the token belongs to
    pub paragraph_number: usize,

    /// Lead-bias component of the rating
    pub position_score: f32,

    /// Markup emphasis component of the rating
    pub structural_score: f32,

    /// Combined rating
    pub rating: f32,

    marked: bool,
    range: FragmentRange,
}

impl Token {
    pub fn new(
        text: impl Into<String>,
        token_number: usize,
        paragraph_number: usize,
        range: FragmentRange,
    ) -> Self {
        Self {
            text: text.into(),
            token_number,
            paragraph_number,
            position_score: 0.0,
            structural_score: 0.0,
            rating: 0.0,
            marked: false,
            range,
        }
    }

    pub fn range(&self) -> FragmentRange {
        self.range
    }

    pub fn is_marked(&self) -> bool {
        self.marked
    }

    /// Lowercased text used for lookups
    pub fn normalized(&self) -> String {
        self.text.to_lowercase()
    }

    /// Contains an uppercase letter
    pub fn is_capitalized(&self) -> bool {
        self.text != self.text.to_lowercase()
    }

    /// Holds no punctuation or whitespace
    pub fn is_plain_word(&self) -> bool {
        !self.text.is_empty() && !self.text.chars().any(is_boundary_char)
    }

    /// Sets the marked flag. Returns `false` if it was already set.
    fn mark(&mut self) -> bool {
        !std::mem::replace(&mut self.marked, true)
    }
}

// ============================================================================
// Tokenized Document
// ============================================================================

/// Fragment arena and token stream for one document
#[derive(Debug, Clone, Default, Serialize)]
pub struct TokenizedDocument {
    fragments: Vec<Fragment>,
    tokens: Vec<Token>,
    paragraph_count: usize,
}

impl TokenizedDocument {
    /// Assemble a document; tokens must reference fragments in range
    pub fn new(fragments: Vec<Fragment>, tokens: Vec<Token>, paragraph_count: usize) -> Self {
        debug_assert!(tokens
            .iter()
            .all(|t| t.range.tail < fragments.len()));
        Self {
            fragments,
            tokens,
            paragraph_count,
        }
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn tokens_mut(&mut self) -> &mut [Token] {
        &mut self.tokens
    }

    pub fn token(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn paragraph_count(&self) -> usize {
        self.paragraph_count
    }

    /// Fragments spanned by the token at `index`
    pub fn token_fragments(&self, index: usize) -> &[Fragment] {
        match self.tokens.get(index) {
            Some(token) => &self.fragments[token.range.head..=token.range.tail],
            None => &[],
        }
    }

    /// Wrap the token at `index` in `start`/`end`.
    ///
    /// The start marker is prepended to the head fragment and the end marker
    /// appended to the tail fragment. A token is wrapped at most once; later
    /// calls return `false` and leave the fragments untouched.
    pub fn wrap_token(&mut self, index: usize, start: &str, end: &str) -> bool {
        let Some(token) = self.tokens.get_mut(index) else {
            return false;
        };
        if !token.mark() {
            return false;
        }
        let range = token.range;
        self.fragments[range.head].text.insert_str(0, start);
        self.fragments[range.tail].text.push_str(end);
        true
    }

    /// Concatenate the fragments in document order
    pub fn render(&self, normalize_newlines: bool) -> String {
        let mut out = String::with_capacity(self.fragments.iter().map(|f| f.text.len()).sum());
        for fragment in &self.fragments {
            if normalize_newlines && fragment.kind == FragmentKind::Whitespace {
                out.push_str(&nl2br(&fragment.text));
            } else {
                out.push_str(&fragment.text);
            }
        }
        out
    }
}

/// Insert `<br />` before every line break
fn nl2br(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' if chars.peek() == Some(&'\n') => {
                chars.next();
                out.push_str("<br />\r\n");
            }
            '\r' | '\n' => {
                out.push_str("<br />");
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

// ============================================================================
// Tests
// ============================================================================
