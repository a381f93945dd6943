//! Structure-aware (HTML) tokenizer
//!
//! Tags, comments and script/style bodies become opaque markup fragments.
//! Inline elements do not interrupt a word, so `Aar<b>hus</b>` yields one
//! token spanning three fragments. Block elements end the current word and
//! the current paragraph. Character references are kept raw in their
//! fragment and decoded in the token text.

use once_cell::sync::Lazy;
use regex::Regex;

use tagger_core::{Emphasis, TokenizedDocument};

use crate::builder::DocumentBuilder;
use crate::DocumentTokenizer;

static TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^<(/?)([A-Za-z][A-Za-z0-9]*)(?:[^>"']|"[^"]*"|'[^']*')*>"#)
        .expect("valid tag pattern")
});

static CHAR_REF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[A-Za-z][A-Za-z0-9]{1,31});")
        .expect("valid character reference pattern")
});

/// Elements that do not split words
const INLINE_ELEMENTS: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "cite", "code", "data", "dfn", "em", "font", "i", "kbd",
    "mark", "q", "s", "samp", "small", "span", "strong", "sub", "sup", "time", "u", "var", "wbr",
];

/// Elements whose boundaries end a paragraph
const PARAGRAPH_ELEMENTS: &[&str] = &[
    "p", "div", "h1", "h2", "h3", "h4", "h5", "h6", "li", "blockquote", "pre", "tr", "td", "th",
    "dd", "dt", "section", "article", "header", "footer", "title", "table", "ul", "ol",
];

const EMPHASIS_ELEMENTS: &[&str] = &["b", "strong", "em", "i", "u", "mark"];

const HEADING_ELEMENTS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6", "title"];

/// Elements whose whole body is opaque
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Tokenizer for HTML documents
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlTokenizer;

impl DocumentTokenizer for HtmlTokenizer {
    fn tokenize(&self, text: &str) -> TokenizedDocument {
        HtmlScanner::new().scan(text)
    }

    fn name(&self) -> &str {
        "html"
    }
}

/// Open-element counters for emphasis tracking
#[derive(Default)]
struct EmphasisState {
    inline: usize,
    heading: usize,
}

impl EmphasisState {
    fn current(&self) -> Emphasis {
        if self.heading > 0 {
            Emphasis::Heading
        } else if self.inline > 0 {
            Emphasis::Inline
        } else {
            Emphasis::None
        }
    }

    fn update(&mut self, name: &str, closing: bool) {
        let counter = if HEADING_ELEMENTS.contains(&name) {
            &mut self.heading
        } else if EMPHASIS_ELEMENTS.contains(&name) {
            &mut self.inline
        } else {
            return;
        };
        if closing {
            *counter = counter.saturating_sub(1);
        } else {
            *counter += 1;
        }
    }
}

struct HtmlScanner {
    builder: DocumentBuilder,
    emphasis: EmphasisState,
}

impl HtmlScanner {
    fn new() -> Self {
        Self {
            builder: DocumentBuilder::new(false),
            emphasis: EmphasisState::default(),
        }
    }

    fn scan(mut self, html: &str) -> TokenizedDocument {
        let mut pos = 0;
        let mut text_start = 0;

        while let Some(offset) = html[pos..].find(|c: char| c == '<' || c == '&') {
            let at = pos + offset;
            let rest = &html[at..];
            let consumed = if rest.starts_with('<') {
                self.markup_len(rest)
            } else {
                self.char_ref_len(rest)
            };

            match consumed {
                Some(len) => {
                    self.builder
                        .push_text(&html[text_start..at], self.emphasis.current());
                    self.consume(&html[at..at + len]);
                    pos = at + len;
                    text_start = pos;
                }
                None => pos = at + 1,
            }
        }

        self.builder
            .push_text(&html[text_start..], self.emphasis.current());
        self.builder.finish()
    }

    /// Length of the markup construct at the start of `rest`, if any
    fn markup_len(&self, rest: &str) -> Option<usize> {
        if rest.starts_with("<!--") {
            return Some(rest[4..].find("-->").map(|i| i + 7).unwrap_or(rest.len()));
        }
        if rest.starts_with("<!") || rest.starts_with("<?") {
            return Some(rest.find('>').map(|i| i + 1).unwrap_or(rest.len()));
        }

        let caps = TAG_RE.captures(rest)?;
        let tag_len = caps.get(0)?.end();
        let closing = !caps[1].is_empty();
        let name = caps[2].to_ascii_lowercase();

        if !closing && RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
            let close = format!("</{name}");
            let body = rest[tag_len..].to_ascii_lowercase();
            return Some(match body.find(&close) {
                Some(i) => {
                    let close_start = tag_len + i;
                    rest[close_start..]
                        .find('>')
                        .map(|j| close_start + j + 1)
                        .unwrap_or(rest.len())
                }
                None => rest.len(),
            });
        }
        Some(tag_len)
    }

    fn char_ref_len(&self, rest: &str) -> Option<usize> {
        let caps = CHAR_REF_RE.captures(rest)?;
        decode_char_ref(&caps[1])?;
        Some(caps.get(0)?.end())
    }

    /// Feed one recognized construct to the builder
    fn consume(&mut self, raw: &str) {
        if raw.starts_with('&') {
            if let Some(decoded) = decode_char_ref(&raw[1..raw.len() - 1]) {
                self.builder
                    .push_char_ref(raw, decoded, self.emphasis.current());
            }
            return;
        }

        if raw.starts_with("<!--") {
            self.builder.push_markup(raw, false);
            return;
        }

        let Some(caps) = TAG_RE.captures(raw) else {
            self.builder.push_markup(raw, true);
            return;
        };
        let closing = !caps[1].is_empty();
        let name = caps[2].to_ascii_lowercase();
        let name = name.as_str();

        let inline = INLINE_ELEMENTS.contains(&name);
        let paragraph = PARAGRAPH_ELEMENTS.contains(&name);

        if paragraph && !closing {
            self.builder.break_paragraph();
        }
        self.builder.push_markup(raw, !inline);
        if paragraph && closing {
            self.builder.break_paragraph();
        }
        self.emphasis.update(name, closing);
    }
}

/// Decode the body of a character reference (`amp`, `#229`, `#xE5`)
fn decode_char_ref(body: &str) -> Option<char> {
    if let Some(num) = body.strip_prefix('#') {
        let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse().ok()?,
        };
        return char::from_u32(code);
    }

    let c = match body {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "aelig" => 'æ',
        "AElig" => 'Æ',
        "oslash" => 'ø',
        "Oslash" => 'Ø',
        "aring" => 'å',
        "Aring" => 'Å',
        "auml" => 'ä',
        "Auml" => 'Ä',
        "ouml" => 'ö',
        "Ouml" => 'Ö',
        "uuml" => 'ü',
        "Uuml" => 'Ü',
        "szlig" => 'ß',
        "eacute" => 'é',
        "Eacute" => 'É',
        "egrave" => 'è',
        "aacute" => 'á',
        "oacute" => 'ó',
        "laquo" => '«',
        "raquo" => '»',
        "ldquo" => '“',
        "rdquo" => '”',
        "ndash" => '–',
        "mdash" => '—',
        "hellip" => '…',
        "copy" => '©',
        _ => return None,
    };
    Some(c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagger_core::FragmentKind;

    fn texts(doc: &TokenizedDocument) -> Vec<&str> {
        doc.tokens().iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn test_markup_is_opaque() {
        let html = r#"<p class="lead">Anna bor i <a href="/by?x=1&y=2">Aarhus</a>.</p>"#;
        let doc = HtmlTokenizer.tokenize(html);
        assert_eq!(texts(&doc), vec!["Anna", "bor", "i", "Aarhus", "."]);
        assert_eq!(doc.render(false), html);

        let markup: Vec<&str> = doc
            .fragments()
            .iter()
            .filter(|f| f.kind == FragmentKind::Markup)
            .map(|f| f.text.as_str())
            .collect();
        assert_eq!(
            markup,
            vec![r#"<p class="lead">"#, r#"<a href="/by?x=1&y=2">"#, "</a>", "</p>"]
        );
    }

    #[test]
    fn test_inline_markup_inside_word() {
        let doc = HtmlTokenizer.tokenize("Aar<b>hus</b> by");
        assert_eq!(texts(&doc), vec!["Aarhus", "by"]);
        let range = doc.tokens()[0].range();
        assert_eq!((range.head(), range.tail()), (0, 2));
    }

    #[test]
    fn test_block_markup_splits_paragraphs() {
        let doc = HtmlTokenizer.tokenize("<p>Et</p>\n<p>To</p><div>Tre</div>");
        assert_eq!(texts(&doc), vec!["Et", "To", "Tre"]);
        assert_eq!(doc.paragraph_count(), 3);
        assert_eq!(doc.tokens()[2].paragraph_number, 2);
    }

    #[test]
    fn test_emphasis_tracking() {
        let doc = HtmlTokenizer.tokenize("<h1>Overskrift</h1><p>En <strong>vigtig</strong> sag</p>");
        let emphasis: Vec<Emphasis> = doc
            .tokens()
            .iter()
            .map(|t| doc.fragments()[t.range().head()].emphasis)
            .collect();
        assert_eq!(
            emphasis,
            vec![Emphasis::Heading, Emphasis::None, Emphasis::Inline, Emphasis::None]
        );
    }

    #[test]
    fn test_script_and_comment_bodies_are_skipped() {
        let html = "<script>var Aarhus = '<b>';</script><!-- Odense -->Vejle<style>p{}</STYLE>";
        let doc = HtmlTokenizer.tokenize(html);
        assert_eq!(texts(&doc), vec!["Vejle"]);
        assert_eq!(doc.render(false), html);
    }

    #[test]
    fn test_char_refs() {
        let doc = HtmlTokenizer.tokenize("Ren&eacute; &amp; &AElig;r&oslash; &#229;&#xE5; &bogus;");
        assert_eq!(texts(&doc), vec!["René", "&", "Ærø", "åå", "&bogus", ";"]);
        assert_eq!(
            doc.render(false),
            "Ren&eacute; &amp; &AElig;r&oslash; &#229;&#xE5; &bogus;"
        );
    }

    #[test]
    fn test_stray_angle_bracket_is_text() {
        let html = "3 < 4 og a<b";
        let doc = HtmlTokenizer.tokenize(html);
        assert_eq!(doc.render(false), html);
        assert_eq!(texts(&doc), vec!["3", "<", "4", "og", "a<b"]);
    }

    #[test]
    fn test_unclosed_comment_consumes_rest() {
        let doc = HtmlTokenizer.tokenize("Hej <!-- aldrig lukket");
        assert_eq!(texts(&doc), vec!["Hej"]);
        assert_eq!(doc.render(false), "Hej <!-- aldrig lukket");
    }

    #[test]
    fn test_decode_char_ref() {
        assert_eq!(decode_char_ref("aring"), Some('å'));
        assert_eq!(decode_char_ref("#65"), Some('A'));
        assert_eq!(decode_char_ref("#x41"), Some('A'));
        assert_eq!(decode_char_ref("#xD800"), None);
        assert_eq!(decode_char_ref("nope"), None);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Markup-heavy input still renders back unchanged.
            #[test]
            fn render_is_identity(text in "([a-zA-Z ]{0,8}|<b>|</b>|<p>|</p>|&amp;|<!--|-->|<|&){0,30}") {
                let doc = HtmlTokenizer.tokenize(&text);
                prop_assert_eq!(doc.render(false), text);
            }
        }
    }
}
