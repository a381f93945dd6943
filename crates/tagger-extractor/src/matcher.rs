//! Vocabulary entity matching
//!
//! Greedy longest-match-first search, run once per category. At each token
//! the longest span whose normalized words equal a registered surface form
//! wins and its tokens are not reused within that category. Categories are
//! searched independently, so one span may match in several categories.
//!
//! Capitalized runs that no category matched are reported as unmatched
//! candidates.

use std::collections::BTreeSet;
use std::sync::Arc;

use tagger_core::{
    LexicalResources, MatchResult, MatchingConfig, Occurrence, StopWordPolicy, TagCollection,
    TokenizedDocument, VocabularyId,
};

use crate::vocabulary::{CompiledVocabulary, VocabularyRegistry};

/// Matches tokens against the registered vocabularies
#[derive(Debug, Clone)]
pub struct EntityMatcher {
    registry: Arc<VocabularyRegistry>,
    lexicon: Arc<LexicalResources>,
    config: MatchingConfig,
}

/// Per-token lexical facts used while matching
struct TokenFacts {
    normalized: String,
    paragraph: usize,
    capitalized: bool,
    particle: bool,
    stop_word: bool,
    plain: bool,
}

impl EntityMatcher {
    pub fn new(
        registry: Arc<VocabularyRegistry>,
        lexicon: Arc<LexicalResources>,
        config: MatchingConfig,
    ) -> Self {
        Self {
            registry,
            lexicon,
            config,
        }
    }

    /// Find vocabulary entities in `document`.
    ///
    /// Unknown vocabulary ids are skipped with a warning.
    pub fn match_tokens(
        &self,
        document: &TokenizedDocument,
        vocabularies: &[VocabularyId],
    ) -> MatchResult {
        let mut result = MatchResult::default();
        if vocabularies.is_empty() {
            return result;
        }

        let facts = self.token_facts(document);
        let words: Vec<String> = facts.iter().map(|f| f.normalized.clone()).collect();

        for (category, group) in self.group_by_category(vocabularies) {
            self.match_category(&category, &group, &facts, &words, &mut result.tags);
        }

        result.unmatched = self.unmatched_runs(document, &facts, &result.tags);
        tracing::debug!(
            tags = result.tags.len(),
            unmatched = result.unmatched.len(),
            "Entity matching finished"
        );
        result
    }

    fn token_facts(&self, document: &TokenizedDocument) -> Vec<TokenFacts> {
        document
            .tokens()
            .iter()
            .map(|token| {
                let normalized = token.normalized();
                let particle = self.lexicon.is_particle(&normalized);
                TokenFacts {
                    paragraph: token.paragraph_number,
                    capitalized: token.is_capitalized(),
                    particle,
                    stop_word: !particle && self.lexicon.is_stop_word(&normalized),
                    plain: token.is_plain_word(),
                    normalized,
                }
            })
            .collect()
    }

    /// Selected vocabularies grouped by category, in selection order
    fn group_by_category<'a>(
        &'a self,
        vocabularies: &[VocabularyId],
    ) -> Vec<(String, Vec<&'a CompiledVocabulary>)> {
        let mut groups: Vec<(String, Vec<&CompiledVocabulary>)> = Vec::new();
        let mut seen = BTreeSet::new();

        for id in vocabularies {
            if !seen.insert(id) {
                continue;
            }
            let Some(vocabulary) = self.registry.get(id) else {
                tracing::warn!(vocabulary = %id, "Unknown vocabulary selected, skipping");
                continue;
            };
            match groups.iter_mut().find(|(c, _)| c == vocabulary.category()) {
                Some((_, group)) => group.push(vocabulary),
                None => groups.push((vocabulary.category().to_string(), vec![vocabulary])),
            }
        }
        groups
    }

    fn match_category(
        &self,
        category: &str,
        group: &[&CompiledVocabulary],
        facts: &[TokenFacts],
        words: &[String],
        tags: &mut TagCollection,
    ) {
        let max_tokens = group.iter().map(|v| v.max_tokens()).max().unwrap_or(0);
        let mut start = 0;

        while start < facts.len() {
            if facts[start].normalized.is_empty() {
                start += 1;
                continue;
            }

            let longest = max_tokens.min(facts.len() - start);
            let mut matched_len = None;

            for len in (1..=longest).rev() {
                let end = start + len;
                if !self.span_allowed(&facts[start..end]) {
                    continue;
                }
                let key = &words[start..end];
                let mut found = false;
                for vocabulary in group {
                    for hit in vocabulary.lookup(key) {
                        let entry = &vocabulary.entries()[hit.entry];
                        if let Some(occurrence) = Occurrence::new(start..end) {
                            tags.entry(category, &entry.id, &entry.name)
                                .add_occurrence(&hit.surface_form, occurrence);
                            found = true;
                        }
                    }
                }
                if found {
                    matched_len = Some(len);
                    break;
                }
            }

            start += matched_len.unwrap_or(1);
        }
    }

    /// Whether a token span may form a match at all
    fn span_allowed(&self, span: &[TokenFacts]) -> bool {
        let Some(first) = span.first() else {
            return false;
        };
        if span.iter().any(|f| f.paragraph != first.paragraph) {
            return false;
        }

        if !particles_attached(span) {
            return false;
        }

        let mut words = span.iter().filter(|f| f.plain && !f.particle).peekable();
        match self.config.stop_word_policy {
            StopWordPolicy::ExcludeStandalone => {
                words.peek().is_none() || !words.all(|f| f.stop_word)
            }
            StopWordPolicy::ExcludeAny => !span.iter().any(|f| f.stop_word),
            StopWordPolicy::VocabularyWins => true,
        }
    }

    /// Capitalized runs of at least `min_unmatched_tokens` name words that
    /// overlap no match
    fn unmatched_runs(
        &self,
        document: &TokenizedDocument,
        facts: &[TokenFacts],
        tags: &TagCollection,
    ) -> BTreeSet<String> {
        let covered = tags.covered_tokens();
        let mut unmatched = BTreeSet::new();
        let mut run = UnmatchedRun::default();

        for (i, (fact, token)) in facts.iter().zip(document.tokens()).enumerate() {
            if covered.contains(&i) || !fact.plain {
                run.flush(self.config.min_unmatched_tokens, &mut unmatched);
                continue;
            }
            if run.paragraph.is_some_and(|p| p != fact.paragraph) {
                run.flush(self.config.min_unmatched_tokens, &mut unmatched);
            }

            let name_word = fact.capitalized
                && !self.lexicon.is_stop_word(&fact.normalized)
                && !self.lexicon.is_init_word(&token.text);
            if name_word {
                run.push_name(fact);
            } else if fact.particle {
                run.push_particle(fact);
            } else {
                run.flush(self.config.min_unmatched_tokens, &mut unmatched);
            }
        }
        run.flush(self.config.min_unmatched_tokens, &mut unmatched);

        for candidate in &unmatched {
            tracing::trace!(candidate = %candidate, "Unmatched candidate");
        }
        unmatched
    }
}

/// Every particle in `span` touches a capitalized name word, possibly through
/// a chain of further particles ("van der Berg")
fn particles_attached(span: &[TokenFacts]) -> bool {
    let is_name = |f: &TokenFacts| f.plain && !f.particle && f.capitalized;

    span.iter().enumerate().filter(|(_, f)| f.particle).all(|(i, _)| {
        let left = span[..i].iter().rev().find(|f| !f.particle);
        let right = span[i + 1..].iter().find(|f| !f.particle);
        left.is_some_and(is_name) || right.is_some_and(is_name)
    })
}

/// Run of name words being collected for the unmatched report
#[derive(Default)]
struct UnmatchedRun {
    words: Vec<String>,
    pending_particles: Vec<String>,
    names: usize,
    paragraph: Option<usize>,
}

impl UnmatchedRun {
    fn push_name(&mut self, fact: &TokenFacts) {
        self.words.append(&mut self.pending_particles);
        self.words.push(fact.normalized.clone());
        self.names += 1;
        self.paragraph = Some(fact.paragraph);
    }

    fn push_particle(&mut self, fact: &TokenFacts) {
        self.pending_particles.push(fact.normalized.clone());
        self.paragraph = Some(fact.paragraph);
    }

    /// Emit the run if it is long enough, then reset
    fn flush(&mut self, min_names: usize, out: &mut BTreeSet<String>) {
        if self.names >= min_names && self.names > 0 {
            out.insert(self.words.join(" "));
        }
        *self = Self::default();
    }
}
