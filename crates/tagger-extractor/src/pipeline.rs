//! Tagging pipeline
//!
//! One call runs the phases in a fixed order on the calling thread:
//! tokenize → rate tokens → match entities → rate tags → disambiguate →
//! keywords → linked data → rebuild. Entity phases are skipped when no
//! entity vocabulary is selected.

use std::collections::BTreeSet;
use std::sync::Arc;

use tagger_core::{
    Disambiguator, KeywordExtractor, LexicalResources, LinkedDataStore, Result, TagCollection,
    TagOptions, TaggerConfig, TaggerError, TaggingResult, TokenizedDocument, UnmatchedSink,
    VocabularySelection,
};
use tagger_text::{decode_document, tokenizer_for};

use crate::disambiguate::ContextDisambiguator;
use crate::enrich::LinkedDataEnricher;
use crate::keywords::VocabularyKeywordExtractor;
use crate::matcher::EntityMatcher;
use crate::rating::TokenRater;
use crate::rebuild::TextRebuilder;
use crate::tag_rating::rate_tags;
use crate::unmatched::TracingUnmatchedSink;
use crate::vocabulary::VocabularyRegistry;

/// Tagging entry point; cheap to share across threads
pub struct Tagger {
    config: TaggerConfig,
    vocabularies: Arc<VocabularyRegistry>,
    rater: TokenRater,
    matcher: EntityMatcher,
    rebuilder: TextRebuilder,
    disambiguator: Arc<dyn Disambiguator>,
    keyword_extractor: Arc<dyn KeywordExtractor>,
    linked_data: Option<LinkedDataEnricher>,
    unmatched_sink: Option<Arc<dyn UnmatchedSink>>,
}

impl Tagger {
    /// Build a tagger with the default collaborators.
    ///
    /// The configuration is validated here, once.
    pub fn new(
        config: TaggerConfig,
        lexicon: Arc<LexicalResources>,
        vocabularies: Arc<VocabularyRegistry>,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            rater: TokenRater::new(lexicon.clone(), config.rating.clone()),
            matcher: EntityMatcher::new(
                vocabularies.clone(),
                lexicon.clone(),
                config.matching.clone(),
            ),
            rebuilder: TextRebuilder::new(&config.markers),
            disambiguator: Arc::new(ContextDisambiguator::new()),
            keyword_extractor: Arc::new(VocabularyKeywordExtractor::new(
                vocabularies.clone(),
                lexicon,
            )),
            linked_data: None,
            unmatched_sink: Some(Arc::new(TracingUnmatchedSink)),
            vocabularies,
            config,
        })
    }

    /// Replace the disambiguation heuristic
    pub fn with_disambiguator(mut self, disambiguator: Arc<dyn Disambiguator>) -> Self {
        self.disambiguator = disambiguator;
        self
    }

    /// Replace the keyword extraction heuristic
    pub fn with_keyword_extractor(mut self, extractor: Arc<dyn KeywordExtractor>) -> Self {
        self.keyword_extractor = extractor;
        self
    }

    /// Use `store` for `return_uris` requests
    pub fn with_linked_data(mut self, store: Arc<dyn LinkedDataStore>) -> Self {
        self.linked_data = Some(LinkedDataEnricher::new(
            store,
            self.config.linked_data.clone(),
        ));
        self
    }

    /// Replace the unmatched-candidate sink; `None` disables reporting
    pub fn with_unmatched_sink(mut self, sink: Option<Arc<dyn UnmatchedSink>>) -> Self {
        self.unmatched_sink = sink;
        self
    }

    pub fn config(&self) -> &TaggerConfig {
        &self.config
    }

    pub fn vocabularies(&self) -> &VocabularyRegistry {
        &self.vocabularies
    }

    /// Tokenize and rate a document without matching anything
    pub fn tokenize(&self, document: &str, structure_aware: bool) -> TokenizedDocument {
        let tokenizer = tokenizer_for(structure_aware);
        let mut doc = tokenizer.tokenize(document);
        tracing::debug!(
            tokenizer = tokenizer.name(),
            tokens = doc.token_count(),
            paragraphs = doc.paragraph_count(),
            "Document tokenized"
        );
        self.rater.rate(&mut doc);
        doc
    }

    /// Tag raw bytes; non-UTF-8 input is read as Latin-1
    pub fn tag_bytes(
        &self,
        document: &[u8],
        selection: &VocabularySelection,
        options: &TagOptions,
    ) -> Result<TaggingResult> {
        self.tag(&decode_document(document), selection, options)
    }

    /// Tag `document` with the selected vocabularies
    pub fn tag(
        &self,
        document: &str,
        selection: &VocabularySelection,
        options: &TagOptions,
    ) -> Result<TaggingResult> {
        if document.trim().is_empty() {
            return Err(TaggerError::EmptyDocument);
        }

        let span = tracing::info_span!(
            "tag",
            bytes = document.len(),
            ner = selection.ner.len(),
            keywords = selection.keywords.len(),
            structure_aware = options.structure_aware,
        );
        let _enter = span.enter();

        let mut doc = self.tokenize(document, options.structure_aware);
        let mut tags = TagCollection::new();
        let mut unmatched = BTreeSet::new();

        if !selection.ner.is_empty() {
            let matched = self.matcher.match_tokens(&doc, &selection.ner);
            tags = matched.tags;
            unmatched = matched.unmatched;
            rate_tags(&mut tags, doc.tokens(), self.config.rating.combinator);

            // candidates are only logged when the caller asked for them
            if options.return_unmatched && !unmatched.is_empty() {
                if let Some(sink) = &self.unmatched_sink {
                    if let Err(e) = sink.record(&unmatched) {
                        tracing::warn!(error = %e, "Failed to record unmatched candidates");
                    }
                }
            }

            if options.disambiguate {
                let before = tags.len();
                tags = self.disambiguator.disambiguate(tags, document)?;
                tracing::debug!(before, after = tags.len(), "Disambiguation finished");
            }
        }

        if !selection.keywords.is_empty() {
            let covered = tags.covered_tokens();
            let words: Vec<usize> = doc
                .tokens()
                .iter()
                .filter(|t| t.is_plain_word() && !covered.contains(&t.token_number))
                .map(|t| t.token_number)
                .collect();
            let mut keywords = self
                .keyword_extractor
                .extract(&doc, &words, &selection.keywords)?;
            rate_tags(&mut keywords, doc.tokens(), self.config.rating.combinator);
            tags.merge(keywords)?;
        }

        if options.return_uris {
            match &self.linked_data {
                Some(enricher) => enricher.enrich(&mut tags),
                None => tracing::warn!("URIs requested but no linked-data store is configured"),
            }
        }

        let markedup_text = options
            .return_marked_text
            .then(|| self.rebuilder.rebuild(&tags, &mut doc, options.normalize_newlines));

        tracing::debug!(tags = tags.len(), "Tagging finished");
        Ok(TaggingResult {
            tags,
            markedup_text,
            unmatched: options.return_unmatched.then_some(unmatched),
        })
    }
}

impl std::fmt::Debug for Tagger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tagger")
            .field("vocabularies", &self.vocabularies.len())
            .field("linked_data", &self.linked_data)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::{Vocabulary, VocabularyEntry};
    use tagger_core::TagId;

    fn tagger() -> Tagger {
        let mut registry = VocabularyRegistry::new();
        registry
            .register(
                Vocabulary::new("places", "place").with_entry(VocabularyEntry::new("1", "Aarhus")),
            )
            .unwrap();
        Tagger::new(
            TaggerConfig::default(),
            Arc::new(LexicalResources::builtin()),
            Arc::new(registry),
        )
        .unwrap()
    }

    #[test]
    fn test_blank_document_is_rejected() {
        let err = tagger()
            .tag(" \n\t", &VocabularySelection::ner(["places"]), &TagOptions::new())
            .unwrap_err();
        assert!(matches!(err, TaggerError::EmptyDocument));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = TaggerConfig::default();
        config.markers.end_template.clear();
        let result = Tagger::new(
            config,
            Arc::new(LexicalResources::builtin()),
            Arc::new(VocabularyRegistry::new()),
        );
        assert!(matches!(result, Err(TaggerError::Config(_))));
    }

    #[test]
    fn test_optional_outputs() {
        let tagger = tagger();
        let selection = VocabularySelection::ner(["places"]);

        let bare = tagger.tag("Aarhus", &selection, &TagOptions::new()).unwrap();
        assert!(bare.markedup_text.is_none());
        assert!(bare.unmatched.is_none());
        assert!(bare.tags.get("place", &TagId::from("1")).unwrap().uris.is_none());

        let full = tagger
            .tag(
                "Aarhus",
                &selection,
                &TagOptions::new().with_marked_text().with_unmatched().with_uris(),
            )
            .unwrap();
        assert!(full.markedup_text.is_some());
        assert_eq!(full.unmatched, Some(BTreeSet::new()));
        // no store configured
        assert!(full.tags.get("place", &TagId::from("1")).unwrap().uris.is_none());
    }

    #[test]
    fn test_tag_bytes_latin1() {
        let result = tagger()
            .tag_bytes(
                b"Turen gik til Aarhus og \xC5rhus.",
                &VocabularySelection::ner(["places"]),
                &TagOptions::new().with_marked_text(),
            )
            .unwrap();
        let text = result.markedup_text.unwrap();
        assert!(text.ends_with("og Århus."));
    }

    #[test]
    fn test_tokenize_rates_tokens() {
        let doc = tagger().tokenize("Aarhus er en by", false);
        assert_eq!(doc.token_count(), 4);
        assert!(doc.tokens()[0].rating > doc.tokens()[3].rating);
    }
}
