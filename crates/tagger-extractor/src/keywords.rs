//! Keyword extraction over residual words
//!
//! Words that no entity match covered are looked up one by one in the
//! selected keyword vocabularies. Stop words are never keywords.

use std::sync::Arc;

use tagger_core::{
    KeywordExtractor, LexicalResources, Occurrence, Result, TagCollection, TokenizedDocument,
    VocabularyId,
};

use crate::vocabulary::VocabularyRegistry;

/// Default [`KeywordExtractor`] backed by the vocabulary registry
#[derive(Debug, Clone)]
pub struct VocabularyKeywordExtractor {
    registry: Arc<VocabularyRegistry>,
    lexicon: Arc<LexicalResources>,
}

impl VocabularyKeywordExtractor {
    pub fn new(registry: Arc<VocabularyRegistry>, lexicon: Arc<LexicalResources>) -> Self {
        Self { registry, lexicon }
    }
}

impl KeywordExtractor for VocabularyKeywordExtractor {
    fn extract(
        &self,
        document: &TokenizedDocument,
        words: &[usize],
        vocabularies: &[VocabularyId],
    ) -> Result<TagCollection> {
        let mut tags = TagCollection::new();

        for id in vocabularies {
            let Some(vocabulary) = self.registry.get(id) else {
                tracing::warn!(vocabulary = %id, "Unknown keyword vocabulary selected, skipping");
                continue;
            };

            for &index in words {
                let Some(token) = document.token(index) else {
                    continue;
                };
                if !token.is_plain_word() || self.lexicon.is_stop_word(&token.text) {
                    continue;
                }

                let key = [token.normalized()];
                for hit in vocabulary.lookup(&key) {
                    let entry = &vocabulary.entries()[hit.entry];
                    tags.entry(vocabulary.category(), &entry.id, &entry.name)
                        .add_occurrence(&hit.surface_form, Occurrence::single(index));
                }
            }
        }

        tracing::debug!(
            words = words.len(),
            keywords = tags.len(),
            "Keyword extraction finished"
        );
        Ok(tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::{Vocabulary, VocabularyEntry};
    use tagger_core::TagId;
    use tagger_text::{DocumentTokenizer, PlainTokenizer};

    fn extractor() -> VocabularyKeywordExtractor {
        let mut registry = VocabularyRegistry::new();
        registry
            .register(
                Vocabulary::new("topics", "topic")
                    .with_entry(VocabularyEntry::new("k1", "Cykling").with_synonyms(["cykel"]))
                    .with_entry(VocabularyEntry::new("k2", "og"))
                    .with_entry(VocabularyEntry::new("k3", "Tour de France")),
            )
            .unwrap();
        VocabularyKeywordExtractor::new(Arc::new(registry), Arc::new(LexicalResources::builtin()))
    }

    fn all_words(doc: &TokenizedDocument) -> Vec<usize> {
        (0..doc.token_count()).collect()
    }

    #[test]
    fn test_single_word_keywords() {
        let doc = PlainTokenizer.tokenize("Cykling og en ny cykel.");
        let tags = extractor()
            .extract(&doc, &all_words(&doc), &[VocabularyId::from("topics")])
            .unwrap();

        let tag = tags.get("topic", &TagId::from("k1")).unwrap();
        assert_eq!(tag.name, "Cykling");
        assert_eq!(tag.occurrence_count(), 2);
        assert_eq!(tag.synonyms.len(), 2);
        // stop words never become keywords
        assert!(tags.get("topic", &TagId::from("k2")).is_none());
        // multi-word surface forms are left to entity matching
        assert!(tags.get("topic", &TagId::from("k3")).is_none());
    }

    #[test]
    fn test_only_listed_words_are_considered() {
        let doc = PlainTokenizer.tokenize("Cykling og cykel");
        let tags = extractor()
            .extract(&doc, &[2], &[VocabularyId::from("topics")])
            .unwrap();
        let tag = tags.get("topic", &TagId::from("k1")).unwrap();
        assert_eq!(tag.occurrences().map(|o| o.start()).collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_unknown_vocabulary_is_skipped() {
        let doc = PlainTokenizer.tokenize("cykel");
        let tags = extractor()
            .extract(
                &doc,
                &[0],
                &[VocabularyId::from("missing"), VocabularyId::from("topics")],
            )
            .unwrap();
        assert_eq!(tags.len(), 1);
        assert!(tags.get("topic", &TagId::from("k1")).is_some());
    }
}
