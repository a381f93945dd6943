//! Marker reinsertion
//!
//! Walks tags → synonym groups → occurrences → tokens in collection order
//! and wraps every token once, editing the head and tail fragments in the
//! document arena. The output is the fragment concatenation.

use tagger_core::config::ID_PLACEHOLDER;
use tagger_core::{MarkerConfig, TagCollection, TokenizedDocument};

/// Rebuilds the document text with markers around matched tokens
#[derive(Debug, Clone)]
pub struct TextRebuilder {
    start_template: String,
    end_template: String,
    substitute_placeholder: bool,
}

impl TextRebuilder {
    pub fn new(markers: &MarkerConfig) -> Self {
        Self {
            start_template: markers.start_template.clone(),
            end_template: markers.end_template.clone(),
            substitute_placeholder: markers.id_placeholder_enabled,
        }
    }

    /// Mark every token referenced by `tags`, then render the document
    pub fn rebuild(
        &self,
        tags: &TagCollection,
        document: &mut TokenizedDocument,
        normalize_newlines: bool,
    ) -> String {
        let mut wrapped = 0usize;

        for tag in tags.iter() {
            for group in &tag.synonyms {
                for occurrence in &group.occurrences {
                    for (position, index) in occurrence.token_indices().enumerate() {
                        if document.token(index).map_or(true, |t| t.is_marked()) {
                            continue;
                        }
                        let start = self.start_marker(position);
                        if document.wrap_token(index, &start, &self.end_template) {
                            wrapped += 1;
                        }
                    }
                }
            }
        }

        tracing::debug!(tokens = wrapped, "Markers inserted");
        document.render(normalize_newlines)
    }

    fn start_marker(&self, position: usize) -> String {
        if self.substitute_placeholder {
            self.start_template
                .replace(ID_PLACEHOLDER, &position.to_string())
        } else {
            self.start_template.clone()
        }
    }
}
