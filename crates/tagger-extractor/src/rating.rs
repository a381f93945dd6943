//! Token rating
//!
//! Scores every token from its position, case, stop-word status and the
//! markup emphasis around it. The rating depends only on the token and the
//! document counts, so rating the same document twice changes nothing.

use std::sync::Arc;

use tagger_core::{LexicalResources, RatingConfig, Token, TokenizedDocument};

/// Rates the tokens of a document in place
#[derive(Debug, Clone)]
pub struct TokenRater {
    lexicon: Arc<LexicalResources>,
    config: RatingConfig,
}

impl TokenRater {
    pub fn new(lexicon: Arc<LexicalResources>, config: RatingConfig) -> Self {
        Self { lexicon, config }
    }

    pub fn config(&self) -> &RatingConfig {
        &self.config
    }

    /// Set position, structural and combined ratings on every token
    pub fn rate(&self, document: &mut TokenizedDocument) {
        let token_count = document.token_count();
        let paragraph_count = document.paragraph_count();

        let structural: Vec<f32> = (0..token_count)
            .map(|i| {
                document
                    .token_fragments(i)
                    .iter()
                    .map(|f| f.emphasis.score())
                    .fold(0.0, f32::max)
            })
            .collect();

        for (token, structural_score) in document.tokens_mut().iter_mut().zip(structural) {
            token.position_score = position_score(token, token_count, paragraph_count);
            token.structural_score = structural_score;
            token.rating = self.combined_rating(token);
        }
    }

    fn combined_rating(&self, token: &Token) -> f32 {
        if self.lexicon.is_particle(&token.text) {
            return 0.0;
        }

        let case = if token.is_capitalized() && !self.lexicon.is_init_word(&token.text) {
            1.0
        } else {
            0.0
        };
        let stop = if self.lexicon.is_stop_word(&token.text) {
            1.0
        } else {
            0.0
        };

        self.config.position_weight * token.position_score + self.config.case_weight * case
            - self.config.stop_word_penalty * stop
            + self.config.structural_weight * token.structural_score
    }
}

/// Lead bias: earlier tokens and earlier paragraphs score higher
fn position_score(token: &Token, token_count: usize, paragraph_count: usize) -> f32 {
    let lead = |n: usize, count: usize| {
        if count == 0 {
            0.0
        } else {
            1.0 - n as f32 / count as f32
        }
    };
    0.5 * lead(token.token_number, token_count) + 0.5 * lead(token.paragraph_number, paragraph_count)
}
