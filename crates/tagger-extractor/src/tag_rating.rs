//! Tag rating: one aggregate per tag from the ratings of its tokens

use tagger_core::{TagCollection, TagRatingCombinator, Token};

/// Set `rating` on every tag from the tokens its occurrences cover
pub fn rate_tags(tags: &mut TagCollection, tokens: &[Token], combinator: TagRatingCombinator) {
    for tag in tags.iter_mut() {
        tag.rating = combinator.combine(
            tag.token_indices()
                .filter_map(|i| tokens.get(i))
                .map(|t| t.rating),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagger_core::{FragmentRange, Occurrence, TagId};

    fn token(number: usize, rating: f32) -> Token {
        let mut token = Token::new("x", number, 0, FragmentRange::single(number));
        token.rating = rating;
        token
    }

    fn collection() -> TagCollection {
        let mut tags = TagCollection::new();
        let tag = tags.entry("person", &TagId::from("1"), "Anna Nielsen");
        tag.add_occurrence("Anna Nielsen", Occurrence::new(0..2).unwrap());
        tag.add_occurrence("Anna", Occurrence::single(3));
        tags
    }

    #[test]
    fn test_mean_rating() {
        let tokens = vec![token(0, 2.0), token(1, 1.0), token(2, 9.0), token(3, 3.0)];
        let mut tags = collection();
        rate_tags(&mut tags, &tokens, TagRatingCombinator::Mean);
        assert_eq!(tags.get("person", &TagId::from("1")).unwrap().rating, 2.0);
    }

    #[test]
    fn test_max_rating() {
        let tokens = vec![token(0, 2.0), token(1, 1.0), token(2, 9.0), token(3, 3.0)];
        let mut tags = collection();
        rate_tags(&mut tags, &tokens, TagRatingCombinator::Max);
        assert_eq!(tags.get("person", &TagId::from("1")).unwrap().rating, 3.0);
    }

    #[test]
    fn test_rating_is_not_accumulated() {
        let tokens = vec![token(0, 2.0), token(1, 1.0), token(2, 9.0), token(3, 3.0)];
        let mut tags = collection();
        rate_tags(&mut tags, &tokens, TagRatingCombinator::Mean);
        rate_tags(&mut tags, &tokens, TagRatingCombinator::Mean);
        assert_eq!(tags.get("person", &TagId::from("1")).unwrap().rating, 2.0);
    }
}
