//! Context-based disambiguation
//!
//! When several tags of one category claim the very same occurrence (two
//! people called "Jensen"), only the best supported tag keeps it. Support
//! is compared by number of occurrences, then by how often the canonical
//! name appears in the document, then by rating, then by which tag the
//! matcher found first. Tags left without occurrences are dropped.

use std::cmp::Ordering;
use std::collections::HashMap;

use tagger_core::{Disambiguator, Occurrence, Result, Tag, TagCollection, TagId};

/// Default [`Disambiguator`] resolving shared occurrences within a category
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextDisambiguator;

impl ContextDisambiguator {
    pub fn new() -> Self {
        Self
    }
}

struct Support {
    occurrences: usize,
    mentions: usize,
    rating: f32,
    order: usize,
}

impl Support {
    fn of(tag: &Tag, order: usize, text: &str) -> Self {
        let name = tag.name.to_lowercase();
        Self {
            occurrences: tag.occurrence_count(),
            mentions: if name.is_empty() {
                0
            } else {
                text.matches(name.as_str()).count()
            },
            rating: tag.rating,
            order,
        }
    }

    /// `Greater` means better supported
    fn compare(&self, other: &Self) -> Ordering {
        self.occurrences
            .cmp(&other.occurrences)
            .then(self.mentions.cmp(&other.mentions))
            .then(self.rating.total_cmp(&other.rating))
            .then(other.order.cmp(&self.order))
    }
}

impl Disambiguator for ContextDisambiguator {
    fn disambiguate(&self, mut tags: TagCollection, text: &str) -> Result<TagCollection> {
        let text = text.to_lowercase();
        let mut removals: HashMap<(String, TagId), Vec<Occurrence>> = HashMap::new();

        for bucket in tags.categories() {
            let support: Vec<Support> = bucket
                .tags()
                .iter()
                .enumerate()
                .map(|(order, tag)| Support::of(tag, order, &text))
                .collect();

            // occurrence -> tags claiming it, in first-seen order
            let mut claims: Vec<(Occurrence, Vec<usize>)> = Vec::new();
            for (position, tag) in bucket.tags().iter().enumerate() {
                for occurrence in tag.occurrences() {
                    match claims.iter_mut().find(|(o, _)| o == occurrence) {
                        Some((_, claimants)) => {
                            if !claimants.contains(&position) {
                                claimants.push(position);
                            }
                        }
                        None => claims.push((*occurrence, vec![position])),
                    }
                }
            }

            for (occurrence, claimants) in claims.into_iter().filter(|(_, c)| c.len() > 1) {
                let Some(&winner) = claimants
                    .iter()
                    .max_by(|&&a, &&b| support[a].compare(&support[b]))
                else {
                    continue;
                };
                for loser in claimants.into_iter().filter(|&c| c != winner) {
                    let tag = &bucket.tags()[loser];
                    tracing::debug!(
                        category = bucket.category(),
                        dropped = %tag.id,
                        kept = %bucket.tags()[winner].id,
                        start = occurrence.start(),
                        "Resolved shared occurrence"
                    );
                    removals
                        .entry((bucket.category().to_string(), tag.id.clone()))
                        .or_default()
                        .push(occurrence);
                }
            }
        }

        if removals.is_empty() {
            return Ok(tags);
        }

        for tag in tags.iter_mut() {
            if let Some(lost) = removals.get(&(tag.category.clone(), tag.id.clone())) {
                for occurrence in lost {
                    tag.remove_occurrence(occurrence);
                }
            }
        }
        tags.retain(|tag| tag.occurrence_count() > 0);
        Ok(tags)
    }
}
