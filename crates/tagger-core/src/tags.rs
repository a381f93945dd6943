//! Tag model
//!
//! Matches are grouped category → tag id → synonym group → occurrence.
//! Every level keeps insertion order so repeated runs serialize the same.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::ops::Range;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::{Result, TaggerError};

// ============================================================================
// Identifiers
// ============================================================================

/// Identifier of a vocabulary entry (a tag)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagId(String);

impl TagId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TagId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TagId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identifier of a vocabulary
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VocabularyId(String);

impl VocabularyId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VocabularyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VocabularyId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for VocabularyId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ============================================================================
// Occurrences and Synonym Groups
// ============================================================================

/// One contiguous matched span of tokens, `start..end` into the token stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Occurrence {
    start: usize,
    end: usize,
}

impl Occurrence {
    /// Returns `None` for an empty span
    pub fn new(tokens: Range<usize>) -> Option<Self> {
        (tokens.start < tokens.end).then_some(Self {
            start: tokens.start,
            end: tokens.end,
        })
    }

    pub fn single(token: usize) -> Self {
        Self {
            start: token,
            end: token + 1,
        }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Token indices in document order
    pub fn token_indices(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Position of `token` inside this occurrence
    pub fn position_of(&self, token: usize) -> Option<usize> {
        self.token_indices()
            .contains(&token)
            .then(|| token - self.start)
    }
}

/// All occurrences that matched one surface form of an entity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynonymGroup {
    /// Registered surface form (canonical name or synonym)
    pub surface_form: String,
    pub occurrences: Vec<Occurrence>,
}

// ============================================================================
// Tag
// ============================================================================

/// A recognized entity with its occurrences
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tag {
    pub id: TagId,
    pub category: String,

    /// Canonical vocabulary name
    pub name: String,

    /// Aggregate of the ratings of the tokens it covers
    pub rating: f32,

    pub synonyms: Vec<SynonymGroup>,

    /// Source name → URI, set by linked-data enrichment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uris: Option<BTreeMap<String, String>>,
}

impl Tag {
    pub fn new(id: impl Into<TagId>, category: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            category: category.into(),
            name: name.into(),
            rating: 0.0,
            synonyms: Vec::new(),
            uris: None,
        }
    }

    /// Record an occurrence under `surface_form`, ignoring exact duplicates
    pub fn add_occurrence(&mut self, surface_form: &str, occurrence: Occurrence) {
        match self
            .synonyms
            .iter_mut()
            .find(|g| g.surface_form == surface_form)
        {
            Some(group) => {
                if !group.occurrences.contains(&occurrence) {
                    group.occurrences.push(occurrence);
                }
            }
            None => self.synonyms.push(SynonymGroup {
                surface_form: surface_form.to_string(),
                occurrences: vec![occurrence],
            }),
        }
    }

    /// Drop `occurrence` from every group, then drop emptied groups
    pub fn remove_occurrence(&mut self, occurrence: &Occurrence) {
        for group in &mut self.synonyms {
            group.occurrences.retain(|o| o != occurrence);
        }
        self.synonyms.retain(|g| !g.occurrences.is_empty());
    }

    pub fn occurrences(&self) -> impl Iterator<Item = &Occurrence> {
        self.synonyms.iter().flat_map(|g| g.occurrences.iter())
    }

    pub fn occurrence_count(&self) -> usize {
        self.synonyms.iter().map(|g| g.occurrences.len()).sum()
    }

    /// Token indices of every occurrence, with repetition
    pub fn token_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.occurrences().flat_map(|o| o.token_indices())
    }
}

// ============================================================================
// Tag Collection
// ============================================================================

/// Tags of one category, keyed by id in insertion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryTags {
    category: String,
    tags: Vec<Tag>,
    index: HashMap<TagId, usize>,
}

impl CategoryTags {
    fn new(category: &str) -> Self {
        Self {
            category: category.to_string(),
            tags: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn get(&self, id: &TagId) -> Option<&Tag> {
        self.index.get(id).map(|&i| &self.tags[i])
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    fn reindex(&mut self) {
        self.index = self
            .tags
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.clone(), i))
            .collect();
    }
}

/// Category → id → tag, in matcher insertion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagCollection {
    categories: Vec<CategoryTags>,
    index: HashMap<String, usize>,
}

impl TagCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag for `category`/`id`, created with `name` when absent
    pub fn entry(&mut self, category: &str, id: &TagId, name: &str) -> &mut Tag {
        let cat = self.category_index(category);
        let bucket = &mut self.categories[cat];
        let pos = match bucket.index.get(id) {
            Some(&pos) => pos,
            None => {
                bucket.tags.push(Tag::new(id.clone(), category, name));
                bucket.index.insert(id.clone(), bucket.tags.len() - 1);
                bucket.tags.len() - 1
            }
        };
        &mut bucket.tags[pos]
    }

    /// Insert a tag that must not exist yet
    pub fn insert(&mut self, tag: Tag) -> Result<()> {
        if self.get(&tag.category, &tag.id).is_some() {
            return Err(TaggerError::MergeConflict {
                category: tag.category,
                id: tag.id.to_string(),
            });
        }
        let cat = self.category_index(&tag.category);
        let bucket = &mut self.categories[cat];
        bucket.index.insert(tag.id.clone(), bucket.tags.len());
        bucket.tags.push(tag);
        Ok(())
    }

    /// Merge `other` into this collection.
    ///
    /// Fails without modifying `self` if any category/id pair exists in both.
    pub fn merge(&mut self, other: TagCollection) -> Result<()> {
        if let Some(clash) = other.iter().find(|t| self.get(&t.category, &t.id).is_some()) {
            return Err(TaggerError::MergeConflict {
                category: clash.category.clone(),
                id: clash.id.to_string(),
            });
        }
        for bucket in other.categories {
            for tag in bucket.tags {
                self.insert(tag)?;
            }
        }
        Ok(())
    }

    pub fn get(&self, category: &str, id: &TagId) -> Option<&Tag> {
        self.category(category).and_then(|c| c.get(id))
    }

    pub fn category(&self, category: &str) -> Option<&CategoryTags> {
        self.index.get(category).map(|&i| &self.categories[i])
    }

    pub fn categories(&self) -> &[CategoryTags] {
        &self.categories
    }

    /// All tags, category by category
    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.categories.iter().flat_map(|c| c.tags.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Tag> {
        self.categories.iter_mut().flat_map(|c| c.tags.iter_mut())
    }

    /// Keep only tags for which `keep` returns true; empty categories go too
    pub fn retain(&mut self, mut keep: impl FnMut(&Tag) -> bool) {
        for bucket in &mut self.categories {
            bucket.tags.retain(&mut keep);
            bucket.reindex();
        }
        self.categories.retain(|c| !c.tags.is_empty());
        self.index = self
            .categories
            .iter()
            .enumerate()
            .map(|(i, c)| (c.category.clone(), i))
            .collect();
    }

    /// Number of tags across all categories
    pub fn len(&self) -> usize {
        self.categories.iter().map(|c| c.tags.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every token index referenced by any occurrence
    pub fn covered_tokens(&self) -> BTreeSet<usize> {
        self.iter().flat_map(|t| t.token_indices()).collect()
    }

    fn category_index(&mut self, category: &str) -> usize {
        if let Some(&i) = self.index.get(category) {
            return i;
        }
        self.categories.push(CategoryTags::new(category));
        self.index
            .insert(category.to_string(), self.categories.len() - 1);
        self.categories.len() - 1
    }
}

impl Serialize for CategoryTags {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.tags.len()))?;
        for tag in &self.tags {
            map.serialize_entry(tag.id.as_str(), tag)?;
        }
        map.end()
    }
}

impl Serialize for TagCollection {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.categories.len()))?;
        for bucket in &self.categories {
            map.serialize_entry(&bucket.category, bucket)?;
        }
        map.end()
    }
}

/// Output of the entity matcher
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchResult {
    pub tags: TagCollection,

    /// Normalized capitalized runs that matched no vocabulary entry
    pub unmatched: BTreeSet<String>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn occ(start: usize, end: usize) -> Occurrence {
        Occurrence::new(start..end).unwrap()
    }

    #[test]
    fn test_occurrence_rejects_empty() {
        assert!(Occurrence::new(3..3).is_none());
        assert_eq!(Occurrence::single(4), occ(4, 5));
        assert_eq!(occ(2, 5).position_of(3), Some(1));
        assert_eq!(occ(2, 5).position_of(5), None);
    }

    #[test]
    fn test_entry_keeps_insertion_order() {
        let mut tags = TagCollection::new();
        tags.entry("place", &TagId::from("2"), "Aarhus")
            .add_occurrence("Aarhus", occ(4, 5));
        tags.entry("person", &TagId::from("1"), "Anna Nielsen")
            .add_occurrence("Anna Nielsen", occ(0, 2));
        tags.entry("place", &TagId::from("3"), "Odense")
            .add_occurrence("Odense", occ(7, 8));

        let categories: Vec<&str> = tags.categories().iter().map(|c| c.category()).collect();
        assert_eq!(categories, vec!["place", "person"]);

        let ids: Vec<&str> = tags.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "3", "1"]);
        assert_eq!(tags.len(), 3);
    }

    #[test]
    fn test_synonym_groups() {
        let mut tag = Tag::new("7", "place", "København");
        tag.add_occurrence("København", occ(0, 1));
        tag.add_occurrence("Kbh", occ(5, 6));
        tag.add_occurrence("København", occ(9, 10));
        tag.add_occurrence("København", occ(9, 10));

        assert_eq!(tag.synonyms.len(), 2);
        assert_eq!(tag.occurrence_count(), 3);

        tag.remove_occurrence(&occ(5, 6));
        assert_eq!(tag.synonyms.len(), 1);
        assert_eq!(tag.occurrence_count(), 2);
    }

    #[test]
    fn test_merge_conflict_leaves_collection_untouched() {
        let mut ner = TagCollection::new();
        ner.entry("topic", &TagId::from("1"), "Sport")
            .add_occurrence("Sport", occ(0, 1));

        let mut keywords = TagCollection::new();
        keywords
            .entry("topic", &TagId::from("9"), "Fodbold")
            .add_occurrence("Fodbold", occ(3, 4));
        keywords
            .entry("topic", &TagId::from("1"), "Sport")
            .add_occurrence("Sport", occ(6, 7));

        let err = ner.merge(keywords).unwrap_err();
        assert!(matches!(err, TaggerError::MergeConflict { ref id, .. } if id == "1"));
        assert_eq!(ner.len(), 1);
    }

    #[test]
    fn test_merge_disjoint() {
        let mut ner = TagCollection::new();
        ner.entry("person", &TagId::from("1"), "Anna")
            .add_occurrence("Anna", occ(0, 1));
        let mut keywords = TagCollection::new();
        keywords
            .entry("topic", &TagId::from("1"), "Sport")
            .add_occurrence("Sport", occ(3, 4));

        ner.merge(keywords).unwrap();
        assert_eq!(ner.len(), 2);
        assert!(ner.get("topic", &TagId::from("1")).is_some());
    }

    #[test]
    fn test_retain_drops_empty_categories() {
        let mut tags = TagCollection::new();
        tags.entry("person", &TagId::from("1"), "Anna")
            .add_occurrence("Anna", occ(0, 1));
        tags.entry("place", &TagId::from("2"), "Aarhus")
            .add_occurrence("Aarhus", occ(4, 5));

        tags.retain(|t| t.category != "person");
        assert!(tags.category("person").is_none());
        assert!(tags.get("place", &TagId::from("2")).is_some());
        assert_eq!(tags.categories().len(), 1);
    }

    #[test]
    fn test_covered_tokens() {
        let mut tags = TagCollection::new();
        tags.entry("person", &TagId::from("1"), "Anna Nielsen")
            .add_occurrence("Anna Nielsen", occ(0, 2));
        tags.entry("place", &TagId::from("2"), "Aarhus")
            .add_occurrence("Aarhus", occ(4, 5));
        let covered: Vec<usize> = tags.covered_tokens().into_iter().collect();
        assert_eq!(covered, vec![0, 1, 4]);
    }

    #[test]
    fn test_serialize_preserves_order() {
        let mut tags = TagCollection::new();
        tags.entry("place", &TagId::from("b"), "B")
            .add_occurrence("B", occ(1, 2));
        tags.entry("place", &TagId::from("a"), "A")
            .add_occurrence("A", occ(0, 1));
        let json = serde_json::to_string(&tags).unwrap();
        let b = json.find("\"b\"").unwrap();
        let a = json.find("\"a\"").unwrap();
        assert!(b < a);
        assert!(json.starts_with("{\"place\":"));
    }
}
