//! Linked-data enrichment
//!
//! Looks up every tag id in a [`LinkedDataStore`] and attaches the returned
//! URIs keyed by source name. A failing lookup leaves that tag without URIs
//! and tagging carries on.

use std::collections::BTreeMap;
use std::sync::Arc;

use tagger_core::{LinkedDataConfig, LinkedDataStore, TagCollection};

/// Attaches linked-data URIs to tags
#[derive(Clone)]
pub struct LinkedDataEnricher {
    store: Arc<dyn LinkedDataStore>,
    config: LinkedDataConfig,
}

impl LinkedDataEnricher {
    pub fn new(store: Arc<dyn LinkedDataStore>, config: LinkedDataConfig) -> Self {
        Self { store, config }
    }

    pub fn store_name(&self) -> &str {
        self.store.name()
    }

    /// Set `uris` on every tag whose lookup succeeds
    pub fn enrich(&self, tags: &mut TagCollection) {
        let mut failures = 0usize;

        for tag in tags.iter_mut() {
            match self.store.lookup(&tag.id) {
                Ok(rows) => {
                    let mut uris = BTreeMap::new();
                    for row in rows {
                        let source = match self.config.source_name(row.destination_id) {
                            Some(name) => name.to_string(),
                            None => {
                                tracing::debug!(
                                    destination_id = row.destination_id,
                                    "No source name configured, using destination id"
                                );
                                row.destination_id.to_string()
                            }
                        };
                        // later rows for the same source replace earlier ones
                        uris.insert(source, row.uri);
                    }
                    tag.uris = Some(uris);
                }
                Err(e) => {
                    failures += 1;
                    tracing::warn!(
                        store = self.store.name(),
                        tag = %tag.id,
                        error = %e,
                        "Linked-data lookup failed"
                    );
                }
            }
        }

        tracing::debug!(
            store = self.store.name(),
            tags = tags.len(),
            failures,
            "Linked-data enrichment finished"
        );
    }
}

impl std::fmt::Debug for LinkedDataEnricher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkedDataEnricher")
            .field("store", &self.store.name())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagger_core::{LinkedDataRow, LinkedDataSource, Occurrence, Result, TagId, TaggerError};

    struct FixedStore;

    impl LinkedDataStore for FixedStore {
        fn lookup(&self, tag_id: &TagId) -> Result<Vec<LinkedDataRow>> {
            match tag_id.as_str() {
                "1" => Ok(vec![
                    LinkedDataRow {
                        destination_id: 1,
                        uri: "http://dbpedia.org/resource/Århus".to_string(),
                    },
                    LinkedDataRow {
                        destination_id: 1,
                        uri: "http://dbpedia.org/resource/Aarhus".to_string(),
                    },
                    LinkedDataRow {
                        destination_id: 2,
                        uri: "http://www.geonames.org/2624652".to_string(),
                    },
                    LinkedDataRow {
                        destination_id: 7,
                        uri: "urn:x-local:1".to_string(),
                    },
                ]),
                "broken" => Err(TaggerError::LinkedData("connection reset".to_string())),
                _ => Ok(Vec::new()),
            }
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn config() -> LinkedDataConfig {
        LinkedDataConfig {
            sources: vec![
                LinkedDataSource {
                    destination_id: 1,
                    name: "dbpedia".to_string(),
                },
                LinkedDataSource {
                    destination_id: 2,
                    name: "geonames".to_string(),
                },
            ],
            ..LinkedDataConfig::default()
        }
    }

    #[test]
    fn test_enrich_maps_sources() {
        let mut tags = TagCollection::new();
        for id in ["1", "2", "broken"] {
            tags.entry("place", &TagId::from(id), id)
                .add_occurrence(id, Occurrence::single(0));
        }

        LinkedDataEnricher::new(Arc::new(FixedStore), config()).enrich(&mut tags);

        let uris = tags
            .get("place", &TagId::from("1"))
            .and_then(|t| t.uris.clone())
            .unwrap();
        let keys: Vec<&str> = uris.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["7", "dbpedia", "geonames"]);
        assert_eq!(uris["geonames"], "http://www.geonames.org/2624652");
        // the last row for a source wins
        assert_eq!(uris["dbpedia"], "http://dbpedia.org/resource/Aarhus");

        // empty result is still a successful lookup
        assert_eq!(
            tags.get("place", &TagId::from("2")).unwrap().uris,
            Some(BTreeMap::new())
        );
        // failures leave the tag alone
        assert!(tags.get("place", &TagId::from("broken")).unwrap().uris.is_none());
    }
}
