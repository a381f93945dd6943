//! In-memory linked-data store

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use tagger_core::{LinkedDataRow, LinkedDataStore, Result, TagId, TaggerError};

/// One row of a linked-data JSON file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedDataRecord {
    pub tag_id: TagId,
    pub destination_id: i64,
    pub uri: String,
}

/// Linked-data rows held in memory, keyed by tag id
#[derive(Debug, Clone, Default)]
pub struct MemoryLinkedDataStore {
    rows: HashMap<TagId, Vec<LinkedDataRow>>,
}

impl MemoryLinkedDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with_row(mut self, tag_id: impl Into<TagId>, destination_id: i64, uri: impl Into<String>) -> Self {
        self.insert(tag_id, destination_id, uri);
        self
    }

    /// Add a row; rows stay ordered by destination id
    pub fn insert(&mut self, tag_id: impl Into<TagId>, destination_id: i64, uri: impl Into<String>) {
        let rows = self.rows.entry(tag_id.into()).or_default();
        let at = rows.partition_point(|r| r.destination_id <= destination_id);
        rows.insert(
            at,
            LinkedDataRow {
                destination_id,
                uri: uri.into(),
            },
        );
    }

    /// Load rows from a JSON array of `{tag_id, destination_id, uri}`
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            TaggerError::LinkedData(format!("Failed to read {}: {e}", path.display()))
        })?;
        let records: Vec<LinkedDataRecord> = serde_json::from_str(&content).map_err(|e| {
            TaggerError::LinkedData(format!("Failed to parse {}: {e}", path.display()))
        })?;

        let mut store = Self::new();
        for record in records {
            store.insert(record.tag_id, record.destination_id, record.uri);
        }
        tracing::debug!(tags = store.len(), path = %path.display(), "Loaded linked data");
        Ok(store)
    }

    /// Number of tag ids with at least one row
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl LinkedDataStore for MemoryLinkedDataStore {
    fn lookup(&self, tag_id: &TagId) -> Result<Vec<LinkedDataRow>> {
        Ok(self.rows.get(tag_id).cloned().unwrap_or_default())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
