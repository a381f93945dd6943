//! Tagger Linked - Linked-data URI stores
//!
//! Implementations of [`tagger_core::LinkedDataStore`]:
//! - [`MemoryLinkedDataStore`]: rows held in memory, loadable from JSON
//! - [`PgLinkedDataStore`]: rows read from a PostgreSQL table

use std::sync::Arc;

use tagger_core::{LinkedDataConfig, LinkedDataStore, Result};

pub mod memory;
pub mod postgres;

pub use memory::MemoryLinkedDataStore;
pub use postgres::PgLinkedDataStore;

/// PostgreSQL store for the configured database, if one is configured.
///
/// The pool connects on first lookup, so an unreachable database only
/// shows up as failed (and logged) lookups.
pub fn store_from_config(config: &LinkedDataConfig) -> Result<Option<Arc<dyn LinkedDataStore>>> {
    if config.database_url.is_none() {
        return Ok(None);
    }
    let store: Arc<dyn LinkedDataStore> = Arc::new(PgLinkedDataStore::connect_lazy(config)?);
    Ok(Some(store))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_database_configured() {
        let store = store_from_config(&LinkedDataConfig::default()).unwrap();
        assert!(store.is_none());
    }

    #[test]
    fn test_database_configured() {
        let config = LinkedDataConfig {
            database_url: Some("postgres://tagger@localhost/tagger".to_string()),
            ..LinkedDataConfig::default()
        };
        let store = store_from_config(&config).unwrap().unwrap();
        assert_eq!(store.name(), "postgres");
    }
}
