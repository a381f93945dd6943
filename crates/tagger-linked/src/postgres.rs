//! PostgreSQL linked-data store
//!
//! Reads `(dstid, uri)` rows for a tag id from the configured table. The
//! tagging pipeline is synchronous, so the store owns a small current-thread
//! Tokio runtime and blocks on each query.

use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use tokio::runtime::{Builder, Runtime};

use tagger_core::config::is_sql_identifier;
use tagger_core::{
    ConfigError, LinkedDataConfig, LinkedDataRow, LinkedDataStore, Result, TagId, TaggerError,
};

/// Row as stored in the linked-data table
#[derive(Debug, FromRow)]
struct LinkedDataRecord {
    dstid: i64,
    uri: String,
}

impl From<LinkedDataRecord> for LinkedDataRow {
    fn from(record: LinkedDataRecord) -> Self {
        Self {
            destination_id: record.dstid,
            uri: record.uri,
        }
    }
}

/// Linked-data lookups against PostgreSQL
pub struct PgLinkedDataStore {
    // dropped before the runtime that drives it
    pool: PgPool,
    query: String,
    runtime: Runtime,
}

impl PgLinkedDataStore {
    /// Connect now, failing if the database is unreachable
    pub fn connect(config: &LinkedDataConfig) -> Result<Self> {
        let (url, query) = Self::prepare(config)?;
        let runtime = Self::runtime()?;
        let pool = runtime
            .block_on(
                PgPoolOptions::new()
                    .max_connections(config.pool_size)
                    .connect(url),
            )
            .map_err(|e| TaggerError::LinkedData(format!("PostgreSQL connection failed: {e}")))?;

        tracing::info!(table = %config.table, "Connected to linked-data store");
        Ok(Self {
            pool,
            query,
            runtime,
        })
    }

    /// Create the pool without connecting; the first lookup connects
    pub fn connect_lazy(config: &LinkedDataConfig) -> Result<Self> {
        let (url, query) = Self::prepare(config)?;
        let runtime = Self::runtime()?;
        let pool = {
            let _guard = runtime.enter();
            PgPoolOptions::new()
                .max_connections(config.pool_size)
                .connect_lazy(url)
                .map_err(|e| TaggerError::LinkedData(format!("Invalid database URL: {e}")))?
        };

        Ok(Self {
            pool,
            query,
            runtime,
        })
    }

    /// Lookup statement for `table`
    fn lookup_query(table: &str) -> String {
        format!(
            "SELECT dstid::bigint AS dstid, uri::text AS uri FROM {table} \
             WHERE tid::text = $1 ORDER BY dstid ASC"
        )
    }

    fn prepare(config: &LinkedDataConfig) -> Result<(&str, String)> {
        let url = config.database_url.as_deref().ok_or_else(|| {
            ConfigError::MissingRequired("linked_data.database_url".to_string())
        })?;
        if !is_sql_identifier(&config.table) {
            return Err(ConfigError::InvalidValue {
                key: "linked_data.table".to_string(),
                value: config.table.clone(),
            }
            .into());
        }
        Ok((url, Self::lookup_query(&config.table)))
    }

    fn runtime() -> Result<Runtime> {
        Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| TaggerError::LinkedData(format!("Failed to start runtime: {e}")))
    }
}

impl LinkedDataStore for PgLinkedDataStore {
    fn lookup(&self, tag_id: &TagId) -> Result<Vec<LinkedDataRow>> {
        let records: Vec<LinkedDataRecord> = self
            .runtime
            .block_on(
                sqlx::query_as(&self.query)
                    .bind(tag_id.as_str())
                    .fetch_all(&self.pool),
            )
            .map_err(|e| TaggerError::LinkedData(format!("Lookup of {tag_id} failed: {e}")))?;

        Ok(records.into_iter().map(LinkedDataRow::from).collect())
    }

    fn name(&self) -> &str {
        "postgres"
    }
}

impl std::fmt::Debug for PgLinkedDataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgLinkedDataStore")
            .field("query", &self.query)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: Option<&str>, table: &str) -> LinkedDataConfig {
        LinkedDataConfig {
            database_url: url.map(str::to_string),
            table: table.to_string(),
            ..LinkedDataConfig::default()
        }
    }

    #[test]
    fn test_lookup_query() {
        let query = PgLinkedDataStore::lookup_query("tagr_linked");
        assert!(query.contains("FROM tagr_linked"));
        assert!(query.contains("WHERE tid::text = $1"));
        assert!(query.ends_with("ORDER BY dstid ASC"));
    }

    #[test]
    fn test_missing_url() {
        let err = PgLinkedDataStore::connect_lazy(&config(None, "linked_data")).unwrap_err();
        assert!(matches!(
            err,
            TaggerError::Config(ConfigError::MissingRequired(_))
        ));
    }

    #[test]
    fn test_table_must_be_identifier() {
        let err = PgLinkedDataStore::connect_lazy(&config(
            Some("postgres://localhost/tagger"),
            "x; DROP TABLE y",
        ))
        .unwrap_err();
        assert!(matches!(
            err,
            TaggerError::Config(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_connect_lazy_does_not_connect() {
        let store =
            PgLinkedDataStore::connect_lazy(&config(Some("postgres://localhost/tagger"), "linked_data"))
                .unwrap();
        assert_eq!(store.name(), "postgres");
    }

    /// Needs a database with a populated `linked_data` table:
    /// `TAGGER_TEST_DATABASE_URL=postgres://... cargo test -- --ignored`
    #[test]
    #[ignore]
    fn test_lookup_against_database() {
        let url = std::env::var("TAGGER_TEST_DATABASE_URL").unwrap();
        let store = PgLinkedDataStore::connect(&config(Some(&url), "linked_data")).unwrap();
        let rows = store.lookup(&TagId::from("1")).unwrap();
        assert!(rows.windows(2).all(|w| w[0].destination_id <= w[1].destination_id));
    }
}
