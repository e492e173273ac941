//! Storage layer for accumulated focus time.
//!
//! Provides the durable record store using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! A `Database` can be moved to another thread but not shared without external
//! synchronization. The tracker is single-threaded and owns its store, so every
//! write is issued in event order and a stale mapping can never overwrite a
//! newer one.
//!
//! # Schema
//!
//! One key/value table. Each value is a JSON document written as a full
//! overwrite; `updated_at` is RFC 3339 UTC.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use curve_core::{AccumulatedTime, DurableStore, StoreError};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored record could not be encoded or decoded.
    #[error("invalid record {key}: {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    /// A stored timestamp could not be parsed.
    #[error("invalid timestamp for record {key}: {timestamp}")]
    TimestampParse {
        key: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS records (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    /// Returns the raw JSON stored under `key`.
    pub fn get_record(&self, key: &str) -> Result<Option<String>, DbError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM records WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn put_record(&self, key: &str, value: &str) -> Result<(), DbError> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        self.conn.execute(
            "
            INSERT INTO records (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            ",
            params![key, value, now],
        )?;
        Ok(())
    }

    /// When the record under `key` was last written.
    pub fn record_updated_at(&self, key: &str) -> Result<Option<DateTime<Utc>>, DbError> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT updated_at FROM records WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        raw.map(|timestamp| {
            DateTime::parse_from_rfc3339(&timestamp)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|source| DbError::TimestampParse {
                    key: key.to_string(),
                    timestamp,
                    source,
                })
        })
        .transpose()
    }

    /// Decodes the accumulated mapping stored under `key`.
    pub fn load_accumulated(&self, key: &str) -> Result<Option<AccumulatedTime>, DbError> {
        self.get_record(key)?
            .map(|raw| {
                serde_json::from_str(&raw).map_err(|source| DbError::Json {
                    key: key.to_string(),
                    source,
                })
            })
            .transpose()
    }

    /// Overwrites the accumulated mapping stored under `key`.
    pub fn save_accumulated(&self, key: &str, value: &AccumulatedTime) -> Result<(), DbError> {
        let raw = serde_json::to_string(value).map_err(|source| DbError::Json {
            key: key.to_string(),
            source,
        })?;
        self.put_record(key, &raw)
    }
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Json { key, source } => Self::Corrupt { key, source },
            other => Self::Unavailable {
                message: other.to_string(),
            },
        }
    }
}

impl DurableStore for Database {
    fn get(&self, key: &str) -> Result<Option<AccumulatedTime>, StoreError> {
        Ok(self.load_accumulated(key)?)
    }

    fn set(&mut self, key: &str, value: &AccumulatedTime) -> Result<(), StoreError> {
        self.save_accumulated(key, value)?;
        tracing::trace!(key, files = value.len(), "record written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use curve_core::{FileId, RECORD_KEY};

    use super::*;

    fn totals(entries: &[(&str, u64)]) -> AccumulatedTime {
        entries
            .iter()
            .map(|(file, ms)| (FileId::new(*file).unwrap(), *ms))
            .collect()
    }

    #[test]
    fn missing_record_is_none() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get(RECORD_KEY).unwrap().is_none());
        assert!(db.record_updated_at(RECORD_KEY).unwrap().is_none());
    }

    #[test]
    fn set_overwrites_previous_record() {
        let mut db = Database::open_in_memory().unwrap();
        db.set(RECORD_KEY, &totals(&[("a.ts", 1)])).unwrap();
        db.set(RECORD_KEY, &totals(&[("a.ts", 5), ("b.ts", 2)]))
            .unwrap();

        let loaded = db.get(RECORD_KEY).unwrap().unwrap();
        assert_eq!(loaded, totals(&[("a.ts", 5), ("b.ts", 2)]));
        assert!(db.record_updated_at(RECORD_KEY).unwrap().is_some());
    }

    #[test]
    fn record_is_stored_as_flat_json() {
        let mut db = Database::open_in_memory().unwrap();
        db.set(RECORD_KEY, &totals(&[("a.ts", 120_000)])).unwrap();
        assert_eq!(
            db.get_record(RECORD_KEY).unwrap().as_deref(),
            Some(r#"{"a.ts":120000}"#)
        );
    }

    #[test]
    fn corrupt_record_maps_to_store_error() {
        let db = Database::open_in_memory().unwrap();
        db.put_record(RECORD_KEY, "not json").unwrap();

        let err = db.get(RECORD_KEY).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[test]
    fn record_survives_reopen() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("curve.db");

        {
            let mut db = Database::open(&path).unwrap();
            db.set(RECORD_KEY, &totals(&[("a.ts", 5_000)])).unwrap();
        }

        let db = Database::open(&path).unwrap();
        assert_eq!(
            db.get(RECORD_KEY).unwrap(),
            Some(totals(&[("a.ts", 5_000)]))
        );
    }

    #[test]
    fn init_is_idempotent() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("curve.db");
        Database::open(&path).unwrap();
        Database::open(&path).unwrap();
    }
}
