//! Durable Tier
//!
//! SQLite-backed storage tier that survives process restarts. One table
//! maps each key to its JSON payload and an expiration timestamp in Unix
//! milliseconds; an index on the timestamp keeps range-deletion of expired
//! rows cheap.

use std::fs;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::{CacheEntry, TierLookup};
use crate::error::{CacheError, Result};

// == Durable Tier ==
/// Persistent tier over a single SQLite connection.
///
/// SQLite serializes its own writes; the mutex here keeps one logical
/// operation (such as "found it expired, now delete it") atomic from the
/// caller's point of view.
pub struct DurableTier {
    conn: Mutex<Connection>,
}

impl DurableTier {
    // == Open ==
    /// Opens (or creates) the database at `path`, creating parent
    /// directories as needed and initializing the schema.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        let tier = Self {
            conn: Mutex::new(conn),
        };
        tier.init_schema()?;
        Ok(tier)
    }

    /// Opens an in-memory database for testing.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let tier = Self {
            conn: Mutex::new(conn),
        };
        tier.init_schema()?;
        Ok(tier)
    }

    /// Opens an existing database without write access. Reads behave
    /// normally; any operation that has to write reports a storage error.
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    // == Schema ==
    /// Creates the cache table and its expiration index if they do not
    /// exist yet. Safe to run on every open.
    fn init_schema(&self) -> Result<()> {
        debug!("initializing cache schema");
        let conn = self.conn.lock().unwrap();

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS cache (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_cache_expires_at ON cache(expires_at)",
            [],
        )?;

        Ok(())
    }

    // == Get ==
    /// Looks up a key as of `now`.
    ///
    /// A row found expired is deleted under the same connection lock and
    /// reported `Expired`. A row whose payload or timestamp is unreadable
    /// is logged, deleted and reported `Missing`; corruption never reaches
    /// the caller as an error.
    pub fn get(&self, key: &str, now: DateTime<Utc>) -> Result<TierLookup> {
        let conn = self.conn.lock().unwrap();

        let row = conn
            .query_row(
                "SELECT value, expires_at FROM cache WHERE key = ?1",
                params![key],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?;

        let (text, expires_ms) = match row {
            Some(row) => row,
            None => return Ok(TierLookup::Missing),
        };

        match decode_row(key, &text, expires_ms) {
            Ok(entry) if entry.is_expired_at(now) => {
                conn.execute("DELETE FROM cache WHERE key = ?1", params![key])?;
                Ok(TierLookup::Expired)
            }
            Ok(entry) => Ok(TierLookup::Hit(entry)),
            Err(err) => {
                warn!("discarding unreadable cache row: {}", err);
                conn.execute("DELETE FROM cache WHERE key = ?1", params![key])?;
                Ok(TierLookup::Missing)
            }
        }
    }

    // == Insert ==
    /// Stores an entry, replacing any previous row under the same key.
    pub fn insert(&self, key: &str, entry: &CacheEntry) -> Result<()> {
        let text = serde_json::to_string(&entry.value)?;
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT OR REPLACE INTO cache (key, value, expires_at) VALUES (?1, ?2, ?3)",
            params![key, text, entry.expires_at.timestamp_millis()],
        )?;
        Ok(())
    }

    // == Remove ==
    /// Deletes a row, reporting whether one was present. Removing an
    /// absent key is not an error.
    pub fn remove(&self, key: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let removed = conn.execute("DELETE FROM cache WHERE key = ?1", params![key])?;
        Ok(removed > 0)
    }

    // == Purge Expired ==
    /// Deletes every row expired at `now`, returning how many went.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let removed = conn.execute(
            "DELETE FROM cache WHERE expires_at < ?1",
            params![now.timestamp_millis()],
        )?;
        Ok(removed)
    }

    // == Row Count ==
    /// Number of rows currently stored, expired or not.
    pub fn row_count(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM cache", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

/// Rebuilds a `CacheEntry` from its stored representation, treating a
/// payload that is not valid JSON or a timestamp outside the representable
/// range as corruption.
fn decode_row(key: &str, text: &str, expires_ms: i64) -> Result<CacheEntry> {
    let value: Value =
        serde_json::from_str(text).map_err(|_| CacheError::Corrupt(key.to_string()))?;
    let expires_at = DateTime::<Utc>::from_timestamp_millis(expires_ms)
        .ok_or_else(|| CacheError::Corrupt(key.to_string()))?;
    Ok(CacheEntry { value, expires_at })
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;

    fn live_entry(value: Value) -> CacheEntry {
        CacheEntry::new(value, Duration::from_secs(300))
    }

    fn expired_entry(value: Value) -> CacheEntry {
        CacheEntry {
            value,
            expires_at: Utc::now() - chrono::Duration::hours(1),
        }
    }

    #[test]
    fn test_insert_and_get() {
        let tier = DurableTier::open_in_memory().unwrap();
        tier.insert("k", &live_entry(json!({"n": 1}))).unwrap();

        match tier.get("k", Utc::now()).unwrap() {
            TierLookup::Hit(entry) => assert_eq!(entry.value, json!({"n": 1})),
            other => panic!("expected hit, got {:?}", other),
        }
    }

    #[test]
    fn test_get_missing() {
        let tier = DurableTier::open_in_memory().unwrap();
        assert!(matches!(
            tier.get("absent", Utc::now()).unwrap(),
            TierLookup::Missing
        ));
    }

    #[test]
    fn test_expired_row_is_deleted_on_get() {
        let tier = DurableTier::open_in_memory().unwrap();
        tier.insert("k", &expired_entry(json!("old"))).unwrap();

        assert!(matches!(
            tier.get("k", Utc::now()).unwrap(),
            TierLookup::Expired
        ));
        assert_eq!(tier.row_count().unwrap(), 0);
    }

    #[test]
    fn test_expiration_round_trips_through_millis() {
        let tier = DurableTier::open_in_memory().unwrap();
        let entry = live_entry(json!(true));
        tier.insert("k", &entry).unwrap();

        match tier.get("k", Utc::now()).unwrap() {
            TierLookup::Hit(read) => assert_eq!(
                read.expires_at.timestamp_millis(),
                entry.expires_at.timestamp_millis()
            ),
            other => panic!("expected hit, got {:?}", other),
        }
    }

    #[test]
    fn test_insert_replaces_row() {
        let tier = DurableTier::open_in_memory().unwrap();
        tier.insert("k", &live_entry(json!("v1"))).unwrap();
        tier.insert("k", &live_entry(json!("v2"))).unwrap();

        match tier.get("k", Utc::now()).unwrap() {
            TierLookup::Hit(entry) => assert_eq!(entry.value, json!("v2")),
            other => panic!("expected hit, got {:?}", other),
        }
        assert_eq!(tier.row_count().unwrap(), 1);
    }

    #[test]
    fn test_remove() {
        let tier = DurableTier::open_in_memory().unwrap();
        tier.insert("k", &live_entry(json!(0))).unwrap();

        assert!(tier.remove("k").unwrap());
        assert!(!tier.remove("k").unwrap());
    }

    #[test]
    fn test_purge_expired() {
        let tier = DurableTier::open_in_memory().unwrap();
        tier.insert("dead1", &expired_entry(json!(1))).unwrap();
        tier.insert("dead2", &expired_entry(json!(2))).unwrap();
        tier.insert("live", &live_entry(json!(3))).unwrap();

        assert_eq!(tier.purge_expired(Utc::now()).unwrap(), 2);
        assert_eq!(tier.row_count().unwrap(), 1);
    }

    #[test]
    fn test_corrupt_payload_is_discarded() {
        let tier = DurableTier::open_in_memory().unwrap();
        {
            let conn = tier.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO cache (key, value, expires_at) VALUES (?1, ?2, ?3)",
                params![
                    "bad",
                    "{not json",
                    (Utc::now() + chrono::Duration::hours(1)).timestamp_millis()
                ],
            )
            .unwrap();
        }

        assert!(matches!(
            tier.get("bad", Utc::now()).unwrap(),
            TierLookup::Missing
        ));
        // The poisoned row is gone rather than failing every future read.
        assert_eq!(tier.row_count().unwrap(), 0);
    }

    #[test]
    fn test_schema_is_idempotent() {
        let tier = DurableTier::open_in_memory().unwrap();
        tier.init_schema().unwrap();

        let conn = tier.conn.lock().unwrap();
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='cache'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 1);

        let indexes: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='index' AND name='idx_cache_expires_at'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(indexes, 1);
    }

    #[test]
    fn test_reopen_preserves_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.db");

        {
            let tier = DurableTier::open(&path).unwrap();
            tier.insert("k", &live_entry(json!("persisted"))).unwrap();
        }

        let tier = DurableTier::open(&path).unwrap();
        match tier.get("k", Utc::now()).unwrap() {
            TierLookup::Hit(entry) => assert_eq!(entry.value, json!("persisted")),
            other => panic!("expected hit, got {:?}", other),
        }
    }

    #[test]
    fn test_open_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deeper").join("cache.db");

        let tier = DurableTier::open(&path).unwrap();
        tier.insert("k", &live_entry(json!(1))).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_read_only_rejects_writes_but_serves_reads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.db");

        {
            let tier = DurableTier::open(&path).unwrap();
            tier.insert("seeded", &live_entry(json!("ok"))).unwrap();
        }

        let tier = DurableTier::open_read_only(&path).unwrap();
        assert!(matches!(
            tier.get("seeded", Utc::now()).unwrap(),
            TierLookup::Hit(_)
        ));
        assert!(tier.insert("new", &live_entry(json!(1))).is_err());
        assert!(tier.remove("seeded").is_err());
    }
}
