//! Table persistence
//!
//! Each library table is saved as one named JSON snapshot. Writes replace
//! the whole snapshot, so a crash between two writes loses at most the
//! latest change and never leaves a half-written table behind.

use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Opaque name -> JSON blob storage
pub trait BlobStore: Send + Sync {
    /// Stored blob for `name`, `None` if never written
    fn load_raw(&self, name: &str) -> Result<Option<String>, StoreError>;

    /// Replace the blob for `name`
    fn save_raw(&self, name: &str, json: &str) -> Result<(), StoreError>;
}

/// Load a table, falling back to its default when missing or unreadable
pub fn load_table<T: DeserializeOwned + Default>(
    store: &dyn BlobStore,
    name: &str,
) -> Result<T, StoreError> {
    let Some(raw) = store.load_raw(name)? else {
        return Ok(T::default());
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Ok(value),
        Err(e) => {
            tracing::warn!("Table {} is unreadable, starting empty: {}", name, e);
            Ok(T::default())
        }
    }
}

/// Save a whole table snapshot
pub fn save_table<T: Serialize + ?Sized>(
    store: &dyn BlobStore,
    name: &str,
    value: &T,
) -> Result<(), StoreError> {
    let json = serde_json::to_string(value)?;
    store.save_raw(name, &json)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Blob store backed by a single SQLite table
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;

        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;

        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        lock(&self.conn).execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS blobs (
                name TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT DEFAULT CURRENT_TIMESTAMP
            );
        "#,
        )?;

        Ok(())
    }

    /// Names of all stored blobs
    pub fn names(&self) -> Result<Vec<String>, StoreError> {
        let conn = lock(&self.conn);
        let mut stmt = conn.prepare("SELECT name FROM blobs ORDER BY name")?;

        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(names)
    }
}

impl BlobStore for SqliteStore {
    fn load_raw(&self, name: &str) -> Result<Option<String>, StoreError> {
        let value = lock(&self.conn)
            .query_row(
                "SELECT value FROM blobs WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;

        Ok(value)
    }

    fn save_raw(&self, name: &str, json: &str) -> Result<(), StoreError> {
        lock(&self.conn).execute(
            r#"INSERT INTO blobs (name, value, updated_at)
               VALUES (?1, ?2, CURRENT_TIMESTAMP)
               ON CONFLICT(name) DO UPDATE SET
                   value = excluded.value,
                   updated_at = CURRENT_TIMESTAMP"#,
            params![name, json],
        )?;
        Ok(())
    }
}

/// Process-local store
#[derive(Default)]
pub struct MemoryStore {
    blobs: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        lock(&self.blobs).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlobStore for MemoryStore {
    fn load_raw(&self, name: &str) -> Result<Option<String>, StoreError> {
        Ok(lock(&self.blobs).get(name).cloned())
    }

    fn save_raw(&self, name: &str, json: &str) -> Result<(), StoreError> {
        lock(&self.blobs).insert(name.to_string(), json.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_round_trip() {
        let store = SqliteStore::in_memory().unwrap();
        assert_eq!(store.load_raw("games").unwrap(), None);

        store.save_raw("games", "[1]").unwrap();
        store.save_raw("games", "[1,2]").unwrap();

        assert_eq!(store.load_raw("games").unwrap().as_deref(), Some("[1,2]"));
        assert_eq!(store.names().unwrap(), vec!["games".to_string()]);
    }

    #[test]
    fn test_load_table_defaults_when_missing() {
        let store = MemoryStore::new();
        let value: Vec<String> = load_table(&store, "absent").unwrap();
        assert!(value.is_empty());
    }

    #[test]
    fn test_load_table_defaults_when_corrupt() {
        let store = MemoryStore::new();
        store.save_raw("notes", "{not json").unwrap();

        let value: HashMap<String, String> = load_table(&store, "notes").unwrap();
        assert!(value.is_empty());
    }

    #[test]
    fn test_save_table_snapshot() {
        let store = MemoryStore::new();
        save_table(&store, "list", &vec![1, 2, 3]).unwrap();

        let value: Vec<i32> = load_table(&store, "list").unwrap();
        assert_eq!(value, vec![1, 2, 3]);
        assert_eq!(store.len(), 1);
    }
}
