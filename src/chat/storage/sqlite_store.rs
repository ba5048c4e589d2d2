//! `SQLite`-backed blob store.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use crate::chat::core::errors::ChatResult;
use crate::chat::storage::blob_store::BlobStore;

/// Blob store keeping every key in one `SQLite` table.
pub struct SqliteBlobStore {
    conn: Mutex<Connection>,
    table: String,
}

impl SqliteBlobStore {
    /// Table name for stored blobs.
    pub const DEFAULT_TABLE: &'static str = "kv_store";

    /// Open (and create if needed) a database file.
    ///
    /// # Errors
    /// Returns an error if the parent directory or the database cannot be created.
    pub fn open(path: impl AsRef<Path>) -> ChatResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "Opened sqlite blob store");
        Self::with_connection(conn)
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn open_in_memory() -> ChatResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> ChatResult<Self> {
        let table = Self::DEFAULT_TABLE.to_string();
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )"
        ))?;
        Ok(Self {
            conn: Mutex::new(conn),
            table,
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic mid-statement leaves no partial state behind in SQLite.
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BlobStore for SqliteBlobStore {
    fn load(&self, key: &str) -> ChatResult<Option<String>> {
        let table = &self.table;
        let value = self
            .conn()
            .query_row(
                &format!("SELECT value FROM {table} WHERE key = ?1"),
                rusqlite::params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn save(&self, key: &str, value: &str) -> ChatResult<()> {
        let table = &self.table;
        self.conn().execute(
            &format!(
                "INSERT INTO {table} (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value"
            ),
            rusqlite::params![key, value],
        )?;
        Ok(())
    }
}
