//! SQLite-backed durable storage.
//!
//! A [`Database`] is one SQLite file shared by every namespace. Handing it a
//! namespace via [`Database::scoped`] yields a [`store::SqliteBlobStore`] that
//! can only see that namespace's rows.

pub mod schema;
pub mod store;

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::Result;
use crate::namespace::Namespace;

pub use store::{namespace_stats, BlobStore, Bound, NamespaceStats, SqliteBlobStore};

/// Shared handle to the cache database.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl Database {
    /// Open (or create) the database at the given path with schema initialized.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = open_database(path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path.to_path_buf()),
        })
    }

    /// Open a private in-memory database (tests, throwaway spaces).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    /// On-disk location, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// A blob store that reads and writes only `namespace`.
    pub fn scoped(&self, namespace: Namespace) -> SqliteBlobStore {
        SqliteBlobStore::new(self.clone(), namespace)
    }

    /// Run `f` with exclusive access to the connection.
    ///
    /// A poisoned lock is recovered: every write is a single statement, so a
    /// panicking holder cannot leave a half-written entry behind.
    pub(crate) fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(f(&conn)?)
    }
}

/// Open (or create) the SQLite file at the given path with schema initialized.
pub fn open_database(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(path)?;

    // WAL lets a second process read while another writes
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.busy_timeout(std::time::Duration::from_secs(5))?;

    schema::init_schema(&conn)?;

    tracing::info!(path = %path.display(), "database initialized");
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/cache.db");
        let db = Database::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(db.path(), Some(path.as_path()));
    }

    #[test]
    fn reopening_keeps_schema_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");
        drop(Database::open(&path).unwrap());
        let db = Database::open(&path).unwrap();
        let version = db.with_conn(schema::get_schema_version).unwrap();
        assert_eq!(version, schema::CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn in_memory_has_no_path() {
        assert!(Database::open_in_memory().unwrap().path().is_none());
    }
}
