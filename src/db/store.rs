//! Namespace-scoped blob storage.
//!
//! [`BlobStore`] is the durable half of the content cache: content keys map to
//! encoded tensors, and names map to content keys. Lookups return `Option`;
//! a missing row is a normal value, not an error. Writes are append-only.

use std::collections::BTreeMap;

use rusqlite::{params, OptionalExtension};
use serde::Serialize;

use super::Database;
use crate::error::Result;
use crate::namespace::Namespace;
use crate::space::ContentKey;
use crate::tensor::ELEMENT_WIDTH;

/// Outcome of a name binding attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// The name was unbound and now points at the given key.
    Created,
    /// The name was already bound; the existing binding is untouched.
    AlreadyExists,
}

/// Durable byte storage scoped to one namespace.
pub trait BlobStore: Send + Sync {
    /// The namespace every read and write is confined to.
    fn namespace(&self) -> &Namespace;

    /// Store encoded tensor bytes under `key`. Idempotent.
    fn put_content(&self, key: &ContentKey, bytes: &[u8]) -> Result<()>;

    fn get_content(&self, key: &ContentKey) -> Result<Option<Vec<u8>>>;

    /// Bind `name` to `key` unless it is already bound (first writer wins).
    fn put_name(&self, name: &str, key: &ContentKey) -> Result<Bound>;

    fn get_name(&self, name: &str) -> Result<Option<ContentKey>>;
}

/// [`BlobStore`] over the shared SQLite database.
#[derive(Clone)]
pub struct SqliteBlobStore {
    db: Database,
    namespace: Namespace,
}

impl SqliteBlobStore {
    pub fn new(db: Database, namespace: Namespace) -> Self {
        Self { db, namespace }
    }
}

impl BlobStore for SqliteBlobStore {
    fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    fn put_content(&self, key: &ContentKey, bytes: &[u8]) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        // Content-addressed: a concurrent writer stores the same bytes.
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO contents (namespace, key, tensor, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![self.namespace.as_str(), key.as_str(), bytes, now],
            )
        })?;
        Ok(())
    }

    fn get_content(&self, key: &ContentKey) -> Result<Option<Vec<u8>>> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT tensor FROM contents WHERE namespace = ?1 AND key = ?2",
                params![self.namespace.as_str(), key.as_str()],
                |row| row.get(0),
            )
            .optional()
        })
    }

    fn put_name(&self, name: &str, key: &ContentKey) -> Result<Bound> {
        let now = chrono::Utc::now().to_rfc3339();
        let inserted = self.db.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO names (namespace, name, key, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![self.namespace.as_str(), name, key.as_str(), now],
            )
        })?;
        Ok(if inserted == 0 {
            Bound::AlreadyExists
        } else {
            Bound::Created
        })
    }

    fn get_name(&self, name: &str) -> Result<Option<ContentKey>> {
        let key: Option<String> = self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT key FROM names WHERE namespace = ?1 AND name = ?2",
                params![self.namespace.as_str(), name],
                |row| row.get(0),
            )
            .optional()
        })?;
        Ok(key.map(ContentKey::from_stored))
    }
}

/// Per-namespace row counts, for `embd stats`.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct NamespaceStats {
    pub namespace: String,
    pub contents: u64,
    pub names: u64,
    /// Vector width observed in stored tensors, if any are stored.
    pub dimension: Option<usize>,
    pub newest: Option<String>,
}

/// Summarize every namespace present in the database, sorted by name.
pub fn namespace_stats(db: &Database) -> Result<Vec<NamespaceStats>> {
    let mut by_ns: BTreeMap<String, NamespaceStats> = BTreeMap::new();

    let content_rows: Vec<(String, i64, Option<i64>, Option<String>)> = db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT namespace, COUNT(*), MAX(length(tensor)), MAX(created_at) FROM contents GROUP BY namespace",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    })?;
    for (namespace, count, width, newest) in content_rows {
        let entry = by_ns.entry(namespace.clone()).or_default();
        entry.namespace = namespace;
        entry.contents = count as u64;
        entry.dimension = width.map(|w| w as usize / ELEMENT_WIDTH);
        entry.newest = newest;
    }

    let name_rows: Vec<(String, i64)> = db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT namespace, COUNT(*) FROM names GROUP BY namespace")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    })?;
    for (namespace, count) in name_rows {
        let entry = by_ns.entry(namespace.clone()).or_default();
        entry.namespace = namespace;
        entry.names = count as u64;
    }

    Ok(by_ns.into_values().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::Descriptor;
    use crate::space::Blob;

    fn ns(family: &str) -> Namespace {
        Descriptor::new(family).resolve().unwrap()
    }

    #[test]
    fn content_round_trips_within_namespace() {
        let db = Database::open_in_memory().unwrap();
        let store = db.scoped(ns("a"));
        let key = Blob::from("hello").key();

        assert_eq!(store.get_content(&key).unwrap(), None);
        store.put_content(&key, &[1, 2, 3, 4]).unwrap();
        assert_eq!(store.get_content(&key).unwrap(), Some(vec![1, 2, 3, 4]));
    }

    #[test]
    fn put_content_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let store = db.scoped(ns("a"));
        let key = Blob::from("hello").key();
        store.put_content(&key, &[0; 8]).unwrap();
        store.put_content(&key, &[0; 8]).unwrap();
        let stats = namespace_stats(&db).unwrap();
        assert_eq!(stats[0].contents, 1);
        assert_eq!(stats[0].dimension, Some(2));
    }

    #[test]
    fn namespaces_do_not_see_each_other() {
        let db = Database::open_in_memory().unwrap();
        let a = db.scoped(ns("a"));
        let b = db.scoped(ns("b"));
        let key = Blob::from("shared text").key();

        a.put_content(&key, &[9; 4]).unwrap();
        a.put_name("greeting", &key).unwrap();

        assert_eq!(b.get_content(&key).unwrap(), None);
        assert_eq!(b.get_name("greeting").unwrap(), None);
    }

    #[test]
    fn second_binding_reports_already_exists() {
        let db = Database::open_in_memory().unwrap();
        let store = db.scoped(ns("a"));
        let first = Blob::from("one").key();
        let second = Blob::from("two").key();

        assert_eq!(store.put_name("n", &first).unwrap(), Bound::Created);
        assert_eq!(store.put_name("n", &second).unwrap(), Bound::AlreadyExists);
        assert_eq!(store.get_name("n").unwrap(), Some(first));
    }

    #[test]
    fn stats_cover_names_without_contents() {
        let db = Database::open_in_memory().unwrap();
        let store = db.scoped(ns("z"));
        store.put_name("dangling", &Blob::from("x").key()).unwrap();
        let stats = namespace_stats(&db).unwrap();
        assert_eq!(
            stats,
            vec![NamespaceStats {
                namespace: "embed/z".into(),
                contents: 0,
                names: 1,
                dimension: None,
                newest: None,
            }]
        );
    }
}
