//! Persistent state table — last-known fingerprint per artifact location.
//!
//! # Storage layout
//!
//! ```text
//! ~/.stencil/
//!   state.db          (SQLite, table ARTIFACT_STATE)
//! ```
//!
//! One table, `ARTIFACT_STATE(LOCATION TEXT PRIMARY KEY, HASH TEXT NOT NULL)`.
//! Nothing outside the synchronizer may write to it.
//!
//! All access goes through the [`StateStore`] trait so the composition root
//! can substitute fakes in tests.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{store_io_err, StoreError};
use crate::types::{Fingerprint, Location};

/// Persistent mapping from artifact location to last-known fingerprint.
///
/// `put` is an atomic upsert; a subsequent `get` for the same location
/// observes the new value even under concurrent unrelated writes.
pub trait StateStore: Send + Sync {
    fn get(&self, location: &Location) -> Result<Option<Fingerprint>, StoreError>;
    fn put(&self, location: &Location, fingerprint: &Fingerprint) -> Result<(), StoreError>;
    fn exists(&self, location: &Location) -> Result<bool, StoreError>;
    fn delete(&self, location: &Location) -> Result<(), StoreError>;
    /// Remove all records whose location starts with `prefix`.
    ///
    /// Returns the count removed; zero matches is success, not an error.
    fn delete_by_prefix(&self, prefix: &str) -> Result<usize, StoreError>;
    /// All stored locations starting with `prefix`, sorted.
    fn locations_with_prefix(&self, prefix: &str) -> Result<Vec<Location>, StoreError>;
}

/// `<home>/.stencil/state.db` — pure, no I/O.
pub fn db_path_at(home: &Path) -> PathBuf {
    home.join(".stencil").join("state.db")
}

/// SQLite-backed state table behind a serialized connection.
pub struct SqliteStateStore {
    conn: Mutex<Connection>,
}

impl SqliteStateStore {
    /// Open (or create) the state database at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| store_io_err(dir, e))?;
        }
        Self::from_connection(Connection::open(path)?)
    }

    /// Open the state database under `home` (see [`db_path_at`]).
    pub fn open_at(home: &Path) -> Result<Self, StoreError> {
        Self::open(&db_path_at(home))
    }

    /// In-memory store for tests.
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             CREATE TABLE IF NOT EXISTS ARTIFACT_STATE (
                 LOCATION TEXT PRIMARY KEY,
                 HASH TEXT NOT NULL
             );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

/// Escape SQL LIKE metacharacters in a location prefix.
///
/// Locations are paths, so `_` (and occasionally `%`) occur in legitimate
/// names and must not act as wildcards.
fn like_pattern(prefix: &str) -> String {
    let escaped = prefix
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("{escaped}%")
}

impl StateStore for SqliteStateStore {
    fn get(&self, location: &Location) -> Result<Option<Fingerprint>, StoreError> {
        let conn = self.lock()?;
        let hash = conn
            .query_row(
                "SELECT HASH FROM ARTIFACT_STATE WHERE LOCATION = ?1",
                params![location.as_str()],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(hash.map(Fingerprint))
    }

    fn put(&self, location: &Location, fingerprint: &Fingerprint) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO ARTIFACT_STATE (LOCATION, HASH) VALUES (?1, ?2)",
            params![location.as_str(), fingerprint.0],
        )?;
        Ok(())
    }

    fn exists(&self, location: &Location) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let found = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM ARTIFACT_STATE WHERE LOCATION = ?1)",
            params![location.as_str()],
            |row| row.get::<_, bool>(0),
        )?;
        Ok(found)
    }

    fn delete(&self, location: &Location) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM ARTIFACT_STATE WHERE LOCATION = ?1",
            params![location.as_str()],
        )?;
        Ok(())
    }

    fn delete_by_prefix(&self, prefix: &str) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM ARTIFACT_STATE WHERE LOCATION LIKE ?1 ESCAPE '\\'",
            params![like_pattern(prefix)],
        )?;
        Ok(removed)
    }

    fn locations_with_prefix(&self, prefix: &str) -> Result<Vec<Location>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT LOCATION FROM ARTIFACT_STATE
             WHERE LOCATION LIKE ?1 ESCAPE '\\' ORDER BY LOCATION",
        )?;
        let rows = stmt.query_map(params![like_pattern(prefix)], |row| {
            row.get::<_, String>(0)
        })?;
        let mut locations = Vec::new();
        for row in rows {
            locations.push(Location(row?));
        }
        Ok(locations)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
