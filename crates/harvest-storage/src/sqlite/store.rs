//! [`SqliteStore`] -- SQLite-backed storage implementation.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::{debug, info};

use harvest_core::enums::MergeTraversal;

use crate::error::{Result, StorageError};
use crate::sqlite::schema;

/// Tuning knobs for graph traversal and build paging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// Maximum number of changes a single closure may visit before failing
    /// with [`StorageError::ClosureBoundExceeded`].
    pub max_closure_nodes: usize,
    /// Which merge edges ancestry closures follow.
    pub merge_traversal: MergeTraversal,
    /// Rows fetched per page by the lazy good-build sequence.
    pub page_size: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            max_closure_nodes: 100_000,
            merge_traversal: MergeTraversal::default(),
            page_size: 256,
        }
    }
}

/// SQLite-backed implementation of the [`Storage`](crate::traits::Storage) trait.
///
/// Wraps a [`rusqlite::Connection`] in a `Mutex` for thread safety.  All
/// public methods acquire the lock, execute SQL, and release it.
pub struct SqliteStore {
    /// The mutex-protected SQLite connection.
    pub(crate) conn: Mutex<Connection>,
    pub(crate) options: StoreOptions,
}

impl SqliteStore {
    /// Opens (or creates) a SQLite database at the given path with default
    /// options.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, StoreOptions::default())
    }

    /// Opens (or creates) a SQLite database at the given path.
    ///
    /// Enables WAL mode and foreign keys, then initialises the schema.
    pub fn open_with(path: impl AsRef<Path>, options: StoreOptions) -> Result<Self> {
        let path = path.as_ref();
        info!(?path, "opening SQLite database");

        let conn = Connection::open(path).map_err(|e| {
            StorageError::Connection(format!("failed to open {}: {e}", path.display()))
        })?;

        Self::from_connection(conn, options)
    }

    /// Opens an in-memory SQLite database (useful for tests).
    pub fn open_in_memory() -> Result<Self> {
        Self::open_in_memory_with(StoreOptions::default())
    }

    /// Opens an in-memory SQLite database with the given options.
    pub fn open_in_memory_with(options: StoreOptions) -> Result<Self> {
        debug!("opening in-memory SQLite database");
        let conn = Connection::open_in_memory()
            .map_err(|e| StorageError::Connection(format!("failed to open in-memory db: {e}")))?;

        Self::from_connection(conn, options)
    }

    fn from_connection(conn: Connection, options: StoreOptions) -> Result<Self> {
        if options.max_closure_nodes == 0 || options.page_size == 0 {
            return Err(StorageError::validation(
                "max_closure_nodes and page_size must be positive",
            ));
        }

        let store = Self {
            conn: Mutex::new(conn),
            options,
        };
        store.configure_connection()?;
        store.init_schema()?;

        Ok(store)
    }

    /// Returns the options this store was opened with.
    pub fn options(&self) -> StoreOptions {
        self.options
    }

    fn configure_connection(&self) -> Result<()> {
        self.lock_conn()?
            .execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
            )
            .map_err(|e| StorageError::Connection(format!("failed to set pragmas: {e}")))
    }

    /// Brings the schema up to [`schema::CURRENT_SCHEMA_VERSION`] in one
    /// transaction. A database already at that version is left untouched.
    fn init_schema(&self) -> Result<()> {
        let conn = self.lock_conn()?;
        if let Some(version) = stored_schema_version(&conn) {
            if version >= schema::CURRENT_SCHEMA_VERSION {
                debug!(version, "schema is current");
                return Ok(());
            }
        }

        let tx = conn
            .unchecked_transaction()
            .map_err(|e| StorageError::Transaction(format!("failed to begin: {e}")))?;

        for stmt in schema::SCHEMA_STATEMENTS {
            tx.execute_batch(stmt)
                .map_err(|e| migration_error("init_schema", format!("{e} in `{}`", truncate(stmt, 120))))?;
        }
        for &(key, value) in schema::DEFAULT_CONFIG {
            tx.execute(
                "INSERT OR IGNORE INTO config (key, value) VALUES (?1, ?2)",
                rusqlite::params![key, value],
            )
            .map_err(|e| migration_error("default_config", format!("{key}: {e}")))?;
        }
        apply_migrations(&tx)?;
        tx.execute(
            "INSERT OR REPLACE INTO config (key, value) VALUES ('schema_version', ?1)",
            rusqlite::params![schema::CURRENT_SCHEMA_VERSION.to_string()],
        )
        .map_err(|e| migration_error("schema_version", e.to_string()))?;

        tx.commit()
            .map_err(|e| StorageError::Transaction(format!("failed to commit schema: {e}")))?;
        info!(version = schema::CURRENT_SCHEMA_VERSION, "schema initialized");
        Ok(())
    }

    /// Acquires the connection lock. Helper used by all operation modules.
    pub(crate) fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::Connection(format!("mutex poisoned: {e}")))
    }

    /// Runs `f` on the locked connection inside a transaction, committing on
    /// `Ok` and rolling back otherwise.
    pub(crate) fn with_tx<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.lock_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| StorageError::Transaction(format!("failed to begin: {e}")))?;
        let value = f(&tx)?;
        tx.commit()
            .map_err(|e| StorageError::Transaction(format!("failed to commit: {e}")))?;
        Ok(value)
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// The recorded schema version, or `None` on a fresh database.
fn stored_schema_version(conn: &Connection) -> Option<i32> {
    conn.query_row(
        "SELECT value FROM config WHERE key = 'schema_version'",
        [],
        |row| row.get::<_, String>(0),
    )
    .ok()
    .and_then(|v| v.parse().ok())
}

/// Runs each named migration not yet marked as applied in `metadata`.
fn apply_migrations(conn: &Connection) -> Result<()> {
    for &(name, sql) in schema::MIGRATIONS {
        let key = format!("migration:{name}");
        let applied = conn
            .query_row(
                "SELECT 1 FROM metadata WHERE key = ?1",
                rusqlite::params![key],
                |_| Ok(()),
            )
            .is_ok();
        if applied {
            continue;
        }

        debug!(name, "applying migration");
        conn.execute_batch(sql)
            .map_err(|e| migration_error(name, e.to_string()))?;
        conn.execute(
            "INSERT INTO metadata (key, value) VALUES (?1, 'applied')",
            rusqlite::params![key],
        )
        .map_err(|e| migration_error(name, format!("failed to mark applied: {e}")))?;
    }
    Ok(())
}

fn migration_error(name: &str, reason: String) -> StorageError {
    StorageError::Migration {
        name: name.to_owned(),
        reason,
    }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_in_memory() {
        let store = SqliteStore::open_in_memory().unwrap();
        let conn = store.lock_conn().unwrap();
        let count: i32 = conn
            .query_row("SELECT COUNT(*) FROM config", [], |row| row.get(0))
            .unwrap();
        assert!(count > 0, "default config should be inserted");
    }

    #[test]
    fn schema_version_set() {
        let store = SqliteStore::open_in_memory().unwrap();
        let conn = store.lock_conn().unwrap();
        let version: String = conn
            .query_row(
                "SELECT value FROM config WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(version, schema::CURRENT_SCHEMA_VERSION.to_string());
    }

    #[test]
    fn idempotent_init() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.init_schema().unwrap();
    }

    #[test]
    fn foreign_keys_enabled() {
        let store = SqliteStore::open_in_memory().unwrap();
        let conn = store.lock_conn().unwrap();
        let fk: i32 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn zero_closure_cap_rejected() {
        let options = StoreOptions {
            max_closure_nodes: 0,
            ..StoreOptions::default()
        };
        let err = SqliteStore::open_in_memory_with(options).unwrap_err();
        assert!(matches!(err, StorageError::Validation { .. }));
    }

    #[test]
    fn reopen_on_disk_keeps_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harvest.db");
        drop(SqliteStore::open(&path).unwrap());
        let store = SqliteStore::open(&path).unwrap();
        let conn = store.lock_conn().unwrap();
        let tables: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'changes'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 1);
    }
}
