//! Config and metadata key-value store operations for [`SqliteStore`].
//!
//! The `config` table holds database-scoped settings (including
//! `schema_version`); `metadata` holds harvester bookkeeping such as applied
//! migrations and last-poll markers.

use std::collections::HashMap;

use rusqlite::{Connection, OptionalExtension, params};

use crate::error::{Result, StorageError};
use crate::sqlite::store::SqliteStore;

/// The two key/value tables. Both share the `(key PRIMARY KEY, value)` shape.
#[derive(Debug, Clone, Copy)]
enum Kv {
    Config,
    Metadata,
}

impl Kv {
    fn table(self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Metadata => "metadata",
        }
    }

    fn get(self, conn: &Connection, key: &str) -> Result<String> {
        let table = self.table();
        conn.query_row(
            &format!("SELECT value FROM {table} WHERE key = ?1"),
            params![key],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| StorageError::not_found(table, key))
    }

    fn set(self, conn: &Connection, key: &str, value: &str) -> Result<()> {
        conn.execute(
            &format!(
                "INSERT INTO {} (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                self.table()
            ),
            params![key, value],
        )?;
        Ok(())
    }
}

pub(crate) fn set_config_on_conn(conn: &Connection, key: &str, value: &str) -> Result<()> {
    Kv::Config.set(conn, key, value)
}

pub(crate) fn get_config_on_conn(conn: &Connection, key: &str) -> Result<String> {
    Kv::Config.get(conn, key)
}

pub(crate) fn set_metadata_on_conn(conn: &Connection, key: &str, value: &str) -> Result<()> {
    Kv::Metadata.set(conn, key, value)
}

pub(crate) fn get_metadata_on_conn(conn: &Connection, key: &str) -> Result<String> {
    Kv::Metadata.get(conn, key)
}

impl SqliteStore {
    pub fn set_config_impl(&self, key: &str, value: &str) -> Result<()> {
        set_config_on_conn(&*self.lock_conn()?, key, value)
    }

    pub fn get_config_impl(&self, key: &str) -> Result<String> {
        get_config_on_conn(&*self.lock_conn()?, key)
    }

    pub fn get_all_config_impl(&self) -> Result<HashMap<String, String>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare("SELECT key, value FROM config")?;
        let map = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<HashMap<String, String>>>()?;
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    #[test]
    fn config_upserts() {
        let store = test_store();
        store.set_config_impl("harvest.owner", "ci-team").unwrap();
        store.set_config_impl("harvest.owner", "release-team").unwrap();
        assert_eq!(store.get_config_impl("harvest.owner").unwrap(), "release-team");
    }

    #[test]
    fn missing_key_is_not_found() {
        let store = test_store();
        let err = store.get_config_impl("nonexistent").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn defaults_and_schema_version_present() {
        let store = test_store();
        let config = store.get_all_config_impl().unwrap();
        assert_eq!(config.get("created_by").map(String::as_str), Some("harvest"));
        assert!(config.contains_key("schema_version"));
    }

    #[test]
    fn metadata_is_separate_from_config() {
        let store = test_store();
        let conn = store.lock_conn().unwrap();
        set_metadata_on_conn(&conn, "jenkins.last_poll", "42").unwrap();
        assert_eq!(get_metadata_on_conn(&conn, "jenkins.last_poll").unwrap(), "42");
        assert!(get_config_on_conn(&conn, "jenkins.last_poll").unwrap_err().is_not_found());
    }
}
