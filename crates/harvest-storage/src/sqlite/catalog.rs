//! Build projects, platforms and integration types for [`SqliteStore`].

use rusqlite::{Connection, Row, params};
use tracing::debug;

use harvest_core::catalog::{
    BuildProject, IntegrationType, IntegrationTypeId, Platform, PlatformId, ProjectId,
};
use harvest_core::validation::{
    MAX_INTEGRATION_ABBREV, MAX_INTEGRATION_NAME, MAX_PLATFORM_NAME, MAX_PROJECT_NAME,
    validate_name,
};

use crate::error::Result;
use crate::sqlite::rows::{expect_affected, or_not_found};
use crate::sqlite::store::SqliteStore;

fn scan_project(row: &Row<'_>) -> rusqlite::Result<BuildProject> {
    Ok(BuildProject {
        id: row.get("id")?,
        name: row.get("name")?,
    })
}

fn scan_platform(row: &Row<'_>) -> rusqlite::Result<Platform> {
    Ok(Platform {
        id: row.get("id")?,
        name: row.get("name")?,
    })
}

fn scan_integration_type(row: &Row<'_>) -> rusqlite::Result<IntegrationType> {
    Ok(IntegrationType {
        id: row.get("id")?,
        name: row.get("name")?,
        abbrev: row.get("abbrev")?,
        description: row.get("description")?,
    })
}

fn collect<T>(
    conn: &Connection,
    sql: &str,
    scan: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], scan)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Connection-level helpers (shared with Transaction)
// ---------------------------------------------------------------------------

pub(crate) fn ensure_project_on_conn(conn: &Connection, name: &str) -> Result<BuildProject> {
    validate_name("project name", name, MAX_PROJECT_NAME)?;
    if conn.execute(
        "INSERT OR IGNORE INTO build_projects (name) VALUES (?1)",
        params![name],
    )? > 0
    {
        debug!(name, "registered build project");
    }
    find_project_on_conn(conn, name)
}

pub(crate) fn get_project_on_conn(conn: &Connection, id: ProjectId) -> Result<BuildProject> {
    or_not_found(
        conn.query_row(
            "SELECT id, name FROM build_projects WHERE id = ?1",
            params![id],
            scan_project,
        ),
        "project",
        id,
    )
}

pub(crate) fn find_project_on_conn(conn: &Connection, name: &str) -> Result<BuildProject> {
    or_not_found(
        conn.query_row(
            "SELECT id, name FROM build_projects WHERE name = ?1",
            params![name],
            scan_project,
        ),
        "project",
        name,
    )
}

pub(crate) fn ensure_platform_on_conn(conn: &Connection, name: &str) -> Result<Platform> {
    validate_name("platform name", name, MAX_PLATFORM_NAME)?;
    if conn.execute(
        "INSERT OR IGNORE INTO platforms (name) VALUES (?1)",
        params![name],
    )? > 0
    {
        debug!(name, "registered platform");
    }
    find_platform_on_conn(conn, name)
}

pub(crate) fn get_platform_on_conn(conn: &Connection, id: PlatformId) -> Result<Platform> {
    or_not_found(
        conn.query_row(
            "SELECT id, name FROM platforms WHERE id = ?1",
            params![id],
            scan_platform,
        ),
        "platform",
        id,
    )
}

pub(crate) fn find_platform_on_conn(conn: &Connection, name: &str) -> Result<Platform> {
    or_not_found(
        conn.query_row(
            "SELECT id, name FROM platforms WHERE name = ?1",
            params![name],
            scan_platform,
        ),
        "platform",
        name,
    )
}

/// Returns the integration type named `name`, creating it if needed. An
/// existing row keeps its stored abbreviation and description.
pub(crate) fn ensure_integration_type_on_conn(
    conn: &Connection,
    name: &str,
    abbrev: &str,
    description: &str,
) -> Result<IntegrationType> {
    validate_name("integration name", name, MAX_INTEGRATION_NAME)?;
    validate_name("integration abbrev", abbrev, MAX_INTEGRATION_ABBREV)?;
    if conn.execute(
        "INSERT OR IGNORE INTO integration_types (name, abbrev, description)
         VALUES (?1, ?2, ?3)",
        params![name, abbrev, description],
    )? > 0
    {
        debug!(name, abbrev, "registered integration type");
    }
    find_integration_type_on_conn(conn, name)
}

pub(crate) fn get_integration_type_on_conn(
    conn: &Connection,
    id: IntegrationTypeId,
) -> Result<IntegrationType> {
    or_not_found(
        conn.query_row(
            "SELECT id, name, abbrev, description FROM integration_types WHERE id = ?1",
            params![id],
            scan_integration_type,
        ),
        "integration type",
        id,
    )
}

pub(crate) fn find_integration_type_on_conn(
    conn: &Connection,
    name: &str,
) -> Result<IntegrationType> {
    or_not_found(
        conn.query_row(
            "SELECT id, name, abbrev, description FROM integration_types WHERE name = ?1",
            params![name],
            scan_integration_type,
        ),
        "integration type",
        name,
    )
}

// ---------------------------------------------------------------------------
// SqliteStore methods
// ---------------------------------------------------------------------------

impl SqliteStore {
    pub fn ensure_project_impl(&self, name: &str) -> Result<BuildProject> {
        let conn = self.lock_conn()?;
        ensure_project_on_conn(&conn, name)
    }

    pub fn get_project_impl(&self, id: ProjectId) -> Result<BuildProject> {
        let conn = self.lock_conn()?;
        get_project_on_conn(&conn, id)
    }

    pub fn find_project_impl(&self, name: &str) -> Result<BuildProject> {
        let conn = self.lock_conn()?;
        find_project_on_conn(&conn, name)
    }

    pub fn list_projects_impl(&self) -> Result<Vec<BuildProject>> {
        let conn = self.lock_conn()?;
        collect(
            &conn,
            "SELECT id, name FROM build_projects ORDER BY name",
            scan_project,
        )
    }

    /// Deletes a project. Fails while any build references it.
    pub fn delete_project_impl(&self, id: ProjectId) -> Result<()> {
        let conn = self.lock_conn()?;
        let affected = conn.execute("DELETE FROM build_projects WHERE id = ?1", params![id])?;
        expect_affected(affected, "project", id)
    }

    pub fn ensure_platform_impl(&self, name: &str) -> Result<Platform> {
        let conn = self.lock_conn()?;
        ensure_platform_on_conn(&conn, name)
    }

    pub fn get_platform_impl(&self, id: PlatformId) -> Result<Platform> {
        let conn = self.lock_conn()?;
        get_platform_on_conn(&conn, id)
    }

    pub fn find_platform_impl(&self, name: &str) -> Result<Platform> {
        let conn = self.lock_conn()?;
        find_platform_on_conn(&conn, name)
    }

    pub fn list_platforms_impl(&self) -> Result<Vec<Platform>> {
        let conn = self.lock_conn()?;
        collect(&conn, "SELECT id, name FROM platforms ORDER BY name", scan_platform)
    }

    /// Deletes a platform. Fails while any build references it.
    pub fn delete_platform_impl(&self, id: PlatformId) -> Result<()> {
        let conn = self.lock_conn()?;
        let affected = conn.execute("DELETE FROM platforms WHERE id = ?1", params![id])?;
        expect_affected(affected, "platform", id)
    }

    pub fn ensure_integration_type_impl(
        &self,
        name: &str,
        abbrev: &str,
        description: &str,
    ) -> Result<IntegrationType> {
        let conn = self.lock_conn()?;
        ensure_integration_type_on_conn(&conn, name, abbrev, description)
    }

    pub fn get_integration_type_impl(&self, id: IntegrationTypeId) -> Result<IntegrationType> {
        let conn = self.lock_conn()?;
        get_integration_type_on_conn(&conn, id)
    }

    pub fn find_integration_type_impl(&self, name: &str) -> Result<IntegrationType> {
        let conn = self.lock_conn()?;
        find_integration_type_on_conn(&conn, name)
    }

    pub fn list_integration_types_impl(&self) -> Result<Vec<IntegrationType>> {
        let conn = self.lock_conn()?;
        collect(
            &conn,
            "SELECT id, name, abbrev, description FROM integration_types ORDER BY name",
            scan_integration_type,
        )
    }

    /// Deletes an integration type. Fails while any build references it.
    pub fn delete_integration_type_impl(&self, id: IntegrationTypeId) -> Result<()> {
        let conn = self.lock_conn()?;
        let affected =
            conn.execute("DELETE FROM integration_types WHERE id = ?1", params![id])?;
        expect_affected(affected, "integration type", id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn test_store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    #[test]
    fn ensure_project_returns_stored_row() {
        let store = test_store();
        let a = store.ensure_project_impl("firmware").unwrap();
        let b = store.ensure_project_impl("firmware").unwrap();
        assert_eq!(a, b);
        assert_eq!(store.find_project_impl("firmware").unwrap().id, a.id);
        assert_eq!(store.list_projects_impl().unwrap(), vec![a]);
    }

    #[test]
    fn integration_type_keeps_first_abbrev() {
        let store = test_store();
        let first = store
            .ensure_integration_type_impl("Jenkins", "JNK", "Jenkins CI")
            .unwrap();
        let again = store.ensure_integration_type_impl("Jenkins", "J", "").unwrap();
        assert_eq!(first, again);
        assert_eq!(again.abbrev, "JNK");
    }

    #[test]
    fn abbrev_longer_than_five_rejected() {
        let store = test_store();
        let err = store
            .ensure_integration_type_impl("Commander", "ECMDR1", "")
            .unwrap_err();
        assert!(matches!(err, crate::StorageError::Validation { .. }));
    }

    #[test]
    fn platforms_list_sorted() {
        let store = test_store();
        store.ensure_platform_impl("win64").unwrap();
        store.ensure_platform_impl("linux-x64").unwrap();
        let names: Vec<String> = store
            .list_platforms_impl()
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["linux-x64", "win64"]);
    }

    #[test]
    fn delete_unknown_is_not_found() {
        let store = test_store();
        assert!(store.delete_project_impl(12).unwrap_err().is_not_found());
        assert!(store.delete_platform_impl(12).unwrap_err().is_not_found());
        assert!(store.delete_integration_type_impl(12).unwrap_err().is_not_found());
    }

    #[test]
    fn unused_catalog_rows_can_be_deleted() {
        let store = test_store();
        let p = store.ensure_project_impl("tools").unwrap();
        store.delete_project_impl(p.id).unwrap();
        assert!(store.get_project_impl(p.id).unwrap_err().is_not_found());
    }
}
