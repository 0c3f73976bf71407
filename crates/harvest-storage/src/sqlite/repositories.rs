//! Repository and branch operations for [`SqliteStore`].

use rusqlite::{Connection, Row, params};
use tracing::debug;

use harvest_core::enums::Scm;
use harvest_core::repository::{Branch, BranchId, Repository, RepositoryId};
use harvest_core::validation::{MAX_BRANCH_NAME, MAX_REPOSITORY_NAME, validate_name};

use crate::error::Result;
use crate::sqlite::rows::{enum_column, expect_affected, or_not_found};
use crate::sqlite::store::SqliteStore;

fn scan_repository(row: &Row<'_>) -> rusqlite::Result<Repository> {
    Ok(Repository {
        id: row.get("id")?,
        name: row.get("name")?,
        url: row.get("url")?,
        scm: enum_column(row, "scm")?,
    })
}

fn scan_branch(row: &Row<'_>) -> rusqlite::Result<Branch> {
    Ok(Branch {
        id: row.get("id")?,
        name: row.get("name")?,
        repository_id: row.get("repository_id")?,
    })
}

// ---------------------------------------------------------------------------
// Connection-level helpers (shared with Transaction)
// ---------------------------------------------------------------------------

pub(crate) fn ensure_repository_on_conn(
    conn: &Connection,
    name: &str,
    url: &str,
    scm: Scm,
) -> Result<Repository> {
    validate_name("repository name", name, MAX_REPOSITORY_NAME)?;
    validate_name("repository url", url, usize::MAX)?;

    let inserted = conn.execute(
        "INSERT OR IGNORE INTO repositories (name, url, scm) VALUES (?1, ?2, ?3)",
        params![name, url, scm.as_str()],
    )?;
    if inserted > 0 {
        debug!(name, url, %scm, "registered repository");
    }

    or_not_found(
        conn.query_row(
            "SELECT id, name, url, scm FROM repositories
             WHERE name = ?1 AND url = ?2 AND scm = ?3",
            params![name, url, scm.as_str()],
            scan_repository,
        ),
        "repository",
        name,
    )
}

pub(crate) fn get_repository_on_conn(conn: &Connection, id: RepositoryId) -> Result<Repository> {
    or_not_found(
        conn.query_row(
            "SELECT id, name, url, scm FROM repositories WHERE id = ?1",
            params![id],
            scan_repository,
        ),
        "repository",
        id,
    )
}

pub(crate) fn ensure_branch_on_conn(
    conn: &Connection,
    repository_id: RepositoryId,
    name: &str,
) -> Result<Branch> {
    validate_name("branch name", name, MAX_BRANCH_NAME)?;
    get_repository_on_conn(conn, repository_id)?;

    conn.execute(
        "INSERT OR IGNORE INTO branches (name, repository_id) VALUES (?1, ?2)",
        params![name, repository_id],
    )?;
    find_branch_on_conn(conn, repository_id, name)
}

pub(crate) fn get_branch_on_conn(conn: &Connection, id: BranchId) -> Result<Branch> {
    or_not_found(
        conn.query_row(
            "SELECT id, name, repository_id FROM branches WHERE id = ?1",
            params![id],
            scan_branch,
        ),
        "branch",
        id,
    )
}

pub(crate) fn find_branch_on_conn(
    conn: &Connection,
    repository_id: RepositoryId,
    name: &str,
) -> Result<Branch> {
    or_not_found(
        conn.query_row(
            "SELECT id, name, repository_id FROM branches
             WHERE repository_id = ?1 AND name = ?2",
            params![repository_id, name],
            scan_branch,
        ),
        "branch",
        format!("{name} in repository {repository_id}"),
    )
}

// ---------------------------------------------------------------------------
// SqliteStore methods
// ---------------------------------------------------------------------------

impl SqliteStore {
    /// Returns the repository with the given natural key, creating it if
    /// needed.
    pub fn ensure_repository_impl(&self, name: &str, url: &str, scm: Scm) -> Result<Repository> {
        let conn = self.lock_conn()?;
        ensure_repository_on_conn(&conn, name, url, scm)
    }

    pub fn get_repository_impl(&self, id: RepositoryId) -> Result<Repository> {
        let conn = self.lock_conn()?;
        get_repository_on_conn(&conn, id)
    }

    /// Returns all repositories ordered by name.
    pub fn list_repositories_impl(&self) -> Result<Vec<Repository>> {
        let conn = self.lock_conn()?;
        let mut stmt =
            conn.prepare("SELECT id, name, url, scm FROM repositories ORDER BY name, id")?;
        let rows = stmt.query_map([], scan_repository)?;
        let mut repos = Vec::new();
        for row in rows {
            repos.push(row?);
        }
        Ok(repos)
    }

    /// Deletes a repository. Fails while any branch still references it.
    pub fn delete_repository_impl(&self, id: RepositoryId) -> Result<()> {
        let conn = self.lock_conn()?;
        let affected = conn.execute("DELETE FROM repositories WHERE id = ?1", params![id])?;
        expect_affected(affected, "repository", id)
    }

    /// Returns the named branch of a repository, creating it if needed.
    pub fn ensure_branch_impl(&self, repository_id: RepositoryId, name: &str) -> Result<Branch> {
        let conn = self.lock_conn()?;
        ensure_branch_on_conn(&conn, repository_id, name)
    }

    pub fn get_branch_impl(&self, id: BranchId) -> Result<Branch> {
        let conn = self.lock_conn()?;
        get_branch_on_conn(&conn, id)
    }

    pub fn find_branch_impl(&self, repository_id: RepositoryId, name: &str) -> Result<Branch> {
        let conn = self.lock_conn()?;
        find_branch_on_conn(&conn, repository_id, name)
    }

    /// Returns the branches of a repository ordered by name.
    pub fn list_branches_impl(&self, repository_id: RepositoryId) -> Result<Vec<Branch>> {
        let conn = self.lock_conn()?;
        get_repository_on_conn(&conn, repository_id)?;
        let mut stmt = conn.prepare(
            "SELECT id, name, repository_id FROM branches
             WHERE repository_id = ?1 ORDER BY name, id",
        )?;
        let rows = stmt.query_map(params![repository_id], scan_branch)?;
        let mut branches = Vec::new();
        for row in rows {
            branches.push(row?);
        }
        Ok(branches)
    }

    /// Deletes a branch. Fails while any change still references it.
    pub fn delete_branch_impl(&self, id: BranchId) -> Result<()> {
        let conn = self.lock_conn()?;
        let affected = conn.execute("DELETE FROM branches WHERE id = ?1", params![id])?;
        expect_affected(affected, "branch", id)
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
    fn ensure_repository_is_idempotent() {
        let store = test_store();
        let a = store
            .ensure_repository_impl("core", "git@example.com:core.git", Scm::Git)
            .unwrap();
        let b = store
            .ensure_repository_impl("core", "git@example.com:core.git", Scm::Git)
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(store.list_repositories_impl().unwrap().len(), 1);
    }

    #[test]
    fn same_name_different_scm_is_distinct() {
        let store = test_store();
        let git = store.ensure_repository_impl("core", "//depot/core", Scm::Git).unwrap();
        let p4 = store
            .ensure_repository_impl("core", "//depot/core", Scm::Perforce)
            .unwrap();
        assert_ne!(git.id, p4.id);
    }

    #[test]
    fn branch_names_are_scoped_per_repository() {
        let store = test_store();
        let r1 = store.ensure_repository_impl("a", "u1", Scm::Git).unwrap();
        let r2 = store.ensure_repository_impl("b", "u2", Scm::Git).unwrap();
        let m1 = store.ensure_branch_impl(r1.id, "main").unwrap();
        let m2 = store.ensure_branch_impl(r2.id, "main").unwrap();
        assert_ne!(m1.id, m2.id);
        assert_eq!(store.find_branch_impl(r2.id, "main").unwrap(), m2);
        assert_eq!(store.list_branches_impl(r1.id).unwrap(), vec![m1]);
    }

    #[test]
    fn branch_requires_repository() {
        let store = test_store();
        let err = store.ensure_branch_impl(99, "main").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn repository_with_branches_cannot_be_deleted() {
        let store = test_store();
        let repo = store.ensure_repository_impl("a", "u", Scm::Git).unwrap();
        let branch = store.ensure_branch_impl(repo.id, "main").unwrap();

        let err = store.delete_repository_impl(repo.id).unwrap_err();
        assert!(err.is_integrity_violation(), "got {err}");

        store.delete_branch_impl(branch.id).unwrap();
        store.delete_repository_impl(repo.id).unwrap();
        assert!(store.get_repository_impl(repo.id).unwrap_err().is_not_found());
    }

    #[test]
    fn empty_branch_name_rejected() {
        let store = test_store();
        let repo = store.ensure_repository_impl("a", "u", Scm::Git).unwrap();
        let err = store.ensure_branch_impl(repo.id, "").unwrap_err();
        assert!(matches!(err, crate::StorageError::Validation { .. }));
    }
}
