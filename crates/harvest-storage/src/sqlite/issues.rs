//! Issue-tracker links for [`SqliteStore`].

use rusqlite::{Connection, Row, params};
use tracing::debug;

use harvest_core::change::ChangeId;
use harvest_core::enums::TrackingSystem;
use harvest_core::issue::{Issue, IssueId};
use harvest_core::validation::{MAX_TRACKING_CODE, validate_name};

use crate::error::{Result, StorageError};
use crate::sqlite::changes::get_change_on_conn;
use crate::sqlite::rows::{enum_column, or_not_found};
use crate::sqlite::store::SqliteStore;

fn scan_issue(row: &Row<'_>) -> rusqlite::Result<Issue> {
    Ok(Issue {
        id: row.get("id")?,
        tracking_code: row.get("tracking_code")?,
        tracking_system: enum_column(row, "tracking_system")?,
        change_id: row.get("change_id")?,
    })
}

fn query_issues(conn: &Connection, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<Issue>> {
    let mut stmt = conn.prepare_cached(sql)?;
    let rows = stmt.query_map(params, scan_issue)?;
    let mut issues = Vec::new();
    for row in rows {
        issues.push(row?);
    }
    Ok(issues)
}

// ---------------------------------------------------------------------------
// Connection-level helpers (shared with Transaction)
// ---------------------------------------------------------------------------

pub(crate) fn get_issue_on_conn(conn: &Connection, id: IssueId) -> Result<Issue> {
    or_not_found(
        conn.query_row(
            "SELECT id, tracking_code, tracking_system, change_id FROM issues WHERE id = ?1",
            params![id],
            scan_issue,
        ),
        "issue",
        id,
    )
}

pub(crate) fn ensure_issue_on_conn(
    conn: &Connection,
    tracking_code: &str,
    tracking_system: TrackingSystem,
) -> Result<Issue> {
    validate_name("tracking code", tracking_code, MAX_TRACKING_CODE)?;
    conn.execute(
        "INSERT OR IGNORE INTO issues (tracking_code, tracking_system) VALUES (?1, ?2)",
        params![tracking_code, tracking_system.as_str()],
    )?;
    or_not_found(
        conn.query_row(
            "SELECT id, tracking_code, tracking_system, change_id FROM issues
             WHERE tracking_code = ?1 AND tracking_system = ?2",
            params![tracking_code, tracking_system.as_str()],
            scan_issue,
        ),
        "issue",
        tracking_code,
    )
}

/// Marks `change_id` as the change resolving `issue_id`.
///
/// Relinking to the same change is a no-op; an issue already resolved by a
/// different change is an integrity violation.
pub(crate) fn link_issue_on_conn(
    conn: &Connection,
    issue_id: IssueId,
    change_id: ChangeId,
) -> Result<Issue> {
    let issue = get_issue_on_conn(conn, issue_id)?;
    get_change_on_conn(conn, change_id).map_err(|e| {
        if e.is_not_found() {
            StorageError::dangling("change", change_id, format!("issue {}", issue.tracking_code))
        } else {
            e
        }
    })?;

    match issue.change_id {
        Some(existing) if existing == change_id => Ok(issue),
        Some(existing) => Err(StorageError::integrity(format!(
            "issue {} is already resolved by change {existing}",
            issue.tracking_code
        ))),
        None => {
            conn.execute(
                "UPDATE issues SET change_id = ?1 WHERE id = ?2",
                params![change_id, issue_id],
            )?;
            debug!(issue = %issue.tracking_code, change_id, "linked issue");
            get_issue_on_conn(conn, issue_id)
        }
    }
}

// ---------------------------------------------------------------------------
// SqliteStore methods
// ---------------------------------------------------------------------------

impl SqliteStore {
    pub fn ensure_issue_impl(
        &self,
        tracking_code: &str,
        tracking_system: TrackingSystem,
    ) -> Result<Issue> {
        let conn = self.lock_conn()?;
        ensure_issue_on_conn(&conn, tracking_code, tracking_system)
    }

    pub fn get_issue_impl(&self, id: IssueId) -> Result<Issue> {
        let conn = self.lock_conn()?;
        get_issue_on_conn(&conn, id)
    }

    pub fn link_issue_impl(&self, issue_id: IssueId, change_id: ChangeId) -> Result<Issue> {
        let conn = self.lock_conn()?;
        link_issue_on_conn(&conn, issue_id, change_id)
    }

    /// Issues resolved by `change_id`, ordered by tracking code.
    pub fn issues_for_change_impl(&self, change_id: ChangeId) -> Result<Vec<Issue>> {
        let conn = self.lock_conn()?;
        get_change_on_conn(&conn, change_id)?;
        query_issues(
            &conn,
            "SELECT id, tracking_code, tracking_system, change_id FROM issues
             WHERE change_id = ?1 ORDER BY tracking_code",
            &[&change_id],
        )
    }

    pub fn list_issues_impl(&self) -> Result<Vec<Issue>> {
        let conn = self.lock_conn()?;
        query_issues(
            &conn,
            "SELECT id, tracking_code, tracking_system, change_id FROM issues
             ORDER BY tracking_system, tracking_code",
            &[],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harvest_core::change::ChangeBuilder;
    use harvest_core::enums::Scm;
    use pretty_assertions::assert_eq;

    fn store_with_changes() -> (SqliteStore, ChangeId, ChangeId) {
        let store = SqliteStore::open_in_memory().unwrap();
        let repo = store.ensure_repository_impl("r", "u", Scm::Git).unwrap();
        let branch = store.ensure_branch_impl(repo.id, "main").unwrap();
        let a = store
            .record_change_impl(&ChangeBuilder::new(branch.id, "a").summary("a").author("x").build())
            .unwrap();
        let b = store
            .record_change_impl(&ChangeBuilder::new(branch.id, "b").summary("b").author("x").build())
            .unwrap();
        (store, a.id, b.id)
    }

    #[test]
    fn ensure_issue_is_unique_per_system() {
        let (store, _, _) = store_with_changes();
        let jira = store.ensure_issue_impl("FW-12", TrackingSystem::Jira).unwrap();
        let again = store.ensure_issue_impl("FW-12", TrackingSystem::Jira).unwrap();
        let tfs = store.ensure_issue_impl("FW-12", TrackingSystem::Tfs).unwrap();
        assert_eq!(jira, again);
        assert_ne!(jira.id, tfs.id);
        assert_eq!(store.list_issues_impl().unwrap().len(), 2);
    }

    #[test]
    fn link_and_query() {
        let (store, a, _) = store_with_changes();
        let i1 = store.ensure_issue_impl("FW-1", TrackingSystem::Jira).unwrap();
        let i2 = store.ensure_issue_impl("FW-2", TrackingSystem::Jira).unwrap();
        store.link_issue_impl(i1.id, a).unwrap();
        store.link_issue_impl(i2.id, a).unwrap();
        store.link_issue_impl(i2.id, a).unwrap();

        let codes: Vec<String> = store
            .issues_for_change_impl(a)
            .unwrap()
            .into_iter()
            .map(|i| i.tracking_code)
            .collect();
        assert_eq!(codes, vec!["FW-1", "FW-2"]);
    }

    #[test]
    fn issue_resolves_at_most_one_change() {
        let (store, a, b) = store_with_changes();
        let issue = store.ensure_issue_impl("FW-3", TrackingSystem::Jira).unwrap();
        store.link_issue_impl(issue.id, a).unwrap();
        let err = store.link_issue_impl(issue.id, b).unwrap_err();
        assert!(err.is_integrity_violation());
    }

    #[test]
    fn link_to_missing_change_is_dangling() {
        let (store, _, _) = store_with_changes();
        let issue = store.ensure_issue_impl("FW-4", TrackingSystem::Jira).unwrap();
        let err = store.link_issue_impl(issue.id, 500).unwrap_err();
        assert!(matches!(err, StorageError::DanglingReference { .. }));
    }
}
