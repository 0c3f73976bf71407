//! Change recording and merge edges for [`SqliteStore`].

use std::collections::BTreeSet;

use rusqlite::{Connection, Row, params};
use tracing::{debug, info};

use harvest_core::change::{Change, ChangeId, NewChange};
use harvest_core::repository::BranchId;
use harvest_core::validation::validate_change;

use crate::error::{Result, StorageError};
use crate::sqlite::graph;
use crate::sqlite::repositories::get_branch_on_conn;
use crate::sqlite::rows::{datetime_column, format_datetime, or_not_found};
use crate::sqlite::store::SqliteStore;

pub(crate) const CHANGE_COLUMNS: &str =
    "id, revision, branch_id, summary, description, author, timestamp, parent_id";

pub(crate) fn scan_change(row: &Row<'_>) -> rusqlite::Result<Change> {
    Ok(Change {
        id: row.get("id")?,
        revision: row.get("revision")?,
        branch_id: row.get("branch_id")?,
        summary: row.get("summary")?,
        description: row.get("description")?,
        author: row.get("author")?,
        timestamp: datetime_column(row, "timestamp")?,
        parent_id: row.get("parent_id")?,
    })
}

// ---------------------------------------------------------------------------
// Connection-level helpers (shared with Transaction)
// ---------------------------------------------------------------------------

pub(crate) fn get_change_on_conn(conn: &Connection, id: ChangeId) -> Result<Change> {
    let mut stmt =
        conn.prepare_cached(&format!("SELECT {CHANGE_COLUMNS} FROM changes WHERE id = ?1"))?;
    or_not_found(stmt.query_row(params![id], scan_change), "change", id)
}

pub(crate) fn find_change_on_conn(
    conn: &Connection,
    branch_id: BranchId,
    revision: &str,
) -> Result<Change> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {CHANGE_COLUMNS} FROM changes WHERE branch_id = ?1 AND revision = ?2"
    ))?;
    or_not_found(
        stmt.query_row(params![branch_id, revision], scan_change),
        "change",
        format!("{revision} on branch {branch_id}"),
    )
}

/// Runs a change query whose single parameter is a change id.
fn query_changes(conn: &Connection, sql: &str, id: ChangeId) -> Result<Vec<Change>> {
    let mut stmt = conn.prepare_cached(sql)?;
    let rows = stmt.query_map(params![id], scan_change)?;
    let mut changes = Vec::new();
    for row in rows {
        changes.push(row?);
    }
    Ok(changes)
}

/// Ids of the changes merged into `target_id`.
pub(crate) fn merge_source_ids(conn: &Connection, target_id: ChangeId) -> Result<Vec<ChangeId>> {
    let mut stmt = conn.prepare_cached(
        "SELECT source_id FROM change_merges WHERE target_id = ?1 ORDER BY source_id",
    )?;
    let rows = stmt.query_map(params![target_id], |row| row.get::<_, ChangeId>(0))?;
    let mut ids = Vec::new();
    for row in rows {
        ids.push(row?);
    }
    Ok(ids)
}

/// Adds the merge edge `source_id -> target_id` after checking both
/// endpoints exist and that the edge keeps the graph acyclic.
pub(crate) fn add_merge_on_conn(
    conn: &Connection,
    source_id: ChangeId,
    target_id: ChangeId,
    max_nodes: usize,
) -> Result<()> {
    if source_id == target_id {
        return Err(StorageError::CycleDetected {
            source_id,
            target_id,
        });
    }

    let referenced_by = format!("merge into change {target_id}");
    get_change_on_conn(conn, source_id).map_err(|e| {
        if e.is_not_found() {
            StorageError::dangling("change", source_id, referenced_by.clone())
        } else {
            e
        }
    })?;
    get_change_on_conn(conn, target_id)?;

    if graph::reaches(conn, target_id, source_id, max_nodes)? {
        return Err(StorageError::CycleDetected {
            source_id,
            target_id,
        });
    }

    let inserted = conn.execute(
        "INSERT OR IGNORE INTO change_merges (source_id, target_id) VALUES (?1, ?2)",
        params![source_id, target_id],
    )?;
    if inserted > 0 {
        debug!(source_id, target_id, "recorded merge edge");
    }
    Ok(())
}

/// Records a change together with its merge edges.
///
/// Re-recording an identical change returns the stored row and adds any
/// merge edges not yet present; a conflicting re-record fails with
/// [`StorageError::IntegrityViolation`]. Callers wrap this in a transaction.
pub(crate) fn record_change_on_conn(
    conn: &Connection,
    change: &NewChange,
    max_nodes: usize,
) -> Result<Change> {
    validate_change(change)?;
    get_branch_on_conn(conn, change.branch_id)?;

    let referenced_by = format!("change {}", change.revision);
    if let Some(parent_id) = change.parent_id {
        get_change_on_conn(conn, parent_id).map_err(|e| {
            if e.is_not_found() {
                StorageError::dangling("change", parent_id, referenced_by.clone())
            } else {
                e
            }
        })?;
    }

    let stored = match find_change_on_conn(conn, change.branch_id, &change.revision) {
        Ok(existing) => {
            if !change.matches(&existing) {
                return Err(StorageError::integrity(format!(
                    "change {} on branch {} already recorded with different content",
                    change.revision, change.branch_id
                )));
            }
            debug!(id = existing.id, revision = %change.revision, "change already recorded");
            existing
        }
        Err(e) if e.is_not_found() => {
            conn.execute(
                "INSERT INTO changes
                    (revision, branch_id, summary, description, author, timestamp, parent_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    change.revision,
                    change.branch_id,
                    change.summary,
                    change.description,
                    change.author,
                    format_datetime(&change.timestamp),
                    change.parent_id,
                ],
            )?;
            let id = conn.last_insert_rowid();
            info!(id, revision = %change.revision, branch_id = change.branch_id, "recorded change");
            get_change_on_conn(conn, id)?
        }
        Err(e) => return Err(e),
    };

    let sources: BTreeSet<ChangeId> = change.merged_from.iter().copied().collect();
    for source_id in sources {
        add_merge_on_conn(conn, source_id, stored.id, max_nodes)?;
    }

    Ok(stored)
}

// ---------------------------------------------------------------------------
// SqliteStore methods
// ---------------------------------------------------------------------------

impl SqliteStore {
    /// Records a change and its merge edges atomically.
    pub fn record_change_impl(&self, change: &NewChange) -> Result<Change> {
        let max_nodes = self.options.max_closure_nodes;
        self.with_tx(|conn| record_change_on_conn(conn, change, max_nodes))
    }

    /// Records that `source_id` was merged into `target_id`.
    pub fn add_merge_impl(&self, source_id: ChangeId, target_id: ChangeId) -> Result<()> {
        let max_nodes = self.options.max_closure_nodes;
        self.with_tx(|conn| add_merge_on_conn(conn, source_id, target_id, max_nodes))
    }

    pub fn get_change_impl(&self, id: ChangeId) -> Result<Change> {
        let conn = self.lock_conn()?;
        get_change_on_conn(&conn, id)
    }

    pub fn find_change_impl(&self, branch_id: BranchId, revision: &str) -> Result<Change> {
        let conn = self.lock_conn()?;
        find_change_on_conn(&conn, branch_id, revision)
    }

    /// Returns the changes on a branch, newest first.
    pub fn list_changes_impl(&self, branch_id: BranchId) -> Result<Vec<Change>> {
        let conn = self.lock_conn()?;
        get_branch_on_conn(&conn, branch_id)?;
        query_changes(
            &conn,
            &format!(
                "SELECT {CHANGE_COLUMNS} FROM changes WHERE branch_id = ?1
                 ORDER BY timestamp DESC, id DESC"
            ),
            branch_id,
        )
    }

    /// Returns the changes whose parent is `id`.
    pub fn get_children_impl(&self, id: ChangeId) -> Result<Vec<Change>> {
        let conn = self.lock_conn()?;
        get_change_on_conn(&conn, id)?;
        query_changes(
            &conn,
            &format!("SELECT {CHANGE_COLUMNS} FROM changes WHERE parent_id = ?1 ORDER BY id"),
            id,
        )
    }

    /// Returns the changes merged into `id`.
    pub fn get_merge_sources_impl(&self, id: ChangeId) -> Result<Vec<Change>> {
        let conn = self.lock_conn()?;
        get_change_on_conn(&conn, id)?;
        query_changes(
            &conn,
            "SELECT c.id, c.revision, c.branch_id, c.summary, c.description, c.author,
                    c.timestamp, c.parent_id
             FROM changes c JOIN change_merges m ON m.source_id = c.id
             WHERE m.target_id = ?1 ORDER BY c.id",
            id,
        )
    }

    /// Returns the changes `id` was merged into.
    pub fn get_merge_targets_impl(&self, id: ChangeId) -> Result<Vec<Change>> {
        let conn = self.lock_conn()?;
        get_change_on_conn(&conn, id)?;
        query_changes(
            &conn,
            "SELECT c.id, c.revision, c.branch_id, c.summary, c.description, c.author,
                    c.timestamp, c.parent_id
             FROM changes c JOIN change_merges m ON m.target_id = c.id
             WHERE m.source_id = ?1 ORDER BY c.id",
            id,
        )
    }
}
