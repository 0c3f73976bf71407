//! Ancestry closures over the change graph for [`SqliteStore`].
//!
//! Both closures are breadth-first walks with a visited set, so diamonds and
//! repeated merges are visited once. A walk that would visit more than the
//! configured node cap fails with [`StorageError::ClosureBoundExceeded`]
//! instead of running away on a corrupted graph.

use std::collections::{HashSet, VecDeque};

use rusqlite::{Connection, params};
use tracing::debug;

use harvest_core::change::{Change, ChangeId, ChangeSet};
use harvest_core::enums::MergeTraversal;

use crate::error::{Result, StorageError};
use crate::sqlite::changes::{get_change_on_conn, merge_source_ids};
use crate::sqlite::store::{SqliteStore, StoreOptions};

/// Which way a closure walks the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    /// Toward parents and merge sources.
    Ancestors,
    /// Toward children and merge targets.
    Descendants,
}

fn ids_for(conn: &Connection, sql: &str, id: ChangeId) -> Result<Vec<ChangeId>> {
    let mut stmt = conn.prepare_cached(sql)?;
    let rows = stmt.query_map(params![id], |row| row.get::<_, ChangeId>(0))?;
    let mut ids = Vec::new();
    for row in rows {
        ids.push(row?);
    }
    Ok(ids)
}

fn child_ids(conn: &Connection, id: ChangeId) -> Result<Vec<ChangeId>> {
    ids_for(conn, "SELECT id FROM changes WHERE parent_id = ?1 ORDER BY id", id)
}

fn merge_target_ids(conn: &Connection, id: ChangeId) -> Result<Vec<ChangeId>> {
    ids_for(
        conn,
        "SELECT target_id FROM change_merges WHERE source_id = ?1 ORDER BY target_id",
        id,
    )
}

/// Neighbours of `change` in the given direction.
fn neighbours(
    conn: &Connection,
    change: &Change,
    direction: Direction,
    merges: MergeTraversal,
) -> Result<Vec<ChangeId>> {
    let mut next = Vec::new();
    match direction {
        Direction::Ancestors => {
            next.extend(change.parent_id);
            next.extend(merge_source_ids(conn, change.id)?);
            if merges == MergeTraversal::Symmetric {
                next.extend(merge_target_ids(conn, change.id)?);
            }
        }
        Direction::Descendants => {
            next.extend(child_ids(conn, change.id)?);
            next.extend(merge_target_ids(conn, change.id)?);
            if merges == MergeTraversal::Symmetric {
                next.extend(merge_source_ids(conn, change.id)?);
            }
        }
    }
    Ok(next)
}

/// Collects `start` and everything reachable from it in `direction`.
///
/// Fails with `NotFound` if `start` does not exist and with
/// `DanglingReference` if an edge points at a missing change.
pub(crate) fn closure_on_conn(
    conn: &Connection,
    start: ChangeId,
    direction: Direction,
    options: &StoreOptions,
) -> Result<ChangeSet> {
    let limit = options.max_closure_nodes;
    let root = get_change_on_conn(conn, start)?;

    let mut visited: HashSet<ChangeId> = HashSet::from([start]);
    let mut queue: VecDeque<Change> = VecDeque::from([root]);
    let mut result = ChangeSet::new();

    while let Some(current) = queue.pop_front() {
        for next_id in neighbours(conn, &current, direction, options.merge_traversal)? {
            if !visited.insert(next_id) {
                continue;
            }
            if visited.len() > limit {
                return Err(StorageError::ClosureBoundExceeded {
                    start,
                    visited: visited.len(),
                    limit,
                });
            }
            let next = get_change_on_conn(conn, next_id).map_err(|e| {
                if e.is_not_found() {
                    StorageError::dangling("change", next_id, format!("change {}", current.id))
                } else {
                    e
                }
            })?;
            queue.push_back(next);
        }
        result.insert(current);
    }

    debug!(start, ?direction, size = result.len(), "computed closure");
    Ok(result)
}

/// Returns `true` if `to` is reachable from `from` along parent-to-child and
/// source-to-target edges. Used to keep merge edges acyclic.
pub(crate) fn reaches(
    conn: &Connection,
    from: ChangeId,
    to: ChangeId,
    limit: usize,
) -> Result<bool> {
    let mut visited: HashSet<ChangeId> = HashSet::from([from]);
    let mut queue: VecDeque<ChangeId> = VecDeque::from([from]);

    while let Some(current) = queue.pop_front() {
        if current == to {
            return Ok(true);
        }
        let mut next = child_ids(conn, current)?;
        next.extend(merge_target_ids(conn, current)?);
        for id in next {
            if visited.insert(id) {
                if visited.len() > limit {
                    return Err(StorageError::ClosureBoundExceeded {
                        start: from,
                        visited: visited.len(),
                        limit,
                    });
                }
                queue.push_back(id);
            }
        }
    }

    Ok(false)
}

// ---------------------------------------------------------------------------
// SqliteStore methods
// ---------------------------------------------------------------------------

impl SqliteStore {
    /// `start` plus every change it was derived from or that was merged into
    /// it, transitively.
    pub fn ancestors_and_self_impl(&self, start: ChangeId) -> Result<ChangeSet> {
        let conn = self.lock_conn()?;
        closure_on_conn(&conn, start, Direction::Ancestors, &self.options)
    }

    /// `start` plus every change derived from it or that it was merged into,
    /// transitively.
    pub fn descendants_and_self_impl(&self, start: ChangeId) -> Result<ChangeSet> {
        let conn = self.lock_conn()?;
        closure_on_conn(&conn, start, Direction::Descendants, &self.options)
    }
}
