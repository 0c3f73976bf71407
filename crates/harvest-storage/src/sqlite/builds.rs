//! Build ledger operations for [`SqliteStore`].
//!
//! Builds are upserted on their key as harvesters poll CI tools. "Good"
//! builds are those that passed and have a start timestamp; they are ordered
//! by `started`, ties broken by id.

use chrono::Utc;
use rusqlite::{Connection, Row, params};
use tracing::{debug, info};

use harvest_core::build::{Build, BuildId, BuildKey, BuildRecord, BuildVariant};
use harvest_core::catalog::ProjectId;
use harvest_core::filter::BuildFilter;
use harvest_core::validation::{ValidationError, validate_build};

use crate::error::{Result, StorageError};
use crate::ledger::BuildCursor;
use crate::sqlite::catalog::{
    get_integration_type_on_conn, get_platform_on_conn, get_project_on_conn,
};
use crate::sqlite::changes::get_change_on_conn;
use crate::sqlite::rows::{
    datetime_column, format_datetime, opt_datetime_column, opt_enum_column, or_not_found,
};
use crate::sqlite::store::SqliteStore;

const BUILD_COLUMNS: &str = "id, project_id, integration_type_id, ci_build_id, platform_id, \
     status, started, finished, created, modified, last_change_id, variant";

fn scan_build(row: &Row<'_>) -> rusqlite::Result<Build> {
    let variant_idx = row.as_ref().column_index("variant")?;
    let variant_json: String = row.get(variant_idx)?;
    let variant: BuildVariant = serde_json::from_str(&variant_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            variant_idx,
            rusqlite::types::Type::Text,
            Box::new(e),
        )
    })?;

    Ok(Build {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        integration_type_id: row.get("integration_type_id")?,
        ci_build_id: row.get("ci_build_id")?,
        platform_id: row.get("platform_id")?,
        status: opt_enum_column(row, "status")?,
        started: opt_datetime_column(row, "started")?,
        finished: opt_datetime_column(row, "finished")?,
        created: datetime_column(row, "created")?,
        modified: datetime_column(row, "modified")?,
        last_change_id: row.get("last_change_id")?,
        variant,
    })
}

// ---------------------------------------------------------------------------
// Connection-level helpers (shared with Transaction)
// ---------------------------------------------------------------------------

pub(crate) fn get_build_on_conn(conn: &Connection, id: BuildId) -> Result<Build> {
    let mut stmt =
        conn.prepare_cached(&format!("SELECT {BUILD_COLUMNS} FROM builds WHERE id = ?1"))?;
    or_not_found(stmt.query_row(params![id], scan_build), "build", id)
}

pub(crate) fn find_build_on_conn(conn: &Connection, key: &BuildKey) -> Result<Build> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {BUILD_COLUMNS} FROM builds
         WHERE project_id = ?1 AND integration_type_id = ?2 AND ci_build_id = ?3
           AND IFNULL(platform_id, 0) = IFNULL(?4, 0)"
    ))?;
    or_not_found(
        stmt.query_row(
            params![
                key.project_id,
                key.integration_type_id,
                key.ci_build_id,
                key.platform_id
            ],
            scan_build,
        ),
        "build",
        &key.ci_build_id,
    )
}

/// Maps a `NotFound` on a referenced row to `DanglingReference`.
fn referenced<T>(result: Result<T>, entity: &str, id: i64, referenced_by: &str) -> Result<T> {
    result.map_err(|e| {
        if e.is_not_found() {
            StorageError::dangling(entity, id, referenced_by)
        } else {
            e
        }
    })
}

/// Inserts or updates the build identified by `record.key`.
///
/// On update, `None` fields of the record leave the stored value untouched;
/// the variant payload is always replaced and `modified` is bumped.
pub(crate) fn record_build_on_conn(conn: &Connection, record: &BuildRecord) -> Result<Build> {
    validate_build(record)?;

    let key = &record.key;
    let referenced_by = format!("build {}", key.ci_build_id);
    referenced(
        get_project_on_conn(conn, key.project_id),
        "project",
        key.project_id,
        &referenced_by,
    )?;
    referenced(
        get_integration_type_on_conn(conn, key.integration_type_id),
        "integration type",
        key.integration_type_id,
        &referenced_by,
    )?;
    if let Some(platform_id) = key.platform_id {
        referenced(
            get_platform_on_conn(conn, platform_id),
            "platform",
            platform_id,
            &referenced_by,
        )?;
    }
    if let Some(change_id) = record.last_change_id {
        referenced(
            get_change_on_conn(conn, change_id),
            "change",
            change_id,
            &referenced_by,
        )?;
    }

    let now = format_datetime(&Utc::now());
    let status = record.status.map(|s| s.as_str());
    let started = record.started.as_ref().map(format_datetime);
    let finished = record.finished.as_ref().map(format_datetime);
    let variant = serde_json::to_string(&record.variant)?;

    match find_build_on_conn(conn, key) {
        Ok(existing) => {
            let started_at = record.started.or(existing.started);
            let finished_at = record.finished.or(existing.finished);
            if let (Some(s), Some(f)) = (started_at, finished_at) {
                if f < s {
                    return Err(ValidationError::FinishedBeforeStarted.into());
                }
            }
            conn.execute(
                "UPDATE builds SET
                    status = COALESCE(?1, status),
                    started = COALESCE(?2, started),
                    finished = COALESCE(?3, finished),
                    last_change_id = COALESCE(?4, last_change_id),
                    variant = ?5,
                    modified = ?6
                 WHERE id = ?7",
                params![
                    status,
                    started,
                    finished,
                    record.last_change_id,
                    variant,
                    now,
                    existing.id
                ],
            )?;
            debug!(id = existing.id, ci_build_id = %key.ci_build_id, "updated build");
            get_build_on_conn(conn, existing.id)
        }
        Err(e) if e.is_not_found() => {
            conn.execute(
                "INSERT INTO builds
                    (project_id, integration_type_id, ci_build_id, platform_id, status,
                     started, finished, created, modified, last_change_id, variant)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8, ?9, ?10)",
                params![
                    key.project_id,
                    key.integration_type_id,
                    key.ci_build_id,
                    key.platform_id,
                    status,
                    started,
                    finished,
                    now,
                    record.last_change_id,
                    variant,
                ],
            )?;
            let id = conn.last_insert_rowid();
            info!(id, ci_build_id = %key.ci_build_id, project_id = key.project_id, "recorded build");
            get_build_on_conn(conn, id)
        }
        Err(e) => Err(e),
    }
}

/// Sort direction over `(started, id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Order {
    Ascending,
    Descending,
}

/// Runs a filtered build query, optionally resuming strictly after (or,
/// descending, strictly before) `cursor`.
fn query_builds_on_conn(
    conn: &Connection,
    filter: &BuildFilter,
    cursor: Option<BuildCursor>,
    order: Order,
    exclude: Option<BuildId>,
) -> Result<Vec<Build>> {
    let mut where_clauses: Vec<String> = Vec::new();
    let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
    let mut param_idx = 1;

    if let Some(project_id) = filter.project_id {
        where_clauses.push(format!("project_id = ?{param_idx}"));
        param_values.push(Box::new(project_id));
        param_idx += 1;
    }
    if let Some(integration_type_id) = filter.integration_type_id {
        where_clauses.push(format!("integration_type_id = ?{param_idx}"));
        param_values.push(Box::new(integration_type_id));
        param_idx += 1;
    }
    if let Some(platform_id) = filter.platform_id {
        where_clauses.push(format!("platform_id = ?{param_idx}"));
        param_values.push(Box::new(platform_id));
        param_idx += 1;
    }
    if let Some(status) = filter.status {
        where_clauses.push(format!("status = ?{param_idx}"));
        param_values.push(Box::new(status.as_str()));
        param_idx += 1;
    }
    if filter.started_only || cursor.is_some() {
        where_clauses.push("started IS NOT NULL".to_string());
    }
    if let Some(id) = exclude {
        where_clauses.push(format!("id <> ?{param_idx}"));
        param_values.push(Box::new(id));
        param_idx += 1;
    }
    if let Some(cursor) = cursor {
        let op = match order {
            Order::Ascending => ">",
            Order::Descending => "<",
        };
        where_clauses.push(format!(
            "(started {op} ?{s} OR (started = ?{s} AND id {op} ?{i}))",
            s = param_idx,
            i = param_idx + 1
        ));
        param_values.push(Box::new(format_datetime(&cursor.started)));
        param_values.push(Box::new(cursor.id));
        param_idx += 2;
    }

    let where_sql = if where_clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", where_clauses.join(" AND "))
    };
    let dir = match order {
        Order::Ascending => "ASC",
        Order::Descending => "DESC",
    };
    // NULL starts sort first ascending; id keeps equal starts deterministic.
    let mut sql =
        format!("SELECT {BUILD_COLUMNS} FROM builds {where_sql} ORDER BY started {dir}, id {dir}");
    if let Some(limit) = filter.limit {
        sql.push_str(&format!(" LIMIT ?{param_idx}"));
        param_values.push(Box::new(i64::try_from(limit).unwrap_or(i64::MAX)));
    }

    let param_refs: Vec<&dyn rusqlite::types::ToSql> =
        param_values.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(param_refs.as_slice(), scan_build)?;
    let mut builds = Vec::new();
    for row in rows {
        builds.push(row?);
    }
    Ok(builds)
}

pub(crate) fn last_good_build_on_conn(
    conn: &Connection,
    project_id: Option<ProjectId>,
) -> Result<Option<Build>> {
    let filter = BuildFilter::good(project_id).limit(1);
    Ok(query_builds_on_conn(conn, &filter, None, Order::Descending, None)?
        .into_iter()
        .next())
}

/// The latest good build of `build`'s project ordered strictly before it.
pub(crate) fn prev_good_build_on_conn(conn: &Connection, build: &Build) -> Result<Option<Build>> {
    let Some(cursor) = BuildCursor::of(build) else {
        return Err(StorageError::validation(format!(
            "build {} has no start timestamp and cannot be ordered among good builds",
            build.id
        )));
    };
    let filter = BuildFilter::good(Some(build.project_id)).limit(1);
    Ok(
        query_builds_on_conn(conn, &filter, Some(cursor), Order::Descending, Some(build.id))?
            .into_iter()
            .next(),
    )
}

// ---------------------------------------------------------------------------
// SqliteStore methods
// ---------------------------------------------------------------------------

impl SqliteStore {
    /// Upserts a build observation.
    pub fn record_build_impl(&self, record: &BuildRecord) -> Result<Build> {
        self.with_tx(|conn| record_build_on_conn(conn, record))
    }

    pub fn get_build_impl(&self, id: BuildId) -> Result<Build> {
        let conn = self.lock_conn()?;
        get_build_on_conn(&conn, id)
    }

    pub fn find_build_impl(&self, key: &BuildKey) -> Result<Build> {
        let conn = self.lock_conn()?;
        find_build_on_conn(&conn, key)
    }

    /// Lists builds matching `filter`, oldest start first.
    pub fn list_builds_impl(&self, filter: &BuildFilter) -> Result<Vec<Build>> {
        let conn = self.lock_conn()?;
        query_builds_on_conn(&conn, filter, None, Order::Ascending, None)
    }

    /// One page of good builds strictly after `after`.
    pub fn good_builds_page_impl(
        &self,
        project_id: Option<ProjectId>,
        after: Option<BuildCursor>,
        limit: usize,
    ) -> Result<Vec<Build>> {
        let conn = self.lock_conn()?;
        let filter = BuildFilter::good(project_id).limit(limit);
        query_builds_on_conn(&conn, &filter, after, Order::Ascending, None)
    }

    pub fn last_good_build_impl(&self, project_id: Option<ProjectId>) -> Result<Option<Build>> {
        let conn = self.lock_conn()?;
        last_good_build_on_conn(&conn, project_id)
    }

    pub fn prev_good_build_impl(&self, build: &Build) -> Result<Option<Build>> {
        let conn = self.lock_conn()?;
        prev_good_build_on_conn(&conn, build)
    }
}
