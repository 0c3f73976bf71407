//! Aggregate queries for [`SqliteStore`].

use rusqlite::Connection;

use harvest_core::enums::BuildStatus;

use crate::error::Result;
use crate::sqlite::store::SqliteStore;
use crate::traits::Statistics;

fn count(conn: &Connection, sql: &str) -> Result<i64> {
    Ok(conn.query_row(sql, [], |row| row.get(0))?)
}

impl SqliteStore {
    /// Returns row counts for the graph and the ledger.
    pub fn get_statistics_impl(&self) -> Result<Statistics> {
        let conn = self.lock_conn()?;
        let mut stats = Statistics {
            repositories: count(&conn, "SELECT COUNT(*) FROM repositories")?,
            branches: count(&conn, "SELECT COUNT(*) FROM branches")?,
            changes: count(&conn, "SELECT COUNT(*) FROM changes")?,
            merges: count(&conn, "SELECT COUNT(*) FROM change_merges")?,
            issues: count(&conn, "SELECT COUNT(*) FROM issues")?,
            projects: count(&conn, "SELECT COUNT(*) FROM build_projects")?,
            builds: count(&conn, "SELECT COUNT(*) FROM builds")?,
            good_builds: conn.query_row(
                "SELECT COUNT(*) FROM builds WHERE status = ?1 AND started IS NOT NULL",
                [BuildStatus::Passed.as_str()],
                |row| row.get(0),
            )?,
            by_status: Vec::new(),
        };

        // By status; builds without a result yet are reported as "unknown".
        let mut stmt = conn.prepare(
            "SELECT IFNULL(status, 'unknown'), COUNT(*) FROM builds
             GROUP BY status ORDER BY 2 DESC, 1",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            stats.by_status.push(row?);
        }

        Ok(stats)
    }
}
