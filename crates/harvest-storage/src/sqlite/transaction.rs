//! Transaction wrapper for [`SqliteStore`].

use rusqlite::Connection;

use harvest_core::build::{Build, BuildId, BuildRecord};
use harvest_core::catalog::{BuildProject, IntegrationType, Platform};
use harvest_core::change::{Change, ChangeId, NewChange};
use harvest_core::enums::{Scm, TrackingSystem};
use harvest_core::issue::{Issue, IssueId};
use harvest_core::repository::{Branch, BranchId, Repository, RepositoryId};

use crate::error::{Result, StorageError};
use crate::sqlite::store::SqliteStore;
use crate::sqlite::{builds, catalog, changes, config, issues, repositories};
use crate::traits::Transaction;

/// A thin wrapper around a SQLite connection that is inside a transaction.
///
/// Implements [`Transaction`] by delegating to the same connection-level
/// helpers used by [`SqliteStore`].
pub(crate) struct SqliteTx<'a> {
    pub(crate) conn: &'a Connection,
    pub(crate) max_closure_nodes: usize,
}

impl Transaction for SqliteTx<'_> {
    fn ensure_repository(&self, name: &str, url: &str, scm: Scm) -> Result<Repository> {
        repositories::ensure_repository_on_conn(self.conn, name, url, scm)
    }

    fn ensure_branch(&self, repository_id: RepositoryId, name: &str) -> Result<Branch> {
        repositories::ensure_branch_on_conn(self.conn, repository_id, name)
    }

    fn record_change(&self, change: &NewChange) -> Result<Change> {
        changes::record_change_on_conn(self.conn, change, self.max_closure_nodes)
    }

    fn add_merge(&self, source_id: ChangeId, target_id: ChangeId) -> Result<()> {
        changes::add_merge_on_conn(self.conn, source_id, target_id, self.max_closure_nodes)
    }

    fn get_change(&self, id: ChangeId) -> Result<Change> {
        changes::get_change_on_conn(self.conn, id)
    }

    fn find_change(&self, branch_id: BranchId, revision: &str) -> Result<Change> {
        changes::find_change_on_conn(self.conn, branch_id, revision)
    }

    fn ensure_issue(&self, tracking_code: &str, tracking_system: TrackingSystem) -> Result<Issue> {
        issues::ensure_issue_on_conn(self.conn, tracking_code, tracking_system)
    }

    fn link_issue(&self, issue_id: IssueId, change_id: ChangeId) -> Result<Issue> {
        issues::link_issue_on_conn(self.conn, issue_id, change_id)
    }

    fn ensure_project(&self, name: &str) -> Result<BuildProject> {
        catalog::ensure_project_on_conn(self.conn, name)
    }

    fn ensure_platform(&self, name: &str) -> Result<Platform> {
        catalog::ensure_platform_on_conn(self.conn, name)
    }

    fn ensure_integration_type(
        &self,
        name: &str,
        abbrev: &str,
        description: &str,
    ) -> Result<IntegrationType> {
        catalog::ensure_integration_type_on_conn(self.conn, name, abbrev, description)
    }

    fn record_build(&self, record: &BuildRecord) -> Result<Build> {
        builds::record_build_on_conn(self.conn, record)
    }

    fn get_build(&self, id: BuildId) -> Result<Build> {
        builds::get_build_on_conn(self.conn, id)
    }

    fn set_config(&self, key: &str, value: &str) -> Result<()> {
        config::set_config_on_conn(self.conn, key, value)
    }

    fn get_config(&self, key: &str) -> Result<String> {
        config::get_config_on_conn(self.conn, key)
    }

    fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        config::set_metadata_on_conn(self.conn, key, value)
    }

    fn get_metadata(&self, key: &str) -> Result<String> {
        config::get_metadata_on_conn(self.conn, key)
    }
}

// ---------------------------------------------------------------------------
// SqliteStore::run_in_transaction
// ---------------------------------------------------------------------------

impl SqliteStore {
    /// Runs a closure inside a database transaction.
    pub fn run_in_transaction_impl(
        &self,
        f: &dyn Fn(&dyn Transaction) -> Result<()>,
    ) -> Result<()> {
        let conn = self.lock_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| StorageError::Transaction(format!("failed to begin: {e}")))?;

        let sqlite_tx = SqliteTx {
            conn: &tx,
            max_closure_nodes: self.options.max_closure_nodes,
        };
        match f(&sqlite_tx) {
            Ok(()) => {
                tx.commit()
                    .map_err(|e| StorageError::Transaction(format!("failed to commit: {e}")))?;
                Ok(())
            }
            // Rolled back on drop.
            Err(e) => Err(e),
        }
    }
}
