//! Storage and Transaction traits -- the public API for provenance persistence.
//!
//! Consumers depend on these traits rather than on concrete implementations so
//! that alternative backends (mocks, proxies, etc.) can be substituted.

use std::collections::HashMap;

use serde::Serialize;

use harvest_core::build::{Build, BuildId, BuildKey, BuildRecord};
use harvest_core::catalog::{
    BuildProject, IntegrationType, IntegrationTypeId, Platform, PlatformId, ProjectId,
};
use harvest_core::change::{Change, ChangeId, ChangeSet, NewChange};
use harvest_core::enums::{Scm, TrackingSystem};
use harvest_core::filter::BuildFilter;
use harvest_core::issue::{Issue, IssueId};
use harvest_core::repository::{Branch, BranchId, Repository, RepositoryId};

use crate::error::Result;
use crate::ledger::{BuildCursor, GoodBuilds};

/// Row counts across the graph and the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub repositories: i64,
    pub branches: i64,
    pub changes: i64,
    pub merges: i64,
    pub issues: i64,
    pub projects: i64,
    pub builds: i64,
    pub good_builds: i64,

    /// Breakdown by build status: `(status, count)`.
    pub by_status: Vec<(String, i64)>,
}

// ---------------------------------------------------------------------------
// Storage trait
// ---------------------------------------------------------------------------

/// Primary storage interface for the change graph and the build ledger.
///
/// Every operation either fully succeeds or leaves the store unchanged.
pub trait Storage: Send + Sync {
    // -- Repositories and branches -------------------------------------------

    /// Returns the repository with this natural key, creating it if needed.
    fn ensure_repository(&self, name: &str, url: &str, scm: Scm) -> Result<Repository>;
    fn get_repository(&self, id: RepositoryId) -> Result<Repository>;
    fn list_repositories(&self) -> Result<Vec<Repository>>;
    /// Fails with `IntegrityViolation` while branches reference it.
    fn delete_repository(&self, id: RepositoryId) -> Result<()>;

    fn ensure_branch(&self, repository_id: RepositoryId, name: &str) -> Result<Branch>;
    fn get_branch(&self, id: BranchId) -> Result<Branch>;
    fn find_branch(&self, repository_id: RepositoryId, name: &str) -> Result<Branch>;
    fn list_branches(&self, repository_id: RepositoryId) -> Result<Vec<Branch>>;
    /// Fails with `IntegrityViolation` while changes reference it.
    fn delete_branch(&self, id: BranchId) -> Result<()>;

    // -- Change graph --------------------------------------------------------

    /// Records a change and its incoming merge edges atomically.
    ///
    /// Recording the same `(branch, revision)` again with identical content
    /// returns the stored change.
    fn record_change(&self, change: &NewChange) -> Result<Change>;

    /// Records that `source_id` was merged into `target_id`. Rejects edges
    /// that would introduce a cycle.
    fn add_merge(&self, source_id: ChangeId, target_id: ChangeId) -> Result<()>;

    fn get_change(&self, id: ChangeId) -> Result<Change>;
    fn find_change(&self, branch_id: BranchId, revision: &str) -> Result<Change>;
    /// Changes on a branch, newest first.
    fn list_changes(&self, branch_id: BranchId) -> Result<Vec<Change>>;
    fn get_children(&self, id: ChangeId) -> Result<Vec<Change>>;
    /// Changes merged into `id`.
    fn get_merge_sources(&self, id: ChangeId) -> Result<Vec<Change>>;
    /// Changes `id` was merged into.
    fn get_merge_targets(&self, id: ChangeId) -> Result<Vec<Change>>;

    /// `id` plus everything it was derived from, transitively.
    fn ancestors_and_self(&self, id: ChangeId) -> Result<ChangeSet>;

    /// `id` plus everything derived from it, transitively.
    fn descendants_and_self(&self, id: ChangeId) -> Result<ChangeSet>;

    // -- Issues --------------------------------------------------------------

    fn ensure_issue(&self, tracking_code: &str, tracking_system: TrackingSystem) -> Result<Issue>;
    fn get_issue(&self, id: IssueId) -> Result<Issue>;
    fn link_issue(&self, issue_id: IssueId, change_id: ChangeId) -> Result<Issue>;
    fn issues_for_change(&self, change_id: ChangeId) -> Result<Vec<Issue>>;
    fn list_issues(&self) -> Result<Vec<Issue>>;

    // -- Build catalog -------------------------------------------------------

    fn ensure_project(&self, name: &str) -> Result<BuildProject>;
    fn get_project(&self, id: ProjectId) -> Result<BuildProject>;
    fn find_project(&self, name: &str) -> Result<BuildProject>;
    fn list_projects(&self) -> Result<Vec<BuildProject>>;
    fn delete_project(&self, id: ProjectId) -> Result<()>;

    fn ensure_platform(&self, name: &str) -> Result<Platform>;
    fn get_platform(&self, id: PlatformId) -> Result<Platform>;
    fn find_platform(&self, name: &str) -> Result<Platform>;
    fn list_platforms(&self) -> Result<Vec<Platform>>;
    fn delete_platform(&self, id: PlatformId) -> Result<()>;

    fn ensure_integration_type(
        &self,
        name: &str,
        abbrev: &str,
        description: &str,
    ) -> Result<IntegrationType>;
    fn get_integration_type(&self, id: IntegrationTypeId) -> Result<IntegrationType>;
    fn find_integration_type(&self, name: &str) -> Result<IntegrationType>;
    fn list_integration_types(&self) -> Result<Vec<IntegrationType>>;
    fn delete_integration_type(&self, id: IntegrationTypeId) -> Result<()>;

    // -- Build ledger --------------------------------------------------------

    /// Inserts or updates the build identified by `record.key`.
    fn record_build(&self, record: &BuildRecord) -> Result<Build>;
    fn get_build(&self, id: BuildId) -> Result<Build>;
    fn find_build(&self, key: &BuildKey) -> Result<Build>;
    fn list_builds(&self, filter: &BuildFilter) -> Result<Vec<Build>>;

    /// Up to `limit` good builds strictly after `after`, in good-build order.
    fn good_builds_page(
        &self,
        project_id: Option<ProjectId>,
        after: Option<BuildCursor>,
        limit: usize,
    ) -> Result<Vec<Build>>;

    /// Lazily yields all good builds, optionally for one project.
    fn good_builds(&self, project_id: Option<ProjectId>) -> GoodBuilds<'_>;

    /// The most recent good build, if any.
    fn last_good_build(&self, project_id: Option<ProjectId>) -> Result<Option<Build>>;

    /// The good build of `build`'s project that immediately precedes it.
    fn prev_good_build(&self, build: &Build) -> Result<Option<Build>>;

    // -- Statistics ----------------------------------------------------------

    fn get_statistics(&self) -> Result<Statistics>;

    // -- Configuration -------------------------------------------------------

    fn set_config(&self, key: &str, value: &str) -> Result<()>;
    fn get_config(&self, key: &str) -> Result<String>;
    fn get_all_config(&self) -> Result<HashMap<String, String>>;

    // -- Transactions --------------------------------------------------------

    /// Executes a closure within a database transaction.
    ///
    /// If the closure returns `Ok`, the transaction is committed.
    /// If it returns `Err` or panics, the transaction is rolled back.
    fn run_in_transaction(&self, f: &dyn Fn(&dyn Transaction) -> Result<()>) -> Result<()>;

    // -- Lifecycle -----------------------------------------------------------

    fn close(&self) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Transaction trait
// ---------------------------------------------------------------------------

/// The write path of [`Storage`] plus the lookups a harvester needs while
/// writing, all on one connection and committed or rolled back together.
pub trait Transaction {
    fn ensure_repository(&self, name: &str, url: &str, scm: Scm) -> Result<Repository>;
    fn ensure_branch(&self, repository_id: RepositoryId, name: &str) -> Result<Branch>;

    fn record_change(&self, change: &NewChange) -> Result<Change>;
    fn add_merge(&self, source_id: ChangeId, target_id: ChangeId) -> Result<()>;
    fn get_change(&self, id: ChangeId) -> Result<Change>;
    fn find_change(&self, branch_id: BranchId, revision: &str) -> Result<Change>;

    fn ensure_issue(&self, tracking_code: &str, tracking_system: TrackingSystem) -> Result<Issue>;
    fn link_issue(&self, issue_id: IssueId, change_id: ChangeId) -> Result<Issue>;

    fn ensure_project(&self, name: &str) -> Result<BuildProject>;
    fn ensure_platform(&self, name: &str) -> Result<Platform>;
    fn ensure_integration_type(
        &self,
        name: &str,
        abbrev: &str,
        description: &str,
    ) -> Result<IntegrationType>;

    fn record_build(&self, record: &BuildRecord) -> Result<Build>;
    fn get_build(&self, id: BuildId) -> Result<Build>;

    fn set_config(&self, key: &str, value: &str) -> Result<()>;
    fn get_config(&self, key: &str) -> Result<String>;
    fn set_metadata(&self, key: &str, value: &str) -> Result<()>;
    fn get_metadata(&self, key: &str) -> Result<String>;
}
