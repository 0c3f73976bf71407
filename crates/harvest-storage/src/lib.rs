//! Storage backend for the build harvest system.
//!
//! Provides the [`Storage`] trait and a SQLite implementation ([`SqliteStore`]).

pub mod error;
pub mod ledger;
pub mod sqlite;
pub mod traits;

// Re-exports for convenience.
pub use error::StorageError;
pub use ledger::{BuildCursor, GoodBuilds};
pub use sqlite::{SqliteStore, StoreOptions};
pub use traits::{Statistics, Storage, Transaction};

// ---------------------------------------------------------------------------
// Storage trait implementation for SqliteStore
// ---------------------------------------------------------------------------

use std::collections::HashMap;

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

impl Storage for SqliteStore {
    fn ensure_repository(&self, name: &str, url: &str, scm: Scm) -> Result<Repository> {
        self.ensure_repository_impl(name, url, scm)
    }

    fn get_repository(&self, id: RepositoryId) -> Result<Repository> {
        self.get_repository_impl(id)
    }

    fn list_repositories(&self) -> Result<Vec<Repository>> {
        self.list_repositories_impl()
    }

    fn delete_repository(&self, id: RepositoryId) -> Result<()> {
        self.delete_repository_impl(id)
    }

    fn ensure_branch(&self, repository_id: RepositoryId, name: &str) -> Result<Branch> {
        self.ensure_branch_impl(repository_id, name)
    }

    fn get_branch(&self, id: BranchId) -> Result<Branch> {
        self.get_branch_impl(id)
    }

    fn find_branch(&self, repository_id: RepositoryId, name: &str) -> Result<Branch> {
        self.find_branch_impl(repository_id, name)
    }

    fn list_branches(&self, repository_id: RepositoryId) -> Result<Vec<Branch>> {
        self.list_branches_impl(repository_id)
    }

    fn delete_branch(&self, id: BranchId) -> Result<()> {
        self.delete_branch_impl(id)
    }

    fn record_change(&self, change: &NewChange) -> Result<Change> {
        self.record_change_impl(change)
    }

    fn add_merge(&self, source_id: ChangeId, target_id: ChangeId) -> Result<()> {
        self.add_merge_impl(source_id, target_id)
    }

    fn get_change(&self, id: ChangeId) -> Result<Change> {
        self.get_change_impl(id)
    }

    fn find_change(&self, branch_id: BranchId, revision: &str) -> Result<Change> {
        self.find_change_impl(branch_id, revision)
    }

    fn list_changes(&self, branch_id: BranchId) -> Result<Vec<Change>> {
        self.list_changes_impl(branch_id)
    }

    fn get_children(&self, id: ChangeId) -> Result<Vec<Change>> {
        self.get_children_impl(id)
    }

    fn get_merge_sources(&self, id: ChangeId) -> Result<Vec<Change>> {
        self.get_merge_sources_impl(id)
    }

    fn get_merge_targets(&self, id: ChangeId) -> Result<Vec<Change>> {
        self.get_merge_targets_impl(id)
    }

    fn ancestors_and_self(&self, id: ChangeId) -> Result<ChangeSet> {
        self.ancestors_and_self_impl(id)
    }

    fn descendants_and_self(&self, id: ChangeId) -> Result<ChangeSet> {
        self.descendants_and_self_impl(id)
    }

    fn ensure_issue(&self, tracking_code: &str, tracking_system: TrackingSystem) -> Result<Issue> {
        self.ensure_issue_impl(tracking_code, tracking_system)
    }

    fn get_issue(&self, id: IssueId) -> Result<Issue> {
        self.get_issue_impl(id)
    }

    fn link_issue(&self, issue_id: IssueId, change_id: ChangeId) -> Result<Issue> {
        self.link_issue_impl(issue_id, change_id)
    }

    fn issues_for_change(&self, change_id: ChangeId) -> Result<Vec<Issue>> {
        self.issues_for_change_impl(change_id)
    }

    fn list_issues(&self) -> Result<Vec<Issue>> {
        self.list_issues_impl()
    }

    fn ensure_project(&self, name: &str) -> Result<BuildProject> {
        self.ensure_project_impl(name)
    }

    fn get_project(&self, id: ProjectId) -> Result<BuildProject> {
        self.get_project_impl(id)
    }

    fn find_project(&self, name: &str) -> Result<BuildProject> {
        self.find_project_impl(name)
    }

    fn list_projects(&self) -> Result<Vec<BuildProject>> {
        self.list_projects_impl()
    }

    fn delete_project(&self, id: ProjectId) -> Result<()> {
        self.delete_project_impl(id)
    }

    fn ensure_platform(&self, name: &str) -> Result<Platform> {
        self.ensure_platform_impl(name)
    }

    fn get_platform(&self, id: PlatformId) -> Result<Platform> {
        self.get_platform_impl(id)
    }

    fn find_platform(&self, name: &str) -> Result<Platform> {
        self.find_platform_impl(name)
    }

    fn list_platforms(&self) -> Result<Vec<Platform>> {
        self.list_platforms_impl()
    }

    fn delete_platform(&self, id: PlatformId) -> Result<()> {
        self.delete_platform_impl(id)
    }

    fn ensure_integration_type(
        &self,
        name: &str,
        abbrev: &str,
        description: &str,
    ) -> Result<IntegrationType> {
        self.ensure_integration_type_impl(name, abbrev, description)
    }

    fn get_integration_type(&self, id: IntegrationTypeId) -> Result<IntegrationType> {
        self.get_integration_type_impl(id)
    }

    fn find_integration_type(&self, name: &str) -> Result<IntegrationType> {
        self.find_integration_type_impl(name)
    }

    fn list_integration_types(&self) -> Result<Vec<IntegrationType>> {
        self.list_integration_types_impl()
    }

    fn delete_integration_type(&self, id: IntegrationTypeId) -> Result<()> {
        self.delete_integration_type_impl(id)
    }

    fn record_build(&self, record: &BuildRecord) -> Result<Build> {
        self.record_build_impl(record)
    }

    fn get_build(&self, id: BuildId) -> Result<Build> {
        self.get_build_impl(id)
    }

    fn find_build(&self, key: &BuildKey) -> Result<Build> {
        self.find_build_impl(key)
    }

    fn list_builds(&self, filter: &BuildFilter) -> Result<Vec<Build>> {
        self.list_builds_impl(filter)
    }

    fn good_builds_page(
        &self,
        project_id: Option<ProjectId>,
        after: Option<BuildCursor>,
        limit: usize,
    ) -> Result<Vec<Build>> {
        self.good_builds_page_impl(project_id, after, limit)
    }

    fn good_builds(&self, project_id: Option<ProjectId>) -> GoodBuilds<'_> {
        GoodBuilds::new(self, project_id, self.options.page_size)
    }

    fn last_good_build(&self, project_id: Option<ProjectId>) -> Result<Option<Build>> {
        self.last_good_build_impl(project_id)
    }

    fn prev_good_build(&self, build: &Build) -> Result<Option<Build>> {
        self.prev_good_build_impl(build)
    }

    fn get_statistics(&self) -> Result<Statistics> {
        self.get_statistics_impl()
    }

    fn set_config(&self, key: &str, value: &str) -> Result<()> {
        self.set_config_impl(key, value)
    }

    fn get_config(&self, key: &str) -> Result<String> {
        self.get_config_impl(key)
    }

    fn get_all_config(&self) -> Result<HashMap<String, String>> {
        self.get_all_config_impl()
    }

    fn run_in_transaction(&self, f: &dyn Fn(&dyn Transaction) -> Result<()>) -> Result<()> {
        self.run_in_transaction_impl(f)
    }

    fn close(&self) -> Result<()> {
        // SQLite connections are closed when the Connection is dropped.
        Ok(())
    }
}
