//! Command handlers, one module per top-level subcommand.

pub mod build;
pub mod catalog;
pub mod change;
pub mod config_cmd;
pub mod init;
pub mod issue;
pub mod repo;
pub mod stats;
pub mod version;

use anyhow::{Context, Result};

use harvest_core::catalog::{BuildProject, IntegrationType, Platform};
use harvest_core::repository::{Branch, Repository};
use harvest_storage::Storage;

/// Looks up a repository by name.
pub(crate) fn find_repository(store: &dyn Storage, name: &str) -> Result<Repository> {
    store
        .list_repositories()?
        .into_iter()
        .find(|r| r.name == name)
        .with_context(|| format!("repository '{name}' not found (run 'harvest repo add')"))
}

pub(crate) fn find_branch(store: &dyn Storage, repo: &str, branch: &str) -> Result<Branch> {
    let repository = find_repository(store, repo)?;
    store
        .find_branch(repository.id, branch)
        .with_context(|| format!("branch '{branch}' not found in repository '{repo}'"))
}

pub(crate) fn find_project(store: &dyn Storage, name: &str) -> Result<BuildProject> {
    store
        .find_project(name)
        .with_context(|| format!("project '{name}' not found (run 'harvest project add')"))
}

pub(crate) fn find_platform(store: &dyn Storage, name: &str) -> Result<Platform> {
    store
        .find_platform(name)
        .with_context(|| format!("platform '{name}' not found (run 'harvest platform add')"))
}

pub(crate) fn find_integration(store: &dyn Storage, name: &str) -> Result<IntegrationType> {
    store
        .find_integration_type(name)
        .with_context(|| format!("integration '{name}' not found (run 'harvest integration add')"))
}
