//! Source-control containers: repositories and their branches.

use serde::{Deserialize, Serialize};

use crate::enums::Scm;

/// Surrogate key of a [`Repository`].
pub type RepositoryId = i64;

/// Surrogate key of a [`Branch`].
pub type BranchId = i64;

/// A source-control repository, unique on `(name, url, scm)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: RepositoryId,
    pub name: String,
    pub url: String,
    pub scm: Scm,
}

/// A branch inside exactly one repository, unique on `(name, repository)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub id: BranchId,
    pub name: String,
    pub repository_id: RepositoryId,
}
