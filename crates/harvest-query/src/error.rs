//! Resolver error types.

use harvest_core::build::BuildId;
use harvest_storage::StorageError;

/// Errors returned by [`ProvenanceResolver`](crate::ProvenanceResolver).
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The build cannot be placed in the change graph yet. Distinct from a
    /// build that introduced zero changes.
    #[error("build {build_id} is not yet resolvable: {reason}")]
    UnresolvedBuild {
        build_id: BuildId,
        reason: &'static str,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl QueryError {
    /// Returns `true` if this is a [`QueryError::UnresolvedBuild`].
    pub fn is_unresolved(&self) -> bool {
        matches!(self, Self::UnresolvedBuild { .. })
    }
}

/// Convenience alias used throughout the query crate.
pub type Result<T> = std::result::Result<T, QueryError>;
