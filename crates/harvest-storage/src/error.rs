//! Storage error types.

use harvest_core::change::ChangeId;
use harvest_core::validation::ValidationError;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested entity was not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g., "change", "build").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// A uniqueness or protect-on-delete constraint was breached.
    #[error("integrity violation: {message}")]
    IntegrityViolation {
        /// Description of the breached constraint.
        message: String,
    },

    /// A row points at a related row that does not exist.
    #[error("dangling reference: {referenced_by} points to missing {entity} {id}")]
    DanglingReference {
        /// The kind of the missing entity.
        entity: String,
        /// Identifier of the missing entity.
        id: String,
        /// The row holding the reference (e.g., "change 12").
        referenced_by: String,
    },

    /// An ancestry traversal hit the configured node cap.
    #[error(
        "closure from change {start} exceeded {limit} nodes after visiting {visited} (closure too large or possible cycle)"
    )]
    ClosureBoundExceeded {
        /// Change the traversal started from.
        start: ChangeId,
        /// Nodes visited when the cap was hit.
        visited: usize,
        /// The configured cap.
        limit: usize,
    },

    /// Adding an edge would create a cycle in the change graph.
    #[error("merging change {source_id} into {target_id} would create a cycle")]
    CycleDetected {
        /// Change being merged.
        source_id: ChangeId,
        /// Change receiving the merge.
        target_id: ChangeId,
    },

    /// A validation constraint was violated.
    #[error("validation error: {message}")]
    Validation {
        /// Description of the validation failure.
        message: String,
    },

    /// The database is locked by another process.
    #[error("database locked: {0}")]
    DatabaseLocked(String),

    /// Failed to establish or maintain a database connection.
    #[error("connection error: {0}")]
    Connection(String),

    /// A transaction operation failed.
    #[error("transaction error: {0}")]
    Transaction(String),

    /// A schema migration failed.
    #[error("migration {name} failed: {reason}")]
    Migration {
        /// Name of the migration that failed.
        name: String,
        /// Underlying error description.
        reason: String,
    },

    /// A raw SQLite query error.
    #[error("query error: {0}")]
    Query(#[source] rusqlite::Error),

    /// JSON serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Catch-all for unexpected internal errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience alias used throughout the storage crate.
pub type Result<T> = std::result::Result<T, StorageError>;

impl From<rusqlite::Error> for StorageError {
    /// Constraint failures become [`StorageError::IntegrityViolation`]; busy
    /// and locked errors become [`StorageError::DatabaseLocked`].
    fn from(err: rusqlite::Error) -> Self {
        use rusqlite::ErrorCode;

        if let rusqlite::Error::SqliteFailure(ref ffi_err, ref msg) = err {
            let detail = msg.clone().unwrap_or_else(|| ffi_err.to_string());
            match ffi_err.code {
                ErrorCode::ConstraintViolation => {
                    return Self::IntegrityViolation { message: detail };
                }
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => {
                    return Self::DatabaseLocked(detail);
                }
                _ => {}
            }
        }
        Self::Query(err)
    }
}

impl From<ValidationError> for StorageError {
    fn from(err: ValidationError) -> Self {
        Self::validation(err.to_string())
    }
}

impl StorageError {
    // -- Constructors --------------------------------------------------------

    /// Creates a [`StorageError::NotFound`] for the given entity kind and id.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Creates a [`StorageError::Validation`] with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a [`StorageError::IntegrityViolation`] with the given message.
    pub fn integrity(message: impl Into<String>) -> Self {
        Self::IntegrityViolation {
            message: message.into(),
        }
    }

    /// Creates a [`StorageError::DanglingReference`].
    pub fn dangling(
        entity: impl Into<String>,
        id: impl ToString,
        referenced_by: impl Into<String>,
    ) -> Self {
        Self::DanglingReference {
            entity: entity.into(),
            id: id.to_string(),
            referenced_by: referenced_by.into(),
        }
    }

    // -- Predicates ----------------------------------------------------------

    /// Returns `true` if this is a [`StorageError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if this is a [`StorageError::IntegrityViolation`].
    pub fn is_integrity_violation(&self) -> bool {
        matches!(self, Self::IntegrityViolation { .. })
    }

    /// Returns `true` if the error is transient and the operation may succeed
    /// on retry (e.g., database locked, connection errors).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::DatabaseLocked(_) | Self::Connection(_) | Self::Transaction(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_conditions_are_not_retryable() {
        let errors = [
            StorageError::integrity("dup"),
            StorageError::dangling("change", 4, "change 9"),
            StorageError::ClosureBoundExceeded {
                start: 1,
                visited: 11,
                limit: 10,
            },
            StorageError::CycleDetected {
                source_id: 1,
                target_id: 2,
            },
        ];
        for err in &errors {
            assert!(!err.is_retryable(), "{err} should not be retryable");
        }
        assert!(StorageError::DatabaseLocked("busy".into()).is_retryable());
    }

    #[test]
    fn closure_bound_reports_partial_count() {
        let err = StorageError::ClosureBoundExceeded {
            start: 3,
            visited: 101,
            limit: 100,
        };
        let msg = err.to_string();
        assert!(msg.contains("101"));
        assert!(msg.contains("possible cycle"));
    }

    #[test]
    fn dangling_message_names_both_ends() {
        let err = StorageError::dangling("change", 42, "change 7");
        assert_eq!(
            err.to_string(),
            "dangling reference: change 7 points to missing change 42"
        );
    }
}
