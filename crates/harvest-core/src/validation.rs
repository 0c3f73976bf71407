//! Write-time validation rules for harvester input.

use crate::build::{BuildRecord, BuildVariant};
use crate::change::NewChange;

/// Error type for validation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },

    #[error("{field} must be {max} characters or less (got {len})")]
    TooLong {
        field: &'static str,
        max: usize,
        len: usize,
    },

    #[error("finished timestamp precedes started timestamp")]
    FinishedBeforeStarted,
}

// Column limits carried over from the harvester schema.
pub const MAX_REVISION: usize = 40;
pub const MAX_SUMMARY: usize = 250;
pub const MAX_AUTHOR: usize = 100;
pub const MAX_BRANCH_NAME: usize = 150;
pub const MAX_REPOSITORY_NAME: usize = 100;
pub const MAX_PROJECT_NAME: usize = 100;
pub const MAX_PLATFORM_NAME: usize = 40;
pub const MAX_INTEGRATION_NAME: usize = 30;
pub const MAX_INTEGRATION_ABBREV: usize = 5;
pub const MAX_CI_BUILD_ID: usize = 64;
pub const MAX_TRACKING_CODE: usize = 32;
pub const MAX_PROCEDURE_FIELD: usize = 100;

/// Checks that `value` is non-empty and at most `max` characters.
pub fn validate_name(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required { field });
    }
    check_len(field, value, max)
}

fn check_len(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len > max {
        return Err(ValidationError::TooLong { field, max, len });
    }
    Ok(())
}

/// Validates a change before it is recorded.
pub fn validate_change(change: &NewChange) -> Result<(), ValidationError> {
    validate_name("revision", &change.revision, MAX_REVISION)?;
    validate_name("summary", &change.summary, MAX_SUMMARY)?;
    validate_name("author", &change.author, MAX_AUTHOR)?;
    Ok(())
}

/// Validates a build observation before it is upserted.
pub fn validate_build(record: &BuildRecord) -> Result<(), ValidationError> {
    validate_name("ci_build_id", &record.key.ci_build_id, MAX_CI_BUILD_ID)?;

    if let (Some(started), Some(finished)) = (record.started, record.finished) {
        if finished < started {
            return Err(ValidationError::FinishedBeforeStarted);
        }
    }

    match &record.variant {
        BuildVariant::Generic => {}
        BuildVariant::ElectricCommander {
            procedure_name,
            procedure_step,
        } => {
            validate_name("procedure_name", procedure_name, MAX_PROCEDURE_FIELD)?;
            validate_name("procedure_step", procedure_step, MAX_PROCEDURE_FIELD)?;
        }
        BuildVariant::Jenkins { project_name } => {
            validate_name("jenkins project_name", project_name, MAX_PROCEDURE_FIELD)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::BuildBuilder;
    use crate::change::ChangeBuilder;
    use chrono::{Duration, Utc};

    fn valid_change() -> NewChange {
        ChangeBuilder::new(1, "abc123")
            .summary("Fix flaky test")
            .author("alice")
            .build()
    }

    #[test]
    fn valid_change_passes() {
        assert!(validate_change(&valid_change()).is_ok());
    }

    #[test]
    fn empty_revision_rejected() {
        let mut c = valid_change();
        c.revision = "  ".into();
        assert_eq!(
            validate_change(&c).unwrap_err(),
            ValidationError::Required { field: "revision" }
        );
    }

    #[test]
    fn long_revision_rejected() {
        let mut c = valid_change();
        c.revision = "f".repeat(41);
        assert!(matches!(
            validate_change(&c).unwrap_err(),
            ValidationError::TooLong { field: "revision", max: 40, len: 41 }
        ));
    }

    #[test]
    fn finished_before_started_rejected() {
        let now = Utc::now();
        let record = BuildBuilder::new(1, 1, "7")
            .started(now)
            .finished(now - Duration::seconds(5))
            .build();
        assert_eq!(
            validate_build(&record).unwrap_err(),
            ValidationError::FinishedBeforeStarted
        );
    }

    #[test]
    fn jenkins_variant_requires_project_name() {
        let record = BuildBuilder::new(1, 1, "7")
            .variant(BuildVariant::Jenkins {
                project_name: String::new(),
            })
            .build();
        assert!(matches!(
            validate_build(&record).unwrap_err(),
            ValidationError::Required { .. }
        ));
    }
}
