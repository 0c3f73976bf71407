//! Build records harvested from CI tools.
//!
//! A [`Build`] carries the fields every CI tool shares plus a tagged
//! [`BuildVariant`] payload for the tool-specific ones. Provenance resolution
//! only ever looks at the common fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{IntegrationTypeId, PlatformId, ProjectId};
use crate::change::ChangeId;
use crate::enums::BuildStatus;

/// Surrogate key of a [`Build`].
pub type BuildId = i64;

/// Tool-specific build fields, discriminated by CI tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BuildVariant {
    /// No tool-specific fields.
    #[default]
    Generic,
    ElectricCommander {
        procedure_name: String,
        procedure_step: String,
    },
    Jenkins {
        project_name: String,
    },
}

impl BuildVariant {
    /// Short label used in listings.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::ElectricCommander { .. } => "electric-commander",
            Self::Jenkins { .. } => "jenkins",
        }
    }
}

/// Identity of a build: project, CI tool, CI-native id and (for
/// platform-scoped builds) the platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildKey {
    pub project_id: ProjectId,
    pub integration_type_id: IntegrationTypeId,
    pub ci_build_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_id: Option<PlatformId>,
}

/// A stored build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Build {
    pub id: BuildId,
    pub project_id: ProjectId,
    pub integration_type_id: IntegrationTypeId,
    pub ci_build_id: String,

    /// Set for platform-scoped builds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_id: Option<PlatformId>,

    /// `None` until the harvester has seen a result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<BuildStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished: Option<DateTime<Utc>>,

    /// First harvest timestamp.
    pub created: DateTime<Utc>,

    /// Last harvest timestamp.
    pub modified: DateTime<Utc>,

    /// Most recent change known to be included in this build.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_change_id: Option<ChangeId>,

    #[serde(default)]
    pub variant: BuildVariant,
}

impl Build {
    pub fn key(&self) -> BuildKey {
        BuildKey {
            project_id: self.project_id,
            integration_type_id: self.integration_type_id,
            ci_build_id: self.ci_build_id.clone(),
            platform_id: self.platform_id,
        }
    }

    /// Returns `true` if the build passed.
    pub fn is_good(&self) -> bool {
        self.status.is_some_and(|s| s.is_good())
    }
}

// ---------------------------------------------------------------------------
// BuildRecord -- harvester input
// ---------------------------------------------------------------------------

/// A build observation supplied by a harvester. Upserted on its [`BuildKey`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRecord {
    pub key: BuildKey,
    pub status: Option<BuildStatus>,
    pub started: Option<DateTime<Utc>>,
    pub finished: Option<DateTime<Utc>>,
    pub last_change_id: Option<ChangeId>,
    pub variant: BuildVariant,
}

/// Builder for [`BuildRecord`].
#[derive(Debug, Clone)]
pub struct BuildBuilder {
    record: BuildRecord,
}

impl BuildBuilder {
    pub fn new(
        project_id: ProjectId,
        integration_type_id: IntegrationTypeId,
        ci_build_id: impl Into<String>,
    ) -> Self {
        Self {
            record: BuildRecord {
                key: BuildKey {
                    project_id,
                    integration_type_id,
                    ci_build_id: ci_build_id.into(),
                    platform_id: None,
                },
                status: None,
                started: None,
                finished: None,
                last_change_id: None,
                variant: BuildVariant::Generic,
            },
        }
    }

    pub fn platform(mut self, platform_id: PlatformId) -> Self {
        self.record.key.platform_id = Some(platform_id);
        self
    }

    pub fn status(mut self, status: BuildStatus) -> Self {
        self.record.status = Some(status);
        self
    }

    pub fn started(mut self, started: DateTime<Utc>) -> Self {
        self.record.started = Some(started);
        self
    }

    pub fn finished(mut self, finished: DateTime<Utc>) -> Self {
        self.record.finished = Some(finished);
        self
    }

    pub fn last_change(mut self, change_id: ChangeId) -> Self {
        self.record.last_change_id = Some(change_id);
        self
    }

    pub fn variant(mut self, variant: BuildVariant) -> Self {
        self.record.variant = variant;
        self
    }

    pub fn build(self) -> BuildRecord {
        self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_serde_is_tagged() {
        let v = BuildVariant::ElectricCommander {
            procedure_name: "nightly".into(),
            procedure_step: "compile".into(),
        };
        let json = serde_json::to_string(&v).unwrap();
        assert!(json.contains(r#""kind":"electric_commander""#));
        let back: BuildVariant = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);

        let generic: BuildVariant = serde_json::from_str(r#"{"kind":"generic"}"#).unwrap();
        assert_eq!(generic, BuildVariant::Generic);
    }

    #[test]
    fn builder_sets_platform_in_key() {
        let record = BuildBuilder::new(1, 2, "#42")
            .platform(9)
            .status(BuildStatus::Failed)
            .build();
        assert_eq!(record.key.platform_id, Some(9));
        assert_eq!(record.key.ci_build_id, "#42");
        assert_eq!(record.status, Some(BuildStatus::Failed));
        assert!(record.last_change_id.is_none());
    }
}
