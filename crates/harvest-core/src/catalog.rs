//! Build catalog entities: projects, platforms and CI integration types.

use serde::{Deserialize, Serialize};

/// Surrogate key of a [`BuildProject`].
pub type ProjectId = i64;

/// Surrogate key of a [`Platform`].
pub type PlatformId = i64;

/// Surrogate key of an [`IntegrationType`].
pub type IntegrationTypeId = i64;

/// A named grouping under which builds are compared for "good build" purposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildProject {
    pub id: ProjectId,
    pub name: String,
}

/// A target platform for platform-scoped builds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    pub id: PlatformId,
    pub name: String,
}

/// A CI tool descriptor (e.g. Jenkins, Electric Commander).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationType {
    pub id: IntegrationTypeId,
    pub name: String,
    /// Short code, at most five characters (e.g. `"JNK"`).
    pub abbrev: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}
