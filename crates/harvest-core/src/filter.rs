//! Filter types for querying builds.

use crate::catalog::{IntegrationTypeId, PlatformId, ProjectId};
use crate::enums::BuildStatus;

/// Filter for build listings.
///
/// Every `Some` field narrows the result; `None` means "any". Results are
/// always ordered by `started` ascending, ties broken by ascending id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildFilter {
    pub project_id: Option<ProjectId>,
    pub integration_type_id: Option<IntegrationTypeId>,
    pub platform_id: Option<PlatformId>,
    pub status: Option<BuildStatus>,
    /// Only builds with a `started` timestamp.
    pub started_only: bool,
    pub limit: Option<usize>,
}

impl BuildFilter {
    /// Passed builds with a start timestamp, optionally for one project.
    pub fn good(project_id: Option<ProjectId>) -> Self {
        Self {
            project_id,
            status: Some(BuildStatus::Passed),
            started_only: true,
            ..Self::default()
        }
    }

    pub fn project(mut self, project_id: ProjectId) -> Self {
        self.project_id = Some(project_id);
        self
    }

    pub fn integration_type(mut self, integration_type_id: IntegrationTypeId) -> Self {
        self.integration_type_id = Some(integration_type_id);
        self
    }

    pub fn platform(mut self, platform_id: PlatformId) -> Self {
        self.platform_id = Some(platform_id);
        self
    }

    pub fn status(mut self, status: BuildStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}
