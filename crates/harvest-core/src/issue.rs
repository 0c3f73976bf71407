//! Issue-tracker references resolved by changes.

use serde::{Deserialize, Serialize};

use crate::change::ChangeId;
use crate::enums::TrackingSystem;

/// Surrogate key of an [`Issue`].
pub type IssueId = i64;

/// A ticket in an external tracker, unique on `(tracking_code, tracking_system)`.
///
/// An issue is resolved by at most one change; a change may resolve many issues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub id: IssueId,
    pub tracking_code: String,
    pub tracking_system: TrackingSystem,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_id: Option<ChangeId>,
}
