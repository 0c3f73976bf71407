//! Change struct -- the node of the change-lineage graph.

use std::collections::BTreeMap;
use std::collections::btree_map;

use chrono::{DateTime, Utc};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};

use crate::repository::BranchId;

/// Surrogate key of a [`Change`]. Revisions are only unique per branch, so
/// graph edges always refer to this id.
pub type ChangeId = i64;

/// A recorded commit or changelist.
///
/// Changes are append-only: once stored they are never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub id: ChangeId,

    /// Tracking revision or commit hash.
    pub revision: String,

    pub branch_id: BranchId,

    pub summary: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    pub author: String,

    /// Commit timestamp.
    pub timestamp: DateTime<Utc>,

    /// The change this one was derived from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ChangeId>,
}

/// A directed merge edge: `source_id` was merged into `target_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MergeEdge {
    pub source_id: ChangeId,
    pub target_id: ChangeId,
}

// ---------------------------------------------------------------------------
// NewChange -- harvester input
// ---------------------------------------------------------------------------

/// A fully-formed change as supplied by a harvester, with parent and merge
/// ids already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChange {
    pub branch_id: BranchId,
    pub revision: String,
    pub summary: String,
    pub description: String,
    pub author: String,
    pub timestamp: DateTime<Utc>,
    pub parent_id: Option<ChangeId>,
    /// Changes that were merged into this one.
    pub merged_from: Vec<ChangeId>,
}

impl NewChange {
    /// Returns `true` if `existing` records the same fact as this input.
    ///
    /// Merge edges are compared separately by the store.
    pub fn matches(&self, existing: &Change) -> bool {
        existing.branch_id == self.branch_id
            && existing.revision == self.revision
            && existing.summary == self.summary
            && existing.description == self.description
            && existing.author == self.author
            && existing.timestamp == self.timestamp
            && existing.parent_id == self.parent_id
    }
}

/// Builder for [`NewChange`].
#[derive(Debug, Clone)]
pub struct ChangeBuilder {
    change: NewChange,
}

impl ChangeBuilder {
    /// Creates a builder for `revision` on `branch_id`, timestamped now.
    pub fn new(branch_id: BranchId, revision: impl Into<String>) -> Self {
        Self {
            change: NewChange {
                branch_id,
                revision: revision.into(),
                summary: String::new(),
                description: String::new(),
                author: String::new(),
                timestamp: Utc::now(),
                parent_id: None,
                merged_from: Vec::new(),
            },
        }
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.change.summary = summary.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.change.description = description.into();
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.change.author = author.into();
        self
    }

    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.change.timestamp = timestamp;
        self
    }

    pub fn parent(mut self, parent_id: ChangeId) -> Self {
        self.change.parent_id = Some(parent_id);
        self
    }

    pub fn merged_from(mut self, source_id: ChangeId) -> Self {
        self.change.merged_from.push(source_id);
        self
    }

    pub fn build(self) -> NewChange {
        self.change
    }
}

// ---------------------------------------------------------------------------
// ChangeSet -- deduplicated closure result
// ---------------------------------------------------------------------------

/// A deduplicated set of changes keyed by id.
///
/// Iteration order is ascending id; callers needing another order sort
/// explicitly (see [`ChangeSet::sorted_by_timestamp`]).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    changes: BTreeMap<ChangeId, Change>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a change, returning `false` if its id was already present.
    pub fn insert(&mut self, change: Change) -> bool {
        match self.changes.entry(change.id) {
            btree_map::Entry::Occupied(_) => false,
            btree_map::Entry::Vacant(slot) => {
                slot.insert(change);
                true
            }
        }
    }

    pub fn contains(&self, id: ChangeId) -> bool {
        self.changes.contains_key(&id)
    }

    pub fn get(&self, id: ChangeId) -> Option<&Change> {
        self.changes.get(&id)
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Ids in ascending order.
    pub fn ids(&self) -> Vec<ChangeId> {
        self.changes.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Change> {
        self.changes.values()
    }

    /// Changes in `self` that are not in `other`.
    pub fn difference(&self, other: &ChangeSet) -> ChangeSet {
        self.changes
            .iter()
            .filter(|(id, _)| !other.changes.contains_key(id))
            .map(|(_, c)| c.clone())
            .collect()
    }

    /// Changes ordered newest commit first, ties broken by descending id.
    pub fn sorted_by_timestamp(&self) -> Vec<&Change> {
        let mut out: Vec<&Change> = self.changes.values().collect();
        out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        out
    }
}

impl FromIterator<Change> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = Change>>(iter: I) -> Self {
        let mut set = ChangeSet::new();
        for change in iter {
            set.insert(change);
        }
        set
    }
}

impl IntoIterator for ChangeSet {
    type Item = Change;
    type IntoIter = btree_map::IntoValues<ChangeId, Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_values()
    }
}

impl Serialize for ChangeSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.changes.len()))?;
        for change in self.changes.values() {
            seq.serialize_element(change)?;
        }
        seq.end()
    }
}
