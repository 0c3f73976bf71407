//! [`ProvenanceResolver`] -- what did a build bring in?

use serde::Serialize;
use tracing::{debug, warn};

use harvest_core::build::Build;
use harvest_core::catalog::ProjectId;
use harvest_core::change::{ChangeId, ChangeSet};
use harvest_storage::Storage;

use crate::error::{QueryError, Result};

/// A build together with its previous good build and the changes it
/// introduced since then.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub build: Build,
    /// The good build the delta is measured against, if any.
    pub previous: Option<Build>,
    pub introduced: ChangeSet,
}

/// Read-only queries composed over a [`Storage`].
///
/// Nothing is cached: every call recomputes from the store.
#[derive(Clone, Copy)]
pub struct ProvenanceResolver<'a> {
    storage: &'a dyn Storage,
}

impl<'a> ProvenanceResolver<'a> {
    pub fn new(storage: &'a dyn Storage) -> Self {
        Self { storage }
    }

    /// The good build with the latest start for `project_id` (or across all
    /// projects when `None`).
    pub fn last_good_build(&self, project_id: Option<ProjectId>) -> Result<Option<Build>> {
        Ok(self.storage.last_good_build(project_id)?)
    }

    /// The good build of the same project immediately preceding `build`.
    pub fn prev_good_build(&self, build: &Build) -> Result<Option<Build>> {
        if build.started.is_none() {
            return Err(QueryError::UnresolvedBuild {
                build_id: build.id,
                reason: "build has no start timestamp",
            });
        }
        Ok(self.storage.prev_good_build(build)?)
    }

    pub fn ancestors_and_self(&self, change_id: ChangeId) -> Result<ChangeSet> {
        Ok(self.storage.ancestors_and_self(change_id)?)
    }

    pub fn descendants_and_self(&self, change_id: ChangeId) -> Result<ChangeSet> {
        Ok(self.storage.descendants_and_self(change_id)?)
    }

    /// The changes first introduced by `build`: the ancestry of its last
    /// change minus the ancestry of the previous good build's last change.
    ///
    /// Fails with [`QueryError::UnresolvedBuild`] if `build` has no last
    /// change yet.
    pub fn changes_introduced_by(&self, build: &Build) -> Result<ChangeSet> {
        Ok(self.resolve(build)?.1)
    }

    /// Alias of [`changes_introduced_by`](Self::changes_introduced_by).
    pub fn changes_included(&self, build: &Build) -> Result<ChangeSet> {
        self.changes_introduced_by(build)
    }

    /// Resolves `build` and bundles the result with its baseline.
    pub fn build_report(&self, build: &Build) -> Result<BuildReport> {
        let (previous, introduced) = self.resolve(build)?;
        Ok(BuildReport {
            build: build.clone(),
            previous,
            introduced,
        })
    }

    /// Returns the baseline build (if any) and the introduced change set.
    fn resolve(&self, build: &Build) -> Result<(Option<Build>, ChangeSet)> {
        let Some(last_change_id) = build.last_change_id else {
            return Err(QueryError::UnresolvedBuild {
                build_id: build.id,
                reason: "no last change recorded",
            });
        };

        let current = self.ancestors_and_self(last_change_id)?;

        let Some(baseline) = self.baseline(build)? else {
            debug!(build_id = build.id, changes = current.len(), "no previous good build");
            return Ok((None, current));
        };
        let Some(baseline_change) = baseline.last_change_id else {
            // baseline() only returns builds with a last change.
            return Ok((Some(baseline), current));
        };

        let previous = self.ancestors_and_self(baseline_change)?;
        let introduced = current.difference(&previous);
        debug!(
            build_id = build.id,
            baseline_id = baseline.id,
            changes = introduced.len(),
            "resolved introduced changes"
        );
        Ok((Some(baseline), introduced))
    }

    /// The nearest earlier good build that has a last change. Good builds
    /// the harvester never attached a change to are skipped.
    fn baseline(&self, build: &Build) -> Result<Option<Build>> {
        let mut candidate = self.prev_good_build(build)?;
        while let Some(prev) = candidate {
            if prev.last_change_id.is_some() {
                return Ok(Some(prev));
            }
            warn!(
                build_id = build.id,
                skipped = prev.id,
                "previous good build has no last change; looking further back"
            );
            candidate = self.storage.prev_good_build(&prev)?;
        }
        Ok(None)
    }
}

impl std::fmt::Debug for ProvenanceResolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvenanceResolver").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use harvest_core::build::BuildBuilder;
    use harvest_core::catalog::IntegrationTypeId;
    use harvest_core::change::ChangeBuilder;
    use harvest_core::enums::{BuildStatus, Scm};
    use harvest_core::repository::BranchId;
    use harvest_storage::SqliteStore;
    use pretty_assertions::assert_eq;

    struct Fixture {
        store: SqliteStore,
        branch: BranchId,
        project: ProjectId,
        jenkins: IntegrationTypeId,
    }

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    impl Fixture {
        fn new() -> Self {
            let store = SqliteStore::open_in_memory().unwrap();
            let repo = store.ensure_repository("R", "git@example.com:r.git", Scm::Git).unwrap();
            let branch = store.ensure_branch(repo.id, "B").unwrap().id;
            let project = store.ensure_project("P").unwrap().id;
            let jenkins = store.ensure_integration_type("Jenkins", "JNK", "").unwrap().id;
            Self {
                store,
                branch,
                project,
                jenkins,
            }
        }

        fn change(&self, rev: &str, minutes: i64, parent: Option<ChangeId>) -> ChangeId {
            let mut b = ChangeBuilder::new(self.branch, rev)
                .summary(rev)
                .author("dev")
                .timestamp(at(minutes));
            if let Some(p) = parent {
                b = b.parent(p);
            }
            self.store.record_change(&b.build()).unwrap().id
        }

        fn build(&self, ci: &str, minutes: i64, last: Option<ChangeId>) -> Build {
            let mut b = BuildBuilder::new(self.project, self.jenkins, ci)
                .status(BuildStatus::Passed)
                .started(at(minutes));
            if let Some(c) = last {
                b = b.last_change(c);
            }
            self.store.record_build(&b.build()).unwrap()
        }
    }

    #[test]
    fn linear_history_scenario() {
        let f = Fixture::new();
        let c1 = f.change("c1", 0, None);
        let c2 = f.change("c2", 1, Some(c1));
        let c3 = f.change("c3", 2, Some(c2));
        let b1 = f.build("1", 10, Some(c2));
        let b2 = f.build("2", 20, Some(c3));

        let r = ProvenanceResolver::new(&f.store);
        assert_eq!(r.last_good_build(Some(f.project)).unwrap().unwrap().id, b2.id);
        assert_eq!(r.prev_good_build(&b2).unwrap().unwrap().id, b1.id);
        assert_eq!(r.changes_introduced_by(&b2).unwrap().ids(), vec![c3]);
    }

    #[test]
    fn first_build_introduces_full_ancestry() {
        let f = Fixture::new();
        let c1 = f.change("c1", 0, None);
        let c2 = f.change("c2", 1, Some(c1));
        let b1 = f.build("1", 10, Some(c2));

        let r = ProvenanceResolver::new(&f.store);
        let introduced = r.changes_introduced_by(&b1).unwrap();
        assert_eq!(introduced, r.ancestors_and_self(c2).unwrap());
        assert_eq!(introduced.ids(), vec![c1, c2]);
    }

    #[test]
    fn merged_changes_are_attributed_once() {
        let f = Fixture::new();
        let c1 = f.change("c1", 0, None);
        let c4 = f.change("c4", 1, None);
        let c2 = f
            .store
            .record_change(
                &ChangeBuilder::new(f.branch, "c2")
                    .summary("c2")
                    .author("dev")
                    .timestamp(at(2))
                    .parent(c1)
                    .merged_from(c4)
                    .build(),
            )
            .unwrap()
            .id;
        let c3 = f.change("c3", 3, Some(c2));
        f.store.add_merge(c4, c3).unwrap();

        let b1 = f.build("1", 10, Some(c2));
        let b2 = f.build("2", 20, Some(c3));
        let r = ProvenanceResolver::new(&f.store);

        assert_eq!(r.changes_introduced_by(&b1).unwrap().ids(), vec![c1, c4, c2]);
        // c4 already shipped with b1 through its merge into c2.
        assert_eq!(r.changes_introduced_by(&b2).unwrap().ids(), vec![c3]);

        let desc = r.descendants_and_self(c4).unwrap();
        assert!(desc.contains(c2) && desc.contains(c3));

        // The baseline's history never reaches forward to later changes.
        assert!(!r.ancestors_and_self(c2).unwrap().contains(c3));
        assert!(!r.descendants_and_self(c3).unwrap().contains(c2));
        for a in [c1, c2, c3, c4] {
            for b in [c1, c2, c3, c4] {
                assert_eq!(
                    r.ancestors_and_self(b).unwrap().contains(a),
                    r.descendants_and_self(a).unwrap().contains(b),
                    "{a} in ancestors({b}) vs {b} in descendants({a})"
                );
            }
        }
    }

    #[test]
    fn unresolved_build_is_distinct_from_empty() {
        let f = Fixture::new();
        let c1 = f.change("c1", 0, None);
        f.build("1", 10, Some(c1));
        let pending = f.build("2", 20, None);
        let same = f.build("3", 30, Some(c1));

        let r = ProvenanceResolver::new(&f.store);
        let err = r.changes_introduced_by(&pending).unwrap_err();
        assert!(err.is_unresolved());

        // Rebuilding the same change introduces nothing, which is not an error.
        assert!(r.changes_introduced_by(&same).unwrap().is_empty());
    }

    #[test]
    fn baseline_skips_good_builds_without_change() {
        let f = Fixture::new();
        let c1 = f.change("c1", 0, None);
        let c2 = f.change("c2", 1, Some(c1));
        let b1 = f.build("1", 10, Some(c1));
        f.build("2", 20, None);
        let b3 = f.build("3", 30, Some(c2));

        let r = ProvenanceResolver::new(&f.store);
        let report = r.build_report(&b3).unwrap();
        assert_eq!(report.previous.map(|b| b.id), Some(b1.id));
        assert_eq!(report.introduced.ids(), vec![c2]);
    }

    #[test]
    fn report_matches_individual_queries() {
        let f = Fixture::new();
        let c1 = f.change("c1", 0, None);
        let c2 = f.change("c2", 1, Some(c1));
        let b1 = f.build("1", 10, Some(c1));
        let b2 = f.build("2", 20, Some(c2));

        let r = ProvenanceResolver::new(&f.store);
        let report = r.build_report(&b2).unwrap();
        assert_eq!(report.build, b2);
        assert_eq!(report.previous.unwrap().id, b1.id);
        assert_eq!(report.introduced, r.changes_included(&b2).unwrap());
    }

    #[test]
    fn unstarted_build_is_unresolved() {
        let f = Fixture::new();
        let c1 = f.change("c1", 0, None);
        let b = f
            .store
            .record_build(&BuildBuilder::new(f.project, f.jenkins, "q").last_change(c1).build())
            .unwrap();
        let r = ProvenanceResolver::new(&f.store);
        assert!(r.changes_introduced_by(&b).unwrap_err().is_unresolved());
    }

    #[test]
    fn last_good_is_monotonic() {
        let f = Fixture::new();
        let c1 = f.change("c1", 0, None);
        let r = ProvenanceResolver::new(&f.store);
        for (i, minutes) in [10, 20, 30].into_iter().enumerate() {
            let b = f.build(&format!("b{i}"), minutes, Some(c1));
            assert_eq!(r.last_good_build(Some(f.project)).unwrap().unwrap().id, b.id);
        }
    }

    #[test]
    fn closure_queries_are_idempotent() {
        let f = Fixture::new();
        let c1 = f.change("c1", 0, None);
        let c2 = f.change("c2", 1, Some(c1));
        let r = ProvenanceResolver::new(&f.store);
        assert_eq!(r.ancestors_and_self(c2).unwrap(), r.ancestors_and_self(c2).unwrap());
    }
}
