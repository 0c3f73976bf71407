//! Lazy, paged iteration over good builds.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use harvest_core::build::{Build, BuildId};
use harvest_core::catalog::ProjectId;

use crate::error::Result;
use crate::traits::Storage;

/// Position of a build in the good-build order: `(started, id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct BuildCursor {
    pub started: DateTime<Utc>,
    pub id: BuildId,
}

impl BuildCursor {
    /// Cursor for `build`, or `None` if it has no start timestamp.
    pub fn of(build: &Build) -> Option<Self> {
        build.started.map(|started| Self {
            started,
            id: build.id,
        })
    }
}

/// Good builds ordered by `started` ascending, ties broken by ascending id.
///
/// Rows are fetched one page at a time with keyset pagination, so builds
/// recorded while iterating after the current position are still yielded.
/// The first error ends the sequence.
pub struct GoodBuilds<'a> {
    storage: &'a dyn Storage,
    project_id: Option<ProjectId>,
    page_size: usize,
    cursor: Option<BuildCursor>,
    buffer: VecDeque<Build>,
    exhausted: bool,
}

impl<'a> GoodBuilds<'a> {
    pub fn new(storage: &'a dyn Storage, project_id: Option<ProjectId>, page_size: usize) -> Self {
        Self {
            storage,
            project_id,
            page_size: page_size.max(1),
            cursor: None,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    /// Starts the sequence again from the oldest good build.
    pub fn restart(&mut self) {
        self.cursor = None;
        self.buffer.clear();
        self.exhausted = false;
    }

    fn fill(&mut self) -> Result<()> {
        let page = self
            .storage
            .good_builds_page(self.project_id, self.cursor, self.page_size)?;
        if page.len() < self.page_size {
            self.exhausted = true;
        }
        if let Some(last) = page.last() {
            self.cursor = BuildCursor::of(last);
        }
        self.buffer.extend(page);
        Ok(())
    }
}

impl Iterator for GoodBuilds<'_> {
    type Item = Result<Build>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.exhausted {
            if let Err(e) = self.fill() {
                self.exhausted = true;
                return Some(Err(e));
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}

impl std::fmt::Debug for GoodBuilds<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoodBuilds")
            .field("project_id", &self.project_id)
            .field("page_size", &self.page_size)
            .field("cursor", &self.cursor)
            .field("buffered", &self.buffer.len())
            .field("exhausted", &self.exhausted)
            .finish()
    }
}
