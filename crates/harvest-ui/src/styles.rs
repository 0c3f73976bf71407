//! Ayu color theme and styling functions for harvest CLI output.
//!
//! Uses the Ayu Dark color palette. Color source:
//! <https://github.com/ayu-theme/ayu-colors>
//!
//! Only build outcomes get color; changes use standard text with a muted
//! revision prefix. Small Unicode symbols for icons, not emoji.

use harvest_core::build::Build;
use harvest_core::change::Change;
use harvest_core::enums::BuildStatus;
use owo_colors::OwoColorize;

use crate::terminal::supports_color;

// ---------------------------------------------------------------------------
// Ayu Dark color palette (RGB values)
// ---------------------------------------------------------------------------

const PASS: (u8, u8, u8) = (0xc2, 0xd9, 0x4c); // #c2d94c - bright green
const WARN: (u8, u8, u8) = (0xff, 0xb4, 0x54); // #ffb454 - bright yellow
const FAIL: (u8, u8, u8) = (0xf0, 0x71, 0x78); // #f07178 - bright red
const MUTED: (u8, u8, u8) = (0x6c, 0x76, 0x80); // #6c7680 - muted gray
const ACCENT: (u8, u8, u8) = (0x59, 0xc2, 0xff); // #59c2ff - bright blue

// ---------------------------------------------------------------------------
// Icons
// ---------------------------------------------------------------------------

pub const ICON_PASS: &str = "\u{2713}"; // ✓
pub const ICON_FAIL: &str = "\u{2716}"; // ✖
pub const ICON_SKIP: &str = "-";
pub const ICON_ABORT: &str = "\u{25A0}"; // ■
/// Build with no recorded outcome yet.
pub const ICON_PENDING: &str = "\u{25CB}"; // ○

/// Marks a merge edge in lineage listings.
pub const ICON_MERGE: &str = "\u{2442}"; // ⑂

pub const SEPARATOR_LIGHT: &str = "\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}";

// ---------------------------------------------------------------------------
// Helper: apply truecolor only when color is supported
// ---------------------------------------------------------------------------

fn color_str(s: &str, rgb: (u8, u8, u8)) -> String {
    if supports_color() {
        s.truecolor(rgb.0, rgb.1, rgb.2).to_string()
    } else {
        s.to_string()
    }
}

fn color_bold_str(s: &str, rgb: (u8, u8, u8)) -> String {
    if supports_color() {
        s.truecolor(rgb.0, rgb.1, rgb.2).bold().to_string()
    } else {
        s.to_string()
    }
}

// ---------------------------------------------------------------------------
// Core semantic render helpers
// ---------------------------------------------------------------------------

pub fn render_pass(s: &str) -> String {
    color_str(s, PASS)
}

pub fn render_warn(s: &str) -> String {
    color_str(s, WARN)
}

pub fn render_fail(s: &str) -> String {
    color_str(s, FAIL)
}

pub fn render_muted(s: &str) -> String {
    color_str(s, MUTED)
}

pub fn render_accent(s: &str) -> String {
    color_str(s, ACCENT)
}

pub fn render_bold(s: &str) -> String {
    if supports_color() {
        s.bold().to_string()
    } else {
        s.to_string()
    }
}

/// Renders a section header in uppercase with accent color and bold.
pub fn render_category(s: &str) -> String {
    color_bold_str(&s.to_uppercase(), ACCENT)
}

pub fn render_separator() -> String {
    render_muted(SEPARATOR_LIGHT)
}

// ---------------------------------------------------------------------------
// Build status rendering
// ---------------------------------------------------------------------------

/// Icon for a build outcome. `None` means the CI tool has not reported one.
pub fn build_status_icon(status: Option<BuildStatus>) -> &'static str {
    match status {
        Some(BuildStatus::Passed) => ICON_PASS,
        Some(BuildStatus::Failed) => ICON_FAIL,
        Some(BuildStatus::Skipped) => ICON_SKIP,
        Some(BuildStatus::Aborted) => ICON_ABORT,
        None => ICON_PENDING,
    }
}

fn status_color(status: Option<BuildStatus>) -> (u8, u8, u8) {
    match status {
        Some(BuildStatus::Passed) => PASS,
        Some(BuildStatus::Failed) => FAIL,
        Some(BuildStatus::Aborted) => WARN,
        Some(BuildStatus::Skipped) | None => MUTED,
    }
}

pub fn render_build_status_icon(status: Option<BuildStatus>) -> String {
    color_str(build_status_icon(status), status_color(status))
}

/// Renders a build status label, `PENDING` when none is recorded.
pub fn render_build_status(status: Option<BuildStatus>) -> String {
    let label = status.map_or("PENDING", |s| s.as_str());
    color_str(label, status_color(status))
}

// ---------------------------------------------------------------------------
// One-line summaries
// ---------------------------------------------------------------------------

/// Number of revision characters shown in one-line summaries.
pub const SHORT_REVISION: usize = 10;

/// Shortens a revision for display; Perforce changelist numbers stay whole.
pub fn short_revision(revision: &str) -> &str {
    match revision.char_indices().nth(SHORT_REVISION) {
        Some((idx, _)) => &revision[..idx],
        None => revision,
    }
}

/// Format: `#ID revision summary (author, timestamp)`.
pub fn render_change_line(change: &Change) -> String {
    format!(
        "#{} {} {} {}",
        change.id,
        render_accent(short_revision(&change.revision)),
        change.summary,
        render_muted(&format!(
            "({}, {})",
            change.author,
            change.timestamp.format("%Y-%m-%d %H:%M")
        )),
    )
}

/// Format: `icon #ID ci-id [variant] STATUS started`.
pub fn render_build_line(build: &Build) -> String {
    let started = build
        .started
        .map_or_else(|| "not started".to_string(), |t| t.format("%Y-%m-%d %H:%M").to_string());
    format!(
        "{} #{} {} [{}] {} {}",
        render_build_status_icon(build.status),
        build.id,
        render_bold(&build.ci_build_id),
        build.variant.label(),
        render_build_status(build.status),
        render_muted(&started),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use harvest_core::build::BuildVariant;
    use pretty_assertions::assert_eq;

    fn sample_build(status: Option<BuildStatus>) -> Build {
        let at = Utc.with_ymd_and_hms(2024, 3, 4, 5, 6, 0).unwrap();
        Build {
            id: 7,
            project_id: 1,
            integration_type_id: 1,
            ci_build_id: "1042".into(),
            platform_id: None,
            status,
            started: Some(at),
            finished: None,
            created: at,
            modified: at,
            last_change_id: None,
            variant: BuildVariant::Jenkins {
                project_name: "nightly".into(),
            },
        }
    }

    #[test]
    fn every_status_has_an_icon() {
        for status in BuildStatus::ALL {
            assert_ne!(build_status_icon(Some(*status)), ICON_PENDING);
        }
        assert_eq!(build_status_icon(None), ICON_PENDING);
    }

    #[test]
    fn short_revision_cuts_long_hashes_only() {
        assert_eq!(short_revision("0123456789abcdef"), "0123456789");
        assert_eq!(short_revision("48213"), "48213");
    }

    #[test]
    fn build_line_contains_fields() {
        let line = render_build_line(&sample_build(Some(BuildStatus::Passed)));
        assert!(line.contains("#7"));
        assert!(line.contains("1042"));
        assert!(line.contains("jenkins"));
        assert!(line.contains("PASSED"));
        assert!(line.contains("2024-03-04 05:06"));
    }

    #[test]
    fn pending_build_line() {
        let mut build = sample_build(None);
        build.started = None;
        let line = render_build_line(&build);
        assert!(line.contains("PENDING"));
        assert!(line.contains("not started"));
    }

    #[test]
    fn change_line_contains_fields() {
        let change = Change {
            id: 3,
            revision: "deadbeefcafef00d".into(),
            branch_id: 1,
            summary: "Fix flaky test".into(),
            description: String::new(),
            author: "alice".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
            parent_id: None,
        };
        let line = render_change_line(&change);
        assert!(line.contains("#3"));
        assert!(line.contains("deadbeefca"));
        assert!(!line.contains("deadbeefcafef00d"));
        assert!(line.contains("Fix flaky test"));
        assert!(line.contains("alice"));
    }
}
