//! Output formatting helpers for the `harvest` CLI.
//!
//! JSON output, table formatting, and detailed views of changes and builds.

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::{self, Write};

use harvest_core::build::Build;
use harvest_core::change::Change;
use harvest_ui::styles::{render_build_status, render_category, short_revision};

/// Print a value as pretty-printed JSON to stdout.
pub fn output_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize JSON")?;
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    // Ignore broken pipe errors (e.g., piped to `head`)
    let _ = writeln!(handle, "{json}");
    Ok(())
}

/// Print a simple table with headers and rows.
///
/// Column widths are computed from the data for alignment. Nothing is
/// printed for an empty table.
pub fn output_table(headers: &[&str], rows: &[Vec<String>]) {
    if rows.is_empty() {
        return;
    }

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
    }

    let stdout = io::stdout();
    let mut handle = stdout.lock();

    let header: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    let _ = writeln!(handle, "{}", format_row(&header, &widths));
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(handle, "{}", format_row(&rule, &widths));
    for row in rows {
        let _ = writeln!(handle, "{}", format_row(row, &widths));
    }
}

fn format_row(cells: &[String], widths: &[usize]) -> String {
    let mut line = String::new();
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            line.push_str("  ");
        }
        match widths.get(i) {
            Some(width) if i + 1 < cells.len() => {
                line.push_str(&format!("{cell:<width$}"));
            }
            _ => line.push_str(cell),
        }
    }
    line
}

/// Row for change listings: id, revision, author, timestamp, summary.
pub fn format_change_row(change: &Change) -> Vec<String> {
    vec![
        change.id.to_string(),
        short_revision(&change.revision).to_string(),
        change.author.clone(),
        change.timestamp.format("%Y-%m-%d %H:%M").to_string(),
        change.summary.clone(),
    ]
}

pub const CHANGE_HEADERS: &[&str] = &["ID", "REVISION", "AUTHOR", "TIME", "SUMMARY"];

/// Row for build listings: id, CI id, status, started, last change, variant.
pub fn format_build_row(build: &Build) -> Vec<String> {
    vec![
        build.id.to_string(),
        build.ci_build_id.clone(),
        build.status.map_or("-", |s| s.as_str()).to_string(),
        build
            .started
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string()),
        build
            .last_change_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string()),
        build.variant.label().to_string(),
    ]
}

pub const BUILD_HEADERS: &[&str] = &["ID", "CI ID", "STATUS", "STARTED", "LAST CHANGE", "VARIANT"];

/// Multi-line view of a change.
pub fn format_change_detail(change: &Change) -> String {
    let mut lines = vec![
        format!("#{} {}", change.id, change.revision),
        format!("Author: {}", change.author),
        format!("Date:   {}", change.timestamp.to_rfc3339()),
        format!("Branch: {}", change.branch_id),
    ];
    if let Some(parent) = change.parent_id {
        lines.push(format!("Parent: #{parent}"));
    }
    lines.push(String::new());
    lines.push(format!("    {}", change.summary));
    if !change.description.is_empty() {
        lines.push(String::new());
        for line in change.description.lines() {
            lines.push(format!("    {line}"));
        }
    }
    lines.join("\n")
}

/// Multi-line view of a build.
pub fn format_build_detail(build: &Build) -> String {
    let fmt_time = |t: Option<chrono::DateTime<chrono::Utc>>| {
        t.map(|t| t.to_rfc3339()).unwrap_or_else(|| "-".to_string())
    };
    let mut lines = vec![
        format!("{} #{} (CI id {})", render_category("build"), build.id, build.ci_build_id),
        format!("Status:      {}", render_build_status(build.status)),
        format!("Project:     {}", build.project_id),
        format!("Integration: {}", build.integration_type_id),
    ];
    if let Some(platform) = build.platform_id {
        lines.push(format!("Platform:    {platform}"));
    }
    lines.push(format!("Started:     {}", fmt_time(build.started)));
    lines.push(format!("Finished:    {}", fmt_time(build.finished)));
    lines.push(format!(
        "Last change: {}",
        build
            .last_change_id
            .map(|id| format!("#{id}"))
            .unwrap_or_else(|| "-".to_string())
    ));
    lines.push(format!("Variant:     {}", build.variant.label()));
    lines.push(format!("Harvested:   {} (updated {})", build.created.to_rfc3339(), build.modified.to_rfc3339()));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use harvest_core::build::BuildVariant;
    use harvest_core::enums::BuildStatus;
    use pretty_assertions::assert_eq;

    fn change() -> Change {
        Change {
            id: 4,
            revision: "0123456789abcdef".into(),
            branch_id: 2,
            summary: "Bump toolchain".into(),
            description: "line one\nline two".into(),
            author: "bob".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 2, 3, 4, 5, 6).unwrap(),
            parent_id: Some(3),
        }
    }

    fn build() -> Build {
        let at = Utc.with_ymd_and_hms(2024, 2, 3, 5, 0, 0).unwrap();
        Build {
            id: 9,
            project_id: 1,
            integration_type_id: 2,
            ci_build_id: "77".into(),
            platform_id: None,
            status: Some(BuildStatus::Failed),
            started: Some(at),
            finished: None,
            created: at,
            modified: at,
            last_change_id: Some(4),
            variant: BuildVariant::Generic,
        }
    }

    #[test]
    fn change_row_columns() {
        let row = format_change_row(&change());
        assert_eq!(row.len(), CHANGE_HEADERS.len());
        assert_eq!(row[0], "4");
        assert_eq!(row[1], "0123456789");
        assert_eq!(row[4], "Bump toolchain");
    }

    #[test]
    fn build_row_columns() {
        let mut b = build();
        let row = format_build_row(&b);
        assert_eq!(row.len(), BUILD_HEADERS.len());
        assert_eq!(row[2], "FAILED");
        assert_eq!(row[4], "4");

        b.status = None;
        b.last_change_id = None;
        let row = format_build_row(&b);
        assert_eq!(row[2], "-");
        assert_eq!(row[4], "-");
    }

    #[test]
    fn change_detail_includes_parent_and_description() {
        let text = format_change_detail(&change());
        assert!(text.contains("Parent: #3"));
        assert!(text.contains("    line two"));
    }

    #[test]
    fn build_detail_includes_fields() {
        let text = format_build_detail(&build());
        assert!(text.contains("CI id 77"));
        assert!(text.contains("Last change: #4"));
        assert!(text.contains("Finished:    -"));
    }

    #[test]
    fn last_column_is_not_padded() {
        let widths = [4, 6];
        let row = format_row(&["a".into(), "b".into()], &widths);
        assert_eq!(row, "a     b");
    }
}
