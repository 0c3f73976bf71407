//! `harvest change` -- record, inspect and traverse the change graph.

use anyhow::Result;
use serde::Serialize;

use harvest_core::change::{Change, ChangeBuilder, ChangeSet};
use harvest_core::issue::Issue;
use harvest_query::ProvenanceResolver;
use harvest_storage::Storage;
use harvest_ui::styles::{ICON_MERGE, render_category, render_change_line, render_muted};

use crate::cli::{ChangeAddArgs, ChangeArgs, ChangeCommands};
use crate::commands::find_branch;
use crate::context::RuntimeContext;
use crate::output::{CHANGE_HEADERS, format_change_detail, format_change_row, output_json, output_table};

/// Everything `change show` reports about one change.
#[derive(Serialize)]
struct ChangeView {
    change: Change,
    children: Vec<Change>,
    merge_sources: Vec<Change>,
    merge_targets: Vec<Change>,
    issues: Vec<Issue>,
}

pub fn run(ctx: &RuntimeContext, args: &ChangeArgs) -> Result<()> {
    let store = ctx.open_store()?;

    match &args.command {
        ChangeCommands::Add(add) => run_add(ctx, &store, add),
        ChangeCommands::Show { id } => {
            let view = ChangeView {
                change: store.get_change(*id)?,
                children: store.get_children(*id)?,
                merge_sources: store.get_merge_sources(*id)?,
                merge_targets: store.get_merge_targets(*id)?,
                issues: store.issues_for_change(*id)?,
            };
            if ctx.json {
                return output_json(&view);
            }
            println!("{}", format_change_detail(&view.change));
            print_section("children", &view.children, "");
            print_section("merged from", &view.merge_sources, ICON_MERGE);
            print_section("merged into", &view.merge_targets, ICON_MERGE);
            if !view.issues.is_empty() {
                println!();
                println!("{}", render_category("issues"));
                for issue in &view.issues {
                    println!("  {} {}", issue.tracking_code, render_muted(issue.tracking_system.as_str()));
                }
            }
            Ok(())
        }
        ChangeCommands::List { repo, branch } => {
            let branch = find_branch(&store, repo, branch)?;
            let changes = store.list_changes(branch.id)?;
            if ctx.json {
                return output_json(&changes);
            }
            if changes.is_empty() {
                println!("No changes on {}.", branch.name);
            } else {
                let rows: Vec<Vec<String>> = changes.iter().map(format_change_row).collect();
                output_table(CHANGE_HEADERS, &rows);
            }
            Ok(())
        }
        ChangeCommands::Merge { source, target } => {
            store.add_merge(*source, *target)?;
            if ctx.json {
                output_json(&serde_json::json!({ "source_id": source, "target_id": target }))?;
            } else if !ctx.quiet {
                println!("Recorded #{source} merged into #{target}");
            }
            Ok(())
        }
        ChangeCommands::Ancestors { id } => {
            let set = ProvenanceResolver::new(&store).ancestors_and_self(*id)?;
            print_change_set(ctx, &set)
        }
        ChangeCommands::Descendants { id } => {
            let set = ProvenanceResolver::new(&store).descendants_and_self(*id)?;
            print_change_set(ctx, &set)
        }
    }
}

fn run_add(ctx: &RuntimeContext, store: &dyn Storage, args: &ChangeAddArgs) -> Result<()> {
    let branch = find_branch(store, &args.repo, &args.branch)?;

    let mut builder = ChangeBuilder::new(branch.id, &args.revision)
        .summary(&args.summary)
        .description(&args.description)
        .author(&args.author);
    if let Some(timestamp) = args.timestamp {
        builder = builder.timestamp(timestamp);
    }
    if let Some(parent) = args.parent {
        builder = builder.parent(parent);
    }
    for source in &args.merged_from {
        builder = builder.merged_from(*source);
    }

    let change = store.record_change(&builder.build())?;
    if ctx.json {
        output_json(&change)?;
    } else if !ctx.quiet {
        println!("{}", render_change_line(&change));
    }
    Ok(())
}

fn print_section(title: &str, changes: &[Change], marker: &str) {
    if changes.is_empty() {
        return;
    }
    println!();
    println!("{}", render_category(title));
    for change in changes {
        if marker.is_empty() {
            println!("  {}", render_change_line(change));
        } else {
            println!("  {marker} {}", render_change_line(change));
        }
    }
}

/// Prints a closure newest first.
fn print_change_set(ctx: &RuntimeContext, set: &ChangeSet) -> Result<()> {
    let ordered = set.sorted_by_timestamp();
    if ctx.json {
        return output_json(&ordered);
    }
    let rows: Vec<Vec<String>> = ordered.into_iter().map(format_change_row).collect();
    output_table(CHANGE_HEADERS, &rows);
    if !ctx.quiet {
        println!("{}", render_muted(&format!("{} change(s)", set.len())));
    }
    Ok(())
}
