//! `harvest stats` -- row counts across the graph and the ledger.

use anyhow::Result;

use harvest_storage::Storage;
use harvest_ui::styles::{render_build_status, render_category};

use crate::context::RuntimeContext;
use crate::output::output_json;

/// Execute the `harvest stats` command.
pub fn run(ctx: &RuntimeContext) -> Result<()> {
    let store = ctx.open_store()?;
    let stats = store.get_statistics()?;

    if ctx.json {
        return output_json(&stats);
    }

    println!("{}", render_category("change graph"));
    println!("  Repositories: {}", stats.repositories);
    println!("  Branches:     {}", stats.branches);
    println!("  Changes:      {}", stats.changes);
    println!("  Merges:       {}", stats.merges);
    println!("  Issues:       {}", stats.issues);
    println!();
    println!("{}", render_category("build ledger"));
    println!("  Projects:     {}", stats.projects);
    println!("  Builds:       {}", stats.builds);
    println!("  Good builds:  {}", stats.good_builds);
    if !stats.by_status.is_empty() {
        println!();
        println!("{}", render_category("by status"));
        for (status, count) in &stats.by_status {
            let label = status.parse().ok();
            println!("  {:<8} {count}", render_build_status(label));
        }
    }
    Ok(())
}
