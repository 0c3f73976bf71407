//! `harvest issue` -- tracker references resolved by changes.

use anyhow::Result;

use harvest_core::issue::Issue;
use harvest_storage::Storage;

use crate::cli::{IssueArgs, IssueCommands};
use crate::context::RuntimeContext;
use crate::output::{output_json, output_table};

pub fn run(ctx: &RuntimeContext, args: &IssueArgs) -> Result<()> {
    let store = ctx.open_store()?;

    match &args.command {
        IssueCommands::Add { code, system } => {
            let issue = store.ensure_issue(code, *system)?;
            if ctx.json {
                output_json(&issue)?;
            } else if !ctx.quiet {
                println!("Issue #{} {} ({})", issue.id, issue.tracking_code, issue.tracking_system);
            }
        }
        IssueCommands::Link { issue, change } => {
            let issue = store.link_issue(*issue, *change)?;
            if ctx.json {
                output_json(&issue)?;
            } else if !ctx.quiet {
                println!("Linked {} to change #{change}", issue.tracking_code);
            }
        }
        IssueCommands::List { change } => {
            let issues = match change {
                Some(change_id) => store.issues_for_change(*change_id)?,
                None => store.list_issues()?,
            };
            if ctx.json {
                output_json(&issues)?;
            } else if issues.is_empty() {
                println!("No issues.");
            } else {
                let rows: Vec<Vec<String>> = issues.iter().map(issue_row).collect();
                output_table(&["ID", "CODE", "SYSTEM", "CHANGE"], &rows);
            }
        }
    }
    Ok(())
}

fn issue_row(issue: &Issue) -> Vec<String> {
    vec![
        issue.id.to_string(),
        issue.tracking_code.clone(),
        issue.tracking_system.to_string(),
        issue.change_id.map_or_else(|| "-".to_string(), |id| format!("#{id}")),
    ]
}
