//! `harvest project`, `harvest platform` and `harvest integration`.

use anyhow::Result;

use harvest_storage::Storage;

use crate::cli::{IntegrationArgs, IntegrationCommands, NameArgs, NameCommands};
use crate::context::RuntimeContext;
use crate::output::{output_json, output_table};

pub fn run_project(ctx: &RuntimeContext, args: &NameArgs) -> Result<()> {
    let store = ctx.open_store()?;

    match &args.command {
        NameCommands::Add { name } => {
            let project = store.ensure_project(name)?;
            if ctx.json {
                output_json(&project)?;
            } else if !ctx.quiet {
                println!("Project #{} {}", project.id, project.name);
            }
        }
        NameCommands::List => {
            let projects = store.list_projects()?;
            if ctx.json {
                output_json(&projects)?;
            } else {
                let rows: Vec<Vec<String>> = projects
                    .iter()
                    .map(|p| vec![p.id.to_string(), p.name.clone()])
                    .collect();
                output_table(&["ID", "NAME"], &rows);
            }
        }
    }
    Ok(())
}

pub fn run_platform(ctx: &RuntimeContext, args: &NameArgs) -> Result<()> {
    let store = ctx.open_store()?;

    match &args.command {
        NameCommands::Add { name } => {
            let platform = store.ensure_platform(name)?;
            if ctx.json {
                output_json(&platform)?;
            } else if !ctx.quiet {
                println!("Platform #{} {}", platform.id, platform.name);
            }
        }
        NameCommands::List => {
            let platforms = store.list_platforms()?;
            if ctx.json {
                output_json(&platforms)?;
            } else {
                let rows: Vec<Vec<String>> = platforms
                    .iter()
                    .map(|p| vec![p.id.to_string(), p.name.clone()])
                    .collect();
                output_table(&["ID", "NAME"], &rows);
            }
        }
    }
    Ok(())
}

pub fn run_integration(ctx: &RuntimeContext, args: &IntegrationArgs) -> Result<()> {
    let store = ctx.open_store()?;

    match &args.command {
        IntegrationCommands::Add {
            name,
            abbrev,
            description,
        } => {
            let integration = store.ensure_integration_type(name, abbrev, description)?;
            if ctx.json {
                output_json(&integration)?;
            } else if !ctx.quiet {
                println!(
                    "Integration #{} {} ({})",
                    integration.id, integration.name, integration.abbrev
                );
            }
        }
        IntegrationCommands::List => {
            let integrations = store.list_integration_types()?;
            if ctx.json {
                output_json(&integrations)?;
            } else {
                let rows: Vec<Vec<String>> = integrations
                    .iter()
                    .map(|i| {
                        vec![
                            i.id.to_string(),
                            i.name.clone(),
                            i.abbrev.clone(),
                            i.description.clone(),
                        ]
                    })
                    .collect();
                output_table(&["ID", "NAME", "ABBREV", "DESCRIPTION"], &rows);
            }
        }
    }
    Ok(())
}
