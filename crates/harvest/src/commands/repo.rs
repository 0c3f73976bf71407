//! `harvest repo` and `harvest branch`.

use anyhow::Result;

use harvest_storage::Storage;

use crate::cli::{BranchArgs, BranchCommands, RepoArgs, RepoCommands};
use crate::commands::find_repository;
use crate::context::RuntimeContext;
use crate::output::{output_json, output_table};

pub fn run_repo(ctx: &RuntimeContext, args: &RepoArgs) -> Result<()> {
    let store = ctx.open_store()?;

    match &args.command {
        RepoCommands::Add { name, url, scm } => {
            let repo = store.ensure_repository(name, url, *scm)?;
            if ctx.json {
                output_json(&repo)?;
            } else if !ctx.quiet {
                println!("Repository #{} {} ({}, {})", repo.id, repo.name, repo.scm, repo.url);
            }
        }
        RepoCommands::List => {
            let repos = store.list_repositories()?;
            if ctx.json {
                output_json(&repos)?;
            } else if repos.is_empty() {
                println!("No repositories registered.");
            } else {
                let rows: Vec<Vec<String>> = repos
                    .iter()
                    .map(|r| vec![r.id.to_string(), r.name.clone(), r.scm.to_string(), r.url.clone()])
                    .collect();
                output_table(&["ID", "NAME", "SCM", "URL"], &rows);
            }
        }
    }
    Ok(())
}

pub fn run_branch(ctx: &RuntimeContext, args: &BranchArgs) -> Result<()> {
    let store = ctx.open_store()?;

    match &args.command {
        BranchCommands::Add { repo, name } => {
            let repository = find_repository(&store, repo)?;
            let branch = store.ensure_branch(repository.id, name)?;
            if ctx.json {
                output_json(&branch)?;
            } else if !ctx.quiet {
                println!("Branch #{} {}/{}", branch.id, repository.name, branch.name);
            }
        }
        BranchCommands::List { repo } => {
            let repository = find_repository(&store, repo)?;
            let branches = store.list_branches(repository.id)?;
            if ctx.json {
                output_json(&branches)?;
            } else if branches.is_empty() {
                println!("No branches in {}.", repository.name);
            } else {
                let rows: Vec<Vec<String>> = branches
                    .iter()
                    .map(|b| vec![b.id.to_string(), b.name.clone()])
                    .collect();
                output_table(&["ID", "NAME"], &rows);
            }
        }
    }
    Ok(())
}
