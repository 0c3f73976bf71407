//! `harvest init` -- create a `.harvest` directory and database.

use std::env;
use std::fs;

use anyhow::{Context, Result, bail};
use tracing::info;

use harvest_config::{HarvestConfig, ensure_harvest_dir, load_config, save_config};
use harvest_storage::{SqliteStore, Storage};

use crate::cli::InitArgs;
use crate::context::{RuntimeContext, store_options};
use crate::output::output_json;

/// Default gitignore content for the `.harvest` directory.
const GITIGNORE_CONTENT: &str = r#"# Harvest database files
*.db
*.db-journal
*.db-wal
*.db-shm
"#;

/// Execute the `harvest init` command.
pub fn run(ctx: &RuntimeContext, args: &InitArgs) -> Result<()> {
    let cwd = env::current_dir().context("failed to get current directory")?;
    let harvest_dir = ensure_harvest_dir(&cwd)
        .with_context(|| format!("failed to create .harvest in {}", cwd.display()))?;

    let config_path = harvest_dir.join("config.yaml");
    if !config_path.exists() {
        save_config(&harvest_dir, &HarvestConfig::default())
            .with_context(|| format!("failed to write {}", config_path.display()))?;
    }
    let config = load_config(&harvest_dir)?;

    let db_path = match &ctx.db_override {
        Some(path) => path.clone(),
        None => config.database_path(&harvest_dir),
    };
    if !args.force && db_path.exists() {
        bail!(
            "found existing database at {}\n\n\
            This directory is already initialized. Use --force to re-apply the\n\
            schema to the existing database (recorded data is kept).",
            db_path.display()
        );
    }

    let gitignore_path = harvest_dir.join(".gitignore");
    if !gitignore_path.exists() {
        fs::write(&gitignore_path, GITIGNORE_CONTENT).with_context(|| {
            format!("failed to create .gitignore: {}", gitignore_path.display())
        })?;
    }

    let store = SqliteStore::open_with(&db_path, store_options(&config))
        .with_context(|| format!("failed to create database: {}", db_path.display()))?;
    let initialized_at = chrono::Utc::now().to_rfc3339();
    store.run_in_transaction(&|tx| {
        tx.set_metadata("harvest_version", env!("CARGO_PKG_VERSION"))?;
        tx.set_metadata("initialized_at", &initialized_at)
    })?;
    info!(path = %db_path.display(), "initialized harvest database");

    if ctx.json {
        output_json(&serde_json::json!({
            "harvest_dir": harvest_dir,
            "database": db_path,
        }))?;
    } else if !ctx.quiet {
        println!("harvest initialized");
        println!("  Directory: {}", harvest_dir.display());
        println!("  Database:  {}", db_path.display());
        println!();
        println!("Register a repository with `harvest repo add <name> <url>` to get started.");
    }

    Ok(())
}
