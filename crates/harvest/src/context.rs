//! Runtime context for command execution.
//!
//! The [`RuntimeContext`] holds what every command handler needs: the
//! discovered `.harvest/` directory, the effective configuration, and the
//! global output flags.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use harvest_config::{HarvestConfig, find_harvest_dir, load_config};
use harvest_storage::{SqliteStore, StoreOptions};

use crate::cli::GlobalArgs;

/// Runtime context passed to every command handler.
///
/// Constructed once in `main` after CLI parsing, before command dispatch.
#[derive(Debug)]
pub struct RuntimeContext {
    /// The `.harvest/` directory, if one was found.
    pub harvest_dir: Option<PathBuf>,

    /// Effective configuration (defaults when no directory was found).
    pub config: HarvestConfig,

    /// Explicit `--db` override.
    pub db_override: Option<PathBuf>,

    /// Whether to produce JSON output.
    pub json: bool,

    /// Verbose output.
    pub verbose: bool,

    /// Quiet mode: suppress non-essential output.
    pub quiet: bool,
}

impl RuntimeContext {
    /// Build a `RuntimeContext` from parsed global arguments.
    ///
    /// A broken `config.yaml` is an error; a missing `.harvest/` is not,
    /// since `init` and `version` run without one.
    pub fn from_global_args(global: &GlobalArgs) -> Result<Self> {
        let cwd = env::current_dir().context("failed to get current directory")?;
        let harvest_dir = find_harvest_dir(&cwd);

        let config = match &harvest_dir {
            Some(dir) => load_config(dir)
                .with_context(|| format!("failed to load {}", dir.join("config.yaml").display()))?,
            None => HarvestConfig::default(),
        };

        Ok(Self {
            json: global.json || config.json,
            harvest_dir,
            config,
            db_override: global.db.as_ref().map(PathBuf::from),
            verbose: global.verbose,
            quiet: global.quiet,
        })
    }

    /// The `.harvest/` directory, or an error telling the user to run `init`.
    pub fn require_harvest_dir(&self) -> Result<&PathBuf> {
        self.harvest_dir
            .as_ref()
            .context("no .harvest directory found. Run 'harvest init' to create one.")
    }

    /// Resolves the database file: `--db` first, then the configured name.
    pub fn database_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.db_override {
            return Ok(path.clone());
        }
        let dir = self.require_harvest_dir()?;
        Ok(self.config.database_path(dir))
    }

    pub fn store_options(&self) -> StoreOptions {
        store_options(&self.config)
    }

    /// Opens the existing database with the configured options.
    pub fn open_store(&self) -> Result<SqliteStore> {
        let db_path = self.database_path()?;
        if !db_path.exists() {
            bail!(
                "no harvest database found at {}\nHint: run 'harvest init' to create one",
                db_path.display()
            );
        }
        SqliteStore::open_with(&db_path, self.store_options())
            .with_context(|| format!("failed to open database: {}", db_path.display()))
    }
}

/// Store tuning derived from the `closure` and `ledger` sections.
pub fn store_options(config: &HarvestConfig) -> StoreOptions {
    StoreOptions {
        max_closure_nodes: config.closure.max_nodes,
        merge_traversal: config.closure.merge_traversal,
        page_size: config.ledger.page_size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harvest_core::enums::MergeTraversal;

    fn context(config: HarvestConfig) -> RuntimeContext {
        RuntimeContext {
            harvest_dir: Some(PathBuf::from("/work/.harvest")),
            config,
            db_override: None,
            json: false,
            verbose: false,
            quiet: false,
        }
    }

    #[test]
    fn store_options_follow_config() {
        let mut config = HarvestConfig::default();
        config.closure.max_nodes = 12;
        config.closure.merge_traversal = MergeTraversal::Symmetric;
        config.ledger.page_size = 3;

        let options = context(config).store_options();
        assert_eq!(options.max_closure_nodes, 12);
        assert_eq!(options.merge_traversal, MergeTraversal::Symmetric);
        assert_eq!(options.page_size, 3);
    }

    #[test]
    fn db_override_wins() {
        let mut ctx = context(HarvestConfig::default());
        assert_eq!(
            ctx.database_path().unwrap(),
            PathBuf::from("/work/.harvest/harvest.db")
        );
        ctx.db_override = Some(PathBuf::from("/tmp/other.db"));
        assert_eq!(ctx.database_path().unwrap(), PathBuf::from("/tmp/other.db"));
    }

    #[test]
    fn missing_dir_is_reported() {
        let mut ctx = context(HarvestConfig::default());
        ctx.harvest_dir = None;
        let err = ctx.database_path().unwrap_err();
        assert!(err.to_string().contains("harvest init"));
    }
}
