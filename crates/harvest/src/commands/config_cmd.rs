//! `harvest config` -- show, get and set `.harvest/config.yaml` values.
//!
//! `show` and `get` report the effective configuration, including
//! `HARVEST_*` environment overrides. `set` writes the file.

use anyhow::{Context, Result, bail};

use harvest_config::{HarvestConfig, load_config_file, save_config};

use crate::cli::{ConfigArgs, ConfigCommands};
use crate::context::RuntimeContext;
use crate::output::output_json;

/// Execute the `harvest config` command.
pub fn run(ctx: &RuntimeContext, args: &ConfigArgs) -> Result<()> {
    match &args.command {
        ConfigCommands::Show => {
            if ctx.json {
                output_json(&ctx.config)?;
            } else {
                let yaml = ctx.config.to_yaml().context("failed to render configuration")?;
                print!("{yaml}");
            }
        }

        ConfigCommands::Get { key } => {
            let Some(value) = ctx.config.get(key) else {
                bail!(
                    "unknown config key '{key}' (expected one of: {})",
                    HarvestConfig::KEYS.join(", ")
                );
            };
            if ctx.json {
                output_json(&serde_json::json!({ "key": key, "value": value }))?;
            } else {
                println!("{value}");
            }
        }

        ConfigCommands::Set { key, value } => {
            let harvest_dir = ctx.require_harvest_dir()?;
            // Environment overrides must not end up in the file.
            let mut config = load_config_file(harvest_dir)?;
            config.set(key, value)?;
            save_config(harvest_dir, &config)?;

            if ctx.json {
                output_json(&serde_json::json!({ "key": key, "value": value }))?;
            } else if !ctx.quiet {
                println!("Set {key} = {value}");
            }
        }
    }

    Ok(())
}
