//! Configuration management for the build harvest system.
//!
//! This crate handles loading and saving `.harvest/config.yaml` files,
//! discovering `.harvest/` directories in the filesystem, and providing
//! typed access to harvest configuration values.

pub mod config;
pub mod harvest_dir;

pub use config::{
    ClosureConfig, ConfigError, HarvestConfig, LedgerConfig, load_config, load_config_file,
    save_config,
};
pub use harvest_dir::{ensure_harvest_dir, find_harvest_dir, find_harvest_dir_or_error};
