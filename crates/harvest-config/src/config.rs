//! Configuration types and loading for the build harvest system.
//!
//! The main entry point is [`HarvestConfig`], which represents the contents
//! of `.harvest/config.yaml`. [`load_config`] layers built-in defaults, the
//! YAML file, and `HARVEST_*` environment variables (later layers win).
//! [`save_config`] writes the file back.

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use harvest_core::enums::{MergeTraversal, ParseEnumError};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read or written.
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// The configuration could not be serialized to YAML.
    #[error("failed to parse config file: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// A configuration layer could not be merged or extracted.
    #[error("invalid configuration: {0}")]
    Figment(#[from] figment::Error),

    /// The `.harvest/` directory was not found.
    #[error("no .harvest directory found (run 'harvest init' first)")]
    HarvestDirNotFound,

    /// A configuration value was invalid.
    #[error("invalid configuration value for key '{key}': {reason}")]
    InvalidValue {
        /// The configuration key that had an invalid value.
        key: String,
        /// A description of why the value is invalid.
        reason: String,
    },
}

impl ConfigError {
    fn invalid(key: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.to_owned(),
            reason: reason.into(),
        }
    }
}

/// A specialized `Result` type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Prefix for environment overrides. `__` separates nested keys, so
/// `HARVEST_CLOSURE__MAX_NODES` sets `closure.max-nodes`.
const ENV_PREFIX: &str = "HARVEST_";

const CONFIG_FILE: &str = "config.yaml";

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Ancestry closure settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosureConfig {
    /// Upper bound on the nodes a single closure may visit.
    #[serde(default = "default_max_nodes", rename = "max-nodes")]
    pub max_nodes: usize,

    /// Which merge edges the closures follow.
    #[serde(default, rename = "merge-traversal")]
    pub merge_traversal: MergeTraversal,
}

impl Default for ClosureConfig {
    fn default() -> Self {
        Self {
            max_nodes: default_max_nodes(),
            merge_traversal: MergeTraversal::default(),
        }
    }
}

fn default_max_nodes() -> usize {
    100_000
}

/// Build ledger settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Rows fetched per page when iterating good builds.
    #[serde(default = "default_page_size", rename = "page-size")]
    pub page_size: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

fn default_page_size() -> usize {
    256
}

// ---------------------------------------------------------------------------
// Main config struct
// ---------------------------------------------------------------------------

/// The full harvest configuration, corresponding to `.harvest/config.yaml`.
///
/// Every field has a default so a partial file deserializes cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// Database file, relative to the `.harvest/` directory unless absolute.
    #[serde(default = "default_database")]
    pub database: String,

    /// Output JSON instead of human-readable text.
    #[serde(default)]
    pub json: bool,

    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default, rename = "log-filter", skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,

    #[serde(default)]
    pub closure: ClosureConfig,

    #[serde(default)]
    pub ledger: LedgerConfig,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            json: false,
            log_filter: None,
            closure: ClosureConfig::default(),
            ledger: LedgerConfig::default(),
        }
    }
}

fn default_database() -> String {
    "harvest.db".to_string()
}

impl HarvestConfig {
    /// Every key accepted by [`get`](Self::get) and [`set`](Self::set).
    pub const KEYS: &'static [&'static str] = &[
        "database",
        "json",
        "log-filter",
        "closure.max-nodes",
        "closure.merge-traversal",
        "ledger.page-size",
    ];

    /// Resolves [`database`](Self::database) against `harvest_dir`.
    pub fn database_path(&self, harvest_dir: &Path) -> PathBuf {
        let path = Path::new(&self.database);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            harvest_dir.join(path)
        }
    }

    /// Looks up a value by dotted key. Returns `None` for unknown keys.
    pub fn get(&self, key: &str) -> Option<String> {
        let value = match key {
            "database" => self.database.clone(),
            "json" => self.json.to_string(),
            "log-filter" => self.log_filter.clone().unwrap_or_default(),
            "closure.max-nodes" => self.closure.max_nodes.to_string(),
            "closure.merge-traversal" => self.closure.merge_traversal.to_string(),
            "ledger.page-size" => self.ledger.page_size.to_string(),
            _ => return None,
        };
        Some(value)
    }

    /// Sets a value by dotted key, parsing it to the field's type.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for unknown keys or values that
    /// do not parse or fail [`validate`](Self::validate).
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut next = self.clone();
        match key {
            "database" => {
                if value.trim().is_empty() {
                    return Err(ConfigError::invalid(key, "must not be empty"));
                }
                next.database = value.to_string();
            }
            "json" => {
                next.json = value
                    .parse()
                    .map_err(|_| ConfigError::invalid(key, "expected true or false"))?;
            }
            "log-filter" => {
                next.log_filter = (!value.is_empty()).then(|| value.to_string());
            }
            "closure.max-nodes" => next.closure.max_nodes = parse_count(key, value)?,
            "closure.merge-traversal" => {
                next.closure.merge_traversal = value
                    .parse()
                    .map_err(|e: ParseEnumError| ConfigError::invalid(key, e.to_string()))?;
            }
            "ledger.page-size" => next.ledger.page_size = parse_count(key, value)?,
            _ => {
                return Err(ConfigError::invalid(
                    key,
                    format!("unknown key (expected one of: {})", Self::KEYS.join(", ")),
                ));
            }
        }
        next.validate()?;
        *self = next;
        Ok(())
    }

    /// Renders the configuration as it would be saved.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Checks cross-field constraints that serde defaults cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.closure.max_nodes == 0 {
            return Err(ConfigError::invalid("closure.max-nodes", "must be at least 1"));
        }
        if self.ledger.page_size == 0 {
            return Err(ConfigError::invalid("ledger.page-size", "must be at least 1"));
        }
        Ok(())
    }
}

fn parse_count(key: &str, value: &str) -> Result<usize> {
    value
        .parse()
        .map_err(|_| ConfigError::invalid(key, format!("expected a positive integer, got {value:?}")))
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Builds the layered configuration for `harvest_dir` without extracting it.
fn layered(harvest_dir: &Path, env_prefix: Option<&str>) -> Result<Figment> {
    let mut figment = Figment::from(Serialized::defaults(HarvestConfig::default()));

    let config_path = harvest_dir.join(CONFIG_FILE);
    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        // An empty file is valid and contributes nothing.
        if !content.trim().is_empty() {
            figment = figment.merge(Yaml::string(&content));
        }
    }

    if let Some(prefix) = env_prefix {
        let env = Env::prefixed(prefix)
            .split("__")
            .map(|key| key.as_str().replace('_', "-").into());
        figment = figment.merge(env);
    }
    Ok(figment)
}

/// Load configuration for the given `.harvest/` directory.
///
/// A missing or empty `config.yaml` yields the defaults, still subject to
/// environment overrides.
///
/// # Errors
///
/// Returns [`ConfigError::ReadError`] if the file exists but cannot be read,
/// [`ConfigError::Figment`] if a layer has the wrong shape, or
/// [`ConfigError::InvalidValue`] if the merged values fail validation.
pub fn load_config(harvest_dir: &Path) -> Result<HarvestConfig> {
    load_config_with_prefix(harvest_dir, ENV_PREFIX)
}

/// Like [`load_config`] but without environment overrides: what
/// `config.yaml` itself says. Use this before [`save_config`].
pub fn load_config_file(harvest_dir: &Path) -> Result<HarvestConfig> {
    extract(layered(harvest_dir, None)?)
}

fn load_config_with_prefix(harvest_dir: &Path, env_prefix: &str) -> Result<HarvestConfig> {
    extract(layered(harvest_dir, Some(env_prefix))?)
}

fn extract(figment: Figment) -> Result<HarvestConfig> {
    let config: HarvestConfig = figment.extract()?;
    config.validate()?;
    Ok(config)
}

/// Save configuration to `config.yaml` inside the given `.harvest/` directory.
///
/// The directory is created if it does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::ReadError`] on I/O failure or
/// [`ConfigError::ParseError`] if serialization fails.
pub fn save_config(harvest_dir: &Path, config: &HarvestConfig) -> Result<()> {
    std::fs::create_dir_all(harvest_dir)?;

    std::fs::write(harvest_dir.join(CONFIG_FILE), config.to_yaml()?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // A prefix no environment sets, so tests see only file and defaults.
    const QUIET: &str = "HARVEST_CONFIG_TEST_UNSET_";

    #[test]
    fn defaults() {
        let cfg = HarvestConfig::default();
        assert_eq!(cfg.database, "harvest.db");
        assert!(!cfg.json);
        assert_eq!(cfg.closure.max_nodes, 100_000);
        assert_eq!(cfg.closure.merge_traversal, MergeTraversal::Directed);
        assert_eq!(cfg.ledger.page_size, 256);
    }

    #[test]
    fn missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_with_prefix(dir.path(), QUIET).unwrap();
        assert_eq!(cfg, HarvestConfig::default());
    }

    #[test]
    fn empty_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "\n").unwrap();
        let cfg = load_config_with_prefix(dir.path(), QUIET).unwrap();
        assert_eq!(cfg, HarvestConfig::default());
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "json: true\nclosure:\n  merge-traversal: symmetric\n",
        )
        .unwrap();

        let cfg = load_config_with_prefix(dir.path(), QUIET).unwrap();
        assert!(cfg.json);
        assert_eq!(cfg.closure.merge_traversal, MergeTraversal::Symmetric);
        assert_eq!(cfg.closure.max_nodes, 100_000);
        assert_eq!(cfg.ledger.page_size, 256);
    }

    #[test]
    fn zero_bound_in_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "closure:\n  max-nodes: 0\n").unwrap();
        let err = load_config_with_prefix(dir.path(), QUIET).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "closure.max-nodes"));
    }

    #[test]
    fn unknown_traversal_in_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "closure:\n  merge-traversal: sideways\n")
            .unwrap();
        let err = load_config_with_prefix(dir.path(), QUIET).unwrap_err();
        assert!(matches!(err, ConfigError::Figment(_)));
    }

    #[test]
    fn roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let harvest_dir = dir.path().join(".harvest");

        let mut cfg = HarvestConfig::default();
        cfg.database = "ledger.sqlite".to_string();
        cfg.ledger.page_size = 32;

        save_config(&harvest_dir, &cfg).unwrap();
        let loaded = load_config_with_prefix(&harvest_dir, QUIET).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn file_only_load_matches_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "ledger:\n  page-size: 8\n").unwrap();
        let cfg = load_config_file(dir.path()).unwrap();
        assert_eq!(cfg.ledger.page_size, 8);
        assert_eq!(cfg.database, "harvest.db");
    }

    #[test]
    fn get_and_set_by_key() {
        let mut cfg = HarvestConfig::default();
        cfg.set("closure.max-nodes", "500").unwrap();
        cfg.set("closure.merge-traversal", "Symmetric").unwrap();
        cfg.set("json", "true").unwrap();

        assert_eq!(cfg.get("closure.max-nodes").as_deref(), Some("500"));
        assert_eq!(cfg.get("closure.merge-traversal").as_deref(), Some("symmetric"));
        assert_eq!(cfg.get("json").as_deref(), Some("true"));
        assert!(cfg.get("closure.nope").is_none());
        for key in HarvestConfig::KEYS {
            assert!(cfg.get(key).is_some(), "{key} should be readable");
        }
    }

    #[test]
    fn set_rejects_bad_values() {
        let mut cfg = HarvestConfig::default();
        assert!(cfg.set("ledger.page-size", "0").is_err());
        assert!(cfg.set("ledger.page-size", "-3").is_err());
        assert!(cfg.set("json", "maybe").is_err());
        assert!(cfg.set("database", " ").is_err());
        assert!(cfg.set("colour", "blue").is_err());
        assert_eq!(cfg, HarvestConfig::default());
    }

    #[test]
    fn database_path_is_relative_to_dir() {
        let cfg = HarvestConfig::default();
        let dir = Path::new("/work/.harvest");
        assert_eq!(cfg.database_path(dir), dir.join("harvest.db"));
    }
}
