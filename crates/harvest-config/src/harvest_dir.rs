//! Discovery and management of the `.harvest/` directory.
//!
//! The `.harvest/` directory holds the provenance database and its
//! `config.yaml`. It is found by walking up from the working directory, the
//! same way a VCS finds its metadata directory.

use crate::config::ConfigError;
use std::path::{Path, PathBuf};

/// The name of the harvest metadata directory.
const HARVEST_DIR_NAME: &str = ".harvest";

/// Environment variable that overrides directory discovery.
const HARVEST_DIR_ENV: &str = "HARVEST_DIR";

/// Walk up the directory tree from `start` looking for a `.harvest/` directory.
///
/// The `HARVEST_DIR` environment variable wins when it names an existing
/// directory. Returns `None` once the filesystem root is reached.
///
/// # Examples
///
/// ```no_run
/// use harvest_config::harvest_dir::find_harvest_dir;
/// use std::path::Path;
///
/// if let Some(dir) = find_harvest_dir(Path::new(".")) {
///     println!("Found harvest dir at {}", dir.display());
/// }
/// ```
pub fn find_harvest_dir(start: &Path) -> Option<PathBuf> {
    if let Ok(env_dir) = std::env::var(HARVEST_DIR_ENV) {
        let env_path = PathBuf::from(&env_dir);
        if env_path.is_dir() {
            return Some(env_path);
        }
    }

    let start = start.canonicalize().ok()?;
    start
        .ancestors()
        .map(|dir| dir.join(HARVEST_DIR_NAME))
        .find(|candidate| candidate.is_dir())
}

/// Like [`find_harvest_dir`], but a missing directory is an error.
///
/// # Errors
///
/// Returns [`ConfigError::HarvestDirNotFound`] if no `.harvest/` directory is
/// found.
pub fn find_harvest_dir_or_error(start: &Path) -> Result<PathBuf, ConfigError> {
    find_harvest_dir(start).ok_or(ConfigError::HarvestDirNotFound)
}

/// Ensure a `.harvest/` directory exists at the given path.
///
/// If `path` is not itself named `.harvest`, a `.harvest/` subdirectory is
/// created under it. Returns the path to the `.harvest/` directory.
///
/// # Errors
///
/// Returns [`ConfigError::ReadError`] if directory creation fails.
pub fn ensure_harvest_dir(path: &Path) -> Result<PathBuf, ConfigError> {
    let harvest_dir = if path.ends_with(HARVEST_DIR_NAME) {
        path.to_path_buf()
    } else {
        path.join(HARVEST_DIR_NAME)
    };

    std::fs::create_dir_all(&harvest_dir)?;
    Ok(harvest_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn finds_dir_in_start() {
        let dir = tempfile::tempdir().unwrap();
        let harvest = dir.path().join(".harvest");
        std::fs::create_dir(&harvest).unwrap();

        let found = find_harvest_dir(dir.path()).unwrap().canonicalize().unwrap();
        assert_eq!(found, harvest.canonicalize().unwrap());
    }

    #[test]
    fn finds_dir_from_nested_child() {
        let dir = tempfile::tempdir().unwrap();
        let harvest = dir.path().join(".harvest");
        std::fs::create_dir(&harvest).unwrap();

        let child = dir.path().join("jobs").join("nightly");
        std::fs::create_dir_all(&child).unwrap();

        let found = find_harvest_dir(&child).unwrap().canonicalize().unwrap();
        assert_eq!(found, harvest.canonicalize().unwrap());
    }

    #[test]
    fn missing_start_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("does-not-exist");
        // HARVEST_DIR may be set by the caller's environment.
        if std::env::var_os(HARVEST_DIR_ENV).is_none() {
            assert!(find_harvest_dir(&gone).is_none());
        }
    }

    #[test]
    fn or_error_returns_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".harvest")).unwrap();
        assert!(find_harvest_dir_or_error(dir.path()).is_ok());
    }

    #[test]
    fn ensure_creates_subdir() {
        let dir = tempfile::tempdir().unwrap();
        let result = ensure_harvest_dir(dir.path()).unwrap();
        assert!(result.is_dir());
        assert!(result.ends_with(".harvest"));
    }

    #[test]
    fn ensure_accepts_dir_itself() {
        let dir = tempfile::tempdir().unwrap();
        let harvest = dir.path().join(".harvest");
        let result = ensure_harvest_dir(&harvest).unwrap();
        assert!(result.is_dir());
        assert_eq!(result, harvest);
    }

    #[test]
    fn ensure_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let first = ensure_harvest_dir(dir.path()).unwrap();
        let second = ensure_harvest_dir(dir.path()).unwrap();
        assert_eq!(first, second);
    }
}
