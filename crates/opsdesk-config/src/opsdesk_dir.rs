//! Discovery and management of the `.opsdesk/` directory.
//!
//! The `.opsdesk/` directory holds the console configuration and the local
//! task database. It is found by walking up the directory tree.

use crate::config::ConfigError;
use std::path::{Path, PathBuf};

/// The name of the opsdesk metadata directory.
pub const OPSDESK_DIR_NAME: &str = ".opsdesk";

/// Environment variable overriding directory discovery.
pub const OPSDESK_DIR_ENV: &str = "OPSDESK_DIR";

/// Walk up the directory tree from `start` looking for a `.opsdesk/` directory.
///
/// The `OPSDESK_DIR` environment variable is checked first and wins when it
/// names an existing directory.
pub fn find_opsdesk_dir(start: &Path) -> Option<PathBuf> {
    if let Ok(env_dir) = std::env::var(OPSDESK_DIR_ENV) {
        let env_path = PathBuf::from(&env_dir);
        if env_path.is_dir() {
            return Some(env_path);
        }
    }
    find_opsdesk_dir_from(start)
}

/// Walk-up search without the environment override.
pub fn find_opsdesk_dir_from(start: &Path) -> Option<PathBuf> {
    let start = start.canonicalize().ok()?;
    start
        .ancestors()
        .map(|dir| dir.join(OPSDESK_DIR_NAME))
        .find(|candidate| candidate.is_dir())
}

/// Like [`find_opsdesk_dir`], but a missing directory is an error.
pub fn find_opsdesk_dir_or_error(start: &Path) -> Result<PathBuf, ConfigError> {
    find_opsdesk_dir(start).ok_or(ConfigError::DirNotFound)
}

/// Ensure a `.opsdesk/` directory exists at (or under) the given path.
///
/// Returns the path to the `.opsdesk/` directory.
pub fn ensure_opsdesk_dir(path: &Path) -> Result<PathBuf, ConfigError> {
    let dir = if path.ends_with(OPSDESK_DIR_NAME) {
        path.to_path_buf()
    } else {
        path.join(OPSDESK_DIR_NAME)
    };
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
