//! Configuration files for the mailbox access layer
//!
//! Settings live as JSON documents in a shared directory, `~/.config/mailbox/`
//! by default. The directory can be redirected with the `MAILBOX_CONFIG_DIR`
//! environment variable (useful for services and tests).

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the config directory
pub const CONFIG_DIR_ENV: &str = "MAILBOX_CONFIG_DIR";

/// Name of the directory under the platform config dir
const APP_DIR: &str = "mailbox";

/// Get the config directory
///
/// `MAILBOX_CONFIG_DIR` wins when set and non-empty, otherwise the platform
/// config directory joined with `mailbox`.
pub fn config_dir() -> Option<PathBuf> {
    match std::env::var_os(CONFIG_DIR_ENV) {
        Some(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
        _ => dirs::config_dir().map(|p| p.join(APP_DIR)),
    }
}

/// Get the path to a file within the config directory
pub fn config_path(filename: &str) -> Option<PathBuf> {
    config_dir().map(|p| p.join(filename))
}

/// Load a JSON file from the config directory, or `None` if it is absent
///
/// A file that exists but does not parse is still an error.
pub fn load_json_opt<T: DeserializeOwned>(filename: &str) -> Result<Option<T>> {
    match config_path(filename) {
        Some(path) if path.is_file() => load_json_file(&path).map(Some),
        _ => Ok(None),
    }
}

/// Load and parse a JSON file from an arbitrary path
pub fn load_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}
