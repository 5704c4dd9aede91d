//! Configuration and log file locations
//!
//! Uses the directories crate for platform-appropriate locations:
//! - Linux: `~/.config/eip7702-repro/`
//! - macOS: `~/Library/Application Support/eip7702-repro/`
//! - Windows: `%APPDATA%\eip7702-repro\`

use std::path::PathBuf;

/// Project name used for config and data directories
const PROJECT_NAME: &str = "eip7702-repro";

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "REPRO_CONFIG";

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", PROJECT_NAME)
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
///
/// `REPRO_CONFIG` takes precedence over the platform location.
pub fn config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the path to the log directory
pub fn log_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", PROJECT_NAME)
        .map(|dirs| dirs.data_dir().join("logs"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_ends_with_toml() {
        if let Some(path) = config_path() {
            assert!(!path.as_os_str().is_empty());
        }
    }

    #[test]
    fn test_log_dir_is_under_project() {
        if let Some(dir) = log_dir() {
            assert!(dir.ends_with("logs"));
        }
    }
}
