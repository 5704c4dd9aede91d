//! Error types for the reproduction harness
//!
//! These cover the harness itself (configuration, scenario files, CLI
//! input). Failures reported by the wallet or account-abstraction
//! collaborators are [`crate::capability::ExternalError`] and never leave
//! a run as an `Error`; the runner turns them into log entries.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the harness
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    #[error("Missing required setting '{key}'. Set it in {location} or export {env}")]
    MissingSetting {
        key: &'static str,
        env: &'static str,
        location: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === Scenario Errors ===
    #[error("Invalid scenario '{path}': {reason}")]
    Scenario { path: String, reason: String },

    #[error("No wallet source given. Use --scenario <file> or --local-key-env <VAR>")]
    NoWalletSource,

    // === Input Errors ===
    #[error("Invalid address '{0}': expected 0x followed by 40 hex digits")]
    InvalidAddress(String),

    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    // === Run Errors ===
    #[error("A run is already in progress. Wait for it to finish before starting another")]
    RunInProgress,

    #[error("Run {0}")]
    RunFailed(String),

    // === IO Errors ===
    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Create a missing setting error pointing at the config file location
    pub fn missing_setting(key: &'static str, env: &'static str) -> Self {
        let location = super::paths::config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "config.toml".to_string());
        Self::MissingSetting { key, env, location }
    }

    /// Create a scenario error
    pub fn scenario(path: &std::path::Path, reason: impl Into<String>) -> Self {
        Self::Scenario {
            path: path.display().to_string(),
            reason: reason.into(),
        }
    }

    /// Create a file read error
    pub fn file_read(path: &std::path::Path, error: &io::Error) -> Self {
        Self::FileRead {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }
}
