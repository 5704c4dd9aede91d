//! Configuration file handling
//!
//! Two settings are required before any run can start: the API key for the
//! account-abstraction client and the environment identifier of the wallet
//! provider. Both can come from `config.toml` or from the environment; the
//! environment wins. [`Config::validate`] turns a loaded [`Config`] into
//! [`Settings`] or fails, so a half-configured harness is never observed.

use serde::{Deserialize, Serialize};

use super::paths::config_path;
use super::{Error, Result};

/// Environment variable for the account-abstraction API key
pub const AA_API_KEY_ENV: &str = "REPRO_AA_API_KEY";

/// Environment variable for the wallet provider environment id
pub const WALLET_ENVIRONMENT_ENV: &str = "REPRO_WALLET_ENVIRONMENT_ID";

/// Base mainnet, where the bug was observed
pub const DEFAULT_CHAIN_ID: u64 = 8453;

/// Raw configuration as read from disk
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// API key for the account-abstraction client
    pub aa_api_key: Option<String>,

    /// Environment identifier for the wallet provider
    pub wallet_environment_id: Option<String>,

    /// Defaults for runs
    #[serde(default)]
    pub run: RunDefaults,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Run defaults, overridable from the command line
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RunDefaults {
    /// Delegate contract to authorize
    #[serde(default)]
    pub delegate_address: Option<String>,

    /// Chain the run must happen on
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,

    /// Asset used to pay fees through the account-abstraction client
    #[serde(default = "default_fee_asset")]
    pub fee_asset: String,

    /// Account type requested when creating the smart account
    #[serde(default)]
    pub account_type: Option<String>,
}

impl Default for RunDefaults {
    fn default() -> Self {
        Self {
            delegate_address: None,
            chain_id: default_chain_id(),
            fee_asset: default_fee_asset(),
            account_type: None,
        }
    }
}

fn default_chain_id() -> u64 {
    DEFAULT_CHAIN_ID
}

fn default_fee_asset() -> String {
    "native".to_string()
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    #[serde(default = "default_filter")]
    pub filter: String,

    /// Also write a log file under the data directory
    #[serde(default)]
    pub file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            file: false,
        }
    }
}

fn default_filter() -> String {
    "repro=info,warn".to_string()
}

/// Validated configuration; both required settings are present
#[derive(Debug, Clone)]
pub struct Settings {
    pub aa_api_key: String,
    pub wallet_environment_id: String,
    pub run: RunDefaults,
    pub logging: LoggingConfig,
}

impl Settings {
    /// API key with everything but the last four characters hidden
    pub fn redacted_api_key(&self) -> String {
        redact(&self.aa_api_key)
    }
}

fn redact(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 4 {
        return "*".repeat(count);
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("{}{}", "*".repeat(count - 4), tail)
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                let content =
                    std::fs::read_to_string(&path).map_err(|e| Error::file_read(&path, &e))?;
                return Self::from_toml_str(&content);
            }
        }
        Ok(Self::default())
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::ConfigParse(e.to_string()))
    }

    /// Apply environment overrides using the process environment
    pub fn with_env(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(key) = lookup(AA_API_KEY_ENV) {
            self.aa_api_key = Some(key);
        }
        if let Some(id) = lookup(WALLET_ENVIRONMENT_ENV) {
            self.wallet_environment_id = Some(id);
        }
        self
    }

    /// Check the required settings and produce [`Settings`]
    pub fn validate(self) -> Result<Settings> {
        let aa_api_key = required(self.aa_api_key, "aa_api_key", AA_API_KEY_ENV)?;
        let wallet_environment_id = required(
            self.wallet_environment_id,
            "wallet_environment_id",
            WALLET_ENVIRONMENT_ENV,
        )?;

        if let Some(delegate) = &self.run.delegate_address {
            crate::capability::parse_address(delegate)?;
        }

        Ok(Settings {
            aa_api_key,
            wallet_environment_id,
            run: self.run,
            logging: self.logging,
        })
    }
}

fn required(value: Option<String>, key: &'static str, env: &'static str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(Error::missing_setting(key, env)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_file_is_empty() {
        let config = Config::from_toml_str("").unwrap();
        assert!(config.aa_api_key.is_none());
        assert_eq!(config.run.chain_id, DEFAULT_CHAIN_ID);
        assert_eq!(config.run.fee_asset, "native");
        assert_eq!(config.logging.filter, "repro=info,warn");
    }

    #[test]
    fn test_validate_requires_both_settings() {
        let config = Config::from_toml_str("aa_api_key = \"key\"").unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            Error::MissingSetting {
                key: "wallet_environment_id",
                ..
            }
        ));

        let config = Config::from_toml_str("wallet_environment_id = \"env\"").unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::MissingSetting { key: "aa_api_key", .. }));
    }

    #[test]
    fn test_blank_setting_is_missing() {
        let config = Config::from_toml_str(
            "aa_api_key = \"   \"\nwallet_environment_id = \"env\"",
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides_file() {
        let config = Config::from_toml_str(
            r#"
aa_api_key = "from-file"
wallet_environment_id = "env-file"

[run]
chain_id = 84532
fee_asset = "0x036CbD53842c5426634e7929541eC2318f3dCF7e"
"#,
        )
        .unwrap()
        .with_overrides(|key| (key == AA_API_KEY_ENV).then(|| "from-env".to_string()));

        let settings = config.validate().unwrap();
        assert_eq!(settings.aa_api_key, "from-env");
        assert_eq!(settings.wallet_environment_id, "env-file");
        assert_eq!(settings.run.chain_id, 84532);
    }

    #[test]
    fn test_invalid_delegate_rejected() {
        let config = Config::from_toml_str(
            r#"
aa_api_key = "k"
wallet_environment_id = "e"

[run]
delegate_address = "0x1234"
"#,
        )
        .unwrap();
        assert!(matches!(config.validate(), Err(Error::InvalidAddress(_))));
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        assert!(matches!(
            Config::from_toml_str("aa_api_key = "),
            Err(Error::ConfigParse(_))
        ));
    }

    #[test]
    fn test_redacted_api_key() {
        assert_eq!(redact("abcdefgh"), "****efgh");
        assert_eq!(redact("abc"), "***");
    }
}
