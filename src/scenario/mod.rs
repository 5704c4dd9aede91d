//! Scripted collaborators
//!
//! Reads YAML scenarios and turns them into wallet and account-abstraction
//! collaborators that answer exactly what the scenario says. This is how
//! the harness reproduces a connector's behavior without the connector.

mod config;
mod scripted;

pub use config::*;
pub use scripted::{
    CallJournal, ScriptedAccountAbstraction, ScriptedSmartAccount, ScriptedWallet,
};

use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::capability::{parse_address, AccountAbstraction, Wallet};
use crate::common::{Error, Result};

use scripted::{
    ScriptedActivation, ScriptedRawAuthorization, ScriptedSigner, ScriptedSignerSource,
    ScriptedSwitch,
};

/// Collaborators built from a scenario, sharing one journal
pub struct Collaborators {
    pub wallet: Option<Arc<dyn Wallet>>,
    pub account_abstraction: Option<Arc<dyn AccountAbstraction>>,
    pub journal: CallJournal,
}

impl Scenario {
    /// Load a scenario from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, &e))?;
        let scenario: Scenario = serde_yaml::from_str(&content)
            .map_err(|e| Error::scenario(path, format!("failed to parse: {e}")))?;
        scenario
            .validate()
            .map_err(|e| Error::scenario(path, e.to_string()))?;
        Ok(scenario)
    }

    /// Parse a scenario from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let scenario: Scenario = serde_yaml::from_str(content)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Check addresses up front so a bad file fails before any run
    pub fn validate(&self) -> Result<()> {
        if let Some(wallet) = &self.wallet {
            parse_address(&wallet.address)?;
        }
        if let Some(aa) = &self.account_abstraction {
            if let Scripted::Succeed { ok } = &aa.create_account {
                parse_address(&ok.address)?;
            }
        }
        Ok(())
    }

    /// Build fresh collaborators; call once per run for independent state
    pub fn build(&self) -> Result<Collaborators> {
        let journal = CallJournal::new();

        let wallet = match &self.wallet {
            Some(script) => {
                let chain = Arc::new(Mutex::new(script.current_chain));
                let wallet = ScriptedWallet {
                    address: parse_address(&script.address)?,
                    connector: script.connector.clone(),
                    chain: Arc::clone(&chain),
                    declared_chains: script.declared_chains.clone(),
                    authorization_support: script.authorization_support,
                    network_switch: script.network_switch.clone().map(|s| ScriptedSwitch {
                        script: s,
                        chain,
                        journal: journal.clone(),
                    }),
                    activation: script
                        .account_activation
                        .clone()
                        .map(|a| ScriptedActivation {
                            script: a,
                            active: Mutex::new(None),
                            journal: journal.clone(),
                        }),
                    signer: script.signer.clone().map(|s| ScriptedSignerSource {
                        error: s.error.clone(),
                        signer: Arc::new(ScriptedSigner::new(s, journal.clone())),
                        journal: journal.clone(),
                    }),
                    raw_authorization: script.raw_authorization.clone().map(|answer| {
                        ScriptedRawAuthorization {
                            answer,
                            journal: journal.clone(),
                        }
                    }),
                    exports: script.exports,
                    journal: journal.clone(),
                };
                Some(Arc::new(wallet) as Arc<dyn Wallet>)
            }
            None => None,
        };

        let account_abstraction = match &self.account_abstraction {
            Some(script) => {
                let create_account = match &script.create_account {
                    Scripted::Succeed { ok } => Scripted::Succeed {
                        ok: (parse_address(&ok.address)?, ok.clone()),
                    },
                    Scripted::Fail { error } => Scripted::Fail {
                        error: error.clone(),
                    },
                };
                Some(Arc::new(ScriptedAccountAbstraction {
                    create_account,
                    journal: journal.clone(),
                }) as Arc<dyn AccountAbstraction>)
            }
            None => None,
        };

        Ok(Collaborators {
            wallet,
            account_abstraction,
            journal,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"
name: switch
wallet:
  address: "0x5927ca8bf9807667b1e55f4c82eeB223AaE38775"
  current_chain: 1
  declared_chains: [1, 8453]
  network_switch: {}
account_abstraction:
  create_account:
    error: "api key rejected"
"#;

    #[tokio::test]
    async fn test_switch_updates_current_chain() {
        let scenario = Scenario::from_yaml(SCENARIO).unwrap();
        let collaborators = scenario.build().unwrap();
        let wallet = collaborators.wallet.unwrap();

        assert_eq!(wallet.current_chain(), Some(1));
        wallet
            .network_switch()
            .unwrap()
            .switch_chain(8453)
            .await
            .unwrap();
        assert_eq!(wallet.current_chain(), Some(8453));
        assert_eq!(
            collaborators.journal.calls(),
            vec!["wallet.switch_chain(8453)".to_string()]
        );
    }

    #[test]
    fn test_absent_capabilities_are_none() {
        let scenario = Scenario::from_yaml(SCENARIO).unwrap();
        let wallet = scenario.build().unwrap().wallet.unwrap();
        assert!(wallet.account_activation().is_none());
        assert!(wallet.signer_source().is_none());
        assert!(wallet.raw_authorization().is_none());
        assert_eq!(wallet.declares_authorization_support(), None);
    }

    #[test]
    fn test_invalid_wallet_address_rejected() {
        let yaml = "name: bad\nwallet:\n  address: \"0xnope\"\n";
        assert!(matches!(
            Scenario::from_yaml(yaml),
            Err(Error::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let path = std::path::Path::new("/nonexistent/scenario.yaml");
        match Scenario::load(path) {
            Err(Error::FileRead { path, .. }) => assert!(path.ends_with("scenario.yaml")),
            other => panic!("expected FileRead, got {other:?}"),
        }
    }

    #[test]
    fn test_builds_are_independent() {
        let scenario = Scenario::from_yaml(SCENARIO).unwrap();
        let first = scenario.build().unwrap();
        let second = scenario.build().unwrap();
        first.journal.record("x");
        assert!(second.journal.calls().is_empty());
    }
}
