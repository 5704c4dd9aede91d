//! Scenario file types
//!
//! A scenario describes the collaborators a run will meet: which
//! capabilities the wallet has, and what each call answers. A capability
//! whose key is missing is absent; a call whose key is missing fails with
//! "not scripted".

use serde::Deserialize;

use crate::capability::{AuthorizationTuple, ChainId, ConnectorExports};
use crate::capability::{ExternalError, ExternalResult};

/// A complete scenario loaded from a YAML file
#[derive(Deserialize, Debug, Clone)]
pub struct Scenario {
    /// Name of the scenario
    pub name: String,
    /// Optional description of what the scenario reproduces
    pub description: Option<String>,
    /// The connected wallet; absent means no wallet is connected
    pub wallet: Option<WalletScript>,
    /// The account-abstraction client, if any
    pub account_abstraction: Option<AccountAbstractionScript>,
}

/// Answer to a single call: a value or an error message
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Scripted<T> {
    Fail { error: String },
    Succeed { ok: T },
}

impl<T: Clone> Scripted<T> {
    pub fn outcome(&self) -> ExternalResult<T> {
        match self {
            Scripted::Fail { error } => Err(ExternalError::new(error.clone())),
            Scripted::Succeed { ok } => Ok(ok.clone()),
        }
    }
}

/// Outcome of an optional scripted call; `None` means not scripted
pub(crate) fn scripted<T: Clone>(script: &Option<Scripted<T>>, call: &str) -> ExternalResult<T> {
    match script {
        Some(s) => s.outcome(),
        None => Err(ExternalError::new(format!("{call} is not scripted in this scenario"))),
    }
}

/// The connected wallet
#[derive(Deserialize, Debug, Clone)]
pub struct WalletScript {
    /// Connected EOA address
    pub address: String,
    /// Connector name (e.g., "json-rpc", "embedded")
    #[serde(default = "default_connector")]
    pub connector: String,
    /// Chain the wallet starts on
    pub current_chain: Option<ChainId>,
    /// Chains the wallet declares
    #[serde(default)]
    pub declared_chains: Vec<ChainId>,
    /// Declared EIP-7702 support; absent means undeclared
    pub authorization_support: Option<bool>,
    pub network_switch: Option<NetworkSwitchScript>,
    pub account_activation: Option<ActivationScript>,
    pub signer: Option<SignerScript>,
    /// Low-level authorization primitive on the connector
    pub raw_authorization: Option<Scripted<AuthorizationTuple>>,
    #[serde(default)]
    pub exports: ConnectorExports,
}

fn default_connector() -> String {
    "scripted".to_string()
}

/// Network switching; succeeds unless `error` is set
#[derive(Deserialize, Debug, Clone)]
pub struct NetworkSwitchScript {
    pub error: Option<String>,
    /// Whether a successful switch actually moves the wallet
    #[serde(default = "default_true")]
    pub switches: bool,
}

/// Account activation
#[derive(Deserialize, Debug, Clone)]
pub struct ActivationScript {
    /// `setActiveAccount` fails with this message
    pub error: Option<String>,
    /// Whether an active account is reported after activation
    #[serde(default = "default_true")]
    pub activates: bool,
}

fn default_true() -> bool {
    true
}

/// The signer handed out by `getSigner`
#[derive(Deserialize, Debug, Clone, Default)]
pub struct SignerScript {
    /// `getSigner` fails with this message
    pub error: Option<String>,
    pub sign_message: Option<Scripted<String>>,
    pub sign_typed_data: Option<Scripted<String>>,
    pub sign_transaction: Option<Scripted<String>>,
    /// Absent means the signer has no `signAuthorization`
    pub sign_authorization: Option<Scripted<AuthorizationTuple>>,
}

/// The account-abstraction client
#[derive(Deserialize, Debug, Clone)]
pub struct AccountAbstractionScript {
    pub create_account: Scripted<SmartAccountScript>,
}

/// The smart account returned by `createAccount`
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct SmartAccountScript {
    pub address: String,
    pub is_deployed: Option<Scripted<bool>>,
    pub init_signature: Option<Scripted<String>>,
    pub prepare_transaction: Option<Scripted<serde_json::Value>>,
    pub sign_transaction: Option<Scripted<serde_json::Value>>,
    pub sign_authorizations: Option<Scripted<Vec<AuthorizationTuple>>>,
    pub transaction_messages: Option<Scripted<serde_json::Value>>,
    pub submit_transaction: Option<Scripted<serde_json::Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_forms() {
        let ok: Scripted<bool> = serde_yaml::from_str("ok: true").unwrap();
        assert_eq!(ok.outcome(), Ok(true));

        let fail: Scripted<bool> = serde_yaml::from_str("error: boom").unwrap();
        assert_eq!(fail.outcome(), Err(ExternalError::new("boom")));
    }

    #[test]
    fn test_parse_minimal_scenario() {
        let yaml = r#"
name: no wallet
description: Nothing is connected
"#;
        let scenario: Scenario = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(scenario.name, "no wallet");
        assert!(scenario.wallet.is_none());
        assert!(scenario.account_abstraction.is_none());
    }

    #[test]
    fn test_parse_wallet_capabilities() {
        let yaml = r#"
name: waas
wallet:
  address: "0x5927ca8bf9807667b1e55f4c82eeB223AaE38775"
  connector: json-rpc
  current_chain: 1
  declared_chains: [1, 8453]
  network_switch: {}
  account_activation:
    activates: false
  signer:
    sign_authorization:
      error: "Account type json-rpc is not supported"
  exports:
    signer: true
"#;
        let scenario: Scenario = serde_yaml::from_str(yaml).unwrap();
        let wallet = scenario.wallet.unwrap();
        assert_eq!(wallet.connector, "json-rpc");
        assert_eq!(wallet.declared_chains, vec![1, 8453]);
        assert!(wallet.network_switch.unwrap().error.is_none());
        assert!(!wallet.account_activation.unwrap().activates);
        assert!(wallet.raw_authorization.is_none());
        assert!(wallet.exports.signer);
        assert!(!wallet.exports.private_key);
        let signer = wallet.signer.unwrap();
        assert!(matches!(
            signer.sign_authorization,
            Some(Scripted::Fail { .. })
        ));
    }

    #[test]
    fn test_unscripted_call_fails() {
        let none: Option<Scripted<String>> = None;
        let err = scripted(&none, "signMessage").unwrap_err();
        assert!(err.message.contains("signMessage"));
    }
}
