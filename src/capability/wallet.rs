//! Wallet connector capabilities

use std::sync::Arc;

use alloy::primitives::Address;
use async_trait::async_trait;
use serde::Serialize;

use super::types::{AuthorizationRequest, AuthorizationTuple, ChainId};
use super::ExternalResult;

/// The connected wallet handle
///
/// Only the identity and chain queries are mandatory. Everything else is an
/// optional capability, absent by default.
pub trait Wallet: Send + Sync {
    /// Connected EOA address
    fn address(&self) -> Address;

    /// Name of the connector backing this wallet
    fn connector_name(&self) -> &str;

    /// Chain the wallet is currently on, if known
    fn current_chain(&self) -> Option<ChainId>;

    /// Chains the wallet declares it can operate on
    fn declared_chains(&self) -> Vec<ChainId>;

    /// Whether the connector declares EIP-7702 authorization support
    ///
    /// `None` means the connector does not say.
    fn declares_authorization_support(&self) -> Option<bool> {
        None
    }

    fn network_switch(&self) -> Option<&dyn NetworkSwitch> {
        None
    }

    /// Account activation, required by wallet-as-a-service connectors
    fn account_activation(&self) -> Option<&dyn AccountActivation> {
        None
    }

    fn signer_source(&self) -> Option<&dyn SignerSource> {
        None
    }

    /// Low-level authorization primitive on the connector itself
    fn raw_authorization(&self) -> Option<&dyn RawAuthorizationSigner> {
        None
    }

    /// Export capabilities, reported for manual debugging only
    fn exports(&self) -> ConnectorExports {
        ConnectorExports::default()
    }
}

/// Switches the wallet to another chain
#[async_trait]
pub trait NetworkSwitch: Send + Sync {
    async fn switch_chain(&self, chain_id: ChainId) -> ExternalResult<()>;
}

/// Selects the account a wallet-as-a-service connector signs with
pub trait AccountActivation: Send + Sync {
    fn set_active_account(&self, address: Address) -> ExternalResult<()>;

    fn active_account(&self) -> Option<Address>;
}

/// Hands out a signer for the connected account
#[async_trait]
pub trait SignerSource: Send + Sync {
    async fn signer(&self) -> ExternalResult<Arc<dyn Signer>>;
}

/// Generic signer returned by [`SignerSource`]
///
/// The checklist only uses [`Signer::authorization`]; the signing methods
/// mirror the rest of the connector's signer for scenarios and manual use.
#[async_trait]
pub trait Signer: Send + Sync {
    /// EIP-191 personal message signature, hex encoded
    async fn sign_message(&self, message: &[u8]) -> ExternalResult<String>;

    async fn sign_typed_data(&self, typed_data: &serde_json::Value) -> ExternalResult<String>;

    async fn sign_transaction(&self, transaction: &serde_json::Value) -> ExternalResult<String>;

    /// EIP-7702 authorization signing, if the signer has it
    fn authorization(&self) -> Option<&dyn AuthorizationSigner> {
        None
    }
}

/// Signs EIP-7702 authorizations through a [`Signer`]
#[async_trait]
pub trait AuthorizationSigner: Send + Sync {
    async fn sign_authorization(
        &self,
        request: &AuthorizationRequest,
    ) -> ExternalResult<AuthorizationTuple>;
}

/// Signs EIP-7702 authorizations directly on the connector
#[async_trait]
pub trait RawAuthorizationSigner: Send + Sync {
    async fn sign_authorization_raw(
        &self,
        request: &AuthorizationRequest,
    ) -> ExternalResult<AuthorizationTuple>;
}

/// What a connector lets the user export
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct ConnectorExports {
    #[serde(default)]
    pub signer: bool,
    #[serde(default)]
    pub wallet_client: bool,
    #[serde(default)]
    pub private_key: bool,
}
