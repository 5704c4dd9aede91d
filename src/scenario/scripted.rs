//! Collaborators that answer from a scenario
//!
//! Every call is recorded in a shared [`CallJournal`] before it answers, so
//! tests can check which steps actually reached a collaborator.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use alloy::primitives::Address;
use async_trait::async_trait;

use crate::capability::{
    AccountAbstraction, AccountActivation, AuthorizationRequest, AuthorizationSigner,
    AuthorizationTuple, ChainId, ConnectorExports, CreateAccountRequest, ExternalError,
    ExternalResult, NetworkSwitch, PrepareRequest, PreparedTransaction, RawAuthorizationSigner,
    Receipt, SignedTransaction, Signer, SignerSource, SmartAccount, Wallet,
};

use super::config::{
    scripted, ActivationScript, NetworkSwitchScript, Scripted, SignerScript, SmartAccountScript,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Ordered record of collaborator calls
#[derive(Debug, Clone, Default)]
pub struct CallJournal {
    calls: Arc<Mutex<Vec<String>>>,
}

impl CallJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, call: impl Into<String>) {
        let call = call.into();
        tracing::trace!(%call, "collaborator call");
        lock(&self.calls).push(call);
    }

    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    /// Number of recorded calls starting with `prefix`
    pub fn count(&self, prefix: &str) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn contains(&self, prefix: &str) -> bool {
        self.count(prefix) > 0
    }

    pub fn clear(&self) {
        lock(&self.calls).clear();
    }
}

/// Wallet built from a [`super::WalletScript`]
pub struct ScriptedWallet {
    pub(super) address: Address,
    pub(super) connector: String,
    pub(super) chain: Arc<Mutex<Option<ChainId>>>,
    pub(super) declared_chains: Vec<ChainId>,
    pub(super) authorization_support: Option<bool>,
    pub(super) network_switch: Option<ScriptedSwitch>,
    pub(super) activation: Option<ScriptedActivation>,
    pub(super) signer: Option<ScriptedSignerSource>,
    pub(super) raw_authorization: Option<ScriptedRawAuthorization>,
    pub(super) exports: ConnectorExports,
    pub(super) journal: CallJournal,
}

impl Wallet for ScriptedWallet {
    fn address(&self) -> Address {
        self.address
    }

    fn connector_name(&self) -> &str {
        &self.connector
    }

    fn current_chain(&self) -> Option<ChainId> {
        *lock(&self.chain)
    }

    fn declared_chains(&self) -> Vec<ChainId> {
        self.declared_chains.clone()
    }

    fn declares_authorization_support(&self) -> Option<bool> {
        self.authorization_support
    }

    fn network_switch(&self) -> Option<&dyn NetworkSwitch> {
        self.network_switch.as_ref().map(|s| s as &dyn NetworkSwitch)
    }

    fn account_activation(&self) -> Option<&dyn AccountActivation> {
        self.activation.as_ref().map(|a| a as &dyn AccountActivation)
    }

    fn signer_source(&self) -> Option<&dyn SignerSource> {
        self.signer.as_ref().map(|s| s as &dyn SignerSource)
    }

    fn raw_authorization(&self) -> Option<&dyn RawAuthorizationSigner> {
        self.raw_authorization
            .as_ref()
            .map(|r| r as &dyn RawAuthorizationSigner)
    }

    fn exports(&self) -> ConnectorExports {
        self.exports
    }
}

pub struct ScriptedSwitch {
    pub(super) script: NetworkSwitchScript,
    pub(super) chain: Arc<Mutex<Option<ChainId>>>,
    pub(super) journal: CallJournal,
}

#[async_trait]
impl NetworkSwitch for ScriptedSwitch {
    async fn switch_chain(&self, chain_id: ChainId) -> ExternalResult<()> {
        self.journal.record(format!("wallet.switch_chain({chain_id})"));
        if let Some(error) = &self.script.error {
            return Err(ExternalError::new(error.clone()));
        }
        if self.script.switches {
            *lock(&self.chain) = Some(chain_id);
        }
        Ok(())
    }
}

pub struct ScriptedActivation {
    pub(super) script: ActivationScript,
    pub(super) active: Mutex<Option<Address>>,
    pub(super) journal: CallJournal,
}

impl AccountActivation for ScriptedActivation {
    fn set_active_account(&self, address: Address) -> ExternalResult<()> {
        self.journal
            .record(format!("wallet.set_active_account({address})"));
        if let Some(error) = &self.script.error {
            return Err(ExternalError::new(error.clone()));
        }
        if self.script.activates {
            *lock(&self.active) = Some(address);
        }
        Ok(())
    }

    fn active_account(&self) -> Option<Address> {
        *lock(&self.active)
    }
}

pub struct ScriptedSignerSource {
    pub(super) error: Option<String>,
    pub(super) signer: Arc<ScriptedSigner>,
    pub(super) journal: CallJournal,
}

#[async_trait]
impl SignerSource for ScriptedSignerSource {
    async fn signer(&self) -> ExternalResult<Arc<dyn Signer>> {
        self.journal.record("wallet.get_signer");
        if let Some(error) = &self.error {
            return Err(ExternalError::new(error.clone()));
        }
        Ok(Arc::clone(&self.signer) as Arc<dyn Signer>)
    }
}

pub struct ScriptedSigner {
    pub(super) script: SignerScript,
    pub(super) authorization: Option<ScriptedAuthorizer>,
    pub(super) journal: CallJournal,
}

impl ScriptedSigner {
    pub(super) fn new(script: SignerScript, journal: CallJournal) -> Self {
        let authorization = script
            .sign_authorization
            .clone()
            .map(|answer| ScriptedAuthorizer {
                answer,
                journal: journal.clone(),
            });
        Self {
            script,
            authorization,
            journal,
        }
    }
}

#[async_trait]
impl Signer for ScriptedSigner {
    async fn sign_message(&self, _message: &[u8]) -> ExternalResult<String> {
        self.journal.record("signer.sign_message");
        scripted(&self.script.sign_message, "signMessage")
    }

    async fn sign_typed_data(&self, _typed_data: &serde_json::Value) -> ExternalResult<String> {
        self.journal.record("signer.sign_typed_data");
        scripted(&self.script.sign_typed_data, "signTypedData")
    }

    async fn sign_transaction(&self, _transaction: &serde_json::Value) -> ExternalResult<String> {
        self.journal.record("signer.sign_transaction");
        scripted(&self.script.sign_transaction, "signTransaction")
    }

    fn authorization(&self) -> Option<&dyn AuthorizationSigner> {
        self.authorization
            .as_ref()
            .map(|a| a as &dyn AuthorizationSigner)
    }
}

pub struct ScriptedAuthorizer {
    answer: Scripted<AuthorizationTuple>,
    journal: CallJournal,
}

#[async_trait]
impl AuthorizationSigner for ScriptedAuthorizer {
    async fn sign_authorization(
        &self,
        request: &AuthorizationRequest,
    ) -> ExternalResult<AuthorizationTuple> {
        self.journal.record(format!(
            "signer.sign_authorization({}, {})",
            request.contract_address, request.chain_id
        ));
        self.answer.outcome()
    }
}

pub struct ScriptedRawAuthorization {
    pub(super) answer: Scripted<AuthorizationTuple>,
    pub(super) journal: CallJournal,
}

#[async_trait]
impl RawAuthorizationSigner for ScriptedRawAuthorization {
    async fn sign_authorization_raw(
        &self,
        request: &AuthorizationRequest,
    ) -> ExternalResult<AuthorizationTuple> {
        self.journal.record(format!(
            "wallet.sign_authorization_raw({}, {})",
            request.contract_address, request.chain_id
        ));
        self.answer.outcome()
    }
}

/// Account-abstraction client built from a [`super::AccountAbstractionScript`]
pub struct ScriptedAccountAbstraction {
    pub(super) create_account: Scripted<(Address, SmartAccountScript)>,
    pub(super) journal: CallJournal,
}

#[async_trait]
impl AccountAbstraction for ScriptedAccountAbstraction {
    async fn create_account(
        &self,
        request: CreateAccountRequest,
    ) -> ExternalResult<Arc<dyn SmartAccount>> {
        self.journal.record(format!(
            "aa.create_account({}, owners={}, type={})",
            request.eoa,
            request.owners.len(),
            request.account_type.as_deref().unwrap_or("default")
        ));
        let (address, script) = self.create_account.outcome()?;
        Ok(Arc::new(ScriptedSmartAccount {
            address,
            script,
            journal: self.journal.clone(),
        }))
    }
}

pub struct ScriptedSmartAccount {
    address: Address,
    script: SmartAccountScript,
    journal: CallJournal,
}

#[async_trait]
impl SmartAccount for ScriptedSmartAccount {
    fn address(&self) -> Address {
        self.address
    }

    async fn is_deployed(&self, chain_id: ChainId) -> ExternalResult<bool> {
        self.journal.record(format!("aa.is_deployed({chain_id})"));
        scripted(&self.script.is_deployed, "isDeployed")
    }

    async fn sign_eip7702_init_data(&self) -> ExternalResult<String> {
        self.journal.record("aa.sign_eip7702_init_data");
        scripted(&self.script.init_signature, "signEip7702InitData")
    }

    async fn prepare_transaction(
        &self,
        request: PrepareRequest,
    ) -> ExternalResult<PreparedTransaction> {
        let init = if request.eip7702_init_signature.is_some() {
            "some"
        } else {
            "none"
        };
        self.journal.record(format!(
            "aa.prepare_transaction(calls={}, fee={}, init={init})",
            request.calls.len(),
            request.fee_asset
        ));
        scripted(&self.script.prepare_transaction, "prepareTransaction").map(PreparedTransaction)
    }

    async fn sign_transaction(
        &self,
        _transaction: &PreparedTransaction,
    ) -> ExternalResult<SignedTransaction> {
        self.journal.record("aa.sign_transaction");
        scripted(&self.script.sign_transaction, "signTransaction").map(SignedTransaction)
    }

    async fn sign_authorizations(
        &self,
        _transaction: &PreparedTransaction,
    ) -> ExternalResult<Vec<AuthorizationTuple>> {
        self.journal.record("aa.sign_authorizations");
        scripted(&self.script.sign_authorizations, "signAuthorizations")
    }

    fn transaction_messages(
        &self,
        _transaction: &PreparedTransaction,
    ) -> ExternalResult<serde_json::Value> {
        self.journal.record("aa.transaction_messages");
        scripted(&self.script.transaction_messages, "getTransactionMessages")
    }

    async fn submit_transaction(
        &self,
        _transaction: &SignedTransaction,
        authorizations: &[AuthorizationTuple],
    ) -> ExternalResult<Receipt> {
        self.journal.record(format!(
            "aa.submit_transaction(authorizations={})",
            authorizations.len()
        ));
        scripted(&self.script.submit_transaction, "submitTransaction").map(Receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_journal_counts_by_prefix() {
        let journal = CallJournal::new();
        journal.record("aa.sign_authorizations");
        journal.record("aa.submit_transaction(authorizations=1)");
        journal.record("wallet.get_signer");
        assert_eq!(journal.count("aa."), 2);
        assert!(journal.contains("wallet.get_signer"));
        assert!(!journal.contains("signer."));

        let shared = journal.clone();
        shared.clear();
        assert!(journal.calls().is_empty());
    }
}
