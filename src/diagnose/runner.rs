//! Scripted diagnostic runner
//!
//! Walks a fixed, numbered checklist against the wallet and the
//! account-abstraction client, logging every step. A missing required
//! capability or a failed required call ends the run early; optional steps
//! only log. Each external call is made at most once per run and always
//! awaited before the next step starts.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use alloy::primitives::Address;
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::capability::{
    AccountAbstraction, AuthorizationRequest, AuthorizationTuple, Call, ChainId,
    CreateAccountRequest, PrepareRequest, PreparedTransaction, Receipt, Signer, SmartAccount,
    Wallet,
};
use crate::common::config::{RunDefaults, DEFAULT_CHAIN_ID};
use crate::common::Result;
use crate::runlog::{LogEntry, RunLog, RunState};

use super::classify::classify;
use super::extract::{dump_messages, extract_delegate};

/// Which checklist to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    /// Sign one authorization directly through the wallet signer
    Direct,
    /// Go through the account-abstraction client; bypass only if
    /// `signAuthorizations` fails
    Sdk,
    /// Go through the account-abstraction client and always try the bypass
    SdkBypass,
}

/// Inputs for a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    /// Delegate contract for direct signing
    pub delegate: Option<Address>,
    pub chain_id: ChainId,
    pub fee_asset: String,
    pub account_type: Option<String>,
    /// Calls to prepare; a zero-value self call when empty
    pub calls: Vec<Call>,
    pub nonce: Option<u64>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            delegate: None,
            chain_id: DEFAULT_CHAIN_ID,
            fee_asset: "native".to_string(),
            account_type: None,
            calls: Vec::new(),
            nonce: None,
        }
    }
}

impl RunSettings {
    /// Build settings from configured defaults
    pub fn from_defaults(defaults: &RunDefaults) -> Result<Self> {
        let delegate = defaults
            .delegate_address
            .as_deref()
            .map(crate::capability::parse_address)
            .transpose()?;
        Ok(Self {
            delegate,
            chain_id: defaults.chain_id,
            fee_asset: defaults.fee_asset.clone(),
            account_type: defaults.account_type.clone(),
            ..Self::default()
        })
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every step ran; errors may still have been logged
    Completed,
    /// A required step failed and the rest were skipped
    Stopped { step: u8 },
    /// A collaborator blew up outside any handled path
    Unexpected,
}

/// Everything a run produced
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub variant: Variant,
    pub outcome: RunOutcome,
    pub entries: Vec<LogEntry>,
    /// Last authorization produced by direct signing or the bypass
    pub authorization: Option<AuthorizationTuple>,
    pub receipt: Option<Receipt>,
    pub errors: usize,
}

enum Flow {
    Done,
    Stop(u8),
}

/// Drives the checklist against the configured collaborators
pub struct DiagnosticRunner {
    wallet: Option<Arc<dyn Wallet>>,
    account_abstraction: Option<Arc<dyn AccountAbstraction>>,
    settings: RunSettings,
    log: RunLog,
    state: RunState,
    last_authorization: Option<AuthorizationTuple>,
    receipt: Option<Receipt>,
}

impl DiagnosticRunner {
    pub fn new(settings: RunSettings) -> Self {
        Self {
            wallet: None,
            account_abstraction: None,
            settings,
            log: RunLog::new(),
            state: RunState::new(),
            last_authorization: None,
            receipt: None,
        }
    }

    pub fn with_wallet(mut self, wallet: Arc<dyn Wallet>) -> Self {
        self.wallet = Some(wallet);
        self
    }

    pub fn with_account_abstraction(mut self, client: Arc<dyn AccountAbstraction>) -> Self {
        self.account_abstraction = Some(client);
        self
    }

    /// Replace the log, e.g. with one that has an observer
    pub fn with_log(mut self, log: RunLog) -> Self {
        self.log = log;
        self
    }

    /// Shared handle on the running flag
    pub fn state(&self) -> RunState {
        self.state.clone()
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    pub fn log(&self) -> &RunLog {
        &self.log
    }

    pub fn last_authorization(&self) -> Option<&AuthorizationTuple> {
        self.last_authorization.as_ref()
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Run one variant of the checklist
    ///
    /// Only refuses to start when another run holds the running flag;
    /// every failure during the run ends up in the log instead.
    pub async fn run(&mut self, variant: Variant) -> Result<RunReport> {
        let _guard = self.state.begin()?;
        self.log.clear();
        self.last_authorization = None;
        self.receipt = None;

        info!(?variant, chain_id = self.settings.chain_id, "Starting diagnostic run");

        let outcome = match AssertUnwindSafe(self.steps(variant)).catch_unwind().await {
            Ok(Flow::Done) => {
                let errors = self.log.error_count();
                if errors == 0 {
                    self.log.success("Run completed with 0 errors");
                } else {
                    self.log.info(format!("Run completed with {errors} error(s)"));
                }
                RunOutcome::Completed
            }
            Ok(Flow::Stop(step)) => {
                debug!(step, "Run stopped early");
                RunOutcome::Stopped { step }
            }
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                self.log.error(format!("Unexpected error: {message}"));
                RunOutcome::Unexpected
            }
        };

        info!(?outcome, errors = self.log.error_count(), "Diagnostic run finished");

        Ok(RunReport {
            variant,
            outcome,
            entries: self.log.entries().to_vec(),
            authorization: self.last_authorization.clone(),
            receipt: self.receipt.clone(),
            errors: self.log.error_count(),
        })
    }

    async fn steps(&mut self, variant: Variant) -> Flow {
        // Step 1: a wallet must be connected
        self.log.set_step(1);
        let Some(wallet) = self.wallet.clone() else {
            self.log.error("No wallet connected. Connect a wallet and run again");
            return Flow::Stop(1);
        };
        let address = wallet.address();
        self.log.info(format!(
            "Wallet {address} connected via {}",
            wallet.connector_name()
        ));

        // Step 2: declared support is informational only
        self.log.set_step(2);
        match wallet.declares_authorization_support() {
            Some(true) => self
                .log
                .info("Connector declares EIP-7702 authorization support"),
            Some(false) => self
                .log
                .info("Connector declares no EIP-7702 authorization support"),
            None => self
                .log
                .info("Connector does not declare EIP-7702 authorization support"),
        }

        self.log.set_step(3);
        if let Flow::Stop(step) = self.ensure_chain(wallet.as_ref()).await {
            return Flow::Stop(step);
        }

        // Step 4: wallet-as-a-service connectors sign only for the active account
        self.log.set_step(4);
        let Some(activation) = wallet.account_activation() else {
            self.log
                .error("Connector cannot set an active account (setActiveAccount missing)");
            return Flow::Stop(4);
        };
        if let Err(e) = activation.set_active_account(address) {
            self.log.error(format!("setActiveAccount failed: {e}"));
            return Flow::Stop(4);
        }
        match activation.active_account() {
            Some(active) => self.log.success(format!("Active account set to {active}")),
            None => {
                self.log
                    .error("No active account after setActiveAccount; signing would fail");
                return Flow::Stop(4);
            }
        }

        // Step 5: signer with authorization signing
        self.log.set_step(5);
        let Some(source) = wallet.signer_source() else {
            self.log.error("Wallet does not provide a signer (getSigner missing)");
            return Flow::Stop(5);
        };
        let signer = match source.signer().await {
            Ok(signer) => signer,
            Err(e) => {
                self.log.error(format!("getSigner failed: {e}"));
                return Flow::Stop(5);
            }
        };
        self.log.info("Signer obtained");
        if signer.authorization().is_none() {
            self.log.error("Signer has no signAuthorization method");
            return Flow::Stop(5);
        }
        self.log.success("Signer exposes signAuthorization");

        match variant {
            Variant::Direct => self.sign_directly(signer.as_ref()).await,
            Variant::Sdk | Variant::SdkBypass => {
                if let Flow::Stop(step) = self.run_sdk(&wallet, variant).await {
                    return Flow::Stop(step);
                }
            }
        }

        self.log.set_step(12);
        self.report_exports(wallet.as_ref());

        Flow::Done
    }

    /// Step 3: be on the target chain, switching if needed
    async fn ensure_chain(&mut self, wallet: &dyn Wallet) -> Flow {
        let target = self.settings.chain_id;
        let declared = wallet.declared_chains();
        if !declared.contains(&target) {
            self.log.error(format!(
                "Chain {target} is not among the wallet's chains {declared:?}"
            ));
            return Flow::Stop(3);
        }

        let current = wallet.current_chain();
        if current == Some(target) {
            self.log.info(format!("Wallet already on chain {target}"));
            return Flow::Done;
        }

        let current = current
            .map(|c| c.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        self.log
            .info(format!("Wallet on chain {current}, switching to {target}"));

        let Some(switch) = wallet.network_switch() else {
            self.log.error("Wallet cannot switch networks");
            return Flow::Stop(3);
        };
        if let Err(e) = switch.switch_chain(target).await {
            self.log.error(format!("Network switch failed: {e}"));
            return Flow::Stop(3);
        }
        if wallet.current_chain() != Some(target) {
            self.log
                .error(format!("Wallet still not on chain {target} after switching"));
            return Flow::Stop(3);
        }
        self.log.success(format!("Switched to chain {target}"));
        Flow::Done
    }

    /// Step 6: one authorization through the wallet signer
    async fn sign_directly(&mut self, signer: &dyn Signer) {
        self.log.set_step(6);
        let Some(delegate) = self.settings.delegate else {
            self.log
                .error("No delegate address configured; pass --delegate or set run.delegate_address");
            return;
        };
        let Some(authorizer) = signer.authorization() else {
            return;
        };

        let request = AuthorizationRequest {
            contract_address: delegate,
            chain_id: self.settings.chain_id,
            nonce: self.settings.nonce,
        };
        self.log.info(format!(
            "Signing authorization for delegate {delegate} on chain {}",
            request.chain_id
        ));

        match authorizer.sign_authorization(&request).await {
            Ok(tuple) => {
                self.log.success("signAuthorization succeeded");
                self.log_tuple(&tuple);
                self.last_authorization = Some(tuple);
            }
            Err(e) => self.log.error(format!("signAuthorization failed: {e}")),
        }
    }

    /// Steps 7 to 11 plus submission
    async fn run_sdk(&mut self, wallet: &Arc<dyn Wallet>, variant: Variant) -> Flow {
        let address = wallet.address();
        let chain_id = self.settings.chain_id;

        // Step 7: smart account bound to the EOA
        self.log.set_step(7);
        let Some(client) = self.account_abstraction.clone() else {
            self.log.error("No account-abstraction client configured");
            return Flow::Stop(7);
        };
        self.log
            .info(format!("Creating smart account for EOA {address}"));
        let request = CreateAccountRequest {
            owners: vec![Arc::clone(wallet)],
            eoa: address,
            account_type: self.settings.account_type.clone(),
        };
        let account = match client.create_account(request).await {
            Ok(account) => account,
            Err(e) => {
                self.log.error(format!("createAccount failed: {e}"));
                return Flow::Stop(7);
            }
        };
        self.log
            .success(format!("Smart account created: {}", account.address()));
        match account.is_deployed(chain_id).await {
            Ok(true) => self.log.info(format!("Account deployed on chain {chain_id}")),
            Ok(false) => self
                .log
                .info(format!("Account not yet deployed on chain {chain_id}")),
            Err(e) => self.log.error(format!("isDeployed check failed: {e}")),
        }

        // Step 8: init signature is best-effort
        self.log.set_step(8);
        let init_signature = match account.sign_eip7702_init_data().await {
            Ok(signature) => {
                self.log.success(format!(
                    "EIP-7702 init signature obtained: {}",
                    abbreviate(&signature)
                ));
                Some(signature)
            }
            Err(e) => {
                self.log.error(format!(
                    "signEip7702InitData failed, continuing without it: {e}"
                ));
                None
            }
        };

        // Step 9: nothing to sign without a prepared transaction
        self.log.set_step(9);
        let calls = if self.settings.calls.is_empty() {
            vec![Call::noop(address)]
        } else {
            self.settings.calls.clone()
        };
        self.log.info(format!(
            "Preparing transaction with {} call(s), fee asset {}",
            calls.len(),
            self.settings.fee_asset
        ));
        let prepared = match account
            .prepare_transaction(PrepareRequest {
                chain_id,
                calls,
                fee_asset: self.settings.fee_asset.clone(),
                eip7702_init_signature: init_signature,
            })
            .await
        {
            Ok(prepared) => prepared,
            Err(e) => {
                self.log.error(format!("prepareTransaction failed: {e}"));
                return Flow::Stop(9);
            }
        };
        self.log.success("Transaction prepared");

        // Step 10: the call under investigation
        self.log.set_step(10);
        self.log.info("Calling signAuthorizations");
        let sdk_authorizations = match account.sign_authorizations(&prepared).await {
            Ok(authorizations) => {
                self.log.success(format!(
                    "signAuthorizations returned {} authorization(s)",
                    authorizations.len()
                ));
                for tuple in &authorizations {
                    self.log_tuple(tuple);
                }
                Some(authorizations)
            }
            Err(e) => {
                self.log.error(format!("signAuthorizations failed: {e}"));
                let found = classify(&e.message);
                if found.confirms_account_type_bug() {
                    self.log.error(format!(
                        "BUG CONFIRMED: signAuthorizations rejects the {} account ({found})",
                        wallet.connector_name()
                    ));
                }
                None
            }
        };

        // Step 11: manual bypass
        self.log.set_step(11);
        let bypass = match variant {
            Variant::SdkBypass => true,
            _ => sdk_authorizations.is_none(),
        };
        let bypass_authorization = if bypass {
            self.bypass(wallet.as_ref(), account.as_ref(), &prepared).await
        } else {
            None
        };

        let authorizations =
            sdk_authorizations.or_else(|| bypass_authorization.map(|tuple| vec![tuple]));
        self.submit(account.as_ref(), &prepared, authorizations).await;

        Flow::Done
    }

    /// Sign the authorization on the connector, skipping the SDK
    async fn bypass(
        &mut self,
        wallet: &dyn Wallet,
        account: &dyn SmartAccount,
        prepared: &PreparedTransaction,
    ) -> Option<AuthorizationTuple> {
        self.log.info("Attempting manual authorization bypass");

        let messages = match account.transaction_messages(prepared) {
            Ok(messages) => messages,
            Err(e) => {
                self.log
                    .error(format!("Could not read transaction messages: {e}"));
                return None;
            }
        };
        let dump = dump_messages(&messages);
        let Some(delegate) = extract_delegate(&dump, wallet.address()) else {
            self.log
                .error("No delegate address found in transaction messages");
            return None;
        };
        self.log.info(format!(
            "Delegate candidate {delegate} scraped from transaction messages (heuristic)"
        ));

        let Some(raw) = wallet.raw_authorization() else {
            self.log
                .error("Connector has no low-level signAuthorization");
            return None;
        };
        let request = AuthorizationRequest {
            contract_address: delegate,
            chain_id: self.settings.chain_id,
            nonce: self.settings.nonce,
        };
        match raw.sign_authorization_raw(&request).await {
            Ok(tuple) => {
                self.log.success("Manual signAuthorization succeeded");
                self.log_tuple(&tuple);
                self.last_authorization = Some(tuple.clone());
                Some(tuple)
            }
            Err(e) => {
                self.log
                    .error(format!("Manual signAuthorization failed: {e}"));
                let found = classify(&e.message);
                if found.confirms_missing_primitive() {
                    self.log.error(format!(
                        "BUG CONFIRMED: connector {} cannot sign authorizations ({found})",
                        wallet.connector_name()
                    ));
                }
                None
            }
        }
    }

    async fn submit(
        &mut self,
        account: &dyn SmartAccount,
        prepared: &PreparedTransaction,
        authorizations: Option<Vec<AuthorizationTuple>>,
    ) {
        let Some(authorizations) = authorizations else {
            self.log
                .info("No authorizations available, skipping submission");
            return;
        };

        let signed = match account.sign_transaction(prepared).await {
            Ok(signed) => signed,
            Err(e) => {
                self.log.error(format!("signTransaction failed: {e}"));
                return;
            }
        };
        self.log.info("Transaction signed, submitting");

        match account.submit_transaction(&signed, &authorizations).await {
            Ok(receipt) => {
                let hash = receipt.transaction_hash().unwrap_or("no hash in receipt");
                self.log.success(format!("Transaction submitted: {hash}"));
                self.receipt = Some(receipt);
            }
            Err(e) => self.log.error(format!("submitTransaction failed: {e}")),
        }
    }

    /// Step 12: what else the connector could hand out
    fn report_exports(&mut self, wallet: &dyn Wallet) {
        let exports = wallet.exports();
        for (name, available) in [
            ("signer export", exports.signer),
            ("wallet client access", exports.wallet_client),
            ("private key export", exports.private_key),
        ] {
            let status = if available { "available" } else { "not available" };
            self.log.info(format!("Connector capability {name}: {status}"));
        }
    }

    fn log_tuple(&mut self, tuple: &AuthorizationTuple) {
        self.log.info(format!("  contractAddress: {}", tuple.contract_address));
        self.log.info(format!("  chainId: {}", tuple.chain_id));
        self.log.info(format!("  nonce: {}", tuple.nonce));
        self.log.info(format!("  r: {}", tuple.r));
        self.log.info(format!("  s: {}", tuple.s));
        self.log.info(format!("  yParity: {}", tuple.y_parity));
    }
}

fn abbreviate(value: &str) -> String {
    if value.chars().count() <= 18 {
        return value.to_string();
    }
    let head: String = value.chars().take(10).collect();
    let tail: String = value
        .chars()
        .skip(value.chars().count() - 6)
        .collect();
    format!("{head}...{tail}")
}
