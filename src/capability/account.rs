//! Account-abstraction client capabilities

use std::sync::Arc;

use alloy::primitives::Address;
use async_trait::async_trait;

use super::types::{
    AuthorizationTuple, Call, ChainId, PreparedTransaction, Receipt, SignedTransaction,
};
use super::wallet::Wallet;
use super::ExternalResult;

/// Parameters for creating a smart account bound to an EOA
pub struct CreateAccountRequest {
    /// Owner accounts; the connected wallet wrapped as owner
    pub owners: Vec<Arc<dyn Wallet>>,
    /// EOA the smart account delegates from
    pub eoa: Address,
    pub account_type: Option<String>,
}

/// Parameters for preparing a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepareRequest {
    pub chain_id: ChainId,
    pub calls: Vec<Call>,
    pub fee_asset: String,
    pub eip7702_init_signature: Option<String>,
}

/// Account-abstraction client
#[async_trait]
pub trait AccountAbstraction: Send + Sync {
    async fn create_account(
        &self,
        request: CreateAccountRequest,
    ) -> ExternalResult<Arc<dyn SmartAccount>>;
}

/// Smart account created by an [`AccountAbstraction`] client
#[async_trait]
pub trait SmartAccount: Send + Sync {
    fn address(&self) -> Address;

    async fn is_deployed(&self, chain_id: ChainId) -> ExternalResult<bool>;

    async fn sign_eip7702_init_data(&self) -> ExternalResult<String>;

    async fn prepare_transaction(
        &self,
        request: PrepareRequest,
    ) -> ExternalResult<PreparedTransaction>;

    async fn sign_transaction(
        &self,
        transaction: &PreparedTransaction,
    ) -> ExternalResult<SignedTransaction>;

    async fn sign_authorizations(
        &self,
        transaction: &PreparedTransaction,
    ) -> ExternalResult<Vec<AuthorizationTuple>>;

    /// Internal messages of a prepared transaction, shape unspecified
    fn transaction_messages(
        &self,
        transaction: &PreparedTransaction,
    ) -> ExternalResult<serde_json::Value>;

    async fn submit_transaction(
        &self,
        transaction: &SignedTransaction,
        authorizations: &[AuthorizationTuple],
    ) -> ExternalResult<Receipt>;
}
