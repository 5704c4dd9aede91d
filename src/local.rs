//! Wallet backed by an in-process secp256k1 key
//!
//! Produces real EIP-7702 authorization signatures with alloy, so the
//! direct-signing checklist can be run without any wallet provider. There
//! is no account-abstraction client behind it.

use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use alloy::eips::eip7702::Authorization;
use alloy::hex;
use alloy::primitives::{Address, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use async_trait::async_trait;

use crate::capability::{
    AccountActivation, AuthorizationRequest, AuthorizationSigner, AuthorizationTuple, ChainId,
    ConnectorExports, ExternalError, ExternalResult, NetworkSwitch, RawAuthorizationSigner,
    Signer, SignerSource, Wallet,
};
use crate::common::{Error, Result};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Signer half of [`LocalWallet`]
pub struct LocalKeySigner {
    key: PrivateKeySigner,
    /// Account nonce used when a request leaves it open
    nonce: u64,
}

impl LocalKeySigner {
    fn authorize(&self, request: &AuthorizationRequest) -> ExternalResult<AuthorizationTuple> {
        let authorization = Authorization {
            chain_id: U256::from(request.chain_id),
            address: request.contract_address,
            nonce: request.nonce.unwrap_or(self.nonce),
        };
        let signature = self
            .key
            .sign_hash_sync(&authorization.signature_hash())
            .map_err(|e| ExternalError::new(format!("local signing failed: {e}")))?;
        let signed = authorization.into_signed(signature);

        Ok(AuthorizationTuple {
            contract_address: signed.address.to_string(),
            chain_id: request.chain_id,
            nonce: signed.nonce,
            r: format!("{:#x}", signed.r()),
            s: format!("{:#x}", signed.s()),
            y_parity: signed.y_parity(),
        })
    }
}

#[async_trait]
impl Signer for LocalKeySigner {
    async fn sign_message(&self, message: &[u8]) -> ExternalResult<String> {
        let signature = self
            .key
            .sign_message_sync(message)
            .map_err(|e| ExternalError::new(format!("local signing failed: {e}")))?;
        Ok(hex::encode_prefixed(signature.as_bytes()))
    }

    async fn sign_typed_data(&self, _typed_data: &serde_json::Value) -> ExternalResult<String> {
        Err(ExternalError::new(
            "signTypedData is not supported by the local wallet",
        ))
    }

    async fn sign_transaction(&self, _transaction: &serde_json::Value) -> ExternalResult<String> {
        Err(ExternalError::new(
            "signTransaction is not supported by the local wallet",
        ))
    }

    fn authorization(&self) -> Option<&dyn AuthorizationSigner> {
        Some(self as &dyn AuthorizationSigner)
    }
}

#[async_trait]
impl AuthorizationSigner for LocalKeySigner {
    async fn sign_authorization(
        &self,
        request: &AuthorizationRequest,
    ) -> ExternalResult<AuthorizationTuple> {
        self.authorize(request)
    }
}

/// Local key wallet
pub struct LocalWallet {
    signer: Arc<LocalKeySigner>,
    chains: Vec<ChainId>,
    current: Mutex<ChainId>,
    active: Mutex<Option<Address>>,
}

impl LocalWallet {
    /// Create a wallet from a hex private key, starting on the first chain
    pub fn from_private_key(key: &str, chains: Vec<ChainId>, nonce: u64) -> Result<Self> {
        let key = PrivateKeySigner::from_str(key.trim())
            .map_err(|e| Error::InvalidKey(e.to_string()))?;
        let current = chains.first().copied().ok_or_else(|| {
            Error::Config("local wallet needs at least one chain".to_string())
        })?;
        Ok(Self {
            signer: Arc::new(LocalKeySigner { key, nonce }),
            chains,
            current: Mutex::new(current),
            active: Mutex::new(None),
        })
    }
}

impl Wallet for LocalWallet {
    fn address(&self) -> Address {
        self.signer.key.address()
    }

    fn connector_name(&self) -> &str {
        "local-key"
    }

    fn current_chain(&self) -> Option<ChainId> {
        Some(*lock(&self.current))
    }

    fn declared_chains(&self) -> Vec<ChainId> {
        self.chains.clone()
    }

    fn declares_authorization_support(&self) -> Option<bool> {
        Some(true)
    }

    fn network_switch(&self) -> Option<&dyn NetworkSwitch> {
        Some(self as &dyn NetworkSwitch)
    }

    fn account_activation(&self) -> Option<&dyn AccountActivation> {
        Some(self as &dyn AccountActivation)
    }

    fn signer_source(&self) -> Option<&dyn SignerSource> {
        Some(self as &dyn SignerSource)
    }

    fn raw_authorization(&self) -> Option<&dyn RawAuthorizationSigner> {
        Some(self as &dyn RawAuthorizationSigner)
    }

    fn exports(&self) -> ConnectorExports {
        ConnectorExports {
            signer: true,
            wallet_client: false,
            private_key: false,
        }
    }
}

#[async_trait]
impl NetworkSwitch for LocalWallet {
    async fn switch_chain(&self, chain_id: ChainId) -> ExternalResult<()> {
        if !self.chains.contains(&chain_id) {
            return Err(ExternalError::new(format!(
                "chain {chain_id} is not configured for the local wallet"
            )));
        }
        *lock(&self.current) = chain_id;
        Ok(())
    }
}

impl AccountActivation for LocalWallet {
    fn set_active_account(&self, address: Address) -> ExternalResult<()> {
        if address != self.signer.key.address() {
            return Err(ExternalError::new(format!(
                "no key for account {address}"
            )));
        }
        *lock(&self.active) = Some(address);
        Ok(())
    }

    fn active_account(&self) -> Option<Address> {
        *lock(&self.active)
    }
}

#[async_trait]
impl SignerSource for LocalWallet {
    async fn signer(&self) -> ExternalResult<Arc<dyn Signer>> {
        Ok(Arc::clone(&self.signer) as Arc<dyn Signer>)
    }
}

#[async_trait]
impl RawAuthorizationSigner for LocalWallet {
    async fn sign_authorization_raw(
        &self,
        request: &AuthorizationRequest,
    ) -> ExternalResult<AuthorizationTuple> {
        self.signer.authorize(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "0xfa031edc02812621d5a90c72a04e637c0160ed5f81cf0f8cb26505d3a1b80a82";
    const ADDRESS: &str = "0x5927ca8bf9807667b1e55f4c82eeB223AaE38775";
    const DELEGATE: &str = "0x63c0c19a282a1b52b07dd5a65b58948a07dae32b";

    fn wallet() -> LocalWallet {
        LocalWallet::from_private_key(KEY, vec![8453, 84532], 3).unwrap()
    }

    #[test]
    fn test_address_from_key() {
        assert_eq!(wallet().address(), Address::from_str(ADDRESS).unwrap());
    }

    #[test]
    fn test_invalid_key() {
        assert!(matches!(
            LocalWallet::from_private_key("0x1234", vec![1], 0),
            Err(Error::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn test_authorization_recovers_to_wallet() {
        let wallet = wallet();
        let request = AuthorizationRequest {
            contract_address: Address::from_str(DELEGATE).unwrap(),
            chain_id: 8453,
            nonce: None,
        };
        let tuple = wallet
            .raw_authorization()
            .unwrap()
            .sign_authorization_raw(&request)
            .await
            .unwrap();

        assert_eq!(tuple.chain_id, 8453);
        assert_eq!(tuple.nonce, 3);
        assert!(tuple.y_parity <= 1);
        assert_eq!(
            tuple.contract_address.to_lowercase(),
            DELEGATE.to_lowercase()
        );

        // Re-sign and recover the authority from the signed authorization.
        let authorization = Authorization {
            chain_id: U256::from(8453u64),
            address: request.contract_address,
            nonce: 3,
        };
        let signature = wallet
            .signer
            .key
            .sign_hash_sync(&authorization.signature_hash())
            .unwrap();
        let signed = authorization.into_signed(signature);
        assert_eq!(signed.recover_authority().unwrap(), wallet.address());
        assert_eq!(format!("{:#x}", signed.r()), tuple.r);
    }

    #[tokio::test]
    async fn test_switch_rejects_unknown_chain() {
        let wallet = wallet();
        assert!(wallet.switch_chain(1).await.is_err());
        wallet.switch_chain(84532).await.unwrap();
        assert_eq!(wallet.current_chain(), Some(84532));
    }

    #[test]
    fn test_activation_requires_own_address() {
        let wallet = wallet();
        assert!(wallet
            .set_active_account(Address::from_str(DELEGATE).unwrap())
            .is_err());
        assert!(wallet.active_account().is_none());
        wallet.set_active_account(wallet.address()).unwrap();
        assert_eq!(wallet.active_account(), Some(wallet.address()));
    }

    #[tokio::test]
    async fn test_typed_data_not_supported() {
        let signer = wallet().signer_source().unwrap().signer().await.unwrap();
        let err = signer
            .sign_typed_data(&serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(err.message.contains("not supported"));
        assert!(signer.sign_message(b"hello").await.unwrap().starts_with("0x"));
    }
}
