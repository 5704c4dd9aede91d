//! Values exchanged with the collaborators

use alloy::primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// EIP-155 chain id
pub type ChainId = u64;

/// A signed EIP-7702 authorization as reported by a collaborator
///
/// The harness only echoes these fields; it never checks the signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationTuple {
    /// Delegate contract being authorized
    pub contract_address: String,
    pub chain_id: ChainId,
    pub nonce: u64,
    pub r: String,
    pub s: String,
    pub y_parity: u8,
}

/// Parameters for signing a single authorization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub contract_address: Address,
    pub chain_id: ChainId,
    /// Let the signer pick the account nonce when `None`
    pub nonce: Option<u64>,
}

/// One call of the batch handed to `prepare_transaction`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    pub to: Address,
    #[serde(default)]
    pub value: U256,
    #[serde(default)]
    pub data: Bytes,
}

impl Call {
    /// A zero-value call with no data
    pub fn noop(to: Address) -> Self {
        Self {
            to,
            value: U256::ZERO,
            data: Bytes::new(),
        }
    }
}

/// Transaction prepared by the account-abstraction client, passed through as-is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PreparedTransaction(pub serde_json::Value);

/// Transaction signed by the account-abstraction client, passed through as-is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignedTransaction(pub serde_json::Value);

/// Submission receipt, passed through as-is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Receipt(pub serde_json::Value);

impl Receipt {
    /// Transaction hash, when the receipt carries one
    pub fn transaction_hash(&self) -> Option<&str> {
        ["transactionHash", "hash", "txHash"]
            .iter()
            .find_map(|key| self.0.get(key).and_then(|v| v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_authorization_tuple_uses_camel_case() {
        let tuple = AuthorizationTuple {
            contract_address: "0xABC".to_string(),
            chain_id: 8453,
            nonce: 3,
            r: "0x1".to_string(),
            s: "0x2".to_string(),
            y_parity: 0,
        };
        let value = serde_json::to_value(&tuple).unwrap();
        assert_eq!(
            value,
            json!({
                "contractAddress": "0xABC",
                "chainId": 8453,
                "nonce": 3,
                "r": "0x1",
                "s": "0x2",
                "yParity": 0
            })
        );
    }

    #[test]
    fn test_receipt_transaction_hash() {
        let receipt = Receipt(json!({ "transactionHash": "0xfeed" }));
        assert_eq!(receipt.transaction_hash(), Some("0xfeed"));
        assert_eq!(Receipt(json!({ "status": 1 })).transaction_hash(), None);
    }
}
