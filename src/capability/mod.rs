//! Collaborator capabilities
//!
//! The harness never implements wallet custody or account abstraction
//! itself. It drives two externally supplied collaborators through the
//! traits in this module. Optional capabilities are exposed as accessors
//! returning `Option<&dyn Trait>`: a `None` is an ordinary answer that the
//! runner checks before use.

mod account;
mod types;
mod wallet;

pub use account::{AccountAbstraction, CreateAccountRequest, PrepareRequest, SmartAccount};
pub use types::{
    AuthorizationRequest, AuthorizationTuple, Call, ChainId, PreparedTransaction, Receipt,
    SignedTransaction,
};
pub use wallet::{
    AccountActivation, AuthorizationSigner, ConnectorExports, NetworkSwitch,
    RawAuthorizationSigner, Signer, SignerSource, Wallet,
};

use std::str::FromStr;

use alloy::primitives::Address;
use thiserror::Error;

use crate::common::{Error, Result};

/// A failure reported by a collaborator
///
/// Collaborators only give us free text, so the message is kept verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ExternalError {
    pub message: String,
}

impl ExternalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Result type for collaborator calls
pub type ExternalResult<T> = std::result::Result<T, ExternalError>;

/// Parse a `0x`-prefixed 20-byte hex address
pub fn parse_address(s: &str) -> Result<Address> {
    let trimmed = s.trim();
    let hex = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .ok_or_else(|| Error::InvalidAddress(s.to_string()))?;
    if hex.len() != 40 {
        return Err(Error::InvalidAddress(s.to_string()));
    }
    Address::from_str(trimmed).map_err(|_| Error::InvalidAddress(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address() {
        let addr = parse_address("0x5927ca8bf9807667b1e55f4c82eeB223AaE38775").unwrap();
        assert_eq!(
            addr.to_string().to_lowercase(),
            "0x5927ca8bf9807667b1e55f4c82eeb223aae38775"
        );
    }

    #[test]
    fn test_parse_address_rejects_bad_input() {
        assert!(parse_address("5927ca8bf9807667b1e55f4c82eeB223AaE38775").is_err());
        assert!(parse_address("0x1234").is_err());
        assert!(parse_address("0xzz27ca8bf9807667b1e55f4c82eeB223AaE38775").is_err());
    }

    #[test]
    fn test_external_error_displays_message_verbatim() {
        let err = ExternalError::new("Account type json-rpc is not supported");
        assert_eq!(err.to_string(), "Account type json-rpc is not supported");
    }
}
