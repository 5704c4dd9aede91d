//! Error signature classification
//!
//! The collaborators report failures as free text with no error code, so
//! known bugs are recognised by substrings of the message. Keep all of that
//! matching here; when a structured code appears, only this file changes.

use std::fmt;

use serde::Serialize;

/// Known failure signatures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSignature {
    /// The SDK refuses the wallet's account type (the "json-rpc" variant)
    AccountTypeRejected,
    /// The connector has no such RPC method
    MethodNotFound,
    /// Generic "not supported" refusal
    NotSupported,
    Unknown,
}

const ACCOUNT_TYPE_PATTERNS: &[&str] = &["account type", "json-rpc"];
const METHOD_NOT_FOUND_PATTERNS: &[&str] = &["method not found", "does not exist"];
const NOT_SUPPORTED_PATTERNS: &[&str] = &["not supported", "unsupported"];

/// Signatures found in one message
///
/// A message can carry several patterns at once ("Method not found: ...
/// not supported"), so every matching signature is kept, in declaration
/// order. The bug predicates look at the whole set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Classification {
    signatures: Vec<ErrorSignature>,
}

/// Classify a collaborator error message
///
/// Matching is case-insensitive substring search.
pub fn classify(message: &str) -> Classification {
    let lower = message.to_lowercase();
    let signatures = [
        (ErrorSignature::AccountTypeRejected, ACCOUNT_TYPE_PATTERNS),
        (ErrorSignature::MethodNotFound, METHOD_NOT_FOUND_PATTERNS),
        (ErrorSignature::NotSupported, NOT_SUPPORTED_PATTERNS),
    ]
    .into_iter()
    .filter(|(_, patterns)| patterns.iter().any(|p| lower.contains(p)))
    .map(|(signature, _)| signature)
    .collect();
    Classification { signatures }
}

impl Classification {
    /// Matched signatures; empty when nothing is known
    pub fn signatures(&self) -> &[ErrorSignature] {
        &self.signatures
    }

    /// First matched signature, or `Unknown`
    pub fn primary(&self) -> ErrorSignature {
        self.signatures
            .first()
            .copied()
            .unwrap_or(ErrorSignature::Unknown)
    }

    pub fn contains(&self, signature: ErrorSignature) -> bool {
        self.signatures.contains(&signature)
    }

    /// Matches the authorization-list signing bug under investigation
    pub fn confirms_account_type_bug(&self) -> bool {
        self.contains(ErrorSignature::AccountTypeRejected)
            || self.contains(ErrorSignature::NotSupported)
    }

    /// Matches the connector lacking a raw authorization primitive
    pub fn confirms_missing_primitive(&self) -> bool {
        self.contains(ErrorSignature::MethodNotFound)
            || self.contains(ErrorSignature::NotSupported)
    }
}

impl fmt::Display for ErrorSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AccountTypeRejected => "account type rejected",
            Self::MethodNotFound => "method not found",
            Self::NotSupported => "not supported",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.signatures.is_empty() {
            return write!(f, "{}", ErrorSignature::Unknown);
        }
        for (i, signature) in self.signatures.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{signature}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_type_messages() {
        let found = classify("Account type json-rpc is not supported for signAuthorizations");
        assert_eq!(found.primary(), ErrorSignature::AccountTypeRejected);
        assert!(found.contains(ErrorSignature::NotSupported));
        assert!(found.confirms_account_type_bug());

        let found = classify("unexpected JSON-RPC wallet");
        assert_eq!(found.signatures(), &[ErrorSignature::AccountTypeRejected]);
        assert!(!found.confirms_missing_primitive());
    }

    #[test]
    fn test_method_not_found_messages() {
        let found = classify("RPC error -32601: Method not found");
        assert_eq!(found.signatures(), &[ErrorSignature::MethodNotFound]);
        assert!(found.confirms_missing_primitive());
        assert!(!found.confirms_account_type_bug());

        assert_eq!(
            classify("the method eth_signAuthorization does not exist").primary(),
            ErrorSignature::MethodNotFound
        );
    }

    #[test]
    fn test_not_supported_is_generic() {
        let found = classify("Operation not supported by connector");
        assert_eq!(found.primary(), ErrorSignature::NotSupported);
        assert!(found.confirms_account_type_bug());
        assert!(found.confirms_missing_primitive());
    }

    #[test]
    fn test_mixed_messages_keep_every_signature() {
        let found = classify("Method not found: signAuthorizations not supported");
        assert_eq!(
            found.signatures(),
            &[ErrorSignature::MethodNotFound, ErrorSignature::NotSupported]
        );
        assert!(found.confirms_account_type_bug());

        let found = classify("eth_signAuthorization is not supported for json-rpc accounts");
        assert_eq!(
            found.signatures(),
            &[ErrorSignature::AccountTypeRejected, ErrorSignature::NotSupported]
        );
        assert!(found.confirms_missing_primitive());
        assert_eq!(found.to_string(), "account type rejected, not supported");
    }

    #[test]
    fn test_unknown_messages() {
        let found = classify("insufficient funds for gas");
        assert!(found.signatures().is_empty());
        assert_eq!(found.primary(), ErrorSignature::Unknown);
        assert_eq!(found.to_string(), "unknown");
        assert!(!found.confirms_account_type_bug());
        assert!(!found.confirms_missing_primitive());
    }
}
