//! Delegate address extraction (heuristic fallback)
//!
//! The account-abstraction client has no accessor for the delegate contract
//! of a prepared transaction. Until it does, the bypass scans a serialized
//! dump of the transaction messages for address-shaped tokens. This is
//! string scraping over an undocumented structure: treat a result as a
//! guess and prefer a real accessor as soon as one exists.

use std::str::FromStr;
use std::sync::OnceLock;

use alloy::primitives::Address;
use regex::Regex;

fn address_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Word boundaries keep 32-byte hashes and longer hex blobs from matching.
    PATTERN.get_or_init(|| Regex::new(r"\b0[xX][0-9a-fA-F]{40}\b").expect("valid regex"))
}

/// Every distinct address-shaped token in `dump`, in first-seen order
pub fn address_candidates(dump: &str) -> Vec<Address> {
    let mut found: Vec<Address> = Vec::new();
    for m in address_pattern().find_iter(dump) {
        let token = m.as_str();
        let Ok(address) = Address::from_str(&format!("0x{}", &token[2..])) else {
            continue;
        };
        if !found.contains(&address) {
            found.push(address);
        }
    }
    found
}

/// First candidate in `dump` that is not the sender
pub fn extract_delegate(dump: &str, sender: Address) -> Option<Address> {
    address_candidates(dump)
        .into_iter()
        .find(|candidate| *candidate != sender)
}

/// Serialize a message dump the way the scan expects
pub fn dump_messages(messages: &serde_json::Value) -> String {
    messages.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SENDER: &str = "0x5927ca8bf9807667b1e55f4c82eeB223AaE38775";
    const DELEGATE: &str = "0x63c0c19a282a1b52b07dd5a65b58948a07dae32b";

    fn addr(s: &str) -> Address {
        Address::from_str(s).unwrap()
    }

    #[test]
    fn test_extracts_first_non_sender_address() {
        let messages = json!([
            { "from": SENDER, "to": SENDER },
            { "authorization": { "address": DELEGATE, "chainId": 8453 } }
        ]);
        let dump = dump_messages(&messages);
        assert_eq!(extract_delegate(&dump, addr(SENDER)), Some(addr(DELEGATE)));
    }

    #[test]
    fn test_sender_exclusion_ignores_case() {
        let dump = format!("{} {}", SENDER.to_lowercase(), SENDER.to_uppercase().replace("0X", "0x"));
        assert_eq!(extract_delegate(&dump, addr(SENDER)), None);
    }

    #[test]
    fn test_hashes_are_not_addresses() {
        let hash = format!("0x{}", "ab".repeat(32));
        let dump = json!({ "hash": hash, "sender": SENDER }).to_string();
        assert_eq!(address_candidates(&dump), vec![addr(SENDER)]);
    }

    #[test]
    fn test_candidates_are_deduplicated() {
        let dump = format!("{DELEGATE} {} {DELEGATE}", DELEGATE.to_uppercase().replace("0X", "0x"));
        assert_eq!(address_candidates(&dump).len(), 1);
    }

    #[test]
    fn test_empty_dump_has_no_candidates() {
        assert!(address_candidates("{}").is_empty());
        assert_eq!(extract_delegate("", addr(SENDER)), None);
    }
}
