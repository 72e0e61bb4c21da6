//! Deterministic display-only wallet identifiers.
//!
//! These are SHA-256 digests of (symbol, user id) with a fixed salt, not
//! key pairs. They carry no custody value and are not usable on any
//! chain; they exist so each user sees stable address/key strings.

use sha2::{Digest, Sha256};

pub const COIN_SYMBOLS: [&str; 3] = ["btc", "eth", "usdt"];

fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// `0x` + first 40 hex chars of SHA-256, shaped like an EVM address.
pub fn derive_address(symbol: &str, user_id: &str) -> String {
    let hash = sha256_hex(&format!("{}:{}:telegram-wallet", symbol, user_id));
    format!("0x{}", &hash[..40])
}

/// 64 hex chars from a different seed, so it never collides with the
/// address digest.
pub fn derive_private_key(symbol: &str, user_id: &str) -> String {
    sha256_hex(&format!("{}:{}:telegram-wallet-private-key", symbol, user_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_is_stable_and_evm_shaped() {
        let first = derive_address("btc", "123");
        let second = derive_address("btc", "123");
        assert_eq!(first, second);
        assert_eq!(first.len(), 42);
        assert!(first.starts_with("0x"));
        assert!(first[2..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn private_key_is_stable_64_hex() {
        let key = derive_private_key("eth", "42");
        assert_eq!(key, derive_private_key("eth", "42"));
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn symbols_and_users_produce_distinct_values() {
        assert_ne!(derive_address("btc", "1"), derive_address("eth", "1"));
        assert_ne!(derive_address("btc", "1"), derive_address("btc", "2"));
        assert_ne!(
            derive_address("usdt", "1")[2..],
            derive_private_key("usdt", "1")[..40]
        );
    }
}
