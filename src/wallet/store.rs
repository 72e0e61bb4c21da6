use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::fs;
use tracing::debug;

use crate::error::GatewayError;
use crate::wallet::derive::{derive_address, derive_private_key};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinEntry {
    pub address: String,
    pub balance: String,
    #[serde(rename = "privateKey")]
    pub private_key: String,
}

/// Canonical three-coin wallet. Address and private key are pure
/// functions of (symbol, user id); only `balance` is externally mutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    pub btc: CoinEntry,
    pub eth: CoinEntry,
    pub usdt: CoinEntry,
}

impl Wallet {
    pub fn coin_mut(&mut self, symbol: &str) -> Option<&mut CoinEntry> {
        match symbol {
            "btc" => Some(&mut self.btc),
            "eth" => Some(&mut self.eth),
            "usdt" => Some(&mut self.usdt),
            _ => None,
        }
    }
}

fn balance_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_empty(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn normalize_coin(symbol: &str, stored: Option<&Value>, user_id: &str) -> CoinEntry {
    match stored {
        // Already in {address, balance, privateKey} shape, possibly partial
        Some(v)
            if v.is_object()
                && (v.get("address").is_some()
                    || v.get("balance").is_some()
                    || v.get("privateKey").is_some()) =>
        {
            CoinEntry {
                address: non_empty(v.get("address"))
                    .unwrap_or_else(|| derive_address(symbol, user_id)),
                balance: v
                    .get("balance")
                    .and_then(balance_string)
                    .unwrap_or_else(|| "0".to_string()),
                private_key: non_empty(v.get("privateKey"))
                    .unwrap_or_else(|| derive_private_key(symbol, user_id)),
            }
        }
        // Legacy shape: a bare number/string balance
        Some(v) if !v.is_null() => CoinEntry {
            address: derive_address(symbol, user_id),
            balance: balance_string(v).unwrap_or_else(|| "0".to_string()),
            private_key: derive_private_key(symbol, user_id),
        },
        _ => CoinEntry {
            address: derive_address(symbol, user_id),
            balance: "0".to_string(),
            private_key: derive_private_key(symbol, user_id),
        },
    }
}

/// Produce the canonical wallet from whatever is on disk. Idempotent:
/// an already-canonical wallet normalizes to itself.
pub fn normalize(raw: &Value, user_id: &str) -> Wallet {
    Wallet {
        btc: normalize_coin("btc", raw.get("btc"), user_id),
        eth: normalize_coin("eth", raw.get("eth"), user_id),
        usdt: normalize_coin("usdt", raw.get("usdt"), user_id),
    }
}

/// One JSON file per user id; the filesystem is the sole source of truth
/// for addresses. Concurrent writers race last-writer-wins by design —
/// the data is display-only.
pub struct WalletStore {
    dir: PathBuf,
}

impl WalletStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path(&self, user_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", user_id))
    }

    /// Read the wallet, healing missing/legacy fields and persisting the
    /// canonical form back. Returns `(wallet, created)`.
    pub async fn load(&self, user_id: &str) -> Result<(Wallet, bool), GatewayError> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.path(user_id);

        let (raw, created) = match fs::read_to_string(&path).await {
            Ok(data) => (serde_json::from_str::<Value>(&data)?, false),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                (Value::Object(Default::default()), true)
            }
            Err(e) => return Err(e.into()),
        };

        let wallet = normalize(&raw, user_id);
        self.save(user_id, &wallet).await?;
        if created {
            debug!(user = %user_id, "Wallet file created");
        }
        Ok((wallet, created))
    }

    pub async fn save(&self, user_id: &str, wallet: &Wallet) -> Result<(), GatewayError> {
        fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_string_pretty(wallet)?;
        fs::write(self.path(user_id), json).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_input_derives_all_three_coins() {
        let wallet = normalize(&json!({}), "123");
        for entry in [&wallet.btc, &wallet.eth, &wallet.usdt] {
            assert_eq!(entry.balance, "0");
            assert_eq!(entry.address.len(), 42);
            assert_eq!(entry.private_key.len(), 64);
        }
        assert_ne!(wallet.btc.address, wallet.eth.address);
    }

    #[test]
    fn legacy_scalar_becomes_balance() {
        let wallet = normalize(&json!({"btc": 1.5, "eth": "2.25"}), "9");
        assert_eq!(wallet.btc.balance, "1.5");
        assert_eq!(wallet.eth.balance, "2.25");
        assert_eq!(wallet.usdt.balance, "0");
        assert_eq!(wallet.btc.address, derive_address("btc", "9"));
    }

    #[test]
    fn stored_fields_win_over_derivation() {
        let wallet = normalize(
            &json!({"usdt": {"address": "0xabc", "balance": 10, "privateKey": "deadbeef"}}),
            "9",
        );
        assert_eq!(wallet.usdt.address, "0xabc");
        assert_eq!(wallet.usdt.balance, "10");
        assert_eq!(wallet.usdt.private_key, "deadbeef");
    }

    #[test]
    fn partial_canonical_entries_are_healed() {
        let wallet = normalize(&json!({"btc": {"balance": "3"}}), "77");
        assert_eq!(wallet.btc.balance, "3");
        assert_eq!(wallet.btc.address, derive_address("btc", "77"));
        assert_eq!(wallet.btc.private_key, derive_private_key("btc", "77"));
    }

    #[test]
    fn normalization_is_idempotent() {
        let first = normalize(&json!({"eth": 4}), "55");
        let round_tripped = serde_json::to_value(&first).unwrap();
        let second = normalize(&round_tripped, "55");
        assert_eq!(first, second);
        assert_eq!(first.eth.address, second.eth.address);
        assert_eq!(first.eth.private_key, second.eth.private_key);
    }

    #[tokio::test]
    async fn load_creates_and_heals_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = WalletStore::new(dir.path());

        let (wallet, created) = store.load("321").await.unwrap();
        assert!(created);
        assert_eq!(wallet.btc.balance, "0");

        // Second read reuses the persisted canonical file
        let (again, created) = store.load("321").await.unwrap();
        assert!(!created);
        assert_eq!(wallet, again);
    }

    #[tokio::test]
    async fn legacy_file_is_healed_permanently() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("7.json"), r#"{"btc": 12, "usdt": "0.5"}"#)
            .await
            .unwrap();

        let store = WalletStore::new(dir.path());
        let (wallet, created) = store.load("7").await.unwrap();
        assert!(!created);
        assert_eq!(wallet.btc.balance, "12");
        assert_eq!(wallet.usdt.balance, "0.5");

        let on_disk = tokio::fs::read_to_string(dir.path().join("7.json"))
            .await
            .unwrap();
        let healed: Value = serde_json::from_str(&on_disk).unwrap();
        assert_eq!(healed["btc"]["balance"], "12");
        assert!(healed["btc"]["privateKey"].as_str().unwrap().len() == 64);
    }

    #[tokio::test]
    async fn save_mutates_only_balances() {
        let dir = tempfile::tempdir().unwrap();
        let store = WalletStore::new(dir.path());

        let (mut wallet, _) = store.load("88").await.unwrap();
        let address = wallet.eth.address.clone();
        wallet.eth.balance = "42".to_string();
        store.save("88", &wallet).await.unwrap();

        let (reloaded, _) = store.load("88").await.unwrap();
        assert_eq!(reloaded.eth.balance, "42");
        assert_eq!(reloaded.eth.address, address);
    }
}
