//! Source keys and bulk account generation
//!
//! Source keys are keystore files under the configured keys directory. They
//! are imported into the local keystore and, when funded, used to top up the
//! funding account.

use anyhow::{Context, Result};
use futures::future::join_all;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::models::{Account, Amount};
use crate::network::Network;

/// A keystore file found on disk
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyFile {
    pub path: PathBuf,
    /// Alias used in the local keystore
    pub name: String,
    /// Address recorded inside the keystore file
    pub address: String,
}

impl KeyFile {
    /// Keystore alias and address, the address normalized for RPC use
    pub fn account(&self) -> Account {
        Account::new(self.name.clone(), normalize_hex_address(&self.address))
    }
}

/// Balance of a source key
#[derive(Clone, Debug)]
pub struct KeyBalance {
    pub account: Account,
    pub total: Option<Amount>,
}

impl KeyBalance {
    pub fn has_funds(&self) -> bool {
        self.total.map(|t| !t.is_zero()).unwrap_or(false)
    }
}

/// Walk `dir` and collect every keystore file
pub fn identify_keys(dir: &Path) -> Result<Vec<KeyFile>> {
    let mut keys = Vec::new();
    if !dir.exists() {
        return Ok(keys);
    }
    walk(dir, &mut keys)?;
    keys.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(keys)
}

fn walk(dir: &Path, keys: &mut Vec<KeyFile>) -> Result<()> {
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
        let path = entry?.path();
        if path.is_dir() {
            walk(&path, keys)?;
        } else if let Some(key) = parse_key_file(&path) {
            keys.push(key);
        }
    }
    Ok(())
}

fn parse_key_file(path: &Path) -> Option<KeyFile> {
    let content = fs::read_to_string(path).ok()?;
    let json: Value = serde_json::from_str(&content).ok()?;
    let address = json.get("address")?.as_str()?.trim();
    if address.is_empty() {
        return None;
    }
    let name = path.file_stem()?.to_str()?.to_string();
    Some(KeyFile {
        path: path.to_path_buf(),
        name,
        address: address.to_string(),
    })
}

/// Import every key under `dir` and return the addresses that hold funds
pub async fn load_source_accounts(network: &Arc<dyn Network>, dir: &Path) -> Result<Vec<String>> {
    let keys = identify_keys(dir)?;
    info!("Found a total of {} key(s) in {}", keys.len(), dir.display());

    let mut accounts = Vec::new();
    for key in &keys {
        debug!("Keyfile path: {}, address: {}", key.path.display(), key.address);
        network
            .import_account(&key.path, &key.name)
            .await
            .with_context(|| format!("Failed to import keyfile {}", key.path.display()))?;

        let address = network
            .find_address_by_name(&key.name)
            .await?
            .unwrap_or_else(|| key.account().address);
        accounts.push(Account::new(key.name.clone(), address));
    }

    let balances = balance_report(network, &accounts).await;
    let mut funded = Vec::new();
    for balance in balances {
        if balance.has_funds() {
            funded.push(balance.account.address);
        } else {
            info!(
                "Keyfile {} ({}) doesn't hold any funds - skipping",
                balance.account.name, balance.account.address
            );
        }
    }

    Ok(funded)
}

fn normalize_hex_address(address: &str) -> String {
    if address.starts_with("one1") || address.starts_with("0x") {
        address.to_string()
    } else {
        format!("0x{address}")
    }
}

/// Total balance of each account, queried concurrently
pub async fn balance_report(network: &Arc<dyn Network>, accounts: &[Account]) -> Vec<KeyBalance> {
    let handles: Vec<_> = accounts
        .iter()
        .cloned()
        .map(|account| {
            let network = network.clone();
            tokio::spawn(async move {
                let total = match network.total_balance(&account.address).await {
                    Ok(total) => Some(total),
                    Err(e) => {
                        warn!("Failed to read balance of {}: {}", account, e);
                        None
                    }
                };
                KeyBalance { account, total }
            })
        })
        .collect();

    join_all(handles)
        .await
        .into_iter()
        .filter_map(|r| r.ok())
        .collect()
}

/// Generate `count` accounts named `{prefix}{index}` concurrently
///
/// Failed generations are logged and left out.
pub async fn generate_many(network: &Arc<dyn Network>, count: u32, prefix: &str) -> Vec<Account> {
    let handles: Vec<_> = (0..count)
        .map(|index| {
            let network = network.clone();
            let name = format!("{prefix}{index}");
            tokio::spawn(async move {
                match network.generate_account(&name).await {
                    Ok(account) => Some(account),
                    Err(e) => {
                        warn!("Failed to generate account {}: {}", name, e);
                        None
                    }
                }
            })
        })
        .collect();

    join_all(handles)
        .await
        .into_iter()
        .filter_map(|r| r.ok().flatten())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::mock::MockNetwork;
    use tempfile::tempdir;

    fn write_key(dir: &Path, name: &str, address: &str) -> PathBuf {
        let path = dir.join(format!("{name}.key"));
        fs::write(
            &path,
            format!(r#"{{"address":"{address}","crypto":{{}},"version":3}}"#),
        )
        .unwrap();
        path
    }

    #[test]
    fn test_identify_keys_walks_subdirectories() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("testnet");
        fs::create_dir_all(&nested).unwrap();

        write_key(dir.path(), "a", "one1aaa");
        write_key(&nested, "b", "0f3a");
        fs::write(dir.path().join("notes.txt"), "not a key").unwrap();
        fs::write(dir.path().join("empty.key"), r#"{"address":""}"#).unwrap();

        let keys = identify_keys(dir.path()).unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys.iter().any(|k| k.name == "a" && k.address == "one1aaa"));
        assert!(keys.iter().any(|k| k.name == "b" && k.address == "0f3a"));
    }

    #[test]
    fn test_identify_keys_missing_dir() {
        let dir = tempdir().unwrap();
        assert!(identify_keys(&dir.path().join("absent")).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_source_accounts_keeps_funded() {
        let dir = tempdir().unwrap();
        write_key(dir.path(), "rich", "one1rich");
        write_key(dir.path(), "poor", "one1poor");

        let mock = Arc::new(
            MockNetwork::new(2, Amount::ZERO)
                .with_account("rich", "one1rich")
                .with_balance("one1rich", 1, Amount::from_tokens(3)),
        );
        let network: Arc<dyn Network> = mock.clone();

        let funded = load_source_accounts(&network, dir.path()).await.unwrap();

        assert_eq!(funded, vec!["one1rich".to_string()]);
        assert!(mock.has_account("poor"));
    }

    #[tokio::test]
    async fn test_generate_many_drops_failures() {
        let mock = Arc::new(MockNetwork::new(1, Amount::ZERO).failing_account("R2"));
        let network: Arc<dyn Network> = mock;

        let accounts = generate_many(&network, 4, "R").await;
        assert_eq!(accounts.len(), 3);
        assert!(accounts.iter().all(|a| a.name != "R2"));
    }

    #[test]
    fn test_normalize_hex_address() {
        assert_eq!(normalize_hex_address("abcd"), "0xabcd");
        assert_eq!(normalize_hex_address("one1xyz"), "one1xyz");

        let key = KeyFile {
            path: PathBuf::from("k.key"),
            name: "k".to_string(),
            address: "0f3a".to_string(),
        };
        assert_eq!(key.account().address, "0x0f3a");
    }
}
