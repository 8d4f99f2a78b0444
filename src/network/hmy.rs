//! `hmy` command-line tool wrapper
//!
//! Keystore management and signed transfer submission are delegated to the
//! `hmy` binary.

use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::{debug, info};

use super::{NetworkError, TransferReceipt, TransferRequest};

/// Default keystore location used by `hmy`
const ACCOUNT_KEYS_DIR: &str = ".hmy_cli/account-keys";

enum PassphraseSource {
    File(PathBuf),
    Temp(NamedTempFile),
}

impl PassphraseSource {
    fn path(&self) -> &Path {
        match self {
            PassphraseSource::File(path) => path,
            PassphraseSource::Temp(file) => file.path(),
        }
    }
}

/// Wrapper around the `hmy` binary
pub struct HmyCli {
    binary: String,
    chain_id: String,
    accounts_dir: PathBuf,
    passphrase: PassphraseSource,
}

impl HmyCli {
    /// Create a wrapper; a plain passphrase is written to a private temp file
    pub fn new(
        binary: impl Into<String>,
        chain_id: impl Into<String>,
        passphrase: &str,
        passphrase_file: Option<PathBuf>,
    ) -> Result<Self, NetworkError> {
        let passphrase = match passphrase_file {
            Some(path) => PassphraseSource::File(path),
            None => {
                let mut file = NamedTempFile::new()
                    .map_err(|e| NetworkError::Keystore(format!("passphrase file: {e}")))?;
                file.write_all(passphrase.as_bytes())
                    .map_err(|e| NetworkError::Keystore(format!("passphrase file: {e}")))?;
                PassphraseSource::Temp(file)
            }
        };

        let accounts_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(ACCOUNT_KEYS_DIR);

        Ok(Self {
            binary: binary.into(),
            chain_id: chain_id.into(),
            accounts_dir,
            passphrase,
        })
    }

    /// Override the keystore directory
    pub fn with_accounts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.accounts_dir = dir.into();
        self
    }

    fn passphrase_arg(&self) -> String {
        format!("--passphrase-file={}", self.passphrase.path().display())
    }

    async fn run(&self, args: &[String]) -> Result<String, NetworkError> {
        debug!("Running {} {}", self.binary, args.join(" "));

        let output = Command::new(&self.binary)
            .args(args)
            .output()
            .await
            .map_err(|e| NetworkError::Command(format!("failed to spawn {}: {e}", self.binary)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let detail = if stderr.trim().is_empty() {
                stdout.trim().to_string()
            } else {
                stderr.trim().to_string()
            };
            return Err(NetworkError::Command(detail));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// `hmy keys add`
    pub async fn add_key(&self, name: &str) -> Result<(), NetworkError> {
        self.run(&[
            "keys".to_string(),
            "add".to_string(),
            name.to_string(),
            self.passphrase_arg(),
        ])
        .await
        .map_err(|e| NetworkError::Keystore(format!("failed to create {name}: {e}")))?;
        Ok(())
    }

    /// `hmy keys list` as (name, address) pairs
    pub async fn list_keys(&self) -> Result<Vec<(String, String)>, NetworkError> {
        let stdout = self
            .run(&["keys".to_string(), "list".to_string()])
            .await
            .map_err(|e| NetworkError::Keystore(e.to_string()))?;
        Ok(parse_key_list(&stdout))
    }

    /// `hmy keys import-ks`
    pub async fn import_key(&self, key_file: &Path, name: &str) -> Result<(), NetworkError> {
        self.run(&[
            "keys".to_string(),
            "import-ks".to_string(),
            key_file.display().to_string(),
            name.to_string(),
            self.passphrase_arg(),
        ])
        .await
        .map_err(|e| NetworkError::Keystore(format!("failed to import {}: {e}", key_file.display())))?;
        info!("Imported keyfile {} as {}", key_file.display(), name);
        Ok(())
    }

    /// Delete the alias directory; missing aliases are ignored
    pub async fn remove_key(&self, name: &str) -> Result<(), NetworkError> {
        let dir = self.accounts_dir.join(name);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {
                debug!("Removed keystore alias {}", name);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(NetworkError::Keystore(format!(
                "failed to remove {}: {e}",
                dir.display()
            ))),
        }
    }

    /// `hmy transfer` against `node`
    pub async fn transfer(
        &self,
        node: &str,
        request: &TransferRequest,
        nonce: u64,
    ) -> Result<TransferReceipt, NetworkError> {
        let mut args = vec![
            format!("--node={node}"),
            "transfer".to_string(),
            format!("--from={}", request.from),
            format!("--to={}", request.to),
            format!("--from-shard={}", request.from_shard),
            format!("--to-shard={}", request.to_shard),
            format!("--amount={}", request.amount),
            format!("--gas-price={}", request.gas_price),
            format!("--nonce={nonce}"),
            format!("--chain-id={}", self.chain_id),
            self.passphrase_arg(),
        ];
        if let Some(data) = request.data.as_deref().filter(|d| !d.is_empty()) {
            args.push(format!("--data={}", encode_tx_data(data)));
        }
        let wait = request.confirmation_wait.as_secs();
        if wait > 0 {
            args.push(format!("--wait-for-confirm={wait}"));
        }

        let stdout = self.run(&args).await?;
        parse_transfer_output(&stdout)
    }
}

/// Hex encoding of a transaction payload
pub fn encode_tx_data(data: &str) -> String {
    format!("0x{}", hex::encode(data.as_bytes()))
}

fn parse_key_list(stdout: &str) -> Vec<(String, String)> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let name = parts.next()?;
            let address = parts.next()?;
            if name == "NAME" || !address.starts_with("one1") {
                return None;
            }
            Some((name.to_string(), address.to_string()))
        })
        .collect()
}

fn parse_transfer_output(stdout: &str) -> Result<TransferReceipt, NetworkError> {
    let start = stdout
        .find('{')
        .ok_or_else(|| NetworkError::InvalidResponse(format!("no JSON in output: {}", stdout.trim())))?;
    let raw: Value = serde_json::from_str(stdout[start..].trim())
        .map_err(|e| NetworkError::InvalidResponse(format!("{e}: {}", stdout.trim())))?;

    let receipt = raw.get("receipt").unwrap_or(&raw);
    let field = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| receipt.get(*k).or_else(|| raw.get(*k)))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    let transaction_hash = field(&["transactionHash", "transaction-hash", "hash"]);
    let status = field(&["status"]);

    Ok(TransferReceipt {
        transaction_hash,
        status,
        raw,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_list() {
        let stdout = "NAME                  ADDRESS\n\n\
                      funding               one1zksj3evekayy90xt4psrz8h6j2v3hla4qwz4ur\n\
                      TestCase_a_Sender     one1y5n7p8a845v96xyx2gh75wn5eyhtw5002lah27\n";
        let keys = parse_key_list(stdout);
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].0, "funding");
        assert_eq!(keys[1].1, "one1y5n7p8a845v96xyx2gh75wn5eyhtw5002lah27");
    }

    #[test]
    fn test_parse_receipt_output() {
        let stdout = r#"{"blockNumber":"0x2","status":"0x1","transactionHash":"0xfeed"}"#;
        let receipt = parse_transfer_output(stdout).unwrap();
        assert!(receipt.is_successful());
        assert_eq!(receipt.transaction_hash, "0xfeed");
    }

    #[test]
    fn test_parse_hash_only_output() {
        let stdout = "some banner\n{\"transaction-hash\":\"0xbeef\"}\n";
        let receipt = parse_transfer_output(stdout).unwrap();
        assert!(!receipt.is_successful());
        assert_eq!(receipt.transaction_hash, "0xbeef");
    }

    #[test]
    fn test_parse_garbage_output() {
        assert!(parse_transfer_output("error: insufficient funds").is_err());
    }

    #[test]
    fn test_encode_tx_data() {
        assert_eq!(encode_tx_data("aa"), "0x6161");
    }

    #[tokio::test]
    async fn test_remove_missing_key_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let cli = HmyCli::new("hmy", "testnet", "secret", None)
            .unwrap()
            .with_accounts_dir(dir.path());

        std::fs::create_dir_all(dir.path().join("present")).unwrap();
        cli.remove_key("present").await.unwrap();
        assert!(!dir.path().join("present").exists());
        cli.remove_key("present").await.unwrap();
    }
}
