//! Network access
//!
//! The suite talks to the chain through two traits: [`Keystore`] for local
//! account management and [`TransactionClient`] for balances, nonces and
//! transfer submission. [`HarmonyNetwork`] binds both to a live network via
//! JSON-RPC and the `hmy` command-line tool.

mod harmony;
mod hmy;
#[cfg(test)]
pub mod mock;
mod rpc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::models::{Account, Amount};

pub use harmony::HarmonyNetwork;
pub use hmy::HmyCli;
pub use rpc::{RpcClient, ShardEndpoint};

/// Receipt status of an executed transaction
pub const STATUS_SUCCESS: &str = "0x1";

/// Network errors
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("RPC request failed: {0}")]
    Rpc(String),

    #[error("RPC error {code}: {message}")]
    RpcResponse { code: i64, message: String },

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Connection refused to {0}")]
    ConnectionRefused(String),

    #[error("Unknown shard {0}")]
    UnknownShard(u32),

    #[error("Keystore error: {0}")]
    Keystore(String),

    #[error("hmy command failed: {0}")]
    Command(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Local account store
#[async_trait]
pub trait Keystore: Send + Sync {
    /// Create an account under `name`; returns the existing one if present
    async fn generate_account(&self, name: &str) -> Result<Account, NetworkError>;

    async fn find_address_by_name(&self, name: &str) -> Result<Option<String>, NetworkError>;

    /// Remove `name`; removing a missing account is not an error
    async fn remove_account(&self, name: &str) -> Result<(), NetworkError>;

    /// Import a keystore file under `name`; no-op if the alias exists
    async fn import_account(&self, key_file: &Path, name: &str) -> Result<(), NetworkError>;
}

/// Chain reads and transfer submission
#[async_trait]
pub trait TransactionClient: Send + Sync {
    fn shard_count(&self) -> u32;

    async fn shard_balance(&self, address: &str, shard: u32) -> Result<Amount, NetworkError>;

    /// Balance summed over every shard
    async fn total_balance(&self, address: &str) -> Result<Amount, NetworkError> {
        let mut total = Amount::ZERO;
        for shard in 0..self.shard_count() {
            total = total.saturating_add(self.shard_balance(address, shard).await?);
        }
        Ok(total)
    }

    async fn current_nonce(&self, address: &str, shard: u32) -> Result<u64, NetworkError>;

    async fn submit_transfer(
        &self,
        request: &TransferRequest,
    ) -> Result<TransferReceipt, NetworkError>;
}

/// Everything the suite needs from a network
pub trait Network: Keystore + TransactionClient {}

impl<T: Keystore + TransactionClient + ?Sized> Network for T {}

/// A single transfer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub from: String,
    pub from_shard: u32,
    pub to: String,
    pub to_shard: u32,
    pub amount: Amount,
    /// `None` lets the client resolve the nonce just before submission
    pub nonce: Option<u64>,
    pub gas_price: u64,
    pub data: Option<String>,
    /// Zero submits without waiting for a receipt
    pub confirmation_wait: Duration,
}

impl TransferRequest {
    pub fn new(
        from: impl Into<String>,
        from_shard: u32,
        to: impl Into<String>,
        to_shard: u32,
        amount: Amount,
    ) -> Self {
        Self {
            from: from.into(),
            from_shard,
            to: to.into(),
            to_shard,
            amount,
            nonce: None,
            gas_price: 1,
            data: None,
            confirmation_wait: Duration::ZERO,
        }
    }

    pub fn with_nonce(mut self, nonce: Option<u64>) -> Self {
        self.nonce = nonce;
        self
    }

    pub fn with_gas_price(mut self, gas_price: u64) -> Self {
        self.gas_price = gas_price;
        self
    }

    pub fn with_data(mut self, data: Option<String>) -> Self {
        self.data = data;
        self
    }

    pub fn with_confirmation_wait(mut self, secs: u64) -> Self {
        self.confirmation_wait = Duration::from_secs(secs);
        self
    }
}

impl fmt::Display for TransferRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} token(s) from {} (shard {}) to {} (shard {})",
            self.amount, self.from, self.from_shard, self.to, self.to_shard
        )?;
        if let Some(nonce) = self.nonce {
            write!(f, " with nonce {nonce}")?;
        }
        Ok(())
    }
}

/// Result of a submission as reported by the network
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub transaction_hash: String,
    pub status: String,
    pub raw: serde_json::Value,
}

impl TransferReceipt {
    pub fn is_successful(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receipt_status() {
        let mut receipt = TransferReceipt {
            transaction_hash: "0xabc".to_string(),
            status: "0x1".to_string(),
            raw: serde_json::Value::Null,
        };
        assert!(receipt.is_successful());

        receipt.status = "0x0".to_string();
        assert!(!receipt.is_successful());

        receipt.status = String::new();
        assert!(!receipt.is_successful());
    }

    #[test]
    fn test_request_builder() {
        let request = TransferRequest::new("one1a", 0, "one1b", 1, Amount::from_tokens(2))
            .with_nonce(Some(4))
            .with_gas_price(3)
            .with_confirmation_wait(8);

        assert_eq!(request.nonce, Some(4));
        assert_eq!(request.gas_price, 3);
        assert_eq!(request.confirmation_wait, Duration::from_secs(8));
        assert_eq!(
            request.to_string(),
            "2 token(s) from one1a (shard 0) to one1b (shard 1) with nonce 4"
        );
    }
}
