//! In-memory network for tests
//!
//! Keeps an exact ledger per (address, shard), accepts each nonce once and
//! records every submission.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;

use super::{Keystore, NetworkError, TransactionClient, TransferReceipt, TransferRequest};
use crate::models::{Account, Amount};

/// A submission as the mock saw it
#[derive(Clone, Debug)]
pub struct Submission {
    pub request: TransferRequest,
    pub nonce: u64,
    pub accepted: bool,
}

#[derive(Default)]
struct MockState {
    balances: HashMap<(String, u32), Amount>,
    keys: HashMap<String, String>,
    next_nonce: HashMap<(String, u32), u64>,
    nonce_floor: HashMap<(String, u32), u64>,
    used_nonces: HashMap<(String, u32), HashSet<u64>>,
    submissions: Vec<Submission>,
    submit_calls: usize,
    failing_submits: usize,
    always_fail: bool,
    reuse_nonces: bool,
    failing_accounts: HashSet<String>,
    generated: u64,
    tx_counter: u64,
}

/// In-memory [`Keystore`] + [`TransactionClient`]
pub struct MockNetwork {
    shards: u32,
    gas_cost: Amount,
    state: Mutex<MockState>,
}

impl MockNetwork {
    pub fn new(shards: u32, gas_cost: Amount) -> Self {
        Self {
            shards,
            gas_cost,
            state: Mutex::new(MockState::default()),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn with_balance(self, address: &str, shard: u32, amount: Amount) -> Self {
        self.set_balance(address, shard, amount);
        self
    }

    pub fn with_nonce(self, address: &str, shard: u32, nonce: u64) -> Self {
        {
            let mut state = self.state();
            let key = (address.to_string(), shard);
            state.next_nonce.insert(key.clone(), nonce);
            state.nonce_floor.insert(key, nonce);
        }
        self
    }

    pub fn with_account(self, name: &str, address: &str) -> Self {
        self.state()
            .keys
            .insert(name.to_string(), address.to_string());
        self
    }

    /// Every submission returns a transport error
    pub fn always_failing(self) -> Self {
        self.state().always_fail = true;
        self
    }

    /// Accept a nonce that was already used, as a faulty node would
    pub fn accepting_reused_nonces(self) -> Self {
        self.state().reuse_nonces = true;
        self
    }

    /// The next `count` submissions return a transport error
    pub fn failing_first(self, count: usize) -> Self {
        self.state().failing_submits = count;
        self
    }

    /// Account generation for `name` fails
    pub fn failing_account(self, name: &str) -> Self {
        self.state().failing_accounts.insert(name.to_string());
        self
    }

    pub fn set_balance(&self, address: &str, shard: u32, amount: Amount) {
        self.state()
            .balances
            .insert((address.to_string(), shard), amount);
    }

    pub fn balance(&self, address: &str, shard: u32) -> Amount {
        self.state()
            .balances
            .get(&(address.to_string(), shard))
            .copied()
            .unwrap_or_default()
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.state().submissions.clone()
    }

    pub fn submit_calls(&self) -> usize {
        self.state().submit_calls
    }

    pub fn has_account(&self, name: &str) -> bool {
        self.state().keys.contains_key(name)
    }

    pub fn address_of(&self, name: &str) -> Option<String> {
        self.state().keys.get(name).cloned()
    }
}

#[async_trait]
impl Keystore for MockNetwork {
    async fn generate_account(&self, name: &str) -> Result<Account, NetworkError> {
        let mut state = self.state();
        if state.failing_accounts.contains(name) {
            return Err(NetworkError::Keystore(format!("cannot create {name}")));
        }
        if let Some(address) = state.keys.get(name) {
            return Ok(Account::new(name, address.clone()));
        }
        state.generated += 1;
        let address = format!("one1mock{:034}", state.generated);
        state.keys.insert(name.to_string(), address.clone());
        Ok(Account::new(name, address))
    }

    async fn find_address_by_name(&self, name: &str) -> Result<Option<String>, NetworkError> {
        Ok(self.state().keys.get(name).cloned())
    }

    async fn remove_account(&self, name: &str) -> Result<(), NetworkError> {
        self.state().keys.remove(name);
        Ok(())
    }

    async fn import_account(&self, key_file: &Path, name: &str) -> Result<(), NetworkError> {
        let mut state = self.state();
        if !state.keys.contains_key(name) {
            let address = key_file
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or(name)
                .to_string();
            state.keys.insert(name.to_string(), address);
        }
        Ok(())
    }
}

#[async_trait]
impl TransactionClient for MockNetwork {
    fn shard_count(&self) -> u32 {
        self.shards
    }

    async fn shard_balance(&self, address: &str, shard: u32) -> Result<Amount, NetworkError> {
        if shard >= self.shards {
            return Err(NetworkError::UnknownShard(shard));
        }
        Ok(self.balance(address, shard))
    }

    async fn current_nonce(&self, address: &str, shard: u32) -> Result<u64, NetworkError> {
        Ok(self
            .state()
            .next_nonce
            .get(&(address.to_string(), shard))
            .copied()
            .unwrap_or(0))
    }

    async fn submit_transfer(
        &self,
        request: &TransferRequest,
    ) -> Result<TransferReceipt, NetworkError> {
        let mut state = self.state();
        state.submit_calls += 1;

        if state.always_fail {
            return Err(NetworkError::Rpc("injected failure".to_string()));
        }
        if state.failing_submits > 0 {
            state.failing_submits -= 1;
            return Err(NetworkError::Rpc("injected failure".to_string()));
        }
        if request.from_shard >= self.shards || request.to_shard >= self.shards {
            return Err(NetworkError::UnknownShard(request.from_shard.max(request.to_shard)));
        }

        let sender = (request.from.clone(), request.from_shard);
        let next = state.next_nonce.get(&sender).copied().unwrap_or(0);
        let floor = state.nonce_floor.get(&sender).copied().unwrap_or(0);
        let nonce = request.nonce.unwrap_or(next);

        // pre-assigned nonces may arrive out of order
        let nonce_free = nonce >= floor
            && (state.reuse_nonces
                || !state
                    .used_nonces
                    .get(&sender)
                    .map(|used| used.contains(&nonce))
                    .unwrap_or(false));

        let cost = request.amount.saturating_add(self.gas_cost);
        let balance = state.balances.get(&sender).copied().unwrap_or_default();
        let accepted = nonce_free && balance >= cost;

        if accepted {
            state.used_nonces.entry(sender.clone()).or_default().insert(nonce);
            state.next_nonce.insert(sender.clone(), next.max(nonce + 1));

            state.balances.insert(sender, balance.saturating_sub(cost));
            let receiver = (request.to.clone(), request.to_shard);
            let received = state.balances.get(&receiver).copied().unwrap_or_default();
            state
                .balances
                .insert(receiver, received.saturating_add(request.amount));
        }

        state.tx_counter += 1;
        let transaction_hash = format!("0x{:064x}", state.tx_counter);
        state.submissions.push(Submission {
            request: request.clone(),
            nonce,
            accepted,
        });

        let status = if accepted { "0x1" } else { "0x0" };
        Ok(TransferReceipt {
            transaction_hash: transaction_hash.clone(),
            status: status.to_string(),
            raw: serde_json::json!({
                "transactionHash": transaction_hash,
                "status": status,
                "nonce": nonce,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_transfer_moves_funds() {
        let gas = Amount::from_atto(10);
        let mock = MockNetwork::new(2, gas).with_balance("a", 0, Amount::from_tokens(5));

        let request = TransferRequest::new("a", 0, "b", 1, Amount::from_tokens(2));
        let receipt = mock.submit_transfer(&request).await.unwrap();

        assert!(receipt.is_successful());
        assert_eq!(mock.balance("b", 1), Amount::from_tokens(2));
        assert_eq!(
            mock.balance("a", 0),
            Amount::from_tokens(3).saturating_sub(gas)
        );
        assert_eq!(mock.current_nonce("a", 0).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_nonce_rejected() {
        let mock = MockNetwork::new(1, Amount::ZERO).with_balance("a", 0, Amount::from_tokens(5));

        let first = TransferRequest::new("a", 0, "b", 0, Amount::from_tokens(1)).with_nonce(Some(0));
        let second = TransferRequest::new("a", 0, "c", 0, Amount::from_tokens(1)).with_nonce(Some(0));

        assert!(mock.submit_transfer(&first).await.unwrap().is_successful());
        assert!(!mock.submit_transfer(&second).await.unwrap().is_successful());
        assert_eq!(mock.balance("c", 0), Amount::ZERO);
    }

    #[test]
    fn test_import_uses_file_stem() {
        let mock = MockNetwork::new(1, Amount::ZERO);
        tokio_test::block_on(async {
            mock.import_account(Path::new("/keys/one1abc.key"), "source").await.unwrap();
            // an existing alias is left alone
            mock.import_account(Path::new("/keys/other.key"), "source").await.unwrap();
            assert_eq!(
                mock.find_address_by_name("source").await.unwrap().as_deref(),
                Some("one1abc")
            );
        });
    }

    #[tokio::test]
    async fn test_generate_is_idempotent() {
        let mock = MockNetwork::new(1, Amount::ZERO);
        let first = mock.generate_account("x").await.unwrap();
        let second = mock.generate_account("x").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(mock.total_balance(&first.address).await.unwrap(), Amount::ZERO);
    }
}
