//! Funding manager
//!
//! Keeps a solvent funding account and fans funds out to freshly generated
//! accounts. Nonces for a fan-out batch are assigned before any transfer is
//! spawned, so concurrent transfers from the funding address never collide.

use anyhow::{Context, Result};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::accounts;
use crate::config::Config;
use crate::executor::RetryExecutor;
use crate::models::{Account, Amount};
use crate::network::{Network, TransferRequest};

/// Funding transfer settings
#[derive(Clone, Debug)]
pub struct FundingSettings {
    pub gas_cost: Amount,
    pub gas_price: u64,
    pub confirmation_wait_time: u64,
    pub attempts: u32,
    pub minimum_funds: Amount,
}

impl FundingSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            gas_cost: config.network.gas_cost,
            gas_price: config.funding.gas_price,
            confirmation_wait_time: config.funding.confirmation_wait_time,
            attempts: config.funding.attempts,
            minimum_funds: config.funding.minimum_funds,
        }
    }
}

/// Owner of the funding account
#[derive(Clone)]
pub struct FundingManager {
    network: Arc<dyn Network>,
    retry: RetryExecutor,
    account: Account,
    settings: FundingSettings,
}

impl FundingManager {
    pub fn new(network: Arc<dyn Network>, account: Account, settings: FundingSettings) -> Self {
        Self {
            retry: RetryExecutor::new(network.clone()),
            network,
            account,
            settings,
        }
    }

    /// Resolve the funding account and top it up from `candidates` if needed
    pub async fn setup_funding_account(
        network: Arc<dyn Network>,
        config: &Config,
        candidates: &[String],
    ) -> Result<Self> {
        let name = config.funding.account.name.clone();

        let address = match &config.funding.account.address {
            Some(address) => address.clone(),
            None => match network
                .find_address_by_name(&name)
                .await
                .with_context(|| format!("Failed to look up funding account {name}"))?
            {
                Some(address) => address,
                None => {
                    info!("Generating funding account {}", name);
                    network
                        .generate_account(&name)
                        .await
                        .with_context(|| format!("Failed to create funding account {name}"))?
                        .address
                }
            },
        };

        let manager = Self::new(
            network,
            Account::new(name, address),
            FundingSettings::from_config(config),
        );

        let balance = manager
            .network
            .total_balance(manager.address())
            .await
            .with_context(|| format!("Failed to read balance of {}", manager.address()))?;

        info!(
            "Funding account {} holds {} token(s)",
            manager.account, balance
        );

        if balance < manager.settings.minimum_funds {
            info!(
                "Funding balance is below the minimum of {} - pulling funds from {} source account(s)",
                manager.settings.minimum_funds,
                candidates.len()
            );
            let pulled = manager.pull_funds(candidates).await;
            info!("Pulled funds in {} transfer(s)", pulled);
        }

        Ok(manager)
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn address(&self) -> &str {
        &self.account.address
    }

    pub fn settings(&self) -> &FundingSettings {
        &self.settings
    }

    /// Move every candidate's shard balance, minus fees, to the funding account
    async fn pull_funds(&self, candidates: &[String]) -> usize {
        let mut handles = Vec::new();

        for candidate in candidates.iter().filter(|c| c.as_str() != self.address()) {
            for shard in 0..self.network.shard_count() {
                let network = self.network.clone();
                let retry = self.retry.clone();
                let settings = self.settings.clone();
                let candidate = candidate.clone();
                let funding_address = self.address().to_string();

                let handle = tokio::spawn(async move {
                    let balance = match network.shard_balance(&candidate, shard).await {
                        Ok(balance) => balance,
                        Err(e) => {
                            warn!("Failed to read balance of {} on shard {}: {}", candidate, shard, e);
                            return false;
                        }
                    };

                    let amount = match balance.checked_sub(settings.gas_cost) {
                        Some(amount) if !amount.is_zero() => amount,
                        _ => return false,
                    };

                    let request = TransferRequest::new(candidate, shard, funding_address, shard, amount)
                        .with_gas_price(settings.gas_price)
                        .with_confirmation_wait(settings.confirmation_wait_time);

                    retry.attempt_transfer(&request, settings.attempts).await
                });

                handles.push(handle);
            }
        }

        join_all(handles)
            .await
            .into_iter()
            .filter_map(|r| r.ok())
            .filter(|pulled| *pulled)
            .count()
    }

    /// Amount to give a sender that will send `amount` to `receivers` receivers
    ///
    /// Falls back to one token per receiver when the funding account cannot
    /// cover the full amount. Gas for one transfer is always added.
    pub async fn funding_amount(&self, shard: u32, amount: Amount, receivers: u32) -> Amount {
        let receivers = receivers.max(1) as u64;
        let wanted = amount.times(receivers);

        let affordable = match self.network.shard_balance(self.address(), shard).await {
            Ok(balance) => wanted <= balance,
            Err(e) => {
                warn!("Failed to read funding balance on shard {}: {}", shard, e);
                false
            }
        };

        let base = if affordable {
            wanted
        } else {
            Amount::from_tokens(1).times(receivers)
        };
        base.saturating_add(self.settings.gas_cost)
    }

    /// Generate `name` and fund it with a network-resolved nonce
    pub async fn generate_and_fund_account(
        &self,
        name: &str,
        from_shard: u32,
        to_shard: u32,
        amount: Amount,
    ) -> Result<Account> {
        let account = self
            .network
            .generate_account(name)
            .await
            .with_context(|| format!("Failed to generate account {name}"))?;

        let request = self.funding_request(&account, from_shard, to_shard, amount, None);
        if !self.retry.attempt_transfer(&request, self.settings.attempts).await {
            warn!("Failed to fund {} with {} token(s)", account, amount);
        }

        Ok(account)
    }

    /// Generate `count` accounts named `{prefix}{index}` and fund each
    ///
    /// The funding nonce is read once; the i-th successfully generated
    /// account is funded with nonce `base + i`. Accounts are returned in
    /// arrival order; accounts that could not be generated are dropped.
    pub async fn generate_and_fund_accounts(
        &self,
        count: u32,
        prefix: &str,
        from_shard: u32,
        to_shard: u32,
        amount: Amount,
    ) -> Result<Vec<Account>> {
        let generated = accounts::generate_many(&self.network, count, prefix).await;
        if generated.is_empty() {
            return Ok(Vec::new());
        }

        let base_nonce = self
            .network
            .current_nonce(self.address(), from_shard)
            .await
            .with_context(|| format!("Failed to fetch nonce of funding account {}", self.account))?;

        debug!(
            "Funding {} account(s) from nonce {} on shard {}",
            generated.len(),
            base_nonce,
            from_shard
        );

        let (tx, mut rx) = mpsc::channel::<Account>(generated.len());
        let mut handles = Vec::new();

        for (index, account) in generated.into_iter().enumerate() {
            let nonce = base_nonce + index as u64;
            let request = self.funding_request(&account, from_shard, to_shard, amount, Some(nonce));
            let retry = self.retry.clone();
            let attempts = self.settings.attempts;
            let tx = tx.clone();

            let handle = tokio::spawn(async move {
                if !retry.attempt_transfer(&request, attempts).await {
                    warn!("Failed to fund {} with nonce {}", account, nonce);
                }
                let _ = tx.send(account).await;
            });

            handles.push(handle);
        }

        join_all(handles).await;
        drop(tx);

        let mut accounts = Vec::new();
        while let Some(account) = rx.recv().await {
            accounts.push(account);
        }

        Ok(accounts)
    }

    fn funding_request(
        &self,
        account: &Account,
        from_shard: u32,
        to_shard: u32,
        amount: Amount,
        nonce: Option<u64>,
    ) -> TransferRequest {
        TransferRequest::new(self.address(), from_shard, &account.address, to_shard, amount)
            .with_nonce(nonce)
            .with_gas_price(self.settings.gas_price)
            .with_confirmation_wait(self.settings.confirmation_wait_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::mock::MockNetwork;
    use std::collections::BTreeSet;

    const FUNDER: &str = "one1funding";

    fn config() -> Config {
        let mut config = Config::default();
        config.network.gas_cost = Amount::ZERO;
        config.funding.account.address = Some(FUNDER.to_string());
        config.funding.minimum_funds = Amount::from_tokens(10);
        config.funding.attempts = 2;
        config
    }

    #[tokio::test]
    async fn test_fan_out_assigns_consecutive_nonces() {
        let mock = Arc::new(
            MockNetwork::new(1, Amount::ZERO)
                .with_balance(FUNDER, 0, Amount::from_tokens(50))
                .with_nonce(FUNDER, 0, 7),
        );
        let manager = FundingManager::setup_funding_account(mock.clone(), &config(), &[])
            .await
            .unwrap();

        let accounts = manager
            .generate_and_fund_accounts(10, "Sender", 0, 0, Amount::from_tokens(1))
            .await
            .unwrap();

        assert_eq!(accounts.len(), 10);
        let nonces: BTreeSet<u64> = mock.submissions().iter().map(|s| s.nonce).collect();
        assert_eq!(nonces, (7..17).collect::<BTreeSet<u64>>());
        assert_eq!(mock.submissions().len(), 10);
        for account in &accounts {
            assert_eq!(mock.balance(&account.address, 0), Amount::from_tokens(1));
        }
        assert_eq!(mock.balance(FUNDER, 0), Amount::from_tokens(40));
    }

    #[tokio::test]
    async fn test_generation_failure_leaves_no_nonce_gap() {
        let mock = Arc::new(
            MockNetwork::new(1, Amount::ZERO)
                .with_balance(FUNDER, 0, Amount::from_tokens(50))
                .failing_account("Sender1"),
        );
        let manager = FundingManager::setup_funding_account(mock.clone(), &config(), &[])
            .await
            .unwrap();

        let accounts = manager
            .generate_and_fund_accounts(4, "Sender", 0, 0, Amount::from_tokens(1))
            .await
            .unwrap();

        assert_eq!(accounts.len(), 3);
        assert!(accounts.iter().all(|a| a.name != "Sender1"));
        let nonces: BTreeSet<u64> = mock.submissions().iter().map(|s| s.nonce).collect();
        assert_eq!(nonces, (0..3).collect::<BTreeSet<u64>>());
        assert!(mock.submissions().iter().all(|s| s.accepted));
    }

    #[tokio::test]
    async fn test_setup_skips_pull_when_solvent() {
        let mock = Arc::new(
            MockNetwork::new(2, Amount::ZERO)
                .with_balance(FUNDER, 1, Amount::from_tokens(10))
                .with_balance("one1source", 0, Amount::from_tokens(5)),
        );
        FundingManager::setup_funding_account(mock.clone(), &config(), &["one1source".to_string()])
            .await
            .unwrap();

        assert_eq!(mock.submit_calls(), 0);
    }

    #[tokio::test]
    async fn test_setup_pulls_from_candidates() {
        let gas = Amount::from_atto(1_000);
        let mut cfg = config();
        cfg.network.gas_cost = gas;

        let mock = Arc::new(
            MockNetwork::new(2, gas)
                .with_balance("one1a", 0, Amount::from_tokens(4))
                .with_balance("one1a", 1, Amount::from_tokens(3))
                .with_balance("one1b", 1, Amount::from_tokens(2)),
        );
        let manager = FundingManager::setup_funding_account(
            mock.clone(),
            &cfg,
            &["one1a".to_string(), "one1b".to_string(), "one1empty".to_string()],
        )
        .await
        .unwrap();

        // one transfer per funded (candidate, shard) pair
        assert_eq!(mock.submissions().len(), 3);
        assert_eq!(
            mock.balance(manager.address(), 0),
            Amount::from_tokens(4).saturating_sub(gas)
        );
        assert_eq!(mock.balance("one1a", 1), Amount::ZERO);
    }

    #[tokio::test]
    async fn test_setup_generates_missing_account() {
        let mut cfg = config();
        cfg.funding.account.address = None;
        cfg.funding.account.name = "Funder".to_string();
        cfg.funding.minimum_funds = Amount::ZERO;

        let mock = Arc::new(MockNetwork::new(1, Amount::ZERO));
        let manager = FundingManager::setup_funding_account(mock.clone(), &cfg, &[])
            .await
            .unwrap();

        assert!(mock.has_account("Funder"));
        assert_eq!(mock.address_of("Funder").as_deref(), Some(manager.address()));
    }

    #[tokio::test]
    async fn test_setup_finds_account_by_name() {
        let mut cfg = config();
        cfg.funding.account.address = None;
        cfg.funding.account.name = "Funder".to_string();
        cfg.funding.minimum_funds = Amount::ZERO;

        let mock = Arc::new(MockNetwork::new(1, Amount::ZERO).with_account("Funder", "one1known"));
        let manager = FundingManager::setup_funding_account(mock, &cfg, &[])
            .await
            .unwrap();

        assert_eq!(manager.address(), "one1known");
    }

    #[tokio::test]
    async fn test_funding_amount_rule() {
        let mut cfg = config();
        cfg.network.gas_cost = Amount::from_atto(5);
        let mock = Arc::new(
            MockNetwork::new(1, Amount::ZERO).with_balance(FUNDER, 0, Amount::from_tokens(20)),
        );
        let manager = FundingManager::setup_funding_account(mock, &cfg, &[])
            .await
            .unwrap();

        let affordable = manager.funding_amount(0, Amount::from_tokens(2), 3).await;
        assert_eq!(affordable, Amount::from_tokens(6).saturating_add(Amount::from_atto(5)));

        let fallback = manager.funding_amount(0, Amount::from_tokens(100), 2).await;
        assert_eq!(fallback, Amount::from_tokens(2).saturating_add(Amount::from_atto(5)));

        let single = manager.funding_amount(0, Amount::from_tokens(1), 0).await;
        assert_eq!(single, Amount::from_tokens(1).saturating_add(Amount::from_atto(5)));
    }
}
