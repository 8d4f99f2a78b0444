//! Live network binding
//!
//! Combines the JSON-RPC client for reads with the `hmy` tool for keystore
//! and transfer operations.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, info};

use super::{
    HmyCli, Keystore, NetworkError, RpcClient, ShardEndpoint, TransactionClient, TransferReceipt,
    TransferRequest,
};
use crate::config::{Config, NetworkName};
use crate::models::{Account, Amount};

/// Harmony network reached over RPC and `hmy`
pub struct HarmonyNetwork {
    name: NetworkName,
    node_override: bool,
    rpc: RpcClient,
    hmy: HmyCli,
    shards: Vec<ShardEndpoint>,
}

impl HarmonyNetwork {
    /// Connect and fetch the sharding structure
    pub async fn connect(config: &Config) -> Result<Self> {
        let name = config.network.name;
        let node = config
            .network
            .node
            .clone()
            .unwrap_or_else(|| name.node_address(0));

        let rpc = RpcClient::with_timeout(config.network.timeout_secs)?;
        let shards = rpc
            .sharding_structure(&node)
            .await
            .with_context(|| format!("Failed to fetch sharding structure from {node}"))?;

        if shards.is_empty() {
            anyhow::bail!("{node} reported an empty sharding structure");
        }

        let hmy = HmyCli::new(
            &config.account.hmy_path,
            name.chain_id(),
            &config.account.passphrase,
            config.account.passphrase_file.clone(),
        )?;

        info!(
            "Connected to {} via {} ({} shards)",
            name,
            node,
            shards.len()
        );

        Ok(Self {
            name,
            node_override: config.network.node.is_some(),
            rpc,
            hmy,
            shards,
        })
    }

    /// HTTP endpoint for a shard
    fn endpoint(&self, shard: u32) -> Result<String, NetworkError> {
        let entry = self
            .shards
            .iter()
            .find(|s| s.shard_id == shard)
            .ok_or(NetworkError::UnknownShard(shard))?;

        if self.node_override {
            Ok(entry.http.clone())
        } else {
            Ok(self.name.node_address(shard))
        }
    }
}

#[async_trait]
impl Keystore for HarmonyNetwork {
    async fn generate_account(&self, name: &str) -> Result<Account, NetworkError> {
        if let Some(address) = self.find_address_by_name(name).await? {
            debug!("Account {} already exists", name);
            return Ok(Account::new(name, address));
        }

        self.hmy.add_key(name).await?;

        let address = self.find_address_by_name(name).await?.ok_or_else(|| {
            NetworkError::Keystore(format!("account {name} missing after creation"))
        })?;
        Ok(Account::new(name, address))
    }

    async fn find_address_by_name(&self, name: &str) -> Result<Option<String>, NetworkError> {
        let keys = self.hmy.list_keys().await?;
        Ok(keys
            .into_iter()
            .find(|(key, _)| key == name)
            .map(|(_, address)| address))
    }

    async fn remove_account(&self, name: &str) -> Result<(), NetworkError> {
        self.hmy.remove_key(name).await
    }

    async fn import_account(&self, key_file: &Path, name: &str) -> Result<(), NetworkError> {
        if self.find_address_by_name(name).await?.is_some() {
            info!("Keyfile {} already exists in the keystore", name);
            return Ok(());
        }
        self.hmy.import_key(key_file, name).await
    }
}

#[async_trait]
impl TransactionClient for HarmonyNetwork {
    fn shard_count(&self) -> u32 {
        self.shards.len() as u32
    }

    async fn shard_balance(&self, address: &str, shard: u32) -> Result<Amount, NetworkError> {
        let url = self.endpoint(shard)?;
        self.rpc.balance(&url, address).await
    }

    async fn current_nonce(&self, address: &str, shard: u32) -> Result<u64, NetworkError> {
        let url = self.endpoint(shard)?;
        self.rpc.transaction_count(&url, address).await
    }

    async fn submit_transfer(
        &self,
        request: &TransferRequest,
    ) -> Result<TransferReceipt, NetworkError> {
        let url = self.endpoint(request.from_shard)?;

        let nonce = match request.nonce {
            Some(nonce) => nonce,
            None => self.current_nonce(&request.from, request.from_shard).await?,
        };

        // localnet confirmation waits are doubled
        let mut request = request.clone();
        if self.name == NetworkName::Localnet {
            request.confirmation_wait *= 2;
        }

        self.hmy.transfer(&url, &request, nonce).await
    }
}
