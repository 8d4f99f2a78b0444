//! Configuration module
//!
//! The suite is configured from a YAML file, `HARMONY_TX_TESTS_*`
//! environment variables and command-line flags, later sources winning.

#![allow(dead_code)]

mod env;
mod file;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::models::Amount;

pub use env::{print_env_help, EnvConfig};
pub use file::{find_config_file, DEFAULT_CONFIG_FILE};

/// Supported networks
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum NetworkName {
    Localnet,
    Devnet,
    Testnet,
    Mainnet,
}

impl NetworkName {
    /// Normalize a network name or alias
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" | "localnet" => Some(NetworkName::Localnet),
            "dev" | "devnet" | "pga" => Some(NetworkName::Devnet),
            "testnet" | "pangaea" | "p" => Some(NetworkName::Testnet),
            "mainnet" | "main" | "t" => Some(NetworkName::Mainnet),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            NetworkName::Localnet => "localnet",
            NetworkName::Devnet => "devnet",
            NetworkName::Testnet => "testnet",
            NetworkName::Mainnet => "mainnet",
        }
    }

    /// RPC endpoint for a shard
    pub fn node_address(&self, shard: u32) -> String {
        match self {
            NetworkName::Localnet => format!("http://localhost:950{shard}"),
            NetworkName::Devnet => format!("https://api.s{shard}.pga.hmny.io"),
            NetworkName::Testnet => format!("https://api.s{shard}.p.hmny.io"),
            NetworkName::Mainnet => format!("https://api.s{shard}.t.hmny.io"),
        }
    }

    /// Chain id passed to `hmy`; localnet signs as testnet
    pub fn chain_id(&self) -> &'static str {
        match self {
            NetworkName::Localnet | NetworkName::Testnet => "testnet",
            NetworkName::Devnet => "devnet",
            NetworkName::Mainnet => "mainnet",
        }
    }
}

impl TryFrom<String> for NetworkName {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        NetworkName::from_str(&value).ok_or_else(|| {
            format!(
                "invalid network '{value}'. Valid options: localnet, devnet, testnet, mainnet"
            )
        })
    }
}

impl From<NetworkName> for String {
    fn from(value: NetworkName) -> Self {
        value.name().to_string()
    }
}

impl fmt::Display for NetworkName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn default_network() -> NetworkName {
    NetworkName::Localnet
}

fn default_gas_cost() -> Amount {
    Amount::from_atto(21_000_000_000_000)
}

fn default_timeout() -> u64 {
    30
}

/// Network settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_network")]
    pub name: NetworkName,

    /// Node used to discover the sharding structure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,

    /// Fee of a plain transfer
    #[serde(default = "default_gas_cost")]
    pub gas_cost: Amount,

    /// RPC timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            name: default_network(),
            node: None,
            gas_cost: default_gas_cost(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_keys_path() -> PathBuf {
    PathBuf::from("keys")
}

fn default_hmy_path() -> String {
    "hmy".to_string()
}

/// Keystore settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Directory of source keystore files, per network
    #[serde(default = "default_keys_path")]
    pub keys_path: PathBuf,

    #[serde(default)]
    pub passphrase: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passphrase_file: Option<PathBuf>,

    /// Path of the `hmy` binary
    #[serde(default = "default_hmy_path")]
    pub hmy_path: String,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            keys_path: default_keys_path(),
            passphrase: String::new(),
            passphrase_file: None,
            hmy_path: default_hmy_path(),
        }
    }
}

fn default_funding_name() -> String {
    "HarmonyTxTestsFunding".to_string()
}

/// Funding account identity
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FundingAccount {
    #[serde(default = "default_funding_name")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl Default for FundingAccount {
    fn default() -> Self {
        Self {
            name: default_funding_name(),
            address: None,
        }
    }
}

fn default_minimum_funds() -> Amount {
    Amount::from_tokens(10)
}

fn default_confirmation_wait() -> u64 {
    16
}

fn default_attempts() -> u32 {
    5
}

fn default_gas_price() -> u64 {
    1
}

/// Funding settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FundingConfig {
    #[serde(default)]
    pub account: FundingAccount,

    /// Below this total the funding account pulls from source keys
    #[serde(default = "default_minimum_funds")]
    pub minimum_funds: Amount,

    /// Seconds to wait for a funding receipt
    #[serde(default = "default_confirmation_wait")]
    pub confirmation_wait_time: u64,

    /// Submission attempts per funding transfer
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    #[serde(default = "default_gas_price")]
    pub gas_price: u64,
}

impl Default for FundingConfig {
    fn default() -> Self {
        Self {
            account: FundingAccount::default(),
            minimum_funds: default_minimum_funds(),
            confirmation_wait_time: default_confirmation_wait(),
            attempts: default_attempts(),
            gas_price: default_gas_price(),
        }
    }
}

fn default_test_cases_dir() -> PathBuf {
    PathBuf::from("testcases")
}

fn default_test_attempts() -> u32 {
    1
}

/// Test execution settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestingConfig {
    #[serde(default = "default_test_cases_dir")]
    pub test_cases_dir: PathBuf,

    /// Submission attempts per test transaction
    #[serde(default = "default_test_attempts")]
    pub attempts: u32,

    /// Where run results are stored; defaults to the user data directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results_dir: Option<PathBuf>,
}

impl Default for TestingConfig {
    fn default() -> Self {
        Self {
            test_cases_dir: default_test_cases_dir(),
            attempts: default_test_attempts(),
            results_dir: None,
        }
    }
}

/// Suite configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub account: AccountConfig,

    #[serde(default)]
    pub funding: FundingConfig,

    #[serde(default)]
    pub testing: TestingConfig,
}

/// Command-line overrides
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub network: Option<String>,
    pub passphrase: Option<String>,
    pub keys_path: Option<PathBuf>,
    pub funding_address: Option<String>,
    pub minimum_funds: Option<Amount>,
    pub test_cases_dir: Option<PathBuf>,
}

impl Config {
    /// Apply environment variables
    pub fn apply_env(&mut self, env: &EnvConfig) -> Result<()> {
        if let Some(network) = &env.network {
            self.network.name = parse_network(network)?;
        }
        if let Some(node) = &env.node {
            self.network.node = Some(node.clone());
        }
        if let Some(passphrase) = &env.passphrase {
            self.account.passphrase = passphrase.clone();
        }
        if let Some(keys) = &env.keys_path {
            self.account.keys_path = PathBuf::from(keys);
        }
        if let Some(hmy) = &env.hmy_path {
            self.account.hmy_path = hmy.clone();
        }
        if let Some(address) = &env.funding_address {
            self.funding.account.address = Some(address.clone());
        }
        if let Some(minimum) = env.minimum_funds {
            self.funding.minimum_funds = minimum;
        }
        if let Some(dir) = &env.test_cases_dir {
            self.testing.test_cases_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    /// Apply command-line flags
    pub fn apply_overrides(&mut self, overrides: &Overrides) -> Result<()> {
        if let Some(network) = &overrides.network {
            self.network.name = parse_network(network)?;
        }
        if let Some(passphrase) = &overrides.passphrase {
            self.account.passphrase = passphrase.clone();
        }
        if let Some(keys) = &overrides.keys_path {
            self.account.keys_path = keys.clone();
        }
        if let Some(address) = &overrides.funding_address {
            self.funding.account.address = Some(address.clone());
        }
        if let Some(minimum) = overrides.minimum_funds {
            self.funding.minimum_funds = minimum;
        }
        if let Some(dir) = &overrides.test_cases_dir {
            self.testing.test_cases_dir = dir.clone();
        }
        Ok(())
    }

    /// Source keys live in a per-network subdirectory
    pub fn network_keys_path(&self) -> PathBuf {
        self.account.keys_path.join(self.network.name.name())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.funding.attempts == 0 {
            anyhow::bail!("funding.attempts must be at least 1");
        }
        if self.testing.attempts == 0 {
            anyhow::bail!("testing.attempts must be at least 1");
        }
        if self.funding.account.name.trim().is_empty() && self.funding.account.address.is_none() {
            anyhow::bail!("funding.account needs a name or an address");
        }
        if self.account.hmy_path.trim().is_empty() {
            anyhow::bail!("account.hmy_path must not be empty");
        }
        if let Some(node) = &self.network.node {
            if !node.starts_with("http://") && !node.starts_with("https://") {
                anyhow::bail!("network.node must be an http(s) URL, got {node}");
            }
        }
        Ok(())
    }
}

fn parse_network(value: &str) -> Result<NetworkName> {
    NetworkName::try_from(value.to_string()).map_err(anyhow::Error::msg)
}
