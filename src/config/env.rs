//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration.

use std::env;

use crate::models::Amount;

/// Environment variable prefix
const ENV_PREFIX: &str = "HARMONY_TX_TESTS";

/// Environment configuration from environment variables
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    /// Network from HARMONY_TX_TESTS_NETWORK
    pub network: Option<String>,
    /// Node from HARMONY_TX_TESTS_NODE
    pub node: Option<String>,
    /// Passphrase from HARMONY_TX_TESTS_PASSPHRASE
    pub passphrase: Option<String>,
    /// Keys path from HARMONY_TX_TESTS_KEYS
    pub keys_path: Option<String>,
    /// hmy binary from HARMONY_TX_TESTS_HMY
    pub hmy_path: Option<String>,
    /// Funding address from HARMONY_TX_TESTS_FUNDING_ADDRESS
    pub funding_address: Option<String>,
    /// Minimum funds from HARMONY_TX_TESTS_MINIMUM_FUNDS
    pub minimum_funds: Option<Amount>,
    /// Test case directory from HARMONY_TX_TESTS_TEST_CASES
    pub test_cases_dir: Option<String>,
    /// Config file from HARMONY_TX_TESTS_CONFIG
    pub config_file: Option<String>,
    /// Verbose from HARMONY_TX_TESTS_VERBOSE
    pub verbose: Option<bool>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            network: get_env("NETWORK"),
            node: get_env("NODE"),
            passphrase: get_env("PASSPHRASE"),
            keys_path: get_env("KEYS"),
            hmy_path: get_env("HMY"),
            funding_address: get_env("FUNDING_ADDRESS"),
            minimum_funds: get_env_parse("MINIMUM_FUNDS"),
            test_cases_dir: get_env("TEST_CASES"),
            config_file: get_env("CONFIG"),
            verbose: get_env_bool("VERBOSE"),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        self.network.is_some()
            || self.node.is_some()
            || self.passphrase.is_some()
            || self.keys_path.is_some()
            || self.hmy_path.is_some()
            || self.funding_address.is_some()
            || self.minimum_funds.is_some()
            || self.test_cases_dir.is_some()
            || self.config_file.is_some()
            || self.verbose.is_some()
    }

    /// Print current environment configuration
    pub fn print_summary(&self) {
        let passphrase = self.passphrase.as_ref().map(|_| "********");
        println!("Environment Configuration:");
        println!("  {}_NETWORK:         {:?}", ENV_PREFIX, self.network);
        println!("  {}_NODE:            {:?}", ENV_PREFIX, self.node);
        println!("  {}_PASSPHRASE:      {:?}", ENV_PREFIX, passphrase);
        println!("  {}_KEYS:            {:?}", ENV_PREFIX, self.keys_path);
        println!("  {}_HMY:             {:?}", ENV_PREFIX, self.hmy_path);
        println!("  {}_FUNDING_ADDRESS: {:?}", ENV_PREFIX, self.funding_address);
        println!(
            "  {}_MINIMUM_FUNDS:   {:?}",
            ENV_PREFIX,
            self.minimum_funds.map(|a| a.to_string())
        );
        println!("  {}_TEST_CASES:      {:?}", ENV_PREFIX, self.test_cases_dir);
        println!("  {}_CONFIG:          {:?}", ENV_PREFIX, self.config_file);
        println!("  {}_VERBOSE:         {:?}", ENV_PREFIX, self.verbose);
    }
}

/// Get environment variable with prefix
fn get_env(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}_{name}"))
        .ok()
        .filter(|v| !v.is_empty())
}

/// Get environment variable and parse to type
fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    get_env(name).and_then(|v| v.parse().ok())
}

/// Get environment variable as boolean
fn get_env_bool(name: &str) -> Option<bool> {
    get_env(name).map(|v| {
        matches!(
            v.to_lowercase().as_str(),
            "1" | "true" | "yes" | "on" | "enabled"
        )
    })
}

/// Print all HARMONY_TX_TESTS environment variables
pub fn print_env_help() {
    println!("Environment Variables:");
    println!();
    println!("  {ENV_PREFIX}_NETWORK          Network (localnet, devnet, testnet, mainnet)");
    println!("  {ENV_PREFIX}_NODE             Node used for sharding discovery");
    println!("  {ENV_PREFIX}_PASSPHRASE       Keystore passphrase");
    println!("  {ENV_PREFIX}_KEYS             Source keys directory");
    println!("  {ENV_PREFIX}_HMY              Path to the hmy binary");
    println!("  {ENV_PREFIX}_FUNDING_ADDRESS  Funding account address");
    println!("  {ENV_PREFIX}_MINIMUM_FUNDS    Minimum funding balance");
    println!("  {ENV_PREFIX}_TEST_CASES       Test case directory");
    println!("  {ENV_PREFIX}_CONFIG           Path to configuration file");
    println!("  {ENV_PREFIX}_VERBOSE          Enable verbose output (true/false)");
    println!();
    println!("Example:");
    println!("  export {ENV_PREFIX}_NETWORK=testnet");
    println!("  harmony-tx-tests run");
}
