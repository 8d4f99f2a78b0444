//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Overrides;
use crate::models::Amount;

/// Harmony transaction end-to-end test suite
#[derive(Parser, Debug)]
#[command(name = "harmony-tx-tests")]
#[command(version)]
#[command(about = "Run declarative transaction test cases against a Harmony network")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Network to use (localnet, devnet, testnet, mainnet)
    #[arg(short, long, global = true)]
    pub network: Option<String>,

    /// Passphrase for the local keystore
    #[arg(long, global = true)]
    pub passphrase: Option<String>,

    /// Directory holding source keys
    #[arg(long, global = true)]
    pub keys: Option<PathBuf>,

    /// Address of the funding account
    #[arg(long, global = true)]
    pub funding_address: Option<String>,

    /// Minimum balance of the funding account before pulling funds
    #[arg(long, global = true)]
    pub minimum_funds: Option<Amount>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Args {
    /// Configuration overrides given on the command line
    pub fn overrides(&self) -> Overrides {
        let test_cases_dir = match &self.command {
            Command::Run(run) => run.test_cases.clone(),
            Command::List(list) => list.test_cases.clone(),
            _ => None,
        };

        Overrides {
            network: self.network.clone(),
            passphrase: self.passphrase.clone(),
            keys_path: self.keys.clone(),
            funding_address: self.funding_address.clone(),
            minimum_funds: self.minimum_funds,
            test_cases_dir,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the test suite
    Run(RunArgs),

    /// List test cases
    List(ListArgs),

    /// Show balances of the funding account and source keys
    Balances,

    /// View stored results
    Results(ResultsArgs),

    /// Manage the configuration file
    Config(ConfigArgs),
}

/// Arguments for run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Directory with test case definitions
    #[arg(short, long)]
    pub test_cases: Option<PathBuf>,

    /// Only run the named test cases (repeatable)
    #[arg(long)]
    pub only: Vec<String>,

    /// Output format (table, json, json-pretty, csv, summary)
    #[arg(short, long, default_value = "summary")]
    pub format: String,

    /// Write results to file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Store the run in the results directory
    #[arg(short, long)]
    pub save: bool,

    /// Exit with status 2 when any test case fails
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Directory with test case definitions
    #[arg(short, long)]
    pub test_cases: Option<PathBuf>,

    /// Show detailed test case information
    #[arg(short, long)]
    pub detailed: bool,
}

/// Arguments for results command
#[derive(Parser, Debug)]
pub struct ResultsArgs {
    /// Show the latest run in full
    #[arg(short, long)]
    pub latest: bool,

    /// Show a stored run by id
    #[arg(short, long, conflicts_with = "latest")]
    pub run: Option<String>,

    /// List stored runs of every network
    #[arg(short, long)]
    pub all: bool,

    /// Output format (table, json, json-pretty, csv, summary)
    #[arg(short, long, default_value = "table")]
    pub format: String,

    /// Export the latest run to file (json or csv by extension)
    #[arg(short, long)]
    pub export: Option<PathBuf>,
}

/// Arguments for config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write an example configuration file
    Init {
        /// Destination path
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,

    /// Validate the effective configuration
    Validate,

    /// List supported environment variables
    Env,
}
