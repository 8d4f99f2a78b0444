//! harmony-tx-tests - end-to-end transaction tests for Harmony networks
//!
//! Runs declarative YAML test cases against a live Harmony network: funds
//! throwaway accounts from a funding account, submits the transactions each
//! case describes, checks the outcome and returns leftover funds.
//!
//! ## Features
//!
//! - Four strategies: standard, same account, multiple senders and
//!   multiple receivers sharing one nonce
//! - Funding account bootstrap from source keys
//! - Table, JSON, CSV and plain report output
//! - Stored runs under the user data directory
//!
//! ## Usage
//!
//! ```bash
//! # Run every test case in ./testcases against testnet
//! harmony-tx-tests run --network testnet
//!
//! # Run selected cases and fail the process on any failure
//! harmony-tx-tests run --only Standard_S0_S0 --strict
//!
//! # List test cases
//! harmony-tx-tests list --detailed
//!
//! # Show balances of the funding account and source keys
//! harmony-tx-tests balances
//!
//! # Show stored results
//! harmony-tx-tests results --latest
//! harmony-tx-tests results --all
//! ```

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

mod accounts;
mod cli;
mod config;
mod executor;
mod funding;
mod models;
mod network;
mod output;
mod registry;
mod results;
mod scenarios;
mod utils;

use cli::Args;
use config::{Config, EnvConfig, DEFAULT_CONFIG_FILE};
use executor::TestRunner;
use funding::FundingManager;
use models::Account;
use network::{HarmonyNetwork, Network};
use output::{write_results_to_file, OutputFormat, ResultFormatter};
use registry::TestRegistry;
use results::{ExportFormat, ResultsStorage, StoredRun};
use scenarios::ScenarioContext;
use utils::{init_logger, LogLevel};

/// Exit status of a strict run with failing cases
const EXIT_TESTS_FAILED: i32 = 2;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let env = EnvConfig::load();

    init_logger(LogLevel::from_verbose(
        args.verbose || env.verbose.unwrap_or(false),
    ));

    match &args.command {
        cli::Command::Run(run_args) => {
            let (config, _) = load_config(&args, &env)?;
            if run_suite(&config, run_args).await? {
                std::process::exit(EXIT_TESTS_FAILED);
            }
        }
        cli::Command::List(list_args) => {
            let (config, _) = load_config(&args, &env)?;
            list_cases(&config, list_args)?;
        }
        cli::Command::Balances => {
            let (config, _) = load_config(&args, &env)?;
            show_balances(&config).await?;
        }
        cli::Command::Results(results_args) => {
            let (config, _) = load_config(&args, &env)?;
            show_results(&config, results_args)?;
        }
        cli::Command::Config(config_args) => {
            manage_config(&args, &env, config_args)?;
        }
    }

    Ok(())
}

/// File < environment < command line
fn load_config(args: &Args, env: &EnvConfig) -> Result<(Config, Option<PathBuf>)> {
    let path = args
        .config
        .clone()
        .or_else(|| env.config_file.as_ref().map(PathBuf::from));

    let (mut config, source) = Config::load_or_default(path.as_deref())?;
    config.apply_env(env)?;
    config.apply_overrides(&args.overrides())?;
    config.validate().context("Invalid configuration")?;

    Ok((config, source))
}

fn parse_format(format: &str) -> Result<OutputFormat> {
    OutputFormat::from_str(format).ok_or_else(|| {
        anyhow::anyhow!(
            "Unknown output format '{format}'. Valid options: table, json, json-pretty, csv, summary"
        )
    })
}

fn results_storage(config: &Config) -> ResultsStorage {
    match &config.testing.results_dir {
        Some(dir) => ResultsStorage::new(dir),
        None => ResultsStorage::default_dir(),
    }
}

async fn connect(config: &Config) -> Result<Arc<dyn Network>> {
    let network = HarmonyNetwork::connect(config)
        .await
        .with_context(|| format!("Failed to connect to {}", config.network.name))?;
    Ok(Arc::new(network))
}

/// Run the suite; true when the process should exit with a failure status
async fn run_suite(config: &Config, args: &cli::RunArgs) -> Result<bool> {
    let format = parse_format(&args.format)?;

    let registry =
        TestRegistry::load(&config.testing.test_cases_dir)?.filter(&args.only)?;
    if registry.is_empty() {
        info!(
            "No test cases found in {}",
            config.testing.test_cases_dir.display()
        );
        return Ok(false);
    }

    info!(
        "Running {} test case(s) against {}",
        registry.len(),
        config.network.name
    );

    let network = connect(config).await?;

    let sources = accounts::load_source_accounts(&network, &config.network_keys_path()).await?;
    let funding = FundingManager::setup_funding_account(network.clone(), config, &sources)
        .await
        .context("Failed to set up the funding account")?;

    let context = ScenarioContext::new(network, funding, config.testing.attempts);
    let started_at = Utc::now();
    let summary = TestRunner::new(context).run_all(registry.into_cases()).await;

    println!("{}", ResultFormatter::new(format).format_summary(&summary));

    if let Some(path) = &args.output {
        write_results_to_file(path, &summary, format)?;
        println!("✓ Results written to: {}", path.display());
    }

    let failed = !summary.all_passed();

    if args.save {
        let run = StoredRun::new(config.network.name.name(), started_at, summary)
            .with_node(config.network.node.clone());
        results_storage(config).save(&run)?;
    }

    Ok(args.strict && failed)
}

fn list_cases(config: &Config, args: &cli::ListArgs) -> Result<()> {
    let registry = TestRegistry::load(&config.testing.test_cases_dir)?;

    println!(
        "\nTest cases in {} ({} total)\n",
        config.testing.test_cases_dir.display(),
        registry.len()
    );
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    for case in registry.cases() {
        let marker = if case.execute { " " } else { "-" };
        if args.detailed {
            let params = &case.parameters;
            println!("{} {} [{}]", marker, case.name, case.test_type);
            if !case.goal.is_empty() {
                println!("    Goal: {}", case.goal);
            }
            println!(
                "    Shards: {} -> {} | Amount: {} | Nonce: {} | Expected: {}",
                params.from_shard_id,
                params.to_shard_id,
                params.amount,
                params
                    .fixed_nonce()
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "auto".to_string()),
                case.expected
            );
            if let Some(count) = params.sender_count {
                println!("    Senders: {count}");
            }
            if let Some(count) = params.receiver_count {
                println!("    Receivers: {count}");
            }
        } else {
            println!("{} {:40} [{}]", marker, case.name, case.test_type);
        }
    }

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
    Ok(())
}

async fn show_balances(config: &Config) -> Result<()> {
    let network = connect(config).await?;

    let mut listed = Vec::new();
    let funding_name = config.funding.account.name.clone();
    let funding_address = match &config.funding.account.address {
        Some(address) => Some(address.clone()),
        None => network.find_address_by_name(&funding_name).await?,
    };
    if let Some(address) = funding_address {
        listed.push(Account::new(funding_name, address));
    }

    let keys_path = config.network_keys_path();
    listed.extend(
        accounts::identify_keys(&keys_path)?
            .iter()
            .map(|key| key.account()),
    );

    if listed.is_empty() {
        println!("No funding account or source keys found ({})", keys_path.display());
        return Ok(());
    }

    println!("\nBalances on {} ({} shard(s))\n", config.network.name, network.shard_count());
    for balance in accounts::balance_report(&network, &listed).await {
        let total = balance
            .total
            .map(|t| t.to_string())
            .unwrap_or_else(|| "unavailable".to_string());
        println!("  {:60} {}", balance.account.to_string(), total);
    }
    println!();

    Ok(())
}

fn show_results(config: &Config, args: &cli::ResultsArgs) -> Result<()> {
    let format = parse_format(&args.format)?;
    let storage = results_storage(config);
    let formatter = ResultFormatter::new(format);

    if args.all {
        let networks = storage.list_networks()?;
        if networks.is_empty() {
            println!("\n📭 No stored results found in {}.", storage.base_dir().display());
            return Ok(());
        }

        for network in &networks {
            let runs = storage.list_runs(network)?;
            println!("\nStored runs for {network} ({} total)\n", runs.len());
            println!("{}", formatter.format_runs(&runs));
        }
        return Ok(());
    }

    let network = config.network.name.name();

    let selected = match &args.run {
        Some(id) => Some(
            storage
                .load(network, id)
                .with_context(|| format!("No stored run {id} for {network}"))?,
        ),
        None if args.latest || args.export.is_some() => storage.latest(network)?,
        None => None,
    };

    let Some(run) = selected else {
        let runs = storage.list_runs(network)?;
        if runs.is_empty() {
            println!("\n📭 No stored results found for {network}.");
            println!("   Run the suite with: harmony-tx-tests run --save");
        } else {
            println!("\nStored runs for {network} in {}\n", storage.base_dir().display());
            println!("{}", formatter.format_runs(&runs));
        }
        return Ok(());
    };

    if args.latest || args.run.is_some() {
        println!(
            "Run {} ({} - {})",
            run.id,
            run.started_at.format("%Y-%m-%d %H:%M:%S"),
            run.completed_at.format("%H:%M:%S")
        );
        println!("{}", formatter.format_summary(&run.summary));
    }

    if let Some(path) = &args.export {
        let export_format = ExportFormat::from_extension(path).unwrap_or(ExportFormat::Json);
        storage.export(&run, path, export_format)?;
        println!("✓ Results exported to: {}", path.display());
    }

    Ok(())
}

fn manage_config(args: &Args, env: &EnvConfig, config_args: &cli::ConfigArgs) -> Result<()> {
    match &config_args.action {
        cli::ConfigAction::Init { path, force } => {
            let path = path
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            if path.exists() && !force {
                bail!(
                    "Configuration file already exists: {}. Use --force to overwrite.",
                    path.display()
                );
            }

            Config::example().save(&path)?;
            println!("✓ Configuration file created: {}", path.display());
            println!("\nEdit the file to customize your settings.");
        }

        cli::ConfigAction::Show => {
            let (mut config, source) = load_config(args, env)?;
            if !config.account.passphrase.is_empty() {
                config.account.passphrase = "********".to_string();
            }

            match source {
                Some(path) => println!("# Loaded from {}", path.display()),
                None => println!("# No configuration file found, using defaults"),
            }
            if env.has_any() {
                env.print_summary();
            }
            println!("{}", serde_yaml::to_string(&config)?);
        }

        cli::ConfigAction::Validate => match load_config(args, env) {
            Ok((_, source)) => {
                let shown = source
                    .as_deref()
                    .map(Path::display)
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "defaults".to_string());
                println!("✓ Configuration is valid: {shown}");
            }
            Err(e) => {
                println!("✗ Configuration is invalid");
                println!("  Error: {e:#}");
                return Err(e);
            }
        },

        cli::ConfigAction::Env => {
            config::print_env_help();
        }
    }

    Ok(())
}
