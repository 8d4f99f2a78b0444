//! Results storage and retrieval
//!
//! Stores each suite run as a JSON file under `<base>/<network>/<run id>.json`.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::RunSummary;

/// Stored suite run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredRun {
    /// Unique run ID
    pub id: String,

    /// Network the suite ran against
    pub network: String,

    /// Node override, if one was used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,

    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,

    pub summary: RunSummary,

    pub environment: EnvironmentInfo,
}

/// Environment information
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnvironmentInfo {
    pub os: String,
    pub arch: String,
    pub tool_version: String,
}

impl Default for EnvironmentInfo {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl StoredRun {
    pub fn new(network: &str, started_at: DateTime<Utc>, summary: RunSummary) -> Self {
        Self {
            id: generate_run_id(),
            network: network.to_string(),
            node: None,
            started_at,
            completed_at: Utc::now(),
            summary,
            environment: EnvironmentInfo::default(),
        }
    }

    pub fn with_node(mut self, node: Option<String>) -> Self {
        self.node = node;
        self
    }
}

/// Generate unique run ID
fn generate_run_id() -> String {
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let random: u32 = rand::random::<u32>() % 10000;
    format!("{timestamp}_{random:04}")
}

/// Results storage manager
pub struct ResultsStorage {
    base_dir: PathBuf,
}

impl ResultsStorage {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Storage under the user data directory
    pub fn default_dir() -> Self {
        let base_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("harmony-tx-tests")
            .join("results");
        Self::new(base_dir)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn network_dir(&self, network: &str) -> PathBuf {
        self.base_dir.join(network.to_lowercase())
    }

    fn run_path(&self, network: &str, run_id: &str) -> PathBuf {
        self.network_dir(network).join(format!("{run_id}.json"))
    }

    /// Save a run
    pub fn save(&self, run: &StoredRun) -> Result<PathBuf> {
        let network_dir = self.network_dir(&run.network);
        fs::create_dir_all(&network_dir)
            .with_context(|| format!("Failed to create {}", network_dir.display()))?;

        let path = self.run_path(&run.network, &run.id);
        let file = File::create(&path).context("Failed to create results file")?;
        let writer = BufWriter::new(file);

        serde_json::to_writer_pretty(writer, run).context("Failed to write results")?;

        info!("Saved test results to {}", path.display());
        Ok(path)
    }

    /// Load a run by network and id
    pub fn load(&self, network: &str, run_id: &str) -> Result<StoredRun> {
        let path = self.run_path(network, run_id);
        let run = self.load_from_path(&path)?;
        debug!("Loaded test results from {}", path.display());
        Ok(run)
    }

    pub fn load_from_path(&self, path: &Path) -> Result<StoredRun> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open results file {}", path.display()))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).context("Failed to parse results")
    }

    /// All runs for a network, newest first
    pub fn load_network(&self, network: &str) -> Result<Vec<StoredRun>> {
        let network_dir = self.network_dir(network);
        if !network_dir.exists() {
            return Ok(Vec::new());
        }

        let mut runs = Vec::new();
        for entry in fs::read_dir(&network_dir)? {
            let path = entry?.path();

            if path.extension().map(|e| e == "json").unwrap_or(false) {
                match self.load_from_path(&path) {
                    Ok(run) => runs.push(run),
                    Err(e) => {
                        debug!("Failed to load {}: {}", path.display(), e);
                    }
                }
            }
        }

        runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(runs)
    }

    /// Networks with stored runs
    pub fn list_networks(&self) -> Result<Vec<String>> {
        if !self.base_dir.exists() {
            return Ok(Vec::new());
        }

        let mut networks = Vec::new();
        for entry in fs::read_dir(&self.base_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    networks.push(name.to_string());
                }
            }
        }

        networks.sort();
        Ok(networks)
    }

    /// Brief info on every run for a network, newest first
    pub fn list_runs(&self, network: &str) -> Result<Vec<RunInfo>> {
        Ok(self
            .load_network(network)?
            .into_iter()
            .map(|run| RunInfo {
                id: run.id,
                network: run.network,
                started_at: run.started_at,
                total: run.summary.total,
                successful: run.summary.successful,
                failed: run.summary.failed,
            })
            .collect())
    }

    pub fn latest(&self, network: &str) -> Result<Option<StoredRun>> {
        Ok(self.load_network(network)?.into_iter().next())
    }

    /// Export a run to a file
    ///
    /// CSV exports hold one row per submitted transaction.
    pub fn export(&self, run: &StoredRun, path: &Path, format: ExportFormat) -> Result<()> {
        match format {
            ExportFormat::Json => {
                let file = File::create(path)?;
                let writer = BufWriter::new(file);
                serde_json::to_writer_pretty(writer, run)?;
            }
            ExportFormat::Csv => {
                let mut writer = csv::Writer::from_path(path)?;

                writer.write_record([
                    "test_case",
                    "test_type",
                    "passed",
                    "from_address",
                    "from_shard",
                    "to_address",
                    "to_shard",
                    "amount",
                    "transaction_hash",
                    "success",
                    "error",
                ])?;

                for case in &run.summary.cases {
                    for tx in &case.transactions {
                        writer.write_record([
                            case.name.clone(),
                            case.test_type.to_string(),
                            case.passed().to_string(),
                            tx.from_address.clone(),
                            tx.from_shard_id.to_string(),
                            tx.to_address.clone(),
                            tx.to_shard_id.to_string(),
                            tx.amount.to_string(),
                            tx.transaction_hash.clone(),
                            tx.success.to_string(),
                            tx.error.clone().unwrap_or_default(),
                        ])?;
                    }
                }
                writer.flush()?;
            }
        }

        info!("Exported results to {}", path.display());
        Ok(())
    }
}

/// Brief run information
#[derive(Clone, Debug)]
pub struct RunInfo {
    pub id: String,
    pub network: String,
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

/// Export format
#[derive(Clone, Copy, Debug)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(ExportFormat::Json),
            "csv" => Some(ExportFormat::Csv),
            _ => None,
        }
    }

    pub fn from_extension(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_str)
    }
}
