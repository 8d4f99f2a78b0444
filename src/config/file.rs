//! Configuration file management
//!
//! Handles finding, loading, and saving configuration files.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::{Config, FundingAccount, NetworkName};
use crate::models::Amount;

/// File written by `config init`
pub const DEFAULT_CONFIG_FILE: &str = "./harmony-tx-tests.yaml";

/// Configuration file locations (in order of precedence)
const CONFIG_LOCATIONS: &[&str] = &[
    "./harmony-tx-tests.yaml",
    "./harmony-tx-tests.yml",
    "./config.yml",
    "./config.yaml",
    "~/.config/harmony-tx-tests/config.yaml",
];

/// Find configuration file in standard locations
pub fn find_config_file() -> Option<PathBuf> {
    CONFIG_LOCATIONS
        .iter()
        .map(|location| expand_path(location))
        .find(|path| path.exists())
}

impl Config {
    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?;

        Ok(config)
    }

    /// Load from an explicit path, a standard location, or defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        match path {
            Some(path) => Ok((Self::load(path)?, Some(path.to_path_buf()))),
            None => match find_config_file() {
                Some(found) => Ok((Self::load(&found)?, Some(found))),
                None => Ok((Self::default(), None)),
            },
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        // Create parent directory if needed
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Generate example configuration
    pub fn example() -> Self {
        let mut config = Config::default();
        config.network.name = NetworkName::Testnet;
        config.funding.account = FundingAccount {
            name: "HarmonyTxTestsFunding".to_string(),
            address: None,
        };
        config.funding.minimum_funds = Amount::from_tokens(100);
        config
    }
}

/// Expand ~ to home directory
fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_save_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let config = Config::example();
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.network.name, NetworkName::Testnet);
        assert_eq!(loaded.funding.minimum_funds, Amount::from_tokens(100));
        assert_eq!(loaded.network.gas_cost, config.network.gas_cost);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let err = Config::load(dir.path().join("absent.yaml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("c.yml");
        std::fs::write(&path, "network:\n  name: dev\n").unwrap();

        let (config, source) = Config::load_or_default(Some(&path)).unwrap();
        assert_eq!(config.network.name, NetworkName::Devnet);
        assert_eq!(source, Some(path));
    }

    #[test]
    fn test_expand_path() {
        let path = expand_path("./test.yaml");
        assert_eq!(path, PathBuf::from("./test.yaml"));
    }
}
