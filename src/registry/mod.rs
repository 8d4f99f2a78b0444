//! Test case registry
//!
//! Loads one test case per YAML file from a directory, in file name order.

use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::models::{TestCase, TestType};

/// A test case definition that cannot run
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("test case '{0}': sender_count must be at least 1")]
    SenderCount(String),

    #[error("test case '{0}': receiver_count must be at least 2")]
    ReceiverCount(String),

    #[error("test case '{0}' is defined more than once")]
    DuplicateName(String),

    #[error("test case name must not be empty")]
    EmptyName,
}

/// Loaded test cases
#[derive(Debug, Default)]
pub struct TestRegistry {
    cases: Vec<TestCase>,
}

impl TestRegistry {
    /// Load every `*.yml` / `*.yaml` file in `dir`
    pub fn load(dir: &Path) -> Result<Self> {
        let files = case_files(dir)?;
        let mut cases = Vec::with_capacity(files.len());

        for path in &files {
            debug!("Loading test case from {}", path.display());
            cases.push(load_case(path)?);
        }

        let registry = Self::from_cases(cases)?;
        info!(
            "Loaded {} test case(s) from {}",
            registry.len(),
            dir.display()
        );
        Ok(registry)
    }

    /// Validate and wrap already parsed cases
    pub fn from_cases(cases: Vec<TestCase>) -> Result<Self> {
        let mut names = HashSet::new();
        for case in &cases {
            validate(case)?;
            if !names.insert(case.name.as_str()) {
                bail!(RegistryError::DuplicateName(case.name.clone()));
            }
        }
        Ok(Self { cases })
    }

    /// Keep only the cases named in `names`; an empty filter keeps all
    pub fn filter(self, names: &[String]) -> Result<Self> {
        if names.is_empty() {
            return Ok(self);
        }

        for name in names {
            if !self.cases.iter().any(|c| &c.name == name) {
                bail!("Unknown test case '{}'", name);
            }
        }

        let cases = self
            .cases
            .into_iter()
            .filter(|c| names.contains(&c.name))
            .collect();
        Ok(Self { cases })
    }

    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    pub fn into_cases(self) -> Vec<TestCase> {
        self.cases
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

fn case_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read test case directory {}", dir.display()))?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .map(|e| e == "yml" || e == "yaml")
                .unwrap_or(false)
        })
        .collect();

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

fn load_case(path: &Path) -> Result<TestCase> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read test case {}", path.display()))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse test case {}", path.display()))
}

fn validate(case: &TestCase) -> Result<(), RegistryError> {
    if case.name.trim().is_empty() {
        return Err(RegistryError::EmptyName);
    }

    match case.test_type {
        TestType::MultipleSenders => {
            if case.parameters.sender_count.unwrap_or(0) < 1 {
                return Err(RegistryError::SenderCount(case.name.clone()));
            }
        }
        TestType::MultipleReceiversInvalidNonce => {
            if case.parameters.receiver_count.unwrap_or(0) < 2 {
                return Err(RegistryError::ReceiverCount(case.name.clone()));
            }
        }
        TestType::Standard | TestType::SameAccount => {}
    }

    Ok(())
}
