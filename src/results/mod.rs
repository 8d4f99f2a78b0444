//! Results aggregation and storage
//!
//! Collects finished test cases, renders the suite report and persists runs.

mod storage;

pub use storage::{ExportFormat, ResultsStorage, RunInfo, StoredRun};

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use crate::models::TestCase;

const RULE: &str = "------------------------------------------------------------";

/// Outcome of a suite run
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// Cases not executed because `execute` was false
    #[serde(default)]
    pub skipped: usize,
    pub cases: Vec<TestCase>,
}

impl RunSummary {
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.successful as f64 / self.total as f64 * 100.0
        }
    }

    /// Plain-text suite report
    pub fn report(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "{RULE}");
        let _ = writeln!(
            out,
            "Test suite status - executed a total of {} test case(s):",
            self.total
        );
        let _ = writeln!(out, "Successful: {}", self.successful);
        let _ = writeln!(out, "Failed: {}", self.failed);
        let _ = writeln!(out, "{RULE}");

        if !self.cases.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Executed test cases:");
            let _ = writeln!(out, "{RULE}");
            for case in &self.cases {
                let status = if case.passed() { "success" } else { "failed" };
                let _ = writeln!(out, "Testcase {}: {}", case.name, status);
            }
            let _ = writeln!(out, "{RULE}");
        }

        out
    }
}

/// Accumulates executed test cases
#[derive(Debug, Default)]
pub struct ResultsAggregator {
    cases: Vec<TestCase>,
    skipped: usize,
}

impl ResultsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, case: TestCase) {
        self.cases.push(case);
    }

    pub fn skip(&mut self) {
        self.skipped += 1;
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    pub fn summary(self) -> RunSummary {
        let successful = self.cases.iter().filter(|c| c.passed()).count();
        RunSummary {
            total: self.cases.len(),
            successful,
            failed: self.cases.len() - successful,
            skipped: self.skipped,
            cases: self.cases,
        }
    }
}
