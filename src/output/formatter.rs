//! Output formatters for suite results
//!
//! Provides table, JSON, CSV and plain report output.

use std::io::Write;
use std::path::Path;

use crate::models::TestCase;
use crate::results::{RunInfo, RunSummary};

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    JsonPretty,
    Csv,
    Summary,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "table" => Some(OutputFormat::Table),
            "json" => Some(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Some(OutputFormat::JsonPretty),
            "csv" => Some(OutputFormat::Csv),
            "summary" => Some(OutputFormat::Summary),
            _ => None,
        }
    }
}

/// Result formatter
pub struct ResultFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    fn status(&self, case: &TestCase) -> &'static str {
        match (case.passed(), self.colorize) {
            (true, true) => "\x1b[32m✓ PASS\x1b[0m",
            (false, true) => "\x1b[31m✗ FAIL\x1b[0m",
            (true, false) => "✓ PASS",
            (false, false) => "✗ FAIL",
        }
    }

    /// Format a single executed case
    pub fn format_case(&self, case: &TestCase) -> String {
        match self.format {
            OutputFormat::Table => self.format_case_table(case),
            OutputFormat::Json => serde_json::to_string(case).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(case).unwrap_or_default(),
            OutputFormat::Csv => self.format_case_csv(case),
            OutputFormat::Summary => {
                let status = if case.passed() { "success" } else { "failed" };
                format!("Testcase {}: {}", case.name, status)
            }
        }
    }

    fn format_case_table(&self, case: &TestCase) -> String {
        format!(
            "{:40} {:34} {} [{:>7}ms]",
            truncate(&case.name, 40),
            case.test_type.name(),
            self.status(case),
            case.duration_ms
        )
    }

    fn format_case_csv(&self, case: &TestCase) -> String {
        format!(
            "{},{},{},{},{},{},{},\"{}\"",
            case.name,
            case.test_type.name(),
            case.result,
            case.expected,
            case.passed(),
            case.transactions.len(),
            case.duration_ms,
            case.error.as_deref().unwrap_or("").replace('"', "\"\"")
        )
    }

    /// Format a whole suite run
    pub fn format_summary(&self, summary: &RunSummary) -> String {
        match self.format {
            OutputFormat::Table => self.format_summary_table(summary),
            OutputFormat::Json => serde_json::to_string(summary).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(summary).unwrap_or_default(),
            OutputFormat::Csv => self.format_summary_csv(summary),
            OutputFormat::Summary => summary.report(),
        }
    }

    fn format_summary_table(&self, summary: &RunSummary) -> String {
        let mut output = String::new();

        output.push_str("\n╔════════════════════════════════════════════════════════════════════════════════════════════╗\n");
        output.push_str("║  Test suite results                                                                        ║\n");
        output.push_str("╠════════════════════════════════════════════════════════════════════════════════════════════╣\n");

        for case in &summary.cases {
            output.push_str(&format!("║  {}\n", self.format_case_table(case)));
            if let Some(error) = &case.error {
                output.push_str(&format!("║      error: {}\n", error));
            }
        }

        output.push_str("╠════════════════════════════════════════════════════════════════════════════════════════════╣\n");

        let pass_str = if self.colorize {
            format!("\x1b[32m{}\x1b[0m", summary.successful)
        } else {
            summary.successful.to_string()
        };
        let fail_str = if self.colorize && summary.failed > 0 {
            format!("\x1b[31m{}\x1b[0m", summary.failed)
        } else {
            summary.failed.to_string()
        };

        output.push_str(&format!(
            "║  Total: {:3} | Successful: {} | Failed: {} | Skipped: {:3} | Pass Rate: {:5.1}%\n",
            summary.total,
            pass_str,
            fail_str,
            summary.skipped,
            summary.pass_rate()
        ));
        output.push_str("╚════════════════════════════════════════════════════════════════════════════════════════════╝\n");

        output
    }

    fn format_summary_csv(&self, summary: &RunSummary) -> String {
        let mut output = String::new();
        output.push_str("name,test_type,result,expected,passed,transactions,duration_ms,error\n");
        for case in &summary.cases {
            output.push_str(&self.format_case_csv(case));
            output.push('\n');
        }
        output
    }

    /// Format stored run listings
    pub fn format_runs(&self, runs: &[RunInfo]) -> String {
        let mut output = String::new();

        output.push_str("┌──────────────────────┬────────────┬──────────────────────┬───────┬────────────┬────────┐\n");
        output.push_str("│ Run ID               │ Network    │ Started              │ Total │ Successful │ Failed │\n");
        output.push_str("├──────────────────────┼────────────┼──────────────────────┼───────┼────────────┼────────┤\n");

        for run in runs {
            let failed = if self.colorize && run.failed > 0 {
                format!("\x1b[31m{:>6}\x1b[0m", run.failed)
            } else {
                format!("{:>6}", run.failed)
            };
            output.push_str(&format!(
                "│ {:20} │ {:10} │ {:20} │ {:>5} │ {:>10} │ {} │\n",
                run.id,
                run.network,
                run.started_at.format("%Y-%m-%d %H:%M:%S"),
                run.total,
                run.successful,
                failed
            ));
        }

        output.push_str("└──────────────────────┴────────────┴──────────────────────┴───────┴────────────┴────────┘\n");
        output
    }
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::Table)
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}

/// Write results to a file
pub fn write_results_to_file(
    path: &Path,
    summary: &RunSummary,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let formatter = ResultFormatter::new(format).no_color();
    let content = formatter.format_summary(summary);

    let mut file = std::fs::File::create(path)?;
    file.write_all(content.as_bytes())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Amount, TestCaseParameters, TestType};
    use crate::results::ResultsAggregator;

    fn summary() -> RunSummary {
        let mut ok = TestCase::new(
            "Standard_S0_S0",
            TestType::Standard,
            TestCaseParameters::new(Amount::from_tokens(1)),
        );
        ok.result = true;

        let mut broken = TestCase::new(
            "Senders",
            TestType::MultipleSenders,
            TestCaseParameters::new(Amount::from_tokens(1)),
        );
        broken.error = Some("node said \"no\"".to_string());

        let mut aggregator = ResultsAggregator::new();
        aggregator.add(ok);
        aggregator.add(broken);
        aggregator.summary()
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::from_str("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_str("TABLE"), Some(OutputFormat::Table));
        assert_eq!(OutputFormat::from_str("json-pretty"), Some(OutputFormat::JsonPretty));
        assert_eq!(OutputFormat::from_str("unknown"), None);
    }

    #[test]
    fn test_table_output() {
        let output = ResultFormatter::new(OutputFormat::Table)
            .no_color()
            .format_summary(&summary());
        assert!(output.contains("Standard_S0_S0"));
        assert!(output.contains("✓ PASS"));
        assert!(output.contains("✗ FAIL"));
        assert!(output.contains("Successful: 1 | Failed: 1"));
    }

    #[test]
    fn test_csv_escapes_quotes() {
        let output = ResultFormatter::new(OutputFormat::Csv).format_summary(&summary());
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[2].ends_with("\"node said \"\"no\"\"\""));
    }

    #[test]
    fn test_json_round_trip() {
        let output = ResultFormatter::new(OutputFormat::Json).format_summary(&summary());
        let parsed: RunSummary = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed.total, 2);
        assert_eq!(parsed.cases[1].test_type, TestType::MultipleSenders);
    }

    #[test]
    fn test_summary_format_is_report() {
        let output = ResultFormatter::new(OutputFormat::Summary).format_summary(&summary());
        assert!(output.contains("Testcase Senders: failed"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a_very_long_name", 8), "a_ver...");
    }
}
