//! Test execution runner
//!
//! Runs test cases one after another and aggregates their results.

use tracing::info;

use crate::models::TestCase;
use crate::results::{ResultsAggregator, RunSummary};
use crate::scenarios::{run_scenario, ScenarioContext};
use crate::utils::Timer;

/// Sequential test runner
pub struct TestRunner {
    context: ScenarioContext,
}

impl TestRunner {
    pub fn new(context: ScenarioContext) -> Self {
        Self { context }
    }

    /// Run a single test case
    pub async fn run_test(&self, case: TestCase) -> TestCase {
        info!("Running {}", case);

        let timer = Timer::start(case.name.clone());
        let mut case = run_scenario(&self.context, case).await;
        case.duration_ms = timer.stop().as_millis() as u64;

        info!(
            "{} finished in {}ms - result: {}, expected: {}",
            case, case.duration_ms, case.result, case.expected
        );
        case
    }

    /// Run all test cases sequentially
    pub async fn run_all(&self, cases: Vec<TestCase>) -> RunSummary {
        info!("Starting test suite with {} test case(s)", cases.len());

        let timer = Timer::start("test suite");
        let mut aggregator = ResultsAggregator::new();

        for case in cases {
            if !case.execute {
                info!(
                    "Test case {} has the execute attribute set to false - make sure to set it to true if you want to execute this test case",
                    case.name
                );
                aggregator.skip();
                continue;
            }

            let case = self.run_test(case).await;
            aggregator.add(case);
        }

        let summary = aggregator.summary();
        info!(
            "Test suite completed in {}ms - Pass: {}/{} ({:.1}%)",
            timer.elapsed_ms(),
            summary.successful,
            summary.total,
            summary.pass_rate()
        );

        summary
    }
}
