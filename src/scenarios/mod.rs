//! Test case strategies
//!
//! Each [`TestType`] maps to one strategy. A strategy creates the accounts it
//! needs, submits its transactions and sets the case result. Every account a
//! strategy creates is torn down afterwards, whatever the outcome.

mod multiple_receivers;
mod multiple_senders;
mod same_account;
mod standard;
mod teardown;

use std::sync::Arc;
use tracing::{debug, info};

use crate::executor::RetryExecutor;
use crate::funding::FundingManager;
use crate::models::{Account, Amount, TestCase, TestType};
use crate::network::Network;

/// Shared state handed to every strategy
#[derive(Clone)]
pub struct ScenarioContext {
    pub network: Arc<dyn Network>,
    pub funding: FundingManager,
    pub retry: RetryExecutor,
    /// Submission attempts per test transaction
    pub attempts: u32,
    pub gas_cost: Amount,
}

impl ScenarioContext {
    pub fn new(network: Arc<dyn Network>, funding: FundingManager, attempts: u32) -> Self {
        let gas_cost = funding.settings().gas_cost;
        Self {
            retry: RetryExecutor::new(network.clone()),
            network,
            funding,
            attempts,
            gas_cost,
        }
    }
}

/// Per-case log lines, at info when the case is verbose
#[derive(Clone, Debug)]
pub struct CaseLog {
    name: String,
    verbose: bool,
}

impl CaseLog {
    pub fn new(case: &TestCase) -> Self {
        Self {
            name: case.name.clone(),
            verbose: case.verbose,
        }
    }

    pub fn log(&self, message: impl AsRef<str>) {
        if self.verbose {
            info!("[Test Case - {}]: {}", self.name, message.as_ref());
        } else {
            debug!("[Test Case - {}]: {}", self.name, message.as_ref());
        }
    }

    pub fn header(&self) {
        self.title("start");
    }

    pub fn footer(&self) {
        self.title("end");
    }

    fn title(&self, edge: &str) {
        let line = format!("-----Test case: {} ({edge})-----", self.name);
        if self.verbose {
            info!("{}", line);
        } else {
            debug!("{}", line);
        }
    }
}

/// Accounts created while running a case, with the shard holding their funds
#[derive(Debug, Default)]
pub struct AccountTracker {
    accounts: Vec<(Account, u32)>,
}

impl AccountTracker {
    pub fn track(&mut self, account: Account, shard: u32) {
        self.accounts.push((account, shard));
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn into_accounts(self) -> Vec<(Account, u32)> {
        self.accounts
    }
}

/// Run one case with the strategy matching its type
pub async fn run_scenario(ctx: &ScenarioContext, mut case: TestCase) -> TestCase {
    let log = CaseLog::new(&case);
    log.header();

    let mut tracker = AccountTracker::default();
    let outcome = match case.test_type {
        TestType::Standard => standard::run(ctx, &mut tracker, &mut case).await,
        TestType::SameAccount => same_account::run(ctx, &mut tracker, &mut case).await,
        TestType::MultipleSenders => multiple_senders::run(ctx, &mut tracker, &mut case).await,
        TestType::MultipleReceiversInvalidNonce => {
            multiple_receivers::run(ctx, &mut tracker, &mut case).await
        }
    };

    if let Err(e) = outcome {
        log.log(format!("Test case aborted: {e:#}"));
        case.result = false;
        case.error = Some(format!("{e:#}"));
    }

    if !tracker.is_empty() {
        log.log(format!(
            "Performing teardown of {} account(s) (returning funds and removing accounts)",
            tracker.len()
        ));
        teardown::teardown_accounts(ctx, &case, tracker.into_accounts()).await;
    }

    log.footer();
    case
}
