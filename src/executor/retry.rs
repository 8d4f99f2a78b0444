//! Bounded transfer retry
//!
//! Resubmits a transfer until the network reports status `0x1` or the attempt
//! budget is spent. Attempts follow each other immediately.

use std::sync::Arc;
use tracing::{info, warn};

use crate::models::TestCaseTransaction;
use crate::network::{Network, TransferReceipt, TransferRequest};

/// Outcome of a retried transfer
#[derive(Clone, Debug, Default)]
pub struct TransferOutcome {
    pub success: bool,
    pub attempts: u32,
    /// Receipt of the last attempt that produced one
    pub receipt: Option<TransferReceipt>,
    /// Error of the last failed attempt
    pub error: Option<String>,
}

impl TransferOutcome {
    pub fn transaction_hash(&self) -> &str {
        self.receipt
            .as_ref()
            .map(|r| r.transaction_hash.as_str())
            .unwrap_or_default()
    }

    /// Record of this outcome for a test case
    pub fn to_transaction(&self, request: &TransferRequest) -> TestCaseTransaction {
        TestCaseTransaction {
            from_address: request.from.clone(),
            from_shard_id: request.from_shard,
            to_address: request.to.clone(),
            to_shard_id: request.to_shard,
            amount: request.amount,
            transaction_hash: self.transaction_hash().to_string(),
            success: self.success,
            response: self.receipt.as_ref().map(|r| r.raw.clone()),
            error: if self.success { None } else { self.error.clone() },
        }
    }
}

/// Retry wrapper around [`Network::submit_transfer`]
#[derive(Clone)]
pub struct RetryExecutor {
    network: Arc<dyn Network>,
}

impl RetryExecutor {
    pub fn new(network: Arc<dyn Network>) -> Self {
        Self { network }
    }

    /// Submit up to `max_attempts` times, stopping at the first success
    pub async fn attempt(&self, request: &TransferRequest, max_attempts: u32) -> TransferOutcome {
        let mut outcome = TransferOutcome::default();

        for attempt in 1..=max_attempts {
            outcome.attempts = attempt;

            match self.network.submit_transfer(request).await {
                Ok(receipt) if receipt.is_successful() => {
                    info!(
                        "Sent {} - transaction hash: {} (attempt {}/{})",
                        request, receipt.transaction_hash, attempt, max_attempts
                    );
                    outcome.success = true;
                    outcome.error = None;
                    outcome.receipt = Some(receipt);
                    break;
                }
                Ok(receipt) => {
                    warn!(
                        "Transaction {} was not successful (status {:?}, attempt {}/{})",
                        receipt.transaction_hash, receipt.status, attempt, max_attempts
                    );
                    outcome.error = Some(format!(
                        "transaction {} failed with status {:?}",
                        receipt.transaction_hash, receipt.status
                    ));
                    outcome.receipt = Some(receipt);
                }
                Err(e) => {
                    warn!(
                        "Failed to send {} (attempt {}/{}): {}",
                        request, attempt, max_attempts, e
                    );
                    outcome.error = Some(e.to_string());
                }
            }
        }

        outcome
    }

    /// Submit up to `max_attempts` times; true on success
    pub async fn attempt_transfer(&self, request: &TransferRequest, max_attempts: u32) -> bool {
        self.attempt(request, max_attempts).await.success
    }
}
