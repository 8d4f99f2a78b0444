//! Test execution engine
//!
//! Provides the sequential suite runner and the bounded transfer retry.

mod retry;
mod runner;

pub use retry::{RetryExecutor, TransferOutcome};
pub use runner::TestRunner;
