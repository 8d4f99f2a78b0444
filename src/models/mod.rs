//! Data models for the transaction test suite
//!
//! Amounts, keystore accounts and declarative test cases.

mod account;
mod amount;
mod test_case;

pub use account::Account;
pub use amount::{Amount, AmountError};
pub use test_case::{
    generate_tx_data, TestCase, TestCaseParameters, TestCaseTransaction, TestType,
};
