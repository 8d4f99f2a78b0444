//! Test case models
//!
//! Declarative test cases as loaded from YAML, plus the transactions a case
//! produced when it ran.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Amount;

/// Strategy used to execute a test case
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TestType {
    Standard,
    SameAccount,
    MultipleSenders,
    MultipleReceiversInvalidNonce,
}

impl TestType {
    /// Canonical tag
    pub fn name(&self) -> &'static str {
        match self {
            TestType::Standard => "standard",
            TestType::SameAccount => "same_account",
            TestType::MultipleSenders => "multiple_senders",
            TestType::MultipleReceiversInvalidNonce => "multiple_receivers_invalid_nonce",
        }
    }

    pub fn all() -> Vec<TestType> {
        vec![
            TestType::Standard,
            TestType::SameAccount,
            TestType::MultipleSenders,
            TestType::MultipleReceiversInvalidNonce,
        ]
    }

    /// Case-insensitive; `-` and spaces are read as `_`
    pub fn from_str(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "standard" => Some(TestType::Standard),
            "same_account" => Some(TestType::SameAccount),
            "multiple_senders" => Some(TestType::MultipleSenders),
            "multiple_receivers_invalid_nonce" => Some(TestType::MultipleReceiversInvalidNonce),
            _ => None,
        }
    }
}

impl TryFrom<String> for TestType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TestType::from_str(&value).ok_or_else(|| {
            format!(
                "unknown test type '{value}', expected one of: {}",
                TestType::all()
                    .iter()
                    .map(|t| t.name())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        })
    }
}

impl From<TestType> for String {
    fn from(value: TestType) -> Self {
        value.name().to_string()
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn default_true() -> bool {
    true
}

fn default_gas_price() -> u64 {
    1
}

fn default_nonce() -> i64 {
    -1
}

fn default_count() -> u32 {
    1
}

/// Parameters of a test case
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestCaseParameters {
    #[serde(default, alias = "fromshardid")]
    pub from_shard_id: u32,

    #[serde(default, alias = "toshardid")]
    pub to_shard_id: u32,

    pub amount: Amount,

    #[serde(default = "default_gas_price", alias = "gasprice")]
    pub gas_price: u64,

    /// Negative means the nonce is resolved from the network
    #[serde(default = "default_nonce")]
    pub nonce: i64,

    #[serde(default)]
    pub data: String,

    #[serde(default, alias = "datasize")]
    pub data_size: usize,

    #[serde(default, alias = "sendercount", skip_serializing_if = "Option::is_none")]
    pub sender_count: Option<u32>,

    #[serde(default, alias = "receivercount", skip_serializing_if = "Option::is_none")]
    pub receiver_count: Option<u32>,

    /// Seconds to wait for a receipt; zero submits without waiting
    #[serde(default, alias = "confirmationwaittime")]
    pub confirmation_wait_time: u64,

    #[serde(default = "default_count")]
    pub count: u32,
}

impl TestCaseParameters {
    pub fn new(amount: Amount) -> Self {
        Self {
            from_shard_id: 0,
            to_shard_id: 0,
            amount,
            gas_price: default_gas_price(),
            nonce: default_nonce(),
            data: String::new(),
            data_size: 0,
            sender_count: None,
            receiver_count: None,
            confirmation_wait_time: 0,
            count: default_count(),
        }
    }

    /// Pre-set nonce, if the case pins one
    pub fn fixed_nonce(&self) -> Option<u64> {
        u64::try_from(self.nonce).ok()
    }

    /// Transaction payload: explicit data, else `data_size` filler bytes
    pub fn payload(&self) -> Option<String> {
        if !self.data.is_empty() {
            Some(self.data.clone())
        } else if self.data_size > 0 {
            Some(generate_tx_data(self.data_size))
        } else {
            None
        }
    }
}

/// Filler payload of `size` bytes
pub fn generate_tx_data(size: usize) -> String {
    "a".repeat(size)
}

/// One terminal submission outcome
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestCaseTransaction {
    pub from_address: String,
    pub from_shard_id: u32,
    pub to_address: String,
    pub to_shard_id: u32,
    pub amount: Amount,
    pub transaction_hash: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Declarative test case
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestCase {
    pub name: String,

    #[serde(default)]
    pub scenario: String,

    #[serde(default)]
    pub goal: String,

    #[serde(default)]
    pub priority: u32,

    #[serde(default = "default_true")]
    pub execute: bool,

    #[serde(default = "default_true")]
    pub expected: bool,

    #[serde(default)]
    pub verbose: bool,

    #[serde(alias = "testtype")]
    pub test_type: TestType,

    pub parameters: TestCaseParameters,

    #[serde(default)]
    pub result: bool,

    #[serde(default)]
    pub transactions: Vec<TestCaseTransaction>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default)]
    pub duration_ms: u64,
}

impl TestCase {
    pub fn new(name: impl Into<String>, test_type: TestType, parameters: TestCaseParameters) -> Self {
        Self {
            name: name.into(),
            scenario: String::new(),
            goal: String::new(),
            priority: 0,
            execute: true,
            expected: true,
            verbose: false,
            test_type,
            parameters,
            result: false,
            transactions: Vec::new(),
            error: None,
            duration_ms: 0,
        }
    }

    pub fn with_expected(mut self, expected: bool) -> Self {
        self.expected = expected;
        self
    }

    pub fn with_execute(mut self, execute: bool) -> Self {
        self.execute = execute;
        self
    }

    /// A case passes when its result matches the expectation
    pub fn passed(&self) -> bool {
        self.result == self.expected
    }

    /// Keystore alias for an account this case creates
    pub fn account_name(&self, role: &str) -> String {
        format!("TestCase_{}_{}", self.name, role)
    }

    /// Number of fan-out receivers, never zero
    pub fn receiver_count(&self) -> u32 {
        self.parameters.receiver_count.unwrap_or(1).max(1)
    }

    /// Number of fan-out senders, never zero
    pub fn sender_count(&self) -> u32 {
        self.parameters.sender_count.unwrap_or(1).max(1)
    }
}

impl fmt::Display for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Testcase {} [{}]", self.name, self.test_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_normalization() {
        assert_eq!(TestType::from_str("Standard"), Some(TestType::Standard));
        assert_eq!(TestType::from_str("SAME_ACCOUNT"), Some(TestType::SameAccount));
        assert_eq!(
            TestType::from_str("multiple-senders"),
            Some(TestType::MultipleSenders)
        );
        assert_eq!(
            TestType::from_str(" Multiple_Receivers_Invalid_Nonce "),
            Some(TestType::MultipleReceiversInvalidNonce)
        );
        assert_eq!(TestType::from_str("bogus"), None);
    }

    #[test]
    fn test_parse_original_keys() {
        let yaml = r#"
name: Sbs6
scenario: Multiple senders
execute: true
expected: true
testtype: MULTIPLE_SENDERS
parameters:
  fromshardid: 0
  toshardid: 1
  amount: 1
  sendercount: 10
  gasprice: 2
  confirmationwaittime: 16
"#;
        let case: TestCase = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(case.test_type, TestType::MultipleSenders);
        assert_eq!(case.parameters.to_shard_id, 1);
        assert_eq!(case.parameters.sender_count, Some(10));
        assert_eq!(case.parameters.gas_price, 2);
        assert_eq!(case.parameters.confirmation_wait_time, 16);
        assert_eq!(case.parameters.nonce, -1);
        assert!(case.transactions.is_empty());
    }

    #[test]
    fn test_defaults() {
        let yaml = "name: basic\ntest_type: standard\nparameters:\n  amount: 0.5\n";
        let case: TestCase = serde_yaml::from_str(yaml).unwrap();
        assert!(case.execute);
        assert!(case.expected);
        assert!(!case.verbose);
        assert_eq!(case.parameters.fixed_nonce(), None);
        assert_eq!(case.receiver_count(), 1);
        assert_eq!(case.parameters.count, 1);
    }

    #[test]
    fn test_unknown_type_rejected() {
        let yaml = "name: bad\ntest_type: sideways\nparameters:\n  amount: 1\n";
        let err = serde_yaml::from_str::<TestCase>(yaml).unwrap_err();
        assert!(err.to_string().contains("unknown test type"));
    }

    #[test]
    fn test_payload() {
        let mut params = TestCaseParameters::new(Amount::from_tokens(1));
        assert_eq!(params.payload(), None);

        params.data_size = 4;
        assert_eq!(params.payload(), Some("aaaa".to_string()));

        params.data = "hello".to_string();
        assert_eq!(params.payload(), Some("hello".to_string()));
    }

    #[test]
    fn test_fixed_nonce() {
        let mut params = TestCaseParameters::new(Amount::ZERO);
        params.nonce = 7;
        assert_eq!(params.fixed_nonce(), Some(7));
        params.nonce = -1;
        assert_eq!(params.fixed_nonce(), None);
    }

    #[test]
    fn test_passed() {
        let mut case = TestCase::new(
            "neg",
            TestType::Standard,
            TestCaseParameters::new(Amount::ZERO),
        )
        .with_expected(false);
        assert!(case.passed());
        case.result = true;
        assert!(!case.passed());
        assert_eq!(case.account_name("Sender"), "TestCase_neg_Sender");
    }
}
