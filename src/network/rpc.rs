//! JSON-RPC client
//!
//! Thin `hmy_*` JSON-RPC client over reqwest, used for balance, nonce and
//! sharding-structure reads.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

use super::NetworkError;
use crate::models::Amount;

/// One shard as reported by `hmy_getShardingStructure`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardEndpoint {
    #[serde(rename = "shardID")]
    pub shard_id: u32,
    pub http: String,
    #[serde(default)]
    pub ws: String,
    #[serde(default)]
    pub current: bool,
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// JSON-RPC client
pub struct RpcClient {
    client: Client,
    timeout_secs: u64,
    next_id: AtomicU64,
}

impl RpcClient {
    /// Create client with custom timeout
    pub fn with_timeout(timeout_secs: u64) -> Result<Self, NetworkError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| NetworkError::Rpc(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            timeout_secs,
            next_id: AtomicU64::new(1),
        })
    }

    /// Send a JSON-RPC call and return its `result`
    pub async fn call(&self, url: &str, method: &str, params: Value) -> Result<Value, NetworkError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        debug!("Calling {} on {}", method, url);

        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NetworkError::Timeout(self.timeout_secs)
                } else if e.is_connect() {
                    NetworkError::ConnectionRefused(url.to_string())
                } else {
                    NetworkError::Rpc(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::Rpc(format!(
                "{} returned HTTP {}",
                url,
                status.as_u16()
            )));
        }

        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| NetworkError::InvalidResponse(e.to_string()))?;

        if let Some(error) = body.error {
            return Err(NetworkError::RpcResponse {
                code: error.code,
                message: error.message,
            });
        }

        body.result
            .ok_or_else(|| NetworkError::InvalidResponse(format!("{method} returned no result")))
    }

    /// `hmy_getBalance`
    pub async fn balance(&self, url: &str, address: &str) -> Result<Amount, NetworkError> {
        let result = self
            .call(url, "hmy_getBalance", json!([address, "latest"]))
            .await?;
        parse_hex_amount(&result)
    }

    /// `hmy_getTransactionCount`
    pub async fn transaction_count(&self, url: &str, address: &str) -> Result<u64, NetworkError> {
        let result = self
            .call(url, "hmy_getTransactionCount", json!([address, "latest"]))
            .await?;
        parse_hex_u64(&result)
    }

    /// `hmy_getShardingStructure`
    pub async fn sharding_structure(&self, url: &str) -> Result<Vec<ShardEndpoint>, NetworkError> {
        let result = self.call(url, "hmy_getShardingStructure", json!([])).await?;
        serde_json::from_value(result).map_err(|e| NetworkError::InvalidResponse(e.to_string()))
    }
}

fn parse_hex_amount(value: &Value) -> Result<Amount, NetworkError> {
    let text = value
        .as_str()
        .ok_or_else(|| NetworkError::InvalidResponse(format!("expected hex string, got {value}")))?;
    Amount::from_hex(text).map_err(|e| NetworkError::InvalidResponse(e.to_string()))
}

fn parse_hex_u64(value: &Value) -> Result<u64, NetworkError> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| NetworkError::InvalidResponse(format!("invalid number {n}"))),
        Value::String(s) => {
            let digits = s.trim_start_matches("0x");
            if digits.is_empty() {
                return Ok(0);
            }
            u64::from_str_radix(digits, 16)
                .map_err(|_| NetworkError::InvalidResponse(format!("invalid hex quantity {s}")))
        }
        other => Err(NetworkError::InvalidResponse(format!(
            "expected quantity, got {other}"
        ))),
    }
}
