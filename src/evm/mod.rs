//! EVM mocknet client
//!
//! JSON-RPC 2.0 client for the local EVM dev nodes (geth-style). The admin
//! and coinbase accounts are unlocked on the node, so transactions go
//! through `eth_sendTransaction` and the node signs them; commitment is
//! observed through `eth_getTransactionReceipt`, which maps directly onto
//! the shared submit-and-poll loop.

pub mod artifacts;
pub mod deploy;

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::time::sleep;

use crate::submit::{SubmitError, TransactionIntent, TransactionNode, TxStatus};

/// Base gas for a plain transfer.
pub const DEFAULT_GAS: u64 = 65_000;
/// Additional gas per byte of memo data.
pub const GAS_PER_BYTE: u64 = 68;

/// Gas limit for a transfer carrying a memo of the given length.
pub fn calculate_gas(memo: &str) -> u64 {
    DEFAULT_GAS + GAS_PER_BYTE * memo.len() as u64
}

/// JSON-RPC request envelope.
#[derive(Serialize, Debug)]
struct RpcRequest {
    jsonrpc: String,
    method: String,
    params: Value,
    id: u64,
}

/// JSON-RPC response envelope.
#[derive(Deserialize, Debug)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcError>,
}

#[derive(Deserialize, Debug)]
struct RpcError {
    code: i32,
    message: String,
}

/// JSON-RPC client for one EVM node.
pub struct EvmClient {
    client: Client,
    url: String,
    request_id: AtomicU64,
}

impl EvmClient {
    pub fn new(url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to create HTTP client")?;
        Ok(Self {
            client,
            url: url.to_string(),
            request_id: AtomicU64::new(0),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Call any JSON-RPC method and return its result value.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        debug!("calling {} on {}", method, self.url);
        let request = RpcRequest {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
            id: self.request_id.fetch_add(1, Ordering::SeqCst),
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("failed to send {} request", method))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("{} request failed with status {}", method, status));
        }

        let body: RpcResponse = response
            .json()
            .await
            .with_context(|| format!("malformed JSON-RPC response for {}", method))?;
        match body.result {
            Some(result) => Ok(result),
            None => {
                let error = body.error.unwrap_or(RpcError {
                    code: -1,
                    message: "unknown error".to_string(),
                });
                Err(anyhow!(
                    "{} error: {} (code {})",
                    method,
                    error.message,
                    error.code
                ))
            }
        }
    }

    /// Block until the node answers a block-number query, with bounded
    /// one-second retries.
    pub async fn wait_for_node(&self, attempts: u32) -> Result<()> {
        let attempts = attempts.max(1);
        for attempt in 1..=attempts {
            match self.block_number().await {
                Ok(height) => {
                    info!("evm node ready at height {}", height);
                    return Ok(());
                }
                Err(e) if attempt < attempts => {
                    debug!("node not ready (attempt {}): {}", attempt, e);
                    sleep(Duration::from_secs(1)).await;
                }
                Err(e) => return Err(e.context("evm node never became ready")),
            }
        }
        unreachable!("loop returns on last attempt")
    }

    pub async fn block_number(&self) -> Result<u64> {
        let result = self.call("eth_blockNumber", json!([])).await?;
        quantity_to_u64(&result)
    }

    pub async fn net_version(&self) -> Result<String> {
        let result = self.call("net_version", json!([])).await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("invalid net_version response"))
    }

    /// Accounts unlocked on the node. The first is the coinbase.
    pub async fn accounts(&self) -> Result<Vec<String>> {
        let result = self.call("eth_accounts", json!([])).await?;
        serde_json::from_value(result).context("invalid eth_accounts response")
    }

    pub async fn get_balance(&self, address: &str) -> Result<u128> {
        let result = self.call("eth_getBalance", json!([address, "latest"])).await?;
        quantity_to_u128(&result)
    }

    pub async fn transaction_count(&self, address: &str) -> Result<u64> {
        let result = self
            .call("eth_getTransactionCount", json!([address, "latest"]))
            .await?;
        quantity_to_u64(&result)
    }

    /// Submit transaction parameters for the node to sign and broadcast.
    pub async fn send_transaction(&self, tx: &Value) -> Result<String> {
        let result = self.call("eth_sendTransaction", json!([tx])).await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("invalid eth_sendTransaction response"))
    }

    /// Receipt for a transaction hash, or None while pending.
    pub async fn transaction_receipt(&self, hash: &str) -> Result<Option<Value>> {
        let result = self.call("eth_getTransactionReceipt", json!([hash])).await?;
        if result.is_null() {
            Ok(None)
        } else {
            Ok(Some(result))
        }
    }

    /// Read-only contract call.
    pub async fn eth_call(&self, to: &str, data: &str) -> Result<String> {
        let result = self
            .call("eth_call", json!([{ "to": to, "data": data }, "latest"]))
            .await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("invalid eth_call response"))
    }
}

#[async_trait]
impl TransactionNode for EvmClient {
    /// The payload is the JSON transaction parameter object; the node signs
    /// it and assigns the transaction hash, which becomes the poll id.
    async fn submit(&self, intent: &TransactionIntent) -> Result<String, SubmitError> {
        let tx: Value =
            serde_json::from_str(intent.payload()).map_err(|e| SubmitError::Rejected {
                reason: format!("invalid transaction parameters: {}", e),
            })?;
        self.send_transaction(&tx)
            .await
            .map_err(|e| SubmitError::Rejected {
                reason: e.to_string(),
            })
    }

    async fn status(&self, id: &str) -> Result<TxStatus, SubmitError> {
        match self.transaction_receipt(id).await? {
            None => Ok(TxStatus::Pending),
            Some(receipt) => match receipt.get("status").and_then(Value::as_str) {
                Some("0x1") => Ok(TxStatus::CommittedSuccess),
                Some(other) => Ok(TxStatus::CommittedFailure(format!(
                    "receipt status {}",
                    other
                ))),
                None => Ok(TxStatus::Unknown("receipt without status".to_string())),
            },
        }
    }

    async fn receipt(&self, id: &str) -> Result<Value, SubmitError> {
        self.transaction_receipt(id)
            .await?
            .ok_or_else(|| anyhow!("no receipt yet for {}", id).into())
    }
}

/// Parse a 0x-prefixed hex quantity.
pub fn quantity_to_u64(value: &Value) -> Result<u64> {
    let s = value
        .as_str()
        .ok_or_else(|| anyhow!("expected hex quantity, got {}", value))?;
    u64::from_str_radix(s.trim_start_matches("0x"), 16)
        .with_context(|| format!("invalid hex quantity: {}", s))
}

pub fn quantity_to_u128(value: &Value) -> Result<u128> {
    let s = value
        .as_str()
        .ok_or_else(|| anyhow!("expected hex quantity, got {}", value))?;
    u128::from_str_radix(s.trim_start_matches("0x"), 16)
        .with_context(|| format!("invalid hex quantity: {}", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_gas() {
        assert_eq!(calculate_gas(""), 65_000);
        assert_eq!(calculate_gas("ADD:ETH.ETH:addr"), 65_000 + 68 * 16);
    }

    #[test]
    fn test_quantity_parsing() {
        assert_eq!(quantity_to_u64(&json!("0x10")).unwrap(), 16);
        assert_eq!(quantity_to_u64(&json!("0x0")).unwrap(), 0);
        assert_eq!(
            quantity_to_u128(&json!("0xde0b6b3a7640000")).unwrap(),
            1_000_000_000_000_000_000
        );
        assert!(quantity_to_u64(&json!("not-hex")).is_err());
        assert!(quantity_to_u64(&json!(42)).is_err());
    }
}
