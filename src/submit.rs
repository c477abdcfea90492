//! Transaction submission and commitment polling
//!
//! Both chain integrations follow the same shape: build a signed payload,
//! submit it to the node once, then poll a status endpoint at a fixed
//! interval until the transaction reaches a terminal committed state or the
//! wait budget runs out. This module holds that loop and the node contract
//! it runs against.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde_json::Value;
use thiserror::Error;
use tokio::time::{sleep, Instant};

/// A signed, chain-specific transaction payload, immutable once built.
///
/// The payload is an opaque string in whatever encoding the target node
/// expects (hex for the Radix integration, JSON transaction parameters for
/// EVM dev nodes). Where the signing side derives the canonical identifier
/// client-side it is attached here; otherwise the node assigns one at
/// submission.
#[derive(Debug, Clone)]
pub struct TransactionIntent {
    payload: String,
    intent_hash: Option<String>,
}

impl TransactionIntent {
    /// Intent with a client-derived identifier (intent hash).
    pub fn with_hash(payload: String, intent_hash: String) -> Self {
        Self {
            payload,
            intent_hash: Some(intent_hash),
        }
    }

    /// Intent whose identifier the node assigns at submission time.
    pub fn unhashed(payload: String) -> Self {
        Self {
            payload,
            intent_hash: None,
        }
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn intent_hash(&self) -> Option<&str> {
        self.intent_hash.as_deref()
    }
}

/// Status of a submitted transaction as reported by the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxStatus {
    /// Not yet in a committed block.
    Pending,
    /// Committed and executed successfully.
    CommittedSuccess,
    /// Committed but execution failed, or permanently rejected.
    CommittedFailure(String),
    /// A status string this tool does not recognize; treated as pending.
    Unknown(String),
}

/// Failures surfaced by [`submit_and_await`]. None are retried; a smoke-test
/// run should stop loudly rather than mask a broken node.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The node refused the payload outright (non-success HTTP response or
    /// malformed body). No status polls are issued after this.
    #[error("node rejected transaction: {reason}")]
    Rejected { reason: String },

    /// The transaction was committed but did not execute successfully.
    #[error("transaction {id} failed with status {status}")]
    Failed { id: String, status: String },

    /// No terminal status observed within the wait budget.
    #[error("transaction {id} not committed within {waited:?}")]
    TimedOut { id: String, waited: Duration },

    /// Transport or decoding failure while talking to the node.
    #[error("node request failed: {0}")]
    Node(#[from] anyhow::Error),
}

/// The node surface the submitter polls against. Each chain client
/// implements this over its own endpoint shapes.
#[async_trait]
pub trait TransactionNode {
    /// Submit the raw payload. Returns the identifier to poll with, either
    /// echoing the intent hash or the node-assigned transaction hash.
    async fn submit(&self, intent: &TransactionIntent) -> Result<String, SubmitError>;

    /// Query the current status for a submitted transaction.
    async fn status(&self, id: &str) -> Result<TxStatus, SubmitError>;

    /// Fetch the receipt. Only meaningful after `CommittedSuccess`.
    async fn receipt(&self, id: &str) -> Result<Value, SubmitError>;
}

/// Submit an intent exactly once and poll until it commits.
///
/// Polls sequentially at `poll_interval` with a fixed sleep and no backoff;
/// the target is a local mocknet with predictable block time. On
/// `CommittedSuccess` the receipt is fetched and returned. Any terminal
/// failure status or an elapsed wait beyond `timeout` aborts with the
/// corresponding [`SubmitError`]; the submission itself is never retried.
pub async fn submit_and_await(
    node: &dyn TransactionNode,
    intent: &TransactionIntent,
    poll_interval: Duration,
    timeout: Duration,
) -> Result<Value, SubmitError> {
    let id = node.submit(intent).await?;
    debug!("submitted transaction {}", id);

    let started = Instant::now();
    loop {
        match node.status(&id).await? {
            TxStatus::CommittedSuccess => {
                debug!("transaction {} committed", id);
                return node.receipt(&id).await;
            }
            TxStatus::CommittedFailure(status) => {
                return Err(SubmitError::Failed { id, status });
            }
            status => {
                debug!("transaction {} not committed yet: {:?}", id, status);
            }
        }

        let waited = started.elapsed();
        if waited + poll_interval > timeout {
            return Err(SubmitError::TimedOut { id, waited });
        }
        sleep(poll_interval).await;
    }
}

impl TxStatus {
    /// Map a node-reported status string onto the states the submitter acts
    /// on. Radix nodes report `Pending`/`CommittedSuccess`/`CommittedFailure`
    /// plus a handful of rejection variants.
    pub fn from_report(status: &str) -> Self {
        match status {
            "Pending" => TxStatus::Pending,
            "CommittedSuccess" => TxStatus::CommittedSuccess,
            "CommittedFailure" | "PermanentlyRejected" => {
                TxStatus::CommittedFailure(status.to_string())
            }
            other => TxStatus::Unknown(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_report() {
        assert_eq!(TxStatus::from_report("Pending"), TxStatus::Pending);
        assert_eq!(
            TxStatus::from_report("CommittedSuccess"),
            TxStatus::CommittedSuccess
        );
        assert_eq!(
            TxStatus::from_report("CommittedFailure"),
            TxStatus::CommittedFailure("CommittedFailure".to_string())
        );
        assert_eq!(
            TxStatus::from_report("NotSeen"),
            TxStatus::Unknown("NotSeen".to_string())
        );
    }

    #[test]
    fn test_intent_accessors() {
        let intent = TransactionIntent::with_hash("deadbeef".to_string(), "txid_1".to_string());
        assert_eq!(intent.payload(), "deadbeef");
        assert_eq!(intent.intent_hash(), Some("txid_1"));

        let intent = TransactionIntent::unhashed("{}".to_string());
        assert_eq!(intent.intent_hash(), None);
    }
}
