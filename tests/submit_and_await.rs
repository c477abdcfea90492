//! Submit-and-poll loop behavior against a scripted mock node.
//!
//! Time is paused in every test, so the fixed-interval sleeps advance
//! instantly and poll counts and wait budgets are exact.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use mocknet_tool::{submit_and_await, SubmitError, TransactionIntent, TransactionNode, TxStatus};

/// Mock node that replays a fixed status script, repeating the last entry
/// once exhausted.
struct ScriptedNode {
    reject_submission: bool,
    statuses: Vec<TxStatus>,
    submits: Mutex<u32>,
    polls: Mutex<u32>,
    receipts: Mutex<u32>,
}

impl ScriptedNode {
    fn new(statuses: Vec<TxStatus>) -> Self {
        Self {
            reject_submission: false,
            statuses,
            submits: Mutex::new(0),
            polls: Mutex::new(0),
            receipts: Mutex::new(0),
        }
    }

    fn rejecting() -> Self {
        Self {
            reject_submission: true,
            ..Self::new(vec![])
        }
    }

    fn submits(&self) -> u32 {
        *self.submits.lock().unwrap()
    }

    fn polls(&self) -> u32 {
        *self.polls.lock().unwrap()
    }

    fn receipts(&self) -> u32 {
        *self.receipts.lock().unwrap()
    }
}

#[async_trait]
impl TransactionNode for ScriptedNode {
    async fn submit(&self, intent: &TransactionIntent) -> Result<String, SubmitError> {
        *self.submits.lock().unwrap() += 1;
        if self.reject_submission {
            return Err(SubmitError::Rejected {
                reason: "status 400: invalid payload".to_string(),
            });
        }
        Ok(intent.intent_hash().unwrap_or("txid_assigned").to_string())
    }

    async fn status(&self, _id: &str) -> Result<TxStatus, SubmitError> {
        let mut polls = self.polls.lock().unwrap();
        let index = (*polls as usize).min(self.statuses.len().saturating_sub(1));
        *polls += 1;
        Ok(self
            .statuses
            .get(index)
            .cloned()
            .unwrap_or(TxStatus::Pending))
    }

    async fn receipt(&self, id: &str) -> Result<Value, SubmitError> {
        *self.receipts.lock().unwrap() += 1;
        Ok(json!({ "intent_hash": id, "committed": true }))
    }
}

fn intent() -> TransactionIntent {
    TransactionIntent::with_hash("deadbeef".to_string(), "txid_1".to_string())
}

const POLL: Duration = Duration::from_secs(1);
const TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::test(start_paused = true)]
async fn returns_receipt_after_exactly_n_polls() {
    let node = ScriptedNode::new(vec![
        TxStatus::Pending,
        TxStatus::Pending,
        TxStatus::CommittedSuccess,
    ]);

    let receipt = submit_and_await(&node, &intent(), POLL, TIMEOUT)
        .await
        .unwrap();

    assert_eq!(receipt["intent_hash"], "txid_1");
    assert_eq!(node.submits(), 1);
    assert_eq!(node.polls(), 3);
    assert_eq!(node.receipts(), 1);
}

#[tokio::test(start_paused = true)]
async fn immediate_success_polls_once() {
    let node = ScriptedNode::new(vec![TxStatus::CommittedSuccess]);

    submit_and_await(&node, &intent(), POLL, TIMEOUT)
        .await
        .unwrap();

    assert_eq!(node.polls(), 1);
}

#[tokio::test(start_paused = true)]
async fn times_out_when_never_terminal() {
    let node = ScriptedNode::new(vec![TxStatus::Pending]);

    let err = submit_and_await(&node, &intent(), POLL, TIMEOUT)
        .await
        .unwrap_err();

    match err {
        SubmitError::TimedOut { id, waited } => {
            assert_eq!(id, "txid_1");
            // gives up within one poll interval of the budget
            assert!(waited <= TIMEOUT);
            assert!(waited + POLL >= TIMEOUT);
        }
        other => panic!("expected TimedOut, got {:?}", other),
    }
    // polls at t = 0s..=10s, then the budget is exhausted
    assert_eq!(node.polls(), 11);
    assert_eq!(node.submits(), 1);
    assert_eq!(node.receipts(), 0);
}

#[tokio::test(start_paused = true)]
async fn unknown_status_keeps_polling() {
    let node = ScriptedNode::new(vec![
        TxStatus::Unknown("NotSeen".to_string()),
        TxStatus::CommittedSuccess,
    ]);

    submit_and_await(&node, &intent(), POLL, TIMEOUT)
        .await
        .unwrap();

    assert_eq!(node.polls(), 2);
}

#[tokio::test(start_paused = true)]
async fn committed_failure_aborts_without_receipt() {
    let node = ScriptedNode::new(vec![
        TxStatus::Pending,
        TxStatus::CommittedFailure("CommittedFailure".to_string()),
    ]);

    let err = submit_and_await(&node, &intent(), POLL, TIMEOUT)
        .await
        .unwrap_err();

    match err {
        SubmitError::Failed { id, status } => {
            assert_eq!(id, "txid_1");
            assert_eq!(status, "CommittedFailure");
        }
        other => panic!("expected Failed, got {:?}", other),
    }
    assert_eq!(node.receipts(), 0);
}

#[tokio::test(start_paused = true)]
async fn rejected_submission_issues_no_polls() {
    let node = ScriptedNode::rejecting();

    let err = submit_and_await(&node, &intent(), POLL, TIMEOUT)
        .await
        .unwrap_err();

    assert!(matches!(err, SubmitError::Rejected { .. }));
    assert_eq!(node.submits(), 1);
    assert_eq!(node.polls(), 0);
    assert_eq!(node.receipts(), 0);
}

#[tokio::test(start_paused = true)]
async fn node_assigned_id_is_polled() {
    // EVM-style: the intent carries no hash and the node assigns one
    let node = ScriptedNode::new(vec![TxStatus::CommittedSuccess]);
    let intent = TransactionIntent::unhashed(json!({ "from": "0x0" }).to_string());

    let receipt = submit_and_await(&node, &intent, POLL, TIMEOUT)
        .await
        .unwrap();

    assert_eq!(receipt["intent_hash"], "txid_assigned");
}
