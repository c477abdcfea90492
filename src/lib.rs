//! Deployment and smoke-test tooling for a cross-chain liquidity protocol
//! mocknet
//!
//! This crate scripts contract deployment, account seeding, and transaction
//! submission against already-running local chain nodes. The recurring
//! shape is in [`submit`]: build a chain-specific signed payload, submit it
//! once, and poll for commitment. Everything else is per-chain glue over
//! that loop plus static mocknet configuration.

pub mod aliases;
pub mod chain;
pub mod evm;
pub mod radix;
pub mod submit;

pub use chain::{Chain, ChainParams};
pub use submit::{submit_and_await, SubmitError, TransactionIntent, TransactionNode, TxStatus};
