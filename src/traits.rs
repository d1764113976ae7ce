//! Chain access trait
//!
//! Every component reaches the network through [`TokenChain`]. The crate ships
//! an alloy-backed implementation in [`crate::chain`]; tests drive the same
//! code with an in-memory chain.
//!
//! # Key Traits
//! - `TokenChain`: read-only queries, log scans, transaction submission and
//!   receipt tracking for the connected account

use std::future::Future;
use std::time::Duration;

use alloy::primitives::{Address, Bytes, Log, TxHash};

use crate::errors::ChainError;
use crate::types::{Confirmation, LogQuery};

/// Wallet-connected access to a single chain
///
/// Implementors must classify failures into [`ChainError`] variants:
/// - `Transport` for connection loss
/// - `Rejected` for JSON-RPC error responses (including range or size limits)
/// - `Reverted` for execution reverts
/// - `Malformed` for undecodable responses
pub trait TokenChain: Send + Sync {
    /// Address of the connected signing account
    fn account(&self) -> impl Future<Output = Result<Address, ChainError>> + Send;

    /// Chain ID of the connected network
    fn chain_id(&self) -> impl Future<Output = Result<u64, ChainError>> + Send;

    /// Highest block a historical scan should reach
    ///
    /// The finalized block where the node reports one, the latest otherwise.
    fn head_block(&self) -> impl Future<Output = Result<u64, ChainError>> + Send;

    /// Fetch logs matching the query
    fn get_logs(
        &self,
        query: &LogQuery,
    ) -> impl Future<Output = Result<Vec<Log>, ChainError>> + Send;

    /// Execute a read-only call against the latest state
    fn call(
        &self,
        to: Address,
        input: Bytes,
    ) -> impl Future<Output = Result<Bytes, ChainError>> + Send;

    /// Sign and submit a transaction from the connected account
    fn send_transaction(
        &self,
        to: Address,
        input: Bytes,
    ) -> impl Future<Output = Result<TxHash, ChainError>> + Send;

    /// Wait until the transaction is mined or the timeout elapses
    ///
    /// A timeout is `Ok(Confirmation::TimedOut)`. A transport error means the
    /// provider is gone and the receipt can no longer be tracked.
    fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
        timeout: Duration,
    ) -> impl Future<Output = Result<Confirmation, ChainError>> + Send;
}
