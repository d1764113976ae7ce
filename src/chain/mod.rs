//! Alloy-backed chain access
//!
//! [`AlloyChain`] implements [`TokenChain`] over a wallet-filled
//! [`DynProvider`]. Use [`connect`] to build one from an RPC URL and a
//! private key.

pub mod builder;

use std::time::Duration;

use alloy::{
    eips::BlockNumberOrTag,
    network::{ReceiptResponse, TransactionBuilder},
    primitives::{Address, Bytes, Log, TxHash},
    providers::{DynProvider, Provider},
    rpc::types::{Filter, TransactionRequest},
    transports::{RpcError, TransportError},
};
use tracing::{debug, warn};

use crate::{
    errors::ChainError,
    traits::TokenChain,
    types::{Confirmation, LogQuery},
};

pub use builder::{connect, get_wallet_provider, DEFAULT_POLL_INTERVAL};

/// Consecutive transport failures tolerated while polling for a receipt
pub const MAX_RECEIPT_POLL_FAILURES: usize = 3;

/// Consecutive transport failures seen by one receipt poll
#[derive(Debug, Default)]
struct PollFailures {
    consecutive: usize,
}

impl PollFailures {
    /// Record a failed poll, handing the error back once the limit is hit
    ///
    /// Only transport failures count towards the limit.
    fn record(&mut self, err: ChainError) -> Result<(), ChainError> {
        if !err.is_transport() {
            self.consecutive = 0;
            return Ok(());
        }
        self.consecutive += 1;
        if self.consecutive >= MAX_RECEIPT_POLL_FAILURES {
            Err(err)
        } else {
            Ok(())
        }
    }

    fn reset(&mut self) {
        self.consecutive = 0;
    }
}

impl From<TransportError> for ChainError {
    fn from(err: TransportError) -> Self {
        match err {
            RpcError::ErrorResp(payload) => {
                let message = payload.message.to_string();
                match payload.as_revert_data() {
                    Some(data) => ChainError::Reverted {
                        data: Some(data),
                        message,
                    },
                    None if message.to_lowercase().contains("revert") => ChainError::Reverted {
                        data: None,
                        message,
                    },
                    None => ChainError::Rejected {
                        code: payload.code,
                        message,
                    },
                }
            }
            RpcError::Transport(kind) => ChainError::Transport(kind.to_string()),
            other => ChainError::Malformed(other.to_string()),
        }
    }
}

/// Wallet session on a live chain
#[derive(Clone)]
pub struct AlloyChain {
    provider: DynProvider,
    account: Address,
    chain_id: u64,
    poll_interval: Duration,
}

impl std::fmt::Debug for AlloyChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlloyChain")
            .field("account", &self.account)
            .field("chain_id", &self.chain_id)
            .finish()
    }
}

impl AlloyChain {
    pub fn new(provider: DynProvider, account: Address, chain_id: u64) -> Self {
        Self {
            provider,
            account,
            chain_id,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn provider(&self) -> &DynProvider {
        &self.provider
    }
}

impl TokenChain for AlloyChain {
    async fn account(&self) -> Result<Address, ChainError> {
        Ok(self.account)
    }

    async fn chain_id(&self) -> Result<u64, ChainError> {
        Ok(self.chain_id)
    }

    async fn head_block(&self) -> Result<u64, ChainError> {
        match self
            .provider
            .get_block_by_number(BlockNumberOrTag::Finalized)
            .await
        {
            Ok(Some(block)) => return Ok(block.header.number),
            Ok(None) => debug!("Node has no finalized block; using latest"),
            Err(e) => {
                let err = ChainError::from(e);
                if err.is_transport() {
                    return Err(err);
                }
                debug!(error = %err, "Finalized tag unsupported; using latest");
            }
        }
        Ok(self.provider.get_block_number().await?)
    }

    async fn get_logs(&self, query: &LogQuery) -> Result<Vec<Log>, ChainError> {
        let filter = Filter::new()
            .from_block(query.from_block)
            .to_block(query.to_block)
            .event_signature(query.event_topic)
            .topic2(query.recipient_topic);
        let logs = self.provider.get_logs(&filter).await?;
        Ok(logs.into_iter().map(|log| log.inner).collect())
    }

    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes, ChainError> {
        let tx = TransactionRequest::default()
            .with_to(to)
            .with_input(input);
        Ok(self.provider.call(tx).await?)
    }

    async fn send_transaction(&self, to: Address, input: Bytes) -> Result<TxHash, ChainError> {
        let tx = TransactionRequest::default()
            .with_from(self.account)
            .with_to(to)
            .with_input(input);
        let pending = self.provider.send_transaction(tx).await?;
        Ok(*pending.tx_hash())
    }

    async fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
        timeout: Duration,
    ) -> Result<Confirmation, ChainError> {
        let poll = async {
            let mut failures = PollFailures::default();
            loop {
                match self.provider.get_transaction_receipt(tx_hash).await {
                    Ok(Some(receipt)) => {
                        let block_number = receipt.block_number();
                        return Ok(if receipt.status() {
                            Confirmation::Success { block_number }
                        } else {
                            Confirmation::Reverted { block_number }
                        });
                    }
                    Ok(None) => failures.reset(),
                    Err(e) => {
                        let err = ChainError::from(e);
                        warn!(tx = %tx_hash, error = %err, "Receipt poll failed");
                        if let Err(err) = failures.record(err) {
                            return Err(err);
                        }
                    }
                }
                tokio::time::sleep(self.poll_interval).await;
            }
        };

        match tokio::time::timeout(timeout, poll).await {
            Ok(result) => result,
            Err(_) => Ok(Confirmation::TimedOut),
        }
    }
}
