//! Distribution orchestrator
//!
//! Submits `distribute(token)` calls to the custodial contract and tracks
//! each one to a terminal state. Batches run strictly one transaction at a
//! time: submission N+1 starts only after N is confirmed, reverted or timed
//! out, so a single signer never races its own nonces.

use std::time::Duration;

use alloy::{
    primitives::{Address, Bytes, TxHash},
    sol_types::SolCall,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    discovery::TokenDiscovery,
    errors::{ChainError, ScanError, SplitterError, TransactionError},
    traits::TokenChain,
    types::{
        Confirmation, ContractBatchResult, DiscoveredTokenSet, DistributionOutcome,
        DistributionResult, SplitBreakdown, TokenInfo,
    },
    utils::erc20_utils::query_erc20_balance,
};

use super::split::{compute_split, ShareTable};

/// Custodial splitter contract bindings
pub mod custodial {
    use alloy::sol;

    sol! {
        function distribute(address token) external;
        function distributeAll() external;
    }
}

use custodial::{distributeAllCall, distributeCall};

/// Results of a sequential batch
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// One result per input token, in input order
    pub results: Vec<DistributionResult>,
    /// Token set after the last refresh, if any refresh ran
    pub refreshed: Option<DiscoveredTokenSet>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }
}

/// Drives distributions for one custodial contract
#[derive(Debug, Clone)]
pub struct Distributor {
    discovery: TokenDiscovery,
    table: ShareTable,
    confirmation_timeout: Duration,
    refresh_after_success: bool,
}

impl Distributor {
    pub fn new(
        discovery: TokenDiscovery,
        table: ShareTable,
        confirmation_timeout: Duration,
        refresh_after_success: bool,
    ) -> Self {
        Self {
            discovery,
            table,
            confirmation_timeout,
            refresh_after_success,
        }
    }

    pub fn custodial(&self) -> Address {
        self.discovery.custodial()
    }

    pub fn table(&self) -> &ShareTable {
        &self.table
    }

    pub fn discovery(&self) -> &TokenDiscovery {
        &self.discovery
    }

    pub fn refresh_after_success(&self) -> bool {
        self.refresh_after_success
    }

    /// Distribute one token's balance
    ///
    /// Snapshots the live balance, submits `distribute(token)` and waits for
    /// the receipt. Every failure is recorded in the returned result; nothing
    /// is raised.
    pub async fn distribute_one<C>(&self, chain: &C, token: &TokenInfo) -> DistributionResult
    where
        C: TokenChain,
    {
        let snapshot = self.snapshot(chain, token).await;
        let input: Bytes = distributeCall {
            token: token.address,
        }
        .abi_encode()
        .into();

        info!(
            token = %snapshot.address,
            symbol = %snapshot.symbol,
            balance = %snapshot.formatted_balance(),
            "Submitting distribution"
        );

        let (tx_hash, outcome) = self.submit_and_confirm(chain, input).await;
        let expected_breakdown = if outcome.is_success() {
            compute_split(snapshot.raw_balance, snapshot.decimals, &self.table)
        } else {
            SplitBreakdown::default()
        };

        match &outcome {
            DistributionOutcome::Success => {
                info!(token = %snapshot.address, tx = ?tx_hash, "Distribution confirmed")
            }
            other => {
                warn!(token = %snapshot.address, tx = ?tx_hash, outcome = %other, "Distribution did not succeed")
            }
        }

        DistributionResult {
            token: snapshot,
            tx_hash,
            outcome,
            expected_breakdown,
        }
    }

    /// Distribute every token, one transaction at a time
    ///
    /// A failed or timed out distribution does not stop the batch. After each
    /// success the token set is rebuilt so later snapshots reflect what the
    /// contract still holds. Cancelling `cancel` stops the batch before the
    /// next submission.
    ///
    /// # Returns
    /// * `Ok(BatchReport)` - One result per input token, in input order
    /// * `Err(SplitterError::BatchHalted)` - The connection was lost or the
    ///   batch was cancelled; the error carries the results produced so far
    pub async fn distribute_all<C>(
        &self,
        chain: &C,
        tokens: &DiscoveredTokenSet,
        cancel: &CancellationToken,
    ) -> Result<BatchReport, SplitterError>
    where
        C: TokenChain,
    {
        let mut results = Vec::with_capacity(tokens.len());
        let mut refreshed: Option<DiscoveredTokenSet> = None;

        for token in tokens {
            // an in-flight transaction is always awaited; cancellation only
            // stops the next submission
            if cancel.is_cancelled() {
                warn!(
                    completed = results.len(),
                    remaining = tokens.len() - results.len(),
                    "Distribution batch cancelled"
                );
                return Err(SplitterError::BatchHalted {
                    completed: results,
                    source: Box::new(ScanError::Cancelled.into()),
                });
            }

            // later tokens use the refreshed metadata when it still lists them
            let current = refreshed
                .as_ref()
                .and_then(|set| set.get(&token.address))
                .unwrap_or(token);

            let result = self.distribute_one(chain, current).await;
            let lost = result.outcome.is_connection_lost();
            let succeeded = result.is_success();
            results.push(result);

            if lost {
                return Err(SplitterError::BatchHalted {
                    completed: results,
                    source: Box::new(SplitterError::ConnectionLost(format!(
                        "while submitting distribution for {}",
                        token.address
                    ))),
                });
            }

            if succeeded && self.refresh_after_success {
                match self.discovery.discover(chain, cancel).await {
                    Ok(set) => refreshed = Some(set),
                    Err(e) if e.is_connection_lost() => {
                        return Err(SplitterError::BatchHalted {
                            completed: results,
                            source: Box::new(e),
                        });
                    }
                    Err(e) => {
                        warn!(error = %e, "Token refresh failed; continuing with live balance snapshots");
                    }
                }
            }
        }

        let report = BatchReport { results, refreshed };
        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "Distribution batch finished"
        );
        Ok(report)
    }

    /// Call the contract's own `distributeAll()` in a single transaction
    ///
    /// Balances are snapshotted for every token first; breakdowns are only
    /// filled in when the transaction succeeds.
    pub async fn distribute_contract_batch<C>(
        &self,
        chain: &C,
        tokens: &DiscoveredTokenSet,
    ) -> ContractBatchResult
    where
        C: TokenChain,
    {
        let mut snapshots = Vec::with_capacity(tokens.len());
        for token in tokens {
            snapshots.push(self.snapshot(chain, token).await);
        }

        info!(tokens = snapshots.len(), "Submitting distributeAll");
        let input: Bytes = distributeAllCall {}.abi_encode().into();
        let (tx_hash, outcome) = self.submit_and_confirm(chain, input).await;

        let tokens = snapshots
            .into_iter()
            .map(|token| {
                let breakdown = if outcome.is_success() {
                    compute_split(token.raw_balance, token.decimals, &self.table)
                } else {
                    SplitBreakdown::default()
                };
                (token, breakdown)
            })
            .collect();

        ContractBatchResult {
            tx_hash,
            outcome,
            tokens,
        }
    }

    /// Live balance of the token, falling back to the last known one
    async fn snapshot<C>(&self, chain: &C, token: &TokenInfo) -> TokenInfo
    where
        C: TokenChain,
    {
        match query_erc20_balance(chain, token.address, self.custodial()).await {
            Ok(balance) => token.with_balance(balance),
            Err(e) => {
                warn!(token = %token.address, error = %e, "Balance snapshot failed; using last known balance");
                token.clone()
            }
        }
    }

    /// Submit a call to the custodial contract and wait for a terminal state
    async fn submit_and_confirm<C>(
        &self,
        chain: &C,
        input: Bytes,
    ) -> (Option<TxHash>, DistributionOutcome)
    where
        C: TokenChain,
    {
        let tx_hash = match chain.send_transaction(self.custodial(), input).await {
            Ok(hash) => hash,
            Err(e) => {
                return (
                    None,
                    DistributionOutcome::Failed(TransactionError::from_submission(e)),
                )
            }
        };

        let outcome = match chain
            .wait_for_receipt(tx_hash, self.confirmation_timeout)
            .await
        {
            Ok(Confirmation::Success { .. }) => DistributionOutcome::Success,
            Ok(Confirmation::Reverted { block_number }) => {
                DistributionOutcome::Failed(TransactionError::Reverted {
                    reason: match block_number {
                        Some(block) => format!("receipt status 0 in block {}", block),
                        None => "receipt status 0".to_string(),
                    },
                })
            }
            Ok(Confirmation::TimedOut) => DistributionOutcome::TimedOut,
            Err(ChainError::Transport(reason)) => {
                warn!(tx = %tx_hash, %reason, "Connection lost while waiting for receipt");
                DistributionOutcome::Failed(TransactionError::ConnectionLost(reason))
            }
            Err(e) => {
                warn!(tx = %tx_hash, error = %e, "Receipt tracking failed");
                DistributionOutcome::TimedOut
            }
        };

        (Some(tx_hash), outcome)
    }
}
