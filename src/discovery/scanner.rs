//! Transfer log scanner
//!
//! Finds every token contract that ever emitted an ERC20 `Transfer` to the
//! custodial contract. The scan covers the configured start block up to the
//! chain head, optionally in fixed-size block windows.
//!
//! A window that the provider rejects, or that comes back at the configured
//! log cap, fails the whole scan with [`ScanError::Incomplete`]. The scanner
//! never returns a partial candidate set.

use alloy::primitives::{Address, Log};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    config::ScanConfig,
    errors::{ChainError, ScanError, SplitterError},
    traits::TokenChain,
    types::{CandidateTokens, LogQuery},
    utils::erc20_utils::{parse_transfer_log, TRANSFER_EVENT_SIGNATURE},
};

/// Scans historical `Transfer` logs addressed to one contract
#[derive(Debug, Clone, Default)]
pub struct LogScanner {
    config: ScanConfig,
}

impl LogScanner {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Collect the distinct token addresses that sent value to `custodial`
    ///
    /// # Arguments
    /// * `chain` - Connected chain
    /// * `custodial` - Contract whose incoming transfers are scanned
    /// * `cancel` - Cancels the scan between and during log queries
    ///
    /// # Returns
    /// * `Ok(CandidateTokens)` - Deduplicated addresses in first-seen order
    /// * `Err(SplitterError::Scan)` - Rejected, truncated or cancelled scan
    /// * `Err(SplitterError::ConnectionLost)` - Transport failure
    pub async fn discover_candidate_tokens<C>(
        &self,
        chain: &C,
        custodial: Address,
        cancel: &CancellationToken,
    ) -> Result<CandidateTokens, SplitterError>
    where
        C: TokenChain,
    {
        let head = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ScanError::Cancelled.into()),
            head = chain.head_block() => head.map_err(|e| match e {
                ChainError::Transport(reason) => SplitterError::ConnectionLost(reason),
                other => ScanError::Incomplete {
                    from_block: self.config.from_block,
                    to_block: self.config.from_block,
                    reason: format!("could not determine head block: {}", other),
                }
                .into(),
            })?,
        };

        info!(
            custodial = %custodial,
            from_block = self.config.from_block,
            to_block = head,
            "Fetching Transfer logs"
        );

        let mut candidates = CandidateTokens::new();
        if self.config.from_block > head {
            return Ok(candidates);
        }

        let window = self.config.max_block_range.filter(|n| *n > 0);
        let mut current_block = self.config.from_block;

        while current_block <= head {
            let to_block = match window {
                Some(size) => current_block.saturating_add(size - 1).min(head),
                None => head,
            };

            let query = LogQuery {
                from_block: current_block,
                to_block,
                event_topic: *TRANSFER_EVENT_SIGNATURE,
                recipient_topic: custodial.into_word(),
            };

            let logs = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ScanError::Cancelled.into()),
                logs = chain.get_logs(&query) => logs,
            };

            let logs = match logs {
                Ok(logs) => logs,
                Err(ChainError::Transport(reason)) => {
                    return Err(SplitterError::ConnectionLost(reason));
                }
                Err(e) => {
                    warn!(error = %e, current_block, to_block, "Log query rejected");
                    return Err(ScanError::Incomplete {
                        from_block: current_block,
                        to_block,
                        reason: e.to_string(),
                    }
                    .into());
                }
            };

            if let Some(cap) = self.config.max_logs_per_query {
                if logs.len() >= cap {
                    warn!(count = logs.len(), cap, current_block, to_block, "Log query hit the result cap");
                    return Err(ScanError::Incomplete {
                        from_block: current_block,
                        to_block,
                        reason: format!(
                            "provider returned {} logs, at the {}-log cap; use a smaller block range",
                            logs.len(),
                            cap
                        ),
                    }
                    .into());
                }
            }

            debug!(count = logs.len(), current_block, to_block, "Fetched log window");
            collect_candidates(&logs, custodial, &mut candidates);

            if to_block == u64::MAX {
                break;
            }
            current_block = to_block + 1;
        }

        info!(count = candidates.len(), "Discovered candidate tokens");
        Ok(candidates)
    }
}

fn collect_candidates(logs: &[Log], custodial: Address, candidates: &mut CandidateTokens) {
    for log in logs {
        match parse_transfer_log(log.data.topics(), &log.data.data) {
            Some((_, to, _)) if to == custodial => {
                if candidates.insert(log.address) {
                    debug!(token = %log.address, "New candidate token");
                }
            }
            Some(_) => {}
            // zero-value transfers and non-ERC20 shapes (e.g. ERC721)
            None => {
                debug!(token = %log.address, "Skipping log without a positive ERC20 transfer");
            }
        }
    }
}
