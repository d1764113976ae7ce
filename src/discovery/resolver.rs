//! Token metadata and balance resolver
//!
//! Turns candidate addresses into [`TokenInfo`] entries. Candidates are
//! queried concurrently, up to `max_concurrency` at a time, and joined back
//! in input order. A candidate that reverts, returns malformed data or holds
//! no balance is dropped; only a lost connection fails the run.

use alloy::primitives::Address;
use futures::stream::{self, StreamExt};
use tracing::{debug, info};

use crate::{
    config::ResolverConfig,
    errors::{SplitterError, TokenError},
    traits::TokenChain,
    types::{DiscoveredTokenSet, TokenAddress},
    utils::erc20_utils::query_token_info,
};

/// Resolves candidate token addresses into the discovered token set
#[derive(Debug, Clone, Default)]
pub struct TokenResolver {
    config: ResolverConfig,
}

impl TokenResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    /// Query every candidate and keep those with a positive balance
    ///
    /// # Arguments
    /// * `chain` - Connected chain
    /// * `candidates` - Token addresses in discovery order
    /// * `custodial` - Holder whose balances are resolved
    ///
    /// # Returns
    /// * `Ok(DiscoveredTokenSet)` - Tokens with `raw_balance > 0`, in input order
    /// * `Err(SplitterError::ConnectionLost)` - If the provider became unreachable
    pub async fn resolve<'a, C, I>(
        &self,
        chain: &C,
        candidates: I,
        custodial: Address,
    ) -> Result<DiscoveredTokenSet, SplitterError>
    where
        C: TokenChain,
        I: IntoIterator<Item = &'a TokenAddress>,
    {
        let concurrency = self.config.max_concurrency.max(1);

        let results: Vec<(TokenAddress, Result<_, TokenError>)> = stream::iter(candidates)
            .map(|token| async move { (*token, query_token_info(chain, *token, custodial).await) })
            .buffered(concurrency)
            .collect()
            .await;

        let total = results.len();
        let mut discovered = DiscoveredTokenSet::new();
        for (token, result) in results {
            match result {
                Ok(info) if info.raw_balance.is_zero() => {
                    debug!(token = %token, symbol = %info.symbol, "Excluding token with zero balance");
                }
                Ok(info) => {
                    discovered.push(info);
                }
                Err(e) if e.is_fatal() => {
                    return Err(SplitterError::ConnectionLost(e.to_string()));
                }
                Err(e) => {
                    debug!(token = %token, error = %e, "Excluding token that failed metadata queries");
                }
            }
        }

        info!(candidates = total, resolved = discovered.len(), "Resolved token balances");
        Ok(discovered)
    }
}
