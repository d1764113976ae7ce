//! Token discovery
//!
//! Discovery runs in two stages:
//! 1. [`LogScanner`] collects every token that ever sent value to the
//!    custodial contract
//! 2. [`TokenResolver`] fetches metadata and live balances, keeping only
//!    tokens with a positive balance
//!
//! [`TokenDiscovery`] chains both stages and is what the session and the
//! distribution orchestrator call to (re)build the token set.

pub mod resolver;
pub mod scanner;

use alloy::primitives::Address;
use tokio_util::sync::CancellationToken;

pub use resolver::TokenResolver;
pub use scanner::LogScanner;

use crate::{
    config::SplitterConfig, errors::SplitterError, traits::TokenChain, types::DiscoveredTokenSet,
};

/// Scanner and resolver for one custodial contract
#[derive(Debug, Clone)]
pub struct TokenDiscovery {
    custodial: Address,
    scanner: LogScanner,
    resolver: TokenResolver,
}

impl TokenDiscovery {
    pub fn new(custodial: Address, scanner: LogScanner, resolver: TokenResolver) -> Self {
        Self {
            custodial,
            scanner,
            resolver,
        }
    }

    pub fn from_config(config: &SplitterConfig) -> Self {
        Self::new(
            config.custodial_contract,
            LogScanner::new(config.scan.clone()),
            TokenResolver::new(config.resolver.clone()),
        )
    }

    pub fn custodial(&self) -> Address {
        self.custodial
    }

    /// Scan the transfer history and resolve the resulting candidates
    pub async fn discover<C>(
        &self,
        chain: &C,
        cancel: &CancellationToken,
    ) -> Result<DiscoveredTokenSet, SplitterError>
    where
        C: TokenChain,
    {
        let candidates = self
            .scanner
            .discover_candidate_tokens(chain, self.custodial, cancel)
            .await?;
        self.resolver
            .resolve(chain, candidates.iter(), self.custodial)
            .await
    }
}
