//! Wallet session state
//!
//! [`Session`] is the single owner of everything a user interaction touches:
//! connection status, the discovered token set, the result history and the
//! current status message. Presentation code reads it through
//! [`Session::view`] and never mutates it.

use alloy::primitives::{Address, TxHash};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    config::SplitterConfig,
    discovery::TokenDiscovery,
    distribution::{BatchReport, Distributor},
    errors::{ChainError, ConfigError, InitError, SplitterError},
    traits::TokenChain,
    types::{
        ContractBatchResult, DiscoveredTokenSet, DistributionOutcome, DistributionResult,
        SplitBreakdown, TokenAddress, TokenInfo,
    },
};

/// Wallet connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionStatus {
    Disconnected,
    Connected { account: Address, chain_id: u64 },
}

/// One entry of the result history
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryEntry {
    /// A `distribute(token)` transaction
    Token(DistributionResult),
    /// A contract-level `distributeAll()` transaction
    Contract(ContractBatchResult),
}

/// Interactive splitter session over one chain backend
#[derive(Debug)]
pub struct Session<C> {
    chain: C,
    distributor: Distributor,
    explorer_tx_url: String,
    connection: ConnectionStatus,
    tokens: DiscoveredTokenSet,
    history: Vec<HistoryEntry>,
    status_message: String,
}

impl<C: TokenChain> Session<C> {
    pub fn new(chain: C, distributor: Distributor, explorer_tx_url: impl Into<String>) -> Self {
        Self {
            chain,
            distributor,
            explorer_tx_url: explorer_tx_url.into(),
            connection: ConnectionStatus::Disconnected,
            tokens: DiscoveredTokenSet::new(),
            history: Vec::new(),
            status_message: "Not connected".to_string(),
        }
    }

    /// Build a session from a loaded configuration
    pub fn from_config(chain: C, config: &SplitterConfig) -> Result<Self, ConfigError> {
        let distributor = Distributor::new(
            TokenDiscovery::from_config(config),
            config.share_table()?,
            config.distribution.confirmation_timeout(),
            config.distribution.refresh_after_success,
        );
        Ok(Self::new(chain, distributor, config.explorer_tx_url.clone()))
    }

    pub fn chain(&self) -> &C {
        &self.chain
    }

    pub fn connection(&self) -> ConnectionStatus {
        self.connection
    }

    pub fn tokens(&self) -> &DiscoveredTokenSet {
        &self.tokens
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    /// Request the account and network from the wallet
    pub async fn connect(&mut self) -> Result<ConnectionStatus, SplitterError> {
        let connected = async {
            let account = self.chain.account().await?;
            let chain_id = self.chain.chain_id().await?;
            Ok::<_, ChainError>(ConnectionStatus::Connected { account, chain_id })
        }
        .await;

        match connected {
            Ok(status) => {
                self.connection = status;
                if let ConnectionStatus::Connected { account, chain_id } = status {
                    self.status_message =
                        format!("Connected as {} on chain {}", account, chain_id);
                }
                Ok(status)
            }
            Err(e) => {
                self.connection = ConnectionStatus::Disconnected;
                self.status_message = format!("Connection failed: {}", e);
                Err(InitError::ProviderUnavailable(e.to_string()).into())
            }
        }
    }

    /// Rebuild the token set from the transfer history
    ///
    /// On failure the previous set is kept untouched.
    pub async fn discover(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<&DiscoveredTokenSet, SplitterError> {
        self.ensure_connected()?;
        self.status_message = "Scanning transfer history".to_string();

        match self.distributor.discovery().discover(&self.chain, cancel).await {
            Ok(tokens) => {
                self.status_message = if tokens.is_empty() {
                    "No tokens with a balance found".to_string()
                } else {
                    format!("Found {} token(s) with a balance", tokens.len())
                };
                self.tokens = tokens;
                Ok(&self.tokens)
            }
            Err(e) => Err(self.fail("Discovery failed", e)),
        }
    }

    /// Distribute one token from the current set
    pub async fn distribute_one(
        &mut self,
        token: TokenAddress,
    ) -> Result<DistributionResult, SplitterError> {
        self.ensure_connected()?;
        self.ensure_recipients()?;
        let Some(info) = self.tokens.get(&token).cloned() else {
            self.status_message = format!("Token {} is not in the discovered set", token);
            return Err(SplitterError::UnknownToken(token));
        };
        self.status_message = format!("Distributing {}", info.symbol);

        let result = self.distributor.distribute_one(&self.chain, &info).await;
        self.history.push(HistoryEntry::Token(result.clone()));

        if result.outcome.is_connection_lost() {
            self.connection = ConnectionStatus::Disconnected;
        }
        self.status_message = self.describe(&result);

        if result.is_success() {
            self.refresh().await;
        }
        Ok(result)
    }

    /// Distribute every token in the current set, one transaction at a time
    pub async fn distribute_all(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<BatchReport, SplitterError> {
        self.ensure_connected()?;
        self.ensure_recipients()?;
        if self.tokens.is_empty() {
            self.status_message = "No tokens to distribute".to_string();
            return Ok(BatchReport {
                results: Vec::new(),
                refreshed: None,
            });
        }
        self.status_message = format!("Distributing {} token(s)", self.tokens.len());

        match self
            .distributor
            .distribute_all(&self.chain, &self.tokens, cancel)
            .await
        {
            Ok(report) => {
                self.history
                    .extend(report.results.iter().cloned().map(HistoryEntry::Token));
                if let Some(refreshed) = &report.refreshed {
                    self.tokens = refreshed.clone();
                }
                self.status_message = if report.failed() == 0 {
                    format!("Distributed all {} token(s)", report.succeeded())
                } else {
                    format!(
                        "Partial distribution: {} succeeded, {} failed",
                        report.succeeded(),
                        report.failed()
                    )
                };
                Ok(report)
            }
            Err(SplitterError::BatchHalted { completed, source }) => {
                self.history
                    .extend(completed.iter().cloned().map(HistoryEntry::Token));
                let succeeded = completed.iter().filter(|r| r.is_success()).count();
                if source.is_connection_lost() {
                    self.connection = ConnectionStatus::Disconnected;
                }
                self.status_message = format!(
                    "Batch halted after {} of {} token(s) ({} succeeded): {}",
                    completed.len(),
                    self.tokens.len(),
                    succeeded,
                    source
                );
                warn!(error = %source, "Distribution batch halted");
                Err(SplitterError::BatchHalted { completed, source })
            }
            Err(e) => Err(self.fail("Distribution failed", e)),
        }
    }

    /// Call the contract's own `distributeAll()` for the whole set
    pub async fn distribute_contract_batch(
        &mut self,
    ) -> Result<ContractBatchResult, SplitterError> {
        self.ensure_connected()?;
        self.ensure_recipients()?;
        self.status_message = "Submitting distributeAll".to_string();

        let result = self
            .distributor
            .distribute_contract_batch(&self.chain, &self.tokens)
            .await;
        self.history.push(HistoryEntry::Contract(result.clone()));

        if result.outcome.is_connection_lost() {
            self.connection = ConnectionStatus::Disconnected;
        }
        self.status_message = match &result.outcome {
            DistributionOutcome::Success => {
                format!("distributeAll confirmed for {} token(s)", result.tokens.len())
            }
            other => format!("distributeAll {}", other),
        };

        if result.outcome.is_success() {
            self.refresh().await;
        }
        Ok(result)
    }

    /// Serializable snapshot for presentation
    pub fn view(&self) -> SessionView {
        SessionView {
            connection: self.connection,
            custodial_contract: self.distributor.custodial(),
            status_message: self.status_message.clone(),
            tokens: self.tokens.iter().map(TokenView::from).collect(),
            history: self
                .history
                .iter()
                .map(|entry| HistoryView::new(entry, &self.explorer_tx_url))
                .collect(),
        }
    }

    fn ensure_connected(&mut self) -> Result<(), SplitterError> {
        match self.connection {
            ConnectionStatus::Connected { .. } => Ok(()),
            ConnectionStatus::Disconnected => {
                self.status_message = "Connect a wallet first".to_string();
                Err(SplitterError::NotConnected)
            }
        }
    }

    /// Distributions need a recipient table for their expected breakdowns
    fn ensure_recipients(&mut self) -> Result<(), SplitterError> {
        if self.distributor.table().is_empty() {
            self.status_message = "No recipients configured".to_string();
            return Err(ConfigError::Missing("recipients").into());
        }
        Ok(())
    }

    fn fail(&mut self, context: &str, err: SplitterError) -> SplitterError {
        if err.is_connection_lost() {
            self.connection = ConnectionStatus::Disconnected;
        }
        self.status_message = format!("{}: {}", context, err);
        warn!(error = %err, "{}", context);
        err
    }

    fn describe(&self, result: &DistributionResult) -> String {
        let link = result
            .explorer_url(&self.explorer_tx_url)
            .map(|url| format!(" ({})", url))
            .unwrap_or_default();
        format!("{} {}{}", result.token.symbol, result.outcome, link)
    }

    /// Re-run discovery after a success; failures keep the current set
    async fn refresh(&mut self) {
        if !self.distributor.refresh_after_success() {
            return;
        }
        match self
            .distributor
            .discovery()
            .discover(&self.chain, &CancellationToken::new())
            .await
        {
            Ok(tokens) => {
                info!(tokens = tokens.len(), "Token set refreshed");
                self.tokens = tokens;
            }
            Err(e) => {
                if e.is_connection_lost() {
                    self.connection = ConnectionStatus::Disconnected;
                }
                warn!(error = %e, "Token refresh failed");
            }
        }
    }
}

/// Read-only session snapshot
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub connection: ConnectionStatus,
    pub custodial_contract: Address,
    pub status_message: String,
    pub tokens: Vec<TokenView>,
    pub history: Vec<HistoryView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenView {
    pub address: Address,
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub decimals: u8,
    pub balance: String,
    pub raw_balance: String,
}

impl From<&TokenInfo> for TokenView {
    fn from(token: &TokenInfo) -> Self {
        Self {
            address: token.address,
            symbol: token.symbol.clone(),
            name: token.name.clone(),
            decimals: token.decimals,
            balance: token.formatted_balance(),
            raw_balance: token.raw_balance.to_string(),
        }
    }
}

/// One recipient line of an expected split
#[derive(Debug, Clone, Serialize)]
pub struct AllocationView {
    pub label: String,
    pub amount: String,
}

fn allocation_rows(breakdown: &SplitBreakdown) -> Vec<AllocationView> {
    if breakdown.allocations.is_empty() && breakdown.remainder.is_zero() {
        return Vec::new();
    }
    breakdown
        .formatted()
        .into_iter()
        .map(|(label, amount)| AllocationView { label, amount })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct DistributedTokenView {
    pub token: TokenView,
    pub expected: Vec<AllocationView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryView {
    /// `distribute` or `distributeAll`
    pub kind: &'static str,
    pub tx_hash: Option<TxHash>,
    pub explorer_url: Option<String>,
    pub outcome: String,
    pub success: bool,
    pub tokens: Vec<DistributedTokenView>,
}

impl HistoryView {
    fn new(entry: &HistoryEntry, explorer_tx_url: &str) -> Self {
        match entry {
            HistoryEntry::Token(result) => Self {
                kind: "distribute",
                tx_hash: result.tx_hash,
                explorer_url: result.explorer_url(explorer_tx_url),
                outcome: result.outcome.to_string(),
                success: result.is_success(),
                tokens: vec![DistributedTokenView {
                    token: TokenView::from(&result.token),
                    expected: allocation_rows(&result.expected_breakdown),
                }],
            },
            HistoryEntry::Contract(batch) => Self {
                kind: "distributeAll",
                tx_hash: batch.tx_hash,
                explorer_url: batch
                    .tx_hash
                    .map(|hash| format!("{}{}", explorer_tx_url, hash)),
                outcome: batch.outcome.to_string(),
                success: batch.outcome.is_success(),
                tokens: batch
                    .tokens
                    .iter()
                    .map(|(token, breakdown)| DistributedTokenView {
                        token: TokenView::from(token),
                        expected: allocation_rows(breakdown),
                    })
                    .collect(),
            },
        }
    }
}
