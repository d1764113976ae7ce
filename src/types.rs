//! Core types for token discovery and distribution
//!
//! This module defines the data structures shared by all components:
//! - Discovered tokens and token sets
//! - Recipient shares and split breakdowns
//! - Distribution outcomes and results

use std::fmt;

pub use alloy::primitives::{Address, Bytes, TxHash, U256};
use serde::{Deserialize, Serialize};

use crate::errors::TransactionError;
use crate::utils::format_utils::format_amount;

/// A token contract address
///
/// Always the 20-byte form, so differently-cased spellings of one address
/// compare equal.
pub type TokenAddress = Address;

/// Number of basis points that make up 100%
pub const TOTAL_BASIS_POINTS: u16 = 10_000;

/// Token held by the custodial contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenInfo {
    /// Token contract address
    pub address: TokenAddress,
    /// Token symbol (e.g., "USDC")
    pub symbol: String,
    /// Token name, when the contract exposes one
    pub name: Option<String>,
    /// Number of decimal places
    pub decimals: u8,
    /// Balance held by the custodial contract, in raw units
    pub raw_balance: U256,
}

impl TokenInfo {
    /// Human-readable balance
    pub fn formatted_balance(&self) -> String {
        format_amount(self.raw_balance, self.decimals)
    }

    /// Copy of this token with a new balance
    pub fn with_balance(&self, raw_balance: U256) -> Self {
        Self {
            raw_balance,
            ..self.clone()
        }
    }
}

/// Tokens with a positive balance, in first-seen log order
///
/// Rebuilt wholesale on every discovery run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DiscoveredTokenSet {
    tokens: Vec<TokenInfo>,
}

impl DiscoveredTokenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a token, ignoring zero balances and addresses already present
    pub fn push(&mut self, token: TokenInfo) -> bool {
        if token.raw_balance.is_zero() || self.contains(&token.address) {
            return false;
        }
        self.tokens.push(token);
        true
    }

    pub fn get(&self, address: &TokenAddress) -> Option<&TokenInfo> {
        self.tokens.iter().find(|t| t.address == *address)
    }

    pub fn contains(&self, address: &TokenAddress) -> bool {
        self.get(address).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TokenInfo> {
        self.tokens.iter()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn addresses(&self) -> Vec<TokenAddress> {
        self.tokens.iter().map(|t| t.address).collect()
    }
}

impl FromIterator<TokenInfo> for DiscoveredTokenSet {
    fn from_iter<I: IntoIterator<Item = TokenInfo>>(iter: I) -> Self {
        let mut set = DiscoveredTokenSet::new();
        for token in iter {
            set.push(token);
        }
        set
    }
}

impl<'a> IntoIterator for &'a DiscoveredTokenSet {
    type Item = &'a TokenInfo;
    type IntoIter = std::slice::Iter<'a, TokenInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}

/// Candidate token addresses found in the transfer log scan
///
/// Deduplicated, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateTokens {
    addresses: Vec<TokenAddress>,
}

impl CandidateTokens {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an address; returns false if it was already present
    pub fn insert(&mut self, address: TokenAddress) -> bool {
        if self.addresses.contains(&address) {
            return false;
        }
        self.addresses.push(address);
        true
    }

    pub fn contains(&self, address: &TokenAddress) -> bool {
        self.addresses.contains(address)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TokenAddress> {
        self.addresses.iter()
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn into_vec(self) -> Vec<TokenAddress> {
        self.addresses
    }
}

impl FromIterator<TokenAddress> for CandidateTokens {
    fn from_iter<I: IntoIterator<Item = TokenAddress>>(iter: I) -> Self {
        let mut set = CandidateTokens::new();
        for address in iter {
            set.insert(address);
        }
        set
    }
}

/// One recipient of the split and its share
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientShare {
    /// Display label (e.g., "treasury")
    pub label: String,
    /// Recipient address
    pub address: Address,
    /// Share in basis points (10000 = 100%)
    pub basis_points: u16,
}

impl fmt::Display for RecipientShare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) {}.{:02}%",
            self.label,
            self.address,
            self.basis_points / 100,
            self.basis_points % 100
        )
    }
}

/// A recipient's computed amount
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareAmount {
    pub share: RecipientShare,
    pub amount: U256,
}

/// Expected split of one balance across the recipient table
///
/// `allocations` follow table order. `remainder` is whatever the floor
/// division left unallocated; the sum of both is always the input balance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SplitBreakdown {
    pub allocations: Vec<ShareAmount>,
    pub remainder: U256,
    pub decimals: u8,
}

impl SplitBreakdown {
    /// Sum of all allocated amounts
    pub fn allocated(&self) -> U256 {
        self.allocations
            .iter()
            .fold(U256::ZERO, |acc, a| acc + a.amount)
    }

    /// Allocated amounts plus the remainder
    pub fn total(&self) -> U256 {
        self.allocated() + self.remainder
    }

    /// Human-readable `(label, amount)` pairs followed by the remainder
    pub fn formatted(&self) -> Vec<(String, String)> {
        let mut rows: Vec<(String, String)> = self
            .allocations
            .iter()
            .map(|a| (a.share.label.clone(), format_amount(a.amount, self.decimals)))
            .collect();
        rows.push((
            "remainder".to_string(),
            format_amount(self.remainder, self.decimals),
        ));
        rows
    }
}

/// Terminal state of a distribution transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DistributionOutcome {
    /// Confirmed with a successful receipt
    Success,
    /// Reverted or never submitted
    Failed(TransactionError),
    /// Submitted but no receipt arrived within the confirmation timeout
    TimedOut,
}

impl DistributionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DistributionOutcome::Success)
    }

    /// Check whether the provider dropped while submitting
    pub fn is_connection_lost(&self) -> bool {
        matches!(
            self,
            DistributionOutcome::Failed(TransactionError::ConnectionLost(_))
        )
    }
}

impl fmt::Display for DistributionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistributionOutcome::Success => write!(f, "success"),
            DistributionOutcome::Failed(err) => write!(f, "failed: {}", err),
            DistributionOutcome::TimedOut => write!(f, "timed out waiting for confirmation"),
        }
    }
}

/// Record of one `distribute(token)` attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistributionResult {
    /// Token as snapshotted right before submission
    pub token: TokenInfo,
    /// Transaction hash, when the transaction reached the node
    pub tx_hash: Option<TxHash>,
    /// Terminal state
    pub outcome: DistributionOutcome,
    /// Expected split of the snapshot balance
    ///
    /// Empty unless the outcome is a success.
    pub expected_breakdown: SplitBreakdown,
}

impl DistributionResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    /// Block explorer link for the transaction
    pub fn explorer_url(&self, base: &str) -> Option<String> {
        self.tx_hash.map(|hash| format!("{}{}", base, hash))
    }
}

/// Record of one `distributeAll()` call on the custodial contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContractBatchResult {
    pub tx_hash: Option<TxHash>,
    pub outcome: DistributionOutcome,
    /// Per-token snapshot and expected split
    pub tokens: Vec<(TokenInfo, SplitBreakdown)>,
}

/// Receipt state observed while waiting for a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// Mined with status 1
    Success { block_number: Option<u64> },
    /// Mined with status 0
    Reverted { block_number: Option<u64> },
    /// No receipt within the timeout
    TimedOut,
}

/// Block window and topics for a transfer log query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogQuery {
    /// First block (inclusive)
    pub from_block: u64,
    /// Last block (inclusive)
    pub to_block: u64,
    /// Event signature topic
    pub event_topic: alloy::primitives::B256,
    /// Indexed recipient (topic2) filter
    pub recipient_topic: alloy::primitives::B256,
}
