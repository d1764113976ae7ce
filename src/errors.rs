//! Error types for token discovery and distribution
//!
//! This module defines the error hierarchy used across the crate:
//! - Session/provider initialization errors
//! - Chain access errors raised by a [`TokenChain`](crate::traits::TokenChain)
//! - Log scan errors
//! - Per-token query errors
//! - Per-distribution transaction errors
//! - Configuration errors
//!
//! Per-item failures (a single token query, a single distribution) are turned
//! into data by the component that sees them. Whole-operation failures
//! propagate as [`SplitterError`].

use alloy::primitives::{Address, Bytes};
use serde::Serialize;
use thiserror::Error;

use crate::types::DistributionResult;
use crate::utils::error_utils::decode_revert_reason;

/// Top-level error type for the splitter
///
/// Encompasses all failures that end an operation, as opposed to
/// per-item failures that are recorded and skipped.
#[derive(Debug, Error)]
pub enum SplitterError {
    /// Errors occurring while establishing the wallet session
    #[error("Failed to initialize session: {0}")]
    Init(#[from] InitError),

    /// The transfer log scan did not complete
    #[error("Log scan failed: {0}")]
    Scan(#[from] ScanError),

    /// Invalid configuration or share table
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The provider became unusable in the middle of an operation
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// An operation needing a wallet ran before `connect`
    #[error("Session is not connected")]
    NotConnected,

    /// The requested token is not part of the discovered set
    #[error("Token {0} is not in the discovered set")]
    UnknownToken(Address),

    /// A sequential distribution batch stopped before reaching its end
    ///
    /// `completed` holds every result produced before the failure, in
    /// submission order.
    #[error("Distribution batch halted after {} result(s): {source}", .completed.len())]
    BatchHalted {
        completed: Vec<DistributionResult>,
        #[source]
        source: Box<SplitterError>,
    },
}

impl SplitterError {
    /// Check whether this error means the provider itself is gone
    pub fn is_connection_lost(&self) -> bool {
        match self {
            SplitterError::ConnectionLost(_) => true,
            SplitterError::BatchHalted { source, .. } => source.is_connection_lost(),
            _ => false,
        }
    }
}

/// Session initialization errors
///
/// These occur before any discovery or distribution can run, typically
/// because no usable provider or signer is available.
#[derive(Debug, Error)]
pub enum InitError {
    /// No wallet/session provider could be obtained
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Invalid or malformed RPC URL
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    /// The signing key could not be loaded
    #[error("Invalid signer: {0}")]
    InvalidSigner(String),

    /// Chain ID retrieval errors
    #[error("Failed to get chain ID: {0}")]
    ChainId(String),
}

/// Errors returned by a chain backend
///
/// Components classify these: `Transport` is always fatal to the running
/// operation, everything else is interpreted per call site.
#[derive(Debug, Clone, Error)]
pub enum ChainError {
    /// The transport failed (connection refused, socket closed, timeout)
    #[error("transport error: {0}")]
    Transport(String),

    /// The node answered with a JSON-RPC error
    #[error("request rejected ({code}): {message}")]
    Rejected { code: i64, message: String },

    /// The call or transaction reverted
    #[error("execution reverted: {message}")]
    Reverted { data: Option<Bytes>, message: String },

    /// The response could not be decoded
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ChainError {
    /// Check whether this is a transport-level failure
    pub fn is_transport(&self) -> bool {
        matches!(self, ChainError::Transport(_))
    }
}

/// Transfer log scan errors
#[derive(Debug, Error)]
pub enum ScanError {
    /// A log query was rejected or truncated by the provider
    ///
    /// # Fields
    /// * `from_block` - First block of the failed window
    /// * `to_block` - Last block of the failed window
    /// * `reason` - Provider message or truncation description
    #[error("scan incomplete for blocks {from_block}..={to_block}: {reason}")]
    Incomplete {
        from_block: u64,
        to_block: u64,
        reason: String,
    },

    /// The caller cancelled the scan
    #[error("scan cancelled")]
    Cancelled,
}

/// Token-specific errors
///
/// These occur while querying an ERC20 candidate. Apart from `Unreachable`,
/// they exclude the candidate without failing discovery.
#[derive(Debug, Clone, Error)]
pub enum TokenError {
    /// Failed to decode token symbol
    #[error("Failed to decode token symbol for {address}: {reason}")]
    SymbolDecode { address: String, reason: String },

    /// Failed to decode token decimals
    #[error("Failed to decode token decimals for {address}: {reason}")]
    DecimalsDecode { address: String, reason: String },

    /// Decimals did not fit in a `uint8`
    #[error("Token {address} reports out-of-range decimals {value}")]
    DecimalsOutOfRange { address: String, value: String },

    /// Failed to decode a `balanceOf` response
    #[error("Failed to decode balance for {address}: {reason}")]
    BalanceDecode { address: String, reason: String },

    /// Token call reverted
    #[error("Token call reverted for {address}: {reason}")]
    CallReverted { address: String, reason: String },

    /// General token query failures
    #[error("Failed to query token {address}: {reason}")]
    QueryFailed { address: String, reason: String },

    /// The provider could not be reached while querying the token
    #[error("Provider unreachable while querying {address}: {reason}")]
    Unreachable { address: String, reason: String },
}

impl TokenError {
    /// Classify a chain error raised by a call to `address`
    pub fn from_chain(address: String, err: ChainError) -> Self {
        match err {
            ChainError::Transport(reason) => TokenError::Unreachable { address, reason },
            ChainError::Reverted { data, message } => {
                let reason = data
                    .as_deref()
                    .and_then(|d| decode_revert_reason(d))
                    .unwrap_or(message);
                TokenError::CallReverted { address, reason }
            }
            other => TokenError::QueryFailed {
                address,
                reason: other.to_string(),
            },
        }
    }

    /// Check whether this failure is fatal to the whole discovery run
    pub fn is_fatal(&self) -> bool {
        matches!(self, TokenError::Unreachable { .. })
    }
}

/// Failure of a single distribution transaction
///
/// Recorded inside a [`DistributionResult`]; never propagated on its own.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum TransactionError {
    /// The transaction (or its gas estimation) reverted
    #[error("transaction reverted: {reason}")]
    Reverted { reason: String },

    /// The transaction could not be signed or submitted
    #[error("transaction submission failed: {0}")]
    SubmissionFailed(String),

    /// The provider dropped while submitting
    #[error("connection lost during submission: {0}")]
    ConnectionLost(String),
}

impl TransactionError {
    /// Classify a chain error raised while submitting a transaction
    pub fn from_submission(err: ChainError) -> Self {
        match err {
            ChainError::Transport(reason) => TransactionError::ConnectionLost(reason),
            ChainError::Reverted { data, message } => TransactionError::Reverted {
                reason: data
                    .as_deref()
                    .and_then(|d| decode_revert_reason(d))
                    .unwrap_or(message),
            },
            other => TransactionError::SubmissionFailed(other.to_string()),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A single share exceeds 100%
    #[error("share '{label}' has {basis_points} basis points, above 10000")]
    ShareOutOfRange { label: String, basis_points: u16 },

    /// The table allocates more than 100%
    #[error("recipient shares sum to {total} basis points, above 10000")]
    SharesExceedTotal { total: u32 },

    /// The same recipient address appears twice
    #[error("recipient {address} appears more than once")]
    DuplicateRecipient { address: String },

    /// A recipient entry could not be parsed
    #[error("invalid recipient entry '{entry}': {reason}")]
    InvalidRecipient { entry: String, reason: String },

    /// The configuration file could not be read or parsed
    #[error("failed to load config {path}: {reason}")]
    Load { path: String, reason: String },

    /// A required setting is missing
    #[error("missing setting: {0}")]
    Missing(&'static str),
}
