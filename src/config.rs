//! Splitter configuration
//!
//! Settings come from three layers, later ones overriding earlier ones:
//! 1. Built-in defaults
//! 2. An optional JSON file ([`SplitterConfig::from_json_file`])
//! 3. Command-line flags and environment variables (see the binary)
//!
//! # Example
//! ```
//! use token_splitter::config::SplitterConfig;
//!
//! let config: SplitterConfig = serde_json::from_str(r#"{
//!     "recipients": [
//!         { "label": "A", "address": "0x1111111111111111111111111111111111111111", "basis_points": 5000 },
//!         { "label": "B", "address": "0x2222222222222222222222222222222222222222", "basis_points": 5000 }
//!     ],
//!     "scan": { "max_block_range": 50000 }
//! }"#).unwrap();
//! assert_eq!(config.scan.max_block_range, Some(50_000));
//! assert_eq!(config.resolver.max_concurrency, 8);
//! ```

use std::{path::Path, str::FromStr, time::Duration};

use alloy::primitives::{address, Address};
use serde::{Deserialize, Serialize};

use crate::{
    distribution::split::ShareTable,
    errors::ConfigError,
    types::RecipientShare,
};

/// Default custodial splitter contract (Base mainnet)
pub const DEFAULT_CUSTODIAL_CONTRACT: Address = address!("798763FF2cb11523344Fca274A19C393B3D921eF");

/// Default transaction link prefix
pub const DEFAULT_EXPLORER_TX_URL: &str = "https://basescan.org/tx/";

/// Log scan settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// First block to scan (inclusive)
    pub from_block: u64,
    /// Block window per `eth_getLogs` request; `None` scans in one request
    pub max_block_range: Option<u64>,
    /// Result count at which a response is treated as truncated
    pub max_logs_per_query: Option<usize>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            from_block: 0,
            max_block_range: None,
            max_logs_per_query: Some(10_000),
        }
    }
}

/// Token resolver settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Maximum number of candidates queried at once
    pub max_concurrency: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self { max_concurrency: 8 }
    }
}

/// Distribution settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributionConfig {
    /// Seconds to wait for a receipt before reporting a timeout
    pub confirmation_timeout_secs: u64,
    /// Re-run discovery after each successful distribution
    pub refresh_after_success: bool,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            confirmation_timeout_secs: 120,
            refresh_after_success: true,
        }
    }
}

impl DistributionConfig {
    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }
}

/// Complete splitter configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitterConfig {
    /// RPC endpoint (http(s) or ws(s))
    pub rpc_url: Option<String>,
    /// Contract holding the balances to distribute
    pub custodial_contract: Address,
    /// Recipient table used for expected breakdowns
    pub recipients: Vec<RecipientShare>,
    /// Transaction link prefix for results
    pub explorer_tx_url: String,
    pub scan: ScanConfig,
    pub resolver: ResolverConfig,
    pub distribution: DistributionConfig,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            rpc_url: None,
            custodial_contract: DEFAULT_CUSTODIAL_CONTRACT,
            recipients: Vec::new(),
            explorer_tx_url: DEFAULT_EXPLORER_TX_URL.to_string(),
            scan: ScanConfig::default(),
            resolver: ResolverConfig::default(),
            distribution: DistributionConfig::default(),
        }
    }
}

impl SplitterConfig {
    /// Load a configuration file, filling unspecified fields with defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Load {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&raw).map_err(|e| ConfigError::Load {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Validated recipient table
    pub fn share_table(&self) -> Result<ShareTable, ConfigError> {
        ShareTable::new(self.recipients.clone())
    }
}

impl FromStr for RecipientShare {
    type Err = ConfigError;

    /// Parse `label:address:basis_points`
    fn from_str(entry: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ConfigError::InvalidRecipient {
            entry: entry.to_string(),
            reason: reason.to_string(),
        };

        let mut parts = entry.trim().splitn(3, ':');
        let (Some(label), Some(address), Some(bps)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid("expected label:address:basis_points"));
        };
        if label.is_empty() {
            return Err(invalid("empty label"));
        }
        let address = Address::from_str(address.trim()).map_err(|e| invalid(&e.to_string()))?;
        let basis_points = bps.trim().parse::<u16>().map_err(|e| invalid(&e.to_string()))?;

        Ok(RecipientShare {
            label: label.to_string(),
            address,
            basis_points,
        })
    }
}

/// Parse a comma-separated list of `label:address:basis_points` entries
pub fn parse_recipients(list: &str) -> Result<Vec<RecipientShare>, ConfigError> {
    list.split(',')
        .filter(|entry| !entry.trim().is_empty())
        .map(RecipientShare::from_str)
        .collect()
}
