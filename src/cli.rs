//! Token splitter CLI
//!
//! Command-line arguments, configuration layering and output rendering for
//! the `token-splitter` binary.

use std::path::PathBuf;

use alloy::primitives::Address;
use clap::{Parser, Subcommand, ValueEnum};
use token_splitter::{
    config::parse_recipients,
    distribution::RemainderPolicy,
    errors::ConfigError,
    session::{HistoryView, SessionView},
    types::SplitBreakdown,
    SplitterConfig,
};

/// Discover and distribute the tokens held by a custodial splitter contract
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(name = "token-splitter")]
pub struct SplitterCli {
    /// RPC endpoint (http(s) or ws(s))
    #[arg(long, env = "SPLITTER_RPC_URL")]
    pub rpc_url: Option<String>,

    /// Hex private key of the signing account
    #[arg(long, env = "SPLITTER_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: Option<String>,

    /// Custodial splitter contract address
    #[arg(long, env = "SPLITTER_CONTRACT")]
    pub contract: Option<Address>,

    /// Configuration file path (JSON)
    #[arg(short, long, env = "SPLITTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Recipient table as `label:address:basis_points,...`
    #[arg(long, env = "SPLITTER_RECIPIENTS")]
    pub recipients: Option<String>,

    /// First block of the transfer log scan
    #[arg(long)]
    pub from_block: Option<u64>,

    /// Block window per log query
    #[arg(long)]
    pub max_block_range: Option<u64>,

    /// Seconds to wait for each receipt
    #[arg(long)]
    pub confirmation_timeout: Option<u64>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text, env = "SPLITTER_FORMAT")]
    pub format: OutputFormat,

    /// Enable debug logging when RUST_LOG is unset
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: SplitterCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SplitterCommand {
    /// Connect the wallet and show the account
    Connect,

    /// List tokens held by the custodial contract
    Discover,

    /// Distribute a single token
    Distribute {
        /// Token contract address
        token: Address,
    },

    /// Distribute every discovered token, one transaction at a time
    DistributeAll,

    /// Call the contract's own distributeAll()
    DistributeContract,

    /// Compute the expected split of a balance without touching the chain
    Split {
        /// Raw balance (decimal or 0x-prefixed hex)
        balance: String,
        /// Token decimals used for display
        decimals: u8,
        /// Where the rounding remainder goes
        #[arg(long, value_enum, default_value_t = RemainderArg::Report)]
        remainder: RemainderArg,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemainderArg {
    Report,
    LargestShare,
}

impl From<RemainderArg> for RemainderPolicy {
    fn from(arg: RemainderArg) -> Self {
        match arg {
            RemainderArg::Report => RemainderPolicy::Report,
            RemainderArg::LargestShare => RemainderPolicy::LargestShare,
        }
    }
}

impl SplitterCli {
    /// Defaults, then the config file, then flags and environment
    pub fn resolve_config(&self) -> Result<SplitterConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => SplitterConfig::from_json_file(path)?,
            None => SplitterConfig::default(),
        };

        if let Some(rpc_url) = &self.rpc_url {
            config.rpc_url = Some(rpc_url.clone());
        }
        if let Some(contract) = self.contract {
            config.custodial_contract = contract;
        }
        if let Some(recipients) = &self.recipients {
            config.recipients = parse_recipients(recipients)?;
        }
        if let Some(from_block) = self.from_block {
            config.scan.from_block = from_block;
        }
        if let Some(range) = self.max_block_range {
            config.scan.max_block_range = Some(range);
        }
        if let Some(secs) = self.confirmation_timeout {
            config.distribution.confirmation_timeout_secs = secs;
        }
        Ok(config)
    }
}

/// Plain text rendering of a session view
pub fn render_text(view: &SessionView) -> String {
    let mut out = String::new();
    out.push_str(&format!("Custodial contract: {}\n", view.custodial_contract));

    if view.tokens.is_empty() {
        out.push_str("Tokens: none\n");
    } else {
        out.push_str("Tokens:\n");
        for token in &view.tokens {
            out.push_str(&format!(
                "  {:<10} {:>28}  {}\n",
                token.symbol, token.balance, token.address
            ));
        }
    }

    if !view.history.is_empty() {
        out.push_str("History:\n");
        for entry in &view.history {
            render_history_entry(&mut out, entry);
        }
    }

    out.push_str(&view.status_message);
    out.push('\n');
    out
}

fn render_history_entry(out: &mut String, entry: &HistoryView) {
    let symbols: Vec<&str> = entry.tokens.iter().map(|t| t.token.symbol.as_str()).collect();
    out.push_str(&format!(
        "  {} [{}]: {}\n",
        entry.kind,
        symbols.join(", "),
        entry.outcome
    ));
    if let Some(url) = &entry.explorer_url {
        out.push_str(&format!("    {}\n", url));
    }
    for token in &entry.tokens {
        for row in &token.expected {
            out.push_str(&format!(
                "    {} {:<12} {:>28}\n",
                token.token.symbol, row.label, row.amount
            ));
        }
    }
}

/// Plain text rendering of a split breakdown
pub fn render_split(breakdown: &SplitBreakdown) -> String {
    breakdown
        .formatted()
        .into_iter()
        .map(|(label, amount)| format!("{:<12} {:>28}\n", label, amount))
        .collect()
}
