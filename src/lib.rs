//! # Token Splitter
//!
//! Discovers the ERC20 tokens held by a custodial splitter contract and
//! drives its proportional on-chain distributions.
//!
//! ## Core Features
//!
//! - **Token Discovery**
//!   - Historical `Transfer` log scan, paged by block window
//!   - Concurrent metadata and balance resolution
//!   - Zero balances and non-ERC20 contracts filtered out
//!
//! - **Distribution**
//!   - `distribute(token)` per token, strictly one transaction at a time
//!   - Contract-level `distributeAll()`
//!   - Receipt tracking with an explicit timeout outcome
//!   - Token set refreshed after every success
//!
//! - **Split Calculation**
//!   - Exact integer basis-point arithmetic on `U256`
//!   - Rounding remainder reported, never dropped
//!
//! ## Features
//!
//! - `rustls-tls`: Uses rustls as the TLS implementation instead of native-tls (OpenSSL).
//!
//!   Usage example:
//!   ```toml
//!   [dependencies]
//!   token-splitter = { version = "0.3", default-features = false, features = ["rustls-tls"] }
//!   ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use token_splitter::{chain::connect, config::SplitterConfig, Session};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = SplitterConfig::from_json_file("splitter.json")?;
//! let chain = connect("https://mainnet.base.org", "0x<private key>").await?;
//!
//! let mut session = Session::from_config(chain, &config)?;
//! session.connect().await?;
//!
//! let cancel = CancellationToken::new();
//! for token in session.discover(&cancel).await? {
//!     println!("{} {}", token.symbol, token.formatted_balance());
//! }
//!
//! let report = session.distribute_all(&cancel).await?;
//! println!("{} succeeded, {} failed", report.succeeded(), report.failed());
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Structure
//!
//! - `chain`: Alloy provider adapter implementing [`TokenChain`]
//! - `config`: Layered configuration
//! - `discovery`: Transfer log scanner and token resolver
//! - `distribution`: Split calculator and distribution orchestrator
//! - `session`: Session state and its serializable view
//! - `types`: Core data structures and type definitions
//! - `traits`: Chain access trait
//! - `errors`: Error types and handling
//! - `utils`: ERC20 queries, revert decoding and amount formatting

pub mod chain;
pub mod config;
pub mod discovery;
pub mod distribution;
pub mod errors;
pub mod session;
pub mod traits;
pub mod types;
pub mod utils;

pub use config::SplitterConfig;
pub use discovery::TokenDiscovery;
pub use distribution::{compute_split, Distributor, ShareTable};
pub use errors::SplitterError;
pub use session::{Session, SessionView};
pub use traits::TokenChain;
pub use types::{DiscoveredTokenSet, DistributionOutcome, DistributionResult, TokenInfo};
