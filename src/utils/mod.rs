//! Helper utilities shared by the discovery and distribution components
//!
//! # Modules
//!
//! - [`erc20_utils`]: ERC20 token interaction utilities
//!   - Metadata retrieval (symbol, decimals, name)
//!   - Balance queries
//!   - Parsing ERC20 Transfer events
//!
//! - [`error_utils`]: Revert payload decoding
//!   - `Error(string)` reasons
//!   - Solidity panic codes
//!
//! - [`format_utils`]: Display formatting of raw token amounts

pub mod erc20_utils;
pub mod error_utils;
pub mod format_utils;
