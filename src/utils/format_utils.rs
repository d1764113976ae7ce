//! Display formatting for raw token amounts
//!
//! Formatting is presentation only; every computation in the crate runs on the
//! raw integer amounts.

use alloy::primitives::{utils::format_units, U256};

/// Render a raw amount as a decimal string using the token's decimals
///
/// Falls back to the raw integer when the decimals are beyond what the
/// unit formatter supports.
///
/// # Example
/// ```
/// use alloy::primitives::U256;
/// use token_splitter::utils::format_utils::format_amount;
///
/// assert_eq!(format_amount(U256::from(1_000_000u64), 6), "1.000000");
/// ```
pub fn format_amount(raw: U256, decimals: u8) -> String {
    format_units(raw, decimals).unwrap_or_else(|_| raw.to_string())
}
