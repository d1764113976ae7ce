//! Split calculator
//!
//! Computes each recipient's share of a raw balance with exact integer
//! arithmetic: `amount = floor(balance * basis_points / 10000)`. The
//! unallocated rest is reported as `remainder`, never silently dropped.

use alloy::primitives::U256;
use serde::Serialize;

use crate::{
    errors::ConfigError,
    types::{RecipientShare, ShareAmount, SplitBreakdown, TOTAL_BASIS_POINTS},
};

/// Validated recipient table
///
/// Every share is at most 10000 basis points, the total is at most 10000,
/// and no recipient address appears twice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ShareTable {
    shares: Vec<RecipientShare>,
}

impl ShareTable {
    pub fn new(shares: Vec<RecipientShare>) -> Result<Self, ConfigError> {
        let mut total: u32 = 0;
        for (index, share) in shares.iter().enumerate() {
            if share.basis_points > TOTAL_BASIS_POINTS {
                return Err(ConfigError::ShareOutOfRange {
                    label: share.label.clone(),
                    basis_points: share.basis_points,
                });
            }
            if shares[..index].iter().any(|s| s.address == share.address) {
                return Err(ConfigError::DuplicateRecipient {
                    address: share.address.to_string(),
                });
            }
            total += u32::from(share.basis_points);
        }
        if total > u32::from(TOTAL_BASIS_POINTS) {
            return Err(ConfigError::SharesExceedTotal { total });
        }
        Ok(Self { shares })
    }

    pub fn shares(&self) -> &[RecipientShare] {
        &self.shares
    }

    /// Sum of all basis points
    pub fn total_basis_points(&self) -> u32 {
        self.shares.iter().map(|s| u32::from(s.basis_points)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }
}

/// What to do with the rounding remainder of a breakdown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum RemainderPolicy {
    /// Keep the remainder as its own line
    #[default]
    Report,
    /// Fold the remainder into the recipient with the most basis points
    LargestShare,
}

/// Split `raw_balance` across the table
///
/// Allocations follow table order. The result always satisfies
/// `allocated() + remainder == raw_balance`.
///
/// # Example
/// ```
/// use alloy::primitives::{Address, U256};
/// use token_splitter::{distribution::split::{compute_split, ShareTable}, types::RecipientShare};
///
/// let table = ShareTable::new(vec![
///     RecipientShare { label: "A".into(), address: Address::with_last_byte(1), basis_points: 5000 },
///     RecipientShare { label: "B".into(), address: Address::with_last_byte(2), basis_points: 3000 },
///     RecipientShare { label: "C".into(), address: Address::with_last_byte(3), basis_points: 2000 },
/// ]).unwrap();
///
/// let split = compute_split(U256::from(7u64), 6, &table);
/// let amounts: Vec<U256> = split.allocations.iter().map(|a| a.amount).collect();
/// assert_eq!(amounts, vec![U256::from(3u64), U256::from(2u64), U256::from(1u64)]);
/// assert_eq!(split.remainder, U256::from(1u64));
/// ```
pub fn compute_split(raw_balance: U256, decimals: u8, table: &ShareTable) -> SplitBreakdown {
    let allocations: Vec<ShareAmount> = table
        .shares()
        .iter()
        .map(|share| ShareAmount {
            share: share.clone(),
            amount: share_of(raw_balance, share.basis_points),
        })
        .collect();

    let allocated = allocations
        .iter()
        .fold(U256::ZERO, |acc, a| acc + a.amount);

    SplitBreakdown {
        allocations,
        remainder: raw_balance - allocated,
        decimals,
    }
}

/// Apply a remainder policy to a computed breakdown
///
/// `LargestShare` picks the first recipient with the highest basis points.
/// An empty table keeps the remainder as is.
pub fn apply_remainder_policy(breakdown: SplitBreakdown, policy: RemainderPolicy) -> SplitBreakdown {
    match policy {
        RemainderPolicy::Report => breakdown,
        RemainderPolicy::LargestShare => {
            let mut breakdown = breakdown;
            let largest = breakdown
                .allocations
                .iter()
                .enumerate()
                .rev()
                .max_by_key(|(_, a)| a.share.basis_points)
                .map(|(index, _)| index);
            if let Some(index) = largest {
                breakdown.allocations[index].amount += breakdown.remainder;
                breakdown.remainder = U256::ZERO;
            }
            breakdown
        }
    }
}

/// `floor(balance * bps / 10000)` without a wide intermediate
///
/// Splitting the balance into quotient and remainder by 10000 keeps every
/// intermediate at most `balance`.
fn share_of(balance: U256, basis_points: u16) -> U256 {
    let total = U256::from(TOTAL_BASIS_POINTS);
    let bps = U256::from(basis_points);
    let whole = balance / total;
    let rest = balance % total;
    whole * bps + rest * bps / total
}
