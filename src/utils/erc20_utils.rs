//! ERC20 token utilities for querying token information and balances
//!
//! Provides functions to query token metadata and balances through a
//! [`TokenChain`], and to parse `Transfer` event logs.

use alloy::{
    primitives::{keccak256, Address, Bytes, FixedBytes, U256},
    sol,
    sol_types::SolCall,
};
use once_cell::sync::Lazy;
use tracing::debug;

use crate::{errors::TokenError, traits::TokenChain, types::TokenInfo};

// ERC20 interface for common token functions
//
// Generates Rust bindings for:
// - name(): Returns token name
// - symbol(): Returns token symbol
// - decimals(): Returns token decimal places
// - balanceOf(address): Returns token balance for an address
sol! {
    function name() public returns (string);
    function symbol() public returns (string);
    function decimals() public returns (uint8);
    function balanceOf(address owner) public returns (uint256);
}

/// ERC20 Transfer event signature
/// keccak256("Transfer(address,address,uint256)")
pub static TRANSFER_EVENT_SIGNATURE: Lazy<FixedBytes<32>> =
    Lazy::new(|| keccak256(b"Transfer(address,address,uint256)"));

/// Query ERC20 token balance for a specific address
///
/// Executes `balanceOf(address)` on the token contract.
///
/// # Returns
/// - `Ok(U256)`: Token balance in the token's smallest unit
/// - `Err(TokenError)`: If the call fails or returns invalid data
pub async fn query_erc20_balance<C>(
    chain: &C,
    token_address: Address,
    owner: Address,
) -> Result<U256, TokenError>
where
    C: TokenChain,
{
    let data: Bytes = balanceOfCall { owner }.abi_encode().into();
    let output = chain
        .call(token_address, data)
        .await
        .map_err(|e| TokenError::from_chain(token_address.to_string(), e))?;

    balanceOfCall::abi_decode_returns(&output).map_err(|e| TokenError::BalanceDecode {
        address: token_address.to_string(),
        reason: e.to_string(),
    })
}

/// Query the token's symbol
///
/// Accepts both the standard `string` return and the legacy `bytes32`
/// encoding used by some early tokens.
pub async fn query_symbol<C>(chain: &C, token_address: Address) -> Result<String, TokenError>
where
    C: TokenChain,
{
    let data: Bytes = symbolCall {}.abi_encode().into();
    let output = chain
        .call(token_address, data)
        .await
        .map_err(|e| TokenError::from_chain(token_address.to_string(), e))?;

    if let Ok(symbol) = symbolCall::abi_decode_returns(&output) {
        return Ok(symbol);
    }
    decode_bytes32_string(&output).ok_or_else(|| TokenError::SymbolDecode {
        address: token_address.to_string(),
        reason: format!("unrecognized symbol encoding ({} bytes)", output.len()),
    })
}

/// Query the token's decimals
///
/// The full return word is checked, so a value above 255 is reported as
/// out of range instead of being truncated.
pub async fn query_decimals<C>(chain: &C, token_address: Address) -> Result<u8, TokenError>
where
    C: TokenChain,
{
    let data: Bytes = decimalsCall {}.abi_encode().into();
    let output = chain
        .call(token_address, data)
        .await
        .map_err(|e| TokenError::from_chain(token_address.to_string(), e))?;

    if output.len() < 32 {
        return Err(TokenError::DecimalsDecode {
            address: token_address.to_string(),
            reason: format!("expected 32 bytes, got {}", output.len()),
        });
    }
    let value = U256::from_be_slice(&output[..32]);
    u8::try_from(value).map_err(|_| TokenError::DecimalsOutOfRange {
        address: token_address.to_string(),
        value: value.to_string(),
    })
}

/// Query the token's name, if it has one
///
/// `name()` is optional in practice; any failure yields `None`.
pub async fn query_name<C>(chain: &C, token_address: Address) -> Option<String>
where
    C: TokenChain,
{
    let data: Bytes = nameCall {}.abi_encode().into();
    let output = chain.call(token_address, data).await.ok()?;
    nameCall::abi_decode_returns(&output)
        .ok()
        .or_else(|| decode_bytes32_string(&output))
}

/// Query symbol, decimals and the holder's balance for one token
///
/// # Arguments
/// - `chain`: Connected chain
/// - `token_address`: Token contract address
/// - `holder`: Address whose balance is recorded in the result
///
/// # Returns
/// - `Ok(TokenInfo)`: Complete token information (the balance may be zero)
/// - `Err(TokenError)`: If any required call fails or returns invalid data
pub async fn query_token_info<C>(
    chain: &C,
    token_address: Address,
    holder: Address,
) -> Result<TokenInfo, TokenError>
where
    C: TokenChain,
{
    let symbol = query_symbol(chain, token_address).await?;
    let decimals = query_decimals(chain, token_address).await?;
    let raw_balance = query_erc20_balance(chain, token_address, holder).await?;
    let name = query_name(chain, token_address).await;

    debug!(
        token = %token_address,
        %symbol,
        decimals,
        balance = %raw_balance,
        "Resolved token"
    );

    Ok(TokenInfo {
        address: token_address,
        symbol,
        name,
        decimals,
        raw_balance,
    })
}

/// Parses ERC20 Transfer event data
///
/// # Arguments
/// * `topics` - Event topics containing:
///   - [0]: Transfer event signature
///   - [1]: From address (indexed)
///   - [2]: To address (indexed)
/// * `data` - ABI-encoded transfer amount
///
/// # Returns
/// * `Some((from, to, amount))` if valid Transfer event
/// * `None` if invalid format or zero amount
pub fn parse_transfer_log(
    topics: &[FixedBytes<32>],
    data: &[u8],
) -> Option<(Address, Address, U256)> {
    if topics.len() != 3 || topics[0] != *TRANSFER_EVENT_SIGNATURE || data.len() != 32 {
        return None;
    }
    let amount = U256::from_be_slice(data);
    if amount.is_zero() {
        return None;
    }
    Some((
        Address::from_word(topics[1]),
        Address::from_word(topics[2]),
        amount,
    ))
}

fn decode_bytes32_string(output: &[u8]) -> Option<String> {
    if output.len() != 32 {
        return None;
    }
    let end = output.iter().position(|b| *b == 0).unwrap_or(32);
    if end == 0 {
        return None;
    }
    std::str::from_utf8(&output[..end]).ok().map(str::to_string)
}
