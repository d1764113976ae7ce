//! Revert payload decoding
//!
//! Turns the raw revert data returned by a failed call or gas estimation into
//! a readable reason. Handles:
//! - `Error(string)` reverts (selector `0x08c379a0`)
//! - `Panic(uint256)` assertions (selector `0x4e487b71`)
//!
//! Custom errors are reported by selector only.

use alloy::sol_types::{Panic, Revert, SolError};

/// Decode a revert payload into a readable reason
///
/// # Returns
/// * `Some(String)` - Decoded message, panic description, or custom error selector
/// * `None` - If the payload is empty or shorter than a selector
pub fn decode_revert_reason(output: &[u8]) -> Option<String> {
    if output.len() < 4 {
        return None;
    }

    if let Ok(revert) = Revert::abi_decode(output) {
        return Some(revert.reason().to_string());
    }

    if let Ok(panic) = Panic::abi_decode(output) {
        return Some(match panic.kind() {
            Some(kind) => format!("Panic: {}", kind),
            None => format!("Panic: Unknown error code (0x{:x})", panic.code),
        });
    }

    Some(format!("Custom error 0x{}", alloy::hex::encode(&output[..4])))
}
