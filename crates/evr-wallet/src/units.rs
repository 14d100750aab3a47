//! Amount conversions, divisibility rules, and address heuristics.
//!
//! Asset amounts in minimal units must stay representable at the asset's
//! divisibility (decimal places): an amount is valid when
//! `sats % 10^(8 - divisibility) == 0`.

use evr_primitives::hash::sha256d;

use crate::WalletError;

/// Minimal units per whole coin.
pub const COIN: u64 = 100_000_000;

/// Convert a whole-coin amount to minimal units.
///
/// # Arguments
/// * `amount` - The amount in whole coins.
///
/// # Returns
/// The amount in sats, truncated toward zero.
pub fn as_sats(amount: f64) -> u64 {
    (amount * COIN as f64) as u64
}

/// Convert minimal units to a whole-coin amount at a divisibility.
///
/// The result is floored to the divisibility's decimal places.
///
/// # Arguments
/// * `sats` - The amount in minimal units.
/// * `divisibility` - Decimal places the asset supports (0..=8).
///
/// # Returns
/// The floored whole-coin amount.
pub fn as_amount(sats: u64, divisibility: u8) -> f64 {
    let result = sats as f64 / COIN as f64;
    if divisibility == 0 {
        return result.floor();
    }
    let multiplier = 10f64.powi(divisibility as i32);
    (result * multiplier).floor() / multiplier
}

/// Whether a minimal-unit amount is representable at the divisibility.
///
/// # Arguments
/// * `sats` - The amount in minimal units.
/// * `divisibility` - Decimal places the asset supports (0..=8).
///
/// # Returns
/// `true` when `sats` is a multiple of `10^(8 - divisibility)`.
pub fn is_sats_divisibility_valid(sats: u64, divisibility: u8) -> bool {
    sats % divisibility_step(divisibility) == 0
}

/// Round a minimal-unit amount down to the divisibility's step.
///
/// # Arguments
/// * `sats` - The amount in minimal units.
/// * `divisibility` - Decimal places the asset supports (0..=8).
///
/// # Returns
/// The largest valid amount not exceeding `sats`.
pub fn round_sats_down_to_divisibility(sats: u64, divisibility: u8) -> u64 {
    sats - (sats % divisibility_step(divisibility))
}

/// The minimal-unit step size for a divisibility.
fn divisibility_step(divisibility: u8) -> u64 {
    10u64.pow(8u32.saturating_sub(divisibility as u32))
}

/// Derive the display transaction ID from raw transaction hex.
///
/// # Arguments
/// * `tx_hex` - The serialized transaction in hex.
///
/// # Returns
/// The 64-character display txid (byte-reversed sha256d).
pub fn txhex_to_txid(tx_hex: &str) -> Result<String, WalletError> {
    let raw = hex::decode(tx_hex)
        .map_err(|e| WalletError::InvalidParams(format!("invalid tx hex: {}", e)))?;
    let mut hash = sha256d(&raw);
    hash.reverse();
    Ok(hex::encode(hash))
}

/// Heuristic check for a mainnet chain address.
///
/// P2PKH addresses start with 'E', P2SH with 'e'; both are 34 characters.
/// Full Base58Check validation happens when the address is actually used.
///
/// # Arguments
/// * `address` - The candidate address string.
///
/// # Returns
/// `true` if the shape matches.
pub fn is_valid_chain_address(address: &str) -> bool {
    (address.starts_with('E') || address.starts_with('e')) && address.len() == 34
}

/// Heuristic check for an Ethereum address (bridge destination).
///
/// # Arguments
/// * `address` - The candidate address string.
///
/// # Returns
/// `true` for "0x" plus 40 hex characters.
pub fn is_valid_eth_address(address: &str) -> bool {
    address.len() == 42
        && address.starts_with("0x")
        && address[2..].chars().all(|c| c.is_ascii_hexdigit())
}
