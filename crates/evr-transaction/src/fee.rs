//! Fee estimation.
//!
//! Two models feed the wallet's coin selection:
//!
//! * A flat per-item model that deliberately over-estimates so the larger
//!   asset-tagged outputs are always covered. Used everywhere a fee must
//!   be known before the transaction exists.
//! * A serialized-byte-size model with fixed per-element constants, used
//!   for sats-per-byte scenarios such as channel commitments.
//!
//! Both are pure and deterministic; coin selection's reproducibility
//! depends on that.

/// Default flat fee per input or output, in sats.
///
/// 0.00150000 coin per item; roughly one asset vin + vout and one currency
/// vin + vout per typical send.
pub const DEFAULT_FEE_RATE_PER_ITEM: u64 = 150_000;

/// Default sats-per-byte rate for multisig fee estimation.
pub const DEFAULT_MULTISIG_FEE_RATE: u64 = 1_900;

/// Fixed transaction overhead in bytes: version, locktime, and the two
/// count prefixes.
const BASE_SIZE: u64 = 10;

/// Serialized output size: value (8) + script length (1) + P2PKH script (25).
const OUTPUT_SIZE: u64 = 8 + 1 + 25;

/// Estimate a transaction fee with the flat per-item model.
///
/// `fee = (input_count + output_count) * fee_rate_per_item`
///
/// # Arguments
/// * `input_count` - Number of inputs the transaction will have.
/// * `output_count` - Number of outputs the transaction will have.
/// * `fee_rate_per_item` - Sats charged per input or output.
///
/// # Returns
/// The estimated fee in sats.
pub fn estimated_fee(input_count: usize, output_count: usize, fee_rate_per_item: u64) -> u64 {
    (input_count as u64 + output_count as u64) * fee_rate_per_item
}

/// Estimate the serialized size of a transaction in bytes.
///
/// Per-input size: txid (32) + vout (4) + script length (1) +
/// signatures (72 each) + pubkey (33) + sequence (4).
///
/// # Arguments
/// * `input_count` - Number of inputs.
/// * `output_count` - Number of outputs.
/// * `signature_count` - Signatures per input (1 for standard spends).
///
/// # Returns
/// The estimated byte length.
pub fn estimate_transaction_size(
    input_count: usize,
    output_count: usize,
    signature_count: usize,
) -> u64 {
    let input_size = 32 + 4 + 1 + (signature_count as u64 * 72) + 33 + 4;
    BASE_SIZE + (input_count as u64 * input_size) + (output_count as u64 * OUTPUT_SIZE)
}

/// Estimate the fee for a multisig P2SH transaction at a byte rate.
///
/// Accounts for the redeem script and one 72-byte signature per required
/// signer in each input.
///
/// # Arguments
/// * `input_count` - Number of inputs.
/// * `output_count` - Number of outputs.
/// * `signature_count` - Signatures required per input.
/// * `fee_rate_sats_per_byte` - The byte rate to charge.
///
/// # Returns
/// The estimated fee in sats.
pub fn estimate_multisig_fee(
    input_count: usize,
    output_count: usize,
    signature_count: usize,
    fee_rate_sats_per_byte: u64,
) -> u64 {
    // Multisig opcode overhead + keys + OP_CHECKMULTISIG.
    let redeem_script_size = 1 + (signature_count as u64 * 33) + 1 + 1;
    let input_size = 32 + 4 + 1 + (signature_count as u64 * 72) + redeem_script_size + 4;
    let output_size = 34u64;
    let total_size =
        BASE_SIZE + (input_count as u64 * input_size) + (output_count as u64 * output_size);
    total_size * fee_rate_sats_per_byte
}

#[cfg(test)]
mod tests {
    //! Tests pinning the estimator formulas.

    use super::*;

    /// The flat model is exactly (inputs + outputs) * rate.
    #[test]
    fn test_estimated_fee_formula() {
        assert_eq!(estimated_fee(0, 0, 150_000), 0);
        assert_eq!(estimated_fee(1, 1, 150_000), 300_000);
        assert_eq!(estimated_fee(2, 1, 100), 300);
        assert_eq!(estimated_fee(3, 5, 7), 56);
    }

    /// The byte-size model matches its per-element constants.
    #[test]
    fn test_transaction_size_constants() {
        // One standard input: 32+4+1+72+33+4 = 146; one output: 34; base 10.
        assert_eq!(estimate_transaction_size(1, 1, 1), 10 + 146 + 34);
        // Two-signature inputs add 72 bytes each.
        assert_eq!(estimate_transaction_size(1, 1, 2), 10 + 218 + 34);
        assert_eq!(estimate_transaction_size(0, 0, 1), 10);
    }

    /// The multisig model includes the redeem script in each input.
    #[test]
    fn test_multisig_fee() {
        // 2-of-N: redeem 1+66+1+1 = 69; input 32+4+1+144+69+4 = 254.
        let expected_size = 10 + 254 + 2 * 34;
        assert_eq!(
            estimate_multisig_fee(1, 2, 2, DEFAULT_MULTISIG_FEE_RATE),
            expected_size * DEFAULT_MULTISIG_FEE_RATE
        );
    }
}
