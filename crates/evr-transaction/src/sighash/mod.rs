//! Legacy signature hash computation.
//!
//! Computes the digest that ECDSA signs to authorize spending an input.
//! Evrmore-style chains use the original (pre-segwit) Bitcoin algorithm:
//! the transaction is re-serialized with every unlocking script blanked,
//! the signed input's script replaced by the script code, the input and
//! output sets reduced according to the sighash flags, and the 4-byte flag
//! appended before double hashing.
//!
//! The fee-delegation and channel protocols depend on two independently
//! signing parties producing this digest byte-for-byte identically, so the
//! reductions below follow the reference implementation exactly.

use evr_primitives::hash::sha256d;
use evr_primitives::util::{TxWriter, VarInt};
use evr_script::opcodes::OP_CODESEPARATOR;
use evr_script::Script;

use crate::transaction::Transaction;
use crate::TransactionError;

// -----------------------------------------------------------------------
// Sighash flag constants
// -----------------------------------------------------------------------

/// Sign all inputs and all outputs (the default).
pub const SIGHASH_ALL: u32 = 0x01;

/// Sign all inputs but no outputs, allowing outputs to be modified.
pub const SIGHASH_NONE: u32 = 0x02;

/// Sign all inputs and only the output with the signed input's index.
pub const SIGHASH_SINGLE: u32 = 0x03;

/// Combined with another flag: sign only the current input, allowing other
/// parties to append further inputs without invalidating the signature.
pub const SIGHASH_ANYONECANPAY: u32 = 0x80;

/// The flag combination both halves of a two-party protocol sign with:
/// this party's inputs and the full output set are locked, further inputs
/// may still be appended.
pub const SIGHASH_ALL_ANYONECANPAY: u32 = SIGHASH_ALL | SIGHASH_ANYONECANPAY;

/// Mask extracting the base sighash type (ALL, NONE, SINGLE).
pub const SIGHASH_MASK: u32 = 0x1f;

/// Placeholder value for outputs blanked by the SIGHASH_SINGLE reduction.
const BLANKED_OUTPUT_VALUE: u64 = u64::MAX;

// -----------------------------------------------------------------------
// Legacy signature hash
// -----------------------------------------------------------------------

/// Compute the legacy signature hash for a given input.
///
/// # Arguments
/// * `tx` - The transaction being signed.
/// * `input_index` - Index of the input being signed.
/// * `script_code` - The script the signature commits to: the locking
///   script of the output being spent, or the redeem script for P2SH.
/// * `sighash_type` - The combined sighash flags.
///
/// # Returns
/// A 32-byte double-SHA256 digest to be signed by ECDSA, or an error if
/// the input index is out of range or SIGHASH_SINGLE has no matching output.
pub fn signature_hash(
    tx: &Transaction,
    input_index: usize,
    script_code: &Script,
    sighash_type: u32,
) -> Result<[u8; 32], TransactionError> {
    let preimage = calc_preimage(tx, input_index, script_code, sighash_type)?;
    Ok(sha256d(&preimage))
}

/// Build the serialized preimage bytes before double hashing.
///
/// The preimage is the transaction in normal wire layout, except:
/// 1. Every input's unlocking script is blank; the signed input carries
///    the script code (with OP_CODESEPARATOR occurrences removed).
/// 2. With ANYONECANPAY, the input set is reduced to the signed input alone.
/// 3. With NONE the output set is empty; with SINGLE it is truncated to
///    the signed index, earlier entries blanked to value `u64::MAX` and an
///    empty script.
/// 4. With NONE or SINGLE, other inputs' sequence numbers are zeroed.
/// 5. The 4-byte sighash type is appended.
///
/// # Arguments
/// * `tx` - The transaction being signed.
/// * `input_index` - Index of the input being signed.
/// * `script_code` - The script the signature commits to.
/// * `sighash_type` - The combined sighash flags.
///
/// # Returns
/// The raw preimage bytes (not yet hashed).
pub fn calc_preimage(
    tx: &Transaction,
    input_index: usize,
    script_code: &Script,
    sighash_type: u32,
) -> Result<Vec<u8>, TransactionError> {
    if input_index >= tx.inputs.len() {
        return Err(TransactionError::InvalidTransaction(format!(
            "input index {} out of range (tx has {} inputs)",
            input_index,
            tx.inputs.len()
        )));
    }

    let base_type = sighash_type & SIGHASH_MASK;
    let anyone_can_pay = sighash_type & SIGHASH_ANYONECANPAY != 0;

    if base_type == SIGHASH_SINGLE && input_index >= tx.outputs.len() {
        return Err(TransactionError::SigningError(format!(
            "SIGHASH_SINGLE input {} has no matching output (tx has {} outputs)",
            input_index,
            tx.outputs.len()
        )));
    }

    let script_code = strip_codeseparators(script_code);

    let mut writer = TxWriter::with_capacity(256);
    writer.write_u32_le(tx.version);

    // Inputs
    if anyone_can_pay {
        writer.write_varint(VarInt(1));
        write_input(&mut writer, tx, input_index, input_index, &script_code, base_type);
    } else {
        writer.write_varint(VarInt::from(tx.inputs.len()));
        for i in 0..tx.inputs.len() {
            write_input(&mut writer, tx, i, input_index, &script_code, base_type);
        }
    }

    // Outputs
    match base_type {
        SIGHASH_NONE => writer.write_varint(VarInt(0)),
        SIGHASH_SINGLE => {
            writer.write_varint(VarInt::from(input_index + 1));
            // Earlier outputs are blanked: maximal value marker, empty script.
            for _ in 0..input_index {
                writer.write_u64_le(BLANKED_OUTPUT_VALUE);
                writer.write_varint(VarInt(0));
            }
            tx.outputs[input_index].write_to(&mut writer);
        }
        _ => {
            writer.write_varint(VarInt::from(tx.outputs.len()));
            for output in &tx.outputs {
                output.write_to(&mut writer);
            }
        }
    }

    writer.write_u32_le(tx.lock_time);
    writer.write_u32_le(sighash_type);

    Ok(writer.into_bytes())
}

/// Serialize one input for the preimage.
///
/// The signed input carries the script code; all others are blank. Other
/// inputs' sequence numbers are zeroed under NONE/SINGLE so their owners
/// cannot veto output modifications.
fn write_input(
    writer: &mut TxWriter,
    tx: &Transaction,
    index: usize,
    signed_index: usize,
    script_code: &[u8],
    base_type: u32,
) {
    let input = &tx.inputs[index];
    writer.write_bytes(&input.source_txid);
    writer.write_u32_le(input.source_tx_out_index);

    if index == signed_index {
        writer.write_varint(VarInt::from(script_code.len()));
        writer.write_bytes(script_code);
        writer.write_u32_le(input.sequence_number);
    } else {
        writer.write_varint(VarInt(0));
        let sequence = if base_type == SIGHASH_NONE || base_type == SIGHASH_SINGLE {
            0
        } else {
            input.sequence_number
        };
        writer.write_u32_le(sequence);
    }
}

/// Remove standalone OP_CODESEPARATOR opcodes from the script code.
fn strip_codeseparators(script: &Script) -> Vec<u8> {
    match script.chunks() {
        Ok(chunks) => {
            if !chunks.iter().any(|c| c.op == OP_CODESEPARATOR && c.data.is_none()) {
                return script.to_bytes().to_vec();
            }
            let mut rebuilt = Script::new();
            for chunk in chunks {
                match chunk.data {
                    Some(data) => {
                        // Push sizes are unchanged, so re-encoding is minimal
                        // and byte-identical for minimally encoded scripts.
                        let _ = rebuilt.append_push_data(&data);
                    }
                    None if chunk.op == OP_CODESEPARATOR => {}
                    None => {
                        let _ = rebuilt.append_opcodes(&[chunk.op]);
                    }
                }
            }
            rebuilt.to_bytes().to_vec()
        }
        // A malformed script code hashes as-is; the signature will simply
        // never verify against a differently parsed code.
        Err(_) => script.to_bytes().to_vec(),
    }
}
