//! Builders for every script shape the wallet emits.
//!
//! Locking templates (P2PKH, P2SH), redeem scripts (N-of-M multisig,
//! timelocked payment channels), and null-data memo outputs. Builders
//! return typed `Script` values and validate their inputs eagerly.

use evr_primitives::ec::PublicKey;

use crate::opcodes::*;
use crate::{Script, ScriptError};

/// Threshold above which an absolute locktime is a Unix timestamp rather
/// than a block height.
pub const LOCKTIME_THRESHOLD: u64 = 500_000_000;

/// Flag bit in a relative timelock marking 512-second units instead of blocks.
const SEQUENCE_TIME_FLAG: i64 = 0x0040_0000;

/// Upper bound on relative-timeout minutes: 65535 units of 512 seconds.
const MAX_TIMEOUT_MINUTES: u64 = 557_047;

/// Build a P2PKH locking script.
///
/// Produces `OP_DUP OP_HASH160 <hash> OP_EQUALVERIFY OP_CHECKSIG`.
///
/// # Arguments
/// * `pubkey_hash` - The 20-byte hash160 of the recipient's public key.
///
/// # Returns
/// The 25-byte locking script.
pub fn p2pkh_script(pubkey_hash: &[u8; 20]) -> Script {
    let mut bytes = Vec::with_capacity(25);
    bytes.push(OP_DUP);
    bytes.push(OP_HASH160);
    bytes.push(OP_DATA_20);
    bytes.extend_from_slice(pubkey_hash);
    bytes.push(OP_EQUALVERIFY);
    bytes.push(OP_CHECKSIG);
    Script::from_bytes(&bytes)
}

/// Build a P2SH locking script.
///
/// Produces `OP_HASH160 <hash> OP_EQUAL`.
///
/// # Arguments
/// * `script_hash` - The 20-byte hash160 of the redeem script.
///
/// # Returns
/// The 23-byte locking script.
pub fn p2sh_script(script_hash: &[u8; 20]) -> Script {
    let mut bytes = Vec::with_capacity(23);
    bytes.push(OP_HASH160);
    bytes.push(OP_DATA_20);
    bytes.extend_from_slice(script_hash);
    bytes.push(OP_EQUAL);
    Script::from_bytes(&bytes)
}

/// Build an N-of-M multisig redeem script.
///
/// Produces `OP_N <key1> ... <keyM> OP_M OP_CHECKMULTISIG`.
///
/// # Arguments
/// * `pubkeys` - The participating public keys, in the order they will be
///   embedded (signature order must match this order when spending).
/// * `required` - The signature threshold N.
///
/// # Returns
/// The redeem script, or `InvalidSignatureCount` unless
/// `1 <= required <= pubkeys.len()`.
pub fn multisig_redeem_script(
    pubkeys: &[PublicKey],
    required: usize,
) -> Result<Script, ScriptError> {
    if required < 1 || required > pubkeys.len() {
        return Err(ScriptError::InvalidSignatureCount {
            required,
            keys: pubkeys.len(),
        });
    }

    let mut script = Script::new();
    script.append_push_int(required as i64)?;
    for key in pubkeys {
        script.append_push_data(&key.to_compressed())?;
    }
    script.append_push_int(pubkeys.len() as i64)?;
    script.append_opcodes(&[OP_CHECKMULTISIG])?;
    Ok(script)
}

/// Timeout specification for a payment-channel redeem script.
///
/// Relative variants produce a renewable channel (OP_CHECKSEQUENCEVERIFY:
/// the clock restarts whenever the channel output is re-created); absolute
/// variants produce a non-renewable channel (OP_CHECKLOCKTIMEVERIFY).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelTimeout {
    /// Relative timeout in blocks since the funding output confirmed.
    /// Valid range 1..=65535.
    RelativeBlocks(u32),
    /// Relative timeout in minutes, rounded down to 512-second units
    /// (about 8.5 minutes each) with a minimum of one unit.
    RelativeMinutes(u64),
    /// Absolute timeout at a block height. Must be positive and below the
    /// timestamp threshold.
    AbsoluteHeight(u32),
    /// Absolute timeout at a Unix timestamp. Values below 500,000,000 are
    /// rejected as ambiguous between height and time interpretation.
    AbsoluteTimestamp(u64),
}

impl ChannelTimeout {
    /// Whether this timeout makes the channel renewable (relative clock).
    pub fn is_renewable(&self) -> bool {
        matches!(
            self,
            ChannelTimeout::RelativeBlocks(_) | ChannelTimeout::RelativeMinutes(_)
        )
    }

    /// Encode the timeout to the script-number value pushed before the
    /// timelock opcode.
    ///
    /// # Returns
    /// The encoded value, or a range error.
    fn script_value(&self) -> Result<i64, ScriptError> {
        match *self {
            ChannelTimeout::RelativeBlocks(blocks) => {
                if !(1..=65_535).contains(&blocks) {
                    return Err(ScriptError::TimelockOutOfRange(format!(
                        "relative blocks {} not in 1..=65535",
                        blocks
                    )));
                }
                Ok(blocks as i64)
            }
            ChannelTimeout::RelativeMinutes(minutes) => {
                if !(1..=MAX_TIMEOUT_MINUTES).contains(&minutes) {
                    return Err(ScriptError::TimelockOutOfRange(format!(
                        "relative minutes {} not in 1..={}",
                        minutes, MAX_TIMEOUT_MINUTES
                    )));
                }
                // 512-second units, minimum one, with bit 22 flagging
                // time-based interpretation.
                let units = ((minutes * 60) / 512).max(1);
                Ok(SEQUENCE_TIME_FLAG | (units as i64 & 0xFFFF))
            }
            ChannelTimeout::AbsoluteHeight(height) => {
                if height == 0 || height as u64 >= LOCKTIME_THRESHOLD {
                    return Err(ScriptError::TimelockOutOfRange(format!(
                        "absolute height {} not in 1..{}",
                        height, LOCKTIME_THRESHOLD
                    )));
                }
                Ok(height as i64)
            }
            ChannelTimeout::AbsoluteTimestamp(timestamp) => {
                if timestamp < LOCKTIME_THRESHOLD {
                    return Err(ScriptError::AmbiguousTimestamp(timestamp));
                }
                Ok(timestamp as i64)
            }
        }
    }
}

/// Build a payment-channel redeem script.
///
/// Produces:
///
/// ```text
/// OP_IF
///     2 <sender_pub> <receiver_pub> 2 OP_CHECKMULTISIG
/// OP_ELSE
///     <timeout> OP_CHECKSEQUENCEVERIFY|OP_CHECKLOCKTIMEVERIFY OP_DROP
///     <sender_pub> OP_CHECKSIG
/// OP_ENDIF
/// ```
///
/// The IF branch is the cooperative 2-of-2 close; the ELSE branch lets the
/// sender reclaim alone once the timeout matures.
///
/// # Arguments
/// * `sender` - The channel funder's public key.
/// * `receiver` - The counterparty's public key.
/// * `timeout` - The reclaim timeout; its variant selects CSV vs CLTV.
///
/// # Returns
/// The redeem script, or a timelock range error.
pub fn channel_redeem_script(
    sender: &PublicKey,
    receiver: &PublicKey,
    timeout: ChannelTimeout,
) -> Result<Script, ScriptError> {
    let timeout_value = timeout.script_value()?;
    let timelock_op = if timeout.is_renewable() {
        OP_CHECKSEQUENCEVERIFY
    } else {
        OP_CHECKLOCKTIMEVERIFY
    };

    let mut script = Script::new();
    script.append_opcodes(&[OP_IF])?;
    script.append_push_int(2)?;
    script.append_push_data(&sender.to_compressed())?;
    script.append_push_data(&receiver.to_compressed())?;
    script.append_push_int(2)?;
    script.append_opcodes(&[OP_CHECKMULTISIG, OP_ELSE])?;
    script.append_push_int(timeout_value)?;
    script.append_opcodes(&[timelock_op, OP_DROP])?;
    script.append_push_data(&sender.to_compressed())?;
    script.append_opcodes(&[OP_CHECKSIG, OP_ENDIF])?;
    Ok(script)
}

/// Build a null-data memo output script.
///
/// Produces `OP_RETURN <memo>`. An empty memo produces no script at all;
/// a present memo must be strictly longer than 4 bytes and strictly
/// shorter than 80.
///
/// # Arguments
/// * `memo` - The memo text.
///
/// # Returns
/// `Ok(Some(script))` for valid memos, `Ok(None)` for empty ones, or
/// `MemoLength` when the length invariant is violated.
pub fn memo_script(memo: &str) -> Result<Option<Script>, ScriptError> {
    let bytes = memo.as_bytes();
    if bytes.is_empty() {
        return Ok(None);
    }
    if bytes.len() <= 4 || bytes.len() >= 80 {
        return Err(ScriptError::MemoLength(bytes.len()));
    }
    let mut script = Script::new();
    script.append_opcodes(&[OP_RETURN])?;
    script.append_push_data(bytes)?;
    Ok(Some(script))
}
