//! Script opcode constants.
//!
//! The subset of the Bitcoin-family opcode table that Evrmore scripts use,
//! plus the chain's asset-tag extension opcode. Data-push opcodes 0x01-0x4b
//! push that many literal bytes; named `OP_DATA_*` constants are provided
//! for the lengths that appear in standard templates.

/// Push an empty byte array (numeric zero).
pub const OP_0: u8 = 0x00;
/// Alias for OP_0.
pub const OP_FALSE: u8 = 0x00;

/// Push 1 literal byte.
pub const OP_DATA_1: u8 = 0x01;
/// Push 20 literal bytes (a hash160).
pub const OP_DATA_20: u8 = 0x14;
/// Push 33 literal bytes (a compressed public key).
pub const OP_DATA_33: u8 = 0x21;
/// Push 75 literal bytes, the largest direct push.
pub const OP_DATA_75: u8 = 0x4b;

/// The next byte is the push length.
pub const OP_PUSHDATA1: u8 = 0x4c;
/// The next two bytes (LE) are the push length.
pub const OP_PUSHDATA2: u8 = 0x4d;
/// The next four bytes (LE) are the push length.
pub const OP_PUSHDATA4: u8 = 0x4e;

/// Push the number -1.
pub const OP_1NEGATE: u8 = 0x4f;

/// Push the number 1.
pub const OP_1: u8 = 0x51;
/// Alias for OP_1.
pub const OP_TRUE: u8 = 0x51;
/// Push the number 2.
pub const OP_2: u8 = 0x52;
/// Push the number 16.
pub const OP_16: u8 = 0x60;

/// Conditional execution begin.
pub const OP_IF: u8 = 0x63;
/// Inverted conditional execution begin.
pub const OP_NOTIF: u8 = 0x64;
/// Conditional alternative branch.
pub const OP_ELSE: u8 = 0x67;
/// Conditional execution end.
pub const OP_ENDIF: u8 = 0x68;
/// Fail unless the top stack item is true.
pub const OP_VERIFY: u8 = 0x69;
/// Mark an output unspendable; the remaining bytes carry data.
pub const OP_RETURN: u8 = 0x6a;

/// Remove the top stack item.
pub const OP_DROP: u8 = 0x75;
/// Duplicate the top stack item.
pub const OP_DUP: u8 = 0x76;

/// Push equality of the top two items.
pub const OP_EQUAL: u8 = 0x87;
/// OP_EQUAL then OP_VERIFY.
pub const OP_EQUALVERIFY: u8 = 0x88;

/// Hash the top item with RIPEMD-160(SHA-256).
pub const OP_HASH160: u8 = 0xa9;
/// Signature-hash scope separator (stripped from script code when signing).
pub const OP_CODESEPARATOR: u8 = 0xab;

/// Verify an ECDSA signature.
pub const OP_CHECKSIG: u8 = 0xac;
/// OP_CHECKSIG then OP_VERIFY.
pub const OP_CHECKSIGVERIFY: u8 = 0xad;
/// Verify M-of-N ECDSA signatures.
pub const OP_CHECKMULTISIG: u8 = 0xae;
/// OP_CHECKMULTISIG then OP_VERIFY.
pub const OP_CHECKMULTISIGVERIFY: u8 = 0xaf;

/// Absolute timelock check (BIP-65).
pub const OP_CHECKLOCKTIMEVERIFY: u8 = 0xb1;
/// Relative timelock check (BIP-112).
pub const OP_CHECKSEQUENCEVERIFY: u8 = 0xb2;

/// The asset-tag extension opcode.
///
/// Marks the start of the asset metadata appended to a base locking
/// script. General-purpose script engines that predate the asset layer
/// report it as an unsupported opcode.
pub const OP_EVR_ASSET: u8 = 0xc0;

/// Return the canonical name for a non-push opcode.
///
/// # Arguments
/// * `op` - The opcode byte.
///
/// # Returns
/// The `OP_*` name, or `"OP_UNKNOWN"` for bytes outside the known set.
pub fn opcode_to_string(op: u8) -> &'static str {
    match op {
        OP_0 => "OP_0",
        OP_PUSHDATA1 => "OP_PUSHDATA1",
        OP_PUSHDATA2 => "OP_PUSHDATA2",
        OP_PUSHDATA4 => "OP_PUSHDATA4",
        OP_1NEGATE => "OP_1NEGATE",
        OP_1 => "OP_1",
        OP_2 => "OP_2",
        0x53 => "OP_3",
        0x54 => "OP_4",
        0x55 => "OP_5",
        0x56 => "OP_6",
        0x57 => "OP_7",
        0x58 => "OP_8",
        0x59 => "OP_9",
        0x5a => "OP_10",
        0x5b => "OP_11",
        0x5c => "OP_12",
        0x5d => "OP_13",
        0x5e => "OP_14",
        0x5f => "OP_15",
        OP_16 => "OP_16",
        OP_IF => "OP_IF",
        OP_NOTIF => "OP_NOTIF",
        OP_ELSE => "OP_ELSE",
        OP_ENDIF => "OP_ENDIF",
        OP_VERIFY => "OP_VERIFY",
        OP_RETURN => "OP_RETURN",
        OP_DROP => "OP_DROP",
        OP_DUP => "OP_DUP",
        OP_EQUAL => "OP_EQUAL",
        OP_EQUALVERIFY => "OP_EQUALVERIFY",
        OP_HASH160 => "OP_HASH160",
        OP_CODESEPARATOR => "OP_CODESEPARATOR",
        OP_CHECKSIG => "OP_CHECKSIG",
        OP_CHECKSIGVERIFY => "OP_CHECKSIGVERIFY",
        OP_CHECKMULTISIG => "OP_CHECKMULTISIG",
        OP_CHECKMULTISIGVERIFY => "OP_CHECKMULTISIGVERIFY",
        OP_CHECKLOCKTIMEVERIFY => "OP_CHECKLOCKTIMEVERIFY",
        OP_CHECKSEQUENCEVERIFY => "OP_CHECKSEQUENCEVERIFY",
        OP_EVR_ASSET => "OP_EVR_ASSET",
        _ => "OP_UNKNOWN",
    }
}

/// Whether an opcode pushes a small integer (OP_0, OP_1..OP_16).
///
/// # Arguments
/// * `op` - The opcode byte.
///
/// # Returns
/// `true` for OP_0 and OP_1 through OP_16.
pub fn is_small_int_op(op: u8) -> bool {
    op == OP_0 || (OP_1..=OP_16).contains(&op)
}

/// Decode the value of a small-integer opcode.
///
/// # Arguments
/// * `op` - An opcode for which `is_small_int_op` returns true.
///
/// # Returns
/// The integer value 0..=16.
pub fn small_int_value(op: u8) -> u8 {
    if op == OP_0 {
        0
    } else {
        op - OP_1 + 1
    }
}
