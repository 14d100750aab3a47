//! The `Script` type - a byte-vector newtype over opcodes and data pushes.
//!
//! Scripts lock outputs (scriptPubKey) and unlock inputs (scriptSig).
//! Construction goes through typed append methods so builders never deal
//! in raw byte soup; inspection goes through chunk decoding.

use std::fmt;

use crate::chunk::{decode_script, push_data_prefix, ScriptChunk};
use crate::opcodes::*;
use crate::scriptnum;
use crate::ScriptError;

/// A script, represented as a byte vector newtype.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Script(Vec<u8>);

impl Script {
    // -----------------------------------------------------------------------
    // Constructors
    // -----------------------------------------------------------------------

    /// Create a new empty script.
    pub fn new() -> Self {
        Script(Vec::new())
    }

    /// Create a script from a hex-encoded string.
    ///
    /// # Arguments
    /// * `hex_str` - A hex string (e.g. "76a914...88ac").
    ///
    /// # Returns
    /// A `Script` wrapping the decoded bytes, or an error if the hex is invalid.
    pub fn from_hex(hex_str: &str) -> Result<Self, ScriptError> {
        let bytes =
            hex::decode(hex_str).map_err(|e| ScriptError::InvalidHex(e.to_string()))?;
        Ok(Script(bytes))
    }

    /// Create a script from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Script(bytes.to_vec())
    }

    // -----------------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------------

    /// Encode the script as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Return a reference to the underlying bytes.
    pub fn to_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Return the length of the script in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the script is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Convert the script to its human-readable assembly representation.
    ///
    /// # Returns
    /// A space-separated ASM string; empty for empty or malformed scripts.
    pub fn to_asm(&self) -> String {
        match self.chunks() {
            Ok(chunks) => chunks
                .iter()
                .map(|c| c.to_asm_string())
                .collect::<Vec<_>>()
                .join(" "),
            Err(_) => String::new(),
        }
    }

    /// Parse the script into decoded chunks.
    ///
    /// # Returns
    /// The chunk sequence, or an error if the script is malformed.
    pub fn chunks(&self) -> Result<Vec<ScriptChunk>, ScriptError> {
        decode_script(&self.0)
    }

    // -----------------------------------------------------------------------
    // Building
    // -----------------------------------------------------------------------

    /// Append data bytes with the minimal push prefix.
    ///
    /// # Arguments
    /// * `data` - The data bytes to push.
    ///
    /// # Returns
    /// `Ok(())`, or an error if the data is too large to push.
    pub fn append_push_data(&mut self, data: &[u8]) -> Result<(), ScriptError> {
        let prefix = push_data_prefix(data.len())?;
        self.0.extend_from_slice(&prefix);
        self.0.extend_from_slice(data);
        Ok(())
    }

    /// Append raw opcodes.
    ///
    /// Rejects push-data opcodes to prevent misuse; use `append_push_data`
    /// for those.
    ///
    /// # Arguments
    /// * `opcodes` - Opcode bytes to append.
    ///
    /// # Returns
    /// `Ok(())`, or an error if a push-data opcode is present.
    pub fn append_opcodes(&mut self, opcodes: &[u8]) -> Result<(), ScriptError> {
        for &op in opcodes {
            if (OP_DATA_1..=OP_PUSHDATA4).contains(&op) {
                return Err(ScriptError::InvalidOpcodeType(
                    opcode_to_string(op).to_string(),
                ));
            }
        }
        self.0.extend_from_slice(opcodes);
        Ok(())
    }

    /// Append an integer using the smallest valid encoding.
    ///
    /// Small values use OP_0/OP_1..OP_16/OP_1NEGATE; larger values are
    /// pushed as minimal script numbers.
    ///
    /// # Arguments
    /// * `value` - The integer to push.
    ///
    /// # Returns
    /// `Ok(())` on success.
    pub fn append_push_int(&mut self, value: i64) -> Result<(), ScriptError> {
        match value {
            0 => self.0.push(OP_0),
            -1 => self.0.push(OP_1NEGATE),
            1..=16 => self.0.push(OP_1 + (value as u8) - 1),
            _ => self.append_push_data(&scriptnum::encode(value))?,
        }
        Ok(())
    }

    /// Append the raw bytes of another script.
    ///
    /// Used to suffix a base locking script with asset-tag metadata.
    ///
    /// # Arguments
    /// * `other` - The script whose bytes to append.
    pub fn append_script(&mut self, other: &Script) {
        self.0.extend_from_slice(&other.0);
    }

    // -----------------------------------------------------------------------
    // Classification
    // -----------------------------------------------------------------------

    /// Check if this is a plain P2PKH locking script.
    ///
    /// Pattern: OP_DUP OP_HASH160 <20 bytes> OP_EQUALVERIFY OP_CHECKSIG
    pub fn is_p2pkh(&self) -> bool {
        let b = &self.0;
        b.len() == 25
            && b[0] == OP_DUP
            && b[1] == OP_HASH160
            && b[2] == OP_DATA_20
            && b[23] == OP_EQUALVERIFY
            && b[24] == OP_CHECKSIG
    }

    /// Check if this is a plain P2SH locking script.
    ///
    /// Pattern: OP_HASH160 <20 bytes> OP_EQUAL
    pub fn is_p2sh(&self) -> bool {
        let b = &self.0;
        b.len() == 23 && b[0] == OP_HASH160 && b[1] == OP_DATA_20 && b[22] == OP_EQUAL
    }

    /// Check if this is a null-data (memo) output script.
    pub fn is_null_data(&self) -> bool {
        !self.0.is_empty() && self.0[0] == OP_RETURN
    }

    /// Check if this script carries an asset tag.
    ///
    /// The tag is the `OP_EVR_ASSET <payload> OP_DROP` suffix appended to
    /// a base locking script.
    pub fn is_asset_tagged(&self) -> bool {
        match self.chunks() {
            Ok(chunks) => chunks.iter().any(|c| c.op == OP_EVR_ASSET),
            Err(_) => false,
        }
    }

    /// Check if this is an N-of-M multisig redeem script.
    ///
    /// Pattern: OP_N <pubkey>... OP_M OP_CHECKMULTISIG
    pub fn is_multisig_redeem(&self) -> bool {
        self.multisig_redeem_parts().is_some()
    }

    // -----------------------------------------------------------------------
    // Data extraction
    // -----------------------------------------------------------------------

    /// Extract the public key hash from a P2PKH locking script.
    ///
    /// Asset-tagged P2PKH scripts also match: the base template occupies
    /// the first 25 bytes and the tag follows it.
    ///
    /// # Returns
    /// The 20-byte hash, or `ScriptError::NotP2pkh`.
    pub fn public_key_hash(&self) -> Result<[u8; 20], ScriptError> {
        let b = &self.0;
        if b.len() < 25 || b[0] != OP_DUP || b[1] != OP_HASH160 || b[2] != OP_DATA_20 {
            return Err(ScriptError::NotP2pkh);
        }
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&b[3..23]);
        Ok(hash)
    }

    /// Extract the script hash from a P2SH locking script.
    ///
    /// Asset-tagged P2SH scripts also match, as with `public_key_hash`.
    ///
    /// # Returns
    /// The 20-byte hash, or `ScriptError::NotP2sh`.
    pub fn script_hash(&self) -> Result<[u8; 20], ScriptError> {
        let b = &self.0;
        if b.len() < 23 || b[0] != OP_HASH160 || b[1] != OP_DATA_20 {
            return Err(ScriptError::NotP2sh);
        }
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&b[2..22]);
        Ok(hash)
    }

    /// Decompose an N-of-M multisig redeem script.
    ///
    /// # Returns
    /// `Some((required, pubkeys))` if the script matches the multisig
    /// pattern, `None` otherwise.
    pub fn multisig_redeem_parts(&self) -> Option<(usize, Vec<Vec<u8>>)> {
        let chunks = self.chunks().ok()?;
        if chunks.len() < 4 {
            return None;
        }
        let first = &chunks[0];
        let second_last = &chunks[chunks.len() - 2];
        let last = &chunks[chunks.len() - 1];
        if !is_small_int_op(first.op)
            || !is_small_int_op(second_last.op)
            || last.op != OP_CHECKMULTISIG
        {
            return None;
        }
        let required = small_int_value(first.op) as usize;
        let total = small_int_value(second_last.op) as usize;
        let keys: Vec<Vec<u8>> = chunks[1..chunks.len() - 2]
            .iter()
            .map(|c| c.data.clone())
            .collect::<Option<Vec<_>>>()?;
        if keys.len() != total || required == 0 || required > total {
            return None;
        }
        Some((required, keys))
    }

    /// Decompose a payment-channel redeem script.
    ///
    /// Pattern: `IF 2 <sender> <receiver> 2 CHECKMULTISIG ELSE <timeout>
    /// CSV|CLTV DROP <sender> CHECKSIG ENDIF`.
    ///
    /// # Returns
    /// `Some((sender_pubkey, receiver_pubkey))` if the script matches,
    /// `None` otherwise.
    pub fn channel_redeem_parts(&self) -> Option<(Vec<u8>, Vec<u8>)> {
        let chunks = self.chunks().ok()?;
        // IF 2 <S> <R> 2 CHECKMULTISIG ELSE <t> <tl-op> DROP <S> CHECKSIG ENDIF
        if chunks.len() != 13 {
            return None;
        }
        let timelock_op = chunks[8].op;
        if chunks[0].op != OP_IF
            || chunks[1].op != OP_2
            || chunks[4].op != OP_2
            || chunks[5].op != OP_CHECKMULTISIG
            || chunks[6].op != OP_ELSE
            || (timelock_op != OP_CHECKSEQUENCEVERIFY && timelock_op != OP_CHECKLOCKTIMEVERIFY)
            || chunks[9].op != OP_DROP
            || chunks[11].op != OP_CHECKSIG
            || chunks[12].op != OP_ENDIF
        {
            return None;
        }
        let sender = chunks[2].data.clone()?;
        let receiver = chunks[3].data.clone()?;
        if chunks[10].data.as_ref() != Some(&sender) {
            return None;
        }
        Some((sender, receiver))
    }
}

impl fmt::Display for Script {
    /// Display the script as a lowercase hex string.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Script({})", self.to_hex())
    }
}

impl serde::Serialize for Script {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for Script {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Script::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    //! Tests for Script construction, classification, and extraction.

    use super::*;

    const PKH_HEX: &str = "751e76e8199196d454941c45d1b3a323f1433bd6";

    /// from_hex and to_hex round-trip.
    #[test]
    fn test_hex_roundtrip() {
        let hex_str = "76a914751e76e8199196d454941c45d1b3a323f1433bd688ac";
        let script = Script::from_hex(hex_str).unwrap();
        assert_eq!(script.to_hex(), hex_str);
        assert!(Script::from_hex("zz").is_err());
    }

    /// A standard P2PKH script classifies and extracts correctly.
    #[test]
    fn test_p2pkh_classification() {
        let script =
            Script::from_hex(&format!("76a914{}88ac", PKH_HEX)).unwrap();
        assert!(script.is_p2pkh());
        assert!(!script.is_p2sh());
        assert_eq!(hex::encode(script.public_key_hash().unwrap()), PKH_HEX);
    }

    /// A P2SH script classifies and extracts correctly.
    #[test]
    fn test_p2sh_classification() {
        let script = Script::from_hex(&format!("a914{}87", PKH_HEX)).unwrap();
        assert!(script.is_p2sh());
        assert!(!script.is_p2pkh());
        assert_eq!(hex::encode(script.script_hash().unwrap()), PKH_HEX);
    }

    /// append_push_int uses small-int opcodes and minimal numbers.
    #[test]
    fn test_append_push_int() {
        let mut script = Script::new();
        script.append_push_int(0).unwrap();
        script.append_push_int(2).unwrap();
        script.append_push_int(16).unwrap();
        script.append_push_int(17).unwrap();
        assert_eq!(script.to_bytes(), &[OP_0, OP_2, OP_16, 0x01, 0x11]);
    }

    /// ASM output names opcodes and hex-encodes pushes.
    #[test]
    fn test_to_asm() {
        let script =
            Script::from_hex(&format!("76a914{}88ac", PKH_HEX)).unwrap();
        assert_eq!(
            script.to_asm(),
            format!("OP_DUP OP_HASH160 {} OP_EQUALVERIFY OP_CHECKSIG", PKH_HEX)
        );
    }

    /// Multisig redeem decomposition returns threshold and keys in order.
    #[test]
    fn test_multisig_redeem_parts() {
        let mut script = Script::new();
        script.append_push_int(2).unwrap();
        script.append_push_data(&[0x02; 33]).unwrap();
        script.append_push_data(&[0x03; 33]).unwrap();
        script.append_push_data(&[0x02; 33]).unwrap();
        script.append_push_int(3).unwrap();
        script.append_opcodes(&[OP_CHECKMULTISIG]).unwrap();

        let (required, keys) = script.multisig_redeem_parts().unwrap();
        assert_eq!(required, 2);
        assert_eq!(keys.len(), 3);
        assert!(script.is_multisig_redeem());
    }

    /// Serde round-trips scripts as hex strings.
    #[test]
    fn test_serde_hex() {
        let script = Script::from_hex("76a90088ac").unwrap();
        let json = serde_json::to_string(&script).unwrap();
        assert_eq!(json, "\"76a90088ac\"");
        let back: Script = serde_json::from_str(&json).unwrap();
        assert_eq!(back, script);
    }
}
