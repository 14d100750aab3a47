//! Transaction input referencing a previous output.
//!
//! Carries the source outpoint, the unlocking script once signed, and an
//! optional copy of the source output so signing can resolve the script
//! code and fee math can resolve input values without refetching.

use evr_primitives::util::{TxReader, TxWriter, VarInt};
use evr_script::Script;

use crate::output::TransactionOutput;
use crate::TransactionError;

/// Default sequence number indicating a finalized input (no relative lock-time).
pub const DEFAULT_SEQUENCE_NUMBER: u32 = 0xFFFF_FFFF;

/// A single input in a transaction.
///
/// # Wire format
///
/// | Field               | Size          |
/// |---------------------|---------------|
/// | source_txid         | 32 bytes      |
/// | source_tx_out_index | 4 bytes (LE)  |
/// | script length       | VarInt        |
/// | unlocking_script    | variable      |
/// | sequence_number     | 4 bytes (LE)  |
#[derive(Clone, Debug)]
pub struct TransactionInput {
    /// The 32-byte txid of the output being spent, in internal
    /// (little-endian) byte order.
    pub source_txid: [u8; 32],

    /// Index of the output within the source transaction.
    pub source_tx_out_index: u32,

    /// Sequence number. Defaults to `0xFFFFFFFF` (finalized).
    pub sequence_number: u32,

    /// The unlocking script (scriptSig). `None` until the input is signed.
    pub unlocking_script: Option<Script>,

    /// The source output being spent, when known. Supplies the locking
    /// script used as signing script code and the satoshi value used in
    /// fee accounting.
    source_output: Option<TransactionOutput>,
}

impl TransactionInput {
    /// Create a new input with default values.
    pub fn new() -> Self {
        TransactionInput {
            source_txid: [0u8; 32],
            source_tx_out_index: 0,
            sequence_number: DEFAULT_SEQUENCE_NUMBER,
            unlocking_script: None,
            source_output: None,
        }
    }

    /// Create an input spending the given outpoint.
    ///
    /// # Arguments
    /// * `txid_hex` - The source transaction ID in display (big-endian) hex.
    /// * `vout` - The output index being spent.
    ///
    /// # Returns
    /// The input, or an error if the txid hex is invalid.
    pub fn from_outpoint(txid_hex: &str, vout: u32) -> Result<Self, TransactionError> {
        let mut input = TransactionInput::new();
        input.source_txid = txid_to_internal(txid_hex)?;
        input.source_tx_out_index = vout;
        Ok(input)
    }

    /// Attach the source output (locking script and value).
    pub fn set_source_output(&mut self, output: Option<TransactionOutput>) {
        self.source_output = output;
    }

    /// The source output, if attached.
    pub fn source_output(&self) -> Option<&TransactionOutput> {
        self.source_output.as_ref()
    }

    /// The satoshi value of the source output, if attached.
    pub fn source_satoshis(&self) -> Option<u64> {
        self.source_output.as_ref().map(|o| o.satoshis)
    }

    /// Deserialize an input from a `TxReader`.
    ///
    /// # Arguments
    /// * `reader` - The reader positioned at the start of an encoded input.
    ///
    /// # Returns
    /// `Ok(TransactionInput)` on success, or a serialization error.
    pub fn read_from(reader: &mut TxReader) -> Result<Self, TransactionError> {
        let txid_bytes = reader.read_bytes(32).map_err(|e| {
            TransactionError::SerializationError(format!("reading source txid: {}", e))
        })?;
        let mut source_txid = [0u8; 32];
        source_txid.copy_from_slice(txid_bytes);

        let source_tx_out_index = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading output index: {}", e))
        })?;

        let script_len = reader.read_varint().map_err(|e| {
            TransactionError::SerializationError(format!("reading script length: {}", e))
        })?;

        let script_bytes = reader.read_bytes(script_len.value() as usize).map_err(|e| {
            TransactionError::SerializationError(format!("reading unlocking script: {}", e))
        })?;

        let sequence_number = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading sequence number: {}", e))
        })?;

        let unlocking_script = if script_bytes.is_empty() {
            None
        } else {
            Some(Script::from_bytes(script_bytes))
        };

        Ok(TransactionInput {
            source_txid,
            source_tx_out_index,
            sequence_number,
            unlocking_script,
            source_output: None,
        })
    }

    /// Serialize this input into a `TxWriter`.
    ///
    /// # Arguments
    /// * `writer` - The destination writer.
    pub fn write_to(&self, writer: &mut TxWriter) {
        writer.write_bytes(&self.source_txid);
        writer.write_u32_le(self.source_tx_out_index);
        match &self.unlocking_script {
            Some(script) => {
                writer.write_varint(VarInt::from(script.len()));
                writer.write_bytes(script.to_bytes());
            }
            None => writer.write_varint(VarInt(0)),
        }
        writer.write_u32_le(self.sequence_number);
    }
}

impl Default for TransactionInput {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert a display-order (big-endian) txid hex string to internal
/// little-endian bytes.
///
/// # Arguments
/// * `txid_hex` - The 64-character display txid.
///
/// # Returns
/// The 32 internal bytes, or a serialization error for bad hex or length.
pub fn txid_to_internal(txid_hex: &str) -> Result<[u8; 32], TransactionError> {
    let bytes = hex::decode(txid_hex)
        .map_err(|e| TransactionError::SerializationError(format!("invalid txid hex: {}", e)))?;
    if bytes.len() != 32 {
        return Err(TransactionError::SerializationError(format!(
            "txid is {} bytes, expected 32",
            bytes.len()
        )));
    }
    let mut out = [0u8; 32];
    for (i, b) in bytes.iter().rev().enumerate() {
        out[i] = *b;
    }
    Ok(out)
}
