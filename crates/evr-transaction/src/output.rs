//! Transaction output: a satoshi value and a locking script.
//!
//! Asset-tagged outputs always carry a zero satoshi value; the transferred
//! amount lives inside the script's asset payload.

use evr_primitives::util::{TxReader, TxWriter, VarInt};
use evr_script::asset::split_asset_script;
use evr_script::{AssetPayload, Script};

use crate::TransactionError;

/// A single output in a transaction.
///
/// # Wire format
///
/// | Field         | Size          |
/// |---------------|---------------|
/// | satoshis      | 8 bytes (LE)  |
/// | script length | VarInt        |
/// | locking script| variable      |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionOutput {
    /// The base-currency value in satoshis. Zero for asset-tagged outputs.
    pub satoshis: u64,

    /// The locking script (scriptPubKey).
    pub locking_script: Script,
}

impl TransactionOutput {
    /// Create an output with the given value and locking script.
    pub fn new(satoshis: u64, locking_script: Script) -> Self {
        TransactionOutput {
            satoshis,
            locking_script,
        }
    }

    /// Deserialize an output from a `TxReader`.
    ///
    /// # Arguments
    /// * `reader` - The reader positioned at the start of an encoded output.
    ///
    /// # Returns
    /// `Ok(TransactionOutput)` on success, or a serialization error.
    pub fn read_from(reader: &mut TxReader) -> Result<Self, TransactionError> {
        let satoshis = reader.read_u64_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading output value: {}", e))
        })?;

        let script_len = reader.read_varint().map_err(|e| {
            TransactionError::SerializationError(format!("reading script length: {}", e))
        })?;

        let script_bytes = reader.read_bytes(script_len.value() as usize).map_err(|e| {
            TransactionError::SerializationError(format!("reading locking script: {}", e))
        })?;

        Ok(TransactionOutput {
            satoshis,
            locking_script: Script::from_bytes(script_bytes),
        })
    }

    /// Serialize this output into a `TxWriter`.
    ///
    /// # Arguments
    /// * `writer` - The destination writer.
    pub fn write_to(&self, writer: &mut TxWriter) {
        writer.write_u64_le(self.satoshis);
        writer.write_varint(VarInt::from(self.locking_script.len()));
        writer.write_bytes(self.locking_script.to_bytes());
    }

    /// Decode the asset payload if this output is asset-tagged.
    ///
    /// # Returns
    /// `Some(payload)` for well-formed asset outputs, `None` for plain
    /// currency outputs or malformed tags.
    pub fn asset_payload(&self) -> Option<AssetPayload> {
        split_asset_script(&self.locking_script)
            .ok()
            .flatten()
            .map(|(_, payload)| payload)
    }
}
