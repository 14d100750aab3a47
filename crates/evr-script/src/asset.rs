//! The asset-tag payload codec.
//!
//! An asset-tagged output is a base locking script followed by
//! `OP_EVR_ASSET <payload> OP_DROP`, where the payload is:
//!
//! | Field    | Size        | Content                               |
//! |----------|-------------|---------------------------------------|
//! | symbol   | 3 bytes     | chain ticker, e.g. "evr"              |
//! | type     | 1 byte      | 0x74 ('t'), a transfer                |
//! | name len | 1 byte      | length of the asset name              |
//! | name     | `len` bytes | asset name, e.g. "SATORI"             |
//! | amount   | <= 8 bytes  | little-endian sats, zero-padded to 8  |
//!
//! Every consumer that inspects outputs (fee-claim verification, change
//! accounting, channel-script detection) parses this exact layout, so
//! encode/decode must round-trip byte-exactly. Encoding always pads the
//! amount to 8 bytes; decoding tolerates stripped trailing zeros because
//! chain nodes emit the short form.

use crate::opcodes::{OP_DROP, OP_EVR_ASSET};
use crate::{Script, ScriptError};

/// The transfer type marker byte ('t').
const TRANSFER_TYPE: u8 = 0x74;

/// The chain ticker embedded in an asset-tag payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetSymbol {
    /// Evrmore ("evr").
    Evr,
    /// Ravencoin ("rvn").
    Rvn,
}

impl AssetSymbol {
    /// The 3-byte ticker for this symbol.
    pub fn bytes(&self) -> &'static [u8; 3] {
        match self {
            AssetSymbol::Evr => b"evr",
            AssetSymbol::Rvn => b"rvn",
        }
    }

    /// Parse a 3-byte ticker.
    ///
    /// # Arguments
    /// * `bytes` - The ticker bytes from a payload.
    ///
    /// # Returns
    /// The matching symbol, or an error for unknown tickers.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ScriptError> {
        match bytes {
            b"evr" => Ok(AssetSymbol::Evr),
            b"rvn" => Ok(AssetSymbol::Rvn),
            other => Err(ScriptError::InvalidAssetPayload(format!(
                "unknown chain symbol {:?}",
                String::from_utf8_lossy(other)
            ))),
        }
    }
}

/// A decoded asset-tag payload: chain symbol, asset name, amount in sats.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetPayload {
    /// The chain ticker.
    pub symbol: AssetSymbol,
    /// The asset name (e.g. "SATORI").
    pub name: String,
    /// The transferred amount in minimal units.
    pub amount_sats: u64,
}

impl AssetPayload {
    /// Create a payload, validating the asset name length.
    ///
    /// # Arguments
    /// * `symbol` - The chain ticker.
    /// * `name` - The asset name; 1..=255 bytes.
    /// * `amount_sats` - The amount in minimal units.
    ///
    /// # Returns
    /// The payload, or an error if the name is empty or too long.
    pub fn new(symbol: AssetSymbol, name: &str, amount_sats: u64) -> Result<Self, ScriptError> {
        if name.is_empty() || name.len() > 255 {
            return Err(ScriptError::InvalidAssetPayload(format!(
                "asset name length {} out of range",
                name.len()
            )));
        }
        Ok(AssetPayload {
            symbol,
            name: name.to_string(),
            amount_sats,
        })
    }

    /// Encode this payload to its wire bytes.
    ///
    /// The amount is always padded to the full 8 little-endian bytes.
    ///
    /// # Returns
    /// The payload bytes.
    pub fn encode(&self) -> Vec<u8> {
        let name_bytes = self.name.as_bytes();
        let mut out = Vec::with_capacity(5 + name_bytes.len() + 8);
        out.extend_from_slice(self.symbol.bytes());
        out.push(TRANSFER_TYPE);
        out.push(name_bytes.len() as u8);
        out.extend_from_slice(name_bytes);
        out.extend_from_slice(&self.amount_sats.to_le_bytes());
        out
    }

    /// Decode a payload from its wire bytes.
    ///
    /// Accepts amounts of fewer than 8 bytes (trailing zeros stripped by
    /// the emitting node); more than 8 amount bytes is an error.
    ///
    /// # Arguments
    /// * `bytes` - The payload bytes from between OP_EVR_ASSET and OP_DROP.
    ///
    /// # Returns
    /// The decoded payload, or an error describing the malformation.
    pub fn decode(bytes: &[u8]) -> Result<Self, ScriptError> {
        if bytes.len() < 5 {
            return Err(ScriptError::InvalidAssetPayload(
                "payload too short".to_string(),
            ));
        }
        let symbol = AssetSymbol::from_bytes(&bytes[..3])?;
        if bytes[3] != TRANSFER_TYPE {
            return Err(ScriptError::InvalidAssetPayload(format!(
                "unknown type marker 0x{:02x}",
                bytes[3]
            )));
        }
        let name_len = bytes[4] as usize;
        if bytes.len() < 5 + name_len {
            return Err(ScriptError::InvalidAssetPayload(
                "truncated asset name".to_string(),
            ));
        }
        let name = String::from_utf8(bytes[5..5 + name_len].to_vec()).map_err(|_| {
            ScriptError::InvalidAssetPayload("asset name is not UTF-8".to_string())
        })?;

        let amount_bytes = &bytes[5 + name_len..];
        if amount_bytes.len() > 8 {
            return Err(ScriptError::InvalidAssetPayload(format!(
                "amount field is {} bytes",
                amount_bytes.len()
            )));
        }
        let mut buf = [0u8; 8];
        buf[..amount_bytes.len()].copy_from_slice(amount_bytes);

        Ok(AssetPayload {
            symbol,
            name,
            amount_sats: u64::from_le_bytes(buf),
        })
    }
}

/// Append an asset tag to a base locking script.
///
/// Produces `<base> OP_EVR_ASSET <payload> OP_DROP`. The base-currency
/// value of an output carrying this script is always zero; the amount
/// lives in the payload.
///
/// # Arguments
/// * `base` - The base P2PKH or P2SH locking script.
/// * `payload` - The asset payload to embed.
///
/// # Returns
/// The tagged script.
pub fn asset_script(base: &Script, payload: &AssetPayload) -> Result<Script, ScriptError> {
    let mut script = Script::from_bytes(base.to_bytes());
    script.append_opcodes(&[OP_EVR_ASSET])?;
    script.append_push_data(&payload.encode())?;
    script.append_opcodes(&[OP_DROP])?;
    Ok(script)
}

/// Split an asset-tagged script into its base script and payload.
///
/// # Arguments
/// * `script` - A locking script that may carry an asset tag.
///
/// # Returns
/// `Ok(Some((base, payload)))` for tagged scripts, `Ok(None)` for plain
/// scripts, or an error if the tag is malformed.
pub fn split_asset_script(
    script: &Script,
) -> Result<Option<(Script, AssetPayload)>, ScriptError> {
    let bytes = script.to_bytes();
    let mut pos = 0;

    while pos < bytes.len() {
        let op = bytes[pos];
        if op == OP_EVR_ASSET {
            let base = Script::from_bytes(&bytes[..pos]);
            let tail = Script::from_bytes(&bytes[pos + 1..]);
            let chunks = tail.chunks()?;
            let payload_chunk = chunks
                .first()
                .and_then(|c| c.data.as_deref())
                .ok_or_else(|| {
                    ScriptError::InvalidAssetPayload("missing payload push".to_string())
                })?;
            if chunks.get(1).map(|c| c.op) != Some(OP_DROP) {
                return Err(ScriptError::InvalidAssetPayload(
                    "missing OP_DROP after payload".to_string(),
                ));
            }
            let payload = AssetPayload::decode(payload_chunk)?;
            return Ok(Some((base, payload)));
        }
        pos = advance_one(bytes, pos)?;
    }

    Ok(None)
}

/// Advance past one opcode or push operation starting at `pos`.
fn advance_one(bytes: &[u8], pos: usize) -> Result<usize, ScriptError> {
    use crate::opcodes::{OP_DATA_1, OP_DATA_75, OP_PUSHDATA1, OP_PUSHDATA2, OP_PUSHDATA4};

    let op = bytes[pos];
    let next = match op {
        OP_PUSHDATA1 => {
            if bytes.len() < pos + 2 {
                return Err(ScriptError::DataTooSmall);
            }
            pos + 2 + bytes[pos + 1] as usize
        }
        OP_PUSHDATA2 => {
            if bytes.len() < pos + 3 {
                return Err(ScriptError::DataTooSmall);
            }
            pos + 3 + u16::from_le_bytes([bytes[pos + 1], bytes[pos + 2]]) as usize
        }
        OP_PUSHDATA4 => {
            if bytes.len() < pos + 5 {
                return Err(ScriptError::DataTooSmall);
            }
            pos + 5
                + u32::from_le_bytes([
                    bytes[pos + 1],
                    bytes[pos + 2],
                    bytes[pos + 3],
                    bytes[pos + 4],
                ]) as usize
        }
        _ if (OP_DATA_1..=OP_DATA_75).contains(&op) => pos + 1 + op as usize,
        _ => pos + 1,
    };
    if next > bytes.len() {
        return Err(ScriptError::DataTooSmall);
    }
    Ok(next)
}
