//! Script chunk parsing and encoding.
//!
//! A script chunk is either an opcode or a data push with its bytes. This
//! module decodes raw script bytes into structured chunks and produces the
//! minimal push prefix for encoding data.

use crate::opcodes::*;
use crate::ScriptError;

/// A single parsed element of a script.
///
/// Either a standalone opcode (like OP_DUP) or a data push carrying the
/// push opcode byte and the pushed data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptChunk {
    /// The opcode byte. For direct pushes (1-75 bytes) this is the length.
    pub op: u8,
    /// The data payload, present for push operations.
    pub data: Option<Vec<u8>>,
}

impl ScriptChunk {
    /// Render this chunk for ASM output.
    ///
    /// Pushes render as hex, other opcodes by name.
    ///
    /// # Returns
    /// A token suitable for a space-separated ASM string.
    pub fn to_asm_string(&self) -> String {
        match &self.data {
            Some(data) => hex::encode(data),
            None => opcode_to_string(self.op).to_string(),
        }
    }
}

/// Decode raw script bytes into a vector of `ScriptChunk` values.
///
/// Handles direct pushes (0x01-0x4b) and OP_PUSHDATA1/2/4. OP_RETURN is a
/// plain opcode here: memo data on this chain is carried in an ordinary
/// push following it.
///
/// # Arguments
/// * `bytes` - The raw script bytes to decode.
///
/// # Returns
/// The parsed chunks, or `ScriptError::DataTooSmall` if a push runs past
/// the end of the script.
pub fn decode_script(bytes: &[u8]) -> Result<Vec<ScriptChunk>, ScriptError> {
    let mut chunks = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let op = bytes[pos];

        let length = match op {
            OP_PUSHDATA1 => {
                if bytes.len() < pos + 2 {
                    return Err(ScriptError::DataTooSmall);
                }
                let length = bytes[pos + 1] as usize;
                pos += 2;
                Some(length)
            }
            OP_PUSHDATA2 => {
                if bytes.len() < pos + 3 {
                    return Err(ScriptError::DataTooSmall);
                }
                let length = u16::from_le_bytes([bytes[pos + 1], bytes[pos + 2]]) as usize;
                pos += 3;
                Some(length)
            }
            OP_PUSHDATA4 => {
                if bytes.len() < pos + 5 {
                    return Err(ScriptError::DataTooSmall);
                }
                let length = u32::from_le_bytes([
                    bytes[pos + 1],
                    bytes[pos + 2],
                    bytes[pos + 3],
                    bytes[pos + 4],
                ]) as usize;
                pos += 5;
                Some(length)
            }
            _ if (OP_DATA_1..=OP_DATA_75).contains(&op) => {
                pos += 1;
                Some(op as usize)
            }
            _ => {
                pos += 1;
                None
            }
        };

        match length {
            Some(length) => {
                if bytes.len() < pos + length {
                    return Err(ScriptError::DataTooSmall);
                }
                let data = bytes[pos..pos + length].to_vec();
                chunks.push(ScriptChunk {
                    op,
                    data: Some(data),
                });
                pos += length;
            }
            None => chunks.push(ScriptChunk { op, data: None }),
        }
    }

    Ok(chunks)
}

/// Produce the minimal push prefix for data of the given length.
///
/// Direct push for 1-75 bytes, OP_PUSHDATA1 for up to 255, OP_PUSHDATA2
/// for up to 65535, OP_PUSHDATA4 beyond that.
///
/// # Arguments
/// * `length` - The number of data bytes being pushed.
///
/// # Returns
/// The prefix bytes, or `ScriptError::PushTooLarge` past the u32 limit.
pub fn push_data_prefix(length: usize) -> Result<Vec<u8>, ScriptError> {
    if length <= OP_DATA_75 as usize {
        Ok(vec![length as u8])
    } else if length <= 0xff {
        Ok(vec![OP_PUSHDATA1, length as u8])
    } else if length <= 0xffff {
        let mut prefix = vec![OP_PUSHDATA2];
        prefix.extend_from_slice(&(length as u16).to_le_bytes());
        Ok(prefix)
    } else if length <= 0xffff_ffff {
        let mut prefix = vec![OP_PUSHDATA4];
        prefix.extend_from_slice(&(length as u32).to_le_bytes());
        Ok(prefix)
    } else {
        Err(ScriptError::PushTooLarge(length))
    }
}
