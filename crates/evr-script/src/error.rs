/// Error types for script operations.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// A hex string could not be decoded.
    #[error("invalid hex: {0}")]
    InvalidHex(String),
    /// Script bytes ended inside a push operation.
    #[error("script data too small")]
    DataTooSmall,
    /// A push exceeds the maximum encodable size.
    #[error("push data too large: {0} bytes")]
    PushTooLarge(usize),
    /// A push-data opcode was passed where a plain opcode was expected.
    #[error("invalid opcode type: {0}")]
    InvalidOpcodeType(String),
    /// The script is not a P2PKH locking script.
    #[error("script is not P2PKH")]
    NotP2pkh,
    /// The script is not a P2SH locking script.
    #[error("script is not P2SH")]
    NotP2sh,
    /// An address string failed Base58 decoding.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    /// An address decoded to the wrong payload length.
    #[error("invalid address length for '{0}'")]
    InvalidAddressLength(String),
    /// An address checksum did not match.
    #[error("address checksum failed")]
    ChecksumFailed,
    /// An address version byte is not recognized.
    #[error("unsupported address '{0}'")]
    UnsupportedAddress(String),
    /// A multisig redeem script was requested with an invalid threshold.
    #[error("required signatures must be between 1 and {keys}, got {required}")]
    InvalidSignatureCount {
        /// The requested signature threshold.
        required: usize,
        /// The number of public keys supplied.
        keys: usize,
    },
    /// A memo's byte length is outside the permitted (4, 80) open interval.
    #[error("memo length {0} out of range (must be 5..=79 bytes)")]
    MemoLength(usize),
    /// A timelock value is outside its permitted range.
    #[error("timelock out of range: {0}")]
    TimelockOutOfRange(String),
    /// An absolute timeout below 500,000,000 is ambiguous between a block
    /// height and a Unix timestamp.
    #[error("timestamp {0} is ambiguous (must be >= 500,000,000)")]
    AmbiguousTimestamp(u64),
    /// An asset-tag payload could not be decoded.
    #[error("invalid asset payload: {0}")]
    InvalidAssetPayload(String),
    /// The spend verifier encountered an opcode it does not execute.
    #[error("unsupported opcode 0x{0:02x}")]
    UnsupportedOpcode(u8),
    /// The unlocking script does not satisfy the locking script.
    #[error("script verification failed: {0}")]
    VerificationFailed(String),
    /// An underlying primitives error.
    #[error("primitives error: {0}")]
    Primitives(#[from] evr_primitives::PrimitivesError),
}

impl ScriptError {
    /// Whether this error is the tolerated asset-tag verification failure.
    ///
    /// The structural verifier does not execute the asset-tag extension
    /// opcode; signing callers treat exactly this failure as success.
    pub fn is_asset_opcode(&self) -> bool {
        matches!(
            self,
            ScriptError::UnsupportedOpcode(op) if *op == crate::opcodes::OP_EVR_ASSET
        )
    }
}
