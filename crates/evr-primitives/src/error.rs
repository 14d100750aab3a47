/// Error types for primitive operations.
#[derive(Debug, thiserror::Error)]
pub enum PrimitivesError {
    /// A private key scalar was zero, out of range, or the wrong length.
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),
    /// A public key was not a valid point on secp256k1.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),
    /// A signature was malformed or its components were out of range.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
    /// A hex string could not be decoded.
    #[error("invalid hex: {0}")]
    InvalidHex(String),
    /// A binary read ran past the end of the available data.
    #[error("unexpected end of data: wanted {wanted} bytes, {remaining} remaining")]
    UnexpectedEndOfData {
        /// Number of bytes the read required.
        wanted: usize,
        /// Number of bytes left in the buffer.
        remaining: usize,
    },
}
