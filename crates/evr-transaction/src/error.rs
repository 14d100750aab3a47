/// Error types for transaction operations.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// The transaction structure is invalid (e.g. an index out of range).
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),
    /// An error occurred while computing a signature hash or signing.
    #[error("signing error: {0}")]
    SigningError(String),
    /// An error occurred during binary/hex serialization or deserialization.
    #[error("serialization error: {0}")]
    SerializationError(String),
    /// An underlying script error (forwarded from `evr-script`).
    #[error("script error: {0}")]
    Script(#[from] evr_script::ScriptError),
    /// An underlying primitives error (forwarded from `evr-primitives`).
    #[error("primitives error: {0}")]
    Primitives(#[from] evr_primitives::PrimitivesError),
}
