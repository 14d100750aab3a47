use evr_script::ScriptError;
use evr_transaction::TransactionError;

/// Rejection reasons in the fee-delegation completer's verification.
///
/// Each maps to a rejected send, never to funds movement; verification is
/// fail-closed and stops at the first failing check.
#[derive(Debug, thiserror::Error)]
pub enum FeeDelegationError {
    /// The reported fee is implausible or the declared change output does
    /// not equal `fee_sats_reserved - reported_fee_sats`.
    #[error("fee mismatch: reported {reported} against reserved {reserved}")]
    FeeMismatch {
        /// The fee the originator reported.
        reported: u64,
        /// The fee reservation the completer committed to.
        reserved: u64,
    },
    /// No output pays the expected claim amount.
    #[error("claim mismatch: no output pays the expected fee claim")]
    ClaimMismatch,
    /// The claim output does not pay the completer's address.
    #[error("claim output does not pay the completer address")]
    ClaimAddressMismatch,
    /// The currency change output does not pay the agreed change address.
    #[error("change output does not pay the agreed change address")]
    ChangeAddressMismatch,
    /// No unspent output of exactly the reserved value exists.
    #[error("no reserved unspent output of exactly {sats} sats")]
    ReservedUtxoNotFound {
        /// The exact value the reservation promised.
        sats: u64,
    },
}

/// Error types for wallet operations, covering the full failure taxonomy
/// of the construction engine.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    /// Available currency or asset does not cover the target plus fees,
    /// including reserve violations.
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),
    /// A script could not be constructed (bad multisig bounds, memo
    /// length, timelock range, ambiguous timeout).
    #[error("script construction error: {0}")]
    ScriptConstruction(#[from] ScriptError),
    /// Signing produced an unlocking script that fails validation
    /// (excluding the tolerated asset-opcode case).
    #[error("script verification error: {0}")]
    ScriptVerification(ScriptError),
    /// A fee-delegation check failed; the partial transaction is rejected.
    #[error("fee delegation error: {0}")]
    FeeDelegation(#[from] FeeDelegationError),
    /// A channel commitment's remainder falls inside the dust zone.
    #[error("remainder {remainder} sats is inside the dust zone (threshold {threshold})")]
    DustZone {
        /// The channel remainder after the receiver payment.
        remainder: u64,
        /// The dust threshold the remainder fell under.
        threshold: u64,
    },
    /// The chain rejected a broadcast.
    #[error("broadcast rejected: {0}")]
    Broadcast(String),
    /// An entry point was called with invalid parameters (non-positive
    /// amount, malformed address, missing role parameters). Raised before
    /// any selection or signing side effect.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
    /// An underlying transaction error.
    #[error("transaction error: {0}")]
    Transaction(#[from] TransactionError),
}

impl WalletError {
    /// Whether a caller may retry this failure with adjusted parameters.
    ///
    /// `InsufficientFunds` and `DustZone` are recoverable; verification
    /// and fee-delegation failures reproduce identically on unchanged
    /// inputs and must not be retried automatically.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            WalletError::InsufficientFunds(_) | WalletError::DustZone { .. }
        )
    }
}
