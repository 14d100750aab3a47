#![deny(missing_docs)]

//! Transaction construction and signing support for Evrmore-style chains.
//!
//! The `Transaction` type with standard wire serialization, the legacy
//! (pre-segwit) signature-hash algorithm the chain uses, and the fee
//! estimators the wallet's coin selection is built on.

pub mod fee;
pub mod input;
pub mod output;
pub mod sighash;
pub mod transaction;

mod error;

pub use error::TransactionError;
pub use input::{TransactionInput, DEFAULT_SEQUENCE_NUMBER};
pub use output::TransactionOutput;
pub use transaction::Transaction;
