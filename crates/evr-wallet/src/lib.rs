#![deny(missing_docs)]

//! Transaction construction for Evrmore-style asset chains.
//!
//! The wallet core: deterministic coin selection over a snapshot of
//! unspent outputs, the transaction assembler and signer, the two-party
//! fee-delegation protocol (originator/completer), and the simplified
//! one-directional payment-channel flows.
//!
//! Key management and chain connectivity stay outside this crate behind
//! the [`Identity`] and [`ChainQuery`] traits.

pub mod builder;
pub mod chain;
pub mod channel;
pub mod identity;
pub mod partial;
pub mod selector;
pub mod snapshot;
pub mod types;
pub mod units;
pub mod wallet;

mod error;

#[cfg(test)]
pub(crate) mod testutil;

pub use chain::ChainQuery;
pub use error::{FeeDelegationError, WalletError};
pub use identity::{Identity, KeyIdentity};
pub use snapshot::UtxoSnapshot;
pub use types::{CompleterTerms, OutPoint, PartialTransfer, UnspentOutput};
pub use wallet::{Wallet, WalletConfig};
