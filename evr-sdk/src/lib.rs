#![deny(missing_docs)]

//! Evrmore-style chain SDK - complete SDK.
//!
//! Re-exports all SDK components for convenient single-crate usage.

pub use evr_primitives as primitives;
pub use evr_script as script;
pub use evr_transaction as transaction;
pub use evr_wallet as wallet;
