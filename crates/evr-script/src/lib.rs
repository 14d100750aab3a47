#![deny(missing_docs)]

//! Script construction and inspection for Evrmore-style chains.
//!
//! Provides the `Script` type with chunk-level decoding, Base58Check
//! addresses, the asset-tag payload codec, builders for every script shape
//! the wallet emits (P2PKH, P2SH multisig, timelocked channel redeem
//! scripts, null-data memos, asset-tagged outputs), and a structural spend
//! verifier used as a post-signing sanity check.

pub mod address;
pub mod asset;
pub mod build;
pub mod chunk;
pub mod opcodes;
pub mod script;
pub mod scriptnum;
pub mod verify;

mod error;

pub use address::{Address, AddressKind, Network};
pub use asset::{AssetPayload, AssetSymbol};
pub use build::ChannelTimeout;
pub use chunk::ScriptChunk;
pub use error::ScriptError;
pub use script::Script;
