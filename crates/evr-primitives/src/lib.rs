#![deny(missing_docs)]

//! Cryptographic and serialization primitives for Evrmore-style chains.
//!
//! Provides the hash functions, secp256k1 key and signature types, and
//! binary reader/writer utilities that the script, transaction, and wallet
//! crates are built on.

pub mod ec;
pub mod hash;
pub mod util;

mod error;

pub use error::PrimitivesError;
