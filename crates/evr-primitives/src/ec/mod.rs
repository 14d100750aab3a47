//! secp256k1 elliptic-curve types.
//!
//! Private keys, public keys, and ECDSA signatures with the DER and low-S
//! conventions required for transaction signatures on Evrmore-style chains.

pub mod private_key;
pub mod public_key;
pub mod signature;

pub use private_key::PrivateKey;
pub use public_key::PublicKey;
pub use signature::Signature;
