//! The signing collaborator.
//!
//! Key derivation, mnemonics, and encrypted storage live outside this
//! crate; the wallet only needs a party that can sign sighashes and state
//! its public key and address.

use evr_primitives::ec::{PrivateKey, PublicKey, Signature};
use evr_script::{Address, Network};

use crate::WalletError;

/// A party able to sign signature hashes.
pub trait Identity {
    /// Sign a 32-byte signature hash.
    ///
    /// # Arguments
    /// * `sighash` - The digest to sign.
    ///
    /// # Returns
    /// The ECDSA signature (DER encoding and flag byte are the caller's).
    fn sign(&self, sighash: &[u8; 32]) -> Result<Signature, WalletError>;

    /// The public key this identity signs with.
    fn public_key(&self) -> PublicKey;

    /// The P2PKH address of the public key.
    fn address(&self) -> Address;
}

/// An in-memory identity over a raw private key.
///
/// Suitable for tests and for callers that manage key material themselves.
pub struct KeyIdentity {
    key: PrivateKey,
    network: Network,
}

impl KeyIdentity {
    /// Create an identity from a private key.
    ///
    /// # Arguments
    /// * `key` - The signing key.
    /// * `network` - The network its address lives on.
    pub fn new(key: PrivateKey, network: Network) -> Self {
        KeyIdentity { key, network }
    }

    /// Generate a fresh random identity.
    ///
    /// # Arguments
    /// * `network` - The network its address lives on.
    pub fn random(network: Network) -> Self {
        KeyIdentity {
            key: PrivateKey::new(),
            network,
        }
    }
}

impl Identity for KeyIdentity {
    fn sign(&self, sighash: &[u8; 32]) -> Result<Signature, WalletError> {
        self.key
            .sign(sighash)
            .map_err(|e| WalletError::InvalidParams(format!("signing failed: {}", e)))
    }

    fn public_key(&self) -> PublicKey {
        self.key.pub_key()
    }

    fn address(&self) -> Address {
        Address::from_public_key(&self.key.pub_key(), self.network)
    }
}

#[cfg(test)]
mod tests {
    //! Tests for the key-backed identity.

    use super::*;

    /// Signatures from the identity verify under its own public key.
    #[test]
    fn test_sign_verify() {
        let identity = KeyIdentity::random(Network::Mainnet);
        let hash = [0x5au8; 32];
        let sig = identity.sign(&hash).unwrap();
        assert!(identity.public_key().verify(&hash, &sig));
    }

    /// The address commits to the public key's hash160 on the right network.
    #[test]
    fn test_address_derivation() {
        let identity = KeyIdentity::random(Network::Mainnet);
        let address = identity.address();
        assert_eq!(address.hash, identity.public_key().hash160());
        assert!(address.address_string.starts_with('E'));
    }
}
