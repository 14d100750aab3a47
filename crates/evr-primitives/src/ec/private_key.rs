//! secp256k1 private key for transaction signing.
//!
//! Wraps a k256 signing key. Key derivation, mnemonic handling, and
//! encrypted storage are the identity layer's concern and live outside
//! this SDK; this type only signs hashes and exposes its public key.

use k256::ecdsa::SigningKey;
use rand::rngs::OsRng;

use crate::ec::public_key::PublicKey;
use crate::ec::signature::Signature;
use crate::PrimitivesError;

/// Length of a serialized private key in bytes.
const PRIVATE_KEY_BYTES_LEN: usize = 32;

/// A secp256k1 private key.
#[derive(Clone)]
pub struct PrivateKey {
    /// The underlying k256 signing key.
    inner: SigningKey,
}

impl PrivateKey {
    /// Generate a new random private key using the OS random number generator.
    ///
    /// # Returns
    /// A new randomly generated `PrivateKey`.
    pub fn new() -> Self {
        PrivateKey {
            inner: SigningKey::random(&mut OsRng),
        }
    }

    /// Create a private key from a raw 32-byte scalar.
    ///
    /// # Arguments
    /// * `bytes` - A 32-byte slice representing the private key scalar.
    ///
    /// # Returns
    /// `Ok(PrivateKey)` if the bytes are a valid non-zero scalar on
    /// secp256k1, or an error otherwise.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        if bytes.len() != PRIVATE_KEY_BYTES_LEN {
            return Err(PrimitivesError::InvalidPrivateKey(format!(
                "expected {} bytes, got {}",
                PRIVATE_KEY_BYTES_LEN,
                bytes.len()
            )));
        }
        let signing_key = SigningKey::from_bytes(bytes.into())
            .map_err(|e| PrimitivesError::InvalidPrivateKey(e.to_string()))?;
        Ok(PrivateKey { inner: signing_key })
    }

    /// Create a private key from a 64-character hex string.
    ///
    /// # Arguments
    /// * `hex_str` - Hex encoding of the 32-byte scalar.
    ///
    /// # Returns
    /// `Ok(PrivateKey)` on success, or an error if the hex or scalar is invalid.
    pub fn from_hex(hex_str: &str) -> Result<Self, PrimitivesError> {
        let bytes =
            hex::decode(hex_str).map_err(|e| PrimitivesError::InvalidHex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Serialize the private key scalar to 32 bytes.
    ///
    /// # Returns
    /// The big-endian 32-byte scalar.
    pub fn to_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.inner.to_bytes());
        out
    }

    /// Return the corresponding public key.
    ///
    /// # Returns
    /// The `PublicKey` for this private key.
    pub fn pub_key(&self) -> PublicKey {
        PublicKey::from_verifying_key(*self.inner.verifying_key())
    }

    /// Sign a 32-byte hash with RFC6979 deterministic ECDSA.
    ///
    /// The resulting signature is low-S normalized, as required for
    /// standard transaction signatures.
    ///
    /// # Arguments
    /// * `hash` - The 32-byte digest to sign (typically a sighash).
    ///
    /// # Returns
    /// `Ok(Signature)` on success.
    pub fn sign(&self, hash: &[u8]) -> Result<Signature, PrimitivesError> {
        Signature::sign(hash, &self.inner)
    }
}

impl Default for PrivateKey {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PrivateKey {
    /// Debug output never reveals the scalar.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PrivateKey(..)")
    }
}

#[cfg(test)]
mod tests {
    //! Tests for private key construction and signing determinism.

    use super::*;

    /// A well-known scalar produces the expected compressed public key.
    #[test]
    fn test_known_key_pair() {
        // Scalar 1 maps to the curve generator point.
        let key = PrivateKey::from_hex(
            "0000000000000000000000000000000000000000000000000000000000000001",
        )
        .unwrap();
        assert_eq!(
            key.pub_key().to_hex(),
            "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798"
        );
    }

    /// A zero scalar is rejected.
    #[test]
    fn test_zero_scalar_rejected() {
        let result = PrivateKey::from_bytes(&[0u8; 32]);
        assert!(result.is_err());
    }

    /// Wrong-length input is rejected with a descriptive error.
    #[test]
    fn test_wrong_length_rejected() {
        assert!(PrivateKey::from_bytes(&[1u8; 31]).is_err());
        assert!(PrivateKey::from_bytes(&[1u8; 33]).is_err());
    }

    /// RFC6979 signing is deterministic: the same key and hash always
    /// produce the same signature.
    #[test]
    fn test_deterministic_signing() {
        let key = PrivateKey::from_hex(
            "c0ffee254729296a45a3885639ac7e10f9d54979a0791be45a81c6253e1e0c79",
        )
        .unwrap();
        let hash = crate::hash::sha256(b"deterministic");
        let sig1 = key.sign(&hash).unwrap();
        let sig2 = key.sign(&hash).unwrap();
        assert_eq!(sig1.to_der(), sig2.to_der());
        assert!(key.pub_key().verify(&hash, &sig1));
    }

    /// Serialization round-trips through to_bytes/from_bytes.
    #[test]
    fn test_bytes_roundtrip() {
        let key = PrivateKey::new();
        let restored = PrivateKey::from_bytes(&key.to_bytes()).unwrap();
        assert_eq!(key.pub_key().to_hex(), restored.pub_key().to_hex());
    }
}
