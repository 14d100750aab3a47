//! secp256k1 public key with address-oriented helpers.

use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::VerifyingKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;

use crate::ec::signature::Signature;
use crate::hash::hash160;
use crate::PrimitivesError;

/// Length of a compressed SEC1 public key in bytes.
pub const COMPRESSED_LEN: usize = 33;

/// A secp256k1 public key.
///
/// Serializes to the 33-byte compressed SEC1 form used in unlocking
/// scripts and redeem scripts.
#[derive(Clone, Debug)]
pub struct PublicKey {
    /// The underlying k256 verifying key.
    inner: VerifyingKey,
}

impl PartialEq for PublicKey {
    /// Keys are equal when their compressed encodings are.
    fn eq(&self, other: &Self) -> bool {
        self.to_compressed() == other.to_compressed()
    }
}

impl Eq for PublicKey {}

impl PublicKey {
    /// Wrap an existing k256 verifying key.
    pub(crate) fn from_verifying_key(inner: VerifyingKey) -> Self {
        PublicKey { inner }
    }

    /// Parse a SEC1-encoded public key (compressed or uncompressed).
    ///
    /// # Arguments
    /// * `bytes` - 33-byte compressed or 65-byte uncompressed point encoding.
    ///
    /// # Returns
    /// `Ok(PublicKey)` if the bytes encode a valid curve point.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        let inner = VerifyingKey::from_sec1_bytes(bytes)
            .map_err(|e| PrimitivesError::InvalidPublicKey(e.to_string()))?;
        Ok(PublicKey { inner })
    }

    /// Parse a hex-encoded SEC1 public key.
    ///
    /// # Arguments
    /// * `hex_str` - Hex encoding of the point.
    ///
    /// # Returns
    /// `Ok(PublicKey)` on success, or an error if the hex or point is invalid.
    pub fn from_hex(hex_str: &str) -> Result<Self, PrimitivesError> {
        let bytes =
            hex::decode(hex_str).map_err(|e| PrimitivesError::InvalidHex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Serialize to the 33-byte compressed SEC1 form.
    ///
    /// # Returns
    /// The compressed point bytes.
    pub fn to_compressed(&self) -> [u8; COMPRESSED_LEN] {
        let point = self.inner.to_encoded_point(true);
        let mut out = [0u8; COMPRESSED_LEN];
        out.copy_from_slice(point.as_bytes());
        out
    }

    /// Serialize to lowercase hex of the compressed form.
    ///
    /// # Returns
    /// A 66-character hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_compressed())
    }

    /// Compute the Hash160 of the compressed public key.
    ///
    /// This is the 20-byte value embedded in P2PKH locking scripts.
    ///
    /// # Returns
    /// The 20-byte hash160 digest.
    pub fn hash160(&self) -> [u8; 20] {
        hash160(&self.to_compressed())
    }

    /// Verify an ECDSA signature over a 32-byte hash.
    ///
    /// # Arguments
    /// * `hash` - The digest that was signed.
    /// * `sig` - The signature to check.
    ///
    /// # Returns
    /// `true` if the signature is valid for this key.
    pub fn verify(&self, hash: &[u8], sig: &Signature) -> bool {
        let k256_sig = match sig.to_k256() {
            Ok(s) => s,
            Err(_) => return false,
        };
        self.inner.verify_prehash(hash, &k256_sig).is_ok()
    }
}
