//! ECDSA signature with DER serialization and RFC6979 deterministic nonces.
//!
//! Transaction signatures are DER-encoded with a sighash flag byte appended
//! by the caller. S components are normalized to the low half of the curve
//! order, matching the canonical-signature rule relay nodes enforce.

use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::ecdsa::{self, SigningKey};

use crate::PrimitivesError;

/// An ECDSA signature with R and S components.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    /// The R component (32 bytes, big-endian).
    r: [u8; 32],
    /// The S component (32 bytes, big-endian).
    s: [u8; 32],
}

impl Signature {
    /// Create a signature from raw R and S 32-byte arrays.
    ///
    /// # Arguments
    /// * `r` - The R component (32 bytes, big-endian).
    /// * `s` - The S component (32 bytes, big-endian).
    ///
    /// # Returns
    /// A new `Signature` with the given components.
    pub fn new(r: [u8; 32], s: [u8; 32]) -> Self {
        Signature { r, s }
    }

    /// Sign a 32-byte hash with the given key using RFC6979 nonces.
    ///
    /// The result is low-S normalized.
    ///
    /// # Arguments
    /// * `hash` - The 32-byte digest to sign.
    /// * `key` - The k256 signing key.
    ///
    /// # Returns
    /// `Ok(Signature)` on success.
    pub fn sign(hash: &[u8], key: &SigningKey) -> Result<Self, PrimitivesError> {
        let sig: ecdsa::Signature = key
            .sign_prehash(hash)
            .map_err(|e| PrimitivesError::InvalidSignature(e.to_string()))?;
        let sig = sig.normalize_s().unwrap_or(sig);
        let (r_bytes, s_bytes) = sig.split_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&r_bytes);
        s.copy_from_slice(&s_bytes);
        Ok(Signature { r, s })
    }

    /// Access the R component.
    pub fn r(&self) -> &[u8; 32] {
        &self.r
    }

    /// Access the S component.
    pub fn s(&self) -> &[u8; 32] {
        &self.s
    }

    /// Parse a DER-encoded ECDSA signature.
    ///
    /// Expected layout: `0x30 <len> 0x02 <r_len> <r> 0x02 <s_len> <s>`.
    /// Trailing bytes (such as an appended sighash flag) are not permitted;
    /// callers strip the flag byte before parsing.
    ///
    /// # Arguments
    /// * `bytes` - DER-encoded signature bytes.
    ///
    /// # Returns
    /// `Ok(Signature)` on success, or an error if the encoding is malformed.
    pub fn from_der(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        if bytes.len() < 8 {
            return Err(PrimitivesError::InvalidSignature(
                "malformed signature: too short".to_string(),
            ));
        }
        if bytes[0] != 0x30 {
            return Err(PrimitivesError::InvalidSignature(
                "malformed signature: no header magic".to_string(),
            ));
        }
        let sig_len = bytes[1] as usize;
        if sig_len + 2 != bytes.len() {
            return Err(PrimitivesError::InvalidSignature(
                "malformed signature: bad length".to_string(),
            ));
        }

        let mut idx = 2;

        // R component
        if bytes[idx] != 0x02 {
            return Err(PrimitivesError::InvalidSignature(
                "malformed signature: no 1st int marker".to_string(),
            ));
        }
        idx += 1;
        let r_len = bytes[idx] as usize;
        idx += 1;
        if r_len == 0 || idx + r_len + 2 > bytes.len() {
            return Err(PrimitivesError::InvalidSignature(
                "malformed signature: bogus R length".to_string(),
            ));
        }
        let r_bytes = &bytes[idx..idx + r_len];
        idx += r_len;

        // S component
        if bytes[idx] != 0x02 {
            return Err(PrimitivesError::InvalidSignature(
                "malformed signature: no 2nd int marker".to_string(),
            ));
        }
        idx += 1;
        let s_len = bytes[idx] as usize;
        idx += 1;
        if s_len == 0 || idx + s_len != bytes.len() {
            return Err(PrimitivesError::InvalidSignature(
                "malformed signature: bogus S length".to_string(),
            ));
        }
        let s_bytes = &bytes[idx..idx + s_len];

        Ok(Signature {
            r: to_32_bytes(r_bytes)?,
            s: to_32_bytes(s_bytes)?,
        })
    }

    /// Encode this signature in DER format.
    ///
    /// Leading zero bytes are stripped from each component and a zero byte
    /// is prepended when the most significant bit is set, per DER integer
    /// encoding rules.
    ///
    /// # Returns
    /// The DER-encoded signature bytes (without any sighash flag).
    pub fn to_der(&self) -> Vec<u8> {
        let r = der_integer(&self.r);
        let s = der_integer(&self.s);

        let mut out = Vec::with_capacity(6 + r.len() + s.len());
        out.push(0x30);
        out.push((4 + r.len() + s.len()) as u8);
        out.push(0x02);
        out.push(r.len() as u8);
        out.extend_from_slice(&r);
        out.push(0x02);
        out.push(s.len() as u8);
        out.extend_from_slice(&s);
        out
    }

    /// Convert to a k256 signature for verification.
    pub(crate) fn to_k256(&self) -> Result<ecdsa::Signature, PrimitivesError> {
        ecdsa::Signature::from_scalars(self.r, self.s)
            .map_err(|e| PrimitivesError::InvalidSignature(e.to_string()))
    }
}

/// Left-pad a DER integer of up to 33 bytes into a fixed 32-byte array.
///
/// DER integers may carry one leading zero byte (to clear the sign bit) or
/// be shorter than 32 bytes; both forms normalize to the same scalar.
fn to_32_bytes(bytes: &[u8]) -> Result<[u8; 32], PrimitivesError> {
    let trimmed = if bytes.len() == 33 && bytes[0] == 0x00 {
        &bytes[1..]
    } else {
        bytes
    };
    if trimmed.len() > 32 {
        return Err(PrimitivesError::InvalidSignature(
            "signature component exceeds 32 bytes".to_string(),
        ));
    }
    let mut out = [0u8; 32];
    out[32 - trimmed.len()..].copy_from_slice(trimmed);
    Ok(out)
}

/// Encode a 32-byte big-endian scalar as a minimal DER integer body.
fn der_integer(bytes: &[u8; 32]) -> Vec<u8> {
    let first_nonzero = bytes.iter().position(|&b| b != 0).unwrap_or(31);
    let trimmed = &bytes[first_nonzero..];
    let mut out = Vec::with_capacity(trimmed.len() + 1);
    if trimmed[0] & 0x80 != 0 {
        out.push(0x00);
    }
    out.extend_from_slice(trimmed);
    out
}

#[cfg(test)]
mod tests {
    //! Tests for DER encoding/decoding and low-S signing.

    use super::*;

    /// DER encoding round-trips through from_der.
    #[test]
    fn test_der_roundtrip() {
        let bytes =
            hex::decode("c0ffee254729296a45a3885639ac7e10f9d54979a0791be45a81c6253e1e0c79")
                .unwrap();
        let key = SigningKey::from_bytes(bytes.as_slice().into()).unwrap();
        let hash = crate::hash::sha256(b"roundtrip");
        let sig = Signature::sign(&hash, &key).unwrap();
        let der = sig.to_der();
        let parsed = Signature::from_der(&der).unwrap();
        assert_eq!(sig, parsed);
    }

    /// A high-MSB component gets the DER zero-pad byte and still round-trips.
    #[test]
    fn test_der_high_bit_padding() {
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r[0] = 0x80;
        s[31] = 0x01;
        let sig = Signature::new(r, s);
        let der = sig.to_der();
        // 0x30 len 0x02 33 (00 80 ..30 zeros..) 0x02 1 01
        assert_eq!(der[3], 33);
        assert_eq!(Signature::from_der(&der).unwrap(), sig);
    }

    /// Malformed DER inputs are rejected.
    #[test]
    fn test_from_der_malformed() {
        assert!(Signature::from_der(&[]).is_err());
        assert!(Signature::from_der(&[0x31, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x01]).is_err());
        let mut valid = Signature::new([1u8; 32], [2u8; 32]).to_der();
        valid.push(0x01); // trailing sighash byte is the caller's to strip
        assert!(Signature::from_der(&valid).is_err());
    }

    /// Signing always produces a low-S signature accepted by k256.
    #[test]
    fn test_low_s() {
        let bytes =
            hex::decode("0000000000000000000000000000000000000000000000000000000000000001")
                .unwrap();
        let key = SigningKey::from_bytes(bytes.as_slice().into()).unwrap();
        for i in 0u8..8 {
            let hash = crate::hash::sha256(&[i]);
            let sig = Signature::sign(&hash, &key).unwrap();
            let k = sig.to_k256().unwrap();
            assert!(k.normalize_s().is_none(), "signature was not low-S");
        }
    }
}
