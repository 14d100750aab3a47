//! Base58Check address handling for Evrmore-style chains.
//!
//! Supports P2PKH and P2SH addresses on mainnet and testnet. Mainnet
//! P2PKH addresses use version byte 0x21 (leading 'E'), mainnet P2SH
//! 0x5c (leading 'e'); testnet uses the Bitcoin-family 0x6f/0xc4 pair.

use std::fmt;

use evr_primitives::ec::PublicKey;
use evr_primitives::hash::{hash160, sha256d};

use crate::build;
use crate::{Script, ScriptError};

/// Mainnet P2PKH address version byte.
const MAINNET_P2PKH: u8 = 0x21;
/// Mainnet P2SH address version byte.
const MAINNET_P2SH: u8 = 0x5c;
/// Testnet P2PKH address version byte.
const TESTNET_P2PKH: u8 = 0x6f;
/// Testnet P2SH address version byte.
const TESTNET_P2SH: u8 = 0xc4;

/// Network type for address prefix selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Network {
    /// Evrmore mainnet ('E' / 'e' prefixes).
    Mainnet,
    /// Evrmore testnet ('m'/'n' / '2' prefixes).
    Testnet,
}

/// Whether an address commits to a public key hash or a script hash.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressKind {
    /// Pay-to-public-key-hash.
    PubKeyHash,
    /// Pay-to-script-hash.
    ScriptHash,
}

/// A Base58Check address.
///
/// Carries the 20-byte hash, the address kind, and the network, and can
/// produce the matching locking script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Address {
    /// The human-readable Base58Check string.
    pub address_string: String,
    /// The 20-byte hash160 the address commits to.
    pub hash: [u8; 20],
    /// Whether this is a key-hash or script-hash address.
    pub kind: AddressKind,
    /// The network this address belongs to.
    pub network: Network,
}

impl Address {
    /// Parse a Base58Check-encoded address string.
    ///
    /// Decodes the string, validates the checksum, and detects kind and
    /// network from the version byte.
    ///
    /// # Arguments
    /// * `addr` - The Base58Check address string.
    ///
    /// # Returns
    /// An `Address`, or an error if the string is invalid.
    pub fn from_string(addr: &str) -> Result<Self, ScriptError> {
        let decoded = bs58::decode(addr)
            .into_vec()
            .map_err(|_| ScriptError::InvalidAddress(format!("bad char in '{}'", addr)))?;

        if decoded.len() != 25 {
            return Err(ScriptError::InvalidAddressLength(addr.to_string()));
        }

        // Last 4 bytes must equal sha256d of the first 21.
        let checksum = sha256d(&decoded[..21]);
        if decoded[21..25] != checksum[..4] {
            return Err(ScriptError::ChecksumFailed);
        }

        let (kind, network) = match decoded[0] {
            MAINNET_P2PKH => (AddressKind::PubKeyHash, Network::Mainnet),
            MAINNET_P2SH => (AddressKind::ScriptHash, Network::Mainnet),
            TESTNET_P2PKH => (AddressKind::PubKeyHash, Network::Testnet),
            TESTNET_P2SH => (AddressKind::ScriptHash, Network::Testnet),
            _ => return Err(ScriptError::UnsupportedAddress(addr.to_string())),
        };

        let mut hash = [0u8; 20];
        hash.copy_from_slice(&decoded[1..21]);

        Ok(Address {
            address_string: addr.to_string(),
            hash,
            kind,
            network,
        })
    }

    /// Create an address from a 20-byte hash.
    ///
    /// # Arguments
    /// * `hash` - The hash160 payload.
    /// * `kind` - Key-hash or script-hash.
    /// * `network` - The target network.
    ///
    /// # Returns
    /// A new `Address` with the encoded Base58Check string.
    pub fn from_hash(hash: &[u8; 20], kind: AddressKind, network: Network) -> Self {
        let version = match (kind, network) {
            (AddressKind::PubKeyHash, Network::Mainnet) => MAINNET_P2PKH,
            (AddressKind::ScriptHash, Network::Mainnet) => MAINNET_P2SH,
            (AddressKind::PubKeyHash, Network::Testnet) => TESTNET_P2PKH,
            (AddressKind::ScriptHash, Network::Testnet) => TESTNET_P2SH,
        };

        let mut payload = Vec::with_capacity(25);
        payload.push(version);
        payload.extend_from_slice(hash);
        let checksum = sha256d(&payload);
        payload.extend_from_slice(&checksum[..4]);

        Address {
            address_string: bs58::encode(&payload).into_string(),
            hash: *hash,
            kind,
            network,
        }
    }

    /// Create a P2PKH address from a public key.
    ///
    /// # Arguments
    /// * `pubkey` - The public key to hash.
    /// * `network` - The target network.
    ///
    /// # Returns
    /// The P2PKH `Address` for the key.
    pub fn from_public_key(pubkey: &PublicKey, network: Network) -> Self {
        Self::from_hash(&pubkey.hash160(), AddressKind::PubKeyHash, network)
    }

    /// Create a P2PKH address from a 20-byte public key hash.
    ///
    /// # Arguments
    /// * `hash` - The public key hash.
    /// * `network` - The target network.
    ///
    /// # Returns
    /// The P2PKH `Address`.
    pub fn from_public_key_hash(hash: &[u8; 20], network: Network) -> Self {
        Self::from_hash(hash, AddressKind::PubKeyHash, network)
    }

    /// Create a P2SH address from a redeem script.
    ///
    /// # Arguments
    /// * `redeem_script` - The redeem script to hash.
    /// * `network` - The target network.
    ///
    /// # Returns
    /// The P2SH `Address` for hash160 of the script bytes.
    pub fn from_redeem_script(redeem_script: &Script, network: Network) -> Self {
        Self::from_hash(
            &hash160(redeem_script.to_bytes()),
            AddressKind::ScriptHash,
            network,
        )
    }

    /// Produce the locking script this address corresponds to.
    ///
    /// # Returns
    /// A P2PKH or P2SH locking script depending on the address kind.
    pub fn locking_script(&self) -> Script {
        match self.kind {
            AddressKind::PubKeyHash => build::p2pkh_script(&self.hash),
            AddressKind::ScriptHash => build::p2sh_script(&self.hash),
        }
    }
}

impl fmt::Display for Address {
    /// Display the address as its Base58Check string.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address_string)
    }
}

#[cfg(test)]
mod tests {
    //! Tests for address encoding, decoding, and locking-script mapping.

    use super::*;

    const TEST_HASH: [u8; 20] = [
        0x75, 0x1e, 0x76, 0xe8, 0x19, 0x91, 0x96, 0xd4, 0x54, 0x94, 0x1c, 0x45, 0xd1, 0xb3,
        0xa3, 0x23, 0xf1, 0x43, 0x3b, 0xd6,
    ];

    /// A mainnet P2PKH address starts with 'E' and round-trips.
    #[test]
    fn test_mainnet_p2pkh_roundtrip() {
        let addr = Address::from_hash(&TEST_HASH, AddressKind::PubKeyHash, Network::Mainnet);
        assert!(addr.address_string.starts_with('E'));
        assert_eq!(addr.address_string.len(), 34);

        let parsed = Address::from_string(&addr.address_string).unwrap();
        assert_eq!(parsed, addr);
    }

    /// A mainnet P2SH address starts with 'e' and round-trips.
    #[test]
    fn test_mainnet_p2sh_roundtrip() {
        let addr = Address::from_hash(&TEST_HASH, AddressKind::ScriptHash, Network::Mainnet);
        assert!(addr.address_string.starts_with('e'));

        let parsed = Address::from_string(&addr.address_string).unwrap();
        assert_eq!(parsed.kind, AddressKind::ScriptHash);
        assert_eq!(parsed.hash, TEST_HASH);
    }

    /// A corrupted checksum is rejected.
    #[test]
    fn test_bad_checksum_rejected() {
        let addr = Address::from_hash(&TEST_HASH, AddressKind::PubKeyHash, Network::Mainnet);
        let mut s = addr.address_string.clone();
        // Flip the last character to another base58 digit.
        let last = s.pop().unwrap();
        s.push(if last == '1' { '2' } else { '1' });
        assert!(matches!(
            Address::from_string(&s),
            Err(ScriptError::ChecksumFailed) | Err(ScriptError::InvalidAddressLength(_))
        ));
    }

    /// The locking script matches the address kind.
    #[test]
    fn test_locking_script_shape() {
        let p2pkh = Address::from_hash(&TEST_HASH, AddressKind::PubKeyHash, Network::Mainnet);
        assert!(p2pkh.locking_script().is_p2pkh());

        let p2sh = Address::from_hash(&TEST_HASH, AddressKind::ScriptHash, Network::Mainnet);
        assert!(p2sh.locking_script().is_p2sh());
    }

    /// Deriving an address from a redeem script commits to its hash160.
    #[test]
    fn test_from_redeem_script() {
        let redeem = Script::from_hex("52ae").unwrap();
        let addr = Address::from_redeem_script(&redeem, Network::Mainnet);
        assert_eq!(addr.hash, hash160(redeem.to_bytes()));
        assert_eq!(addr.kind, AddressKind::ScriptHash);
    }
}
