//! The chain-query collaborator.
//!
//! Connectivity, subscriptions, timeouts, and reconnect policy belong to
//! the implementor; this crate only issues the three queries transaction
//! construction needs.

use evr_primitives::hash::sha256;
use evr_script::Script;
use evr_transaction::Transaction;

use crate::types::UnspentOutput;
use crate::WalletError;

/// Read and broadcast access to the chain.
pub trait ChainQuery {
    /// List the unspent outputs locked to a script hash.
    ///
    /// # Arguments
    /// * `script_hash` - The electrum-style script hash (see
    ///   [`script_hash_hex`]).
    ///
    /// # Returns
    /// The unspent outputs, currency and assets mixed.
    fn list_unspent(&self, script_hash: &str) -> Result<Vec<UnspentOutput>, WalletError>;

    /// Fetch a raw transaction by ID.
    ///
    /// # Arguments
    /// * `txid` - The display-hex transaction ID.
    ///
    /// # Returns
    /// The parsed transaction, or `None` if the chain does not know it.
    fn get_raw_transaction(&self, txid: &str) -> Result<Option<Transaction>, WalletError>;

    /// Broadcast a serialized transaction.
    ///
    /// # Arguments
    /// * `tx_hex` - The raw transaction in hex.
    ///
    /// # Returns
    /// The accepted transaction ID, or `WalletError::Broadcast` on
    /// rejection.
    fn broadcast(&self, tx_hex: &str) -> Result<String, WalletError>;
}

/// Compute the electrum-style script hash for a locking script.
///
/// SHA-256 of the script bytes, byte-reversed, hex-encoded - the key
/// under which chain indexers file an address's activity.
///
/// # Arguments
/// * `script` - The locking script to hash.
///
/// # Returns
/// The 64-character script hash.
pub fn script_hash_hex(script: &Script) -> String {
    let mut hash = sha256(script.to_bytes());
    hash.reverse();
    hex::encode(hash)
}
