//! Shared test doubles: an in-memory chain and wallet/unspent factories.

use std::cell::RefCell;
use std::collections::HashMap;

use evr_script::Network;
use evr_transaction::Transaction;

use crate::chain::ChainQuery;
use crate::identity::{Identity, KeyIdentity};
use crate::snapshot::UtxoSnapshot;
use crate::types::UnspentOutput;
use crate::units;
use crate::wallet::{Wallet, WalletConfig};
use crate::WalletError;

/// An in-memory chain double: serves canned unspents and raw
/// transactions, records broadcasts, and optionally rejects them.
#[derive(Default)]
pub struct MockChain {
    /// Unspents returned for any script hash.
    pub unspents: RefCell<Vec<UnspentOutput>>,
    /// Raw transactions by display txid.
    pub raw_txs: RefCell<HashMap<String, Transaction>>,
    /// Every hex handed to `broadcast`, in order.
    pub broadcasts: RefCell<Vec<String>>,
    /// When set, broadcasts are rejected with this message.
    pub reject_with: Option<String>,
}

impl ChainQuery for MockChain {
    fn list_unspent(&self, _script_hash: &str) -> Result<Vec<UnspentOutput>, WalletError> {
        Ok(self.unspents.borrow().clone())
    }

    fn get_raw_transaction(&self, txid: &str) -> Result<Option<Transaction>, WalletError> {
        Ok(self.raw_txs.borrow().get(txid).cloned())
    }

    fn broadcast(&self, tx_hex: &str) -> Result<String, WalletError> {
        if let Some(message) = &self.reject_with {
            return Err(WalletError::Broadcast(message.clone()));
        }
        self.broadcasts.borrow_mut().push(tx_hex.to_string());
        units::txhex_to_txid(tx_hex)
    }
}

/// A wallet over a fresh random identity, a `MockChain`, and a snapshot
/// seeded with the given unspents.
pub fn wallet_with(
    config: WalletConfig,
    unspents: Vec<UnspentOutput>,
) -> Wallet<KeyIdentity, MockChain> {
    let mut wallet = Wallet::new(
        KeyIdentity::random(Network::Mainnet),
        MockChain::default(),
        config,
    );
    wallet.set_snapshot(UtxoSnapshot::from_unspents(unspents));
    wallet
}

/// A currency unspent at a synthetic outpoint. The locking script is left
/// unresolved; input compilation falls back to the wallet's own template.
pub fn currency_utxo(txid_byte: u8, vout: u32, value_sats: u64) -> UnspentOutput {
    UnspentOutput {
        txid: hex::encode([txid_byte; 32]),
        output_index: vout,
        value_sats,
        asset_name: None,
        script_pubkey: None,
    }
}

/// An asset unspent at a synthetic outpoint.
pub fn asset_utxo(txid_byte: u8, vout: u32, value_sats: u64, name: &str) -> UnspentOutput {
    UnspentOutput {
        asset_name: Some(name.to_string()),
        ..currency_utxo(txid_byte, vout, value_sats)
    }
}

/// A fresh random recipient address string.
pub fn random_address() -> String {
    KeyIdentity::random(Network::Mainnet)
        .address()
        .address_string
}
