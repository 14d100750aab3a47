//! Core wallet data types.

use serde::{Deserialize, Serialize};

use evr_script::Script;

/// Reference to a specific output of a specific transaction.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    /// The transaction ID in display (big-endian) hex.
    pub txid: String,
    /// The output index within that transaction.
    pub vout: u32,
}

/// An unspent transaction output as reported by the chain.
///
/// Immutable once fetched; a successful build consumes it exactly once.
/// For asset outputs, `value_sats` is the asset amount in minimal units
/// and the carrying output's base-currency value is zero.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnspentOutput {
    /// The funding transaction ID in display hex.
    pub txid: String,
    /// The output index within the funding transaction.
    pub output_index: u32,
    /// The value in minimal units (currency sats, or asset sats).
    pub value_sats: u64,
    /// The asset name for asset outputs; `None` for base currency.
    pub asset_name: Option<String>,
    /// The locking script, when already resolved. Resolved lazily from
    /// the chain when absent.
    pub script_pubkey: Option<Script>,
}

impl UnspentOutput {
    /// The outpoint this output lives at.
    pub fn outpoint(&self) -> OutPoint {
        OutPoint {
            txid: self.txid.clone(),
            vout: self.output_index,
        }
    }

    /// Whether this is a base-currency output.
    pub fn is_currency(&self) -> bool {
        self.asset_name.is_none()
    }
}

/// The completer's half of the fee-delegation handshake.
///
/// The originator must obtain these before building outputs: the
/// ALL+ANYONECANPAY signature scheme locks the output set, so the fee
/// claim and change destinations have to be known up front.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleterTerms {
    /// Exact size, in sats, of the currency output the completer commits
    /// to contribute as the fee input.
    pub fee_sats_reserved: u64,
    /// Address that must receive the fee claim.
    pub completer_address: String,
    /// Address that must receive the leftover currency change.
    pub change_address: String,
}

/// An originator-signed partial transaction awaiting completion.
#[derive(Clone, Debug)]
pub struct PartialTransfer {
    /// The serialized partial transaction.
    pub serialized_tx: Vec<u8>,
    /// The network fee the completer will actually realize:
    /// `fee_sats_reserved - currency change`.
    pub reported_fee_sats: u64,
    /// Hex of the partial transaction (for txid derivation and display).
    pub tx_hex: String,
}
