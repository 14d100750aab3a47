//! The wallet's view of its unspent outputs.
//!
//! Builds operate against an immutable snapshot; a successful broadcast
//! marks the consumed outpoints pending-spent so no later build can select
//! them again (the single-use invariant). The pending marks clear when a
//! fresh snapshot arrives from the chain.

use std::collections::HashSet;

use crate::types::{OutPoint, UnspentOutput};

/// A snapshot of unspent currency and asset outputs, with a ledger of
/// outpoints tentatively consumed by in-flight transactions.
#[derive(Clone, Debug, Default)]
pub struct UtxoSnapshot {
    currency: Vec<UnspentOutput>,
    assets: Vec<UnspentOutput>,
    pending_spent: HashSet<OutPoint>,
}

impl UtxoSnapshot {
    /// Create a snapshot from freshly fetched unspents.
    ///
    /// Outputs are partitioned by asset presence; any pending-spent marks
    /// from a previous snapshot are discarded (the chain view supersedes
    /// them).
    ///
    /// # Arguments
    /// * `unspents` - The outputs reported by the chain.
    ///
    /// # Returns
    /// A new snapshot.
    pub fn from_unspents(unspents: Vec<UnspentOutput>) -> Self {
        let (assets, currency): (Vec<_>, Vec<_>) =
            unspents.into_iter().partition(|u| u.asset_name.is_some());
        UtxoSnapshot {
            currency,
            assets,
            pending_spent: HashSet::new(),
        }
    }

    /// The spendable currency outputs (pending-spent excluded).
    pub fn currency(&self) -> Vec<UnspentOutput> {
        self.currency
            .iter()
            .filter(|u| !self.pending_spent.contains(&u.outpoint()))
            .cloned()
            .collect()
    }

    /// The spendable outputs of the given asset (pending-spent excluded).
    ///
    /// # Arguments
    /// * `asset_name` - The asset to filter on.
    pub fn assets(&self, asset_name: &str) -> Vec<UnspentOutput> {
        self.assets
            .iter()
            .filter(|u| {
                u.asset_name.as_deref() == Some(asset_name)
                    && !self.pending_spent.contains(&u.outpoint())
            })
            .cloned()
            .collect()
    }

    /// Total spendable currency in sats.
    pub fn currency_total(&self) -> u64 {
        self.currency().iter().map(|u| u.value_sats).sum()
    }

    /// Total spendable sats of the given asset.
    ///
    /// # Arguments
    /// * `asset_name` - The asset to total.
    pub fn asset_total(&self, asset_name: &str) -> u64 {
        self.assets(asset_name).iter().map(|u| u.value_sats).sum()
    }

    /// Mark outpoints as tentatively spent by a broadcast transaction.
    ///
    /// # Arguments
    /// * `outpoints` - The consumed outpoints.
    pub fn mark_pending_spent<I: IntoIterator<Item = OutPoint>>(&mut self, outpoints: I) {
        self.pending_spent.extend(outpoints);
    }

    /// Release pending marks for a build that was abandoned before
    /// broadcast.
    ///
    /// # Arguments
    /// * `outpoints` - The outpoints to release.
    pub fn release_pending<'a, I: IntoIterator<Item = &'a OutPoint>>(&mut self, outpoints: I) {
        for outpoint in outpoints {
            self.pending_spent.remove(outpoint);
        }
    }

    /// Attach a resolved locking script to the matching unspent output.
    ///
    /// # Arguments
    /// * `outpoint` - The output to update.
    /// * `script` - The resolved locking script.
    pub fn attach_script(&mut self, outpoint: &OutPoint, script: evr_script::Script) {
        for utxo in self.currency.iter_mut().chain(self.assets.iter_mut()) {
            if utxo.txid == outpoint.txid && utxo.output_index == outpoint.vout {
                utxo.script_pubkey = Some(script);
                return;
            }
        }
    }

    /// The outputs still missing a resolved locking script.
    pub fn unresolved(&self) -> Vec<OutPoint> {
        self.currency
            .iter()
            .chain(self.assets.iter())
            .filter(|u| u.script_pubkey.is_none())
            .map(|u| u.outpoint())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    //! Tests for snapshot partitioning and the pending-spent ledger.

    use super::*;

    fn utxo(txid: &str, vout: u32, value: u64, asset: Option<&str>) -> UnspentOutput {
        UnspentOutput {
            txid: txid.to_string(),
            output_index: vout,
            value_sats: value,
            asset_name: asset.map(str::to_string),
            script_pubkey: None,
        }
    }

    /// Outputs partition into currency and per-asset views.
    #[test]
    fn test_partition() {
        let snapshot = UtxoSnapshot::from_unspents(vec![
            utxo("aa", 0, 500, None),
            utxo("bb", 1, 700, Some("SATORI")),
            utxo("cc", 0, 900, Some("OTHER")),
        ]);
        assert_eq!(snapshot.currency_total(), 500);
        assert_eq!(snapshot.asset_total("SATORI"), 700);
        assert_eq!(snapshot.asset_total("OTHER"), 900);
        assert_eq!(snapshot.asset_total("MISSING"), 0);
    }

    /// Pending-spent outpoints disappear from every view until released.
    #[test]
    fn test_pending_spent() {
        let mut snapshot = UtxoSnapshot::from_unspents(vec![
            utxo("aa", 0, 500, None),
            utxo("aa", 1, 800, None),
        ]);
        let consumed = OutPoint {
            txid: "aa".to_string(),
            vout: 0,
        };
        snapshot.mark_pending_spent([consumed.clone()]);
        assert_eq!(snapshot.currency_total(), 800);
        assert_eq!(snapshot.currency().len(), 1);

        snapshot.release_pending([&consumed]);
        assert_eq!(snapshot.currency_total(), 1_300);
    }

    /// Script resolution attaches to the right outpoint.
    #[test]
    fn test_attach_script() {
        let mut snapshot = UtxoSnapshot::from_unspents(vec![
            utxo("aa", 0, 500, None),
            utxo("aa", 1, 800, Some("SATORI")),
        ]);
        assert_eq!(snapshot.unresolved().len(), 2);

        let script = evr_script::build::p2pkh_script(&[1u8; 20]);
        snapshot.attach_script(
            &OutPoint {
                txid: "aa".to_string(),
                vout: 1,
            },
            script.clone(),
        );
        assert_eq!(snapshot.unresolved().len(), 1);
        assert_eq!(snapshot.assets("SATORI")[0].script_pubkey, Some(script));
    }
}
