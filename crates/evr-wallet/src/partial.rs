//! The two-party fee-delegation protocol.
//!
//! An **originator** holding only the tagged asset moves value while a
//! **completer** contributes the one currency input that pays the network
//! fee, collecting a small asset claim in return.
//!
//! The originator signs with `SIGHASH_ANYONECANPAY | SIGHASH_ALL`, which
//! locks the complete output set while letting the completer append its
//! input later. Because the outputs are locked up front, the completer's
//! terms - the exact fee reservation and the claim/change addresses -
//! must be obtained before anything is built.
//!
//! Completer verification is fail-closed: the first failing check rejects
//! the send outright; nothing is ever partially applied.

use std::collections::HashSet;

use tracing::{debug, warn};

use evr_script::Address;
use evr_transaction::{Transaction, TransactionOutput};

use crate::chain::ChainQuery;
use crate::identity::Identity;
use crate::selector::{find_exact_currency, find_one_at_least, select_asset};
use crate::types::{CompleterTerms, PartialTransfer};
use crate::units;
use crate::wallet::Wallet;
use crate::{FeeDelegationError, WalletError};

/// Absolute ceiling on a plausible reported fee: one whole coin.
const MAX_REPORTED_FEE_SATS: u64 = units::COIN;

impl<I: Identity, C: ChainQuery> Wallet<I, C> {
    // -----------------------------------------------------------------
    // Originator
    // -----------------------------------------------------------------

    /// Build a fee-delegated asset send as the originator.
    ///
    /// Selects only asset inputs, emits the transfer, asset change, the
    /// completer's fee claim, and a currency change output returning
    /// `fee_sats_reserved - reported_fee_sats` to the completer's change
    /// address, then signs everything `ANYONECANPAY | ALL`.
    ///
    /// # Arguments
    /// * `amount_sats` - The asset amount to send, in minimal units.
    /// * `address` - The recipient address.
    /// * `terms` - The completer's reservation from the handshake.
    /// * `pull_fee_from_amount` - Deduct the delegation fee from the
    ///   amount instead of on top of it.
    ///
    /// # Returns
    /// The partial transaction, the reported fee, and the raw hex.
    pub fn fee_delegated_send(
        &mut self,
        amount_sats: u64,
        address: &str,
        terms: &CompleterTerms,
        pull_fee_from_amount: bool,
    ) -> Result<PartialTransfer, WalletError> {
        self.validate_terms(terms)?;
        self.validate_amount(amount_sats)?;
        let recipient = self.validate_address(address)?;

        let mundo_fee = self.config.mundo_fee_sats;
        let amount = if pull_fee_from_amount {
            amount_sats.checked_sub(mundo_fee).ok_or_else(|| {
                WalletError::InsufficientFunds(
                    "amount does not cover the delegation fee".to_string(),
                )
            })?
        } else {
            amount_sats
        };

        let asset_name = self.config.asset_name.clone();
        let sats = units::round_sats_down_to_divisibility(amount, self.config.divisibility);
        let total_sats = sats + mundo_fee;

        let selection = select_asset(
            &self.snapshot.assets(&asset_name),
            &asset_name,
            total_sats,
            false,
        )?;

        let assembler = self.assembler();
        let inputs = assembler.compile_inputs(&[], &selection.utxos, &Default::default())?;

        let transfer_out = assembler.compile_asset_output(&recipient, sats, &asset_name)?;
        let asset_change = assembler.compile_asset_change(
            sats,
            selection.total_sats - mundo_fee,
            &asset_name,
        )?;
        let claim_out = assembler.compile_asset_output(
            &self.validate_address(&terms.completer_address)?,
            mundo_fee,
            &asset_name,
        )?;

        // Transfer + claim + currency change, plus the asset change when
        // one exists.
        let output_count = 1 + 2 + usize::from(asset_change.is_some());
        let (change_out, currency_change) = self.originator_currency_change(
            terms,
            selection.utxos.len(),
            output_count,
        )?;

        let mut outputs = vec![transfer_out];
        outputs.extend(asset_change);
        outputs.push(claim_out);
        outputs.push(change_out);

        let tx = assembler.create_partial_originator(inputs, outputs)?;
        Ok(self.partial_transfer(tx, terms.fee_sats_reserved, currency_change))
    }

    /// Build a fee-delegated cross-chain (bridge) send as the originator.
    ///
    /// Pays the burn address, the completer's claim, the fixed bridge fee,
    /// the completer's currency change, and a memo output encoding
    /// `"<chain>:<eth_address>"` for the bridge operator.
    ///
    /// # Arguments
    /// * `amount_sats` - The asset amount to bridge, in minimal units.
    /// * `eth_address` - The destination address on the external chain.
    /// * `chain_name` - The destination chain tag for the memo.
    /// * `terms` - The completer's reservation from the handshake.
    /// * `pull_fee_from_amount` - Deduct both fees from the amount.
    ///
    /// # Returns
    /// The partial transaction, the reported fee, and the raw hex.
    pub fn fee_delegated_bridge_send(
        &mut self,
        amount_sats: u64,
        eth_address: &str,
        chain_name: &str,
        terms: &CompleterTerms,
        pull_fee_from_amount: bool,
    ) -> Result<PartialTransfer, WalletError> {
        self.validate_terms(terms)?;
        self.validate_amount(amount_sats)?;
        if amount_sats > self.config.max_bridge_amount_sats {
            return Err(WalletError::InvalidParams(format!(
                "bridge amount {} exceeds the maximum {}",
                amount_sats, self.config.max_bridge_amount_sats
            )));
        }
        if !units::is_valid_eth_address(eth_address) {
            return Err(WalletError::InvalidParams(format!(
                "malformed destination address: {}",
                eth_address
            )));
        }

        let mundo_fee = self.config.mundo_fee_sats;
        let bridge_fee = self.config.bridge_fee_sats;
        let asset_name = self.config.asset_name.clone();

        if self.asset_balance() < amount_sats + bridge_fee + mundo_fee {
            return Err(WalletError::InsufficientFunds(format!(
                "balance too low to pay the bridge fees: {} < {} + {} + {}",
                self.asset_balance(),
                amount_sats,
                bridge_fee,
                mundo_fee
            )));
        }

        let amount = if pull_fee_from_amount {
            amount_sats
                .checked_sub(mundo_fee + bridge_fee)
                .ok_or_else(|| {
                    WalletError::InsufficientFunds(
                        "amount does not cover the bridge fees".to_string(),
                    )
                })?
        } else {
            amount_sats
        };

        let sats = units::round_sats_down_to_divisibility(amount, self.config.divisibility);
        let total_sats = sats + mundo_fee + bridge_fee;

        let selection = select_asset(
            &self.snapshot.assets(&asset_name),
            &asset_name,
            total_sats,
            false,
        )?;

        let assembler = self.assembler();
        let inputs = assembler.compile_inputs(&[], &selection.utxos, &Default::default())?;

        let burn_out = assembler.compile_asset_output(
            &self.validate_address(&self.config.burn_address.clone())?,
            sats,
            &asset_name,
        )?;
        let asset_change =
            assembler.compile_asset_change(total_sats, selection.total_sats, &asset_name)?;
        let claim_out = assembler.compile_asset_output(
            &self.validate_address(&terms.completer_address)?,
            mundo_fee,
            &asset_name,
        )?;
        let bridge_out = assembler.compile_asset_output(
            &self.validate_address(&self.config.bridge_address.clone())?,
            bridge_fee,
            &asset_name,
        )?;

        // Burn transfer + claim + bridge fee + currency change + memo,
        // plus the asset change when one exists.
        let output_count = 1 + 4 + usize::from(asset_change.is_some());
        let (change_out, currency_change) = self.originator_currency_change(
            terms,
            selection.utxos.len(),
            output_count,
        )?;

        let memo_out = assembler
            .compile_memo_output(&format!("{}:{}", chain_name, eth_address))?
            .ok_or_else(|| {
                WalletError::InvalidParams("bridge memo must not be empty".to_string())
            })?;

        let mut outputs = vec![burn_out];
        outputs.extend(asset_change);
        outputs.push(claim_out);
        outputs.push(bridge_out);
        outputs.push(change_out);
        outputs.push(memo_out);

        let tx = assembler.create_partial_originator(inputs, outputs)?;
        Ok(self.partial_transfer(tx, terms.fee_sats_reserved, currency_change))
    }

    /// Build a fee-delegated sweep as the originator: every asset and
    /// currency output moves to the destination, minus the delegation fee.
    ///
    /// # Arguments
    /// * `address` - The destination address.
    /// * `terms` - The completer's reservation from the handshake.
    ///
    /// # Returns
    /// The partial transaction, the reported fee, and the raw hex.
    pub fn fee_delegated_sweep(
        &mut self,
        address: &str,
        terms: &CompleterTerms,
    ) -> Result<PartialTransfer, WalletError> {
        self.validate_terms(terms)?;
        let recipient = self.validate_address(address)?;

        let asset_name = self.config.asset_name.clone();
        let mundo_fee = self.config.mundo_fee_sats;
        let asset_total = self.asset_balance();
        if asset_total < mundo_fee {
            return Err(WalletError::InsufficientFunds(
                "not enough of the asset for the delegation fee".to_string(),
            ));
        }

        let asset_utxos = self.snapshot.assets(&asset_name);
        let currency_utxos = self.snapshot.currency();
        let currency_total: u64 = currency_utxos.iter().map(|u| u.value_sats).sum();

        let assembler = self.assembler();
        let inputs =
            assembler.compile_inputs(&currency_utxos, &asset_utxos, &Default::default())?;
        let input_count = inputs.len();

        let mut sweep_outs = Vec::with_capacity(2);
        if currency_total > 0 {
            sweep_outs.push(assembler.compile_currency_output(currency_total, &recipient));
        }
        sweep_outs.push(assembler.compile_asset_output(
            &recipient,
            units::round_sats_down_to_divisibility(
                asset_total - mundo_fee,
                self.config.divisibility,
            ),
            &asset_name,
        )?);

        let claim_out = assembler.compile_asset_output(
            &self.validate_address(&terms.completer_address)?,
            mundo_fee,
            &asset_name,
        )?;

        let change_address = self.validate_address(&terms.change_address)?;
        let (change_out, currency_change) = assembler
            .compile_currency_change(
                0,
                terms.fee_sats_reserved,
                input_count,
                sweep_outs.len() + 2,
                Some(&change_address),
            )?
            .ok_or_else(|| {
                WalletError::InsufficientFunds(
                    "reserved fee input does not cover the network fee".to_string(),
                )
            })?;

        let mut outputs = sweep_outs;
        outputs.push(claim_out);
        outputs.push(change_out);

        let tx = assembler.create_partial_originator(inputs, outputs)?;
        Ok(self.partial_transfer(tx, terms.fee_sats_reserved, currency_change))
    }

    /// The originator's currency change output back to the completer.
    ///
    /// The fee term counts only the originator's asset inputs; the
    /// per-item model's deliberate over-estimate absorbs the completer's
    /// input, and both parties must derive `reported_fee_sats` from the
    /// same formula.
    fn originator_currency_change(
        &self,
        terms: &CompleterTerms,
        input_count: usize,
        output_count: usize,
    ) -> Result<(TransactionOutput, u64), WalletError> {
        let change_address = self.validate_address(&terms.change_address)?;
        self.assembler()
            .compile_currency_change(
                0,
                terms.fee_sats_reserved,
                input_count,
                output_count,
                Some(&change_address),
            )?
            .ok_or_else(|| {
                WalletError::InsufficientFunds(
                    "reserved fee input does not cover the network fee".to_string(),
                )
            })
    }

    /// Package a signed partial transaction for the completer.
    fn partial_transfer(
        &self,
        tx: Transaction,
        fee_sats_reserved: u64,
        currency_change: u64,
    ) -> PartialTransfer {
        let reported_fee_sats = fee_sats_reserved - currency_change;
        debug!(
            reported_fee_sats,
            fee_sats_reserved, "originator partial transaction built"
        );
        PartialTransfer {
            serialized_tx: tx.to_bytes(),
            reported_fee_sats,
            tx_hex: tx.to_hex(),
        }
    }

    fn validate_terms(&self, terms: &CompleterTerms) -> Result<(), WalletError> {
        if terms.fee_sats_reserved == 0
            || !units::is_valid_chain_address(&terms.completer_address)
            || !units::is_valid_chain_address(&terms.change_address)
        {
            return Err(WalletError::InvalidParams(
                "need completer details".to_string(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Completer
    // -----------------------------------------------------------------

    /// Offer reservation terms for an incoming fee-delegated send.
    ///
    /// Picks one currency output of at least `min_fee_sats` whose txid is
    /// not already reserved, and commits its exact value.
    ///
    /// # Arguments
    /// * `min_fee_sats` - The minimum the reserved output must hold.
    /// * `claimed` - Txids already reserved for other in-flight sends.
    ///
    /// # Returns
    /// The terms to hand to an originator, or `None` when no output
    /// qualifies.
    pub fn reserve_completer_terms(
        &self,
        min_fee_sats: u64,
        claimed: &HashSet<String>,
    ) -> Option<CompleterTerms> {
        let reserved = find_one_at_least(&self.snapshot.currency(), min_fee_sats, claimed)?;
        let own = self.address().address_string;
        Some(CompleterTerms {
            fee_sats_reserved: reserved.value_sats,
            completer_address: own.clone(),
            change_address: own,
        })
    }

    /// Verify and complete an originator's partial transaction, then
    /// broadcast it.
    ///
    /// Verification is fail-closed and positional, matching the layout
    /// the originator builds: the currency change is the last output (for
    /// bridge sends, second-to-last ahead of the memo) and the fee claim
    /// sits directly before the change block.
    ///
    /// # Arguments
    /// * `serialized_tx` - The originator's partial transaction bytes.
    /// * `terms` - The reservation this completer issued.
    /// * `reported_fee_sats` - The fee the originator reported.
    /// * `bridge` - Whether this is a bridge send (extra claim + memo).
    ///
    /// # Returns
    /// The broadcast transaction ID, or the first failing
    /// `FeeDelegationError`.
    pub fn complete_fee_delegated(
        &mut self,
        serialized_tx: &[u8],
        terms: &CompleterTerms,
        reported_fee_sats: u64,
        bridge: bool,
    ) -> Result<String, WalletError> {
        let mut tx = Transaction::from_bytes(serialized_tx)?;
        let reserved = terms.fee_sats_reserved;

        // Output positions relative to the end of the output list.
        let (change_back, claim_back) = if bridge { (2, 4) } else { (1, 2) };

        self.verify_reported_fee(&tx, reserved, reported_fee_sats, change_back)?;
        self.verify_claims(&tx, bridge)?;
        self.verify_output_address(
            &tx,
            claim_back,
            &terms.completer_address,
            FeeDelegationError::ClaimAddressMismatch,
        )?;
        self.verify_output_address(
            &tx,
            change_back,
            &terms.change_address,
            FeeDelegationError::ChangeAddressMismatch,
        )?;

        let reserved_utxo = find_exact_currency(&self.snapshot.currency(), reserved)
            .ok_or_else(|| {
                warn!(reserved, "reserved unspent output not found");
                WalletError::FeeDelegation(FeeDelegationError::ReservedUtxoNotFound {
                    sats: reserved,
                })
            })?;

        let assembler = self.assembler();
        let inputs =
            assembler.compile_inputs(&[reserved_utxo], &[], &Default::default())?;
        assembler.complete_partial(&mut tx, inputs)?;

        self.broadcast_and_mark(&tx)
    }

    /// Check the reported fee's plausibility and the declared change value.
    fn verify_reported_fee(
        &self,
        tx: &Transaction,
        reserved: u64,
        reported: u64,
        change_back: usize,
    ) -> Result<(), WalletError> {
        let change_value = self
            .output_from_end(tx, change_back)
            .map(|o| o.satoshis);
        let ok = reported < MAX_REPORTED_FEE_SATS
            && reported < reserved
            && change_value == Some(reserved - reported);
        if !ok {
            warn!(reported, reserved, ?change_value, "fee verification failed");
            return Err(WalletError::FeeDelegation(FeeDelegationError::FeeMismatch {
                reported,
                reserved,
            }));
        }
        Ok(())
    }

    /// Check that the expected fee claims exist among the outputs.
    fn verify_claims(&self, tx: &Transaction, bridge: bool) -> Result<(), WalletError> {
        let mundo_paid = self.has_asset_claim(tx, self.config.mundo_fee_sats);
        let bridge_paid = !bridge || self.has_asset_claim(tx, self.config.bridge_fee_sats);
        if !(mundo_paid && bridge_paid) {
            warn!(mundo_paid, bridge_paid, "claim verification failed");
            return Err(WalletError::FeeDelegation(FeeDelegationError::ClaimMismatch));
        }
        Ok(())
    }

    /// Whether any output pays exactly `claim_sats` of the watched asset.
    fn has_asset_claim(&self, tx: &Transaction, claim_sats: u64) -> bool {
        tx.outputs.iter().any(|output| {
            output
                .asset_payload()
                .map(|payload| {
                    payload.name == self.config.asset_name
                        && payload.amount_sats == claim_sats
                })
                .unwrap_or(false)
        })
    }

    /// Check that the output `back` positions from the end pays `expected`.
    ///
    /// The address is recovered by extracting the embedded public-key
    /// hash and re-deriving the Base58Check string.
    fn verify_output_address(
        &self,
        tx: &Transaction,
        back: usize,
        expected: &str,
        mismatch: FeeDelegationError,
    ) -> Result<(), WalletError> {
        let derived = self
            .output_from_end(tx, back)
            .and_then(|output| output.locking_script.public_key_hash().ok())
            .map(|hash| {
                Address::from_public_key_hash(&hash, self.config.network).address_string
            });
        if derived.as_deref() != Some(expected) {
            warn!(?derived, expected, "output address verification failed");
            return Err(WalletError::FeeDelegation(mismatch));
        }
        Ok(())
    }

    /// The output `back` positions from the end, if present.
    fn output_from_end<'t>(
        &self,
        tx: &'t Transaction,
        back: usize,
    ) -> Option<&'t TransactionOutput> {
        tx.outputs.len().checked_sub(back).map(|i| &tx.outputs[i])
    }
}
