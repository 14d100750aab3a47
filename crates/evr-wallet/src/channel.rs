//! Simplified one-directional payment channels.
//!
//! A channel is a P2SH output locked by a 2-of-2-or-timeout redeem script
//! (see `evr_script::build::channel_redeem_script`). The sender funds the
//! channel, then issues commitment transactions signed
//! `ANYONECANPAY | ALL` that the receiver can finalize and broadcast at
//! any time. The remainder returns to the channel's own script, so a
//! renewable channel can be committed against repeatedly without closing.
//!
//! Lifecycle: `Funded -> CommitmentIssued (repeatable) -> FinalizedBroadcast`,
//! with the alternate terminal `TimeoutReclaim` available to the sender
//! alone once the script's CSV/CLTV condition matures (the ELSE branch;
//! not part of the happy path here).

use evr_script::{Address, Script};
use evr_transaction::sighash::{SIGHASH_ALL, SIGHASH_ALL_ANYONECANPAY};
use evr_transaction::{Transaction, TransactionInput, TransactionOutput};

use crate::chain::ChainQuery;
use crate::identity::Identity;
use crate::selector::select_currency;
use crate::wallet::Wallet;
use crate::WalletError;

/// Where a channel stands in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelStage {
    /// The funding transaction pays the channel address.
    Funded,
    /// At least one commitment has been issued; more may follow.
    CommitmentIssued,
    /// A commitment was countersigned and broadcast; the channel is spent.
    FinalizedBroadcast,
    /// The sender reclaimed alone after the timeout matured.
    TimeoutReclaim,
}

impl ChannelStage {
    /// Whether another commitment may still be issued from this stage.
    pub fn can_commit(&self) -> bool {
        matches!(self, ChannelStage::Funded | ChannelStage::CommitmentIssued)
    }
}

impl<I: Identity, C: ChainQuery> Wallet<I, C> {
    /// Fund a payment channel.
    ///
    /// Derives the channel's P2SH address from the redeem script, selects
    /// ordinary currency outputs covering `amount_sats` plus fee, and
    /// builds the funding transaction. The caller broadcasts the returned
    /// hex once the counterparty has acknowledged the channel.
    ///
    /// # Arguments
    /// * `redeem_script` - The channel redeem script.
    /// * `amount_sats` - The amount to lock into the channel.
    ///
    /// # Returns
    /// `(redeem_script, channel_address, funding_tx_hex)`.
    pub fn open_channel(
        &mut self,
        redeem_script: &Script,
        amount_sats: u64,
    ) -> Result<(Script, Address, String), WalletError> {
        self.validate_amount(amount_sats)?;
        let channel_address = Address::from_redeem_script(redeem_script, self.config.network);

        let selection = select_currency(
            &self.snapshot.currency(),
            amount_sats,
            self.config.reserve_sats,
            0,
            1,
            self.config.fee_rate_per_item,
            false,
        )?;

        let assembler = self.assembler();
        let inputs = assembler.compile_inputs(&selection.utxos, &[], &Default::default())?;
        let input_count = inputs.len();

        let mut outputs = vec![TransactionOutput::new(
            amount_sats,
            channel_address.locking_script(),
        )];
        if let Some((change, _)) = assembler.compile_currency_change(
            amount_sats,
            selection.total_sats,
            input_count,
            1,
            None,
        )? {
            outputs.push(change);
        }

        let tx = assembler.create_transaction(
            inputs,
            outputs,
            &Default::default(),
            &Default::default(),
        )?;
        Ok((redeem_script.clone(), channel_address, tx.to_hex()))
    }

    /// Issue a commitment transaction against the channel funding output.
    ///
    /// The single input spends the funding output and is signed
    /// `ANYONECANPAY | ALL`, so the receiver can countersign later without
    /// invalidating this signature. With
    /// `remainder = funding_value_sats - pay_to_receiver_sats` and
    /// `dust_threshold = tx_fee_sats * 3 * dust_threshold_multiple`:
    ///
    /// * `remainder` zero or below the threshold: everything goes to the
    ///   receiver minus `2 * tx_fee_sats` - unless the remainder is
    ///   positive and `respect_dust_zone` is set, which is a `DustZone`
    ///   error instead of silently folding dust into the payment.
    /// * otherwise: the receiver gets exactly `pay_to_receiver_sats` and
    ///   the channel script retains `remainder - 3 * tx_fee_sats` as the
    ///   new locked balance.
    ///
    /// # Arguments
    /// * `funding_txid` - The funding transaction ID.
    /// * `vout` - The funding output index.
    /// * `funding_value_sats` - The funding output's value.
    /// * `redeem_script` - The channel redeem script.
    /// * `pay_to_receiver_sats` - The cumulative amount owed the receiver.
    /// * `receiver_address` - The receiver's address.
    /// * `tx_fee_sats` - The per-transaction fee unit.
    /// * `dust_threshold_multiple` - Multiplier on the dust threshold.
    /// * `respect_dust_zone` - Refuse dust remainders instead of folding.
    ///
    /// # Returns
    /// Hex of the partially signed commitment (this party's signature only).
    #[allow(clippy::too_many_arguments)]
    pub fn create_commitment_tx(
        &self,
        funding_txid: &str,
        vout: u32,
        funding_value_sats: u64,
        redeem_script: &Script,
        pay_to_receiver_sats: u64,
        receiver_address: &str,
        tx_fee_sats: u64,
        dust_threshold_multiple: u64,
        respect_dust_zone: bool,
    ) -> Result<String, WalletError> {
        if tx_fee_sats == 0 {
            return Err(WalletError::InvalidParams(
                "transaction fee must be positive".to_string(),
            ));
        }
        if pay_to_receiver_sats == 0 || pay_to_receiver_sats > funding_value_sats {
            return Err(WalletError::InvalidParams(
                "payment must be positive and within the funding value".to_string(),
            ));
        }
        let receiver = self.validate_address(receiver_address)?;

        let remainder = funding_value_sats - pay_to_receiver_sats;
        let dust_threshold = tx_fee_sats * 3 * dust_threshold_multiple;

        let channel_script =
            Address::from_redeem_script(redeem_script, self.config.network).locking_script();

        let mut outputs = Vec::with_capacity(2);
        if remainder == 0 || remainder < dust_threshold {
            if remainder > 0 && respect_dust_zone {
                return Err(WalletError::DustZone {
                    remainder,
                    threshold: dust_threshold,
                });
            }
            // One input, one output: two fee units.
            let fee = tx_fee_sats * 2;
            let receiver_amount = funding_value_sats.checked_sub(fee).filter(|v| *v > 0);
            let receiver_amount = receiver_amount.ok_or_else(|| {
                WalletError::InsufficientFunds(format!(
                    "fee {} exceeds available funds {}",
                    fee, funding_value_sats
                ))
            })?;
            outputs.push(TransactionOutput::new(
                receiver_amount,
                receiver.locking_script(),
            ));
        } else {
            // One input, two outputs: three fee units, taken from the
            // channel's retained remainder.
            let fee = tx_fee_sats * 3;
            let retained = remainder.checked_sub(fee).filter(|v| *v > 0);
            let retained = retained.ok_or_else(|| {
                WalletError::InsufficientFunds(format!(
                    "fee {} exceeds channel remainder {}",
                    fee, remainder
                ))
            })?;
            outputs.push(TransactionOutput::new(
                pay_to_receiver_sats,
                receiver.locking_script(),
            ));
            outputs.push(TransactionOutput::new(retained, channel_script.clone()));
        }

        let mut input = TransactionInput::from_outpoint(funding_txid, vout)?;
        input.set_source_output(Some(TransactionOutput::new(
            funding_value_sats,
            channel_script,
        )));

        let mut tx = Transaction::new();
        tx.add_input(input);
        for output in outputs {
            tx.add_output(output);
        }

        // Partial signature: the counterparty's is still missing, so the
        // unlocking script cannot verify yet.
        self.assembler().sign_input(
            &mut tx,
            0,
            SIGHASH_ALL_ANYONECANPAY,
            Some(redeem_script),
            &[],
            false,
        )?;
        Ok(tx.to_hex())
    }

    /// Countersign a commitment and make it broadcastable.
    ///
    /// Extracts the signatures already embedded in the unlocking script,
    /// adds this party's signature over the same redeem script, and
    /// rebuilds the unlocking script as the ordered signatures followed by
    /// the redeem script.
    ///
    /// # Arguments
    /// * `partial_tx_hex` - The sender's partially signed commitment.
    /// * `redeem_script` - The channel redeem script.
    ///
    /// # Returns
    /// Hex of the fully signed commitment, ready to broadcast.
    pub fn finalize_commitment_tx(
        &self,
        partial_tx_hex: &str,
        redeem_script: &Script,
    ) -> Result<String, WalletError> {
        let mut tx = Transaction::from_hex(partial_tx_hex)?;
        if tx.inputs.is_empty() {
            return Err(WalletError::InvalidParams(
                "commitment has no inputs".to_string(),
            ));
        }

        let unlocking = tx.inputs[0].unlocking_script.clone().ok_or_else(|| {
            WalletError::InvalidParams("commitment input is unsigned".to_string())
        })?;
        let chunks = unlocking
            .chunks()
            .map_err(WalletError::ScriptConstruction)?;

        // The last push must be the redeem script; everything before it
        // is an embedded signature.
        let embedded_redeem = chunks.last().and_then(|c| c.data.as_deref());
        if embedded_redeem != Some(redeem_script.to_bytes()) {
            return Err(WalletError::ScriptVerification(
                evr_script::ScriptError::VerificationFailed(
                    "embedded redeem script does not match the channel script".to_string(),
                ),
            ));
        }
        let existing_sigs: Vec<Vec<u8>> = chunks[..chunks.len() - 1]
            .iter()
            .filter_map(|c| c.data.clone())
            .collect();

        let channel_script =
            Address::from_redeem_script(redeem_script, self.config.network).locking_script();
        tx.inputs[0].set_source_output(Some(TransactionOutput::new(0, channel_script)));

        self.assembler().sign_input(
            &mut tx,
            0,
            SIGHASH_ALL,
            Some(redeem_script),
            &existing_sigs,
            true,
        )?;
        Ok(tx.to_hex())
    }

    /// Broadcast a finalized commitment and mark the channel outpoint spent.
    ///
    /// # Arguments
    /// * `final_tx_hex` - The fully signed commitment hex.
    ///
    /// # Returns
    /// The broadcast transaction ID.
    pub fn broadcast_commitment(&mut self, final_tx_hex: &str) -> Result<String, WalletError> {
        let tx = Transaction::from_hex(final_tx_hex)?;
        self.broadcast_and_mark(&tx)
    }

    /// Estimate the fee for a commitment at a sats-per-byte rate, using
    /// the serialized-size model with two signatures per input.
    ///
    /// # Arguments
    /// * `output_count` - Outputs the commitment will carry.
    /// * `sats_per_byte` - The byte rate to charge.
    ///
    /// # Returns
    /// The estimated fee in sats.
    pub fn estimate_commitment_fee(&self, output_count: usize, sats_per_byte: u64) -> u64 {
        evr_transaction::fee::estimate_transaction_size(1, output_count, 2) * sats_per_byte
    }
}

#[cfg(test)]
mod tests {
    //! Tests for channel funding, the commitment fee/dust rules, and the
    //! two-party finalize flow.

    use super::*;
    use crate::identity::KeyIdentity;
    use crate::testutil::{currency_utxo, random_address, wallet_with};
    use crate::wallet::WalletConfig;
    use evr_script::build::{channel_redeem_script, ChannelTimeout};

    const FUNDING_TXID: &str =
        "9f2c45a12db0144909b5db269415f7319179105982ac70ed80d76ea79d923ebf";

    fn config() -> WalletConfig {
        WalletConfig {
            reserve_sats: 0,
            ..WalletConfig::default()
        }
    }

    fn channel_pair() -> (
        Wallet<KeyIdentity, crate::testutil::MockChain>,
        Wallet<KeyIdentity, crate::testutil::MockChain>,
        Script,
    ) {
        let sender = wallet_with(config(), vec![currency_utxo(1, 0, 200_000_000)]);
        let receiver = wallet_with(config(), vec![]);
        let redeem = channel_redeem_script(
            &sender.identity.public_key(),
            &receiver.identity.public_key(),
            ChannelTimeout::RelativeBlocks(144),
        )
        .unwrap();
        (sender, receiver, redeem)
    }

    /// Funding pays the channel's P2SH address and returns change.
    #[test]
    fn test_open_channel() {
        let (mut sender, _, redeem) = channel_pair();
        let (script, address, funding_hex) = sender.open_channel(&redeem, 1_000_000).unwrap();
        assert_eq!(script, redeem);
        assert_eq!(address.kind, evr_script::AddressKind::ScriptHash);

        let tx = Transaction::from_hex(&funding_hex).unwrap();
        assert_eq!(tx.outputs[0].satoshis, 1_000_000);
        assert_eq!(tx.outputs[0].locking_script, address.locking_script());
        // Change back to the sender.
        assert_eq!(tx.outputs.len(), 2);
    }

    /// Paying out the full funding takes two fee units from the receiver:
    /// 1,000,000 at a 12,000 fee pays 976,000 in a single output.
    #[test]
    fn test_commitment_full_payout() {
        let (sender, _, redeem) = channel_pair();
        let hex = sender
            .create_commitment_tx(
                FUNDING_TXID,
                0,
                1_000_000,
                &redeem,
                1_000_000,
                &random_address(),
                12_000,
                3,
                true,
            )
            .unwrap();
        let tx = Transaction::from_hex(&hex).unwrap();
        assert_eq!(tx.outputs.len(), 1);
        assert_eq!(tx.outputs[0].satoshis, 976_000);
    }

    /// A significant remainder stays locked in the channel: paying
    /// 500,000 of a 1,000,000 channel at a 1,000 fee leaves 497,000 at
    /// the channel script.
    #[test]
    fn test_commitment_with_remainder() {
        let (sender, _, redeem) = channel_pair();
        let hex = sender
            .create_commitment_tx(
                FUNDING_TXID,
                0,
                1_000_000,
                &redeem,
                500_000,
                &random_address(),
                1_000,
                1,
                true,
            )
            .unwrap();
        let tx = Transaction::from_hex(&hex).unwrap();
        assert_eq!(tx.outputs.len(), 2);
        assert_eq!(tx.outputs[0].satoshis, 500_000);
        assert_eq!(tx.outputs[1].satoshis, 497_000);

        let channel_script = Address::from_redeem_script(&redeem, evr_script::Network::Mainnet)
            .locking_script();
        assert_eq!(tx.outputs[1].locking_script, channel_script);
    }

    /// A positive remainder below the threshold is refused while the dust
    /// zone is respected, and folded into the payout when it is not.
    #[test]
    fn test_commitment_dust_zone() {
        let (sender, _, redeem) = channel_pair();

        // remainder 1,000 against threshold 3 * 1,000 * 1 = 3,000.
        let err = sender
            .create_commitment_tx(
                FUNDING_TXID,
                0,
                1_000_000,
                &redeem,
                999_000,
                &random_address(),
                1_000,
                1,
                true,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            WalletError::DustZone {
                remainder: 1_000,
                threshold: 3_000
            }
        ));
        assert!(err.is_recoverable());

        let hex = sender
            .create_commitment_tx(
                FUNDING_TXID,
                0,
                1_000_000,
                &redeem,
                999_000,
                &random_address(),
                1_000,
                1,
                false,
            )
            .unwrap();
        let tx = Transaction::from_hex(&hex).unwrap();
        assert_eq!(tx.outputs.len(), 1);
        assert_eq!(tx.outputs[0].satoshis, 998_000);
    }

    /// Fees that exceed the payable amount are refused in both branches.
    #[test]
    fn test_commitment_fee_exceeds_funds() {
        let (sender, _, redeem) = channel_pair();
        assert!(matches!(
            sender.create_commitment_tx(
                FUNDING_TXID,
                0,
                20_000,
                &redeem,
                20_000,
                &random_address(),
                12_000,
                3,
                true,
            ),
            Err(WalletError::InsufficientFunds(_))
        ));
        assert!(matches!(
            sender.create_commitment_tx(
                FUNDING_TXID,
                0,
                1_000_000,
                &redeem,
                2_000_000,
                &random_address(),
                1_000,
                1,
                true,
            ),
            Err(WalletError::InvalidParams(_))
        ));
    }

    /// The full two-party flow: the sender's partial commitment carries
    /// one signature and the redeem script; the receiver's finalize
    /// produces sender-first signatures ahead of the redeem script and
    /// passes verification.
    #[test]
    fn test_finalize_commitment() {
        let (sender, receiver, redeem) = channel_pair();
        let partial_hex = sender
            .create_commitment_tx(
                FUNDING_TXID,
                0,
                1_000_000,
                &redeem,
                500_000,
                &random_address(),
                1_000,
                1,
                true,
            )
            .unwrap();

        let partial = Transaction::from_hex(&partial_hex).unwrap();
        let partial_chunks = partial.inputs[0]
            .unlocking_script
            .as_ref()
            .unwrap()
            .chunks()
            .unwrap();
        assert_eq!(partial_chunks.len(), 2);
        assert_eq!(
            partial_chunks[1].data.as_deref(),
            Some(redeem.to_bytes())
        );

        let final_hex = receiver.finalize_commitment_tx(&partial_hex, &redeem).unwrap();
        let finalized = Transaction::from_hex(&final_hex).unwrap();
        let chunks = finalized.inputs[0]
            .unlocking_script
            .as_ref()
            .unwrap()
            .chunks()
            .unwrap();
        // Two signatures then the redeem script.
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].data.as_deref(), Some(redeem.to_bytes()));

        // The sender's signature (flagged ANYONECANPAY | ALL) comes first,
        // matching the redeem script's key order.
        let first_sig = chunks[0].data.as_ref().unwrap();
        assert_eq!(
            *first_sig.last().unwrap() as u32,
            SIGHASH_ALL_ANYONECANPAY
        );
        let second_sig = chunks[1].data.as_ref().unwrap();
        assert_eq!(*second_sig.last().unwrap() as u32, SIGHASH_ALL);
    }

    /// Finalizing against the wrong redeem script is refused.
    #[test]
    fn test_finalize_wrong_redeem() {
        let (sender, receiver, redeem) = channel_pair();
        let partial_hex = sender
            .create_commitment_tx(
                FUNDING_TXID,
                0,
                1_000_000,
                &redeem,
                500_000,
                &random_address(),
                1_000,
                1,
                true,
            )
            .unwrap();

        let other = channel_redeem_script(
            &receiver.identity.public_key(),
            &sender.identity.public_key(),
            ChannelTimeout::RelativeBlocks(144),
        )
        .unwrap();
        assert!(matches!(
            receiver.finalize_commitment_tx(&partial_hex, &other),
            Err(WalletError::ScriptVerification(_))
        ));
    }

    /// Lifecycle stages gate further commitments.
    #[test]
    fn test_stage_transitions() {
        assert!(ChannelStage::Funded.can_commit());
        assert!(ChannelStage::CommitmentIssued.can_commit());
        assert!(!ChannelStage::FinalizedBroadcast.can_commit());
        assert!(!ChannelStage::TimeoutReclaim.can_commit());
    }
}
