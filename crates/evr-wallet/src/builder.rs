//! Transaction assembly and signing.
//!
//! Binds selected unspent outputs to inputs with their locking scripts,
//! compiles transfer/change/memo outputs with the one-change-per-asset
//! rule, signs inputs through the identity collaborator, and verifies
//! each resulting unlocking script (tolerating only the asset-opcode
//! verification gap).

use std::collections::HashMap;

use evr_primitives::ec::{PublicKey, Signature};
use evr_script::asset::{asset_script, AssetPayload};
use evr_script::verify::{verify_spend, SigContext};
use evr_script::{build, Address, AssetSymbol, Network, Script, ScriptError};
use evr_transaction::fee::estimated_fee;
use evr_transaction::{Transaction, TransactionInput, TransactionOutput};

use crate::identity::Identity;
use crate::types::{OutPoint, UnspentOutput};
use crate::WalletError;

/// Adapter exposing a transaction's legacy sighash to the script verifier.
struct TxContext<'a>(&'a Transaction);

impl SigContext for TxContext<'_> {
    fn signature_hash(
        &self,
        input_index: usize,
        script_code: &Script,
        sighash_flag: u32,
    ) -> Result<[u8; 32], ScriptError> {
        self.0
            .signature_hash(input_index, script_code, sighash_flag)
            .map_err(|e| ScriptError::VerificationFailed(e.to_string()))
    }
}

/// The transaction assembler: compiles inputs and outputs and signs them
/// on behalf of one identity.
pub struct TxAssembler<'a> {
    identity: &'a dyn Identity,
    network: Network,
    symbol: AssetSymbol,
    fee_rate_per_item: u64,
}

impl<'a> TxAssembler<'a> {
    /// Create an assembler for the given identity and chain parameters.
    ///
    /// # Arguments
    /// * `identity` - The signing collaborator.
    /// * `network` - The network addresses are derived on.
    /// * `symbol` - The chain ticker embedded in asset tags.
    /// * `fee_rate_per_item` - Per-item fee rate for change computation.
    pub fn new(
        identity: &'a dyn Identity,
        network: Network,
        symbol: AssetSymbol,
        fee_rate_per_item: u64,
    ) -> Self {
        TxAssembler {
            identity,
            network,
            symbol,
            fee_rate_per_item,
        }
    }

    /// The default P2PKH locking script for the wallet's own key.
    pub fn default_locking_script(&self) -> Script {
        build::p2pkh_script(&self.identity.public_key().hash160())
    }

    /// The wallet's own address.
    pub fn own_address(&self) -> Address {
        self.identity.address()
    }

    // -----------------------------------------------------------------
    // Input compilation
    // -----------------------------------------------------------------

    /// Bind selected unspent outputs to transaction inputs.
    ///
    /// Each input's locking script is resolved from the first available
    /// source: the cached `script_pubkey`, a known redeem script (P2SH
    /// shape, plus the asset-tag suffix for asset outputs), or the
    /// wallet's own P2PKH template (again tag-suffixed for assets).
    ///
    /// # Arguments
    /// * `currency` - Selected currency outputs, first in input order.
    /// * `assets` - Selected asset outputs, following the currency inputs.
    /// * `redeem_scripts` - Known redeem scripts by outpoint, for P2SH
    ///   outputs whose script is not cached.
    ///
    /// # Returns
    /// The compiled inputs with their source outputs attached.
    pub fn compile_inputs(
        &self,
        currency: &[UnspentOutput],
        assets: &[UnspentOutput],
        redeem_scripts: &HashMap<OutPoint, Script>,
    ) -> Result<Vec<TransactionInput>, WalletError> {
        let mut inputs = Vec::with_capacity(currency.len() + assets.len());

        for utxo in currency {
            let script = match (&utxo.script_pubkey, redeem_scripts.get(&utxo.outpoint())) {
                (Some(script), _) => script.clone(),
                (None, Some(redeem)) => {
                    Address::from_redeem_script(redeem, self.network).locking_script()
                }
                (None, None) => self.default_locking_script(),
            };
            let mut input = TransactionInput::from_outpoint(&utxo.txid, utxo.output_index)?;
            input.set_source_output(Some(TransactionOutput::new(utxo.value_sats, script)));
            inputs.push(input);
        }

        for utxo in assets {
            let name = utxo.asset_name.as_deref().ok_or_else(|| {
                WalletError::InvalidParams("asset input without an asset name".to_string())
            })?;
            let script = match (&utxo.script_pubkey, redeem_scripts.get(&utxo.outpoint())) {
                (Some(script), _) => script.clone(),
                (None, redeem) => {
                    let base = match redeem {
                        Some(redeem) => {
                            Address::from_redeem_script(redeem, self.network).locking_script()
                        }
                        None => self.default_locking_script(),
                    };
                    let payload = AssetPayload::new(self.symbol, name, utxo.value_sats)?;
                    asset_script(&base, &payload)?
                }
            };
            let mut input = TransactionInput::from_outpoint(&utxo.txid, utxo.output_index)?;
            // Asset-carrying outputs hold zero base currency.
            input.set_source_output(Some(TransactionOutput::new(0, script)));
            inputs.push(input);
        }

        Ok(inputs)
    }

    // -----------------------------------------------------------------
    // Output compilation
    // -----------------------------------------------------------------

    /// Compile an asset transfer output: zero currency value, the amount
    /// encoded in the tag payload.
    ///
    /// # Arguments
    /// * `address` - The recipient.
    /// * `sats` - The asset amount in minimal units.
    /// * `asset_name` - The asset being transferred.
    pub fn compile_asset_output(
        &self,
        address: &Address,
        sats: u64,
        asset_name: &str,
    ) -> Result<TransactionOutput, WalletError> {
        let payload = AssetPayload::new(self.symbol, asset_name, sats)?;
        let script = asset_script(&address.locking_script(), &payload)?;
        Ok(TransactionOutput::new(0, script))
    }

    /// Compile a plain currency output.
    ///
    /// # Arguments
    /// * `sats` - The value in sats.
    /// * `address` - The recipient.
    pub fn compile_currency_output(&self, sats: u64, address: &Address) -> TransactionOutput {
        TransactionOutput::new(sats, address.locking_script())
    }

    /// Compile the asset change output back to the wallet.
    ///
    /// # Arguments
    /// * `needed_sats` - Asset sats the transaction spends.
    /// * `gathered_sats` - Asset sats the selected inputs carry.
    /// * `asset_name` - The asset.
    ///
    /// # Returns
    /// `Ok(Some(output))` for positive change, `Ok(None)` for exact spend,
    /// `InsufficientFunds` when the gathered amount falls short.
    pub fn compile_asset_change(
        &self,
        needed_sats: u64,
        gathered_sats: u64,
        asset_name: &str,
    ) -> Result<Option<TransactionOutput>, WalletError> {
        if gathered_sats < needed_sats {
            return Err(WalletError::InsufficientFunds(format!(
                "not enough {} to send",
                asset_name
            )));
        }
        let change = gathered_sats - needed_sats;
        if change == 0 {
            return Ok(None);
        }
        Ok(Some(self.compile_asset_output(
            &self.own_address(),
            change,
            asset_name,
        )?))
    }

    /// Compile the currency change output.
    ///
    /// Change is `gathered - spent - fee(input_count, output_count)`.
    /// Negative change is an `InsufficientFunds` condition, never a
    /// silent clamp; zero change emits no output.
    ///
    /// # Arguments
    /// * `currency_sats` - Currency the transaction pays out.
    /// * `gathered_sats` - Currency the selected inputs carry.
    /// * `input_count` - Inputs the fee term covers.
    /// * `output_count` - Outputs the fee term covers.
    /// * `destination` - Change recipient; the wallet itself when `None`.
    ///
    /// # Returns
    /// The change output with its value, or `None` for exact spends.
    pub fn compile_currency_change(
        &self,
        currency_sats: u64,
        gathered_sats: u64,
        input_count: usize,
        output_count: usize,
        destination: Option<&Address>,
    ) -> Result<Option<(TransactionOutput, u64)>, WalletError> {
        let fee = estimated_fee(input_count, output_count, self.fee_rate_per_item);
        if gathered_sats < currency_sats + fee {
            return Err(WalletError::InsufficientFunds(
                "not enough currency to send".to_string(),
            ));
        }
        let change = gathered_sats - currency_sats - fee;
        if change == 0 {
            return Ok(None);
        }
        let own = self.own_address();
        let address = destination.unwrap_or(&own);
        Ok(Some((self.compile_currency_output(change, address), change)))
    }

    /// Compile a memo output (zero value, null-data script).
    ///
    /// # Arguments
    /// * `memo` - The memo text; empty produces no output.
    pub fn compile_memo_output(
        &self,
        memo: &str,
    ) -> Result<Option<TransactionOutput>, WalletError> {
        Ok(build::memo_script(memo)?.map(|script| TransactionOutput::new(0, script)))
    }

    // -----------------------------------------------------------------
    // Signing
    // -----------------------------------------------------------------

    /// Sign one input and install its unlocking script.
    ///
    /// The signature hash commits to the redeem script for P2SH inputs
    /// and the source locking script otherwise. When co-signer signatures
    /// are supplied, they are combined with ours and ordered to match the
    /// redeem script's public-key order before being placed ahead of the
    /// redeem script.
    ///
    /// With `verify` set, the finished unlocking script is checked against
    /// the locking script; a verification failure caused by the asset-tag
    /// opcode is tolerated (the verifier does not execute that extension),
    /// every other failure is fatal. Pass `verify = false` only for
    /// partial signatures that cannot validate until a counterparty adds
    /// its own (the channel commitment path).
    ///
    /// # Arguments
    /// * `tx` - The transaction being signed.
    /// * `index` - The input index.
    /// * `sighash_flag` - The sighash flags for this signature.
    /// * `redeem_script` - The redeem script for P2SH inputs.
    /// * `other_signatures` - Co-signer signatures (with flag bytes).
    /// * `verify` - Whether to verify the finished unlocking script.
    pub fn sign_input(
        &self,
        tx: &mut Transaction,
        index: usize,
        sighash_flag: u32,
        redeem_script: Option<&Script>,
        other_signatures: &[Vec<u8>],
        verify: bool,
    ) -> Result<(), WalletError> {
        let locking_script = tx.inputs[index]
            .source_output()
            .map(|o| o.locking_script.clone())
            .ok_or_else(|| {
                WalletError::InvalidParams("input has no source output to sign against".to_string())
            })?;

        let script_code = redeem_script.unwrap_or(&locking_script);
        let sighash = tx.signature_hash(index, script_code, sighash_flag)?;
        let signature = self.identity.sign(&sighash)?;
        let mut sig_push = signature.to_der();
        sig_push.push(sighash_flag as u8);

        let mut unlocking = Script::new();
        match redeem_script {
            Some(redeem) if !other_signatures.is_empty() => {
                let mut all: Vec<Vec<u8>> = other_signatures.to_vec();
                all.push(sig_push);
                let ordered = self.order_signatures(tx, index, redeem, all)?;
                for sig in &ordered {
                    unlocking
                        .append_push_data(sig)
                        .map_err(WalletError::ScriptConstruction)?;
                }
                unlocking
                    .append_push_data(redeem.to_bytes())
                    .map_err(WalletError::ScriptConstruction)?;
            }
            Some(redeem) => {
                unlocking
                    .append_push_data(&sig_push)
                    .map_err(WalletError::ScriptConstruction)?;
                unlocking
                    .append_push_data(redeem.to_bytes())
                    .map_err(WalletError::ScriptConstruction)?;
            }
            None => {
                unlocking
                    .append_push_data(&sig_push)
                    .map_err(WalletError::ScriptConstruction)?;
                unlocking
                    .append_push_data(&self.identity.public_key().to_compressed())
                    .map_err(WalletError::ScriptConstruction)?;
            }
        }
        tx.inputs[index].unlocking_script = Some(unlocking.clone());

        if verify {
            let ctx = TxContext(&*tx);
            match verify_spend(&unlocking, &locking_script, &ctx, index) {
                Ok(()) => {}
                // The verifier does not execute the asset extension
                // opcode; that specific failure is expected on asset
                // inputs and means nothing about the signature.
                Err(e) if e.is_asset_opcode() => {}
                Err(e) => return Err(WalletError::ScriptVerification(e)),
            }
        }
        Ok(())
    }

    /// Order co-signer signatures to match the redeem script's key order.
    ///
    /// Each signature is verified against the script's keys under its own
    /// sighash flag; the result lists signatures in the order of the keys
    /// that authenticated them. A signature matching no key is fatal.
    pub fn order_signatures(
        &self,
        tx: &Transaction,
        index: usize,
        redeem_script: &Script,
        signatures: Vec<Vec<u8>>,
    ) -> Result<Vec<Vec<u8>>, WalletError> {
        let keys = if let Some((_, keys)) = redeem_script.multisig_redeem_parts() {
            keys
        } else if let Some((sender, receiver)) = redeem_script.channel_redeem_parts() {
            vec![sender, receiver]
        } else {
            return Err(WalletError::ScriptVerification(
                ScriptError::VerificationFailed("unrecognized redeem script shape".to_string()),
            ));
        };

        let mut remaining: Vec<Vec<u8>> = signatures;
        let mut ordered: Vec<Vec<u8>> = Vec::with_capacity(remaining.len());

        for key_bytes in &keys {
            let pubkey = PublicKey::from_bytes(key_bytes)
                .map_err(|e| WalletError::ScriptVerification(e.into()))?;
            let matched = remaining.iter().position(|sig| {
                sig.len() > 1
                    && Signature::from_der(&sig[..sig.len() - 1])
                        .map(|parsed| {
                            tx.signature_hash(
                                index,
                                redeem_script,
                                sig[sig.len() - 1] as u32,
                            )
                            .map(|hash| pubkey.verify(&hash, &parsed))
                            .unwrap_or(false)
                        })
                        .unwrap_or(false)
            });
            if let Some(found) = matched {
                ordered.push(remaining.remove(found));
            }
        }

        if !remaining.is_empty() {
            return Err(WalletError::ScriptVerification(
                ScriptError::VerificationFailed(
                    "signature does not match any key in the redeem script".to_string(),
                ),
            ));
        }
        Ok(ordered)
    }

    // -----------------------------------------------------------------
    // Whole-transaction assembly
    // -----------------------------------------------------------------

    /// Assemble and fully sign a transaction with SIGHASH_ALL.
    ///
    /// # Arguments
    /// * `inputs` - Compiled inputs (source outputs attached).
    /// * `outputs` - The outputs, already in final order.
    /// * `redeem_scripts` - Redeem scripts by outpoint for P2SH inputs.
    /// * `cosigner_signatures` - Co-signer signatures by outpoint for
    ///   multisig inputs.
    ///
    /// # Returns
    /// The signed and verified transaction.
    pub fn create_transaction(
        &self,
        inputs: Vec<TransactionInput>,
        outputs: Vec<TransactionOutput>,
        redeem_scripts: &HashMap<OutPoint, Script>,
        cosigner_signatures: &HashMap<OutPoint, Vec<Vec<u8>>>,
    ) -> Result<Transaction, WalletError> {
        let mut tx = Transaction::new();
        for input in inputs {
            tx.add_input(input);
        }
        for output in outputs {
            tx.add_output(output);
        }

        for index in 0..tx.inputs.len() {
            let outpoint = outpoint_of(&tx.inputs[index]);
            let redeem = redeem_scripts.get(&outpoint).cloned();
            let others = cosigner_signatures
                .get(&outpoint)
                .cloned()
                .unwrap_or_default();
            self.sign_input(
                &mut tx,
                index,
                evr_transaction::sighash::SIGHASH_ALL,
                redeem.as_ref(),
                &others,
                true,
            )?;
        }
        Ok(tx)
    }

    /// Assemble a partial transaction, signing every input with
    /// `SIGHASH_ANYONECANPAY | SIGHASH_ALL`.
    ///
    /// This party's inputs and the full output set become immutable;
    /// another party may append further inputs without invalidating these
    /// signatures.
    ///
    /// # Arguments
    /// * `inputs` - Compiled inputs (source outputs attached).
    /// * `outputs` - The complete output set.
    ///
    /// # Returns
    /// The partially signed transaction.
    pub fn create_partial_originator(
        &self,
        inputs: Vec<TransactionInput>,
        outputs: Vec<TransactionOutput>,
    ) -> Result<Transaction, WalletError> {
        let mut tx = Transaction::new();
        for input in inputs {
            tx.add_input(input);
        }
        for output in outputs {
            tx.add_output(output);
        }
        for index in 0..tx.inputs.len() {
            self.sign_input(
                &mut tx,
                index,
                evr_transaction::sighash::SIGHASH_ALL_ANYONECANPAY,
                None,
                &[],
                true,
            )?;
        }
        Ok(tx)
    }

    /// Append further inputs to a partial transaction and sign only them
    /// with `SIGHASH_ANYONECANPAY | SIGHASH_ALL`.
    ///
    /// The pre-existing inputs and their signatures are left untouched.
    ///
    /// # Arguments
    /// * `tx` - The partial transaction being completed.
    /// * `inputs` - The completing party's inputs.
    ///
    /// # Returns
    /// `Ok(())` once the new inputs are signed and verified.
    pub fn complete_partial(
        &self,
        tx: &mut Transaction,
        inputs: Vec<TransactionInput>,
    ) -> Result<(), WalletError> {
        let start = tx.inputs.len();
        for input in inputs {
            tx.add_input(input);
        }
        for index in start..tx.inputs.len() {
            self.sign_input(
                tx,
                index,
                evr_transaction::sighash::SIGHASH_ALL_ANYONECANPAY,
                None,
                &[],
                true,
            )?;
        }
        Ok(())
    }
}

/// The display-order outpoint an input spends.
pub fn outpoint_of(input: &TransactionInput) -> OutPoint {
    let mut reversed = input.source_txid;
    reversed.reverse();
    OutPoint {
        txid: hex::encode(reversed),
        vout: input.source_tx_out_index,
    }
}

#[cfg(test)]
mod tests {
    //! Tests for input/output compilation, change rules, and signing.

    use super::*;
    use crate::identity::KeyIdentity;

    fn assembler(identity: &KeyIdentity) -> TxAssembler<'_> {
        TxAssembler::new(identity, Network::Mainnet, AssetSymbol::Evr, 150_000)
    }

    fn currency_utxo(identity: &KeyIdentity, txid_byte: u8, value: u64) -> UnspentOutput {
        UnspentOutput {
            txid: hex::encode([txid_byte; 32]),
            output_index: 0,
            value_sats: value,
            asset_name: None,
            script_pubkey: Some(build::p2pkh_script(&identity.public_key().hash160())),
        }
    }

    fn asset_utxo(txid_byte: u8, value: u64) -> UnspentOutput {
        UnspentOutput {
            txid: hex::encode([txid_byte; 32]),
            output_index: 1,
            value_sats: value,
            asset_name: Some("SATORI".to_string()),
            script_pubkey: None,
        }
    }

    /// Inputs resolve their scripts: cached, or reconstructed with the
    /// asset tag for asset outputs.
    #[test]
    fn test_compile_inputs() {
        let identity = KeyIdentity::random(Network::Mainnet);
        let asm = assembler(&identity);

        let inputs = asm
            .compile_inputs(
                &[currency_utxo(&identity, 1, 50_000)],
                &[asset_utxo(2, 700)],
                &HashMap::new(),
            )
            .unwrap();
        assert_eq!(inputs.len(), 2);

        // Currency input carries its value and plain script.
        assert_eq!(inputs[0].source_satoshis(), Some(50_000));
        assert!(!inputs[0].source_output().unwrap().locking_script.is_asset_tagged());

        // Asset input carries zero currency and a tagged script encoding
        // the asset amount.
        assert_eq!(inputs[1].source_satoshis(), Some(0));
        let script = &inputs[1].source_output().unwrap().locking_script;
        assert!(script.is_asset_tagged());
        let payload = evr_script::asset::split_asset_script(script)
            .unwrap()
            .unwrap()
            .1;
        assert_eq!(payload.amount_sats, 700);
        assert_eq!(payload.name, "SATORI");
    }

    /// Asset change: positive emits one output, zero emits none, negative
    /// is insufficient funds.
    #[test]
    fn test_asset_change_rules() {
        let identity = KeyIdentity::random(Network::Mainnet);
        let asm = assembler(&identity);

        let change = asm.compile_asset_change(700, 1_000, "SATORI").unwrap().unwrap();
        assert_eq!(change.satoshis, 0);
        assert_eq!(change.asset_payload().unwrap().amount_sats, 300);

        assert!(asm.compile_asset_change(1_000, 1_000, "SATORI").unwrap().is_none());
        assert!(matches!(
            asm.compile_asset_change(1_001, 1_000, "SATORI"),
            Err(WalletError::InsufficientFunds(_))
        ));
    }

    /// Currency change subtracts the growing fee; negative change raises.
    #[test]
    fn test_currency_change_rules() {
        let identity = KeyIdentity::random(Network::Mainnet);
        let asm = assembler(&identity);

        // fee(2, 3) = 750_000.
        let (out, change) = asm
            .compile_currency_change(100_000, 1_000_000, 2, 3, None)
            .unwrap()
            .unwrap();
        assert_eq!(change, 150_000);
        assert_eq!(out.satoshis, 150_000);

        // Exact spend: no change output.
        assert!(asm
            .compile_currency_change(250_000, 1_000_000, 2, 3, None)
            .unwrap()
            .is_none());

        assert!(matches!(
            asm.compile_currency_change(300_000, 1_000_000, 2, 3, None),
            Err(WalletError::InsufficientFunds(_))
        ));
    }

    /// A fully signed single-input transaction verifies and serializes.
    #[test]
    fn test_create_transaction_signs_and_verifies() {
        let identity = KeyIdentity::random(Network::Mainnet);
        let asm = assembler(&identity);
        let inputs = asm
            .compile_inputs(
                &[currency_utxo(&identity, 3, 500_000)],
                &[],
                &HashMap::new(),
            )
            .unwrap();
        let outputs = vec![asm.compile_currency_output(100_000, &identity.address())];

        let tx = asm
            .create_transaction(inputs, outputs, &HashMap::new(), &HashMap::new())
            .unwrap();
        assert!(tx.inputs[0].unlocking_script.is_some());

        let bytes = tx.to_bytes();
        let back = Transaction::from_bytes(&bytes).unwrap();
        assert_eq!(back.to_bytes(), bytes);
    }

    /// Signing an asset input succeeds despite the verifier's tolerated
    /// asset-opcode failure.
    #[test]
    fn test_sign_asset_input_tolerated() {
        let identity = KeyIdentity::random(Network::Mainnet);
        let asm = assembler(&identity);
        let inputs = asm
            .compile_inputs(&[], &[asset_utxo(4, 900)], &HashMap::new())
            .unwrap();
        let outputs = vec![asm
            .compile_asset_output(&identity.address(), 900, "SATORI")
            .unwrap()];

        let tx = asm.create_partial_originator(inputs, outputs).unwrap();
        assert!(tx.inputs[0].unlocking_script.is_some());
    }

    /// Co-signer signatures assemble in redeem-script key order no matter
    /// the supplied order.
    #[test]
    fn test_multisig_signature_ordering() {
        let us = KeyIdentity::random(Network::Mainnet);
        let them = KeyIdentity::random(Network::Mainnet);
        let asm = assembler(&us);

        let redeem = build::multisig_redeem_script(
            &[them.public_key(), us.public_key()],
            2,
        )
        .unwrap();
        let locking = Address::from_redeem_script(&redeem, Network::Mainnet).locking_script();

        let mut utxo = currency_utxo(&us, 5, 250_000);
        utxo.script_pubkey = Some(locking);
        let redeem_map: HashMap<OutPoint, Script> =
            [(utxo.outpoint(), redeem.clone())].into_iter().collect();
        let inputs = asm
            .compile_inputs(&[utxo.clone()], &[], &redeem_map)
            .unwrap();

        let mut tx = Transaction::new();
        tx.add_input(inputs.into_iter().next().unwrap());
        tx.add_output(TransactionOutput::new(
            100_000,
            us.address().locking_script(),
        ));

        // Their signature, produced independently over the redeem script.
        let sighash = tx
            .signature_hash(0, &redeem, evr_transaction::sighash::SIGHASH_ALL)
            .unwrap();
        let mut their_sig = them.sign(&sighash).unwrap().to_der();
        their_sig.push(evr_transaction::sighash::SIGHASH_ALL as u8);

        asm.sign_input(
            &mut tx,
            0,
            evr_transaction::sighash::SIGHASH_ALL,
            Some(&redeem),
            &[their_sig.clone()],
            true,
        )
        .unwrap();

        // The first signature in the script must be theirs (their key
        // comes first in the redeem script).
        let chunks = tx.inputs[0].unlocking_script.as_ref().unwrap().chunks().unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].data.as_ref().unwrap(), &their_sig);
    }

    /// A co-signer signature matching no redeem-script key is fatal.
    #[test]
    fn test_foreign_signature_rejected() {
        let us = KeyIdentity::random(Network::Mainnet);
        let them = KeyIdentity::random(Network::Mainnet);
        let outsider = KeyIdentity::random(Network::Mainnet);
        let asm = assembler(&us);

        let redeem = build::multisig_redeem_script(
            &[them.public_key(), us.public_key()],
            2,
        )
        .unwrap();
        let locking = Address::from_redeem_script(&redeem, Network::Mainnet).locking_script();

        let mut utxo = currency_utxo(&us, 6, 250_000);
        utxo.script_pubkey = Some(locking);
        let redeem_map: HashMap<OutPoint, Script> =
            [(utxo.outpoint(), redeem.clone())].into_iter().collect();
        let inputs = asm.compile_inputs(&[utxo], &[], &redeem_map).unwrap();

        let mut tx = Transaction::new();
        tx.add_input(inputs.into_iter().next().unwrap());
        tx.add_output(TransactionOutput::new(
            100_000,
            us.address().locking_script(),
        ));

        let sighash = tx
            .signature_hash(0, &redeem, evr_transaction::sighash::SIGHASH_ALL)
            .unwrap();
        let mut outsider_sig = outsider.sign(&sighash).unwrap().to_der();
        outsider_sig.push(evr_transaction::sighash::SIGHASH_ALL as u8);

        let result = asm.sign_input(
            &mut tx,
            0,
            evr_transaction::sighash::SIGHASH_ALL,
            Some(&redeem),
            &[outsider_sig],
            true,
        );
        assert!(matches!(result, Err(WalletError::ScriptVerification(_))));
    }
}
