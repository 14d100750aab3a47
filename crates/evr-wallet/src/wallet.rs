//! The wallet facade.
//!
//! Owns the identity and chain collaborators, the unspent-output
//! snapshot, and the chain parameters, and exposes the send operations.
//! All entry points validate their parameters eagerly - before any
//! selection or signing - so invalid input never leaves partial effects.
//!
//! The snapshot is a shared mutable resource under a single-writer
//! discipline: every build runs against the current snapshot through
//! `&mut self`, and a successful broadcast marks the consumed outpoints
//! pending-spent before the method returns.

use serde::Deserialize;
use tracing::debug;

use evr_script::{Address, AssetSymbol, Network, Script};
use evr_transaction::fee::{estimated_fee, DEFAULT_FEE_RATE_PER_ITEM};
use evr_transaction::Transaction;

use crate::builder::{outpoint_of, TxAssembler};
use crate::chain::{script_hash_hex, ChainQuery};
use crate::identity::Identity;
use crate::selector::{select_asset, select_currency};
use crate::snapshot::UtxoSnapshot;
use crate::units;
use crate::WalletError;

/// Chain and protocol parameters for a wallet.
#[derive(Clone, Debug, Deserialize)]
pub struct WalletConfig {
    /// The network addresses are derived on.
    #[serde(skip, default = "default_network")]
    pub network: Network,
    /// The chain ticker embedded in asset tags.
    #[serde(skip, default = "default_symbol")]
    pub symbol: AssetSymbol,
    /// The asset this wallet watches and sends.
    pub asset_name: String,
    /// Decimal places the asset supports.
    pub divisibility: u8,
    /// Currency that must remain untouched to cover future fees.
    pub reserve_sats: u64,
    /// Per-item fee rate for the flat fee model.
    pub fee_rate_per_item: u64,
    /// The completer's compensation for a fee-delegated send.
    pub mundo_fee_sats: u64,
    /// The bridge operator's compensation for a cross-chain send.
    pub bridge_fee_sats: u64,
    /// The fixed bridge collection address.
    pub bridge_address: String,
    /// The burn address cross-chain sends pay into.
    pub burn_address: String,
    /// Upper bound on a single bridge send.
    pub max_bridge_amount_sats: u64,
}

fn default_network() -> Network {
    Network::Mainnet
}

fn default_symbol() -> AssetSymbol {
    AssetSymbol::Evr
}

impl Default for WalletConfig {
    fn default() -> Self {
        WalletConfig {
            network: Network::Mainnet,
            symbol: AssetSymbol::Evr,
            asset_name: "SATORI".to_string(),
            divisibility: 8,
            // 0.25 coin set aside so a server wallet can always pay fees.
            reserve_sats: 25_000_000,
            fee_rate_per_item: DEFAULT_FEE_RATE_PER_ITEM,
            // 0.0001 of the asset per delegated send.
            mundo_fee_sats: 10_000,
            // 0.01 of the asset per bridge send.
            bridge_fee_sats: 1_000_000,
            bridge_address: "EUqCW1WmT6a9Y6RBVhsxY1k4S135RPWCy7".to_string(),
            burn_address: "EXBurnMintXXXXXXXXXXXXXXXXXXXbdK5E".to_string(),
            max_bridge_amount_sats: 500 * units::COIN,
        }
    }
}

/// The wallet: identity + chain access + unspent snapshot + parameters.
pub struct Wallet<I: Identity, C: ChainQuery> {
    pub(crate) identity: I,
    pub(crate) chain: C,
    pub(crate) config: WalletConfig,
    pub(crate) snapshot: UtxoSnapshot,
}

impl<I: Identity, C: ChainQuery> Wallet<I, C> {
    /// Create a wallet with an empty snapshot.
    ///
    /// # Arguments
    /// * `identity` - The signing collaborator.
    /// * `chain` - The chain-query collaborator.
    /// * `config` - Chain and protocol parameters.
    pub fn new(identity: I, chain: C, config: WalletConfig) -> Self {
        Wallet {
            identity,
            chain,
            config,
            snapshot: UtxoSnapshot::default(),
        }
    }

    /// The wallet's own address.
    pub fn address(&self) -> Address {
        self.identity.address()
    }

    /// The active configuration.
    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    /// The current unspent snapshot.
    pub fn snapshot(&self) -> &UtxoSnapshot {
        &self.snapshot
    }

    /// Replace the snapshot (e.g. from a cache layer).
    pub fn set_snapshot(&mut self, snapshot: UtxoSnapshot) {
        self.snapshot = snapshot;
    }

    /// Spendable currency in sats.
    pub fn currency_balance(&self) -> u64 {
        self.snapshot.currency_total()
    }

    /// Spendable sats of the watched asset.
    pub fn asset_balance(&self) -> u64 {
        self.snapshot.asset_total(&self.config.asset_name)
    }

    /// The assembler bound to this wallet's identity and parameters.
    pub(crate) fn assembler(&self) -> TxAssembler<'_> {
        TxAssembler::new(
            &self.identity,
            self.config.network,
            self.config.symbol,
            self.config.fee_rate_per_item,
        )
    }

    // -----------------------------------------------------------------
    // Snapshot maintenance
    // -----------------------------------------------------------------

    /// Fetch a fresh snapshot of unspents from the chain.
    pub fn refresh_unspents(&mut self) -> Result<(), WalletError> {
        let script_hash = script_hash_hex(&self.own_locking_script());
        let unspents = self.chain.list_unspent(&script_hash)?;
        self.snapshot = UtxoSnapshot::from_unspents(unspents);
        Ok(())
    }

    /// Resolve locking scripts for unspents that arrived without one.
    ///
    /// Fetches each funding transaction once and attaches the matching
    /// output's script, so signing never has to guess.
    pub fn resolve_locking_scripts(&mut self) -> Result<(), WalletError> {
        for outpoint in self.snapshot.unresolved() {
            let Some(tx) = self.chain.get_raw_transaction(&outpoint.txid)? else {
                continue;
            };
            let Some(output) = tx.outputs.get(outpoint.vout as usize) else {
                continue;
            };
            self.snapshot
                .attach_script(&outpoint, output.locking_script.clone());
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Parameter validation
    // -----------------------------------------------------------------

    /// Validate and parse a recipient address.
    pub(crate) fn validate_address(&self, address: &str) -> Result<Address, WalletError> {
        if !units::is_valid_chain_address(address) {
            return Err(WalletError::InvalidParams(format!(
                "malformed address: {}",
                address
            )));
        }
        Address::from_string(address)
            .map_err(|e| WalletError::InvalidParams(format!("invalid address {}: {}", address, e)))
    }

    /// Validate a positive amount.
    pub(crate) fn validate_amount(&self, amount_sats: u64) -> Result<(), WalletError> {
        if amount_sats == 0 {
            return Err(WalletError::InvalidParams(
                "amount must be positive".to_string(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Sends
    // -----------------------------------------------------------------

    /// Send base currency to one address.
    ///
    /// # Arguments
    /// * `amount_sats` - The amount to send.
    /// * `address` - The recipient address.
    ///
    /// # Returns
    /// The broadcast transaction ID.
    pub fn send_currency(
        &mut self,
        amount_sats: u64,
        address: &str,
    ) -> Result<String, WalletError> {
        self.validate_amount(amount_sats)?;
        let recipient = self.validate_address(address)?;

        let sats = units::round_sats_down_to_divisibility(amount_sats, 8);
        let selection = select_currency(
            &self.snapshot.currency(),
            sats,
            self.config.reserve_sats,
            0,
            1,
            self.config.fee_rate_per_item,
            false,
        )?;

        let assembler = self.assembler();
        let inputs = assembler.compile_inputs(&selection.utxos, &[], &Default::default())?;
        let input_count = inputs.len();

        let mut outputs = vec![assembler.compile_currency_output(sats, &recipient)];
        if let Some((change, _)) =
            assembler.compile_currency_change(sats, selection.total_sats, input_count, 2, None)?
        {
            outputs.push(change);
        }

        let tx = assembler.create_transaction(
            inputs,
            outputs,
            &Default::default(),
            &Default::default(),
        )?;
        self.broadcast_and_mark(&tx)
    }

    /// Send the watched asset to one address, paying the fee in currency.
    ///
    /// # Arguments
    /// * `amount_sats` - The asset amount in minimal units.
    /// * `address` - The recipient address.
    ///
    /// # Returns
    /// The broadcast transaction ID.
    pub fn send_asset(&mut self, amount_sats: u64, address: &str) -> Result<String, WalletError> {
        self.validate_amount(amount_sats)?;
        let recipient = self.validate_address(address)?;

        let asset_name = self.config.asset_name.clone();
        let sats = units::round_sats_down_to_divisibility(amount_sats, self.config.divisibility);

        let asset_selection = select_asset(
            &self.snapshot.assets(&asset_name),
            &asset_name,
            sats,
            false,
        )?;
        // Currency gathered purely in anticipation of the fee.
        let currency_selection = select_currency(
            &self.snapshot.currency(),
            0,
            self.config.reserve_sats,
            asset_selection.utxos.len(),
            3,
            self.config.fee_rate_per_item,
            false,
        )?;

        let assembler = self.assembler();
        let inputs = assembler.compile_inputs(
            &currency_selection.utxos,
            &asset_selection.utxos,
            &Default::default(),
        )?;
        let input_count = inputs.len();

        let mut outputs = vec![assembler.compile_asset_output(&recipient, sats, &asset_name)?];
        if let Some(change) =
            assembler.compile_asset_change(sats, asset_selection.total_sats, &asset_name)?
        {
            outputs.push(change);
        }
        if let Some((change, _)) = assembler.compile_currency_change(
            0,
            currency_selection.total_sats,
            input_count,
            3,
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
        self.broadcast_and_mark(&tx)
    }

    /// Send the watched asset to many recipients in one transaction.
    ///
    /// # Arguments
    /// * `sats_by_address` - Recipient addresses and asset amounts;
    ///   between 1 and 1000 entries.
    /// * `memo` - Optional memo carried in a null-data output.
    /// * `broadcast` - Broadcast when true; return the raw hex otherwise.
    ///
    /// # Returns
    /// The transaction ID when broadcast, the raw hex otherwise.
    pub fn distribute(
        &mut self,
        sats_by_address: &[(String, u64)],
        memo: Option<&str>,
        broadcast: bool,
    ) -> Result<String, WalletError> {
        if sats_by_address.is_empty() || sats_by_address.len() > 1000 {
            return Err(WalletError::InvalidParams(
                "too many or too few recipients".to_string(),
            ));
        }

        let asset_name = self.config.asset_name.clone();
        let mut recipients: Vec<(Address, u64)> = Vec::with_capacity(sats_by_address.len());
        for (address, amount) in sats_by_address {
            self.validate_amount(*amount)?;
            let parsed = self.validate_address(address)?;
            recipients.push((
                parsed,
                units::round_sats_down_to_divisibility(*amount, self.config.divisibility),
            ));
        }

        let memo_count = usize::from(memo.is_some());
        let asset_total: u64 = recipients.iter().map(|(_, sats)| sats).sum();

        let asset_selection = select_asset(
            &self.snapshot.assets(&asset_name),
            &asset_name,
            asset_total,
            false,
        )?;
        let currency_selection = select_currency(
            &self.snapshot.currency(),
            0,
            self.config.reserve_sats,
            asset_selection.utxos.len(),
            recipients.len() + 2 + memo_count,
            self.config.fee_rate_per_item,
            false,
        )?;

        let assembler = self.assembler();
        let inputs = assembler.compile_inputs(
            &currency_selection.utxos,
            &asset_selection.utxos,
            &Default::default(),
        )?;
        let input_count = inputs.len();

        let mut outputs = Vec::with_capacity(recipients.len() + 3);
        for (address, sats) in &recipients {
            outputs.push(assembler.compile_asset_output(address, *sats, &asset_name)?);
        }
        if let Some(change) =
            assembler.compile_asset_change(asset_total, asset_selection.total_sats, &asset_name)?
        {
            outputs.push(change);
        }
        if let Some((change, _)) = assembler.compile_currency_change(
            0,
            currency_selection.total_sats,
            input_count,
            recipients.len() + 2 + memo_count,
            None,
        )? {
            outputs.push(change);
        }
        if let Some(memo_text) = memo {
            if let Some(output) = assembler.compile_memo_output(memo_text)? {
                outputs.push(output);
            }
        }

        let tx = assembler.create_transaction(
            inputs,
            outputs,
            &Default::default(),
            &Default::default(),
        )?;
        if broadcast {
            self.broadcast_and_mark(&tx)
        } else {
            Ok(tx.to_hex())
        }
    }

    /// Sweep every asset and currency output to one address.
    ///
    /// The fee comes out of the swept currency, so no change is emitted.
    ///
    /// # Arguments
    /// * `address` - The destination address.
    ///
    /// # Returns
    /// The broadcast transaction ID.
    pub fn sweep(&mut self, address: &str) -> Result<String, WalletError> {
        let recipient = self.validate_address(address)?;

        let asset_name = self.config.asset_name.clone();
        if self.snapshot.currency_total() < self.config.reserve_sats {
            return Err(WalletError::InsufficientFunds(
                "not enough currency for the sweep fee".to_string(),
            ));
        }

        let asset_utxos = self.snapshot.assets(&asset_name);
        let currency_utxos = self.snapshot.currency();
        let currency_total: u64 = currency_utxos.iter().map(|u| u.value_sats).sum();
        let asset_total: u64 = asset_utxos.iter().map(|u| u.value_sats).sum();

        let assembler = self.assembler();
        let inputs =
            assembler.compile_inputs(&currency_utxos, &asset_utxos, &Default::default())?;

        let fee = estimated_fee(inputs.len(), 2, self.config.fee_rate_per_item);
        let currency_less_fee = currency_total.checked_sub(fee).ok_or_else(|| {
            WalletError::InsufficientFunds("not enough currency to send".to_string())
        })?;

        let mut outputs = Vec::with_capacity(2);
        if !asset_utxos.is_empty() {
            outputs.push(assembler.compile_asset_output(
                &recipient,
                units::round_sats_down_to_divisibility(asset_total, self.config.divisibility),
                &asset_name,
            )?);
            if currency_less_fee > 0 {
                outputs.push(assembler.compile_currency_output(currency_less_fee, &recipient));
            }
        } else {
            if currency_less_fee == 0 {
                return Err(WalletError::InsufficientFunds(
                    "nothing left to sweep after the fee".to_string(),
                ));
            }
            outputs.push(assembler.compile_currency_output(currency_less_fee, &recipient));
        }

        let tx = assembler.create_transaction(
            inputs,
            outputs,
            &Default::default(),
            &Default::default(),
        )?;
        self.broadcast_and_mark(&tx)
    }

    // -----------------------------------------------------------------
    // Broadcast
    // -----------------------------------------------------------------

    /// Broadcast a transaction and mark its consumed outpoints
    /// pending-spent in the snapshot.
    pub(crate) fn broadcast_and_mark(&mut self, tx: &Transaction) -> Result<String, WalletError> {
        let txid = self.chain.broadcast(&tx.to_hex())?;
        self.snapshot
            .mark_pending_spent(tx.inputs.iter().map(outpoint_of));
        debug!(%txid, inputs = tx.inputs.len(), "transaction broadcast");
        Ok(txid)
    }

    /// The wallet's own change script (used by completer verification).
    pub(crate) fn own_locking_script(&self) -> Script {
        self.address().locking_script()
    }
}

#[cfg(test)]
mod tests {
    //! End-to-end tests for the wallet send operations over the mock chain.

    use super::*;
    use crate::testutil::{asset_utxo, currency_utxo, random_address, wallet_with};

    fn config() -> WalletConfig {
        WalletConfig {
            reserve_sats: 0,
            ..WalletConfig::default()
        }
    }

    /// A currency send builds one transfer plus change, broadcasts, and
    /// marks the consumed outpoints pending-spent.
    #[test]
    fn test_send_currency() {
        let mut wallet = wallet_with(
            config(),
            vec![currency_utxo(1, 0, 40_000_000), currency_utxo(2, 0, 60_000_000)],
        );
        let recipient = random_address();

        let txid = wallet.send_currency(10_000_000, &recipient).unwrap();
        assert_eq!(txid.len(), 64);

        let broadcasts = wallet.chain.broadcasts.borrow();
        assert_eq!(broadcasts.len(), 1);
        let tx = Transaction::from_hex(&broadcasts[0]).unwrap();
        // Smallest-first: the 40M output alone covers amount + fee.
        assert_eq!(tx.inputs.len(), 1);
        assert_eq!(tx.outputs[0].satoshis, 10_000_000);
        // Change = 40M - 10M - fee(1, 2) = 29_550_000.
        assert_eq!(tx.outputs[1].satoshis, 29_550_000);
        drop(broadcasts);

        // The consumed outpoint is gone from the snapshot view.
        assert_eq!(wallet.currency_balance(), 60_000_000);
    }

    /// Invalid parameters are rejected before anything is selected or
    /// signed: no broadcast happens.
    #[test]
    fn test_send_currency_validates_eagerly() {
        let mut wallet = wallet_with(config(), vec![currency_utxo(1, 0, 40_000_000)]);

        assert!(matches!(
            wallet.send_currency(0, &random_address()),
            Err(WalletError::InvalidParams(_))
        ));
        assert!(matches!(
            wallet.send_currency(1_000, "not-an-address"),
            Err(WalletError::InvalidParams(_))
        ));
        assert!(wallet.chain.broadcasts.borrow().is_empty());
        assert_eq!(wallet.currency_balance(), 40_000_000);
    }

    /// An asset send pairs asset inputs with a currency fee input and
    /// emits one change output per asset class.
    #[test]
    fn test_send_asset() {
        let mut wallet = wallet_with(
            config(),
            vec![
                currency_utxo(1, 0, 10_000_000),
                asset_utxo(2, 0, 500_000_000, "SATORI"),
            ],
        );
        let recipient = random_address();

        wallet.send_asset(200_000_000, &recipient).unwrap();
        let broadcasts = wallet.chain.broadcasts.borrow();
        let tx = Transaction::from_hex(&broadcasts[0]).unwrap();

        assert_eq!(tx.inputs.len(), 2);
        // Transfer, asset change, currency change.
        assert_eq!(tx.outputs.len(), 3);
        assert_eq!(
            tx.outputs[0].asset_payload().unwrap().amount_sats,
            200_000_000
        );
        assert_eq!(tx.outputs[0].satoshis, 0);
        assert_eq!(
            tx.outputs[1].asset_payload().unwrap().amount_sats,
            300_000_000
        );
        // Currency change: 10M - fee(2, 3) = 9_250_000.
        assert_eq!(tx.outputs[2].satoshis, 9_250_000);
    }

    /// Selection honours the configured reserve.
    #[test]
    fn test_reserve_blocks_send() {
        let mut wallet = wallet_with(
            WalletConfig {
                reserve_sats: 35_000_000,
                ..WalletConfig::default()
            },
            vec![currency_utxo(1, 0, 40_000_000)],
        );
        let err = wallet
            .send_currency(10_000_000, &random_address())
            .unwrap_err();
        assert!(matches!(err, WalletError::InsufficientFunds(_)));
        assert!(err.is_recoverable());
    }

    /// A distribution pays every recipient, carries the memo, and bounds
    /// the recipient count.
    #[test]
    fn test_distribute() {
        let mut wallet = wallet_with(
            config(),
            vec![
                currency_utxo(1, 0, 20_000_000),
                asset_utxo(2, 0, 900_000_000, "SATORI"),
            ],
        );
        let recipients = vec![
            (random_address(), 100_000_000u64),
            (random_address(), 250_000_000u64),
        ];

        let hex = wallet.distribute(&recipients, Some("payouts round 7"), false).unwrap();
        let tx = Transaction::from_hex(&hex).unwrap();

        // Two transfers, asset change, currency change, memo.
        assert_eq!(tx.outputs.len(), 5);
        assert_eq!(tx.outputs[0].asset_payload().unwrap().amount_sats, 100_000_000);
        assert_eq!(tx.outputs[1].asset_payload().unwrap().amount_sats, 250_000_000);
        assert_eq!(tx.outputs[2].asset_payload().unwrap().amount_sats, 550_000_000);
        assert!(tx.outputs[4].locking_script.is_null_data());
        // Not broadcast: the chain saw nothing.
        assert!(wallet.chain.broadcasts.borrow().is_empty());

        assert!(matches!(
            wallet.distribute(&[], None, false),
            Err(WalletError::InvalidParams(_))
        ));
    }

    /// A sweep moves everything to the destination with no change outputs,
    /// the fee coming out of the swept currency.
    #[test]
    fn test_sweep() {
        let mut wallet = wallet_with(
            config(),
            vec![
                currency_utxo(1, 0, 5_000_000),
                currency_utxo(2, 0, 3_000_000),
                asset_utxo(3, 0, 700_000_000, "SATORI"),
            ],
        );
        let recipient = random_address();

        wallet.sweep(&recipient).unwrap();
        let broadcasts = wallet.chain.broadcasts.borrow();
        let tx = Transaction::from_hex(&broadcasts[0]).unwrap();

        assert_eq!(tx.inputs.len(), 3);
        assert_eq!(tx.outputs.len(), 2);
        assert_eq!(tx.outputs[0].asset_payload().unwrap().amount_sats, 700_000_000);
        // Currency out: 8M - fee(3, 2) = 7_250_000.
        assert_eq!(tx.outputs[1].satoshis, 7_250_000);
    }

    /// A chain rejection surfaces as a broadcast error and leaves the
    /// snapshot untouched.
    #[test]
    fn test_broadcast_rejection() {
        let mut wallet = wallet_with(config(), vec![currency_utxo(1, 0, 40_000_000)]);
        wallet.chain.reject_with = Some("txn-mempool-conflict".to_string());

        let err = wallet
            .send_currency(10_000_000, &random_address())
            .unwrap_err();
        assert!(matches!(err, WalletError::Broadcast(_)));
        assert_eq!(wallet.currency_balance(), 40_000_000);
    }

    /// Refreshing unspents replaces the snapshot and script resolution
    /// fills gaps from fetched transactions.
    #[test]
    fn test_refresh_and_resolve() {
        let mut wallet = wallet_with(config(), vec![]);
        wallet
            .chain
            .unspents
            .borrow_mut()
            .push(currency_utxo(7, 0, 1_000_000));

        wallet.refresh_unspents().unwrap();
        assert_eq!(wallet.currency_balance(), 1_000_000);

        // Serve the funding transaction so the script resolves.
        let mut funding = Transaction::new();
        funding.add_output(evr_transaction::TransactionOutput::new(
            1_000_000,
            wallet.own_locking_script(),
        ));
        wallet
            .chain
            .raw_txs
            .borrow_mut()
            .insert(hex::encode([7u8; 32]), funding);

        wallet.resolve_locking_scripts().unwrap();
        assert!(wallet.snapshot.unresolved().is_empty());
    }
}
