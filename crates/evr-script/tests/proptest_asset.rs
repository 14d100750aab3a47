use proptest::prelude::*;

use evr_script::asset::{asset_script, split_asset_script, AssetPayload, AssetSymbol};
use evr_script::build::p2pkh_script;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// decode(encode(symbol, name, amount)) reproduces the payload for
    /// amounts across the whole representable range, including zero and
    /// values that need the full 8-byte little-endian field.
    #[test]
    fn asset_payload_roundtrip(
        amount in any::<u64>(),
        name in "[A-Z][A-Z0-9._]{0,29}",
        evr in any::<bool>(),
    ) {
        let symbol = if evr { AssetSymbol::Evr } else { AssetSymbol::Rvn };
        let payload = AssetPayload::new(symbol, &name, amount).unwrap();
        let decoded = AssetPayload::decode(&payload.encode()).unwrap();
        prop_assert_eq!(decoded, payload);
    }

    /// Tagging a base script and splitting it back recovers both halves
    /// byte-exactly.
    #[test]
    fn asset_script_split_roundtrip(
        amount in any::<u64>(),
        hash in prop::array::uniform20(any::<u8>()),
    ) {
        let base = p2pkh_script(&hash);
        let payload = AssetPayload::new(AssetSymbol::Evr, "SATORI", amount).unwrap();
        let tagged = asset_script(&base, &payload).unwrap();

        let (split_base, split_payload) = split_asset_script(&tagged).unwrap().unwrap();
        prop_assert_eq!(split_base.to_bytes(), base.to_bytes());
        prop_assert_eq!(split_payload, payload);
    }

    /// Decoding tolerates stripped trailing zeros in the amount field:
    /// any truncation of the zero tail decodes to the same amount.
    #[test]
    fn asset_payload_stripped_zero_tolerance(amount in any::<u64>()) {
        let payload = AssetPayload::new(AssetSymbol::Evr, "SATORI", amount).unwrap();
        let mut bytes = payload.encode();
        while bytes.last() == Some(&0) && bytes.len() > 11 {
            bytes.pop();
            let decoded = AssetPayload::decode(&bytes).unwrap();
            prop_assert_eq!(decoded.amount_sats, amount);
        }
    }
}
