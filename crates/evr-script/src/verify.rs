//! Structural spend verification.
//!
//! A post-signing sanity check that an unlocking script actually satisfies
//! the locking script it was built for. This is not a consensus
//! interpreter (consensus validation belongs to the chain); it recognizes
//! the script shapes this SDK produces and checks hashes and signatures
//! directly.
//!
//! Asset-tagged locking scripts are reported as
//! `ScriptError::UnsupportedOpcode(0xc0)` - the verifier does not execute
//! the asset extension opcode. Signing callers treat exactly that failure
//! as success (see `ScriptError::is_asset_opcode`); every other failure is
//! fatal to the build.
//!
//! Signature hashing depends on the transaction, which lives a crate
//! above; callers supply it through the [`SigContext`] trait to avoid a
//! circular dependency, following the same seam the interpreter/transaction
//! split uses elsewhere in the workspace.

use evr_primitives::ec::{PublicKey, Signature};
use evr_primitives::hash::hash160;

use crate::opcodes::OP_EVR_ASSET;
use crate::{Script, ScriptError};

/// Signature-hash provider for spend verification.
///
/// Implemented by the transaction layer; `script_code` is the script the
/// signature commits to (the locking script for P2PKH, the redeem script
/// for P2SH).
pub trait SigContext {
    /// Compute the signature hash for `input_index` committing to
    /// `script_code` under `sighash_flag`.
    fn signature_hash(
        &self,
        input_index: usize,
        script_code: &Script,
        sighash_flag: u32,
    ) -> Result<[u8; 32], ScriptError>;
}

/// Verify that `unlocking` satisfies `locking` for the given input.
///
/// # Arguments
/// * `unlocking` - The input's unlocking script (scriptSig).
/// * `locking` - The output's locking script (scriptPubKey).
/// * `ctx` - Signature-hash provider for the spending transaction.
/// * `input_index` - The index of the input being verified.
///
/// # Returns
/// `Ok(())` if the spend is satisfied; `UnsupportedOpcode(0xc0)` for
/// asset-tagged locking scripts; `VerificationFailed` otherwise.
pub fn verify_spend(
    unlocking: &Script,
    locking: &Script,
    ctx: &dyn SigContext,
    input_index: usize,
) -> Result<(), ScriptError> {
    // The asset extension opcode is outside this verifier's executable
    // set, exactly as it is outside a general-purpose engine's.
    if locking.is_asset_tagged() {
        return Err(ScriptError::UnsupportedOpcode(OP_EVR_ASSET));
    }

    if locking.is_p2pkh() {
        return verify_p2pkh(unlocking, locking, ctx, input_index);
    }
    if locking.is_p2sh() {
        return verify_p2sh(unlocking, locking, ctx, input_index);
    }

    Err(ScriptError::VerificationFailed(format!(
        "unrecognized locking script shape: {}",
        locking.to_asm()
    )))
}

/// Verify a `<sig> <pubkey>` unlocking script against a P2PKH template.
fn verify_p2pkh(
    unlocking: &Script,
    locking: &Script,
    ctx: &dyn SigContext,
    input_index: usize,
) -> Result<(), ScriptError> {
    let chunks = unlocking.chunks()?;
    if chunks.len() != 2 {
        return Err(ScriptError::VerificationFailed(format!(
            "P2PKH unlocking script has {} elements, expected 2",
            chunks.len()
        )));
    }
    let sig_bytes = chunks[0].data.as_deref().ok_or_else(|| {
        ScriptError::VerificationFailed("missing signature push".to_string())
    })?;
    let pubkey_bytes = chunks[1].data.as_deref().ok_or_else(|| {
        ScriptError::VerificationFailed("missing public key push".to_string())
    })?;

    let expected_hash = locking.public_key_hash()?;
    if hash160(pubkey_bytes) != expected_hash {
        return Err(ScriptError::VerificationFailed(
            "public key does not hash to the locked key hash".to_string(),
        ));
    }

    let pubkey = PublicKey::from_bytes(pubkey_bytes)?;
    check_signature(sig_bytes, &pubkey, locking, ctx, input_index)
}

/// Verify a `<sig>... <redeem>` unlocking script against a P2SH template.
///
/// The redeem script must be one of the shapes this SDK builds: an N-of-M
/// multisig or a payment-channel script (checked against its cooperative
/// 2-of-2 branch). Signatures must appear in the redeem script's key
/// order; each signature consumes keys forward, CHECKMULTISIG style.
fn verify_p2sh(
    unlocking: &Script,
    locking: &Script,
    ctx: &dyn SigContext,
    input_index: usize,
) -> Result<(), ScriptError> {
    let chunks = unlocking.chunks()?;
    let redeem_bytes = chunks.last().and_then(|c| c.data.as_deref()).ok_or_else(|| {
        ScriptError::VerificationFailed("missing redeem script push".to_string())
    })?;

    if hash160(redeem_bytes) != locking.script_hash()? {
        return Err(ScriptError::VerificationFailed(
            "redeem script does not hash to the locked script hash".to_string(),
        ));
    }

    let redeem = Script::from_bytes(redeem_bytes);
    let (required, keys) = if let Some(parts) = redeem.multisig_redeem_parts() {
        parts
    } else if let Some((sender, receiver)) = redeem.channel_redeem_parts() {
        (2, vec![sender, receiver])
    } else {
        return Err(ScriptError::VerificationFailed(
            "unrecognized redeem script shape".to_string(),
        ));
    };

    let sigs: Vec<&[u8]> = chunks[..chunks.len() - 1]
        .iter()
        .map(|c| c.data.as_deref())
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| {
            ScriptError::VerificationFailed("non-push element in unlocking script".to_string())
        })?;

    if sigs.len() < required {
        return Err(ScriptError::VerificationFailed(format!(
            "{} signatures present, {} required",
            sigs.len(),
            required
        )));
    }

    let mut key_index = 0usize;
    for sig_bytes in &sigs {
        let mut matched = false;
        while key_index < keys.len() {
            let pubkey = PublicKey::from_bytes(&keys[key_index])?;
            key_index += 1;
            if check_signature(sig_bytes, &pubkey, &redeem, ctx, input_index).is_ok() {
                matched = true;
                break;
            }
        }
        if !matched {
            return Err(ScriptError::VerificationFailed(
                "signature does not match any remaining key in script order".to_string(),
            ));
        }
    }

    Ok(())
}

/// Check one `<DER || flag>` signature against a key and script code.
fn check_signature(
    sig_bytes: &[u8],
    pubkey: &PublicKey,
    script_code: &Script,
    ctx: &dyn SigContext,
    input_index: usize,
) -> Result<(), ScriptError> {
    let (der, flag) = sig_bytes.split_at(sig_bytes.len().saturating_sub(1));
    if der.is_empty() {
        return Err(ScriptError::VerificationFailed(
            "signature too short".to_string(),
        ));
    }
    let signature = Signature::from_der(der)?;
    let hash = ctx.signature_hash(input_index, script_code, flag[0] as u32)?;
    if pubkey.verify(&hash, &signature) {
        Ok(())
    } else {
        Err(ScriptError::VerificationFailed(
            "signature does not verify".to_string(),
        ))
    }
}
