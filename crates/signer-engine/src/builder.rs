//! Transaction builder: intent -> signed transaction or partial bundle.
//!
//! Consumes a server-supplied transaction intent, builds the canonical
//! unsigned transaction, verifies it against the expected transaction ID,
//! determines full-versus-partial signability per input, drives signing,
//! and serializes the result.

use std::collections::HashMap;

use log::debug;

use signer_primitives::hash::hash160;
use signer_script::spend::{resolve_spend_info, SpendInfo};
use signer_script::{address, network, AddressType, Script};
use signer_transaction::sighash::{
    legacy_signature_hash, witness_v0_signature_hash, SIGHASH_ALL,
};
use signer_transaction::{Transaction, TransactionError, TxInput, TxOutput};

use crate::amount;
use crate::intent::{AddressMetadata, InputSignature, SigningResult, TransactionIntent};
use crate::keystore::KeyStore;
use crate::EngineError;

/// One input's resolved context, carried from construction to signing.
struct InputPlan<'a> {
    /// Position of the input in the transaction.
    index: usize,

    /// Metadata of the spending address.
    metadata: &'a AddressMetadata,

    /// Resolved output/redeem/witness scripts.
    spend: SpendInfo,

    /// The spent output's value in minor units.
    value: u64,
}

/// Build, verify, and sign a transaction intent.
///
/// Implements the full construction algorithm: explicit keys are
/// validated and imported (all-or-nothing), the user key is decrypted if
/// needed, the unsigned transaction is assembled in intent order and
/// checked against the expected transaction ID, and then every input is
/// signed either fully (finalized transaction) or partially (signature
/// bundle for other signers).
///
/// The caller is responsible for purging `store` afterwards; the engine
/// does so with a scope guard around this call.
///
/// # Arguments
/// * `store` - The call-scoped key store.
/// * `intent` - The server-supplied transaction intent.
/// * `explicit_keys` - Raw hex private keys supplied by the caller.
/// * `pin` - PIN for user-key decryption, if one is available.
///
/// # Returns
/// The signing result, or the first error encountered.
pub fn create_and_sign(
    store: &mut KeyStore,
    intent: &TransactionIntent,
    explicit_keys: &[String],
    pin: Option<&str>,
) -> Result<SigningResult, EngineError> {
    // Step 1: validate every explicit key before storing any of them, so
    // a malformed entry aborts with no side effect on the store.
    let mut parsed_keys = Vec::with_capacity(explicit_keys.len());
    for key_hex in explicit_keys {
        parsed_keys.push(KeyStore::parse_hex_key(key_hex)?);
    }
    for key in parsed_keys {
        store.insert(key);
    }

    // Step 2: decrypt the user key when the intent carries one we do not
    // already hold.
    if let Some(user_key) = &intent.user_key {
        if !store.contains(&user_key.public_key) {
            let pin = pin.ok_or(EngineError::MissingPin)?;
            store.decrypt_and_import(user_key, pin)?;
        }
    }

    // Step 3: index address metadata for per-input lookup.
    let metadata: HashMap<&str, &AddressMetadata> = intent
        .input_address_data
        .iter()
        .map(|m| (m.address.as_str(), m))
        .collect();

    // Step 4: assemble inputs in order, tracking signability.
    let params = network::params_for(&intent.network)?;
    let mut tx = Transaction::new();
    let mut plans = Vec::with_capacity(intent.inputs.len());
    let mut fully_signable = true;

    for input in &intent.inputs {
        let meta = metadata
            .get(input.spending_address.as_str())
            .copied()
            .ok_or_else(|| EngineError::MissingAddressData(input.spending_address.clone()))?;

        let spend = resolve_spend_info(
            meta.address_type,
            &meta.public_keys,
            meta.required_signatures,
            params,
        )?;
        let value = amount::to_minor_units(&input.input_value)?;

        let mut txin =
            TxInput::from_display_txid(&input.previous_txid, input.previous_output_index)?;
        txin.set_spent_output(Some(TxOutput::new(value, spend.output_script.clone())));
        tx.add_input(txin);

        let available = meta
            .public_keys
            .iter()
            .filter(|pk| store.contains(pk))
            .count();
        fully_signable = fully_signable && available >= meta.required_signatures;

        plans.push(InputPlan {
            index: input.input_index as usize,
            metadata: meta,
            spend,
            value,
        });
    }

    // Step 5: append outputs in order.
    for output in &intent.outputs {
        let script = address::to_output_script(&output.receiving_address, params)?;
        let value = amount::to_minor_units(&output.output_value)?;
        tx.add_output(TxOutput::new(value, script));
    }

    // Step 6: the unsigned transaction must reproduce the ID the user
    // reviewed; a mismatch means the server-supplied intent is not what
    // it claims and nothing may be signed.
    if let Some(expected) = &intent.expected_unsigned_txid {
        let built = tx.tx_id_hex();
        if built != *expected {
            return Err(EngineError::UnsignedTxidMismatch {
                expected: expected.clone(),
                built,
            });
        }
    }

    debug!(
        "built unsigned tx {} ({} inputs, {} outputs, fully_signable={})",
        tx.tx_id_hex(),
        tx.input_count(),
        tx.output_count(),
        fully_signable
    );

    // Steps 7/8: sign.
    if fully_signable {
        for plan in &plans {
            sign_input(store, &mut tx, plan)?;
        }
        Ok(SigningResult {
            tx_type: intent.tx_type.clone(),
            tx_hex: tx.to_hex(),
            signatures: None,
        })
    } else {
        let mut signatures = Vec::new();
        for plan in &plans {
            collect_partial_signatures(store, &tx, plan, &mut signatures)?;
        }
        debug!(
            "produced {} partial signatures for tx {}",
            signatures.len(),
            tx.tx_id_hex()
        );
        Ok(SigningResult {
            tx_type: intent.tx_type.clone(),
            tx_hex: tx.to_hex(),
            signatures: Some(signatures),
        })
    }
}

/// Fully sign one input and attach its scriptSig/witness.
fn sign_input(
    store: &KeyStore,
    tx: &mut Transaction,
    plan: &InputPlan<'_>,
) -> Result<(), EngineError> {
    let idx = plan.index;
    if idx >= tx.input_count() {
        return Err(EngineError::Transaction(TransactionError::SigningError(
            format!("input index {} out of range", idx),
        )));
    }

    match plan.spend.address_type {
        AddressType::P2pkh => {
            let (pubkey, signature) = sign_single_key(
                store,
                &legacy_signature_hash(
                    tx,
                    idx,
                    plan.spend.output_script.to_bytes(),
                    SIGHASH_ALL,
                )?,
                plan.metadata,
            )?;

            let mut script_sig = Script::new();
            script_sig.append_push_data(&signature)?;
            script_sig.append_push_data(&pubkey)?;
            tx.inputs[idx].script_sig = Some(script_sig);
        }
        AddressType::P2wpkh | AddressType::P2wpkhOverP2sh => {
            // BIP143 script code for a key-hash spend is the P2PKH form
            // of the same hash.
            let key_bytes = decode_first_key(plan.metadata)?;
            let script_code = signer_script::spend::p2pkh_script(&hash160(&key_bytes));
            let digest =
                witness_v0_signature_hash(tx, idx, script_code.to_bytes(), plan.value, SIGHASH_ALL)?;
            let (pubkey, signature) = sign_single_key(store, &digest, plan.metadata)?;

            tx.inputs[idx].witness = vec![signature, pubkey];
            if plan.spend.address_type == AddressType::P2wpkhOverP2sh {
                tx.inputs[idx].script_sig = Some(redeem_push(&plan.spend)?);
            }
        }
        AddressType::P2sh => {
            let redeem = plan.spend.redeem_script.as_ref().ok_or_else(|| {
                EngineError::Transaction(TransactionError::SigningError(
                    "P2SH spend info has no redeem script".to_string(),
                ))
            })?;
            let digest = legacy_signature_hash(tx, idx, redeem.to_bytes(), SIGHASH_ALL)?;
            let signatures = sign_threshold(store, &digest, plan.metadata)?;

            // CHECKMULTISIG pops one extra stack element; the dummy
            // leads, then the signatures in public-key order.
            let mut script_sig = Script::new();
            script_sig.append_opcode(signer_script::opcodes::OP_0);
            for signature in &signatures {
                script_sig.append_push_data(signature)?;
            }
            script_sig.append_push_data(redeem.to_bytes())?;
            tx.inputs[idx].script_sig = Some(script_sig);
        }
        AddressType::P2wshOverP2sh | AddressType::WitnessV0 => {
            let witness_script = plan.spend.witness_script.as_ref().ok_or_else(|| {
                EngineError::Transaction(TransactionError::SigningError(
                    "P2WSH spend info has no witness script".to_string(),
                ))
            })?;
            let digest = witness_v0_signature_hash(
                tx,
                idx,
                witness_script.to_bytes(),
                plan.value,
                SIGHASH_ALL,
            )?;
            let signatures = sign_threshold(store, &digest, plan.metadata)?;

            let mut witness = Vec::with_capacity(signatures.len() + 2);
            witness.push(Vec::new()); // CHECKMULTISIG dummy
            witness.extend(signatures);
            witness.push(witness_script.to_bytes().to_vec());
            tx.inputs[idx].witness = witness;

            if plan.spend.address_type == AddressType::P2wshOverP2sh {
                tx.inputs[idx].script_sig = Some(redeem_push(&plan.spend)?);
            }
        }
    }
    Ok(())
}

/// Compute and record this party's signatures for one not-fully-signable
/// input.
///
/// Only the multisig templates can be partially signed; single-key
/// templates cannot appear in a partial bundle.
fn collect_partial_signatures(
    store: &KeyStore,
    tx: &Transaction,
    plan: &InputPlan<'_>,
    signatures: &mut Vec<InputSignature>,
) -> Result<(), EngineError> {
    let idx = plan.index;

    let digest = match plan.spend.address_type {
        AddressType::P2sh => {
            let redeem = plan.spend.redeem_script.as_ref().ok_or_else(|| {
                EngineError::Transaction(TransactionError::SigningError(
                    "P2SH spend info has no redeem script".to_string(),
                ))
            })?;
            legacy_signature_hash(tx, idx, redeem.to_bytes(), SIGHASH_ALL)?
        }
        AddressType::P2wshOverP2sh | AddressType::WitnessV0 => {
            let witness_script = plan.spend.witness_script.as_ref().ok_or_else(|| {
                EngineError::Transaction(TransactionError::SigningError(
                    "P2WSH spend info has no witness script".to_string(),
                ))
            })?;
            witness_v0_signature_hash(
                tx,
                idx,
                witness_script.to_bytes(),
                plan.value,
                SIGHASH_ALL,
            )?
        }
        other => {
            return Err(EngineError::PartialSigningUnsupported(
                other.as_str().to_string(),
            ))
        }
    };

    // Sign with every key this party holds; the wire signature carries
    // no sighash byte.
    for pubkey in &plan.metadata.public_keys {
        if store.contains(pubkey) {
            let signature = store.sign(pubkey, &digest)?;
            signatures.push(InputSignature {
                input_index: plan.index as u32,
                public_key: pubkey.clone(),
                signature: signature.to_der_hex(),
            });
        }
    }
    Ok(())
}

/// Sign a digest with the one available key of a single-key template.
///
/// Returns the raw pubkey bytes and the DER signature with the
/// `SIGHASH_ALL` byte appended, ready for script/witness embedding.
fn sign_single_key(
    store: &KeyStore,
    digest: &[u8; 32],
    metadata: &AddressMetadata,
) -> Result<(Vec<u8>, Vec<u8>), EngineError> {
    for pubkey in &metadata.public_keys {
        if store.contains(pubkey) {
            let signature = store.sign(pubkey, digest)?;
            let key_bytes = hex::decode(pubkey)
                .map_err(signer_primitives::PrimitivesError::from)?;
            return Ok((key_bytes, with_sighash_byte(&signature.to_der())));
        }
    }
    Err(EngineError::UnknownSigner(
        metadata.public_keys.first().cloned().unwrap_or_default(),
    ))
}

/// Sign a digest with available keys in public-key order, stopping at
/// the required threshold.
///
/// Signature order must match key order for CHECKMULTISIG to accept.
fn sign_threshold(
    store: &KeyStore,
    digest: &[u8; 32],
    metadata: &AddressMetadata,
) -> Result<Vec<Vec<u8>>, EngineError> {
    let mut signatures = Vec::with_capacity(metadata.required_signatures);
    for pubkey in &metadata.public_keys {
        if signatures.len() == metadata.required_signatures {
            break;
        }
        if store.contains(pubkey) {
            let signature = store.sign(pubkey, digest)?;
            signatures.push(with_sighash_byte(&signature.to_der()));
        }
    }
    if signatures.len() < metadata.required_signatures {
        return Err(EngineError::UnknownSigner(format!(
            "{} of {} required signers available for {}",
            signatures.len(),
            metadata.required_signatures,
            metadata.address
        )));
    }
    Ok(signatures)
}

/// Build the scriptSig that pushes a nested-segwit redeem script.
fn redeem_push(spend: &SpendInfo) -> Result<Script, EngineError> {
    let redeem = spend.redeem_script.as_ref().ok_or_else(|| {
        EngineError::Transaction(TransactionError::SigningError(
            "nested segwit spend info has no redeem script".to_string(),
        ))
    })?;
    let mut script_sig = Script::new();
    script_sig.append_push_data(redeem.to_bytes())?;
    Ok(script_sig)
}

/// Decode the first public key of a single-key template.
fn decode_first_key(metadata: &AddressMetadata) -> Result<Vec<u8>, EngineError> {
    let pubkey = metadata.public_keys.first().ok_or_else(|| {
        EngineError::Script(signer_script::ScriptError::InvalidPublicKey(
            "no public keys supplied".to_string(),
        ))
    })?;
    Ok(hex::decode(pubkey).map_err(signer_primitives::PrimitivesError::from)?)
}

/// Append the `SIGHASH_ALL` byte to a DER signature.
fn with_sighash_byte(der: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(der.len() + 1);
    out.extend_from_slice(der);
    out.push(SIGHASH_ALL as u8);
    out
}
