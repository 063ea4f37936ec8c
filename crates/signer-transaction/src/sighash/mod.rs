//! Signature hash computation for transaction signing.
//!
//! Computes the digest that is signed by ECDSA to authorize spending a
//! transaction input. Non-witness templates use the original (legacy)
//! algorithm; witness templates use the BIP143 algorithm, which commits
//! to the value being spent.

use signer_primitives::hash::sha256d;
use signer_primitives::util::{VarInt, WireWriter};

use crate::transaction::Transaction;
use crate::TransactionError;

// -----------------------------------------------------------------------
// Sighash flag constants
// -----------------------------------------------------------------------

/// Sign all inputs and all outputs (the default).
pub const SIGHASH_ALL: u32 = 0x01;

/// Sign all inputs but no outputs, allowing outputs to be modified.
pub const SIGHASH_NONE: u32 = 0x02;

/// Sign all inputs and only the output with the same index as the signed input.
pub const SIGHASH_SINGLE: u32 = 0x03;

/// Combined with another flag: only sign the current input, allowing other
/// inputs to be added later.
pub const SIGHASH_ANYONECANPAY: u32 = 0x80;

/// Mask applied to extract the base sighash type (ALL, NONE, SINGLE).
pub const SIGHASH_MASK: u32 = 0x1f;

// -----------------------------------------------------------------------
// Legacy signature hash
// -----------------------------------------------------------------------

/// Compute the legacy (pre-segwit) signature hash for a given input.
///
/// The transaction is re-serialized with every scriptSig blanked except
/// the signed input's, which carries the script code (the locking script
/// or redeem script being satisfied); the 4-byte sighash type is appended
/// before double-hashing.
///
/// # Arguments
/// * `tx`           - The transaction being signed.
/// * `input_index`  - Index of the input being signed.
/// * `script_code`  - The script being satisfied (locking or redeem script).
/// * `sighash_type` - The combined sighash flags (e.g. `SIGHASH_ALL`).
///
/// # Returns
/// A 32-byte double-SHA256 digest to be signed by ECDSA.
pub fn legacy_signature_hash(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    sighash_type: u32,
) -> Result<[u8; 32], TransactionError> {
    if input_index >= tx.inputs.len() {
        return Err(TransactionError::InvalidTransaction(format!(
            "input index {} out of range (tx has {} inputs)",
            input_index,
            tx.inputs.len()
        )));
    }

    let base_type = sighash_type & SIGHASH_MASK;
    let anyone_can_pay = sighash_type & SIGHASH_ANYONECANPAY != 0;

    // SIGHASH_SINGLE with no matching output signs the constant 1-hash.
    // A consensus quirk every implementation reproduces.
    if base_type == SIGHASH_SINGLE && input_index >= tx.outputs.len() {
        let mut one = [0u8; 32];
        one[0] = 0x01;
        return Ok(one);
    }

    let mut writer = WireWriter::with_capacity(256);
    writer.write_u32_le(tx.version);

    // Inputs.
    if anyone_can_pay {
        writer.write_varint(VarInt::from(1u64));
        write_legacy_input(&mut writer, tx, input_index, input_index, script_code, base_type);
    } else {
        writer.write_varint(VarInt::from(tx.inputs.len()));
        for idx in 0..tx.inputs.len() {
            write_legacy_input(&mut writer, tx, idx, input_index, script_code, base_type);
        }
    }

    // Outputs.
    match base_type {
        SIGHASH_NONE => {
            writer.write_varint(VarInt::from(0u64));
        }
        SIGHASH_SINGLE => {
            writer.write_varint(VarInt::from(input_index + 1));
            for idx in 0..=input_index {
                if idx == input_index {
                    writer.write_bytes(&tx.outputs[idx].to_bytes());
                } else {
                    // Blanked output: maximal value, empty script.
                    writer.write_u64_le(u64::MAX);
                    writer.write_varint(VarInt::from(0u64));
                }
            }
        }
        _ => {
            writer.write_varint(VarInt::from(tx.outputs.len()));
            for output in &tx.outputs {
                writer.write_bytes(&output.to_bytes());
            }
        }
    }

    writer.write_u32_le(tx.lock_time);
    writer.write_u32_le(sighash_type);

    Ok(sha256d(writer.as_bytes()))
}

/// Write one input of the legacy sighash serialization.
///
/// The signed input carries the script code; all others are blanked, and
/// their sequences are zeroed under NONE/SINGLE.
fn write_legacy_input(
    writer: &mut WireWriter,
    tx: &Transaction,
    idx: usize,
    signed_index: usize,
    script_code: &[u8],
    base_type: u32,
) {
    let input = &tx.inputs[idx];
    writer.write_bytes(&input.prev_txid);
    writer.write_u32_le(input.prev_vout);

    if idx == signed_index {
        writer.write_varint(VarInt::from(script_code.len()));
        writer.write_bytes(script_code);
        writer.write_u32_le(input.sequence);
    } else {
        writer.write_varint(VarInt::from(0u64));
        let sequence = if base_type == SIGHASH_NONE || base_type == SIGHASH_SINGLE {
            0
        } else {
            input.sequence
        };
        writer.write_u32_le(sequence);
    }
}

// -----------------------------------------------------------------------
// BIP143 (witness v0) signature hash
// -----------------------------------------------------------------------

/// Compute the BIP143 signature hash for a given witness input.
///
/// Commits to the value being spent and uses a different serialization
/// order than the legacy algorithm.
///
/// # Arguments
/// * `tx`           - The transaction being signed.
/// * `input_index`  - Index of the input being signed.
/// * `script_code`  - The script code (P2PKH form for P2WPKH, the witness
///   script for P2WSH).
/// * `value`        - The minor-unit value of the output being spent.
/// * `sighash_type` - The combined sighash flags (e.g. `SIGHASH_ALL`).
///
/// # Returns
/// A 32-byte double-SHA256 digest to be signed by ECDSA.
pub fn witness_v0_signature_hash(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    value: u64,
    sighash_type: u32,
) -> Result<[u8; 32], TransactionError> {
    let preimage = witness_v0_preimage(tx, input_index, script_code, value, sighash_type)?;
    Ok(sha256d(&preimage))
}

/// Compute the BIP143 preimage bytes before double-hashing.
///
/// The preimage consists of:
/// 1. nVersion (4 bytes LE)
/// 2. hashPrevouts (32 bytes) - sha256d of all outpoints unless ANYONECANPAY
/// 3. hashSequence (32 bytes) - sha256d of all sequences unless ANYONECANPAY/SINGLE/NONE
/// 4. outpoint (32+4 bytes) - txid + vout of the input being signed
/// 5. scriptCode (varint + script)
/// 6. value (8 bytes LE) - minor units of the output being spent
/// 7. nSequence (4 bytes LE) - sequence of the input being signed
/// 8. hashOutputs (32 bytes) - sha256d of all outputs or one output
/// 9. nLocktime (4 bytes LE)
/// 10. sighashType (4 bytes LE)
///
/// # Arguments
/// * `tx`           - The transaction being signed.
/// * `input_index`  - Index of the input being signed.
/// * `script_code`  - The script code being satisfied.
/// * `value`        - The minor-unit value of the output being spent.
/// * `sighash_type` - The combined sighash flags.
///
/// # Returns
/// The raw preimage bytes (not yet hashed).
pub fn witness_v0_preimage(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    value: u64,
    sighash_type: u32,
) -> Result<Vec<u8>, TransactionError> {
    if input_index >= tx.inputs.len() {
        return Err(TransactionError::InvalidTransaction(format!(
            "input index {} out of range (tx has {} inputs)",
            input_index,
            tx.inputs.len()
        )));
    }

    let input = &tx.inputs[input_index];
    let base_type = sighash_type & SIGHASH_MASK;
    let anyone_can_pay = sighash_type & SIGHASH_ANYONECANPAY != 0;

    let hash_prevouts = if !anyone_can_pay {
        prevouts_hash(tx)
    } else {
        [0u8; 32]
    };

    let hash_sequence =
        if !anyone_can_pay && base_type != SIGHASH_SINGLE && base_type != SIGHASH_NONE {
            sequence_hash(tx)
        } else {
            [0u8; 32]
        };

    let hash_outputs = if base_type != SIGHASH_SINGLE && base_type != SIGHASH_NONE {
        outputs_hash(tx, None)
    } else if base_type == SIGHASH_SINGLE && input_index < tx.outputs.len() {
        outputs_hash(tx, Some(input_index))
    } else {
        [0u8; 32]
    };

    let mut writer = WireWriter::with_capacity(256);

    writer.write_u32_le(tx.version);
    writer.write_bytes(&hash_prevouts);
    writer.write_bytes(&hash_sequence);

    writer.write_bytes(&input.prev_txid);
    writer.write_u32_le(input.prev_vout);

    writer.write_varint(VarInt::from(script_code.len()));
    writer.write_bytes(script_code);

    writer.write_u64_le(value);
    writer.write_u32_le(input.sequence);

    writer.write_bytes(&hash_outputs);
    writer.write_u32_le(tx.lock_time);
    writer.write_u32_le(sighash_type);

    Ok(writer.into_bytes())
}

// -----------------------------------------------------------------------
// Internal helper functions
// -----------------------------------------------------------------------

/// Compute the double-SHA256 of all input outpoints concatenated.
///
/// Each outpoint is txid (32 bytes) + vout (4 bytes LE).
fn prevouts_hash(tx: &Transaction) -> [u8; 32] {
    let mut writer = WireWriter::with_capacity(tx.inputs.len() * 36);
    for input in &tx.inputs {
        writer.write_bytes(&input.prev_txid);
        writer.write_u32_le(input.prev_vout);
    }
    sha256d(writer.as_bytes())
}

/// Compute the double-SHA256 of all input sequence numbers concatenated.
fn sequence_hash(tx: &Transaction) -> [u8; 32] {
    let mut writer = WireWriter::with_capacity(tx.inputs.len() * 4);
    for input in &tx.inputs {
        writer.write_u32_le(input.sequence);
    }
    sha256d(writer.as_bytes())
}

/// Compute the double-SHA256 of serialized outputs.
///
/// With `only` set, only that output is included (SIGHASH_SINGLE).
fn outputs_hash(tx: &Transaction, only: Option<usize>) -> [u8; 32] {
    let mut writer = WireWriter::new();
    match only {
        None => {
            for output in &tx.outputs {
                writer.write_bytes(&output.to_bytes());
            }
        }
        Some(n) => {
            writer.write_bytes(&tx.outputs[n].to_bytes());
        }
    }
    sha256d(writer.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::TxInput;
    use crate::output::TxOutput;
    use signer_script::Script;

    fn two_in_two_out() -> Transaction {
        let mut tx = Transaction::new();
        for vout in 0..2 {
            tx.add_input(
                TxInput::from_display_txid(
                    "f4184fc596403b9d638783cf57adfe4c75c605f6356fbc91338530e9831e9e16",
                    vout,
                )
                .unwrap(),
            );
        }
        for value in [100_000u64, 200_000] {
            tx.add_output(TxOutput::new(
                value,
                Script::from_hex("76a914751e76e8199196d454941c45d1b3a323f1433bd688ac")
                    .unwrap(),
            ));
        }
        tx
    }

    #[test]
    fn test_legacy_digest_depends_on_signed_input() {
        let tx = two_in_two_out();
        let code = hex::decode("76a914751e76e8199196d454941c45d1b3a323f1433bd688ac").unwrap();
        let d0 = legacy_signature_hash(&tx, 0, &code, SIGHASH_ALL).unwrap();
        let d1 = legacy_signature_hash(&tx, 1, &code, SIGHASH_ALL).unwrap();
        assert_ne!(d0, d1);

        // Deterministic for the same input.
        assert_eq!(d0, legacy_signature_hash(&tx, 0, &code, SIGHASH_ALL).unwrap());
    }

    #[test]
    fn test_legacy_digest_depends_on_script_code() {
        let tx = two_in_two_out();
        let code_a = hex::decode("76a914751e76e8199196d454941c45d1b3a323f1433bd688ac").unwrap();
        let code_b = hex::decode("51").unwrap();
        assert_ne!(
            legacy_signature_hash(&tx, 0, &code_a, SIGHASH_ALL).unwrap(),
            legacy_signature_hash(&tx, 0, &code_b, SIGHASH_ALL).unwrap()
        );
    }

    #[test]
    fn test_legacy_single_out_of_range_is_one_hash() {
        let mut tx = two_in_two_out();
        tx.outputs.truncate(1);
        let code = hex::decode("51").unwrap();
        let digest = legacy_signature_hash(&tx, 1, &code, SIGHASH_SINGLE).unwrap();
        let mut one = [0u8; 32];
        one[0] = 0x01;
        assert_eq!(digest, one);
    }

    #[test]
    fn test_legacy_index_out_of_range() {
        let tx = two_in_two_out();
        assert!(legacy_signature_hash(&tx, 2, &[], SIGHASH_ALL).is_err());
    }

    #[test]
    fn test_witness_digest_commits_to_value() {
        let tx = two_in_two_out();
        let code = hex::decode("76a914751e76e8199196d454941c45d1b3a323f1433bd688ac").unwrap();
        let with_value_a =
            witness_v0_signature_hash(&tx, 0, &code, 100_000, SIGHASH_ALL).unwrap();
        let with_value_b =
            witness_v0_signature_hash(&tx, 0, &code, 100_001, SIGHASH_ALL).unwrap();
        assert_ne!(with_value_a, with_value_b);
    }

    #[test]
    fn test_witness_digest_differs_from_legacy() {
        let tx = two_in_two_out();
        let code = hex::decode("76a914751e76e8199196d454941c45d1b3a323f1433bd688ac").unwrap();
        assert_ne!(
            legacy_signature_hash(&tx, 0, &code, SIGHASH_ALL).unwrap(),
            witness_v0_signature_hash(&tx, 0, &code, 100_000, SIGHASH_ALL).unwrap()
        );
    }

    #[test]
    fn test_witness_index_out_of_range() {
        let tx = two_in_two_out();
        assert!(witness_v0_signature_hash(&tx, 5, &[], 0, SIGHASH_ALL).is_err());
    }
}
