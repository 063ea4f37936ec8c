//! Address encoding and decoding.
//!
//! Base58Check (P2PKH / P2SH) and bech32 (native segwit) address support,
//! plus conversion between address strings and output scripts. Network
//! version bytes and bech32 prefixes come from the parameter registry.

use bech32::{u5, Variant};

use signer_primitives::hash::sha256d;

use crate::network::NetworkParams;
use crate::opcodes::{op_small_int, OP_0};
use crate::{Script, ScriptError};

/// Encode a versioned payload as a Base58Check string.
///
/// # Arguments
/// * `version` - The network version byte.
/// * `payload` - The payload bytes (a 20-byte hash for addresses).
///
/// # Returns
/// The Base58Check string: base58(version || payload || checksum4).
pub fn base58check_encode(version: u8, payload: &[u8]) -> String {
    let mut bytes = Vec::with_capacity(1 + payload.len() + 4);
    bytes.push(version);
    bytes.extend_from_slice(payload);
    let checksum = sha256d(&bytes);
    bytes.extend_from_slice(&checksum[..4]);
    bs58::encode(bytes).into_string()
}

/// Decode a Base58Check string into its version byte and payload.
///
/// Validates the 4-byte double-SHA256 checksum.
///
/// # Arguments
/// * `encoded` - The Base58Check string.
///
/// # Returns
/// `Ok((version, payload))`, or an error if the string is malformed or
/// the checksum fails.
pub fn base58check_decode(encoded: &str) -> Result<(u8, Vec<u8>), ScriptError> {
    let decoded = bs58::decode(encoded)
        .into_vec()
        .map_err(|_| ScriptError::InvalidAddress(format!("bad base58 in '{}'", encoded)))?;

    if decoded.len() < 5 {
        return Err(ScriptError::InvalidAddress(format!(
            "base58 payload too short in '{}'",
            encoded
        )));
    }

    let (body, checksum) = decoded.split_at(decoded.len() - 4);
    let expected = sha256d(body);
    if checksum != &expected[..4] {
        return Err(ScriptError::ChecksumMismatch);
    }

    Ok((body[0], body[1..].to_vec()))
}

/// Encode a P2PKH address for a 20-byte public key hash.
///
/// # Arguments
/// * `pubkey_hash` - Hash160 of the public key.
/// * `params` - Target network parameters.
///
/// # Returns
/// The Base58Check address string.
pub fn p2pkh_address(pubkey_hash: &[u8; 20], params: &NetworkParams) -> String {
    base58check_encode(params.pubkey_hash, pubkey_hash)
}

/// Encode a P2SH address for a 20-byte script hash.
///
/// # Arguments
/// * `script_hash` - Hash160 of the redeem script.
/// * `params` - Target network parameters.
///
/// # Returns
/// The Base58Check address string.
pub fn p2sh_address(script_hash: &[u8; 20], params: &NetworkParams) -> String {
    base58check_encode(params.script_hash, script_hash)
}

/// Encode a native-segwit address for a witness program.
///
/// # Arguments
/// * `params` - Target network parameters (supplies the bech32 prefix).
/// * `witness_version` - The witness version (0 for P2WPKH/P2WSH).
/// * `program` - The witness program bytes (20 or 32 bytes for v0).
///
/// # Returns
/// The bech32 (v0) or bech32m (v1+) address string.
pub fn segwit_address(
    params: &NetworkParams,
    witness_version: u8,
    program: &[u8],
) -> Result<String, ScriptError> {
    if witness_version > 16 {
        return Err(ScriptError::InvalidAddress(format!(
            "witness version {} out of range",
            witness_version
        )));
    }

    let version = u5::try_from_u8(witness_version)
        .map_err(|e| ScriptError::InvalidAddress(e.to_string()))?;
    let converted = bech32::convert_bits(program, 8, 5, true)
        .map_err(|e| ScriptError::InvalidAddress(e.to_string()))?;

    let mut data = Vec::with_capacity(1 + converted.len());
    data.push(version);
    for value in converted {
        let bits = u5::try_from_u8(value)
            .map_err(|e| ScriptError::InvalidAddress(e.to_string()))?;
        data.push(bits);
    }

    let variant = if witness_version == 0 {
        Variant::Bech32
    } else {
        Variant::Bech32m
    };
    bech32::encode(params.bech32_hrp, data, variant)
        .map_err(|e| ScriptError::InvalidAddress(e.to_string()))
}

/// Convert an address string into its locking (output) script.
///
/// Accepts Base58Check P2PKH and P2SH addresses and bech32/bech32m
/// segwit addresses, validated against the given network's version
/// bytes and prefix.
///
/// # Arguments
/// * `address` - The address string.
/// * `params` - The network the address must belong to.
///
/// # Returns
/// The locking script, or `InvalidAddress` if the string is malformed
/// or encodes for a different network.
pub fn to_output_script(address: &str, params: &NetworkParams) -> Result<Script, ScriptError> {
    // Base58Check path first; bech32 addresses never decode as base58check.
    if let Ok((version, payload)) = base58check_decode(address) {
        if payload.len() != 20 {
            return Err(ScriptError::InvalidAddress(format!(
                "unexpected payload length {} in '{}'",
                payload.len(),
                address
            )));
        }
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&payload);

        if version == params.pubkey_hash {
            return Ok(crate::spend::p2pkh_script(&hash));
        }
        if version == params.script_hash {
            return Ok(crate::spend::p2sh_script(&hash));
        }
        return Err(ScriptError::InvalidAddress(format!(
            "version byte {:#04x} does not match network {}",
            version, params.symbol
        )));
    }

    let (hrp, data, variant) = bech32::decode(address)
        .map_err(|e| ScriptError::InvalidAddress(format!("'{}': {}", address, e)))?;
    if hrp != params.bech32_hrp {
        return Err(ScriptError::InvalidAddress(format!(
            "prefix '{}' does not match network {}",
            hrp, params.symbol
        )));
    }
    if data.is_empty() {
        return Err(ScriptError::InvalidAddress(format!(
            "empty witness data in '{}'",
            address
        )));
    }

    let witness_version = data[0].to_u8();
    let program = bech32::convert_bits(&data[1..], 5, 8, false)
        .map_err(|e| ScriptError::InvalidAddress(e.to_string()))?;

    let valid_variant = match witness_version {
        0 => variant == Variant::Bech32,
        1..=16 => variant == Variant::Bech32m,
        _ => false,
    };
    if !valid_variant {
        return Err(ScriptError::InvalidAddress(format!(
            "wrong bech32 variant for witness version {} in '{}'",
            witness_version, address
        )));
    }
    if program.len() < 2 || program.len() > 40 {
        return Err(ScriptError::InvalidAddress(format!(
            "witness program length {} out of range in '{}'",
            program.len(),
            address
        )));
    }
    if witness_version == 0 && program.len() != 20 && program.len() != 32 {
        return Err(ScriptError::InvalidAddress(format!(
            "v0 witness program must be 20 or 32 bytes, got {} in '{}'",
            program.len(),
            address
        )));
    }

    let mut script = Script::new();
    if witness_version == 0 {
        script.append_opcode(OP_0);
    } else {
        // op_small_int covers 1..=16, checked above.
        let op = op_small_int(witness_version as usize).ok_or_else(|| {
            ScriptError::InvalidAddress(format!(
                "witness version {} out of range",
                witness_version
            ))
        })?;
        script.append_opcode(op);
    }
    script.append_push_data(&program)?;
    Ok(script)
}

/// Render the address for a standard locking script.
///
/// Supports P2PKH, P2SH, and v0 witness program scripts; used by the
/// spend resolver and tests to display the address a script pays to.
///
/// # Arguments
/// * `script` - The locking script.
/// * `params` - Network parameters for encoding.
///
/// # Returns
/// The address string, or `InvalidAddress` for non-standard scripts.
pub fn from_output_script(script: &Script, params: &NetworkParams) -> Result<String, ScriptError> {
    let bytes = script.to_bytes();

    if script.is_p2pkh() {
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&bytes[3..23]);
        return Ok(p2pkh_address(&hash, params));
    }
    if script.is_p2sh() {
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&bytes[2..22]);
        return Ok(p2sh_address(&hash, params));
    }
    if script.is_witness_v0() {
        return segwit_address(params, 0, &bytes[2..]);
    }

    Err(ScriptError::InvalidAddress(format!(
        "no address form for script {}",
        script.to_hex()
    )))
}
