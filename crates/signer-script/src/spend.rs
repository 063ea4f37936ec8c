//! Spend-script resolution for the supported address templates.
//!
//! Given an address-type tag and the participant public keys, derives the
//! locking (output) script together with the redeem and/or witness script
//! a spender must supply. Key order is significant for the multisig
//! templates: it determines the canonical script encoding and therefore
//! the transaction ID.

use serde::{Deserialize, Serialize};

use signer_primitives::hash::{hash160, sha256};

use crate::address;
use crate::network::NetworkParams;
use crate::opcodes::{
    op_small_int, OP_0, OP_CHECKMULTISIG, OP_CHECKSIG, OP_DUP, OP_EQUAL, OP_EQUALVERIFY,
    OP_HASH160,
};
use crate::{Script, ScriptError};

/// The supported address/script template tags.
///
/// Serde names match the wallet service's wire tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddressType {
    /// Single-key pay-to-public-key-hash.
    #[serde(rename = "P2PKH")]
    P2pkh,

    /// Single-key native-segwit pay-to-witness-public-key-hash.
    #[serde(rename = "P2WPKH")]
    P2wpkh,

    /// Single-key P2WPKH wrapped in a P2SH output.
    #[serde(rename = "P2WPKH-over-P2SH")]
    P2wpkhOverP2sh,

    /// Legacy M-of-N multisig behind a P2SH output.
    #[serde(rename = "P2SH")]
    P2sh,

    /// M-of-N multisig behind P2WSH, wrapped in a P2SH output.
    #[serde(rename = "P2WSH-over-P2SH")]
    P2wshOverP2sh,

    /// M-of-N multisig behind a native P2WSH output.
    #[serde(rename = "WITNESS_V0")]
    WitnessV0,
}

impl AddressType {
    /// The wire tag for this address type.
    ///
    /// # Returns
    /// The tag string as it appears in intent metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            AddressType::P2pkh => "P2PKH",
            AddressType::P2wpkh => "P2WPKH",
            AddressType::P2wpkhOverP2sh => "P2WPKH-over-P2SH",
            AddressType::P2sh => "P2SH",
            AddressType::P2wshOverP2sh => "P2WSH-over-P2SH",
            AddressType::WitnessV0 => "WITNESS_V0",
        }
    }

    /// Whether this template spends through the segwit witness.
    ///
    /// Witness templates use the BIP143 signature digest with the input's
    /// declared value; the rest use the legacy digest.
    ///
    /// # Returns
    /// `true` for `P2WPKH`, `P2WPKH-over-P2SH`, `P2WSH-over-P2SH`, and
    /// `WITNESS_V0`.
    pub fn is_witness(&self) -> bool {
        matches!(
            self,
            AddressType::P2wpkh
                | AddressType::P2wpkhOverP2sh
                | AddressType::P2wshOverP2sh
                | AddressType::WitnessV0
        )
    }

    /// Whether this template is an M-of-N multisig.
    ///
    /// Only multisig templates may appear in a partial-signature bundle;
    /// the single-key templates require full local signing.
    ///
    /// # Returns
    /// `true` for `P2SH`, `P2WSH-over-P2SH`, and `WITNESS_V0`.
    pub fn is_multisig(&self) -> bool {
        matches!(
            self,
            AddressType::P2sh | AddressType::P2wshOverP2sh | AddressType::WitnessV0
        )
    }
}

/// Parse an address-type tag.
///
/// # Arguments
/// * `tag` - The wire tag string.
///
/// # Returns
/// The matching `AddressType`, or `UnknownAddressType` for any other tag.
pub fn parse_address_type(tag: &str) -> Result<AddressType, ScriptError> {
    match tag {
        "P2PKH" => Ok(AddressType::P2pkh),
        "P2WPKH" => Ok(AddressType::P2wpkh),
        "P2WPKH-over-P2SH" => Ok(AddressType::P2wpkhOverP2sh),
        "P2SH" => Ok(AddressType::P2sh),
        "P2WSH-over-P2SH" => Ok(AddressType::P2wshOverP2sh),
        "WITNESS_V0" => Ok(AddressType::WitnessV0),
        other => Err(ScriptError::UnknownAddressType(other.to_string())),
    }
}

/// Resolved spend information for one input.
///
/// `output_script` is the locking script of the UTXO being spent.
/// `redeem_script` is what a P2SH spender pushes last in its scriptSig;
/// `witness_script` is the final element of a P2WSH witness stack.
#[derive(Clone, Debug)]
pub struct SpendInfo {
    /// The template this spend info was resolved for.
    pub address_type: AddressType,

    /// The locking script of the output being spent.
    pub output_script: Script,

    /// The redeem script supplied at spend time (P2SH variants).
    pub redeem_script: Option<Script>,

    /// The witness script supplied at spend time (P2WSH variants).
    pub witness_script: Option<Script>,

    /// The address the output script pays to, under the resolved network.
    pub address: String,
}

/// Build the canonical P2PKH locking script for a 20-byte key hash.
///
/// Pattern: `OP_DUP OP_HASH160 <hash> OP_EQUALVERIFY OP_CHECKSIG`
pub fn p2pkh_script(pubkey_hash: &[u8; 20]) -> Script {
    let mut bytes = Vec::with_capacity(25);
    bytes.push(OP_DUP);
    bytes.push(OP_HASH160);
    bytes.push(20);
    bytes.extend_from_slice(pubkey_hash);
    bytes.push(OP_EQUALVERIFY);
    bytes.push(OP_CHECKSIG);
    Script::from_bytes(&bytes)
}

/// Build the P2SH locking script for a 20-byte script hash.
///
/// Pattern: `OP_HASH160 <hash> OP_EQUAL`
pub fn p2sh_script(script_hash: &[u8; 20]) -> Script {
    let mut bytes = Vec::with_capacity(23);
    bytes.push(OP_HASH160);
    bytes.push(20);
    bytes.extend_from_slice(script_hash);
    bytes.push(OP_EQUAL);
    Script::from_bytes(&bytes)
}

/// Build the native-segwit v0 locking script for a 20-byte key hash.
///
/// Pattern: `OP_0 <20-byte hash>`
pub fn p2wpkh_script(pubkey_hash: &[u8; 20]) -> Script {
    let mut bytes = Vec::with_capacity(22);
    bytes.push(OP_0);
    bytes.push(20);
    bytes.extend_from_slice(pubkey_hash);
    Script::from_bytes(&bytes)
}

/// Build the native-segwit v0 locking script for a 32-byte script hash.
///
/// Pattern: `OP_0 <32-byte sha256>`
pub fn p2wsh_script(script_sha256: &[u8; 32]) -> Script {
    let mut bytes = Vec::with_capacity(34);
    bytes.push(OP_0);
    bytes.push(32);
    bytes.extend_from_slice(script_sha256);
    Script::from_bytes(&bytes)
}

/// Build the canonical M-of-N multisig script over the given keys.
///
/// Pattern: `OP_M <key_1> ... <key_N> OP_N OP_CHECKMULTISIG`. The keys
/// are pushed byte-for-byte in the given order; reordering or
/// re-encoding a key produces a different script and a different
/// transaction ID.
///
/// # Arguments
/// * `required` - The signature threshold M.
/// * `public_keys` - The hex-encoded participant keys, in canonical order.
///
/// # Returns
/// The multisig script, or an error for out-of-range thresholds or
/// malformed keys.
pub fn multisig_script(required: usize, public_keys: &[String]) -> Result<Script, ScriptError> {
    let total = public_keys.len();
    if total == 0 || total > 16 {
        return Err(ScriptError::InvalidMultisig(format!(
            "{} public keys (must be 1-16)",
            total
        )));
    }
    if required == 0 || required > total {
        return Err(ScriptError::InvalidMultisig(format!(
            "{} required signatures with {} keys",
            required, total
        )));
    }

    let mut script = Script::new();
    // Bounds checked above, so the lookups cannot fail.
    let m_op = op_small_int(required)
        .ok_or_else(|| ScriptError::InvalidMultisig(format!("threshold {}", required)))?;
    let n_op = op_small_int(total)
        .ok_or_else(|| ScriptError::InvalidMultisig(format!("key count {}", total)))?;

    script.append_opcode(m_op);
    for key_hex in public_keys {
        let key = decode_public_key(key_hex)?;
        script.append_push_data(&key)?;
    }
    script.append_opcode(n_op);
    script.append_opcode(OP_CHECKMULTISIG);
    Ok(script)
}

/// Resolve the spend scripts for one address.
///
/// # Arguments
/// * `address_type` - The template tag from the address metadata.
/// * `public_keys` - The participant keys in canonical order (single-key
///   templates use the first entry).
/// * `required_signatures` - The multisig threshold (ignored by the
///   single-key templates).
/// * `params` - Network parameters, used to render the address.
///
/// # Returns
/// The resolved `SpendInfo`, or an error for malformed keys or
/// out-of-range multisig parameters.
pub fn resolve_spend_info(
    address_type: AddressType,
    public_keys: &[String],
    required_signatures: usize,
    params: &NetworkParams,
) -> Result<SpendInfo, ScriptError> {
    match address_type {
        AddressType::P2pkh => {
            let key = first_key(public_keys)?;
            let output_script = p2pkh_script(&hash160(&key));
            let address = address::from_output_script(&output_script, params)?;
            Ok(SpendInfo {
                address_type,
                output_script,
                redeem_script: None,
                witness_script: None,
                address,
            })
        }
        AddressType::P2wpkh => {
            let key = first_key(public_keys)?;
            let output_script = p2wpkh_script(&hash160(&key));
            let address = address::from_output_script(&output_script, params)?;
            Ok(SpendInfo {
                address_type,
                output_script,
                redeem_script: None,
                witness_script: None,
                address,
            })
        }
        AddressType::P2wpkhOverP2sh => {
            // The P2WPKH program is the redeem script; the output commits
            // to its hash160.
            let key = first_key(public_keys)?;
            let witness_program = p2wpkh_script(&hash160(&key));
            let output_script = p2sh_script(&hash160(witness_program.to_bytes()));
            let address = address::from_output_script(&output_script, params)?;
            Ok(SpendInfo {
                address_type,
                output_script,
                redeem_script: Some(witness_program),
                witness_script: None,
                address,
            })
        }
        AddressType::P2sh => {
            let redeem = multisig_script(required_signatures, public_keys)?;
            let output_script = p2sh_script(&hash160(redeem.to_bytes()));
            let address = address::from_output_script(&output_script, params)?;
            Ok(SpendInfo {
                address_type,
                output_script,
                redeem_script: Some(redeem),
                witness_script: None,
                address,
            })
        }
        AddressType::P2wshOverP2sh => {
            // witness script -> P2WSH program -> P2SH of that program.
            let witness = multisig_script(required_signatures, public_keys)?;
            let wsh_program = p2wsh_script(&sha256(witness.to_bytes()));
            let output_script = p2sh_script(&hash160(wsh_program.to_bytes()));
            let address = address::from_output_script(&output_script, params)?;
            Ok(SpendInfo {
                address_type,
                output_script,
                redeem_script: Some(wsh_program),
                witness_script: Some(witness),
                address,
            })
        }
        AddressType::WitnessV0 => {
            let witness = multisig_script(required_signatures, public_keys)?;
            let output_script = p2wsh_script(&sha256(witness.to_bytes()));
            let address = address::from_output_script(&output_script, params)?;
            Ok(SpendInfo {
                address_type,
                output_script,
                redeem_script: None,
                witness_script: Some(witness),
                address,
            })
        }
    }
}

/// Decode and sanity-check a hex public key for script embedding.
///
/// Keys are embedded byte-for-byte as supplied; only the SEC1 length and
/// prefix are checked here. Curve validity is the signer's concern.
fn decode_public_key(key_hex: &str) -> Result<Vec<u8>, ScriptError> {
    let key = hex::decode(key_hex)
        .map_err(|e| ScriptError::InvalidPublicKey(format!("'{}': {}", key_hex, e)))?;
    let plausible = match key.len() {
        33 => key[0] == 0x02 || key[0] == 0x03,
        65 => key[0] == 0x04,
        _ => false,
    };
    if !plausible {
        return Err(ScriptError::InvalidPublicKey(format!(
            "'{}' is not a SEC1 public key",
            key_hex
        )));
    }
    Ok(key)
}

/// Take the first public key of a single-key template.
fn first_key(public_keys: &[String]) -> Result<Vec<u8>, ScriptError> {
    let key_hex = public_keys
        .first()
        .ok_or_else(|| ScriptError::InvalidPublicKey("no public keys supplied".to_string()))?;
    decode_public_key(key_hex)
}
