//! The server-supplied transaction intent and the engine's result types.
//!
//! These types mirror the wallet service's JSON wire shapes; the intent
//! arrives already parsed from the transport layer and the signing result
//! serializes back to the shape the service merges or broadcasts.

use serde::{Deserialize, Serialize};

pub use signer_script::AddressType;

/// A server-supplied description of a transaction to build and sign.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransactionIntent {
    /// Network symbol, e.g. "BTC" or "DOGETEST".
    pub network: String,

    /// Ordered inputs to spend.
    pub inputs: Vec<InputDescriptor>,

    /// Ordered outputs to create.
    pub outputs: Vec<OutputDescriptor>,

    /// Metadata for every spending address referenced by the inputs.
    /// An input whose address is missing here is a fatal construction
    /// error.
    pub input_address_data: Vec<AddressMetadata>,

    /// The transaction ID the unsigned transaction must reproduce.
    /// Checked before any signing as a defense against a compromised or
    /// buggy server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_unsigned_txid: Option<String>,

    /// An encrypted key descriptor the local party must decrypt with a
    /// PIN before it can sign.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_key: Option<UserKey>,

    /// The server's transaction type tag, echoed back in the result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_type: Option<String>,
}

/// One input of a transaction intent.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InputDescriptor {
    /// Display-order transaction ID of the output being spent.
    pub previous_txid: String,

    /// Index of the output being spent.
    pub previous_output_index: u32,

    /// Stable index used to correlate produced signatures back to this
    /// input; equals the input's position in the transaction.
    pub input_index: u32,

    /// The address whose output is being spent.
    pub spending_address: String,

    /// The spent output's value as a wire-format decimal string.
    pub input_value: String,
}

/// One output of a transaction intent.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputDescriptor {
    /// The address receiving this output.
    pub receiving_address: String,

    /// The output's value as a wire-format decimal string.
    pub output_value: String,

    /// Informational category used by the summarizer; it does not affect
    /// script construction.
    #[serde(default)]
    pub output_category: OutputCategory,
}

/// Output categories, as tagged by the wallet service.
///
/// Any unrecognized tag (e.g. a sweep amount) is treated as
/// user-specified, matching the summarizer's partitioning rules.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputCategory {
    /// An output the user asked for (or a swept balance).
    #[default]
    UserSpecified,

    /// Change returned to the spending wallet.
    Change,

    /// The service's fee output.
    ServiceFee,
}

impl OutputCategory {
    /// The wire tag for this category.
    ///
    /// # Returns
    /// The tag string as the wallet service emits it.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputCategory::UserSpecified => "user-specified",
            OutputCategory::Change => "change",
            OutputCategory::ServiceFee => "service-fee",
        }
    }
}

impl Serialize for OutputCategory {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OutputCategory {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(match tag.as_str() {
            "change" => OutputCategory::Change,
            "service-fee" => OutputCategory::ServiceFee,
            // user-specified, sweep amounts, and anything future.
            _ => OutputCategory::UserSpecified,
        })
    }
}

/// Spend information for one address referenced by the intent's inputs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AddressMetadata {
    /// The address this metadata describes.
    pub address: String,

    /// The script template the address was generated with.
    pub address_type: AddressType,

    /// The participant public keys (hex, compressed), in canonical order.
    /// Order determines the multisig script encoding and must be
    /// reproduced identically or the transaction ID will not match.
    pub public_keys: Vec<String>,

    /// How many of the participant keys must sign. Meaningful for the
    /// multisig templates; 1 for the single-key templates.
    #[serde(default = "default_required_signatures")]
    pub required_signatures: usize,
}

fn default_required_signatures() -> usize {
    1
}

/// An encrypted, passphrase-derived key descriptor ("user key").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserKey {
    /// The compressed public key the decrypted key must derive to.
    pub public_key: String,

    /// The base64 ciphertext of the hex passphrase.
    pub encrypted_passphrase: String,

    /// Key-stretch and cipher parameters. Absent for legacy keys, which
    /// use the defaults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<UserKeyAlgorithm>,
}

/// PBKDF2 and AES parameters for decrypting a user key.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserKeyAlgorithm {
    /// PBKDF2 salt (empty for legacy keys).
    #[serde(default)]
    pub pbkdf2_salt: String,

    /// Total PBKDF2 iterations, split evenly across the two phases.
    #[serde(default = "default_pbkdf2_iterations")]
    pub pbkdf2_iterations: u32,

    /// PBKDF2 PRF hash name; only "SHA256" is supported.
    #[serde(default = "default_pbkdf2_hash_function")]
    pub pbkdf2_hash_function: String,

    /// Output length of the first stretch phase, in bytes.
    #[serde(default = "default_phase1_key_length")]
    pub pbkdf2_phase1_key_length: usize,

    /// Output length of the second stretch phase, in bytes.
    #[serde(default = "default_phase2_key_length")]
    pub pbkdf2_phase2_key_length: usize,

    /// AES IV in hex (AEAD ciphers only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aes_iv: Option<String>,

    /// Cipher name: "AES-256-ECB" (legacy default) or "AES-256-GCM".
    #[serde(default = "default_aes_cipher")]
    pub aes_cipher: String,

    /// GCM authentication tag in hex.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aes_auth_tag: Option<String>,

    /// GCM additional authenticated data in hex.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aes_auth_data: Option<String>,
}

fn default_pbkdf2_iterations() -> u32 {
    2048
}

fn default_pbkdf2_hash_function() -> String {
    "SHA256".to_string()
}

fn default_phase1_key_length() -> usize {
    16
}

fn default_phase2_key_length() -> usize {
    32
}

fn default_aes_cipher() -> String {
    "AES-256-ECB".to_string()
}

impl Default for UserKeyAlgorithm {
    fn default() -> Self {
        UserKeyAlgorithm {
            pbkdf2_salt: String::new(),
            pbkdf2_iterations: default_pbkdf2_iterations(),
            pbkdf2_hash_function: default_pbkdf2_hash_function(),
            pbkdf2_phase1_key_length: default_phase1_key_length(),
            pbkdf2_phase2_key_length: default_phase2_key_length(),
            aes_iv: None,
            aes_cipher: default_aes_cipher(),
            aes_auth_tag: None,
            aes_auth_data: None,
        }
    }
}

/// The outcome of `create_and_sign`.
///
/// Exactly one of two shapes holds: a finalized `tx_hex` with
/// `signatures: None` (serialized as `null` so the wire shape keeps the
/// key), or an unsigned `tx_hex` with the signatures this party could
/// produce, for merging by other signers.
#[derive(Clone, Debug, Serialize)]
pub struct SigningResult {
    /// The server's transaction type tag, echoed from the intent.
    pub tx_type: Option<String>,

    /// Finalized raw transaction hex, or the unsigned transaction when
    /// only partial signatures could be produced.
    pub tx_hex: String,

    /// Partial signatures keyed by input index, or `None` when the
    /// transaction was fully signed.
    pub signatures: Option<Vec<InputSignature>>,
}

/// One partial signature, correlated to its input by index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSignature {
    /// The input this signature covers.
    pub input_index: u32,

    /// The signer's compressed public key (hex).
    pub public_key: String,

    /// DER signature hex, without a trailing sighash byte.
    pub signature: String,
}

/// The summarizer's view of a prepared transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TransactionSummary {
    /// Network symbol of the intent.
    pub network: String,

    /// Miner fee: inputs minus outputs, service fee, and change.
    pub network_fee: String,

    /// Sum of service-fee outputs.
    pub service_fee: String,

    /// Sum of user-specified outputs.
    pub total_to_send: String,
}

/// The fields a sweep preparation sends to the wallet service.
///
/// The private key never leaves the engine; only its public key and the
/// destination are transmitted.
#[derive(Clone, Debug, Serialize)]
pub struct SweepRequest {
    /// Compressed public key (hex) of the swept address's key.
    pub public_key: String,

    /// The destination address for the swept balance.
    pub to_address: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_deserializes_from_wire_json() {
        // A missing mandatory field must fail loudly, not be half-parsed.
        assert!(serde_json::from_str::<TransactionIntent>(r#"{"network": "BTC"}"#).is_err());

        let json = r#"{
            "network": "BTCTEST",
            "tx_type": "withdrawal",
            "inputs": [
                {
                    "previous_txid": "f4184fc596403b9d638783cf57adfe4c75c605f6356fbc91338530e9831e9e16",
                    "previous_output_index": 1,
                    "input_index": 0,
                    "spending_address": "2MzQwSSnBHWHqSAqtTVQ6v47XtaisrJa1Vc",
                    "input_value": "0.00100000"
                }
            ],
            "outputs": [
                {
                    "receiving_address": "mipcBbFg9gMiCh81Kj8tqqdgoZub1ZJRfn",
                    "output_value": "0.00090000",
                    "output_category": "user-specified"
                },
                {
                    "receiving_address": "mipcBbFg9gMiCh81Kj8tqqdgoZub1ZJRfn",
                    "output_value": "0.00005000",
                    "output_category": "service-fee"
                }
            ],
            "input_address_data": [
                {
                    "address": "2MzQwSSnBHWHqSAqtTVQ6v47XtaisrJa1Vc",
                    "address_type": "P2WSH-over-P2SH",
                    "public_keys": ["02aa", "02bb"],
                    "required_signatures": 2
                }
            ]
        }"#;
        let intent: TransactionIntent = serde_json::from_str(json).unwrap();
        assert_eq!(intent.network, "BTCTEST");
        assert_eq!(intent.tx_type.as_deref(), Some("withdrawal"));
        assert!(intent.expected_unsigned_txid.is_none());
        assert!(intent.user_key.is_none());
        assert_eq!(intent.inputs.len(), 1);
        assert_eq!(
            intent.input_address_data[0].address_type,
            AddressType::P2wshOverP2sh
        );
        assert_eq!(intent.outputs[0].output_category, OutputCategory::UserSpecified);
        assert_eq!(intent.outputs[1].output_category, OutputCategory::ServiceFee);
    }

    #[test]
    fn test_unknown_output_category_is_user_specified() {
        let json = r#"{
            "receiving_address": "x",
            "output_value": "1.00000000",
            "output_category": "sweep-amount"
        }"#;
        let output: OutputDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(output.output_category, OutputCategory::UserSpecified);
    }

    #[test]
    fn test_user_key_algorithm_defaults() {
        let algorithm = UserKeyAlgorithm::default();
        assert_eq!(algorithm.pbkdf2_iterations, 2048);
        assert_eq!(algorithm.pbkdf2_hash_function, "SHA256");
        assert_eq!(algorithm.pbkdf2_phase1_key_length, 16);
        assert_eq!(algorithm.pbkdf2_phase2_key_length, 32);
        assert_eq!(algorithm.aes_cipher, "AES-256-ECB");

        // Partial JSON fills in the rest.
        let parsed: UserKeyAlgorithm =
            serde_json::from_str(r#"{"aes_cipher": "AES-256-GCM", "aes_iv": "00"}"#).unwrap();
        assert_eq!(parsed.aes_cipher, "AES-256-GCM");
        assert_eq!(parsed.aes_iv.as_deref(), Some("00"));
        assert_eq!(parsed.pbkdf2_iterations, 2048);
    }

    #[test]
    fn test_signing_result_serializes_null_signatures() {
        let result = SigningResult {
            tx_type: Some("withdrawal".to_string()),
            tx_hex: "0100".to_string(),
            signatures: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        // The key must be present and null for the service to merge.
        assert!(json.get("signatures").unwrap().is_null());

        let result = SigningResult {
            signatures: Some(vec![InputSignature {
                input_index: 0,
                public_key: "02aa".to_string(),
                signature: "3044".to_string(),
            }]),
            ..result
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["signatures"][0]["input_index"], 0);
    }
}
