//! Core transaction type.
//!
//! Represents a complete transaction with version, inputs, outputs, and
//! locktime. Supports legacy and segwit (BIP144) binary serialization,
//! hex encoding, and transaction ID computation. The transaction ID is
//! always computed over the legacy (witness-stripped) serialization.

use signer_primitives::hash::sha256d;
use signer_primitives::util::{VarInt, WireReader, WireWriter};

use crate::input::TxInput;
use crate::output::TxOutput;
use crate::TransactionError;

/// Marker byte distinguishing segwit serialization (zero input count).
const SEGWIT_MARKER: u8 = 0x00;

/// Flag byte following the segwit marker.
const SEGWIT_FLAG: u8 = 0x01;

/// A transaction consisting of a version, inputs, outputs, and lock time.
///
/// # Wire format (legacy)
///
/// | Field        | Size                 |
/// |--------------|----------------------|
/// | version      | 4 bytes (LE)         |
/// | input count  | VarInt               |
/// | inputs       | variable (per input) |
/// | output count | VarInt               |
/// | outputs      | variable             |
/// | lock_time    | 4 bytes (LE)         |
///
/// The segwit form inserts marker/flag bytes after the version and the
/// per-input witness stacks before the lock time.
#[derive(Clone, Debug)]
pub struct Transaction {
    /// Transaction format version.
    pub version: u32,

    /// Ordered list of transaction inputs.
    pub inputs: Vec<TxInput>,

    /// Ordered list of transaction outputs.
    pub outputs: Vec<TxOutput>,

    /// Lock time. If non-zero, the transaction is not valid until the
    /// specified block height or Unix timestamp.
    pub lock_time: u32,
}

impl Transaction {
    /// Create a new empty transaction with version 1 and lock time 0.
    ///
    /// # Returns
    /// A `Transaction` with no inputs or outputs.
    pub fn new() -> Self {
        Transaction {
            version: 1,
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time: 0,
        }
    }

    // -----------------------------------------------------------------
    // Deserialization
    // -----------------------------------------------------------------

    /// Parse a transaction from a hex-encoded string.
    ///
    /// # Arguments
    /// * `hex_str` - A hex string of the raw transaction bytes.
    ///
    /// # Returns
    /// `Ok(Transaction)` on success, or a `TransactionError` if the hex
    /// is invalid or the bytes do not form a valid transaction.
    pub fn from_hex(hex_str: &str) -> Result<Self, TransactionError> {
        let bytes = hex::decode(hex_str).map_err(|e| {
            TransactionError::SerializationError(format!("invalid hex: {}", e))
        })?;
        Self::from_bytes(&bytes)
    }

    /// Parse a transaction from raw bytes.
    ///
    /// Accepts both legacy and segwit serializations; requires the slice
    /// to contain exactly one complete transaction.
    ///
    /// # Arguments
    /// * `bytes` - The raw transaction bytes.
    ///
    /// # Returns
    /// `Ok(Transaction)` on success, or a `TransactionError` if the data
    /// is truncated, malformed, or has trailing bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        let mut reader = WireReader::new(bytes);
        let tx = Self::read_from(&mut reader)?;
        if reader.remaining() != 0 {
            return Err(TransactionError::SerializationError(format!(
                "trailing {} bytes after transaction",
                reader.remaining()
            )));
        }
        Ok(tx)
    }

    /// Deserialize a transaction from a `WireReader`.
    ///
    /// Detects the segwit marker/flag after the version and reads the
    /// per-input witness stacks when present.
    ///
    /// # Arguments
    /// * `reader` - The reader positioned at the start of a serialized
    ///   transaction.
    ///
    /// # Returns
    /// `Ok(Transaction)` on success, or a `TransactionError` on I/O or
    /// format errors.
    pub fn read_from(reader: &mut WireReader) -> Result<Self, TransactionError> {
        let version = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading version: {}", e))
        })?;

        let mut count = reader.read_varint().map_err(|e| {
            TransactionError::SerializationError(format!("reading input count: {}", e))
        })?;

        // A zero "input count" is the segwit marker; the flag byte follows.
        let mut segwit = false;
        if count.value() == 0 {
            let flag = reader.read_u8().map_err(|e| {
                TransactionError::SerializationError(format!("reading segwit flag: {}", e))
            })?;
            if flag != SEGWIT_FLAG {
                return Err(TransactionError::SerializationError(format!(
                    "unsupported segwit flag {:#04x}",
                    flag
                )));
            }
            segwit = true;
            count = reader.read_varint().map_err(|e| {
                TransactionError::SerializationError(format!("reading input count: {}", e))
            })?;
        }

        let mut inputs = Vec::with_capacity(count.value() as usize);
        for _ in 0..count.value() {
            inputs.push(TxInput::read_from(reader)?);
        }

        let output_count = reader.read_varint().map_err(|e| {
            TransactionError::SerializationError(format!("reading output count: {}", e))
        })?;

        let mut outputs = Vec::with_capacity(output_count.value() as usize);
        for _ in 0..output_count.value() {
            outputs.push(TxOutput::read_from(reader)?);
        }

        if segwit {
            for input in &mut inputs {
                let item_count = reader.read_varint().map_err(|e| {
                    TransactionError::SerializationError(format!(
                        "reading witness count: {}",
                        e
                    ))
                })?;
                let mut witness = Vec::with_capacity(item_count.value() as usize);
                for _ in 0..item_count.value() {
                    let item_len = reader.read_varint().map_err(|e| {
                        TransactionError::SerializationError(format!(
                            "reading witness item length: {}",
                            e
                        ))
                    })?;
                    let item = reader.read_bytes(item_len.value() as usize).map_err(|e| {
                        TransactionError::SerializationError(format!(
                            "reading witness item: {}",
                            e
                        ))
                    })?;
                    witness.push(item.to_vec());
                }
                input.witness = witness;
            }
        }

        let lock_time = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading lock time: {}", e))
        })?;

        Ok(Transaction {
            version,
            inputs,
            outputs,
            lock_time,
        })
    }

    // -----------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------

    /// Whether any input carries witness data.
    ///
    /// # Returns
    /// `true` if at least one input has a non-empty witness stack.
    pub fn has_witnesses(&self) -> bool {
        self.inputs.iter().any(|i| i.has_witness())
    }

    /// Serialize this transaction to raw bytes.
    ///
    /// Uses the segwit (BIP144) form when any input carries witness data,
    /// the legacy form otherwise.
    ///
    /// # Returns
    /// A `Vec<u8>` containing the wire-format bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        if self.has_witnesses() {
            self.serialize(true)
        } else {
            self.serialize(false)
        }
    }

    /// Serialize this transaction in the legacy (witness-stripped) form.
    ///
    /// This is the serialization the transaction ID commits to.
    ///
    /// # Returns
    /// A `Vec<u8>` containing the legacy wire-format bytes.
    pub fn to_bytes_no_witness(&self) -> Vec<u8> {
        self.serialize(false)
    }

    /// Serialize this transaction to a hex string.
    ///
    /// # Returns
    /// A lowercase hex-encoded string of `to_bytes()`.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    fn serialize(&self, with_witness: bool) -> Vec<u8> {
        let mut writer = WireWriter::with_capacity(256);
        writer.write_u32_le(self.version);

        if with_witness {
            writer.write_u8(SEGWIT_MARKER);
            writer.write_u8(SEGWIT_FLAG);
        }

        writer.write_varint(VarInt::from(self.inputs.len()));
        for input in &self.inputs {
            input.write_to(&mut writer);
        }

        writer.write_varint(VarInt::from(self.outputs.len()));
        for output in &self.outputs {
            output.write_to(&mut writer);
        }

        if with_witness {
            for input in &self.inputs {
                input.write_witness_to(&mut writer);
            }
        }

        writer.write_u32_le(self.lock_time);
        writer.into_bytes()
    }

    // -----------------------------------------------------------------
    // Transaction ID
    // -----------------------------------------------------------------

    /// Compute the transaction ID (double SHA-256 of the legacy bytes).
    ///
    /// Witness data never contributes to the txid. The returned bytes are
    /// in internal (little-endian) order; use `tx_id_hex()` for the
    /// conventional display string.
    ///
    /// # Returns
    /// A 32-byte array containing the txid in internal byte order.
    pub fn tx_id(&self) -> [u8; 32] {
        sha256d(&self.to_bytes_no_witness())
    }

    /// Compute the transaction ID as a display-order hex string.
    ///
    /// The hex string is byte-reversed from the internal hash, following
    /// the convention that txids display in big-endian order.
    ///
    /// # Returns
    /// A 64-character hex string of the txid.
    pub fn tx_id_hex(&self) -> String {
        let mut id = self.tx_id();
        id.reverse();
        hex::encode(id)
    }

    // -----------------------------------------------------------------
    // Construction helpers
    // -----------------------------------------------------------------

    /// Append a `TxInput` to this transaction.
    ///
    /// # Arguments
    /// * `input` - The input to add.
    pub fn add_input(&mut self, input: TxInput) {
        self.inputs.push(input);
    }

    /// Append a `TxOutput` to this transaction.
    ///
    /// # Arguments
    /// * `output` - The output to add.
    pub fn add_output(&mut self, output: TxOutput) {
        self.outputs.push(output);
    }

    /// Return the number of inputs in the transaction.
    ///
    /// # Returns
    /// The input count.
    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    /// Return the number of outputs in the transaction.
    ///
    /// # Returns
    /// The output count.
    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// Compute the sum of all output values.
    ///
    /// # Returns
    /// The total minor units across all outputs.
    pub fn total_output_value(&self) -> u64 {
        self.outputs.iter().map(|o| o.value).sum()
    }

    /// Return the size of this transaction in bytes.
    ///
    /// # Returns
    /// The byte length of the serialized transaction.
    pub fn size(&self) -> usize {
        self.to_bytes().len()
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Transaction {
    /// Display the transaction as its hex-encoded serialization.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signer_script::Script;

    fn sample_tx() -> Transaction {
        let mut tx = Transaction::new();
        let mut input = TxInput::from_display_txid(
            "f4184fc596403b9d638783cf57adfe4c75c605f6356fbc91338530e9831e9e16",
            0,
        )
        .unwrap();
        input.set_spent_output(Some(TxOutput::new(
            5_000_000_000,
            Script::from_hex("76a914751e76e8199196d454941c45d1b3a323f1433bd688ac").unwrap(),
        )));
        tx.add_input(input);
        tx.add_output(TxOutput::new(
            4_999_990_000,
            Script::from_hex("76a914751e76e8199196d454941c45d1b3a323f1433bd688ac").unwrap(),
        ));
        tx
    }

    #[test]
    fn test_legacy_roundtrip() {
        let tx = sample_tx();
        let parsed = Transaction::from_hex(&tx.to_hex()).unwrap();
        assert_eq!(parsed.version, 1);
        assert_eq!(parsed.input_count(), 1);
        assert_eq!(parsed.output_count(), 1);
        assert_eq!(parsed.total_output_value(), 4_999_990_000);
        assert_eq!(parsed.size(), tx.to_bytes().len());
        assert_eq!(parsed.tx_id_hex(), tx.tx_id_hex());
        assert_eq!(parsed.to_hex(), tx.to_hex());
    }

    #[test]
    fn test_segwit_roundtrip_and_txid_stability() {
        let mut tx = sample_tx();
        let legacy_txid = tx.tx_id_hex();

        tx.inputs[0].witness = vec![vec![0x01, 0x02], vec![0x03]];
        assert!(tx.has_witnesses());

        // Witness data must not change the txid.
        assert_eq!(tx.tx_id_hex(), legacy_txid);

        let bytes = tx.to_bytes();
        // marker + flag present after the 4-byte version.
        assert_eq!(bytes[4], 0x00);
        assert_eq!(bytes[5], 0x01);

        let parsed = Transaction::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.inputs[0].witness, tx.inputs[0].witness);
        assert_eq!(parsed.tx_id_hex(), legacy_txid);
    }

    #[test]
    fn test_rejects_trailing_bytes() {
        let tx = sample_tx();
        let mut bytes = tx.to_bytes();
        bytes.push(0x00);
        assert!(Transaction::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_txid_is_display_order() {
        let tx = sample_tx();
        let internal = tx.tx_id();
        let display = tx.tx_id_hex();
        let mut reversed = internal;
        reversed.reverse();
        assert_eq!(display, hex::encode(reversed));
    }
}
