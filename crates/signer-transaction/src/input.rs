//! Transaction input referencing a previous output.
//!
//! Contains the source transaction ID, output index, scriptSig, witness
//! stack, sequence number, and the spent output's script and value
//! (needed for signature hashing). Provides binary serialization
//! following the Bitcoin wire format.

use signer_primitives::util::{VarInt, WireReader, WireWriter};
use signer_script::Script;

use crate::output::TxOutput;
use crate::TransactionError;

/// Sequence number indicating a finalized input (no relative lock-time).
pub const DEFAULT_SEQUENCE_NUMBER: u32 = 0xFFFF_FFFF;

/// A single input in a transaction.
///
/// Each input references an output from a previous transaction by its
/// transaction ID (`prev_txid`, internal byte order) and output index
/// (`prev_vout`). The `script_sig` and `witness` supply the data required
/// to satisfy the referenced output's locking script once signed.
///
/// The spent output's script and value are carried in `spent_output` for
/// signature-hash computation; they are not serialized.
///
/// # Wire format (legacy portion)
///
/// | Field         | Size             |
/// |---------------|------------------|
/// | prev_txid     | 32 bytes (LE)    |
/// | prev_vout     | 4 bytes (LE)     |
/// | script length | VarInt           |
/// | script_sig    | variable         |
/// | sequence      | 4 bytes (LE)     |
#[derive(Clone, Debug)]
pub struct TxInput {
    /// The 32-byte transaction ID of the output being spent, in internal
    /// (little-endian) byte order.
    pub prev_txid: [u8; 32],

    /// Index of the output within the source transaction.
    pub prev_vout: u32,

    /// Sequence number. Defaults to `0xFFFFFFFF` (finalized).
    pub sequence: u32,

    /// The unlocking script (scriptSig). `None` until the input is signed.
    pub script_sig: Option<Script>,

    /// The segwit witness stack. Empty for non-witness spends and for
    /// unsigned inputs.
    pub witness: Vec<Vec<u8>>,

    /// The output being spent (script and value), kept for signature-hash
    /// computation. Not serialized.
    spent_output: Option<TxOutput>,
}

impl TxInput {
    /// Create a new input referencing a previous output.
    ///
    /// The sequence defaults to finalized and no scripts are set.
    ///
    /// # Arguments
    /// * `prev_txid` - The spent output's transaction ID (internal order).
    /// * `prev_vout` - The spent output's index.
    ///
    /// # Returns
    /// A new unsigned `TxInput`.
    pub fn new(prev_txid: [u8; 32], prev_vout: u32) -> Self {
        TxInput {
            prev_txid,
            prev_vout,
            sequence: DEFAULT_SEQUENCE_NUMBER,
            script_sig: None,
            witness: Vec::new(),
            spent_output: None,
        }
    }

    /// Create a new input from a display-order (big-endian) txid hex string.
    ///
    /// Transaction IDs are displayed byte-reversed from their internal
    /// order; this constructor performs the reversal.
    ///
    /// # Arguments
    /// * `txid_hex` - The 64-character display-order txid.
    /// * `prev_vout` - The spent output's index.
    ///
    /// # Returns
    /// `Ok(TxInput)` or an error if the hex is not a 32-byte value.
    pub fn from_display_txid(txid_hex: &str, prev_vout: u32) -> Result<Self, TransactionError> {
        let bytes = hex::decode(txid_hex).map_err(|e| {
            TransactionError::SerializationError(format!("invalid txid hex: {}", e))
        })?;
        if bytes.len() != 32 {
            return Err(TransactionError::SerializationError(format!(
                "txid must be 32 bytes, got {}",
                bytes.len()
            )));
        }
        let mut prev_txid = [0u8; 32];
        for (i, b) in bytes.iter().rev().enumerate() {
            prev_txid[i] = *b;
        }
        Ok(Self::new(prev_txid, prev_vout))
    }

    /// Record the output being spent by this input.
    ///
    /// The script and value are required to compute signature hashes.
    ///
    /// # Arguments
    /// * `output` - The spent output, or `None` to clear.
    pub fn set_spent_output(&mut self, output: Option<TxOutput>) {
        self.spent_output = output;
    }

    /// Look up the output being spent, if recorded.
    ///
    /// # Returns
    /// `Some(&TxOutput)` when the spent output info is available.
    pub fn spent_output(&self) -> Option<&TxOutput> {
        self.spent_output.as_ref()
    }

    /// Whether this input carries witness data.
    ///
    /// # Returns
    /// `true` if the witness stack is non-empty.
    pub fn has_witness(&self) -> bool {
        !self.witness.is_empty()
    }

    /// Deserialize the legacy portion of a `TxInput` from a `WireReader`.
    ///
    /// Witness data, when present, is appended separately by the
    /// transaction-level parser.
    ///
    /// # Arguments
    /// * `reader` - The reader positioned at the start of an encoded input.
    ///
    /// # Returns
    /// `Ok(TxInput)` on success, or a `TransactionError` if the data is
    /// truncated or malformed.
    pub fn read_from(reader: &mut WireReader) -> Result<Self, TransactionError> {
        let txid_bytes = reader.read_bytes(32).map_err(|e| {
            TransactionError::SerializationError(format!("reading prev txid: {}", e))
        })?;
        let mut prev_txid = [0u8; 32];
        prev_txid.copy_from_slice(txid_bytes);

        let prev_vout = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading output index: {}", e))
        })?;

        let script_len = reader.read_varint().map_err(|e| {
            TransactionError::SerializationError(format!("reading script length: {}", e))
        })?;

        let script_bytes = reader.read_bytes(script_len.value() as usize).map_err(|e| {
            TransactionError::SerializationError(format!("reading scriptSig: {}", e))
        })?;

        let sequence = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading sequence: {}", e))
        })?;

        let script_sig = if script_bytes.is_empty() {
            None
        } else {
            Some(Script::from_bytes(script_bytes))
        };

        Ok(TxInput {
            prev_txid,
            prev_vout,
            sequence,
            script_sig,
            witness: Vec::new(),
            spent_output: None,
        })
    }

    /// Serialize the legacy portion of this input into a `WireWriter`.
    ///
    /// # Arguments
    /// * `writer` - The writer to append serialized bytes to.
    pub fn write_to(&self, writer: &mut WireWriter) {
        writer.write_bytes(&self.prev_txid);
        writer.write_u32_le(self.prev_vout);

        match &self.script_sig {
            Some(script) => {
                let script_bytes = script.to_bytes();
                writer.write_varint(VarInt::from(script_bytes.len()));
                writer.write_bytes(script_bytes);
            }
            None => {
                writer.write_varint(VarInt::from(0u64));
            }
        }

        writer.write_u32_le(self.sequence);
    }

    /// Serialize this input's witness stack into a `WireWriter`.
    ///
    /// Writes the item count followed by each length-prefixed item. An
    /// input without witness data writes a zero count.
    ///
    /// # Arguments
    /// * `writer` - The writer to append serialized bytes to.
    pub fn write_witness_to(&self, writer: &mut WireWriter) {
        writer.write_varint(VarInt::from(self.witness.len()));
        for item in &self.witness {
            writer.write_varint(VarInt::from(item.len()));
            writer.write_bytes(item);
        }
    }
}
