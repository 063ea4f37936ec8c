//! Transaction output with value and locking script.
//!
//! Defines the spending conditions for the output's value. Provides
//! binary serialization/deserialization following the Bitcoin wire format.

use signer_primitives::util::{VarInt, WireReader, WireWriter};
use signer_script::Script;

use crate::TransactionError;

/// A single output in a transaction.
///
/// Each output specifies a `value` in minor units (satoshis and their
/// LTC/DOGE equivalents) and a `script_pubkey` that defines the
/// conditions under which the funds may be spent.
///
/// # Wire format
///
/// | Field         | Size           |
/// |---------------|----------------|
/// | value         | 8 bytes (LE)   |
/// | script length | VarInt         |
/// | script_pubkey | variable       |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxOutput {
    /// The number of minor units locked by this output.
    pub value: u64,

    /// The locking script (scriptPubKey) that defines spending conditions.
    pub script_pubkey: Script,
}

impl TxOutput {
    /// Create a new `TxOutput`.
    ///
    /// # Arguments
    /// * `value` - The value in minor units.
    /// * `script_pubkey` - The locking script.
    ///
    /// # Returns
    /// A new `TxOutput`.
    pub fn new(value: u64, script_pubkey: Script) -> Self {
        TxOutput { value, script_pubkey }
    }

    /// Deserialize a `TxOutput` from a `WireReader`.
    ///
    /// Reads 8-byte LE value, a varint script length, and the script bytes.
    ///
    /// # Arguments
    /// * `reader` - The reader positioned at the start of an encoded output.
    ///
    /// # Returns
    /// `Ok(TxOutput)` on success, or a `TransactionError` if the data is
    /// truncated or malformed.
    pub fn read_from(reader: &mut WireReader) -> Result<Self, TransactionError> {
        let value = reader.read_u64_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading output value: {}", e))
        })?;

        let script_len = reader.read_varint().map_err(|e| {
            TransactionError::SerializationError(format!("reading script length: {}", e))
        })?;

        let script_bytes = reader.read_bytes(script_len.value() as usize).map_err(|e| {
            TransactionError::SerializationError(format!("reading locking script: {}", e))
        })?;

        Ok(TxOutput {
            value,
            script_pubkey: Script::from_bytes(script_bytes),
        })
    }

    /// Serialize this `TxOutput` into a `WireWriter`.
    ///
    /// Writes 8-byte LE value, a varint script length, and the script.
    ///
    /// # Arguments
    /// * `writer` - The writer to append serialized bytes to.
    pub fn write_to(&self, writer: &mut WireWriter) {
        writer.write_u64_le(self.value);
        let script_bytes = self.script_pubkey.to_bytes();
        writer.write_varint(VarInt::from(script_bytes.len()));
        writer.write_bytes(script_bytes);
    }

    /// Serialize this output to a byte vector.
    ///
    /// The same encoding is used on the wire and inside signature-hash
    /// preimages.
    ///
    /// # Returns
    /// A `Vec<u8>` containing the wire-format bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = WireWriter::new();
        self.write_to(&mut writer);
        writer.into_bytes()
    }
}
