//! Script type - a byte sequence of opcodes and data pushes.
//!
//! Scripts are used in transaction inputs (unlocking) and outputs
//! (locking) to define spending conditions. The `Script` wraps a
//! `Vec<u8>` and provides construction and serialization methods; it
//! deliberately does not interpret scripts.

use std::fmt;

use crate::opcodes::*;
use crate::ScriptError;

/// A script, represented as a byte vector newtype.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Script(Vec<u8>);

impl Script {
    /// Create a new empty script.
    ///
    /// # Returns
    /// An empty `Script` instance.
    pub fn new() -> Self {
        Script(Vec::new())
    }

    /// Create a script from a hex-encoded string.
    ///
    /// # Arguments
    /// * `hex_str` - A hex string (e.g. "76a914...88ac").
    ///
    /// # Returns
    /// A `Script` wrapping the decoded bytes, or an error if the hex is invalid.
    pub fn from_hex(hex_str: &str) -> Result<Self, ScriptError> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| ScriptError::InvalidHex(e.to_string()))?;
        Ok(Script(bytes))
    }

    /// Create a script from raw bytes.
    ///
    /// # Arguments
    /// * `bytes` - Raw script bytes.
    ///
    /// # Returns
    /// A `Script` wrapping a copy of the given bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Script(bytes.to_vec())
    }

    /// Encode the script as a hex string.
    ///
    /// # Returns
    /// A lowercase hex representation of the script bytes.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Return a reference to the underlying bytes.
    ///
    /// # Returns
    /// A byte slice of the script contents.
    pub fn to_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Return the length of the script in bytes.
    ///
    /// # Returns
    /// The number of bytes in the script.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the script is empty (zero bytes).
    ///
    /// # Returns
    /// `true` if the script has no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Append data bytes to the script with the proper push prefix.
    ///
    /// Chooses the minimal encoding: a bare length byte for 0-75 bytes,
    /// OP_PUSHDATA1 for 76-255, OP_PUSHDATA2 up to 65535, OP_PUSHDATA4
    /// beyond. An empty push encodes as the single byte 0x00 (OP_0).
    ///
    /// # Arguments
    /// * `data` - The data bytes to push.
    ///
    /// # Returns
    /// `Ok(())` on success, or an error if the data is too large.
    pub fn append_push_data(&mut self, data: &[u8]) -> Result<(), ScriptError> {
        let len = data.len();
        if len <= 75 {
            self.0.push(len as u8);
        } else if len <= 0xff {
            self.0.push(OP_PUSHDATA1);
            self.0.push(len as u8);
        } else if len <= 0xffff {
            self.0.push(OP_PUSHDATA2);
            self.0.extend_from_slice(&(len as u16).to_le_bytes());
        } else if len <= 0xffff_ffff {
            self.0.push(OP_PUSHDATA4);
            self.0.extend_from_slice(&(len as u32).to_le_bytes());
        } else {
            return Err(ScriptError::PushDataTooLarge(len));
        }
        self.0.extend_from_slice(data);
        Ok(())
    }

    /// Append a raw opcode byte to the script.
    ///
    /// # Arguments
    /// * `opcode` - The opcode byte to append.
    pub fn append_opcode(&mut self, opcode: u8) {
        self.0.push(opcode);
    }

    /// Check if this is a Pay-to-Public-Key-Hash (P2PKH) output script.
    ///
    /// Pattern: OP_DUP OP_HASH160 <20 bytes> OP_EQUALVERIFY OP_CHECKSIG
    ///
    /// # Returns
    /// `true` if the script matches the P2PKH pattern.
    pub fn is_p2pkh(&self) -> bool {
        let b = &self.0;
        b.len() == 25
            && b[0] == OP_DUP
            && b[1] == OP_HASH160
            && b[2] == OP_DATA_20
            && b[23] == OP_EQUALVERIFY
            && b[24] == OP_CHECKSIG
    }

    /// Check if this is a Pay-to-Script-Hash (P2SH) output script.
    ///
    /// Pattern: OP_HASH160 <20 bytes> OP_EQUAL
    ///
    /// # Returns
    /// `true` if the script matches the P2SH pattern.
    pub fn is_p2sh(&self) -> bool {
        let b = &self.0;
        b.len() == 23
            && b[0] == OP_HASH160
            && b[1] == OP_DATA_20
            && b[22] == OP_EQUAL
    }

    /// Check if this is a version-0 witness program output script.
    ///
    /// Pattern: OP_0 <20 or 32 bytes>
    ///
    /// # Returns
    /// `true` if the script matches a v0 witness program.
    pub fn is_witness_v0(&self) -> bool {
        let b = &self.0;
        (b.len() == 22 && b[0] == OP_0 && b[1] == OP_DATA_20)
            || (b.len() == 34 && b[0] == OP_0 && b[1] == OP_DATA_32)
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Script({})", self.to_hex())
    }
}

impl fmt::Display for Script {
    /// Display the script as its hex encoding.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
