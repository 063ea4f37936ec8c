/// Error types for script, address, and network-parameter operations.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// A hex string could not be decoded.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// An address string is malformed or belongs to a different network.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// A Base58Check checksum did not match.
    #[error("address checksum mismatch")]
    ChecksumMismatch,

    /// The network symbol has no registered parameters.
    #[error("unknown network: {0}")]
    UnknownNetwork(String),

    /// The address type tag is not one of the supported templates.
    #[error("unknown address type: {0}")]
    UnknownAddressType(String),

    /// A public key is not a plausible SEC1 encoding.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// A multisig script specification is out of range.
    #[error("invalid multisig: {0}")]
    InvalidMultisig(String),

    /// A push exceeds the maximum encodable data length.
    #[error("push data too large: {0} bytes")]
    PushDataTooLarge(usize),
}
