use signer_primitives::PrimitivesError;
use signer_script::ScriptError;
use signer_transaction::TransactionError;

/// Error types for the signing engine.
///
/// Every variant is terminal for the current call; nothing in this crate
/// retries internally. The key store is purged on every error path via
/// the engine's scope guard.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    // --- amount codec ---
    /// A decimal amount string is not in the `x.yyyyyyyy` wire form.
    #[error("malformed amount '{0}': expected 8 decimal places")]
    MalformedAmount(String),
    /// An amount does not fit the host integer range.
    #[error("amount overflow: {0}")]
    AmountOverflow(String),
    /// An encoded amount failed its defensive re-encode check.
    #[error("amount round-trip mismatch for {0}")]
    RoundTripMismatch(u64),

    // --- key store ---
    /// An explicit key is not 64 lowercase hex characters or not a valid
    /// scalar.
    #[error("keys must be 64-char lowercase hex strings")]
    InvalidKeyFormat,
    /// The PIN-decrypted key does not match the declared public key.
    #[error("public key mismatch; invalid secret PIN detected")]
    PinMismatch,
    /// The encrypted user key could not be decrypted or derived.
    #[error("could not extract private key: {0}")]
    KeyExtractionFailed(String),
    /// No key is stored for the requested signer.
    #[error("no private key held for signer {0}")]
    UnknownSigner(String),

    // --- builder ---
    /// The locally built unsigned transaction does not match the
    /// server-declared transaction ID.
    #[error("expected unsigned txid did not match: expected {expected}, built {built}")]
    UnsignedTxidMismatch {
        /// The transaction ID the intent declared.
        expected: String,
        /// The transaction ID of the locally built transaction.
        built: String,
    },
    /// A single-key template appeared in a partial-signature flow.
    #[error("cannot produce partial signatures for address type {0}")]
    PartialSigningUnsupported(String),
    /// The intent carries an encrypted user key but no PIN is available.
    #[error("a PIN is required to decrypt the user key for this transaction")]
    MissingPin,
    /// An input's spending address has no metadata entry.
    #[error("no address data supplied for spending address {0}")]
    MissingAddressData(String),

    // --- summarizer ---
    /// Input values do not cover the declared outputs and fees.
    #[error("negative network fee: outputs exceed inputs")]
    NegativeNetworkFee,

    // --- sweep ---
    /// The sweep request has no private key.
    #[error("missing mandatory private_key argument")]
    MissingPrivateKey,
    /// The sweep request has no destination address.
    #[error("missing mandatory to_address argument")]
    MissingDestination,
    /// The sweep private key is not valid WIF for the target network.
    #[error("could not parse private_key as WIF: {0}")]
    InvalidWif(String),

    // --- forwarded ---
    /// An underlying primitives error.
    #[error("primitives error: {0}")]
    Primitives(#[from] PrimitivesError),
    /// An underlying script/address/network error.
    #[error("script error: {0}")]
    Script(#[from] ScriptError),
    /// An underlying transaction error.
    #[error("transaction error: {0}")]
    Transaction(#[from] TransactionError),
}
