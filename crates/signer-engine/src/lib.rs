/// UTXO signer - the transaction construction and signing engine.
///
/// Consumes server-supplied transaction intents and produces either a
/// finalized raw transaction or a partial-signature bundle for other
/// signers to complete. Key material lives in a call-scoped store that
/// is purged after every signing operation.

pub mod amount;
pub mod builder;
pub mod engine;
pub mod intent;
pub mod keystore;
pub mod passphrase;
pub mod summary;
pub mod sweep;

mod error;
pub use engine::{EngineOptions, SigningEngine};
pub use error::EngineError;
pub use intent::{
    AddressMetadata, InputDescriptor, InputSignature, OutputCategory, OutputDescriptor,
    SigningResult, SweepRequest, TransactionIntent, TransactionSummary, UserKey,
    UserKeyAlgorithm,
};
pub use keystore::KeyStore;
