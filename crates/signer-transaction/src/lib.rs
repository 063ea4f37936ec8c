/// UTXO signer - transaction construction and signature hashing.
///
/// Provides the transaction, input, and output types with legacy and
/// segwit wire serialization, transaction ID computation, and the legacy
/// and BIP143 signature-hash algorithms.

pub mod input;
pub mod output;
pub mod sighash;
pub mod transaction;

mod error;
pub use error::TransactionError;
pub use input::TxInput;
pub use output::TxOutput;
pub use transaction::Transaction;
