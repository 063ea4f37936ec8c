/// UTXO signer - scripts, addresses, and network parameters.
///
/// Provides the script type and opcode definitions, the per-currency
/// network parameter registry, address encoding/decoding (Base58Check and
/// bech32), and the spend-script resolver for the supported address
/// templates.

pub mod script;
pub mod opcodes;
pub mod network;
pub mod address;
pub mod spend;

mod error;
pub use error::ScriptError;
pub use network::NetworkParams;
pub use script::Script;
pub use spend::{AddressType, SpendInfo};
