#![deny(missing_docs)]

//! UTXO signer - complete client-side signing engine.
//!
//! Re-exports all signer components for convenient single-crate usage.

pub use signer_engine as engine;
pub use signer_primitives as primitives;
pub use signer_script as script;
pub use signer_transaction as transaction;
