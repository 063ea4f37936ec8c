/// UTXO signer - cryptographic primitives, hashing, and wire utilities.
///
/// This crate provides the foundational building blocks for the signer:
/// - Hash functions (SHA-256, SHA-256d, RIPEMD-160, Hash160, HMAC)
/// - Elliptic curve cryptography (secp256k1 keys, deterministic low-R ECDSA)
/// - Variable-length integer encoding and wire readers/writers

pub mod hash;
pub mod util;
pub mod ec;

mod error;
pub use error::PrimitivesError;
