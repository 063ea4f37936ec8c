//! Elliptic curve cryptography over secp256k1.
//!
//! Private/public key types and deterministic ECDSA signatures with the
//! low-R convention required for cross-implementation compatibility.

pub mod private_key;
pub mod public_key;
pub mod signature;

pub use private_key::PrivateKey;
pub use public_key::PublicKey;
pub use signature::Signature;
