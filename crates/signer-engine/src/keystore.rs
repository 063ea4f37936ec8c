//! Call-scoped private key store.
//!
//! Holds imported private keys indexed by their compressed public key
//! hex for the duration of one signing operation. The engine wraps the
//! store in a `PurgeGuard` so key material is dropped (and zeroized) on
//! every exit path, success or failure.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};

use signer_primitives::ec::{PrivateKey, Signature};

use crate::intent::UserKey;
use crate::passphrase;
use crate::EngineError;

/// In-memory store of private keys for one signing operation.
pub struct KeyStore {
    /// Keys indexed by compressed public key hex.
    keys: HashMap<String, PrivateKey>,

    /// Whether signatures are ground to the low-R convention.
    low_r: bool,
}

impl KeyStore {
    /// Create an empty key store.
    ///
    /// # Arguments
    /// * `low_r` - Whether `sign` grinds for low-R signatures (the
    ///   default in production; disable only for compatibility with
    ///   peers that never adopted the convention).
    ///
    /// # Returns
    /// A new empty `KeyStore`.
    pub fn new(low_r: bool) -> Self {
        KeyStore {
            keys: HashMap::new(),
            low_r,
        }
    }

    /// Whether this store signs with the low-R convention.
    ///
    /// # Returns
    /// `true` when low-R grinding is enabled.
    pub fn low_r(&self) -> bool {
        self.low_r
    }

    /// Validate a raw hex private key without storing it.
    ///
    /// Keys must be exactly 64 lowercase hex characters and a valid
    /// curve scalar.
    ///
    /// # Arguments
    /// * `hex_key` - The candidate key string.
    ///
    /// # Returns
    /// The parsed key, or `InvalidKeyFormat`.
    pub fn parse_hex_key(hex_key: &str) -> Result<PrivateKey, EngineError> {
        let well_formed = hex_key.len() == 64
            && hex_key
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !well_formed {
            return Err(EngineError::InvalidKeyFormat);
        }
        PrivateKey::from_hex(hex_key).map_err(|_| EngineError::InvalidKeyFormat)
    }

    /// Import a raw hex private key.
    ///
    /// # Arguments
    /// * `hex_key` - 64 lowercase hex characters.
    ///
    /// # Returns
    /// The derived compressed public key hex the key is stored under,
    /// or `InvalidKeyFormat`.
    pub fn import_hex(&mut self, hex_key: &str) -> Result<String, EngineError> {
        let key = Self::parse_hex_key(hex_key)?;
        Ok(self.insert(key))
    }

    /// Store a parsed private key under its derived public key.
    ///
    /// # Arguments
    /// * `key` - The private key to store.
    ///
    /// # Returns
    /// The compressed public key hex the key is stored under.
    pub fn insert(&mut self, key: PrivateKey) -> String {
        let pubkey = key.pub_key().to_hex();
        self.keys.insert(pubkey.clone(), key);
        pubkey
    }

    /// Decrypt a user-key descriptor with a PIN and import it.
    ///
    /// Fails with `KeyExtractionFailed` if decryption or derivation
    /// fails, and with `PinMismatch` if the derived public key does not
    /// equal the descriptor's declared public key.
    ///
    /// # Arguments
    /// * `user_key` - The encrypted key descriptor.
    /// * `pin` - The user's secret PIN.
    ///
    /// # Returns
    /// The public key hex the key is stored under.
    pub fn decrypt_and_import(
        &mut self,
        user_key: &UserKey,
        pin: &str,
    ) -> Result<String, EngineError> {
        let key = passphrase::extract_user_key(user_key, pin)?;
        let pubkey = key.pub_key().to_hex();
        if pubkey != user_key.public_key {
            return Err(EngineError::PinMismatch);
        }
        self.keys.insert(pubkey.clone(), key);
        Ok(pubkey)
    }

    /// Whether a key is held for the given public key.
    ///
    /// # Arguments
    /// * `pubkey_hex` - Compressed public key hex.
    ///
    /// # Returns
    /// `true` if a private key is stored under that public key.
    pub fn contains(&self, pubkey_hex: &str) -> bool {
        self.keys.contains_key(pubkey_hex)
    }

    /// Number of keys currently held.
    ///
    /// # Returns
    /// The entry count.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the store holds no keys.
    ///
    /// # Returns
    /// `true` if empty.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Sign a 32-byte digest with the key held for a public key.
    ///
    /// Applies the store's low-R mode.
    ///
    /// # Arguments
    /// * `pubkey_hex` - The signer's compressed public key hex.
    /// * `digest` - The 32-byte digest to sign.
    ///
    /// # Returns
    /// The signature, or `UnknownSigner` if no key is held.
    pub fn sign(&self, pubkey_hex: &str, digest: &[u8; 32]) -> Result<Signature, EngineError> {
        let key = self
            .keys
            .get(pubkey_hex)
            .ok_or_else(|| EngineError::UnknownSigner(pubkey_hex.to_string()))?;
        let signature = if self.low_r {
            key.sign_low_r(digest)?
        } else {
            key.sign(digest)?
        };
        Ok(signature)
    }

    /// Sign a hex digest, returning DER hex without a sighash byte.
    ///
    /// This is the wire form partial-signature bundles carry.
    ///
    /// # Arguments
    /// * `pubkey_hex` - The signer's compressed public key hex.
    /// * `digest_hex` - The 64-character digest hex.
    ///
    /// # Returns
    /// DER signature hex, or `UnknownSigner` / a hex error.
    pub fn sign_digest_hex(
        &self,
        pubkey_hex: &str,
        digest_hex: &str,
    ) -> Result<String, EngineError> {
        let bytes = hex::decode(digest_hex)
            .map_err(signer_primitives::PrimitivesError::from)?;
        if bytes.len() != 32 {
            return Err(EngineError::Primitives(
                signer_primitives::PrimitivesError::InvalidHex(format!(
                    "digest must be 32 bytes, got {}",
                    bytes.len()
                )),
            ));
        }
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&bytes);
        Ok(self.sign(pubkey_hex, &digest)?.to_der_hex())
    }

    /// Drop every stored key.
    ///
    /// Dropped keys zeroize their scalar bytes. The engine calls this
    /// through a `PurgeGuard` at the end of every signing operation.
    pub fn purge_all(&mut self) {
        self.keys.clear();
    }
}

/// Scope guard that purges a key store when dropped.
///
/// Wraps a mutable borrow of the store for the duration of one signing
/// operation so that every exit path, including early errors, clears
/// key material without per-path cleanup code.
pub struct PurgeGuard<'a> {
    store: &'a mut KeyStore,
}

impl<'a> PurgeGuard<'a> {
    /// Wrap a key store in a purge-on-drop guard.
    ///
    /// # Arguments
    /// * `store` - The store to guard.
    ///
    /// # Returns
    /// The guard; deref to reach the store.
    pub fn new(store: &'a mut KeyStore) -> Self {
        PurgeGuard { store }
    }
}

impl Deref for PurgeGuard<'_> {
    type Target = KeyStore;

    fn deref(&self) -> &KeyStore {
        self.store
    }
}

impl DerefMut for PurgeGuard<'_> {
    fn deref_mut(&mut self) -> &mut KeyStore {
        self.store
    }
}

impl Drop for PurgeGuard<'_> {
    fn drop(&mut self) {
        self.store.purge_all();
    }
}
