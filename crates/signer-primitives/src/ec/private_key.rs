//! secp256k1 private key with wallet-specific functionality.
//!
//! Wraps a k256 signing key and adds WIF encoding with per-network version
//! bytes, passphrase-based derivation, and deterministic (optionally low-R)
//! ECDSA signing.

use k256::ecdsa::SigningKey;
use k256::Scalar;
use rand::rngs::OsRng;

use crate::ec::public_key::PublicKey;
use crate::ec::signature::Signature;
use crate::hash::{sha256, sha256d};
use crate::PrimitivesError;

/// Length of a serialized private key in bytes.
const PRIVATE_KEY_BYTES_LEN: usize = 32;

/// Compression flag byte appended to WIF for compressed public keys.
const COMPRESS_MAGIC: u8 = 0x01;

/// A secp256k1 private key for transaction signing.
///
/// Wraps a k256 `SigningKey` and provides WIF serialization against a
/// caller-supplied network version byte, passphrase derivation, and both
/// plain-RFC6979 and low-R deterministic signing.
#[derive(Clone, Debug)]
pub struct PrivateKey {
    /// The underlying k256 signing key.
    inner: SigningKey,
}

impl PrivateKey {
    /// Generate a new random private key using the OS random number generator.
    ///
    /// # Returns
    /// A new randomly generated `PrivateKey`.
    pub fn generate() -> Self {
        PrivateKey {
            inner: SigningKey::random(&mut OsRng),
        }
    }

    /// Create a private key from a raw 32-byte scalar.
    ///
    /// # Arguments
    /// * `bytes` - A 32-byte slice representing the private key scalar.
    ///
    /// # Returns
    /// `Ok(PrivateKey)` if the bytes represent a valid scalar on secp256k1,
    /// or an error if the scalar is zero or out of range.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        if bytes.len() != PRIVATE_KEY_BYTES_LEN {
            return Err(PrimitivesError::InvalidPrivateKey(format!(
                "expected {} bytes, got {}",
                PRIVATE_KEY_BYTES_LEN,
                bytes.len()
            )));
        }
        let signing_key = SigningKey::from_bytes(bytes.into())
            .map_err(|e| PrimitivesError::InvalidPrivateKey(e.to_string()))?;
        Ok(PrivateKey { inner: signing_key })
    }

    /// Create a private key from a hexadecimal string.
    ///
    /// # Arguments
    /// * `hex_str` - A 64-character hex string representing the 32-byte scalar.
    ///
    /// # Returns
    /// `Ok(PrivateKey)` on success, or an error if the hex or scalar is invalid.
    pub fn from_hex(hex_str: &str) -> Result<Self, PrimitivesError> {
        if hex_str.is_empty() {
            return Err(PrimitivesError::InvalidPrivateKey(
                "private key hex is empty".to_string(),
            ));
        }
        let bytes = hex::decode(hex_str)?;
        Self::from_bytes(&bytes)
    }

    /// Derive a private key from a passphrase.
    ///
    /// The key scalar is SHA-256 of the passphrase bytes. Remote key
    /// descriptors transport the passphrase as hex text; decode it before
    /// calling this (`from_passphrase_hex` does both steps).
    ///
    /// # Arguments
    /// * `passphrase` - Raw passphrase bytes.
    ///
    /// # Returns
    /// `Ok(PrivateKey)` on success, or an error if the hash is not a valid
    /// scalar (cryptographically negligible).
    pub fn from_passphrase(passphrase: &[u8]) -> Result<Self, PrimitivesError> {
        Self::from_bytes(&sha256(passphrase))
    }

    /// Derive a private key from a hex-encoded passphrase string.
    ///
    /// # Arguments
    /// * `passphrase_hex` - The passphrase as a hex string.
    ///
    /// # Returns
    /// `Ok(PrivateKey)` with the scalar SHA-256(hex-decoded passphrase).
    pub fn from_passphrase_hex(passphrase_hex: &str) -> Result<Self, PrimitivesError> {
        let bytes = hex::decode(passphrase_hex)?;
        Self::from_passphrase(&bytes)
    }

    /// Create a private key from a WIF (Wallet Import Format) string.
    ///
    /// Decodes the Base58Check-encoded string, validates the checksum and
    /// the expected network version byte, and extracts the 32-byte scalar.
    ///
    /// # Arguments
    /// * `wif` - A Base58Check-encoded WIF string (compressed or uncompressed).
    /// * `version` - The expected network WIF version byte (e.g. 0x80 for BTC).
    ///
    /// # Returns
    /// `Ok(PrivateKey)` on success, or an error if the WIF is malformed,
    /// carries the wrong version byte, or the checksum fails.
    pub fn from_wif(wif: &str, version: u8) -> Result<Self, PrimitivesError> {
        let decoded = bs58::decode(wif)
            .into_vec()
            .map_err(|e| PrimitivesError::InvalidWif(e.to_string()))?;
        let decoded_len = decoded.len();

        // 1 byte version + 32 byte key + optional compress flag + 4 byte checksum.
        let is_compressed = match decoded_len {
            38 => {
                if decoded[33] != COMPRESS_MAGIC {
                    return Err(PrimitivesError::InvalidWif(
                        "malformed private key: invalid compression flag".to_string(),
                    ));
                }
                true
            }
            37 => false,
            _ => {
                return Err(PrimitivesError::InvalidWif(format!(
                    "malformed private key: invalid length {}",
                    decoded_len
                )));
            }
        };

        let payload_end = if is_compressed {
            1 + PRIVATE_KEY_BYTES_LEN + 1
        } else {
            1 + PRIVATE_KEY_BYTES_LEN
        };
        let checksum = sha256d(&decoded[..payload_end]);
        if checksum[..4] != decoded[decoded_len - 4..] {
            return Err(PrimitivesError::ChecksumMismatch);
        }

        if decoded[0] != version {
            return Err(PrimitivesError::InvalidWif(format!(
                "version byte mismatch: expected {:#04x}, got {:#04x}",
                version, decoded[0]
            )));
        }

        Self::from_bytes(&decoded[1..1 + PRIVATE_KEY_BYTES_LEN])
    }

    /// Encode the private key as a WIF string with the given network version
    /// byte.
    ///
    /// Always encodes for compressed public key format.
    ///
    /// # Arguments
    /// * `version` - The network WIF version byte (0x80 BTC, 0xef BTCTEST, ...).
    ///
    /// # Returns
    /// A Base58Check-encoded WIF string.
    pub fn to_wif(&self, version: u8) -> String {
        let key_bytes = self.to_bytes();
        let mut payload = Vec::with_capacity(1 + PRIVATE_KEY_BYTES_LEN + 1 + 4);
        payload.push(version);
        payload.extend_from_slice(&key_bytes);
        payload.push(COMPRESS_MAGIC);

        let checksum = sha256d(&payload);
        payload.extend_from_slice(&checksum[..4]);

        bs58::encode(payload).into_string()
    }

    /// Serialize the private key as a 32-byte big-endian array.
    ///
    /// # Returns
    /// A 32-byte array containing the private key scalar.
    pub fn to_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.inner.to_bytes());
        out
    }

    /// Serialize the private key as a lowercase hexadecimal string.
    ///
    /// # Returns
    /// A 64-character hex string representing the 32-byte scalar.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Derive the corresponding public key for this private key.
    ///
    /// # Returns
    /// The `PublicKey` corresponding to this private key.
    pub fn pub_key(&self) -> PublicKey {
        PublicKey::from_verifying_key(self.inner.verifying_key())
    }

    /// Sign a 32-byte digest using plain RFC6979 deterministic nonces.
    ///
    /// Produces a low-S normalized signature. The R component is whatever
    /// the first RFC6979 nonce yields; use `sign_low_r` when byte-identical
    /// output with cooperating implementations is required.
    ///
    /// # Arguments
    /// * `digest` - The 32-byte message digest to sign.
    ///
    /// # Returns
    /// `Ok(Signature)` on success, or an error if signing fails.
    pub fn sign(&self, digest: &[u8; 32]) -> Result<Signature, PrimitivesError> {
        Signature::sign(digest, self)
    }

    /// Sign a 32-byte digest, grinding for a low-R signature.
    ///
    /// See `Signature::sign_low_r` for the auxiliary-entropy search order,
    /// which is a compatibility contract with peer implementations.
    ///
    /// # Arguments
    /// * `digest` - The 32-byte message digest to sign.
    ///
    /// # Returns
    /// `Ok(Signature)` whose R encodes to exactly 32 DER bytes.
    pub fn sign_low_r(&self, digest: &[u8; 32]) -> Result<Signature, PrimitivesError> {
        Signature::sign_low_r(digest, self)
    }

    /// Access the underlying k256 `SigningKey`.
    ///
    /// # Returns
    /// A reference to the inner `SigningKey`.
    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.inner
    }

    /// Convert the private key to a k256 `Scalar` for signing primitives.
    ///
    /// # Returns
    /// The scalar representation of this private key.
    pub(crate) fn to_scalar(&self) -> Scalar {
        *self.inner.as_nonzero_scalar().as_ref()
    }
}

impl Drop for PrivateKey {
    fn drop(&mut self) {
        use zeroize::Zeroize;
        // Overwrite the scalar's byte representation with zeros.
        let mut bytes: [u8; 32] = self.inner.to_bytes().into();
        bytes.zeroize();
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for PrivateKey {}
