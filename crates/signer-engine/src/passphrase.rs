//! PIN-based passphrase decryption and key extraction.
//!
//! User keys arrive as an AES-encrypted hex passphrase plus the PBKDF2
//! parameters used to stretch the PIN into the AES key. The stretch runs
//! in two phases: PIN -> 16-byte key, then the hex of that key -> 32-byte
//! key, with the iteration budget split evenly. Legacy keys use
//! AES-256-ECB with PKCS#7 padding; current keys use AES-256-GCM.

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes_gcm::aead::{Aead, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;

use signer_primitives::ec::PrivateKey;

use crate::intent::{UserKey, UserKeyAlgorithm};
use crate::EngineError;

/// AES block size in bytes.
const BLOCK_LEN: usize = 16;

/// GCM nonce length in bytes.
const GCM_NONCE_LEN: usize = 12;

/// Stretch a PIN into a base64-encoded AES key.
///
/// Phase 1 derives `phase1_len` bytes from the PIN; phase 2 derives
/// `phase2_len` bytes from the lowercase hex of the phase-1 output. Each
/// phase runs half of `iterations`. Both phases use HMAC-SHA256.
///
/// # Arguments
/// * `pin` - The user's secret PIN.
/// * `salt` - PBKDF2 salt (empty for legacy keys).
/// * `iterations` - Total iteration budget, split across the phases.
/// * `phase1_len` - Byte length of the first-phase output.
/// * `phase2_len` - Byte length of the second-phase output (the AES key).
///
/// # Returns
/// The base64 encoding of the phase-2 output.
pub fn pin_to_aes_key(
    pin: &str,
    salt: &str,
    iterations: u32,
    phase1_len: usize,
    phase2_len: usize,
) -> String {
    let mut phase1 = vec![0u8; phase1_len];
    pbkdf2_hmac::<Sha256>(pin.as_bytes(), salt.as_bytes(), iterations / 2, &mut phase1);

    let phase1_hex = hex::encode(&phase1);
    let mut phase2 = vec![0u8; phase2_len];
    pbkdf2_hmac::<Sha256>(
        phase1_hex.as_bytes(),
        salt.as_bytes(),
        iterations / 2,
        &mut phase2,
    );

    BASE64.encode(phase2)
}

/// Encrypt plaintext with AES-256-ECB and PKCS#7 padding.
///
/// Only the legacy cipher is supported for encryption; the engine never
/// produces GCM ciphertexts, it only consumes them.
///
/// # Arguments
/// * `plaintext` - The data to encrypt.
/// * `key_b64` - The base64 AES key from `pin_to_aes_key`.
///
/// # Returns
/// The base64 ciphertext, or `KeyExtractionFailed` on a bad key.
pub fn encrypt_ecb(plaintext: &[u8], key_b64: &str) -> Result<String, EngineError> {
    let key = decode_key(key_b64)?;
    let cipher = aes::Aes256::new_from_slice(&key)
        .map_err(|e| EngineError::KeyExtractionFailed(e.to_string()))?;

    // PKCS#7: always pad, even when already block-aligned.
    let pad = BLOCK_LEN - plaintext.len() % BLOCK_LEN;
    let mut buffer = plaintext.to_vec();
    buffer.extend(std::iter::repeat(pad as u8).take(pad));

    for chunk in buffer.chunks_mut(BLOCK_LEN) {
        let block = GenericArray::from_mut_slice(chunk);
        cipher.encrypt_block(block);
    }

    Ok(BASE64.encode(buffer))
}

/// Decrypt a base64 ciphertext with the parameters of a key descriptor.
///
/// Dispatches on `algorithm.aes_cipher`: "AES-256-ECB" (PKCS#7 padded)
/// or "AES-256-GCM" (IV and auth tag from the descriptor).
///
/// # Arguments
/// * `ciphertext_b64` - The base64 ciphertext.
/// * `key_b64` - The base64 AES key from `pin_to_aes_key`.
/// * `algorithm` - Cipher parameters from the key descriptor.
///
/// # Returns
/// The plaintext bytes, or `KeyExtractionFailed` if decryption fails.
pub fn decrypt(
    ciphertext_b64: &str,
    key_b64: &str,
    algorithm: &UserKeyAlgorithm,
) -> Result<Vec<u8>, EngineError> {
    let key = decode_key(key_b64)?;
    let ciphertext = BASE64
        .decode(ciphertext_b64)
        .map_err(|e| EngineError::KeyExtractionFailed(format!("bad ciphertext: {}", e)))?;

    match algorithm.aes_cipher.as_str() {
        "AES-256-ECB" => decrypt_ecb(&ciphertext, &key),
        "AES-256-GCM" => decrypt_gcm(&ciphertext, &key, algorithm),
        other => Err(EngineError::KeyExtractionFailed(format!(
            "unsupported cipher {}",
            other
        ))),
    }
}

/// Decrypt an AES-256-ECB ciphertext and strip PKCS#7 padding.
fn decrypt_ecb(ciphertext: &[u8], key: &[u8]) -> Result<Vec<u8>, EngineError> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
        return Err(EngineError::KeyExtractionFailed(format!(
            "ciphertext length {} is not a positive multiple of {}",
            ciphertext.len(),
            BLOCK_LEN
        )));
    }

    let cipher = aes::Aes256::new_from_slice(key)
        .map_err(|e| EngineError::KeyExtractionFailed(e.to_string()))?;

    let mut buffer = ciphertext.to_vec();
    for chunk in buffer.chunks_mut(BLOCK_LEN) {
        let block = GenericArray::from_mut_slice(chunk);
        cipher.decrypt_block(block);
    }

    // PKCS#7 unpad. A bad pad means the key (and therefore the PIN) was
    // wrong, or the ciphertext is corrupt.
    let pad = buffer[buffer.len() - 1] as usize;
    if pad == 0 || pad > BLOCK_LEN || pad > buffer.len() {
        return Err(EngineError::KeyExtractionFailed("bad padding".to_string()));
    }
    if !buffer[buffer.len() - pad..].iter().all(|&b| b as usize == pad) {
        return Err(EngineError::KeyExtractionFailed("bad padding".to_string()));
    }
    buffer.truncate(buffer.len() - pad);
    Ok(buffer)
}

/// Decrypt an AES-256-GCM ciphertext using the descriptor's IV, auth tag,
/// and additional authenticated data.
fn decrypt_gcm(
    ciphertext: &[u8],
    key: &[u8],
    algorithm: &UserKeyAlgorithm,
) -> Result<Vec<u8>, EngineError> {
    let iv_hex = algorithm
        .aes_iv
        .as_deref()
        .ok_or_else(|| EngineError::KeyExtractionFailed("AES-256-GCM requires an IV".to_string()))?;
    let iv = hex::decode(iv_hex)
        .map_err(|e| EngineError::KeyExtractionFailed(format!("bad IV hex: {}", e)))?;
    if iv.len() != GCM_NONCE_LEN {
        return Err(EngineError::KeyExtractionFailed(format!(
            "GCM IV must be {} bytes, got {}",
            GCM_NONCE_LEN,
            iv.len()
        )));
    }

    let tag_hex = algorithm.aes_auth_tag.as_deref().ok_or_else(|| {
        EngineError::KeyExtractionFailed("AES-256-GCM requires an auth tag".to_string())
    })?;
    let tag = hex::decode(tag_hex)
        .map_err(|e| EngineError::KeyExtractionFailed(format!("bad auth tag hex: {}", e)))?;

    let aad = match algorithm.aes_auth_data.as_deref() {
        Some(data_hex) => hex::decode(data_hex)
            .map_err(|e| EngineError::KeyExtractionFailed(format!("bad auth data hex: {}", e)))?,
        None => Vec::new(),
    };

    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| EngineError::KeyExtractionFailed(e.to_string()))?;

    // The AEAD API expects ciphertext || tag.
    let mut message = ciphertext.to_vec();
    message.extend_from_slice(&tag);

    cipher
        .decrypt(
            Nonce::from_slice(&iv),
            Payload {
                msg: &message,
                aad: &aad,
            },
        )
        .map_err(|_| EngineError::KeyExtractionFailed("GCM authentication failed".to_string()))
}

/// Decrypt a user-key descriptor with a PIN and derive its private key.
///
/// The decrypted plaintext is a hex passphrase; the private key is
/// SHA-256 of its decoded bytes. Callers are responsible for comparing
/// the derived public key against the descriptor's declared one.
///
/// # Arguments
/// * `user_key` - The encrypted key descriptor.
/// * `pin` - The user's secret PIN.
///
/// # Returns
/// The derived `PrivateKey`, or `KeyExtractionFailed` if decryption or
/// derivation fails.
pub fn extract_user_key(user_key: &UserKey, pin: &str) -> Result<PrivateKey, EngineError> {
    let algorithm = user_key.algorithm.clone().unwrap_or_default();

    if algorithm.pbkdf2_hash_function != "SHA256" {
        return Err(EngineError::KeyExtractionFailed(format!(
            "unsupported PBKDF2 hash {}",
            algorithm.pbkdf2_hash_function
        )));
    }

    let aes_key = pin_to_aes_key(
        pin,
        &algorithm.pbkdf2_salt,
        algorithm.pbkdf2_iterations,
        algorithm.pbkdf2_phase1_key_length,
        algorithm.pbkdf2_phase2_key_length,
    );

    let plaintext = decrypt(&user_key.encrypted_passphrase, &aes_key, &algorithm)?;
    let passphrase_hex = String::from_utf8(plaintext)
        .map_err(|_| EngineError::KeyExtractionFailed("passphrase is not UTF-8".to_string()))?;

    PrivateKey::from_passphrase_hex(&passphrase_hex)
        .map_err(|e| EngineError::KeyExtractionFailed(e.to_string()))
}

/// Decode a base64 AES key and require the AES-256 key length.
fn decode_key(key_b64: &str) -> Result<Vec<u8>, EngineError> {
    let key = BASE64
        .decode(key_b64)
        .map_err(|e| EngineError::KeyExtractionFailed(format!("bad key: {}", e)))?;
    if key.len() != 32 {
        return Err(EngineError::KeyExtractionFailed(format!(
            "AES-256 key must be 32 bytes, got {}",
            key.len()
        )));
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fixtures recorded from a cooperating wallet implementation.
    const PIN: &str = "123456";
    const PIN_KEY: &str = "0EeMOVtm5YihUYzdCNgleqIUWkwgvNBcRmr7M0t9GOc=";
    const CLEARTEXT: &str = "I'm a little tea pot short and stout";
    const CIPHERTEXT: &str = "7HTfNBYJjq09+vi8hTQhy6lCp3IHv5rztNnKCJ5RB7cSL+NjHrFVv1jl7qkxJsOg";

    #[test]
    fn test_pin_to_aes_key_fixture() {
        assert_eq!(pin_to_aes_key(PIN, "", 2048, 16, 32), PIN_KEY);
    }

    #[test]
    fn test_ecb_encrypt_fixture() {
        let encrypted = encrypt_ecb(CLEARTEXT.as_bytes(), PIN_KEY).unwrap();
        assert_eq!(encrypted, CIPHERTEXT);
    }

    #[test]
    fn test_ecb_decrypt_fixture() {
        let decrypted = decrypt(CIPHERTEXT, PIN_KEY, &UserKeyAlgorithm::default()).unwrap();
        assert_eq!(decrypted, CLEARTEXT.as_bytes());
    }

    #[test]
    fn test_ecb_roundtrip_various_lengths() {
        for len in [0usize, 1, 15, 16, 17, 31, 32, 47] {
            let plaintext = vec![0x42u8; len];
            let encrypted = encrypt_ecb(&plaintext, PIN_KEY).unwrap();
            let decrypted =
                decrypt(&encrypted, PIN_KEY, &UserKeyAlgorithm::default()).unwrap();
            assert_eq!(decrypted, plaintext, "length {}", len);
        }
    }

    #[test]
    fn test_wrong_key_fails() {
        let wrong_key = pin_to_aes_key("654321", "", 2048, 16, 32);
        let result = decrypt(CIPHERTEXT, &wrong_key, &UserKeyAlgorithm::default());
        assert!(matches!(result, Err(EngineError::KeyExtractionFailed(_))));
    }

    #[test]
    fn test_unsupported_cipher_rejected() {
        let algorithm = UserKeyAlgorithm {
            aes_cipher: "AES-256-CTR".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            decrypt(CIPHERTEXT, PIN_KEY, &algorithm),
            Err(EngineError::KeyExtractionFailed(_))
        ));
    }

    #[test]
    fn test_extract_user_key_roundtrip() {
        // Encrypt the known hex passphrase under the default algorithm,
        // then extract and compare the derived keypair.
        let aes_key = pin_to_aes_key(PIN, "", 2048, 16, 32);
        let encrypted = encrypt_ecb(b"deadbeeffeedface", &aes_key).unwrap();

        let user_key = UserKey {
            public_key:
                "029023d9738c623cdd7e5fdd0f41666accb82f21df5d27dc5ef07040f7bdc5d9f5"
                    .to_string(),
            encrypted_passphrase: encrypted,
            algorithm: None,
        };

        let key = extract_user_key(&user_key, PIN).unwrap();
        assert_eq!(key.pub_key().to_hex(), user_key.public_key);
        assert_eq!(
            key.to_hex(),
            "ae9f07f3d627531db09562bbabad4c5e023f6505b4b06122730744261953e48f"
        );
    }

    #[test]
    fn test_gcm_requires_iv_and_tag() {
        let algorithm = UserKeyAlgorithm {
            aes_cipher: "AES-256-GCM".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            decrypt(CIPHERTEXT, PIN_KEY, &algorithm),
            Err(EngineError::KeyExtractionFailed(_))
        ));
    }
}
