//! ECDSA signature with DER serialization and deterministic nonces.
//!
//! Supports RFC6979 signing with optional auxiliary entropy, the low-R
//! grinding loop used for cross-implementation byte-identical signatures,
//! low-S normalization, DER encoding/decoding, and verification.

use k256::ecdsa::hazmat::SignPrimitive;
use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa;
use k256::FieldBytes;
use sha2::Sha256;

use crate::ec::private_key::PrivateKey;
use crate::ec::public_key::PublicKey;
use crate::PrimitivesError;

/// The secp256k1 curve order N.
/// N = FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141
const CURVE_ORDER: [u8; 32] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFE, 0xBA, 0xAE, 0xDC, 0xE6, 0xAF, 0x48, 0xA0, 0x3B, 0xBF, 0xD2, 0x5E, 0x8C, 0xD0, 0x36,
    0x41, 0x41,
];

/// Half of the secp256k1 curve order (N/2), used for low-S normalization.
const HALF_ORDER: [u8; 32] = [
    0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0x5D, 0x57, 0x6E, 0x73, 0x57, 0xA4, 0x50, 0x1D, 0xDF, 0xE9, 0x2F, 0x46, 0x68, 0x1B,
    0x20, 0xA0,
];

/// Size of the auxiliary entropy buffer passed to RFC6979.
const ENTROPY_LEN: usize = 32;

/// Width of the little-endian retry counter within the entropy buffer.
const ENTROPY_COUNTER_LEN: usize = 6;

/// An ECDSA signature with R and S components.
///
/// Provides DER serialization, RFC6979 deterministic signing with the
/// low-R search loop, low-S normalization, and verification.
#[derive(Clone, Debug)]
pub struct Signature {
    /// The R component of the signature (32 bytes, big-endian).
    r: [u8; 32],
    /// The S component of the signature (32 bytes, big-endian).
    s: [u8; 32],
}

impl Signature {
    /// Create a signature from raw R and S 32-byte arrays.
    ///
    /// # Arguments
    /// * `r` - The R component (32 bytes, big-endian).
    /// * `s` - The S component (32 bytes, big-endian).
    ///
    /// # Returns
    /// A new `Signature` with the given R and S values.
    pub fn new(r: [u8; 32], s: [u8; 32]) -> Self {
        Signature { r, s }
    }

    /// Access the R component of the signature.
    ///
    /// # Returns
    /// A reference to the 32-byte R value.
    pub fn r(&self) -> &[u8; 32] {
        &self.r
    }

    /// Access the S component of the signature.
    ///
    /// # Returns
    /// A reference to the 32-byte S value.
    pub fn s(&self) -> &[u8; 32] {
        &self.s
    }

    /// Sign a 32-byte digest using RFC6979 deterministic nonces.
    ///
    /// Produces a low-S normalized signature per BIP-0062. No auxiliary
    /// entropy is mixed into the nonce; this matches what cooperating
    /// implementations produce on their first signing attempt.
    ///
    /// # Arguments
    /// * `digest` - The 32-byte message digest to sign.
    /// * `priv_key` - The private key to sign with.
    ///
    /// # Returns
    /// `Ok(Signature)` on success, or an error if signing fails.
    pub fn sign(digest: &[u8; 32], priv_key: &PrivateKey) -> Result<Self, PrimitivesError> {
        Self::sign_with_entropy(digest, priv_key, &[])
    }

    /// Sign a 32-byte digest, searching for a low-R signature.
    ///
    /// Two independent RFC6979 implementations signing the same digest
    /// agree on the first nonce, but that nonce yields a high R roughly
    /// half the time. To converge on byte-identical DER output, both sides
    /// run the same search: sign once with no auxiliary entropy, then
    /// re-sign with a 32-byte zero buffer carrying a little-endian retry
    /// counter in its first six bytes (1, 2, 3, ...) until the signature's
    /// R component encodes to exactly 32 DER bytes. The search order is a
    /// compatibility contract, not an implementation detail.
    ///
    /// # Arguments
    /// * `digest` - The 32-byte message digest to sign.
    /// * `priv_key` - The private key to sign with.
    ///
    /// # Returns
    /// `Ok(Signature)` satisfying `has_low_r()`.
    pub fn sign_low_r(digest: &[u8; 32], priv_key: &PrivateKey) -> Result<Self, PrimitivesError> {
        let mut sig = Self::sign(digest, priv_key)?;

        let mut extra = [0u8; ENTROPY_LEN];
        let mut counter: u64 = 0;
        while !sig.has_low_r() {
            counter += 1;
            extra[..ENTROPY_COUNTER_LEN]
                .copy_from_slice(&counter.to_le_bytes()[..ENTROPY_COUNTER_LEN]);
            sig = Self::sign_with_entropy(digest, priv_key, &extra)?;
        }
        Ok(sig)
    }

    /// Sign a 32-byte digest with RFC6979 and explicit auxiliary entropy.
    ///
    /// The entropy is appended to the RFC6979 HMAC key material, matching
    /// libsecp256k1's `nonce_function_rfc6979` with non-null `data`.
    ///
    /// # Arguments
    /// * `digest` - The 32-byte message digest to sign.
    /// * `priv_key` - The private key to sign with.
    /// * `entropy` - Auxiliary entropy bytes (empty for plain RFC6979).
    ///
    /// # Returns
    /// `Ok(Signature)` with low-S normalization applied.
    fn sign_with_entropy(
        digest: &[u8; 32],
        priv_key: &PrivateKey,
        entropy: &[u8],
    ) -> Result<Self, PrimitivesError> {
        let z = FieldBytes::from(*digest);
        let (k256_sig, _recovery_id) = priv_key
            .to_scalar()
            .try_sign_prehashed_rfc6979::<Sha256>(&z, entropy)
            .map_err(|e| PrimitivesError::InvalidSignature(e.to_string()))?;

        let (r_bytes, s_bytes) = k256_sig.split_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&r_bytes);
        s.copy_from_slice(&s_bytes);

        // Low-S normalization per BIP-0062.
        if is_greater_than(&s, &HALF_ORDER) {
            s = subtract_from_order(&s);
        }

        Ok(Signature { r, s })
    }

    /// Check whether the R component satisfies the low-R convention.
    ///
    /// A signature is low-R when R's DER integer encoding is exactly 32
    /// bytes: either the top byte is in 0x01..=0x7f, or the top byte is
    /// zero and the next byte has its high bit set (DER re-pads it).
    ///
    /// # Returns
    /// `true` if the DER encoding of R occupies exactly 32 bytes.
    pub fn has_low_r(&self) -> bool {
        (self.r[0] != 0 && self.r[0] & 0x80 == 0)
            || (self.r[0] == 0 && self.r[1] & 0x80 != 0)
    }

    /// Parse a DER-encoded ECDSA signature.
    ///
    /// Expected format: 0x30 <len> 0x02 <r_len> <r> 0x02 <s_len> <s>
    ///
    /// # Arguments
    /// * `bytes` - DER-encoded signature bytes.
    ///
    /// # Returns
    /// `Ok(Signature)` on success, or an error if the DER encoding is malformed.
    pub fn from_der(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        if bytes.len() < 8 {
            return Err(PrimitivesError::InvalidSignature(
                "malformed signature: too short".to_string(),
            ));
        }

        if bytes[0] != 0x30 {
            return Err(PrimitivesError::InvalidSignature(
                "malformed signature: no header magic".to_string(),
            ));
        }

        let sig_len = bytes[1] as usize;
        if sig_len + 2 > bytes.len() || sig_len + 2 < 8 {
            return Err(PrimitivesError::InvalidSignature(
                "malformed signature: bad length".to_string(),
            ));
        }

        let data = &bytes[..sig_len + 2];
        let mut idx = 2;

        // Parse R
        if data[idx] != 0x02 {
            return Err(PrimitivesError::InvalidSignature(
                "malformed signature: no 1st int marker".to_string(),
            ));
        }
        idx += 1;
        let r_len = data[idx] as usize;
        idx += 1;
        if r_len == 0 || idx + r_len > data.len() - 3 {
            return Err(PrimitivesError::InvalidSignature(
                "malformed signature: bogus R length".to_string(),
            ));
        }
        let r_bytes = &data[idx..idx + r_len];
        idx += r_len;

        // Parse S
        if data[idx] != 0x02 {
            return Err(PrimitivesError::InvalidSignature(
                "malformed signature: no 2nd int marker".to_string(),
            ));
        }
        idx += 1;
        let s_len = data[idx] as usize;
        idx += 1;
        if s_len == 0 || idx + s_len > data.len() {
            return Err(PrimitivesError::InvalidSignature(
                "malformed signature: bogus S length".to_string(),
            ));
        }
        let s_bytes = &data[idx..idx + s_len];

        let r = to_32_bytes(r_bytes)?;
        let s = to_32_bytes(s_bytes)?;

        if is_zero(&r) {
            return Err(PrimitivesError::InvalidSignature(
                "signature R is zero".to_string(),
            ));
        }
        if is_zero(&s) {
            return Err(PrimitivesError::InvalidSignature(
                "signature S is zero".to_string(),
            ));
        }
        if !is_less_than(&r, &CURVE_ORDER) {
            return Err(PrimitivesError::InvalidSignature(
                "signature R is >= curve.N".to_string(),
            ));
        }
        if !is_less_than(&s, &CURVE_ORDER) {
            return Err(PrimitivesError::InvalidSignature(
                "signature S is >= curve.N".to_string(),
            ));
        }

        Ok(Signature { r, s })
    }

    /// Serialize the signature in DER format with low-S normalization.
    ///
    /// Output format: 0x30 <len> 0x02 <r_len> <r_bytes> 0x02 <s_len> <s_bytes>
    /// The S value is normalized to the lower half of the curve order per
    /// BIP-0062 (a no-op for signatures produced by this crate).
    ///
    /// # Returns
    /// A byte vector containing the DER-encoded signature.
    pub fn to_der(&self) -> Vec<u8> {
        let s = if is_greater_than(&self.s, &HALF_ORDER) {
            subtract_from_order(&self.s)
        } else {
            self.s
        };

        let rb = canonicalize_int(&self.r);
        let sb = canonicalize_int(&s);

        let total_len = 6 + rb.len() + sb.len();
        let mut out = Vec::with_capacity(total_len);
        out.push(0x30);
        out.push((total_len - 2) as u8);
        out.push(0x02);
        out.push(rb.len() as u8);
        out.extend_from_slice(&rb);
        out.push(0x02);
        out.push(sb.len() as u8);
        out.extend_from_slice(&sb);
        out
    }

    /// Serialize the signature as a lowercase DER hex string.
    ///
    /// # Returns
    /// The DER bytes hex-encoded, without any trailing sighash byte.
    pub fn to_der_hex(&self) -> String {
        hex::encode(self.to_der())
    }

    /// Verify this signature against a 32-byte digest and public key.
    ///
    /// # Arguments
    /// * `digest` - The message digest that was signed.
    /// * `pub_key` - The public key to verify against.
    ///
    /// # Returns
    /// `true` if the signature is valid, `false` otherwise.
    pub fn verify(&self, digest: &[u8; 32], pub_key: &PublicKey) -> bool {
        let k256_sig = match ecdsa::Signature::from_scalars(
            k256::FieldBytes::from(self.r),
            k256::FieldBytes::from(self.s),
        ) {
            Ok(sig) => sig,
            Err(_) => return false,
        };

        pub_key
            .verifying_key()
            .verify_prehash(digest, &k256_sig)
            .is_ok()
    }
}

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.r == other.r && self.s == other.s
    }
}

impl Eq for Signature {}

/// Canonicalize an integer for DER encoding.
///
/// Strips leading zeros from the big-endian representation and adds
/// a 0x00 padding byte if the high bit is set (to prevent interpretation
/// as a negative number).
///
/// # Arguments
/// * `val` - A 32-byte big-endian integer.
///
/// # Returns
/// A byte vector suitable for DER integer encoding.
fn canonicalize_int(val: &[u8; 32]) -> Vec<u8> {
    let mut start = 0;
    while start < 31 && val[start] == 0 {
        start += 1;
    }
    let trimmed = &val[start..];

    if trimmed[0] & 0x80 != 0 {
        let mut out = Vec::with_capacity(trimmed.len() + 1);
        out.push(0x00);
        out.extend_from_slice(trimmed);
        out
    } else {
        trimmed.to_vec()
    }
}

/// Convert a variable-length big-endian byte slice to a fixed 32-byte array.
///
/// Strips any leading zero-padding and left-pads to 32 bytes.
///
/// # Arguments
/// * `bytes` - Variable-length big-endian integer bytes.
///
/// # Returns
/// `Ok([u8; 32])` or an error if the value exceeds 32 bytes after trimming.
fn to_32_bytes(bytes: &[u8]) -> Result<[u8; 32], PrimitivesError> {
    let mut trimmed = bytes;
    while trimmed.len() > 1 && trimmed[0] == 0 {
        trimmed = &trimmed[1..];
    }
    if trimmed.len() > 32 {
        return Err(PrimitivesError::InvalidSignature(
            "integer value too large for 32 bytes".to_string(),
        ));
    }
    let mut out = [0u8; 32];
    out[32 - trimmed.len()..].copy_from_slice(trimmed);
    Ok(out)
}

/// Check if a 32-byte big-endian integer is zero.
fn is_zero(val: &[u8; 32]) -> bool {
    val.iter().all(|&b| b == 0)
}

/// Compare two 32-byte big-endian integers: a < b.
fn is_less_than(a: &[u8; 32], b: &[u8; 32]) -> bool {
    for i in 0..32 {
        if a[i] < b[i] {
            return true;
        }
        if a[i] > b[i] {
            return false;
        }
    }
    false // equal
}

/// Compare two 32-byte big-endian integers: a > b.
fn is_greater_than(a: &[u8; 32], b: &[u8; 32]) -> bool {
    for i in 0..32 {
        if a[i] > b[i] {
            return true;
        }
        if a[i] < b[i] {
            return false;
        }
    }
    false // equal
}

/// Compute N - val where N is the secp256k1 curve order.
///
/// Used for low-S normalization.
fn subtract_from_order(val: &[u8; 32]) -> [u8; 32] {
    let mut result = [0u8; 32];
    let mut borrow: i32 = 0;
    for i in (0..32).rev() {
        let diff = CURVE_ORDER[i] as i32 - val[i] as i32 - borrow;
        if diff < 0 {
            result[i] = (diff + 256) as u8;
            borrow = 1;
        } else {
            result[i] = diff as u8;
            borrow = 0;
        }
    }
    result
}
