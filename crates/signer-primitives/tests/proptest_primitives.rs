use proptest::prelude::*;

use signer_primitives::ec::{PrivateKey, Signature};
use signer_primitives::hash::sha256;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn private_key_serialization_roundtrip(seed in prop::array::uniform32(any::<u8>())) {
        // Not all 32-byte arrays are valid private keys (must be < curve order, nonzero).
        if let Ok(pk) = PrivateKey::from_bytes(&seed) {
            let pk2 = PrivateKey::from_bytes(&pk.to_bytes()).unwrap();
            prop_assert_eq!(pk.to_hex(), pk2.to_hex());

            let wif = pk.to_wif(0x80);
            let pk3 = PrivateKey::from_wif(&wif, 0x80).unwrap();
            prop_assert_eq!(pk.to_hex(), pk3.to_hex());
        }
    }

    #[test]
    fn ecdsa_sign_verify_roundtrip(
        seed in prop::array::uniform32(any::<u8>()),
        msg in prop::collection::vec(any::<u8>(), 0..256)
    ) {
        if let Ok(pk) = PrivateKey::from_bytes(&seed) {
            let hash = sha256(&msg);
            let sig = pk.sign(&hash).unwrap();
            prop_assert!(pk.pub_key().verify(&hash, &sig));
        }
    }

    #[test]
    fn low_r_signatures_verify_and_hold_predicate(
        seed in prop::array::uniform32(any::<u8>()),
        msg in prop::collection::vec(any::<u8>(), 0..64)
    ) {
        if let Ok(pk) = PrivateKey::from_bytes(&seed) {
            let hash = sha256(&msg);
            let sig = pk.sign_low_r(&hash).unwrap();
            prop_assert!(sig.has_low_r());
            prop_assert!(pk.pub_key().verify(&hash, &sig));
            // DER round-trip preserves the signature.
            let parsed = Signature::from_der(&sig.to_der()).unwrap();
            prop_assert_eq!(parsed, sig);
        }
    }
}
