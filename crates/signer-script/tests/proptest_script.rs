use proptest::prelude::*;

use signer_script::address::{
    base58check_decode, base58check_encode, from_output_script, to_output_script,
};
use signer_script::network::params_for;
use signer_script::Script;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn base58check_roundtrip(version in any::<u8>(), payload in prop::array::uniform20(any::<u8>())) {
        let encoded = base58check_encode(version, &payload);
        let (v, p) = base58check_decode(&encoded).unwrap();
        prop_assert_eq!(v, version);
        prop_assert_eq!(p, payload.to_vec());
    }

    #[test]
    fn p2pkh_address_script_roundtrip(payload in prop::array::uniform20(any::<u8>())) {
        let params = params_for("BTC").unwrap();
        let addr = signer_script::address::p2pkh_address(&payload, params);
        let script = to_output_script(&addr, params).unwrap();
        prop_assert!(script.is_p2pkh());
        prop_assert_eq!(from_output_script(&script, params).unwrap(), addr);
    }

    #[test]
    fn segwit_v0_address_script_roundtrip(payload in prop::array::uniform20(any::<u8>())) {
        let params = params_for("LTC").unwrap();
        let addr = signer_script::address::segwit_address(params, 0, &payload).unwrap();
        let script = to_output_script(&addr, params).unwrap();
        prop_assert!(script.is_witness_v0());
        prop_assert_eq!(from_output_script(&script, params).unwrap(), addr);
    }

    #[test]
    fn push_data_is_length_prefixed(data in prop::collection::vec(any::<u8>(), 0..512)) {
        let mut script = Script::new();
        script.append_push_data(&data).unwrap();
        let bytes = script.to_bytes();
        // The push must end with the data itself.
        prop_assert!(bytes.ends_with(&data));
        prop_assert!(bytes.len() > data.len());
    }
}
