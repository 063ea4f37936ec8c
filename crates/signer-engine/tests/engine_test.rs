//! End-to-end tests for the signing engine.
//!
//! The expected transaction hexes, digests, and signatures were produced
//! with an independent implementation of the same wire formats and the
//! deterministic low-R signing convention, so these tests pin
//! cross-implementation byte compatibility, not just self-consistency.

use signer_engine::{
    passphrase, AddressMetadata, EngineError, EngineOptions, InputDescriptor, InputSignature,
    OutputCategory, OutputDescriptor, SigningEngine, TransactionIntent, UserKey,
};
use signer_primitives::ec::PrivateKey;
use signer_script::network::params_for;
use signer_script::spend::{parse_address_type, resolve_spend_info};
use signer_transaction::Transaction;

/// A deterministic previous-output txid (any 32-byte hex works).
const PREV_TXID: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Key recorded from the cooperating implementation's test suite.
const FIXTURE_PRIV: &str = "6b0e34587dece0ef042c4c7205ce6b3d4a64d0bc484735b9325f7971a0ead963";
const FIXTURE_PUB: &str = "029c06f988dc6b44696e002e8abf496a13c73c2f1db3bde2dfb69be129f3711b01";

fn passphrase_key(name: &str) -> PrivateKey {
    PrivateKey::from_passphrase(name.as_bytes()).unwrap()
}

fn passphrase_pub(name: &str) -> String {
    passphrase_key(name).pub_key().to_hex()
}

fn metadata(
    network: &str,
    type_tag: &str,
    public_keys: &[String],
    required: usize,
) -> AddressMetadata {
    let params = params_for(network).unwrap();
    let address_type = parse_address_type(type_tag).unwrap();
    let spend = resolve_spend_info(address_type, public_keys, required, params).unwrap();
    AddressMetadata {
        address: spend.address,
        address_type,
        public_keys: public_keys.to_vec(),
        required_signatures: required,
    }
}

fn intent_for(
    network: &str,
    meta: AddressMetadata,
    prev_vout: u32,
    input_value: &str,
    output_address: &str,
    output_value: &str,
) -> TransactionIntent {
    TransactionIntent {
        network: network.to_string(),
        inputs: vec![InputDescriptor {
            previous_txid: PREV_TXID.to_string(),
            previous_output_index: prev_vout,
            input_index: 0,
            spending_address: meta.address.clone(),
            input_value: input_value.to_string(),
        }],
        outputs: vec![OutputDescriptor {
            receiving_address: output_address.to_string(),
            output_value: output_value.to_string(),
            output_category: OutputCategory::UserSpecified,
        }],
        input_address_data: vec![meta],
        expected_unsigned_txid: None,
        user_key: None,
        tx_type: Some("withdrawal".to_string()),
    }
}

/// P2PKH address of the `key1` passphrase key on BTCTEST, used as the
/// destination in the BTCTEST fixtures.
const DEST_BTCTEST: &str = "mkSCKQDifXuFKYCK65a9JDXBryprHrVqCq";

// -----------------------------------------------------------------------
// Full signing
// -----------------------------------------------------------------------

#[test]
fn full_sign_p2wpkh_matches_fixture() {
    let meta = metadata("BTCTEST", "P2WPKH", &[FIXTURE_PUB.to_string()], 1);
    assert_eq!(meta.address, "tb1qx36s96mew8cgmyrshq62z6axjmuyutctaw8z2k");

    let intent = intent_for("BTCTEST", meta, 1, "0.00100000", DEST_BTCTEST, "0.00090000");

    let engine = SigningEngine::default();
    let result = engine
        .create_and_sign(&intent, &[FIXTURE_PRIV.to_string()], None)
        .unwrap();

    assert!(result.signatures.is_none());
    assert_eq!(result.tx_type.as_deref(), Some("withdrawal"));
    assert_eq!(
        result.tx_hex,
        "0100000000010155b852781b9995a44c939b64e441ae2724b96f99c8f4fb9a141cfc9842c4b0e3\
         0100000000ffffffff01905f0100000000001976a91435f2414edff9b16377102fb175dddf37b8\
         9f2d4088ac02473044022064940729eecac39b4ed9d2d5f942f23ace3b5ad92779387977e84e60\
         ef06c95a022079cbf3a7db6324fe6318dc47e8c907a89d2453b9fb41dd6f9f95fb1d94253a3301\
         21029c06f988dc6b44696e002e8abf496a13c73c2f1db3bde2dfb69be129f3711b0100000000"
    );

    // Witness data does not change the txid; the finalized transaction
    // still carries the unsigned ID.
    let parsed = Transaction::from_hex(&result.tx_hex).unwrap();
    assert_eq!(
        parsed.tx_id_hex(),
        "046e8289ea037cc1fc5ccd5e0d65a79180b9dc6e62932064b75f60dde986bc1f"
    );
    assert_eq!(parsed.inputs[0].witness.len(), 2);
    assert!(parsed.inputs[0].script_sig.is_none());

    assert_eq!(engine.key_count(), 0);
}

#[test]
fn full_sign_p2pkh_matches_fixture() {
    let meta = metadata("DOGETEST", "P2PKH", &[FIXTURE_PUB.to_string()], 1);
    assert_eq!(meta.address, "nYyXaLkcDLPnxDdFQmTXf8Dao3aYH4Weot");

    // Destination: the key1 passphrase address on DOGETEST.
    let intent = intent_for(
        "DOGETEST",
        meta,
        2,
        "0.00050000",
        "nZ7QHcpJ5tpzxQUV8vEnGU4m7zLjkNiMBU",
        "0.00040000",
    );

    let engine = SigningEngine::default();
    let result = engine
        .create_and_sign(&intent, &[FIXTURE_PRIV.to_string()], None)
        .unwrap();

    assert!(result.signatures.is_none());
    assert_eq!(
        result.tx_hex,
        "010000000155b852781b9995a44c939b64e441ae2724b96f99c8f4fb9a141cfc9842c4b0e30200\
         00006a47304402205bde6939fc794e8fb51126d07b6f4fad8f3232bfa613ebffc5a44e4d0df566\
         b1022040aa4b8ef2c5cb351c6eefb3252e5e28c585ecc3d1d4d06ab0d5cef1d298658d0121029c\
         06f988dc6b44696e002e8abf496a13c73c2f1db3bde2dfb69be129f3711b01ffffffff01409c00\
         00000000001976a91435f2414edff9b16377102fb175dddf37b89f2d4088ac00000000"
    );
    assert_eq!(engine.key_count(), 0);
}

#[test]
fn full_sign_2of2_nested_p2wsh_matches_fixture() {
    let keys = [passphrase_pub("key1"), passphrase_pub("key2")];
    let meta = metadata("BTCTEST", "P2WSH-over-P2SH", &keys, 2);
    assert_eq!(meta.address, "2Mzvay99fwNaWL1VnwBymhKiK96xYY6uaKw");

    let intent = intent_for("BTCTEST", meta, 3, "0.00300000", DEST_BTCTEST, "0.00290000");

    let engine = SigningEngine::default();
    let explicit = vec![
        passphrase_key("key1").to_hex(),
        passphrase_key("key2").to_hex(),
    ];
    let result = engine.create_and_sign(&intent, &explicit, None).unwrap();

    assert!(result.signatures.is_none());
    assert_eq!(
        result.tx_hex,
        "0100000000010155b852781b9995a44c939b64e441ae2724b96f99c8f4fb9a141cfc9842c4b0e3\
         03000000232200200353ecb0c3c348ca4c5478574fb81332f5f0653714a997c8064aa204705e06\
         6fffffffff01d06c0400000000001976a91435f2414edff9b16377102fb175dddf37b89f2d4088\
         ac0400473044022028fe0f0ddfd508683a804c822a3175001814659ffd6a4fb1a537f2e90746e3\
         2e02207b83b9e0d27b3b65fab99eaba75fce762249d898f4e6ff9e3aa3b3bdda22911f01473044\
         022002fe1a37fb182cb0147827ae2a30a0dfff0e5d061736ec39cfb10f76e5a6590d02200c2a02\
         f94a7770f4450c073b47c3daca19bbbd2a938ecf6001624cf472b901a40147522103f771877964\
         fa2ce401d87bc2558a0df1e6921acef99389f059712b32cfda35fd2103f039fdcdb728efbbddf4\
         ee452419a988497debb7bd1b42644c5fa66e9af8c8b652ae00000000"
    );

    // Witness layout: dummy, sig, sig, witness script.
    let parsed = Transaction::from_hex(&result.tx_hex).unwrap();
    assert_eq!(parsed.inputs[0].witness.len(), 4);
    assert!(parsed.inputs[0].witness[0].is_empty());
    assert_eq!(engine.key_count(), 0);
}

// -----------------------------------------------------------------------
// Partial signing
// -----------------------------------------------------------------------

#[test]
fn partial_sign_3of5_returns_available_signatures() {
    let keys: Vec<String> = ["key1", "key2", "key3", "key4", "key5"]
        .iter()
        .map(|n| passphrase_pub(n))
        .collect();
    let meta = metadata("BTCTEST", "WITNESS_V0", &keys, 3);
    assert_eq!(
        meta.address,
        "tb1qq5xp52jjg39e4gwmc8yxvs75ltu78awu7msfcr2xqd5kd74nj6mqzuprvs"
    );

    let mut intent = intent_for("BTCTEST", meta, 0, "0.00250000", DEST_BTCTEST, "0.00240000");
    intent.expected_unsigned_txid =
        Some("57bcf30fb38744b596a969c177f799913af980b10e58dff01bc73a308351e3a9".to_string());

    // Only 2 of the 3 required signers are held locally.
    let engine = SigningEngine::default();
    let explicit = vec![
        passphrase_key("key1").to_hex(),
        passphrase_key("key3").to_hex(),
    ];
    let result = engine.create_and_sign(&intent, &explicit, None).unwrap();

    // The transaction comes back unsigned, with this party's signatures
    // alongside for the remaining signers to merge.
    assert_eq!(
        result.tx_hex,
        "010000000155b852781b9995a44c939b64e441ae2724b96f99c8f4fb9a141cfc9842c4b0e30000\
         000000ffffffff0180a90300000000001976a91435f2414edff9b16377102fb175dddf37b89f2d\
         4088ac00000000"
    );

    let signatures = result.signatures.unwrap();
    assert_eq!(
        signatures,
        vec![
            InputSignature {
                input_index: 0,
                public_key: passphrase_pub("key1"),
                signature: "304402205ee42f225fae61676321886bc527011e3ea89ac8d118f962b84b\
                            7f15a69795d802206a59f0b9051f9b2671803483071c80ce940ca57950ad\
                            08933faf4bc1e9110fa7"
                    .to_string(),
            },
            InputSignature {
                input_index: 0,
                public_key: passphrase_pub("key3"),
                signature: "304402202f0da2e151d8b509adbb5e199db28ffc03f7efc8121d1fd19e26\
                            8b90dbeff92e0220570f62e1e816fbd5f0b1077319fe55550472e9d8075b\
                            42f4b6c568565d3b7ea4"
                    .to_string(),
            },
        ]
    );
    assert_eq!(engine.key_count(), 0);
}

#[test]
fn partial_sign_rejects_single_key_templates() {
    // A P2PKH input whose key is not held cannot be partially signed.
    let meta = metadata("BTCTEST", "P2PKH", &[FIXTURE_PUB.to_string()], 1);
    let intent = intent_for("BTCTEST", meta, 0, "0.00100000", DEST_BTCTEST, "0.00090000");

    let engine = SigningEngine::default();
    let err = engine.create_and_sign(&intent, &[], None).unwrap_err();
    assert!(matches!(
        err,
        EngineError::PartialSigningUnsupported(tag) if tag == "P2PKH"
    ));
    assert_eq!(engine.key_count(), 0);
}

// -----------------------------------------------------------------------
// Unsigned txid verification
// -----------------------------------------------------------------------

#[test]
fn wrong_expected_txid_fails_before_signing() {
    let meta = metadata("BTCTEST", "P2WPKH", &[FIXTURE_PUB.to_string()], 1);
    let mut intent = intent_for("BTCTEST", meta, 1, "0.00100000", DEST_BTCTEST, "0.00090000");
    intent.expected_unsigned_txid = Some("00".repeat(32));

    let engine = SigningEngine::default();
    let err = engine
        .create_and_sign(&intent, &[FIXTURE_PRIV.to_string()], None)
        .unwrap_err();

    match err {
        EngineError::UnsignedTxidMismatch { expected, built } => {
            assert_eq!(expected, "00".repeat(32));
            assert_eq!(
                built,
                "046e8289ea037cc1fc5ccd5e0d65a79180b9dc6e62932064b75f60dde986bc1f"
            );
        }
        other => panic!("expected UnsignedTxidMismatch, got {:?}", other),
    }
    // Key material is purged even on the error path.
    assert_eq!(engine.key_count(), 0);
}

#[test]
fn correct_expected_txid_is_accepted() {
    let meta = metadata("BTCTEST", "P2WPKH", &[FIXTURE_PUB.to_string()], 1);
    let mut intent = intent_for("BTCTEST", meta, 1, "0.00100000", DEST_BTCTEST, "0.00090000");
    intent.expected_unsigned_txid =
        Some("046e8289ea037cc1fc5ccd5e0d65a79180b9dc6e62932064b75f60dde986bc1f".to_string());

    let engine = SigningEngine::default();
    assert!(engine
        .create_and_sign(&intent, &[FIXTURE_PRIV.to_string()], None)
        .is_ok());
}

// -----------------------------------------------------------------------
// Key handling
// -----------------------------------------------------------------------

#[test]
fn malformed_explicit_key_aborts() {
    let meta = metadata("BTCTEST", "P2WPKH", &[FIXTURE_PUB.to_string()], 1);
    let intent = intent_for("BTCTEST", meta, 1, "0.00100000", DEST_BTCTEST, "0.00090000");

    let engine = SigningEngine::default();
    // The second key is uppercase; the whole call aborts.
    let keys = vec![
        FIXTURE_PRIV.to_string(),
        FIXTURE_PRIV.to_uppercase(),
    ];
    let err = engine.create_and_sign(&intent, &keys, None).unwrap_err();
    assert!(matches!(err, EngineError::InvalidKeyFormat));
    assert_eq!(engine.key_count(), 0);
}

#[test]
fn user_key_requires_pin() {
    let meta = metadata("BTCTEST", "P2WPKH", &[FIXTURE_PUB.to_string()], 1);
    let mut intent = intent_for("BTCTEST", meta, 1, "0.00100000", DEST_BTCTEST, "0.00090000");
    intent.user_key = Some(UserKey {
        public_key: FIXTURE_PUB.to_string(),
        encrypted_passphrase: "AAAA".to_string(),
        algorithm: None,
    });

    let engine = SigningEngine::default();
    let err = engine.create_and_sign(&intent, &[], None).unwrap_err();
    assert!(matches!(err, EngineError::MissingPin));
}

#[test]
fn user_key_decrypts_and_signs_with_pin() {
    const PIN: &str = "123456";

    // Encrypt the passphrase whose derived key the intent spends from.
    let aes_key = passphrase::pin_to_aes_key(PIN, "", 2048, 16, 32);
    let encrypted = passphrase::encrypt_ecb(b"deadbeeffeedface", &aes_key).unwrap();

    let user_pub = passphrase_key_hex_pub();
    let meta = metadata("BTCTEST", "P2WPKH", &[user_pub.clone()], 1);
    let mut intent = intent_for("BTCTEST", meta, 4, "0.00070000", DEST_BTCTEST, "0.00060000");
    intent.user_key = Some(UserKey {
        public_key: user_pub.clone(),
        encrypted_passphrase: encrypted.clone(),
        algorithm: None,
    });

    // PIN configured on the engine, none passed per-call.
    let engine = SigningEngine::with_pin(PIN, EngineOptions::default());
    let result = engine.create_and_sign(&intent, &[], None).unwrap();
    assert!(result.signatures.is_none());
    assert_eq!(engine.key_count(), 0);

    // A descriptor declaring a different public key is a PIN mismatch.
    intent.user_key = Some(UserKey {
        public_key: FIXTURE_PUB.to_string(),
        encrypted_passphrase: encrypted,
        algorithm: None,
    });
    intent.input_address_data[0].public_keys = vec![FIXTURE_PUB.to_string()];
    let meta = metadata("BTCTEST", "P2WPKH", &[FIXTURE_PUB.to_string()], 1);
    intent.input_address_data[0].address = meta.address.clone();
    intent.inputs[0].spending_address = meta.address;
    let err = engine.create_and_sign(&intent, &[], None).unwrap_err();
    assert!(matches!(err, EngineError::PinMismatch));
    assert_eq!(engine.key_count(), 0);
}

/// The keypair derived from the hex passphrase "deadbeeffeedface".
fn passphrase_key_hex_pub() -> String {
    PrivateKey::from_passphrase_hex("deadbeeffeedface")
        .unwrap()
        .pub_key()
        .to_hex()
}

// -----------------------------------------------------------------------
// Intent validation
// -----------------------------------------------------------------------

#[test]
fn unknown_network_is_rejected() {
    let meta = metadata("BTCTEST", "P2WPKH", &[FIXTURE_PUB.to_string()], 1);
    let mut intent = intent_for("BTCTEST", meta, 1, "0.00100000", DEST_BTCTEST, "0.00090000");
    intent.network = "BCH".to_string();

    let engine = SigningEngine::default();
    let err = engine
        .create_and_sign(&intent, &[FIXTURE_PRIV.to_string()], None)
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Script(signer_script::ScriptError::UnknownNetwork(_))
    ));
}

#[test]
fn missing_address_metadata_is_fatal() {
    let meta = metadata("BTCTEST", "P2WPKH", &[FIXTURE_PUB.to_string()], 1);
    let mut intent = intent_for("BTCTEST", meta, 1, "0.00100000", DEST_BTCTEST, "0.00090000");
    intent.inputs[0].spending_address = "somewhere-else".to_string();

    let engine = SigningEngine::default();
    let err = engine
        .create_and_sign(&intent, &[FIXTURE_PRIV.to_string()], None)
        .unwrap_err();
    assert!(matches!(err, EngineError::MissingAddressData(addr) if addr == "somewhere-else"));
}

#[test]
fn malformed_input_value_is_rejected() {
    let meta = metadata("BTCTEST", "P2WPKH", &[FIXTURE_PUB.to_string()], 1);
    let mut intent = intent_for("BTCTEST", meta, 1, "0.00100000", DEST_BTCTEST, "0.00090000");
    intent.inputs[0].input_value = "0.001".to_string();

    let engine = SigningEngine::default();
    let err = engine
        .create_and_sign(&intent, &[FIXTURE_PRIV.to_string()], None)
        .unwrap_err();
    assert!(matches!(err, EngineError::MalformedAmount(_)));
}

// -----------------------------------------------------------------------
// Sweep flow
// -----------------------------------------------------------------------

#[test]
fn sweep_key_feeds_the_next_signing_call() {
    let engine = SigningEngine::default();
    let params = params_for("DOGETEST").unwrap();
    let wif = PrivateKey::from_hex(FIXTURE_PRIV).unwrap().to_wif(params.wif);

    let request = engine
        .prepare_sweep(&wif, "nZ7QHcpJ5tpzxQUV8vEnGU4m7zLjkNiMBU", "DOGETEST")
        .unwrap();
    assert_eq!(request.public_key, FIXTURE_PUB);
    assert_eq!(engine.key_count(), 1);

    // The parked key signs the sweep transaction with no explicit keys.
    let meta = metadata("DOGETEST", "P2PKH", &[FIXTURE_PUB.to_string()], 1);
    let intent = intent_for(
        "DOGETEST",
        meta,
        2,
        "0.00050000",
        &request.to_address,
        "0.00040000",
    );
    let result = engine.create_and_sign(&intent, &[], None).unwrap();
    assert!(result.signatures.is_none());

    // And is purged with everything else afterwards.
    assert_eq!(engine.key_count(), 0);
}

// -----------------------------------------------------------------------
// Address fixtures
// -----------------------------------------------------------------------

/// The signer addresses of the passphrase keys on DOGETEST, as recorded
/// by the cooperating implementation's distributed-trust test suite.
#[test]
fn passphrase_signer_addresses_match_fixtures() {
    let params = params_for("DOGETEST").unwrap();
    let cases = [
        ("key1", "nZ7QHcpJ5tpzxQUV8vEnGU4m7zLjkNiMBU"),
        ("key2", "nj8visBXviBNZs5zXkn6DYG6Nc97Nv995g"),
        ("key3", "nUknbqqhSXHATS7SMH7wqf9e9tJcEZb3HY"),
    ];
    for (name, expected) in cases {
        let pubkey_hash = passphrase_key(name).pub_key().to_hash160();
        let address = signer_script::address::p2pkh_address(&pubkey_hash, params);
        assert_eq!(address, expected, "address for {}", name);
    }
}
