//! Sweep preparation: spend an entire address balance elsewhere.
//!
//! Decodes the address's WIF private key against the target network,
//! parks the key in the key store for the signing call that follows,
//! and returns only the public key and destination for transmission to
//! the wallet service. The private key itself never leaves the engine.

use log::debug;

use signer_primitives::ec::PrivateKey;
use signer_script::network;

use crate::intent::SweepRequest;
use crate::keystore::KeyStore;
use crate::EngineError;

/// Prepare a sweep of one address's entire balance.
///
/// The returned fields are what the wallet service needs to assemble the
/// sweep intent; the imported key stays local and is consumed (and then
/// purged) by the subsequent `create_and_sign` call.
///
/// # Arguments
/// * `store` - The key store the sweep key is parked in.
/// * `private_key_wif` - WIF private key of the address being swept.
/// * `to_address` - Destination address for the balance.
/// * `network_symbol` - The target network, e.g. "DOGETEST".
///
/// # Returns
/// The request fields, or `MissingPrivateKey` / `MissingDestination` /
/// `InvalidWif` / `UnknownNetwork`.
pub fn prepare_sweep(
    store: &mut KeyStore,
    private_key_wif: &str,
    to_address: &str,
    network_symbol: &str,
) -> Result<SweepRequest, EngineError> {
    if private_key_wif.is_empty() {
        return Err(EngineError::MissingPrivateKey);
    }
    if to_address.is_empty() {
        return Err(EngineError::MissingDestination);
    }

    let params = network::params_for(network_symbol)?;
    let key = PrivateKey::from_wif(private_key_wif, params.wif)
        .map_err(|e| EngineError::InvalidWif(e.to_string()))?;

    let public_key = store.insert(key);
    debug!("prepared sweep from key {} on {}", public_key, network_symbol);

    Ok(SweepRequest {
        public_key,
        to_address: to_address.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE_PRIV: &str =
        "6b0e34587dece0ef042c4c7205ce6b3d4a64d0bc484735b9325f7971a0ead963";
    const FIXTURE_PUB: &str =
        "029c06f988dc6b44696e002e8abf496a13c73c2f1db3bde2dfb69be129f3711b01";

    fn wif_for(network_symbol: &str) -> String {
        let params = network::params_for(network_symbol).unwrap();
        PrivateKey::from_hex(FIXTURE_PRIV).unwrap().to_wif(params.wif)
    }

    #[test]
    fn test_prepare_sweep_parks_key_and_returns_pubkey() {
        let mut store = KeyStore::new(true);
        let request = prepare_sweep(
            &mut store,
            &wif_for("DOGETEST"),
            "nZ7QHcpJ5tpzxQUV8vEnGU4m7zLjkNiMBU",
            "DOGETEST",
        )
        .unwrap();

        assert_eq!(request.public_key, FIXTURE_PUB);
        assert_eq!(request.to_address, "nZ7QHcpJ5tpzxQUV8vEnGU4m7zLjkNiMBU");
        assert!(store.contains(FIXTURE_PUB));
    }

    #[test]
    fn test_missing_arguments() {
        let mut store = KeyStore::new(true);
        assert!(matches!(
            prepare_sweep(&mut store, "", "dest", "BTC"),
            Err(EngineError::MissingPrivateKey)
        ));
        assert!(matches!(
            prepare_sweep(&mut store, &wif_for("BTC"), "", "BTC"),
            Err(EngineError::MissingDestination)
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_wrong_network_wif() {
        let mut store = KeyStore::new(true);
        // A BTC mainnet WIF decoded against DOGETEST's version byte.
        assert!(matches!(
            prepare_sweep(&mut store, &wif_for("BTC"), "dest", "DOGETEST"),
            Err(EngineError::InvalidWif(_))
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_unknown_network() {
        let mut store = KeyStore::new(true);
        assert!(matches!(
            prepare_sweep(&mut store, &wif_for("BTC"), "dest", "XMR"),
            Err(EngineError::Script(_))
        ));
    }
}
