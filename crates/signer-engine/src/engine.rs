//! The signing engine facade.
//!
//! Owns the key store behind a mutex so concurrent callers sharing one
//! engine cannot interleave key material, and enforces the purge
//! discipline: every signing operation runs against a guard that clears
//! the store on all exit paths.

use std::sync::{Mutex, PoisonError};

use crate::builder;
use crate::intent::{SigningResult, SweepRequest, TransactionIntent, TransactionSummary};
use crate::keystore::{KeyStore, PurgeGuard};
use crate::summary;
use crate::sweep;
use crate::EngineError;

/// Engine configuration.
#[derive(Clone, Debug)]
pub struct EngineOptions {
    /// Whether signatures are ground to the low-R convention. Leave
    /// enabled unless a cooperating peer predates the convention.
    pub low_r: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions { low_r: true }
    }
}

/// The transaction construction and signing engine.
///
/// One engine serializes its signing operations: the key store is locked
/// for the whole of each `create_and_sign` call and purged when the call
/// ends, so no key material survives between operations. Use one engine
/// per in-flight call for parallelism.
pub struct SigningEngine {
    /// PIN configured at construction, used when a call supplies none.
    pin: Option<String>,

    /// The call-scoped key store, serialized by the mutex.
    keys: Mutex<KeyStore>,
}

impl SigningEngine {
    /// Create an engine with the given options and no configured PIN.
    ///
    /// # Arguments
    /// * `options` - Engine configuration.
    ///
    /// # Returns
    /// A new `SigningEngine`.
    pub fn new(options: EngineOptions) -> Self {
        SigningEngine {
            pin: None,
            keys: Mutex::new(KeyStore::new(options.low_r)),
        }
    }

    /// Create an engine with a configured PIN.
    ///
    /// The PIN is used to decrypt user keys when a signing call does not
    /// supply one of its own.
    ///
    /// # Arguments
    /// * `pin` - The user's secret PIN.
    /// * `options` - Engine configuration.
    ///
    /// # Returns
    /// A new `SigningEngine`.
    pub fn with_pin(pin: impl Into<String>, options: EngineOptions) -> Self {
        SigningEngine {
            pin: Some(pin.into()),
            keys: Mutex::new(KeyStore::new(options.low_r)),
        }
    }

    /// Build, verify, and sign a transaction intent.
    ///
    /// See the builder module for the algorithm. The key store is purged
    /// unconditionally when this returns, whether with a result or an
    /// error.
    ///
    /// # Arguments
    /// * `intent` - The server-supplied transaction intent.
    /// * `explicit_keys` - Raw hex private keys to sign with.
    /// * `pin` - Optional PIN; falls back to the configured PIN.
    ///
    /// # Returns
    /// The signing result, or the first error encountered.
    pub fn create_and_sign(
        &self,
        intent: &TransactionIntent,
        explicit_keys: &[String],
        pin: Option<&str>,
    ) -> Result<SigningResult, EngineError> {
        let mut store = self.lock_keys();
        let mut guard = PurgeGuard::new(&mut store);
        let pin = pin.or(self.pin.as_deref());
        builder::create_and_sign(&mut guard, intent, explicit_keys, pin)
    }

    /// Summarize an intent's money flows for user review.
    ///
    /// Pure: no keys are touched and nothing is signed.
    ///
    /// # Arguments
    /// * `intent` - The prepared transaction intent.
    ///
    /// # Returns
    /// The fee/total summary.
    pub fn summarize(
        &self,
        intent: &TransactionIntent,
    ) -> Result<TransactionSummary, EngineError> {
        summary::summarize(intent)
    }

    /// Prepare a sweep, parking the swept key for the signing call that
    /// follows.
    ///
    /// The parked key is consumed and purged by the next
    /// `create_and_sign` call on this engine.
    ///
    /// # Arguments
    /// * `private_key_wif` - WIF private key of the address being swept.
    /// * `to_address` - Destination address for the balance.
    /// * `network_symbol` - The target network symbol.
    ///
    /// # Returns
    /// The fields to send to the wallet service.
    pub fn prepare_sweep(
        &self,
        private_key_wif: &str,
        to_address: &str,
        network_symbol: &str,
    ) -> Result<SweepRequest, EngineError> {
        let mut store = self.lock_keys();
        sweep::prepare_sweep(&mut store, private_key_wif, to_address, network_symbol)
    }

    /// Number of keys currently held.
    ///
    /// Zero except between a sweep preparation and its signing call;
    /// exposed so callers and tests can assert the purge discipline.
    ///
    /// # Returns
    /// The key count.
    pub fn key_count(&self) -> usize {
        self.lock_keys().len()
    }

    /// Lock the key store, recovering from a poisoned mutex.
    ///
    /// A panic mid-signing leaves only droppable key material behind;
    /// the next operation's purge guard clears it.
    fn lock_keys(&self) -> std::sync::MutexGuard<'_, KeyStore> {
        self.keys.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SigningEngine {
    fn default() -> Self {
        Self::new(EngineOptions::default())
    }
}
