//! Shared fixtures for license tests.

#![allow(dead_code)]

use keyward_crypto::{CryptoProvider, KeyedCryptoProvider, PassthroughProvider};
use keyward_license::{
    ActivationManager, InstallationTracker, LicenseContext, LicenseIssuer, Licensing, NewLicense,
};
use keyward_storage::LicenseDb;
use keyward_types::{License, LicenseStatus, ManualClock, Timestamp};
use std::sync::Arc;

pub const T0: Timestamp = Timestamp::from_millis(1_700_000_000_000);

/// In-memory database, passthrough crypto and a manual clock.
pub struct Fixture {
    pub ctx: LicenseContext,
    pub clock: Arc<ManualClock>,
    pub licensing: Licensing,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_crypto(Arc::new(PassthroughProvider))
    }

    /// Uses real HMAC hashing and ChaCha20-Poly1305 with throwaway keys.
    pub fn keyed() -> Self {
        Self::with_crypto(Arc::new(KeyedCryptoProvider::ephemeral()))
    }

    pub fn with_crypto(crypto: Arc<dyn CryptoProvider>) -> Self {
        let db = LicenseDb::open_in_memory().unwrap();
        Self::with_db(db, crypto)
    }

    pub fn with_db(db: LicenseDb, crypto: Arc<dyn CryptoProvider>) -> Self {
        let clock = Arc::new(ManualClock::starting_at(T0));
        let ctx = LicenseContext::new(db, crypto).with_clock(clock.clone());
        Self {
            licensing: Licensing::new(ctx.clone()),
            ctx,
            clock,
        }
    }

    pub fn activations(&self) -> &ActivationManager {
        self.licensing.activations()
    }

    pub fn issuer(&self) -> &LicenseIssuer {
        self.licensing.issuer()
    }

    pub fn tracker(&self) -> &InstallationTracker {
        self.licensing.tracker()
    }

    /// Issues an active license with the given quota.
    pub fn license(&self, key: &str, max: Option<u32>) -> License {
        self.issuer()
            .issue(&NewLicense {
                key: key.to_string(),
                times_activated_max: max,
                status: LicenseStatus::Active,
                ..NewLicense::default()
            })
            .unwrap()
    }

    /// Current state of the license with `key`.
    pub fn reload(&self, key: &str) -> License {
        self.activations().license(key).unwrap()
    }
}
