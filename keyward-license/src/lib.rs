//! License activation and installation tracking for keyward.
//!
//! This crate handles:
//! - Binding instances (machines, sites, installs) to license keys under a
//!   per-license activation quota
//! - Releasing, validating and reassigning those bindings
//! - Recording product installation heartbeats
//! - Issuing and re-keying license rows
//!
//! # Design Principles
//!
//! - **Hash for lookup, ciphertext for display**: plaintext keys are never
//!   stored; every lookup goes through the provider's deterministic hash
//! - **One transaction per mutation**: the activation counter and the
//!   instance rows change together or not at all
//! - **Quota is compare-and-set**: concurrent activations of one license
//!   cannot overshoot `times_activated_max`
//!
//! # Example
//!
//! ```no_run
//! use keyward_license::{Licensing, LicensingConfig, NewLicense};
//!
//! let config = LicensingConfig::load("keyward.toml")?.apply_env_overrides();
//! let licensing = Licensing::from_config(&config)?;
//!
//! licensing.issuer().issue(&NewLicense::active("KEY-123", 2))?;
//! let activation = licensing.activations().activate("KEY-123", "host-a")?;
//! assert_eq!(activation.license.times_activated, 1);
//! # Ok::<(), keyward_license::LicenseError>(())
//! ```

mod activation;
mod config;
mod context;
mod duplicate;
mod error;
mod input;
mod issuer;
mod tracker;

use std::sync::Arc;

pub use activation::{Activation, ActivationManager, InstanceFilter, InstanceView};
pub use config::{
    CryptoConfig, ENV_DATABASE_PATH, ENV_ENCRYPTION_KEY, ENV_HASH_SECRET, ENV_PASSPHRASE,
    LicensingConfig, TrackerConfig,
};
pub use context::LicenseContext;
pub use duplicate::DuplicateDetector;
pub use error::{LicenseError, LicenseResult};
pub use input::MAX_KEY_LEN;
pub use issuer::{LicenseIssuer, NewLicense};
pub use tracker::InstallationTracker;

/// All components wired to one context.
#[derive(Debug, Clone)]
pub struct Licensing {
    activations: ActivationManager,
    detector: DuplicateDetector,
    issuer: LicenseIssuer,
    tracker: InstallationTracker,
}

impl Licensing {
    pub fn new(ctx: LicenseContext) -> Self {
        Self {
            activations: ActivationManager::new(ctx.clone()),
            detector: DuplicateDetector::new(ctx.clone()),
            issuer: LicenseIssuer::new(ctx.clone()),
            tracker: InstallationTracker::new(ctx),
        }
    }

    /// Opens the database and builds the crypto provider described by `config`.
    pub fn from_config(config: &LicensingConfig) -> LicenseResult<Self> {
        let crypto = config.build_crypto()?;
        let db = config.open_db()?;
        let mut licensing = Self::new(LicenseContext::new(db, Arc::new(crypto)));
        licensing.tracker = licensing
            .tracker
            .require_known_license(config.tracker.require_known_license);
        Ok(licensing)
    }

    pub fn activations(&self) -> &ActivationManager {
        &self.activations
    }

    pub fn duplicates(&self) -> &DuplicateDetector {
        &self.detector
    }

    pub fn issuer(&self) -> &LicenseIssuer {
        &self.issuer
    }

    pub fn tracker(&self) -> &InstallationTracker {
        &self.tracker
    }
}
