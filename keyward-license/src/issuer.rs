//! Creation and re-keying of license rows.

use crate::context::LicenseContext;
use crate::duplicate::DuplicateDetector;
use crate::error::{LicenseError, LicenseResult};
use crate::input;
use keyward_storage::{LicenseStore, NewLicenseRow};
use keyward_types::{License, LicenseId, LicenseStatus, Timestamp};
use tracing::info;

/// Parameters for a new license.
#[derive(Debug, Clone, Default)]
pub struct NewLicense {
    /// Plaintext key handed to the customer.
    pub key: String,
    pub times_activated_max: Option<u32>,
    pub product_id: Option<i64>,
    pub status: LicenseStatus,
    pub expires_at: Option<Timestamp>,
}

impl NewLicense {
    /// Active license with the given key and quota.
    pub fn active(key: impl Into<String>, times_activated_max: u32) -> Self {
        Self {
            key: key.into(),
            times_activated_max: Some(times_activated_max),
            status: LicenseStatus::Active,
            ..Self::default()
        }
    }
}

/// Writes licenses with both the hashed and the encrypted key.
#[derive(Debug, Clone)]
pub struct LicenseIssuer {
    ctx: LicenseContext,
    detector: DuplicateDetector,
}

impl LicenseIssuer {
    pub fn new(ctx: LicenseContext) -> Self {
        Self {
            detector: DuplicateDetector::new(ctx.clone()),
            ctx,
        }
    }

    /// Creates a license with `times_activated = 0`.
    ///
    /// # Errors
    ///
    /// `Validation` for an empty or duplicate key.
    pub fn issue(&self, new: &NewLicense) -> LicenseResult<License> {
        let key = input::plaintext("license_key", &new.key)?;
        if self.detector.is_duplicate_license_key(key, None)? {
            return Err(duplicate_key());
        }

        let row = NewLicenseRow {
            encrypted_key: self.ctx.crypto.encrypt(key)?,
            key_hash: self.ctx.crypto.hash(key),
            times_activated_max: new.times_activated_max,
            product_id: new.product_id,
            status: new.status,
            expires_at: new.expires_at,
        };
        let now = self.ctx.clock.now();

        let license = self.ctx.db.transaction(|tx| {
            LicenseStore::new(tx)
                .insert(&row, now, self.ctx.actor)
                .map_err(conflict_as_duplicate)
        })?;

        info!(
            license_id = %license.id,
            max = ?license.times_activated_max,
            status = %license.status,
            "license issued"
        );
        Ok(license)
    }

    /// Replaces the key of an existing license.
    pub fn update_key(&self, id: LicenseId, new_key: &str) -> LicenseResult<License> {
        let key = input::plaintext("license_key", new_key)?;
        if self.detector.is_duplicate_license_key(key, Some(id))? {
            return Err(duplicate_key());
        }

        let encrypted = self.ctx.crypto.encrypt(key)?;
        let hash = self.ctx.crypto.hash(key);
        let now = self.ctx.clock.now();

        let license = self.ctx.db.transaction(|tx| {
            let store = LicenseStore::new(tx);
            if !store
                .update_key(id, &encrypted, &hash, now, self.ctx.actor)
                .map_err(conflict_as_duplicate)?
            {
                return Err(LicenseError::LicenseNotFound);
            }
            Ok(store.get(id)?)
        })?;

        info!(license_id = %license.id, "license re-keyed");
        Ok(license)
    }

    /// Changes the lifecycle status of a license.
    pub fn set_status(&self, id: LicenseId, status: LicenseStatus) -> LicenseResult<License> {
        let now = self.ctx.clock.now();
        let license = self.ctx.db.transaction(|tx| {
            let store = LicenseStore::new(tx);
            if !store.update_status(id, status, now, self.ctx.actor)? {
                return Err(LicenseError::LicenseNotFound);
            }
            Ok(store.get(id)?)
        })?;

        info!(license_id = %license.id, status = %status, "license status changed");
        Ok(license)
    }
}

fn duplicate_key() -> LicenseError {
    LicenseError::Validation("duplicate license key".into())
}

fn conflict_as_duplicate(err: keyward_storage::StorageError) -> LicenseError {
    if err.is_conflict() {
        duplicate_key()
    } else {
        err.into()
    }
}
