//! Pre-flight uniqueness checks for create and update flows.

use crate::context::LicenseContext;
use crate::error::LicenseResult;
use crate::input;
use keyward_storage::{InstanceStore, LicenseStore};
use keyward_types::{InstanceId, LicenseId};

/// Answers "would this key collide?" without mutating anything, so callers
/// can reject cleanly instead of hitting a unique index.
#[derive(Debug, Clone)]
pub struct DuplicateDetector {
    ctx: LicenseContext,
}

impl DuplicateDetector {
    pub fn new(ctx: LicenseContext) -> Self {
        Self { ctx }
    }

    /// True if a license other than `exclude` has this key.
    pub fn is_duplicate_license_key(
        &self,
        license_key: &str,
        exclude: Option<LicenseId>,
    ) -> LicenseResult<bool> {
        let license_key = input::plaintext("license_key", license_key)?;
        let hash = self.ctx.crypto.hash(license_key);
        self.ctx
            .db
            .read(|conn| Ok(LicenseStore::new(conn).hash_exists(&hash, exclude)?))
    }

    /// True if an instance other than `exclude` binds this identifier to `license_id`.
    pub fn is_duplicate_instance(
        &self,
        instance_key: &str,
        license_id: LicenseId,
        exclude: Option<InstanceId>,
    ) -> LicenseResult<bool> {
        let instance_key = input::plaintext("instance_key", instance_key)?;
        let hash = self.ctx.crypto.hash(instance_key);
        self.ctx
            .db
            .read(|conn| Ok(InstanceStore::new(conn).hash_exists(license_id, &hash, exclude)?))
    }
}
