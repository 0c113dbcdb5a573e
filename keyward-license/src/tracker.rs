//! Product installation heartbeats.

use crate::context::LicenseContext;
use crate::error::{LicenseError, LicenseResult};
use crate::input;
use keyward_storage::{InstalledOnStore, LicenseStore};
use keyward_types::{InstalledOnId, LicenseId, ProductInstalledOn};
use tracing::{debug, info};

/// Records "still installed" pings, one row per `(product, license, host)`.
#[derive(Debug, Clone)]
pub struct InstallationTracker {
    ctx: LicenseContext,
    require_known_license: bool,
}

impl InstallationTracker {
    pub fn new(ctx: LicenseContext) -> Self {
        Self {
            ctx,
            require_known_license: true,
        }
    }

    /// When false, a ping carrying an unknown license key is recorded without
    /// a license instead of failing.
    #[must_use]
    pub fn require_known_license(mut self, required: bool) -> Self {
        self.require_known_license = required;
        self
    }

    /// Upserts the row for the triple and sets `last_ping` to now.
    ///
    /// Repeated pings with the same triple never add rows.
    pub fn ping(
        &self,
        product_name: &str,
        license_id: Option<LicenseId>,
        host: &str,
    ) -> LicenseResult<ProductInstalledOn> {
        let product_name = input::plaintext("product_name", product_name)?;
        let host = input::plaintext("host", host)?;
        let now = self.ctx.clock.now();

        let row = self.ctx.db.transaction(|tx| {
            InstalledOnStore::new(tx)
                .upsert(product_name, license_id, host, now)
                .map_err(|e| {
                    if e.is_conflict() {
                        LicenseError::LicenseNotFound
                    } else {
                        e.into()
                    }
                })
        })?;

        debug!(
            installation_id = %row.id,
            product = %row.product_name,
            host = %row.host,
            "ping recorded"
        );
        Ok(row)
    }

    /// Like [`ping`](Self::ping), resolving an optional plaintext license key first.
    pub fn ping_with_key(
        &self,
        product_name: &str,
        license_key: Option<&str>,
        host: &str,
    ) -> LicenseResult<ProductInstalledOn> {
        let license_id = match license_key {
            Some(key) => self.resolve(key)?,
            None => None,
        };
        self.ping(product_name, license_id, host)
    }

    /// Lists heartbeat rows ordered by id.
    pub fn list(&self, limit: Option<u32>, offset: u32) -> LicenseResult<Vec<ProductInstalledOn>> {
        self.ctx
            .db
            .read(|conn| Ok(InstalledOnStore::new(conn).list(limit, offset)?))
    }

    pub fn count(&self) -> LicenseResult<u64> {
        self.ctx
            .db
            .read(|conn| Ok(InstalledOnStore::new(conn).count()?))
    }

    /// Deletes rows by id. Missing ids are skipped; returns how many were removed.
    pub fn delete(&self, ids: &[InstalledOnId]) -> LicenseResult<usize> {
        let removed = self.ctx.db.transaction(|tx| {
            let store = InstalledOnStore::new(tx);
            let mut removed = 0;
            for &id in ids {
                if store.delete(id)? {
                    removed += 1;
                }
            }
            Ok::<_, LicenseError>(removed)
        })?;

        info!(requested = ids.len(), removed, "installations deleted");
        Ok(removed)
    }

    fn resolve(&self, license_key: &str) -> LicenseResult<Option<LicenseId>> {
        let license_key = input::plaintext("license_key", license_key)?;
        let hash = self.ctx.crypto.hash(license_key);
        let found = self.ctx.db.read(|conn| {
            Ok::<_, LicenseError>(LicenseStore::new(conn).find_by_hash(&hash)?.map(|l| l.id))
        })?;

        match found {
            Some(id) => Ok(Some(id)),
            None if self.require_known_license => Err(LicenseError::LicenseNotFound),
            None => {
                debug!(
                    license = input::fingerprint(&hash),
                    "ping with unknown license recorded without license"
                );
                Ok(None)
            }
        }
    }
}
