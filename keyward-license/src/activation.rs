//! Activation and deactivation of license instances.
//!
//! The manager owns the activation-count invariant: for every license,
//! `times_activated` equals the number of instances bound to it and never
//! exceeds a set maximum. Every operation that touches both the counter and an
//! instance row runs in one `IMMEDIATE` transaction, and the increment itself
//! is a compare-and-set on the limit, so concurrent activations cannot jointly
//! overshoot the quota and a failure leaves no partial state behind.

use crate::context::LicenseContext;
use crate::error::{LicenseError, LicenseResult};
use crate::input::{self, fingerprint};
use keyward_storage::{InstanceQuery, InstanceStore, LicenseStore, StorageError};
use keyward_types::{
    InstanceId, License, LicenseId, LicenseInstance, LicenseStatus, Timestamp,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

/// Result of a successful activation: the new instance and the license after
/// its counter was incremented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activation {
    pub license: License,
    pub instance: LicenseInstance,
}

/// Decrypted, display-ready view of an instance and its license.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceView {
    pub instance_id: InstanceId,
    pub license_id: LicenseId,
    pub license_key: String,
    pub instance_key: String,
    pub license_status: LicenseStatus,
    pub expires_at: Option<Timestamp>,
    /// Status is `expired` or `expires_at` has passed. Reported, never enforced.
    pub expired: bool,
    pub times_activated: u32,
    pub times_activated_max: Option<u32>,
    pub created_at: Timestamp,
    pub updated_at: Option<Timestamp>,
}

/// Filter for [`ActivationManager::list_instances`].
#[derive(Debug, Clone, Default)]
pub struct InstanceFilter {
    pub license_id: Option<LicenseId>,
    /// Plaintext instance identifier; matched by hash.
    pub instance_key: Option<String>,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Orchestrates activate, deactivate, validate and reassign over the stores.
#[derive(Debug, Clone)]
pub struct ActivationManager {
    ctx: LicenseContext,
}

impl ActivationManager {
    pub fn new(ctx: LicenseContext) -> Self {
        Self { ctx }
    }

    /// Binds `instance_key` to the license identified by `license_key`.
    ///
    /// # Errors
    ///
    /// `LicenseNotFound`, `AlreadyActivated`, `NotActivatable` (maximum unset
    /// or zero), `ActivationLimitReached`, plus
    /// `Validation`/`Crypto`/`Persistence`.
    pub fn activate(&self, license_key: &str, instance_key: &str) -> LicenseResult<Activation> {
        let license_key = input::plaintext("license_key", license_key)?;
        let instance_key = input::plaintext("instance_key", instance_key)?;

        let key_hash = self.ctx.crypto.hash(license_key);
        let instance_hash = self.ctx.crypto.hash(instance_key);
        let encrypted_instance_key = self.ctx.crypto.encrypt(instance_key)?;
        let now = self.ctx.clock.now();
        let actor = self.ctx.actor;

        let result = self.ctx.db.transaction(|tx| {
            let licenses = LicenseStore::new(tx);
            let instances = InstanceStore::new(tx);

            let license = licenses
                .find_by_hash(&key_hash)?
                .ok_or(LicenseError::LicenseNotFound)?;

            if instances.find_by_hash(license.id, &instance_hash)?.is_some() {
                return Err(LicenseError::AlreadyActivated);
            }

            let max = activation_limit(&license)?;
            if !license.has_capacity() {
                return Err(LicenseError::ActivationLimitReached { max });
            }

            let instance = instances
                .insert(license.id, &encrypted_instance_key, &instance_hash, now, actor)
                .map_err(conflict_as_already_activated)?;

            if !licenses.try_increment_activation(license.id, now, actor)? {
                return Err(LicenseError::ActivationLimitReached { max });
            }

            Ok(Activation {
                license: licenses.get(license.id)?,
                instance,
            })
        });

        match &result {
            Ok(activation) => info!(
                license_id = %activation.license.id,
                instance_id = %activation.instance.id,
                times_activated = activation.license.times_activated,
                "instance activated"
            ),
            Err(e) => warn!(
                license = fingerprint(&key_hash),
                kind = e.kind(),
                "activation rejected"
            ),
        }
        result
    }

    /// Releases `instance_key` from the license identified by `license_key`.
    ///
    /// # Errors
    ///
    /// `LicenseNotFound`, `InstanceNotFound`, `NotYetActivated`, plus
    /// `Validation`/`Persistence`.
    pub fn deactivate(&self, license_key: &str, instance_key: &str) -> LicenseResult<()> {
        let license_key = input::plaintext("license_key", license_key)?;
        let instance_key = input::plaintext("instance_key", instance_key)?;

        let key_hash = self.ctx.crypto.hash(license_key);
        let instance_hash = self.ctx.crypto.hash(instance_key);
        let now = self.ctx.clock.now();
        let actor = self.ctx.actor;

        let result = self.ctx.db.transaction(|tx| {
            let licenses = LicenseStore::new(tx);
            let instances = InstanceStore::new(tx);

            let license = licenses
                .find_by_hash(&key_hash)?
                .ok_or(LicenseError::LicenseNotFound)?;
            let instance = instances
                .find_by_hash(license.id, &instance_hash)?
                .ok_or(LicenseError::InstanceNotFound)?;

            if license.times_activated == 0 {
                return Err(LicenseError::NotYetActivated);
            }

            instances.delete(instance.id)?;
            licenses.decrement_activation(license.id, now, actor)?;
            Ok((license.id, instance.id))
        });

        match &result {
            Ok((license_id, instance_id)) => {
                info!(license_id = %license_id, instance_id = %instance_id, "instance deactivated");
            }
            Err(e) => warn!(
                license = fingerprint(&key_hash),
                kind = e.kind(),
                "deactivation rejected"
            ),
        }
        result.map(|_| ())
    }

    /// Confirms that `instance_key` is bound to `license_key`. No mutation.
    ///
    /// # Errors
    ///
    /// `LicenseNotFound` or `InstanceNotFound`, plus `Validation`/`Crypto`/`Persistence`.
    pub fn validate(&self, license_key: &str, instance_key: &str) -> LicenseResult<InstanceView> {
        let license_key = input::plaintext("license_key", license_key)?;
        let instance_key = input::plaintext("instance_key", instance_key)?;

        let key_hash = self.ctx.crypto.hash(license_key);
        let instance_hash = self.ctx.crypto.hash(instance_key);

        let (license, instance) = self.ctx.db.read(|conn| {
            let license = LicenseStore::new(conn)
                .find_by_hash(&key_hash)?
                .ok_or(LicenseError::LicenseNotFound)?;
            let instance = InstanceStore::new(conn)
                .find_by_hash(license.id, &instance_hash)?
                .ok_or(LicenseError::InstanceNotFound)?;
            Ok::<_, LicenseError>((license, instance))
        })?;

        debug!(license_id = %license.id, instance_id = %instance.id, "instance validated");
        self.view(&license, &instance)
    }

    /// Moves an existing instance to another license and/or identifier.
    ///
    /// When the license changes, the original license's counter is decremented
    /// and the target's incremented in the same transaction as the row update.
    ///
    /// # Errors
    ///
    /// `InstanceNotFound`, `LicenseNotFound`, `NotActivatable` or
    /// `ActivationLimitReached` (target license only, when it differs),
    /// `AlreadyActivated`, plus `Validation`/`Crypto`/`Persistence`.
    pub fn reassign_instance(
        &self,
        instance_id: InstanceId,
        new_license_key: &str,
        new_instance_key: &str,
    ) -> LicenseResult<LicenseInstance> {
        let new_license_key = input::plaintext("license_key", new_license_key)?;
        let new_instance_key = input::plaintext("instance_key", new_instance_key)?;

        let key_hash = self.ctx.crypto.hash(new_license_key);
        let instance_hash = self.ctx.crypto.hash(new_instance_key);
        let encrypted_instance_key = self.ctx.crypto.encrypt(new_instance_key)?;
        let now = self.ctx.clock.now();
        let actor = self.ctx.actor;

        let result = self.ctx.db.transaction(|tx| {
            let licenses = LicenseStore::new(tx);
            let instances = InstanceStore::new(tx);

            let instance = instances
                .find(instance_id)?
                .ok_or(LicenseError::InstanceNotFound)?;
            let original = licenses
                .find(instance.license_id)?
                .ok_or(LicenseError::LicenseNotFound)?;
            let target = licenses
                .find_by_hash(&key_hash)?
                .ok_or(LicenseError::LicenseNotFound)?;
            let moving = target.id != original.id;

            let target_max = if moving {
                let max = activation_limit(&target)?;
                if !target.has_capacity() {
                    return Err(LicenseError::ActivationLimitReached { max });
                }
                Some(max)
            } else {
                None
            };

            if instances.hash_exists(target.id, &instance_hash, Some(instance.id))? {
                return Err(LicenseError::AlreadyActivated);
            }

            instances
                .update(
                    instance.id,
                    target.id,
                    &encrypted_instance_key,
                    &instance_hash,
                    now,
                    actor,
                )
                .map_err(conflict_as_already_activated)?;

            if let Some(max) = target_max {
                licenses.decrement_activation(original.id, now, actor)?;
                if !licenses.try_increment_activation(target.id, now, actor)? {
                    return Err(LicenseError::ActivationLimitReached { max });
                }
            }

            let updated = instances
                .find(instance.id)?
                .ok_or(LicenseError::InstanceNotFound)?;
            Ok((updated, original.id))
        });

        match result {
            Ok((instance, from)) => {
                info!(
                    instance_id = %instance.id,
                    from_license = %from,
                    to_license = %instance.license_id,
                    "instance reassigned"
                );
                Ok(instance)
            }
            Err(e) => {
                warn!(instance_id = %instance_id, kind = e.kind(), "reassignment rejected");
                Err(e)
            }
        }
    }

    /// Deactivates each instance by id, best effort.
    ///
    /// Each item runs in its own transaction. Missing instances, instances
    /// whose license is gone and per-item failures are skipped. Returns the
    /// number of instances deactivated.
    pub fn bulk_deactivate(&self, instance_ids: &[InstanceId]) -> usize {
        let actor = self.ctx.actor;
        let mut deactivated = 0;

        for &instance_id in instance_ids {
            let now = self.ctx.clock.now();
            let outcome = self.ctx.db.transaction(|tx| {
                let licenses = LicenseStore::new(tx);
                let instances = InstanceStore::new(tx);

                let Some(instance) = instances.find(instance_id)? else {
                    return Ok(false);
                };
                if !licenses.decrement_activation(instance.license_id, now, actor)? {
                    return Ok(false);
                }
                instances.delete(instance.id)?;
                Ok::<_, StorageError>(true)
            });

            match outcome {
                Ok(true) => deactivated += 1,
                Ok(false) => debug!(instance_id = %instance_id, "bulk deactivation skipped missing item"),
                Err(e) => warn!(instance_id = %instance_id, error = %e, "bulk deactivation item failed"),
            }
        }

        info!(requested = instance_ids.len(), deactivated, "bulk deactivation finished");
        deactivated
    }

    /// Looks up a license by its plaintext key.
    pub fn license(&self, license_key: &str) -> LicenseResult<License> {
        let license_key = input::plaintext("license_key", license_key)?;
        let hash = self.ctx.crypto.hash(license_key);
        self.ctx.db.read(|conn| {
            LicenseStore::new(conn)
                .find_by_hash(&hash)?
                .ok_or(LicenseError::LicenseNotFound)
        })
    }

    /// Returns the decrypted view of one instance.
    pub fn get_instance(&self, instance_id: InstanceId) -> LicenseResult<InstanceView> {
        let (license, instance) = self.ctx.db.read(|conn| {
            let instance = InstanceStore::new(conn)
                .find(instance_id)?
                .ok_or(LicenseError::InstanceNotFound)?;
            let license = LicenseStore::new(conn)
                .find(instance.license_id)?
                .ok_or(LicenseError::LicenseNotFound)?;
            Ok::<_, LicenseError>((license, instance))
        })?;
        self.view(&license, &instance)
    }

    /// Decrypts the identifier of one instance for an authorized viewer.
    pub fn reveal_instance_key(&self, instance_id: InstanceId) -> LicenseResult<String> {
        let instance = self.ctx.db.read(|conn| {
            InstanceStore::new(conn)
                .find(instance_id)?
                .ok_or(LicenseError::InstanceNotFound)
        })?;
        Ok(self.ctx.crypto.decrypt(&instance.encrypted_instance_key)?)
    }

    /// Decrypts the identifiers of several instances. Unknown ids are omitted.
    pub fn reveal_instance_keys(
        &self,
        instance_ids: &[InstanceId],
    ) -> LicenseResult<BTreeMap<InstanceId, String>> {
        let found = self.ctx.db.read(|conn| {
            let store = InstanceStore::new(conn);
            let mut found = Vec::with_capacity(instance_ids.len());
            for &id in instance_ids {
                if let Some(instance) = store.find(id)? {
                    found.push(instance);
                }
            }
            Ok::<_, LicenseError>(found)
        })?;

        found
            .into_iter()
            .map(|instance| {
                let key = self.ctx.crypto.decrypt(&instance.encrypted_instance_key)?;
                Ok::<_, LicenseError>((instance.id, key))
            })
            .collect()
    }

    /// Lists instances newest first, with decrypted keys.
    pub fn list_instances(&self, filter: &InstanceFilter) -> LicenseResult<Vec<InstanceView>> {
        let query = self.query_for(filter)?;
        let rows = self.ctx.db.read(|conn| {
            let instances = InstanceStore::new(conn).list(&query)?;
            let licenses = LicenseStore::new(conn);
            let mut owners: HashMap<LicenseId, License> = HashMap::new();
            let mut rows = Vec::with_capacity(instances.len());
            for instance in instances {
                if !owners.contains_key(&instance.license_id) {
                    let license = licenses
                        .find(instance.license_id)?
                        .ok_or(LicenseError::LicenseNotFound)?;
                    owners.insert(license.id, license);
                }
                rows.push((owners[&instance.license_id].clone(), instance));
            }
            Ok::<_, LicenseError>(rows)
        })?;

        rows.iter()
            .map(|(license, instance)| self.view(license, instance))
            .collect()
    }

    /// Counts instances matching `filter`, ignoring paging.
    pub fn count_instances(&self, filter: &InstanceFilter) -> LicenseResult<u64> {
        let query = self.query_for(filter)?;
        self.ctx
            .db
            .read(|conn| Ok(InstanceStore::new(conn).count(&query)?))
    }

    fn query_for(&self, filter: &InstanceFilter) -> LicenseResult<InstanceQuery> {
        let instance_hash = match filter.instance_key.as_deref() {
            Some(key) => Some(self.ctx.crypto.hash(input::plaintext("instance_key", key)?)),
            None => None,
        };
        Ok(InstanceQuery {
            license_id: filter.license_id,
            instance_hash,
            limit: filter.limit,
            offset: filter.offset,
        })
    }

    fn view(&self, license: &License, instance: &LicenseInstance) -> LicenseResult<InstanceView> {
        Ok(InstanceView {
            instance_id: instance.id,
            license_id: license.id,
            license_key: self.ctx.crypto.decrypt(&license.encrypted_key)?,
            instance_key: self.ctx.crypto.decrypt(&instance.encrypted_instance_key)?,
            license_status: license.status,
            expires_at: license.expires_at,
            expired: license.is_expired_at(self.ctx.clock.now()),
            times_activated: license.times_activated,
            times_activated_max: license.times_activated_max,
            created_at: instance.audit.created_at,
            updated_at: instance.audit.updated_at,
        })
    }
}

/// Returns the activation limit, or `NotActivatable` when activation is
/// disabled for this license (maximum unset or zero).
fn activation_limit(license: &License) -> LicenseResult<u32> {
    license
        .activation_limit()
        .ok_or(LicenseError::NotActivatable {
            reason: "times_activated_max not set",
        })
}

fn conflict_as_already_activated(err: StorageError) -> LicenseError {
    if err.is_conflict() {
        LicenseError::AlreadyActivated
    } else {
        err.into()
    }
}
