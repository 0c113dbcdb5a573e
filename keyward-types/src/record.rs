//! Persisted records.
//!
//! Secrets are held twice: as ciphertext (recoverable for display) and as a
//! deterministic hash (for lookup and uniqueness). Plaintext never appears in
//! a record.

use crate::ids::{ActorId, InstalledOnId, InstanceId, LicenseId};
use crate::timestamp::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a license.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseStatus {
    /// Issued but not yet handed out.
    #[default]
    Inactive,
    /// Delivered and usable.
    Active,
    /// Past its expiry date.
    Expired,
    /// Administratively blocked.
    Disabled,
}

impl LicenseStatus {
    /// Column value used by the store.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Disabled => "disabled",
        }
    }
}

impl fmt::Display for LicenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LicenseStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inactive" => Ok(Self::Inactive),
            "active" => Ok(Self::Active),
            "expired" => Ok(Self::Expired),
            "disabled" => Ok(Self::Disabled),
            other => Err(crate::Error::InvalidStatus(other.to_string())),
        }
    }
}

/// Creation and modification stamps carried by every mutable record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Audit {
    pub created_at: Timestamp,
    pub created_by: Option<ActorId>,
    pub updated_at: Option<Timestamp>,
    pub updated_by: Option<ActorId>,
}

/// A license key and its activation quota.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    pub id: LicenseId,
    /// Reversible ciphertext of the plaintext key.
    pub encrypted_key: String,
    /// Deterministic hash of the plaintext key; unique across licenses.
    pub key_hash: String,
    /// Number of instances currently bound to this license.
    pub times_activated: u32,
    /// Activation quota. `None` and `Some(0)` both disable activation.
    pub times_activated_max: Option<u32>,
    pub product_id: Option<i64>,
    pub status: LicenseStatus,
    pub expires_at: Option<Timestamp>,
    pub audit: Audit,
}

impl License {
    /// Returns the activation quota if activation is enabled for this key.
    #[must_use]
    pub fn activation_limit(&self) -> Option<u32> {
        self.times_activated_max.filter(|max| *max > 0)
    }

    /// Returns true if another instance can be bound without exceeding the quota.
    #[must_use]
    pub fn has_capacity(&self) -> bool {
        self.activation_limit()
            .is_some_and(|max| self.times_activated < max)
    }

    /// Returns true if the license has an expiry date at or before `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.status == LicenseStatus::Expired || self.expires_at.is_some_and(|exp| exp <= now)
    }
}

/// One installation bound to a license.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseInstance {
    pub id: InstanceId,
    pub license_id: LicenseId,
    /// Reversible ciphertext of the plaintext instance identifier.
    pub encrypted_instance_key: String,
    /// Deterministic hash of the plaintext instance identifier.
    pub instance_hash: String,
    pub audit: Audit,
}

/// Heartbeat record for an installed product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInstalledOn {
    pub id: InstalledOnId,
    pub license_id: Option<LicenseId>,
    pub product_name: String,
    pub host: String,
    pub last_ping: Timestamp,
}
