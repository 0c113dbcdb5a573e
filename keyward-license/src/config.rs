//! TOML configuration with environment overrides.
//!
//! ```toml
//! database_path = "/var/lib/keyward/licenses.db"
//!
//! [crypto]
//! encryption_key = "<base64, 32 bytes>"
//! hash_secret = "<base64, at least 16 bytes>"
//! # or, instead of encryption_key:
//! # passphrase = "..."
//! # salt = "<base64, 16 bytes>"
//!
//! [tracker]
//! require_known_license = true
//! ```

use crate::error::{LicenseError, LicenseResult};
use keyward_crypto::{
    EncryptionKey, HashSecret, KdfParams, KeyedCryptoProvider, Salt, derive_key,
    generate_random_key,
};
use keyward_storage::LicenseDb;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Overrides `database_path`.
pub const ENV_DATABASE_PATH: &str = "KEYWARD_DATABASE_PATH";
/// Overrides `crypto.encryption_key`.
pub const ENV_ENCRYPTION_KEY: &str = "KEYWARD_ENCRYPTION_KEY";
/// Overrides `crypto.hash_secret`.
pub const ENV_HASH_SECRET: &str = "KEYWARD_HASH_SECRET";
/// Overrides `crypto.passphrase`.
pub const ENV_PASSPHRASE: &str = "KEYWARD_PASSPHRASE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicensingConfig {
    /// SQLite file, or `:memory:`.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    #[serde(default)]
    pub crypto: CryptoConfig,

    #[serde(default)]
    pub tracker: TrackerConfig,
}

/// Key material, base64 encoded. Any of it may come from the environment instead.
///
/// The encryption key is either given directly or derived from `passphrase`
/// and `salt` with Argon2id; `encryption_key` wins when both are set.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoConfig {
    pub encryption_key: Option<String>,
    pub hash_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Reject pings whose license key is unknown instead of recording them
    /// without a license.
    #[serde(default = "default_true")]
    pub require_known_license: bool,
}

fn default_database_path() -> String {
    "keyward.db".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            require_known_license: true,
        }
    }
}

impl Default for LicensingConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            crypto: CryptoConfig::default(),
            tracker: TrackerConfig::default(),
        }
    }
}

impl std::fmt::Debug for CryptoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("CryptoConfig")
            .field("encryption_key", &redact(&self.encryption_key))
            .field("hash_secret", &redact(&self.hash_secret))
            .field("passphrase", &redact(&self.passphrase))
            .field("salt", &self.salt)
            .finish()
    }
}

impl LicensingConfig {
    /// Reads a TOML file.
    pub fn load(path: impl AsRef<Path>) -> LicenseResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| LicenseError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> LicenseResult<Self> {
        toml::from_str(text).map_err(|e| LicenseError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> LicenseResult<String> {
        toml::to_string_pretty(self).map_err(|e| LicenseError::Config(e.to_string()))
    }

    /// A config with fresh random key material.
    pub fn generate() -> Self {
        Self {
            crypto: CryptoConfig {
                encryption_key: Some(generate_random_key().to_base64()),
                hash_secret: Some(HashSecret::random().to_base64()),
                ..CryptoConfig::default()
            },
            ..Self::default()
        }
    }

    /// Applies `KEYWARD_*` variables from the process environment.
    #[must_use]
    pub fn apply_env_overrides(self) -> Self {
        self.apply_overrides_from(|name| std::env::var(name).ok())
    }

    /// Applies overrides from `lookup`, which maps a variable name to its value.
    /// Empty values are ignored.
    #[must_use]
    pub fn apply_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(path) = get(ENV_DATABASE_PATH) {
            self.database_path = path;
        }
        if let Some(key) = get(ENV_ENCRYPTION_KEY) {
            self.crypto.encryption_key = Some(key);
        }
        if let Some(secret) = get(ENV_HASH_SECRET) {
            self.crypto.hash_secret = Some(secret);
        }
        if let Some(passphrase) = get(ENV_PASSPHRASE) {
            self.crypto.passphrase = Some(passphrase);
        }
        self
    }

    /// Builds the production crypto provider from the configured keys.
    pub fn build_crypto(&self) -> LicenseResult<KeyedCryptoProvider> {
        let key = self.encryption_key()?;
        let secret = self
            .crypto
            .hash_secret
            .as_deref()
            .ok_or_else(|| LicenseError::Config("crypto.hash_secret is not set".into()))?;
        let secret = HashSecret::from_base64(secret.trim())
            .map_err(|e| LicenseError::Config(format!("crypto.hash_secret: {e}")))?;
        Ok(KeyedCryptoProvider::new(key, secret))
    }

    fn encryption_key(&self) -> LicenseResult<EncryptionKey> {
        let crypto = &self.crypto;
        if let Some(key) = crypto.encryption_key.as_deref() {
            return EncryptionKey::from_base64(key.trim())
                .map_err(|e| LicenseError::Config(format!("crypto.encryption_key: {e}")));
        }

        let passphrase = crypto.passphrase.as_deref().ok_or_else(|| {
            LicenseError::Config("crypto.encryption_key or crypto.passphrase must be set".into())
        })?;
        let salt = crypto.salt.as_deref().ok_or_else(|| {
            LicenseError::Config("crypto.salt is required with crypto.passphrase".into())
        })?;
        let salt = Salt::from_base64(salt)
            .map_err(|e| LicenseError::Config(format!("crypto.salt: {e}")))?;
        derive_key(passphrase, &salt, &KdfParams::default())
            .map_err(|e| LicenseError::Config(format!("crypto.passphrase: {e}")))
    }

    /// Opens the configured database, running migrations.
    pub fn open_db(&self) -> LicenseResult<LicenseDb> {
        Ok(LicenseDb::open_location(&self.database_path)?)
    }
}
