//! Error types for the licensing core.

use keyward_crypto::CryptoError;
use keyward_storage::StorageError;
use thiserror::Error;

/// Licensing-specific errors.
///
/// Every operation fails with exactly one of these; none of them is fatal to
/// the process. The caller decides how each is presented.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// No license has the given key.
    #[error("license key not found")]
    LicenseNotFound,

    /// The license exists but the instance does not.
    #[error("license instance not found")]
    InstanceNotFound,

    /// The instance identifier is already bound to this license.
    #[error("instance already activated for this license")]
    AlreadyActivated,

    /// Activation is not possible for this license at all.
    #[error("license cannot be activated: {reason}")]
    NotActivatable { reason: &'static str },

    /// The license is bound to as many instances as it allows.
    #[error("license reached its maximum activation count ({max})")]
    ActivationLimitReached { max: u32 },

    /// The license has no activations to release.
    #[error("license has not been activated yet")]
    NotYetActivated,

    /// Malformed or missing input.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Underlying store failure; the operation was rolled back.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// The crypto provider could not encrypt or decrypt a value.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Configuration could not be loaded or is incomplete.
    #[error("configuration error: {0}")]
    Config(String),
}

impl LicenseError {
    /// Stable machine-readable code for the error kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LicenseNotFound => "license_not_found",
            Self::InstanceNotFound => "instance_not_found",
            Self::AlreadyActivated => "already_activated",
            Self::NotActivatable { .. } => "not_activatable",
            Self::ActivationLimitReached { .. } => "activation_limit_reached",
            Self::NotYetActivated => "not_yet_activated",
            Self::Validation(_) => "validation_error",
            Self::Persistence(_) => "persistence_error",
            Self::Crypto(_) => "crypto_error",
            Self::Config(_) => "config_error",
        }
    }
}

impl From<StorageError> for LicenseError {
    fn from(err: StorageError) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl From<CryptoError> for LicenseError {
    fn from(err: CryptoError) -> Self {
        Self::Crypto(err.to_string())
    }
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
