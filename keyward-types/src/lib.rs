//! Core type definitions for keyward.
//!
//! This crate defines the storage-agnostic types shared by the rest of the
//! workspace:
//! - Row identifiers for licenses, instances and installation records
//! - Millisecond timestamps and monotonic clocks
//! - The persisted records themselves

mod ids;
mod record;
mod timestamp;

pub use ids::{ActorId, InstalledOnId, InstanceId, LicenseId};
pub use record::{Audit, License, LicenseInstance, LicenseStatus, ProductInstalledOn};
pub use timestamp::{Clock, ManualClock, SystemClock, Timestamp};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid id: {0}")]
    InvalidId(String),

    #[error("invalid license status: {0}")]
    InvalidStatus(String),
}
