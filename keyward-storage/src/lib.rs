//! SQLite storage layer for keyward.
//!
//! # Architecture
//!
//! - [`LicenseDb`] owns the connection, runs schema migrations on open and
//!   hands out reads and `IMMEDIATE` transactions
//! - [`LicenseStore`], [`InstanceStore`] and [`InstalledOnStore`] are thin
//!   typed views over a borrowed connection, so several of them can take part
//!   in one transaction
//! - Unique indexes back every identity rule: license hash, the
//!   `(license_id, instance_hash)` pair and the heartbeat triple

mod db;
mod error;
mod installed_on_store;
mod instance_store;
mod license_store;

pub use db::LicenseDb;
pub use error::{StorageError, StorageResult};
pub use installed_on_store::InstalledOnStore;
pub use instance_store::{InstanceQuery, InstanceStore};
pub use license_store::{LicenseStore, NewLicenseRow};

/// Re-exported so callers can name the transaction type in closures.
pub use rusqlite::{Connection, Transaction};
