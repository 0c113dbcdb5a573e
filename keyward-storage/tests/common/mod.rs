//! Shared fixtures for storage tests.

#![allow(dead_code)]

use keyward_storage::{LicenseDb, LicenseStore, NewLicenseRow};
use keyward_types::{License, LicenseStatus, Timestamp};

pub const T0: Timestamp = Timestamp::from_millis(1_700_000_000_000);

pub fn db() -> LicenseDb {
    LicenseDb::open_in_memory().unwrap()
}

pub fn new_row(hash: &str, max: Option<u32>) -> NewLicenseRow {
    NewLicenseRow {
        encrypted_key: format!("enc:{hash}"),
        key_hash: hash.to_string(),
        times_activated_max: max,
        product_id: Some(10),
        status: LicenseStatus::Active,
        expires_at: None,
    }
}

pub fn insert_license(db: &LicenseDb, hash: &str, max: Option<u32>) -> License {
    db.read(|conn| LicenseStore::new(conn).insert(&new_row(hash, max), T0, None))
        .unwrap()
}
