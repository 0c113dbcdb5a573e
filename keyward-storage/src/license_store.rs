//! Typed access to the `license` table.

use crate::error::{StorageError, StorageResult};
use keyward_types::{ActorId, Audit, License, LicenseId, LicenseStatus, Timestamp};
use rusqlite::{Connection, OptionalExtension, Row, params};

const LICENSE_COLUMNS: &str = "id, encrypted_key, hash, times_activated, times_activated_max, \
     product_id, status, expires_at, created_at, created_by, updated_at, updated_by";

/// Values for a new license row. The counter always starts at zero.
#[derive(Debug, Clone)]
pub struct NewLicenseRow {
    pub encrypted_key: String,
    pub key_hash: String,
    pub times_activated_max: Option<u32>,
    pub product_id: Option<i64>,
    pub status: LicenseStatus,
    pub expires_at: Option<Timestamp>,
}

/// License queries and mutations over a borrowed connection or transaction.
pub struct LicenseStore<'c> {
    conn: &'c Connection,
}

impl<'c> LicenseStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Inserts a license with `times_activated = 0`.
    pub fn insert(
        &self,
        row: &NewLicenseRow,
        at: Timestamp,
        by: Option<ActorId>,
    ) -> StorageResult<License> {
        self.conn.execute(
            "INSERT INTO license (encrypted_key, hash, times_activated, times_activated_max,
                                  product_id, status, expires_at, created_at, created_by)
             VALUES (?1, ?2, 0, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                row.encrypted_key,
                row.key_hash,
                row.times_activated_max,
                row.product_id,
                row.status.as_str(),
                row.expires_at.map(|t| t.as_millis()),
                at.as_millis(),
                by.map(|a| a.get()),
            ],
        )?;
        let id = LicenseId::new(self.conn.last_insert_rowid());
        self.get(id)
    }

    /// Finds a license by id.
    pub fn find(&self, id: LicenseId) -> StorageResult<Option<License>> {
        let sql = format!("SELECT {LICENSE_COLUMNS} FROM license WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![id.get()], row_to_license)
            .optional()?)
    }

    /// Finds a license by id, treating absence as corrupt state.
    pub fn get(&self, id: LicenseId) -> StorageResult<License> {
        self.find(id)?
            .ok_or_else(|| StorageError::InvalidData(format!("license {id} vanished")))
    }

    /// Finds a license by the hash of its plaintext key.
    pub fn find_by_hash(&self, key_hash: &str) -> StorageResult<Option<License>> {
        let sql = format!("SELECT {LICENSE_COLUMNS} FROM license WHERE hash = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![key_hash], row_to_license)
            .optional()?)
    }

    /// Returns true if a license other than `exclude` has this key hash.
    pub fn hash_exists(&self, key_hash: &str, exclude: Option<LicenseId>) -> StorageResult<bool> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM license WHERE hash = ?1 AND (?2 IS NULL OR id <> ?2))",
            params![key_hash, exclude.map(|id| id.get())],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Returns every license ordered by id.
    pub fn all(&self) -> StorageResult<Vec<License>> {
        let sql = format!("SELECT {LICENSE_COLUMNS} FROM license ORDER BY id");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], row_to_license)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Replaces the key representations of a license.
    pub fn update_key(
        &self,
        id: LicenseId,
        encrypted_key: &str,
        key_hash: &str,
        at: Timestamp,
        by: Option<ActorId>,
    ) -> StorageResult<bool> {
        let changed = self.conn.execute(
            "UPDATE license SET encrypted_key = ?2, hash = ?3, updated_at = ?4, updated_by = ?5
             WHERE id = ?1",
            params![id.get(), encrypted_key, key_hash, at.as_millis(), by.map(|a| a.get())],
        )?;
        Ok(changed == 1)
    }

    /// Sets the lifecycle status of a license.
    pub fn update_status(
        &self,
        id: LicenseId,
        status: LicenseStatus,
        at: Timestamp,
        by: Option<ActorId>,
    ) -> StorageResult<bool> {
        let changed = self.conn.execute(
            "UPDATE license SET status = ?2, updated_at = ?3, updated_by = ?4 WHERE id = ?1",
            params![id.get(), status.as_str(), at.as_millis(), by.map(|a| a.get())],
        )?;
        Ok(changed == 1)
    }

    /// Increments `times_activated` only while it is below a non-zero maximum.
    ///
    /// Returns false (and changes nothing) if the license is missing, has
    /// activation disabled or is already at its limit.
    pub fn try_increment_activation(
        &self,
        id: LicenseId,
        at: Timestamp,
        by: Option<ActorId>,
    ) -> StorageResult<bool> {
        let changed = self.conn.execute(
            "UPDATE license
             SET times_activated = times_activated + 1, updated_at = ?2, updated_by = ?3
             WHERE id = ?1
               AND times_activated_max IS NOT NULL
               AND times_activated_max > 0
               AND times_activated < times_activated_max",
            params![id.get(), at.as_millis(), by.map(|a| a.get())],
        )?;
        Ok(changed == 1)
    }

    /// Decrements `times_activated`, floored at zero.
    ///
    /// Returns false if the license does not exist.
    pub fn decrement_activation(
        &self,
        id: LicenseId,
        at: Timestamp,
        by: Option<ActorId>,
    ) -> StorageResult<bool> {
        let changed = self.conn.execute(
            "UPDATE license
             SET times_activated = MAX(times_activated - 1, 0), updated_at = ?2, updated_by = ?3
             WHERE id = ?1",
            params![id.get(), at.as_millis(), by.map(|a| a.get())],
        )?;
        Ok(changed == 1)
    }
}

fn row_to_license(row: &Row<'_>) -> rusqlite::Result<License> {
    let status: String = row.get(6)?;
    let status = status.parse::<LicenseStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(License {
        id: LicenseId::new(row.get(0)?),
        encrypted_key: row.get(1)?,
        key_hash: row.get(2)?,
        times_activated: row.get(3)?,
        times_activated_max: row.get(4)?,
        product_id: row.get(5)?,
        status,
        expires_at: row.get::<_, Option<i64>>(7)?.map(Timestamp::from_millis),
        audit: Audit {
            created_at: Timestamp::from_millis(row.get(8)?),
            created_by: row.get::<_, Option<i64>>(9)?.map(ActorId::new),
            updated_at: row.get::<_, Option<i64>>(10)?.map(Timestamp::from_millis),
            updated_by: row.get::<_, Option<i64>>(11)?.map(ActorId::new),
        },
    })
}
