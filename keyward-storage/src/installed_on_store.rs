//! Typed access to the `product_installed_on` table.

use crate::error::{StorageError, StorageResult};
use keyward_types::{InstalledOnId, LicenseId, ProductInstalledOn, Timestamp};
use rusqlite::{Connection, OptionalExtension, Row, params};

const INSTALLED_ON_COLUMNS: &str = "id, product_name, license_id, host, last_ping";

/// Heartbeat rows over a borrowed connection or transaction.
pub struct InstalledOnStore<'c> {
    conn: &'c Connection,
}

impl<'c> InstalledOnStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Finds the row for an identity triple. `license_id` is compared null-safely.
    pub fn find_by_identity(
        &self,
        product_name: &str,
        license_id: Option<LicenseId>,
        host: &str,
    ) -> StorageResult<Option<ProductInstalledOn>> {
        let sql = format!(
            "SELECT {INSTALLED_ON_COLUMNS} FROM product_installed_on
             WHERE product_name = ?1 AND license_id IS ?2 AND host = ?3"
        );
        Ok(self
            .conn
            .query_row(
                &sql,
                params![product_name, license_id.map(|id| id.get()), host],
                row_to_installed_on,
            )
            .optional()?)
    }

    /// Inserts a row for the triple, or refreshes `last_ping` if one exists.
    ///
    /// Run inside a transaction so the lookup and the write are not interleaved
    /// with another writer.
    pub fn upsert(
        &self,
        product_name: &str,
        license_id: Option<LicenseId>,
        host: &str,
        at: Timestamp,
    ) -> StorageResult<ProductInstalledOn> {
        if let Some(existing) = self.find_by_identity(product_name, license_id, host)? {
            self.conn.execute(
                "UPDATE product_installed_on SET last_ping = ?2 WHERE id = ?1",
                params![existing.id.get(), at.as_millis()],
            )?;
            return Ok(ProductInstalledOn {
                last_ping: at,
                ..existing
            });
        }

        self.conn.execute(
            "INSERT INTO product_installed_on (product_name, license_id, host, last_ping)
             VALUES (?1, ?2, ?3, ?4)",
            params![product_name, license_id.map(|id| id.get()), host, at.as_millis()],
        )?;
        let id = InstalledOnId::new(self.conn.last_insert_rowid());
        self.find(id)?
            .ok_or_else(|| StorageError::InvalidData(format!("installation {id} vanished")))
    }

    pub fn find(&self, id: InstalledOnId) -> StorageResult<Option<ProductInstalledOn>> {
        let sql = format!("SELECT {INSTALLED_ON_COLUMNS} FROM product_installed_on WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![id.get()], row_to_installed_on)
            .optional()?)
    }

    /// Lists rows ordered by id.
    pub fn list(&self, limit: Option<u32>, offset: u32) -> StorageResult<Vec<ProductInstalledOn>> {
        let sql = format!(
            "SELECT {INSTALLED_ON_COLUMNS} FROM product_installed_on ORDER BY id LIMIT ?1 OFFSET ?2"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![limit.map_or(-1, i64::from), i64::from(offset)],
            row_to_installed_on,
        )?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn count(&self) -> StorageResult<u64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM product_installed_on", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Deletes a row. Returns false if it did not exist.
    pub fn delete(&self, id: InstalledOnId) -> StorageResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM product_installed_on WHERE id = ?1",
            params![id.get()],
        )?;
        Ok(changed == 1)
    }
}

fn row_to_installed_on(row: &Row<'_>) -> rusqlite::Result<ProductInstalledOn> {
    Ok(ProductInstalledOn {
        id: InstalledOnId::new(row.get(0)?),
        product_name: row.get(1)?,
        license_id: row.get::<_, Option<i64>>(2)?.map(LicenseId::new),
        host: row.get(3)?,
        last_ping: Timestamp::from_millis(row.get(4)?),
    })
}
