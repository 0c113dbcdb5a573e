//! Typed access to the `license_instance` table.

use crate::error::{StorageError, StorageResult};
use keyward_types::{ActorId, Audit, InstanceId, LicenseId, LicenseInstance, Timestamp};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};

const INSTANCE_COLUMNS: &str =
    "id, license_id, instance_key, instance_hash, created_at, created_by, updated_at, updated_by";

/// Filter for listing instances. Empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceQuery {
    pub license_id: Option<LicenseId>,
    pub instance_hash: Option<String>,
    pub limit: Option<u32>,
    pub offset: u32,
}

impl InstanceQuery {
    fn where_clause(&self) -> (String, Vec<Value>) {
        let mut sql = String::from(" WHERE 1 = 1");
        let mut values = Vec::new();
        if let Some(license_id) = self.license_id {
            values.push(Value::Integer(license_id.get()));
            sql.push_str(&format!(" AND license_id = ?{}", values.len()));
        }
        if let Some(hash) = &self.instance_hash {
            values.push(Value::Text(hash.clone()));
            sql.push_str(&format!(" AND instance_hash = ?{}", values.len()));
        }
        (sql, values)
    }
}

/// Instance queries and mutations over a borrowed connection or transaction.
pub struct InstanceStore<'c> {
    conn: &'c Connection,
}

impl<'c> InstanceStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Inserts an instance. A duplicate `(license_id, instance_hash)` pair is
    /// rejected with [`StorageError::Conflict`].
    pub fn insert(
        &self,
        license_id: LicenseId,
        encrypted_instance_key: &str,
        instance_hash: &str,
        at: Timestamp,
        by: Option<ActorId>,
    ) -> StorageResult<LicenseInstance> {
        self.conn.execute(
            "INSERT INTO license_instance (license_id, instance_key, instance_hash, created_at, created_by)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                license_id.get(),
                encrypted_instance_key,
                instance_hash,
                at.as_millis(),
                by.map(|a| a.get()),
            ],
        )?;
        let id = InstanceId::new(self.conn.last_insert_rowid());
        self.find(id)?
            .ok_or_else(|| StorageError::InvalidData(format!("instance {id} vanished")))
    }

    pub fn find(&self, id: InstanceId) -> StorageResult<Option<LicenseInstance>> {
        let sql = format!("SELECT {INSTANCE_COLUMNS} FROM license_instance WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![id.get()], row_to_instance)
            .optional()?)
    }

    /// Finds the instance bound to `license_id` with this identifier hash.
    pub fn find_by_hash(
        &self,
        license_id: LicenseId,
        instance_hash: &str,
    ) -> StorageResult<Option<LicenseInstance>> {
        let sql = format!(
            "SELECT {INSTANCE_COLUMNS} FROM license_instance WHERE license_id = ?1 AND instance_hash = ?2"
        );
        Ok(self
            .conn
            .query_row(&sql, params![license_id.get(), instance_hash], row_to_instance)
            .optional()?)
    }

    /// Returns true if an instance other than `exclude` holds this pair.
    pub fn hash_exists(
        &self,
        license_id: LicenseId,
        instance_hash: &str,
        exclude: Option<InstanceId>,
    ) -> StorageResult<bool> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS (
                 SELECT 1 FROM license_instance
                 WHERE license_id = ?1 AND instance_hash = ?2 AND (?3 IS NULL OR id <> ?3)
             )",
            params![license_id.get(), instance_hash, exclude.map(|id| id.get())],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Moves an instance to a license and/or identifier.
    pub fn update(
        &self,
        id: InstanceId,
        license_id: LicenseId,
        encrypted_instance_key: &str,
        instance_hash: &str,
        at: Timestamp,
        by: Option<ActorId>,
    ) -> StorageResult<bool> {
        let changed = self.conn.execute(
            "UPDATE license_instance
             SET license_id = ?2, instance_key = ?3, instance_hash = ?4, updated_at = ?5, updated_by = ?6
             WHERE id = ?1",
            params![
                id.get(),
                license_id.get(),
                encrypted_instance_key,
                instance_hash,
                at.as_millis(),
                by.map(|a| a.get()),
            ],
        )?;
        Ok(changed == 1)
    }

    /// Deletes an instance. Returns false if it did not exist.
    pub fn delete(&self, id: InstanceId) -> StorageResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM license_instance WHERE id = ?1", params![id.get()])?;
        Ok(changed == 1)
    }

    /// Lists instances matching `query`, newest first.
    pub fn list(&self, query: &InstanceQuery) -> StorageResult<Vec<LicenseInstance>> {
        let (filter, mut values) = query.where_clause();
        let mut sql = format!("SELECT {INSTANCE_COLUMNS} FROM license_instance{filter} ORDER BY id DESC");
        // SQLite needs a LIMIT before OFFSET; -1 means unbounded
        values.push(Value::Integer(query.limit.map_or(-1, i64::from)));
        sql.push_str(&format!(" LIMIT ?{}", values.len()));
        values.push(Value::Integer(i64::from(query.offset)));
        sql.push_str(&format!(" OFFSET ?{}", values.len()));

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), row_to_instance)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Counts instances matching `query`, ignoring paging.
    pub fn count(&self, query: &InstanceQuery) -> StorageResult<u64> {
        let (filter, values) = query.where_clause();
        let sql = format!("SELECT COUNT(*) FROM license_instance{filter}");
        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(values), |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Counts the instances bound to one license.
    pub fn count_for_license(&self, license_id: LicenseId) -> StorageResult<u64> {
        self.count(&InstanceQuery {
            license_id: Some(license_id),
            ..InstanceQuery::default()
        })
    }
}

fn row_to_instance(row: &Row<'_>) -> rusqlite::Result<LicenseInstance> {
    Ok(LicenseInstance {
        id: InstanceId::new(row.get(0)?),
        license_id: LicenseId::new(row.get(1)?),
        encrypted_instance_key: row.get(2)?,
        instance_hash: row.get(3)?,
        audit: Audit {
            created_at: Timestamp::from_millis(row.get(4)?),
            created_by: row.get::<_, Option<i64>>(5)?.map(ActorId::new),
            updated_at: row.get::<_, Option<i64>>(6)?.map(Timestamp::from_millis),
            updated_by: row.get::<_, Option<i64>>(7)?.map(ActorId::new),
        },
    })
}
