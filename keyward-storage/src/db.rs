//! Connection management, schema and transactions.

use crate::error::{StorageError, StorageResult};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};

/// How long a writer waits on another process's lock before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Ordered schema migrations. Index `i` upgrades `user_version` from `i` to `i + 1`.
const MIGRATIONS: &[&str] = &[
    // 1: licenses and their bound instances
    "
    CREATE TABLE IF NOT EXISTS license (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        encrypted_key TEXT NOT NULL,
        hash TEXT NOT NULL,
        times_activated INTEGER NOT NULL DEFAULT 0 CHECK (times_activated >= 0),
        times_activated_max INTEGER CHECK (times_activated_max IS NULL OR times_activated_max >= 0),
        product_id INTEGER,
        status TEXT NOT NULL DEFAULT 'inactive',
        expires_at INTEGER,
        created_at INTEGER NOT NULL,
        created_by INTEGER,
        updated_at INTEGER,
        updated_by INTEGER,
        CHECK (
            times_activated_max IS NULL
            OR times_activated_max = 0
            OR times_activated <= times_activated_max
        )
    );
    CREATE UNIQUE INDEX IF NOT EXISTS license_hash_idx ON license (hash);

    CREATE TABLE IF NOT EXISTS license_instance (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        license_id INTEGER NOT NULL REFERENCES license (id) ON DELETE CASCADE,
        instance_key TEXT NOT NULL,
        instance_hash TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        created_by INTEGER,
        updated_at INTEGER,
        updated_by INTEGER
    );
    CREATE UNIQUE INDEX IF NOT EXISTS license_instance_pair_idx
        ON license_instance (license_id, instance_hash);
    ",
    // 2: installation heartbeats
    "
    CREATE TABLE IF NOT EXISTS product_installed_on (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        product_name TEXT NOT NULL,
        license_id INTEGER REFERENCES license (id) ON DELETE CASCADE,
        host TEXT NOT NULL,
        last_ping INTEGER NOT NULL
    );
    CREATE UNIQUE INDEX IF NOT EXISTS product_installed_on_identity_idx
        ON product_installed_on (product_name, IFNULL(license_id, 0), host);
    ",
];

/// Handle to the license database.
///
/// Cloning is cheap; clones share the same connection. All access goes through
/// [`LicenseDb::read`] or [`LicenseDb::transaction`], which hold the connection
/// mutex for the duration of the closure.
#[derive(Clone)]
pub struct LicenseDb {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for LicenseDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LicenseDb").finish_non_exhaustive()
    }
}

impl LicenseDb {
    /// Opens (or creates) a database file and applies pending migrations.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!(%mode, "journal mode set");
        info!(path = %path.display(), "opened license database");
        Self::from_connection(conn)
    }

    /// Opens an in-memory database (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    /// Opens `":memory:"` in memory and anything else as a file.
    pub fn open_location(location: &str) -> StorageResult<Self> {
        if location == ":memory:" {
            Self::open_in_memory()
        } else {
            Self::open(location)
        }
    }

    fn from_connection(conn: Connection) -> StorageResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.migrate()?;
        Ok(db)
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))
    }

    fn migrate(&self) -> StorageResult<()> {
        let mut conn = self.lock()?;
        let current: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        let current = usize::try_from(current)
            .map_err(|_| StorageError::Migration(format!("negative schema version {current}")))?;
        if current > MIGRATIONS.len() {
            return Err(StorageError::Migration(format!(
                "database schema version {current} is newer than supported {}",
                MIGRATIONS.len()
            )));
        }

        for (index, sql) in MIGRATIONS.iter().enumerate().skip(current) {
            let version = index + 1;
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute_batch(sql)
                .map_err(|e| StorageError::Migration(format!("step {version}: {e}")))?;
            tx.pragma_update(None, "user_version", version as i64)?;
            tx.commit()?;
            debug!(version, "applied schema migration");
        }
        Ok(())
    }

    /// Returns the applied schema version.
    pub fn schema_version(&self) -> StorageResult<i64> {
        let conn = self.lock()?;
        Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
    }

    /// Runs `f` against the connection without a transaction.
    ///
    /// Each statement sees a consistent snapshot; use [`LicenseDb::transaction`]
    /// when several reads must agree with each other.
    pub fn read<T, E>(&self, f: impl FnOnce(&Connection) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StorageError>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Runs `f` inside an `IMMEDIATE` transaction.
    ///
    /// The write lock is taken at `BEGIN`, so concurrent writers (threads sharing
    /// this handle or other processes on the same file) are serialized for the
    /// whole read-check-write sequence. The transaction commits only if `f`
    /// returns `Ok`; any error rolls back every change made inside it.
    pub fn transaction<T, E>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StorageError>,
    {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StorageError::from)?;
        let value = f(&tx)?;
        tx.commit().map_err(StorageError::from)?;
        Ok(value)
    }
}
