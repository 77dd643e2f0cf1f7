use rusqlite::{Connection, OpenFlags, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::Result;
use crate::model::DEFAULT_MAX_COVER_BYTES;

use super::migrations::MIGRATIONS;

/// Tuning knobs for an opened store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    /// Read-only connections serving queries. Ignored for in-memory stores.
    pub read_pool_size: usize,

    /// How long a writer waits on a lock held by another process.
    pub busy_timeout_ms: u64,

    /// Largest accepted album cover, in bytes.
    pub max_cover_bytes: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            read_pool_size: 4,
            busy_timeout_ms: 5_000,
            max_cover_bytes: DEFAULT_MAX_COVER_BYTES,
        }
    }
}

/// SQLite connections for the catalog: one writer, a pool of readers.
///
/// Writes are serialized on the writer and each runs in an immediate
/// transaction. Reads go round-robin to read-only connections and see the
/// last committed state (WAL snapshot), never a half-applied write.
#[derive(Debug)]
pub struct Database {
    writer: Mutex<Connection>,
    readers: Vec<Mutex<Connection>>,
    next_reader: AtomicUsize,
}

impl Database {
    /// Open (or create) a database at the given path and apply migrations.
    pub fn open(path: impl AsRef<Path>, options: &StoreOptions) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut writer = Connection::open(path)?;
        configure(&writer, options)?;
        let journal_mode: String =
            writer.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        log::debug!("Journal mode for {}: {}", path.display(), journal_mode);
        apply_migrations(&mut writer)?;

        let mut readers = Vec::with_capacity(options.read_pool_size);
        for _ in 0..options.read_pool_size {
            let reader = Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY
                    | OpenFlags::SQLITE_OPEN_URI
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            configure(&reader, options)?;
            readers.push(Mutex::new(reader));
        }

        log::info!(
            "Opened catalog at {} with {} read connections",
            path.display(),
            readers.len()
        );

        Ok(Self {
            writer: Mutex::new(writer),
            readers,
            next_reader: AtomicUsize::new(0),
        })
    }

    /// Open an in-memory database (for tests). Reads share the writer.
    pub fn open_in_memory() -> Result<Self> {
        let mut writer = Connection::open_in_memory()?;
        configure(&writer, &StoreOptions::default())?;
        apply_migrations(&mut writer)?;
        Ok(Self {
            writer: Mutex::new(writer),
            readers: Vec::new(),
            next_reader: AtomicUsize::new(0),
        })
    }

    /// Run `f` inside one immediate transaction.
    ///
    /// The transaction commits only when `f` returns `Ok`; an error or a
    /// panic rolls back everything `f` did.
    pub fn write<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = lock(&self.writer);
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Run `f` inside one read transaction, so every statement it issues
    /// sees the same snapshot.
    pub fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = if self.readers.is_empty() {
            lock(&self.writer)
        } else {
            let index = self.next_reader.fetch_add(1, Ordering::Relaxed) % self.readers.len();
            lock(&self.readers[index])
        };
        let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Number of read-only connections in the pool.
    #[must_use]
    pub fn read_pool_size(&self) -> usize {
        self.readers.len()
    }
}

/// A panic inside a transaction closure drops (rolls back) the transaction
/// before the guard is released, so a poisoned connection is still usable.
fn lock(conn: &Mutex<Connection>) -> MutexGuard<'_, Connection> {
    conn.lock().unwrap_or_else(PoisonError::into_inner)
}

fn configure(conn: &Connection, options: &StoreOptions) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.busy_timeout(Duration::from_millis(options.busy_timeout_ms))?;
    Ok(())
}

fn apply_migrations(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    // Create migrations table if it doesn't exist
    tx.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let applied: Vec<u32> = {
        let mut stmt = tx.prepare("SELECT version FROM schema_migrations ORDER BY version")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()?
    };

    for migration in MIGRATIONS {
        if !applied.contains(&migration.version) {
            log::info!(
                "Applying migration {} ({})",
                migration.version,
                migration.name
            );
            tx.execute_batch(migration.sql)?;
            tx.execute(
                "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
                rusqlite::params![migration.version, migration.name],
            )?;
        }
    }

    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ErrorKind};

    #[test]
    fn test_database_open_in_memory() {
        let db = Database::open_in_memory().unwrap();
        let count: i64 = db
            .read(|tx| {
                Ok(tx.query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| {
                    row.get(0)
                })?)
            })
            .unwrap();
        assert_eq!(count, i64::try_from(MIGRATIONS.len()).unwrap());
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let db = Database::open_in_memory().unwrap();
        let enabled: i64 = db
            .read(|tx| Ok(tx.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?))
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[test]
    fn test_write_rolls_back_on_error() {
        let db = Database::open_in_memory().unwrap();
        let result: Result<()> = db.write(|tx| {
            tx.execute("INSERT INTO artist (name) VALUES ('Bjork')", [])?;
            Err(Error::invalid("abort"))
        });
        assert!(result.is_err());

        let count: i64 = db
            .read(|tx| Ok(tx.query_row("SELECT COUNT(*) FROM artist", [], |row| row.get(0))?))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_write_rolls_back_on_panic() {
        let db = Database::open_in_memory().unwrap();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = db.write(|tx| -> Result<()> {
                tx.execute("INSERT INTO artist (name) VALUES ('Bjork')", [])?;
                panic!("writer crashed mid-transaction");
            });
        }));
        assert!(outcome.is_err());

        let count: i64 = db
            .read(|tx| Ok(tx.query_row("SELECT COUNT(*) FROM artist", [], |row| row.get(0))?))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_direct_duplicate_insert_is_constraint_violation() {
        let db = Database::open_in_memory().unwrap();
        let err = db
            .write(|tx| {
                tx.execute("INSERT INTO artist (name) VALUES ('Air')", [])?;
                tx.execute("INSERT INTO artist (name) VALUES ('AIR')", [])?;
                Ok(())
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
    }

    #[test]
    fn test_history_rows_cannot_be_updated() {
        let db = Database::open_in_memory().unwrap();
        let err = db
            .write(|tx| {
                tx.execute("INSERT INTO track (title, duration) VALUES ('Teardrop', 330000)", [])?;
                tx.execute(
                    "INSERT INTO listening_history (track_uid, listened_at) VALUES (1, 1000)",
                    [],
                )?;
                tx.execute("UPDATE listening_history SET listened_at = 2000", [])?;
                Ok(())
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
    }

    #[test]
    fn test_migrations_are_idempotent_on_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.db");
        let options = StoreOptions {
            read_pool_size: 1,
            ..StoreOptions::default()
        };

        drop(Database::open(&path, &options).unwrap());
        let db = Database::open(&path, &options).unwrap();

        let count: i64 = db
            .read(|tx| {
                Ok(tx.query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| {
                    row.get(0)
                })?)
            })
            .unwrap();
        assert_eq!(count, i64::try_from(MIGRATIONS.len()).unwrap());
        assert_eq!(db.read_pool_size(), 1);
    }
}
