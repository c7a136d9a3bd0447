use cargoworker_types::{CancelToken, Language, SourceBasename, SourceExtension};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

use crate::{Result, migrations, queries};

const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Handle to the reference store.
///
/// The connection sits behind a mutex so one handle can be shared across a
/// run: statements and migration transactions execute one at a time.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)?;
        Self::configure(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::configure(conn)
    }

    fn configure(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA synchronous = NORMAL;
             PRAGMA temp_store = MEMORY;",
        )?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        let version = migrations::user_version(&conn)?;
        if version == 0 {
            // page_size and auto_vacuum only stick on an empty file, before WAL
            conn.execute_batch(
                "PRAGMA page_size = 4096;
                 PRAGMA auto_vacuum = INCREMENTAL;",
            )?;
            // In-memory databases answer "memory" here
            let mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
            debug!(journal_mode = %mode, "SQLite persistent pragmas bootstrapped");
        }

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // A panic mid-statement leaves the connection itself usable
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Apply every embedded migration newer than the stored schema version.
    /// Returns the number of migrations applied.
    pub fn apply_pending_migrations(&self, cancel: &CancelToken) -> Result<usize> {
        let mut conn = self.lock();
        migrations::apply(&mut conn, migrations::MIGRATIONS, cancel)
    }

    pub fn schema_version(&self) -> Result<i32> {
        migrations::user_version(&self.lock())
    }

    pub fn find_language_by_extension(&self, ext: &str) -> Result<Option<SourceExtension>> {
        queries::language::find_by_extension(&self.lock(), ext)
    }

    pub fn find_language_by_basename(&self, name: &str) -> Result<Option<SourceBasename>> {
        queries::language::find_by_basename(&self.lock(), name)
    }

    pub fn find_language(&self, id: &str) -> Result<Option<Language>> {
        queries::language::find_language(&self.lock(), id)
    }

    pub fn count_languages(&self) -> Result<usize> {
        queries::language::count(&self.lock())
    }
}
