use cargoworker_types::CancelToken;
use rusqlite::Connection;
use tracing::{debug, info};

use crate::{Error, Result};

/// One embedded schema step. `version` is written to `PRAGMA user_version`
/// in the same transaction as `sql`.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i32,
    pub name: &'static str,
    pub sql: &'static str,
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "0001_languages.sql",
        sql: include_str!("../migrations/0001_languages.sql"),
    },
    Migration {
        version: 2,
        name: "0002_seed_languages.sql",
        sql: include_str!("../migrations/0002_seed_languages.sql"),
    },
];

/// Highest version among the embedded migrations
pub fn latest_version() -> i32 {
    MIGRATIONS.iter().map(|m| m.version).max().unwrap_or(0)
}

pub(crate) fn user_version(conn: &Connection) -> Result<i32> {
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}

pub(crate) fn apply(
    conn: &mut Connection,
    migrations: &[Migration],
    cancel: &CancelToken,
) -> Result<usize> {
    let current = user_version(conn)?;

    let mut pending: Vec<&Migration> = migrations.iter().filter(|m| m.version > current).collect();
    pending.sort_by_key(|m| m.version);

    if pending.is_empty() {
        debug!(version = current, "Schema up to date");
        return Ok(0);
    }

    for migration in &pending {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        apply_one(conn, migration).map_err(|source| Error::Migration {
            name: migration.name,
            source,
        })?;
        info!(
            name = migration.name,
            version = migration.version,
            "Applied migration"
        );
    }

    Ok(pending.len())
}

// Dropping the transaction without commit rolls it back
fn apply_one(conn: &mut Connection, migration: &Migration) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(migration.sql)?;
    tx.execute_batch(&format!("PRAGMA user_version = {}", migration.version))?;
    tx.commit()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_exists(conn: &Connection, name: &str) -> bool {
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |row| row.get::<_, i64>(0),
        )
        .map(|count| count > 0)
        .unwrap_or(false)
    }

    #[test]
    fn test_apply_all_then_nothing() -> Result<()> {
        let mut conn = Connection::open_in_memory()?;
        let cancel = CancelToken::new();

        let applied = apply(&mut conn, MIGRATIONS, &cancel)?;
        assert_eq!(applied, MIGRATIONS.len());
        assert_eq!(user_version(&conn)?, latest_version());

        let again = apply(&mut conn, MIGRATIONS, &cancel)?;
        assert_eq!(again, 0);

        Ok(())
    }

    #[test]
    fn test_out_of_order_list_applies_by_version() -> Result<()> {
        let mut conn = Connection::open_in_memory()?;
        let reversed: Vec<Migration> = MIGRATIONS.iter().rev().copied().collect();

        apply(&mut conn, &reversed, &CancelToken::new())?;
        assert_eq!(user_version(&conn)?, latest_version());

        Ok(())
    }

    #[test]
    fn test_failed_migration_rolls_back() -> Result<()> {
        let mut conn = Connection::open_in_memory()?;
        let broken = [
            MIGRATIONS[0],
            Migration {
                version: 2,
                name: "0002_broken.sql",
                sql: "CREATE TABLE half_done (id INTEGER); INSERT INTO missing_table VALUES (1);",
            },
        ];

        let err = apply(&mut conn, &broken, &CancelToken::new()).unwrap_err();
        match err {
            Error::Migration { name, .. } => assert_eq!(name, "0002_broken.sql"),
            other => panic!("expected migration error, got {other}"),
        }

        assert_eq!(user_version(&conn)?, 1);
        assert!(table_exists(&conn, "languages"));
        assert!(!table_exists(&conn, "half_done"));

        Ok(())
    }

    #[test]
    fn test_cancelled_before_first_migration() -> Result<()> {
        let mut conn = Connection::open_in_memory()?;
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = apply(&mut conn, MIGRATIONS, &cancel).unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert_eq!(user_version(&conn)?, 0);

        Ok(())
    }
}
