use cargoworker_types::{Language, SourceBasename, SourceExtension};
use rusqlite::{Connection, OptionalExtension};

use crate::Result;

pub fn find_by_extension(conn: &Connection, ext: &str) -> Result<Option<SourceExtension>> {
    let result = conn
        .query_row(
            r#"
        SELECT ext, language_id, is_text, is_primary, notes
        FROM source_extensions
        WHERE ext = ?1
        "#,
            [ext],
            |row| {
                Ok(SourceExtension {
                    extension: row.get(0)?,
                    language_id: row.get(1)?,
                    is_text: row.get(2)?,
                    is_primary: row.get(3)?,
                    notes: row.get(4)?,
                })
            },
        )
        .optional()?;

    Ok(result)
}

pub fn find_by_basename(conn: &Connection, name: &str) -> Result<Option<SourceBasename>> {
    let result = conn
        .query_row(
            r#"
        SELECT name, language_id, is_text, notes
        FROM source_basenames
        WHERE name = ?1
        "#,
            [name],
            |row| {
                Ok(SourceBasename {
                    name: row.get(0)?,
                    language_id: row.get(1)?,
                    is_text: row.get(2)?,
                    notes: row.get(3)?,
                })
            },
        )
        .optional()?;

    Ok(result)
}

pub fn find_language(conn: &Connection, id: &str) -> Result<Option<Language>> {
    let result = conn
        .query_row(
            r#"
        SELECT id, name, ecosystem
        FROM languages
        WHERE id = ?1
        "#,
            [id],
            |row| {
                Ok(Language {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    ecosystem: row.get(2)?,
                })
            },
        )
        .optional()?;

    Ok(result)
}

pub fn count(conn: &Connection) -> Result<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM languages", [], |row| row.get(0))?;
    Ok(count as usize)
}
