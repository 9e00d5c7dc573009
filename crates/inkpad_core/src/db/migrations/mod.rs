//! SQLite migration registry and executor.
//!
//! # Responsibility
//! - Register schema migrations in strictly increasing order.
//! - Apply pending migrations atomically.
//!
//! # Invariants
//! - `version` values must remain monotonic.
//! - Applied migration version is mirrored to `PRAGMA user_version`.
//! - Every step is idempotent-safe: table creation uses `IF NOT EXISTS` and
//!   column additions are guarded by existence checks, so re-running a
//!   partially applied migration cannot corrupt state.

use crate::db::{DbError, DbResult};
use rusqlite::{Connection, Transaction};

#[derive(Clone, Copy)]
struct Migration {
    version: u32,
    apply: fn(&Transaction<'_>) -> DbResult<()>,
}

/// Schema history:
/// v1 base tables (notes, strokes, text_elements, canvas_state),
/// v2 tags (legacy `notes.tags` column + `note_tags` join),
/// v3 folders (+ `notes.folder_id`),
/// v4 `notes.text_content`,
/// v5 `notes.is_text_only`.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        apply: migrate_v1_base_tables,
    },
    Migration {
        version: 2,
        apply: migrate_v2_tags,
    },
    Migration {
        version: 3,
        apply: migrate_v3_folders,
    },
    Migration {
        version: 4,
        apply: migrate_v4_text_content,
    },
    Migration {
        version: 5,
        apply: migrate_v5_is_text_only,
    },
];

/// Returns the latest migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Applies all pending migrations on the provided connection.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let current_version = current_user_version(conn)?;
    let latest = latest_version();

    if current_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: latest,
        });
    }

    if current_version == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }

        (migration.apply)(&tx)?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
    }
    tx.commit()?;

    Ok(())
}

fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

fn migrate_v1_base_tables(tx: &Transaction<'_>) -> DbResult<()> {
    tx.execute_batch(include_str!("0001_init.sql"))?;
    Ok(())
}

fn migrate_v2_tags(tx: &Transaction<'_>) -> DbResult<()> {
    tx.execute_batch(include_str!("0002_tags.sql"))?;
    // Legacy denormalized tag column, superseded by note_tags but kept so v2
    // databases written by older builds stay readable.
    add_column_if_missing(tx, "notes", "tags", "TEXT")?;
    Ok(())
}

fn migrate_v3_folders(tx: &Transaction<'_>) -> DbResult<()> {
    tx.execute_batch(include_str!("0003_folders.sql"))?;
    add_column_if_missing(tx, "notes", "folder_id", "TEXT REFERENCES folders(id)")?;
    Ok(())
}

fn migrate_v4_text_content(tx: &Transaction<'_>) -> DbResult<()> {
    add_column_if_missing(tx, "notes", "text_content", "TEXT")
}

fn migrate_v5_is_text_only(tx: &Transaction<'_>) -> DbResult<()> {
    add_column_if_missing(tx, "notes", "is_text_only", "INTEGER NOT NULL DEFAULT 0")
}

fn add_column_if_missing(
    tx: &Transaction<'_>,
    table: &str,
    column: &str,
    declaration: &str,
) -> DbResult<()> {
    if table_has_column(tx, table, column)? {
        return Ok(());
    }
    tx.execute_batch(&format!(
        "ALTER TABLE {table} ADD COLUMN {column} {declaration};"
    ))?;
    Ok(())
}

fn table_has_column(tx: &Transaction<'_>, table: &str, column: &str) -> DbResult<bool> {
    let mut stmt = tx.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
