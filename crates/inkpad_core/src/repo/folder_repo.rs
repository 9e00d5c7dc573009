//! Folder repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide folder CRUD over the `folders` relation.
//! - Keep the delete semantics in one place: deleting a folder re-parents
//!   its notes to the root, it never cascades note deletion.
//!
//! # Invariants
//! - Folder listing is deterministic: `sort_order ASC, name ASC`.
//! - `delete_folder` nulls `notes.folder_id` and removes the folder row in
//!   the same transaction.

use crate::model::note::{Folder, FolderId};
use crate::repo::note_repo::parse_uuid;
use crate::repo::RepoResult;
use rusqlite::{params, Connection, Row, TransactionBehavior};

const FOLDER_SELECT_SQL: &str = "SELECT
    id,
    name,
    created_at,
    sort_order
FROM folders";

/// Repository interface for folder operations.
pub trait FolderRepository {
    /// Inserts one folder row and returns its id.
    fn create_folder(&self, folder: &Folder) -> RepoResult<FolderId>;
    /// Inserts or fully replaces the folder row at `folder.id`. Used by
    /// import paths.
    fn upsert_folder(&self, folder: &Folder) -> RepoResult<()>;
    /// Gets one folder by id.
    fn get_folder(&self, id: FolderId) -> RepoResult<Option<Folder>>;
    /// Lists all folders in display order.
    fn list_folders(&self) -> RepoResult<Vec<Folder>>;
    /// Renames one folder. Returns affected rows.
    fn rename_folder(&self, id: FolderId, name: &str) -> RepoResult<usize>;
    /// Deletes one folder, re-parenting its notes to the root. Returns the
    /// number of folder rows removed (0 when absent).
    fn delete_folder(&mut self, id: FolderId) -> RepoResult<usize>;
    /// Sort order one past the current maximum, for appending new folders.
    fn next_sort_order(&self) -> RepoResult<i64>;
}

/// SQLite-backed folder repository.
pub struct SqliteFolderRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteFolderRepository<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }
}

impl FolderRepository for SqliteFolderRepository<'_> {
    fn create_folder(&self, folder: &Folder) -> RepoResult<FolderId> {
        self.conn.execute(
            "INSERT INTO folders (id, name, created_at, sort_order)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                folder.id.to_string(),
                folder.name.as_str(),
                folder.created_at,
                folder.sort_order,
            ],
        )?;
        Ok(folder.id)
    }

    fn upsert_folder(&self, folder: &Folder) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO folders (id, name, created_at, sort_order)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                created_at = excluded.created_at,
                sort_order = excluded.sort_order;",
            params![
                folder.id.to_string(),
                folder.name.as_str(),
                folder.created_at,
                folder.sort_order,
            ],
        )?;
        Ok(())
    }

    fn get_folder(&self, id: FolderId) -> RepoResult<Option<Folder>> {
        let mut stmt = self.conn.prepare(&format!(
            "{FOLDER_SELECT_SQL}
             WHERE id = ?1;"
        ))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_folder_row(row)?));
        }
        Ok(None)
    }

    fn list_folders(&self) -> RepoResult<Vec<Folder>> {
        let mut stmt = self.conn.prepare(&format!(
            "{FOLDER_SELECT_SQL}
             ORDER BY sort_order ASC, name COLLATE NOCASE ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut folders = Vec::new();
        while let Some(row) = rows.next()? {
            folders.push(parse_folder_row(row)?);
        }
        Ok(folders)
    }

    fn rename_folder(&self, id: FolderId, name: &str) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "UPDATE folders SET name = ?2 WHERE id = ?1;",
            params![id.to_string(), name],
        )?;
        Ok(changed)
    }

    fn delete_folder(&mut self, id: FolderId) -> RepoResult<usize> {
        let id_text = id.to_string();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "UPDATE notes SET folder_id = NULL WHERE folder_id = ?1;",
            [id_text.as_str()],
        )?;
        let removed = tx.execute("DELETE FROM folders WHERE id = ?1;", [id_text.as_str()])?;
        tx.commit()?;
        Ok(removed)
    }

    fn next_sort_order(&self) -> RepoResult<i64> {
        let max: Option<i64> =
            self.conn
                .query_row("SELECT MAX(sort_order) FROM folders;", [], |row| row.get(0))?;
        Ok(max.unwrap_or(-1) + 1)
    }
}

fn parse_folder_row(row: &Row<'_>) -> RepoResult<Folder> {
    let id_text: String = row.get("id")?;
    Ok(Folder {
        id: parse_uuid(&id_text, "folders.id")?,
        name: row.get("name")?,
        created_at: row.get("created_at")?,
        sort_order: row.get("sort_order")?,
    })
}
