//! Note/tag repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide note metadata persistence on top of the `notes` relation.
//! - Own tag-link replacement logic (`set_tags`) with atomic semantics.
//! - Compose list filters (title search, folder, tag overlap) in SQL at
//!   query time.
//!
//! # Invariants
//! - `modified_at` is bumped solely by title and text-content updates.
//! - `set_tags` replaces the whole tag set in a single transaction.
//! - Tag values are stored case-sensitively, deduplicated per note.

use crate::model::note::{FolderId, Note, NoteId, NoteSort};
use crate::repo::{RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, TransactionBehavior};
use uuid::Uuid;

const NOTE_SELECT_SQL: &str = "SELECT
    id,
    title,
    created_at,
    modified_at,
    folder_id,
    text_content,
    is_text_only
FROM notes";

/// Query options for note list use-cases.
///
/// All present filters combine with AND semantics; the tag filter matches
/// notes carrying at least one of the requested tags.
#[derive(Debug, Clone, Default)]
pub struct NoteListQuery {
    /// Case-insensitive substring match on the title.
    pub search: Option<String>,
    /// Restrict to one folder.
    pub folder_id: Option<FolderId>,
    /// Match notes carrying at least one of these tags.
    pub tags: Vec<String>,
    pub sort: NoteSort,
}

/// Repository interface for note metadata and tags.
pub trait NoteRepository {
    /// Inserts one note row (and its tag links) and returns its id.
    fn create_note(&mut self, note: &Note) -> RepoResult<NoteId>;
    /// Inserts or fully replaces the note row at `note.id`, tags included.
    /// Used by import/sync merge paths.
    fn upsert_note(&mut self, note: &Note) -> RepoResult<()>;
    /// Gets one note by id.
    fn get_note(&self, id: NoteId) -> RepoResult<Option<Note>>;
    /// Lists notes matching the query filters.
    fn list_notes(&self, query: &NoteListQuery) -> RepoResult<Vec<Note>>;
    /// Replaces the title and bumps `modified_at`. Returns affected rows.
    fn update_title(&self, id: NoteId, title: &str) -> RepoResult<usize>;
    /// Replaces text-only content and bumps `modified_at`. Returns affected
    /// rows.
    fn update_text_content(&self, id: NoteId, content: &str) -> RepoResult<usize>;
    /// Moves the note between folders. Does not bump `modified_at`.
    fn set_folder(&self, id: NoteId, folder_id: Option<FolderId>) -> RepoResult<usize>;
    /// Replaces all tags for one note in one transaction. Does not bump
    /// `modified_at`. Returns 0 when the note does not exist.
    fn set_tags(&mut self, id: NoteId, tags: &[String]) -> RepoResult<usize>;
    /// Returns all distinct tags sorted by value.
    fn list_tags(&self) -> RepoResult<Vec<String>>;
    /// Deletes one note; canvas and tag rows cascade. Returns affected rows.
    fn delete_note(&self, id: NoteId) -> RepoResult<usize>;
}

/// SQLite-backed note repository.
pub struct SqliteNoteRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteNoteRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }
}

impl NoteRepository for SqliteNoteRepository<'_> {
    fn create_note(&mut self, note: &Note) -> RepoResult<NoteId> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO notes (
                id,
                title,
                created_at,
                modified_at,
                folder_id,
                text_content,
                is_text_only
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                note.id.to_string(),
                note.title.as_str(),
                note.created_at,
                note.modified_at,
                note.folder_id.map(|id| id.to_string()),
                note.text_content.as_deref(),
                bool_to_int(note.is_text_only),
            ],
        )?;
        replace_tags_in_tx(&tx, note.id, &note.tags)?;
        tx.commit()?;
        Ok(note.id)
    }

    fn upsert_note(&mut self, note: &Note) -> RepoResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO notes (
                id,
                title,
                created_at,
                modified_at,
                folder_id,
                text_content,
                is_text_only
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                created_at = excluded.created_at,
                modified_at = excluded.modified_at,
                folder_id = excluded.folder_id,
                text_content = excluded.text_content,
                is_text_only = excluded.is_text_only;",
            params![
                note.id.to_string(),
                note.title.as_str(),
                note.created_at,
                note.modified_at,
                note.folder_id.map(|id| id.to_string()),
                note.text_content.as_deref(),
                bool_to_int(note.is_text_only),
            ],
        )?;
        replace_tags_in_tx(&tx, note.id, &note.tags)?;
        tx.commit()?;
        Ok(())
    }

    fn get_note(&self, id: NoteId) -> RepoResult<Option<Note>> {
        let mut stmt = self.conn.prepare(&format!(
            "{NOTE_SELECT_SQL}
             WHERE id = ?1;"
        ))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            let mut note = parse_note_row(row)?;
            note.tags = load_tags_for_note(self.conn, note.id)?;
            return Ok(Some(note));
        }
        Ok(None)
    }

    fn list_notes(&self, query: &NoteListQuery) -> RepoResult<Vec<Note>> {
        let mut sql = format!("{NOTE_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        // LIKE is case-insensitive for ASCII in SQLite, which matches the
        // search box behavior.
        if let Some(search) = query.search.as_deref() {
            sql.push_str(" AND title LIKE ? ESCAPE '\\'");
            bind_values.push(Value::Text(like_pattern(search)));
        }

        if let Some(folder_id) = query.folder_id {
            sql.push_str(" AND folder_id = ?");
            bind_values.push(Value::Text(folder_id.to_string()));
        }

        if !query.tags.is_empty() {
            let placeholders = vec!["?"; query.tags.len()].join(", ");
            sql.push_str(&format!(
                " AND EXISTS (
                    SELECT 1
                    FROM note_tags
                    WHERE note_tags.note_id = notes.id
                      AND note_tags.tag IN ({placeholders})
                )"
            ));
            for tag in &query.tags {
                bind_values.push(Value::Text(tag.clone()));
            }
        }

        sql.push_str(match query.sort {
            NoteSort::CreationOrder => " ORDER BY rowid ASC",
            NoteSort::Title => " ORDER BY title COLLATE NOCASE ASC, id ASC",
            NoteSort::CreatedDesc => " ORDER BY created_at DESC, id ASC",
            NoteSort::ModifiedDesc => " ORDER BY modified_at DESC, id ASC",
        });

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            let mut note = parse_note_row(row)?;
            note.tags = load_tags_for_note(self.conn, note.id)?;
            notes.push(note);
        }
        Ok(notes)
    }

    fn update_title(&self, id: NoteId, title: &str) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "UPDATE notes
             SET
                title = ?2,
                modified_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id.to_string(), title],
        )?;
        Ok(changed)
    }

    fn update_text_content(&self, id: NoteId, content: &str) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "UPDATE notes
             SET
                text_content = ?2,
                modified_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id.to_string(), content],
        )?;
        Ok(changed)
    }

    fn set_folder(&self, id: NoteId, folder_id: Option<FolderId>) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "UPDATE notes SET folder_id = ?2 WHERE id = ?1;",
            params![id.to_string(), folder_id.map(|value| value.to_string())],
        )?;
        Ok(changed)
    }

    fn set_tags(&mut self, id: NoteId, tags: &[String]) -> RepoResult<usize> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let exists: i64 = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM notes WHERE id = ?1);",
            [id.to_string()],
            |row| row.get(0),
        )?;
        if exists == 0 {
            return Ok(0);
        }
        replace_tags_in_tx(&tx, id, tags)?;
        tx.commit()?;
        Ok(1)
    }

    fn list_tags(&self) -> RepoResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT tag FROM note_tags ORDER BY tag ASC;")?;
        let mut rows = stmt.query([])?;
        let mut tags = Vec::new();
        while let Some(row) = rows.next()? {
            tags.push(row.get::<_, String>(0)?);
        }
        Ok(tags)
    }

    fn delete_note(&self, id: NoteId) -> RepoResult<usize> {
        let changed = self
            .conn
            .execute("DELETE FROM notes WHERE id = ?1;", [id.to_string()])?;
        Ok(changed)
    }
}

fn replace_tags_in_tx(
    tx: &rusqlite::Transaction<'_>,
    id: NoteId,
    tags: &[String],
) -> RepoResult<()> {
    let id_text = id.to_string();
    tx.execute(
        "DELETE FROM note_tags WHERE note_id = ?1;",
        [id_text.as_str()],
    )?;
    for tag in tags {
        tx.execute(
            "INSERT OR IGNORE INTO note_tags (note_id, tag) VALUES (?1, ?2);",
            params![id_text.as_str(), tag.as_str()],
        )?;
    }
    Ok(())
}

/// Escapes LIKE metacharacters and wraps the term for substring matching.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if c == '%' || c == '_' || c == '\\' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

pub(crate) fn parse_uuid(value: &str, context: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {context}")))
}

fn parse_note_row(row: &Row<'_>) -> RepoResult<Note> {
    let id_text: String = row.get("id")?;
    let id = parse_uuid(&id_text, "notes.id")?;

    let folder_id = match row.get::<_, Option<String>>("folder_id")? {
        Some(value) => Some(parse_uuid(&value, "notes.folder_id")?),
        None => None,
    };

    let is_text_only = match row.get::<_, i64>("is_text_only")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_text_only value `{other}` in notes.is_text_only"
            )));
        }
    };

    Ok(Note {
        id,
        title: row.get("title")?,
        created_at: row.get("created_at")?,
        modified_at: row.get("modified_at")?,
        folder_id,
        tags: Vec::new(),
        is_text_only,
        text_content: row.get("text_content")?,
    })
}

fn load_tags_for_note(conn: &Connection, id: NoteId) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT tag
         FROM note_tags
         WHERE note_id = ?1
         ORDER BY tag ASC;",
    )?;
    let mut rows = stmt.query([id.to_string()])?;
    let mut tags = Vec::new();
    while let Some(row) = rows.next()? {
        tags.push(row.get::<_, String>(0)?);
    }
    Ok(tags)
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::like_pattern;

    #[test]
    fn like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("50%_done"), "%50\\%\\_done%");
        assert_eq!(like_pattern("back\\slash"), "%back\\\\slash%");
        assert_eq!(like_pattern("plain"), "%plain%");
    }
}
