//! Canvas content persistence: strokes, text elements, view state.
//!
//! # Responsibility
//! - Replace-on-save the full canvas content for one note atomically.
//! - Restore canvas documents with ordered content and a validated view.
//!
//! # Invariants
//! - `save_canvas` commits all four steps (stroke delete+insert, text
//!   delete+insert, view-state upsert) together or not at all; a crash
//!   mid-save leaves the previous content fully intact.
//! - Canvas writes never touch the `notes` relation, so `modified_at` is
//!   unaffected by drawing.
//! - Restored geometry is sanitized: a degenerate matrix or invalid scale
//!   loads as identity/1.0 and is reported as recovered, not as an error.

use crate::model::canvas::{CanvasDocument, Stroke, TextElement};
use crate::model::geometry::{sanitize_scale, Point, Transform};
use crate::model::note::NoteId;
use crate::repo::{RepoError, RepoResult};
use log::warn;
use rusqlite::{params, Connection, TransactionBehavior};

/// Repository interface for per-note canvas content.
pub trait CanvasRepository {
    /// Atomically replaces all persisted canvas content for the document's
    /// note. On failure nothing is written and the in-memory document is
    /// untouched, so the caller can retry the same save.
    fn save_canvas(&mut self, document: &CanvasDocument) -> RepoResult<()>;
    /// Restores the canvas content for one note.
    ///
    /// Absent rows load as an empty document; an absent view-state row loads
    /// as identity transform and scale 1.0.
    fn load_canvas(&self, note_id: NoteId) -> RepoResult<CanvasDocument>;
    /// Removes all canvas rows for one note. Used when a note is converted
    /// to text-only.
    fn delete_canvas(&mut self, note_id: NoteId) -> RepoResult<()>;
    /// Whether any canvas rows exist for one note.
    fn has_canvas(&self, note_id: NoteId) -> RepoResult<bool>;
}

/// SQLite-backed canvas repository.
pub struct SqliteCanvasRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteCanvasRepository<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }
}

impl CanvasRepository for SqliteCanvasRepository<'_> {
    fn save_canvas(&mut self, document: &CanvasDocument) -> RepoResult<()> {
        let note_id = document.note_id().to_string();
        let matrix_data = serde_json::to_string(document.transform().matrix())
            .map_err(|err| RepoError::InvalidData(format!("matrix encode: {err}")))?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute("DELETE FROM strokes WHERE note_id = ?1;", [note_id.as_str()])?;
        tx.execute(
            "DELETE FROM text_elements WHERE note_id = ?1;",
            [note_id.as_str()],
        )?;

        {
            let mut insert_stroke = tx.prepare(
                "INSERT INTO strokes (note_id, stroke_index, data)
                 VALUES (?1, ?2, ?3);",
            )?;
            for (index, stroke) in document.strokes().iter().enumerate() {
                let data = serde_json::to_string(stroke)
                    .map_err(|err| RepoError::InvalidData(format!("stroke encode: {err}")))?;
                insert_stroke.execute(params![note_id.as_str(), index as i64, data])?;
            }

            let mut insert_text = tx.prepare(
                "INSERT INTO text_elements (note_id, text_index, position_x, position_y, text)
                 VALUES (?1, ?2, ?3, ?4, ?5);",
            )?;
            for (index, element) in document.text_elements().iter().enumerate() {
                insert_text.execute(params![
                    note_id.as_str(),
                    index as i64,
                    element.position.x,
                    element.position.y,
                    element.text.as_str(),
                ])?;
            }
        }

        tx.execute(
            "INSERT INTO canvas_state (note_id, matrix_data, scale)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(note_id) DO UPDATE SET
                matrix_data = excluded.matrix_data,
                scale = excluded.scale;",
            params![note_id.as_str(), matrix_data, document.scale()],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn load_canvas(&self, note_id: NoteId) -> RepoResult<CanvasDocument> {
        let id_text = note_id.to_string();

        let mut strokes: Vec<Stroke> = Vec::new();
        {
            let mut stmt = self.conn.prepare(
                "SELECT data
                 FROM strokes
                 WHERE note_id = ?1
                 ORDER BY stroke_index ASC;",
            )?;
            let mut rows = stmt.query([id_text.as_str()])?;
            while let Some(row) = rows.next()? {
                let data: String = row.get(0)?;
                match serde_json::from_str::<Stroke>(&data) {
                    Ok(stroke) => strokes.push(stroke),
                    Err(err) => {
                        warn!(
                            "event=canvas_load module=repo status=recovered reason=malformed_stroke_row note_id={id_text} error={err}"
                        );
                    }
                }
            }
        }

        let mut text_elements: Vec<TextElement> = Vec::new();
        {
            let mut stmt = self.conn.prepare(
                "SELECT position_x, position_y, text
                 FROM text_elements
                 WHERE note_id = ?1
                 ORDER BY text_index ASC;",
            )?;
            let mut rows = stmt.query([id_text.as_str()])?;
            while let Some(row) = rows.next()? {
                let x: f64 = row.get(0)?;
                let y: f64 = row.get(1)?;
                let text: String = row.get(2)?;
                text_elements.push(TextElement::new(Point::new(x, y), text));
            }
        }

        let (transform, scale) = self.load_view_state(&id_text)?;

        Ok(CanvasDocument::from_parts(
            note_id,
            strokes,
            text_elements,
            transform,
            scale,
        ))
    }

    fn delete_canvas(&mut self, note_id: NoteId) -> RepoResult<()> {
        let id_text = note_id.to_string();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute("DELETE FROM strokes WHERE note_id = ?1;", [id_text.as_str()])?;
        tx.execute(
            "DELETE FROM text_elements WHERE note_id = ?1;",
            [id_text.as_str()],
        )?;
        tx.execute(
            "DELETE FROM canvas_state WHERE note_id = ?1;",
            [id_text.as_str()],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn has_canvas(&self, note_id: NoteId) -> RepoResult<bool> {
        let id_text = note_id.to_string();
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM strokes WHERE note_id = ?1
                UNION SELECT 1 FROM text_elements WHERE note_id = ?1
                UNION SELECT 1 FROM canvas_state WHERE note_id = ?1
            );",
            [id_text.as_str()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}

impl SqliteCanvasRepository<'_> {
    /// Reads the view-state row, recovering invalid geometry to the
    /// identity/1.0 fallback.
    fn load_view_state(&self, note_id: &str) -> RepoResult<(Transform, f64)> {
        let mut stmt = self.conn.prepare(
            "SELECT matrix_data, scale
             FROM canvas_state
             WHERE note_id = ?1;",
        )?;
        let mut rows = stmt.query([note_id])?;
        let Some(row) = rows.next()? else {
            return Ok((Transform::IDENTITY, 1.0));
        };

        let matrix_data: String = row.get(0)?;
        let scale: f64 = row.get(1)?;

        let transform = match serde_json::from_str::<[f64; 16]>(&matrix_data) {
            Ok(matrix) => Transform::from_matrix(matrix),
            Err(err) => {
                warn!(
                    "event=canvas_load module=repo status=recovered reason=unparseable_matrix note_id={note_id} error={err}"
                );
                return Ok((Transform::IDENTITY, 1.0));
            }
        };

        if transform.is_degenerate() || sanitize_scale(scale) != scale {
            warn!(
                "event=canvas_load module=repo status=recovered reason=degenerate_transform note_id={note_id}"
            );
            return Ok((Transform::IDENTITY, 1.0));
        }

        Ok((transform, scale))
    }
}
