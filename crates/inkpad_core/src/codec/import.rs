//! Import-side decoding and store application.
//!
//! Decode and application are separate steps: [`decode_note_record`] yields
//! a fully typed [`ImportRecord`] or a [`CodecError`] naming the offending
//! field, and only typed records ever reach the repositories.

use crate::codec::{CodecError, EXPORT_FORMAT_VERSION};
use crate::model::canvas::{CanvasDocument, Stroke, TextElement};
use crate::model::geometry::{Point, Transform};
use crate::model::note::{normalize_tags, Folder, Note, NoteId};
use crate::repo::canvas_repo::{CanvasRepository, SqliteCanvasRepository};
use crate::repo::folder_repo::{FolderRepository, SqliteFolderRepository};
use crate::repo::note_repo::{NoteRepository, SqliteNoteRepository};
use crate::repo::{RepoError, RepoResult};
use log::{info, warn};
use rusqlite::Connection;
use serde_json::Value;
use uuid::Uuid;

/// One fully decoded, type-checked import record.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRecord {
    pub note: ImportedNote,
    pub canvas: ImportedCanvas,
}

/// Note metadata carried by an import record.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedNote {
    /// Present for sync merges; absent records get a fresh id on apply.
    pub id: Option<NoteId>,
    pub title: String,
    pub created_at: i64,
    pub modified_at: i64,
    pub folder_id: Option<Uuid>,
    pub tags: Vec<String>,
    pub is_text_only: bool,
    pub text_content: Option<String>,
}

/// Canvas content carried by an import record.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedCanvas {
    pub strokes: Vec<Stroke>,
    pub text_elements: Vec<TextElement>,
    pub transform: Transform,
    pub scale: f64,
}

/// Outcome of a batch import.
#[derive(Debug, Default)]
pub struct ImportReport {
    /// Ids of successfully applied notes, in input order.
    pub imported: Vec<NoteId>,
    /// One entry per failed record.
    pub failures: Vec<ImportFailure>,
}

/// A single rejected record and the reason it failed.
#[derive(Debug)]
pub struct ImportFailure {
    /// Index of the record within the incoming batch.
    pub index: usize,
    pub reason: CodecError,
}

/// Decodes one note record, type-checking every field before use.
pub fn decode_note_record(value: &Value) -> Result<ImportRecord, CodecError> {
    let record = as_object(value, "record")?;

    if let Some(version) = record.get("version") {
        let version = version.as_str().ok_or(CodecError::WrongType {
            field: "version",
            expected: "a string",
        })?;
        if version != EXPORT_FORMAT_VERSION {
            return Err(CodecError::UnsupportedVersion(version.to_string()));
        }
    }

    let note_value = record.get("note").ok_or(CodecError::MissingField("note"))?;
    let canvas_value = record
        .get("canvas")
        .ok_or(CodecError::MissingField("canvas"))?;

    Ok(ImportRecord {
        note: decode_note(note_value)?,
        canvas: decode_canvas(canvas_value)?,
    })
}

fn decode_note(value: &Value) -> Result<ImportedNote, CodecError> {
    let note = as_object(value, "note")?;

    let id = match note.get("id") {
        None | Some(Value::Null) => None,
        Some(value) => Some(parse_id_value(value)?),
    };

    let title = note
        .get("title")
        .ok_or(CodecError::MissingField("note.title"))?
        .as_str()
        .ok_or(CodecError::WrongType {
            field: "note.title",
            expected: "a string",
        })?
        .to_string();

    let created_at = optional_i64(note.get("created_at"), "note.created_at")?;
    let modified_at = optional_i64(note.get("modified_at"), "note.modified_at")?;

    let folder_id = match note.get("folder_id") {
        None | Some(Value::Null) => None,
        Some(value) => Some(parse_id_value(value)?),
    };

    let tags = match note.get("tags") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(entries)) => {
            let mut tags = Vec::with_capacity(entries.len());
            for entry in entries {
                let tag = entry.as_str().ok_or(CodecError::WrongType {
                    field: "note.tags",
                    expected: "an array of strings",
                })?;
                tags.push(tag.to_string());
            }
            normalize_tags(&tags)
        }
        Some(_) => {
            return Err(CodecError::WrongType {
                field: "note.tags",
                expected: "an array of strings",
            });
        }
    };

    let is_text_only = match note.get("is_text_only") {
        None | Some(Value::Null) => false,
        Some(value) => value.as_bool().ok_or(CodecError::WrongType {
            field: "note.is_text_only",
            expected: "a boolean",
        })?,
    };

    let text_content = match note.get("text_content") {
        None | Some(Value::Null) => None,
        Some(value) => Some(
            value
                .as_str()
                .ok_or(CodecError::WrongType {
                    field: "note.text_content",
                    expected: "a string",
                })?
                .to_string(),
        ),
    };

    Ok(ImportedNote {
        id,
        title,
        created_at,
        modified_at,
        folder_id,
        tags,
        is_text_only,
        text_content,
    })
}

fn decode_canvas(value: &Value) -> Result<ImportedCanvas, CodecError> {
    let canvas = as_object(value, "canvas")?;

    let mut strokes = Vec::new();
    match canvas.get("strokes") {
        None | Some(Value::Null) => {}
        Some(Value::Array(entries)) => {
            for entry in entries {
                let data = entry.as_str().ok_or(CodecError::WrongType {
                    field: "canvas.strokes",
                    expected: "an array of JSON strings",
                })?;
                let stroke = serde_json::from_str::<Stroke>(data)
                    .map_err(|err| CodecError::InvalidStroke(err.to_string()))?;
                strokes.push(stroke);
            }
        }
        Some(_) => {
            return Err(CodecError::WrongType {
                field: "canvas.strokes",
                expected: "an array of JSON strings",
            });
        }
    }

    let mut text_elements = Vec::new();
    match canvas.get("text_elements") {
        None | Some(Value::Null) => {}
        Some(Value::Array(entries)) => {
            for entry in entries {
                text_elements.push(decode_text_element(entry)?);
            }
        }
        Some(_) => {
            return Err(CodecError::WrongType {
                field: "canvas.text_elements",
                expected: "an array of objects",
            });
        }
    }

    let transform = match canvas.get("matrix") {
        None | Some(Value::Null) => Transform::IDENTITY,
        Some(value) => {
            let data = value.as_str().ok_or(CodecError::WrongType {
                field: "canvas.matrix",
                expected: "a JSON string of 16 floats",
            })?;
            let matrix = serde_json::from_str::<[f64; 16]>(data)
                .map_err(|err| CodecError::InvalidMatrix(err.to_string()))?;
            Transform::from_matrix(matrix)
        }
    };

    let scale = match canvas.get("scale") {
        None | Some(Value::Null) => 1.0,
        Some(value) => value.as_f64().ok_or(CodecError::WrongType {
            field: "canvas.scale",
            expected: "a number",
        })?,
    };

    Ok(ImportedCanvas {
        strokes,
        text_elements,
        transform,
        scale,
    })
}

fn decode_text_element(value: &Value) -> Result<TextElement, CodecError> {
    let element = as_object(value, "canvas.text_elements")?;
    let position = element
        .get("position")
        .ok_or(CodecError::MissingField("text_element.position"))?;
    let position = as_object(position, "text_element.position")?;
    let x = position
        .get("x")
        .and_then(Value::as_f64)
        .ok_or(CodecError::WrongType {
            field: "text_element.position.x",
            expected: "a number",
        })?;
    let y = position
        .get("y")
        .and_then(Value::as_f64)
        .ok_or(CodecError::WrongType {
            field: "text_element.position.y",
            expected: "a number",
        })?;
    let text = element
        .get("text")
        .ok_or(CodecError::MissingField("text_element.text"))?
        .as_str()
        .ok_or(CodecError::WrongType {
            field: "text_element.text",
            expected: "a string",
        })?;
    Ok(TextElement::new(Point::new(x, y), text))
}

/// Applies one decoded record to the store.
///
/// A record carrying an id upserts at exactly that id, replacing any
/// existing row; otherwise a fresh id is assigned. Canvas content is
/// replaced through the normal atomic save path; text-only records clear
/// any stale canvas rows instead.
pub fn apply_note_record(conn: &mut Connection, record: &ImportRecord) -> RepoResult<NoteId> {
    let id = record.note.id.unwrap_or_else(Uuid::new_v4);

    // A referenced folder may not exist on this device; such notes land at
    // the root instead of failing the record on the foreign key.
    let folder_id = match record.note.folder_id {
        Some(folder_id) => {
            let repo = SqliteFolderRepository::new(&mut *conn);
            if repo.get_folder(folder_id)?.is_some() {
                Some(folder_id)
            } else {
                warn!(
                    "event=import module=codec status=recovered reason=unknown_folder note_id={id} folder_id={folder_id}"
                );
                None
            }
        }
        None => None,
    };

    let mut note = Note::with_id(id, record.note.title.clone());
    note.created_at = record.note.created_at;
    note.modified_at = record.note.modified_at;
    note.folder_id = folder_id;
    note.tags = record.note.tags.clone();
    note.is_text_only = record.note.is_text_only;
    note.text_content = record.note.text_content.clone();

    {
        let mut repo = SqliteNoteRepository::new(&mut *conn);
        repo.upsert_note(&note)?;
    }

    let mut repo = SqliteCanvasRepository::new(&mut *conn);
    if note.is_text_only {
        // An upsert can flip a note to text-only; stale canvas rows go.
        if repo.has_canvas(id)? {
            repo.delete_canvas(id)?;
        }
    } else {
        let document = CanvasDocument::from_parts(
            id,
            record.canvas.strokes.clone(),
            record.canvas.text_elements.clone(),
            record.canvas.transform,
            record.canvas.scale,
        );
        repo.save_canvas(&document)?;
    }

    Ok(id)
}

/// Imports a backup envelope `{version, notes:[...]}`.
///
/// Malformed records fail one at a time and are reported; storage failures
/// abort, since nothing later could be applied either.
pub fn import_backup(conn: &mut Connection, payload: &Value) -> RepoResult<ImportReport> {
    let envelope =
        as_object(payload, "backup").map_err(|err| RepoError::InvalidData(err.to_string()))?;
    let notes = match envelope.get("notes") {
        Some(Value::Array(entries)) => entries.as_slice(),
        _ => {
            return Err(RepoError::InvalidData(
                "backup payload has no `notes` array".to_string(),
            ));
        }
    };

    let mut report = ImportReport::default();
    for (index, entry) in notes.iter().enumerate() {
        match decode_note_record(entry) {
            Ok(record) => {
                let id = apply_note_record(conn, &record)?;
                report.imported.push(id);
            }
            Err(reason) => {
                warn!(
                    "event=import module=codec status=record_failed index={index} reason={reason}"
                );
                report.failures.push(ImportFailure { index, reason });
            }
        }
    }

    info!(
        "event=import module=codec status=ok imported={} failed={}",
        report.imported.len(),
        report.failures.len()
    );
    Ok(report)
}

/// Imports the parallel folders form `{version, folders:[...]}`.
pub fn import_folders(conn: &mut Connection, payload: &Value) -> RepoResult<ImportReport> {
    let envelope =
        as_object(payload, "backup").map_err(|err| RepoError::InvalidData(err.to_string()))?;
    let folders = match envelope.get("folders") {
        Some(Value::Array(entries)) => entries.as_slice(),
        _ => {
            return Err(RepoError::InvalidData(
                "folders payload has no `folders` array".to_string(),
            ));
        }
    };

    let mut report = ImportReport::default();
    for (index, entry) in folders.iter().enumerate() {
        match decode_folder(entry) {
            Ok(folder) => {
                let repo = SqliteFolderRepository::new(&mut *conn);
                repo.upsert_folder(&folder)?;
                report.imported.push(folder.id);
            }
            Err(reason) => {
                warn!(
                    "event=import module=codec status=record_failed index={index} reason={reason}"
                );
                report.failures.push(ImportFailure { index, reason });
            }
        }
    }
    Ok(report)
}

fn decode_folder(value: &Value) -> Result<Folder, CodecError> {
    let folder = as_object(value, "folder")?;
    let id = match folder.get("id") {
        None | Some(Value::Null) => Uuid::new_v4(),
        Some(value) => parse_id_value(value)?,
    };
    let name = folder
        .get("name")
        .ok_or(CodecError::MissingField("folder.name"))?
        .as_str()
        .ok_or(CodecError::WrongType {
            field: "folder.name",
            expected: "a string",
        })?
        .to_string();
    let created_at = optional_i64(folder.get("created_at"), "folder.created_at")?;
    let sort_order = optional_i64(folder.get("sort_order"), "folder.sort_order")?;
    Ok(Folder {
        id,
        name,
        created_at,
        sort_order,
    })
}

fn as_object<'a>(
    value: &'a Value,
    field: &'static str,
) -> Result<&'a serde_json::Map<String, Value>, CodecError> {
    value.as_object().ok_or(CodecError::WrongType {
        field,
        expected: "an object",
    })
}

fn parse_id_value(value: &Value) -> Result<Uuid, CodecError> {
    let text = value.as_str().ok_or(CodecError::WrongType {
        field: "id",
        expected: "a UUID string",
    })?;
    Uuid::parse_str(text).map_err(|_| CodecError::InvalidId(text.to_string()))
}

fn optional_i64(value: Option<&Value>, field: &'static str) -> Result<i64, CodecError> {
    match value {
        None | Some(Value::Null) => Ok(0),
        Some(value) => value.as_i64().ok_or(CodecError::WrongType {
            field,
            expected: "an integer",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_note_record, CodecError};
    use serde_json::json;

    #[test]
    fn decode_rejects_missing_note_object() {
        let record = json!({"version": "1.0", "canvas": {}});
        assert_eq!(
            decode_note_record(&record).unwrap_err(),
            CodecError::MissingField("note")
        );
    }

    #[test]
    fn decode_rejects_missing_canvas_object() {
        let record = json!({"version": "1.0", "note": {"title": "x"}});
        assert_eq!(
            decode_note_record(&record).unwrap_err(),
            CodecError::MissingField("canvas")
        );
    }

    #[test]
    fn decode_rejects_missing_title() {
        let record = json!({"version": "1.0", "note": {}, "canvas": {}});
        assert_eq!(
            decode_note_record(&record).unwrap_err(),
            CodecError::MissingField("note.title")
        );
    }

    #[test]
    fn decode_rejects_unparseable_matrix() {
        let record = json!({
            "version": "1.0",
            "note": {"title": "x"},
            "canvas": {"matrix": "[1, 2, 3]"},
        });
        assert!(matches!(
            decode_note_record(&record).unwrap_err(),
            CodecError::InvalidMatrix(_)
        ));
    }

    #[test]
    fn decode_rejects_wrongly_typed_title() {
        let record = json!({
            "version": "1.0",
            "note": {"title": 42},
            "canvas": {},
        });
        assert!(matches!(
            decode_note_record(&record).unwrap_err(),
            CodecError::WrongType { field: "note.title", .. }
        ));
    }

    #[test]
    fn decode_accepts_minimal_record() {
        let record = json!({
            "version": "1.0",
            "note": {"title": "minimal"},
            "canvas": {},
        });
        let decoded = decode_note_record(&record).unwrap();
        assert_eq!(decoded.note.title, "minimal");
        assert!(decoded.note.id.is_none());
        assert!(decoded.canvas.strokes.is_empty());
        assert_eq!(decoded.canvas.scale, 1.0);
    }

    #[test]
    fn decode_rejects_unsupported_version() {
        let record = json!({
            "version": "9.9",
            "note": {"title": "x"},
            "canvas": {},
        });
        assert_eq!(
            decode_note_record(&record).unwrap_err(),
            CodecError::UnsupportedVersion("9.9".to_string())
        );
    }
}
