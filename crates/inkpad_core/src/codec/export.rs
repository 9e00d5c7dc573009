//! Export-side encoding to the versioned backup/sync format.

use crate::codec::EXPORT_FORMAT_VERSION;
use crate::model::canvas::CanvasDocument;
use crate::model::note::{Folder, Note};
use crate::model::now_epoch_ms;
use crate::repo::RepoError;
use serde_json::{json, Value};

/// Encodes one note plus its canvas document as a self-describing record:
/// `{version, note:{...}, canvas:{strokes, text_elements, matrix, scale}}`.
///
/// Strokes and the matrix are carried as JSON strings, matching their
/// on-disk column encoding, so records round-trip bit-for-bit through
/// storage.
pub fn export_note_record(note: &Note, document: &CanvasDocument) -> Result<Value, RepoError> {
    let mut strokes = Vec::with_capacity(document.strokes().len());
    for stroke in document.strokes() {
        let data = serde_json::to_string(stroke)
            .map_err(|err| RepoError::InvalidData(format!("stroke encode: {err}")))?;
        strokes.push(Value::String(data));
    }

    let text_elements: Vec<Value> = document
        .text_elements()
        .iter()
        .map(|element| {
            json!({
                "position": {"x": element.position.x, "y": element.position.y},
                "text": element.text,
            })
        })
        .collect();

    let matrix = serde_json::to_string(document.transform().matrix())
        .map_err(|err| RepoError::InvalidData(format!("matrix encode: {err}")))?;

    let mut note_value = json!({
        "id": note.id.to_string(),
        "title": note.title,
        "created_at": note.created_at,
        "modified_at": note.modified_at,
        "is_text_only": note.is_text_only,
    });
    if let Some(folder_id) = note.folder_id {
        note_value["folder_id"] = Value::String(folder_id.to_string());
    }
    if !note.tags.is_empty() {
        note_value["tags"] = json!(note.tags);
    }
    if let Some(content) = note.text_content.as_deref() {
        note_value["text_content"] = Value::String(content.to_string());
    }

    Ok(json!({
        "version": EXPORT_FORMAT_VERSION,
        "note": note_value,
        "canvas": {
            "strokes": strokes,
            "text_elements": text_elements,
            "matrix": matrix,
            "scale": document.scale(),
        },
    }))
}

/// Wraps note records in the backup file envelope.
pub fn export_backup(note_records: Vec<Value>) -> Value {
    json!({
        "version": EXPORT_FORMAT_VERSION,
        "export_date": now_epoch_ms(),
        "notes": note_records,
    })
}

/// Encodes the parallel folders backup form.
pub fn export_folders(folders: &[Folder]) -> Value {
    let entries: Vec<Value> = folders
        .iter()
        .map(|folder| {
            json!({
                "id": folder.id.to_string(),
                "name": folder.name,
                "created_at": folder.created_at,
                "sort_order": folder.sort_order,
            })
        })
        .collect();
    json!({
        "version": EXPORT_FORMAT_VERSION,
        "folders": entries,
    })
}
