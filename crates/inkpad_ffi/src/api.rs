//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose stable, use-case-level functions to Dart via FRB.
//! - Keep error semantics simple for UI integration.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - Canvas content crosses the boundary as the versioned record JSON also
//!   used by backups and sync, so the UI and the store cannot disagree on
//!   the shape.

use inkpad_core::codec::export::export_note_record;
use inkpad_core::codec::import::{apply_note_record, decode_note_record};
use inkpad_core::db::open_db;
use inkpad_core::service::note_service::derive_text_preview;
use inkpad_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    CanvasRepository, Note, NoteListQuery, NoteService, SqliteCanvasRepository,
    SqliteNoteRepository,
};
use log::warn;
use std::path::PathBuf;
use std::sync::OnceLock;
use uuid::Uuid;

const DB_FILE_NAME: &str = "inkpad.sqlite3";
static DB_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on
///   failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Note summary row for list screens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteListItem {
    /// Stable note ID in string form.
    pub note_id: String,
    pub title: String,
    /// Epoch milliseconds of the last metadata edit.
    pub modified_at: i64,
    pub is_text_only: bool,
    pub tags: Vec<String>,
    /// Plain-text preview for text-only notes, markup stripped.
    pub preview: Option<String>,
}

/// List response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteListResponse {
    pub items: Vec<NoteListItem>,
    /// Human-readable response message for diagnostics.
    pub message: String,
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteActionResponse {
    /// Whether the operation succeeded.
    pub ok: bool,
    /// Affected note ID on success.
    pub note_id: Option<String>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl NoteActionResponse {
    fn success(message: impl Into<String>, note_id: String) -> Self {
        Self {
            ok: true,
            note_id: Some(note_id),
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            note_id: None,
            message: message.into(),
        }
    }
}

/// Record response envelope carrying one note record as JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteRecordResponse {
    pub ok: bool,
    /// Versioned `{version, note, canvas}` record JSON.
    pub record_json: Option<String>,
    pub message: String,
}

/// Lists all notes with newest-modified first.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics; failures return an empty list with a message.
#[flutter_rust_bridge::frb(sync)]
pub fn list_notes() -> NoteListResponse {
    let db_path = resolve_db_path();
    let mut conn = match open_db(&db_path) {
        Ok(conn) => conn,
        Err(err) => {
            return NoteListResponse {
                items: Vec::new(),
                message: format!("list_notes failed: {err}"),
            };
        }
    };

    let service = NoteService::new(SqliteNoteRepository::new(&mut conn));
    match service.list_notes(&NoteListQuery {
        sort: inkpad_core::NoteSort::ModifiedDesc,
        ..NoteListQuery::default()
    }) {
        Ok(notes) => {
            let items: Vec<NoteListItem> = notes.into_iter().map(to_list_item).collect();
            let message = format!("{} note(s).", items.len());
            NoteListResponse { items, message }
        }
        Err(err) => NoteListResponse {
            items: Vec::new(),
            message: format!("list_notes failed: {err}"),
        },
    }
}

/// Creates one canvas note.
#[flutter_rust_bridge::frb(sync)]
pub fn create_note(title: String) -> NoteActionResponse {
    with_note_service(|service| service.create_note(&title).map(|note| note.id))
        .map(|id| NoteActionResponse::success("Note created.", id.to_string()))
        .unwrap_or_else(|err| NoteActionResponse::failure(format!("create_note failed: {err}")))
}

/// Creates one text-only note.
#[flutter_rust_bridge::frb(sync)]
pub fn create_text_note(title: String, content: String) -> NoteActionResponse {
    with_note_service(|service| {
        service
            .create_text_note(&title, &content)
            .map(|note| note.id)
    })
    .map(|id| NoteActionResponse::success("Note created.", id.to_string()))
    .unwrap_or_else(|err| NoteActionResponse::failure(format!("create_text_note failed: {err}")))
}

/// Renames one note. This is a metadata edit and bumps `modified_at`.
#[flutter_rust_bridge::frb(sync)]
pub fn rename_note(note_id: String, title: String) -> NoteActionResponse {
    let Ok(id) = Uuid::parse_str(note_id.trim()) else {
        return NoteActionResponse::failure(format!("rename_note failed: invalid id `{note_id}`"));
    };
    with_note_service(|service| service.rename_note(id, &title).map(|note| note.id))
        .map(|id| NoteActionResponse::success("Note renamed.", id.to_string()))
        .unwrap_or_else(|err| NoteActionResponse::failure(format!("rename_note failed: {err}")))
}

/// Deletes one note with its canvas content and tag links.
#[flutter_rust_bridge::frb(sync)]
pub fn delete_note(note_id: String) -> NoteActionResponse {
    let Ok(id) = Uuid::parse_str(note_id.trim()) else {
        return NoteActionResponse::failure(format!("delete_note failed: invalid id `{note_id}`"));
    };
    with_note_service(|service| service.delete_note(id).map(|()| id))
        .map(|id| NoteActionResponse::success("Note deleted.", id.to_string()))
        .unwrap_or_else(|err| NoteActionResponse::failure(format!("delete_note failed: {err}")))
}

/// Loads one note plus its canvas as the versioned record JSON.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Degenerate persisted view state arrives already recovered to the
///   identity view.
#[flutter_rust_bridge::frb(sync)]
pub fn load_note_record(note_id: String) -> NoteRecordResponse {
    let Ok(id) = Uuid::parse_str(note_id.trim()) else {
        return record_failure(format!("load_note_record failed: invalid id `{note_id}`"));
    };
    let db_path = resolve_db_path();
    let mut conn = match open_db(&db_path) {
        Ok(conn) => conn,
        Err(err) => return record_failure(format!("load_note_record failed: {err}")),
    };

    let note = {
        let service = NoteService::new(SqliteNoteRepository::new(&mut conn));
        match service.get_note(id) {
            Ok(Some(note)) => note,
            Ok(None) => return record_failure(format!("load_note_record failed: not found {id}")),
            Err(err) => return record_failure(format!("load_note_record failed: {err}")),
        }
    };

    let document = {
        let repo = SqliteCanvasRepository::new(&mut conn);
        match repo.load_canvas(id) {
            Ok(document) => document,
            Err(err) => return record_failure(format!("load_note_record failed: {err}")),
        }
    };

    match export_note_record(&note, &document) {
        Ok(record) => NoteRecordResponse {
            ok: true,
            record_json: Some(record.to_string()),
            message: String::new(),
        },
        Err(err) => record_failure(format!("load_note_record failed: {err}")),
    }
}

/// Applies one record JSON to the store, exactly as a normal import.
///
/// Used both for saving edited canvases and for sync-applied records.
#[flutter_rust_bridge::frb(sync)]
pub fn store_note_record(record_json: String) -> NoteActionResponse {
    let value: serde_json::Value = match serde_json::from_str(&record_json) {
        Ok(value) => value,
        Err(err) => {
            return NoteActionResponse::failure(format!("store_note_record failed: {err}"));
        }
    };
    let record = match decode_note_record(&value) {
        Ok(record) => record,
        Err(err) => {
            return NoteActionResponse::failure(format!("store_note_record failed: {err}"));
        }
    };

    let db_path = resolve_db_path();
    let mut conn = match open_db(&db_path) {
        Ok(conn) => conn,
        Err(err) => {
            return NoteActionResponse::failure(format!("store_note_record failed: {err}"));
        }
    };
    match apply_note_record(&mut conn, &record) {
        Ok(id) => NoteActionResponse::success("Record stored.", id.to_string()),
        Err(err) => {
            warn!("event=store_note_record module=ffi status=error error={err}");
            NoteActionResponse::failure(format!("store_note_record failed: {err}"))
        }
    }
}

fn record_failure(message: String) -> NoteRecordResponse {
    NoteRecordResponse {
        ok: false,
        record_json: None,
        message,
    }
}

fn to_list_item(note: Note) -> NoteListItem {
    let preview = note
        .text_content
        .as_deref()
        .and_then(derive_text_preview);
    NoteListItem {
        note_id: note.id.to_string(),
        title: note.title,
        modified_at: note.modified_at,
        is_text_only: note.is_text_only,
        tags: note.tags,
        preview,
    }
}

fn resolve_db_path() -> PathBuf {
    DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var("INKPAD_DB_PATH") {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(DB_FILE_NAME)
        })
        .clone()
}

fn with_note_service<T>(
    f: impl FnOnce(&mut NoteService<SqliteNoteRepository<'_>>) -> Result<T, inkpad_core::NoteServiceError>,
) -> Result<T, String> {
    let db_path = resolve_db_path();
    let mut conn = open_db(&db_path).map_err(|err| format!("store open failed: {err}"))?;
    let mut service = NoteService::new(SqliteNoteRepository::new(&mut conn));
    f(&mut service).map_err(|err| err.to_string())
}
