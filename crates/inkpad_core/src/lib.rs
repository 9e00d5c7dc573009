//! Core document engine for Inkpad.
//! This crate is the single source of truth for canvas and note invariants.

pub mod codec;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod sync;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::canvas::{CanvasDocument, Rgba, Stroke, StrokeId, StrokePoint, TextElement};
pub use model::event::CanvasEvent;
pub use model::geometry::{content_bounds, sanitize_scale, Point, Rect, Transform};
pub use model::note::{Folder, FolderId, Note, NoteId, NoteSort};
pub use repo::canvas_repo::{CanvasRepository, SqliteCanvasRepository};
pub use repo::folder_repo::{FolderRepository, SqliteFolderRepository};
pub use repo::note_repo::{NoteListQuery, NoteRepository, SqliteNoteRepository};
pub use repo::{RepoError, RepoResult};
pub use service::canvas_service::{CanvasSession, CanvasSessionError};
pub use service::folder_service::{FolderService, FolderServiceError};
pub use service::note_service::{NoteService, NoteServiceError};
pub use sync::{StoreSyncDelegate, SyncDelegate, SyncSummary, SyncTransport};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
