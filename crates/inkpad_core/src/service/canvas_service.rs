//! Canvas editing session: event consumption and persistence cadence.
//!
//! # Responsibility
//! - Own the one live `CanvasDocument` for the note being edited.
//! - Consume `CanvasEvent` values emitted by the gesture layer.
//! - Throttle persistence to stroke commits, gesture ends, text commits and
//!   periodic checkpoints, never to individual appended points.
//!
//! # Invariants
//! - The session holds the store connection exclusively, so saves for its
//!   note are strictly ordered; a later save can never overtake an earlier
//!   one.
//! - A failed save leaves the in-memory document unchanged and the session
//!   dirty, so the next save retries with the same data.
//! - Text-only notes cannot open a canvas session.

use crate::model::canvas::{CanvasDocument, StrokeId};
use crate::model::event::CanvasEvent;
use crate::model::note::NoteId;
use crate::repo::canvas_repo::{CanvasRepository, SqliteCanvasRepository};
use crate::repo::note_repo::{NoteRepository, SqliteNoteRepository};
use crate::repo::RepoError;
use log::{info, warn};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Appended points between checkpoint saves while a stroke is active.
///
/// Bounds the durability loss on a crash to this many trailing points while
/// keeping the storage write rate far below the input sample rate.
pub const CHECKPOINT_POINT_INTERVAL: usize = 200;

/// Service error for canvas session use-cases.
#[derive(Debug)]
pub enum CanvasSessionError {
    /// Target note does not exist.
    NoteNotFound(NoteId),
    /// Text-only notes carry no canvas.
    TextOnlyNote(NoteId),
    /// Persistence-layer failure; the in-memory document is retained and the
    /// save can be retried.
    Repo(RepoError),
}

impl Display for CanvasSessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoteNotFound(id) => write!(f, "note not found: {id}"),
            Self::TextOnlyNote(id) => write!(f, "note has no canvas (text-only): {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CanvasSessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for CanvasSessionError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// One editing session over one note's canvas.
///
/// Constructed on note selection, dropped on note switch. Holding the
/// connection mutably makes the single-writer-per-note rule a compile-time
/// property for a single-store process.
pub struct CanvasSession<'conn> {
    conn: &'conn mut Connection,
    document: CanvasDocument,
    active_stroke: Option<StrokeId>,
    points_since_save: usize,
    dirty: bool,
}

impl<'conn> CanvasSession<'conn> {
    /// Loads the note's canvas and opens a session over it.
    pub fn open(conn: &'conn mut Connection, note_id: NoteId) -> Result<Self, CanvasSessionError> {
        let note = {
            let repo = SqliteNoteRepository::new(&mut *conn);
            repo.get_note(note_id)?
        };
        let Some(note) = note else {
            return Err(CanvasSessionError::NoteNotFound(note_id));
        };
        if note.is_text_only {
            return Err(CanvasSessionError::TextOnlyNote(note_id));
        }

        let document = {
            let repo = SqliteCanvasRepository::new(&mut *conn);
            repo.load_canvas(note_id)?
        };
        info!(
            "event=canvas_session_open module=service status=ok note_id={} strokes={} texts={}",
            note_id,
            document.strokes().len(),
            document.text_elements().len()
        );

        Ok(Self {
            conn,
            document,
            active_stroke: None,
            points_since_save: 0,
            dirty: false,
        })
    }

    pub fn document(&self) -> &CanvasDocument {
        &self.document
    }

    /// Whether in-memory state is ahead of storage.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Applies one gesture-layer event.
    ///
    /// Storage errors from terminal saves (stroke commit, text commit,
    /// gesture end, undo/redo) are surfaced; checkpoint saves fail soft and
    /// leave the session dirty for the next boundary.
    pub fn handle(&mut self, event: CanvasEvent) -> Result<(), CanvasSessionError> {
        match event {
            CanvasEvent::StrokeBegin {
                point,
                color,
                pen_size,
                eraser,
            } => {
                let id = self.document.begin_stroke(point, color, pen_size, eraser);
                self.active_stroke = Some(id);
                self.dirty = true;
                Ok(())
            }
            CanvasEvent::PointAppended { point } => {
                let Some(id) = self.active_stroke else {
                    return Ok(());
                };
                self.document.append_point(id, point);
                self.dirty = true;
                self.points_since_save += 1;
                if self.points_since_save >= CHECKPOINT_POINT_INTERVAL {
                    if let Err(err) = self.save() {
                        warn!(
                            "event=canvas_checkpoint module=service status=error note_id={} error={}",
                            self.document.note_id(),
                            err
                        );
                    }
                }
                Ok(())
            }
            CanvasEvent::StrokeCommitted => {
                self.document.commit_stroke();
                self.active_stroke = None;
                self.save()
            }
            CanvasEvent::TextBegin {
                position,
                existing_index,
            } => {
                self.document.begin_text_edit(position, existing_index);
                Ok(())
            }
            CanvasEvent::TextCommitted { text } => {
                self.document.commit_text_edit(&text);
                self.dirty = true;
                self.save()
            }
            CanvasEvent::TextCancelled => {
                self.document.cancel_text_edit();
                Ok(())
            }
            CanvasEvent::ViewChanged { transform, scale } => {
                if self.document.set_transform(transform, scale) {
                    self.dirty = true;
                }
                Ok(())
            }
            CanvasEvent::GestureEnded => {
                if self.dirty {
                    self.save()
                } else {
                    Ok(())
                }
            }
            CanvasEvent::UndoRequested => {
                if self.document.undo() {
                    self.dirty = true;
                    self.save()
                } else {
                    Ok(())
                }
            }
            CanvasEvent::RedoRequested => {
                if self.document.redo() {
                    self.dirty = true;
                    self.save()
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Terminal save; call before dropping the session. No-op when clean.
    pub fn flush(&mut self) -> Result<(), CanvasSessionError> {
        if self.dirty {
            self.save()
        } else {
            Ok(())
        }
    }

    fn save(&mut self) -> Result<(), CanvasSessionError> {
        let result = {
            let mut repo = SqliteCanvasRepository::new(&mut *self.conn);
            repo.save_canvas(&self.document)
        };
        match result {
            Ok(()) => {
                self.dirty = false;
                self.points_since_save = 0;
                Ok(())
            }
            Err(err) => {
                // Document stays as-is; the next save retries the same data.
                Err(err.into())
            }
        }
    }
}
