//! Sync collaborator contract and local application hooks.
//!
//! # Responsibility
//! - Define the boundary the external sync transport is consumed through:
//!   exported note records out, a result summary plus per-note callbacks in.
//! - Apply remote records to the store exactly as a normal import.
//!
//! # Invariants
//! - The core never performs network I/O; transports live entirely outside.
//! - Remote records flow through the same codec decode/apply path as a
//!   backup import, including its per-record failure isolation.

use crate::codec::export::export_note_record;
use crate::codec::import::{apply_note_record, decode_note_record};
use crate::model::note::{NoteId, NoteSort};
use crate::repo::canvas_repo::{CanvasRepository, SqliteCanvasRepository};
use crate::repo::note_repo::{NoteListQuery, NoteRepository, SqliteNoteRepository};
use crate::repo::RepoResult;
use log::warn;
use rusqlite::Connection;
use serde_json::Value;

/// Result summary returned by a sync transport run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub uploaded: u32,
    pub downloaded: u32,
    pub conflicts: u32,
    pub has_error: bool,
}

/// Callbacks a transport invokes while reconciling.
///
/// Both are consumed like a normal import; implementations must not assume
/// the calls arrive in any particular order.
pub trait SyncDelegate {
    /// A remote revision replaced the local note with `note_id`.
    fn on_note_updated(&mut self, note_id: NoteId, record: &Value);
    /// A note unknown to this device arrived.
    fn on_note_created(&mut self, record: &Value);
}

/// The external transport boundary.
///
/// Implementations exchange the caller-supplied exported records against the
/// remote copy and report what happened.
pub trait SyncTransport {
    fn reconcile(&self, outgoing: &[Value], delegate: &mut dyn SyncDelegate) -> SyncSummary;
}

/// Delegate that applies remote records straight to the local store.
pub struct StoreSyncDelegate<'conn> {
    conn: &'conn mut Connection,
    applied: u32,
    failed: u32,
}

impl<'conn> StoreSyncDelegate<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self {
            conn,
            applied: 0,
            failed: 0,
        }
    }

    /// Records applied so far.
    pub fn applied(&self) -> u32 {
        self.applied
    }

    /// Records rejected or failed so far.
    pub fn failed(&self) -> u32 {
        self.failed
    }

    fn apply(&mut self, forced_id: Option<NoteId>, record: &Value) {
        let decoded = match decode_note_record(record) {
            Ok(mut decoded) => {
                if forced_id.is_some() {
                    decoded.note.id = forced_id;
                }
                decoded
            }
            Err(reason) => {
                warn!("event=sync_apply module=sync status=record_failed reason={reason}");
                self.failed += 1;
                return;
            }
        };

        match apply_note_record(self.conn, &decoded) {
            Ok(_) => self.applied += 1,
            Err(err) => {
                warn!("event=sync_apply module=sync status=error error={err}");
                self.failed += 1;
            }
        }
    }
}

impl SyncDelegate for StoreSyncDelegate<'_> {
    fn on_note_updated(&mut self, note_id: NoteId, record: &Value) {
        self.apply(Some(note_id), record);
    }

    fn on_note_created(&mut self, record: &Value) {
        self.apply(None, record);
    }
}

/// Exports every local note as the outbound sync payload.
pub fn collect_local_records(conn: &mut Connection) -> RepoResult<Vec<Value>> {
    let notes = {
        let repo = SqliteNoteRepository::new(&mut *conn);
        repo.list_notes(&NoteListQuery {
            sort: NoteSort::CreationOrder,
            ..NoteListQuery::default()
        })?
    };

    let mut records = Vec::with_capacity(notes.len());
    for note in notes {
        let document = {
            let repo = SqliteCanvasRepository::new(&mut *conn);
            repo.load_canvas(note.id)?
        };
        records.push(export_note_record(&note, &document)?);
    }
    Ok(records)
}
