//! Note and folder domain models.
//!
//! # Responsibility
//! - Define the note metadata record and folder grouping record.
//! - Provide lifecycle constructors and tag normalization helpers.
//!
//! # Invariants
//! - `id` is stable and never reused for another note.
//! - `modified_at` changes only on title or text-content edits, never on
//!   canvas/view saves.
//! - Text-only notes carry no canvas rows at all.

use crate::model::now_epoch_ms;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Stable note identifier.
pub type NoteId = Uuid;

/// Stable folder identifier.
pub type FolderId = Uuid;

/// One note's metadata record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds. Bumped only by title/text-content edits.
    pub modified_at: i64,
    /// `None` means the note sits outside any folder.
    pub folder_id: Option<FolderId>,
    /// Deduplicated, case-sensitive labels.
    pub tags: Vec<String>,
    /// Text-only notes have no canvas content.
    pub is_text_only: bool,
    /// Body for text-only notes.
    pub text_content: Option<String>,
}

impl Note {
    /// Creates a new canvas note with a generated id.
    pub fn new(title: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), title)
    }

    /// Creates a note with a caller-provided id.
    ///
    /// Used by import/sync paths where identity already exists externally.
    pub fn with_id(id: NoteId, title: impl Into<String>) -> Self {
        let now = now_epoch_ms();
        Self {
            id,
            title: title.into(),
            created_at: now,
            modified_at: now,
            folder_id: None,
            tags: Vec::new(),
            is_text_only: false,
            text_content: None,
        }
    }

    /// Creates a new text-only note.
    pub fn new_text_only(title: impl Into<String>, content: impl Into<String>) -> Self {
        let mut note = Self::new(title);
        note.is_text_only = true;
        note.text_content = Some(content.into());
        note
    }
}

/// Grouping folder for notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: FolderId,
    pub name: String,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Stable display order key.
    pub sort_order: i64,
}

impl Folder {
    pub fn new(name: impl Into<String>, sort_order: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_at: now_epoch_ms(),
            sort_order,
        }
    }
}

/// Sort orders supported by note list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoteSort {
    /// Insertion order, oldest first.
    #[default]
    CreationOrder,
    /// Title ascending.
    Title,
    /// Created timestamp, newest first.
    CreatedDesc,
    /// Modified timestamp, newest first.
    ModifiedDesc,
}

/// Normalizes one tag: trimmed, case preserved.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Normalizes and deduplicates tag values. Case-sensitive: `Work` and `work`
/// are distinct labels.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut unique = BTreeSet::new();
    for tag in tags {
        if let Some(value) = normalize_tag(tag) {
            unique.insert(value);
        }
    }
    unique.into_iter().collect()
}
