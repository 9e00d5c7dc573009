//! Undo/redo state machine.
//!
//! # Responsibility
//! - Keep two bounded stacks of deep document snapshots.
//! - Enforce the edit/undo/redo transition rules.
//!
//! # Invariants
//! - Every recorded edit clears the redo stack.
//! - Snapshots are deep copies; the live document never aliases a stored one.
//! - The initial state at document load is Clean (both stacks empty).

use crate::model::canvas::{Stroke, TextElement};

/// Snapshots retained before the oldest undo step is dropped.
const MAX_SNAPSHOTS: usize = 100;

/// Deep copy of the undoable document content.
///
/// View transform and scale are intentionally excluded: view changes are not
/// undoable.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    strokes: Vec<Stroke>,
    text_elements: Vec<TextElement>,
}

impl Snapshot {
    /// Captures a deep copy of the current content.
    pub fn capture(strokes: &[Stroke], text_elements: &[TextElement]) -> Self {
        Self {
            strokes: strokes.to_vec(),
            text_elements: text_elements.to_vec(),
        }
    }

    pub fn into_parts(self) -> (Vec<Stroke>, Vec<TextElement>) {
        (self.strokes, self.text_elements)
    }
}

/// Two-stack undo/redo engine.
#[derive(Debug, Default)]
pub struct History {
    undo: Vec<Snapshot>,
    redo: Vec<Snapshot>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Records the pre-edit state before a destructive mutation.
    ///
    /// Clears the redo stack; when the cap is hit the oldest snapshot is
    /// dropped.
    pub fn record_edit(&mut self, before: Snapshot) {
        self.undo.push(before);
        if self.undo.len() > MAX_SNAPSHOTS {
            self.undo.remove(0);
        }
        self.redo.clear();
    }

    /// Pops the undo stack, parking `current` on the redo stack.
    ///
    /// Returns `None` (no state change) when there is nothing to undo.
    pub fn undo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let restored = self.undo.pop()?;
        self.redo.push(current);
        Some(restored)
    }

    /// Pops the redo stack, parking `current` on the undo stack.
    pub fn redo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let restored = self.redo.pop()?;
        self.undo.push(current);
        Some(restored)
    }
}

#[cfg(test)]
mod tests {
    use super::{History, Snapshot, MAX_SNAPSHOTS};
    use crate::model::canvas::{Rgba, Stroke, StrokePoint};

    fn snapshot_with(n: usize) -> Snapshot {
        let strokes: Vec<Stroke> = (0..n)
            .map(|i| Stroke::begin(StrokePoint::plain(i as f64, 0.0), Rgba::BLACK, 3.0))
            .collect();
        Snapshot::capture(&strokes, &[])
    }

    #[test]
    fn starts_clean() {
        let history = History::new();
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn undo_then_redo_is_inverse() {
        let mut history = History::new();
        let before = snapshot_with(0);
        let after = snapshot_with(1);

        history.record_edit(before.clone());
        let restored = history.undo(after.clone()).unwrap();
        assert_eq!(restored, before);
        let replayed = history.redo(restored).unwrap();
        assert_eq!(replayed, after);
    }

    #[test]
    fn record_edit_clears_redo() {
        let mut history = History::new();
        history.record_edit(snapshot_with(0));
        history.undo(snapshot_with(1)).unwrap();
        assert!(history.can_redo());

        history.record_edit(snapshot_with(2));
        assert!(!history.can_redo());
    }

    #[test]
    fn empty_stacks_are_noops() {
        let mut history = History::new();
        assert!(history.undo(snapshot_with(0)).is_none());
        assert!(history.redo(snapshot_with(0)).is_none());
        assert!(!history.can_undo());
    }

    #[test]
    fn cap_drops_oldest_snapshot() {
        let mut history = History::new();
        for i in 0..=MAX_SNAPSHOTS {
            history.record_edit(snapshot_with(i));
        }
        let mut popped = 0;
        while history.undo(snapshot_with(0)).is_some() {
            popped += 1;
        }
        assert_eq!(popped, MAX_SNAPSHOTS);
    }
}
