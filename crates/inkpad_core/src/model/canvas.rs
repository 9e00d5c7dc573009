//! Canvas document model.
//!
//! # Responsibility
//! - Define the per-note drawing content: strokes, text elements, view state.
//! - Own the mutation API used by gesture/event consumers.
//! - Capture undo boundaries at stroke begin and text commit.
//!
//! # Invariants
//! - Strokes are append-only while active and immutable once committed.
//! - Erasing paints background-colored strokes; geometry is never removed.
//! - Transform/scale changes are excluded from undo history.
//! - While a text edit session is open, `set_transform` is suppressed so the
//!   anchor cannot drift under the open editor.

use crate::model::geometry::{sanitize_scale, Point, Transform};
use crate::model::history::{History, Snapshot};
use crate::model::note::NoteId;
use crate::model::now_epoch_ms;
use serde::{Deserialize, Serialize};

/// Pen size bounds in canvas units.
pub const MIN_PEN_SIZE: f64 = 0.5;
pub const MAX_PEN_SIZE: f64 = 10.0;

/// Font size applied to text elements restored from storage.
pub const DEFAULT_FONT_SIZE: f64 = 16.0;

/// Pressure recorded for input devices that report none.
pub const DEFAULT_PRESSURE: f64 = 0.5;

/// ARGB color, carried as one `u32` on the wire (`color:<int>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rgba(pub u32);

impl Rgba {
    pub const WHITE: Self = Self(0xFFFF_FFFF);
    pub const BLACK: Self = Self(0xFF00_0000);

    pub fn alpha(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub fn red(&self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub fn green(&self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn blue(&self) -> u8 {
        self.0 as u8
    }
}

fn default_pressure() -> f64 {
    DEFAULT_PRESSURE
}

/// One recorded input sample. Immutable once recorded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokePoint {
    pub x: f64,
    pub y: f64,
    /// Normalized stylus pressure in `[0, 1]`.
    #[serde(default = "default_pressure")]
    pub pressure: f64,
}

impl StrokePoint {
    pub fn new(x: f64, y: f64, pressure: f64) -> Self {
        Self {
            x,
            y,
            pressure: pressure.clamp(0.0, 1.0),
        }
    }

    /// Sample from a device without pressure reporting.
    pub fn plain(x: f64, y: f64) -> Self {
        Self::new(x, y, DEFAULT_PRESSURE)
    }
}

/// One continuous pen gesture.
///
/// Serializes to the stroke wire shape `{points, color, penSize}` stored in
/// the `strokes.data` column and exchanged by the export format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    points: Vec<StrokePoint>,
    color: Rgba,
    #[serde(rename = "penSize")]
    pen_size: f64,
}

impl Stroke {
    /// Starts a stroke from its first sample. Pen size is clamped to the
    /// supported range.
    pub fn begin(first: StrokePoint, color: Rgba, pen_size: f64) -> Self {
        Self {
            points: vec![first],
            color,
            pen_size: pen_size.clamp(MIN_PEN_SIZE, MAX_PEN_SIZE),
        }
    }

    fn append(&mut self, point: StrokePoint) {
        self.points.push(point);
    }

    pub fn points(&self) -> &[StrokePoint] {
        &self.points
    }

    pub fn color(&self) -> Rgba {
        self.color
    }

    pub fn pen_size(&self) -> f64 {
        self.pen_size
    }

    /// A single-point stroke renders as a dot.
    pub fn is_dot(&self) -> bool {
        self.points.len() == 1
    }
}

/// A positioned text annotation on the canvas plane.
///
/// `position` is the top-left anchor in canvas coordinates. The inline markup
/// subset inside `text` is interpreted only at render time and never altered
/// here.
#[derive(Debug, Clone, PartialEq)]
pub struct TextElement {
    pub position: Point,
    pub text: String,
    pub font_size: f64,
    /// Epoch milliseconds; re-stamped on load since storage does not keep it.
    pub created_at: i64,
}

impl TextElement {
    pub fn new(position: Point, text: impl Into<String>) -> Self {
        Self {
            position,
            text: text.into(),
            font_size: DEFAULT_FONT_SIZE,
            created_at: now_epoch_ms(),
        }
    }
}

/// Identifier handed out by [`CanvasDocument::begin_stroke`] and required by
/// point appends, so a stale gesture cannot write into a newer stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrokeId(u64);

/// Open text edit session state.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSession {
    position: Point,
    existing_index: Option<usize>,
}

impl TextSession {
    pub fn position(&self) -> Point {
        self.position
    }

    /// Index of the element being edited, `None` for a new placement.
    pub fn existing_index(&self) -> Option<usize> {
        self.existing_index
    }
}

/// The authoritative in-memory state for one note's canvas.
///
/// Exactly one instance is resident per note at a time; loads and saves hand
/// over freshly constructed values, so no internal sequence is ever shared
/// across notes.
#[derive(Debug)]
pub struct CanvasDocument {
    note_id: NoteId,
    strokes: Vec<Stroke>,
    text_elements: Vec<TextElement>,
    transform: Transform,
    scale: f64,
    background: Rgba,
    history: History,
    active_stroke: Option<(StrokeId, usize)>,
    text_session: Option<TextSession>,
    next_stroke_id: u64,
}

impl CanvasDocument {
    /// Creates the empty document a fresh note starts with.
    pub fn new(note_id: NoteId) -> Self {
        Self::from_parts(note_id, Vec::new(), Vec::new(), Transform::IDENTITY, 1.0)
    }

    /// Rebuilds a document from restored state.
    ///
    /// Corrupted view geometry degrades to the identity view instead of
    /// failing the load: a degenerate matrix or an invalid scale resets both
    /// to identity/1.0, since the scale scalar only has meaning alongside the
    /// matrix it was tracked with.
    pub fn from_parts(
        note_id: NoteId,
        strokes: Vec<Stroke>,
        text_elements: Vec<TextElement>,
        transform: Transform,
        scale: f64,
    ) -> Self {
        let (transform, scale) = if transform.is_degenerate() || sanitize_scale(scale) != scale {
            (Transform::IDENTITY, 1.0)
        } else {
            (transform, scale)
        };
        Self {
            note_id,
            strokes,
            text_elements,
            transform,
            scale,
            background: Rgba::WHITE,
            history: History::new(),
            active_stroke: None,
            text_session: None,
            next_stroke_id: 0,
        }
    }

    pub fn note_id(&self) -> NoteId {
        self.note_id
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn text_elements(&self) -> &[TextElement] {
        &self.text_elements
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn background(&self) -> Rgba {
        self.background
    }

    /// Background color used as the eraser paint color.
    pub fn set_background(&mut self, color: Rgba) {
        self.background = color;
    }

    pub fn is_stroke_active(&self) -> bool {
        self.active_stroke.is_some()
    }

    pub fn is_text_editing(&self) -> bool {
        self.text_session.is_some()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Starts a stroke: captures an undo snapshot, clears redo, and appends a
    /// new single-point stroke.
    ///
    /// Eraser mode substitutes the canvas background color; erasing paints
    /// over prior geometry rather than deleting it.
    pub fn begin_stroke(
        &mut self,
        first: StrokePoint,
        color: Rgba,
        pen_size: f64,
        eraser: bool,
    ) -> StrokeId {
        self.commit_stroke();
        self.history.record_edit(self.snapshot());

        let color = if eraser { self.background } else { color };
        self.strokes.push(Stroke::begin(first, color, pen_size));

        let id = StrokeId(self.next_stroke_id);
        self.next_stroke_id += 1;
        self.active_stroke = Some((id, self.strokes.len() - 1));
        id
    }

    /// O(1) append to the active stroke. Not an undo boundary.
    ///
    /// Ignored when `id` does not name the currently active stroke.
    pub fn append_point(&mut self, id: StrokeId, point: StrokePoint) {
        if let Some((active_id, index)) = self.active_stroke {
            if active_id == id {
                self.strokes[index].append(point);
            }
        }
    }

    /// Finalizes the active stroke. No-op when none is active.
    pub fn commit_stroke(&mut self) {
        self.active_stroke = None;
    }

    /// Opens a text edit session at `position`, or over an existing element.
    ///
    /// Returns `None` when a session is already open or `existing_index` is
    /// out of range.
    pub fn begin_text_edit(
        &mut self,
        position: Point,
        existing_index: Option<usize>,
    ) -> Option<&TextSession> {
        if self.text_session.is_some() {
            return None;
        }
        if let Some(index) = existing_index {
            if index >= self.text_elements.len() {
                return None;
            }
        }
        self.text_session = Some(TextSession {
            position,
            existing_index,
        });
        self.text_session.as_ref()
    }

    /// Submits the open text session: snapshot, then replace or append.
    ///
    /// Submitting an empty string over an existing element removes it
    /// (delete-on-clear); an empty submission for a new placement cancels
    /// without an undo boundary. No-op when no session is open.
    pub fn commit_text_edit(&mut self, text: &str) {
        let Some(session) = self.text_session.take() else {
            return;
        };

        let trimmed_empty = text.trim().is_empty();
        if trimmed_empty && session.existing_index.is_none() {
            return;
        }

        self.history.record_edit(self.snapshot());
        match session.existing_index {
            Some(index) => {
                if trimmed_empty {
                    self.text_elements.remove(index);
                } else {
                    // Replace the text in place; anchor, font size and
                    // creation stamp belong to the original placement.
                    self.text_elements[index].text = text.to_string();
                }
            }
            None => {
                self.text_elements
                    .push(TextElement::new(session.position, text));
            }
        }
    }

    /// Abandons the open text session without touching document state.
    pub fn cancel_text_edit(&mut self) {
        self.text_session = None;
    }

    /// Replaces the view transform and scale. Not an undo boundary.
    ///
    /// Suppressed while a text edit session is open; returns whether the
    /// replacement was applied.
    pub fn set_transform(&mut self, transform: Transform, scale: f64) -> bool {
        if self.text_session.is_some() {
            return false;
        }
        self.transform = transform.sanitized();
        self.scale = sanitize_scale(scale);
        true
    }

    /// Restores the previous snapshot. No-op on an empty undo stack.
    ///
    /// Transform and scale are untouched. An active stroke is committed
    /// first; a no-op while a text session is open.
    pub fn undo(&mut self) -> bool {
        if self.text_session.is_some() {
            return false;
        }
        self.commit_stroke();
        match self.history.undo(self.snapshot()) {
            Some(snapshot) => {
                self.apply_snapshot(snapshot);
                true
            }
            None => false,
        }
    }

    /// Reapplies the next snapshot. No-op on an empty redo stack.
    pub fn redo(&mut self) -> bool {
        if self.text_session.is_some() {
            return false;
        }
        self.commit_stroke();
        match self.history.redo(self.snapshot()) {
            Some(snapshot) => {
                self.apply_snapshot(snapshot);
                true
            }
            None => false,
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.strokes, &self.text_elements)
    }

    fn apply_snapshot(&mut self, snapshot: Snapshot) {
        let (strokes, text_elements) = snapshot.into_parts();
        self.strokes = strokes;
        self.text_elements = text_elements;
    }
}
