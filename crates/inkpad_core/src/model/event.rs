//! Canvas input events.
//!
//! Gesture recognition lives in the UI layer; it emits these values into a
//! [`crate::service::canvas_service::CanvasSession`], which applies them to
//! the document and decides when to persist. This keeps input cadence
//! decoupled from persistence cadence.

use crate::model::canvas::{Rgba, StrokePoint};
use crate::model::geometry::{Point, Transform};

/// One input event produced by the gesture layer.
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasEvent {
    /// Pointer down with a drawing tool.
    StrokeBegin {
        point: StrokePoint,
        color: Rgba,
        pen_size: f64,
        eraser: bool,
    },
    /// Pointer move while a stroke is active.
    PointAppended { point: StrokePoint },
    /// Pointer up; the active stroke becomes immutable.
    StrokeCommitted,
    /// Text tool tap, either on empty canvas or on an existing element.
    TextBegin {
        position: Point,
        existing_index: Option<usize>,
    },
    /// Text editor submitted.
    TextCommitted { text: String },
    /// Text editor dismissed without submitting.
    TextCancelled,
    /// Intermediate pan/zoom update. Not persisted per update.
    ViewChanged { transform: Transform, scale: f64 },
    /// Pan/zoom gesture ended; the view state is persisted.
    GestureEnded,
    /// Undo requested from the toolbar.
    UndoRequested,
    /// Redo requested from the toolbar.
    RedoRequested,
}
