//! Canvas/screen coordinate math.
//!
//! # Responsibility
//! - Map points between screen space and the unbounded logical canvas plane.
//! - Compose pan/zoom gestures into the view transform without drift.
//! - Detect degenerate transforms and provide the identity fallback.
//!
//! # Invariants
//! - A `Transform` accepted by mapping functions has a finite, non-zero
//!   determinant; callers recover degenerate values via [`Transform::sanitized`].
//! - Translation updates replace the translation slots directly and never go
//!   through a matrix multiply.

use crate::model::canvas::{Stroke, TextElement};
use serde::{Deserialize, Serialize};

/// Determinant magnitude below which a transform counts as degenerate.
///
/// Far below any scale reachable by pinch gestures, but catches underflow
/// from long compounded zoom-out sequences before inversion produces NaN.
pub const DEGENERACY_EPSILON: f64 = 1e-9;

/// Margin added around content when computing [`content_bounds`].
const CONTENT_BOUNDS_MARGIN: f64 = 50.0;

/// Default rect returned by [`content_bounds`] for an empty canvas.
const EMPTY_CONTENT_BOUNDS: Rect = Rect {
    x: 0.0,
    y: 0.0,
    width: 800.0,
    height: 600.0,
};

/// Approximate glyph advance as a fraction of font size, used for text
/// extent estimation. Real glyph metrics live in the rendering layer.
const GLYPH_ADVANCE_FACTOR: f64 = 0.6;
const LINE_HEIGHT_FACTOR: f64 = 1.2;

/// A plain 2D point in either screen or canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Grows the rect by `margin` on every side.
    pub fn inflated(&self, margin: f64) -> Self {
        Self {
            x: self.x - margin,
            y: self.y - margin,
            width: self.width + margin * 2.0,
            height: self.height + margin * 2.0,
        }
    }
}

/// The affine mapping from canvas coordinates to screen coordinates.
///
/// Stored as a row-major 4x4 matrix of which only the 2D affine subspace is
/// ever populated:
///
/// ```text
/// | a b 0 tx |      screen.x = a*x + b*y + tx
/// | c d 0 ty |      screen.y = c*x + d*y + ty
/// | 0 0 1 0  |
/// | 0 0 0 1  |
/// ```
///
/// With that shape the 4x4 determinant reduces to the 2x2 minor `a*d - b*c`,
/// which is what degeneracy detection inspects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    matrix: [f64; 16],
}

// Row-major slot indices for the populated affine entries.
const A: usize = 0;
const B: usize = 1;
const TX: usize = 3;
const C: usize = 4;
const D: usize = 5;
const TY: usize = 7;

impl Transform {
    pub const IDENTITY: Self = Self {
        matrix: [
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ],
    };

    /// Wraps a raw row-major 4x4 matrix.
    ///
    /// The value is taken as-is; callers restoring persisted or imported
    /// matrices must run [`Transform::sanitized`] before mapping points.
    pub fn from_matrix(matrix: [f64; 16]) -> Self {
        Self { matrix }
    }

    pub fn matrix(&self) -> &[f64; 16] {
        &self.matrix
    }

    /// Determinant of the populated affine subspace.
    pub fn determinant(&self) -> f64 {
        self.matrix[A] * self.matrix[D] - self.matrix[B] * self.matrix[C]
    }

    /// Whether this transform must be recovered before use.
    ///
    /// True when any populated entry is non-finite or the determinant
    /// magnitude falls below [`DEGENERACY_EPSILON`].
    pub fn is_degenerate(&self) -> bool {
        if self.matrix.iter().any(|value| !value.is_finite()) {
            return true;
        }
        self.determinant().abs() < DEGENERACY_EPSILON
    }

    /// Returns `self`, or the identity when degenerate.
    ///
    /// Degeneracy is a recoverable condition: the canvas resets its view
    /// instead of producing NaN geometry.
    pub fn sanitized(&self) -> Self {
        if self.is_degenerate() {
            Self::IDENTITY
        } else {
            *self
        }
    }

    /// Maps a canvas point to screen coordinates.
    pub fn canvas_to_screen(&self, point: Point) -> Point {
        Point {
            x: self.matrix[A] * point.x + self.matrix[B] * point.y + self.matrix[TX],
            y: self.matrix[C] * point.x + self.matrix[D] * point.y + self.matrix[TY],
        }
    }

    /// Maps a screen point back onto the canvas plane.
    ///
    /// Precondition: not degenerate. Callers holding an untrusted transform
    /// substitute [`Transform::sanitized`] first.
    pub fn screen_to_canvas(&self, point: Point) -> Point {
        let det = self.determinant();
        let dx = point.x - self.matrix[TX];
        let dy = point.y - self.matrix[TY];
        Point {
            x: (self.matrix[D] * dx - self.matrix[B] * dy) / det,
            y: (self.matrix[A] * dy - self.matrix[C] * dx) / det,
        }
    }

    /// Scales around a focal point given in screen coordinates.
    ///
    /// Builds `T(focal) * S(factor) * T(-focal) * self`, collapsed to its
    /// closed form. `factor` must be finite and > 0; the result stays
    /// invertible across any finite sequence of finite-factor scalings.
    pub fn scaled_around_focal(&self, focal: Point, factor: f64) -> Self {
        debug_assert!(factor.is_finite() && factor > 0.0);
        let mut matrix = self.matrix;
        matrix[A] *= factor;
        matrix[B] *= factor;
        matrix[C] *= factor;
        matrix[D] *= factor;
        matrix[TX] = factor * self.matrix[TX] + (1.0 - factor) * focal.x;
        matrix[TY] = factor * self.matrix[TY] + (1.0 - factor) * focal.y;
        Self { matrix }
    }

    /// Shifts the view by a screen-space delta.
    ///
    /// Adds to the translation slots directly rather than multiplying by a
    /// translation matrix, so long runs of small pan deltas do not compound
    /// rounding error into the scale/skew entries.
    pub fn translated_by(&self, dx: f64, dy: f64) -> Self {
        let mut matrix = self.matrix;
        matrix[TX] += dx;
        matrix[TY] += dy;
        Self { matrix }
    }

    /// Replaces the translation slots outright.
    pub fn with_translation(&self, tx: f64, ty: f64) -> Self {
        let mut matrix = self.matrix;
        matrix[TX] = tx;
        matrix[TY] = ty;
        Self { matrix }
    }

    /// Canvas-space rect visible through a screen viewport of the given size.
    ///
    /// Inverse-transforms all four screen corners and takes their bounding
    /// box; a single-corner inverse would be wrong under skew.
    pub fn viewport_bounds(&self, screen_width: f64, screen_height: f64) -> Rect {
        let t = self.sanitized();
        let corners = [
            t.screen_to_canvas(Point::new(0.0, 0.0)),
            t.screen_to_canvas(Point::new(screen_width, 0.0)),
            t.screen_to_canvas(Point::new(0.0, screen_height)),
            t.screen_to_canvas(Point::new(screen_width, screen_height)),
        ];
        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        for corner in corners {
            min_x = min_x.min(corner.x);
            min_y = min_y.min(corner.y);
            max_x = max_x.max(corner.x);
            max_y = max_y.max(corner.y);
        }
        Rect::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Clamps a persisted/imported scale scalar to a usable value.
///
/// Non-finite or non-positive scales are recovered to 1.0, matching the
/// identity fallback for degenerate matrices.
pub fn sanitize_scale(scale: f64) -> f64 {
    if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        1.0
    }
}

/// Padded bounding box over all stroke points and text extents.
///
/// Returns a fixed default rect when the canvas is empty, never a
/// zero-or-negative-sized rect.
pub fn content_bounds(strokes: &[Stroke], text_elements: &[TextElement]) -> Rect {
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    let mut seen = false;

    for stroke in strokes {
        for point in stroke.points() {
            seen = true;
            min_x = min_x.min(point.x);
            min_y = min_y.min(point.y);
            max_x = max_x.max(point.x);
            max_y = max_y.max(point.y);
        }
    }

    for element in text_elements {
        seen = true;
        let (width, height) = estimate_text_extent(&element.text, element.font_size);
        min_x = min_x.min(element.position.x);
        min_y = min_y.min(element.position.y);
        max_x = max_x.max(element.position.x + width);
        max_y = max_y.max(element.position.y + height);
    }

    if !seen {
        return EMPTY_CONTENT_BOUNDS;
    }

    Rect::new(min_x, min_y, max_x - min_x, max_y - min_y).inflated(CONTENT_BOUNDS_MARGIN)
}

/// Rough text extent in canvas units from line structure and font size.
fn estimate_text_extent(text: &str, font_size: f64) -> (f64, f64) {
    let mut lines = 0usize;
    let mut longest = 0usize;
    for line in text.lines() {
        lines += 1;
        longest = longest.max(line.chars().count());
    }
    lines = lines.max(1);
    let width = longest as f64 * font_size * GLYPH_ADVANCE_FACTOR;
    let height = lines as f64 * font_size * LINE_HEIGHT_FACTOR;
    (width, height)
}
