#![forbid(unsafe_code)]

//! Geometric primitives.
//!
//! Coordinates are logical units as reported by the host (pixels, points,
//! terminal rows). Every interval along the scroll axis is half-open.

/// Primary scroll axis of a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "snake_case"))]
pub enum Axis {
    /// Top to bottom.
    #[default]
    Vertical,
    /// Left to right.
    Horizontal,
}

/// A measured layout rectangle, as delivered by a row's layout callback.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LayoutRect {
    /// Left edge (inclusive).
    pub x: f64,
    /// Top edge (inclusive).
    pub y: f64,
    /// Width in logical units.
    pub width: f64,
    /// Height in logical units.
    pub height: f64,
}

impl LayoutRect {
    /// Create a new rectangle.
    #[inline]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a rectangle at the origin with the given size.
    #[inline]
    pub const fn from_size(width: f64, height: f64) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    /// Right edge (exclusive).
    #[inline]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge (exclusive).
    #[inline]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Check if the rectangle has zero area.
    #[inline]
    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// Size along `axis`.
    #[inline]
    pub fn length_along(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Vertical => self.height,
            Axis::Horizontal => self.width,
        }
    }

    /// The extent this rectangle covers along `axis`.
    #[inline]
    pub fn span_along(&self, axis: Axis) -> Span {
        match axis {
            Axis::Vertical => Span::new(self.y, self.bottom()),
            Axis::Horizontal => Span::new(self.x, self.right()),
        }
    }
}

/// A half-open interval `[start, end)` along the scroll axis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Span {
    /// Leading edge (inclusive).
    pub start: f64,
    /// Trailing edge (exclusive).
    pub end: f64,
}

impl Span {
    /// Create a span. A reversed pair collapses to an empty span at `start`.
    #[inline]
    pub fn new(start: f64, end: f64) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    /// Create a span from a leading edge and a length.
    #[inline]
    pub fn with_length(start: f64, length: f64) -> Self {
        Self::new(start, start + length.max(0.0))
    }

    /// Length of the span.
    #[inline]
    pub fn length(&self) -> f64 {
        self.end - self.start
    }

    /// Half-open intersection test.
    ///
    /// Spans that merely abut (`a.end == b.start`) do not intersect. An
    /// empty span strictly inside `other` does intersect, so a zero-length
    /// row inside the window counts as visible; one sitting on either edge
    /// does not.
    #[inline]
    pub fn intersects(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Closed-bound touch test: `self.end >= other.start && self.start <= other.end`.
    ///
    /// This is the candidate filter used by interval queries; it includes
    /// abutting spans.
    #[inline]
    pub fn touches(&self, other: &Span) -> bool {
        self.end >= other.start && self.start <= other.end
    }

    /// Grow both edges outward by `margin`.
    #[inline]
    pub fn expand(&self, margin: f64) -> Span {
        let margin = margin.max(0.0);
        Span::new(self.start - margin, self.end + margin)
    }

    /// The smallest span containing both.
    #[inline]
    pub fn union(&self, other: &Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}
