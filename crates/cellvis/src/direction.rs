#![forbid(unsafe_code)]

//! Scroll direction classification.
//!
//! [`ScrollDirectionTracker`] compares each new window against the previous
//! one and classifies the update as moving toward the start or the end of
//! the list. Windows are generic over their edge type: logical offsets in
//! window mode, row keys in explicit-delta mode.
//!
//! # Rules
//!
//! 1. A window whose start is at the list start scrolls toward the end.
//! 2. A trailing edge past the previous trailing edge scrolls toward the end.
//! 3. A leading edge before the previous leading edge scrolls toward the start.
//! 4. Otherwise the previous direction is kept; with no history the
//!    direction is toward the end.
//!
//! A reversal is reported when the new direction differs from a known
//! previous direction.

use crate::key::RowKey;

/// Direction of a scroll update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScrollDirection {
    /// Toward the first row (up / left).
    TowardStart,
    /// Toward the last row (down / right).
    TowardEnd,
}

/// A window edge that can be compared along the list.
pub trait WindowEdge: Clone + PartialOrd {
    /// Whether this edge sits at the absolute start of the list.
    fn is_list_start(&self) -> bool {
        false
    }
}

impl WindowEdge for f64 {
    fn is_list_start(&self) -> bool {
        *self <= 0.0
    }
}

/// Row keys carry no notion of "first row of the data source"; they rely on
/// rules 2-4 only.
impl WindowEdge for RowKey {}

/// The first and last edge of a window along the list.
#[derive(Debug, Clone, PartialEq)]
pub struct Window<E> {
    pub start: E,
    pub end: E,
}

impl<E> Window<E> {
    pub fn new(start: E, end: E) -> Self {
        Self { start, end }
    }
}

/// Result of one tracker update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectionUpdate {
    pub direction: ScrollDirection,
    /// The direction flipped relative to a known previous direction.
    pub reversed: bool,
}

/// Minimal state for classifying successive windows.
#[derive(Debug, Clone)]
pub struct ScrollDirectionTracker<E> {
    previous: Option<Window<E>>,
    last: Option<ScrollDirection>,
}

impl<E> Default for ScrollDirectionTracker<E> {
    fn default() -> Self {
        Self {
            previous: None,
            last: None,
        }
    }
}

impl<E: WindowEdge> ScrollDirectionTracker<E> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify `window` against the stored state, then store it.
    pub fn update(&mut self, window: Window<E>) -> DirectionUpdate {
        let direction = self.classify(&window);
        let reversed = self.last.is_some_and(|last| last != direction);
        self.previous = Some(window);
        self.last = Some(direction);
        DirectionUpdate {
            direction,
            reversed,
        }
    }

    fn classify(&self, window: &Window<E>) -> ScrollDirection {
        let retained = self.last.unwrap_or(ScrollDirection::TowardEnd);
        if window.start.is_list_start() {
            return ScrollDirection::TowardEnd;
        }
        let Some(prev) = &self.previous else {
            return retained;
        };
        if window.end > prev.end {
            ScrollDirection::TowardEnd
        } else if window.start < prev.start {
            ScrollDirection::TowardStart
        } else {
            retained
        }
    }

    /// Last classified direction, or `None` before the first update.
    #[must_use]
    pub fn last_direction(&self) -> Option<ScrollDirection> {
        self.last
    }

    /// The window stored by the last update.
    #[must_use]
    pub fn previous_window(&self) -> Option<&Window<E>> {
        self.previous.as_ref()
    }

    /// Forget all history.
    pub fn reset(&mut self) {
        self.previous = None;
        self.last = None;
    }
}
