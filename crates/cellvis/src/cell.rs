#![forbid(unsafe_code)]

//! Cell handles.
//!
//! A cell is the host-owned wrapper around one rendered row. The engine
//! only ever holds a weak reference to it and drives a single boolean:
//! whether the row's real content is rendered, or a same-sized placeholder.

use std::cell::Cell;

use crate::geometry::LayoutRect;

/// The contract a mounted row wrapper fulfils for the engine.
///
/// Methods take `&self`; implementors use interior mutability because the
/// host framework owns the cell and the engine holds only a weak reference.
pub trait CellHandle {
    /// Render the row's content (`true`) or its placeholder (`false`).
    ///
    /// Must tolerate redundant calls.
    fn set_visibility(&self, visible: bool);

    /// Current visibility state.
    fn is_visible(&self) -> bool;

    /// Called when the host reports a new layout for this row.
    fn layout_changed(&self, _rect: LayoutRect) {}
}

/// Reference row wrapper.
///
/// Starts visible. While hidden it reports its last measured size as a
/// placeholder so the list keeps its geometry.
#[derive(Debug)]
pub struct RowCell {
    visible: Cell<bool>,
    size: Cell<Option<(f64, f64)>>,
    /// Number of observable visibility changes.
    transitions: Cell<u64>,
}

impl RowCell {
    /// Create a visible, unmeasured cell.
    #[must_use]
    pub fn new() -> Self {
        Self::with_visibility(true)
    }

    /// Create an unmeasured cell with the given initial visibility.
    #[must_use]
    pub fn with_visibility(visible: bool) -> Self {
        Self {
            visible: Cell::new(visible),
            size: Cell::new(None),
            transitions: Cell::new(0),
        }
    }

    /// Last measured `(width, height)`, if any.
    #[must_use]
    pub fn measured_size(&self) -> Option<(f64, f64)> {
        self.size.get()
    }

    /// Placeholder size to render while hidden. `None` while visible.
    ///
    /// An unmeasured hidden cell collapses to zero size.
    #[must_use]
    pub fn placeholder(&self) -> Option<(f64, f64)> {
        if self.visible.get() {
            None
        } else {
            Some(self.size.get().unwrap_or((0.0, 0.0)))
        }
    }

    /// How many times the visibility actually changed.
    #[must_use]
    pub fn transitions(&self) -> u64 {
        self.transitions.get()
    }
}

impl Default for RowCell {
    fn default() -> Self {
        Self::new()
    }
}

impl CellHandle for RowCell {
    fn set_visibility(&self, visible: bool) {
        if self.visible.get() == visible {
            return;
        }
        self.visible.set(visible);
        self.transitions.set(self.transitions.get() + 1);
    }

    fn is_visible(&self) -> bool {
        self.visible.get()
    }

    fn layout_changed(&self, rect: LayoutRect) {
        // Placeholders are laid out too; keep the content's size.
        if self.visible.get() {
            self.size.set(Some((rect.width, rect.height)));
        }
    }
}

/// Drive `cell` to `visible`, skipping the call when it already matches.
///
/// Returns whether a change was requested.
pub(crate) fn drive(cell: &dyn CellHandle, visible: bool) -> bool {
    if cell.is_visible() == visible {
        return false;
    }
    cell.set_visibility(visible);
    true
}
