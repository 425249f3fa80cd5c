#![forbid(unsafe_code)]

//! Window resolution over measured extents.
//!
//! # Design
//!
//! Every layout report upserts the row's extent into an [`IntervalIndex`].
//! On scroll, the look-ahead window is the visible span grown by `margin`
//! on both sides. The query covers the union of the previous and the
//! current look-ahead windows, so rows that just left are revisited and
//! hidden in the same pass that shows the rows that just arrived. The first
//! scroll after construction or reset sweeps every indexed extent once.
//!
//! ### Complexity
//!
//! | Event    | Time                |
//! |----------|---------------------|
//! | scroll   | O(log n + k)        |
//! | layout   | O(log n)            |
//! | unmount  | O(log n)            |
//!
//! Where k = rows overlapping the union window.

use crate::cell::drive;
use crate::config::{UnmeasuredPolicy, VisibilityConfig};
use crate::direction::{ScrollDirectionTracker, Window};
use crate::geometry::{LayoutRect, Span};
use crate::interval::{Extent, IntervalIndex};
use crate::key::{RowKey, RowMap};
use crate::registry::LayoutChange;

use super::{ReconcileReport, ResolveContext, ResolverMode, VisibilityStrategy, apply_row_delta};

/// Scroll-window strategy over measured extents with distance look-ahead.
#[derive(Debug, Clone, Default)]
pub struct WindowResolver {
    index: IntervalIndex,
    margin: f64,
    look_ahead: Option<Span>,
    tracker: ScrollDirectionTracker<f64>,
}

impl WindowResolver {
    /// Create a resolver with the given look-ahead margin.
    #[must_use]
    pub fn new(margin: f64) -> Self {
        Self {
            margin: margin.max(0.0),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn margin(&self) -> f64 {
        self.margin
    }

    /// The extents currently indexed.
    #[must_use]
    pub fn index(&self) -> &IntervalIndex {
        &self.index
    }

    /// Look-ahead window of the last scroll event.
    #[must_use]
    pub fn look_ahead(&self) -> Option<Span> {
        self.look_ahead
    }
}

impl VisibilityStrategy for WindowResolver {
    fn mode(&self) -> ResolverMode {
        ResolverMode::Window
    }

    fn rows_changed(
        &mut self,
        cx: &ResolveContext<'_>,
        visible: &RowMap,
        changed: &RowMap,
    ) -> ReconcileReport {
        apply_row_delta(cx.registry, visible, changed)
    }

    fn scrolled(&mut self, cx: &ResolveContext<'_>, window: Span) -> ReconcileReport {
        let look_ahead = window.expand(self.margin);
        let update = self.tracker.update(Window::new(window.start, window.end));
        // Rows laid out before the first scroll have never been tested.
        let test = self.look_ahead.map_or(
            Span::new(f64::NEG_INFINITY, f64::INFINITY),
            |previous| previous.union(&look_ahead),
        );

        let mut report = ReconcileReport {
            direction: Some(update.direction),
            reversed: update.reversed,
            ..ReconcileReport::default()
        };
        let mut hits = self.index.query_overlapping(test.start, test.end);
        for extent in hits.by_ref() {
            report.examined += 1;
            let visible = extent.span.intersects(&look_ahead);
            match cx.registry.lookup(&extent.key) {
                Some(cell) => report.record(visible, drive(cell.as_ref(), visible)),
                None => report.skipped += 1,
            }
        }
        report.nodes_visited = hits.nodes_visited();

        self.look_ahead = Some(look_ahead);
        report
    }

    fn row_mounted(&mut self, cx: &ResolveContext<'_>, key: &RowKey) {
        if cx.unmeasured == UnmeasuredPolicy::Hidden {
            if let Some(cell) = cx.registry.lookup(key) {
                drive(cell.as_ref(), false);
            }
        }
    }

    fn layout_changed(
        &mut self,
        cx: &ResolveContext<'_>,
        key: &RowKey,
        rect: LayoutRect,
        change: LayoutChange,
    ) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let span = rect.span_along(cx.axis);
        match change {
            LayoutChange::Unknown | LayoutChange::Unchanged => return report,
            LayoutChange::Changed { .. } => {
                self.index.insert(Extent::new(key.clone(), span));
                return report;
            }
            LayoutChange::First => {
                self.index.insert(Extent::new(key.clone(), span));
            }
        }

        // First layout: check against the current window right away.
        report.examined = 1;
        let visible = self
            .look_ahead
            .is_none_or(|window| span.intersects(&window));
        match cx.registry.lookup(key) {
            Some(cell) => report.record(visible, drive(cell.as_ref(), visible)),
            None => report.skipped = 1,
        }
        report
    }

    fn row_unmounted(&mut self, key: &RowKey) {
        self.index.remove(key);
    }

    fn reconfigure(&mut self, config: &VisibilityConfig) {
        self.margin = config.preemptive_distance.max(0.0);
    }

    fn reset(&mut self) {
        self.index.clear();
        self.look_ahead = None;
        self.tracker.reset();
    }
}
