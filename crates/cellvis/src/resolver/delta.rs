#![forbid(unsafe_code)]

//! Explicit-delta resolution with row-count look-ahead.
//!
//! Each event runs two passes: the row delta (changed rows, then the
//! visible rows re-asserted), and then the [`PreemptiveSet`] reconcile,
//! which walks `depth` rows past the visible rows in the scroll direction.
//!
//! Scroll events are handled on hosts that never send row deltas: with a
//! [`DataSnapshot`](crate::snapshot::DataSnapshot) present, synthetic
//! extents are intersected with the window and the result is diffed against
//! each cell's current state to build a delta.

use crate::config::VisibilityConfig;
use crate::direction::{ScrollDirectionTracker, Window};
use crate::geometry::{LayoutRect, Span};
use crate::key::{RowKey, RowMap};
use crate::preemptive::PreemptiveSet;
use crate::registry::LayoutChange;
use crate::snapshot::synthesize_extents;

use super::{
    ReconcileReport, ResolveContext, ResolverMode, VisibilityStrategy, apply_row_delta,
};

/// Row-delta strategy with row-count look-ahead.
#[derive(Debug, Clone, Default)]
pub struct DeltaResolver {
    depth: usize,
    preemptive: PreemptiveSet,
    tracker: ScrollDirectionTracker<RowKey>,
}

impl DeltaResolver {
    /// Create a resolver walking `depth` rows ahead. 0 disables look-ahead.
    #[must_use]
    pub fn new(depth: usize) -> Self {
        Self {
            depth,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Direction state over visible-row windows.
    #[must_use]
    pub fn tracker(&self) -> &ScrollDirectionTracker<RowKey> {
        &self.tracker
    }

    /// Build a (visible, changed) pair from synthetic extents.
    fn synthetic_delta(&self, cx: &ResolveContext<'_>, window: Span) -> Option<(RowMap, RowMap)> {
        let snapshot = cx.snapshot?;
        let mut visible = RowMap::new();
        let mut changed = RowMap::new();
        for extent in synthesize_extents(snapshot, cx.registry, cx.axis) {
            let want = extent.span.intersects(&window);
            if want {
                visible.insert(extent.key.clone(), true);
            }
            // Look-ahead rows outside the window belong to the reconcile.
            if !want && self.preemptive.contains(&extent.key) {
                continue;
            }
            let current = cx
                .registry
                .lookup(&extent.key)
                .map(|cell| cell.is_visible());
            if current.is_some_and(|state| state != want) {
                changed.insert(extent.key, want);
            }
        }
        Some((visible, changed))
    }
}

impl VisibilityStrategy for DeltaResolver {
    fn mode(&self) -> ResolverMode {
        ResolverMode::ExplicitDelta
    }

    fn rows_changed(
        &mut self,
        cx: &ResolveContext<'_>,
        visible: &RowMap,
        changed: &RowMap,
    ) -> ReconcileReport {
        let mut report = apply_row_delta(cx.registry, visible, changed);

        if self.depth == 0 {
            // Disabled: release anything left over from an earlier depth.
            if !self.preemptive.is_empty() {
                report.absorb(self.preemptive.evict_all(cx.registry));
            }
            return report;
        }

        let (Some(first), Some(last)) = (visible.first_key(), visible.last_key()) else {
            return report;
        };
        let update = self
            .tracker
            .update(Window::new(first.clone(), last.clone()));
        report.direction = Some(update.direction);
        report.reversed = update.reversed;
        report.absorb(
            self.preemptive
                .reconcile(cx.registry, visible, update, self.depth),
        );
        report
    }

    fn scrolled(&mut self, cx: &ResolveContext<'_>, window: Span) -> ReconcileReport {
        match self.synthetic_delta(cx, window) {
            Some((visible, changed)) => self.rows_changed(cx, &visible, &changed),
            None => ReconcileReport::default(),
        }
    }

    fn layout_changed(
        &mut self,
        _cx: &ResolveContext<'_>,
        _key: &RowKey,
        _rect: LayoutRect,
        _change: LayoutChange,
    ) -> ReconcileReport {
        ReconcileReport::default()
    }

    fn row_unmounted(&mut self, key: &RowKey) {
        self.preemptive.forget(key);
    }

    // Membership carries over to the new cell, so a later reconcile still
    // hides it once the walk no longer reaches it.
    fn row_replaced(&mut self, _key: &RowKey) {}

    fn reconfigure(&mut self, config: &VisibilityConfig) {
        self.depth = config.preemptive_rows;
    }

    fn reset(&mut self) {
        self.preemptive = PreemptiveSet::new();
        self.tracker.reset();
    }

    fn preemptive(&self) -> Option<&PreemptiveSet> {
        Some(&self.preemptive)
    }
}
