#![forbid(unsafe_code)]

//! Visibility resolution strategies.
//!
//! A list host delivers one of two event shapes:
//!
//! - **Explicit delta**: maps of visible rows and changed rows.
//!   Handled by [`DeltaResolver`], which adds row-count look-ahead.
//! - **Window**: a scroll offset plus the visible length, with per-row
//!   layout rectangles. Handled by [`WindowResolver`], which queries an
//!   [`IntervalIndex`](crate::interval::IntervalIndex) and adds a
//!   distance look-ahead.
//!
//! Both implement [`VisibilityStrategy`]. The strategy is chosen once, from
//! [`HostCapabilities`], when the engine is built. Each strategy still
//! accepts the other event shape so a host that mixes them keeps working.
//!
//! # Boundary Rule
//!
//! Visibility uses half-open spans: a row whose extent merely touches the
//! window edge is not visible.

mod delta;
mod window;

pub use delta::DeltaResolver;
pub use window::WindowResolver;

use crate::cell::drive;
use crate::config::{UnmeasuredPolicy, VisibilityConfig};
use crate::direction::ScrollDirection;
use crate::geometry::{Axis, LayoutRect, Span};
use crate::key::{RowKey, RowMap};
use crate::preemptive::{PreemptiveOutcome, PreemptiveSet};
use crate::registry::{CellRegistry, LayoutChange};
use crate::snapshot::DataSnapshot;

/// Which event shape drives resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolverMode {
    /// Visible/changed row maps from the host.
    ExplicitDelta,
    /// Scroll offsets against measured extents.
    Window,
}

/// What the host list primitive can deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HostCapabilities {
    /// The host emits visible-row change events.
    pub visible_row_events: bool,
    /// The host reports per-row layout rectangles.
    pub layout_extents: bool,
}

impl HostCapabilities {
    /// Pick the resolver mode.
    ///
    /// Row events win; layout extents alone select window mode; with
    /// neither, explicit-delta mode runs on synthetic extents.
    #[must_use]
    pub fn select(self) -> ResolverMode {
        if self.visible_row_events {
            ResolverMode::ExplicitDelta
        } else if self.layout_extents {
            ResolverMode::Window
        } else {
            ResolverMode::ExplicitDelta
        }
    }
}

/// Read-only state a strategy works against.
#[derive(Clone, Copy)]
pub struct ResolveContext<'a> {
    pub registry: &'a CellRegistry,
    pub snapshot: Option<&'a DataSnapshot>,
    pub axis: Axis,
    pub unmeasured: UnmeasuredPolicy,
}

/// Outcome of one event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// `set_visibility(true)` calls issued.
    pub shown: usize,
    /// `set_visibility(false)` calls issued.
    pub hidden: usize,
    /// Rows referenced by the event but not mounted.
    pub skipped: usize,
    /// Rows considered.
    pub examined: usize,
    /// Interval-tree nodes touched by the query (window mode).
    pub nodes_visited: usize,
    /// Classified direction, if the event carried a window.
    pub direction: Option<ScrollDirection>,
    pub reversed: bool,
    /// Look-ahead bookkeeping (explicit-delta mode).
    pub preemptive: PreemptiveOutcome,
}

impl ReconcileReport {
    /// Total visibility changes requested.
    #[must_use]
    pub fn changes(&self) -> usize {
        self.shown + self.hidden
    }

    fn record(&mut self, visible: bool, changed: bool) {
        if changed {
            if visible {
                self.shown += 1;
            } else {
                self.hidden += 1;
            }
        }
    }

    fn absorb(&mut self, outcome: PreemptiveOutcome) {
        self.shown += outcome.shown;
        self.hidden += outcome.hidden;
        self.preemptive = outcome;
    }
}

/// One visibility resolution strategy.
pub trait VisibilityStrategy {
    fn mode(&self) -> ResolverMode;

    /// Handle a visible/changed row map event.
    fn rows_changed(
        &mut self,
        cx: &ResolveContext<'_>,
        visible: &RowMap,
        changed: &RowMap,
    ) -> ReconcileReport;

    /// Handle a scroll event. `window` is the strictly visible span.
    fn scrolled(&mut self, cx: &ResolveContext<'_>, window: Span) -> ReconcileReport;

    /// A row mounted (or remounted).
    fn row_mounted(&mut self, _cx: &ResolveContext<'_>, _key: &RowKey) {}

    /// A row reported a layout.
    fn layout_changed(
        &mut self,
        cx: &ResolveContext<'_>,
        key: &RowKey,
        rect: LayoutRect,
        change: LayoutChange,
    ) -> ReconcileReport;

    /// A row unmounted.
    fn row_unmounted(&mut self, key: &RowKey);

    /// A live row was mounted again under the same key, replacing its cell
    /// without an unmount in between. Treated as an unmount by default.
    fn row_replaced(&mut self, key: &RowKey) {
        self.row_unmounted(key);
    }

    /// Apply new look-ahead settings.
    fn reconfigure(&mut self, config: &VisibilityConfig);

    /// Forget all per-list state.
    fn reset(&mut self);

    /// Rows held visible for look-ahead, if the strategy tracks them.
    fn preemptive(&self) -> Option<&PreemptiveSet> {
        None
    }
}

/// Build the strategy for `mode`.
#[must_use]
pub fn strategy_for(mode: ResolverMode, config: &VisibilityConfig) -> Box<dyn VisibilityStrategy> {
    match mode {
        ResolverMode::ExplicitDelta => Box::new(DeltaResolver::new(config.preemptive_rows)),
        ResolverMode::Window => Box::new(WindowResolver::new(config.preemptive_distance)),
    }
}

/// Apply a visible/changed pair.
///
/// Changed rows take their supplied value; every row in `visible` is then
/// forced visible, since some hosts leave newly visible rows out of the
/// changed map.
pub(crate) fn apply_row_delta(
    registry: &CellRegistry,
    visible: &RowMap,
    changed: &RowMap,
) -> ReconcileReport {
    let mut report = ReconcileReport::default();
    for (key, &value) in changed.iter() {
        report.examined += 1;
        match registry.lookup(key) {
            Some(cell) => report.record(value, drive(cell.as_ref(), value)),
            None => report.skipped += 1,
        }
    }
    for key in visible.keys() {
        report.examined += 1;
        match registry.lookup(key) {
            Some(cell) => report.record(true, drive(cell.as_ref(), true)),
            None => report.skipped += 1,
        }
    }
    report
}
