#![forbid(unsafe_code)]

//! The list-level visibility engine.
//!
//! [`VisibilityEngine`] owns one list's [`CellRegistry`], its current
//! [`DataSnapshot`] and the [`VisibilityStrategy`] picked at construction.
//! The host forwards row lifecycle callbacks and list events to it; the
//! engine drives each mounted cell's visibility in response.
//!
//! # Usage
//!
//! ```
//! use std::rc::Rc;
//! use cellvis::{
//!     LayoutRect, ResolverMode, RowCell, RowKey, ScrollEvent, VisibilityConfig, VisibilityEngine,
//! };
//!
//! let mut engine = VisibilityEngine::new(VisibilityConfig::default(), ResolverMode::Window);
//! let cell = Rc::new(RowCell::new());
//! let key = RowKey::new(0, 0);
//! engine.report_mount(key.clone(), &cell);
//! engine.report_layout(&key, LayoutRect::new(0.0, 2000.0, 320.0, 48.0));
//! engine.on_scroll(ScrollEvent::new(0.0, 600.0));
//! assert!(cell.placeholder().is_some());
//! ```
//!
//! # Failure Modes
//!
//! Events referencing rows that are not mounted are skipped and counted in
//! [`ReconcileReport::skipped`]. Nothing here panics or returns an error
//! except [`VisibilityEngine::extent_of`] for keys outside the data source.

use std::rc::Rc;

use crate::cell::CellHandle;
use crate::config::VisibilityConfig;
use crate::geometry::{LayoutRect, Span};
use crate::interval::Extent;
use crate::key::{RowKey, RowMap};
use crate::registry::{CellRegistry, LayoutChange};
use crate::resolver::{
    HostCapabilities, ReconcileReport, ResolveContext, ResolverMode, VisibilityStrategy,
    strategy_for,
};
use crate::snapshot::{DataSnapshot, ExtentError, locate_extent};

/// A raw scroll event along the list's axis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollEvent {
    /// Scroll offset of the viewport's leading edge.
    pub offset: f64,
    /// Viewport length along the axis.
    pub visible_length: f64,
}

impl ScrollEvent {
    #[must_use]
    pub const fn new(offset: f64, visible_length: f64) -> Self {
        Self {
            offset,
            visible_length,
        }
    }

    /// The strictly visible span `[offset, offset + visible_length)`.
    #[must_use]
    pub fn window(&self) -> Span {
        Span::with_length(self.offset, self.visible_length)
    }
}

/// Cumulative counters over the engine's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Row-map and scroll events handled.
    pub events: u64,
    pub mounts: u64,
    pub unmounts: u64,
    pub layouts: u64,
    /// `set_visibility` calls issued.
    pub visibility_changes: u64,
    /// Event rows skipped because they were not mounted.
    pub skipped: u64,
    /// Data-source replacements.
    pub resets: u64,
}

impl EngineStats {
    fn absorb(&mut self, report: &ReconcileReport) {
        self.visibility_changes += report.changes() as u64;
        self.skipped += report.skipped as u64;
    }
}

/// Visibility engine for one list.
pub struct VisibilityEngine {
    config: VisibilityConfig,
    registry: CellRegistry,
    strategy: Box<dyn VisibilityStrategy>,
    snapshot: Option<DataSnapshot>,
    stats: EngineStats,
}

impl VisibilityEngine {
    /// Create an engine running the given mode.
    #[must_use]
    pub fn new(config: VisibilityConfig, mode: ResolverMode) -> Self {
        let config = config.normalized();
        let strategy = strategy_for(mode, &config);
        Self::with_strategy(config, strategy)
    }

    /// Create an engine for whatever the host can deliver.
    #[must_use]
    pub fn from_capabilities(config: VisibilityConfig, capabilities: HostCapabilities) -> Self {
        Self::new(config, capabilities.select())
    }

    /// Create an engine around a custom strategy.
    #[must_use]
    pub fn with_strategy(config: VisibilityConfig, strategy: Box<dyn VisibilityStrategy>) -> Self {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            message = "cellvis.engine.new",
            mode = ?strategy.mode(),
            preemptive_rows = config.preemptive_rows,
            preemptive_distance = config.preemptive_distance,
        );
        Self {
            config,
            registry: CellRegistry::new(),
            strategy,
            snapshot: None,
            stats: EngineStats::default(),
        }
    }

    // ── Accessors ───────────────────────────────────────────────────

    #[must_use]
    pub fn mode(&self) -> ResolverMode {
        self.strategy.mode()
    }

    #[must_use]
    pub fn config(&self) -> &VisibilityConfig {
        &self.config
    }

    /// Replace the configuration. Look-ahead changes apply from the next event.
    pub fn set_config(&mut self, config: VisibilityConfig) {
        self.config = config.normalized();
        self.strategy.reconfigure(&self.config);
    }

    #[must_use]
    pub fn registry(&self) -> &CellRegistry {
        &self.registry
    }

    #[must_use]
    pub fn snapshot(&self) -> Option<&DataSnapshot> {
        self.snapshot.as_ref()
    }

    #[must_use]
    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// Whether `key` is currently held visible for look-ahead.
    #[must_use]
    pub fn is_preemptive(&self, key: &RowKey) -> bool {
        self.strategy
            .preemptive()
            .is_some_and(|set| set.contains(key))
    }

    /// Rows currently held visible for look-ahead, in list order.
    #[must_use]
    pub fn preemptive_rows(&self) -> Vec<RowKey> {
        self.strategy
            .preemptive()
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    // ── Row lifecycle ───────────────────────────────────────────────

    /// A row wrapper mounted. Returns `true` if it replaced a live entry.
    pub fn report_mount<C: CellHandle + 'static>(&mut self, key: RowKey, cell: &Rc<C>) -> bool {
        self.stats.mounts += 1;
        let replaced = self.registry.register(key.clone(), cell);
        if replaced {
            self.strategy.row_replaced(&key);
        }
        #[cfg(feature = "tracing")]
        tracing::trace!(message = "cellvis.mount", key = %key, replaced);
        let cx = Self::context(&self.config, &self.registry, self.snapshot.as_ref());
        self.strategy.row_mounted(&cx, &key);
        replaced
    }

    /// A row reported its layout rectangle.
    pub fn report_layout(&mut self, key: &RowKey, rect: LayoutRect) -> ReconcileReport {
        self.stats.layouts += 1;
        let change = self.registry.record_layout(key, rect);
        if change == LayoutChange::Unknown {
            self.stats.skipped += 1;
            return ReconcileReport {
                skipped: 1,
                ..ReconcileReport::default()
            };
        }
        if let Some(cell) = self.registry.lookup(key) {
            cell.layout_changed(rect);
        }
        let cx = Self::context(&self.config, &self.registry, self.snapshot.as_ref());
        let report = self.strategy.layout_changed(&cx, key, rect, change);
        self.stats.absorb(&report);
        report
    }

    /// A row wrapper unmounted. Absent keys are a no-op.
    pub fn report_unmount(&mut self, key: &RowKey) -> bool {
        let removed = self.registry.unregister(key);
        if removed {
            self.stats.unmounts += 1;
            self.strategy.row_unmounted(key);
        }
        #[cfg(feature = "tracing")]
        tracing::trace!(message = "cellvis.unmount", key = %key, removed);
        removed
    }

    // ── List events ─────────────────────────────────────────────────

    /// Visible/changed row maps from the host (explicit delta).
    pub fn on_visible_rows_changed(&mut self, visible: &RowMap, changed: &RowMap) -> ReconcileReport {
        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!(
            "cellvis.rows_changed",
            visible = visible.len(),
            changed = changed.len()
        )
        .entered();

        let cx = Self::context(&self.config, &self.registry, self.snapshot.as_ref());
        let report = self.strategy.rows_changed(&cx, visible, changed);
        self.finish(report)
    }

    /// A raw scroll event from the host.
    pub fn on_scroll(&mut self, event: ScrollEvent) -> ReconcileReport {
        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!(
            "cellvis.scroll",
            offset = event.offset,
            visible_length = event.visible_length
        )
        .entered();

        let cx = Self::context(&self.config, &self.registry, self.snapshot.as_ref());
        let report = self.strategy.scrolled(&cx, event.window());
        self.finish(report)
    }

    // ── Data source ─────────────────────────────────────────────────

    /// Install a new data source whose identifiers are unrelated to the old
    /// one. Every registered cell, extent and direction state is dropped.
    pub fn replace_data_source(&mut self, snapshot: DataSnapshot) {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            message = "cellvis.replace_data_source",
            dropped = self.registry.len(),
            rows = snapshot.row_count(),
        );
        self.registry.clear();
        self.strategy.reset();
        self.snapshot = Some(snapshot);
        self.stats.resets += 1;
    }

    /// Install a new snapshot of the same data source. Row identifiers must
    /// be stable (rows appended or reordered, not re-keyed); all state is
    /// kept.
    pub fn update_data_source(&mut self, snapshot: DataSnapshot) {
        self.snapshot = Some(snapshot);
    }

    /// The synthetic extent of `key` under the current data source.
    pub fn extent_of(&self, key: &RowKey) -> Result<Option<Extent>, ExtentError> {
        let snapshot = self
            .snapshot
            .as_ref()
            .ok_or(ExtentError::MissingDataSource)?;
        locate_extent(snapshot, &self.registry, self.config.axis, key)
    }

    // ── Internals ───────────────────────────────────────────────────

    fn context<'a>(
        config: &VisibilityConfig,
        registry: &'a CellRegistry,
        snapshot: Option<&'a DataSnapshot>,
    ) -> ResolveContext<'a> {
        ResolveContext {
            registry,
            snapshot,
            axis: config.axis,
            unmeasured: config.unmeasured,
        }
    }

    fn finish(&mut self, report: ReconcileReport) -> ReconcileReport {
        self.stats.events += 1;
        self.stats.absorb(&report);
        #[cfg(feature = "tracing")]
        tracing::debug!(
            message = "cellvis.reconcile",
            mode = ?self.strategy.mode(),
            shown = report.shown,
            hidden = report.hidden,
            skipped = report.skipped,
            examined = report.examined,
            direction = ?report.direction,
            reversed = report.reversed,
        );
        report
    }
}

impl std::fmt::Debug for VisibilityEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisibilityEngine")
            .field("mode", &self.strategy.mode())
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("stats", &self.stats)
            .finish()
    }
}
