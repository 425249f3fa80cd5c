#![forbid(unsafe_code)]

//! Viewport-aware cell visibility for virtualized lists.
//!
//! A virtualized list mounts far more row wrappers than fit on screen.
//! `cellvis` decides which of them render their real content and which
//! render a same-sized placeholder, and keeps a few rows past the viewport
//! rendered ahead of the scroll direction so they never flash in empty.
//!
//! The entry point is [`VisibilityEngine`]. Hosts that report visible-row
//! deltas run it in [`ResolverMode::ExplicitDelta`]; hosts that report
//! scroll offsets and per-row layout rectangles run it in
//! [`ResolverMode::Window`], backed by an [`IntervalIndex`] so each scroll
//! tick costs O(log n + k).
//!
//! # Features
//!
//! - `config`: load [`VisibilityConfig`] from JSON.
//! - `tracing`: debug events and spans at reconcile boundaries.

pub mod cell;
pub mod config;
pub mod direction;
pub mod engine;
pub mod geometry;
pub mod interval;
pub mod key;
pub mod preemptive;
pub mod registry;
pub mod resolver;
pub mod snapshot;

pub use cell::{CellHandle, RowCell};
pub use config::{ConfigError, UnmeasuredPolicy, VisibilityConfig};
pub use direction::{DirectionUpdate, ScrollDirection, ScrollDirectionTracker, Window};
pub use engine::{EngineStats, ScrollEvent, VisibilityEngine};
pub use geometry::{Axis, LayoutRect, Span};
pub use interval::{Extent, IntervalIndex};
pub use key::{Ident, RowId, RowKey, RowMap};
pub use preemptive::{PreemptiveOutcome, PreemptiveSet};
pub use registry::{CellRegistry, LayoutChange};
pub use resolver::{
    DeltaResolver, HostCapabilities, ReconcileReport, ResolveContext, ResolverMode,
    VisibilityStrategy, WindowResolver,
};
pub use snapshot::{DataSnapshot, ExtentError, SectionRows, synthesize_extents};
