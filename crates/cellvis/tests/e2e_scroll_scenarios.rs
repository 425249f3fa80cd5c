//! E2E scroll scenarios for the visibility engine.
//!
//! Every test drives a [`VisibilityEngine`] the way a list host would
//! (mount, layout, scroll or row-delta events) and emits structured JSONL
//! records for post-hoc analysis.
//!
//! Run with: `cargo test -p cellvis --test e2e_scroll_scenarios -- --nocapture`
//!
//! JSONL schema per record:
//! ```json
//! { "test": "<name>", "phase": "<setup|execute|verify>",
//!   ...<phase-specific fields> }
//! ```

use std::cell::RefCell;
use std::io::Write as _;
use std::rc::Rc;
use std::time::Instant;

use cellvis::{
    CellHandle, DataSnapshot, HostCapabilities, LayoutRect, ReconcileReport, ResolverMode,
    RowCell, RowKey, RowMap, ScrollDirection, ScrollEvent, VisibilityConfig, VisibilityEngine,
};
use serde_json::json;

// ============================================================================
// JSONL logging
// ============================================================================

/// JSONL log buffer. Flushed to stderr at test end for capture.
struct JsonlLog {
    test: &'static str,
    start: Instant,
    entries: RefCell<Vec<serde_json::Value>>,
}

impl JsonlLog {
    fn new(test: &'static str) -> Self {
        Self {
            test,
            start: Instant::now(),
            entries: RefCell::new(Vec::new()),
        }
    }

    fn emit(&self, phase: &str, mut fields: serde_json::Value) {
        if let Some(map) = fields.as_object_mut() {
            map.insert("test".into(), json!(self.test));
            map.insert("phase".into(), json!(phase));
            map.insert(
                "timestamp_ns".into(),
                json!(self.start.elapsed().as_nanos() as u64),
            );
        }
        self.entries.borrow_mut().push(fields);
    }

    fn report(&self, label: &str, report: &ReconcileReport) {
        self.emit(
            "execute",
            json!({
                "event": label,
                "shown": report.shown,
                "hidden": report.hidden,
                "skipped": report.skipped,
                "examined": report.examined,
                "nodes_visited": report.nodes_visited,
                "direction": report.direction.map(|d| format!("{d:?}")),
                "reversed": report.reversed,
            }),
        );
    }

    fn flush(&self) {
        let entries = self.entries.borrow();
        let mut stderr = std::io::stderr().lock();
        for entry in entries.iter() {
            let _ = writeln!(stderr, "[JSONL] {}: {entry}", self.test);
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Mount rows `0..n` of section 0, each `height` tall, stacked from 0.
fn mount_stack(engine: &mut VisibilityEngine, n: i64, height: f64) -> Vec<Rc<RowCell>> {
    (0..n)
        .map(|r| {
            let key = RowKey::new(0, r);
            let cell = Rc::new(RowCell::new());
            engine.report_mount(key.clone(), &cell);
            engine.report_layout(&key, LayoutRect::new(0.0, r as f64 * height, 320.0, height));
            cell
        })
        .collect()
}

fn rows(range: std::ops::Range<i64>) -> RowMap {
    range.map(|r| (RowKey::new(0, r), true)).collect()
}

/// The changed map a host sends when the visible rows move from `old` to `new`.
fn diff(old: std::ops::Range<i64>, new: std::ops::Range<i64>) -> RowMap {
    let mut changed = RowMap::new();
    for r in old.clone() {
        if !new.contains(&r) {
            changed.insert(RowKey::new(0, r), false);
        }
    }
    for r in new {
        if !old.contains(&r) {
            changed.insert(RowKey::new(0, r), true);
        }
    }
    changed
}

fn visible_rows(cells: &[Rc<RowCell>]) -> Vec<usize> {
    cells
        .iter()
        .enumerate()
        .filter(|(_, c)| c.is_visible())
        .map(|(i, _)| i)
        .collect()
}

// ============================================================================
// Window mode
// ============================================================================

#[test]
fn e2e_window_margin_scenario() {
    let log = JsonlLog::new("window_margin_scenario");
    let config = VisibilityConfig::default().with_preemptive_distance(20.0);
    let mut engine = VisibilityEngine::new(config, ResolverMode::Window);

    let spans = [(0.0, 50.0), (50.0, 150.0), (150.0, 250.0)];
    let cells: Vec<Rc<RowCell>> = spans
        .iter()
        .enumerate()
        .map(|(r, &(start, end))| {
            let key = RowKey::new(0, r as i64);
            let cell = Rc::new(RowCell::new());
            engine.report_mount(key.clone(), &cell);
            engine.report_layout(&key, LayoutRect::new(0.0, start, 320.0, end - start));
            cell
        })
        .collect();
    log.emit("setup", json!({ "rows": spans.len(), "margin": 20.0 }));

    let report = engine.on_scroll(ScrollEvent::new(0.0, 100.0));
    log.report("scroll", &report);

    assert!(cells[0].is_visible());
    assert!(cells[1].is_visible());
    assert!(!cells[2].is_visible());
    assert_eq!(cells[2].placeholder(), Some((320.0, 100.0)));

    log.emit("verify", json!({ "visible": visible_rows(&cells), "pass": true }));
    log.flush();
}

#[test]
fn e2e_window_long_scroll_is_incremental() {
    let log = JsonlLog::new("window_long_scroll_is_incremental");
    let config = VisibilityConfig::default().with_preemptive_distance(100.0);
    let mut engine = VisibilityEngine::new(config, ResolverMode::Window);
    let cells = mount_stack(&mut engine, 10_000, 50.0);
    log.emit("setup", json!({ "rows": cells.len() }));

    // Initial sweep touches every row once.
    let first = engine.on_scroll(ScrollEvent::new(0.0, 600.0));
    log.report("initial", &first);
    assert_eq!(first.examined, cells.len());

    let mut max_examined = 0;
    let mut offset = 0.0;
    for _ in 0..200 {
        offset += 37.0;
        let report = engine.on_scroll(ScrollEvent::new(offset, 600.0));
        assert_eq!(report.direction, Some(ScrollDirection::TowardEnd));
        max_examined = max_examined.max(report.examined);
    }
    log.emit("execute", json!({ "ticks": 200, "max_examined": max_examined }));

    // [offset - 100, offset + 700) covers at most 17 rows of 50.
    let expected: Vec<usize> = (0..cells.len())
        .filter(|&r| {
            let start = r as f64 * 50.0;
            start < offset + 700.0 && start + 50.0 > offset - 100.0
        })
        .collect();
    assert_eq!(visible_rows(&cells), expected);
    assert!(max_examined < 40, "examined {max_examined} rows on one tick");

    log.emit("verify", json!({ "visible": expected, "pass": true }));
    log.flush();
}

#[test]
fn e2e_window_rows_unmounted_mid_scroll() {
    let log = JsonlLog::new("window_rows_unmounted_mid_scroll");
    let mut engine = VisibilityEngine::new(VisibilityConfig::disabled(), ResolverMode::Window);
    let cells = mount_stack(&mut engine, 20, 10.0);
    engine.on_scroll(ScrollEvent::new(0.0, 50.0));

    for r in 5..10 {
        engine.report_unmount(&RowKey::new(0, r));
    }
    let report = engine.on_scroll(ScrollEvent::new(60.0, 50.0));
    log.report("scroll", &report);

    // Unmounted rows are gone from the index, not skipped.
    assert_eq!(report.skipped, 0);
    assert!(cells[10].is_visible());
    assert!(!cells[3].is_visible());

    log.emit("verify", json!({ "pass": true }));
    log.flush();
}

// ============================================================================
// Explicit-delta mode
// ============================================================================

#[test]
fn e2e_delta_reversal_evicts_look_ahead() {
    let log = JsonlLog::new("delta_reversal_evicts_look_ahead");
    let mut engine =
        VisibilityEngine::new(VisibilityConfig::default(), ResolverMode::ExplicitDelta);
    let cells = mount_stack(&mut engine, 30, 40.0);
    engine.on_visible_rows_changed(&rows(0..30), &RowMap::new());
    engine.on_visible_rows_changed(&rows(10..15), &diff(0..30, 10..15));

    let down = engine.on_visible_rows_changed(&rows(11..16), &diff(10..15, 11..16));
    log.report("down", &down);
    assert_eq!(down.direction, Some(ScrollDirection::TowardEnd));
    assert_eq!(
        engine.preemptive_rows(),
        vec![RowKey::new(0, 16), RowKey::new(0, 17)]
    );
    assert!(cells[16].is_visible() && cells[17].is_visible());

    let up = engine.on_visible_rows_changed(&rows(9..14), &diff(11..16, 9..14));
    log.report("up", &up);
    assert!(up.reversed);
    assert!(!cells[16].is_visible());
    assert!(!cells[17].is_visible());
    assert_eq!(
        engine.preemptive_rows(),
        vec![RowKey::new(0, 7), RowKey::new(0, 8)]
    );
    assert_eq!(visible_rows(&cells), (7..14).collect::<Vec<_>>());

    log.emit("verify", json!({ "visible": visible_rows(&cells), "pass": true }));
    log.flush();
}

#[test]
fn e2e_delta_walk_stops_at_gap() {
    let log = JsonlLog::new("delta_walk_stops_at_gap");
    let config = VisibilityConfig::default().with_preemptive_rows(3);
    let mut engine = VisibilityEngine::new(config, ResolverMode::ExplicitDelta);
    let cells = mount_stack(&mut engine, 20, 40.0);
    engine.report_unmount(&RowKey::new(0, 8));

    engine.on_visible_rows_changed(&rows(11..15), &diff(0..20, 11..15));
    // Scroll toward the start: row 9 is mounted, row 8 is the gap.
    let report = engine.on_visible_rows_changed(&rows(10..14), &diff(11..15, 10..14));
    log.report("up", &report);

    assert_eq!(report.direction, Some(ScrollDirection::TowardStart));
    assert_eq!(engine.preemptive_rows(), vec![RowKey::new(0, 9)]);
    assert!(!cells[7].is_visible());

    log.emit("verify", json!({ "pass": true }));
    log.flush();
}

#[test]
fn e2e_delta_disabled_never_reaches_outside() {
    let log = JsonlLog::new("delta_disabled_never_reaches_outside");
    let mut engine =
        VisibilityEngine::new(VisibilityConfig::disabled(), ResolverMode::ExplicitDelta);
    let cells = mount_stack(&mut engine, 40, 40.0);

    let mut previous = 0..40;
    let windows = [5..10, 6..11, 12..17, 8..13, 0..5, 30..35, 29..34];
    for window in windows {
        let changed = diff(previous, window.clone());
        let report = engine.on_visible_rows_changed(&rows(window.clone()), &changed);
        log.report("rows_changed", &report);
        let expected: Vec<usize> = (window.start as usize..window.end as usize).collect();
        assert_eq!(visible_rows(&cells), expected);
        previous = window;
    }
    assert!(engine.preemptive_rows().is_empty());

    log.emit("verify", json!({ "pass": true }));
    log.flush();
}

#[test]
fn e2e_remount_stability() {
    let log = JsonlLog::new("remount_stability");
    let mut engine =
        VisibilityEngine::new(VisibilityConfig::default(), ResolverMode::ExplicitDelta);
    let cells = mount_stack(&mut engine, 10, 40.0);
    let key = RowKey::new(0, 3);

    engine.report_unmount(&key);
    let fresh = Rc::new(RowCell::new());
    engine.report_mount(key.clone(), &fresh);
    log.emit("setup", json!({ "remounted": key.to_string() }));

    engine.on_visible_rows_changed(&rows(0..2), &diff(0..10, 0..2));
    assert!(cells[3].is_visible(), "stale handle must not be driven");
    assert!(fresh.is_visible(), "row 3 is held by the look-ahead walk");
    engine.on_visible_rows_changed(&rows(6..8), &diff(0..2, 6..8));
    assert!(!fresh.is_visible());
    assert!(cells[3].is_visible());

    log.emit("verify", json!({ "pass": true }));
    log.flush();
}

// ============================================================================
// Synthetic fallback
// ============================================================================

#[test]
fn e2e_synthetic_fallback_from_scroll_offsets() {
    let log = JsonlLog::new("synthetic_fallback_from_scroll_offsets");
    let config = VisibilityConfig::default().with_preemptive_rows(1);
    let mut engine = VisibilityEngine::from_capabilities(config, HostCapabilities::default());
    assert_eq!(engine.mode(), ResolverMode::ExplicitDelta);

    let snapshot = DataSnapshot::new()
        .with_section_headers(true)
        .section(0, 0..20);
    engine.replace_data_source(snapshot);

    let header = Rc::new(RowCell::new());
    engine.report_mount(RowKey::header(0), &header);
    engine.report_layout(&RowKey::header(0), LayoutRect::from_size(320.0, 20.0));
    // Rows sit below the 20-unit header: row r spans [20 + 40r, 60 + 40r).
    let cells = mount_stack(&mut engine, 20, 40.0);
    log.emit("setup", json!({ "rows": 21 }));

    let report = engine.on_scroll(ScrollEvent::new(100.0, 120.0));
    log.report("scroll", &report);
    // [100, 220) covers rows 2..=4; row 5 is held for look-ahead.
    assert!(!header.is_visible());
    assert_eq!(visible_rows(&cells), vec![2, 3, 4, 5]);
    assert!(engine.is_preemptive(&RowKey::new(0, 5)));

    let extent = engine.extent_of(&RowKey::new(0, 2)).unwrap().unwrap();
    assert_eq!((extent.span.start, extent.span.end), (100.0, 140.0));
    assert!(engine.extent_of(&RowKey::new(0, 99)).is_err());

    let report = engine.on_scroll(ScrollEvent::new(0.0, 120.0));
    log.report("scroll_top", &report);
    assert!(header.is_visible());
    assert!(report.reversed);
    assert!(!cells[5].is_visible());

    log.emit("verify", json!({ "visible": visible_rows(&cells), "pass": true }));
    log.flush();
}

#[test]
fn e2e_replace_data_source_drops_rows() {
    let log = JsonlLog::new("replace_data_source_drops_rows");
    let mut engine =
        VisibilityEngine::new(VisibilityConfig::default(), ResolverMode::ExplicitDelta);
    let old = mount_stack(&mut engine, 10, 40.0);
    engine.on_visible_rows_changed(&rows(0..3), &diff(0..10, 0..3));

    engine.replace_data_source(DataSnapshot::new().section(0, 0..5));
    assert!(engine.registry().is_empty());
    assert!(engine.preemptive_rows().is_empty());

    // Same keys now name different rows; the old cells are never touched.
    let new = mount_stack(&mut engine, 5, 40.0);
    engine.on_visible_rows_changed(&rows(3..5), &diff(0..5, 3..5));
    log.emit(
        "verify",
        json!({ "old_visible": visible_rows(&old), "new_visible": visible_rows(&new) }),
    );
    assert_eq!(visible_rows(&old), vec![0, 1, 2, 3, 4]);
    assert_eq!(visible_rows(&new), vec![3, 4]);
    log.flush();
}
