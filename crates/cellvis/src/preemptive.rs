#![forbid(unsafe_code)]

//! Look-ahead bookkeeping for explicit-delta mode.
//!
//! [`PreemptiveSet`] holds the rows forced visible only because they sit
//! just past the visible rows in the scroll direction. Each reconcile:
//!
//! 1. Drops rows that are now in the visible set (they are owned by the
//!    regular visibility pass again).
//! 2. On a direction reversal, hides and forgets every remaining row.
//! 3. Walks up to `depth` rows past the first (toward start) or last
//!    (toward end) visible row, forcing each mounted row visible. The walk
//!    stops at the first row that is not mounted.
//! 4. Hides rows from the previous cycle that the walk did not reach.
//!
//! Membership has set semantics: registering or walking the same row twice
//! in a cycle never double-counts.

use std::collections::BTreeSet;

use crate::cell::drive;
use crate::direction::{DirectionUpdate, ScrollDirection};
use crate::key::{RowKey, RowMap};
use crate::registry::CellRegistry;

/// Counters from one reconcile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreemptiveOutcome {
    /// Rows newly added to the set.
    pub added: usize,
    /// Rows removed from the set (reversal or no longer reached).
    pub evicted: usize,
    /// Visibility changes to `true` actually requested.
    pub shown: usize,
    /// Visibility changes to `false` actually requested.
    pub hidden: usize,
}

/// Rows currently kept visible for look-ahead.
#[derive(Debug, Clone, Default)]
pub struct PreemptiveSet {
    rows: BTreeSet<RowKey>,
}

impl PreemptiveSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, key: &RowKey) -> bool {
        self.rows.contains(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows in list order.
    pub fn iter(&self) -> impl Iterator<Item = &RowKey> {
        self.rows.iter()
    }

    /// Forget a row without touching its cell (row unmounted).
    pub fn forget(&mut self, key: &RowKey) -> bool {
        self.rows.remove(key)
    }

    /// Hide every row in the set and clear it.
    pub fn evict_all(&mut self, registry: &CellRegistry) -> PreemptiveOutcome {
        let mut outcome = PreemptiveOutcome::default();
        for key in std::mem::take(&mut self.rows) {
            outcome.evicted += 1;
            if let Some(cell) = registry.lookup(&key) {
                outcome.hidden += usize::from(drive(cell.as_ref(), false));
            }
        }
        outcome
    }

    /// Reconcile the set against the current visible rows.
    ///
    /// An empty `visible` map leaves the set untouched.
    pub fn reconcile(
        &mut self,
        registry: &CellRegistry,
        visible: &RowMap,
        update: DirectionUpdate,
        depth: usize,
    ) -> PreemptiveOutcome {
        let mut outcome = PreemptiveOutcome::default();
        let (Some(first), Some(last)) = (visible.first_key(), visible.last_key()) else {
            return outcome;
        };

        for key in visible.keys() {
            self.rows.remove(key);
        }

        if update.reversed {
            let evicted = self.evict_all(registry);
            outcome.evicted += evicted.evicted;
            outcome.hidden += evicted.hidden;
        }

        let (anchor, step) = match update.direction {
            ScrollDirection::TowardStart => (first, -1),
            ScrollDirection::TowardEnd => (last, 1),
        };
        let mut walked = BTreeSet::new();
        for i in 1..=depth as i64 {
            let Some(key) = anchor.offset(step * i) else {
                break;
            };
            let Some(cell) = registry.lookup(&key) else {
                break;
            };
            outcome.shown += usize::from(drive(cell.as_ref(), true));
            if !self.rows.contains(&key) {
                outcome.added += 1;
            }
            walked.insert(key);
        }

        for key in std::mem::replace(&mut self.rows, walked) {
            if self.rows.contains(&key) {
                continue;
            }
            outcome.evicted += 1;
            if let Some(cell) = registry.lookup(&key) {
                outcome.hidden += usize::from(drive(cell.as_ref(), false));
            }
        }

        outcome
    }
}
