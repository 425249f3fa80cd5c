#![forbid(unsafe_code)]

//! Row → cell registry.
//!
//! Tracks, per [`RowKey`], a weak reference to the mounted cell and the
//! row's last reported layout rectangle.
//!
//! # Invariants
//!
//! 1. At most one live handle per key. Registering again replaces the
//!    previous handle (remount) and forgets its layout.
//! 2. A handle whose cell has been dropped is indistinguishable from an
//!    unregistered key: [`CellRegistry::lookup`] yields `None`.
//! 3. [`CellRegistry::for_each_in_order`] visits keys in ascending
//!    [`RowKey`] order.
//!
//! # Complexity
//!
//! | Operation        | Time        |
//! |------------------|-------------|
//! | `lookup`         | O(1) amort. |
//! | `register`       | O(log n)    |
//! | `unregister`     | O(log n)    |
//! | `for_each_in_order` | O(n)     |

use std::collections::BTreeSet;
use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;

use crate::cell::CellHandle;
use crate::geometry::LayoutRect;
use crate::key::RowKey;

struct Slot {
    handle: Weak<dyn CellHandle>,
    layout: Option<LayoutRect>,
}

/// What a layout report changed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LayoutChange {
    /// The row was not registered; nothing was recorded.
    Unknown,
    /// First layout since the row was (re)mounted.
    First,
    /// The row moved or resized.
    Changed { previous: LayoutRect },
    /// Identical to the stored layout.
    Unchanged,
}

/// Registry of mounted cells keyed by row.
#[derive(Default)]
pub struct CellRegistry {
    slots: FxHashMap<RowKey, Slot>,
    order: BTreeSet<RowKey>,
}

impl CellRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the cell for `key`.
    ///
    /// Returns `true` if a previous entry was replaced.
    pub fn register<C: CellHandle + 'static>(&mut self, key: RowKey, cell: &Rc<C>) -> bool {
        let handle: Weak<C> = Rc::downgrade(cell);
        let slot = Slot {
            handle,
            layout: None,
        };
        match self.slots.insert(key.clone(), slot) {
            Some(_) => true,
            None => {
                self.order.insert(key);
                false
            }
        }
    }

    /// Remove `key`. Absent keys are a no-op.
    ///
    /// Returns `true` if an entry was removed.
    pub fn unregister(&mut self, key: &RowKey) -> bool {
        if self.slots.remove(key).is_some() {
            self.order.remove(key);
            true
        } else {
            false
        }
    }

    /// The live cell for `key`, if mounted.
    #[must_use]
    pub fn lookup(&self, key: &RowKey) -> Option<Rc<dyn CellHandle>> {
        self.slots.get(key)?.handle.upgrade()
    }

    /// Whether `key` has a live cell.
    #[must_use]
    pub fn is_mounted(&self, key: &RowKey) -> bool {
        self.slots
            .get(key)
            .is_some_and(|slot| slot.handle.strong_count() > 0)
    }

    /// Record a layout report for `key`.
    pub fn record_layout(&mut self, key: &RowKey, rect: LayoutRect) -> LayoutChange {
        let Some(slot) = self.slots.get_mut(key) else {
            return LayoutChange::Unknown;
        };
        match slot.layout.replace(rect) {
            None => LayoutChange::First,
            Some(previous) if previous == rect => LayoutChange::Unchanged,
            Some(previous) => LayoutChange::Changed { previous },
        }
    }

    /// Last reported layout for `key`.
    #[must_use]
    pub fn layout(&self, key: &RowKey) -> Option<LayoutRect> {
        self.slots.get(key)?.layout
    }

    /// Visit every live cell in ascending key order.
    ///
    /// Entries whose cell has been dropped are skipped.
    pub fn for_each_in_order<F>(&self, mut visitor: F)
    where
        F: FnMut(&RowKey, &dyn CellHandle, Option<LayoutRect>),
    {
        for key in &self.order {
            let Some(slot) = self.slots.get(key) else {
                continue;
            };
            if let Some(cell) = slot.handle.upgrade() {
                visitor(key, cell.as_ref(), slot.layout);
            }
        }
    }

    /// Drop entries whose cells no longer exist. Returns how many were removed.
    pub fn prune(&mut self) -> usize {
        let dead: Vec<RowKey> = self
            .slots
            .iter()
            .filter(|(_, slot)| slot.handle.strong_count() == 0)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &dead {
            self.unregister(key);
        }
        dead.len()
    }

    /// Forget every entry.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.order.clear();
    }

    /// Number of entries (live or not yet pruned).
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl std::fmt::Debug for CellRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CellRegistry")
            .field("entries", &self.slots.len())
            .finish()
    }
}
