#![forbid(unsafe_code)]

//! Interval index over cell extents.
//!
//! # Design
//!
//! An AVL tree ordered by `(start, key)` and augmented with the maximum
//! `end` of each subtree. Nodes live in an arena (`Vec<Node>`) and refer to
//! each other by index; removed slots go on a free list and are recycled,
//! the same way the layout dependency graph recycles node slots.
//!
//! A side map from [`RowKey`] to the stored span makes removal by identity
//! O(log n): the span locates the node in the ordered tree.
//!
//! ### Complexity
//!
//! | Operation            | Time             |
//! |----------------------|------------------|
//! | `insert`             | O(log n)         |
//! | `remove`             | O(log n)         |
//! | `get`                | O(1) amort.      |
//! | `query_overlapping`  | O(log n + k)     |
//!
//! Where k = number of extents returned.
//!
//! # Query Semantics
//!
//! [`IntervalIndex::query_overlapping`] returns every extent with
//! `end >= a && start <= b`. The bounds are closed so that extents abutting
//! the query window are returned as candidates; callers apply the
//! half-open visibility test themselves.

use std::cmp::Ordering;

use rustc_hash::FxHashMap;

use crate::geometry::Span;
use crate::key::RowKey;

/// The on-screen extent of one cell along the scroll axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Extent {
    pub key: RowKey,
    pub span: Span,
}

impl Extent {
    #[must_use]
    pub fn new(key: RowKey, span: Span) -> Self {
        Self { key, span }
    }
}

#[derive(Debug, Clone)]
struct Node {
    extent: Extent,
    /// Max `span.end` over this subtree.
    max_end: f64,
    height: u32,
    left: Option<usize>,
    right: Option<usize>,
}

/// Dynamic interval container answering overlap queries in O(log n + k).
#[derive(Debug, Clone, Default)]
pub struct IntervalIndex {
    nodes: Vec<Node>,
    free_list: Vec<usize>,
    root: Option<usize>,
    spans: FxHashMap<RowKey, Span>,
}

impl IntervalIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an index with room for `cap` extents.
    #[must_use]
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(cap),
            free_list: Vec::new(),
            root: None,
            spans: FxHashMap::with_capacity_and_hasher(cap, Default::default()),
        }
    }

    /// Number of stored extents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Height of the tree (0 when empty).
    #[must_use]
    pub fn height(&self) -> u32 {
        self.h(self.root)
    }

    /// The stored span for `key`.
    #[must_use]
    pub fn get(&self, key: &RowKey) -> Option<Span> {
        self.spans.get(key).copied()
    }

    /// Insert an extent. An existing extent for the same key is replaced.
    ///
    /// Returns the replaced span, if any.
    pub fn insert(&mut self, extent: Extent) -> Option<Span> {
        let previous = self.remove(&extent.key);
        self.spans.insert(extent.key.clone(), extent.span);
        let idx = self.alloc(extent);
        let root = self.root;
        self.root = Some(self.insert_at(root, idx));
        previous
    }

    /// Remove the extent owned by `key`. Absent keys are a no-op.
    pub fn remove(&mut self, key: &RowKey) -> Option<Span> {
        let span = self.spans.remove(key)?;
        let root = self.root;
        self.root = self.remove_at(root, span.start, key);
        Some(span)
    }

    /// Remove every extent.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free_list.clear();
        self.root = None;
        self.spans.clear();
    }

    /// All extents with `end >= a && start <= b`, in unspecified order.
    #[must_use]
    pub fn query_overlapping(&self, a: f64, b: f64) -> Overlapping<'_> {
        let mut stack = Vec::new();
        if let Some(root) = self.root {
            stack.push(root);
        }
        Overlapping {
            index: self,
            window: Span { start: a, end: b },
            stack,
            visited: 0,
        }
    }

    /// Extents in `(start, key)` order.
    #[must_use]
    pub fn to_sorted_vec(&self) -> Vec<Extent> {
        let mut out = Vec::with_capacity(self.len());
        let mut stack = Vec::new();
        let mut cur = self.root;
        while cur.is_some() || !stack.is_empty() {
            while let Some(idx) = cur {
                stack.push(idx);
                cur = self.nodes[idx].left;
            }
            if let Some(idx) = stack.pop() {
                out.push(self.nodes[idx].extent.clone());
                cur = self.nodes[idx].right;
            }
        }
        out
    }

    /// Check balance, ordering and augmentation. Intended for tests.
    pub fn check_invariants(&self) -> Result<(), String> {
        let count = self.check_subtree(self.root)?.2;
        if count != self.spans.len() {
            return Err(format!(
                "tree holds {count} nodes but {} keys are indexed",
                self.spans.len()
            ));
        }
        let sorted = self.to_sorted_vec();
        for pair in sorted.windows(2) {
            if compare(&pair[0].span, &pair[0].key, pair[1].span.start, &pair[1].key)
                != Ordering::Less
            {
                return Err(format!("out of order: {} before {}", pair[0].key, pair[1].key));
            }
        }
        Ok(())
    }

    // ── Arena ───────────────────────────────────────────────────────

    fn alloc(&mut self, extent: Extent) -> usize {
        let node = Node {
            max_end: extent.span.end,
            extent,
            height: 1,
            left: None,
            right: None,
        };
        if let Some(slot) = self.free_list.pop() {
            self.nodes[slot] = node;
            slot
        } else {
            self.nodes.push(node);
            self.nodes.len() - 1
        }
    }

    fn release(&mut self, idx: usize) {
        self.nodes[idx].left = None;
        self.nodes[idx].right = None;
        self.free_list.push(idx);
    }

    // ── AVL maintenance ─────────────────────────────────────────────

    fn h(&self, idx: Option<usize>) -> u32 {
        idx.map_or(0, |i| self.nodes[i].height)
    }

    fn update(&mut self, idx: usize) {
        let (left, right) = (self.nodes[idx].left, self.nodes[idx].right);
        let mut max_end = self.nodes[idx].extent.span.end;
        for child in [left, right].into_iter().flatten() {
            max_end = max_end.max(self.nodes[child].max_end);
        }
        let height = 1 + self.h(left).max(self.h(right));
        let node = &mut self.nodes[idx];
        node.max_end = max_end;
        node.height = height;
    }

    fn rotate_right(&mut self, idx: usize) -> usize {
        let Some(pivot) = self.nodes[idx].left else {
            return idx;
        };
        self.nodes[idx].left = self.nodes[pivot].right;
        self.update(idx);
        self.nodes[pivot].right = Some(idx);
        self.update(pivot);
        pivot
    }

    fn rotate_left(&mut self, idx: usize) -> usize {
        let Some(pivot) = self.nodes[idx].right else {
            return idx;
        };
        self.nodes[idx].right = self.nodes[pivot].left;
        self.update(idx);
        self.nodes[pivot].left = Some(idx);
        self.update(pivot);
        pivot
    }

    fn rebalance(&mut self, idx: usize) -> usize {
        self.update(idx);
        let (left, right) = (self.nodes[idx].left, self.nodes[idx].right);
        let balance = self.h(left) as i64 - self.h(right) as i64;
        if balance > 1 {
            if let Some(l) = left {
                if self.h(self.nodes[l].left) < self.h(self.nodes[l].right) {
                    self.nodes[idx].left = Some(self.rotate_left(l));
                }
            }
            return self.rotate_right(idx);
        }
        if balance < -1 {
            if let Some(r) = right {
                if self.h(self.nodes[r].right) < self.h(self.nodes[r].left) {
                    self.nodes[idx].right = Some(self.rotate_right(r));
                }
            }
            return self.rotate_left(idx);
        }
        idx
    }

    fn insert_at(&mut self, at: Option<usize>, new: usize) -> usize {
        let Some(idx) = at else {
            return new;
        };
        let ord = {
            let incoming = &self.nodes[new].extent;
            let here = &self.nodes[idx].extent;
            compare(&incoming.span, &incoming.key, here.span.start, &here.key)
        };
        if ord == Ordering::Less {
            let left = self.nodes[idx].left;
            self.nodes[idx].left = Some(self.insert_at(left, new));
        } else {
            let right = self.nodes[idx].right;
            self.nodes[idx].right = Some(self.insert_at(right, new));
        }
        self.rebalance(idx)
    }

    fn remove_at(&mut self, at: Option<usize>, start: f64, key: &RowKey) -> Option<usize> {
        let idx = at?;
        let here = &self.nodes[idx].extent;
        let ord = compare_key(start, key, here.span.start, &here.key);
        match ord {
            Ordering::Less => {
                let left = self.nodes[idx].left;
                self.nodes[idx].left = self.remove_at(left, start, key);
            }
            Ordering::Greater => {
                let right = self.nodes[idx].right;
                self.nodes[idx].right = self.remove_at(right, start, key);
            }
            Ordering::Equal => {
                let (left, right) = (self.nodes[idx].left, self.nodes[idx].right);
                self.release(idx);
                return match (left, right) {
                    (None, None) => None,
                    (Some(only), None) | (None, Some(only)) => Some(only),
                    (Some(left), Some(right)) => {
                        let (rest, successor) = self.take_min(right);
                        self.nodes[successor].left = Some(left);
                        self.nodes[successor].right = rest;
                        Some(self.rebalance(successor))
                    }
                };
            }
        }
        Some(self.rebalance(idx))
    }

    /// Detach the leftmost node of the subtree. Returns `(new_root, detached)`.
    fn take_min(&mut self, idx: usize) -> (Option<usize>, usize) {
        match self.nodes[idx].left {
            None => {
                let right = self.nodes[idx].right.take();
                (right, idx)
            }
            Some(left) => {
                let (rest, min) = self.take_min(left);
                self.nodes[idx].left = rest;
                (Some(self.rebalance(idx)), min)
            }
        }
    }

    /// Returns `(height, max_end, count)` of a subtree.
    fn check_subtree(&self, at: Option<usize>) -> Result<(u32, f64, usize), String> {
        let Some(idx) = at else {
            return Ok((0, f64::NEG_INFINITY, 0));
        };
        let node = &self.nodes[idx];
        let (lh, lmax, lcount) = self.check_subtree(node.left)?;
        let (rh, rmax, rcount) = self.check_subtree(node.right)?;
        if lh.abs_diff(rh) > 1 {
            return Err(format!("unbalanced at {}: {lh} vs {rh}", node.extent.key));
        }
        let height = 1 + lh.max(rh);
        if height != node.height {
            return Err(format!("stale height at {}", node.extent.key));
        }
        let max_end = node.extent.span.end.max(lmax).max(rmax);
        if max_end != node.max_end {
            return Err(format!("stale max_end at {}", node.extent.key));
        }
        Ok((height, max_end, lcount + rcount + 1))
    }
}

fn compare(span: &Span, key: &RowKey, other_start: f64, other_key: &RowKey) -> Ordering {
    compare_key(span.start, key, other_start, other_key)
}

fn compare_key(start: f64, key: &RowKey, other_start: f64, other_key: &RowKey) -> Ordering {
    start.total_cmp(&other_start).then_with(|| key.cmp(other_key))
}

/// Iterator over the extents returned by [`IntervalIndex::query_overlapping`].
pub struct Overlapping<'a> {
    index: &'a IntervalIndex,
    window: Span,
    stack: Vec<usize>,
    visited: usize,
}

impl Overlapping<'_> {
    /// Tree nodes examined so far.
    #[must_use]
    pub fn nodes_visited(&self) -> usize {
        self.visited
    }
}

impl<'a> Iterator for Overlapping<'a> {
    type Item = &'a Extent;

    fn next(&mut self) -> Option<Self::Item> {
        let nodes = &self.index.nodes;
        while let Some(idx) = self.stack.pop() {
            self.visited += 1;
            let node = &nodes[idx];
            if node.max_end < self.window.start {
                // Nothing in this subtree reaches the window.
                continue;
            }
            if let Some(left) = node.left {
                self.stack.push(left);
            }
            if node.extent.span.start > self.window.end {
                // This node and its right subtree start past the window.
                continue;
            }
            if let Some(right) = node.right {
                self.stack.push(right);
            }
            if node.extent.span.touches(&self.window) {
                return Some(&node.extent);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ext(row: i64, start: f64, end: f64) -> Extent {
        Extent::new(RowKey::new(0, row), Span::new(start, end))
    }

    fn keys(index: &IntervalIndex, a: f64, b: f64) -> Vec<RowKey> {
        let mut out: Vec<RowKey> = index
            .query_overlapping(a, b)
            .map(|e| e.key.clone())
            .collect();
        out.sort();
        out
    }

    #[test]
    fn empty_query_yields_nothing() {
        let index = IntervalIndex::new();
        assert_eq!(index.query_overlapping(0.0, 100.0).count(), 0);
        assert_eq!(index.height(), 0);
    }

    #[test]
    fn query_includes_abutting_candidates() {
        let mut index = IntervalIndex::new();
        index.insert(ext(0, 0.0, 10.0));
        index.insert(ext(1, 10.0, 20.0));
        index.insert(ext(2, 20.0, 30.0));
        index.insert(ext(3, 31.0, 40.0));
        assert_eq!(
            keys(&index, 10.0, 20.0),
            vec![RowKey::new(0, 0), RowKey::new(0, 1), RowKey::new(0, 2)]
        );
    }

    #[test]
    fn insert_replaces_same_key() {
        let mut index = IntervalIndex::new();
        assert_eq!(index.insert(ext(0, 0.0, 10.0)), None);
        assert_eq!(index.insert(ext(0, 50.0, 60.0)), Some(Span::new(0.0, 10.0)));
        assert_eq!(index.len(), 1);
        assert!(keys(&index, 0.0, 5.0).is_empty());
        assert_eq!(keys(&index, 55.0, 56.0), vec![RowKey::new(0, 0)]);
        index.check_invariants().unwrap();
    }

    #[test]
    fn remove_absent_is_noop() {
        let mut index = IntervalIndex::new();
        index.insert(ext(0, 0.0, 10.0));
        assert_eq!(index.remove(&RowKey::new(0, 7)), None);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn remove_keeps_tree_valid() {
        let mut index = IntervalIndex::new();
        for i in 0..64 {
            index.insert(ext(i, i as f64 * 10.0, i as f64 * 10.0 + 10.0));
        }
        for i in (0..64).step_by(3) {
            assert!(index.remove(&RowKey::new(0, i)).is_some());
            index.check_invariants().unwrap();
        }
        assert_eq!(index.len(), 64 - 22);
        assert!(keys(&index, 0.0, 5.0).is_empty());
        assert_eq!(keys(&index, 12.0, 15.0), vec![RowKey::new(0, 1)]);
    }

    #[test]
    fn slots_are_recycled() {
        let mut index = IntervalIndex::new();
        index.insert(ext(0, 0.0, 1.0));
        index.insert(ext(1, 1.0, 2.0));
        index.remove(&RowKey::new(0, 0));
        index.insert(ext(2, 2.0, 3.0));
        assert_eq!(index.nodes.len(), 2);
        index.check_invariants().unwrap();
    }

    #[test]
    fn long_extent_found_through_max_end() {
        let mut index = IntervalIndex::new();
        index.insert(ext(0, 0.0, 1000.0));
        for i in 1..50 {
            index.insert(ext(i, i as f64 * 5.0, i as f64 * 5.0 + 1.0));
        }
        assert!(keys(&index, 900.0, 950.0).contains(&RowKey::new(0, 0)));
    }

    #[test]
    fn sequential_inserts_stay_logarithmic() {
        let mut index = IntervalIndex::new();
        for i in 0..1024 {
            index.insert(ext(i, i as f64, i as f64 + 1.0));
        }
        // AVL bound: h < 1.45 log2(n + 2).
        assert!(index.height() <= 15, "height {}", index.height());
        index.check_invariants().unwrap();
    }

    #[test]
    fn query_cost_is_sublinear() {
        fn visited(n: i64) -> usize {
            let mut index = IntervalIndex::with_capacity(n as usize);
            for i in 0..n {
                index.insert(ext(i, i as f64 * 10.0, i as f64 * 10.0 + 10.0));
            }
            let mid = (n / 2) as f64 * 10.0;
            let mut query = index.query_overlapping(mid, mid + 100.0);
            let hits = query.by_ref().count();
            assert_eq!(hits, 12);
            query.nodes_visited()
        }
        let small = visited(1_000);
        let large = visited(100_000);
        // 100x more extents must cost far less than 100x more work.
        assert!(large < small * 4, "small={small} large={large}");
    }

    #[test]
    fn sorted_vec_is_ordered_by_start() {
        let mut index = IntervalIndex::new();
        index.insert(ext(2, 20.0, 30.0));
        index.insert(ext(0, 0.0, 10.0));
        index.insert(ext(1, 10.0, 20.0));
        let starts: Vec<f64> = index.to_sorted_vec().iter().map(|e| e.span.start).collect();
        assert_eq!(starts, vec![0.0, 10.0, 20.0]);
    }
}
