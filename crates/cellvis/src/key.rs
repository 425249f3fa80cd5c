#![forbid(unsafe_code)]

//! Row identifiers.
//!
//! A row is named by the `(section, row)` pair supplied by the list's data
//! source. Both halves are opaque but comparable; numeric identifiers
//! additionally support adjacency, which the preemptive walk relies on.
//!
//! # Ordering
//!
//! [`RowKey`] orders by section, then row. Within a section the header
//! ([`RowId::Header`]) sorts before every item, numeric identifiers sort
//! before string identifiers, and numbers sort numerically. For data
//! sources that use numeric identifiers this matches list order.
//!
//! Hosts commonly hand row ids over as strings (`"0"`, `"1"`, ...). A
//! string in canonical integer form (`-?[1-9][0-9]*` or `0`) is stored as a
//! number, so `"9" < "10"` and the preemptive walk can step across it.

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;
use std::sync::Arc;

/// Row identifier sentinel the host uses for a section header.
pub const HEADER_SENTINEL: &str = "dummy";

/// An opaque, comparable identifier (number or string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Ident {
    /// Numeric identifier.
    Num(i64),
    /// String identifier.
    Str(Arc<str>),
}

impl Ident {
    /// The numeric value, if any.
    #[must_use]
    pub fn as_num(&self) -> Option<i64> {
        match self {
            Self::Num(n) => Some(*n),
            Self::Str(_) => None,
        }
    }

    /// Parse `value`, keeping it as a number when it is a canonical integer.
    fn parse(value: &str) -> Option<i64> {
        let n: i64 = value.parse().ok()?;
        // Rejects "+1", "007", "-0" and the like.
        (n.to_string() == value).then_some(n)
    }
}

impl From<i64> for Ident {
    fn from(value: i64) -> Self {
        Self::Num(value)
    }
}

impl From<i32> for Ident {
    fn from(value: i32) -> Self {
        Self::Num(i64::from(value))
    }
}

impl From<u32> for Ident {
    fn from(value: u32) -> Self {
        Self::Num(i64::from(value))
    }
}

impl From<&str> for Ident {
    fn from(value: &str) -> Self {
        match Self::parse(value) {
            Some(n) => Self::Num(n),
            None => Self::Str(Arc::from(value)),
        }
    }
}

impl From<String> for Ident {
    fn from(value: String) -> Self {
        match Self::parse(&value) {
            Some(n) => Self::Num(n),
            None => Self::Str(Arc::from(value)),
        }
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(n) => write!(f, "{n}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

/// The row half of a [`RowKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RowId {
    /// The section header.
    Header,
    /// A data row.
    Item(Ident),
}

impl From<Ident> for RowId {
    fn from(value: Ident) -> Self {
        Self::Item(value)
    }
}

impl From<i64> for RowId {
    fn from(value: i64) -> Self {
        Self::Item(Ident::Num(value))
    }
}

impl From<i32> for RowId {
    fn from(value: i32) -> Self {
        Self::Item(Ident::from(value))
    }
}

impl From<u32> for RowId {
    fn from(value: u32) -> Self {
        Self::Item(Ident::from(value))
    }
}

impl From<&str> for RowId {
    fn from(value: &str) -> Self {
        if value == HEADER_SENTINEL {
            Self::Header
        } else {
            Self::Item(Ident::from(value))
        }
    }
}

impl From<String> for RowId {
    fn from(value: String) -> Self {
        if value == HEADER_SENTINEL {
            Self::Header
        } else {
            Self::Item(Ident::from(value))
        }
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Header => f.write_str(HEADER_SENTINEL),
            Self::Item(id) => id.fmt(f),
        }
    }
}

/// Identifies one row (or section header) in the current data snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowKey {
    pub section: Ident,
    pub row: RowId,
}

impl RowKey {
    /// Create a key for a data row.
    #[must_use]
    pub fn new(section: impl Into<Ident>, row: impl Into<RowId>) -> Self {
        Self {
            section: section.into(),
            row: row.into(),
        }
    }

    /// Create a key for a section header.
    #[must_use]
    pub fn header(section: impl Into<Ident>) -> Self {
        Self {
            section: section.into(),
            row: RowId::Header,
        }
    }

    /// Whether this key names a section header.
    #[must_use]
    pub fn is_header(&self) -> bool {
        self.row == RowId::Header
    }

    /// The numerically adjacent row `delta` steps away in the same section.
    ///
    /// Returns `None` for headers, string rows, and on overflow.
    #[must_use]
    pub fn offset(&self, delta: i64) -> Option<RowKey> {
        match &self.row {
            RowId::Item(Ident::Num(n)) => Some(RowKey {
                section: self.section.clone(),
                row: RowId::Item(Ident::Num(n.checked_add(delta)?)),
            }),
            _ => None,
        }
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.section, self.row)
    }
}

/// Ordered `RowKey → bool` map, the shape of the host's visible/changed row
/// maps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowMap {
    rows: BTreeMap<RowKey, bool>,
}

impl RowMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite one row.
    pub fn insert(&mut self, key: RowKey, visible: bool) -> Option<bool> {
        self.rows.insert(key, visible)
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: RowKey, visible: bool) -> Self {
        self.rows.insert(key, visible);
        self
    }

    /// Look up a row.
    #[must_use]
    pub fn get(&self, key: &RowKey) -> Option<bool> {
        self.rows.get(key).copied()
    }

    /// Whether the row is present (regardless of its flag).
    #[must_use]
    pub fn contains(&self, key: &RowKey) -> bool {
        self.rows.contains_key(key)
    }

    /// First row in list order.
    #[must_use]
    pub fn first_key(&self) -> Option<&RowKey> {
        self.rows.keys().next()
    }

    /// Last row in list order.
    #[must_use]
    pub fn last_key(&self) -> Option<&RowKey> {
        self.rows.keys().next_back()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate rows in list order.
    pub fn iter(&self) -> btree_map::Iter<'_, RowKey, bool> {
        self.rows.iter()
    }

    /// Iterate keys in list order.
    pub fn keys(&self) -> btree_map::Keys<'_, RowKey, bool> {
        self.rows.keys()
    }
}

impl FromIterator<(RowKey, bool)> for RowMap {
    fn from_iter<I: IntoIterator<Item = (RowKey, bool)>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a RowMap {
    type Item = (&'a RowKey, &'a bool);
    type IntoIter = btree_map::Iter<'a, RowKey, bool>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
