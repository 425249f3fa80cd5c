#![forbid(unsafe_code)]

//! Data-source snapshots and synthetic extents.
//!
//! Some hosts never report per-row layout rectangles or visible-row deltas,
//! only raw scroll offsets. For those, extents are synthesized by walking
//! the data source in order and stacking each mounted row's last measured
//! size along the scroll axis.
//!
//! # Invariants
//!
//! 1. Synthetic extents start at 0 and are contiguous: each extent begins
//!    where the previous one ends.
//! 2. The walk stops at the first row that is not mounted. Rows past a gap
//!    have no extent.
//! 3. A mounted row that has never been laid out contributes length 0.
//!
//! # Failure Modes
//!
//! Asking for the extent of a key that is not part of the snapshot at all is
//! a caller bug and yields [`ExtentError`]. A key that exists but is not
//! (yet) mounted yields `Ok(None)`.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::geometry::{Axis, Span};
use crate::interval::Extent;
use crate::key::{Ident, RowId, RowKey};
use crate::registry::CellRegistry;

// ============================================================================
// ExtentError
// ============================================================================

/// Error returned when a synthetic extent is requested for a key the data
/// source never contained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtentError {
    /// The section is not part of the snapshot.
    UnknownSection(Ident),
    /// The section exists but the row does not.
    UnknownRow(RowKey),
    /// No data source has been supplied.
    MissingDataSource,
}

impl fmt::Display for ExtentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSection(section) => {
                write!(f, "section {section} is not in the data source")
            }
            Self::UnknownRow(key) => write!(f, "row {key} is not in the data source"),
            Self::MissingDataSource => write!(f, "no data source has been supplied"),
        }
    }
}

impl std::error::Error for ExtentError {}

// ============================================================================
// DataSnapshot
// ============================================================================

/// Rows of one section, in display order.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionRows {
    pub id: Ident,
    pub rows: Vec<Ident>,
}

/// Section and row order of the list's data source.
#[derive(Debug, Clone, Default)]
pub struct DataSnapshot {
    sections: Vec<SectionRows>,
    section_headers: bool,
    index: FxHashMap<Ident, usize>,
}

impl DataSnapshot {
    /// Create an empty snapshot without section headers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether each section renders a header row before its items.
    #[must_use]
    pub fn with_section_headers(mut self, enabled: bool) -> Self {
        self.section_headers = enabled;
        self
    }

    /// Builder form of [`push_section`](Self::push_section).
    #[must_use]
    pub fn section<I, R>(mut self, id: impl Into<Ident>, rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Ident>,
    {
        self.push_section(id, rows);
        self
    }

    /// Append a section. A section id that is already present has its rows
    /// replaced in place.
    pub fn push_section<I, R>(&mut self, id: impl Into<Ident>, rows: I)
    where
        I: IntoIterator<Item = R>,
        R: Into<Ident>,
    {
        let id = id.into();
        let rows: Vec<Ident> = rows.into_iter().map(Into::into).collect();
        if let Some(&idx) = self.index.get(&id) {
            self.sections[idx].rows = rows;
            return;
        }
        self.index.insert(id.clone(), self.sections.len());
        self.sections.push(SectionRows { id, rows });
    }

    #[must_use]
    pub fn has_section_headers(&self) -> bool {
        self.section_headers
    }

    #[must_use]
    pub fn sections(&self) -> &[SectionRows] {
        &self.sections
    }

    /// Total number of keys, headers included.
    #[must_use]
    pub fn row_count(&self) -> usize {
        let headers = if self.section_headers {
            self.sections.len()
        } else {
            0
        };
        headers + self.sections.iter().map(|s| s.rows.len()).sum::<usize>()
    }

    /// Every key in display order.
    pub fn keys(&self) -> impl Iterator<Item = RowKey> + '_ {
        self.sections.iter().flat_map(move |section| {
            let header = self
                .section_headers
                .then(|| RowKey::header(section.id.clone()));
            header.into_iter().chain(
                section
                    .rows
                    .iter()
                    .map(move |row| RowKey::new(section.id.clone(), row.clone())),
            )
        })
    }

    /// Check that `key` names a row of this snapshot.
    pub fn check(&self, key: &RowKey) -> Result<(), ExtentError> {
        let Some(&idx) = self.index.get(&key.section) else {
            return Err(ExtentError::UnknownSection(key.section.clone()));
        };
        let known = match &key.row {
            RowId::Header => self.section_headers,
            RowId::Item(row) => self.sections[idx].rows.contains(row),
        };
        if known {
            Ok(())
        } else {
            Err(ExtentError::UnknownRow(key.clone()))
        }
    }

    #[must_use]
    pub fn contains(&self, key: &RowKey) -> bool {
        self.check(key).is_ok()
    }
}

// ============================================================================
// Synthesis
// ============================================================================

/// Stack the measured sizes of mounted rows in display order.
#[must_use]
pub fn synthesize_extents(
    snapshot: &DataSnapshot,
    registry: &CellRegistry,
    axis: Axis,
) -> Vec<Extent> {
    let mut extents = Vec::new();
    let mut cursor = 0.0;
    for key in snapshot.keys() {
        if !registry.is_mounted(&key) {
            break;
        }
        let length = registry
            .layout(&key)
            .map_or(0.0, |rect| rect.length_along(axis).max(0.0));
        extents.push(Extent::new(key, Span::with_length(cursor, length)));
        cursor += length;
    }
    extents
}

/// The synthetic extent of `key`.
///
/// Returns `Ok(None)` when the row exists but lies at or past the first
/// unmounted row.
pub fn locate_extent(
    snapshot: &DataSnapshot,
    registry: &CellRegistry,
    axis: Axis,
    key: &RowKey,
) -> Result<Option<Extent>, ExtentError> {
    snapshot.check(key)?;
    Ok(synthesize_extents(snapshot, registry, axis)
        .into_iter()
        .find(|extent| extent.key == *key))
}
