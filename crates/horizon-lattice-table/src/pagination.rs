//! Pagination engine.
//!
//! Slices the final, ordered sequence of visible rows into pages. Tree
//! tables choose between two units with [`PageBy`]:
//!
//! - [`PageBy::Rows`] counts every visible row. A parent and its children
//!   may land on different pages.
//! - [`PageBy::Roots`] counts top-level groups. Each page holds whole groups,
//!   so its row count can exceed the page size.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::TableWarning;
use crate::logging::targets;
use crate::row_model::RowModel;

/// Default number of units per page.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// The unit that page sizes count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageBy {
    /// Page by visible row count.
    #[default]
    Rows,
    /// Page by top-level visible groups.
    Roots,
}

/// Requested page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationState {
    /// Zero-based page index. Out-of-range values clamp to the last page.
    pub page_index: usize,
    /// Units per page. Zero is treated as one.
    pub page_size: usize,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self {
            page_index: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PaginationState {
    /// Creates a pagination state.
    pub fn new(page_index: usize, page_size: usize) -> Self {
        Self {
            page_index,
            page_size,
        }
    }

    /// Returns a copy pointing at another page.
    pub fn with_page(self, page_index: usize) -> Self {
        Self { page_index, ..self }
    }

    /// Returns a copy with another page size, back on the first page.
    pub fn with_page_size(self, page_size: usize) -> Self {
        Self {
            page_index: 0,
            page_size,
        }
    }

    /// Returns a copy pointing at the next page. Clamped when paginating.
    pub fn next(self) -> Self {
        self.with_page(self.page_index.saturating_add(1))
    }

    /// Returns a copy pointing at the previous page.
    pub fn previous(self) -> Self {
        self.with_page(self.page_index.saturating_sub(1))
    }
}

/// Metadata for a resolved page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    /// Page index after clamping.
    pub page_index: usize,
    /// Effective page size (never zero).
    pub page_size: usize,
    /// Number of pages, at least one.
    pub page_count: usize,
    /// Number of units (rows or root groups) across all pages.
    pub unit_count: usize,
    /// Offset of the page's first row in the full sequence.
    pub first_row: usize,
    /// Number of rows on this page.
    pub row_count: usize,
}

impl PageInfo {
    /// Returns true if a later page exists.
    pub fn has_next(&self) -> bool {
        self.page_index + 1 < self.page_count
    }

    /// Returns true if an earlier page exists.
    pub fn has_previous(&self) -> bool {
        self.page_index > 0
    }
}

/// One page of rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Arena positions on this page, in display order.
    pub rows: Vec<usize>,
    /// Page metadata.
    pub info: PageInfo,
    /// Recovered anomalies.
    pub warnings: Vec<TableWarning>,
}

/// Returns `ceil(units / page_size)`, at least one.
pub fn page_count(units: usize, page_size: usize) -> usize {
    units.div_ceil(page_size.max(1)).max(1)
}

/// Slices `rows` into the requested page.
///
/// `rows` is the final display sequence. In [`PageBy::Roots`] mode a new
/// group starts at every row whose parent is not itself in `rows`.
pub fn paginate<R>(
    model: &RowModel<R>,
    rows: &[usize],
    state: &PaginationState,
    page_by: PageBy,
) -> Page {
    let mut warnings = Vec::new();
    let page_size = if state.page_size == 0 {
        tracing::warn!(target: targets::PAGINATION, "page size 0 replaced with 1");
        warnings.push(TableWarning::ZeroPageSize);
        1
    } else {
        state.page_size
    };

    // Start offset of every unit in `rows`.
    let starts: Vec<usize> = match page_by {
        PageBy::Rows => (0..rows.len()).collect(),
        PageBy::Roots => {
            let present: HashSet<usize> = rows.iter().copied().collect();
            rows.iter()
                .enumerate()
                .filter(|(_, pos)| {
                    model
                        .parent_position(**pos)
                        .is_none_or(|p| !present.contains(&p))
                })
                .map(|(offset, _)| offset)
                .collect()
        }
    };

    let unit_count = starts.len();
    let page_count = page_count(unit_count, page_size);
    let page_index = state.page_index.min(page_count - 1);

    let first_unit = page_index * page_size;
    let (first_row, end_row) = if first_unit >= unit_count {
        (rows.len(), rows.len())
    } else {
        let end_unit = first_unit + page_size;
        let end_row = starts.get(end_unit).copied().unwrap_or(rows.len());
        (starts[first_unit], end_row)
    };

    if page_index != state.page_index {
        tracing::debug!(
            target: targets::PAGINATION,
            requested = state.page_index,
            clamped = page_index,
            "page index clamped"
        );
    }

    Page {
        rows: rows[first_row..end_row].to_vec(),
        info: PageInfo {
            page_index,
            page_size,
            page_count,
            unit_count,
            first_row,
            row_count: end_row - first_row,
        },
        warnings,
    }
}
