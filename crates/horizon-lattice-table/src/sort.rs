//! Sort engine.
//!
//! Orders the rows retained by the filter. Flat rows are stable-sorted as a
//! single group. Tree rows are sorted one sibling group at a time and then
//! re-linearized depth-first, so children never move to a different parent.
//!
//! A descending sort inverts the comparator's result instead of reversing
//! the ascending output, which keeps the relative order of equal rows the
//! same in both directions.

use std::cmp::Ordering;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::column::{Column, ColumnSet};
use crate::error::{TableWarning, WarningContext};
use crate::logging::targets;
use crate::row_model::RowModel;
use crate::value::compare_cells;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    /// Smallest first.
    #[default]
    Asc,
    /// Largest first.
    Desc,
}

impl SortDirection {
    /// Returns the opposite direction.
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    /// Returns true for [`SortDirection::Desc`].
    pub fn is_descending(self) -> bool {
        self == SortDirection::Desc
    }
}

/// One `(column, direction)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortKey {
    /// Column key.
    pub column_key: String,
    /// Direction.
    pub direction: SortDirection,
}

impl SortKey {
    /// Creates an ascending sort key.
    pub fn ascending(column: impl Into<String>) -> Self {
        Self {
            column_key: column.into(),
            direction: SortDirection::Asc,
        }
    }

    /// Creates a descending sort key.
    pub fn descending(column: impl Into<String>) -> Self {
        Self {
            column_key: column.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// The active sort.
///
/// At most one primary column is active. `then_by` is an ordered list of
/// additional keys consulted when the primary comparison is equal; it is
/// empty unless the caller opts into multi-column sorting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SortState {
    /// Primary sort column, or `None` for model order.
    pub column_key: Option<String>,
    /// Primary sort direction.
    pub direction: SortDirection,
    /// Secondary sort keys, applied in order.
    pub then_by: Vec<SortKey>,
}

impl SortState {
    /// Creates an unsorted state.
    pub fn none() -> Self {
        Self::default()
    }

    /// Creates a single-column sort.
    pub fn by(column: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            column_key: Some(column.into()),
            direction,
            then_by: Vec::new(),
        }
    }

    /// Returns a copy with a secondary key appended.
    pub fn then(mut self, key: SortKey) -> Self {
        self.then_by.push(key);
        self
    }

    /// Returns the state after a header click on `column`.
    ///
    /// Clicking a new column sorts ascending; clicking the active column
    /// goes ascending, descending, then back to unsorted. Secondary keys are
    /// kept.
    pub fn cycle(&self, column: &str) -> Self {
        let mut next = self.clone();
        match (&self.column_key, self.direction) {
            (Some(active), SortDirection::Asc) if active == column => {
                next.direction = SortDirection::Desc;
            }
            (Some(active), SortDirection::Desc) if active == column => {
                next.column_key = None;
                next.direction = SortDirection::Asc;
            }
            _ => {
                next.column_key = Some(column.to_string());
                next.direction = SortDirection::Asc;
            }
        }
        next
    }

    /// Returns every sort key in priority order.
    pub fn keys(&self) -> Vec<SortKey> {
        self.column_key
            .iter()
            .map(|c| SortKey {
                column_key: c.clone(),
                direction: self.direction,
            })
            .chain(self.then_by.iter().cloned())
            .collect()
    }

    /// Returns true if any sort key is set.
    pub fn is_active(&self) -> bool {
        self.column_key.is_some() || !self.then_by.is_empty()
    }
}

/// The result of sorting.
#[derive(Debug, Clone, PartialEq)]
pub struct SortOutcome {
    /// Arena positions in display (depth-first) order.
    pub ordered: Vec<usize>,
    /// Recovered anomalies, such as sorts on unknown columns.
    pub warnings: Vec<TableWarning>,
}

/// Sorts the retained positions.
///
/// `retained` must be in model order, as produced by the filter engine.
/// Sort keys naming unknown or non-sortable columns are skipped and reported
/// as warnings; if none remain the input order is kept.
pub fn sort<R>(
    model: &RowModel<R>,
    retained: &[usize],
    state: &SortState,
    columns: &ColumnSet<R>,
) -> SortOutcome {
    let mut warnings = Vec::new();
    let keys = resolve_keys(state, columns, &mut warnings);

    if keys.is_empty() {
        return SortOutcome {
            ordered: retained.to_vec(),
            warnings,
        };
    }

    let compare = |a: usize, b: usize| -> Ordering {
        let (ra, rb) = (model.entries()[a].record(), model.entries()[b].record());
        keys.iter()
            .map(|(column, direction)| compare_records(column, *direction, ra, rb))
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
    };

    let ordered = if model.is_tree() {
        sort_tree(model, retained, &compare)
    } else {
        let mut ordered = retained.to_vec();
        ordered.sort_by(|&a, &b| compare(a, b));
        ordered
    };

    tracing::debug!(
        target: targets::SORT,
        keys = keys.len(),
        rows = ordered.len(),
        "sorted rows"
    );

    SortOutcome { ordered, warnings }
}

fn resolve_keys<'a, R>(
    state: &SortState,
    columns: &'a ColumnSet<R>,
    warnings: &mut Vec<TableWarning>,
) -> Vec<(&'a Column<R>, SortDirection)> {
    let mut keys = Vec::new();
    for key in state.keys() {
        match columns.get(&key.column_key) {
            None => {
                tracing::warn!(
                    target: targets::SORT,
                    column = %key.column_key,
                    "sort on unknown column ignored"
                );
                warnings.push(TableWarning::invalid_column(key.column_key, WarningContext::Sort));
            }
            Some(column) if !column.is_sortable() => {
                tracing::warn!(
                    target: targets::SORT,
                    column = %key.column_key,
                    "sort on non-sortable column ignored"
                );
                warnings.push(TableWarning::ColumnNotSortable { key: key.column_key });
            }
            Some(column) => keys.push((column, key.direction)),
        }
    }
    keys
}

/// Compares two records by one column.
///
/// Custom comparators are inverted for descending sorts. The default
/// comparator keeps missing values last in either direction.
fn compare_records<R>(column: &Column<R>, direction: SortDirection, a: &R, b: &R) -> Ordering {
    match column.custom_comparator() {
        Some(compare) => {
            let ord = compare(a, b);
            if direction.is_descending() { ord.reverse() } else { ord }
        }
        None => compare_cells(&column.value(a), &column.value(b), direction.is_descending()),
    }
}

/// Sorts each sibling group independently and re-linearizes depth-first.
///
/// Only retained rows take part. A retained row whose parent was not
/// retained is treated as a top-level row of the result; the filter engine
/// never produces that shape, but callers passing their own subsets may.
fn sort_tree<R, F>(model: &RowModel<R>, retained: &[usize], compare: &F) -> Vec<usize>
where
    F: Fn(usize, usize) -> Ordering,
{
    let kept: HashSet<usize> = retained.iter().copied().collect();

    let mut top: Vec<usize> = retained
        .iter()
        .copied()
        .filter(|&pos| model.parent_position(pos).is_none_or(|p| !kept.contains(&p)))
        .collect();
    top.sort_by(|&a, &b| compare(a, b));

    let mut ordered = Vec::with_capacity(retained.len());
    let mut stack: Vec<usize> = top.into_iter().rev().collect();
    while let Some(pos) = stack.pop() {
        ordered.push(pos);
        let mut siblings: Vec<usize> = model
            .child_positions(pos)
            .iter()
            .copied()
            .filter(|c| kept.contains(c))
            .collect();
        siblings.sort_by(|&a, &b| compare(a, b));
        stack.extend(siblings.into_iter().rev());
    }
    ordered
}
