//! View composer.
//!
//! Runs the table pipeline in its fixed order and produces an immutable
//! [`ViewSnapshot`]:
//!
//! ```text
//! normalize -> filter -> sort -> collapse -> paginate -> selection status
//! ```
//!
//! Filtering runs before sorting so discarded rows are never sorted. Sorting
//! runs before pagination so pages hold the right rows. Collapse runs after
//! both, so hidden descendants that matched a filter do not count, and before
//! pagination, so hidden rows take no page slots.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::column::ColumnSet;
use crate::config::TableConfig;
use crate::error::{Result, TableWarning};
use crate::expansion::{self, ExpansionState};
use crate::filter::{self, FilterState};
use crate::logging::targets;
use crate::pagination::{self, PageInfo, PaginationState};
use crate::row_model::{self, Entry, RawRows, RowModel};
use crate::selection::{self, Selection, SelectionStatus, StatusMap};
use crate::sort::{self, SortState};

/// All caller-owned table state.
///
/// The engine never mutates it; every interaction produces a new value that
/// is passed to [`compose_view`] again. It serializes, so a session can be
/// snapshotted and replayed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableState {
    /// Search term and column filters.
    pub filter: FilterState,
    /// Active sort.
    pub sort: SortState,
    /// Selected row keys.
    pub selection: Selection,
    /// Expanded tree rows.
    pub expansion: ExpansionState,
    /// Requested page.
    pub pagination: PaginationState,
}

impl TableState {
    /// Creates a fresh state seeded from the table configuration.
    pub fn from_config(config: &TableConfig) -> Self {
        Self {
            expansion: ExpansionState {
                default_expanded: config.default_expanded,
                ..ExpansionState::default()
            },
            pagination: PaginationState::new(0, config.default_page_size),
            ..Self::default()
        }
    }

    /// Serializes the state to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Restores a state from JSON.
    pub fn from_json(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }
}

/// The fully resolved view of a table.
///
/// Built fresh by every call to [`compose_view`] and never changed
/// afterwards, so a renderer can keep reading an older snapshot while the
/// next one is built.
#[derive(Debug, PartialEq)]
pub struct ViewSnapshot<R> {
    visible_entries: Vec<Entry<R>>,
    total_count: usize,
    matched_count: usize,
    total_filtered_count: usize,
    page: PageInfo,
    selection_status: StatusMap,
    header_status: SelectionStatus,
    expanded: BTreeSet<String>,
    warnings: Vec<TableWarning>,
}

impl<R> ViewSnapshot<R> {
    /// Rows on the current page, in display order.
    pub fn visible_entries(&self) -> &[Entry<R>] {
        &self.visible_entries
    }

    /// Number of rows in the dataset.
    pub fn total_count(&self) -> usize {
        self.total_count
    }

    /// Number of rows kept by search and column filters, including rows kept
    /// for a matching relative.
    pub fn matched_count(&self) -> usize {
        self.matched_count
    }

    /// Number of rows in the paginated sequence: filtered, sorted, and with
    /// collapsed subtrees removed.
    pub fn total_filtered_count(&self) -> usize {
        self.total_filtered_count
    }

    /// Number of pages, at least one.
    pub fn page_count(&self) -> usize {
        self.page.page_count
    }

    /// Metadata for the current page.
    pub fn page(&self) -> &PageInfo {
        &self.page
    }

    /// Selection status of every row in the dataset.
    pub fn selection_status(&self) -> &StatusMap {
        &self.selection_status
    }

    /// Selection status of one row.
    pub fn status_of(&self, key: &str) -> SelectionStatus {
        self.selection_status.get(key).copied().unwrap_or_default()
    }

    /// Combined status of the rows on the current page, for a header checkbox.
    pub fn header_status(&self) -> SelectionStatus {
        self.header_status
    }

    /// Returns true if a visible row with children is expanded.
    pub fn is_expanded(&self, key: &str) -> bool {
        self.expanded.contains(key)
    }

    /// Recovered anomalies from this build.
    pub fn warnings(&self) -> &[TableWarning] {
        &self.warnings
    }

    /// Keys of the rows on the current page.
    pub fn visible_keys(&self) -> Vec<&str> {
        self.visible_entries.iter().map(Entry::key).collect()
    }
}

impl<R> Clone for ViewSnapshot<R> {
    fn clone(&self) -> Self {
        Self {
            visible_entries: self.visible_entries.clone(),
            total_count: self.total_count,
            matched_count: self.matched_count,
            total_filtered_count: self.total_filtered_count,
            page: self.page,
            selection_status: self.selection_status.clone(),
            header_status: self.header_status,
            expanded: self.expanded.clone(),
            warnings: self.warnings.clone(),
        }
    }
}

/// Normalizes raw rows and composes their view.
///
/// # Errors
///
/// Returns the structural errors of [`row_model::normalize`]. Every other
/// anomaly is recovered and reported through [`ViewSnapshot::warnings`].
///
/// # Example
///
/// ```
/// use horizon_lattice_table::{
///     Column, ColumnSet, RawRows, SortDirection, SortState, TableConfig, TableState, build_view,
/// };
///
/// let columns = ColumnSet::new(vec![Column::new("n", |n: &i64| (*n).into())]).unwrap();
/// let state = TableState {
///     sort: SortState::by("n", SortDirection::Desc),
///     ..TableState::default()
/// };
///
/// let view = build_view(
///     RawRows::Flat(vec![3, 1, 2]),
///     |n: &i64| n.to_string(),
///     &columns,
///     &state,
///     &TableConfig::default(),
/// )
/// .unwrap();
///
/// assert_eq!(view.visible_keys(), vec!["3", "2", "1"]);
/// ```
pub fn build_view<R, K>(
    raw: RawRows<R>,
    key_of: K,
    columns: &ColumnSet<R>,
    state: &TableState,
    config: &TableConfig,
) -> Result<ViewSnapshot<R>>
where
    K: Fn(&R) -> String,
{
    let model = row_model::normalize(raw, key_of)?;
    Ok(compose_view(&model, columns, state, config))
}

/// Composes the view of an already normalized model.
pub fn compose_view<R>(
    model: &RowModel<R>,
    columns: &ColumnSet<R>,
    state: &TableState,
    config: &TableConfig,
) -> ViewSnapshot<R> {
    let _span =
        tracing::debug_span!(target: targets::VIEW, "compose_view", rows = model.len()).entered();

    let filtered = filter::filter(model, &state.filter, columns);
    let sorted = sort::sort(model, &filtered.retained, &state.sort, columns);

    let forced = if model.is_tree() && config.auto_expand_matches && filtered.is_active() {
        expansion::ancestors_of(model, &filtered.direct_matches())
    } else {
        HashSet::new()
    };
    let visible = expansion::collapse(model, &sorted.ordered, &state.expansion, &forced);

    let page = pagination::paginate(model, &visible, &state.pagination, config.page_by);

    let statuses = selection::statuses_by_position(model, &state.selection);
    let header_status = selection::aggregate_status(page.rows.iter().map(|&pos| statuses[pos]));
    let selection_status: StatusMap = statuses
        .iter()
        .enumerate()
        .map(|(pos, status)| (model.entries()[pos].key().to_string(), *status))
        .collect();

    let expanded = page
        .rows
        .iter()
        .filter(|&&pos| {
            let entry = &model.entries()[pos];
            !entry.is_leaf() && (forced.contains(&pos) || state.expansion.is_expanded(entry.key()))
        })
        .map(|&pos| model.entries()[pos].key().to_string())
        .collect();

    let warnings: Vec<TableWarning> = filtered
        .warnings
        .into_iter()
        .chain(sorted.warnings)
        .chain(page.warnings)
        .collect();

    tracing::debug!(
        target: targets::VIEW,
        total = model.len(),
        matched = filtered.retained.len(),
        visible = visible.len(),
        page = page.info.page_index,
        page_count = page.info.page_count,
        warnings = warnings.len(),
        "view composed"
    );

    ViewSnapshot {
        visible_entries: page.rows.iter().map(|&pos| model.entries()[pos].clone()).collect(),
        total_count: model.len(),
        matched_count: filtered.retained.len(),
        total_filtered_count: visible.len(),
        page: page.info,
        selection_status,
        header_status,
        expanded,
        warnings,
    }
}
