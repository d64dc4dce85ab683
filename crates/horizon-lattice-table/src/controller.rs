//! Stateful table controller.
//!
//! [`TableController`] owns a row model, its columns, and the current
//! [`TableState`], and recomposes the view after every interaction. The
//! latest [`ViewSnapshot`] is shared behind an [`Arc`], so readers on other
//! threads keep a consistent view while the next one is built.
//!
//! # Example
//!
//! ```
//! use horizon_lattice_table::{Column, ColumnSet, RawRows, TableConfig, TableController};
//!
//! let columns =
//!     ColumnSet::new(vec![Column::new("name", |s: &String| s.as_str().into())]).unwrap();
//! let rows = RawRows::Flat(vec!["alpha".to_string(), "beta".to_string(), "gamma".to_string()]);
//! let table =
//!     TableController::new(rows, |s: &String| s.clone(), columns, TableConfig::default())
//!         .unwrap();
//!
//! let view = table.set_search("a");
//! assert_eq!(view.total_filtered_count(), 3);
//!
//! let view = table.set_search("mm");
//! assert_eq!(view.visible_keys(), vec!["gamma"]);
//! ```

use std::sync::Arc;

use parking_lot::RwLock;

use crate::column::ColumnSet;
use crate::config::TableConfig;
use crate::error::Result;
use crate::expansion::ExpansionState;
use crate::filter::ColumnFilter;
use crate::logging::targets;
use crate::row_model::{self, RawRows, RowModel};
use crate::selection::{self, Selection};
use crate::sort::{SortDirection, SortState};
use crate::view::{self, TableState, ViewSnapshot};

type KeyFn<R> = Box<dyn Fn(&R) -> String + Send + Sync>;

struct Inner<R> {
    model: RowModel<R>,
    state: TableState,
    snapshot: Arc<ViewSnapshot<R>>,
}

impl<R> Inner<R> {
    fn recompose(&mut self, columns: &ColumnSet<R>, config: &TableConfig) -> Arc<ViewSnapshot<R>> {
        let snapshot = view::compose_view(&self.model, columns, &self.state, config);
        // Keep the stored index in range so next/previous move from the page
        // actually shown.
        self.state.pagination.page_index = snapshot.page().page_index;
        self.snapshot = Arc::new(snapshot);
        Arc::clone(&self.snapshot)
    }
}

/// A table that holds its own state.
///
/// Every mutating method returns the freshly composed snapshot.
pub struct TableController<R> {
    columns: ColumnSet<R>,
    config: TableConfig,
    key_of: KeyFn<R>,
    inner: RwLock<Inner<R>>,
}

impl<R> TableController<R> {
    /// Creates a controller over `rows` with a state seeded from `config`.
    ///
    /// # Errors
    ///
    /// Returns the structural errors of [`row_model::normalize`].
    pub fn new<K>(
        rows: RawRows<R>,
        key_of: K,
        columns: ColumnSet<R>,
        config: TableConfig,
    ) -> Result<Self>
    where
        K: Fn(&R) -> String + Send + Sync + 'static,
    {
        let model = row_model::normalize(rows, &key_of)?;
        let state = TableState::from_config(&config);
        let snapshot = Arc::new(view::compose_view(&model, &columns, &state, &config));

        Ok(Self {
            columns,
            config,
            key_of: Box::new(key_of),
            inner: RwLock::new(Inner {
                model,
                state,
                snapshot,
            }),
        })
    }

    /// Returns the latest snapshot.
    pub fn snapshot(&self) -> Arc<ViewSnapshot<R>> {
        Arc::clone(&self.inner.read().snapshot)
    }

    /// Returns a copy of the current state.
    pub fn state(&self) -> TableState {
        self.inner.read().state.clone()
    }

    /// Returns the table configuration.
    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// Returns the column set.
    pub fn columns(&self) -> &ColumnSet<R> {
        &self.columns
    }

    /// Runs `f` against the current row model.
    pub fn with_model<T>(&self, f: impl FnOnce(&RowModel<R>) -> T) -> T {
        f(&self.inner.read().model)
    }

    /// Replaces the state wholesale, such as one restored from JSON.
    ///
    /// Selected and toggled keys missing from the model are dropped.
    pub fn restore(&self, state: TableState) -> Arc<ViewSnapshot<R>> {
        self.update(|current, model| {
            *current = TableState {
                selection: state.selection.retain_existing(model),
                expansion: state.expansion.retain_existing(model),
                ..state
            };
        })
    }

    /// Replaces the dataset.
    ///
    /// Selected and toggled keys that no longer exist are dropped. On error
    /// the previous rows and state are kept.
    ///
    /// # Errors
    ///
    /// Returns the structural errors of [`row_model::normalize`].
    pub fn set_rows(&self, rows: RawRows<R>) -> Result<Arc<ViewSnapshot<R>>> {
        let model = row_model::normalize(rows, &self.key_of)?;
        let mut inner = self.inner.write();
        inner.state.selection = inner.state.selection.retain_existing(&model);
        inner.state.expansion = inner.state.expansion.retain_existing(&model);
        inner.model = model;
        tracing::debug!(
            target: targets::CONTROLLER,
            rows = inner.model.len(),
            selected = inner.state.selection.len(),
            "rows replaced"
        );
        Ok(inner.recompose(&self.columns, &self.config))
    }

    /// Sets the global search term and returns to the first page.
    pub fn set_search(&self, term: impl Into<String>) -> Arc<ViewSnapshot<R>> {
        let term = term.into();
        self.update(move |state, _| {
            state.filter.search_term = term;
            state.pagination.page_index = 0;
        })
    }

    /// Sets or clears one column filter and returns to the first page.
    pub fn set_column_filter(
        &self,
        column: impl Into<String>,
        filter: ColumnFilter,
    ) -> Arc<ViewSnapshot<R>> {
        let column = column.into();
        self.update(move |state, _| {
            state.filter = std::mem::take(&mut state.filter).with_column_filter(column, filter);
            state.pagination.page_index = 0;
        })
    }

    /// Clears the search term and every column filter.
    pub fn clear_filters(&self) -> Arc<ViewSnapshot<R>> {
        self.update(|state, _| {
            state.filter = Default::default();
            state.pagination.page_index = 0;
        })
    }

    /// Sorts by one column, replacing any previous sort.
    pub fn sort_by(
        &self,
        column: impl Into<String>,
        direction: SortDirection,
    ) -> Arc<ViewSnapshot<R>> {
        let sort = SortState::by(column, direction);
        self.update(move |state, _| state.sort = sort)
    }

    /// Cycles a column through ascending, descending, and unsorted, as a
    /// header click does.
    pub fn cycle_sort(&self, column: &str) -> Arc<ViewSnapshot<R>> {
        self.update(|state, _| state.sort = state.sort.cycle(column))
    }

    /// Sets the sort state wholesale.
    pub fn set_sort(&self, sort: SortState) -> Arc<ViewSnapshot<R>> {
        self.update(move |state, _| state.sort = sort)
    }

    /// Toggles one row's selection, cascading to its descendants.
    pub fn toggle_row(&self, key: &str) -> Arc<ViewSnapshot<R>> {
        self.update(|state, model| {
            state.selection = selection::toggle(key, &state.selection, model)
        })
    }

    /// Toggles every row on the current page, as a header checkbox does.
    pub fn toggle_visible(&self) -> Arc<ViewSnapshot<R>> {
        let mut guard = self.inner.write();
        let inner = &mut *guard;
        let visible = inner.snapshot.visible_keys();
        inner.state.selection =
            selection::toggle_all(visible, &inner.state.selection, &inner.model);
        inner.recompose(&self.columns, &self.config)
    }

    /// Clears the selection.
    pub fn clear_selection(&self) -> Arc<ViewSnapshot<R>> {
        self.update(|state, _| state.selection = Selection::new())
    }

    /// Expands or collapses one row.
    pub fn set_expanded(&self, key: &str, expanded: bool) -> Arc<ViewSnapshot<R>> {
        self.update(|state, _| state.expansion = state.expansion.set_expanded(key, expanded))
    }

    /// Flips one row's expansion.
    pub fn toggle_expanded(&self, key: &str) -> Arc<ViewSnapshot<R>> {
        self.update(|state, _| state.expansion = state.expansion.toggle(key))
    }

    /// Expands every row.
    pub fn expand_all(&self) -> Arc<ViewSnapshot<R>> {
        self.update(|state, _| state.expansion = ExpansionState::all_expanded())
    }

    /// Collapses every row.
    pub fn collapse_all(&self) -> Arc<ViewSnapshot<R>> {
        self.update(|state, _| state.expansion = ExpansionState::all_collapsed())
    }

    /// Moves to a page. Out-of-range indices clamp to the last page.
    pub fn set_page(&self, page_index: usize) -> Arc<ViewSnapshot<R>> {
        self.update(|state, _| state.pagination = state.pagination.with_page(page_index))
    }

    /// Changes the page size and returns to the first page.
    pub fn set_page_size(&self, page_size: usize) -> Arc<ViewSnapshot<R>> {
        self.update(|state, _| state.pagination = state.pagination.with_page_size(page_size))
    }

    /// Moves to the next page, staying on the last one.
    pub fn next_page(&self) -> Arc<ViewSnapshot<R>> {
        self.update(|state, _| state.pagination = state.pagination.next())
    }

    /// Moves to the previous page, staying on the first one.
    pub fn previous_page(&self) -> Arc<ViewSnapshot<R>> {
        self.update(|state, _| state.pagination = state.pagination.previous())
    }

    fn update<F>(&self, f: F) -> Arc<ViewSnapshot<R>>
    where
        F: FnOnce(&mut TableState, &RowModel<R>),
    {
        let mut guard = self.inner.write();
        let inner = &mut *guard;
        f(&mut inner.state, &inner.model);
        inner.recompose(&self.columns, &self.config)
    }
}

impl<R> std::fmt::Debug for TableController<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("TableController")
            .field("rows", &inner.model.len())
            .field("columns", &self.columns.keys())
            .field("config", &self.config)
            .field("state", &inner.state)
            .finish_non_exhaustive()
    }
}
