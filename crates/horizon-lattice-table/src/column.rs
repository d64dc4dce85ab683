//! Column descriptors.
//!
//! A [`Column`] names a projection of a record: an accessor producing a
//! [`CellValue`], flags controlling whether the column takes part in sorting
//! and filtering, and an optional comparator that replaces the default value
//! ordering.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::error::{Result, TableError};
use crate::value::CellValue;

/// Type alias for a column accessor.
pub type AccessorFn<R> = Arc<dyn Fn(&R) -> CellValue + Send + Sync>;

/// Type alias for a column comparator.
///
/// Compares two records in ascending order. Descending sorts invert the
/// result.
pub type ComparatorFn<R> = Arc<dyn Fn(&R, &R) -> Ordering + Send + Sync>;

/// Describes one column of a table.
///
/// # Example
///
/// ```
/// use horizon_lattice_table::Column;
///
/// struct Person {
///     name: String,
///     age: u32,
/// }
///
/// let name = Column::new("name", |p: &Person| p.name.as_str().into()).title("Name");
/// let age = Column::new("age", |p: &Person| p.age.into()).filterable(false);
///
/// let alice = Person { name: "Alice".into(), age: 30 };
/// assert_eq!(name.value(&alice).as_str(), Some("Alice"));
/// assert!(!age.is_filterable());
/// ```
pub struct Column<R> {
    key: String,
    title: String,
    accessor: AccessorFn<R>,
    sortable: bool,
    filterable: bool,
    comparator: Option<ComparatorFn<R>>,
}

impl<R> Column<R> {
    /// Creates a sortable, filterable column.
    pub fn new<F>(key: impl Into<String>, accessor: F) -> Self
    where
        F: Fn(&R) -> CellValue + Send + Sync + 'static,
    {
        let key = key.into();
        Self {
            title: key.clone(),
            key,
            accessor: Arc::new(accessor),
            sortable: true,
            filterable: true,
            comparator: None,
        }
    }

    /// Sets the header title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets whether the column can be sorted.
    pub fn sortable(mut self, sortable: bool) -> Self {
        self.sortable = sortable;
        self
    }

    /// Sets whether the column takes part in search and column filters.
    pub fn filterable(mut self, filterable: bool) -> Self {
        self.filterable = filterable;
        self
    }

    /// Sets a custom comparator used instead of the default value ordering.
    pub fn comparator<F>(mut self, compare: F) -> Self
    where
        F: Fn(&R, &R) -> Ordering + Send + Sync + 'static,
    {
        self.comparator = Some(Arc::new(compare));
        self
    }

    /// Returns the column key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the header title.
    pub fn header(&self) -> &str {
        &self.title
    }

    /// Returns true if the column can be sorted.
    pub fn is_sortable(&self) -> bool {
        self.sortable
    }

    /// Returns true if the column takes part in search and column filters.
    pub fn is_filterable(&self) -> bool {
        self.filterable
    }

    /// Returns the custom comparator, if any.
    pub fn custom_comparator(&self) -> Option<&ComparatorFn<R>> {
        self.comparator.as_ref()
    }

    /// Projects a record to this column's value.
    pub fn value(&self, record: &R) -> CellValue {
        (self.accessor)(record)
    }
}

impl<R> Clone for Column<R> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            title: self.title.clone(),
            accessor: Arc::clone(&self.accessor),
            sortable: self.sortable,
            filterable: self.filterable,
            comparator: self.comparator.clone(),
        }
    }
}

impl<R> fmt::Debug for Column<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("key", &self.key)
            .field("title", &self.title)
            .field("sortable", &self.sortable)
            .field("filterable", &self.filterable)
            .field("comparator", &self.comparator.is_some())
            .finish()
    }
}

/// An ordered set of columns with unique keys.
pub struct ColumnSet<R> {
    columns: Vec<Column<R>>,
}

impl<R> ColumnSet<R> {
    /// Creates a column set, rejecting repeated keys.
    pub fn new(columns: Vec<Column<R>>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.key.as_str()) {
                return Err(TableError::duplicate_column(column.key.clone()));
            }
        }
        Ok(Self { columns })
    }

    /// Creates an empty column set.
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
        }
    }

    /// Looks up a column by key.
    pub fn get(&self, key: &str) -> Option<&Column<R>> {
        self.columns.iter().find(|c| c.key == key)
    }

    /// Returns true if a column with the key exists.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Iterates the columns in display order.
    pub fn iter(&self) -> impl Iterator<Item = &Column<R>> {
        self.columns.iter()
    }

    /// Iterates the columns that take part in search.
    pub fn filterable(&self) -> impl Iterator<Item = &Column<R>> {
        self.columns.iter().filter(|c| c.filterable)
    }

    /// Returns the column keys in display order.
    pub fn keys(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.key.as_str()).collect()
    }

    /// Returns the number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if there are no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl<R> Clone for ColumnSet<R> {
    fn clone(&self) -> Self {
        Self {
            columns: self.columns.clone(),
        }
    }
}

impl<R> fmt::Debug for ColumnSet<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.columns.iter()).finish()
    }
}
