//! Table engine for Horizon Lattice.
//!
//! This crate turns a dataset into the rows a table widget renders:
//!
//! - **Row model**: Flat lists, nested trees, or parent-linked records,
//!   normalized into one keyed model
//! - **Filtering**: Global search plus typed per-column filters, keeping
//!   the ancestors of matching tree rows
//! - **Sorting**: Stable multi-key sorting that keeps children under their
//!   parents
//! - **Selection**: Checkbox selection with cascading toggles and derived
//!   indeterminate states
//! - **Pagination**: By rows or by top-level groups
//! - **Views**: Immutable snapshots from a serializable [`TableState`]
//!
//! Rendering is out of scope; the engine only computes what to show.
//!
//! # Example
//!
//! ```
//! use horizon_lattice_table::prelude::*;
//!
//! struct Person {
//!     id: u32,
//!     name: &'static str,
//!     age: i64,
//! }
//!
//! let columns = ColumnSet::new(vec![
//!     Column::new("name", |p: &Person| p.name.into()).title("Name"),
//!     Column::new("age", |p: &Person| p.age.into()).title("Age"),
//! ])
//! .unwrap();
//!
//! let rows = RawRows::Flat(vec![
//!     Person { id: 1, name: "Ada", age: 36 },
//!     Person { id: 2, name: "Grace", age: 85 },
//!     Person { id: 3, name: "Alan", age: 41 },
//! ]);
//!
//! let state = TableState {
//!     filter: FilterState::new().with_search("a"),
//!     sort: SortState::by("age", SortDirection::Desc),
//!     ..TableState::default()
//! };
//!
//! let key_of = |p: &Person| p.id.to_string();
//! let view = build_view(rows, key_of, &columns, &state, &TableConfig::default()).unwrap();
//!
//! let names: Vec<_> = view.visible_entries().iter().map(|e| e.record().name).collect();
//! assert_eq!(names, vec!["Grace", "Alan", "Ada"]);
//! ```

pub mod column;
pub mod config;
pub mod controller;
pub mod expansion;
pub mod filter;
pub mod logging;
pub mod pagination;
pub mod row_model;
pub mod selection;
pub mod sort;
pub mod value;
pub mod view;

mod error;

pub use column::{Column, ColumnSet};
pub use config::TableConfig;
pub use controller::TableController;
pub use error::{Result, TableError, TableWarning, WarningContext};
pub use expansion::ExpansionState;
pub use filter::{ColumnFilter, FilterState};
pub use pagination::{PageBy, PageInfo, PaginationState};
pub use row_model::{Entry, RawRows, RowMode, RowModel, RowNode, normalize};
pub use selection::{Selection, SelectionStatus, StatusMap};
pub use sort::{SortDirection, SortKey, SortState};
pub use value::CellValue;
pub use view::{TableState, ViewSnapshot, build_view, compose_view};

/// Prelude module with commonly used types.
pub mod prelude {
    pub use crate::column::{Column, ColumnSet};
    pub use crate::config::TableConfig;
    pub use crate::controller::TableController;
    pub use crate::error::{Result, TableError, TableWarning};
    pub use crate::expansion::ExpansionState;
    pub use crate::filter::{ColumnFilter, FilterState};
    pub use crate::pagination::{PageBy, PaginationState};
    pub use crate::row_model::{RawRows, RowNode};
    pub use crate::selection::{Selection, SelectionStatus};
    pub use crate::sort::{SortDirection, SortKey, SortState};
    pub use crate::value::CellValue;
    pub use crate::view::{TableState, ViewSnapshot, build_view, compose_view};
}
