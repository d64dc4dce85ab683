//! Error and warning types for the table engine.
//!
//! Structural problems with the input rows ([`TableError`]) abort view
//! construction. Stale references in the caller-owned state, such as a sort
//! on a column that no longer exists, are recovered locally and reported as
//! [`TableWarning`]s on the resulting snapshot.

use std::fmt;

/// Result type alias for table operations.
pub type Result<T> = std::result::Result<T, TableError>;

/// Fatal errors raised while building the row model or its configuration.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    /// Two rows normalize to the same key.
    #[error("duplicate row key '{key}'")]
    DuplicateKey { key: String },

    /// A row is its own ancestor.
    #[error("cycle detected at row '{key}'")]
    Cycle { key: String },

    /// A linked row names a parent that is not in the dataset.
    #[error("row '{key}' references unknown parent '{parent}'")]
    UnknownParent { key: String, parent: String },

    /// Two columns share the same key.
    #[error("duplicate column key '{key}'")]
    DuplicateColumn { key: String },

    /// The table configuration could not be parsed.
    #[error("invalid table config: {0}")]
    Config(#[from] toml::de::Error),

    /// The table configuration could not be written as TOML.
    #[error("cannot write table config: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    /// A serialized table state could not be read or written.
    #[error("invalid table state: {0}")]
    State(#[from] serde_json::Error),
}

impl TableError {
    /// Create a duplicate key error.
    pub fn duplicate_key(key: impl Into<String>) -> Self {
        Self::DuplicateKey { key: key.into() }
    }

    /// Create a cycle error.
    pub fn cycle(key: impl Into<String>) -> Self {
        Self::Cycle { key: key.into() }
    }

    /// Create an unknown parent error.
    pub fn unknown_parent(key: impl Into<String>, parent: impl Into<String>) -> Self {
        Self::UnknownParent {
            key: key.into(),
            parent: parent.into(),
        }
    }

    /// Create a duplicate column error.
    pub fn duplicate_column(key: impl Into<String>) -> Self {
        Self::DuplicateColumn { key: key.into() }
    }

    /// Returns true for errors caused by the shape of the row data.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::DuplicateKey { .. } | Self::Cycle { .. } | Self::UnknownParent { .. }
        )
    }
}

/// The pipeline stage that produced a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningContext {
    /// Raised while applying column filters.
    Filter,
    /// Raised while sorting.
    Sort,
    /// Raised while paginating.
    Pagination,
}

impl fmt::Display for WarningContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarningContext::Filter => write!(f, "filter"),
            WarningContext::Sort => write!(f, "sort"),
            WarningContext::Pagination => write!(f, "pagination"),
        }
    }
}

/// A recovered anomaly. The offending operation was treated as a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableWarning {
    /// The state references a column key absent from the column set.
    InvalidColumn { key: String, context: WarningContext },
    /// A sort was requested on a column that is not sortable.
    ColumnNotSortable { key: String },
    /// A column filter was set on a column that is not filterable.
    ColumnNotFilterable { key: String },
    /// A page size of zero was requested; one was used instead.
    ZeroPageSize,
}

impl TableWarning {
    pub(crate) fn invalid_column(key: impl Into<String>, context: WarningContext) -> Self {
        Self::InvalidColumn {
            key: key.into(),
            context,
        }
    }
}

impl fmt::Display for TableWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableWarning::InvalidColumn { key, context } => {
                write!(f, "{context} ignored: unknown column '{key}'")
            }
            TableWarning::ColumnNotSortable { key } => {
                write!(f, "sort ignored: column '{key}' is not sortable")
            }
            TableWarning::ColumnNotFilterable { key } => {
                write!(f, "filter ignored: column '{key}' is not filterable")
            }
            TableWarning::ZeroPageSize => write!(f, "page size 0 replaced with 1"),
        }
    }
}
