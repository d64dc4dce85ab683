//! Table configuration.
//!
//! [`TableConfig`] holds the choices that belong to a table rather than to a
//! user session: how tree tables paginate, the initial page size, and how
//! expansion behaves while filtering. It can be built in code or read from
//! TOML:
//!
//! ```
//! use horizon_lattice_table::{PageBy, TableConfig};
//!
//! let config = TableConfig::from_toml_str(r#"
//! page_by = "roots"
//! default_page_size = 25
//! "#).unwrap();
//!
//! assert_eq!(config.page_by, PageBy::Roots);
//! assert_eq!(config.default_page_size, 25);
//! assert!(config.auto_expand_matches);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::pagination::{DEFAULT_PAGE_SIZE, PageBy};

/// Per-table settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Pagination unit for tree tables.
    pub page_by: PageBy,
    /// Page size of a fresh table state.
    pub default_page_size: usize,
    /// Keep the ancestors of filter matches expanded while a search or
    /// column filter is active.
    pub auto_expand_matches: bool,
    /// Whether tree rows start expanded.
    pub default_expanded: bool,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            page_by: PageBy::Rows,
            default_page_size: DEFAULT_PAGE_SIZE,
            auto_expand_matches: true,
            default_expanded: true,
        }
    }
}

impl TableConfig {
    /// Parses a configuration from TOML. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Serializes the configuration to TOML.
    ///
    /// Fails if a value does not fit TOML, such as a page size above
    /// `i64::MAX`.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }

    /// Sets the pagination unit.
    pub fn with_page_by(mut self, page_by: PageBy) -> Self {
        self.page_by = page_by;
        self
    }

    /// Sets the default page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.default_page_size = page_size;
        self
    }

    /// Sets whether filter matches auto-expand their ancestors.
    pub fn with_auto_expand_matches(mut self, enabled: bool) -> Self {
        self.auto_expand_matches = enabled;
        self
    }

    /// Sets whether tree rows start expanded.
    pub fn with_default_expanded(mut self, expanded: bool) -> Self {
        self.default_expanded = expanded;
        self
    }
}
