//! Logging facilities for the table engine.
//!
//! The engine is instrumented with the `tracing` crate. Nothing is printed
//! unless the application installs a subscriber:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("horizon_lattice_table=debug")
//!     .init();
//! ```
//!
//! Each pipeline stage logs under its own target so it can be filtered
//! independently.

/// Target names for log filtering.
pub mod targets {
    /// Row normalization target.
    pub const ROW_MODEL: &str = "horizon_lattice_table::row_model";
    /// Search and column filter target.
    pub const FILTER: &str = "horizon_lattice_table::filter";
    /// Sort target.
    pub const SORT: &str = "horizon_lattice_table::sort";
    /// Selection target.
    pub const SELECTION: &str = "horizon_lattice_table::selection";
    /// Pagination target.
    pub const PAGINATION: &str = "horizon_lattice_table::pagination";
    /// View composition target.
    pub const VIEW: &str = "horizon_lattice_table::view";
    /// Table controller target.
    pub const CONTROLLER: &str = "horizon_lattice_table::controller";
}
