//! Cell values produced by column accessors.
//!
//! The engine never looks inside a record. Columns project each record to a
//! [`CellValue`], and searching, column filters and the default sort
//! comparator all work on that projection.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A typed cell payload.
///
/// # Example
///
/// ```
/// use horizon_lattice_table::CellValue;
///
/// let value = CellValue::from("Hello");
/// assert_eq!(value.as_str(), Some("Hello"));
///
/// let missing = CellValue::from(None::<i64>);
/// assert!(missing.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// No value. Renders as the empty string and sorts last.
    #[default]
    None,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// Text value.
    String(String),
}

impl CellValue {
    /// Returns `true` if this is `CellValue::None`.
    pub fn is_none(&self) -> bool {
        matches!(self, CellValue::None)
    }

    /// Returns `true` if this holds a value.
    pub fn is_some(&self) -> bool {
        !self.is_none()
    }

    /// Returns `true` for `None` and for NaN floats. Missing values sort last
    /// and never satisfy a range filter.
    pub fn is_missing(&self) -> bool {
        match self {
            CellValue::None => true,
            CellValue::Float(n) => n.is_nan(),
            _ => false,
        }
    }

    /// Returns `true` for `None` and for blank strings.
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::None => true,
            CellValue::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Attempts to get the value as a string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Attempts to get the value as an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            CellValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Attempts to get the value as a float. Integers are widened.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            CellValue::Float(n) => Some(*n),
            CellValue::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Attempts to get the value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the lower-cased string form used for case-insensitive matching.
    pub fn search_text(&self) -> String {
        self.to_string().to_lowercase()
    }

    /// Returns true if both values are of the same kind. Integers and floats
    /// count as the same kind.
    pub fn kind_matches(&self, other: &CellValue) -> bool {
        self.kind_rank() == other.kind_rank()
    }

    /// Orders values of different kinds: booleans, then numbers, then text.
    fn kind_rank(&self) -> u8 {
        match self {
            CellValue::Bool(_) => 0,
            CellValue::Int(_) | CellValue::Float(_) => 1,
            CellValue::String(_) => 2,
            CellValue::None => 3,
        }
    }

    /// Compares two present values.
    ///
    /// Numbers compare numerically (integers and floats cross-compare),
    /// strings compare case-insensitively, and values of different kinds are
    /// ordered by kind. `None` is handled by [`compare_cells`], which keeps it
    /// last regardless of sort direction.
    pub fn compare(&self, other: &CellValue) -> Ordering {
        match (self, other) {
            (CellValue::Int(a), CellValue::Int(b)) => a.cmp(b),
            (CellValue::Bool(a), CellValue::Bool(b)) => a.cmp(b),
            (CellValue::String(a), CellValue::String(b)) => compare_text(a, b),
            (a, b) if a.kind_rank() == 1 && b.kind_rank() == 1 => {
                let (fa, fb) = (a.as_float().unwrap_or(0.0), b.as_float().unwrap_or(0.0));
                fa.partial_cmp(&fb).unwrap_or_else(|| fa.total_cmp(&fb))
            }
            (a, b) => a.kind_rank().cmp(&b.kind_rank()),
        }
    }
}

/// Locale-default, case-insensitive text ordering.
fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

/// Compares two cells for sorting in the given direction.
///
/// `descending` inverts the comparison of present values, but missing values
/// (`None` and NaN) sort after every present value in both directions.
pub(crate) fn compare_cells(a: &CellValue, b: &CellValue, descending: bool) -> Ordering {
    match (a.is_missing(), b.is_missing()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let ord = a.compare(b);
            if descending { ord.reverse() } else { ord }
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::None => Ok(()),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Int(n) => write!(f, "{n}"),
            CellValue::Float(n) => write!(f, "{n}"),
            CellValue::String(s) => f.write_str(s),
        }
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<&String> for CellValue {
    fn from(s: &String) -> Self {
        CellValue::String(s.clone())
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Int(n)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Int(n as i64)
    }
}

impl From<u32> for CellValue {
    fn from(n: u32) -> Self {
        CellValue::Int(n as i64)
    }
}

impl From<usize> for CellValue {
    fn from(n: usize) -> Self {
        CellValue::Int(n as i64)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Float(n)
    }
}

impl From<f32> for CellValue {
    fn from(n: f32) -> Self {
        CellValue::Float(n as f64)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => CellValue::None,
        }
    }
}
