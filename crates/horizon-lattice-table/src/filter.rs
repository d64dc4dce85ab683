//! Filter engine.
//!
//! Applies the free-text search term and the per-column filters to a
//! [`RowModel`]. Filtering only removes rows; the retained positions are
//! always in model (depth-first) order.
//!
//! In tree mode a row is retained when it matches directly, when any of its
//! descendants matches (so a matching leaf stays reachable through its
//! ancestors), or when any of its ancestors matches (so expanding a matching
//! parent still shows its children). Descendant matches are propagated
//! bottom-up in one pass and ancestor matches top-down in a second pass.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::column::{Column, ColumnSet};
use crate::error::{TableWarning, WarningContext};
use crate::logging::targets;
use crate::row_model::RowModel;
use crate::value::CellValue;

/// A predicate on one column's value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum ColumnFilter {
    /// No predicate; the filter is ignored.
    #[default]
    Any,
    /// Case-insensitive substring match on the value's text.
    Contains(String),
    /// The value equals the operand (text compares case-insensitively).
    Equals(CellValue),
    /// The value equals one of the operands.
    OneOf(Vec<CellValue>),
    /// The value lies within the inclusive bounds. Missing bounds are open.
    Range {
        min: Option<CellValue>,
        max: Option<CellValue>,
    },
    /// The value is present and not blank.
    NotEmpty,
}

impl ColumnFilter {
    /// Creates an inclusive range filter.
    pub fn between(min: impl Into<CellValue>, max: impl Into<CellValue>) -> Self {
        ColumnFilter::Range {
            min: Some(min.into()),
            max: Some(max.into()),
        }
    }

    /// Returns false for [`ColumnFilter::Any`].
    pub fn is_active(&self) -> bool {
        !matches!(self, ColumnFilter::Any)
    }

    /// Tests a cell value against this filter.
    pub fn matches(&self, value: &CellValue) -> bool {
        match self {
            ColumnFilter::Any => true,
            ColumnFilter::Contains(text) => value.search_text().contains(&text.to_lowercase()),
            ColumnFilter::Equals(operand) => cells_equal(value, operand),
            ColumnFilter::OneOf(operands) => operands.iter().any(|op| cells_equal(value, op)),
            ColumnFilter::Range { min, max } => {
                if value.is_missing() {
                    return false;
                }
                let above_min = min.as_ref().is_none_or(|m| value.compare(m).is_ge());
                let below_max = max.as_ref().is_none_or(|m| value.compare(m).is_le());
                above_min && below_max
            }
            ColumnFilter::NotEmpty => !value.is_empty(),
        }
    }
}

fn cells_equal(a: &CellValue, b: &CellValue) -> bool {
    match (a.is_none(), b.is_none()) {
        (true, true) => true,
        (false, false) => a.kind_matches(b) && a.compare(b).is_eq(),
        _ => false,
    }
}

/// Search term and column filters.
///
/// Replaced wholesale on every edit; never mutates row data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterState {
    /// Free-text search term. Blank terms match everything.
    pub search_term: String,
    /// Column key to predicate. All active predicates must hold.
    pub column_filters: BTreeMap<String, ColumnFilter>,
}

impl FilterState {
    /// Creates an empty filter state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy with the search term replaced.
    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search_term = term.into();
        self
    }

    /// Returns a copy with a column filter set. [`ColumnFilter::Any`] removes it.
    pub fn with_column_filter(mut self, column: impl Into<String>, filter: ColumnFilter) -> Self {
        let column = column.into();
        if filter.is_active() {
            self.column_filters.insert(column, filter);
        } else {
            self.column_filters.remove(&column);
        }
        self
    }

    /// Returns the normalized search term, or `None` if search is inactive.
    pub fn search_needle(&self) -> Option<String> {
        let term = self.search_term.trim();
        (!term.is_empty()).then(|| term.to_lowercase())
    }

    /// Returns true if a search term or any active column filter is set.
    pub fn is_active(&self) -> bool {
        self.search_needle().is_some() || self.column_filters.values().any(ColumnFilter::is_active)
    }
}

/// The result of filtering a row model.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    /// Retained arena positions, in model order.
    pub retained: Vec<usize>,
    /// Recovered anomalies, such as filters on unknown columns.
    pub warnings: Vec<TableWarning>,
    direct: Vec<bool>,
    active: bool,
}

impl FilterOutcome {
    /// Returns true if the position matched the filter itself, rather than
    /// being kept for a relative.
    pub fn is_direct_match(&self, position: usize) -> bool {
        self.direct.get(position).copied().unwrap_or(false)
    }

    /// Returns the positions that matched directly, in model order.
    pub fn direct_matches(&self) -> Vec<usize> {
        self.direct
            .iter()
            .enumerate()
            .filter_map(|(pos, &hit)| hit.then_some(pos))
            .collect()
    }

    /// Returns true if any search term or column filter was applied.
    pub fn is_active(&self) -> bool {
        self.active
    }
}

/// Filters the model with the given state.
///
/// Column filters on unknown or non-filterable columns are ignored and
/// reported as warnings.
pub fn filter<R>(
    model: &RowModel<R>,
    state: &FilterState,
    columns: &ColumnSet<R>,
) -> FilterOutcome {
    let mut warnings = Vec::new();
    let predicates = resolve_predicates(state, columns, &mut warnings);
    let needle = state.search_needle();

    if needle.is_none() && predicates.is_empty() {
        return FilterOutcome {
            retained: (0..model.len()).collect(),
            warnings,
            direct: vec![true; model.len()],
            active: false,
        };
    }

    let direct: Vec<bool> = model
        .entries()
        .iter()
        .map(|entry| {
            let record = entry.record();
            let search_ok = needle
                .as_deref()
                .is_none_or(|needle| matches_search(record, needle, columns));
            search_ok && predicates.iter().all(|(col, f)| f.matches(&col.value(record)))
        })
        .collect();

    let retained = if model.is_tree() {
        retain_tree(model, &direct)
    } else {
        direct
            .iter()
            .enumerate()
            .filter_map(|(pos, &hit)| hit.then_some(pos))
            .collect()
    };

    tracing::debug!(
        target: targets::FILTER,
        search = needle.as_deref().unwrap_or(""),
        column_filters = predicates.len(),
        retained = retained.len(),
        total = model.len(),
        "filtered rows"
    );

    FilterOutcome {
        retained,
        warnings,
        direct,
        active: true,
    }
}

fn resolve_predicates<'a, R>(
    state: &'a FilterState,
    columns: &'a ColumnSet<R>,
    warnings: &mut Vec<TableWarning>,
) -> Vec<(&'a Column<R>, &'a ColumnFilter)> {
    let mut predicates = Vec::new();
    for (key, filter) in &state.column_filters {
        if !filter.is_active() {
            continue;
        }
        match columns.get(key) {
            None => {
                tracing::warn!(
                    target: targets::FILTER,
                    column = %key,
                    "filter on unknown column ignored"
                );
                warnings.push(TableWarning::invalid_column(key.clone(), WarningContext::Filter));
            }
            Some(column) if !column.is_filterable() => {
                tracing::warn!(
                    target: targets::FILTER,
                    column = %key,
                    "filter on non-filterable column ignored"
                );
                warnings.push(TableWarning::ColumnNotFilterable { key: key.clone() });
            }
            Some(column) => predicates.push((column, filter)),
        }
    }
    predicates
}

fn matches_search<R>(record: &R, needle: &str, columns: &ColumnSet<R>) -> bool {
    columns
        .filterable()
        .any(|column| column.value(record).search_text().contains(needle))
}

/// Applies the three-way tree retention rule.
fn retain_tree<R>(model: &RowModel<R>, direct: &[bool]) -> Vec<usize> {
    let len = model.len();

    // Children always sit after their parent in depth-first order, so a
    // reverse sweep sees every child before its parent.
    let mut below = vec![false; len];
    for pos in (0..len).rev() {
        if (direct[pos] || below[pos])
            && let Some(parent) = model.parent_position(pos)
        {
            below[parent] = true;
        }
    }

    let mut above = vec![false; len];
    for pos in 0..len {
        if let Some(parent) = model.parent_position(pos) {
            above[pos] = direct[parent] || above[parent];
        }
    }

    (0..len)
        .filter(|&pos| direct[pos] || below[pos] || above[pos])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row_model::{RawRows, RowNode, normalize};

    #[derive(Debug)]
    struct Item {
        name: &'static str,
        team: &'static str,
        score: Option<i64>,
    }

    fn item(name: &'static str, team: &'static str, score: Option<i64>) -> Item {
        Item { name, team, score }
    }

    fn columns() -> ColumnSet<Item> {
        ColumnSet::new(vec![
            Column::new("name", |i: &Item| i.name.into()),
            Column::new("team", |i: &Item| i.team.into()),
            Column::new("score", |i: &Item| i.score.into()),
            Column::new("secret", |i: &Item| i.name.into()).filterable(false),
        ])
        .unwrap()
    }

    fn flat() -> RowModel<Item> {
        normalize(
            RawRows::Flat(vec![
                item("Alice", "Red", Some(30)),
                item("Bob", "Blue", Some(25)),
                item("Carol", "red", None),
                item("Dave", "Green", Some(40)),
            ]),
            |i: &Item| i.name.to_string(),
        )
        .unwrap()
    }

    fn names(model: &RowModel<Item>, positions: &[usize]) -> Vec<&'static str> {
        positions
            .iter()
            .map(|&p| model.entry_at(p).unwrap().record().name)
            .collect()
    }

    #[test]
    fn test_empty_filter_keeps_everything() {
        let model = flat();
        let outcome = filter(&model, &FilterState::new().with_search("   "), &columns());
        assert_eq!(outcome.retained, vec![0, 1, 2, 3]);
        assert!(!outcome.is_active());
    }

    #[test]
    fn test_search_is_case_insensitive_over_filterable_columns() {
        let model = flat();
        let outcome = filter(&model, &FilterState::new().with_search("RED"), &columns());
        assert_eq!(names(&model, &outcome.retained), vec!["Alice", "Carol"]);

        // The "secret" column is excluded from search even though it holds names.
        let outcome = filter(&model, &FilterState::new().with_search("30"), &columns());
        assert_eq!(names(&model, &outcome.retained), vec!["Alice"]);
    }

    #[test]
    fn test_column_filters_are_anded() {
        let model = flat();
        let state = FilterState::new()
            .with_column_filter("team", ColumnFilter::Contains("red".into()))
            .with_column_filter("score", ColumnFilter::NotEmpty);
        let outcome = filter(&model, &state, &columns());
        assert_eq!(names(&model, &outcome.retained), vec!["Alice"]);
    }

    #[test]
    fn test_range_rejects_missing_values() {
        let open = ColumnFilter::Range { min: None, max: None };
        assert!(open.matches(&CellValue::from(1.5)));
        assert!(!open.matches(&CellValue::Float(f64::NAN)));
        assert!(!ColumnFilter::between(0, 10).matches(&CellValue::None));
    }

    #[test]
    fn test_range_and_one_of() {
        let model = flat();
        let state = FilterState::new().with_column_filter("score", ColumnFilter::between(25, 30));
        let outcome = filter(&model, &state, &columns());
        assert_eq!(names(&model, &outcome.retained), vec!["Alice", "Bob"]);

        let state = FilterState::new().with_column_filter(
            "team",
            ColumnFilter::OneOf(vec!["blue".into(), "green".into()]),
        );
        let outcome = filter(&model, &state, &columns());
        assert_eq!(names(&model, &outcome.retained), vec!["Bob", "Dave"]);
    }

    #[test]
    fn test_invalid_column_filter_is_ignored_with_warning() {
        let model = flat();
        let state = FilterState::new()
            .with_column_filter("removed", ColumnFilter::Contains("x".into()))
            .with_column_filter("secret", ColumnFilter::Contains("x".into()));
        let outcome = filter(&model, &state, &columns());

        assert_eq!(outcome.retained.len(), 4);
        assert_eq!(
            outcome.warnings,
            vec![
                TableWarning::invalid_column("removed", WarningContext::Filter),
                TableWarning::ColumnNotFilterable {
                    key: "secret".into()
                },
            ]
        );
    }

    #[test]
    fn test_any_filter_is_noop() {
        let state = FilterState::new().with_column_filter("team", ColumnFilter::Any);
        assert!(state.column_filters.is_empty());
        assert!(!state.is_active());
    }

    fn tree() -> RowModel<Item> {
        let n = |name| item(name, "", None);
        normalize(
            RawRows::Nested(vec![RowNode::with_children(
                n("R"),
                vec![
                    RowNode::with_children(n("A"), vec![RowNode::leaf(n("A1"))]),
                    RowNode::with_children(n("B"), vec![RowNode::leaf(n("B1"))]),
                ],
            )]),
            |i: &Item| i.name.to_string(),
        )
        .unwrap()
    }

    #[test]
    fn test_tree_keeps_ancestors_of_matches() {
        let model = tree();
        let outcome = filter(&model, &FilterState::new().with_search("a1"), &columns());
        assert_eq!(names(&model, &outcome.retained), vec!["R", "A", "A1"]);
        assert!(outcome.is_direct_match(model.position("A1").unwrap()));
        assert!(!outcome.is_direct_match(model.position("R").unwrap()));
    }

    #[test]
    fn test_tree_keeps_descendants_of_matches() {
        let model = tree();
        let state = FilterState::new().with_column_filter("name", ColumnFilter::Equals("b".into()));
        let outcome = filter(&model, &state, &columns());
        assert_eq!(names(&model, &outcome.retained), vec!["R", "B", "B1"]);
        assert_eq!(outcome.direct_matches(), vec![model.position("B").unwrap()]);
    }

    #[test]
    fn test_filter_serde_shape() {
        let state = FilterState::new()
            .with_search("x")
            .with_column_filter("score", ColumnFilter::between(1, 5));
        let json = serde_json::to_string(&state).unwrap();
        let back: FilterState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
