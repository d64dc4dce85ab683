//! Expansion state for tree tables.
//!
//! Collapsing a row hides all of its descendants from the view. The collapse
//! pass runs after filtering and sorting and before pagination, so hidden
//! rows neither count towards the paginated total nor take page slots.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::row_model::RowModel;

/// Which tree rows are expanded.
///
/// Rows follow `default_expanded` unless their key is in `toggled`, which
/// inverts the default for that row. This keeps "expand all" and "collapse
/// all" cheap regardless of tree size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionState {
    /// Whether rows are expanded unless toggled.
    pub default_expanded: bool,
    /// Rows whose state differs from the default.
    pub toggled: BTreeSet<String>,
}

impl Default for ExpansionState {
    fn default() -> Self {
        Self::all_expanded()
    }
}

impl ExpansionState {
    /// Every row expanded.
    pub fn all_expanded() -> Self {
        Self {
            default_expanded: true,
            toggled: BTreeSet::new(),
        }
    }

    /// Every row collapsed; only roots are visible.
    pub fn all_collapsed() -> Self {
        Self {
            default_expanded: false,
            toggled: BTreeSet::new(),
        }
    }

    /// Returns true if the row is expanded.
    pub fn is_expanded(&self, key: &str) -> bool {
        self.default_expanded != self.toggled.contains(key)
    }

    /// Returns a copy with the row expanded or collapsed.
    pub fn set_expanded(&self, key: &str, expanded: bool) -> Self {
        let mut next = self.clone();
        if expanded == self.default_expanded {
            next.toggled.remove(key);
        } else {
            next.toggled.insert(key.to_string());
        }
        next
    }

    /// Returns a copy with the row's expansion flipped.
    pub fn toggle(&self, key: &str) -> Self {
        self.set_expanded(key, !self.is_expanded(key))
    }

    /// Returns a copy without toggled keys that no longer exist in the model.
    pub fn retain_existing<R>(&self, model: &RowModel<R>) -> Self {
        Self {
            default_expanded: self.default_expanded,
            toggled: self
                .toggled
                .iter()
                .filter(|k| model.contains(k))
                .cloned()
                .collect(),
        }
    }
}

/// Returns the ancestors of the given positions.
///
/// Used to keep filter matches reachable when matches auto-expand.
pub(crate) fn ancestors_of<R>(model: &RowModel<R>, positions: &[usize]) -> HashSet<usize> {
    let mut out = HashSet::new();
    for &pos in positions {
        let mut current = model.parent_position(pos);
        while let Some(p) = current {
            if !out.insert(p) {
                break;
            }
            current = model.parent_position(p);
        }
    }
    out
}

/// Drops every row that has a collapsed ancestor.
///
/// Rows in `forced` count as expanded whatever `expansion` says. Order is
/// preserved. Flat models are returned unchanged.
pub fn collapse<R>(
    model: &RowModel<R>,
    ordered: &[usize],
    expansion: &ExpansionState,
    forced: &HashSet<usize>,
) -> Vec<usize> {
    if !model.is_tree() {
        return ordered.to_vec();
    }

    let is_open =
        |pos: usize| forced.contains(&pos) || expansion.is_expanded(model.entries()[pos].key());

    // Model order is depth-first, so every parent is resolved before its
    // children.
    let mut hidden = vec![false; model.len()];
    for pos in 0..model.len() {
        if let Some(parent) = model.parent_position(pos) {
            hidden[pos] = hidden[parent] || !is_open(parent);
        }
    }

    ordered.iter().copied().filter(|&pos| !hidden[pos]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row_model::{RawRows, RowNode, normalize};

    fn tree() -> RowModel<&'static str> {
        normalize(
            RawRows::Nested(vec![
                RowNode::with_children(
                    "R",
                    vec![
                        RowNode::with_children("A", vec![RowNode::leaf("A1")]),
                        RowNode::leaf("B"),
                    ],
                ),
                RowNode::leaf("S"),
            ]),
            |k: &&str| k.to_string(),
        )
        .unwrap()
    }

    fn keys(model: &RowModel<&'static str>, positions: &[usize]) -> Vec<&'static str> {
        positions.iter().map(|&p| *model.entry_at(p).unwrap().record()).collect()
    }

    #[test]
    fn test_set_and_toggle() {
        let state = ExpansionState::all_expanded().set_expanded("A", false);
        assert!(!state.is_expanded("A"));
        assert!(state.is_expanded("R"));
        let state = state.toggle("A");
        assert_eq!(state, ExpansionState::all_expanded());
    }

    #[test]
    fn test_retain_existing_drops_stale_keys() {
        let model = tree();
        let state = ExpansionState::all_collapsed()
            .set_expanded("R", true)
            .set_expanded("gone", true);
        let pruned = state.retain_existing(&model);
        assert!(!pruned.default_expanded);
        assert_eq!(pruned.toggled.len(), 1);
        assert!(pruned.is_expanded("R"));
    }

    #[test]
    fn test_collapse_hides_descendants() {
        let model = tree();
        let all: Vec<usize> = (0..model.len()).collect();

        let state = ExpansionState::all_expanded().set_expanded("A", false);
        let visible = collapse(&model, &all, &state, &HashSet::new());
        assert_eq!(keys(&model, &visible), vec!["R", "A", "B", "S"]);

        let visible = collapse(&model, &all, &ExpansionState::all_collapsed(), &HashSet::new());
        assert_eq!(keys(&model, &visible), vec!["R", "S"]);
    }

    #[test]
    fn test_forced_rows_stay_open() {
        let model = tree();
        let all: Vec<usize> = (0..model.len()).collect();
        let forced = ancestors_of(&model, &[model.position("A1").unwrap()]);

        let visible = collapse(&model, &all, &ExpansionState::all_collapsed(), &forced);
        assert_eq!(keys(&model, &visible), vec!["R", "A", "A1", "B", "S"]);
    }
}
