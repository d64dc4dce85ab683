//! Selection engine for flat and hierarchical tables.
//!
//! The selection itself is only a set of keys. Every entry's
//! [`SelectionStatus`] is derived from that set and the current tree shape
//! whenever it is needed, so a status can never go stale when rows are
//! added, removed or re-parented.
//!
//! # Example
//!
//! ```
//! use horizon_lattice_table::selection::{compute_status, toggle};
//! use horizon_lattice_table::{RawRows, RowNode, Selection, SelectionStatus, normalize};
//!
//! let rows = RawRows::Nested(vec![RowNode::with_children(
//!     "parent",
//!     vec![RowNode::leaf("a"), RowNode::leaf("b")],
//! )]);
//! let model = normalize(rows, |k: &&str| k.to_string()).unwrap();
//!
//! let selection = toggle("a", &Selection::new(), &model);
//! let status = compute_status(&model, &selection);
//! assert_eq!(status["parent"], SelectionStatus::Indeterminate);
//!
//! // Toggling an indeterminate parent clears its whole subtree.
//! let selection = toggle("parent", &selection, &model);
//! assert!(selection.is_empty());
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::logging::targets;
use crate::row_model::RowModel;

/// Derived check state of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStatus {
    /// Not selected.
    #[default]
    Unchecked,
    /// Some, but not all, descendants are selected. Never reported for leaves.
    Indeterminate,
    /// Selected.
    Checked,
}

impl SelectionStatus {
    /// Returns `true` if the row is checked (fully or partially).
    pub fn is_checked(&self) -> bool {
        !matches!(self, SelectionStatus::Unchecked)
    }

    /// Returns `true` if the row is fully checked.
    pub fn is_fully_checked(&self) -> bool {
        matches!(self, SelectionStatus::Checked)
    }
}

/// The set of selected row keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selection {
    keys: BTreeSet<String>,
}

impl Selection {
    /// Creates an empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a selection from keys.
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true if the key is selected.
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Returns the number of selected keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Iterates selected keys in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    /// Returns a copy with the given keys added.
    pub fn select_all<'a, I>(&self, keys: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut next = self.clone();
        next.keys.extend(keys.into_iter().map(str::to_string));
        next
    }

    /// Returns a copy with the given keys removed.
    pub fn deselect_all<'a, I>(&self, keys: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut next = self.clone();
        for key in keys {
            next.keys.remove(key);
        }
        next
    }

    /// Returns a copy without keys that no longer exist in the model.
    pub fn retain_existing<R>(&self, model: &RowModel<R>) -> Self {
        Self {
            keys: self
                .keys
                .iter()
                .filter(|k| model.contains(k))
                .cloned()
                .collect(),
        }
    }

    /// Returns the selected leaf keys in model order.
    pub fn selected_leaves<'m, R>(&self, model: &'m RowModel<R>) -> Vec<&'m str> {
        model
            .entries()
            .iter()
            .filter(|e| e.is_leaf() && self.contains(e.key()))
            .map(|e| e.key())
            .collect()
    }
}

/// Status per row key.
pub type StatusMap = BTreeMap<String, SelectionStatus>;

/// Toggles a row.
///
/// A leaf flips its own membership. A parent whose status is checked or
/// indeterminate is deselected together with all its descendants; an
/// unchecked parent is selected together with all its descendants. Unknown
/// keys leave the selection unchanged.
pub fn toggle<R>(key: &str, selection: &Selection, model: &RowModel<R>) -> Selection {
    let Some(pos) = model.position(key) else {
        tracing::warn!(target: targets::SELECTION, key, "toggle of unknown row ignored");
        return selection.clone();
    };

    let mut next = selection.clone();
    let descendants = model.descendant_positions(pos);
    if descendants.is_empty() {
        if !next.keys.remove(key) {
            next.keys.insert(key.to_string());
        }
        return next;
    }

    let subtree = std::iter::once(key).chain(descendants.iter().map(|&p| model.entries()[p].key()));
    if status_at(model, pos, selection) == SelectionStatus::Unchecked {
        next.keys.extend(subtree.map(str::to_string));
    } else {
        for k in subtree {
            next.keys.remove(k);
        }
    }

    tracing::trace!(target: targets::SELECTION, key, selected = next.len(), "toggled subtree");
    next
}

/// Toggles a group of rows as one, for a header checkbox.
///
/// If every row in `keys` is checked they are all deselected (with their
/// descendants); otherwise they are all selected (with their descendants).
pub fn toggle_all<'a, R, I>(keys: I, selection: &Selection, model: &RowModel<R>) -> Selection
where
    I: IntoIterator<Item = &'a str>,
{
    let positions: Vec<usize> = keys.into_iter().filter_map(|k| model.position(k)).collect();
    let aggregate = aggregate_status(positions.iter().map(|&p| status_at(model, p, selection)));

    let subtree_keys = positions.iter().flat_map(|&p| {
        std::iter::once(p)
            .chain(model.descendant_positions(p))
            .map(move |q| model.entries()[q].key())
    });

    if aggregate == SelectionStatus::Checked {
        selection.deselect_all(subtree_keys)
    } else {
        selection.select_all(subtree_keys)
    }
}

/// Derives the status of every row.
///
/// A leaf is checked iff its key is selected. A parent is checked iff all of
/// its children are checked, unchecked iff all are unchecked, and
/// indeterminate otherwise. A parent with no children is a leaf.
pub fn compute_status<R>(model: &RowModel<R>, selection: &Selection) -> StatusMap {
    statuses_by_position(model, selection)
        .into_iter()
        .enumerate()
        .map(|(pos, status)| (model.entries()[pos].key().to_string(), status))
        .collect()
}

/// Derives the status of every row, indexed by arena position.
pub(crate) fn statuses_by_position<R>(
    model: &RowModel<R>,
    selection: &Selection,
) -> Vec<SelectionStatus> {
    let mut statuses = vec![SelectionStatus::Unchecked; model.len()];
    // Reverse depth-first order visits children before their parent.
    for pos in (0..model.len()).rev() {
        let children = model.child_positions(pos);
        statuses[pos] = if children.is_empty() {
            if selection.contains(model.entries()[pos].key()) {
                SelectionStatus::Checked
            } else {
                SelectionStatus::Unchecked
            }
        } else {
            aggregate_status(children.iter().map(|&c| statuses[c]))
        };
    }
    statuses
}

/// Combines child statuses into a parent status. An empty group is unchecked.
pub fn aggregate_status<I>(statuses: I) -> SelectionStatus
where
    I: IntoIterator<Item = SelectionStatus>,
{
    let mut any = false;
    let mut all_checked = true;
    let mut all_unchecked = true;
    for status in statuses {
        any = true;
        all_checked &= status == SelectionStatus::Checked;
        all_unchecked &= status == SelectionStatus::Unchecked;
    }

    if !any || all_unchecked {
        SelectionStatus::Unchecked
    } else if all_checked {
        SelectionStatus::Checked
    } else {
        SelectionStatus::Indeterminate
    }
}

/// Status of a single row, from the leaves of its subtree.
fn status_at<R>(model: &RowModel<R>, pos: usize, selection: &Selection) -> SelectionStatus {
    let descendants = model.descendant_positions(pos);
    if descendants.is_empty() {
        return if selection.contains(model.entries()[pos].key()) {
            SelectionStatus::Checked
        } else {
            SelectionStatus::Unchecked
        };
    }

    // All children checked (recursively) is exactly all descendant leaves
    // checked, and likewise for unchecked.
    aggregate_status(
        descendants
            .into_iter()
            .filter(|&d| model.child_positions(d).is_empty())
            .map(|d| {
                if selection.contains(model.entries()[d].key()) {
                    SelectionStatus::Checked
                } else {
                    SelectionStatus::Unchecked
                }
            }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row_model::{RawRows, RowNode, normalize};

    fn tree() -> RowModel<&'static str> {
        normalize(
            RawRows::Nested(vec![RowNode::with_children(
                "R",
                vec![
                    RowNode::with_children("A", vec![RowNode::leaf("A1")]),
                    RowNode::leaf("B"),
                ],
            )]),
            |k: &&str| k.to_string(),
        )
        .unwrap()
    }

    #[test]
    fn test_selecting_only_child_checks_parent() {
        let model = tree();
        let selection = toggle("A1", &Selection::new(), &model);
        let status = compute_status(&model, &selection);

        assert_eq!(status["A1"], SelectionStatus::Checked);
        assert_eq!(status["A"], SelectionStatus::Checked);
        assert_eq!(status["R"], SelectionStatus::Indeterminate);
        assert_eq!(status["B"], SelectionStatus::Unchecked);

        let selection = toggle("B", &selection, &model);
        let status = compute_status(&model, &selection);
        assert_eq!(status["R"], SelectionStatus::Checked);
    }

    #[test]
    fn test_toggle_unchecked_parent_selects_subtree() {
        let model = tree();
        let selection = toggle("R", &Selection::new(), &model);
        assert_eq!(
            selection.iter().collect::<Vec<_>>(),
            vec!["A", "A1", "B", "R"]
        );
        assert!(
            compute_status(&model, &selection)
                .values()
                .all(|s| *s == SelectionStatus::Checked)
        );
    }

    #[test]
    fn test_toggle_indeterminate_parent_clears_subtree() {
        let model = tree();
        let selection = Selection::from_keys(["B"]);
        let selection = toggle("R", &selection, &model);
        assert!(selection.is_empty());
    }

    #[test]
    fn test_leaf_toggle_flips_membership() {
        let model = tree();
        let selection = toggle("B", &Selection::new(), &model);
        assert!(selection.contains("B"));
        let selection = toggle("B", &selection, &model);
        assert!(!selection.contains("B"));
    }

    #[test]
    fn test_unknown_key_is_ignored() {
        let model = tree();
        let selection = Selection::from_keys(["B"]);
        assert_eq!(toggle("nope", &selection, &model), selection);
    }

    #[test]
    fn test_stale_parent_key_does_not_affect_status() {
        let model = tree();
        // "A" selected without its only child: status follows the child.
        let selection = Selection::from_keys(["A"]);
        let status = compute_status(&model, &selection);
        assert_eq!(status["A"], SelectionStatus::Unchecked);
    }

    #[test]
    fn test_toggle_all() {
        let model = tree();
        let selection = toggle_all(["R"], &Selection::new(), &model);
        assert_eq!(selection.len(), 4);
        let selection = toggle_all(["R"], &selection, &model);
        assert!(selection.is_empty());
    }

    #[test]
    fn test_aggregate_status() {
        use SelectionStatus::*;
        assert_eq!(aggregate_status(Vec::new()), Unchecked);
        assert_eq!(aggregate_status([Checked, Checked]), Checked);
        assert_eq!(aggregate_status([Checked, Unchecked]), Indeterminate);
        assert_eq!(aggregate_status([Indeterminate]), Indeterminate);
    }

    #[test]
    fn test_retain_existing_and_leaves() {
        let model = tree();
        let selection = Selection::from_keys(["A1", "gone", "A"]);
        let pruned = selection.retain_existing(&model);
        assert_eq!(pruned, Selection::from_keys(["A", "A1"]));
        assert_eq!(pruned.selected_leaves(&model), vec!["A1"]);
    }
}
