//! Row model adapter.
//!
//! Normalizes caller rows into a [`RowModel`]: an arena of [`Entry`] values
//! stored in depth-first order, each carrying a stable key, a depth, a parent
//! key and the keys of its children. Entries refer to each other by key (and
//! internally by arena position), never by nested ownership, so the rest of
//! the pipeline can work with plain position lists.
//!
//! Three input shapes are accepted through [`RawRows`]:
//!
//! - [`RawRows::Flat`]: a list of records, all at depth 0.
//! - [`RawRows::Nested`]: an owned tree of [`RowNode`]s.
//! - [`RawRows::Linked`]: a list of records that each name their parent key.
//!
//! Duplicate keys, cycles and dangling parent references are rejected.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::error::{Result, TableError};
use crate::logging::targets;

/// Type alias for the parent accessor of linked rows.
pub type ParentFn<R> = Arc<dyn Fn(&R) -> Option<String> + Send + Sync>;

/// A node of a nested input tree.
#[derive(Debug, Clone, PartialEq)]
pub struct RowNode<R> {
    /// The record for this node.
    pub record: R,
    /// Child nodes in display order.
    pub children: Vec<RowNode<R>>,
}

impl<R> RowNode<R> {
    /// Creates a node without children.
    pub fn leaf(record: R) -> Self {
        Self {
            record,
            children: Vec::new(),
        }
    }

    /// Creates a node with children.
    pub fn with_children(record: R, children: Vec<RowNode<R>>) -> Self {
        Self { record, children }
    }

    /// Returns the number of nodes in this subtree, including itself.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(RowNode::subtree_len).sum::<usize>()
    }
}

/// Caller rows in one of the supported shapes.
pub enum RawRows<R> {
    /// A flat list of records.
    Flat(Vec<R>),
    /// An owned tree of records.
    Nested(Vec<RowNode<R>>),
    /// A flat list of records that name their parent key. `None` marks a root.
    Linked {
        /// The records, in sibling order.
        rows: Vec<R>,
        /// Returns the parent key of a record.
        parent_of: ParentFn<R>,
    },
}

impl<R> RawRows<R> {
    /// Creates linked rows from records and a parent accessor.
    pub fn linked<F>(rows: Vec<R>, parent_of: F) -> Self
    where
        F: Fn(&R) -> Option<String> + Send + Sync + 'static,
    {
        RawRows::Linked {
            rows,
            parent_of: Arc::new(parent_of),
        }
    }

    /// Returns the number of records, counting every tree node.
    pub fn len(&self) -> usize {
        match self {
            RawRows::Flat(rows) => rows.len(),
            RawRows::Nested(nodes) => nodes.iter().map(RowNode::subtree_len).sum(),
            RawRows::Linked { rows, .. } => rows.len(),
        }
    }

    /// Returns true if there are no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<R: fmt::Debug> fmt::Debug for RawRows<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawRows::Flat(rows) => f.debug_tuple("Flat").field(rows).finish(),
            RawRows::Nested(nodes) => f.debug_tuple("Nested").field(nodes).finish(),
            RawRows::Linked { rows, .. } => f.debug_struct("Linked").field("rows", rows).finish(),
        }
    }
}

/// Whether a model was built from flat or hierarchical input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowMode {
    /// Every entry is a root.
    Flat,
    /// Entries form a forest.
    Tree,
}

/// A normalized row.
#[derive(Debug, PartialEq)]
pub struct Entry<R> {
    key: String,
    record: Arc<R>,
    depth: usize,
    parent_key: Option<String>,
    children: Vec<String>,
}

impl<R> Entry<R> {
    /// Returns the stable row key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the caller record.
    pub fn record(&self) -> &R {
        &self.record
    }

    /// Returns a shared handle to the caller record.
    pub fn record_arc(&self) -> &Arc<R> {
        &self.record
    }

    /// Returns the depth; roots are at depth 0.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Returns the parent key, or `None` for roots.
    pub fn parent_key(&self) -> Option<&str> {
        self.parent_key.as_deref()
    }

    /// Returns the child keys in sibling order.
    pub fn children(&self) -> &[String] {
        &self.children
    }

    /// Returns true if the entry has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

impl<R> Clone for Entry<R> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            record: Arc::clone(&self.record),
            depth: self.depth,
            parent_key: self.parent_key.clone(),
            children: self.children.clone(),
        }
    }
}

/// Arena positions of an entry's relatives.
#[derive(Debug, Clone, Default)]
struct Links {
    parent: Option<usize>,
    children: Vec<usize>,
}

/// The normalized row arena.
///
/// Entries are stored in depth-first order (input order for flat rows), and
/// every public position returned by the pipeline indexes into
/// [`RowModel::entries`].
pub struct RowModel<R> {
    mode: RowMode,
    entries: Vec<Entry<R>>,
    links: Vec<Links>,
    index: HashMap<String, usize>,
    roots: Vec<usize>,
}

impl<R> RowModel<R> {
    /// Creates an empty flat model.
    pub fn empty() -> Self {
        Self {
            mode: RowMode::Flat,
            entries: Vec::new(),
            links: Vec::new(),
            index: HashMap::new(),
            roots: Vec::new(),
        }
    }

    /// Returns the input mode.
    pub fn mode(&self) -> RowMode {
        self.mode
    }

    /// Returns true for models built from hierarchical input.
    pub fn is_tree(&self) -> bool {
        self.mode == RowMode::Tree
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns all entries in depth-first order.
    pub fn entries(&self) -> &[Entry<R>] {
        &self.entries
    }

    /// Returns the entry at an arena position.
    pub fn entry_at(&self, position: usize) -> Option<&Entry<R>> {
        self.entries.get(position)
    }

    /// Looks up an entry by key.
    pub fn get(&self, key: &str) -> Option<&Entry<R>> {
        self.index.get(key).map(|&pos| &self.entries[pos])
    }

    /// Returns the arena position of a key.
    pub fn position(&self, key: &str) -> Option<usize> {
        self.index.get(key).copied()
    }

    /// Returns true if an entry with the key exists.
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Iterates all keys in depth-first order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    /// Returns the root keys in sibling order.
    pub fn root_keys(&self) -> Vec<&str> {
        self.roots
            .iter()
            .map(|&pos| self.entries[pos].key.as_str())
            .collect()
    }

    /// Returns the child keys of an entry, or an empty slice for unknown keys.
    pub fn children(&self, key: &str) -> &[String] {
        self.get(key).map(|e| e.children.as_slice()).unwrap_or(&[])
    }

    /// Returns the keys of every ancestor, nearest first.
    pub fn ancestors(&self, key: &str) -> Vec<&str> {
        let mut out = Vec::new();
        let mut current = self.position(key).and_then(|pos| self.links[pos].parent);
        while let Some(pos) = current {
            out.push(self.entries[pos].key.as_str());
            current = self.links[pos].parent;
        }
        out
    }

    /// Returns the keys of every descendant in depth-first order.
    pub fn descendants(&self, key: &str) -> Vec<&str> {
        match self.position(key) {
            Some(pos) => self
                .descendant_positions(pos)
                .into_iter()
                .map(|p| self.entries[p].key.as_str())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Rebuilds the nested tree from each entry's parent key.
    ///
    /// Records are shared with the model rather than cloned.
    pub fn to_nested(&self) -> Vec<RowNode<Arc<R>>> {
        let mut by_parent: HashMap<Option<&str>, Vec<usize>> = HashMap::new();
        for (pos, entry) in self.entries.iter().enumerate() {
            by_parent.entry(entry.parent_key()).or_default().push(pos);
        }

        fn build<R>(
            model: &RowModel<R>,
            by_parent: &HashMap<Option<&str>, Vec<usize>>,
            parent: Option<&str>,
        ) -> Vec<RowNode<Arc<R>>> {
            by_parent
                .get(&parent)
                .map(|positions| {
                    positions
                        .iter()
                        .map(|&pos| {
                            let entry = &model.entries[pos];
                            RowNode::with_children(
                                Arc::clone(&entry.record),
                                build(model, by_parent, Some(entry.key.as_str())),
                            )
                        })
                        .collect()
                })
                .unwrap_or_default()
        }

        build(self, &by_parent, None)
    }

    // =========================================================================
    // Position-based access used by the pipeline
    // =========================================================================

    pub(crate) fn parent_position(&self, position: usize) -> Option<usize> {
        self.links[position].parent
    }

    pub(crate) fn child_positions(&self, position: usize) -> &[usize] {
        &self.links[position].children
    }

    pub(crate) fn descendant_positions(&self, position: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.links[position].children.iter().rev().copied().collect();
        while let Some(pos) = stack.pop() {
            out.push(pos);
            stack.extend(self.links[pos].children.iter().rev().copied());
        }
        out
    }
}

impl<R> Default for RowModel<R> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<R: fmt::Debug> fmt::Debug for RowModel<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowModel")
            .field("mode", &self.mode)
            .field("entries", &self.entries)
            .finish()
    }
}

/// Normalizes caller rows into a [`RowModel`].
///
/// `key_of` must return a key that is unique across the whole dataset.
///
/// # Errors
///
/// - [`TableError::DuplicateKey`] if two rows share a key.
/// - [`TableError::Cycle`] if a row is its own ancestor.
/// - [`TableError::UnknownParent`] if a linked row names a missing parent.
///
/// # Example
///
/// ```
/// use horizon_lattice_table::{RawRows, RowNode, normalize};
///
/// let tree = RawRows::Nested(vec![RowNode::with_children(
///     "root",
///     vec![RowNode::leaf("a"), RowNode::leaf("b")],
/// )]);
/// let model = normalize(tree, |name: &&str| name.to_string()).unwrap();
///
/// assert_eq!(model.len(), 3);
/// assert_eq!(model.get("a").unwrap().depth(), 1);
/// assert_eq!(model.children("root"), ["a", "b"]);
/// ```
pub fn normalize<R, K>(raw: RawRows<R>, key_of: K) -> Result<RowModel<R>>
where
    K: Fn(&R) -> String,
{
    let input_len = raw.len();
    let model = match raw {
        RawRows::Flat(rows) => normalize_flat(rows, &key_of)?,
        RawRows::Nested(nodes) => normalize_nested(nodes, &key_of)?,
        RawRows::Linked { rows, parent_of } => normalize_linked(rows, &key_of, &*parent_of)?,
    };
    debug_assert_eq!(model.len(), input_len);

    tracing::debug!(
        target: targets::ROW_MODEL,
        mode = ?model.mode,
        entries = model.len(),
        roots = model.roots.len(),
        "normalized rows"
    );
    Ok(model)
}

/// Accumulates entries in depth-first order.
struct Builder<R> {
    entries: Vec<Entry<R>>,
    links: Vec<Links>,
    index: HashMap<String, usize>,
    roots: Vec<usize>,
}

impl<R> Builder<R> {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            links: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
            roots: Vec::new(),
        }
    }

    /// Appends an entry under `parent` and returns its position.
    fn push(&mut self, key: String, record: R, parent: Option<usize>) -> Result<usize> {
        if self.index.contains_key(&key) {
            return Err(TableError::duplicate_key(key));
        }

        let pos = self.entries.len();
        let (depth, parent_key) = match parent {
            Some(p) => {
                self.entries[p].children.push(key.clone());
                self.links[p].children.push(pos);
                (self.entries[p].depth + 1, Some(self.entries[p].key.clone()))
            }
            None => {
                self.roots.push(pos);
                (0, None)
            }
        };

        self.index.insert(key.clone(), pos);
        self.entries.push(Entry {
            key,
            record: Arc::new(record),
            depth,
            parent_key,
            children: Vec::new(),
        });
        self.links.push(Links {
            parent,
            children: Vec::new(),
        });
        Ok(pos)
    }

    fn finish(self, mode: RowMode) -> RowModel<R> {
        RowModel {
            mode,
            entries: self.entries,
            links: self.links,
            index: self.index,
            roots: self.roots,
        }
    }
}

fn normalize_flat<R>(rows: Vec<R>, key_of: &dyn Fn(&R) -> String) -> Result<RowModel<R>> {
    let mut builder = Builder::with_capacity(rows.len());
    for record in rows {
        let key = key_of(&record);
        builder.push(key, record, None)?;
    }
    Ok(builder.finish(RowMode::Flat))
}

fn normalize_nested<R>(
    nodes: Vec<RowNode<R>>,
    key_of: &dyn Fn(&R) -> String,
) -> Result<RowModel<R>> {
    let capacity = nodes.iter().map(RowNode::subtree_len).sum();
    let mut builder = Builder::with_capacity(capacity);
    let mut path = HashSet::new();
    for node in nodes {
        push_nested(&mut builder, node, None, key_of, &mut path)?;
    }
    Ok(builder.finish(RowMode::Tree))
}

fn push_nested<R>(
    builder: &mut Builder<R>,
    node: RowNode<R>,
    parent: Option<usize>,
    key_of: &dyn Fn(&R) -> String,
    path: &mut HashSet<String>,
) -> Result<()> {
    let key = key_of(&node.record);
    // A key repeated on its own ancestor path is a back-reference; anywhere
    // else it is an ambiguous duplicate.
    if path.contains(&key) {
        return Err(TableError::cycle(key));
    }

    let pos = builder.push(key.clone(), node.record, parent)?;
    path.insert(key.clone());
    for child in node.children {
        push_nested(builder, child, Some(pos), key_of, path)?;
    }
    path.remove(&key);
    Ok(())
}

fn normalize_linked<R>(
    rows: Vec<R>,
    key_of: &dyn Fn(&R) -> String,
    parent_of: &(dyn Fn(&R) -> Option<String> + Send + Sync),
) -> Result<RowModel<R>> {
    let keys: Vec<String> = rows.iter().map(key_of).collect();
    let parents: Vec<Option<String>> = rows.iter().map(parent_of).collect();

    let mut input_index: HashMap<&str, usize> = HashMap::with_capacity(keys.len());
    for (i, key) in keys.iter().enumerate() {
        if input_index.insert(key.as_str(), i).is_some() {
            return Err(TableError::duplicate_key(key.clone()));
        }
    }

    let mut parent_idx: Vec<Option<usize>> = Vec::with_capacity(keys.len());
    for (i, parent) in parents.iter().enumerate() {
        match parent {
            None => parent_idx.push(None),
            Some(p) => match input_index.get(p.as_str()) {
                Some(&j) => parent_idx.push(Some(j)),
                None => return Err(TableError::unknown_parent(keys[i].clone(), p.clone())),
            },
        }
    }

    detect_cycles(&keys, &parent_idx)?;

    let mut child_idx: Vec<Vec<usize>> = vec![Vec::new(); keys.len()];
    let mut root_idx = Vec::new();
    for (i, parent) in parent_idx.iter().enumerate() {
        match parent {
            Some(p) => child_idx[*p].push(i),
            None => root_idx.push(i),
        }
    }

    let mut records: Vec<Option<R>> = rows.into_iter().map(Some).collect();
    let mut builder = Builder::with_capacity(keys.len());
    // (input index, parent arena position), children pushed in reverse so
    // they pop in sibling order.
    let mut stack: Vec<(usize, Option<usize>)> =
        root_idx.iter().rev().map(|&i| (i, None)).collect();
    while let Some((i, parent)) = stack.pop() {
        let Some(record) = records[i].take() else {
            return Err(TableError::cycle(keys[i].clone()));
        };
        let pos = builder.push(keys[i].clone(), record, parent)?;
        stack.extend(child_idx[i].iter().rev().map(|&c| (c, Some(pos))));
    }

    Ok(builder.finish(RowMode::Tree))
}

/// Rejects parent chains that loop back on themselves.
fn detect_cycles(keys: &[String], parent_idx: &[Option<usize>]) -> Result<()> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        InProgress,
        Done,
    }

    let mut marks = vec![Mark::Unvisited; keys.len()];
    for start in 0..keys.len() {
        let mut chain = Vec::new();
        let mut current = Some(start);
        while let Some(i) = current {
            match marks[i] {
                Mark::Done => break,
                Mark::InProgress => {
                    tracing::warn!(target: targets::ROW_MODEL, key = %keys[i], "parent cycle");
                    return Err(TableError::cycle(keys[i].clone()));
                }
                Mark::Unvisited => {
                    marks[i] = Mark::InProgress;
                    chain.push(i);
                    current = parent_idx[i];
                }
            }
        }
        for i in chain {
            marks[i] = Mark::Done;
        }
    }
    Ok(())
}
