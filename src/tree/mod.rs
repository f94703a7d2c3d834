//! Navigation tree
//!
//! Hierarchical catalog (database → schema → object group → object →
//! sub-object) stored as an arena. Nodes are addressed by [`NodeId`] and
//! refer to their parent by index, so ancestor walks need no back pointers.
//! Every node also carries a string key, unique within the tree and
//! namespaced by kind (`schema:app.public`), used for deep links.
//!
//! Refreshing a node frees its old subtree's slots and later inserts reuse
//! them, so repeated refreshes keep the arena at the size of the live tree.
//! A [`NodeId`] held across a refresh may therefore name a different node or
//! none at all; callers re-resolve by key.

pub mod catalog;

use crate::db::provider::{ColumnInfo, ObjectKind, ObjectRef};
use std::collections::HashMap;

/// Index of a node in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Root,
    Database,
    Schema,
    ObjectGroup,
    Table,
    View,
    MaterializedView,
    Function,
    Procedure,
    Sequence,
    Index,
    Trigger,
    CompositeType,
    EnumType,
    DomainType,
    RangeType,
    Column,
}

impl NodeKind {
    /// Relations whose rows are paged into the data panel
    pub fn is_relation(self) -> bool {
        matches!(
            self,
            NodeKind::Table | NodeKind::View | NodeKind::MaterializedView
        )
    }

    /// Objects shown as a definition instead of rows
    pub fn shows_definition(self) -> bool {
        matches!(
            self,
            NodeKind::Function
                | NodeKind::Procedure
                | NodeKind::Sequence
                | NodeKind::Index
                | NodeKind::Trigger
                | NodeKind::CompositeType
                | NodeKind::EnumType
                | NodeKind::DomainType
                | NodeKind::RangeType
        )
    }
}

impl From<ObjectKind> for NodeKind {
    fn from(kind: ObjectKind) -> Self {
        match kind {
            ObjectKind::Table => NodeKind::Table,
            ObjectKind::View => NodeKind::View,
            ObjectKind::MaterializedView => NodeKind::MaterializedView,
            ObjectKind::Function => NodeKind::Function,
            ObjectKind::Procedure => NodeKind::Procedure,
            ObjectKind::Sequence => NodeKind::Sequence,
            ObjectKind::Index => NodeKind::Index,
            ObjectKind::Trigger => NodeKind::Trigger,
            ObjectKind::CompositeType => NodeKind::CompositeType,
            ObjectKind::EnumType => NodeKind::EnumType,
            ObjectKind::DomainType => NodeKind::DomainType,
            ObjectKind::RangeType => NodeKind::RangeType,
        }
    }
}

/// Kind-specific payload
#[derive(Debug, Clone, PartialEq)]
pub enum NodeMetadata {
    Root,
    Database { name: String },
    Schema { name: String },
    /// Heading for objects of one kind, under a schema or (indexes, triggers) a table
    Group {
        schema: String,
        table: Option<String>,
        kind: ObjectKind,
    },
    Object(ObjectRef),
    Column(ColumnInfo),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub key: String,
    pub kind: NodeKind,
    pub label: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub expanded: bool,
    /// Children have been fetched (distinct from `expanded`)
    pub loaded: bool,
    /// Activating the node opens data or a definition
    pub selectable: bool,
    pub metadata: NodeMetadata,
}

/// Description of a node to insert, possibly with pre-fetched children
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSpec {
    pub key: String,
    pub kind: NodeKind,
    pub label: String,
    pub selectable: bool,
    pub loaded: bool,
    pub metadata: NodeMetadata,
    pub children: Vec<NodeSpec>,
}

impl NodeSpec {
    /// A node without children that never loads any
    pub fn leaf(key: String, kind: NodeKind, label: String, metadata: NodeMetadata) -> Self {
        Self {
            key,
            kind,
            label,
            selectable: kind.is_relation() || kind.shows_definition(),
            loaded: true,
            metadata,
            children: Vec::new(),
        }
    }

    /// A node whose children are fetched on first expansion
    pub fn lazy(key: String, kind: NodeKind, label: String, metadata: NodeMetadata) -> Self {
        Self {
            loaded: false,
            ..Self::leaf(key, kind, label, metadata)
        }
    }

    /// A node inserted together with its children
    pub fn with_children(mut self, children: Vec<NodeSpec>) -> Self {
        self.children = children;
        self.loaded = true;
        self
    }
}

/// A visible row of the flattened tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatNode {
    pub id: NodeId,
    /// 0 for children of the root
    pub depth: usize,
}

#[derive(Debug, Clone)]
pub struct NavigationTree {
    /// `None` marks a freed slot
    nodes: Vec<Option<TreeNode>>,
    free: Vec<NodeId>,
    index: HashMap<String, NodeId>,
}

impl Default for NavigationTree {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationTree {
    /// A tree holding only the root sentinel
    pub fn new() -> Self {
        let root = TreeNode {
            key: "root".to_string(),
            kind: NodeKind::Root,
            label: String::new(),
            parent: None,
            children: Vec::new(),
            expanded: true,
            loaded: true,
            selectable: false,
            metadata: NodeMetadata::Root,
        };
        let mut index = HashMap::new();
        index.insert(root.key.clone(), NodeId(0));
        Self {
            nodes: vec![Some(root)],
            free: Vec::new(),
            index,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn get(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut TreeNode> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn find_by_id(&self, key: &str) -> Option<NodeId> {
        self.index.get(key).copied()
    }

    /// Number of live (reachable) nodes, root included
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    /// Slots held by the arena, live or free
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    /// Insert a node (and its spec'd children) under `parent`
    pub fn insert(&mut self, parent: NodeId, spec: NodeSpec) -> Option<NodeId> {
        if self.get(parent).is_none() {
            return None;
        }
        let NodeSpec {
            key,
            kind,
            label,
            selectable,
            loaded,
            metadata,
            children,
        } = spec;
        let node = TreeNode {
            key: key.clone(),
            kind,
            label,
            parent: Some(parent),
            children: Vec::new(),
            expanded: false,
            loaded: loaded || !children.is_empty(),
            selectable,
            metadata,
        };
        let id = match self.free.pop() {
            Some(id) => {
                self.nodes[id.0] = Some(node);
                id
            }
            None => {
                self.nodes.push(Some(node));
                NodeId(self.nodes.len() - 1)
            }
        };
        self.index.insert(key, id);
        if let Some(p) = self.get_mut(parent) {
            p.children.push(id);
        }
        for child in children {
            self.insert(id, child);
        }
        Some(id)
    }

    /// Add lazily-fetched children. Siblings already present (by key) are
    /// left untouched; the node is marked loaded.
    pub fn append_children(&mut self, parent: NodeId, specs: Vec<NodeSpec>) -> Vec<NodeId> {
        let mut added = Vec::new();
        for spec in specs {
            if self.index.contains_key(&spec.key) {
                continue;
            }
            if let Some(id) = self.insert(parent, spec) {
                added.push(id);
            }
        }
        if let Some(node) = self.get_mut(parent) {
            node.loaded = true;
        }
        added
    }

    /// Explicit refresh: free the current children subtree and load `specs`
    pub fn replace_children(&mut self, parent: NodeId, specs: Vec<NodeSpec>) -> Vec<NodeId> {
        let old = match self.get_mut(parent) {
            Some(node) => std::mem::take(&mut node.children),
            None => return Vec::new(),
        };
        for child in old {
            self.release(child);
        }
        self.append_children(parent, specs)
    }

    /// Drop a subtree from the index and hand its slots to the free list
    fn release(&mut self, id: NodeId) {
        if id == self.root() {
            return;
        }
        let Some(node) = self.nodes.get_mut(id.0).and_then(Option::take) else {
            return;
        };
        if self.index.get(&node.key) == Some(&id) {
            self.index.remove(&node.key);
        }
        self.free.push(id);
        for child in node.children {
            self.release(child);
        }
    }

    /// Flip expansion. Columns and the root never change; otherwise the node
    /// flips when it has children or has not been loaded yet (it may gain
    /// children once loaded). Returns the resulting `expanded` state.
    pub fn toggle(&mut self, id: NodeId) -> bool {
        let Some(node) = self.get_mut(id) else {
            return false;
        };
        if matches!(node.kind, NodeKind::Column | NodeKind::Root) {
            return node.expanded;
        }
        if !node.children.is_empty() || !node.loaded {
            node.expanded = !node.expanded;
        }
        node.expanded
    }

    pub fn set_expanded(&mut self, id: NodeId, expanded: bool) {
        if let Some(node) = self.get_mut(id)
            && node.kind != NodeKind::Root
        {
            node.expanded = expanded;
        }
    }

    /// Expanded but not yet fetched
    pub fn needs_load(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|n| n.expanded && !n.loaded)
    }

    /// Visible nodes, depth-first pre-order, root excluded. A node is listed
    /// iff every ancestor below the root is expanded.
    pub fn flatten(&self) -> Vec<FlatNode> {
        let mut out = Vec::new();
        if let Some(root) = self.get(self.root()) {
            for &child in &root.children {
                self.flatten_into(child, 0, &mut out);
            }
        }
        out
    }

    fn flatten_into(&self, id: NodeId, depth: usize, out: &mut Vec<FlatNode>) {
        let Some(node) = self.get(id) else {
            return;
        };
        out.push(FlatNode { id, depth });
        if node.expanded {
            for &child in &node.children {
                self.flatten_into(child, depth + 1, out);
            }
        }
    }

    /// Ancestors of `id`, nearest first, root excluded
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.get(id).and_then(|n| n.parent);
        while let Some(pid) = current {
            let Some(node) = self.get(pid) else {
                break;
            };
            if node.kind == NodeKind::Root {
                break;
            }
            out.push(pid);
            current = node.parent;
        }
        out
    }

    /// Labels from the top-level node down to `id`
    pub fn build_path_labels(&self, id: NodeId) -> Vec<String> {
        let mut path: Vec<String> = self
            .ancestors(id)
            .into_iter()
            .rev()
            .filter_map(|a| self.get(a).map(|n| n.label.clone()))
            .collect();
        if let Some(node) = self.get(id)
            && node.kind != NodeKind::Root
        {
            path.push(node.label.clone());
        }
        path
    }

    /// Expand every ancestor of the node with `key` so it becomes visible
    pub fn reveal(&mut self, key: &str) -> Option<NodeId> {
        let id = self.find_by_id(key)?;
        for ancestor in self.ancestors(id) {
            self.set_expanded(ancestor, true);
        }
        Some(id)
    }

    /// Name of the schema containing `id` (or `id` itself)
    pub fn schema_of(&self, id: NodeId) -> Option<&str> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find_map(|n| match self.get(n).map(|node| &node.metadata) {
                Some(NodeMetadata::Schema { name }) => Some(name.as_str()),
                _ => None,
            })
    }

    /// Name of the database node, if the tree has one
    pub fn database_name(&self) -> Option<&str> {
        let root = self.get(self.root())?;
        root.children
            .iter()
            .find_map(|&c| match self.get(c).map(|n| &n.metadata) {
                Some(NodeMetadata::Database { name }) => Some(name.as_str()),
                _ => None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(key: &str, kind: NodeKind, label: &str) -> NodeSpec {
        NodeSpec::lazy(key.into(), kind, label.into(), NodeMetadata::Root)
    }

    fn schema(key: &str, name: &str) -> NodeSpec {
        NodeSpec::lazy(
            key.into(),
            NodeKind::Schema,
            name.into(),
            NodeMetadata::Schema { name: name.into() },
        )
    }

    /// Root → d → s → [a, b]
    fn sample_tree() -> (NavigationTree, NodeId, NodeId) {
        let mut tree = NavigationTree::new();
        let d = tree
            .insert(tree.root(), container("db:d", NodeKind::Database, "d"))
            .unwrap();
        let s = tree.append_children(d, vec![schema("schema:d.s", "s")])[0];
        tree.append_children(
            s,
            vec![
                container("table:d.s.a", NodeKind::Table, "a"),
                container("table:d.s.b", NodeKind::Table, "b"),
            ],
        );
        (tree, d, s)
    }

    fn labels(tree: &NavigationTree) -> Vec<String> {
        tree.flatten()
            .iter()
            .map(|f| tree.get(f.id).unwrap().label.clone())
            .collect()
    }

    #[test]
    fn test_flatten_follows_expansion() {
        let (mut tree, d, s) = sample_tree();
        tree.toggle(d);
        tree.toggle(s);
        assert_eq!(labels(&tree), vec!["d", "s", "a", "b"]);
        tree.toggle(s);
        assert_eq!(labels(&tree), vec!["d", "s"]);
    }

    #[test]
    fn test_flatten_depths() {
        let (mut tree, d, s) = sample_tree();
        tree.toggle(d);
        tree.toggle(s);
        let depths: Vec<usize> = tree.flatten().iter().map(|f| f.depth).collect();
        assert_eq!(depths, vec![0, 1, 2, 2]);
    }

    #[test]
    fn test_flatten_visibility_for_every_expansion_state() {
        let (mut tree, d, s) = sample_tree();
        let a = tree.find_by_id("table:d.s.a").unwrap();
        tree.append_children(
            a,
            vec![NodeSpec::leaf(
                "column:d.s.a.id".into(),
                NodeKind::Column,
                "id".into(),
                NodeMetadata::Root,
            )],
        );
        let containers = [d, s, a];
        let all: Vec<NodeId> = tree
            .index
            .values()
            .copied()
            .filter(|&id| id != tree.root())
            .collect();

        for mask in 0..(1u32 << containers.len()) {
            for (bit, &id) in containers.iter().enumerate() {
                tree.set_expanded(id, mask & (1 << bit) != 0);
            }
            let flat: Vec<NodeId> = tree.flatten().iter().map(|f| f.id).collect();
            for &id in &all {
                let visible = tree
                    .ancestors(id)
                    .iter()
                    .all(|&a| tree.get(a).unwrap().expanded);
                assert_eq!(flat.contains(&id), visible, "mask {mask:b}");
            }
            // Pre-order: every node appears after its parent
            for (pos, id) in flat.iter().enumerate() {
                if let Some(parent) = tree.get(*id).unwrap().parent
                    && parent != tree.root()
                {
                    let ppos = flat.iter().position(|x| *x == parent).unwrap();
                    assert!(ppos < pos);
                }
            }
        }
    }

    #[test]
    fn test_toggle_column_is_noop() {
        let mut tree = NavigationTree::new();
        let col = tree
            .insert(
                tree.root(),
                NodeSpec::leaf("column:x".into(), NodeKind::Column, "x".into(), NodeMetadata::Root),
            )
            .unwrap();
        assert!(!tree.toggle(col));
        assert!(!tree.get(col).unwrap().expanded);
    }

    #[test]
    fn test_toggle_unloaded_node_is_optimistic() {
        let (mut tree, _, _) = sample_tree();
        let a = tree.find_by_id("table:d.s.a").unwrap();
        assert!(!tree.get(a).unwrap().loaded);
        assert!(tree.toggle(a));
        assert!(tree.needs_load(a));
    }

    #[test]
    fn test_toggle_loaded_leafless_node_stays_closed() {
        let (mut tree, _, _) = sample_tree();
        let a = tree.find_by_id("table:d.s.a").unwrap();
        tree.append_children(a, vec![]);
        assert!(!tree.toggle(a));
    }

    #[test]
    fn test_append_is_additive_and_marks_loaded() {
        let (mut tree, _, s) = sample_tree();
        let before = tree.get(s).unwrap().children.clone();
        let added = tree.append_children(
            s,
            vec![
                container("table:d.s.a", NodeKind::Table, "a-dup"),
                container("table:d.s.c", NodeKind::Table, "c"),
            ],
        );
        assert_eq!(added.len(), 1);
        let after = &tree.get(s).unwrap().children;
        assert_eq!(&after[..2], &before[..]);
        assert_eq!(tree.get(after[0]).unwrap().label, "a");
        assert!(tree.get(s).unwrap().loaded);
    }

    #[test]
    fn test_collapse_and_reexpand_does_not_need_load() {
        let (mut tree, _, s) = sample_tree();
        tree.toggle(s);
        tree.toggle(s);
        tree.toggle(s);
        assert!(!tree.needs_load(s));
    }

    #[test]
    fn test_replace_children_drops_old_keys() {
        let (mut tree, _, s) = sample_tree();
        tree.replace_children(s, vec![container("table:d.s.z", NodeKind::Table, "z")]);
        assert!(tree.find_by_id("table:d.s.a").is_none());
        assert!(tree.find_by_id("table:d.s.z").is_some());
        assert_eq!(tree.get(s).unwrap().children.len(), 1);
    }

    #[test]
    fn test_repeated_refresh_reuses_slots() {
        let (mut tree, _, s) = sample_tree();
        let refreshed = || {
            vec![
                container("table:d.s.a", NodeKind::Table, "a").with_children(vec![
                    NodeSpec::leaf("col:d.s.a.id".into(), NodeKind::Column, "id".into(), NodeMetadata::Root),
                ]),
                container("table:d.s.b", NodeKind::Table, "b"),
            ]
        };
        tree.replace_children(s, refreshed());
        let settled = tree.capacity();
        for _ in 0..20 {
            tree.replace_children(s, refreshed());
        }
        assert_eq!(tree.capacity(), settled);
        assert_eq!(tree.capacity(), tree.len());
        let a = tree.find_by_id("table:d.s.a").unwrap();
        assert_eq!(tree.get(a).unwrap().parent, Some(s));
        assert_eq!(tree.get(a).unwrap().children.len(), 1);
    }

    #[test]
    fn test_freed_node_id_resolves_to_nothing() {
        let (mut tree, _, s) = sample_tree();
        let a = tree.find_by_id("table:d.s.a").unwrap();
        tree.replace_children(s, Vec::new());
        assert!(tree.get(a).is_none());
        assert!(tree.ancestors(a).is_empty());
        assert!(tree.get(s).unwrap().loaded);
    }

    #[test]
    fn test_reveal_expands_ancestors() {
        let (mut tree, d, s) = sample_tree();
        let b = tree.reveal("table:d.s.b").unwrap();
        assert!(tree.get(d).unwrap().expanded);
        assert!(tree.get(s).unwrap().expanded);
        assert!(tree.flatten().iter().any(|f| f.id == b));
    }

    #[test]
    fn test_path_labels_and_schema_of() {
        let (tree, _, _) = sample_tree();
        let b = tree.find_by_id("table:d.s.b").unwrap();
        assert_eq!(tree.build_path_labels(b), vec!["d", "s", "b"]);
        assert_eq!(tree.schema_of(b), Some("s"));
        assert_eq!(tree.schema_of(tree.root()), None);
    }

    #[test]
    fn test_root_always_expanded_and_loaded() {
        let mut tree = NavigationTree::new();
        let root = tree.root();
        tree.toggle(root);
        tree.set_expanded(root, false);
        let node = tree.get(root).unwrap();
        assert!(node.expanded && node.loaded);
    }
}
