//! Flattening of a frame forest into the ordered rows of a tree table
//!
//! The frame tree itself is never modified. Instead, every node that is not
//! skipped gets wrapped into a `VirtualizedTreeNode` that carries UI state
//! (depth relative to the displayed roots, expansion state), and the wrappers
//! of expanded subtrees are laid out depth-first into a flat list of rows that
//! a virtualized table can address by integer row index.

use crate::{
    sort::SortConfig,
    tree::{FrameNode, FrameNodeId, FrameTree},
};
use ahash::AHashMap;
use std::{
    fmt::{self, Debug, Formatter},
    ops::Range,
    rc::Rc,
};

/// Predicate that removes a node and its whole subtree from the rows
pub type SkipPredicate = Box<dyn Fn(&FrameNode<'_>) -> bool>;

/// Skip predicate which collapses direct recursion
///
/// A node whose frame is the same as its parent's is hidden along with
/// everything it called.
pub fn skip_direct_recursion() -> SkipPredicate {
    Box::new(|node: &FrameNode<'_>| node.is_direct_recursive())
}

/// Tunable flattening behavior
pub struct FlattenOptions {
    /// Ordering of sibling rows
    pub sort: SortConfig,

    /// Nodes to be left out along with their subtree, if any
    pub skip: Option<SkipPredicate>,

    /// Initial expansion state of the nodes
    pub expanded: bool,
}
//
impl Default for FlattenOptions {
    fn default() -> Self {
        Self {
            sort: SortConfig::default(),
            skip: None,
            expanded: false,
        }
    }
}
//
impl Debug for FlattenOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        f.debug_struct("FlattenOptions")
            .field("sort", &self.sort)
            .field("skip", &self.skip.is_some())
            .field("expanded", &self.expanded)
            .finish()
    }
}

/// FrameNode wrapper that carries tree table state
#[derive(Clone, Debug, PartialEq)]
pub struct VirtualizedTreeNode {
    /// Wrapped frame tree node
    node: FrameNodeId,

    /// Distance from the displayed root that this node descends from
    depth: usize,

    /// Truth that the children of this node are displayed
    expanded: bool,

    /// Position of this node among its siblings in the source data, used to
    /// break ties between siblings that compare equal
    rank: usize,

    /// Wrapper of the parent node, if any
    parent: Option<usize>,

    /// Wrappers of the children which were not skipped, in sorted order
    children: Vec<usize>,
}
//
impl VirtualizedTreeNode {
    /// Wrapped frame tree node
    pub fn node(&self) -> FrameNodeId {
        self.node
    }

    /// Distance from the displayed root
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Truth that the children of this node are displayed
    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    /// Number of children that can be displayed by expanding this node
    pub fn num_children(&self) -> usize {
        self.children.len()
    }
}

/// Row of a flattened tree
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FlatRow<'tree> {
    /// Position of the row in the flattened output
    pub index: usize,

    /// Distance from the displayed root
    pub depth: usize,

    /// Truth that the children of this row are displayed below it
    pub expanded: bool,

    /// Truth that this row has children that can be displayed
    pub expandable: bool,

    /// Frame tree node displayed by this row
    pub node: FrameNode<'tree>,
}

/// Sorted, filtered and flattened view of a frame forest
pub struct VirtualizedTree {
    /// Frame tree that is being displayed
    tree: Rc<FrameTree>,

    /// Flattening configuration
    options: FlattenOptions,

    /// Wrappers of every displayable node
    nodes: Vec<VirtualizedTreeNode>,

    /// Wrappers of the displayed roots, in sorted order
    roots: Vec<usize>,

    /// Wrapper associated with each frame tree node
    by_node: AHashMap<FrameNodeId, usize>,

    /// Wrappers of the visible rows, in display order
    rows: Vec<usize>,

    /// Visible row associated with each wrapper, if any
    row_of: Vec<Option<usize>>,
}
//
impl VirtualizedTree {
    /// Flatten a set of roots from a frame tree
    ///
    /// Missing roots are handled like an empty set of roots.
    pub fn new(
        tree: Rc<FrameTree>,
        roots: Option<&[FrameNodeId]>,
        options: FlattenOptions,
    ) -> Self {
        let mut result = Self {
            tree,
            options,
            nodes: Vec::new(),
            roots: Vec::new(),
            by_node: AHashMap::new(),
            rows: Vec::new(),
            row_of: Vec::new(),
        };
        result.set_roots(roots);
        result
    }

    /// Switch to a different set of roots
    ///
    /// Expansion state is reset to the initial expansion state.
    pub fn set_roots(&mut self, roots: Option<&[FrameNodeId]>) {
        self.nodes.clear();
        self.roots.clear();
        self.by_node.clear();
        let tree = Rc::clone(&self.tree);
        for (rank, &root) in roots.unwrap_or_default().iter().enumerate() {
            if let Some(idx) = self.wrap_subtree(&tree, tree.node(root), rank) {
                self.roots.push(idx);
            }
        }
        log::debug!(
            "Wrapped {} frame tree nodes below {} root(s)",
            self.nodes.len(),
            self.roots.len()
        );
        self.sort_all();
        self.reflatten();
    }

    /// Switch to a different frame tree and set of roots
    pub fn set_tree(&mut self, tree: Rc<FrameTree>, roots: Option<&[FrameNodeId]>) {
        self.tree = tree;
        self.set_roots(roots);
    }

    /// Frame tree that is being displayed
    pub fn tree(&self) -> &Rc<FrameTree> {
        &self.tree
    }

    /// Current sorting configuration
    pub fn sort(&self) -> SortConfig {
        self.options.sort
    }

    /// Change the sorting configuration
    ///
    /// Expansion state is preserved.
    pub fn set_sort(&mut self, sort: SortConfig) {
        if sort == self.options.sort {
            return;
        }
        log::debug!("Sorting frames by {} ({})", sort.key, sort.direction);
        self.options.sort = sort;
        self.sort_all();
        self.reflatten();
    }

    /// Number of visible rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Truth that there is no visible row
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Access a visible row
    pub fn row(&self, index: usize) -> Option<FlatRow<'_>> {
        let &idx = self.rows.get(index)?;
        let wrapper = &self.nodes[idx];
        let expandable = !wrapper.children.is_empty();
        Some(FlatRow {
            index,
            depth: wrapper.depth,
            expanded: wrapper.expanded && expandable,
            expandable,
            node: self.tree.node(wrapper.node),
        })
    }

    /// Every visible row, in display order
    pub fn rows(&self) -> impl Iterator<Item = FlatRow<'_>> + '_ {
        self.rows_in(0..self.rows.len())
    }

    /// A range of visible rows, in display order
    ///
    /// The range is truncated to the set of visible rows.
    pub fn rows_in(&self, range: Range<usize>) -> impl Iterator<Item = FlatRow<'_>> + '_ {
        let end = range.end.min(self.rows.len());
        let start = range.start.min(end);
        (start..end).filter_map(move |index| self.row(index))
    }

    /// Wrapper displayed by a visible row
    pub fn wrapper(&self, row: usize) -> Option<&VirtualizedTreeNode> {
        self.rows.get(row).map(|&idx| &self.nodes[idx])
    }

    /// Find the visible row that displays a frame tree node
    pub fn find_row(&self, node: FrameNodeId) -> Option<usize> {
        self.by_node
            .get(&node)
            .and_then(|&idx| self.row_of[idx])
    }

    /// Find the row of the parent of a visible row, if any
    pub fn parent_row(&self, row: usize) -> Option<usize> {
        let &idx = self.rows.get(row)?;
        self.nodes[idx].parent.and_then(|parent| self.row_of[parent])
    }

    /// Expand or collapse a visible row
    ///
    /// If `expand_children` is set, the whole subtree below the row is
    /// expanded or collapsed, not just the row itself. Rows without children
    /// are left alone. Returns the truth that something changed.
    pub fn set_expanded(&mut self, row: usize, expanded: bool, expand_children: bool) -> bool {
        let Some(&idx) = self.rows.get(row) else {
            return false;
        };
        let mut changed = false;
        let mut pending = vec![idx];
        while let Some(idx) = pending.pop() {
            let wrapper = &mut self.nodes[idx];
            if !wrapper.children.is_empty() && wrapper.expanded != expanded {
                wrapper.expanded = expanded;
                changed = true;
            }
            if expand_children {
                pending.extend(wrapper.children.iter().copied());
            }
        }
        if changed {
            self.reflatten();
        }
        changed
    }

    /// Flip the expansion state of a visible row
    ///
    /// See `set_expanded()` for the meaning of `expand_children`.
    pub fn toggle_expanded(&mut self, row: usize, expand_children: bool) -> bool {
        let Some(&idx) = self.rows.get(row) else {
            return false;
        };
        let expanded = !self.nodes[idx].expanded;
        self.set_expanded(row, expanded, expand_children)
    }

    /// Expand or collapse every node
    pub fn expand_all(&mut self, expanded: bool) {
        for wrapper in &mut self.nodes {
            wrapper.expanded = expanded && !wrapper.children.is_empty();
        }
        self.reflatten();
    }

    /// Wrap a node and its descendants, unless it is skipped
    fn wrap_subtree(
        &mut self,
        tree: &FrameTree,
        root: FrameNode<'_>,
        rank: usize,
    ) -> Option<usize> {
        if self.is_skipped(&root) {
            return None;
        }
        let root_idx = self.push_wrapper(root, 0, None, rank);
        let mut pending = vec![root_idx];
        while let Some(parent_idx) = pending.pop() {
            let parent = tree.node(self.nodes[parent_idx].node);
            let depth = self.nodes[parent_idx].depth + 1;
            for (rank, child) in parent.children().enumerate() {
                if self.is_skipped(&child) {
                    continue;
                }
                let child_idx = self.push_wrapper(child, depth, Some(parent_idx), rank);
                self.nodes[parent_idx].children.push(child_idx);
                pending.push(child_idx);
            }
        }
        Some(root_idx)
    }

    /// Truth that a node should be left out
    fn is_skipped(&self, node: &FrameNode<'_>) -> bool {
        self.options.skip.as_ref().map_or(false, |skip| skip(node))
    }

    /// Record a new wrapper
    fn push_wrapper(
        &mut self,
        node: FrameNode<'_>,
        depth: usize,
        parent: Option<usize>,
        rank: usize,
    ) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(VirtualizedTreeNode {
            node: node.id(),
            depth,
            expanded: self.options.expanded && !node.is_leaf(),
            rank,
            parent,
            children: Vec::new(),
        });
        self.by_node.insert(node.id(), idx);
        idx
    }

    /// Sort the roots and every list of children
    fn sort_all(&mut self) {
        let sort = self.options.sort;
        let tree = Rc::clone(&self.tree);
        for idx in 0..self.nodes.len() {
            let mut children = std::mem::take(&mut self.nodes[idx].children);
            sort_siblings(&mut children, &self.nodes, &tree, sort);
            self.nodes[idx].children = children;
        }
        let mut roots = std::mem::take(&mut self.roots);
        sort_siblings(&mut roots, &self.nodes, &tree, sort);
        self.roots = roots;
    }

    /// Recompute the list of visible rows
    fn reflatten(&mut self) {
        self.rows.clear();
        self.row_of.clear();
        self.row_of.resize(self.nodes.len(), None);
        let mut pending = self.roots.iter().rev().copied().collect::<Vec<_>>();
        while let Some(idx) = pending.pop() {
            self.row_of[idx] = Some(self.rows.len());
            self.rows.push(idx);
            let wrapper = &self.nodes[idx];
            if wrapper.expanded {
                pending.extend(wrapper.children.iter().rev().copied());
            }
        }
        log::trace!(
            "Flattened {} wrapped nodes into {} rows",
            self.nodes.len(),
            self.rows.len()
        );
    }
}
//
impl Debug for VirtualizedTree {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        f.debug_struct("VirtualizedTree")
            .field("options", &self.options)
            .field("nodes", &self.nodes.len())
            .field("rows", &self.rows.len())
            // Elide FrameTree from output as that's huge
            .finish_non_exhaustive()
    }
}

/// Sort sibling wrappers, breaking ties using their source order
fn sort_siblings(
    siblings: &mut [usize],
    nodes: &[VirtualizedTreeNode],
    tree: &FrameTree,
    sort: SortConfig,
) {
    siblings.sort_by(|&a, &b| {
        let (a, b) = (&nodes[a], &nodes[b]);
        sort.compare(&tree.node(a.node), &tree.node(b.node))
            .then(a.rank.cmp(&b.rank))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        sort::{SortDirection, SortKey},
        tree::{tests::tree_from_stacks, FrameTreeBuilder, Weight},
    };
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    /// Flatten all the roots of a tree
    fn flatten(tree: FrameTree, options: FlattenOptions) -> VirtualizedTree {
        let tree = Rc::new(tree);
        let roots = tree.root_ids().to_vec();
        VirtualizedTree::new(tree, Some(&roots), options)
    }

    /// Names of the visible rows
    fn names(flat: &VirtualizedTree) -> Vec<String> {
        flat.rows()
            .map(|row| row.node.frame().name().to_owned())
            .collect()
    }

    /// Identities of the visible rows
    fn ids(flat: &VirtualizedTree) -> Vec<(FrameNodeId, usize)> {
        flat.rows().map(|row| (row.node.id(), row.depth)).collect()
    }

    fn scenario_tree() -> FrameTree {
        tree_from_stacks(&[
            ("Root", 10.0),
            ("Root;B", 10.0),
            ("Root;B;b", 20.0),
            ("Root;A", 30.0),
            ("Root;A;a", 30.0),
        ])
    }

    #[test]
    fn sorted_expansion() {
        let mut flat = flatten(scenario_tree(), FlattenOptions::default());
        assert_eq!(names(&flat), ["Root"]);
        let root = flat.row(0).unwrap();
        assert_eq!(root.node.total_weight(), 100.0);
        assert!(root.expandable);
        assert!(!root.expanded);

        assert!(flat.toggle_expanded(0, false));
        assert_eq!(names(&flat), ["Root", "A", "B"]);
        assert_eq!(flat.row(1).unwrap().depth, 1);

        assert!(flat.toggle_expanded(0, false));
        assert_eq!(names(&flat), ["Root"]);
    }

    #[test]
    fn missing_roots() {
        let tree = Rc::new(scenario_tree());
        let flat = VirtualizedTree::new(tree.clone(), None, FlattenOptions::default());
        assert!(flat.is_empty());
        assert_eq!(flat.row(0), None);
        let flat = VirtualizedTree::new(tree, Some(&[]), FlattenOptions::default());
        assert_eq!(flat.len(), 0);
    }

    #[test]
    fn subroots() {
        let tree = Rc::new(scenario_tree());
        let a = tree
            .all_nodes()
            .find(|node| node.frame().name() == "A")
            .unwrap()
            .id();
        let options = FlattenOptions {
            expanded: true,
            ..Default::default()
        };
        let flat = VirtualizedTree::new(tree, Some(&[a]), options);
        assert_eq!(names(&flat), ["A", "a"]);
        assert_eq!(flat.row(0).unwrap().depth, 0);
        assert_eq!(flat.row(1).unwrap().depth, 1);
    }

    #[test]
    fn resort_preserves_expansion() {
        let mut flat = flatten(scenario_tree(), FlattenOptions::default());
        flat.toggle_expanded(0, false);
        flat.toggle_expanded(2, false);
        assert_eq!(names(&flat), ["Root", "A", "B", "b"]);

        flat.set_sort(SortConfig::new(SortKey::Name, SortDirection::Ascending));
        assert_eq!(names(&flat), ["Root", "B", "b", "A"]);
        flat.set_sort(SortConfig::new(SortKey::Name, SortDirection::Descending));
        assert_eq!(names(&flat), ["Root", "A", "B", "b"]);
        assert_eq!(flat.sort().key, SortKey::Name);

        // Changing roots resets expansion state
        let roots = flat.tree().root_ids().to_vec();
        flat.set_roots(Some(&roots));
        assert_eq!(names(&flat), ["Root"]);
    }

    #[test]
    fn subtree_expansion() {
        let mut flat = flatten(scenario_tree(), FlattenOptions::default());
        assert!(flat.toggle_expanded(0, true));
        assert_eq!(names(&flat), ["Root", "A", "a", "B", "b"]);
        assert!(flat.toggle_expanded(0, true));
        assert_eq!(names(&flat), ["Root"]);

        // Plain expansion after a subtree collapse only opens one level
        flat.toggle_expanded(0, false);
        assert_eq!(names(&flat), ["Root", "A", "B"]);

        // Leaves cannot be expanded
        flat.toggle_expanded(1, false);
        assert!(!flat.toggle_expanded(2, false));
        assert!(!flat.set_expanded(42, true, false));

        flat.expand_all(false);
        assert_eq!(names(&flat), ["Root"]);
        flat.expand_all(true);
        assert_eq!(flat.len(), 5);
    }

    #[test]
    fn row_lookup() {
        let mut flat = flatten(scenario_tree(), FlattenOptions::default());
        let tree = flat.tree().clone();
        let b = tree
            .all_nodes()
            .find(|node| node.frame().name() == "B")
            .unwrap()
            .id();
        assert_eq!(flat.find_row(b), None);
        flat.toggle_expanded(0, false);
        assert_eq!(flat.find_row(b), Some(2));
        assert_eq!(flat.parent_row(2), Some(0));
        assert_eq!(flat.parent_row(0), None);
        assert_eq!(flat.wrapper(2).unwrap().node(), b);
        assert_eq!(flat.wrapper(2).unwrap().num_children(), 1);
        assert_eq!(flat.rows_in(1..10).count(), 2);
        assert_eq!(flat.rows_in(5..10).count(), 0);
    }

    #[test]
    fn recursion_collapse() {
        let options = || FlattenOptions {
            skip: Some(skip_direct_recursion()),
            expanded: true,
            ..Default::default()
        };

        // The nested A is skipped along with everything below it
        let flat = flatten(tree_from_stacks(&[("A;A;A;B", 1.0)]), options());
        assert_eq!(names(&flat), ["A"]);
        assert!(!flat.row(0).unwrap().expandable);

        // Indirect recursion is kept
        let flat = flatten(tree_from_stacks(&[("A;B;A", 1.0)]), options());
        assert_eq!(names(&flat), ["A", "B", "A"]);

        // Without the predicate, everything is shown
        let flat = flatten(
            tree_from_stacks(&[("A;A;A;B", 1.0)]),
            FlattenOptions {
                expanded: true,
                ..Default::default()
            },
        );
        assert_eq!(names(&flat), ["A", "A", "A", "B"]);
    }

    #[test]
    fn ties_keep_source_order() {
        let tree = tree_from_stacks(&[("r;x", 5.0), ("r;y", 5.0), ("r;z", 5.0), ("r;w", 7.0)]);
        let mut flat = flatten(
            tree,
            FlattenOptions {
                expanded: true,
                ..Default::default()
            },
        );
        assert_eq!(names(&flat), ["r", "w", "x", "y", "z"]);
        flat.set_sort(SortConfig::new(SortKey::TotalWeight, SortDirection::Ascending));
        assert_eq!(names(&flat), ["r", "x", "y", "z", "w"]);
    }

    /// Random forests over a small set of frame names, so that recursion and
    /// weight ties are common
    fn stacks() -> impl Strategy<Value = Vec<(Vec<u8>, u8)>> {
        prop::collection::vec((prop::collection::vec(0u8..4, 1..6), 1u8..50), 1..40)
    }

    fn build(stacks: &[(Vec<u8>, u8)]) -> FrameTree {
        let mut builder = FrameTreeBuilder::new();
        for (stack, weight) in stacks {
            let keys = stack
                .iter()
                .map(|frame| builder.intern_frame(&format!("f{frame}"), frame % 2 == 0, None))
                .collect::<Vec<_>>();
            builder.add_stack(keys, Weight::from(*weight)).unwrap();
        }
        builder.build()
    }

    fn options(sort: SortConfig, skip: bool, expanded: bool) -> FlattenOptions {
        FlattenOptions {
            sort,
            skip: skip.then(skip_direct_recursion),
            expanded,
        }
    }

    proptest! {
        #[test]
        fn deterministic(stacks in stacks(), sort: SortConfig, skip: bool) {
            let tree = Rc::new(build(&stacks));
            let roots = tree.root_ids().to_vec();
            let first = VirtualizedTree::new(tree.clone(), Some(&roots), options(sort, skip, true));
            let second = VirtualizedTree::new(tree, Some(&roots), options(sort, skip, true));
            prop_assert_eq!(ids(&first), ids(&second));
        }

        #[test]
        fn depth_invariant(stacks in stacks(), sort: SortConfig, skip: bool) {
            let flat = flatten(build(&stacks), options(sort, skip, true));
            for row in flat.rows() {
                match flat.parent_row(row.index) {
                    Some(parent) => {
                        prop_assert!(parent < row.index);
                        prop_assert_eq!(row.depth, flat.row(parent).unwrap().depth + 1);
                        prop_assert_eq!(
                            row.node.parent().map(|p| p.id()),
                            Some(flat.row(parent).unwrap().node.id())
                        );
                    }
                    None => prop_assert_eq!(row.depth, 0),
                }
                if skip {
                    prop_assert!(!row.node.is_direct_recursive());
                }
            }
            if !skip {
                prop_assert_eq!(flat.len(), flat.tree().len());
            }
        }

        #[test]
        fn sort_idempotence(stacks in stacks(), initial: SortConfig, target: SortConfig) {
            let tree = build(&stacks);
            let mut resorted = flatten(tree, options(initial, false, true));
            resorted.set_sort(target);
            let once = ids(&resorted);
            resorted.set_sort(target);
            prop_assert_eq!(&ids(&resorted), &once);

            let direct = VirtualizedTree::new(
                resorted.tree().clone(),
                Some(resorted.tree().root_ids()),
                options(target, false, true),
            );
            prop_assert_eq!(ids(&direct), once);
        }

        #[test]
        fn toggle_twice(
            stacks in stacks(),
            sort: SortConfig,
            row in 0usize..64,
            expand_children: bool
        ) {
            let mut flat = flatten(build(&stacks), options(sort, false, false));
            flat.expand_all(true);
            flat.set_expanded(0, false, false);
            let before = ids(&flat);
            let row = row % flat.len();
            let changed = flat.toggle_expanded(row, expand_children);
            prop_assert_eq!(changed, flat.row(row).unwrap().expandable);
            flat.toggle_expanded(row, expand_children);
            if !expand_children {
                prop_assert_eq!(ids(&flat), before);
            }
        }
    }
}
