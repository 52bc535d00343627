//! Call tree of the frames recorded by a profiler

use ahash::AHashMap;
use lasso::{Key, Rodeo, Spur};
use std::{
    fmt::{self, Debug, Formatter},
    ops::Range,
};
use strum::{Display, EnumString, IntoStaticStr};
use thiserror::Error;

/// Cost associated with a frame (nanoseconds, sample count...)
pub type Weight = f64;

/// Interned frame identity
///
/// Two frames are the same frame if and only if their keys are equal. Keys are
/// only comparable when they originate from the same FrameTree (or from trees
/// derived from one another via `inverted()` and `filtered()`).
///
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct FrameKey(Spur);
//
impl FrameKey {
    /// Position of this frame in the frame table of its tree
    fn index(self) -> usize {
        self.0.into_usize()
    }
}

/// Code location that the profiler attributed some cost to
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    /// Interned identity
    key: FrameKey,

    /// Human-readable name, usually a function name
    name: Box<str>,

    /// Truth that this frame belongs to the profiled application, as opposed
    /// to the system libraries and runtime it runs on
    is_application: bool,

    /// Key used to give related frames the same color
    color_key: Option<Box<str>>,
}
//
impl Frame {
    /// Interned identity of this frame
    pub fn key(&self) -> FrameKey {
        self.key
    }

    /// Human-readable name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Truth that this is application code
    pub fn is_application(&self) -> bool {
        self.is_application
    }

    /// Key used to give related frames the same color, if any
    pub fn color_key(&self) -> Option<&str> {
        self.color_key.as_deref()
    }
}

/// Identifier of a node within a FrameTree
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct FrameNodeId(usize);
//
impl FrameNodeId {
    /// Index of this node in FrameTree::nodes
    pub fn index(self) -> usize {
        self.0
    }
}

/// Immutable forest of aggregated call stacks
#[derive(PartialEq)]
pub struct FrameTree {
    /// Frames referenced by the nodes, indexed by FrameKey
    frames: Box<[Frame]>,

    /// Call tree nodes, in order of creation
    nodes: Box<[NodeData]>,

    /// Children of every node, followed by the list of roots
    ///
    /// Each node gets a slice of this array listing its direct children in
    /// insertion order. The roots are stored at the end.
    children: Box<[FrameNodeId]>,

    /// Start of the list of roots, at the end of the children array
    first_root_idx: usize,
}
//
impl FrameTree {
    /// Number of nodes in the tree
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Truth that the tree has no node
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Root nodes, in insertion order
    pub fn roots(&self) -> impl Iterator<Item = FrameNode<'_>> + '_ {
        self.node_iter(self.first_root_idx..)
    }

    /// Identifiers of the root nodes, in insertion order
    pub fn root_ids(&self) -> &[FrameNodeId] {
        &self.children[self.first_root_idx..]
    }

    /// Access a node from its identifier
    ///
    /// # Panics
    ///
    /// If the identifier does not originate from this tree.
    pub fn node(&self, id: FrameNodeId) -> FrameNode<'_> {
        assert!(id.0 < self.nodes.len(), "{id:?} does not belong to this tree");
        FrameNode { tree: self, id }
    }

    /// Every node of the tree, in unspecified order
    ///
    /// Be careful not to double-count total weights when using this, as a
    /// node's total weight includes that of its transitive children.
    pub fn all_nodes(&self) -> impl Iterator<Item = FrameNode<'_>> + '_ {
        (0..self.nodes.len()).map(move |idx| FrameNode {
            tree: self,
            id: FrameNodeId(idx),
        })
    }

    /// Sum of the total weights of the roots
    pub fn total_weight(&self) -> Weight {
        self.roots().map(|root| root.total_weight()).sum()
    }

    /// Access the frame associated with a key
    pub fn frame(&self, key: FrameKey) -> &Frame {
        &self.frames[key.index()]
    }

    /// Frames referenced by this tree
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Bottom-up version of this tree
    ///
    /// Every node that has some self weight contributes its stack, reversed,
    /// so that the roots of the output are the frames where time was spent and
    /// the children are their callers.
    pub fn inverted(&self) -> FrameTree {
        let mut builder = FrameTreeBuilder::from_frames(&self.frames);
        for node in self.all_nodes().filter(|node| node.self_weight() > 0.0) {
            let stack = node.ancestors_and_self().map(|n| n.frame().key());
            builder
                .add_stack(stack, node.self_weight())
                .expect("Stacks and weights from a valid tree should be valid");
        }
        builder.build()
    }

    /// Version of this tree where only frames accepted by a filter are kept
    ///
    /// Descendants of a rejected frame are re-parented onto their closest kept
    /// ancestor, and merged with nodes of the same frame there. Self weight of
    /// a rejected frame moves to its closest kept ancestor, and is only dropped
    /// when no frame of its stack is kept.
    pub fn filtered(&self, filter: FrameFilter) -> FrameTree {
        let mut builder = FrameTreeBuilder::from_frames(&self.frames);
        let mut dropped = 0;
        for node in self.all_nodes().filter(|node| node.self_weight() > 0.0) {
            let mut stack = node
                .ancestors_and_self()
                .map(|n| n.frame())
                .filter(|frame| filter.accepts(frame))
                .map(Frame::key)
                .collect::<Vec<_>>();
            if stack.is_empty() {
                dropped += 1;
                continue;
            }
            stack.reverse();
            builder
                .add_stack(stack, node.self_weight())
                .expect("Stacks and weights from a valid tree should be valid");
        }
        if dropped > 0 {
            log::debug!("{filter} filter dropped the self weight of {dropped} stack(s)");
        }
        builder.build()
    }

    /// Iterator over a set of nodes identified by consecutive indices in
    /// FrameTree::children
    fn node_iter(
        &self,
        children_indices: impl std::slice::SliceIndex<[FrameNodeId], Output = [FrameNodeId]>,
    ) -> impl Iterator<Item = FrameNode<'_>> + '_ {
        self.children[children_indices]
            .iter()
            .map(move |&id| FrameNode { tree: self, id })
    }
}
//
impl Debug for FrameTree {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        f.debug_struct("FrameTree")
            .field("frames", &self.frames.len())
            .field("nodes", &self.nodes.len())
            .field("roots", &self.root_ids().len())
            .finish_non_exhaustive()
    }
}

/// Read-only view of a node within a FrameTree
#[derive(Copy, Clone)]
pub struct FrameNode<'tree> {
    /// Tree which this node belongs to
    tree: &'tree FrameTree,

    /// Identifier of the node within the tree
    id: FrameNodeId,
}
//
impl<'tree> FrameNode<'tree> {
    /// Identifier of this node
    pub fn id(&self) -> FrameNodeId {
        self.id
    }

    /// Frame which this node aggregates
    pub fn frame(&self) -> &'tree Frame {
        self.tree.frame(self.data().frame)
    }

    /// Cost of this node, excluding its children
    pub fn self_weight(&self) -> Weight {
        self.data().self_weight
    }

    /// Cost of this node, including its children
    pub fn total_weight(&self) -> Weight {
        self.data().total_weight
    }

    /// Distance from the root of the tree
    pub fn depth(&self) -> usize {
        self.data().depth
    }

    /// Nodes that were called by this node, in insertion order
    pub fn children(&self) -> impl Iterator<Item = FrameNode<'tree>> + 'tree {
        self.tree.node_iter(self.data().children.clone())
    }

    /// Number of direct children
    pub fn num_children(&self) -> usize {
        self.data().children.len()
    }

    /// Truth that this node has no children
    pub fn is_leaf(&self) -> bool {
        self.data().children.is_empty()
    }

    /// Node which called this node, if any
    pub fn parent(&self) -> Option<FrameNode<'tree>> {
        self.data().parent.map(|id| FrameNode {
            tree: self.tree,
            id,
        })
    }

    /// Truth that this node has the same frame as its parent
    ///
    /// Only direct recursion is detected. A frame that reappears further up
    /// the stack with other frames in between is not directly recursive.
    pub fn is_direct_recursive(&self) -> bool {
        self.parent()
            .map_or(false, |parent| parent.data().frame == self.data().frame)
    }

    /// This node, then its parent, grand-parent... up to the root
    pub fn ancestors_and_self(&self) -> impl Iterator<Item = FrameNode<'tree>> {
        std::iter::successors(Some(*self), FrameNode::parent)
    }

    /// Internal node data
    fn data(&self) -> &'tree NodeData {
        &self.tree.nodes[self.id.0]
    }
}
//
impl PartialEq for FrameNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}
//
impl Debug for FrameNode<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        f.debug_struct("FrameNode")
            .field("id", &self.id)
            .field("frame", &self.frame().name())
            .field("self_weight", &self.self_weight())
            .field("total_weight", &self.total_weight())
            // Elide FrameTree from output as that's huge
            .finish_non_exhaustive()
    }
}

/// Individual node within the FrameTree
#[derive(Debug, PartialEq)]
struct NodeData {
    /// Frame which this node aggregates
    frame: FrameKey,

    /// Weight excluding children
    self_weight: Weight,

    /// Weight including children
    total_weight: Weight,

    /// Distance from the root
    depth: usize,

    /// Parent node, if any
    parent: Option<FrameNodeId>,

    /// Indices of child nodes in the global FrameTree::children array
    children: Range<usize>,
}

/// Subset of frames to be kept by `FrameTree::filtered()`
#[derive(Copy, Clone, Debug, Default, Display, EnumString, Eq, IntoStaticStr, PartialEq)]
#[strum(serialize_all = "lowercase")]
pub enum FrameFilter {
    /// Keep every frame
    #[default]
    All,

    /// Keep application frames only
    Application,

    /// Keep system frames only
    System,
}
//
impl FrameFilter {
    /// Truth that this filter keeps a certain frame
    pub fn accepts(self, frame: &Frame) -> bool {
        match self {
            Self::All => true,
            Self::Application => frame.is_application(),
            Self::System => !frame.is_application(),
        }
    }
}

/// Mechanism to build a FrameTree from call stacks
#[derive(Debug)]
pub struct FrameTreeBuilder {
    /// Frame name interner, whose keys index the frames table
    names: Rodeo,

    /// Frames collected so far
    frames: Vec<Frame>,

    /// Nodes collected so far
    nodes: Vec<BuilderNode>,

    /// Roots collected so far, in insertion order
    roots: Vec<usize>,

    /// Lookup table from (parent, frame) to node index
    lookup: AHashMap<(Option<usize>, FrameKey), usize>,
}
//
impl FrameTreeBuilder {
    /// Start building an empty FrameTree
    pub fn new() -> Self {
        Self {
            names: Rodeo::new(),
            frames: Vec::new(),
            nodes: Vec::new(),
            roots: Vec::new(),
            lookup: AHashMap::new(),
        }
    }

    /// Start building a FrameTree that reuses the frames of another tree
    ///
    /// Frame keys from the source tree remain valid in the output tree.
    fn from_frames(frames: &[Frame]) -> Self {
        let mut builder = Self::new();
        for frame in frames {
            let key = builder.intern_frame(
                frame.name(),
                frame.is_application(),
                frame.color_key(),
            );
            debug_assert_eq!(key, frame.key());
        }
        builder
    }

    /// Register a frame, or look up a previously registered frame by name
    ///
    /// Frames are identified by name. When a name is registered again, the
    /// first registration's attributes are kept.
    pub fn intern_frame(
        &mut self,
        name: &str,
        is_application: bool,
        color_key: Option<&str>,
    ) -> FrameKey {
        let key = FrameKey(self.names.get_or_intern(name));
        if key.index() == self.frames.len() {
            self.frames.push(Frame {
                key,
                name: name.into(),
                is_application,
                color_key: color_key.map(Into::into),
            });
        } else if self.frames[key.index()].is_application != is_application {
            log::debug!("Frame {name:?} was registered with inconsistent application flags");
        }
        key
    }

    /// Record a call stack, listed from the outermost caller to the frame
    /// where `weight` was spent
    ///
    /// Every node along the stack has its total weight increased by `weight`,
    /// and the last one also has its self weight increased by `weight`.
    pub fn add_stack(
        &mut self,
        stack: impl IntoIterator<Item = FrameKey>,
        weight: Weight,
    ) -> Result<(), FrameTreeError> {
        // Validate inputs before touching the tree
        if !weight.is_finite() || weight < 0.0 {
            return Err(FrameTreeError::InvalidWeight(weight));
        }
        let stack = stack.into_iter().collect::<Vec<_>>();
        if stack.is_empty() {
            return Err(FrameTreeError::EmptyStack);
        }
        if let Some(&key) = stack.iter().find(|key| key.index() >= self.frames.len()) {
            return Err(FrameTreeError::UnknownFrame(key));
        }

        // Walk down the tree, creating nodes as needed
        let mut parent = None;
        for key in stack {
            let depth = parent.map_or(0, |idx: usize| self.nodes[idx].depth + 1);
            let next_idx = self.nodes.len();
            let node_idx = *self.lookup.entry((parent, key)).or_insert(next_idx);
            if node_idx == next_idx {
                self.nodes.push(BuilderNode {
                    frame: key,
                    self_weight: 0.0,
                    total_weight: 0.0,
                    depth,
                    parent,
                    children: Vec::new(),
                });
                match parent {
                    Some(parent_idx) => self.nodes[parent_idx].children.push(node_idx),
                    None => self.roots.push(node_idx),
                }
            }
            self.nodes[node_idx].total_weight += weight;
            parent = Some(node_idx);
        }
        let leaf = parent.expect("Stack was checked to be non-empty");
        self.nodes[leaf].self_weight += weight;
        Ok(())
    }

    /// Finish building the frame tree
    pub fn build(self) -> FrameTree {
        // Lay out children lists contiguously, followed by the roots
        let mut children = Vec::with_capacity(self.nodes.len());
        let nodes = self
            .nodes
            .into_iter()
            .map(|node| {
                let first_child_idx = children.len();
                children.extend(node.children.into_iter().map(FrameNodeId));
                NodeData {
                    frame: node.frame,
                    self_weight: node.self_weight,
                    total_weight: node.total_weight,
                    depth: node.depth,
                    parent: node.parent.map(FrameNodeId),
                    children: first_child_idx..children.len(),
                }
            })
            .collect::<Box<[_]>>();
        let first_root_idx = children.len();
        children.extend(self.roots.into_iter().map(FrameNodeId));

        // After this, children should contain as many nodes as there are
        // nodes, since each node is either a root or a child of another node
        assert_eq!(
            nodes.len(),
            children.len(),
            "Failed to build a consistent tree"
        );
        FrameTree {
            frames: self.frames.into_boxed_slice(),
            nodes,
            children: children.into_boxed_slice(),
            first_root_idx,
        }
    }
}
//
impl Default for FrameTreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Node within a FrameTree that is being built
#[derive(Debug)]
struct BuilderNode {
    frame: FrameKey,
    self_weight: Weight,
    total_weight: Weight,
    depth: usize,
    parent: Option<usize>,
    children: Vec<usize>,
}

/// What can go wrong while recording call stacks into a FrameTree
#[derive(Debug, Error, PartialEq)]
pub enum FrameTreeError {
    /// Weights must be finite and positive
    #[error("invalid stack weight {0}")]
    InvalidWeight(Weight),

    /// Call stacks must contain at least one frame
    #[error("empty call stack")]
    EmptyStack,

    /// Frames must be registered with intern_frame before use
    #[error("unknown frame {0:?}")]
    UnknownFrame(FrameKey),
}
