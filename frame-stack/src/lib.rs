//! Interactive call tree table for sampling and tracing profiles
//!
//! A profile is loaded into an immutable `FrameTree`, which is then flattened
//! into the sorted rows of a tree table by a `VirtualizedTree`. The
//! `FrameStackTable` controller adds the interactive state (focus, hover,
//! context menu) on top, and produces `RowView`s that any rendering host can
//! draw, terminal or otherwise.

#![deny(missing_docs)]

pub mod context_menu;
pub mod flatten;
pub mod resize;
pub mod row;
pub mod sort;
pub mod table;
pub mod tree;
pub mod weight;
pub mod window;

// Reexport the types that most users need
pub use self::{
    flatten::{skip_direct_recursion, FlatRow, FlattenOptions, SkipPredicate, VirtualizedTree},
    sort::{make_comparator, SortConfig, SortDirection, SortError, SortKey},
    table::{FrameStackTable, Key, Modifiers},
    tree::{
        Frame, FrameFilter, FrameKey, FrameNode, FrameNodeId, FrameTree, FrameTreeBuilder,
        FrameTreeError, Weight,
    },
    weight::{relative_weight, WeightUnit},
    window::Viewport,
};
