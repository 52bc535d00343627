//! User interface module

mod display;
pub mod stdio;
pub mod tui;

use crate::{
    import::{self, ImportError, ImportOptions},
    CliArgs,
};
use frame_stack::{
    skip_direct_recursion, FlattenOptions, FrameFilter, FrameTree, SortConfig, VirtualizedTree,
};
use std::rc::Rc;

/// Load the profile and turn it into the frame tree that should be displayed
fn load_tree(args: &CliArgs) -> Result<Rc<FrameTree>, ImportError> {
    let options = ImportOptions {
        system: args.system.clone(),
    };
    let mut tree = import::load_file(&args.input, &options)?;
    if args.filter != FrameFilter::All {
        log::info!("Keeping {} frames only", args.filter);
        tree = tree.filtered(args.filter);
    }
    if args.bottom_up {
        log::info!("Inverting the call tree");
        tree = tree.inverted();
    }
    Ok(Rc::new(tree))
}

/// Flatten every root of the frame tree as configured on the command line
fn flatten(tree: Rc<FrameTree>, args: &CliArgs, expanded: bool) -> VirtualizedTree {
    let options = FlattenOptions {
        sort: SortConfig::new(args.sort, args.direction),
        skip: (!args.keep_recursion).then(skip_direct_recursion),
        expanded,
    };
    let roots = tree.root_ids().to_vec();
    VirtualizedTree::new(tree, Some(&roots), options)
}
