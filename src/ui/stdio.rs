//! Non-interactive display of the call tree on stdout

use super::display::truncate_string;
use crate::{import::ImportError, CliArgs};
use frame_stack::{
    row::{FrameKind, RowLayout, RowView},
    FrameStackTable, Viewport,
};
use termtree::{GlyphPalette, Tree};
use unicode_width::UnicodeWidthStr;

/// Run the analysis using the stdio display
pub fn run(args: CliArgs) -> Result<(), ImportError> {
    env_logger::init();

    // Determine column budget
    let max_cols = termion::terminal_size()
        .map(|(width, _height)| width.min(args.max_cols))
        .unwrap_or(args.max_cols);

    // Load and flatten the profile, with every node expanded
    eprintln!("Processing input data...");
    let tree = super::load_tree(&args)?;
    let flat = super::flatten(tree.clone(), &args, true);
    let table = FrameStackTable::new(flat, RowLayout::default(), args.unit);

    // Display basic metadata
    print!("Profile with {} call tree nodes, ", tree.len());
    println!("{} in total", args.unit.format(tree.total_weight()));
    let sort = table.sort();
    println!("Sorted by {} ({})", sort.key, sort.direction);
    if table.is_empty() {
        println!("\nThe profile is empty");
        return Ok(());
    }

    // Display the call tree
    println!("\nCall tree:");
    let rows = table.visible_rows(&Viewport::covering(table.len()));
    for tree in call_trees(&rows, max_cols.into()) {
        println!("{tree}");
    }
    Ok(())
}

/// Glyphs used to draw the call tree
const PALETTE: GlyphPalette = GlyphPalette {
    middle_item: "├",
    last_item: "└",
    item_indent: "─",
    middle_skip: "│",
    last_skip: " ",
    skip_indent: " ",
};

/// Number of columns that each level of depth eats up
fn indent_cols() -> usize {
    PALETTE.middle_item.width() + PALETTE.item_indent.width()
}

/// Rebuild one termtree per root from depth-first rows
fn call_trees(rows: &[RowView], max_cols: usize) -> Vec<Tree<String>> {
    let mut finished = Vec::new();
    let mut stack = Vec::<(usize, Tree<String>)>::new();
    let pop_into_parent = |stack: &mut Vec<(usize, Tree<String>)>, finished: &mut Vec<_>| {
        let (_, tree) = stack.pop().expect("Should only be called on a non-empty stack");
        match stack.last_mut() {
            Some((_, parent)) => {
                parent.push(tree);
            }
            None => finished.push(tree),
        }
    };
    for row in rows {
        while stack.last().map_or(false, |(depth, _)| *depth >= row.depth) {
            pop_into_parent(&mut stack, &mut finished);
        }
        let cols = max_cols.saturating_sub(row.depth * indent_cols());
        let label = row_label(row, cols);
        stack.push((row.depth, Tree::new(label).with_glyphs(PALETTE)));
    }
    while !stack.is_empty() {
        pop_into_parent(&mut stack, &mut finished);
    }
    finished
}

/// Display a row, ideally with associated profiling information
fn row_label(row: &RowView, max_cols: usize) -> String {
    let trailer = format!(
        " [{}, {}, self {}]",
        row.total_weight.text,
        row.total_weight.percentage(),
        row.self_weight.text,
    );
    let glyph = match row.kind {
        FrameKind::Application => String::new(),
        FrameKind::System => format!("{} ", row.kind.glyph()),
    };
    let name_cols = max_cols.saturating_sub(trailer.width() + glyph.width());
    if name_cols == 0 {
        // Not enough space for both, try to display the name alone
        return truncate_string(&row.name, max_cols.max(1));
    }
    format!("{glyph}{}{trailer}", truncate_string(&row.name, name_cols))
}
