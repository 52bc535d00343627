//! Interactive call tree exploration for folded stack profiles

#![deny(missing_docs)]

mod import;
mod ui;

use clap::Parser;
use frame_stack::{FrameFilter, SortDirection, SortKey, WeightUnit};
use regex::Regex;
use std::{io, path::PathBuf, process::ExitCode};

/// Explore a folded stack profile as a sortable, expandable call tree
#[derive(Parser, Debug)]
#[clap(author, version, about)]
pub struct CliArgs {
    /// Property used to sort sibling frames ("total weight", "self weight" or "name")
    #[clap(short, long, default_value = "total weight", value_parser = SortKey::parse)]
    sort: SortKey,

    /// Sort direction ("asc" or "desc")
    ///
    /// For names, "desc" means alphabetical order.
    #[clap(short, long, default_value = "desc", value_parser = SortDirection::parse)]
    direction: SortDirection,

    /// Display callers below their callees, starting from the hottest frames
    #[clap(short, long)]
    bottom_up: bool,

    /// Frames to be kept ("all", "application" or "system")
    #[clap(short, long, default_value = "all")]
    filter: FrameFilter,

    /// Regex matching the names of system frames
    #[clap(long)]
    system: Option<Regex>,

    /// Display directly recursive calls instead of collapsing them
    #[clap(short, long)]
    keep_recursion: bool,

    /// Meaning of the stack weights ("nanoseconds" or "samples")
    #[clap(short, long, default_value = "samples")]
    unit: WeightUnit,

    /// Maximal number of terminal columns to be used in the display
    #[clap(short = 'c', long = "cols", default_value = "200")]
    max_cols: u16,

    /// Print the call tree on stdout instead of starting the interactive UI
    #[clap(long)]
    no_tui: bool,

    /// Folded stack file to be analyzed (one "frame;frame;... weight" per line)
    input: PathBuf,
}

fn main() -> ExitCode {
    let args = CliArgs::parse();
    let result = if !args.no_tui && termion::is_tty(&io::stdout()) {
        ui::tui::run(args)
    } else {
        ui::stdio::run(args)
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Failed to load the profile: {e}");
            ExitCode::FAILURE
        }
    }
}
