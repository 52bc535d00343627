//! Loading of profiles in the "folded stacks" format
//!
//! Each non-blank line holds a semicolon-separated call stack, listed from the
//! outermost caller, followed by whitespace and the weight spent in the
//! innermost frame, as in `main;parse;lex 42`. This is the format produced by
//! `stackcollapse-*` scripts, `perf script | inferno-collapse-perf`, `py-spy
//! record --format raw` and many others.

use frame_stack::{FrameTree, FrameTreeBuilder, FrameTreeError, Weight};
use nom::{
    bytes::complete::take_till1,
    character::complete::char,
    combinator::all_consuming,
    error::Error,
    multi::separated_list1,
    number::complete::double,
};
use regex::Regex;
use std::{fs, io, path::Path};
use thiserror::Error;

/// Result type returned by folded stack parsers
type IResult<'a, O> = nom::IResult<&'a str, O, Error<&'a str>>;

/// Import configuration
#[derive(Clone, Debug, Default)]
pub struct ImportOptions {
    /// Frames whose name matches this regex are system frames, other frames
    /// are application frames
    pub system: Option<Regex>,
}
//
impl ImportOptions {
    /// Truth that a frame belongs to the profiled application
    fn is_application(&self, name: &str) -> bool {
        self.system
            .as_ref()
            .map_or(true, |system| !system.is_match(name))
    }
}

/// Load a folded stack file
pub fn load_file(
    path: impl AsRef<Path>,
    options: &ImportOptions,
) -> Result<FrameTree, ImportError> {
    let path = path.as_ref();
    log::info!("Loading folded stacks from {}", path.display());
    let input = fs::read_to_string(path)?;
    parse_folded(&input, options)
}

/// Parse folded stacks
pub fn parse_folded(input: &str, options: &ImportOptions) -> Result<FrameTree, ImportError> {
    let mut builder = FrameTreeBuilder::new();
    let mut num_stacks = 0;
    for (idx, line) in input.lines().enumerate() {
        let line_number = idx + 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (stack, weight) = folded_line(line).ok_or_else(|| ImportError::Syntax {
            line: line_number,
            text: line.to_owned(),
        })?;
        let keys = stack
            .into_iter()
            .map(|name| {
                builder.intern_frame(name, options.is_application(name), color_key(name))
            })
            .collect::<Vec<_>>();
        builder
            .add_stack(keys, weight)
            .map_err(|source| ImportError::Stack {
                line: line_number,
                source,
            })?;
        num_stacks += 1;
    }
    let tree = builder.build();
    log::info!(
        "Loaded {num_stacks} stacks into a tree of {} nodes",
        tree.len()
    );
    Ok(tree)
}

/// Split a trimmed line into its call stack and weight
fn folded_line(line: &str) -> Option<(Vec<&str>, Weight)> {
    let (stack, weight) = line.rsplit_once(|c: char| c.is_whitespace())?;
    let (_, stack) = all_consuming(call_stack)(stack.trim_end()).ok()?;
    let (_, weight) = all_consuming(double::<&str, Error<&str>>)(weight).ok()?;
    Some((stack, weight))
}

/// Parser for semicolon-separated call stacks
///
/// Frame names may contain spaces, but not semicolons.
fn call_stack(s: &str) -> IResult<Vec<&str>> {
    separated_list1(char(';'), take_till1(|c: char| c == ';'))(s)
}

/// Module prefix of a frame name, used to give related frames the same color
fn color_key(name: &str) -> Option<&str> {
    // Leave out function arguments and template parameters, which may contain
    // unrelated paths
    let head = name
        .find(|c| c == '(' || c == '<')
        .map_or(name, |end| &name[..end]);
    head.rsplit_once("::")
        .map(|(module, _function)| module)
        .filter(|module| !module.is_empty())
}

/// What can go wrong while importing a profile
#[derive(Debug, Error)]
pub enum ImportError {
    /// Failed to read the input file
    #[error("failed to read input ({0})")]
    Io(#[from] io::Error),

    /// A line is not of the form `frame;frame;... weight`
    #[error("line {line} is not a folded stack: {text:?}")]
    Syntax {
        /// Line number, starting at 1
        line: usize,

        /// Contents of the line
        text: String,
    },

    /// A line's stack or weight was rejected
    #[error("line {line} holds an invalid stack ({source})")]
    Stack {
        /// Line number, starting at 1
        line: usize,

        /// Reason why the stack was rejected
        source: FrameTreeError,
    },
}
