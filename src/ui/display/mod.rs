//! Generic utilities to display things

use std::io;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Truncate a string so that it only eats up n columns, by eating up the middle
///
/// Frame names tend to carry their most useful information at both ends (the
/// module they come from and the function name), so the middle goes first.
/// Assumes absence of line feeds in the input string.
///
pub fn display_string(mut output: impl io::Write, input: &str, max_cols: usize) -> io::Result<()> {
    if input.width() <= max_cols {
        return write!(output, "{input}");
    }
    if max_cols == 0 {
        return Ok(());
    }
    debug_assert!(input.chars().all(|c| c != '\r' && c != '\n'));

    // Find a header that takes up at most half of the budget
    let max_header_cols = (max_cols - 1) / 2;
    let mut header_cols = 0;
    let mut header_end = 0;
    for (offset, grapheme) in input.grapheme_indices(true) {
        let new_header_cols = header_cols + grapheme.width();
        if new_header_cols > max_header_cols {
            break;
        }
        header_cols = new_header_cols;
        header_end = offset + grapheme.len();
    }
    write!(output, "{}…", &input[..header_end])?;

    // Fill the rest with a trailer
    let max_trailer_cols = max_cols - 1 - header_cols;
    let mut trailer_cols = 0;
    let mut trailer_start = input.len();
    for (offset, grapheme) in input.grapheme_indices(true).rev() {
        let new_trailer_cols = trailer_cols + grapheme.width();
        if new_trailer_cols > max_trailer_cols {
            break;
        }
        trailer_cols = new_trailer_cols;
        trailer_start = offset;
    }
    write!(output, "{}", &input[trailer_start..])
}

/// Truncated string as an owned String
pub fn truncate_string(input: &str, max_cols: usize) -> String {
    let mut buffer = Vec::<u8>::new();
    display_string(&mut buffer, input, max_cols).expect("Writing to a buffer shouldn't fail");
    String::from_utf8(buffer).expect("Truncation should preserve UTF-8 validity")
}
