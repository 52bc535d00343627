//! Scroll window math for virtualized row rendering
//!
//! This is library API for hosts that draw rows themselves, like a web page
//! or a canvas. Hosts that bring their own scrolling widget, like the
//! terminal UI's table view, only need `Viewport::covering()`.

use std::ops::Range;

/// Number of rows rendered above and below the viewport by default
pub const DEFAULT_OVERSCAN: usize = 10;

/// Visible region of a scrollable list of fixed-height rows
///
/// All quantities are expressed in the host's length unit (pixels for a web
/// page, terminal lines for a TUI...).
///
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Viewport {
    /// Offset of the top of the viewport from the top of the content
    pub scroll_top: usize,

    /// Height of the viewport
    pub height: usize,

    /// Height of one row
    pub row_height: usize,

    /// Number of extra rows to be rendered above and below the viewport, so
    /// that small scrolls do not expose unrendered rows
    pub overscan: usize,
}
//
impl Viewport {
    /// Viewport at the top of the content, with default overscan
    pub fn new(height: usize, row_height: usize) -> Self {
        Self {
            scroll_top: 0,
            height,
            row_height,
            overscan: DEFAULT_OVERSCAN,
        }
    }

    /// Viewport that shows every row of a list at once
    pub fn covering(row_count: usize) -> Self {
        Self {
            scroll_top: 0,
            height: row_count,
            row_height: 1,
            overscan: 0,
        }
    }

    /// Total height of a list of rows
    pub fn content_height(&self, row_count: usize) -> usize {
        row_count * self.row_height
    }

    /// Range of rows that should be rendered
    pub fn visible_range(&self, row_count: usize) -> Range<usize> {
        if self.row_height == 0 {
            return 0..0;
        }
        let first = self.scroll_top / self.row_height;
        let last = (self.scroll_top + self.height).div_ceil(self.row_height);
        let end = last.saturating_add(self.overscan).min(row_count);
        let start = first.saturating_sub(self.overscan).min(end);
        start..end
    }

    /// Row found at some offset from the top of the viewport, if any
    pub fn row_at(&self, offset: usize, row_count: usize) -> Option<usize> {
        if self.row_height == 0 || offset >= self.height {
            return None;
        }
        let row = (self.scroll_top + offset) / self.row_height;
        (row < row_count).then_some(row)
    }

    /// Smallest scroll position change that makes a row fully visible
    pub fn scroll_to_row(&self, row: usize) -> usize {
        let row_top = row * self.row_height;
        let row_bottom = row_top + self.row_height;
        if row_top < self.scroll_top {
            row_top
        } else if row_bottom > self.scroll_top + self.height {
            row_bottom.saturating_sub(self.height)
        } else {
            self.scroll_top
        }
    }

    /// Scroll position clamped to the extent of a list of rows
    pub fn clamped_scroll_top(&self, row_count: usize) -> usize {
        let max_scroll = self.content_height(row_count).saturating_sub(self.height);
        self.scroll_top.min(max_scroll)
    }
}
