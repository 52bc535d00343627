//! Interactive frame stack table

use super::{with_state, State, WeightDisplay};
use crate::ui::display::truncate_string;
use cursive::{
    event::Key,
    theme::PaletteColor::{Highlight, Primary},
    traits::Scrollable,
    view::{Nameable, Position, Resizable, SizeConstraint, View},
    views::{LinearLayout, OnEventView, Panel, ResizedView, SelectView, TextView, ThemedView},
    Cursive,
};
use cursive_table_view::{TableView, TableViewItem};
use frame_stack::{
    context_menu::{CanvasMessage, CanvasSink, MenuItem, Point, Rect, Size, ZoomMode},
    row::{FrameKind, RowView, WeightCell},
    table::{Key as TableKey, Modifiers},
    FrameTree, SortConfig, SortDirection, SortKey, Viewport,
};
use std::{cmp::Ordering, fmt::Write};
use unicode_width::UnicodeWidthStr;

/// Name of the frame table view
const TABLE_NAME: &str = "<frame table>";

/// Name of the frame description text
const DESCRIPTION_NAME: &str = "<frame description>";

/// Name of the resizable drawer around the frame description
const DRAWER_NAME: &str = "<frame drawer>";

/// Name of the context menu layer
const MENU_NAME: &str = "<frame context menu>";

/// Width of weight columns
const WEIGHT_WIDTH: usize = 13;

/// Display the frame stack table
pub fn show_profile(cursive: &mut Cursive, terminal_width: u16) {
    // Columns other than the frame name eat up the weight columns, column
    // separators and the scrollbar.
    let name_width = usize::from(terminal_width).saturating_sub(2 * WEIGHT_WIDTH + 8);

    // Update the TUI state and load required data from it
    let (sort, items, footer_str, drawer_height) = with_state(cursive, |state| {
        state.name_width = name_width;
        if !state.table.is_empty() {
            state.table.on_row_click(0);
        }
        let tree = state.table.flat().tree();
        let footer = format!(
            "{} call tree nodes, {} in total.",
            tree.len(),
            state.table.unit().format(tree.total_weight())
        );
        let sort = state.table.sort();
        let (_, order) = header_order(sort);
        (sort, make_items(state, order), footer, state.drawer.size())
    });

    // Set up the views
    let table = make_table_view(sort, items, name_width);
    let drawer = make_drawer_view(cursive, terminal_width, drawer_height);
    let footer = make_footer_view(terminal_width, footer_str);

    // Show the profile
    cursive.add_fullscreen_layer(
        LinearLayout::vertical()
            .child(table.full_screen())
            .child(drawer)
            .child(footer.full_width()),
    );

    // Initialize the description
    update_description(cursive);
}

/// Switch between percentages and raw weights
pub fn switch_weight_display(cursive: &mut Cursive) {
    with_state(cursive, |state| {
        state.weight_display = state.weight_display.switched();
        log::debug!("Switched to {:?} weight display", state.weight_display);
    });
    refresh(cursive);
}

/// Grow or shrink the frame description drawer
///
/// Rapid key repeats are coalesced into a single resize.
pub fn resize_drawer(cursive: &mut Cursive, delta: f64) {
    let must_schedule = with_state(cursive, |state| state.drawer.drag_by(delta));
    if must_schedule {
        cursive
            .cb_sink()
            .send(Box::new(apply_drawer_resize))
            .expect("The TUI event loop should be running");
    }
}

/// Apply the pending drawer resize
fn apply_drawer_resize(cursive: &mut Cursive) {
    let height = with_state(cursive, |state| {
        let height = state.drawer.tick();
        state.drawer.end_drag();
        height
    });
    if let Some(height) = height {
        cursive
            .call_on_name(DRAWER_NAME, |view: &mut DrawerView| {
                view.set_height(SizeConstraint::Fixed(height.round() as usize))
            })
            .expect("Failed to access frame description drawer");
    }
}

/// Set up the tabular view that is the heart of the profile
fn make_table_view(sort: SortConfig, items: Vec<FrameItem>, name_width: usize) -> impl View {
    let (column, order) = header_order(sort);
    let mut table = FrameView::new()
        .column(FrameColumn::TotalWeight, "Total", |c| {
            c.width(WEIGHT_WIDTH).ordering(Ordering::Greater)
        })
        .column(FrameColumn::SelfWeight, "Self", |c| {
            c.width(WEIGHT_WIDTH).ordering(Ordering::Greater)
        })
        .column(FrameColumn::Name, "Frame", |c| {
            c.width(name_width).ordering(Ordering::Less)
        })
        .on_sort(sort_frames)
        .on_select(select_frame)
        .on_submit(toggle_frame);
    table.set_default_column(column);
    table.sort_by(column, order);
    table.set_items(items);
    if !table.is_empty() {
        table.set_selected_row(0);
    }

    // Let Left/Right, E and M reach the frame stack controller
    OnEventView::new(table.with_name(TABLE_NAME))
        .on_event(Key::Left, |cursive| navigate(cursive, TableKey::Left))
        .on_event(Key::Right, |cursive| navigate(cursive, TableKey::Right))
        .on_event('e', toggle_subtree)
        .on_event('m', show_context_menu)
}

/// Construct the drawer used to describe the selected frame
fn make_drawer_view(cursive: &mut Cursive, terminal_width: u16, height: f64) -> impl View {
    // Style the description like the frame selector to improve the visual
    // association between them
    let mut description_theme = cursive.current_theme().clone();
    description_theme.palette[Primary] = description_theme.palette[Highlight];

    // Prepare visual separation between the table and frame description
    let separator = TextView::new(
        ("─┤".chars())
            .chain("Selected frame".chars())
            .chain(std::iter::once('├'))
            .chain(std::iter::repeat('─').take(terminal_width.into()))
            .collect::<String>(),
    )
    .no_wrap();

    // Set up the description view
    let description = TextView::new("")
        .with_name(DESCRIPTION_NAME)
        .scrollable();
    ThemedView::new(
        description_theme,
        LinearLayout::vertical()
            .child(separator.full_width())
            .child(description.full_screen()),
    )
    .fixed_height(height.round() as usize)
    .with_name(DRAWER_NAME)
}

/// Type of the frame description drawer
type DrawerView = ResizedView<ThemedView<LinearLayout>>;

/// Construct the cursive view used to display profile-wide metadata & help text
fn make_footer_view(terminal_width: u16, mut footer_str: String) -> impl View {
    const HELP_TEXT: &str = "Press H for help.";
    if footer_str.width() + 1 + HELP_TEXT.width() <= usize::from(terminal_width) {
        footer_str.push(' ');
    } else {
        footer_str.push('\n');
    }
    footer_str.push_str(HELP_TEXT);
    TextView::new(footer_str).center().no_wrap()
}

/// Reload the table's rows from the frame stack controller
fn refresh(cursive: &mut Cursive) {
    let (column, order, items, selected) = with_state(cursive, |state| {
        let (column, order) = header_order(state.table.sort());
        (
            column,
            order,
            make_items(state, order),
            state.table.focused_row(),
        )
    });
    cursive
        .call_on_name(TABLE_NAME, |view: &mut FrameView| {
            view.sort_by(column, order);
            view.set_items(items);
            if let Some(row) = selected {
                view.set_selected_row(row);
            }
        })
        .expect("Failed to access frame table");
    update_description(cursive);
}

/// on_select callback that moves the keyboard focus
fn select_frame(cursive: &mut Cursive, row: usize, _index: usize) {
    with_state(cursive, |state| state.table.on_row_click(row));
    update_description(cursive);
}

/// on_submit callback that expands or collapses a frame
fn toggle_frame(cursive: &mut Cursive, row: usize, _index: usize) {
    let changed =
        with_state(cursive, |state| state.table.on_expand_click(row, Modifiers::default()));
    if changed {
        refresh(cursive);
    }
}

/// Expand or collapse the selected frame's whole subtree
fn toggle_subtree(cursive: &mut Cursive) {
    let changed = with_state(cursive, |state| {
        let Some(row) = state.table.focused_row() else {
            return false;
        };
        let modifiers = Modifiers {
            ctrl: true,
            ..Default::default()
        };
        state.table.on_expand_click(row, modifiers)
    });
    if changed {
        refresh(cursive);
    }
}

/// Forward a navigation key to the frame stack controller
fn navigate(cursive: &mut Cursive, key: TableKey) {
    let handled = with_state(cursive, |state| {
        state.table.on_key_down(key, Modifiers::default())
    });
    if handled {
        refresh(cursive);
    }
}

/// on_sort callback that applies the clicked header to the controller
fn sort_frames(cursive: &mut Cursive, column: FrameColumn, _order: Ordering) {
    let sort = with_state(cursive, |state| state.table.on_sort_click(column.sort_key()));
    log::info!("Sorting frames by {} ({})", sort.key, sort.direction);
    refresh(cursive);
}

/// Open the context menu of the selected frame
fn show_context_menu(cursive: &mut Cursive) {
    let screen = cursive.screen_size();
    let container = Rect {
        origin: Point::default(),
        size: Size {
            width: screen.x as f64,
            height: screen.y as f64,
        },
    };
    let label_width = MenuItem::ALL
        .iter()
        .map(|item| item.label().width())
        .max()
        .unwrap_or(0);
    let menu_size = Size {
        width: (label_width + 4) as f64,
        height: (MenuItem::ALL.len() + 2) as f64,
    };

    // Anchor the menu at the start of the selected frame's name
    let position = with_state(cursive, |state| {
        let row = state.table.focused_row();
        let indentation = row
            .and_then(|row| state.table.row_view(row))
            .map_or(0, |view| view.indentation);
        let click = Point {
            x: (2 * (WEIGHT_WIDTH + 1) + indentation) as f64,
            y: (screen.y / 2) as f64,
        };
        state.table.on_context_menu(row, click, container, menu_size)
    });

    let mut select = SelectView::new();
    for item in MenuItem::ALL {
        select.add_item(item.label(), item);
    }
    select.set_on_submit(select_menu_item);
    cursive.screen_mut().add_layer_at(
        Position::absolute((position.x as usize, position.y as usize)),
        Panel::new(select).title("Frame").with_name(MENU_NAME),
    );
}

/// Truth that the context menu is on screen
pub fn context_menu_shown(cursive: &mut Cursive) -> bool {
    cursive
        .screen_mut()
        .find_layer_from_name(MENU_NAME)
        .is_some()
}

/// on_submit callback of the context menu
fn select_menu_item(cursive: &mut Cursive, item: &MenuItem) {
    cursive.pop_layer();
    with_state(cursive, |state| {
        let tree = state.table.flat().tree().clone();
        let mut reporter = ZoomReporter {
            tree: &tree,
            report: &mut state.zoom_report,
        };
        state.table.on_menu_select(*item, &mut reporter);
    });
    update_description(cursive);
}

/// Stand-in for a flamegraph canvas that reports zoom requests in the frame
/// description
struct ZoomReporter<'state> {
    /// Frame tree that zoom requests refer to
    tree: &'state FrameTree,

    /// Latest zoom request
    report: &'state mut Option<String>,
}
//
impl CanvasSink for ZoomReporter<'_> {
    fn dispatch(&mut self, message: CanvasMessage) {
        let CanvasMessage::ZoomIntoFrame { node, mode } = message;
        let name = self.tree.node(node).frame().name();
        let report = match mode {
            ZoomMode::Exact => format!("Flamegraph zoom requested on {name}"),
            ZoomMode::Similar => format!("Flamegraph zoom requested on every {name} frame"),
        };
        log::info!("{report}");
        *self.report = Some(report);
    }
}

/// Update the description of the selected frame
fn update_description(cursive: &mut Cursive) {
    let description = with_state(cursive, |state| describe_focus(state));
    cursive
        .call_on_name(DESCRIPTION_NAME, |view: &mut TextView| {
            view.set_content(description)
        })
        .expect("Failed to access frame description");
}

/// Describe the selected frame
fn describe_focus(state: &State) -> String {
    let mut text = String::new();
    match state
        .table
        .focused_row()
        .and_then(|row| state.table.row_view(row))
    {
        Some(row) => {
            let weight = |cell: &WeightCell| format!("{} ({})", cell.text, cell.percentage());
            let kind = match row.kind {
                FrameKind::Application => "application",
                FrameKind::System => "system",
            };
            writeln!(text, "{}", row.name).expect("Write to String can't fail");
            writeln!(
                text,
                "Total: {}, self: {}",
                weight(&row.total_weight),
                weight(&row.self_weight)
            )
            .expect("Write to String can't fail");
            write!(text, "{kind} frame at depth {}", row.depth)
                .expect("Write to String can't fail");
            if let Some(module) = &row.color_key {
                write!(text, " in {module}").expect("Write to String can't fail");
            }
        }
        None => text.push_str("No frame selected"),
    }
    if let Some(report) = &state.zoom_report {
        write!(text, "\n{report}").expect("Write to String can't fail");
    }
    text
}

/// Generate the table rows
///
/// Rows get ranked so that sorting them in the header's order reproduces the
/// row order of the frame stack controller.
fn make_items(state: &State, order: Ordering) -> Vec<FrameItem> {
    let rows = state
        .table
        .visible_rows(&Viewport::covering(state.table.len()));
    let num_rows = rows.len();
    rows.iter()
        .map(|row| FrameItem {
            rank: match order {
                Ordering::Greater => num_rows - 1 - row.index,
                Ordering::Less | Ordering::Equal => row.index,
            },
            total_weight: weight_text(&row.total_weight, state.weight_display),
            self_weight: weight_text(&row.self_weight, state.weight_display),
            name: name_text(row, state.name_width),
        })
        .collect()
}

/// Display a weight column cell
fn weight_text(cell: &WeightCell, display: WeightDisplay) -> String {
    match display {
        WeightDisplay::Percentage => cell.percentage(),
        WeightDisplay::Value => cell.text.clone(),
    }
}

/// Display a frame name column cell, with indentation and markers
fn name_text(row: &RowView, max_cols: usize) -> String {
    let mut text = " ".repeat(row.indentation);
    text.push(row.expansion_marker());
    if row.kind == FrameKind::System {
        text.push(row.kind.glyph());
    }
    text.push(' ');
    let name_cols = max_cols.saturating_sub(text.width()).max(1);
    text.push_str(&truncate_string(&row.name, name_cols));
    text
}

/// Column and header ordering that reflect a sorting configuration
///
/// Names are listed alphabetically by the descending direction, which the
/// header shows as an ascending arrow.
fn header_order(sort: SortConfig) -> (FrameColumn, Ordering) {
    let ascending = match sort.key {
        SortKey::Name => sort.direction == SortDirection::Descending,
        SortKey::TotalWeight | SortKey::SelfWeight => sort.direction == SortDirection::Ascending,
    };
    let order = if ascending {
        Ordering::Less
    } else {
        Ordering::Greater
    };
    (FrameColumn::from_sort_key(sort.key), order)
}

/// Frame table column
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
enum FrameColumn {
    /// Weight including callees
    TotalWeight,

    /// Weight excluding callees
    SelfWeight,

    /// Frame name
    Name,
}
//
impl FrameColumn {
    /// Column associated with a sort property
    fn from_sort_key(key: SortKey) -> Self {
        match key {
            SortKey::TotalWeight => Self::TotalWeight,
            SortKey::SelfWeight => Self::SelfWeight,
            SortKey::Name => Self::Name,
        }
    }

    /// Sort property associated with this column
    fn sort_key(self) -> SortKey {
        match self {
            Self::TotalWeight => SortKey::TotalWeight,
            Self::SelfWeight => SortKey::SelfWeight,
            Self::Name => SortKey::Name,
        }
    }
}

/// Row of the frame table
#[derive(Clone, Debug)]
struct FrameItem {
    /// Position of this row when sorting in ascending order
    rank: usize,

    /// Total weight cell
    total_weight: String,

    /// Self weight cell
    self_weight: String,

    /// Frame name cell
    name: String,
}
//
impl TableViewItem<FrameColumn> for FrameItem {
    fn to_column(&self, column: FrameColumn) -> String {
        match column {
            FrameColumn::TotalWeight => self.total_weight.clone(),
            FrameColumn::SelfWeight => self.self_weight.clone(),
            FrameColumn::Name => self.name.clone(),
        }
    }

    fn cmp(&self, other: &Self, _column: FrameColumn) -> Ordering
    where
        Self: Sized,
    {
        self.rank.cmp(&other.rank)
    }
}

/// TableView using the setup above
type FrameView = TableView<FrameItem, FrameColumn>;
