//! Interactive frame stack table
//!
//! This ties the flattened tree, the row binding and the context menu
//! together, and translates the input events of a rendering host into state
//! changes. Every handler runs synchronously to completion, in the order the
//! events are received.

use crate::{
    context_menu::{CanvasMessage, CanvasSink, ContextMenu, MenuItem, Point, Rect, Size},
    flatten::VirtualizedTree,
    row::{RowBinding, RowLayout, RowState, RowView},
    sort::{SortConfig, SortKey},
    tree::{FrameNodeId, FrameTree, Weight},
    weight::WeightUnit,
    window::Viewport,
};
use std::rc::Rc;

/// Modifier keys held during a click or key press
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Modifiers {
    /// Meta/Cmd key
    pub meta: bool,

    /// Control key
    pub ctrl: bool,
}
//
impl Modifiers {
    /// Truth that expansion changes should apply to a whole subtree
    pub fn expands_children(self) -> bool {
        self.meta || self.ctrl
    }
}

/// Keyboard keys that the table reacts to
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum Key {
    /// Focus the previous row
    Up,

    /// Focus the next row
    Down,

    /// Collapse the focused row, or focus its parent
    Left,

    /// Expand the focused row, or focus its first child
    Right,

    /// Toggle expansion of the focused row
    Enter,

    /// Focus the first row
    Home,

    /// Focus the last row
    End,
}

/// Frame stack table state
#[derive(Debug)]
pub struct FrameStackTable {
    /// Flattened frame tree
    flat: VirtualizedTree,

    /// Node that percentages are computed against, if not the whole tree
    reference: Option<FrameNodeId>,

    /// Row content configuration
    layout: RowLayout,

    /// Unit of the weights
    unit: WeightUnit,

    /// Node that has keyboard focus
    focused: Option<FrameNodeId>,

    /// Node under the mouse cursor
    hovered: Option<FrameNodeId>,

    /// Context menu
    menu: ContextMenu,
}
//
impl FrameStackTable {
    /// Set up a table around a flattened frame tree
    pub fn new(flat: VirtualizedTree, layout: RowLayout, unit: WeightUnit) -> Self {
        Self {
            flat,
            reference: None,
            layout,
            unit,
            focused: None,
            hovered: None,
            menu: ContextMenu::new(),
        }
    }

    /// Flattened frame tree
    pub fn flat(&self) -> &VirtualizedTree {
        &self.flat
    }

    /// Number of visible rows
    pub fn len(&self) -> usize {
        self.flat.len()
    }

    /// Truth that there is no visible row
    pub fn is_empty(&self) -> bool {
        self.flat.is_empty()
    }

    /// Display a different set of roots
    ///
    /// This resets expansion, focus, hover and the context menu.
    pub fn set_roots(&mut self, roots: Option<&[FrameNodeId]>) {
        self.flat.set_roots(roots);
        self.reset_interaction();
    }

    /// Display a different frame tree
    ///
    /// This resets expansion, focus, hover, the context menu and the reference
    /// node, which belonged to the previous tree.
    pub fn set_tree(&mut self, tree: Rc<FrameTree>, roots: Option<&[FrameNodeId]>) {
        self.flat.set_tree(tree, roots);
        self.reference = None;
        self.reset_interaction();
    }

    /// Select the node that percentages are computed against
    ///
    /// By default, percentages are computed against the sum of the total
    /// weights of the tree's roots.
    pub fn set_reference(&mut self, reference: Option<FrameNodeId>) {
        self.reference = reference;
    }

    /// Weight that percentages are computed against
    pub fn reference_total(&self) -> Weight {
        let tree = self.flat.tree();
        match self.reference {
            Some(node) => tree.node(node).total_weight(),
            None => tree.total_weight(),
        }
    }

    /// Unit of the weights
    pub fn unit(&self) -> WeightUnit {
        self.unit
    }

    /// Switch to a different weight unit
    pub fn set_unit(&mut self, unit: WeightUnit) {
        self.unit = unit;
    }

    /// Current sorting configuration
    pub fn sort(&self) -> SortConfig {
        self.flat.sort()
    }

    /// Handle a click on a column header
    pub fn on_sort_click(&mut self, key: SortKey) -> SortConfig {
        let sort = self.flat.sort().clicked(key);
        self.flat.set_sort(sort);
        sort
    }

    /// Row that has keyboard focus, if any
    pub fn focused_row(&self) -> Option<usize> {
        self.focused.and_then(|node| self.flat.find_row(node))
    }

    /// Row under the mouse cursor, if any
    pub fn hovered_row(&self) -> Option<usize> {
        self.hovered.and_then(|node| self.flat.find_row(node))
    }

    /// Handle a click on a row, which gives it keyboard focus
    pub fn on_row_click(&mut self, row: usize) -> bool {
        self.focus(row)
    }

    /// Handle a click on the expansion affordance of a row
    pub fn on_expand_click(&mut self, row: usize, modifiers: Modifiers) -> bool {
        if !self.focus(row) {
            return false;
        }
        self.flat
            .toggle_expanded(row, modifiers.expands_children())
    }

    /// Handle the mouse cursor entering a row, or leaving the rows
    pub fn on_mouse_enter(&mut self, row: Option<usize>) {
        self.hovered = row.and_then(|row| self.node_at(row));
    }

    /// Handle a key press, returns the truth that the key was handled
    pub fn on_key_down(&mut self, key: Key, modifiers: Modifiers) -> bool {
        if self.flat.is_empty() {
            return false;
        }
        let last = self.flat.len() - 1;
        let Some(focused) = self.focused_row() else {
            // Without focus, any navigation key focuses the first row
            return self.focus(if key == Key::End { last } else { 0 });
        };
        let expand_children = modifiers.expands_children();
        match key {
            Key::Up => self.focus(focused.saturating_sub(1)),
            Key::Down => self.focus((focused + 1).min(last)),
            Key::Home => self.focus(0),
            Key::End => self.focus(last),
            Key::Enter => self.flat.toggle_expanded(focused, expand_children),
            Key::Right => {
                let row = self.flat.row(focused).expect("Focused row should exist");
                if !row.expandable {
                    false
                } else if !row.expanded {
                    self.flat.set_expanded(focused, true, expand_children)
                } else {
                    self.focus(focused + 1)
                }
            }
            Key::Left => {
                let row = self.flat.row(focused).expect("Focused row should exist");
                if row.expanded {
                    self.flat.set_expanded(focused, false, expand_children)
                } else if let Some(parent) = self.flat.parent_row(focused) {
                    self.focus(parent)
                } else {
                    false
                }
            }
        }
    }

    /// Handle a right click on a row, or on the table background
    ///
    /// Right-clicking a row also gives it keyboard focus. Returns the position
    /// of the menu relative to the container.
    pub fn on_context_menu(
        &mut self,
        row: Option<usize>,
        click: Point,
        container: Rect,
        menu_size: Size,
    ) -> Point {
        let target = row.and_then(|row| self.node_at(row));
        if let Some(row) = row {
            self.focus(row);
        }
        self.menu.open(click, container, menu_size, target)
    }

    /// Handle a click outside of the open context menu
    pub fn on_overlay_click(&mut self) {
        self.menu.close();
    }

    /// Handle the selection of a context menu entry
    pub fn on_menu_select(
        &mut self,
        item: MenuItem,
        sink: &mut impl CanvasSink,
    ) -> Option<CanvasMessage> {
        let message = self.menu.select(item, sink);
        if let Some(message) = message {
            log::debug!("Dispatched {message:?} to the canvas");
        }
        message
    }

    /// Context menu state
    pub fn context_menu(&self) -> &ContextMenu {
        &self.menu
    }

    /// Content of a single row
    pub fn row_view(&self, row: usize) -> Option<RowView> {
        let binding = self.binding();
        self.flat
            .row(row)
            .map(|row| binding.bind(&row, self.row_state(row.node.id())))
    }

    /// Content of the rows that should be rendered for a certain viewport
    pub fn visible_rows(&self, viewport: &Viewport) -> Vec<RowView> {
        let binding = self.binding();
        self.flat
            .rows_in(viewport.visible_range(self.flat.len()))
            .map(|row| binding.bind(&row, self.row_state(row.node.id())))
            .collect()
    }

    /// Current row binding configuration
    fn binding(&self) -> RowBinding {
        RowBinding {
            layout: self.layout,
            unit: self.unit,
            reference_total: self.reference_total(),
        }
    }

    /// Interaction state of the row displaying a node
    fn row_state(&self, node: FrameNodeId) -> RowState {
        RowState {
            focused: self.focused == Some(node),
            hovered: self.hovered == Some(node),
        }
    }

    /// Frame tree node displayed by a row
    fn node_at(&self, row: usize) -> Option<FrameNodeId> {
        self.flat.row(row).map(|row| row.node.id())
    }

    /// Give keyboard focus to a row, returns the truth that the row exists
    fn focus(&mut self, row: usize) -> bool {
        match self.node_at(row) {
            Some(node) => {
                self.focused = Some(node);
                true
            }
            None => false,
        }
    }

    /// Forget about interactions with the previous set of rows
    fn reset_interaction(&mut self) {
        self.focused = None;
        self.hovered = None;
        self.menu.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        context_menu::{ContextMenuState, ZoomMode},
        flatten::{skip_direct_recursion, FlattenOptions},
        sort::SortDirection,
        tree::tests::tree_from_stacks,
    };
    use pretty_assertions::assert_eq;

    fn scenario_table() -> FrameStackTable {
        let tree = Rc::new(tree_from_stacks(&[
            ("Root", 10.0),
            ("Root;B", 10.0),
            ("Root;B;b", 20.0),
            ("Root;A", 30.0),
            ("Root;A;a", 30.0),
            ("Root;A;a;a", 5.0),
        ]));
        let roots = tree.root_ids().to_vec();
        let flat = VirtualizedTree::new(
            tree,
            Some(&roots),
            FlattenOptions {
                skip: Some(skip_direct_recursion()),
                ..Default::default()
            },
        );
        FrameStackTable::new(flat, RowLayout::default(), WeightUnit::Samples)
    }

    fn names(table: &FrameStackTable) -> Vec<String> {
        table
            .visible_rows(&Viewport::covering(table.len()))
            .into_iter()
            .map(|row| row.name)
            .collect()
    }

    #[test]
    fn clicks() {
        let mut table = scenario_table();
        assert_eq!(names(&table), ["Root"]);
        assert_eq!(table.focused_row(), None);

        assert!(table.on_expand_click(0, Modifiers::default()));
        assert_eq!(names(&table), ["Root", "A", "B"]);
        assert_eq!(table.focused_row(), Some(0));

        assert!(table.on_row_click(2));
        assert_eq!(table.focused_row(), Some(2));
        assert!(!table.on_row_click(3));

        // Subtree collapse, then subtree expansion
        let meta = Modifiers {
            meta: true,
            ..Default::default()
        };
        assert!(table.on_expand_click(0, meta));
        assert_eq!(names(&table), ["Root"]);
        assert!(table.on_expand_click(0, meta));
        assert_eq!(names(&table), ["Root", "A", "a", "B", "b"]);

        // Sort header clicks
        assert_eq!(
            table.on_sort_click(SortKey::Name),
            SortConfig::new(SortKey::Name, SortDirection::Descending)
        );
        assert_eq!(names(&table), ["Root", "A", "a", "B", "b"]);
        table.on_sort_click(SortKey::Name);
        assert_eq!(names(&table), ["Root", "B", "b", "A", "a"]);
        assert_eq!(table.sort().direction, SortDirection::Ascending);
    }

    #[test]
    fn keyboard() {
        let mut table = scenario_table();
        let none = Modifiers::default();
        assert!(table.on_key_down(Key::Down, none));
        assert_eq!(table.focused_row(), Some(0));

        assert!(table.on_key_down(Key::Right, none));
        assert_eq!(names(&table), ["Root", "A", "B"]);
        assert!(table.on_key_down(Key::Right, none));
        assert_eq!(table.focused_row(), Some(1));
        assert!(table.on_key_down(Key::Enter, none));
        assert_eq!(names(&table), ["Root", "A", "a", "B"]);
        assert!(table.on_key_down(Key::End, none));
        assert_eq!(table.focused_row(), Some(3));
        assert!(table.on_key_down(Key::Down, none));
        assert_eq!(table.focused_row(), Some(3));

        // The recursive "a" is hidden, so "a" cannot be expanded
        assert!(table.on_key_down(Key::Up, none));
        assert_eq!(table.focused_row(), Some(2));
        assert!(!table.on_key_down(Key::Right, none));

        assert!(table.on_key_down(Key::Left, none));
        assert_eq!(table.focused_row(), Some(1));
        assert!(table.on_key_down(Key::Left, none));
        assert_eq!(names(&table), ["Root", "A", "B"]);
        assert!(table.on_key_down(Key::Left, none));
        assert_eq!(table.focused_row(), Some(0));
        assert!(table.on_key_down(Key::Home, none));
        assert_eq!(table.focused_row(), Some(0));
        assert!(table.on_key_down(Key::Left, none));
        assert_eq!(names(&table), ["Root"]);
        assert!(!table.on_key_down(Key::Left, none));
    }

    #[test]
    fn context_menu() {
        let mut table = scenario_table();
        table.on_expand_click(0, Modifiers::default());
        let container = Rect {
            origin: Point::default(),
            size: Size {
                width: 200.0,
                height: 100.0,
            },
        };
        let menu_size = Size {
            width: 80.0,
            height: 50.0,
        };
        let position =
            table.on_context_menu(Some(1), Point { x: 50.0, y: 60.0 }, container, menu_size);
        assert_eq!(position, Point { x: 50.0, y: 50.0 });
        assert_eq!(table.focused_row(), Some(1));
        let a = table.row_view(1).unwrap().node;
        assert_eq!(table.context_menu().target(), Some(a));

        table.on_overlay_click();
        assert_eq!(table.context_menu().state(), ContextMenuState::Closed);
        assert_eq!(table.context_menu().target(), None);

        let mut sink = Vec::<CanvasMessage>::new();
        table.on_context_menu(Some(1), Point::default(), container, menu_size);
        assert_eq!(
            table.on_menu_select(MenuItem::ZoomIntoFrame(ZoomMode::Exact), &mut sink),
            Some(CanvasMessage::ZoomIntoFrame {
                node: a,
                mode: ZoomMode::Exact
            })
        );
        assert_eq!(sink.len(), 1);

        // Background clicks open an untargeted menu
        table.on_context_menu(None, Point::default(), container, menu_size);
        assert!(table.context_menu().is_open());
        assert_eq!(table.context_menu().target(), None);
        table.set_roots(None);
        assert!(!table.context_menu().is_open());
        assert!(table.is_empty());
    }

    #[test]
    fn rows_and_reference() {
        let mut table = scenario_table();
        table.on_expand_click(0, Modifiers::default());
        table.on_mouse_enter(Some(2));
        assert_eq!(table.hovered_row(), Some(2));

        let rows = table.visible_rows(&Viewport {
            scroll_top: 1,
            height: 1,
            row_height: 1,
            overscan: 0,
        });
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "A");
        assert_eq!(rows[0].total_weight.text, "65 samples");
        assert_eq!(rows[0].total_weight.percentage(), "61.9%");
        assert!(!rows[0].state.focused);
        assert!(!rows[0].state.hovered);
        assert!(table.row_view(0).unwrap().state.focused);
        assert!(table.row_view(2).unwrap().state.hovered);

        // Percentages relative to a chosen reference node
        let a = rows[0].node;
        table.set_reference(Some(a));
        assert_eq!(table.reference_total(), 65.0);
        assert_eq!(table.row_view(1).unwrap().self_weight.percentage(), "46.2%");
        table.set_unit(WeightUnit::Nanoseconds);
        assert_eq!(table.unit(), WeightUnit::Nanoseconds);
        assert_eq!(table.row_view(1).unwrap().self_weight.text, "30ns");

        table.on_mouse_enter(None);
        assert_eq!(table.hovered_row(), None);

        // Roots change resets focus and expansion
        let roots = table.flat().tree().root_ids().to_vec();
        table.set_roots(Some(&roots));
        assert_eq!(table.focused_row(), None);
        assert_eq!(names(&table), ["Root"]);
    }
}
