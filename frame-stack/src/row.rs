//! Presentational content of the rows of a frame stack table

use crate::{
    flatten::FlatRow,
    tree::{FrameNodeId, Weight},
    weight::{display_percentage, relative_weight, WeightUnit},
};

/// Horizontal layout of the frame name column
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RowLayout {
    /// Indentation added per level of depth
    pub unit_width: usize,

    /// Indentation of the roots
    pub base_offset: usize,
}
//
impl RowLayout {
    /// Indentation of a row at a certain depth
    pub fn indentation(&self, depth: usize) -> usize {
        depth * self.unit_width + self.base_offset
    }
}
//
impl Default for RowLayout {
    fn default() -> Self {
        Self {
            unit_width: 2,
            base_offset: 0,
        }
    }
}

/// Glyph used to tell application frames from system frames
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum FrameKind {
    /// Frame from the profiled application
    Application,

    /// Frame from system libraries or the runtime
    System,
}
//
impl FrameKind {
    /// Single-character glyph for text displays
    pub fn glyph(self) -> char {
        match self {
            Self::Application => 'λ',
            Self::System => '⚙',
        }
    }
}

/// Weight column cell
#[derive(Clone, Debug, PartialEq)]
pub struct WeightCell {
    /// Raw weight
    pub value: Weight,

    /// Formatted weight
    pub text: String,

    /// Weight as a percentage of the reference node's total weight
    pub relative: Weight,
}
//
impl WeightCell {
    /// Build a cell from a weight
    pub fn new(value: Weight, unit: WeightUnit, reference_total: Weight) -> Self {
        Self {
            value,
            text: unit.format(value),
            relative: relative_weight(value, reference_total),
        }
    }

    /// Formatted percentage of the reference weight
    pub fn percentage(&self) -> String {
        display_percentage(self.relative)
    }

    /// Width of the percentage bar when the full bar is `full_width` wide
    ///
    /// Bars of weights that exceed the reference are clamped to the full width.
    pub fn bar_width(&self, full_width: f64) -> f64 {
        (full_width * self.relative / 100.0).clamp(0.0, full_width)
    }
}

/// Interaction state of a row
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct RowState {
    /// Row has keyboard focus
    pub focused: bool,

    /// Row is under the mouse cursor
    pub hovered: bool,
}

/// Everything a rendering host needs to draw one row
#[derive(Clone, Debug, PartialEq)]
pub struct RowView {
    /// Position of the row in the flattened output
    pub index: usize,

    /// Frame tree node displayed by this row
    pub node: FrameNodeId,

    /// Distance from the displayed root
    pub depth: usize,

    /// Indentation of the frame name
    pub indentation: usize,

    /// Total weight column
    pub total_weight: WeightCell,

    /// Self weight column
    pub self_weight: WeightCell,

    /// Frame name
    pub name: String,

    /// Module or package used to pick a color, if any
    pub color_key: Option<String>,

    /// Application/system glyph
    pub kind: FrameKind,

    /// Truth that an expand/collapse affordance should be shown
    pub expandable: bool,

    /// Truth that the children of this row are displayed
    pub expanded: bool,

    /// Interaction state
    pub state: RowState,
}
//
impl RowView {
    /// Expansion marker for text displays
    pub fn expansion_marker(&self) -> char {
        match (self.expandable, self.expanded) {
            (false, _) => ' ',
            (true, false) => '▸',
            (true, true) => '▾',
        }
    }
}

/// Turns flattened rows into row views
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RowBinding {
    /// Layout of the name column
    pub layout: RowLayout,

    /// Unit of the weights
    pub unit: WeightUnit,

    /// Total weight that percentages are computed against
    pub reference_total: Weight,
}
//
impl RowBinding {
    /// Compute the content of a row
    pub fn bind(&self, row: &FlatRow<'_>, state: RowState) -> RowView {
        let frame = row.node.frame();
        RowView {
            index: row.index,
            node: row.node.id(),
            depth: row.depth,
            indentation: self.layout.indentation(row.depth),
            total_weight: WeightCell::new(
                row.node.total_weight(),
                self.unit,
                self.reference_total,
            ),
            self_weight: WeightCell::new(row.node.self_weight(), self.unit, self.reference_total),
            name: frame.name().to_owned(),
            color_key: frame.color_key().map(str::to_owned),
            kind: if frame.is_application() {
                FrameKind::Application
            } else {
                FrameKind::System
            },
            expandable: row.expandable,
            expanded: row.expanded,
            state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        flatten::{FlattenOptions, VirtualizedTree},
        tree::tests::tree_from_stacks,
    };
    use pretty_assertions::assert_eq;
    use std::rc::Rc;

    #[test]
    fn bind() {
        let tree = Rc::new(tree_from_stacks(&[
            ("main;sys_read", 25.0),
            ("main", 75.0),
        ]));
        let roots = tree.root_ids().to_vec();
        let flat = VirtualizedTree::new(
            tree,
            Some(&roots),
            FlattenOptions {
                expanded: true,
                ..Default::default()
            },
        );
        let binding = RowBinding {
            layout: RowLayout {
                unit_width: 4,
                base_offset: 1,
            },
            unit: WeightUnit::Samples,
            reference_total: 100.0,
        };

        let root = binding.bind(&flat.row(0).unwrap(), RowState::default());
        assert_eq!(root.indentation, 1);
        assert_eq!(root.kind, FrameKind::Application);
        assert_eq!(root.expansion_marker(), '▾');
        assert_eq!(root.total_weight.text, "100 samples");
        assert_eq!(root.total_weight.percentage(), "100.0%");
        assert_eq!(root.self_weight.percentage(), "75.0%");

        let state = RowState {
            focused: true,
            hovered: false,
        };
        let child = binding.bind(&flat.row(1).unwrap(), state);
        assert_eq!(child.name, "sys_read");
        assert_eq!(child.depth, 1);
        assert_eq!(child.indentation, 5);
        assert_eq!(child.kind, FrameKind::System);
        assert_eq!(child.kind.glyph(), '⚙');
        assert_eq!(child.expansion_marker(), ' ');
        assert_eq!(child.self_weight.relative, 25.0);
        assert_eq!(child.self_weight.percentage(), "25.0%");
        assert_eq!(child.self_weight.bar_width(200.0), 50.0);
        assert!(child.state.focused);

        let unreferenced = RowBinding {
            reference_total: 0.0,
            ..binding
        };
        let child = unreferenced.bind(&flat.row(1).unwrap(), state);
        assert_eq!(child.total_weight.relative, 0.0);
    }

    #[test]
    fn bar_width() {
        let cell = WeightCell::new(150.0, WeightUnit::Nanoseconds, 100.0);
        assert_eq!(cell.relative, 150.0);
        assert_eq!(cell.bar_width(10.0), 10.0);
        assert_eq!(cell.text, "150ns");
    }
}
