//! Context menu of a frame stack table
//!
//! The menu is either closed or open at a single position, targeting at most
//! one frame. Opening it again while it is open moves it instead of stacking
//! a second menu. The coordinator does not draw anything: zoom requests are
//! forwarded to a canvas renderer through the `CanvasSink` trait.

use crate::tree::FrameNodeId;

/// Point in the host's coordinate space
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Point {
    /// Horizontal coordinate, growing rightwards
    pub x: f64,

    /// Vertical coordinate, growing downwards
    pub y: f64,
}

/// Extent of a rectangular area
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Size {
    /// Horizontal extent
    pub width: f64,

    /// Vertical extent
    pub height: f64,
}

/// Rectangular area
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Rect {
    /// Top-left corner
    pub origin: Point,

    /// Extent
    pub size: Size,
}

/// Flavor of canvas zoom
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum ZoomMode {
    /// Zoom on this exact call tree node
    Exact,

    /// Zoom on every node with the same frame
    Similar,
}

/// Entries of the context menu
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum MenuItem {
    /// Show the targeted frame on the flamegraph canvas
    ZoomIntoFrame(ZoomMode),
}
//
impl MenuItem {
    /// Every menu entry, in display order
    pub const ALL: [MenuItem; 2] = [
        MenuItem::ZoomIntoFrame(ZoomMode::Exact),
        MenuItem::ZoomIntoFrame(ZoomMode::Similar),
    ];

    /// Menu entry label
    pub fn label(self) -> &'static str {
        match self {
            Self::ZoomIntoFrame(ZoomMode::Exact) => "Show on flamegraph",
            Self::ZoomIntoFrame(ZoomMode::Similar) => "Show similar frames on flamegraph",
        }
    }
}

/// Message sent to the canvas renderer
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum CanvasMessage {
    /// Zoom the flamegraph into a frame tree node
    ZoomIntoFrame {
        /// Node to zoom into
        node: FrameNodeId,

        /// Zoom flavor
        mode: ZoomMode,
    },
}

/// Receiver of canvas messages
pub trait CanvasSink {
    /// Forward a message to the canvas renderer
    fn dispatch(&mut self, message: CanvasMessage);
}
//
impl CanvasSink for Vec<CanvasMessage> {
    fn dispatch(&mut self, message: CanvasMessage) {
        self.push(message);
    }
}

/// State of the context menu
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum ContextMenuState {
    /// No menu is displayed
    #[default]
    Closed,

    /// Menu is displayed
    Open {
        /// Position of the menu's top-left corner, relative to the container
        position: Point,

        /// Frame that was right-clicked, if the click landed on a row
        target: Option<FrameNodeId>,
    },
}

/// Context menu coordinator
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContextMenu {
    state: ContextMenuState,
}
//
impl ContextMenu {
    /// Set up a closed context menu
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state
    pub fn state(&self) -> ContextMenuState {
        self.state
    }

    /// Truth that the menu is open
    pub fn is_open(&self) -> bool {
        matches!(self.state, ContextMenuState::Open { .. })
    }

    /// Position of the open menu, if any
    pub fn position(&self) -> Option<Point> {
        match self.state {
            ContextMenuState::Open { position, .. } => Some(position),
            ContextMenuState::Closed => None,
        }
    }

    /// Frame targeted by the open menu, if any
    pub fn target(&self) -> Option<FrameNodeId> {
        match self.state {
            ContextMenuState::Open { target, .. } => target,
            ContextMenuState::Closed => None,
        }
    }

    /// Open the menu in response to a right click
    ///
    /// `click` is in the same coordinate space as `container`. The resulting
    /// position is relative to the container and clamped so that a menu of
    /// size `menu` stays inside of it whenever it fits. If the menu was
    /// already open, it is moved and retargeted.
    pub fn open(
        &mut self,
        click: Point,
        container: Rect,
        menu: Size,
        target: Option<FrameNodeId>,
    ) -> Point {
        let clamp = |offset: f64, extent: f64, menu_extent: f64| {
            offset.min(extent - menu_extent).max(0.0)
        };
        let position = Point {
            x: clamp(click.x - container.origin.x, container.size.width, menu.width),
            y: clamp(click.y - container.origin.y, container.size.height, menu.height),
        };
        log::trace!("Opening context menu at {position:?} targeting {target:?}");
        self.state = ContextMenuState::Open { position, target };
        position
    }

    /// Close the menu, e.g. after a click outside of it
    pub fn close(&mut self) {
        self.state = ContextMenuState::Closed;
    }

    /// Activate a menu entry, then close the menu
    ///
    /// Returns the message that was dispatched, if any. Nothing is dispatched
    /// when the menu is closed or was not opened on a row.
    pub fn select(&mut self, item: MenuItem, sink: &mut impl CanvasSink) -> Option<CanvasMessage> {
        let target = self.target();
        self.close();
        let message = match item {
            MenuItem::ZoomIntoFrame(mode) => CanvasMessage::ZoomIntoFrame {
                node: target?,
                mode,
            },
        };
        sink.dispatch(message);
        Some(message)
    }
}
