//! Coalescing of rapid resize drags
//!
//! Drag events can arrive much faster than the host redraws. Each drag event
//! stores its offset in a single pending slot, overwriting whatever was there,
//! and the host applies the slot once per redraw tick. Intermediate offsets
//! are lost, which is fine because offsets are measured from the start of
//! the drag rather than from the previous event.
//!
//! `DrawerResize` covers the common case of a single resizable pane.
//! `PendingResize` is also exposed on its own for hosts that coalesce other
//! kinds of drag.

/// Single-slot storage for the latest unapplied resize offset
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PendingResize {
    pending: Option<f64>,
}
//
impl PendingResize {
    /// Record a new offset, replacing any unapplied one
    ///
    /// Returns the truth that the slot was empty, which means that the caller
    /// must schedule a tick to apply it.
    pub fn schedule(&mut self, offset: f64) -> bool {
        self.pending.replace(offset).is_none()
    }

    /// Take the latest offset for application, if any
    pub fn take(&mut self) -> Option<f64> {
        self.pending.take()
    }

    /// Truth that an offset is waiting to be applied
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// Resizable drawer, like the frame details pane below a frame stack table
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DrawerResize {
    /// Current drawer size
    size: f64,

    /// Smallest allowed size
    min: f64,

    /// Largest allowed size
    max: f64,

    /// Size at the start of the ongoing drag, if any
    drag_origin: Option<f64>,

    /// Offset of the ongoing drag, as of the latest drag event
    drag_offset: f64,

    /// Offset waiting to be applied
    pending: PendingResize,
}
//
impl DrawerResize {
    /// Set up a drawer, with a size that is clamped to the allowed range
    pub fn new(size: f64, min: f64, max: f64) -> Self {
        assert!(min <= max, "Invalid drawer size range {min}..={max}");
        Self {
            size: size.clamp(min, max),
            min,
            max,
            drag_origin: None,
            drag_offset: 0.0,
            pending: PendingResize::default(),
        }
    }

    /// Current drawer size
    pub fn size(&self) -> f64 {
        self.size
    }

    /// Handle a drag event, with an offset measured from the start of the drag
    ///
    /// Returns the truth that a tick must be scheduled to apply it.
    pub fn drag_to(&mut self, offset: f64) -> bool {
        self.drag_origin.get_or_insert(self.size);
        self.drag_offset = offset;
        self.pending.schedule(offset)
    }

    /// Handle a drag event, with an offset relative to the previous event
    pub fn drag_by(&mut self, delta: f64) -> bool {
        let offset = self.drag_offset + delta;
        self.drag_to(offset)
    }

    /// Apply the latest pending drag offset, if any, and return the new size
    pub fn tick(&mut self) -> Option<f64> {
        let offset = self.pending.take()?;
        let origin = self.drag_origin.unwrap_or(self.size);
        self.size = (origin + offset).clamp(self.min, self.max);
        Some(self.size)
    }

    /// Finish the ongoing drag, applying any pending offset
    pub fn end_drag(&mut self) -> f64 {
        self.tick();
        self.drag_origin = None;
        self.drag_offset = 0.0;
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_slot() {
        let mut pending = PendingResize::default();
        assert!(!pending.is_pending());
        assert!(pending.schedule(1.0));
        assert!(!pending.schedule(2.0));
        assert!(!pending.schedule(3.0));
        assert!(pending.is_pending());
        assert_eq!(pending.take(), Some(3.0));
        assert_eq!(pending.take(), None);
        assert!(pending.schedule(4.0));
    }

    #[test]
    fn coalesced_drag() {
        let mut drawer = DrawerResize::new(100.0, 50.0, 300.0);
        assert!(drawer.drag_to(10.0));
        assert!(!drawer.drag_to(20.0));
        assert!(!drawer.drag_to(-30.0));
        assert_eq!(drawer.size(), 100.0);
        assert_eq!(drawer.tick(), Some(70.0));
        assert_eq!(drawer.tick(), None);

        // Offsets remain relative to the start of the drag
        assert!(drawer.drag_to(-20.0));
        assert_eq!(drawer.tick(), Some(80.0));
        assert!(drawer.drag_to(-500.0));
        assert_eq!(drawer.end_drag(), 50.0);

        // New drags start from the current size
        drawer.drag_by(25.0);
        drawer.drag_by(25.0);
        assert_eq!(drawer.tick(), Some(100.0));
        drawer.drag_by(1000.0);
        assert_eq!(drawer.end_drag(), 300.0);
    }

    #[test]
    fn initial_clamp() {
        assert_eq!(DrawerResize::new(10.0, 20.0, 30.0).size(), 20.0);
    }
}
