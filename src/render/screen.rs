//! Screen geometry and the virtual-to-physical row mapping.

use crate::cell::Position;
use crate::terminal::TerminalSize;

/// The visible window onto virtual row space.
///
/// `physical = virtual - scroll + height - 1`: the row at the scroll offset
/// is the bottom line of the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Screen {
    size: TerminalSize,
    scroll: i64,
    saved_cursor: Option<Position>,
}

impl Screen {
    /// Create a screen of the given size with no scrolling yet.
    pub const fn new(size: TerminalSize) -> Self {
        Self {
            size,
            scroll: 0,
            saved_cursor: None,
        }
    }

    /// Width in columns.
    #[inline]
    pub const fn width(&self) -> u16 {
        self.size.width
    }

    /// Height in rows.
    #[inline]
    pub const fn height(&self) -> u16 {
        self.size.height
    }

    /// Current size.
    pub const fn size(&self) -> TerminalSize {
        self.size
    }

    /// Change the size. The scroll offset keeps the bottom row anchored.
    pub const fn resize(&mut self, size: TerminalSize) {
        self.size = size;
    }

    /// Current scroll offset.
    #[inline]
    pub const fn scroll(&self) -> i64 {
        self.scroll
    }

    /// Shift the scroll offset by `delta` rows.
    #[inline]
    pub const fn scroll_by(&mut self, delta: i64) {
        self.scroll += delta;
    }

    /// Map a virtual row to a physical row (may be off screen).
    #[inline]
    pub const fn to_physical(&self, row: i64) -> i64 {
        row - self.scroll + self.size.height as i64 - 1
    }

    /// Map a physical row back to virtual space.
    #[inline]
    pub const fn to_virtual(&self, row: i64) -> i64 {
        row + self.scroll - self.size.height as i64 + 1
    }

    /// Position remembered by `CSI s`.
    pub const fn saved_cursor(&self) -> Option<Position> {
        self.saved_cursor
    }

    /// Remember a position for `CSI u`.
    pub const fn save_cursor(&mut self, pos: Position) {
        self.saved_cursor = Some(pos);
    }
}
