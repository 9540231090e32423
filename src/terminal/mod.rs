//! Terminal module: Everything that touches the real terminal.
//!
//! - [`capability`]: the small escape-sequence table the renderer needs
//! - [`OutputBuffer`]: single-write output accumulation
//! - [`tty`]: raw mode, window size and the cursor position handshake
//! - [`capture`]: redirection of stdout/stderr into the session

pub mod capability;
pub mod capture;
mod output;
pub mod tty;

pub use capability::{Capability, CapabilityTable};
pub use output::OutputBuffer;

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TerminalSize {
    /// Columns.
    pub width: u16,
    /// Rows.
    pub height: u16,
}

impl TerminalSize {
    /// Size used until a real terminal is attached.
    pub const DEFAULT: Self = Self::new(80, 25);

    /// Create a size. Zero dimensions are raised to one.
    pub const fn new(width: u16, height: u16) -> Self {
        Self {
            width: if width == 0 { 1 } else { width },
            height: if height == 0 { 1 } else { height },
        }
    }
}

impl Default for TerminalSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}
