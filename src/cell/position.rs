//! Virtual cursor positions.

use std::fmt;

/// A position in virtual screen space.
///
/// Rows are unbounded and grow as output accumulates; the screen's scroll
/// offset maps them onto physical rows.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    /// Virtual row.
    pub row: i64,
    /// Column, zero-based.
    pub col: u16,
}

impl Position {
    /// Create a position.
    pub const fn new(row: i64, col: u16) -> Self {
        Self { row, col }
    }

    /// The origin `(0, 0)`.
    pub const ORIGIN: Self = Self::new(0, 0);
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

impl From<(i64, u16)> for Position {
    #[inline]
    fn from((row, col): (i64, u16)) -> Self {
        Self::new(row, col)
    }
}
