//! Cell module: What is on screen, and where.
//!
//! This module contains:
//! - [`Position`]: A virtual `(row, col)` coordinate
//! - [`Cell`]: One independently addressable block of output
//! - [`CellStore`]: The ordered collection of cells, with float placement,
//!   freezing and eviction of frozen history

mod position;
mod store;

pub use position::Position;
pub use store::{Cell, CellId, CellStore};
