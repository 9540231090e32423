//! # Cellterm
//!
//! Inline terminal output made of independently updatable cells.
//!
//! Cellterm draws below the shell prompt instead of taking over the whole
//! screen. Output is split into cells: a cell can be rewritten (a progress
//! line), can float below newer output (a status line), or can be frozen
//! into scrollback history. The renderer predicts where the cursor is after
//! every write, so only what actually moved is redrawn.
//!
//! ## Core Concepts
//!
//! - **Virtual rows**: Cells are placed in an unbounded row space; a scroll
//!   offset maps it onto the visible window
//! - **Cursor prediction**: Wrapping, motion and scrolling escapes are
//!   simulated instead of queried
//! - **Suffix rendering**: Changing a cell re-renders it and stops at the
//!   first later cell that did not move
//! - **Floating cells**: Higher priority cells stay below ordinary output
//!
//! ## Example
//!
//! ```rust,no_run
//! use cellterm::{OutputOptions, Session};
//!
//! let session = Session::open();
//! let status = session.output("starting", OutputOptions::new().floating());
//! session.print("step 1 done\n");
//! status.update("finished");
//! status.freeze();
//! ```

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod cell;
pub mod error;
pub mod render;
pub mod session;
pub mod terminal;
pub mod token;

// Re-exports for convenience
pub use cell::{Cell, CellId, CellStore, Position};
pub use error::{Error, Result};
pub use render::{RenderStats, Renderer, Screen};
pub use session::{Handle, Lifecycle, OutputOptions, Session, SessionConfig};
pub use terminal::{Capability, CapabilityTable, TerminalSize};
pub use token::{Token, Tokenizer};
