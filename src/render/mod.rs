//! Render module: Turning cells into terminal output.
//!
//! This module contains:
//! - [`Screen`]: Terminal size, scroll offset and saved cursor
//! - [`Renderer`]: Cell replay with cursor prediction, suffix re-rendering
//!   and full redraws after a resize
//! - [`RenderStats`]: Pass, cell and byte counters

mod renderer;
mod screen;

pub use renderer::{RenderStats, Renderer};
pub use screen::Screen;
