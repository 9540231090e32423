//! Session: The public face of the crate.
//!
//! This module contains:
//! - [`Session`]: Terminal ownership, lifecycle and the output entry points
//! - [`Handle`]: A weak reference to one cell
//! - [`OutputOptions`]: Float priority, freezing and indent for new cells
//! - [`SessionConfig`]: Everything tunable, with environment detection
//! - [`Engine`]: Store, renderer and writer behind the session lock
//!
//! # Architecture
//!
//! ```text
//! caller ──output/update──▶ Session ──lock──▶ Engine ──▶ terminal
//!                              ▲
//!   SIGWINCH/TSTP/CONT ──bits──┤ (signal watcher thread)
//!   stdout/stderr ──pipe───────┘ (capture thread)
//! ```

pub mod config;
mod controller;
mod engine;
mod handle;
mod hook;
pub mod signals;

pub use config::SessionConfig;
pub use controller::{Lifecycle, Session};
pub use engine::{Engine, OutputOptions};
pub use handle::Handle;
