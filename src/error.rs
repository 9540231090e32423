//! Error type for session setup.
//!
//! Only attaching to a terminal can fail. Once a session is active, output
//! operations never return errors: stale handles are ignored and terminal
//! write failures are logged.

use std::io;
use thiserror::Error;

/// Errors raised while taking control of a terminal.
#[derive(Debug, Error)]
pub enum Error {
    /// Neither stdout nor stderr is a terminal, or stdin is not one.
    #[error("no controlling terminal is attached")]
    NotATerminal,

    /// Disabled through configuration or the `CELLTERM_DISABLE` variable.
    #[error("terminal control is disabled")]
    Disabled,

    /// Another OS-attached session already owns the terminal.
    #[error("a terminal session is already active in this process")]
    AlreadyActive,

    /// The terminal type cannot address the cursor.
    #[error("terminal type {0:?} does not support cursor addressing")]
    UnsupportedTerminal(String),

    /// Reading or changing terminal attributes failed.
    #[error("terminal attribute call failed: {0}")]
    Termios(#[source] nix::Error),

    /// Installing a signal handler or redirecting a descriptor failed.
    #[error("signal or descriptor setup failed: {0}")]
    Os(#[source] nix::Error),

    /// The terminal never answered the cursor position query.
    #[error("timed out waiting for the cursor position report")]
    HandshakeTimeout,

    /// The cursor position reply could not be parsed.
    #[error("malformed cursor position report: {0:?}")]
    BadCursorReport(String),

    /// Any other I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
