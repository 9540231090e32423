//! TTY control: raw mode, geometry and the cursor position handshake.

use super::capability::{Capability, CapabilityTable};
use super::TerminalSize;
use crate::error::{Error, Result};
use crossterm::tty::IsTty;
use nix::poll::{poll, PollFd, PollFlags};
use nix::sys::termios::{
    self, ControlFlags, InputFlags, LocalFlags, OutputFlags, SetArg, SpecialCharacterIndices,
    Termios,
};
use std::fs::File;
use std::io::{self, Read, Write};
use std::os::fd::{AsFd, OwnedFd};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Longest reply accepted before the handshake gives up.
const MAX_REPORT_LEN: usize = 64;

/// The terminal the session draws on.
///
/// Holds a duplicate of the terminal descriptor (so redirecting stdout or
/// stderr later does not affect rendering) and the attributes in effect
/// before raw mode was entered.
pub struct Tty {
    fd: OwnedFd,
    input: OwnedFd,
    original: Mutex<Termios>,
}

impl Tty {
    /// Attach to the terminal behind stderr or stdout (in that order).
    ///
    /// Stdin must be a terminal too, since the handshake reads from it.
    pub fn open() -> Result<Self> {
        let stdin = io::stdin();
        if !stdin.is_tty() {
            return Err(Error::NotATerminal);
        }
        let stderr = io::stderr();
        let stdout = io::stdout();
        let fd = if stderr.is_tty() {
            stderr.as_fd().try_clone_to_owned()?
        } else if stdout.is_tty() {
            stdout.as_fd().try_clone_to_owned()?
        } else {
            return Err(Error::NotATerminal);
        };
        let input = stdin.as_fd().try_clone_to_owned()?;
        let original = termios::tcgetattr(&fd).map_err(Error::Termios)?;
        Ok(Self {
            fd,
            input,
            original: Mutex::new(original),
        })
    }

    /// A writer on the terminal descriptor.
    pub fn writer(&self) -> Result<File> {
        Ok(File::from(self.fd.try_clone()?))
    }

    /// Current window size.
    pub fn size() -> Result<TerminalSize> {
        let (width, height) = crossterm::terminal::size()?;
        Ok(TerminalSize::new(width, height))
    }

    /// Switch to raw, 8-bit clean mode without echo or signal characters
    /// being interpreted as line editing.
    pub fn enter_raw(&self) -> Result<()> {
        let mut mode = self.saved();
        mode.input_flags &= !(InputFlags::BRKINT
            | InputFlags::ICRNL
            | InputFlags::INPCK
            | InputFlags::ISTRIP
            | InputFlags::IXON);
        mode.output_flags &= !OutputFlags::OPOST;
        mode.control_flags &= !(ControlFlags::CSIZE | ControlFlags::PARENB);
        mode.control_flags |= ControlFlags::CS8;
        mode.local_flags &= !(LocalFlags::ECHO | LocalFlags::ICANON | LocalFlags::IEXTEN);
        mode.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
        mode.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;
        termios::tcsetattr(&self.fd, SetArg::TCSAFLUSH, &mode).map_err(Error::Termios)
    }

    /// Put back the attributes saved by [`Tty::open`].
    pub fn restore(&self) -> Result<()> {
        termios::tcsetattr(&self.fd, SetArg::TCSADRAIN, &self.saved()).map_err(Error::Termios)
    }

    fn saved(&self) -> Termios {
        self.original
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Ask the terminal where the cursor is.
    ///
    /// Returns the zero-based physical `(row, col)`. Bytes typed by the user
    /// before the reply are discarded.
    pub fn query_cursor(&self, caps: &CapabilityTable, timeout: Duration) -> Result<(u16, u16)> {
        let query = caps
            .format(Capability::QueryCursor, &[])
            .ok_or_else(|| {
                Error::UnsupportedTerminal(format!("missing {}", Capability::QueryCursor.name()))
            })?;
        let mut out = self.writer()?;
        out.write_all(query.as_bytes())?;
        out.flush()?;

        let mut input = File::from(self.input.try_clone()?);
        let deadline = Instant::now() + timeout;
        let mut reply = Vec::with_capacity(16);
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let millis = u16::try_from(remaining.as_millis()).unwrap_or(u16::MAX);
            let mut fds = [PollFd::new(self.input.as_fd(), PollFlags::POLLIN)];
            let ready = poll(&mut fds, millis).map_err(Error::Os)?;
            if ready == 0 {
                return Err(Error::HandshakeTimeout);
            }

            let mut byte = [0u8; 1];
            if input.read(&mut byte)? == 0 {
                return Err(Error::NotATerminal);
            }
            reply.push(byte[0]);
            if byte[0] == b'R' {
                break;
            }
            if reply.len() > MAX_REPORT_LEN {
                break;
            }
        }

        let (row, col) = parse_cursor_report(&reply)
            .ok_or_else(|| Error::BadCursorReport(String::from_utf8_lossy(&reply).into_owned()))?;
        Ok((row.saturating_sub(1), col.saturating_sub(1)))
    }
}

/// Parse a `ESC [ row ; col R` reply, ignoring anything before it.
///
/// Returns the one-based `(row, col)`. Empty fields read as 1.
pub fn parse_cursor_report(bytes: &[u8]) -> Option<(u16, u16)> {
    let end = bytes.iter().rposition(|&b| b == b'R')?;
    let start = bytes[..end].iter().rposition(|&b| b == 0x1b)?;
    let body = bytes.get(start + 1..end)?.strip_prefix(b"[")?;
    let body = std::str::from_utf8(body).ok()?;
    let (row, col) = body.split_once(';')?;
    let field = |s: &str| -> Option<u16> {
        if s.is_empty() {
            Some(1)
        } else {
            s.parse().ok()
        }
    };
    Some((field(row)?, field(col)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_report() {
        assert_eq!(parse_cursor_report(b"\x1b[12;40R"), Some((12, 40)));
    }

    #[test]
    fn test_parse_report_after_typed_input() {
        assert_eq!(parse_cursor_report(b"abc\x1b[3;1R"), Some((3, 1)));
    }

    #[test]
    fn test_parse_report_empty_fields() {
        assert_eq!(parse_cursor_report(b"\x1b[;R"), Some((1, 1)));
    }

    #[test]
    fn test_parse_report_malformed() {
        assert_eq!(parse_cursor_report(b"\x1b[12R"), None);
        assert_eq!(parse_cursor_report(b"\x1b[a;bR"), None);
        assert_eq!(parse_cursor_report(b"12;40R"), None);
    }
}
