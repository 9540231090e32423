//! `OutputBuffer`: Single-syscall output buffer for one render operation.

use super::capability::{Capability, CapabilityTable};
use std::io::Write;

/// Pre-allocated buffer for building terminal output.
///
/// Everything one operation draws is accumulated here, then flushed in a
/// single `write()` syscall so a half-drawn cell is never visible.
pub struct OutputBuffer {
    data: Vec<u8>,
    scratch: String,
}

impl OutputBuffer {
    /// Create a new output buffer with the given capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            scratch: String::new(),
        }
    }

    /// Create a buffer sized for a typical redraw (4KB).
    pub fn new() -> Self {
        Self::with_capacity(4096)
    }

    /// Get the buffer length.
    #[inline]
    pub const fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if buffer is empty.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Write raw bytes.
    #[inline]
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Write `count` spaces.
    #[inline]
    pub fn spaces(&mut self, count: usize) {
        self.data.resize(self.data.len() + count, b' ');
    }

    /// Write `\r\n`.
    #[inline]
    pub fn newline(&mut self) {
        self.data.extend_from_slice(b"\r\n");
    }

    /// Write a capability, formatted with `params`. Missing capabilities
    /// write nothing.
    pub fn capability(&mut self, table: &CapabilityTable, cap: Capability, params: &[i64]) {
        self.scratch.clear();
        if table.format_into(cap, params, &mut self.scratch) {
            self.data.extend_from_slice(self.scratch.as_bytes());
        }
    }

    /// Move the cursor to a zero-based physical `(row, col)`.
    #[inline]
    pub fn cursor_move(&mut self, table: &CapabilityTable, row: i64, col: u16) {
        self.capability(table, Capability::CursorAddress, &[row, i64::from(col)]);
    }

    /// Flush to a writer in a single syscall and clear the buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying writer fails.
    pub fn flush_to<W: Write + ?Sized>(&mut self, writer: &mut W) -> std::io::Result<()> {
        if self.data.is_empty() {
            return Ok(());
        }
        let result = writer.write_all(&self.data).and_then(|()| writer.flush());
        self.data.clear();
        result
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}
