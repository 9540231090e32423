//! Renderer: Replays cells against a simulated cursor.
//!
//! The terminal cannot be asked where its cursor is after every write, so
//! the renderer predicts it. Each token is emitted and its effect on the
//! cursor (wrapping, motion, scrolling) is mirrored on a simulated position
//! in physical rows. A cell's end is that simulated position, translated
//! back to virtual space, once its last token has been replayed.

use super::Screen;
use crate::cell::{Cell, CellStore, Position};
use crate::terminal::{Capability, CapabilityTable, OutputBuffer, TerminalSize};
use crate::token::{CsiSeq, Token};
use std::io::{self, Write};
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Render statistics for debugging/profiling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Render passes started (appends, suffix renders and redraws).
    pub passes: u64,
    /// Cells replayed across all passes.
    pub cells_rendered: u64,
    /// Total bytes written to the terminal.
    pub bytes_written: u64,
}

/// Draws cells and tracks where they end up.
pub struct Renderer {
    screen: Screen,
    caps: CapabilityTable,
    out: OutputBuffer,
    stats: RenderStats,
}

impl Renderer {
    /// Create a renderer for a terminal of the given size.
    pub fn new(size: TerminalSize, caps: CapabilityTable) -> Self {
        Self {
            screen: Screen::new(size),
            caps,
            out: OutputBuffer::new(),
            stats: RenderStats::default(),
        }
    }

    /// Screen geometry and scroll state.
    pub const fn screen(&self) -> &Screen {
        &self.screen
    }

    /// The capability table in use.
    pub const fn caps(&self) -> &CapabilityTable {
        &self.caps
    }

    /// Statistics so far.
    pub const fn stats(&self) -> RenderStats {
        self.stats
    }

    /// Adopt a new terminal size. Call [`Renderer::redraw`] afterwards.
    pub const fn resize(&mut self, size: TerminalSize) {
        self.screen.resize(size);
    }

    /// Queue a capability string.
    pub fn capability(&mut self, cap: Capability) {
        self.out.capability(&self.caps, cap, &[]);
    }

    /// Queue raw bytes.
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.out.write_raw(bytes);
    }

    /// Send everything queued to `writer` in one write.
    pub fn flush_to<W: Write + ?Sized>(&mut self, writer: &mut W) -> io::Result<()> {
        self.stats.bytes_written += self.out.len() as u64;
        self.out.flush_to(writer)
    }

    /// Move the physical cursor to a virtual position.
    ///
    /// Returns `false`, emitting nothing, if the row is above the window.
    fn goto(&mut self, pos: Position) -> bool {
        let row = self.screen.to_physical(pos.row);
        if row < 0 {
            return false;
        }
        let row = row.min(i64::from(self.screen.height()) - 1);
        let col = pos.col.min(self.screen.width().saturating_sub(1));
        self.out.cursor_move(&self.caps, row, col);
        true
    }

    /// Draw the last cell, with the cursor already parked at its start.
    pub fn append(&mut self, store: &mut CellStore, index: usize) {
        self.stats.passes += 1;
        let Some(cell) = store.at_mut(index) else {
            return;
        };
        let synced = self.render_cell(cell, true);
        let end = cell.end;
        if !synced {
            self.goto(end);
        }
        tracing::trace!(index, ?end, "appended cell");
    }

    /// Re-render cells from `index` onward.
    ///
    /// Each cell starts where the previous one ended. Unless `force` is set,
    /// rendering stops at the first cell whose start did not move, since
    /// nothing after it changed. When every cell was drawn, whatever was on
    /// screen below the last one is cleared.
    pub fn render_from(&mut self, store: &mut CellStore, index: usize, force: bool) {
        let Some(start) = store.at(index).map(|cell| cell.start) else {
            return;
        };
        self.stats.passes += 1;

        let mut synced = self.goto(start);
        let mut prev_end: Option<Position> = None;
        let mut completed = true;
        for i in index..store.len() {
            let Some(cell) = store.at_mut(i) else {
                continue;
            };
            if let Some(end) = prev_end {
                if !force && cell.start == end {
                    completed = false;
                    break;
                }
                cell.start = end;
            }
            synced = self.render_cell(cell, synced);
            prev_end = Some(cell.end);
        }

        if completed {
            if let Some(end) = prev_end {
                if synced || self.goto(end) {
                    self.capability(Capability::ClearToEos);
                }
            }
        } else if let Some(end) = store.last().map(|cell| cell.end) {
            self.goto(end);
        }
        tracing::trace!(index, force, completed, "rendered suffix");
    }

    /// Force-render everything that is at least partly visible.
    ///
    /// Starts from the last cell that begins above the window if it reaches
    /// into the window, otherwise from the cell after it.
    pub fn redraw(&mut self, store: &mut CellStore) {
        let len = store.len();
        if len == 0 {
            return;
        }
        let screen = self.screen;
        let above = (0..len)
            .rev()
            .find(|&i| store.at(i).is_some_and(|c| screen.to_physical(c.start.row) < 0));
        let index = match above {
            None => 0,
            Some(i) if store.at(i).is_some_and(|c| screen.to_physical(c.end.row) >= 0) => i,
            Some(i) => (i + 1).min(len - 1),
        };
        tracing::debug!(index, len, scroll = screen.scroll(), "redraw");
        self.render_from(store, index, true);
    }

    /// Replay one cell from its start and record its end.
    ///
    /// `synced` says whether the physical cursor is already at the cell's
    /// start. Returns whether it is at the cell's end afterwards.
    fn render_cell(&mut self, cell: &mut Cell, synced: bool) -> bool {
        self.stats.cells_rendered += 1;
        let width = self.screen.width();
        let mut pen = Pen {
            row: self.screen.to_physical(cell.start.row),
            col: cell.start.col,
            indent: cell.indent.min(width.saturating_sub(1)),
            synced,
            screen: &mut self.screen,
            caps: &self.caps,
            out: &mut self.out,
        };

        for token in cell.content() {
            pen.replay(token);
        }
        if pen.col >= width {
            pen.line_feed();
        }

        cell.end = Position::new(pen.screen.to_virtual(pen.row), pen.col);
        pen.synced
    }
}

/// The simulated cursor while one cell is replayed.
///
/// Rows are physical. A negative row is above the window: output there is
/// suppressed and the physical cursor is re-synchronised with an absolute
/// move before the next visible write.
struct Pen<'a> {
    row: i64,
    col: u16,
    indent: u16,
    synced: bool,
    screen: &'a mut Screen,
    caps: &'a CapabilityTable,
    out: &'a mut OutputBuffer,
}

impl Pen<'_> {
    const fn visible(&self) -> bool {
        self.row >= 0
    }

    fn last_row(&self) -> i64 {
        i64::from(self.screen.height()) - 1
    }

    fn last_col(&self) -> u16 {
        self.screen.width().saturating_sub(1)
    }

    /// Make the physical cursor match the simulated one.
    fn sync(&mut self) {
        if !self.synced {
            let col = self.col.min(self.last_col());
            self.out.cursor_move(self.caps, self.row, col);
            self.synced = true;
        }
    }

    /// Write position-dependent bytes, or drop them above the window.
    fn emit(&mut self, bytes: &[u8]) {
        if self.visible() {
            self.sync();
            self.out.write_raw(bytes);
        }
    }

    fn line_feed(&mut self) {
        if self.visible() {
            self.sync();
            self.out.newline();
        } else {
            self.synced = false;
        }
        self.row += 1;
        self.col = 0;
        let overflow = self.row - self.last_row();
        if overflow > 0 {
            self.screen.scroll_by(overflow);
            self.row -= overflow;
        }
    }

    fn replay(&mut self, token: &Token) {
        match token {
            Token::Text(text) => self.text(text),
            Token::Csi(seq) => self.csi(seq),
            Token::CarriageReturnLineFeed => {
                if self.visible() && self.col < self.screen.width() {
                    self.sync();
                    self.out.capability(self.caps, Capability::ClearToEol, &[]);
                }
                self.line_feed();
            }
            Token::Backspace => {
                if self.col > 0 {
                    self.emit(b"\x08");
                    self.col = self.col.min(self.last_col()).saturating_sub(1);
                }
            }
            Token::CarriageReturn => {
                self.emit(b"\r");
                self.col = 0;
            }
            Token::StartOfHeading => self.emit(b"\x01"),
            Token::StartOfText => self.emit(b"\x02"),
        }
    }

    fn text(&mut self, text: &str) {
        let width = self.screen.width();
        for grapheme in text.graphemes(true) {
            let cols = u16::try_from(grapheme.width()).unwrap_or(u16::MAX);
            if cols > 0 && self.col.saturating_add(cols) > width {
                self.line_feed();
            }
            if self.col < self.indent {
                if self.visible() {
                    self.sync();
                    self.out.spaces(usize::from(self.indent - self.col));
                }
                self.col = self.indent;
            }
            self.emit(grapheme.as_bytes());
            self.col = self.col.saturating_add(cols);
        }
    }

    fn csi(&mut self, seq: &CsiSeq) {
        if !seq.is_plain() || seq.command == b'm' {
            // Modes and colours do not depend on the cursor position.
            self.out.write_raw(&seq.raw);
            return;
        }
        let was_visible = self.visible();
        self.emit(&seq.raw);

        let n = i64::from(seq.param_or(0, 1));
        let m = i64::from(seq.param_or(1, 1));
        let last_row = self.last_row();
        let last_col = i64::from(self.last_col());
        let col = i64::from(self.col.min(self.last_col()));
        match seq.command {
            b'A' => self.row = self.clamp_up(self.row - n),
            b'B' => self.row = (self.row + n).min(last_row),
            b'C' => self.set_col((col + n).min(last_col)),
            b'D' => self.set_col((col - n).max(0)),
            b'E' => {
                self.row = (self.row + n).min(last_row);
                self.col = 0;
            }
            b'F' => {
                self.row = self.clamp_up(self.row - n);
                self.col = 0;
            }
            b'G' => self.set_col((n - 1).min(last_col)),
            b'H' | b'f' => {
                self.row = (n - 1).min(last_row);
                self.set_col((m - 1).min(last_col));
            }
            // The cursor keeps its virtual row while the page moves under it.
            b'S' if was_visible => {
                self.screen.scroll_by(n);
                self.row = (self.row - n).clamp(0, last_row);
            }
            b'T' if was_visible => {
                self.screen.scroll_by(-n);
                self.row = (self.row + n).clamp(0, last_row);
            }
            b's' => {
                let virtual_row = self.screen.to_virtual(self.row);
                self.screen.save_cursor(Position::new(virtual_row, self.col));
            }
            b'u' => {
                if let Some(saved) = self.screen.saved_cursor() {
                    self.row = self.screen.to_physical(saved.row).min(last_row);
                    self.col = saved.col.min(self.last_col());
                }
            }
            _ => {}
        }
        if !was_visible {
            self.synced = false;
        }
    }

    /// Upward motion stops at the top edge, except above the window where
    /// the edge is unknown.
    fn clamp_up(&self, row: i64) -> i64 {
        if self.visible() {
            row.max(0)
        } else {
            row
        }
    }

    fn set_col(&mut self, col: i64) {
        self.col = u16::try_from(col.max(0)).unwrap_or(u16::MAX);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellId;
    use crate::token::Tokenizer;

    struct Harness {
        store: CellStore,
        renderer: Renderer,
        written: Vec<u8>,
    }

    impl Harness {
        fn new(width: u16, height: u16) -> Self {
            let mut store = CellStore::new();
            store.insert(Cell::anchor(Position::ORIGIN));
            Self {
                store,
                renderer: Renderer::new(TerminalSize::new(width, height), CapabilityTable::ansi()),
                written: Vec::new(),
            }
        }

        fn output(&mut self, text: &str, float: u32) -> CellId {
            let tokens = Tokenizer::default().tokenize(text.as_bytes());
            let cell = Cell::new(tokens, text.as_bytes().to_vec()).with_float(float);
            let (id, index) = self.store.insert(cell);
            if index + 1 == self.store.len() {
                self.renderer.append(&mut self.store, index);
            } else {
                self.renderer.render_from(&mut self.store, index, false);
            }
            self.renderer.flush_to(&mut self.written).unwrap();
            id
        }

        fn cell(&self, id: CellId) -> &Cell {
            self.store.get(id).unwrap()
        }
    }

    #[test]
    fn test_exact_wrap_at_width() {
        let mut h = Harness::new(10, 5);
        let id = h.output(&"a".repeat(10), 0);
        assert_eq!(h.cell(id).end, Position::new(1, 0));
        assert_eq!(h.renderer.screen().scroll(), 1);
    }

    #[test]
    fn test_one_short_of_width_does_not_wrap() {
        let mut h = Harness::new(10, 5);
        let id = h.output(&"a".repeat(9), 0);
        assert_eq!(h.cell(id).end, Position::new(0, 9));
        assert_eq!(h.renderer.screen().scroll(), 0);
    }

    #[test]
    fn test_adjacent_cells_share_a_line() {
        let mut h = Harness::new(80, 25);
        let first = h.output("hello", 0);
        let second = h.output(" world", 0);
        assert_eq!(h.cell(first).end, Position::new(0, 5));
        assert_eq!(h.cell(second).start, Position::new(0, 5));
        assert_eq!(h.cell(second).end, Position::new(0, 11));
    }

    #[test]
    fn test_lines_advance_rows() {
        let mut h = Harness::new(80, 25);
        let first = h.output("line1\n", 0);
        let second = h.output("line2\n", 0);
        assert_eq!(h.cell(first).start, Position::new(0, 0));
        assert_eq!(h.cell(first).end, Position::new(1, 0));
        assert_eq!(h.cell(second).start, Position::new(1, 0));
        assert_eq!(h.cell(second).end, Position::new(2, 0));
    }

    #[test]
    fn test_newline_clears_rest_of_line() {
        let mut h = Harness::new(80, 25);
        h.output("ab\n", 0);
        assert_eq!(h.written, b"ab\x1b[K\r\n");
    }

    #[test]
    fn test_wide_graphemes_wrap_early() {
        let mut h = Harness::new(5, 5);
        let id = h.output("abcd日", 0);
        assert_eq!(h.cell(id).end, Position::new(1, 2));
    }

    #[test]
    fn test_indent_pads_wrapped_lines() {
        let mut h = Harness::new(6, 5);
        let tokens = Tokenizer::default().tokenize(b"abcdefgh");
        let cell = Cell::new(tokens, b"abcdefgh".to_vec()).with_indent(2);
        let (id, index) = h.store.insert(cell);
        h.renderer.append(&mut h.store, index);
        h.renderer.flush_to(&mut h.written).unwrap();
        assert_eq!(h.written, b"  abcd\r\n  efgh\r\n");
        assert_eq!(h.cell(id).end, Position::new(2, 0));
    }

    #[test]
    fn test_cursor_motion_is_tracked() {
        let mut h = Harness::new(80, 25);
        let id = h.output("abcdef\x1b[3Dx\x1b[10G", 0);
        assert_eq!(h.cell(id).end, Position::new(0, 9));

        let up = h.output("\x1b[2A", 0);
        assert_eq!(h.cell(up).end, Position::new(-2, 9));
    }

    #[test]
    fn test_motion_is_clamped_to_screen() {
        let mut h = Harness::new(20, 5);
        let id = h.output("\x1b[99B\x1b[99C", 0);
        assert_eq!(h.cell(id).end, Position::new(0, 19));
        let home = h.output("\x1b[H", 0);
        assert_eq!(h.cell(home).end, Position::new(-4, 0));
    }

    #[test]
    fn test_save_and_restore_cursor() {
        let mut h = Harness::new(80, 25);
        let id = h.output("ab\x1b[scd\x1b[u", 0);
        assert_eq!(h.cell(id).end, Position::new(0, 2));
    }

    #[test]
    fn test_scroll_up_moves_offset() {
        let mut h = Harness::new(80, 25);
        let id = h.output("\x1b[3S", 0);
        assert_eq!(h.renderer.screen().scroll(), 3);
        assert_eq!(h.cell(id).end, Position::new(0, 0));
    }

    #[test]
    fn test_scroll_down_moves_offset() {
        let mut h = Harness::new(80, 25);
        let id = h.output("\x1b[H\x1b[2T", 0);
        assert_eq!(h.renderer.screen().scroll(), -2);
        assert_eq!(h.cell(id).end, Position::new(-24, 0));
    }

    #[test]
    fn test_scroll_keeps_row_inside_window() {
        let mut h = Harness::new(80, 25);
        let id = h.output("\x1b[H\x1b[5S", 0);
        assert_eq!(h.renderer.screen().scroll(), 5);
        // Physical row 0 cannot move further up.
        assert_eq!(h.cell(id).end, Position::new(-19, 0));
    }

    #[test]
    fn test_private_sequences_do_not_move() {
        let mut h = Harness::new(80, 25);
        let id = h.output("ab\x1b[?25l\x1b[31mc", 0);
        assert_eq!(h.cell(id).end, Position::new(0, 3));
    }

    #[test]
    fn test_backspace_and_carriage_return() {
        let mut h = Harness::new(80, 25);
        let id = h.output("abc\x08\x08", 0);
        assert_eq!(h.cell(id).end, Position::new(0, 1));
        let cr = h.output("xyz\r", 0);
        assert_eq!(h.cell(cr).end, Position::new(0, 0));
    }

    #[test]
    fn test_floating_cell_rerenders_below_new_output() {
        let mut h = Harness::new(80, 25);
        let status = h.output("[status]", 5);
        let log = h.output("log line\n", 0);
        assert_eq!(h.cell(log).start, Position::new(0, 0));
        assert_eq!(h.cell(status).start, Position::new(1, 0));
        assert_eq!(h.cell(status).end, Position::new(1, 8));
    }

    #[test]
    fn test_unchanged_suffix_stops_early() {
        let mut h = Harness::new(80, 25);
        let a = h.output("aaa\n", 0);
        h.output("bbb\n", 0);
        let before = h.renderer.stats().cells_rendered;
        let index = h.store.index_of(a).unwrap();
        h.renderer.render_from(&mut h.store, index, false);
        // The cell after `a` still starts where `a` ends.
        assert_eq!(h.renderer.stats().cells_rendered, before + 1);
    }

    #[test]
    fn test_redraw_starts_at_straddling_cell() {
        let mut h = Harness::new(10, 3);
        h.output("old\n", 0);
        let tall = h.output("1\n2\n3\n4\n", 0);
        h.output("tail", 0);
        assert!(h.renderer.screen().to_physical(h.cell(tall).start.row) < 0);
        assert!(h.renderer.screen().to_physical(h.cell(tall).end.row) >= 0);

        let before = h.renderer.stats().cells_rendered;
        let end_before = h.cell(tall).end;
        h.written.clear();
        h.renderer.redraw(&mut h.store);
        h.renderer.flush_to(&mut h.written).unwrap();

        assert_eq!(h.renderer.stats().cells_rendered, before + 2);
        assert_eq!(h.cell(tall).end, end_before);
        // Rows above the window are skipped; drawing resumes with an absolute move.
        assert!(h.written.starts_with(b"\x1b[1;1H3"));
    }
}
