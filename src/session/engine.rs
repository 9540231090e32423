//! Engine: The cell store and renderer behind one lock.
//!
//! Every session operation ends up here. The engine tokenizes incoming
//! bytes, places cells, decides how much of the screen must be re-rendered
//! and pushes the result to the terminal in a single write.

use crate::cell::{Cell, CellId, CellStore, Position};
use crate::render::{RenderStats, Renderer};
use crate::terminal::{Capability, CapabilityTable, TerminalSize};
use crate::token::Tokenizer;
use std::io::Write;

/// How a new cell is placed and whether it may change later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputOptions {
    /// Keep the cell below newer ordinary output.
    pub float: bool,
    /// Placement priority when floating. Higher floats sit lower.
    pub priority: u32,
    /// The content is final.
    pub frozen: bool,
    /// Minimum column for wrapped continuation lines.
    pub indent: u16,
}

impl OutputOptions {
    /// Priority used by [`OutputOptions::floating`].
    pub const DEFAULT_PRIORITY: u32 = 10;

    /// Plain, updatable, non-floating output.
    pub const fn new() -> Self {
        Self {
            float: false,
            priority: Self::DEFAULT_PRIORITY,
            frozen: false,
            indent: 0,
        }
    }

    /// Float the cell at the current priority.
    pub const fn floating(mut self) -> Self {
        self.float = true;
        self
    }

    /// Float the cell at `priority`. Zero means no floating.
    pub const fn priority(mut self, priority: u32) -> Self {
        self.float = true;
        self.priority = priority;
        self
    }

    /// Make the cell final.
    pub const fn frozen(mut self) -> Self {
        self.frozen = true;
        self
    }

    /// Indent wrapped continuation lines.
    pub const fn indent(mut self, indent: u16) -> Self {
        self.indent = indent;
        self
    }

    /// The float value stored on the cell.
    pub const fn effective_float(&self) -> u32 {
        if self.float && !self.frozen {
            self.priority
        } else {
            0
        }
    }
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Cell bookkeeping plus the terminal writer.
pub struct Engine {
    store: CellStore,
    renderer: Renderer,
    tokenizer: Tokenizer,
    writer: Box<dyn Write + Send>,
    eviction_distance: i64,
}

impl Engine {
    /// Create an engine whose output begins at `origin`.
    ///
    /// The store is seeded with an empty frozen anchor at `origin`, so the
    /// first real cell starts there.
    pub fn new(
        writer: Box<dyn Write + Send>,
        size: TerminalSize,
        origin: Position,
        caps: CapabilityTable,
        tokenizer: Tokenizer,
        eviction_distance: i64,
    ) -> Self {
        let mut store = CellStore::new();
        store.insert(Cell::anchor(origin));
        Self {
            store,
            renderer: Renderer::new(size, caps),
            tokenizer,
            writer,
            eviction_distance,
        }
    }

    /// Current terminal size.
    pub const fn size(&self) -> TerminalSize {
        self.renderer.screen().size()
    }

    /// Render statistics.
    pub const fn stats(&self) -> RenderStats {
        self.renderer.stats()
    }

    /// The cells being tracked.
    pub const fn store(&self) -> &CellStore {
        &self.store
    }

    /// Look up a cell.
    pub fn cell(&self, id: CellId) -> Option<&Cell> {
        self.store.get(id)
    }

    /// Add a cell and draw it.
    pub fn output(&mut self, bytes: &[u8], options: OutputOptions) -> CellId {
        let cell = Cell::new(self.tokenizer.tokenize(bytes), bytes.to_vec())
            .with_float(options.effective_float())
            .with_frozen(options.frozen)
            .with_indent(options.indent);
        let empty = cell.is_empty();
        let (id, index) = self.store.insert(cell);

        if !empty {
            if index + 1 == self.store.len() {
                self.renderer.append(&mut self.store, index);
            } else {
                self.renderer.render_from(&mut self.store, index, false);
            }
            self.flush();
        }
        if options.frozen {
            if empty {
                self.store.freeze(id);
            }
            self.evict();
        }
        id
    }

    /// Replace a cell's content and re-render from it.
    ///
    /// Returns `false` if the cell is gone, frozen, or unchanged.
    pub fn update(&mut self, id: CellId, bytes: &[u8]) -> bool {
        match self.store.get(id) {
            Some(cell) if !cell.frozen && cell.raw() != bytes => {}
            _ => return false,
        }
        let tokens = self.tokenizer.tokenize(bytes);
        let Some(index) = self.store.update(id, tokens, bytes.to_vec()) else {
            return false;
        };
        self.renderer.render_from(&mut self.store, index, false);
        self.flush();
        true
    }

    /// Freeze a cell, then forget old history.
    pub fn freeze(&mut self, id: CellId) -> bool {
        let found = self.store.freeze(id);
        if found {
            self.evict();
        }
        found
    }

    /// Blank a cell and drop it.
    pub fn delete(&mut self, id: CellId) -> bool {
        if self.store.get(id).is_none() {
            return false;
        }
        self.update(id, b"");
        self.freeze(id)
    }

    /// Freeze everything. Used at teardown.
    pub fn freeze_all(&mut self) {
        self.store.freeze_all();
    }

    /// Re-render everything that is visible.
    pub fn redraw(&mut self) {
        self.renderer.redraw(&mut self.store);
        self.flush();
    }

    /// Adopt a new terminal size and redraw.
    pub fn resize(&mut self, size: TerminalSize) {
        if size == self.size() {
            return;
        }
        tracing::debug!(width = size.width, height = size.height, "terminal resized");
        self.renderer.resize(size);
        self.redraw();
    }

    /// Send capability strings straight to the terminal.
    pub fn send_capabilities(&mut self, caps: &[Capability]) {
        for &cap in caps {
            self.renderer.capability(cap);
        }
        self.flush();
    }

    /// Write bytes to the terminal without tracking them.
    pub fn write_through(&mut self, bytes: &[u8]) {
        self.renderer.write_raw(bytes);
        self.flush();
    }

    fn evict(&mut self) {
        let scroll = self.renderer.screen().scroll();
        let dropped = self.store.evict(scroll, self.eviction_distance);
        if dropped > 0 {
            tracing::trace!(dropped, remaining = self.store.len(), "evicted frozen cells");
        }
    }

    fn flush(&mut self) {
        if let Err(e) = self.renderer.flush_to(&mut self.writer) {
            tracing::warn!(error = %e, "terminal write failed");
        }
    }
}
