//! Cell store: Generation-checked arena plus the on-screen order.

use super::Position;
use crate::token::Token;
use std::collections::VecDeque;

/// Stable identifier of a cell.
///
/// The generation is bumped whenever a slot is released, so an id held
/// after its cell is gone never resolves to a newer cell in the same slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct CellId {
    index: u32,
    generation: u32,
}

/// A block of output occupying a contiguous run of virtual rows.
#[derive(Debug, Clone)]
pub struct Cell {
    /// Where the cell begins. Equal to the previous cell's end.
    pub start: Position,
    /// Where the cell ended after its last render.
    pub end: Position,
    /// Content can no longer change.
    pub frozen: bool,
    /// Placement priority; 0 means the cell does not float.
    pub float: u32,
    /// Minimum column for wrapped continuation lines.
    pub indent: u16,
    content: Vec<Token>,
    raw: Vec<u8>,
}

impl Cell {
    /// Create a cell from tokenized content and the bytes it came from.
    pub fn new(content: Vec<Token>, raw: Vec<u8>) -> Self {
        Self {
            start: Position::ORIGIN,
            end: Position::ORIGIN,
            frozen: false,
            float: 0,
            indent: 0,
            content,
            raw,
        }
    }

    /// An empty frozen cell marking where output begins.
    pub fn anchor(at: Position) -> Self {
        let mut cell = Self::new(Vec::new(), Vec::new());
        cell.start = at;
        cell.end = at;
        cell.frozen = true;
        cell
    }

    /// Set the float priority.
    pub const fn with_float(mut self, float: u32) -> Self {
        self.float = float;
        self
    }

    /// Mark the cell frozen.
    pub const fn with_frozen(mut self, frozen: bool) -> Self {
        self.frozen = frozen;
        self
    }

    /// Set the continuation indent.
    pub const fn with_indent(mut self, indent: u16) -> Self {
        self.indent = indent;
        self
    }

    /// The tokens drawn for this cell.
    pub fn content(&self) -> &[Token] {
        &self.content
    }

    /// The bytes the content was parsed from.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Whether the cell draws nothing.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    cell: Option<Cell>,
}

/// All tracked cells, in on-screen order.
#[derive(Debug, Default)]
pub struct CellStore {
    slots: Vec<Slot>,
    free: Vec<u32>,
    order: VecDeque<CellId>,
}

impl CellStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cells on screen (or scrolled off but still tracked).
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no cell is tracked.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Look a cell up by id.
    pub fn get(&self, id: CellId) -> Option<&Cell> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.cell.as_ref())
    }

    /// Look a cell up by id, mutably.
    pub fn get_mut(&mut self, id: CellId) -> Option<&mut Cell> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.cell.as_mut())
    }

    /// On-screen index of a cell.
    pub fn index_of(&self, id: CellId) -> Option<usize> {
        self.get(id)?;
        self.order.iter().position(|&other| other == id)
    }

    /// The cell at an on-screen index.
    pub fn at(&self, index: usize) -> Option<&Cell> {
        self.get(*self.order.get(index)?)
    }

    /// The cell at an on-screen index, mutably.
    pub fn at_mut(&mut self, index: usize) -> Option<&mut Cell> {
        let id = *self.order.get(index)?;
        self.get_mut(id)
    }

    /// The id of the cell at an on-screen index.
    pub fn id_at(&self, index: usize) -> Option<CellId> {
        self.order.get(index).copied()
    }

    /// The last cell in on-screen order.
    pub fn last(&self) -> Option<&Cell> {
        self.at(self.order.len().checked_sub(1)?)
    }

    /// Cells in on-screen order.
    pub fn iter(&self) -> impl Iterator<Item = &Cell> + '_ {
        self.order.iter().filter_map(|&id| self.get(id))
    }

    /// Insert a cell by float priority.
    ///
    /// The cell lands right after the last cell whose float is not greater
    /// than its own, so higher floats stay below newer ordinary output and
    /// equal floats keep arrival order. It starts where that cell ends. If
    /// every cell floats higher, the new cell goes first and takes over the
    /// first cell's start.
    ///
    /// Returns the new id and its on-screen index.
    pub fn insert(&mut self, mut cell: Cell) -> (CellId, usize) {
        let after = (0..self.order.len())
            .rev()
            .find(|&i| self.at(i).is_some_and(|c| c.float <= cell.float));
        let (index, start) = match after {
            Some(i) => (i + 1, self.at(i).map(|c| c.end)),
            None => (0, self.at(0).map(|c| c.start)),
        };
        if let Some(start) = start {
            cell.start = start;
        }
        cell.end = cell.start;

        let id = self.alloc(cell);
        self.order.insert(index, id);
        (id, index)
    }

    /// Replace a live, unfrozen cell's content.
    ///
    /// Returns the index from which the screen must be re-rendered, or `None`
    /// when the cell is gone, frozen, or `raw` matches what it already holds.
    pub fn update(&mut self, id: CellId, content: Vec<Token>, raw: Vec<u8>) -> Option<usize> {
        let cell = self.get_mut(id)?;
        if cell.frozen || cell.raw == raw {
            return None;
        }
        cell.content = content;
        cell.raw = raw;
        self.index_of(id)
    }

    /// Freeze a cell. It stops floating, and is dropped if it is empty.
    ///
    /// Returns whether the cell was found.
    pub fn freeze(&mut self, id: CellId) -> bool {
        let Some(cell) = self.get_mut(id) else {
            return false;
        };
        cell.frozen = true;
        cell.float = 0;
        if cell.is_empty() {
            self.remove(id);
        }
        true
    }

    /// Freeze every cell, keeping empty ones in place.
    pub fn freeze_all(&mut self) {
        for slot in &mut self.slots {
            if let Some(cell) = slot.cell.as_mut() {
                cell.frozen = true;
                cell.float = 0;
            }
        }
    }

    /// Drop frozen cells from the front that start more than `distance`
    /// rows behind `scroll`. At least one cell is always kept, and an
    /// unfrozen cell stops the sweep.
    ///
    /// Returns the number of cells dropped.
    pub fn evict(&mut self, scroll: i64, distance: i64) -> usize {
        let mut dropped = 0;
        while self.order.len() > 1 {
            let Some(front) = self.at(0) else { break };
            if !front.frozen || scroll - front.start.row <= distance {
                break;
            }
            if let Some(id) = self.order.front().copied() {
                self.remove(id);
                dropped += 1;
            }
        }
        dropped
    }

    fn alloc(&mut self, cell: Cell) -> CellId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.cell = Some(cell);
            CellId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
            self.slots.push(Slot {
                generation: 0,
                cell: Some(cell),
            });
            CellId {
                index,
                generation: 0,
            }
        }
    }

    fn remove(&mut self, id: CellId) {
        if let Some(pos) = self.order.iter().position(|&other| other == id) {
            self.order.remove(pos);
        }
        if let Some(slot) = self.slots.get_mut(id.index as usize) {
            if slot.generation == id.generation && slot.cell.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(id.index);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Tokenizer;

    fn text_cell(s: &str) -> Cell {
        Cell::new(Tokenizer::default().tokenize(s.as_bytes()), s.as_bytes().to_vec())
    }

    fn seeded() -> (CellStore, CellId) {
        let mut store = CellStore::new();
        let (id, _) = store.insert(Cell::anchor(Position::ORIGIN));
        (store, id)
    }

    #[test]
    fn test_float_ordering() {
        let (mut store, seed) = seeded();
        let (a, _) = store.insert(text_cell("a"));
        let (b, _) = store.insert(text_cell("b"));
        let (pinned, _) = store.insert(text_cell("status").with_float(5));
        let (c, index) = store.insert(text_cell("c"));

        assert_eq!(index, 3);
        let order: Vec<CellId> = (0..store.len()).filter_map(|i| store.id_at(i)).collect();
        assert_eq!(order, vec![seed, a, b, c, pinned]);
    }

    #[test]
    fn test_equal_floats_keep_arrival_order() {
        let (mut store, _) = seeded();
        let (first, _) = store.insert(text_cell("one").with_float(3));
        let (second, index) = store.insert(text_cell("two").with_float(3));
        assert_eq!(index, 2);
        assert_eq!(store.index_of(first), Some(1));
        assert_eq!(store.index_of(second), Some(2));
    }

    #[test]
    fn test_insert_takes_predecessor_end() {
        let (mut store, seed) = seeded();
        store.get_mut(seed).unwrap().end = Position::new(4, 7);
        let (id, _) = store.insert(text_cell("x"));
        assert_eq!(store.get(id).unwrap().start, Position::new(4, 7));
    }

    #[test]
    fn test_insert_below_every_float() {
        let mut store = CellStore::new();
        let mut pinned = text_cell("status").with_float(5);
        pinned.start = Position::new(9, 0);
        let (pinned, _) = store.insert(pinned);
        store.get_mut(pinned).unwrap().start = Position::new(9, 0);
        let (plain, index) = store.insert(text_cell("log"));
        assert_eq!(index, 0);
        assert_eq!(store.get(plain).unwrap().start, Position::new(9, 0));
    }

    #[test]
    fn test_update_short_circuits() {
        let (mut store, _) = seeded();
        let (id, _) = store.insert(text_cell("x"));
        let tokens = Tokenizer::default().tokenize(b"y");
        assert_eq!(store.update(id, tokens.clone(), b"y".to_vec()), Some(1));
        assert_eq!(store.update(id, tokens, b"y".to_vec()), None);
    }

    #[test]
    fn test_frozen_cells_reject_updates() {
        let (mut store, _) = seeded();
        let (id, _) = store.insert(text_cell("x"));
        assert!(store.freeze(id));
        let tokens = Tokenizer::default().tokenize(b"y");
        assert_eq!(store.update(id, tokens, b"y".to_vec()), None);
        assert_eq!(store.get(id).unwrap().raw(), b"x");
    }

    #[test]
    fn test_freeze_drops_float_and_empty_cells() {
        let (mut store, _) = seeded();
        let (pinned, _) = store.insert(text_cell("s").with_float(7));
        let (empty, _) = store.insert(text_cell(""));
        assert!(store.freeze(pinned));
        assert_eq!(store.get(pinned).unwrap().float, 0);
        assert!(store.freeze(empty));
        assert!(store.get(empty).is_none());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_stale_ids_never_resolve() {
        let (mut store, _) = seeded();
        let (old, _) = store.insert(text_cell(""));
        store.freeze(old);
        let (new, _) = store.insert(text_cell("reuses the slot"));
        assert_ne!(old, new);
        assert!(store.get(old).is_none());
        assert!(!store.freeze(old));
        assert!(store.get(new).is_some());
    }

    #[test]
    fn test_evict_respects_distance_and_frozen() {
        let mut store = CellStore::new();
        let (first, _) = store.insert(text_cell("a").with_frozen(true));
        let (live, _) = store.insert(text_cell("b"));
        store.get_mut(live).unwrap().start = Position::new(1, 0);
        let (last, _) = store.insert(text_cell("c").with_frozen(true));
        store.get_mut(last).unwrap().start = Position::new(2, 0);

        assert_eq!(store.evict(200, 200), 0);
        assert_eq!(store.evict(201, 200), 1);
        assert!(store.get(first).is_none());

        assert_eq!(store.evict(10_000, 200), 0);
        assert!(store.get(live).is_some());

        store.freeze(live);
        assert_eq!(store.evict(10_000, 200), 1);
        assert_eq!(store.len(), 1);
        assert!(store.get(last).is_some());
    }
}
