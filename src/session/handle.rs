//! Handles to cells owned by a session.

use super::controller::Shared;
use crate::cell::{CellId, Position};
use std::sync::{Arc, Weak};

/// A reference to one cell.
///
/// Handles never keep the session alive. Once the cell is deleted or evicted,
/// or the session is gone, every operation is a silent no-op.
#[derive(Debug, Clone, Default)]
pub struct Handle {
    inner: Option<(Weak<Shared>, CellId)>,
}

impl Handle {
    pub(crate) fn new(session: &Arc<Shared>, id: CellId) -> Self {
        Self {
            inner: Some((Arc::downgrade(session), id)),
        }
    }

    /// A handle that refers to nothing, as returned by a stub session.
    pub const fn inert() -> Self {
        Self { inner: None }
    }

    /// The cell id, if this handle ever referred to a cell.
    pub fn id(&self) -> Option<CellId> {
        self.inner.as_ref().map(|(_, id)| *id)
    }

    fn with<R>(&self, f: impl FnOnce(&Shared, CellId) -> R) -> Option<R> {
        let (session, id) = self.inner.as_ref()?;
        let shared = session.upgrade()?;
        Some(f(&shared, *id))
    }

    /// Replace the cell's content and re-render what moved.
    pub fn update(&self, text: impl AsRef<[u8]>) {
        self.with(|shared, id| shared.update(id, text.as_ref()));
    }

    /// Make the cell's content final.
    pub fn freeze(&self) {
        self.with(|shared, id| shared.freeze(id));
    }

    /// Erase the cell from the screen and stop tracking it.
    pub fn delete(&self) {
        self.with(|shared, id| shared.delete(id));
    }

    /// Whether the cell is still tracked by an active session.
    pub fn is_live(&self) -> bool {
        self.with(|shared, id| shared.is_active() && shared.bounds(id).is_some())
            .unwrap_or(false)
    }

    /// Where the cell begins, in virtual coordinates.
    pub fn start(&self) -> Option<Position> {
        self.with(|shared, id| shared.bounds(id).map(|(start, _)| start))
            .flatten()
    }

    /// Where the cell ended after its last render.
    pub fn end(&self) -> Option<Position> {
        self.with(|shared, id| shared.bounds(id).map(|(_, end)| end))
            .flatten()
    }
}
