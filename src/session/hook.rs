//! Panic hook that hands the terminal back before the message prints.

use super::controller::{Shared, TeardownMode};
use std::panic;
use std::ptr;
use std::sync::{Mutex, Once, PoisonError, TryLockError, Weak};

static INSTALL: Once = Once::new();

/// The session the hook tears down. Empty between sessions.
static SESSION: Mutex<Weak<Shared>> = Mutex::new(Weak::new());

/// Point the hook at `session`, chaining it in front of the current hook
/// the first time.
///
/// The hook tears the registered session down (at most once) and then
/// defers to whatever hook was installed before it.
pub(crate) fn install(session: Weak<Shared>) {
    *SESSION.lock().unwrap_or_else(PoisonError::into_inner) = session;
    INSTALL.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            // Never block here: the panic may have struck while the slot was held.
            let current = match SESSION.try_lock() {
                Ok(slot) => slot.upgrade(),
                Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().upgrade(),
                Err(TryLockError::WouldBlock) => None,
            };
            if let Some(shared) = current {
                shared.teardown(TeardownMode::Panic);
            }
            previous(info);
        }));
    });
}

/// Forget `shared` if it is the registered session.
pub(crate) fn release(shared: &Shared) {
    let mut slot = SESSION.lock().unwrap_or_else(PoisonError::into_inner);
    if ptr::eq(slot.as_ptr(), shared) {
        *slot = Weak::new();
    }
}
