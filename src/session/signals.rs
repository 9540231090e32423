//! Signal Watcher: Resize and job-control signals, handled off the handler.
//!
//! Signal handlers only set bits in a static word. A named watcher thread
//! polls that word on a crossbeam ticker and hands whatever accumulated to
//! the session, where locks and terminal writes are allowed.

use crate::error::{Error, Result};
use bitflags::bitflags;
use crossbeam_channel::{bounded, select, tick, Receiver, Sender};
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use std::os::raw::c_int;
use std::sync::atomic::{AtomicU8, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

bitflags! {
    /// Signals received since the watcher last looked.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PendingSignals: u8 {
        /// `SIGWINCH`: the window changed size.
        const RESIZE = 1 << 0;
        /// `SIGTSTP`: the user asked to stop the job.
        const SUSPEND = 1 << 1;
        /// `SIGCONT`: the job was continued.
        const RESUME = 1 << 2;
    }
}

static PENDING: AtomicU8 = AtomicU8::new(0);

fn record(flags: PendingSignals) {
    PENDING.fetch_or(flags.bits(), Ordering::SeqCst);
}

/// Take and clear everything recorded so far.
pub fn take_pending() -> PendingSignals {
    PendingSignals::from_bits_truncate(PENDING.swap(0, Ordering::SeqCst))
}

extern "C" fn on_winch(_: c_int) {
    record(PendingSignals::RESIZE);
}

extern "C" fn on_tstp(_: c_int) {
    record(PendingSignals::SUSPEND);
}

extern "C" fn on_cont(_: c_int) {
    record(PendingSignals::RESUME);
}

/// Installed handlers and the dispositions they replaced.
pub struct SignalHandlers {
    previous: Vec<(Signal, SigAction)>,
}

impl SignalHandlers {
    /// Install the resize, stop and continue handlers.
    ///
    /// If any installation fails, the ones already installed are undone.
    pub fn install() -> Result<Self> {
        let table: [(Signal, extern "C" fn(c_int)); 3] = [
            (Signal::SIGWINCH, on_winch),
            (Signal::SIGTSTP, on_tstp),
            (Signal::SIGCONT, on_cont),
        ];
        let mut handlers = Self {
            previous: Vec::with_capacity(table.len()),
        };
        for (signal, handler) in table {
            let action = SigAction::new(
                SigHandler::Handler(handler),
                SaFlags::SA_RESTART,
                SigSet::empty(),
            );
            // SAFETY: the handler only performs an atomic fetch_or, which is
            // async-signal-safe.
            #[allow(unsafe_code)]
            let installed = unsafe { sigaction(signal, &action) };
            match installed {
                Ok(old) => handlers.previous.push((signal, old)),
                Err(e) => {
                    handlers.uninstall();
                    return Err(Error::Os(e));
                }
            }
        }
        Ok(handlers)
    }

    /// Put the previous dispositions back. Safe to call more than once.
    pub fn uninstall(&mut self) {
        for (signal, old) in self.previous.drain(..).rev() {
            // SAFETY: `old` was returned by sigaction for this signal.
            #[allow(unsafe_code)]
            let restored = unsafe { sigaction(signal, &old) };
            if let Err(e) = restored {
                tracing::warn!(?signal, error = %e, "failed to restore signal disposition");
            }
        }
    }
}

impl Drop for SignalHandlers {
    fn drop(&mut self) {
        self.uninstall();
    }
}

/// Thread that delivers pending signals to a dispatch function.
pub struct SignalWatcher {
    /// Handle to the watcher thread.
    handle: Option<JoinHandle<()>>,
    /// Dropping the sender tells the watcher to stop.
    shutdown: Option<Sender<()>>,
}

impl SignalWatcher {
    /// Spawn the watcher.
    ///
    /// `dispatch` runs on the watcher thread whenever signals are pending.
    /// Returning `false` stops the watcher.
    pub fn spawn<F>(interval: Duration, dispatch: F) -> Result<Self>
    where
        F: FnMut(PendingSignals) -> bool + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = bounded(1);
        let handle = thread::Builder::new()
            .name("cellterm-signals".to_string())
            .spawn(move || Self::run_loop(&shutdown_rx, interval, dispatch))?;
        Ok(Self {
            handle: Some(handle),
            shutdown: Some(shutdown_tx),
        })
    }

    /// Signal the watcher to stop.
    pub fn shutdown(&mut self) {
        self.shutdown.take();
    }

    /// Stop the watcher and wait for it, unless called from the watcher.
    pub fn join(&mut self) {
        self.shutdown();
        if let Some(handle) = self.handle.take() {
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }

    fn run_loop<F>(shutdown: &Receiver<()>, interval: Duration, mut dispatch: F)
    where
        F: FnMut(PendingSignals) -> bool,
    {
        let ticker = tick(interval);
        loop {
            select! {
                recv(shutdown) -> _ => break,
                recv(ticker) -> _ => {
                    let pending = take_pending();
                    if !pending.is_empty() && !dispatch(pending) {
                        break;
                    }
                }
            }
        }
        tracing::debug!("signal watcher stopped");
    }
}

impl Drop for SignalWatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}
