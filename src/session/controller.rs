//! Session Controller: Terminal ownership from setup to teardown.
//!
//! A [`Session`] is a cheap clonable reference to shared state: the
//! [`Engine`] behind a mutex, the lifecycle word, resize callbacks, and
//! (for a session attached to a real terminal) the OS resources that must be
//! given back at the end. The last clone to go away tears the session down.

use super::config::SessionConfig;
use super::engine::{Engine, OutputOptions};
use super::handle::Handle;
use super::hook;
use super::signals::{PendingSignals, SignalHandlers, SignalWatcher};
use crate::cell::{CellId, Position};
use crate::error::{Error, Result};
use crate::render::RenderStats;
use crate::terminal::capture::StreamCapture;
use crate::terminal::tty::Tty;
use crate::terminal::{Capability, CapabilityTable, OutputBuffer, TerminalSize};
use crate::token::Tokenizer;
use nix::sys::signal::{kill, Signal};
use nix::unistd::getpid;
use std::fs::File;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::time::Duration;

/// How long teardown waits for captured output to drain.
const CAPTURE_DRAIN_TIMEOUT: Duration = Duration::from_millis(100);

const RESTORE_CAPS: [Capability; 2] = [Capability::ShowCursor, Capability::KeypadOff];
const RAW_CAPS: [Capability; 2] = [Capability::HideCursor, Capability::KeypadOn];

/// Set while an OS-attached session exists in this process.
static CLAIMED: AtomicBool = AtomicBool::new(false);

/// Ownership of the process-wide terminal slot.
struct Claim;

impl Claim {
    fn acquire() -> Result<Self> {
        CLAIMED
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| Self)
            .map_err(|_| Error::AlreadyActive)
    }
}

impl Drop for Claim {
    fn drop(&mut self) {
        CLAIMED.store(false, Ordering::SeqCst);
    }
}

/// Where a session is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Lifecycle {
    /// Never attached (the stub session).
    Uninitialized = 0,
    /// Drawing.
    Active = 1,
    /// The terminal was handed back for a job-control stop.
    Suspended = 2,
    /// Finished for good.
    TornDown = 3,
}

impl Lifecycle {
    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Active,
            2 => Self::Suspended,
            3 => Self::TornDown,
            _ => Self::Uninitialized,
        }
    }
}

struct LifecycleCell(AtomicU8);

impl LifecycleCell {
    const fn new(state: Lifecycle) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    fn get(&self) -> Lifecycle {
        Lifecycle::from_u8(self.0.load(Ordering::SeqCst))
    }

    fn transition(&self, from: Lifecycle, to: Lifecycle) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Move to `TornDown`. Returns `true` only for the first caller.
    fn finish(&self) -> bool {
        self.0.swap(Lifecycle::TornDown as u8, Ordering::SeqCst) != Lifecycle::TornDown as u8
    }
}

/// Which teardown path is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TeardownMode {
    /// `close`, or the last session dropped.
    Normal,
    /// From the panic hook: never block on the engine lock.
    Panic,
}

type ResizeCallback = Arc<dyn Fn(&Session) + Send + Sync>;

/// Resources held only by a session attached to a real terminal.
struct OsBinding {
    tty: Tty,
    caps: CapabilityTable,
    handlers: Mutex<Option<SignalHandlers>>,
    watcher: Mutex<Option<SignalWatcher>>,
    capture: Mutex<Option<StreamCapture>>,
    claim: Mutex<Option<Claim>>,
}

/// State shared by every clone of a session and its handles.
pub(crate) struct Shared {
    engine: Mutex<Engine>,
    lifecycle: LifecycleCell,
    callbacks: Mutex<Vec<ResizeCallback>>,
    os: Option<OsBinding>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Show the cursor, leave keypad mode and restore the saved attributes.
fn restore_terminal(tty: &Tty, caps: &CapabilityTable, with_caps: bool) {
    if with_caps {
        let mut out = OutputBuffer::new();
        for cap in RESTORE_CAPS {
            out.capability(caps, cap, &[]);
        }
        match tty.writer() {
            Ok(mut writer) => {
                if let Err(e) = out.flush_to(&mut writer) {
                    tracing::warn!(error = %e, "failed to show cursor and leave keypad mode");
                }
            }
            Err(e) => tracing::warn!(error = %e, "could not reopen terminal for restore"),
        }
    }
    if let Err(e) = tty.restore() {
        tracing::warn!(error = %e, "failed to restore terminal attributes");
    }
}

impl Shared {
    fn engine(&self) -> MutexGuard<'_, Engine> {
        lock(&self.engine)
    }

    fn lifecycle(&self) -> Lifecycle {
        self.lifecycle.get()
    }

    pub(crate) fn is_active(&self) -> bool {
        matches!(self.lifecycle(), Lifecycle::Active | Lifecycle::Suspended)
    }

    fn output(&self, bytes: &[u8], options: OutputOptions) -> Option<CellId> {
        if !self.is_active() {
            return None;
        }
        Some(self.engine().output(bytes, options))
    }

    pub(crate) fn update(&self, id: CellId, bytes: &[u8]) {
        if self.is_active() {
            self.engine().update(id, bytes);
        }
    }

    pub(crate) fn freeze(&self, id: CellId) {
        if self.is_active() {
            self.engine().freeze(id);
        }
    }

    pub(crate) fn delete(&self, id: CellId) {
        if self.is_active() {
            self.engine().delete(id);
        }
    }

    pub(crate) fn bounds(&self, id: CellId) -> Option<(Position, Position)> {
        self.engine().cell(id).map(|cell| (cell.start, cell.end))
    }

    /// Bytes read from the redirected standard streams.
    fn captured(&self, bytes: &[u8]) {
        let mut engine = self.engine();
        if self.is_active() {
            engine.output(bytes, OutputOptions::new().frozen());
        } else {
            engine.write_through(bytes);
        }
    }

    fn dispatch(self: &Arc<Self>, pending: PendingSignals) {
        tracing::trace!(?pending, "dispatching signals");
        if pending.contains(PendingSignals::SUSPEND) {
            self.suspend();
        }
        if pending.contains(PendingSignals::RESUME) {
            self.resume();
        }
        if pending.contains(PendingSignals::RESIZE) {
            match Tty::size() {
                Ok(size) => self.handle_resize(size),
                Err(e) => tracing::warn!(error = %e, "could not read window size"),
            }
        }
    }

    fn suspend(&self) {
        let Some(os) = &self.os else { return };
        if !self.lifecycle.transition(Lifecycle::Active, Lifecycle::Suspended) {
            return;
        }
        tracing::debug!("suspending");
        self.engine().send_capabilities(&RESTORE_CAPS);
        restore_terminal(&os.tty, &os.caps, false);
        if let Err(e) = kill(getpid(), Signal::SIGSTOP) {
            tracing::warn!(error = %e, "failed to stop process");
        }
    }

    fn resume(self: &Arc<Self>) {
        let Some(os) = &self.os else { return };
        let resumed = self.lifecycle.transition(Lifecycle::Suspended, Lifecycle::Active);
        if !resumed && self.lifecycle() != Lifecycle::Active {
            return;
        }
        tracing::debug!("resuming");
        if let Err(e) = os.tty.enter_raw() {
            tracing::warn!(error = %e, "failed to re-enter raw mode");
        }
        let size = Tty::size().ok();
        let resized = {
            let mut engine = self.engine();
            engine.send_capabilities(&RAW_CAPS);
            match size {
                Some(size) if size != engine.size() => {
                    engine.resize(size);
                    true
                }
                _ => {
                    engine.redraw();
                    false
                }
            }
        };
        if resized {
            self.notify_resize();
        }
    }

    fn handle_resize(self: &Arc<Self>, size: TerminalSize) {
        if !self.is_active() {
            return;
        }
        let resized = {
            let mut engine = self.engine();
            let changed = engine.size() != size;
            engine.resize(size);
            changed
        };
        if resized {
            self.notify_resize();
        }
    }

    fn notify_resize(self: &Arc<Self>) {
        let callbacks = lock(&self.callbacks).clone();
        if callbacks.is_empty() {
            return;
        }
        let session = Session {
            shared: Some(Arc::clone(self)),
        };
        for callback in &callbacks {
            callback(&session);
        }
    }

    /// Give everything back. Only the first call does anything.
    pub(crate) fn teardown(&self, mode: TeardownMode) {
        if !self.lifecycle.finish() {
            return;
        }
        tracing::debug!(?mode, "tearing down session");

        if let Some(os) = &self.os {
            if let Some(mut handlers) = lock(&os.handlers).take() {
                handlers.uninstall();
            }
            if let Some(watcher) = lock(&os.watcher).as_mut() {
                watcher.shutdown();
            }
            if let Some(capture) = lock(&os.capture).as_ref() {
                capture.restore();
            }
        }

        let engine = match mode {
            TeardownMode::Normal => Some(self.engine()),
            TeardownMode::Panic => match self.engine.try_lock() {
                Ok(guard) => Some(guard),
                Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
                Err(TryLockError::WouldBlock) => None,
            },
        };
        let caps_sent = match engine {
            Some(mut engine) => {
                engine.freeze_all();
                if self.os.is_some() {
                    engine.send_capabilities(&RESTORE_CAPS);
                }
                true
            }
            None => {
                // The panicking thread holds the lock; its cells stay as they are.
                tracing::warn!("engine busy during panic teardown, cells left unfrozen");
                false
            }
        };

        if let Some(os) = &self.os {
            restore_terminal(&os.tty, &os.caps, !caps_sent);
            if let Some(mut watcher) = lock(&os.watcher).take() {
                watcher.join();
            }
            if mode == TeardownMode::Normal {
                if let Some(capture) = lock(&os.capture).as_ref() {
                    capture.join(CAPTURE_DRAIN_TIMEOUT);
                }
            }
            lock(&os.claim).take();
        }
        hook::release(self);
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        self.teardown(TeardownMode::Normal);
    }
}

/// An inline terminal session.
///
/// Clones share the same session. When the session could not attach to a
/// terminal it is a stub: output is discarded and every handle is inert.
#[derive(Clone, Default)]
pub struct Session {
    shared: Option<Arc<Shared>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("lifecycle", &self.lifecycle())
            .field("size", &self.size())
            .finish()
    }
}

impl Session {
    /// Attach to the terminal using the environment's configuration, or
    /// fall back to a stub.
    pub fn open() -> Self {
        Self::open_with(SessionConfig::from_env())
    }

    /// Attach with an explicit configuration, or fall back to a stub.
    pub fn open_with(config: SessionConfig) -> Self {
        match Self::try_open(config) {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, "terminal session unavailable, output is discarded");
                Self::stub()
            }
        }
    }

    /// Attach to the terminal.
    ///
    /// Either every step succeeds or everything already done is undone
    /// before the error is returned.
    pub fn try_open(config: SessionConfig) -> Result<Self> {
        if config.disabled {
            return Err(Error::Disabled);
        }
        let caps = CapabilityTable::for_term(config.term.as_deref());
        if !caps.has(Capability::CursorAddress) || !caps.has(Capability::QueryCursor) {
            return Err(Error::UnsupportedTerminal(config.term.clone().unwrap_or_default()));
        }
        let claim = Claim::acquire()?;
        let tty = Tty::open()?;
        let size = Tty::size()?;
        tty.enter_raw()?;

        let (writer, origin) = match Self::handshake(&tty, &caps, size, &config) {
            Ok(attached) => attached,
            Err(e) => {
                restore_terminal(&tty, &caps, true);
                return Err(e);
            }
        };

        let engine = Engine::new(
            Box::new(writer),
            size,
            origin,
            caps.clone(),
            Tokenizer::new(config.utf8),
            config.eviction_distance,
        );
        let shared = Arc::new(Shared {
            engine: Mutex::new(engine),
            lifecycle: LifecycleCell::new(Lifecycle::Active),
            callbacks: Mutex::new(Vec::new()),
            os: Some(OsBinding {
                tty,
                caps,
                handlers: Mutex::new(None),
                watcher: Mutex::new(None),
                capture: Mutex::new(None),
                claim: Mutex::new(Some(claim)),
            }),
        });
        if let Err(e) = Self::start_services(&shared, &config) {
            shared.teardown(TeardownMode::Normal);
            return Err(e);
        }

        tracing::debug!(
            width = size.width,
            height = size.height,
            ?origin,
            "session attached"
        );
        Ok(Self {
            shared: Some(shared),
        })
    }

    /// Hide the cursor, enable keypad mode and find out where output starts.
    fn handshake(
        tty: &Tty,
        caps: &CapabilityTable,
        size: TerminalSize,
        config: &SessionConfig,
    ) -> Result<(File, Position)> {
        let mut writer = tty.writer()?;
        let mut out = OutputBuffer::new();
        for cap in RAW_CAPS {
            out.capability(caps, cap, &[]);
        }
        out.flush_to(&mut writer)?;

        let (row, col) = tty.query_cursor(caps, config.handshake_timeout)?;
        // The cursor's physical row becomes virtual row `row + 1 - height`,
        // so that scroll offset 0 maps it back to where it is.
        let origin = Position::new(i64::from(row) + 1 - i64::from(size.height), col);
        Ok((writer, origin))
    }

    fn start_services(shared: &Arc<Shared>, config: &SessionConfig) -> Result<()> {
        let Some(os) = &shared.os else {
            return Ok(());
        };

        if config.handle_signals {
            *lock(&os.handlers) = Some(SignalHandlers::install()?);
            let session = Arc::downgrade(shared);
            let watcher = SignalWatcher::spawn(config.signal_poll_interval, move |pending| {
                session.upgrade().is_some_and(|shared| {
                    shared.dispatch(pending);
                    true
                })
            })?;
            *lock(&os.watcher) = Some(watcher);
        }

        if config.capture_std_streams {
            let session = Arc::downgrade(shared);
            let mut fallback = os.tty.writer()?;
            let capture = StreamCapture::start(config.utf8, move |bytes| {
                if let Some(shared) = session.upgrade() {
                    shared.captured(bytes);
                } else {
                    let _ = fallback.write_all(bytes);
                }
            })?;
            *lock(&os.capture) = Some(capture);
        }

        if config.install_panic_hook {
            hook::install(Arc::downgrade(shared));
        }
        Ok(())
    }

    /// A session that draws nothing.
    pub const fn stub() -> Self {
        Self { shared: None }
    }

    /// A session drawing to any writer, without touching the process's
    /// terminal, signals or standard streams.
    ///
    /// `origin` is the virtual position output starts at; with no scrolling,
    /// virtual row `1 - height` is the top line.
    pub fn headless<W>(writer: W, size: TerminalSize, origin: Position, config: &SessionConfig) -> Self
    where
        W: Write + Send + 'static,
    {
        let mut caps = CapabilityTable::for_term(config.term.as_deref());
        if !caps.has(Capability::CursorAddress) {
            caps = CapabilityTable::ansi();
        }
        let engine = Engine::new(
            Box::new(writer),
            size,
            origin,
            caps,
            Tokenizer::new(config.utf8),
            config.eviction_distance,
        );
        Self {
            shared: Some(Arc::new(Shared {
                engine: Mutex::new(engine),
                lifecycle: LifecycleCell::new(Lifecycle::Active),
                callbacks: Mutex::new(Vec::new()),
                os: None,
            })),
        }
    }

    #[cfg(test)]
    pub(crate) const fn shared(&self) -> Option<&Arc<Shared>> {
        self.shared.as_ref()
    }

    /// Where the session is in its life.
    pub fn lifecycle(&self) -> Lifecycle {
        self.shared
            .as_ref()
            .map_or(Lifecycle::Uninitialized, |shared| shared.lifecycle())
    }

    /// Whether output is being drawn.
    pub fn is_available(&self) -> bool {
        self.shared.as_ref().is_some_and(|shared| shared.is_active())
    }

    /// Current terminal size.
    pub fn size(&self) -> TerminalSize {
        self.shared
            .as_ref()
            .map_or(TerminalSize::DEFAULT, |shared| shared.engine().size())
    }

    /// Terminal width in columns.
    pub fn width(&self) -> u16 {
        self.size().width
    }

    /// Terminal height in rows.
    pub fn height(&self) -> u16 {
        self.size().height
    }

    /// Number of cells being tracked.
    pub fn cell_count(&self) -> usize {
        self.shared
            .as_ref()
            .map_or(0, |shared| shared.engine().store().len())
    }

    /// Render statistics.
    pub fn stats(&self) -> RenderStats {
        self.shared
            .as_ref()
            .map(|shared| shared.engine().stats())
            .unwrap_or_default()
    }

    /// Add output as a new cell.
    pub fn output(&self, text: impl AsRef<[u8]>, options: OutputOptions) -> Handle {
        let Some(shared) = &self.shared else {
            return Handle::inert();
        };
        shared
            .output(text.as_ref(), options)
            .map_or_else(Handle::inert, |id| Handle::new(shared, id))
    }

    /// Add output with default options.
    pub fn print(&self, text: impl AsRef<[u8]>) -> Handle {
        self.output(text, OutputOptions::new())
    }

    /// Run `callback` after every resize redraw.
    pub fn on_resize<F>(&self, callback: F)
    where
        F: Fn(&Self) + Send + Sync + 'static,
    {
        if let Some(shared) = &self.shared {
            lock(&shared.callbacks).push(Arc::new(callback));
        }
    }

    /// Adopt a new terminal size, redraw and run resize callbacks.
    ///
    /// Attached sessions do this on their own when the window changes.
    pub fn resize(&self, size: TerminalSize) {
        if let Some(shared) = &self.shared {
            shared.handle_resize(size);
        }
    }

    /// Re-render everything visible.
    pub fn redraw(&self) {
        if let Some(shared) = &self.shared {
            if shared.is_active() {
                shared.engine().redraw();
            }
        }
    }

    /// End the session now: freeze every cell and hand the terminal back.
    pub fn close(&self) {
        if let Some(shared) = &self.shared {
            shared.teardown(TeardownMode::Normal);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::atomic::AtomicU16;
    use std::thread;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn headless(width: u16, height: u16) -> (Session, SharedBuf) {
        headless_with(width, height, &SessionConfig::default())
    }

    fn headless_with(width: u16, height: u16, config: &SessionConfig) -> (Session, SharedBuf) {
        let buf = SharedBuf::default();
        let origin = Position::new(1 - i64::from(height), 0);
        let session = Session::headless(buf.clone(), TerminalSize::new(width, height), origin, config);
        (session, buf)
    }

    fn visible_rows(buf: &SharedBuf, width: u16, height: u16) -> Vec<String> {
        let mut parser = vt100::Parser::new(height, width, 0);
        parser.process(&buf.0.lock().unwrap());
        parser.screen().rows(0, width).collect()
    }

    #[test]
    fn test_stub_session_is_inert() {
        let session = Session::stub();
        assert!(!session.is_available());
        assert_eq!(session.lifecycle(), Lifecycle::Uninitialized);
        assert_eq!((session.width(), session.height()), (80, 25));

        let handle = session.print("ignored");
        handle.update("still ignored");
        handle.freeze();
        handle.delete();
        assert!(!handle.is_live());
        assert_eq!(handle.start(), None);
        assert_eq!(handle.end(), None);
        assert_eq!(session.cell_count(), 0);
    }

    #[test]
    fn test_disabled_and_dumb_terminals_are_refused() {
        let disabled = SessionConfig {
            disabled: true,
            ..SessionConfig::default()
        };
        assert!(matches!(Session::try_open(disabled.clone()), Err(Error::Disabled)));
        assert!(!Session::open_with(disabled).is_available());

        let dumb = SessionConfig {
            term: Some("dumb".to_string()),
            ..SessionConfig::default()
        };
        assert!(matches!(
            Session::try_open(dumb),
            Err(Error::UnsupportedTerminal(term)) if term == "dumb"
        ));
    }

    #[test]
    fn test_print_shows_one_line() {
        let (session, buf) = headless(40, 5);
        session.print("hello");
        let world = session.print(" world");
        assert_eq!(world.end(), Some(Position::new(-4, 11)));
        assert_eq!(visible_rows(&buf, 40, 5)[0], "hello world");
    }

    #[test]
    fn test_line_cells_start_where_previous_ended() {
        let (session, _) = headless(40, 5);
        let first = session.print("line1\n");
        let second = session.print("line2\n");
        assert_eq!(first.start(), Some(Position::new(-4, 0)));
        assert_eq!(first.end(), Some(Position::new(-3, 0)));
        assert_eq!(second.start(), Some(Position::new(-3, 0)));
        assert_eq!(second.end(), Some(Position::new(-2, 0)));
    }

    #[test]
    fn test_handle_lifecycle() {
        let (session, buf) = headless(20, 5);
        let progress = session.output("10%", OutputOptions::new().floating());
        session.print("log\n");
        progress.update("90%");
        assert_eq!(visible_rows(&buf, 20, 5)[..2], ["log", "90%"]);

        progress.freeze();
        progress.update("changed after freeze");
        assert_eq!(visible_rows(&buf, 20, 5)[1], "90%");
        assert!(progress.is_live());

        let temp = session.print("temp");
        temp.delete();
        assert!(!temp.is_live());
        temp.update("no effect");
        assert_eq!(visible_rows(&buf, 20, 5)[1], "90%");
    }

    #[test]
    fn test_close_freezes_and_ignores_further_output() {
        let (session, _) = headless(20, 5);
        let handle = session.print("kept");
        let count = session.cell_count();
        session.close();
        session.close();

        assert_eq!(session.lifecycle(), Lifecycle::TornDown);
        assert!(!session.is_available());
        assert!(!handle.is_live());
        handle.update("ignored");
        assert!(!session.print("ignored").is_live());
        assert_eq!(session.cell_count(), count);
    }

    #[test]
    fn test_dropping_last_clone_ends_session() {
        let (session, _) = headless(20, 5);
        let copy = session.clone();
        let handle = session.print("x");
        drop(session);
        assert!(handle.is_live());
        drop(copy);
        assert!(!handle.is_live());
        handle.update("ignored");
    }

    #[test]
    fn test_resize_callbacks_see_new_size() {
        let (session, _) = headless(20, 5);
        let seen = Arc::new(AtomicU16::new(0));
        let seen_clone = seen.clone();
        session.on_resize(move |session| {
            seen_clone.store(session.width(), Ordering::SeqCst);
        });
        session.print("abcdefghij");

        session.resize(TerminalSize::new(20, 5));
        assert_eq!(seen.load(Ordering::SeqCst), 0);
        session.resize(TerminalSize::new(4, 5));
        assert_eq!(seen.load(Ordering::SeqCst), 4);
        assert_eq!(session.height(), 5);
    }

    #[test]
    fn test_frozen_history_is_forgotten() {
        let config = SessionConfig::default().with_eviction_distance(5);
        let (session, _) = headless_with(20, 3, &config);
        let first = session.output("first\n", OutputOptions::new().frozen());
        for i in 0..20 {
            session.output(format!("line {i}\n"), OutputOptions::new().frozen());
        }
        assert!(!first.is_live());
        assert!(session.cell_count() <= 8);
    }

    #[test]
    fn test_panic_teardown_freezes_every_cell_once() {
        let (session, buf) = headless(20, 5);
        session.output("pinned", OutputOptions::new().floating());
        session.print("plain");
        let shared = session.shared().unwrap();

        shared.teardown(TeardownMode::Panic);
        assert_eq!(session.lifecycle(), Lifecycle::TornDown);
        assert!(shared
            .engine()
            .store()
            .iter()
            .all(|cell| cell.frozen && cell.float == 0));

        let written = buf.0.lock().unwrap().len();
        let count = session.cell_count();
        shared.teardown(TeardownMode::Panic);
        shared.teardown(TeardownMode::Normal);
        assert_eq!(buf.0.lock().unwrap().len(), written);
        assert_eq!(session.cell_count(), count);
    }

    #[test]
    fn test_panic_teardown_does_not_wait_for_busy_engine() {
        let (session, _) = headless(20, 5);
        let pinned = session.output("pinned", OutputOptions::new().floating());
        let shared = session.shared().unwrap();
        let (locked_tx, locked_rx) = crossbeam_channel::bounded(0);
        let (release_tx, release_rx) = crossbeam_channel::bounded::<()>(0);

        thread::scope(|scope| {
            scope.spawn(|| {
                let _engine = shared.engine();
                locked_tx.send(()).unwrap();
                release_rx.recv().unwrap();
            });
            locked_rx.recv().unwrap();
            shared.teardown(TeardownMode::Panic);
            release_tx.send(()).unwrap();
        });

        assert_eq!(session.lifecycle(), Lifecycle::TornDown);
        let id = pinned.id().unwrap();
        assert!(!shared.engine().cell(id).unwrap().frozen);
    }

    #[test]
    fn test_headless_sessions_coexist() {
        let (a, _) = headless(10, 3);
        let (b, _) = headless(10, 3);
        assert!(a.print("a").is_live());
        assert!(b.print("b").is_live());
    }
}
