//! Standard stream capture.
//!
//! While a session owns the terminal, anything the program prints through
//! stdout or stderr has to go through the cell store, or it would land on
//! top of floating cells. The descriptors are pointed at a pipe whose reader
//! thread hands every chunk to a sink.

use crate::error::{Error, Result};
use crate::token::incomplete_tail;
use crossterm::tty::IsTty;
use nix::unistd::dup2;
use std::fs::File;
use std::io::{self, Read, Write};
use std::os::fd::{AsFd, AsRawFd, OwnedFd, RawFd};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const STDOUT_FD: RawFd = 1;
const STDERR_FD: RawFd = 2;

/// Redirected stdout/stderr and the thread draining them.
pub struct StreamCapture {
    saved_stdout: Option<OwnedFd>,
    saved_stderr: Option<OwnedFd>,
    reader: Mutex<Option<JoinHandle<()>>>,
    restored: AtomicBool,
}

impl StreamCapture {
    /// Redirect whichever of stdout and stderr is a terminal.
    ///
    /// `sink` receives captured bytes, with unfinished UTF-8 runs and escape
    /// sequences held back until the rest arrives.
    pub fn start<F>(utf8: bool, sink: F) -> Result<Self>
    where
        F: FnMut(&[u8]) + Send + 'static,
    {
        let stdout = io::stdout();
        let stderr = io::stderr();
        let capture_out = stdout.is_tty();
        let capture_err = stderr.is_tty();
        if !capture_out && !capture_err {
            return Err(Error::NotATerminal);
        }

        let _ = stdout.lock().flush();
        let saved_stdout = capture_out
            .then(|| stdout.as_fd().try_clone_to_owned())
            .transpose()?;
        let saved_stderr = capture_err
            .then(|| stderr.as_fd().try_clone_to_owned())
            .transpose()?;

        let (read_end, write_end) = nix::unistd::pipe().map_err(Error::Os)?;
        let mut capture = Self {
            saved_stdout,
            saved_stderr,
            reader: Mutex::new(None),
            restored: AtomicBool::new(false),
        };
        for (saved, target) in [
            (&capture.saved_stdout, STDOUT_FD),
            (&capture.saved_stderr, STDERR_FD),
        ] {
            if saved.is_some() {
                if let Err(e) = dup2(write_end.as_raw_fd(), target) {
                    capture.restore();
                    return Err(Error::Os(e));
                }
            }
        }
        drop(write_end);

        let spawned = thread::Builder::new()
            .name("cellterm-capture".to_string())
            .spawn(move || Self::run_loop(File::from(read_end), utf8, sink));
        match spawned {
            Ok(handle) => {
                capture.reader = Mutex::new(Some(handle));
                Ok(capture)
            }
            Err(e) => {
                capture.restore();
                Err(e.into())
            }
        }
    }

    /// Point stdout and stderr back at the terminal. Runs once.
    ///
    /// The reader thread sees end-of-file once every write end is closed and
    /// forwards whatever was still buffered.
    pub fn restore(&self) {
        if self.restored.swap(true, Ordering::SeqCst) {
            return;
        }
        for (saved, target) in [
            (&self.saved_stdout, STDOUT_FD),
            (&self.saved_stderr, STDERR_FD),
        ] {
            if let Some(fd) = saved {
                if let Err(e) = dup2(fd.as_raw_fd(), target) {
                    tracing::warn!(target, error = %e, "failed to restore standard stream");
                }
            }
        }
    }

    /// Wait up to `timeout` for the reader thread, unless called from it.
    ///
    /// A child process that inherited the pipe keeps it open; in that case
    /// the reader is left to finish on its own.
    pub fn join(&self, timeout: Duration) {
        let handle = self
            .reader
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        let Some(handle) = handle else { return };
        if handle.thread().id() == thread::current().id() {
            return;
        }
        let deadline = Instant::now() + timeout;
        while !handle.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        if handle.is_finished() {
            let _ = handle.join();
        } else {
            tracing::debug!("stream capture still draining, detaching reader");
        }
    }

    fn run_loop<F: FnMut(&[u8])>(mut pipe: File, utf8: bool, mut sink: F) {
        let mut chunk = [0u8; 4096];
        let mut pending: Vec<u8> = Vec::new();
        loop {
            match pipe.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    pending.extend_from_slice(&chunk[..n]);
                    let keep = incomplete_tail(&pending, utf8);
                    let ready = pending.len() - keep;
                    if ready > 0 {
                        sink(&pending[..ready]);
                        pending.drain(..ready);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    tracing::warn!(error = %e, "stream capture read failed");
                    break;
                }
            }
        }
        if !pending.is_empty() {
            sink(&pending);
        }
        tracing::debug!("stream capture finished");
    }
}

impl Drop for StreamCapture {
    fn drop(&mut self) {
        self.restore();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn test_reader_holds_back_partial_sequences() {
        let (read_end, write_end) = nix::unistd::pipe().unwrap();
        let (tx, rx) = unbounded();
        let reader = thread::spawn(move || {
            StreamCapture::run_loop(File::from(read_end), true, move |chunk: &[u8]| {
                tx.send(chunk.to_vec()).unwrap();
            });
        });
        let timeout = Duration::from_secs(1);
        let mut writer = File::from(write_end);

        writer.write_all(b"ab\xc3").unwrap();
        assert_eq!(rx.recv_timeout(timeout).unwrap(), b"ab");
        writer.write_all(b"\xa9\x1b[3").unwrap();
        assert_eq!(rx.recv_timeout(timeout).unwrap(), "é".as_bytes());
        drop(writer);
        assert_eq!(rx.recv_timeout(timeout).unwrap(), b"\x1b[3");
        reader.join().unwrap();
    }
}
