//! Session configuration.

use std::env;
use std::time::Duration;

/// Environment variable that keeps a session from taking over the terminal.
///
/// Set it when running inside another program that already manages the
/// terminal (a REPL, an outer session).
pub const DISABLE_ENV: &str = "CELLTERM_DISABLE";

/// Configuration for a [`Session`](super::Session).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Decode multi-byte UTF-8 in output. When off, bytes above 0x7e are
    /// shown as `\xHH`.
    pub utf8: bool,
    /// Terminal type used to pick capability strings.
    pub term: Option<String>,
    /// Never take over the terminal; always produce the stub session.
    pub disabled: bool,
    /// Route stdout/stderr through the session as frozen cells.
    ///
    /// A `tracing` subscriber writing to stdout or stderr is captured too,
    /// and the engine's own events about drawing that output would feed
    /// back into it. Send logs to a file, or turn capture off.
    pub capture_std_streams: bool,
    /// Restore the terminal before a panic message is printed.
    pub install_panic_hook: bool,
    /// React to resize, suspend and resume signals.
    pub handle_signals: bool,
    /// How often pending signals are checked.
    pub signal_poll_interval: Duration,
    /// How long to wait for the cursor position report.
    pub handshake_timeout: Duration,
    /// Frozen cells further than this many rows behind the scroll offset
    /// are forgotten.
    pub eviction_distance: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            utf8: true,
            term: Some("xterm".to_string()),
            disabled: false,
            capture_std_streams: true,
            install_panic_hook: true,
            handle_signals: true,
            signal_poll_interval: Duration::from_millis(20),
            handshake_timeout: Duration::from_secs(2),
            eviction_distance: 200,
        }
    }
}

impl SessionConfig {
    /// Defaults adjusted from the process environment: `TERM`, the locale
    /// variables and [`DISABLE_ENV`].
    pub fn from_env() -> Self {
        let var = |name: &str| env::var(name).ok();
        Self {
            utf8: locale_is_utf8(var("LC_ALL"), var("LC_MESSAGES"), var("LANG")),
            term: var("TERM"),
            disabled: var(DISABLE_ENV).is_some_and(|v| !v.is_empty() && v != "0"),
            ..Self::default()
        }
    }

    /// Set the UTF-8 mode.
    pub const fn with_utf8(mut self, utf8: bool) -> Self {
        self.utf8 = utf8;
        self
    }

    /// Enable or disable standard stream capture.
    pub const fn with_capture(mut self, capture: bool) -> Self {
        self.capture_std_streams = capture;
        self
    }

    /// Set the eviction distance.
    pub const fn with_eviction_distance(mut self, rows: i64) -> Self {
        self.eviction_distance = rows;
        self
    }
}

/// Whether the effective locale uses UTF-8.
///
/// The first non-empty of `LC_ALL`, `LC_MESSAGES`, `LANG` decides.
pub fn locale_is_utf8(lc_all: Option<String>, lc_messages: Option<String>, lang: Option<String>) -> bool {
    [lc_all, lc_messages, lang]
        .into_iter()
        .flatten()
        .find(|v| !v.is_empty())
        .is_some_and(|v| {
            let v = v.to_ascii_lowercase();
            v.contains("utf-8") || v.contains("utf8")
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Option<String> {
        Some(v.to_string())
    }

    #[test]
    fn test_locale_precedence() {
        assert!(locale_is_utf8(None, None, s("en_US.UTF-8")));
        assert!(!locale_is_utf8(s("C"), None, s("en_US.UTF-8")));
        assert!(locale_is_utf8(s(""), s("de_DE.utf8"), s("C")));
        assert!(!locale_is_utf8(None, None, None));
    }

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.eviction_distance, 200);
        assert!(config.capture_std_streams);
        assert!(!config.disabled);
    }
}
