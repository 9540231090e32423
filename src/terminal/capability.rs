//! Capability table: The few terminal strings the engine needs.
//!
//! Templates use the terminfo parameter language, restricted to what these
//! capabilities actually use: `%i` (one-based first two parameters),
//! `%p1`..`%p9` (push parameter), `%d` (pop and print decimal) and `%%`.

use std::fmt::Write as _;

/// A symbolic terminal capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Make the cursor invisible (`civis`).
    HideCursor,
    /// Make the cursor visible again (`cnorm`).
    ShowCursor,
    /// Enter keypad transmit mode (`smkx`).
    KeypadOn,
    /// Leave keypad transmit mode (`rmkx`).
    KeypadOff,
    /// Move to an absolute zero-based row and column (`cup`).
    CursorAddress,
    /// Clear to end of line (`el`).
    ClearToEol,
    /// Clear to end of screen (`ed`).
    ClearToEos,
    /// Ask the terminal to report the cursor position (`u7`).
    QueryCursor,
}

impl Capability {
    /// The terminfo name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::HideCursor => "civis",
            Self::ShowCursor => "cnorm",
            Self::KeypadOn => "smkx",
            Self::KeypadOff => "rmkx",
            Self::CursorAddress => "cup",
            Self::ClearToEol => "el",
            Self::ClearToEos => "ed",
            Self::QueryCursor => "u7",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

/// Cached capability strings for one terminal type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityTable {
    entries: [Option<&'static str>; 8],
}

impl CapabilityTable {
    /// The ANSI/xterm strings, shared by every mainstream emulator.
    pub const fn ansi() -> Self {
        Self {
            entries: [
                Some("\x1b[?25l"),
                Some("\x1b[?25h"),
                Some("\x1b[?1h\x1b="),
                Some("\x1b[?1l\x1b>"),
                Some("\x1b[%i%p1%d;%p2%dH"),
                Some("\x1b[K"),
                Some("\x1b[J"),
                Some("\x1b[6n"),
            ],
        }
    }

    /// A table with no capabilities at all.
    pub const fn empty() -> Self {
        Self { entries: [None; 8] }
    }

    /// Build the table for a `TERM` value.
    ///
    /// `dumb`, `unknown` and an unset type have no capabilities; the linux
    /// console has no keypad transmit mode. Everything else speaks ANSI.
    pub fn for_term(term: Option<&str>) -> Self {
        match term.map(str::trim) {
            None | Some("" | "dumb" | "unknown") => Self::empty(),
            Some(name) if name.starts_with("linux") => {
                let mut table = Self::ansi();
                table.entries[Capability::KeypadOn.index()] = None;
                table.entries[Capability::KeypadOff.index()] = None;
                table
            }
            Some(_) => Self::ansi(),
        }
    }

    /// The raw template, if the terminal has the capability.
    pub fn get(&self, cap: Capability) -> Option<&'static str> {
        self.entries[cap.index()]
    }

    /// Whether the capability is present.
    pub fn has(&self, cap: Capability) -> bool {
        self.get(cap).is_some()
    }

    /// Format a capability with numeric parameters into `out`.
    ///
    /// Returns `false` (writing nothing) if the capability is missing.
    pub fn format_into(&self, cap: Capability, params: &[i64], out: &mut String) -> bool {
        match self.get(cap) {
            Some(template) => {
                expand(template, params, out);
                true
            }
            None => false,
        }
    }

    /// Format a capability with numeric parameters.
    pub fn format(&self, cap: Capability, params: &[i64]) -> Option<String> {
        let mut out = String::new();
        self.format_into(cap, params, &mut out).then_some(out)
    }
}

impl Default for CapabilityTable {
    fn default() -> Self {
        Self::ansi()
    }
}

/// Expand a parameterised template.
fn expand(template: &str, params: &[i64], out: &mut String) {
    let mut args = [0i64; 9];
    for (slot, value) in args.iter_mut().zip(params) {
        *slot = *value;
    }
    let mut stack: Vec<i64> = Vec::new();
    let mut chars = template.chars();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('%') => out.push('%'),
            Some('i') => {
                args[0] += 1;
                args[1] += 1;
            }
            Some('p') => {
                if let Some(n) = chars.next().and_then(|d| d.to_digit(10)) {
                    let n = n as usize;
                    if (1..=9).contains(&n) {
                        stack.push(args[n - 1]);
                    }
                }
            }
            Some('d') => {
                let value = stack.pop().unwrap_or(0);
                let _ = write!(out, "{value}");
            }
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }
}
