//! Token module: Decoding raw output bytes into typed terminal events.
//!
//! This module contains:
//! - [`Token`]: One event the renderer knows how to replay
//! - [`CsiSeq`]: A parsed `ESC [` control sequence
//! - [`Tokenizer`]: The byte classifier producing a [`Tokens`] iterator
//!
//! Tokenizing never fails. Bytes that do not form a recognised event are
//! turned into a visible `\xHH` escape so nothing is silently dropped.

mod csi;
mod tokenizer;

pub use csi::CsiSeq;
pub use tokenizer::{incomplete_tail, Tokenizer, Tokens};

/// A single event decoded from an output buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A run of printable text. Adjacent runs are always merged.
    Text(String),
    /// A control sequence introduced by `ESC [`.
    Csi(CsiSeq),
    /// `\n` or `\r\n`.
    CarriageReturnLineFeed,
    /// `\x08`.
    Backspace,
    /// A `\r` not followed by `\n`.
    CarriageReturn,
    /// `\x01`, passed through untouched (readline prompt markers).
    StartOfHeading,
    /// `\x02`, passed through untouched.
    StartOfText,
}
