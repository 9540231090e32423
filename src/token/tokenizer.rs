//! Tokenizer: Byte classification into [`Token`]s.

use super::csi::parse_csi;
use super::Token;

const ESC: u8 = 0x1b;

/// Longest CSI body we hold back from a chunk boundary.
const MAX_PENDING_CSI: usize = 64;

/// Classifies output bytes into tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tokenizer {
    utf8: bool,
}

impl Tokenizer {
    /// Create a tokenizer. With `utf8` off, every byte above 0x7e is escaped.
    pub const fn new(utf8: bool) -> Self {
        Self { utf8 }
    }

    /// Whether multi-byte UTF-8 runs are decoded.
    pub const fn utf8(&self) -> bool {
        self.utf8
    }

    /// Iterate over the tokens of `buf`.
    pub const fn tokens<'a>(&self, buf: &'a [u8]) -> Tokens<'a> {
        Tokens {
            buf,
            pos: 0,
            utf8: self.utf8,
            pending: None,
        }
    }

    /// Collect the tokens of `buf`.
    pub fn tokenize(&self, buf: &[u8]) -> Vec<Token> {
        self.tokens(buf).collect()
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Iterator over the tokens of one buffer. Adjacent text is merged.
#[derive(Debug)]
pub struct Tokens<'a> {
    buf: &'a [u8],
    pos: usize,
    utf8: bool,
    pending: Option<Token>,
}

impl Tokens<'_> {
    /// Decode one token at the current position, without merging.
    fn next_raw(&mut self) -> Option<Token> {
        let buf = self.buf;
        let i = self.pos;
        let c = *buf.get(i)?;

        let (token, next) = match c {
            0x20..=0x7e => (Token::Text(char::from(c).to_string()), i + 1),
            0x80..=0xff if self.utf8 => match utf8_run(buf, i) {
                Some((text, next)) => (Token::Text(text.to_owned()), next),
                None => (hex_escape(c), i + 1),
            },
            ESC if buf.get(i + 1) == Some(&b'[') => match parse_csi(buf, i, i + 2) {
                Some((seq, next)) => (Token::Csi(seq), next),
                None => (hex_escape(c), i + 1),
            },
            0x01 => (Token::StartOfHeading, i + 1),
            0x02 => (Token::StartOfText, i + 1),
            0x08 => (Token::Backspace, i + 1),
            b'\t' => (Token::Text("    ".to_owned()), i + 1),
            b'\n' => (Token::CarriageReturnLineFeed, i + 1),
            b'\r' if buf.get(i + 1) == Some(&b'\n') => (Token::CarriageReturnLineFeed, i + 2),
            b'\r' => (Token::CarriageReturn, i + 1),
            _ => (hex_escape(c), i + 1),
        };

        self.pos = next;
        Some(token)
    }
}

impl Iterator for Tokens<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let mut token = self.pending.take().or_else(|| self.next_raw())?;
        if let Token::Text(text) = &mut token {
            loop {
                match self.next_raw() {
                    Some(Token::Text(more)) => text.push_str(&more),
                    other => {
                        self.pending = other;
                        break;
                    }
                }
            }
        }
        Some(token)
    }
}

fn hex_escape(byte: u8) -> Token {
    Token::Text(format!("\\x{byte:02x}"))
}

/// Sequence length announced by a UTF-8 lead byte.
const fn utf8_len(lead: u8) -> Option<usize> {
    if lead & 0b1110_0000 == 0b1100_0000 {
        Some(2)
    } else if lead & 0b1111_0000 == 0b1110_0000 {
        Some(3)
    } else if lead & 0b1111_1000 == 0b1111_0000 {
        Some(4)
    } else if lead & 0b1111_1100 == 0b1111_1000 {
        Some(5)
    } else if lead & 0b1111_1110 == 0b1111_1100 {
        Some(6)
    } else {
        None
    }
}

/// Decode the UTF-8 run starting at `i`. Five and six byte forms are not
/// valid Unicode and never decode.
fn utf8_run(buf: &[u8], i: usize) -> Option<(&str, usize)> {
    let end = i + utf8_len(buf[i])?;
    let bytes = buf.get(i..end)?;
    let text = std::str::from_utf8(bytes).ok()?;
    Some((text, end))
}

/// Number of trailing bytes of `buf` that start an unfinished UTF-8 run or
/// CSI sequence.
///
/// Callers feeding the tokenizer from a stream hold these bytes back and
/// prepend them to the next chunk instead of escaping half a character.
pub fn incomplete_tail(buf: &[u8], utf8: bool) -> usize {
    if utf8 {
        let window = buf.len().saturating_sub(5);
        for i in (window..buf.len()).rev() {
            if buf[i] & 0b1100_0000 == 0b1000_0000 {
                continue;
            }
            if let Some(len) = utf8_len(buf[i]) {
                if buf.len() - i < len {
                    return buf.len() - i;
                }
            }
            break;
        }
    }

    if buf.last() == Some(&ESC) {
        return 1;
    }
    let window = buf.len().saturating_sub(MAX_PENDING_CSI);
    if let Some(esc) = buf[window..].iter().rposition(|&b| b == ESC) {
        let esc = window + esc;
        let body = &buf[esc + 1..];
        if body.first() == Some(&b'[') && !body[1..].iter().any(|b| (0x40..=0x7f).contains(b)) {
            return buf.len() - esc;
        }
    }
    0
}
