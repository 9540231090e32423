//! CSI sequence parsing.

/// Maximum number of numeric parameters kept per sequence.
pub const MAX_PARAMS: usize = 16;

/// A parsed `ESC [ ... final` control sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsiSeq {
    /// Final byte (0x40-0x7f), the command.
    pub command: u8,
    /// Intermediate byte (0x20-0x2f), if any.
    pub intermediate: Option<u8>,
    /// Private marker (`<`, `=`, `>`, `?`) directly after `[`, if any.
    pub private: Option<u8>,
    /// Parameters in order. An empty slot is `None`, not zero.
    pub params: Vec<Option<u32>>,
    /// The full sequence including `ESC [` and the final byte.
    pub raw: Vec<u8>,
}

impl CsiSeq {
    /// Whether this is a plain sequence (no private marker, no intermediate).
    ///
    /// Only plain sequences move the simulated cursor.
    pub const fn is_plain(&self) -> bool {
        self.private.is_none() && self.intermediate.is_none()
    }

    /// The `index`th parameter, with absent or zero values read as `default`.
    pub fn param_or(&self, index: usize, default: u32) -> u32 {
        match self.params.get(index).copied().flatten() {
            Some(0) | None => default,
            Some(n) => n,
        }
    }
}

/// Parse a CSI sequence whose body starts at `offset` (just past `ESC [`).
///
/// `start` is the index of the `ESC` byte. Returns the sequence and the index
/// one past its final byte, or `None` when the buffer ends before a final
/// byte appears.
pub fn parse_csi(buf: &[u8], start: usize, offset: usize) -> Option<(CsiSeq, usize)> {
    let end = offset + buf.get(offset..)?.iter().position(|b| (0x40..=0x7f).contains(b))?;

    let mut i = offset;
    let mut private = None;
    if matches!(buf.get(i), Some(b'<'..=b'?')) {
        private = Some(buf[i]);
        i += 1;
    }

    let mut params: Vec<Option<u32>> = Vec::new();
    let mut intermediate = None;
    let mut in_num = false;
    while i < end {
        let c = buf[i];
        match c {
            b'0'..=b'9' => {
                let digit = u32::from(c - b'0');
                if in_num {
                    if let Some(Some(n)) = params.last_mut() {
                        *n = n.saturating_mul(10).saturating_add(digit);
                    }
                } else {
                    if params.len() == MAX_PARAMS {
                        break;
                    }
                    params.push(Some(digit));
                    in_num = true;
                }
            }
            b';' => {
                if !in_num {
                    if params.len() == MAX_PARAMS {
                        break;
                    }
                    params.push(None);
                }
                in_num = false;
            }
            0x20..=0x2f => {
                intermediate = Some(c);
                break;
            }
            _ => {}
        }
        i += 1;
    }

    let seq = CsiSeq {
        command: buf[end],
        intermediate,
        private,
        params,
        raw: buf[start..=end].to_vec(),
    };
    Some((seq, end + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &[u8]) -> Option<CsiSeq> {
        let mut buf = b"\x1b[".to_vec();
        buf.extend_from_slice(body);
        parse_csi(&buf, 0, 2).map(|(seq, _)| seq)
    }

    #[test]
    fn test_params_with_gaps() {
        let seq = parse(b";5H").unwrap();
        assert_eq!(seq.command, b'H');
        assert_eq!(seq.params, vec![None, Some(5)]);
        assert_eq!(seq.param_or(0, 1), 1);
        assert_eq!(seq.param_or(1, 1), 5);
        assert_eq!(seq.raw, b"\x1b[;5H");
    }

    #[test]
    fn test_private_marker() {
        let seq = parse(b"?25l").unwrap();
        assert_eq!(seq.private, Some(b'?'));
        assert_eq!(seq.params, vec![Some(25)]);
        assert!(!seq.is_plain());
    }

    #[test]
    fn test_intermediate_byte() {
        let seq = parse(b"2 q").unwrap();
        assert_eq!(seq.command, b'q');
        assert_eq!(seq.intermediate, Some(b' '));
        assert_eq!(seq.params, vec![Some(2)]);
    }

    #[test]
    fn test_parameter_cap() {
        let body: Vec<u8> = std::iter::repeat(b"1;".as_slice())
            .take(20)
            .flatten()
            .copied()
            .chain(*b"m")
            .collect();
        let seq = parse(&body).unwrap();
        assert_eq!(seq.params.len(), MAX_PARAMS);
        assert_eq!(seq.command, b'm');
    }

    #[test]
    fn test_missing_final_byte() {
        assert!(parse(b"12;3").is_none());
    }

    #[test]
    fn test_huge_parameter_saturates() {
        let seq = parse(b"99999999999999A").unwrap();
        assert_eq!(seq.params, vec![Some(u32::MAX)]);
    }
}
