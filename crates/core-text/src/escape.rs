//! Escape-sequence boundary scanning shared by the codec, the width helpers
//! and the render crate.
//!
//! Two notions of "sequence" exist and callers pick the one they need:
//! * [`zero_width_len`] follows the measurement rule: `ESC [` runs through the
//!   first final byte in `@`..=`~`; a bare `ESC` not followed by `[` is a single
//!   zero-width byte and whatever follows it is ordinary text.
//! * [`sequence_len`] follows the pass-through rule used when copying bytes:
//!   CSI as above, a 3-byte designator (`ESC (`, `ESC )`, `ESC *`, `ESC +`,
//!   `ESC #` plus one byte) or a 2-byte `ESC X` otherwise. Only bytes in
//!   `0x20..=0x7E` join a non-CSI escape; a control or high byte after `ESC`
//!   leaves a lone 1-byte `ESC` and is ordinary input again.
//!
//! [`zero_width_len`] only ever stops on ASCII bytes, so it never splits a
//! UTF-8 scalar. [`sequence_len`] can, inside an unterminated CSI that runs
//! over a multi-byte character; callers working on `&str` must not slice there.

pub const ESC: u8 = 0x1b;
pub const CSI_INTRODUCER: u8 = b'[';

/// True for bytes that end a CSI sequence.
#[inline]
pub fn is_csi_final(b: u8) -> bool {
    (0x40..=0x7e).contains(&b)
}

/// Index just past the final byte of the CSI sequence starting at `at`
/// (`bytes[at] == ESC`, `bytes[at + 1] == '['`). An unterminated sequence runs
/// to the end of the input.
pub fn csi_end(bytes: &[u8], at: usize) -> usize {
    let mut i = at + 2;
    while i < bytes.len() {
        if is_csi_final(bytes[i]) {
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

/// Byte length of the zero-width run starting at `at` under the measurement
/// rule. Returns 0 when `bytes[at]` is not `ESC`.
pub fn zero_width_len(bytes: &[u8], at: usize) -> usize {
    if bytes.get(at) != Some(&ESC) {
        return 0;
    }
    if bytes.get(at + 1) == Some(&CSI_INTRODUCER) {
        csi_end(bytes, at) - at
    } else {
        1
    }
}

/// Byte length of the escape sequence starting at `at` under the pass-through
/// rule. Returns 0 when `bytes[at]` is not `ESC`.
pub fn sequence_len(bytes: &[u8], at: usize) -> usize {
    if bytes.get(at) != Some(&ESC) {
        return 0;
    }
    match bytes.get(at + 1) {
        Some(&CSI_INTRODUCER) => csi_end(bytes, at) - at,
        Some(b'(' | b')' | b'*' | b'+' | b'#') => {
            if bytes.get(at + 2).is_some_and(is_escape_byte) {
                3
            } else {
                2
            }
        }
        Some(b) if is_escape_byte(b) => 2,
        _ => 1,
    }
}

#[inline]
fn is_escape_byte(b: &u8) -> bool {
    (0x20..=0x7e).contains(b)
}

/// One piece of styled text: either an escape run or a visible character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Piece<'a> {
    Escape(&'a str),
    Char(char),
}

/// Iterate `text` as escape runs (measurement rule) and visible characters.
pub fn pieces(text: &str) -> Pieces<'_> {
    Pieces { text, pos: 0 }
}

pub struct Pieces<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Iterator for Pieces<'a> {
    type Item = Piece<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = &self.text[self.pos..];
        let first = rest.chars().next()?;
        let skip = zero_width_len(self.text.as_bytes(), self.pos);
        if skip > 0 {
            let run = &self.text[self.pos..self.pos + skip];
            self.pos += skip;
            return Some(Piece::Escape(run));
        }
        self.pos += first.len_utf8();
        Some(Piece::Char(first))
    }
}
