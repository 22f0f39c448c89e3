//! Cursor and style tracking interpreter.
//!
//! A single left-to-right, non-backtracking scan over raw template bytes.
//! [`Scanner`] cuts the input into [`Token`]s; [`CursorState::apply`] folds each
//! token into the 1-based cursor position and active [`Style`]. The
//! [`Interpreter`] drives both, produces the output stream and records zero-width
//! field markers into a [`FieldTable`].
//!
//! Check order per byte (later checks assume earlier ones consumed their bytes):
//! 1. `ESC`: CSI (`ESC [` ... final) or a short/designator escape.
//! 2. Field markers: `~` + two uppercase letters, `^` + one printable character
//!    (not `^`, not space).
//! 3. C0 controls (CR, LF, TAB, others).
//! 4. Everything else prints and advances one column.
//!
//! A malformed CSI (a byte outside `0x20..=0x7E` before the final byte) ends at
//! that byte: the unambiguous prefix is emitted verbatim and scanning resumes at
//! the offending byte, so the surrounding text is untouched.
//!
//! CR LF and a lone LF produce the same cursor state, so the pair needs no
//! rewriting before the scan.

use ahash::AHashMap;
use core_text::codec::{Target, decode};
use core_text::escape::{CSI_INTRODUCER, ESC, sequence_len};
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::style::Style;

pub const MARKER_PAIR: u8 = b'~';
pub const MARKER_SINGLE: u8 = b'^';
pub const TAB_STOP: usize = 8;

pub type Params = SmallVec<[u16; 8]>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// Complete control sequence. Omitted parameters are recorded as 0.
    Csi {
        params: Params,
        final_byte: u8,
        raw: &'a [u8],
    },
    /// Non-CSI escape, or the unambiguous prefix of a malformed CSI.
    Escape { raw: &'a [u8], malformed: bool },
    /// Zero-width field marker; never reaches the output.
    Marker { code: &'a str, raw: &'a [u8] },
    Control(u8),
    Print(u8),
}

/// Tokenizer over raw bytes. Yields `(offset, token)`.
pub struct Scanner<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn scan_csi(&self, at: usize) -> (Token<'a>, usize) {
        let bytes = self.bytes;
        let mut i = at + 2;
        // DEC private-mode prefix.
        if matches!(bytes.get(i), Some(b'?' | b'=' | b'<' | b'>')) {
            i += 1;
        }
        let mut params = Params::new();
        let mut current: u16 = 0;
        let mut any_param = false;
        while i < bytes.len() {
            let b = bytes[i];
            match b {
                b'0'..=b'9' => {
                    current = current.saturating_mul(10).saturating_add((b - b'0') as u16);
                    any_param = true;
                }
                b';' => {
                    params.push(current);
                    current = 0;
                    any_param = true;
                }
                // Intermediates and stray parameter bytes carry no meaning here.
                0x20..=0x2f | b':' | b'<'..=b'?' => {}
                0x40..=0x7e => {
                    if any_param {
                        params.push(current);
                    }
                    let token = Token::Csi {
                        params,
                        final_byte: b,
                        raw: &bytes[at..=i],
                    };
                    return (token, i + 1);
                }
                _ => {
                    let token = Token::Escape {
                        raw: &bytes[at..i],
                        malformed: true,
                    };
                    return (token, i);
                }
            }
            i += 1;
        }
        let token = Token::Escape {
            raw: &bytes[at..],
            malformed: true,
        };
        (token, bytes.len())
    }

    fn scan_marker(&self, at: usize) -> Option<(Token<'a>, usize)> {
        let bytes = self.bytes;
        let len = match bytes[at] {
            MARKER_PAIR => {
                let pair = bytes.get(at + 1..at + 3)?;
                if !pair.iter().all(u8::is_ascii_uppercase) {
                    return None;
                }
                3
            }
            MARKER_SINGLE => {
                let c = *bytes.get(at + 1)?;
                if !(0x21..=0x7e).contains(&c) || c == MARKER_SINGLE {
                    return None;
                }
                2
            }
            _ => return None,
        };
        let code = std::str::from_utf8(&bytes[at + 1..at + len]).ok()?;
        let token = Token::Marker {
            code,
            raw: &bytes[at..at + len],
        };
        Some((token, at + len))
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = (usize, Token<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        let at = self.pos;
        let b = *self.bytes.get(at)?;
        let (token, next) = if b == ESC {
            if self.bytes.get(at + 1) == Some(&CSI_INTRODUCER) {
                self.scan_csi(at)
            } else {
                let len = sequence_len(self.bytes, at);
                let token = Token::Escape {
                    raw: &self.bytes[at..at + len],
                    malformed: false,
                };
                (token, at + len)
            }
        } else if let Some(found) = self.scan_marker(at) {
            found
        } else if b < 0x20 {
            (Token::Control(b), at + 1)
        } else {
            (Token::Print(b), at + 1)
        };
        self.pos = next;
        Some((at, token))
    }
}

/// 1-based cursor position plus active style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorState {
    pub row: usize,
    pub col: usize,
    pub style: Style,
}

impl Default for CursorState {
    fn default() -> Self {
        Self {
            row: 1,
            col: 1,
            style: Style::default(),
        }
    }
}

/// First parameter, with omitted/0 meaning 1.
fn count_param(params: &[u16], idx: usize) -> usize {
    match params.get(idx) {
        Some(&n) if n > 0 => n as usize,
        _ => 1,
    }
}

impl CursorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    pub fn apply(&mut self, token: &Token<'_>) {
        match token {
            Token::Csi {
                params, final_byte, ..
            } => self.apply_csi(params, *final_byte),
            Token::Control(b'\r') => self.col = 1,
            Token::Control(b'\n') => {
                self.row += 1;
                self.col = 1;
            }
            Token::Control(b'\t') => {
                self.col = ((self.col - 1) / TAB_STOP + 1) * TAB_STOP + 1;
            }
            Token::Print(_) => self.col += 1,
            Token::Control(_) | Token::Escape { .. } | Token::Marker { .. } => {}
        }
    }

    fn apply_csi(&mut self, params: &[u16], final_byte: u8) {
        let n = count_param(params, 0);
        match final_byte {
            b'A' => self.row = self.row.saturating_sub(n).max(1),
            b'B' => self.row += n,
            b'C' => self.col += n,
            b'D' => self.col = self.col.saturating_sub(n).max(1),
            b'E' => {
                self.row += n;
                self.col = 1;
            }
            b'F' => {
                self.row = self.row.saturating_sub(n).max(1);
                self.col = 1;
            }
            b'G' => self.col = n,
            b'd' => self.row = n,
            b'H' | b'f' => {
                self.row = n;
                self.col = count_param(params, 1);
            }
            b'm' => self.style.apply_sgr(params),
            // Recognised, no cursor effect (erase, save/restore, modes, reports).
            _ => {}
        }
    }
}

/// Screen position and restoring style recorded for a field code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub row: usize,
    pub col: usize,
    pub style: String,
}

impl Field {
    pub fn from_state(state: &CursorState) -> Self {
        Self {
            row: state.row,
            col: state.col,
            style: state.style.restore_sequence(),
        }
    }

    /// Absolute cursor-position sequence for this field.
    pub fn goto(&self) -> String {
        format!("\x1b[{};{}H", self.row, self.col)
    }

    /// Position, restore the template's style, then write `value`.
    pub fn overlay(&self, value: &str) -> String {
        let mut s = self.goto();
        s.push_str(&self.style);
        s.push_str(value);
        s
    }
}

/// Field code -> position/style. The first occurrence of a code wins.
#[derive(Debug, Clone, Default)]
pub struct FieldTable {
    entries: AHashMap<String, Field>,
}

impl FieldTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, code: &str) -> Option<&Field> {
        self.entries.get(code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns false when the code was already recorded.
    pub fn record(&mut self, code: &str, field: Field) -> bool {
        if self.entries.contains_key(code) {
            return false;
        }
        self.entries.insert(code.to_string(), field);
        true
    }
}

/// Result of one interpreter pass.
#[derive(Debug, Clone)]
pub struct Interpretation {
    pub output: Vec<u8>,
    pub fields: FieldTable,
    pub cursor: CursorState,
}

impl Interpretation {
    /// Output as text. Exact for [`Target::Utf8`]; legacy bytes are decoded
    /// lossily otherwise.
    pub fn into_text(self) -> String {
        match String::from_utf8(self.output) {
            Ok(s) => s,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Interpreter {
    target: Target,
}

impl Interpreter {
    pub fn new(target: Target) -> Self {
        Self { target }
    }

    pub fn target(&self) -> Target {
        self.target
    }

    fn emit(&self, out: &mut Vec<u8>, raw: &[u8]) {
        match self.target {
            Target::Cp437 => out.extend_from_slice(raw),
            Target::Utf8 => {
                for &b in raw {
                    self.emit_byte(out, b);
                }
            }
        }
    }

    fn emit_byte(&self, out: &mut Vec<u8>, b: u8) {
        if b < 0x80 || self.target == Target::Cp437 {
            out.push(b);
        } else {
            let mut buf = [0u8; 4];
            out.extend_from_slice(decode(b).encode_utf8(&mut buf).as_bytes());
        }
    }

    /// Scan `bytes`, producing output with markers removed and the field table.
    pub fn run(&self, bytes: &[u8]) -> Interpretation {
        let mut output = Vec::with_capacity(bytes.len());
        let mut fields = FieldTable::new();
        let mut cursor = CursorState::new();
        let mut malformed = 0usize;
        for (offset, token) in Scanner::new(bytes) {
            match &token {
                Token::Marker { code, .. } => {
                    fields.record(code, Field::from_state(&cursor));
                }
                Token::Print(b) => self.emit_byte(&mut output, *b),
                Token::Control(b) => output.push(*b),
                Token::Csi { raw, .. } => self.emit(&mut output, raw),
                Token::Escape { raw, malformed: bad } => {
                    if *bad {
                        malformed += 1;
                        debug!(target: "render.interpreter", offset, len = raw.len(), "malformed_csi_recovered");
                    }
                    self.emit(&mut output, raw);
                }
            }
            cursor.apply(&token);
        }
        trace!(
            target: "render.interpreter",
            bytes = bytes.len(),
            fields = fields.len(),
            malformed,
            final_row = cursor.row,
            final_col = cursor.col,
            "interpret_complete"
        );
        Interpretation {
            output,
            fields,
            cursor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_text::width::visible_length;

    fn run(bytes: &[u8]) -> Interpretation {
        Interpreter::new(Target::Utf8).run(bytes)
    }

    #[test]
    fn printable_bytes_advance_column() {
        let r = run(b"abc");
        assert_eq!(r.cursor.position(), (1, 4));
        assert_eq!(r.output, b"abc");
    }

    #[test]
    fn relative_motion_clamps_at_one() {
        let r = run(b"\x1b[5A\x1b[9D");
        assert_eq!(r.cursor.position(), (1, 1));
        let r = run(b"\x1b[3B\x1b[4C\x1b[2D");
        assert_eq!(r.cursor.position(), (4, 3));
    }

    #[test]
    fn zero_and_omitted_params_default_to_one() {
        let r = run(b"\x1b[0C\x1b[C");
        assert_eq!(r.cursor.position(), (1, 3));
    }

    #[test]
    fn absolute_positioning() {
        let r = run(b"\x1b[10;20H");
        assert_eq!(r.cursor.position(), (10, 20));
        let r = run(b"\x1b[;7f");
        assert_eq!(r.cursor.position(), (1, 7));
        let r = run(b"\x1b[5;5H\x1b[12G\x1b[3d");
        assert_eq!(r.cursor.position(), (3, 12));
    }

    #[test]
    fn next_and_previous_line() {
        let r = run(b"xyz\x1b[2E");
        assert_eq!(r.cursor.position(), (3, 1));
        let r = run(b"\x1b[5;9H\x1b[2F");
        assert_eq!(r.cursor.position(), (3, 1));
    }

    #[test]
    fn other_finals_do_not_move() {
        let r = run(b"ab\x1b[2J\x1b[K\x1b[s\x1b[u");
        assert_eq!(r.cursor.position(), (1, 3));
    }

    #[test]
    fn private_mode_prefix_skipped() {
        let r = run(b"\x1b[?25lx");
        assert_eq!(r.cursor.position(), (1, 2));
        assert_eq!(r.output, b"\x1b[?25lx");
    }

    #[test]
    fn newline_variants_agree() {
        let lf = run(b"ab\ncd");
        let crlf = run(b"ab\r\ncd");
        assert_eq!(lf.cursor.position(), (2, 3));
        assert_eq!(crlf.cursor.position(), lf.cursor.position());
    }

    #[test]
    fn tab_advances_to_next_stop() {
        assert_eq!(run(b"\t").cursor.col, 9);
        assert_eq!(run(b"abc\t").cursor.col, 9);
        assert_eq!(run(b"12345678\t").cursor.col, 17);
    }

    #[test]
    fn other_controls_do_not_advance() {
        let r = run(b"a\x07b");
        assert_eq!(r.cursor.col, 3);
        assert_eq!(r.output, b"a\x07b");
    }

    #[test]
    fn sgr_tracked() {
        let r = run(b"\x1b[1;33;44mX");
        assert_eq!(r.cursor.style.fg, Some(3));
        assert_eq!(r.cursor.style.bg, Some(4));
        let r = run(b"\x1b[1;33m\x1b[0mX");
        assert!(r.cursor.style.is_default());
    }

    #[test]
    fn markers_are_zero_width_and_recorded() {
        let r = run(b"\x1b[31mName: ~UNrest ^1");
        assert_eq!(r.output, b"\x1b[31mName: rest ");
        let un = r.fields.get("UN").expect("UN field");
        assert_eq!((un.row, un.col), (1, 7));
        assert_eq!(un.style, "\x1b[0;31m");
        let one = r.fields.get("1").expect("1 field");
        assert_eq!((one.row, one.col), (1, 12));
    }

    #[test]
    fn marker_requires_exact_shape() {
        let r = run(b"~Ab ^^ ^ ~");
        assert!(r.fields.is_empty());
        assert_eq!(r.output, b"~Ab ^^ ^ ~");
    }

    #[test]
    fn first_marker_occurrence_wins() {
        let r = run(b"~AB\n~AB");
        let f = r.fields.get("AB").expect("AB");
        assert_eq!((f.row, f.col), (1, 1));
    }

    #[test]
    fn high_bytes_transcoded_for_utf8_target() {
        let r = run(b"\xC9\xCD\xBB");
        assert_eq!(r.into_text(), "╔═╗");
        let raw = Interpreter::new(Target::Cp437).run(b"\xC9\xCD\xBB");
        assert_eq!(raw.output, b"\xC9\xCD\xBB");
        assert_eq!(raw.cursor.col, 4);
    }

    #[test]
    fn malformed_csi_recovers_at_offending_byte() {
        let r = run(b"\x1b[12\nab");
        assert_eq!(r.output, b"\x1b[12\nab");
        assert_eq!(r.cursor.position(), (2, 3));
    }

    #[test]
    fn truncated_csi_at_end_is_emitted() {
        let r = run(b"ok\x1b[3");
        assert_eq!(r.output, b"ok\x1b[3");
        assert_eq!(r.cursor.position(), (1, 3));
    }

    #[test]
    fn non_csi_escapes_do_not_move() {
        let r = run(b"ab\x1b(B\x1b7\x1b8\x1b)0c");
        assert_eq!(r.output, b"ab\x1b(B\x1b7\x1b8\x1b)0c");
        assert_eq!(r.cursor.position(), (1, 4));
    }

    #[test]
    fn bare_escape_before_high_byte_keeps_columns_aligned() {
        let r = run(b"\x1b\xC4X~AB");
        let ab = r.fields.get("AB").expect("AB").clone();
        assert_eq!((ab.row, ab.col), (1, 3));
        let text = r.into_text();
        assert_eq!(text, "\x1b\u{2500}X");
        assert_eq!(visible_length(&text) + 1, ab.col);
    }

    #[test]
    fn field_table_iterates_every_code() {
        let r = run(b"~AB x ^1\n~CD ~AB");
        let mut seen: Vec<(&str, (usize, usize))> =
            r.fields.iter().map(|(code, f)| (code, (f.row, f.col))).collect();
        seen.sort();
        assert_eq!(seen, vec![("1", (1, 4)), ("AB", (1, 1)), ("CD", (2, 1))]);
        assert_eq!(r.fields.len(), 3);
    }

    #[test]
    fn field_overlay_sequence() {
        let f = Field {
            row: 4,
            col: 10,
            style: "\x1b[0;1;36m".into(),
        };
        assert_eq!(f.overlay("bob"), "\x1b[4;10H\x1b[0;1;36mbob");
    }
}
