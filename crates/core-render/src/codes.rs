//! Inline pipe-code translation (`|04`, `|B1`, `|CL`, ...).
//!
//! Scan order per byte: escape sequences already present are copied first,
//! then `|` codes are tried (3-character before 2-character), then the byte
//! passes through. `||` yields a literal `|`. A `|` that matches nothing is
//! emitted as-is and scanning resumes right after it, so the characters that
//! follow are never swallowed.

use core_text::escape::{ESC, sequence_len};

pub const DELIMITER: u8 = b'|';

/// Code table sorted by code for binary search.
#[rustfmt::skip]
static CODES: &[(&str, &str)] = &[
    ("00", "\x1b[0;30m"), ("01", "\x1b[0;31m"), ("02", "\x1b[0;32m"), ("03", "\x1b[0;33m"),
    ("04", "\x1b[0;34m"), ("05", "\x1b[0;35m"), ("06", "\x1b[0;36m"), ("07", "\x1b[0;37m"),
    ("08", "\x1b[0;1;30m"), ("09", "\x1b[0;1;31m"), ("10", "\x1b[0;1;32m"), ("11", "\x1b[0;1;33m"),
    ("12", "\x1b[0;1;34m"), ("13", "\x1b[0;1;35m"), ("14", "\x1b[0;1;36m"), ("15", "\x1b[0;1;37m"),
    ("16", "\x1b[40m"), ("17", "\x1b[41m"), ("18", "\x1b[42m"), ("19", "\x1b[43m"),
    ("20", "\x1b[44m"), ("21", "\x1b[45m"), ("22", "\x1b[46m"), ("23", "\x1b[47m"),
    ("B0", "\x1b[40m"), ("B1", "\x1b[41m"), ("B2", "\x1b[42m"), ("B3", "\x1b[43m"),
    ("B4", "\x1b[44m"), ("B5", "\x1b[45m"), ("B6", "\x1b[46m"), ("B7", "\x1b[47m"),
    ("BLK", "\x1b[5m"),
    ("CE", "\x1b[K"),
    ("CL", "\x1b[2J\x1b[1;1H"),
    ("RC", "\x1b[u"),
    ("RS", "\x1b[0m"),
    ("SC", "\x1b[s"),
];

/// Sequence for an exact code (without the delimiter).
pub fn lookup(code: &[u8]) -> Option<&'static str> {
    CODES
        .binary_search_by(|(k, _)| k.as_bytes().cmp(code))
        .ok()
        .map(|idx| CODES[idx].1)
}

/// Try a code of `len` alphanumerics right after the delimiter at `at`.
fn match_code(bytes: &[u8], at: usize, len: usize) -> Option<&'static str> {
    let code = bytes.get(at + 1..at + 1 + len)?;
    if !code.iter().all(u8::is_ascii_alphanumeric) {
        return None;
    }
    lookup(code)
}

/// Translate inline codes in a byte stream.
pub fn translate_bytes(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + bytes.len() / 4);
    let mut i = 0usize;
    while i < bytes.len() {
        let b = bytes[i];
        if b == ESC {
            let len = sequence_len(bytes, i);
            out.extend_from_slice(&bytes[i..i + len]);
            i += len;
            continue;
        }
        if b == DELIMITER {
            if bytes.get(i + 1) == Some(&DELIMITER) {
                out.push(DELIMITER);
                i += 2;
                continue;
            }
            if let Some(seq) = match_code(bytes, i, 3) {
                out.extend_from_slice(seq.as_bytes());
                i += 4;
                continue;
            }
            if let Some(seq) = match_code(bytes, i, 2) {
                out.extend_from_slice(seq.as_bytes());
                i += 3;
                continue;
            }
        }
        out.push(b);
        i += 1;
    }
    out
}

/// Translate inline codes in UTF-8 text.
pub fn translate(text: &str) -> String {
    // Only ASCII runs are replaced by ASCII sequences, so UTF-8 validity holds.
    match String::from_utf8(translate_bytes(text.as_bytes())) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}
