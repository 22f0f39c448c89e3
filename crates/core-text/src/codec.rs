//! Code page 437 tables and transcoding.
//!
//! The forward table is total (every byte decodes). The reverse direction is a
//! curated partial table: every glyph of the upper half plus a few look-alike
//! code points that legacy art commonly intends (e.g. Greek beta for `0xE1`).
//! Both tables are process-wide constants.
//!
//! Conversion always goes byte by byte through the table. Adjacent high bytes
//! are never assumed to be a valid UTF-8 sequence already; that shortcut
//! corrupts box-drawing art (`0xC4 0xB3` is `─│`, not a two-byte scalar).

use serde::Deserialize;
use tracing::debug;

use crate::escape::{ESC, sequence_len};

/// Glyph substituted by callers when a code point has no CP437 byte.
pub const DEFAULT_PLACEHOLDER: char = '?';

/// Output representation for rendered bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    /// Decode printed bytes through the table into UTF-8.
    #[default]
    Utf8,
    /// Pass legacy bytes through untouched.
    Cp437,
}

/// Upper half (0x80..=0xFF) of the forward table.
#[rustfmt::skip]
static CP437_HIGH: [char; 128] = [
    '\u{00C7}', '\u{00FC}', '\u{00E9}', '\u{00E2}', '\u{00E4}', '\u{00E0}', '\u{00E5}', '\u{00E7}',
    '\u{00EA}', '\u{00EB}', '\u{00E8}', '\u{00EF}', '\u{00EE}', '\u{00EC}', '\u{00C4}', '\u{00C5}',
    '\u{00C9}', '\u{00E6}', '\u{00C6}', '\u{00F4}', '\u{00F6}', '\u{00F2}', '\u{00FB}', '\u{00F9}',
    '\u{00FF}', '\u{00D6}', '\u{00DC}', '\u{00A2}', '\u{00A3}', '\u{00A5}', '\u{20A7}', '\u{0192}',
    '\u{00E1}', '\u{00ED}', '\u{00F3}', '\u{00FA}', '\u{00F1}', '\u{00D1}', '\u{00AA}', '\u{00BA}',
    '\u{00BF}', '\u{2310}', '\u{00AC}', '\u{00BD}', '\u{00BC}', '\u{00A1}', '\u{00AB}', '\u{00BB}',
    '\u{2591}', '\u{2592}', '\u{2593}', '\u{2502}', '\u{2524}', '\u{2561}', '\u{2562}', '\u{2556}',
    '\u{2555}', '\u{2563}', '\u{2551}', '\u{2557}', '\u{255D}', '\u{255C}', '\u{255B}', '\u{2510}',
    '\u{2514}', '\u{2534}', '\u{252C}', '\u{251C}', '\u{2500}', '\u{253C}', '\u{255E}', '\u{255F}',
    '\u{255A}', '\u{2554}', '\u{2569}', '\u{2566}', '\u{2560}', '\u{2550}', '\u{256C}', '\u{2567}',
    '\u{2568}', '\u{2564}', '\u{2565}', '\u{2559}', '\u{2558}', '\u{2552}', '\u{2553}', '\u{256B}',
    '\u{256A}', '\u{2518}', '\u{250C}', '\u{2588}', '\u{2584}', '\u{258C}', '\u{2590}', '\u{2580}',
    '\u{03B1}', '\u{00DF}', '\u{0393}', '\u{03C0}', '\u{03A3}', '\u{03C3}', '\u{00B5}', '\u{03C4}',
    '\u{03A6}', '\u{0398}', '\u{03A9}', '\u{03B4}', '\u{221E}', '\u{03C6}', '\u{03B5}', '\u{2229}',
    '\u{2261}', '\u{00B1}', '\u{2265}', '\u{2264}', '\u{2320}', '\u{2321}', '\u{00F7}', '\u{2248}',
    '\u{00B0}', '\u{2219}', '\u{00B7}', '\u{221A}', '\u{207F}', '\u{00B2}', '\u{25A0}', '\u{00A0}',
];

/// Reverse table for non-ASCII code points, sorted by code point for binary
/// search.
#[rustfmt::skip]
static CP437_REVERSE: &[(char, u8)] = &[
    ('\u{00A0}', 0xFF), ('\u{00A1}', 0xAD), ('\u{00A2}', 0x9B), ('\u{00A3}', 0x9C),
    ('\u{00A5}', 0x9D), ('\u{00AA}', 0xA6), ('\u{00AB}', 0xAE), ('\u{00AC}', 0xAA),
    ('\u{00B0}', 0xF8), ('\u{00B1}', 0xF1), ('\u{00B2}', 0xFD), ('\u{00B5}', 0xE6),
    ('\u{00B7}', 0xFA), ('\u{00BA}', 0xA7), ('\u{00BB}', 0xAF), ('\u{00BC}', 0xAC),
    ('\u{00BD}', 0xAB), ('\u{00BF}', 0xA8), ('\u{00C4}', 0x8E), ('\u{00C5}', 0x8F),
    ('\u{00C6}', 0x92), ('\u{00C7}', 0x80), ('\u{00C9}', 0x90), ('\u{00D1}', 0xA5),
    ('\u{00D6}', 0x99), ('\u{00DC}', 0x9A), ('\u{00DF}', 0xE1), ('\u{00E0}', 0x85),
    ('\u{00E1}', 0xA0), ('\u{00E2}', 0x83), ('\u{00E4}', 0x84), ('\u{00E5}', 0x86),
    ('\u{00E6}', 0x91), ('\u{00E7}', 0x87), ('\u{00E8}', 0x8A), ('\u{00E9}', 0x82),
    ('\u{00EA}', 0x88), ('\u{00EB}', 0x89), ('\u{00EC}', 0x8D), ('\u{00ED}', 0xA1),
    ('\u{00EE}', 0x8C), ('\u{00EF}', 0x8B), ('\u{00F1}', 0xA4), ('\u{00F2}', 0x95),
    ('\u{00F3}', 0xA2), ('\u{00F4}', 0x93), ('\u{00F6}', 0x94), ('\u{00F7}', 0xF6),
    ('\u{00F9}', 0x97), ('\u{00FA}', 0xA3), ('\u{00FB}', 0x96), ('\u{00FC}', 0x81),
    ('\u{00FF}', 0x98), ('\u{0192}', 0x9F), ('\u{0393}', 0xE2), ('\u{0398}', 0xE9),
    ('\u{03A3}', 0xE4), ('\u{03A6}', 0xE8), ('\u{03A9}', 0xEA), ('\u{03B1}', 0xE0),
    ('\u{03B2}', 0xE1), ('\u{03B4}', 0xEB), ('\u{03B5}', 0xEE), ('\u{03BC}', 0xE6),
    ('\u{03C0}', 0xE3), ('\u{03C3}', 0xE5), ('\u{03C4}', 0xE7), ('\u{03C6}', 0xED),
    ('\u{03D5}', 0xED), ('\u{207F}', 0xFC), ('\u{20A7}', 0x9E), ('\u{2126}', 0xEA),
    ('\u{2205}', 0xED), ('\u{2208}', 0xEE), ('\u{2211}', 0xE4), ('\u{2219}', 0xF9),
    ('\u{221A}', 0xFB), ('\u{221E}', 0xEC), ('\u{2229}', 0xEF), ('\u{2248}', 0xF7),
    ('\u{2261}', 0xF0), ('\u{2264}', 0xF3), ('\u{2265}', 0xF2), ('\u{2310}', 0xA9),
    ('\u{2320}', 0xF4), ('\u{2321}', 0xF5), ('\u{2500}', 0xC4), ('\u{2502}', 0xB3),
    ('\u{250C}', 0xDA), ('\u{2510}', 0xBF), ('\u{2514}', 0xC0), ('\u{2518}', 0xD9),
    ('\u{251C}', 0xC3), ('\u{2524}', 0xB4), ('\u{252C}', 0xC2), ('\u{2534}', 0xC1),
    ('\u{253C}', 0xC5), ('\u{2550}', 0xCD), ('\u{2551}', 0xBA), ('\u{2552}', 0xD5),
    ('\u{2553}', 0xD6), ('\u{2554}', 0xC9), ('\u{2555}', 0xB8), ('\u{2556}', 0xB7),
    ('\u{2557}', 0xBB), ('\u{2558}', 0xD4), ('\u{2559}', 0xD3), ('\u{255A}', 0xC8),
    ('\u{255B}', 0xBE), ('\u{255C}', 0xBD), ('\u{255D}', 0xBC), ('\u{255E}', 0xC6),
    ('\u{255F}', 0xC7), ('\u{2560}', 0xCC), ('\u{2561}', 0xB5), ('\u{2562}', 0xB6),
    ('\u{2563}', 0xB9), ('\u{2564}', 0xD1), ('\u{2565}', 0xD2), ('\u{2566}', 0xCB),
    ('\u{2567}', 0xCF), ('\u{2568}', 0xD0), ('\u{2569}', 0xCA), ('\u{256A}', 0xD8),
    ('\u{256B}', 0xD7), ('\u{256C}', 0xCE), ('\u{2580}', 0xDF), ('\u{2584}', 0xDC),
    ('\u{2588}', 0xDB), ('\u{258C}', 0xDD), ('\u{2590}', 0xDE), ('\u{2591}', 0xB0),
    ('\u{2592}', 0xB1), ('\u{2593}', 0xB2), ('\u{25A0}', 0xFE),
];

/// Byte to code point. Total.
#[inline]
pub fn decode(byte: u8) -> char {
    if byte < 0x80 {
        byte as char
    } else {
        CP437_HIGH[(byte - 0x80) as usize]
    }
}

/// Code point to byte; `None` outside the curated reverse table.
pub fn encode(c: char) -> Option<u8> {
    if c.is_ascii() {
        return Some(c as u8);
    }
    CP437_REVERSE
        .binary_search_by(|(k, _)| k.cmp(&c))
        .ok()
        .map(|idx| CP437_REVERSE[idx].1)
}

/// Encode with a substitute byte for unmappable code points. An unmappable
/// placeholder itself falls back to `?`.
pub fn encode_or(c: char, placeholder: char) -> u8 {
    encode(c)
        .or_else(|| encode(placeholder))
        .unwrap_or(DEFAULT_PLACEHOLDER as u8)
}

/// Decode legacy bytes to UTF-8, copying escape sequences through intact.
pub fn transcode_to_utf8(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() + bytes.len() / 2);
    let mut i = 0usize;
    while i < bytes.len() {
        if bytes[i] == ESC {
            let len = sequence_len(bytes, i);
            // Sequence bytes are ASCII in well-formed input; decode anyway so a
            // stray high byte inside a broken sequence cannot yield invalid UTF-8.
            out.extend(bytes[i..i + len].iter().map(|&b| decode(b)));
            i += len;
            continue;
        }
        out.push(decode(bytes[i]));
        i += 1;
    }
    out
}

/// Encode UTF-8 text to legacy bytes. Escape sequences pass through;
/// unmappable characters become `placeholder`.
pub fn encode_str(text: &str, placeholder: char) -> Vec<u8> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(text.len());
    let mut substituted = 0usize;
    let mut i = 0usize;
    while i < bytes.len() {
        if bytes[i] == ESC {
            let len = sequence_len(bytes, i);
            // Stop at a char boundary if a broken sequence swallowed a multibyte scalar.
            let mut end = i + len;
            while !text.is_char_boundary(end) {
                end += 1;
            }
            for c in text[i..end].chars() {
                out.push(encode_or(c, placeholder));
            }
            i = end;
            continue;
        }
        let Some(c) = text[i..].chars().next() else {
            break;
        };
        match encode(c) {
            Some(b) => out.push(b),
            None => {
                substituted += 1;
                out.push(encode_or(placeholder, DEFAULT_PLACEHOLDER));
            }
        }
        i += c.len_utf8();
    }
    if substituted > 0 {
        debug!(target: "text.codec", substituted, "unmappable_code_points");
    }
    out
}
