//! Placeholder template engine.
//!
//! Grammar: `@<code>[|<align><digits>?][:<digits> | <hash-run>]@` where
//! `<code>` is one or more ASCII alphanumerics and `<align>` one uppercase
//! letter (`L`, `R`, `C`; any other letter aligns left).
//!
//! Width precedence: digits after the alignment letter, then the colon width,
//! then the hash-run form (the width is the byte length of the whole
//! placeholder, delimiters included), else unconstrained. The hash-run form is
//! what lets a template author draw a field exactly as wide as it renders: the
//! field harvest pass runs over the raw bytes and its coordinates stay valid
//! after substitution.
//!
//! Unknown codes are left verbatim. Escape sequences are skipped before any
//! `@` check because `@` is also a CSI final byte.

use anyhow::{Context, Result};
use core_config::Config;
use core_text::codec::{Target, encode_str};
use core_text::escape::{ESC, sequence_len};
use core_text::sauce::strip_metadata;
use core_text::width::{Alignment, apply_width_constraint_aligned};
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;
use std::path::Path;
use tracing::{info, trace};

use crate::codes;
use crate::interpreter::{CursorState, Field, FieldTable, Interpreter, Scanner, Token};
use crate::RenderOptions;

pub const DELIMITER: u8 = b'@';
/// Upper bound for any numeric width directive.
pub const MAX_FIELD_WIDTH: usize = 4096;
/// File extension used by [`Template::load_named`].
pub const TEMPLATE_EXTENSION: &str = "ans";

/// Source of substitution values keyed by field code.
pub trait FieldValues {
    fn field_value(&self, code: &str) -> Option<&str>;
}

impl<V: AsRef<str>, S: BuildHasher> FieldValues for HashMap<String, V, S> {
    fn field_value(&self, code: &str) -> Option<&str> {
        self.get(code).map(AsRef::as_ref)
    }
}

impl<V: AsRef<str>> FieldValues for BTreeMap<String, V> {
    fn field_value(&self, code: &str) -> Option<&str> {
        self.get(code).map(AsRef::as_ref)
    }
}

impl<V: AsRef<str>> FieldValues for [(&str, V)] {
    fn field_value(&self, code: &str) -> Option<&str> {
        self.iter()
            .find(|(k, _)| *k == code)
            .map(|(_, v)| v.as_ref())
    }
}

/// A syntactically complete placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder<'a> {
    pub code: &'a str,
    pub align: Alignment,
    /// Resolved width; 0 means unconstrained.
    pub width: usize,
    /// Bytes spanned, both delimiters included.
    pub len: usize,
}

fn digits(bytes: &[u8], at: usize) -> (Option<usize>, usize) {
    let mut i = at;
    let mut n = 0usize;
    while let Some(b) = bytes.get(i).filter(|b| b.is_ascii_digit()) {
        n = n.saturating_mul(10).saturating_add((b - b'0') as usize);
        i += 1;
    }
    if i == at {
        (None, at)
    } else {
        (Some(n.min(MAX_FIELD_WIDTH)), i)
    }
}

/// Parse the placeholder starting at `bytes[at]`, if any.
pub fn parse_placeholder(bytes: &[u8], at: usize) -> Option<Placeholder<'_>> {
    if bytes.get(at) != Some(&DELIMITER) {
        return None;
    }
    let code_start = at + 1;
    let mut i = code_start;
    while bytes.get(i).is_some_and(u8::is_ascii_alphanumeric) {
        i += 1;
    }
    if i == code_start {
        return None;
    }
    let code = std::str::from_utf8(&bytes[code_start..i]).ok()?;

    let mut align = Alignment::default();
    let mut align_width = None;
    if bytes.get(i) == Some(&b'|') {
        let letter = bytes.get(i + 1).filter(|b| b.is_ascii_uppercase())?;
        align = Alignment::parse(std::str::from_utf8(std::slice::from_ref(letter)).ok()?);
        let (n, next) = digits(bytes, i + 2);
        align_width = n;
        i = next;
    }

    let mut colon_width = None;
    let mut hash_run = false;
    match bytes.get(i) {
        Some(b':') => {
            let (n, next) = digits(bytes, i + 1);
            colon_width = Some(n?);
            i = next;
        }
        Some(b'#') => {
            while bytes.get(i) == Some(&b'#') {
                i += 1;
            }
            hash_run = true;
        }
        _ => {}
    }

    if bytes.get(i) != Some(&DELIMITER) {
        return None;
    }
    let len = i + 1 - at;
    let width = align_width
        .or(colon_width)
        .or(hash_run.then_some(len))
        .unwrap_or(0);
    Some(Placeholder {
        code,
        align,
        width,
        len,
    })
}

/// Replace known placeholders in `text` with width-constrained values.
pub fn substitute<V: FieldValues + ?Sized>(text: &str, values: &V) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut copied = 0usize;
    let mut i = 0usize;
    let mut replaced = 0usize;
    let mut unknown = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            ESC => i += sequence_len(bytes, i),
            DELIMITER => match parse_placeholder(bytes, i) {
                Some(ph) => {
                    if let Some(value) = values.field_value(ph.code) {
                        out.push_str(&text[copied..i]);
                        out.push_str(&apply_width_constraint_aligned(value, ph.width, ph.align));
                        copied = i + ph.len;
                        replaced += 1;
                    } else {
                        unknown += 1;
                    }
                    i += ph.len;
                }
                None => i += 1,
            },
            _ => i += 1,
        }
    }
    out.push_str(&text[copied..]);
    trace!(target: "render.template", replaced, unknown, "substitute");
    out
}

/// Position and restoring style of the first `@code` placeholder in raw
/// template bytes.
pub fn locate_placeholder(source: &[u8], code: &str) -> Option<Field> {
    let mut cursor = CursorState::new();
    let mut inside_until = 0usize;
    for (offset, token) in Scanner::new(source) {
        if matches!(token, Token::Print(DELIMITER))
            && offset >= inside_until
            && let Some(ph) = parse_placeholder(source, offset)
        {
            if ph.code == code {
                return Some(Field::from_state(&cursor));
            }
            inside_until = offset + ph.len;
        }
        cursor.apply(&token);
    }
    None
}

/// Restoring style active at exactly (`row`, `col`), found by replaying the
/// raw bytes. A character printed there wins; otherwise the style held when
/// the cursor first left that cell (or finished on it) counts. Scanning stops
/// at the first character printed below `row`.
pub fn style_at(source: &[u8], row: usize, col: usize) -> Option<String> {
    let target = (row, col);
    let mut cursor = CursorState::new();
    let mut departed = None;
    for (_, token) in Scanner::new(source) {
        if let Token::Print(_) = token {
            if cursor.position() == target {
                return Some(cursor.style.restore_sequence());
            }
            if cursor.row > row {
                break;
            }
        }
        let before = cursor;
        cursor.apply(&token);
        if departed.is_none() && before.position() == target && cursor.position() != target {
            departed = Some(before.style);
        }
    }
    departed
        .or_else(|| (cursor.position() == target).then_some(cursor.style))
        .map(|style| style.restore_sequence())
}

/// A loaded screen template.
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    /// Metadata-stripped bytes with inline codes expanded; input to every
    /// position query.
    source: Vec<u8>,
    fields: FieldTable,
    /// UTF-8 rendition of `source` with markers removed, placeholders intact.
    text: String,
}

impl Template {
    pub fn from_bytes(name: impl Into<String>, bytes: &[u8]) -> Self {
        let name = name.into();
        let source = codes::translate_bytes(strip_metadata(bytes));
        let mut pass = Interpreter::new(Target::Utf8).run(&source);
        let fields = std::mem::take(&mut pass.fields);
        let text = pass.into_text();
        trace!(target: "render.template", name = name.as_str(), bytes = source.len(), fields = fields.len(), "template_prepared");
        Self {
            name,
            source,
            fields,
            text,
        }
    }

    /// Read a template file. A missing or unreadable file is an error; no
    /// fallback screen is fabricated here.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to load template {}", path.display()))?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("template")
            .to_string();
        info!(target: "render.template", file = %path.display(), size_bytes = bytes.len(), "template_loaded");
        Ok(Self::from_bytes(name, &bytes))
    }

    /// Load `<templates.dir>/<name>.ans`.
    pub fn load_named(config: &Config, name: &str) -> Result<Self> {
        let path = config
            .file
            .templates
            .dir
            .join(name)
            .with_extension(TEMPLATE_EXTENSION);
        Self::load(path)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &[u8] {
        &self.source
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn fields(&self) -> &FieldTable {
        &self.fields
    }

    /// Marker-recorded field, if the template carries one for `code`.
    pub fn field(&self, code: &str) -> Option<&Field> {
        self.fields.get(code)
    }

    /// Where the first `@code` placeholder sits on screen.
    pub fn locate(&self, code: &str) -> Option<Field> {
        locate_placeholder(&self.source, code)
    }

    pub fn style_at(&self, row: usize, col: usize) -> Option<String> {
        style_at(&self.source, row, col)
    }

    /// Substitute values into the template text.
    pub fn render<V: FieldValues + ?Sized>(&self, values: &V) -> String {
        substitute(&self.text, values)
    }

    /// Substitute and encode for the session's output target.
    pub fn render_bytes<V: FieldValues + ?Sized>(&self, values: &V, opts: &RenderOptions) -> Vec<u8> {
        let rendered = self.render(values);
        match opts.target {
            Target::Utf8 => rendered.into_bytes(),
            Target::Cp437 => encode_str(&rendered, opts.placeholder),
        }
    }
}
