//! Fixed-capacity line store with per-line hard-break flags.
//!
//! Lines and columns are 1-based. Columns count characters. The used count
//! never drops below 1; slots past it are kept empty with hard = true so any
//! later extension starts from a clean line.

use thiserror::Error;
use tracing::{debug, trace};

/// Compile-time storage bound.
pub const MAX_LINES: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    #[error("line buffer is full ({capacity} lines)")]
    Full { capacity: usize },
    #[error("line {line} is out of range (buffer holds {count})")]
    OutOfRange { line: usize, count: usize },
    #[error("line {line} is beyond the buffer capacity of {capacity}")]
    BeyondCapacity { line: usize, capacity: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineBuffer {
    lines: [String; MAX_LINES],
    hard: [bool; MAX_LINES],
    count: usize,
    capacity: usize,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Byte offset of the 1-based column `col`, or `None` when `col` is past the
/// end of `s` (the end itself, `len + 1`, is `Some(s.len())`).
fn col_to_byte(s: &str, col: usize) -> Option<usize> {
    let idx = col.saturating_sub(1);
    if idx == 0 {
        return Some(0);
    }
    match s.char_indices().nth(idx) {
        Some((b, _)) => Some(b),
        None if s.chars().count() == idx => Some(s.len()),
        None => None,
    }
}

/// Pad `s` with spaces so that column `col` is addressable; returns its byte
/// offset.
fn pad_to_col(s: &mut String, col: usize) -> usize {
    let len = s.chars().count();
    let want = col.saturating_sub(1);
    if want > len {
        s.extend(std::iter::repeat_n(' ', want - len));
    }
    col_to_byte(s, col).unwrap_or(s.len())
}

impl LineBuffer {
    /// One empty hard line at full capacity.
    pub fn new() -> Self {
        Self::with_capacity(MAX_LINES)
    }

    /// `capacity` is clamped to `1..=MAX_LINES`.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            lines: std::array::from_fn(|_| String::new()),
            hard: [true; MAX_LINES],
            count: 1,
            capacity: capacity.clamp(1, MAX_LINES),
        }
    }

    /// Load `\n`-separated text; every line is hard. Lines past capacity are
    /// dropped.
    pub fn from_text(text: &str, capacity: usize) -> Self {
        let mut buf = Self::with_capacity(capacity);
        let mut loaded = 0usize;
        let mut dropped = 0usize;
        for line in text.split('\n') {
            if loaded == buf.capacity {
                dropped += 1;
                continue;
            }
            buf.lines[loaded] = line.strip_suffix('\r').unwrap_or(line).to_string();
            loaded += 1;
        }
        buf.count = loaded.max(1);
        if dropped > 0 {
            debug!(target: "state.buffer", capacity = buf.capacity, dropped, "from_text_truncated");
        }
        buf
    }

    /// Storage-count lines joined with `\n`.
    pub fn to_text(&self) -> String {
        self.lines[..self.content_count()].join("\n")
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Used line count, trailing blank lines included. Cursor navigation
    /// bound.
    pub fn navigable_count(&self) -> usize {
        self.count
    }

    /// Used line count with trailing empty lines trimmed.
    pub fn content_count(&self) -> usize {
        self.lines[..self.count]
            .iter()
            .rposition(|l| !l.is_empty())
            .map_or(0, |i| i + 1)
    }

    pub fn is_full(&self) -> bool {
        self.count == self.capacity
    }

    fn check(&self, line: usize) -> Result<usize, BufferError> {
        if line == 0 || line > self.count {
            return Err(BufferError::OutOfRange {
                line,
                count: self.count,
            });
        }
        Ok(line - 1)
    }

    pub fn line(&self, line: usize) -> Option<&str> {
        self.check(line).ok().map(|i| self.lines[i].as_str())
    }

    /// Character length of `line`; 0 when out of range.
    pub fn line_len(&self, line: usize) -> usize {
        self.line(line).map_or(0, |l| l.chars().count())
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines[..self.count].iter().map(String::as_str)
    }

    /// Replace `line`. Setting past the used count extends it.
    pub fn set_line(&mut self, line: usize, text: &str) -> Result<(), BufferError> {
        if line == 0 {
            return Err(BufferError::OutOfRange {
                line,
                count: self.count,
            });
        }
        if line > self.capacity {
            return Err(BufferError::BeyondCapacity {
                line,
                capacity: self.capacity,
            });
        }
        self.lines[line - 1].clear();
        self.lines[line - 1].push_str(text);
        if line > self.count {
            trace!(target: "state.buffer", from = self.count, to = line, "count_extended");
            self.count = line;
        }
        Ok(())
    }

    pub fn is_hard(&self, line: usize) -> bool {
        self.check(line).map(|i| self.hard[i]).unwrap_or(true)
    }

    pub fn set_hard(&mut self, line: usize, hard: bool) -> Result<(), BufferError> {
        let i = self.check(line)?;
        self.hard[i] = hard;
        Ok(())
    }

    /// Splice `ch` in before column `col`, space-padding when `col` is past
    /// the end.
    pub fn insert_char(&mut self, line: usize, col: usize, ch: char) -> Result<(), BufferError> {
        let i = self.check(line)?;
        let at = pad_to_col(&mut self.lines[i], col);
        self.lines[i].insert(at, ch);
        Ok(())
    }

    /// Remove the character at `col`, if there is one.
    pub fn delete_char(&mut self, line: usize, col: usize) -> Result<Option<char>, BufferError> {
        let i = self.check(line)?;
        let s = &mut self.lines[i];
        match col_to_byte(s, col) {
            Some(at) if at < s.len() => Ok(Some(s.remove(at))),
            _ => Ok(None),
        }
    }

    /// Replace the character at `col`, appending (with padding) past the end.
    pub fn overwrite_char(&mut self, line: usize, col: usize, ch: char) -> Result<(), BufferError> {
        let i = self.check(line)?;
        let s = &mut self.lines[i];
        let at = pad_to_col(s, col);
        if at < s.len() {
            s.remove(at);
        }
        s.insert(at, ch);
        Ok(())
    }

    /// Insert a hard line at position `at` (`1..=count + 1`), shifting the
    /// rest down.
    pub fn insert_line(&mut self, at: usize, text: &str) -> Result<(), BufferError> {
        if at == 0 || at > self.count + 1 {
            return Err(BufferError::OutOfRange {
                line: at,
                count: self.count,
            });
        }
        if self.is_full() {
            return Err(BufferError::Full {
                capacity: self.capacity,
            });
        }
        let i = at - 1;
        self.lines[i..=self.count].rotate_right(1);
        self.hard[i..=self.count].rotate_right(1);
        self.lines[i] = text.to_string();
        self.hard[i] = true;
        self.count += 1;
        Ok(())
    }

    /// Remove `line`, shifting the rest up. The sole remaining line is
    /// cleared instead.
    pub fn delete_line(&mut self, line: usize) -> Result<(), BufferError> {
        let i = self.check(line)?;
        if self.count == 1 {
            self.lines[0].clear();
            self.hard[0] = true;
            return Ok(());
        }
        self.lines[i..self.count].rotate_left(1);
        self.hard[i..self.count].rotate_left(1);
        self.count -= 1;
        self.lines[self.count].clear();
        self.hard[self.count] = true;
        Ok(())
    }

    /// Move the text from `col` onward to a new following line. The new line
    /// inherits the hard flag; the original becomes soft.
    pub fn split_line(&mut self, line: usize, col: usize) -> Result<(), BufferError> {
        let i = self.check(line)?;
        if self.is_full() {
            return Err(BufferError::Full {
                capacity: self.capacity,
            });
        }
        let at = col_to_byte(&self.lines[i], col).unwrap_or(self.lines[i].len());
        let tail = self.lines[i].split_off(at);
        let flag = self.hard[i];
        self.insert_line(line + 1, &tail)?;
        self.hard[i + 1] = flag;
        self.hard[i] = false;
        Ok(())
    }

    /// Append the successor of `line` onto it. The result keeps the
    /// successor's hard flag.
    pub fn join_lines(&mut self, line: usize) -> Result<(), BufferError> {
        let i = self.check(line)?;
        self.check(line + 1)?;
        let next = std::mem::take(&mut self.lines[i + 1]);
        self.lines[i].push_str(&next);
        self.hard[i] = self.hard[i + 1];
        self.delete_line(line + 1)
    }

    /// Last line of the paragraph starting at `start`: the first hard line at
    /// or after it, or the final used line.
    pub fn paragraph_end(&self, start: usize) -> usize {
        let mut line = start.clamp(1, self.count);
        while line < self.count && !self.hard[line - 1] {
            line += 1;
        }
        line
    }

    /// First line of the paragraph containing `line`.
    pub fn paragraph_start(&self, line: usize) -> usize {
        let mut line = line.clamp(1, self.count);
        while line > 1 && !self.hard[line - 2] {
            line -= 1;
        }
        line
    }
}
