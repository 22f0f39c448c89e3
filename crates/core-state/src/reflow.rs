//! Paragraph reflow.
//!
//! A paragraph is flattened into one character stream (one space between
//! adjacent non-empty lines) and re-segmented greedily at the last space that
//! keeps a piece within the wrap width. The caller's cursor travels through
//! the stream as a linear offset and is mapped back afterwards.
//!
//! Break rules:
//! - A break at a space trims trailing spaces from the piece and leading
//!   spaces from the remainder.
//! - With no usable space the piece is cut at exactly `width` characters and
//!   nothing is trimmed.
//! - A space at index 0 of the remainder, or a prefix of only spaces, is not
//!   a usable break.
//! - A break that leaves only spaces behind still emits an empty final
//!   piece, so a cursor typed past that space starts the next line. A second
//!   reflow folds the empty line back in.
//!
//! When the buffer cannot grow to hold every piece, the leftover pieces are
//! appended (space-joined) to the last written line instead of being lost.

use crate::line_buffer::{BufferError, LineBuffer};
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReflowOutcome {
    /// Cursor (line, col) after the rewrite.
    pub cursor: (usize, usize),
    pub start: usize,
    pub old_lines: usize,
    pub new_lines: usize,
    /// Pieces that did not fit were merged into the last written line.
    pub overflowed: bool,
}

/// Half-open char range of one output piece within the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Piece {
    start: usize,
    end: usize,
}

impl Piece {
    fn len(&self) -> usize {
        self.end - self.start
    }
}

/// Where the cursor sits relative to the paragraph.
enum CursorAnchor {
    Before,
    Inside(usize),
    After,
}

fn flatten(
    buf: &LineBuffer,
    start: usize,
    end: usize,
    cursor: (usize, usize),
) -> (Vec<char>, CursorAnchor) {
    let mut stream: Vec<char> = Vec::new();
    let mut anchor = if cursor.0 < start {
        CursorAnchor::Before
    } else {
        CursorAnchor::After
    };
    for n in start..=end {
        let text = buf.line(n).unwrap_or_default();
        if !text.is_empty() && !stream.is_empty() {
            stream.push(' ');
        }
        let line_start = stream.len();
        stream.extend(text.chars());
        if n == cursor.0 {
            let within = cursor.1.saturating_sub(1).min(stream.len() - line_start);
            anchor = CursorAnchor::Inside(line_start + within);
        }
    }
    if let CursorAnchor::Inside(offset) = &mut anchor {
        *offset = (*offset).min(stream.len());
    }
    (stream, anchor)
}

/// Greedy segmentation of `stream` into pieces of at most `width` chars.
fn segment(stream: &[char], width: usize) -> Vec<Piece> {
    let width = width.max(1);
    let mut pieces = Vec::new();
    let mut pos = 0usize;
    loop {
        let rest = &stream[pos..];
        if rest.len() <= width {
            pieces.push(Piece {
                start: pos,
                end: stream.len(),
            });
            return pieces;
        }
        let window = &rest[..=width];
        let first_word = window.iter().position(|&c| c != ' ');
        let brk = window
            .iter()
            .rposition(|&c| c == ' ')
            .filter(|&k| k > 0 && first_word.is_some_and(|w| w < k));
        match brk {
            Some(k) => {
                let kept = rest[..k]
                    .iter()
                    .rposition(|&c| c != ' ')
                    .map_or(0, |i| i + 1);
                pieces.push(Piece {
                    start: pos,
                    end: pos + kept,
                });
                pos += k;
                while stream.get(pos) == Some(&' ') {
                    pos += 1;
                }
            }
            None => {
                pieces.push(Piece {
                    start: pos,
                    end: pos + width,
                });
                pos += width;
            }
        }
    }
}

/// Index of the piece holding `offset` and the 0-based column within it.
fn locate(pieces: &[Piece], offset: usize) -> (usize, usize) {
    let idx = pieces
        .windows(2)
        .position(|w| offset < w[1].start)
        .unwrap_or(pieces.len() - 1);
    let piece = pieces[idx];
    let col = offset.saturating_sub(piece.start).min(piece.len());
    (idx, col)
}

/// Reflow the paragraph starting at `start`, carrying `cursor` along.
pub fn reflow(
    buf: &mut LineBuffer,
    start: usize,
    cursor: (usize, usize),
    width: usize,
) -> Result<ReflowOutcome, BufferError> {
    if start == 0 || start > buf.navigable_count() {
        return Err(BufferError::OutOfRange {
            line: start,
            count: buf.navigable_count(),
        });
    }
    let end = buf.paragraph_end(start);
    let terminator_hard = buf.is_hard(end);
    let old_lines = end - start + 1;

    let (stream, anchor) = flatten(buf, start, end, cursor);
    let pieces = segment(&stream, width);
    let text = |p: &Piece| stream[p.start..p.end].iter().collect::<String>();

    // Rewrite in place, then grow or shrink.
    let mut written = 0usize;
    for (i, piece) in pieces.iter().enumerate().take(old_lines) {
        buf.set_line(start + i, &text(piece))?;
        written += 1;
    }
    let mut overflowed = false;
    if pieces.len() > old_lines {
        for piece in &pieces[old_lines..] {
            match buf.insert_line(start + written, &text(piece)) {
                Ok(()) => written += 1,
                Err(BufferError::Full { .. }) => {
                    overflowed = true;
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        if overflowed {
            let last = start + written - 1;
            let mut merged = text(&pieces[written - 1]);
            for piece in &pieces[written..] {
                merged.push(' ');
                merged.push_str(&text(piece));
            }
            buf.set_line(last, &merged)?;
            debug!(target: "state.reflow", line = last, merged_pieces = pieces.len() - written, "reflow_overflow_appended");
        }
    } else {
        for _ in pieces.len()..old_lines {
            buf.delete_line(start + written)?;
        }
    }
    for n in start..start + written {
        buf.set_hard(n, false)?;
    }
    buf.set_hard(start + written - 1, terminator_hard)?;

    let new_cursor = match anchor {
        CursorAnchor::Before => cursor,
        CursorAnchor::After => ((cursor.0 + written).saturating_sub(old_lines), cursor.1),
        CursorAnchor::Inside(offset) => {
            let (idx, col) = locate(&pieces, offset);
            if idx < written {
                (start + idx, col + 1)
            } else {
                // Merged tail: earlier pieces precede it on the last line.
                let before: usize = pieces[written - 1..idx].iter().map(|p| p.len() + 1).sum();
                (start + written - 1, before + col + 1)
            }
        }
    };
    trace!(
        target: "state.reflow",
        start,
        old_lines,
        new_lines = written,
        overflowed,
        cursor_line = new_cursor.0,
        cursor_col = new_cursor.1,
        "reflow_applied"
    );
    Ok(ReflowOutcome {
        cursor: new_cursor,
        start,
        old_lines,
        new_lines: written,
        overflowed,
    })
}
