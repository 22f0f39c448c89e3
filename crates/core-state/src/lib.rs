//! Editor state: line buffer, cursor and wrap width for one message-editing
//! session.
//!
//! Reflow triggers:
//! - Character inserts, overwrites and in-line deletes take the fast path:
//!   reflow runs only when the touched line now exceeds the wrap width, and
//!   starts at that line.
//! - Line joins (backspace at column 1, delete at end of line), splits
//!   (newline) and explicit `reformat` reflow the whole affected paragraph
//!   unconditionally.
//!
//! Cursor invariants: `1 <= line <= navigable_count` and
//! `1 <= col <= line_len(line) + 1`. Every edit leaves the cursor where the
//! reflow engine mapped it.
//!
//! Telemetry: edits emit `edit_insert`, `edit_overwrite`, `edit_backspace`,
//! `edit_delete_forward`, `edit_newline` and `edit_reformat` trace events
//! under `state.editor`; reflow itself logs under `state.reflow`.

pub mod line_buffer;
pub mod reflow;

use tracing::trace;

pub use core_config::Limits;
pub use line_buffer::{BufferError, LineBuffer, MAX_LINES};
pub use reflow::{ReflowOutcome, reflow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub line: usize,
    pub col: usize,
}

impl Default for Cursor {
    fn default() -> Self {
        Self { line: 1, col: 1 }
    }
}

#[derive(Debug, Clone)]
pub struct EditorState {
    buffer: LineBuffer,
    cursor: Cursor,
    wrap_width: usize,
}

impl Default for EditorState {
    fn default() -> Self {
        Self::new(Limits::default())
    }
}

impl EditorState {
    pub fn new(limits: Limits) -> Self {
        Self {
            buffer: LineBuffer::with_capacity(limits.max_lines),
            cursor: Cursor::default(),
            wrap_width: limits.wrap_width.max(1),
        }
    }

    /// Start from existing message text (e.g. a quoted reply).
    pub fn from_text(text: &str, limits: Limits) -> Self {
        Self {
            buffer: LineBuffer::from_text(text, limits.max_lines),
            cursor: Cursor::default(),
            wrap_width: limits.wrap_width.max(1),
        }
    }

    pub fn buffer(&self) -> &LineBuffer {
        &self.buffer
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn wrap_width(&self) -> usize {
        self.wrap_width
    }

    /// Flat text for save/abort.
    pub fn export(&self) -> String {
        self.buffer.to_text()
    }

    fn current_len(&self) -> usize {
        self.buffer.line_len(self.cursor.line)
    }

    fn reflow_from(&mut self, start: usize) -> Result<ReflowOutcome, BufferError> {
        let outcome = reflow(
            &mut self.buffer,
            start,
            (self.cursor.line, self.cursor.col),
            self.wrap_width,
        )?;
        self.cursor = Cursor {
            line: outcome.cursor.0,
            col: outcome.cursor.1,
        };
        self.clamp_cursor();
        Ok(outcome)
    }

    /// Fast path: reflow from the cursor line only if it overflows.
    fn reflow_if_overflowing(&mut self) -> Result<(), BufferError> {
        if self.current_len() > self.wrap_width {
            self.reflow_from(self.cursor.line)?;
        }
        Ok(())
    }

    fn clamp_cursor(&mut self) {
        let count = self.buffer.navigable_count();
        self.cursor.line = self.cursor.line.clamp(1, count);
        self.cursor.col = self.cursor.col.clamp(1, self.current_len() + 1);
    }

    pub fn insert_char(&mut self, ch: char) -> Result<(), BufferError> {
        if ch == '\n' {
            return self.newline();
        }
        let Cursor { line, col } = self.cursor;
        self.buffer.insert_char(line, col, ch)?;
        self.cursor.col += 1;
        trace!(target: "state.editor", line, col, "edit_insert");
        self.reflow_if_overflowing()
    }

    pub fn overwrite_char(&mut self, ch: char) -> Result<(), BufferError> {
        let Cursor { line, col } = self.cursor;
        self.buffer.overwrite_char(line, col, ch)?;
        self.cursor.col += 1;
        trace!(target: "state.editor", line, col, "edit_overwrite");
        self.reflow_if_overflowing()
    }

    pub fn backspace(&mut self) -> Result<(), BufferError> {
        let Cursor { line, col } = self.cursor;
        if col > 1 {
            self.buffer.delete_char(line, col - 1)?;
            self.cursor.col -= 1;
            trace!(target: "state.editor", line, col, "edit_backspace");
            return self.reflow_if_overflowing();
        }
        if line == 1 {
            return Ok(());
        }
        let prev = line - 1;
        let join_col = self.buffer.line_len(prev) + 1;
        self.buffer.join_lines(prev)?;
        self.cursor = Cursor {
            line: prev,
            col: join_col,
        };
        trace!(target: "state.editor", line, col, joined = true, "edit_backspace");
        let start = self.buffer.paragraph_start(prev);
        self.reflow_from(start).map(|_| ())
    }

    pub fn delete_forward(&mut self) -> Result<(), BufferError> {
        let Cursor { line, col } = self.cursor;
        if col <= self.current_len() {
            self.buffer.delete_char(line, col)?;
            trace!(target: "state.editor", line, col, "edit_delete_forward");
            return self.reflow_if_overflowing();
        }
        if line >= self.buffer.navigable_count() {
            return Ok(());
        }
        self.buffer.join_lines(line)?;
        trace!(target: "state.editor", line, col, joined = true, "edit_delete_forward");
        let start = self.buffer.paragraph_start(line);
        self.reflow_from(start).map(|_| ())
    }

    /// Hard break at the cursor.
    pub fn newline(&mut self) -> Result<(), BufferError> {
        let Cursor { line, col } = self.cursor;
        self.buffer.split_line(line, col)?;
        self.buffer.set_hard(line, true)?;
        self.cursor = Cursor {
            line: line + 1,
            col: 1,
        };
        trace!(target: "state.editor", line, col, "edit_newline");
        self.reflow_from(line + 1).map(|_| ())
    }

    /// Reflow the whole paragraph containing the cursor.
    pub fn reformat(&mut self) -> Result<ReflowOutcome, BufferError> {
        let start = self.buffer.paragraph_start(self.cursor.line);
        trace!(target: "state.editor", line = self.cursor.line, start, "edit_reformat");
        self.reflow_from(start)
    }

    pub fn move_to(&mut self, line: usize, col: usize) {
        self.cursor = Cursor { line, col };
        self.clamp_cursor();
    }

    pub fn move_left(&mut self) {
        if self.cursor.col > 1 {
            self.cursor.col -= 1;
        } else if self.cursor.line > 1 {
            self.cursor.line -= 1;
            self.cursor.col = self.current_len() + 1;
        }
    }

    pub fn move_right(&mut self) {
        if self.cursor.col <= self.current_len() {
            self.cursor.col += 1;
        } else if self.cursor.line < self.buffer.navigable_count() {
            self.cursor = Cursor {
                line: self.cursor.line + 1,
                col: 1,
            };
        }
    }

    pub fn move_up(&mut self) {
        let line = self.cursor.line.saturating_sub(1);
        self.move_to(line, self.cursor.col);
    }

    pub fn move_down(&mut self) {
        self.move_to(self.cursor.line + 1, self.cursor.col);
    }

    pub fn home(&mut self) {
        self.cursor.col = 1;
    }

    pub fn end(&mut self) {
        self.cursor.col = self.current_len() + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn limits(wrap_width: usize) -> Limits {
        Limits {
            wrap_width,
            max_lines: MAX_LINES,
        }
    }

    fn type_str(ed: &mut EditorState, s: &str) {
        for ch in s.chars() {
            ed.insert_char(ch).unwrap();
        }
    }

    fn lines(ed: &EditorState) -> Vec<String> {
        ed.buffer().lines().map(str::to_string).collect()
    }

    #[test]
    fn typing_wraps_at_width() {
        let mut ed = EditorState::new(limits(10));
        type_str(&mut ed, "the quick brown fox");
        assert_eq!(lines(&ed), vec!["the quick", "brown fox"]);
        assert_eq!(ed.cursor(), Cursor { line: 2, col: 10 });
        assert!(!ed.buffer().is_hard(1));
        assert!(ed.buffer().is_hard(2));
    }

    #[test]
    fn short_edits_leave_following_soft_lines() {
        let mut ed = EditorState::new(limits(10));
        type_str(&mut ed, "aaaa bbbb cccc dddd");
        assert_eq!(lines(&ed), vec!["aaaa bbbb", "cccc dddd"]);
        ed.move_to(1, 1);
        type_str(&mut ed, "zz ");
        assert_eq!(lines(&ed), vec!["zz aaaa", "bbbb cccc", "dddd"]);
        for _ in 0..3 {
            ed.backspace().unwrap();
        }
        // Nothing overflowed, so the soft paragraph below is not pulled up.
        assert_eq!(lines(&ed), vec!["aaaa", "bbbb cccc", "dddd"]);
        assert_eq!(ed.cursor(), Cursor { line: 1, col: 1 });
        assert!(!ed.buffer().is_hard(1));
        ed.reformat().unwrap();
        assert_eq!(lines(&ed), vec!["aaaa bbbb", "cccc dddd"]);
        assert_eq!(ed.cursor(), Cursor { line: 1, col: 1 });
    }

    #[test]
    fn space_typed_at_width_opens_next_line() {
        let mut ed = EditorState::new(limits(10));
        type_str(&mut ed, "aaaa bbbbb ");
        assert_eq!(lines(&ed), vec!["aaaa bbbbb", ""]);
        assert_eq!(ed.cursor(), Cursor { line: 2, col: 1 });
        type_str(&mut ed, "c");
        assert_eq!(lines(&ed), vec!["aaaa bbbbb", "c"]);
    }

    #[test]
    fn newline_marks_hard_break() {
        let mut ed = EditorState::default();
        type_str(&mut ed, "Dear sysop,\nthanks");
        assert_eq!(lines(&ed), vec!["Dear sysop,", "thanks"]);
        assert!(ed.buffer().is_hard(1));
        assert_eq!(ed.export(), "Dear sysop,\nthanks");
    }

    #[test]
    fn newline_mid_line_splits() {
        let mut ed = EditorState::from_text("hello world", limits(79));
        ed.move_to(1, 7);
        ed.newline().unwrap();
        assert_eq!(lines(&ed), vec!["hello ", "world"]);
        assert_eq!(ed.cursor(), Cursor { line: 2, col: 1 });
    }

    #[test]
    fn newline_fails_when_full() {
        let mut ed = EditorState::from_text("a\nb", Limits { wrap_width: 79, max_lines: 2 });
        assert_eq!(ed.newline(), Err(BufferError::Full { capacity: 2 }));
    }

    #[test]
    fn backspace_at_line_start_joins_and_reflows() {
        let mut ed = EditorState::from_text("hello\nworld", limits(79));
        ed.move_to(2, 1);
        ed.backspace().unwrap();
        assert_eq!(lines(&ed), vec!["helloworld"]);
        assert_eq!(ed.cursor(), Cursor { line: 1, col: 6 });
        ed.backspace().unwrap();
        assert_eq!(lines(&ed), vec!["hellworld"]);
        ed.move_to(1, 1);
        ed.backspace().unwrap();
        assert_eq!(ed.cursor(), Cursor { line: 1, col: 1 });
    }

    #[test]
    fn delete_forward_joins_at_end_of_line() {
        let mut ed = EditorState::from_text("ab\ncd", limits(79));
        ed.move_to(1, 3);
        ed.delete_forward().unwrap();
        assert_eq!(lines(&ed), vec!["abcd"]);
        ed.delete_forward().unwrap();
        assert_eq!(lines(&ed), vec!["abd"]);
        ed.end();
        ed.delete_forward().unwrap();
        assert_eq!(lines(&ed), vec!["abd"]);
    }

    #[test]
    fn reformat_pulls_up_short_lines() {
        let mut ed = EditorState::from_text("alpha\nbeta\ngamma", limits(79));
        ed.buffer.set_hard(1, false).unwrap();
        ed.buffer.set_hard(2, false).unwrap();
        ed.move_to(3, 2);
        let out = ed.reformat().unwrap();
        assert_eq!(out.start, 1);
        assert_eq!(lines(&ed), vec!["alpha beta gamma"]);
        assert_eq!(ed.cursor(), Cursor { line: 1, col: 13 });
    }

    #[test]
    fn overwrite_replaces_then_appends() {
        let mut ed = EditorState::from_text("cat", limits(79));
        ed.overwrite_char('b').unwrap();
        ed.end();
        ed.overwrite_char('s').unwrap();
        assert_eq!(ed.export(), "bats");
    }

    #[test]
    fn motion_is_clamped() {
        let mut ed = EditorState::from_text("long line\nab\n", limits(79));
        ed.move_to(1, 50);
        assert_eq!(ed.cursor(), Cursor { line: 1, col: 10 });
        ed.move_down();
        assert_eq!(ed.cursor(), Cursor { line: 2, col: 3 });
        ed.move_down();
        assert_eq!(ed.cursor(), Cursor { line: 3, col: 1 });
        ed.move_down();
        assert_eq!(ed.cursor().line, 3);
        ed.move_left();
        assert_eq!(ed.cursor(), Cursor { line: 2, col: 3 });
        ed.move_right();
        assert_eq!(ed.cursor(), Cursor { line: 3, col: 1 });
        ed.move_up();
        ed.move_up();
        ed.home();
        assert_eq!(ed.cursor(), Cursor { line: 1, col: 1 });
        ed.move_up();
        assert_eq!(ed.cursor(), Cursor { line: 1, col: 1 });
    }
}
