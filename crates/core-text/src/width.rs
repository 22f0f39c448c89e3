//! Escape-aware width helpers.
//!
//! Every measurement in the workspace flows through [`visible_length`]. Styled
//! text may carry CSI sequences anywhere, so naive `chars().count()` is never
//! a width.
//!
//! Invariants:
//! - Escape runs are zero width and are never split by [`truncate`].
//! - [`pad`] only appends; it never truncates.
//! - [`apply_width_constraint_aligned`] with a non-zero width always yields
//!   exactly `width` visible characters.
//!
//! A width of `0` means "unconstrained" for the constraint helpers.

use crate::escape::{Piece, pieces};

/// Horizontal alignment inside a fixed-width field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    Left,
    Right,
    Center,
}

impl Alignment {
    /// `L`, `R`, `C` map to their alignment; anything else (including the
    /// empty string) is `Left`.
    pub fn parse(code: &str) -> Self {
        match code {
            "R" => Alignment::Right,
            "C" => Alignment::Center,
            _ => Alignment::Left,
        }
    }

    /// Split `total` padding cells into (left, right).
    /// Center puts the odd cell on the right.
    pub fn split(self, total: usize) -> (usize, usize) {
        match self {
            Alignment::Left => (0, total),
            Alignment::Right => (total, 0),
            Alignment::Center => {
                let left = total / 2;
                (left, total - left)
            }
        }
    }
}

/// Number of characters outside escape sequences.
pub fn visible_length(text: &str) -> usize {
    pieces(text)
        .filter(|p| matches!(p, Piece::Char(_)))
        .count()
}

/// Keep at most `max` visible characters. Escape runs are always copied,
/// including ones after the cut, so trailing resets survive.
pub fn truncate(text: &str, max: usize) -> String {
    let mut out = String::with_capacity(text.len());
    let mut kept = 0usize;
    for piece in pieces(text) {
        match piece {
            Piece::Escape(run) => out.push_str(run),
            Piece::Char(c) => {
                if kept < max {
                    out.push(c);
                    kept += 1;
                }
            }
        }
    }
    out
}

/// Append `pad_char` until the visible length reaches `width`.
pub fn pad(text: &str, width: usize, pad_char: char) -> String {
    let missing = width.saturating_sub(visible_length(text));
    let mut out = String::with_capacity(text.len() + missing);
    out.push_str(text);
    out.extend(std::iter::repeat_n(pad_char, missing));
    out
}

/// Truncate then space-pad to exactly `width`; `width == 0` returns the text
/// unchanged.
pub fn apply_width_constraint(text: &str, width: usize) -> String {
    apply_width_constraint_aligned(text, width, Alignment::Left)
}

/// Like [`apply_width_constraint`] with the padding placed per `align`.
pub fn apply_width_constraint_aligned(text: &str, width: usize, align: Alignment) -> String {
    if width == 0 {
        return text.to_string();
    }
    let visible = visible_length(text);
    let body = if visible > width {
        truncate(text, width)
    } else {
        text.to_string()
    };
    let total = width.saturating_sub(visible.min(width));
    let (left, right) = align.split(total);
    let mut out = String::with_capacity(body.len() + total);
    out.extend(std::iter::repeat_n(' ', left));
    out.push_str(&body);
    out.extend(std::iter::repeat_n(' ', right));
    out
}
