//! Screen rendering primitives for legacy-terminal art templates.
//!
//! Pipeline for a template file:
//! 1. `core_text::sauce` strips the trailing metadata record.
//! 2. `codes` expands inline pipe codes (`|09`, `|CL`, ...) into escape
//!    sequences.
//! 3. `interpreter` replays the bytes through a cursor/style state machine,
//!    dropping zero-width field markers and recording where each one sits
//!    (row, column, restoring style) in a `FieldTable`.
//! 4. `template` substitutes `@code@` placeholders with width-constrained
//!    values and encodes the result for the session's output target.
//!
//! Invariants:
//! - Escape sequences are consumed before any inline-code, marker or
//!   placeholder check, so nothing inside a sequence is ever reinterpreted.
//! - Cursor coordinates are 1-based and never drop below 1.
//! - Everything is pure over its input bytes; the only shared state is the
//!   constant code tables.

pub mod codes;
pub mod interpreter;
pub mod style;
pub mod template;

use core_config::RenderConfig;
use core_text::codec::{DEFAULT_PLACEHOLDER, Target};

pub use interpreter::{CursorState, Field, FieldTable, Interpretation, Interpreter};
pub use style::{Attrs, Style};
pub use template::{FieldValues, Template, locate_placeholder, style_at, substitute};

/// Per-session output encoding choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub target: Target,
    /// Substitute for code points the CP437 target cannot carry.
    pub placeholder: char,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            target: Target::Utf8,
            placeholder: DEFAULT_PLACEHOLDER,
        }
    }
}

impl From<&RenderConfig> for RenderOptions {
    fn from(cfg: &RenderConfig) -> Self {
        Self {
            target: cfg.target,
            placeholder: cfg.placeholder,
        }
    }
}

impl RenderOptions {
    pub fn interpreter(&self) -> Interpreter {
        Interpreter::new(self.target)
    }
}
