//! Tracked text style (SGR state) and its minimal restore sequence.
//!
//! Colors are palette indices 0..=15; `None` inherits the terminal default.
//! Bright variants (90–97 / 100–107) land in 8..=15.

use bitflags::bitflags;
use std::fmt::Write as _;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Attrs: u8 {
        const BOLD = 1 << 0;
        const FAINT = 1 << 1;
        const BLINK = 1 << 2;
        const REVERSE = 1 << 3;
        const HIDDEN = 1 << 4;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Style {
    pub attrs: Attrs,
    pub fg: Option<u8>,
    pub bg: Option<u8>,
}

impl Style {
    pub fn is_default(&self) -> bool {
        *self == Style::default()
    }

    pub fn reset(&mut self) {
        *self = Style::default();
    }

    /// Fold SGR parameters. An empty list (or a lone omitted parameter) is a
    /// reset, as `ESC[m` is.
    pub fn apply_sgr(&mut self, params: &[u16]) {
        if params.is_empty() {
            self.reset();
            return;
        }
        for &p in params {
            match p {
                0 => self.reset(),
                1 => self.attrs.insert(Attrs::BOLD),
                2 => self.attrs.insert(Attrs::FAINT),
                5 | 6 => self.attrs.insert(Attrs::BLINK),
                7 => self.attrs.insert(Attrs::REVERSE),
                8 => self.attrs.insert(Attrs::HIDDEN),
                22 => self.attrs.remove(Attrs::BOLD | Attrs::FAINT),
                25 => self.attrs.remove(Attrs::BLINK),
                27 => self.attrs.remove(Attrs::REVERSE),
                28 => self.attrs.remove(Attrs::HIDDEN),
                30..=37 => self.fg = Some((p - 30) as u8),
                39 => self.fg = None,
                40..=47 => self.bg = Some((p - 40) as u8),
                49 => self.bg = None,
                90..=97 => self.fg = Some((p - 90 + 8) as u8),
                100..=107 => self.bg = Some((p - 100 + 8) as u8),
                _ => {}
            }
        }
    }

    /// Shortest sequence that re-establishes this style from any prior state.
    pub fn restore_sequence(&self) -> String {
        if self.is_default() {
            return "\x1b[0m".to_string();
        }
        let mut s = String::from("\x1b[0");
        for (flag, code) in [
            (Attrs::BOLD, 1),
            (Attrs::FAINT, 2),
            (Attrs::BLINK, 5),
            (Attrs::REVERSE, 7),
            (Attrs::HIDDEN, 8),
        ] {
            if self.attrs.contains(flag) {
                let _ = write!(s, ";{code}");
            }
        }
        if let Some(fg) = self.fg {
            let code = if fg < 8 { 30 + fg as u16 } else { 90 + (fg as u16 - 8) };
            let _ = write!(s, ";{code}");
        }
        if let Some(bg) = self.bg {
            let code = if bg < 8 { 40 + bg as u16 } else { 100 + (bg as u16 - 8) };
            let _ = write!(s, ";{code}");
        }
        s.push('m');
        s
    }
}
