//! Configuration loading and parsing.
//!
//! Parses `termboard.toml` (or an override path supplied by the caller):
//! `[editor]` wrap width and line cap, `[render]` output target and
//! placeholder glyph, `[templates]` directory. Every key is optional. A
//! missing file yields defaults silently; a malformed file yields defaults
//! with a warning. Unknown fields are ignored so files can carry keys for
//! newer builds.
//!
//! Raw values are retained; `Config::apply_limits` computes the clamped
//! effective values the editor actually uses.

use anyhow::Result;
use core_text::codec::{DEFAULT_PLACEHOLDER, Target};
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::{info, warn};

pub const FILE_NAME: &str = "termboard.toml";
pub const APP_DIR: &str = "termboard";

/// Storage capacity of the line buffer; `max_lines` can only lower it.
pub const LINE_CAPACITY: usize = 100;
pub const MIN_WRAP_WIDTH: usize = 8;
pub const MAX_WRAP_WIDTH: usize = 79;

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct EditorConfig {
    #[serde(default = "EditorConfig::default_wrap_width")]
    pub wrap_width: usize,
    #[serde(default = "EditorConfig::default_max_lines")]
    pub max_lines: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            wrap_width: Self::default_wrap_width(),
            max_lines: Self::default_max_lines(),
        }
    }
}

impl EditorConfig {
    const fn default_wrap_width() -> usize {
        MAX_WRAP_WIDTH
    }
    const fn default_max_lines() -> usize {
        LINE_CAPACITY
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    #[serde(default)]
    pub target: Target,
    #[serde(default = "RenderConfig::default_placeholder")]
    pub placeholder: char,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            target: Target::default(),
            placeholder: Self::default_placeholder(),
        }
    }
}

impl RenderConfig {
    const fn default_placeholder() -> char {
        DEFAULT_PLACEHOLDER
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct TemplatesConfig {
    #[serde(default = "TemplatesConfig::default_dir")]
    pub dir: PathBuf,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            dir: Self::default_dir(),
        }
    }
}

impl TemplatesConfig {
    fn default_dir() -> PathBuf {
        PathBuf::from("templates")
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    #[serde(default)]
    pub editor: EditorConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub templates: TemplatesConfig,
}

/// Clamped values derived from the parsed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub wrap_width: usize,
    pub max_lines: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            wrap_width: MAX_WRAP_WIDTH,
            max_lines: LINE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub raw: Option<String>, // original file string (optional)
    pub file: ConfigFile,    // parsed (or default) data
    pub limits: Limits,      // clamped, filled by apply_limits
}

/// Best-effort config path: working directory first, then the platform
/// config dir (XDG / AppData Roaming).
pub fn discover() -> PathBuf {
    let local = PathBuf::from(FILE_NAME);
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join(APP_DIR).join(FILE_NAME);
    }
    PathBuf::from(FILE_NAME)
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        return Ok(Config::with_limits(Config::default()));
    };
    match toml::from_str::<ConfigFile>(&content) {
        Ok(file) => Ok(Config::with_limits(Config {
            raw: Some(content),
            file,
            limits: Limits::default(),
        })),
        Err(e) => {
            warn!(target: "config", file = %path.display(), error = %e, "config_parse_failed_using_defaults");
            Ok(Config::with_limits(Config::default()))
        }
    }
}

impl Config {
    fn with_limits(mut cfg: Config) -> Config {
        cfg.apply_limits();
        cfg
    }

    /// Clamp raw editor values into their supported ranges. Returns the
    /// effective limits.
    pub fn apply_limits(&mut self) -> Limits {
        let raw_width = self.file.editor.wrap_width;
        let wrap_width = raw_width.clamp(MIN_WRAP_WIDTH, MAX_WRAP_WIDTH);
        if wrap_width != raw_width {
            info!(
                target: "config",
                raw = raw_width,
                clamped = wrap_width,
                min = MIN_WRAP_WIDTH,
                max = MAX_WRAP_WIDTH,
                "wrap_width_clamped"
            );
        }

        let raw_lines = self.file.editor.max_lines;
        let max_lines = raw_lines.clamp(1, LINE_CAPACITY);
        if max_lines != raw_lines {
            info!(
                target: "config",
                raw = raw_lines,
                clamped = max_lines,
                capacity = LINE_CAPACITY,
                "max_lines_clamped"
            );
        }

        self.limits = Limits {
            wrap_width,
            max_lines,
        };
        self.limits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex, MutexGuard};
    use tracing::Level;
    use tracing::subscriber::with_default;
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone)]
    struct BufferWriter {
        inner: Arc<Mutex<Vec<u8>>>,
    }

    impl BufferWriter {
        fn new() -> (Self, Arc<Mutex<Vec<u8>>>) {
            let buf = Arc::new(Mutex::new(Vec::new()));
            (Self { inner: buf.clone() }, buf)
        }
    }

    struct LockedWriter<'a> {
        guard: MutexGuard<'a, Vec<u8>>,
    }

    impl<'a> Write for LockedWriter<'a> {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.guard.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for BufferWriter {
        type Writer = LockedWriter<'a>;

        fn make_writer(&'a self) -> Self::Writer {
            LockedWriter {
                guard: self.inner.lock().expect("log buffer poisoned"),
            }
        }
    }

    fn capture<F: FnOnce()>(level: Level, f: F) -> String {
        let (writer, buffer) = BufferWriter::new();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_target(true)
            .with_ansi(false)
            .without_time()
            .with_writer(writer)
            .finish();
        with_default(subscriber, f);
        let out = buffer.lock().unwrap().clone();
        String::from_utf8(out).unwrap()
    }

    fn write_tmp(content: &str) -> tempfile::NamedTempFile {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), content).unwrap();
        tmp
    }

    #[test]
    fn default_config_when_missing_file() {
        let cfg = load_from(Some(PathBuf::from("__nonexistent_hopefully__.toml"))).unwrap();
        assert!(cfg.raw.is_none());
        assert_eq!(cfg.file, ConfigFile::default());
        assert_eq!(cfg.limits.wrap_width, 79);
        assert_eq!(cfg.limits.max_lines, 100);
        assert_eq!(cfg.file.render.target, Target::Utf8);
        assert_eq!(cfg.file.render.placeholder, '?');
        assert_eq!(cfg.file.templates.dir, PathBuf::from("templates"));
    }

    #[test]
    fn parses_all_sections() {
        let tmp = write_tmp(
            "[editor]\nwrap_width = 40\nmax_lines = 60\n\
             [render]\ntarget = \"cp437\"\nplaceholder = \"*\"\n\
             [templates]\ndir = \"art\"\n",
        );
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert!(cfg.raw.is_some());
        assert_eq!(cfg.limits, Limits { wrap_width: 40, max_lines: 60 });
        assert_eq!(cfg.file.render.target, Target::Cp437);
        assert_eq!(cfg.file.render.placeholder, '*');
        assert_eq!(cfg.file.templates.dir, PathBuf::from("art"));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let tmp = write_tmp("[render]\ntarget = \"cp437\"\n");
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.file.editor, EditorConfig::default());
        assert_eq!(cfg.file.render.placeholder, '?');
    }

    #[test]
    fn unknown_keys_ignored() {
        let tmp = write_tmp("[editor]\nwrap_width = 60\nspell_check = true\n[extra]\nx = 1\n");
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.limits.wrap_width, 60);
    }

    #[test]
    fn clamps_wrap_width_into_range() {
        let tmp = write_tmp("[editor]\nwrap_width = 200\nmax_lines = 500\n");
        let mut cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.file.editor.wrap_width, 200);
        assert_eq!(cfg.limits.wrap_width, 79);
        assert_eq!(cfg.limits.max_lines, 100);
        cfg.file.editor.wrap_width = 2;
        assert_eq!(cfg.apply_limits().wrap_width, 8);
    }

    #[test]
    fn clamp_logging_uses_config_target() {
        let mut cfg = Config::default();
        cfg.file.editor.wrap_width = 120;
        let log_output = capture(Level::INFO, || {
            cfg.apply_limits();
        });
        assert!(log_output.contains("INFO config:"));
        assert!(log_output.contains("wrap_width_clamped"));
        assert_eq!(cfg.limits.wrap_width, 79);
    }

    #[test]
    fn malformed_file_falls_back_with_warning() {
        let tmp = write_tmp("[editor\nwrap_width = = 3\n");
        let path = tmp.path().to_path_buf();
        let mut result = None;
        let log_output = capture(Level::WARN, || {
            result = Some(load_from(Some(path)).unwrap());
        });
        let cfg = result.unwrap();
        assert!(cfg.raw.is_none());
        assert_eq!(cfg.limits, Limits::default());
        assert!(log_output.contains("WARN config:"));
        assert!(log_output.contains("config_parse_failed_using_defaults"));
    }

    #[test]
    fn wrong_type_is_treated_as_malformed() {
        let tmp = write_tmp("[render]\ntarget = \"ebcdic\"\n");
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.file.render.target, Target::Utf8);
    }
}
