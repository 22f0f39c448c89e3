//! Per-connection session for a terminal bulletin-board front end.
//!
//! A `Session` bundles everything one connected caller needs: the effective
//! configuration, an editor for composing messages, the output encoding and
//! a cache of loaded screen templates. Sessions share nothing except the
//! constant code tables, so a host may run one per connection on any thread.

pub mod logging;

use ahash::AHashMap;
use anyhow::Result;
use core_config::Config;
use core_render::{Field, FieldValues, RenderOptions, Template};
use core_state::EditorState;
use core_text::codec::{Target, encode_str};
use std::collections::hash_map::Entry;
use std::path::PathBuf;
use tracing::debug;

pub use core_config::{Limits, load_from};
pub use core_render::{Interpreter, style_at, substitute};
pub use core_state::{BufferError, Cursor, LineBuffer, ReflowOutcome};

#[derive(Debug)]
pub struct Session {
    config: Config,
    editor: EditorState,
    render: RenderOptions,
    templates: AHashMap<String, Template>,
}

impl Session {
    pub fn new(config: Config) -> Self {
        let editor = EditorState::new(config.limits);
        let render = RenderOptions::from(&config.file.render);
        Self {
            config,
            editor,
            render,
            templates: AHashMap::new(),
        }
    }

    /// Build from `termboard.toml` (discovered when `path` is `None`).
    pub fn from_config_path(path: Option<PathBuf>) -> Result<Self> {
        Ok(Self::new(load_from(path)?))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn render_options(&self) -> RenderOptions {
        self.render
    }

    pub fn editor(&self) -> &EditorState {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut EditorState {
        &mut self.editor
    }

    /// Begin composing, optionally seeded with existing text (a quote).
    pub fn start_message(&mut self, seed: &str) {
        self.editor = EditorState::from_text(seed, self.config.limits);
    }

    /// Export the composed text and reset the editor.
    pub fn finish_message(&mut self) -> String {
        let text = self.editor.export();
        self.editor = EditorState::new(self.config.limits);
        text
    }

    /// Cached template by name, loading `<templates.dir>/<name>.ans` on first
    /// use.
    pub fn template(&mut self, name: &str) -> Result<&Template> {
        match self.templates.entry(name.to_string()) {
            Entry::Occupied(e) => Ok(e.into_mut()),
            Entry::Vacant(e) => {
                let template = Template::load_named(&self.config, name)?;
                debug!(target: "render.template", name, fields = template.fields().len(), "template_cached");
                Ok(e.insert(template))
            }
        }
    }

    /// Register a template built elsewhere, replacing any cached copy.
    pub fn insert_template(&mut self, template: Template) {
        self.templates.insert(template.name().to_string(), template);
    }

    pub fn invalidate_templates(&mut self) {
        self.templates.clear();
    }

    /// Full screen with placeholders substituted, encoded for this session.
    pub fn render_screen<V: FieldValues + ?Sized>(&mut self, name: &str, values: &V) -> Result<Vec<u8>> {
        let opts = self.render;
        Ok(self.template(name)?.render_bytes(values, &opts))
    }

    /// Where `code` sits on screen `name`: its marker if the template has
    /// one, otherwise its first placeholder.
    pub fn field(&mut self, name: &str, code: &str) -> Result<Option<Field>> {
        let template = self.template(name)?;
        Ok(template.field(code).cloned().or_else(|| template.locate(code)))
    }

    /// Bytes that repaint `code` on an already drawn screen with `value`.
    pub fn overlay(&mut self, name: &str, code: &str, value: &str) -> Result<Option<Vec<u8>>> {
        let opts = self.render;
        Ok(self.field(name, code)?.map(|field| {
            let text = field.overlay(value);
            match opts.target {
                Target::Utf8 => text.into_bytes(),
                Target::Cp437 => encode_str(&text, opts.placeholder),
            }
        }))
    }
}
