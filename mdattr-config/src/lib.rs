//! Layered configuration for mdattr.
//!
//! `defaults/mdattr.default.toml` is embedded, so every key always has a value and the file
//! doubles as the reference for what can be set. Sources are layered in this order, later
//! ones winning key by key:
//!
//! 1. embedded defaults ([`Loader::new`])
//! 2. `./mdattr.toml` when present ([`Loader::with_project_file`])
//! 3. an explicit file such as the CLI's `--config` ([`Loader::with_file`])
//! 4. single key overrides ([`Loader::set_override`])
//!
//! The result deserializes into [`MdattrConfig`], which converts into the library's
//! [`RenderOptions`] and [`PostprocessOptions`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use mdattr::{DeferredOptions, MatchMode, PostprocessOptions, RenderOptions};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_TOML: &str = include_str!("../defaults/mdattr.default.toml");

/// Top-level configuration consumed by mdattr applications.
#[derive(Debug, Clone, Deserialize)]
pub struct MdattrConfig {
    pub render: RenderConfig,
    pub deferred: DeferredConfig,
    pub output: OutputConfig,
}

impl MdattrConfig {
    /// Options for the postprocessor, combining render and deferred settings.
    pub fn postprocess_options(&self) -> PostprocessOptions {
        PostprocessOptions {
            keep_sourcepos: self.render.keep_sourcepos,
            deferred: DeferredOptions::from(&self.deferred),
        }
    }
}

/// comrak extensions and output knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct RenderConfig {
    pub table: bool,
    pub strikethrough: bool,
    pub autolink: bool,
    pub tasklist: bool,
    pub math_dollars: bool,
    pub unsafe_html: bool,
    pub keep_sourcepos: bool,
}

impl From<&RenderConfig> for RenderOptions {
    fn from(config: &RenderConfig) -> Self {
        RenderOptions {
            table: config.table,
            strikethrough: config.strikethrough,
            autolink: config.autolink,
            tasklist: config.tasklist,
            math_dollars: config.math_dollars,
            unsafe_html: config.unsafe_html,
        }
    }
}

/// Deferred block reconciliation.
#[derive(Debug, Clone, Deserialize)]
pub struct DeferredConfig {
    pub fence_language: String,
    pub marker_attribute: String,
    pub match_mode: MatchMode,
    pub keep_markers: bool,
    pub wrapper_class: String,
}

impl From<DeferredConfig> for DeferredOptions {
    fn from(config: DeferredConfig) -> Self {
        DeferredOptions {
            fence_language: config.fence_language,
            marker_attribute: config.marker_attribute,
            match_mode: config.match_mode,
            keep_markers: config.keep_markers,
            wrapper_class: config.wrapper_class,
        }
    }
}

impl From<&DeferredConfig> for DeferredOptions {
    fn from(config: &DeferredConfig) -> Self {
        DeferredOptions::from(config.clone())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub standalone: bool,
    pub title: String,
}

/// Name of the per-project file picked up from the working directory.
pub const PROJECT_CONFIG_FILE: &str = "mdattr.toml";

/// Builds an [`MdattrConfig`] from the embedded defaults plus any number of layers.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer `./mdattr.toml` if the working directory has one.
    pub fn with_project_file(self) -> Self {
        self.with_optional_file(PROJECT_CONFIG_FILE)
    }

    /// Layer a TOML file that must exist.
    pub fn with_file(self, path: impl AsRef<Path>) -> Self {
        self.layer(path.as_ref(), true)
    }

    /// Layer a TOML file, skipping it when absent.
    pub fn with_optional_file(self, path: impl AsRef<Path>) -> Self {
        self.layer(path.as_ref(), false)
    }

    fn layer(mut self, path: &Path, required: bool) -> Self {
        let source = File::from(path).format(FileFormat::Toml).required(required);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Override one dotted key, e.g. `deferred.match_mode`.
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    pub fn build(self) -> Result<MdattrConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// The embedded defaults alone.
pub fn load_defaults() -> Result<MdattrConfig, ConfigError> {
    Loader::new().build()
}
