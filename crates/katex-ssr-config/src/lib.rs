//! Configuration surface for KaTeX server-side rendering.
//!
//! The keys mirror the options a documentation build exposes to authors
//! (`ssr_contribs`, `katex_options`, `disable`, ...) plus the knobs the host
//! needs to run its rendering worker. Configuration is read from YAML, with
//! unknown keys rejected so typos surface at startup rather than as silently
//! ignored settings.
//!
//! [`Config::validate`] enforces the cross-key rules that must hold before
//! any rendering starts.

mod defaults;
mod error;
mod logging;

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_COPY_ASSETS_TO, DEFAULT_KATEX_CSS_FILENAME, DEFAULT_KATEX_DIST, DEFAULT_LOG_FILTER,
    DEFAULT_RENDER_TIMEOUT_SECS, default_log_format,
};
pub use error::{ConfigError, ConfigValidationError};
pub use logging::{LogFormat, LogFormatParseError};

/// KaTeX options map, keyed by KaTeX's camelCase option names.
pub type KatexOptions = serde_json::Map<String, serde_json::Value>;

/// Resolved configuration shared by the CLI and the render service.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Base URL or directory of the KaTeX distribution.
    pub katex_dist: String,
    /// Stylesheet file name inside the distribution.
    pub katex_css_filename: String,
    /// Whether pages link the KaTeX stylesheet.
    pub add_katex_css: bool,
    /// Whether assets are copied into the built site.
    pub embed_assets: bool,
    /// Site-relative destination for copied assets.
    pub copy_assets_to: Utf8PathBuf,
    /// Extensions loaded into the rendering worker.
    pub ssr_contribs: Vec<String>,
    /// Scripts left for the browser to load.
    pub client_scripts: Vec<String>,
    /// Legacy alias merged into [`Config::ssr_contribs`].
    pub contrib_scripts: Vec<String>,
    /// Options merged into every render request.
    pub katex_options: KatexOptions,
    /// Bypasses server-side rendering entirely.
    pub disable: bool,
    /// Reports formula, cache-hit and timing counters at the end of a run.
    pub verbose: bool,
    /// Worker executable; resolved next to the host binary when unset.
    pub worker_command: Option<Utf8PathBuf>,
    /// Extra arguments passed to the worker.
    pub worker_args: Vec<String>,
    /// Working directory for the worker process.
    pub working_dir: Option<Utf8PathBuf>,
    /// Per-call timeout, in seconds, for a worker round-trip.
    pub render_timeout_secs: u64,
    /// Directory of the persistent render cache; memory only when unset.
    ///
    /// A relative path read from a file is resolved against that file's
    /// directory.
    pub cache_dir: Option<Utf8PathBuf>,
    /// `tracing` filter expression.
    pub log_filter: String,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            katex_dist: DEFAULT_KATEX_DIST.to_owned(),
            katex_css_filename: DEFAULT_KATEX_CSS_FILENAME.to_owned(),
            add_katex_css: true,
            embed_assets: false,
            copy_assets_to: defaults::default_copy_assets_to(),
            ssr_contribs: Vec::new(),
            client_scripts: Vec::new(),
            contrib_scripts: Vec::new(),
            katex_options: KatexOptions::new(),
            disable: false,
            verbose: false,
            worker_command: None,
            worker_args: Vec::new(),
            working_dir: None,
            render_timeout_secs: DEFAULT_RENDER_TIMEOUT_SECS,
            cache_dir: None,
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Parses configuration from a YAML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the document is malformed or
    /// contains unknown keys.
    pub fn from_yaml_str(document: &str) -> Result<Self, ConfigError> {
        Self::parse(document, None)
    }

    /// Reads and parses a YAML configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] when the file cannot be read and
    /// [`ConfigError::Parse`] when its contents are malformed.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let document = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source: Arc::new(source),
        })?;
        Self::parse(&document, Some(path))
    }

    fn parse(document: &str, path: Option<&Utf8Path>) -> Result<Self, ConfigError> {
        // An empty document means "all defaults".
        if document.trim().is_empty() {
            return Ok(Self::default());
        }
        let mut config: Self =
            serde_saphyr::from_str(document).map_err(|err| ConfigError::Parse {
                path: path.map(Utf8Path::to_path_buf),
                message: err.to_string(),
            })?;
        config.normalise(path);
        Ok(config)
    }

    fn normalise(&mut self, path: Option<&Utf8Path>) {
        if !self.katex_dist.ends_with('/') && !self.katex_dist.ends_with('\\') {
            self.katex_dist.push('/');
        }
        let base = path.and_then(Utf8Path::parent);
        if let (Some(base), Some(dir)) = (base, self.cache_dir.as_mut())
            && dir.is_relative()
        {
            *dir = base.join(&*dir);
        }
    }

    /// Checks cross-key rules that must hold before rendering begins.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigValidationError`] found.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.disable && !self.add_katex_css {
            return Err(ConfigValidationError::StylesUnreachable);
        }
        if self.render_timeout_secs == 0 {
            return Err(ConfigValidationError::ZeroTimeout);
        }
        let lists = [
            ("ssr_contribs", &self.ssr_contribs),
            ("contrib_scripts", &self.contrib_scripts),
        ];
        for (key, names) in lists {
            if names.iter().any(|name| name.trim().is_empty()) {
                return Err(ConfigValidationError::EmptyContribName { key });
            }
        }
        Ok(())
    }

    /// Extension names the rendering worker should load.
    ///
    /// Merges the legacy `contrib_scripts` list into `ssr_contribs`, drops
    /// duplicates while preserving first-seen order, and removes URL entries
    /// since those can only be loaded by a browser.
    #[must_use]
    pub fn ssr_contribs(&self) -> Vec<String> {
        let mut merged: Vec<String> = Vec::new();
        for name in self.ssr_contribs.iter().chain(&self.contrib_scripts) {
            let trimmed = name.trim();
            if trimmed.contains("://") || merged.iter().any(|seen| seen == trimmed) {
                continue;
            }
            merged.push(trimmed.to_owned());
        }
        merged
    }

    /// Per-call timeout for a worker round-trip.
    #[must_use]
    pub const fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }

    /// Configured `tracing` filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Configured log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
