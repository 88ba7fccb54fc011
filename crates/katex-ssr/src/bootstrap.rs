//! Startup orchestration: configuration, validation and service assembly.
//!
//! Validation always runs before a supervisor exists, so a rejected
//! configuration never spawns a worker.

use camino::Utf8PathBuf;
use katex_ssr_config::{Config, ConfigError, ConfigValidationError};
use thiserror::Error;
use tracing::{debug, info};

use crate::cache::RenderCache;
use crate::service::{RenderService, RenderSettings};
use crate::supervisor::{ChannelSupervisor, WorkerConfig};
use crate::telemetry::TelemetryError;

/// Log target for bootstrap operations.
const BOOTSTRAP_TARGET: &str = "katex_ssr::bootstrap";

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the source cannot be read or parsed.
    fn load(&self) -> Result<Config, ConfigError>;
}

/// Loader reading an optional YAML file, falling back to defaults.
#[derive(Debug, Default, Clone)]
pub struct FileConfigLoader {
    path: Option<Utf8PathBuf>,
}

impl FileConfigLoader {
    /// Loader for `path`, or for the built-in defaults when `None`.
    #[must_use]
    pub const fn new(path: Option<Utf8PathBuf>) -> Self {
        Self { path }
    }
}

impl ConfigLoader for FileConfigLoader {
    fn load(&self) -> Result<Config, ConfigError> {
        match &self.path {
            Some(path) => Config::load(path),
            None => Ok(Config::default()),
        }
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: ConfigError,
    },
    /// Configuration loaded but breaks a cross-key rule.
    #[error("invalid configuration: {source}")]
    Validation {
        /// Rule that failed.
        #[source]
        source: ConfigValidationError,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// Server-side rendering is switched off in the configuration.
    #[error("server-side rendering is disabled (`disable: true`); formulas are left to the browser")]
    Disabled,
}

/// Loads and validates the configuration.
///
/// # Errors
///
/// Returns [`BootstrapError::Configuration`] or
/// [`BootstrapError::Validation`].
pub fn load_config(loader: &dyn ConfigLoader) -> Result<Config, BootstrapError> {
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;
    config
        .validate()
        .map_err(|source| BootstrapError::Validation { source })?;
    debug!(
        target: BOOTSTRAP_TARGET,
        contribs = ?config.ssr_contribs(),
        disable = config.disable,
        "configuration validated"
    );
    Ok(config)
}

/// Assembles the render service described by `config`.
///
/// The configuration is validated again here so callers that skip
/// [`load_config`] still cannot start a worker from a rejected
/// configuration. The worker itself starts on the first cache miss.
///
/// # Errors
///
/// Returns [`BootstrapError::Validation`] for a rejected configuration and
/// [`BootstrapError::Disabled`] when server-side rendering is switched off.
pub fn build_service(config: &Config) -> Result<RenderService, BootstrapError> {
    config
        .validate()
        .map_err(|source| BootstrapError::Validation { source })?;
    if config.disable {
        return Err(BootstrapError::Disabled);
    }

    let worker = WorkerConfig::from_config(config);
    let cache = config
        .cache_dir
        .as_ref()
        .map_or_else(RenderCache::new, |dir| RenderCache::with_directory(dir.clone()));
    info!(
        target: BOOTSTRAP_TARGET,
        worker = %worker.command_display(),
        cache_dir = ?cache.directory(),
        "render service configured"
    );
    let supervisor = ChannelSupervisor::new(worker, config.ssr_contribs());
    Ok(RenderService::new(
        supervisor,
        cache,
        RenderSettings::from_config(config),
    ))
}

/// Loads the configuration and assembles the render service.
///
/// # Errors
///
/// See [`load_config`] and [`build_service`].
pub fn bootstrap(loader: &dyn ConfigLoader) -> Result<RenderService, BootstrapError> {
    let config = load_config(loader)?;
    build_service(&config)
}
