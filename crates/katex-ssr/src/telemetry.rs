//! Structured telemetry initialisation for the host and worker binaries.
//!
//! Logs always go to stderr: the worker's stdout carries protocol records
//! and the CLI's stdout carries rendered HTML.

use std::io::{self, IsTerminal};

use katex_ssr_config::{Config, LogFormat};
use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Handle returned when telemetry has been initialised.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to parse the log filter expression.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Failed to install the tracing subscriber.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// What the global subscriber records and how it writes events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// `tracing` filter expression.
    pub filter: String,
    /// Output format.
    pub format: LogFormat,
    /// Tags each event with the name of the thread that emitted it.
    pub thread_names: bool,
}

impl LogSettings {
    /// Host settings from a loaded configuration.
    ///
    /// Thread names are recorded because batch rendering spreads formulas
    /// over named threads.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            filter: config.log_filter().to_owned(),
            format: config.log_format(),
            thread_names: true,
        }
    }

    /// Settings for the single-threaded worker process.
    #[must_use]
    pub fn worker(filter: impl Into<String>, format: LogFormat) -> Self {
        Self {
            filter: filter.into(),
            format,
            thread_names: false,
        }
    }

    /// Replaces the filter and format with whichever overrides are given.
    #[must_use]
    pub fn with_overrides(mut self, filter: Option<&str>, format: Option<LogFormat>) -> Self {
        if let Some(directives) = filter {
            directives.clone_into(&mut self.filter);
        }
        if let Some(chosen) = format {
            self.format = chosen;
        }
        self
    }
}

/// Configures the global tracing subscriber when invoked for the first time.
///
/// Later calls return a fresh [`TelemetryHandle`] without touching the
/// global state again, whatever settings they pass.
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] when the filter is not a valid
/// `tracing` directive and [`TelemetryError::Subscriber`] when another
/// subscriber was installed outside this function.
///
/// # Examples
///
/// ```rust
/// use katex_ssr::telemetry::{self, LogSettings};
/// use katex_ssr_config::LogFormat;
///
/// # fn main() -> Result<(), katex_ssr::telemetry::TelemetryError> {
/// let first = telemetry::initialise(&LogSettings::worker("info", LogFormat::Compact))?;
/// let second = telemetry::initialise(&LogSettings::worker("debug", LogFormat::Json))?;
///
/// // Only the first call installs telemetry.
/// drop(first);
/// drop(second);
/// # Ok(())
/// # }
/// ```
pub fn initialise(settings: &LogSettings) -> Result<TelemetryHandle, TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| install_subscriber(settings))
        .map(|()| TelemetryHandle)
}

fn install_subscriber(settings: &LogSettings) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_new(&settings.filter)
        .map_err(|error| TelemetryError::Filter(error.to_string()))?;

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(settings.thread_names)
        .with_writer(io::stderr)
        // Build logs are usually captured; colour only on a live terminal.
        .with_ansi(io::stderr().is_terminal())
        // Host and worker share one stderr, so lines need a common clock.
        .with_timer(fmt::time::UtcTime::rfc_3339());

    let subscriber: Box<dyn Subscriber + Send + Sync> = match settings.format {
        LogFormat::Json => Box::new(builder.json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder.compact().finish()),
    };

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
}
