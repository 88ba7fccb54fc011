//! Configuration for spawning the rendering worker.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use katex_ssr_config::{Config, DEFAULT_RENDER_TIMEOUT_SECS};

/// File name of the worker executable.
pub const WORKER_BINARY: &str = "katex-ssr-worker";

/// How to start the worker and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// The executable path or command name.
    pub command: PathBuf,
    /// Arguments passed to the worker.
    pub args: Vec<String>,
    /// Working directory for the spawned process.
    pub working_dir: Option<PathBuf>,
    /// Longest wait for one response record.
    pub timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self::new(default_command())
    }
}

impl WorkerConfig {
    /// Configuration for the given command with no arguments and the
    /// default timeout.
    #[must_use]
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            working_dir: None,
            timeout: Duration::from_secs(DEFAULT_RENDER_TIMEOUT_SECS),
        }
    }

    /// Derives the worker settings from the loaded configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let command = config
            .worker_command
            .as_ref()
            .map_or_else(default_command, |path| path.clone().into_std_path_buf());
        Self {
            command,
            args: config.worker_args.clone(),
            working_dir: config
                .working_dir
                .as_ref()
                .map(|dir| dir.clone().into_std_path_buf()),
            timeout: config.render_timeout(),
        }
    }

    /// Sets the worker arguments.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Sets a custom working directory.
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Sets the per-call timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Command rendered for diagnostics.
    #[must_use]
    pub fn command_display(&self) -> String {
        self.command.display().to_string()
    }
}

/// Prefers a worker installed next to the running executable, falling back
/// to a `PATH` lookup.
fn default_command() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(WORKER_BINARY)))
        .filter(|candidate| candidate.is_file())
        .unwrap_or_else(|| PathBuf::from(WORKER_BINARY))
}
