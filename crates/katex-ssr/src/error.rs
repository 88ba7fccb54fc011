//! Error types for the host side of the renderer.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use katex_ssr_protocol::ProtocolError;
use thiserror::Error;

/// Failures of the worker channel.
///
/// Every variant except [`ChannelError::ShutDown`] leaves the worker torn
/// down; the next call spawns a fresh one.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The worker executable could not be started.
    #[error("failed to spawn rendering worker `{command}`: {source}")]
    Spawn {
        /// Command that failed to start.
        command: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// The worker executable does not exist or is not runnable.
    #[error("cannot locate runtime for rendering worker `{command}`: {reason}")]
    WorkerUnavailable {
        /// Command that could not be resolved.
        command: String,
        /// Human-readable cause.
        reason: String,
    },

    /// Writing to or reading from the worker failed.
    #[error("rendering worker I/O failed: {source}")]
    Io {
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// The worker sent a record that does not fit the protocol.
    #[error("rendering worker broke protocol: {0}")]
    Protocol(#[from] ProtocolError),

    /// The worker did not answer in time.
    #[error("rendering worker did not answer within {timeout:?}")]
    Timeout {
        /// Configured per-call timeout.
        timeout: Duration,
    },

    /// The worker closed its output before answering.
    #[error("rendering worker exited before answering ({status}){}", stderr_suffix(.stderr))]
    WorkerExited {
        /// Exit status description.
        status: String,
        /// Last lines the worker wrote to stderr.
        stderr: Vec<String>,
    },

    /// The channel was shut down and accepts no more calls.
    #[error("rendering worker channel has been shut down")]
    ShutDown,
}

impl ChannelError {
    pub(crate) fn io(source: io::Error) -> Self {
        Self::Io {
            source: Arc::new(source),
        }
    }

    /// Whether the worker vanished before any response line was read.
    pub(crate) fn is_lost_worker(&self) -> bool {
        match self {
            Self::WorkerExited { .. } => true,
            Self::Io { source } => source.kind() == io::ErrorKind::BrokenPipe,
            _ => false,
        }
    }
}

fn stderr_suffix(lines: &[String]) -> String {
    if lines.is_empty() {
        String::new()
    } else {
        format!("; stderr: {}", lines.join(" | "))
    }
}

/// Failures surfaced by [`RenderService`](crate::RenderService).
///
/// Formulas the worker rejects are not errors; they produce fallback markup.
#[derive(Debug, Error)]
pub enum RenderServiceError {
    /// The worker channel failed.
    #[error(transparent)]
    Channel(#[from] ChannelError),
}
