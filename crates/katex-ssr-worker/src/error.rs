//! Errors that stop the worker's request loop.

use katex_ssr_protocol::ProtocolError;
use thiserror::Error;

/// Fatal request loop failures.
///
/// Per-formula problems never surface here; they are answered with an
/// `error` response and the loop continues.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Reading the next request record failed.
    #[error("failed to read request: {source}")]
    Read {
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Writing or flushing a response record failed.
    #[error("failed to write response: {source}")]
    Write {
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A response could not be serialised.
    #[error(transparent)]
    Encode(#[from] ProtocolError),
}
