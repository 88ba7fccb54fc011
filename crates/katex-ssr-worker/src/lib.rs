//! Persistent KaTeX rendering worker.
//!
//! The worker is a long-lived process that owns the typesetting capability
//! and a registry of loaded extensions. It talks to its host solely through
//! newline-delimited JSON records on stdin and stdout, as defined by
//! `katex-ssr-protocol`:
//!
//! - a `setup` record loads extensions and produces no output;
//! - every other record produces exactly one `success` or `error` line.
//!
//! Diagnostics go to stderr so stdout carries protocol records only.
//!
//! Extensions are statically linked macro packages looked up in a fixed
//! [`ContribCatalogue`]. Unknown names are logged and skipped rather than
//! failing the request.

pub mod contrib;
pub mod engine;
mod error;
pub mod server;

#[cfg(test)]
mod tests;

use std::io::{BufRead, Write};

pub use self::contrib::{ContribCatalogue, ContribRegistry, LoadReport};
pub use self::engine::{KatexTypesetter, Typesetter, TypesetError};
pub use self::error::WorkerError;
pub use self::server::{ServeSummary, Worker};

/// Serves requests from `input` with the KaTeX typesetter and the builtin
/// extension catalogue until end of input.
///
/// # Errors
///
/// Returns a [`WorkerError`] if a record cannot be read, encoded, or written.
pub fn run(input: &mut impl BufRead, output: &mut impl Write) -> Result<ServeSummary, WorkerError> {
    Worker::new(KatexTypesetter::new(), ContribCatalogue::builtin()).serve(input, output)
}
