//! Typesetting engine seam.
//!
//! The worker never depends on a concrete engine directly; it drives a
//! [`Typesetter`]. Production builds use [`KatexTypesetter`], which runs KaTeX
//! inside an embedded JavaScript engine.

mod katex_typesetter;
mod settings;

use std::collections::BTreeMap;

use katex_ssr_protocol::FormulaRequest;
use thiserror::Error;

pub use self::katex_typesetter::KatexTypesetter;
pub use self::settings::{KatexSettings, OutputFormat};

/// Macro definitions keyed by control sequence.
pub type MacroTable = BTreeMap<String, String>;

/// Errors raised while typesetting one formula.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesetError {
    /// A known option carried a value of the wrong type.
    #[error("option `{name}` must be {expected}")]
    InvalidOption {
        /// Option name as sent by the host.
        name: String,
        /// Human-readable description of the accepted values.
        expected: &'static str,
    },

    /// The engine rejected the formula.
    #[error("{message}")]
    Rejected {
        /// Engine diagnostic.
        message: String,
    },

    /// The engine itself failed.
    #[error("typesetting engine failure: {message}")]
    Engine {
        /// Engine diagnostic.
        message: String,
    },
}

/// Renders one formula to an HTML fragment.
pub trait Typesetter {
    /// Typesets `formula`, with `macros` contributed by loaded extensions
    /// applied beneath any macros the request itself supplies.
    ///
    /// # Errors
    ///
    /// Returns a [`TypesetError`] when the options are invalid or the engine
    /// rejects the formula.
    fn typeset(&self, formula: &FormulaRequest, macros: &MacroTable)
    -> Result<String, TypesetError>;
}

#[cfg(test)]
mod tests;
