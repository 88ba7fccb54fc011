//! Errors raised while loading or validating configuration.

use std::sync::Arc;

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors raised while reading configuration sources.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration '{path}': {source}")]
    Read {
        /// File that was being read.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The configuration document was malformed.
    #[error("invalid configuration{}: {message}", origin_suffix(.path.as_ref()))]
    Parse {
        /// File the document came from, if any.
        path: Option<Utf8PathBuf>,
        /// Parser diagnostic.
        message: String,
    },
}

fn origin_suffix(path: Option<&Utf8PathBuf>) -> String {
    path.map(|p| format!(" in '{p}'")).unwrap_or_default()
}

/// Configuration combinations rejected before any rendering begins.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigValidationError {
    /// Server-side rendering is disabled and the stylesheet is not injected,
    /// leaving client-side rendering without KaTeX styles.
    #[error(
        "`disable: true` requires `add_katex_css: true`; otherwise no KaTeX \
         stylesheet reaches the client-rendered fallback"
    )]
    StylesUnreachable,

    /// A zero render timeout would fail every call.
    #[error("`render_timeout_secs` must be greater than zero")]
    ZeroTimeout,

    /// An extension list contained a blank name.
    #[error("`{key}` contains an empty extension name")]
    EmptyContribName {
        /// Key holding the blank entry.
        key: &'static str,
    },
}
