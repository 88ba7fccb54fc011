//! Default values for configuration keys.

use camino::Utf8PathBuf;

use crate::logging::LogFormat;

/// Default CDN location of the KaTeX distribution.
pub const DEFAULT_KATEX_DIST: &str = "https://cdn.jsdelivr.net/npm/katex@latest/dist/";

/// Default KaTeX stylesheet file name.
pub const DEFAULT_KATEX_CSS_FILENAME: &str = "katex.min.css";

/// Default site-relative directory for copied assets.
pub const DEFAULT_COPY_ASSETS_TO: &str = "assets/katex";

/// Default per-call render timeout in seconds.
pub const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 10;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default logging format for the binaries.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// Default site-relative asset directory as an owned path.
#[must_use]
pub fn default_copy_assets_to() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_COPY_ASSETS_TO)
}
