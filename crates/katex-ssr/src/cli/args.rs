//! Command-line argument definitions for `katex-ssr`.

use std::num::NonZeroUsize;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use katex_ssr_config::LogFormat;

/// Renders TeX formulas to static HTML through a persistent KaTeX worker.
#[derive(Parser, Debug)]
#[command(name = "katex-ssr", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// YAML configuration file; built-in defaults apply when omitted.
    #[arg(long, global = true, value_name = "PATH")]
    pub(crate) config: Option<Utf8PathBuf>,
    /// Overrides the configured `tracing` filter.
    #[arg(long, global = true, value_name = "FILTER")]
    pub(crate) log_filter: Option<String>,
    /// Overrides the configured log format (`compact` or `json`).
    #[arg(long, global = true, value_name = "FORMAT")]
    pub(crate) log_format: Option<LogFormat>,
    /// Operation to perform.
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// Subcommands of the `katex-ssr` binary.
#[derive(Subcommand, Debug, Clone)]
pub(crate) enum CliCommand {
    /// Renders one formula and prints its HTML.
    Render {
        /// Typesets in display (block) mode.
        #[arg(long)]
        display: bool,
        /// Additional extension to load; repeatable.
        #[arg(long = "contrib", value_name = "NAME")]
        contribs: Vec<String>,
        /// TeX source of the formula.
        #[arg(value_name = "LATEX", allow_hyphen_values = true)]
        latex: String,
    },
    /// Renders JSON-lines formula records from stdin, one output line each.
    Batch {
        /// Threads sharing the render service.
        #[arg(long, value_name = "N", default_value = "4")]
        jobs: NonZeroUsize,
    },
    /// Validates the configuration without rendering anything.
    Check,
}
