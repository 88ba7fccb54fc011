//! Command-line runtime for the `katex-ssr` binary.
//!
//! The runtime is exercised both from the binary entrypoint and from tests
//! where the input and output streams are substituted.

mod args;
mod batch;

use std::ffi::OsString;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use clap::Parser;
use katex_ssr_config::Config;
use katex_ssr_protocol::RenderOptions;
use thiserror::Error;

use self::args::{Cli, CliCommand};
use crate::bootstrap::{BootstrapError, FileConfigLoader, build_service, load_config};
use crate::error::RenderServiceError;
use crate::telemetry::{self, LogSettings};

/// Failures reported by the CLI before exiting non-zero.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration, validation or telemetry setup failed.
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    /// The worker channel failed.
    #[error(transparent)]
    Render(#[from] RenderServiceError),
    /// Batch input could not be read.
    #[error("failed to read batch input: {0}")]
    Input(#[source] io::Error),
    /// A batch input line was not a formula record.
    #[error("batch input line {line} is not a formula record: {source}")]
    BatchRecord {
        /// One-based line number.
        line: usize,
        /// Parser diagnostic.
        #[source]
        source: serde_json::Error,
    },
    /// A batch result could not be encoded.
    #[error("failed to encode batch output: {0}")]
    Encode(#[source] serde_json::Error),
    /// Batch rendering threads could not be started.
    #[error("failed to start batch threads: {0}")]
    Threads(#[source] io::Error),
    /// Writing to stdout failed.
    #[error("failed to write output: {0}")]
    Output(#[source] io::Error),
}

/// Runs the CLI using the provided arguments and IO handles.
///
/// `input` feeds the `batch` subcommand; rendered HTML goes to `stdout` and
/// diagnostics to `stderr`.
pub fn run<I, R, W, E>(args: I, input: &mut R, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    R: BufRead,
    W: Write,
    E: Write,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => return report_usage(&error, stdout, stderr),
    };
    match execute(&cli, input, stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let _ = writeln!(stderr, "katex-ssr: {error}");
            ExitCode::FAILURE
        }
    }
}

fn report_usage(error: &clap::Error, stdout: &mut impl Write, stderr: &mut impl Write) -> ExitCode {
    let rendered = error.render();
    if error.use_stderr() {
        let _ = write!(stderr, "{rendered}");
    } else {
        let _ = write!(stdout, "{rendered}");
    }
    u8::try_from(error.exit_code()).map_or(ExitCode::FAILURE, ExitCode::from)
}

fn execute(cli: &Cli, input: &mut impl BufRead, stdout: &mut impl Write) -> Result<(), CliError> {
    let config = load_config(&FileConfigLoader::new(cli.config.clone()))?;
    initialise_telemetry(cli, &config)?;

    match &cli.command {
        CliCommand::Check => report_check(&config, stdout),
        CliCommand::Render {
            display,
            contribs,
            latex,
        } => {
            let service = build_service(&config)?;
            let rendered = service.render(latex, *display, &RenderOptions::new(), contribs);
            service.finish();
            writeln!(stdout, "{}", rendered?).map_err(CliError::Output)
        }
        CliCommand::Batch { jobs } => {
            let service = build_service(&config)?;
            let items = batch::read_items(input)?;
            let outcome = batch::render_items(&service, &items, *jobs, stdout);
            service.finish();
            outcome
        }
    }
}

fn initialise_telemetry(cli: &Cli, config: &Config) -> Result<(), CliError> {
    let settings = LogSettings::from_config(config)
        .with_overrides(cli.log_filter.as_deref(), cli.log_format);
    telemetry::initialise(&settings)
        .map(|_| ())
        .map_err(|source| BootstrapError::Telemetry { source }.into())
}

fn report_check(config: &Config, stdout: &mut impl Write) -> Result<(), CliError> {
    let contribs = config.ssr_contribs();
    let summary = if config.disable {
        String::from("configuration is valid; server-side rendering is disabled")
    } else if contribs.is_empty() {
        String::from("configuration is valid")
    } else {
        format!("configuration is valid; extensions: {}", contribs.join(", "))
    };
    writeln!(stdout, "{summary}").map_err(CliError::Output)
}
