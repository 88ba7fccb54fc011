//! Binary entrypoint for the persistent KaTeX rendering worker.
//!
//! Spawned by the host's channel supervisor; stdin and stdout carry protocol
//! records and stderr carries logs.

use std::io::{self, BufReader, Write};
use std::process::ExitCode;

use clap::Parser;
use katex_ssr::telemetry::{self, LogSettings};
use katex_ssr_config::LogFormat;
use tracing::debug;

/// Log target for the worker entrypoint.
const WORKER_TARGET: &str = "katex_ssr_worker::main";

/// Serves render requests over stdin and stdout until end of input.
#[derive(Parser, Debug)]
#[command(name = "katex-ssr-worker", version)]
struct WorkerCli {
    /// `tracing` filter for diagnostics written to stderr.
    #[arg(long, value_name = "FILTER", default_value = "warn")]
    log_filter: String,
    /// Log format (`compact` or `json`).
    #[arg(long, value_name = "FORMAT", default_value_t = LogFormat::Compact)]
    log_format: LogFormat,
}

fn main() -> ExitCode {
    let cli = WorkerCli::parse();
    let settings = LogSettings::worker(cli.log_filter, cli.log_format);
    if let Err(error) = telemetry::initialise(&settings) {
        writeln!(io::stderr().lock(), "katex-ssr-worker: {error}").ok();
        return ExitCode::FAILURE;
    }

    let mut reader = BufReader::new(io::stdin().lock());
    let mut writer = io::stdout().lock();
    match katex_ssr_worker::run(&mut reader, &mut writer) {
        Ok(summary) => {
            debug!(
                target: WORKER_TARGET,
                setups = summary.setups,
                rendered = summary.rendered,
                failed = summary.failed,
                "input closed; worker exiting"
            );
            ExitCode::SUCCESS
        }
        Err(error) => {
            writeln!(io::stderr().lock(), "katex-ssr-worker: {error}").ok();
            ExitCode::FAILURE
        }
    }
}
