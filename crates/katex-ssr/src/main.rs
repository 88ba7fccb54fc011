//! CLI entrypoint for KaTeX server-side rendering.
//!
//! The binary delegates to [`katex_ssr::cli::run`], which loads and
//! validates configuration, starts the rendering worker on demand, and
//! writes rendered HTML to stdout.

use std::io::{self, StderrLock, StdinLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdin: StdinLock<'static> = io::stdin().lock();
    let mut stdout: StdoutLock<'static> = io::stdout().lock();
    let mut stderr: StderrLock<'static> = io::stderr().lock();
    katex_ssr::cli::run(std::env::args_os(), &mut stdin, &mut stdout, &mut stderr)
}
