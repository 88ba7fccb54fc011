//! JSON-lines batch rendering over a shared service.

use std::io::{BufRead, Write};
use std::num::NonZeroUsize;
use std::panic;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use katex_ssr_protocol::RenderOptions;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::CliError;
use crate::error::RenderServiceError;
use crate::service::RenderService;
use crate::supervisor::RenderChannel;

/// Log target for batch rendering.
const BATCH_TARGET: &str = "katex_ssr::cli::batch";

/// One input line.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct BatchItem {
    latex: String,
    #[serde(default, rename = "displayMode")]
    display_mode: bool,
    #[serde(default)]
    options: RenderOptions,
    #[serde(default)]
    contribs: Vec<String>,
}

#[derive(Debug, Serialize)]
struct BatchOutput<'a> {
    html: &'a str,
}

/// Parses every non-blank line of `input`.
pub(crate) fn read_items(input: &mut impl BufRead) -> Result<Vec<BatchItem>, CliError> {
    let mut items = Vec::new();
    for (index, read) in input.lines().enumerate() {
        let line = read.map_err(CliError::Input)?;
        if line.trim().is_empty() {
            continue;
        }
        let item = serde_json::from_str(&line).map_err(|source| CliError::BatchRecord {
            line: index + 1,
            source,
        })?;
        items.push(item);
    }
    Ok(items)
}

/// Renders `items` on `jobs` threads and writes results in input order.
///
/// Output stops at the first channel failure, which is returned.
pub(crate) fn render_items<C: RenderChannel>(
    service: &RenderService<C>,
    items: &[BatchItem],
    jobs: NonZeroUsize,
    output: &mut impl Write,
) -> Result<(), CliError> {
    let workers = jobs.get().min(items.len()).max(1);
    debug!(target: BATCH_TARGET, formulas = items.len(), workers, "rendering batch");

    let next = AtomicUsize::new(0);
    let mut results = thread::scope(|scope| {
        let mut handles = Vec::with_capacity(workers);
        for index in 0..workers {
            let handle = thread::Builder::new()
                .name(format!("katex-ssr-batch-{index}"))
                .spawn_scoped(scope, || {
                    let mut rendered: Vec<(usize, Result<String, RenderServiceError>)> =
                        Vec::new();
                    loop {
                        let position = next.fetch_add(1, Ordering::Relaxed);
                        let Some(item) = items.get(position) else {
                            break;
                        };
                        let result = service.render(
                            &item.latex,
                            item.display_mode,
                            &item.options,
                            &item.contribs,
                        );
                        rendered.push((position, result));
                    }
                    rendered
                })
                .map_err(CliError::Threads)?;
            handles.push(handle);
        }
        Ok::<_, CliError>(
            handles
                .into_iter()
                .flat_map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|payload| panic::resume_unwind(payload))
                })
                .collect::<Vec<_>>(),
        )
    })?;
    results.sort_by_key(|(position, _)| *position);

    for (_, result) in results {
        let html = result?;
        let record = serde_json::to_string(&BatchOutput { html: &html }).map_err(CliError::Encode)?;
        writeln!(output, "{record}").map_err(CliError::Output)?;
    }
    output.flush().map_err(CliError::Output)
}
