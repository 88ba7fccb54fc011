//! Request loop of the worker process.
//!
//! The loop reads one record per line from its input and answers every
//! render request with exactly one response line, flushed before the next
//! record is read. Setup records are answered with nothing. The host relies
//! on this one-in, one-out ordering to pair responses with requests.

use std::io::{BufRead, Write};

use katex_ssr_protocol::{
    FormulaRequest, ProtocolError, RenderRequest, RenderResponse, decode_request, encode_response,
};
use tracing::{debug, warn};

use crate::contrib::{ContribCatalogue, ContribRegistry};
use crate::engine::Typesetter;
use crate::error::WorkerError;

const SERVER_TARGET: &str = "katex_ssr_worker::server";

/// Counters reported when the request loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServeSummary {
    /// Setup records applied.
    pub setups: usize,
    /// Render records answered with `success`.
    pub rendered: usize,
    /// Records answered with `error`.
    pub failed: usize,
}

enum Processed {
    Skipped,
    Applied,
    Answered(RenderResponse),
}

/// Worker state: the typesetter plus the extensions loaded into it.
#[derive(Debug)]
pub struct Worker<T> {
    typesetter: T,
    registry: ContribRegistry,
}

impl<T: Typesetter> Worker<T> {
    /// Creates a worker with an empty extension registry.
    #[must_use]
    pub fn new(typesetter: T, catalogue: ContribCatalogue) -> Self {
        Self {
            typesetter,
            registry: ContribRegistry::new(catalogue),
        }
    }

    /// Extension registry owned by this worker.
    #[must_use]
    pub const fn contribs(&self) -> &ContribRegistry {
        &self.registry
    }

    /// Applies one decoded request.
    ///
    /// Returns the response to send, or `None` for setup requests.
    pub fn handle(&mut self, request: &RenderRequest) -> Option<RenderResponse> {
        match request {
            RenderRequest::Setup { contribs } => {
                let report = self.registry.ensure_loaded(contribs);
                debug!(
                    target: SERVER_TARGET,
                    loaded = ?report.loaded,
                    failed = ?report.failed,
                    "applied setup"
                );
                None
            }
            RenderRequest::Render(formula) => Some(self.render(formula)),
        }
    }

    /// Decodes and applies one raw record.
    ///
    /// Blank records are skipped. A record that cannot be decoded is answered
    /// with an `error` response so the host still receives one line for it.
    pub fn handle_record(&mut self, record: &str) -> Option<RenderResponse> {
        match self.process(record) {
            Processed::Answered(response) => Some(response),
            Processed::Applied | Processed::Skipped => None,
        }
    }

    fn process(&mut self, record: &str) -> Processed {
        match decode_request(record) {
            Ok(request) => self
                .handle(&request)
                .map_or(Processed::Applied, Processed::Answered),
            Err(ProtocolError::EmptyRecord { .. }) => Processed::Skipped,
            Err(error) => {
                warn!(target: SERVER_TARGET, %error, "rejecting undecodable request");
                Processed::Answered(RenderResponse::error(error.to_string()))
            }
        }
    }

    fn render(&self, formula: &FormulaRequest) -> RenderResponse {
        let macros = self.registry.macros();
        let response = match self.typesetter.typeset(formula, &macros) {
            Ok(html) => RenderResponse::success(html),
            Err(error) => {
                debug!(
                    target: SERVER_TARGET,
                    latex = formula.latex(),
                    %error,
                    "formula rejected"
                );
                RenderResponse::error(error.to_string())
            }
        };
        response.with_id(formula.id())
    }

    /// Serves records from `input` until end of input.
    ///
    /// A line that is not valid UTF-8 is answered with an `error` response
    /// like any other undecodable record.
    ///
    /// # Errors
    ///
    /// Returns a [`WorkerError`] when reading input, encoding a response, or
    /// writing output fails.
    pub fn serve(
        &mut self,
        input: &mut impl BufRead,
        output: &mut impl Write,
    ) -> Result<ServeSummary, WorkerError> {
        let mut summary = ServeSummary::default();
        let mut buffer = Vec::new();
        loop {
            buffer.clear();
            let bytes_read = input
                .read_until(b'\n', &mut buffer)
                .map_err(|source| WorkerError::Read { source })?;
            if bytes_read == 0 {
                break;
            }
            let processed = match std::str::from_utf8(&buffer) {
                Ok(line) => self.process(line),
                Err(error) => {
                    warn!(target: SERVER_TARGET, %error, "rejecting request that is not UTF-8");
                    Processed::Answered(RenderResponse::error(format!(
                        "request is not valid UTF-8: {error}"
                    )))
                }
            };
            match processed {
                Processed::Answered(response) => {
                    if response.is_success() {
                        summary.rendered += 1;
                    } else {
                        summary.failed += 1;
                    }
                    write_response(output, &response)?;
                }
                Processed::Applied => summary.setups += 1,
                Processed::Skipped => {}
            }
        }
        debug!(
            target: SERVER_TARGET,
            setups = summary.setups,
            rendered = summary.rendered,
            failed = summary.failed,
            "input closed"
        );
        Ok(summary)
    }
}

fn write_response(output: &mut impl Write, response: &RenderResponse) -> Result<(), WorkerError> {
    let record = encode_response(response)?;
    output
        .write_all(record.as_bytes())
        .map_err(|source| WorkerError::Write { source })?;
    output
        .flush()
        .map_err(|source| WorkerError::Write { source })
}
