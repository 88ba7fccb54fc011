//! Errors raised while framing or parsing protocol records.

use std::fmt;

use thiserror::Error;

/// Maximum number of characters of an offending record kept for diagnostics.
const RECORD_EXCERPT_CHARS: usize = 120;

/// Direction of the record that failed to encode or decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// A host-to-worker record.
    Request,
    /// A worker-to-host record.
    Response,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Request => "request",
            Self::Response => "response",
        };
        formatter.write_str(label)
    }
}

/// Errors arising from the wire codec.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The record could not be serialised to JSON.
    #[error("failed to encode {kind} record: {source}")]
    Encode {
        /// Which record was being encoded.
        kind: RecordKind,
        /// Underlying serialisation error.
        #[source]
        source: serde_json::Error,
    },

    /// The record was not parseable as the expected structure.
    #[error("failed to decode {kind} record {excerpt:?}: {source}")]
    Decode {
        /// Which record was being decoded.
        kind: RecordKind,
        /// Leading portion of the offending record.
        excerpt: String,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// The record was blank.
    #[error("received an empty {kind} record")]
    EmptyRecord {
        /// Which record was being decoded.
        kind: RecordKind,
    },

    /// A response echoed an id belonging to a different request.
    #[error("response carries id {received} but request {expected} is outstanding")]
    Desynchronised {
        /// Id of the request awaiting its response.
        expected: u64,
        /// Id echoed by the worker.
        received: u64,
    },
}

impl ProtocolError {
    pub(crate) fn decode(kind: RecordKind, record: &str, source: serde_json::Error) -> Self {
        Self::Decode {
            kind,
            excerpt: record.chars().take(RECORD_EXCERPT_CHARS).collect(),
            source,
        }
    }
}
