//! Line framing for protocol records.
//!
//! Each record is one JSON document followed by [`RECORD_TERMINATOR`]. JSON
//! string escaping guarantees that a record never contains a bare newline,
//! so the terminator is an unambiguous record boundary. The codec holds no
//! state and buffers nothing beyond the record it is given.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ProtocolError, RecordKind};
use crate::request::RenderRequest;
use crate::response::RenderResponse;

/// Character terminating every record on the wire.
pub const RECORD_TERMINATOR: char = '\n';

/// Encodes a request as one newline-terminated record.
///
/// # Errors
///
/// Returns [`ProtocolError::Encode`] if the request cannot be serialised.
pub fn encode_request(request: &RenderRequest) -> Result<String, ProtocolError> {
    encode(RecordKind::Request, request)
}

/// Encodes a response as one newline-terminated record.
///
/// # Errors
///
/// Returns [`ProtocolError::Encode`] if the response cannot be serialised.
pub fn encode_response(response: &RenderResponse) -> Result<String, ProtocolError> {
    encode(RecordKind::Response, response)
}

/// Decodes a request record, defaulting a missing `type` to `render`.
///
/// # Errors
///
/// Returns [`ProtocolError::EmptyRecord`] for a blank record and
/// [`ProtocolError::Decode`] when the record is not a valid request.
pub fn decode_request(record: &str) -> Result<RenderRequest, ProtocolError> {
    let kind = RecordKind::Request;
    let trimmed = non_empty(kind, record)?;
    let mut value: Value =
        serde_json::from_str(trimmed).map_err(|err| ProtocolError::decode(kind, trimmed, err))?;
    if let Value::Object(fields) = &mut value {
        fields
            .entry("type")
            .or_insert_with(|| Value::String(String::from("render")));
    }
    serde_json::from_value(value).map_err(|err| ProtocolError::decode(kind, trimmed, err))
}

/// Decodes a response record.
///
/// # Errors
///
/// Returns [`ProtocolError::EmptyRecord`] for a blank record and
/// [`ProtocolError::Decode`] when the record is not a valid response.
pub fn decode_response(record: &str) -> Result<RenderResponse, ProtocolError> {
    decode(RecordKind::Response, record)
}

fn encode<T: Serialize>(kind: RecordKind, record: &T) -> Result<String, ProtocolError> {
    let mut line =
        serde_json::to_string(record).map_err(|source| ProtocolError::Encode { kind, source })?;
    line.push(RECORD_TERMINATOR);
    Ok(line)
}

fn decode<T: DeserializeOwned>(kind: RecordKind, record: &str) -> Result<T, ProtocolError> {
    let trimmed = non_empty(kind, record)?;
    serde_json::from_str(trimmed).map_err(|err| ProtocolError::decode(kind, trimmed, err))
}

fn non_empty(kind: RecordKind, record: &str) -> Result<&str, ProtocolError> {
    let trimmed = record.trim();
    if trimmed.is_empty() {
        return Err(ProtocolError::EmptyRecord { kind });
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests;
