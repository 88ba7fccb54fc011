//! Worker-to-host response records.

use serde::{Deserialize, Serialize};

/// Outcome reported by the worker for one render request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    /// The formula was typeset.
    Success,
    /// The worker could not typeset the formula.
    Error,
}

/// Response written by the worker to its stdout.
///
/// The `status` field discriminates the two shapes, so a success always
/// carries `html` and an error always carries `message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RenderResponse {
    /// Rendered markup.
    Success {
        /// Typeset HTML fragment.
        html: String,
        /// Echo of the request id, when the request carried one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<u64>,
    },
    /// Diagnostic for a formula the worker rejected.
    Error {
        /// Human-readable diagnostic.
        message: String,
        /// Echo of the request id, when the request carried one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<u64>,
    },
}

impl RenderResponse {
    /// Creates a success response.
    #[must_use]
    pub fn success(html: impl Into<String>) -> Self {
        Self::Success {
            html: html.into(),
            id: None,
        }
    }

    /// Creates an error response.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            id: None,
        }
    }

    /// Sets (or clears) the echoed correlation id.
    #[must_use]
    pub fn with_id(mut self, request_id: Option<u64>) -> Self {
        match &mut self {
            Self::Success { id, .. } | Self::Error { id, .. } => *id = request_id,
        }
        self
    }

    /// Returns the echoed correlation id.
    #[must_use]
    pub const fn id(&self) -> Option<u64> {
        match self {
            Self::Success { id, .. } | Self::Error { id, .. } => *id,
        }
    }

    /// Returns the response status.
    #[must_use]
    pub const fn status(&self) -> ResponseStatus {
        match self {
            Self::Success { .. } => ResponseStatus::Success,
            Self::Error { .. } => ResponseStatus::Error,
        }
    }

    /// Returns whether the worker typeset the formula.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Returns the rendered HTML of a success response.
    #[must_use]
    pub const fn html(&self) -> Option<&str> {
        match self {
            Self::Success { html, .. } => Some(html.as_str()),
            Self::Error { .. } => None,
        }
    }

    /// Returns the diagnostic of an error response.
    #[must_use]
    pub const fn message(&self) -> Option<&str> {
        match self {
            Self::Error { message, .. } => Some(message.as_str()),
            Self::Success { .. } => None,
        }
    }
}
