//! Host-to-worker request records.

use serde::{Deserialize, Serialize};

/// KaTeX rendering options forwarded verbatim to the worker.
///
/// Keys use KaTeX's own camelCase option names (`throwOnError`, `macros`,
/// `output`, ...).
pub type RenderOptions = serde_json::Map<String, serde_json::Value>;

/// Request written by the host to the worker's stdin.
///
/// Serialised as a single JSON line. The `type` discriminator defaults to
/// `render` when a worker decodes a record without one.
///
/// # Example
///
/// ```
/// use katex_ssr_protocol::RenderRequest;
///
/// let setup = RenderRequest::setup(vec!["braket".into()]);
/// assert!(!setup.expects_response());
///
/// let render = RenderRequest::render(r"\frac{a}{b}", true, Default::default());
/// assert!(render.expects_response());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RenderRequest {
    /// Loads the named extensions into the worker. Produces no response.
    Setup {
        /// Extension names in load order.
        contribs: Vec<String>,
    },
    /// Typesets one formula. Produces exactly one response.
    Render(FormulaRequest),
}

impl RenderRequest {
    /// Builds a setup request for the given extension names.
    #[must_use]
    pub const fn setup(contribs: Vec<String>) -> Self {
        Self::Setup { contribs }
    }

    /// Builds a render request without a correlation id.
    #[must_use]
    pub fn render(latex: impl Into<String>, display_mode: bool, options: RenderOptions) -> Self {
        Self::Render(FormulaRequest::new(latex, display_mode, options))
    }

    /// Returns `true` when the worker answers this request with a record.
    #[must_use]
    pub const fn expects_response(&self) -> bool {
        matches!(self, Self::Render(_))
    }

    /// Returns the correlation id carried by a render request.
    #[must_use]
    pub const fn id(&self) -> Option<u64> {
        match self {
            Self::Render(formula) => formula.id(),
            Self::Setup { .. } => None,
        }
    }
}

/// Payload of a render request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormulaRequest {
    latex: String,
    #[serde(default)]
    display_mode: bool,
    #[serde(default)]
    options: RenderOptions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
}

impl FormulaRequest {
    /// Creates a formula request.
    #[must_use]
    pub fn new(latex: impl Into<String>, display_mode: bool, options: RenderOptions) -> Self {
        Self {
            latex: latex.into(),
            display_mode,
            options,
            id: None,
        }
    }

    /// Attaches a correlation id that a cooperating worker echoes back.
    #[must_use]
    pub const fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    /// Returns the TeX source.
    #[must_use]
    pub const fn latex(&self) -> &str {
        self.latex.as_str()
    }

    /// Returns whether the formula is typeset in display (block) mode.
    #[must_use]
    pub const fn display_mode(&self) -> bool {
        self.display_mode
    }

    /// Returns the KaTeX options.
    #[must_use]
    pub const fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Returns the correlation id, when present.
    #[must_use]
    pub const fn id(&self) -> Option<u64> {
        self.id
    }
}

impl From<FormulaRequest> for RenderRequest {
    fn from(formula: FormulaRequest) -> Self {
        Self::Render(formula)
    }
}
