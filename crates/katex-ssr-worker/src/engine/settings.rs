//! Translation of wire options into typed KaTeX settings.

use katex_ssr_protocol::RenderOptions;
use serde_json::Value;
use tracing::debug;

use super::{MacroTable, TypesetError};

const SETTINGS_TARGET: &str = "katex_ssr_worker::engine";

/// Markup KaTeX should emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Visual HTML only.
    Html,
    /// MathML only.
    Mathml,
    /// Visual HTML plus MathML for accessibility (KaTeX's default).
    HtmlAndMathml,
}

/// KaTeX options understood by the worker, decoded from a request.
///
/// Unset fields leave KaTeX's own defaults in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KatexSettings {
    /// Markup flavour.
    pub output: Option<OutputFormat>,
    /// Equation numbers on the left.
    pub leqno: Option<bool>,
    /// Flush-left display math.
    pub fleqn: Option<bool>,
    /// Whether parse errors fail the render instead of being drawn inline.
    pub throw_on_error: Option<bool>,
    /// Colour for inline error fragments.
    pub error_color: Option<String>,
    /// Minimum rule thickness in ems.
    pub min_rule_thickness: Option<f64>,
    /// Whether commands such as `\href` are trusted.
    pub trust: Option<bool>,
    /// Effective macro table: extension macros overlaid by request macros.
    pub macros: MacroTable,
}

impl KatexSettings {
    /// Decodes request options on top of extension-provided macros.
    ///
    /// `displayMode` is carried by the request itself and ignored here.
    /// Unknown options are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`TypesetError::InvalidOption`] when a known option has the
    /// wrong type.
    pub fn from_options(
        options: &RenderOptions,
        contrib_macros: &MacroTable,
    ) -> Result<Self, TypesetError> {
        let mut settings = Self {
            macros: contrib_macros.clone(),
            ..Self::default()
        };
        for (name, value) in options {
            match name.as_str() {
                "displayMode" => {}
                "output" => settings.output = Some(output_format(name, value)?),
                "leqno" => settings.leqno = Some(boolean(name, value)?),
                "fleqn" => settings.fleqn = Some(boolean(name, value)?),
                "throwOnError" => settings.throw_on_error = Some(boolean(name, value)?),
                "errorColor" => settings.error_color = Some(string(name, value)?),
                "minRuleThickness" => settings.min_rule_thickness = Some(number(name, value)?),
                "trust" => settings.trust = Some(boolean(name, value)?),
                "macros" => settings.macros.extend(macro_table(name, value)?),
                other => {
                    debug!(
                        target: SETTINGS_TARGET,
                        option = other,
                        "ignoring unsupported KaTeX option"
                    );
                }
            }
        }
        Ok(settings)
    }
}

fn invalid(name: &str, expected: &'static str) -> TypesetError {
    TypesetError::InvalidOption {
        name: name.to_owned(),
        expected,
    }
}

fn boolean(name: &str, value: &Value) -> Result<bool, TypesetError> {
    value.as_bool().ok_or_else(|| invalid(name, "a boolean"))
}

fn string(name: &str, value: &Value) -> Result<String, TypesetError> {
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| invalid(name, "a string"))
}

fn number(name: &str, value: &Value) -> Result<f64, TypesetError> {
    value.as_f64().ok_or_else(|| invalid(name, "a number"))
}

fn output_format(name: &str, value: &Value) -> Result<OutputFormat, TypesetError> {
    const EXPECTED: &str = "one of \"html\", \"mathml\" or \"htmlAndMathml\"";
    match value.as_str() {
        Some("html") => Ok(OutputFormat::Html),
        Some("mathml") => Ok(OutputFormat::Mathml),
        Some("htmlAndMathml") => Ok(OutputFormat::HtmlAndMathml),
        _ => Err(invalid(name, EXPECTED)),
    }
}

fn macro_table(name: &str, value: &Value) -> Result<MacroTable, TypesetError> {
    const EXPECTED: &str = "an object of string expansions";
    let entries = value.as_object().ok_or_else(|| invalid(name, EXPECTED))?;
    entries
        .iter()
        .map(|(control, expansion)| {
            expansion
                .as_str()
                .map(|text| (control.clone(), text.to_owned()))
                .ok_or_else(|| invalid(name, EXPECTED))
        })
        .collect()
}
