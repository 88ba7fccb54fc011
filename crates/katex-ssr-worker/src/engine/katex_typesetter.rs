//! KaTeX-backed typesetter.

use std::collections::HashMap;

use katex::{OptsBuilder, OutputType};
use katex_ssr_protocol::FormulaRequest;

use super::settings::{KatexSettings, OutputFormat};
use super::{MacroTable, TypesetError, Typesetter};

/// Typesetter running KaTeX in an embedded JavaScript engine.
///
/// The JavaScript context is created lazily per thread by the `katex` crate
/// and reused for every subsequent formula rendered on that thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct KatexTypesetter;

impl KatexTypesetter {
    /// Creates the typesetter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Typesetter for KatexTypesetter {
    fn typeset(
        &self,
        formula: &FormulaRequest,
        macros: &MacroTable,
    ) -> Result<String, TypesetError> {
        let settings = KatexSettings::from_options(formula.options(), macros)?;
        let opts = build_opts(formula.display_mode(), settings)?;
        katex::render_with_opts(formula.latex(), opts).map_err(|err| TypesetError::Rejected {
            message: err.to_string(),
        })
    }
}

fn build_opts(display_mode: bool, settings: KatexSettings) -> Result<katex::Opts, TypesetError> {
    let mut builder = OptsBuilder::default();
    builder.display_mode(display_mode);
    if let Some(output) = settings.output {
        builder.output_type(output_type(output));
    }
    if let Some(leqno) = settings.leqno {
        builder.leqno(leqno);
    }
    if let Some(fleqn) = settings.fleqn {
        builder.fleqn(fleqn);
    }
    if let Some(throw_on_error) = settings.throw_on_error {
        builder.throw_on_error(throw_on_error);
    }
    if let Some(error_color) = settings.error_color {
        builder.error_color(error_color);
    }
    if let Some(thickness) = settings.min_rule_thickness {
        builder.min_rule_thickness(thickness);
    }
    if let Some(trust) = settings.trust {
        builder.trust(trust);
    }
    if !settings.macros.is_empty() {
        builder.macros(settings.macros.into_iter().collect::<HashMap<_, _>>());
    }
    builder.build().map_err(|err| TypesetError::Engine {
        message: format!("failed to build KaTeX options: {err}"),
    })
}

const fn output_type(format: OutputFormat) -> OutputType {
    match format {
        OutputFormat::Html => OutputType::Html,
        OutputFormat::Mathml => OutputType::Mathml,
        OutputFormat::HtmlAndMathml => OutputType::HtmlAndMathml,
    }
}
