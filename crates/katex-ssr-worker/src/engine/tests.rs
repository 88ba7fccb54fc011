//! Unit tests for option translation and the KaTeX typesetter.

use katex_ssr_protocol::{FormulaRequest, RenderOptions};
use rstest::{fixture, rstest};
use serde_json::{Value, json};

use super::*;

fn options(value: Value) -> RenderOptions {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

#[fixture]
fn physics_macros() -> MacroTable {
    MacroTable::from([(
        String::from(r"\dv"),
        String::from(r"\frac{\mathrm{d} #1}{\mathrm{d} #2}"),
    )])
}

#[rstest]
fn empty_options_keep_katex_defaults() {
    let settings = KatexSettings::from_options(&RenderOptions::new(), &MacroTable::new())
        .expect("empty options are valid");

    assert_eq!(settings, KatexSettings::default());
}

#[rstest]
fn known_options_are_decoded() {
    let settings = KatexSettings::from_options(
        &options(json!({
            "output": "mathml",
            "leqno": true,
            "fleqn": false,
            "throwOnError": false,
            "errorColor": "#cc0000",
            "minRuleThickness": 0.05,
            "trust": true,
            "displayMode": true,
            "strict": "warn"
        })),
        &MacroTable::new(),
    )
    .expect("options are valid");

    assert_eq!(settings.output, Some(OutputFormat::Mathml));
    assert_eq!(settings.leqno, Some(true));
    assert_eq!(settings.fleqn, Some(false));
    assert_eq!(settings.throw_on_error, Some(false));
    assert_eq!(settings.error_color.as_deref(), Some("#cc0000"));
    assert_eq!(settings.min_rule_thickness, Some(0.05));
    assert_eq!(settings.trust, Some(true));
}

#[rstest]
fn request_macros_override_extension_macros(physics_macros: MacroTable) {
    let settings = KatexSettings::from_options(
        &options(json!({ "macros": { r"\dv": r"\mathrm{d}", r"\RR": r"\mathbb{R}" } })),
        &physics_macros,
    )
    .expect("macros are valid");

    assert_eq!(settings.macros.get(r"\dv").map(String::as_str), Some(r"\mathrm{d}"));
    assert_eq!(settings.macros.get(r"\RR").map(String::as_str), Some(r"\mathbb{R}"));
}

#[rstest]
#[case(json!({ "leqno": "yes" }), "leqno")]
#[case(json!({ "output": "svg" }), "output")]
#[case(json!({ "macros": { r"\x": 1 } }), "macros")]
#[case(json!({ "minRuleThickness": "thin" }), "minRuleThickness")]
fn mistyped_options_are_rejected(#[case] raw: Value, #[case] expected_name: &str) {
    let err = KatexSettings::from_options(&options(raw), &MacroTable::new())
        .expect_err("option should be rejected");

    match err {
        TypesetError::InvalidOption { name, .. } => assert_eq!(name, expected_name),
        other => panic!("unexpected error: {other}"),
    }
}

#[rstest]
fn katex_typesets_inline_formula() {
    let formula = FormulaRequest::new("E = mc^2", false, RenderOptions::new());

    let html = KatexTypesetter::new()
        .typeset(&formula, &MacroTable::new())
        .expect("formula renders");

    assert!(html.contains("katex"));
    assert!(!html.contains("katex-error"));
}

#[rstest]
fn display_mode_wraps_output_in_display_container() {
    let formula = FormulaRequest::new(r"\sum_{i=1}^n i", true, RenderOptions::new());

    let html = KatexTypesetter::new()
        .typeset(&formula, &MacroTable::new())
        .expect("formula renders");

    assert!(html.contains("katex-display"));
}

#[rstest]
fn malformed_formula_is_rejected_by_default() {
    let formula = FormulaRequest::new(r"\frac{1", false, RenderOptions::new());

    let err = KatexTypesetter::new()
        .typeset(&formula, &MacroTable::new())
        .expect_err("formula is malformed");

    assert!(matches!(err, TypesetError::Rejected { .. }));
}

#[rstest]
fn malformed_formula_renders_inline_without_throw_on_error() {
    let formula = FormulaRequest::new(
        r"\frac{1",
        false,
        options(json!({ "throwOnError": false })),
    );

    let html = KatexTypesetter::new()
        .typeset(&formula, &MacroTable::new())
        .expect("error is drawn inline");

    assert!(html.contains("katex-error"));
}

#[rstest]
fn extension_macros_make_commands_available(physics_macros: MacroTable) {
    let formula = FormulaRequest::new(r"\dv{f}{x}", false, RenderOptions::new());
    let typesetter = KatexTypesetter::new();

    assert!(typesetter.typeset(&formula, &MacroTable::new()).is_err());
    let html = typesetter
        .typeset(&formula, &physics_macros)
        .expect("macro expands");
    assert!(html.contains("mfrac"));
}
