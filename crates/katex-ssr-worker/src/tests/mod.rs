//! End-to-end tests of the worker loop with the real KaTeX typesetter.


use std::io::Cursor;

use katex_ssr_protocol::{RenderResponse, decode_response};
use rstest::rstest;

use crate::run;

fn run_lines(input: &str) -> Vec<RenderResponse> {
    let mut output = Vec::new();
    run(&mut Cursor::new(input.as_bytes()), &mut output).expect("worker loop completes");
    String::from_utf8(output)
        .expect("utf-8 output")
        .lines()
        .map(|line| decode_response(line).expect("valid response"))
        .collect()
}

#[rstest]
fn inline_formula_renders_without_error_marker() {
    let responses =
        run_lines("{\"type\":\"render\",\"latex\":\"E = mc^2\",\"displayMode\":false,\"options\":{}}\n");

    let html = responses
        .first()
        .and_then(RenderResponse::html)
        .expect("success response");
    assert!(html.contains("class=\"katex\""));
    assert!(!html.contains("katex-error"));
}

#[rstest]
fn unbalanced_formula_is_drawn_inline_when_not_throwing() {
    let responses = run_lines(
        "{\"type\":\"render\",\"latex\":\"\\\\frac{1\",\"displayMode\":false,\"options\":{\"throwOnError\":false}}\n",
    );

    let response = responses.first().expect("one response");
    assert!(response.is_success());
    assert!(response.html().is_some_and(|html| html.contains("katex-error")));
}

#[rstest]
fn physics_extension_enables_derivative_macro() {
    let responses = run_lines(concat!(
        "{\"latex\":\"\\\\dv{f}{x}\"}\n",
        "{\"type\":\"setup\",\"contribs\":[\"physics\"]}\n",
        "{\"latex\":\"\\\\dv{f}{x}\"}\n",
    ));

    assert_eq!(responses.len(), 2);
    assert!(responses.first().is_some_and(|response| !response.is_success()));
    assert!(responses.get(1).is_some_and(RenderResponse::is_success));
}
