//! Unit tests for record framing.

use rstest::rstest;
use serde_json::json;

use super::*;
use crate::request::{FormulaRequest, RenderOptions};
use crate::response::ResponseStatus;

fn options(value: serde_json::Value) -> RenderOptions {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

#[rstest]
fn setup_request_matches_wire_format() {
    let request = RenderRequest::setup(vec!["braket".into(), "physics".into()]);

    let record = encode_request(&request).expect("encode");

    assert_eq!(
        record,
        "{\"type\":\"setup\",\"contribs\":[\"braket\",\"physics\"]}\n"
    );
}

#[rstest]
fn render_request_matches_wire_format() {
    let request = RenderRequest::render("E = mc^2", false, RenderOptions::new());

    let record = encode_request(&request).expect("encode");

    assert_eq!(
        record,
        "{\"type\":\"render\",\"latex\":\"E = mc^2\",\"displayMode\":false,\"options\":{}}\n"
    );
}

#[rstest]
fn embedded_newlines_never_split_a_record() {
    let request = RenderRequest::render("a \\\\\n b", true, RenderOptions::new());

    let record = encode_request(&request).expect("encode");

    assert_eq!(record.matches(RECORD_TERMINATOR).count(), 1);
    assert!(record.ends_with(RECORD_TERMINATOR));
    let decoded = decode_request(&record).expect("decode");
    assert_eq!(decoded, request);
}

#[rstest]
fn request_without_type_defaults_to_render() {
    let decoded =
        decode_request(r#"{"latex":"x^2","displayMode":true}"#).expect("decode untyped");

    let RenderRequest::Render(formula) = decoded else {
        panic!("expected a render request");
    };
    assert_eq!(formula.latex(), "x^2");
    assert!(formula.display_mode());
    assert!(formula.options().is_empty());
    assert_eq!(formula.id(), None);
}

#[rstest]
fn request_id_is_carried_when_present() {
    let formula = FormulaRequest::new("y", false, options(json!({"throwOnError": false})));
    let request = RenderRequest::from(formula.with_id(7));

    let record = encode_request(&request).expect("encode");

    assert!(record.contains("\"id\":7"), "record: {record}");
    assert_eq!(decode_request(&record).expect("decode").id(), Some(7));
}

#[rstest]
#[case::unknown_type(r#"{"type":"teardown"}"#)]
#[case::missing_latex(r#"{"type":"render","displayMode":false}"#)]
#[case::not_json("render x^2")]
#[case::not_an_object("[1,2,3]")]
fn malformed_requests_are_rejected(#[case] record: &str) {
    let err = decode_request(record).expect_err("should reject");

    assert!(
        matches!(
            err,
            ProtocolError::Decode {
                kind: RecordKind::Request,
                ..
            }
        ),
        "unexpected error: {err}"
    );
}

#[rstest]
fn success_response_decodes() {
    let response =
        decode_response("{\"status\":\"success\",\"html\":\"<span class=\\\"katex\\\"></span>\"}\n")
            .expect("decode");

    assert_eq!(response.status(), ResponseStatus::Success);
    assert_eq!(response.html(), Some("<span class=\"katex\"></span>"));
    assert_eq!(response.message(), None);
}

#[rstest]
fn error_response_decodes() {
    let response = decode_response(r#"{"status":"error","message":"Expected '}'","id":3}"#)
        .expect("decode");

    assert_eq!(response.status(), ResponseStatus::Error);
    assert_eq!(response.message(), Some("Expected '}'"));
    assert_eq!(response.html(), None);
    assert_eq!(response.id(), Some(3));
}

#[rstest]
#[case::missing_status(r#"{"html":"<b>"}"#)]
#[case::unknown_status(r#"{"status":"pending"}"#)]
#[case::success_without_html(r#"{"status":"success"}"#)]
#[case::error_without_message(r#"{"status":"error"}"#)]
#[case::echoed_request(r#"{"type":"setup","contribs":[]}"#)]
#[case::truncated("{\"status\":\"succ")]
fn malformed_responses_are_rejected(#[case] record: &str) {
    let err = decode_response(record).expect_err("should reject");

    assert!(
        matches!(
            err,
            ProtocolError::Decode {
                kind: RecordKind::Response,
                ..
            }
        ),
        "unexpected error: {err}"
    );
}

#[rstest]
#[case("")]
#[case("\n")]
#[case("   \r\n")]
fn blank_records_are_reported_as_empty(#[case] record: &str) {
    let err = decode_response(record).expect_err("should reject");

    assert!(matches!(
        err,
        ProtocolError::EmptyRecord {
            kind: RecordKind::Response
        }
    ));
}

#[rstest]
fn response_id_is_omitted_when_absent() {
    let record = encode_response(&RenderResponse::success("<i>x</i>")).expect("encode");

    assert_eq!(record, "{\"status\":\"success\",\"html\":\"<i>x</i>\"}\n");
}

#[rstest]
fn decode_errors_quote_the_offending_record() {
    let long = format!("{{\"status\":{}", "9".repeat(500));

    let err = decode_response(&long).expect_err("should reject");

    let ProtocolError::Decode { excerpt, .. } = err else {
        panic!("expected a decode error");
    };
    assert_eq!(excerpt.chars().count(), 120);
    assert!(long.starts_with(&excerpt));
}
