use reqwest::StatusCode;

use opencode_api::error::parse_error_message;
use opencode_api::ApiError;

#[test]
fn parse_error_message_prefers_data_message() {
    let body = r#"{"name":"NotFoundError","data":{"message":"session not found"}}"#;
    let message = parse_error_message(StatusCode::NOT_FOUND, body);
    assert_eq!(message, "session not found");
}

#[test]
fn parse_error_message_reads_error_message() {
    let body = r#"{"error":{"message":"invalid model"}}"#;
    let message = parse_error_message(StatusCode::BAD_REQUEST, body);
    assert_eq!(message, "invalid model");
}

#[test]
fn parse_error_message_falls_back_to_raw_body() {
    let message = parse_error_message(StatusCode::INTERNAL_SERVER_ERROR, "raw failure text");
    assert_eq!(message, "raw failure text");
}

#[test]
fn parse_error_message_uses_canonical_reason_for_empty_body() {
    let message = parse_error_message(StatusCode::SERVICE_UNAVAILABLE, "");
    assert_eq!(message, "Service Unavailable");
}

#[test]
fn parse_error_message_keeps_json_without_message_as_body() {
    let body = r#"{"data":{"message":"  "}}"#;
    let message = parse_error_message(StatusCode::BAD_REQUEST, body);
    assert_eq!(message, body);
}

#[test]
fn api_error_display_and_cancellation() {
    let status = ApiError::Status(StatusCode::NOT_FOUND, "missing".to_string());
    assert_eq!(status.to_string(), "HTTP 404 Not Found missing");
    assert!(!status.is_cancelled());
    assert!(ApiError::Cancelled.is_cancelled());
}
