use std::collections::HashMap;

use super::body::{parse_body, primary_content_type, serialize_body};
use super::core::handler_fn;
use super::Handler;
use crate::common::{ApiContext, ApiRequest, ApiResponse, Body, Method};
use crate::error::Error;

#[test]
fn test_primary_content_type() {
    assert_eq!(primary_content_type("application/json"), "application/json");
    // charset等のパラメータは除去される
    assert_eq!(
        primary_content_type("application/json; charset=utf-8"),
        "application/json"
    );
    assert_eq!(
        primary_content_type(" Application/JSON ; charset=utf-8"),
        "application/json"
    );
    assert_eq!(
        primary_content_type("text/plain;boundary=x"),
        "text/plain"
    );
}

#[test]
fn test_parse_body_json() {
    let body = parse_body(Some("application/json"), br#"{"a": 1}"#);

    assert_eq!(body, Body::Json(serde_json::json!({"a": 1})));
}

#[test]
fn test_parse_body_json_with_charset() {
    let body = parse_body(Some("application/json; charset=utf-8"), br#"{"a": 1}"#);

    assert_eq!(body, Body::Json(serde_json::json!({"a": 1})));
}

#[test]
fn test_parse_body_form() {
    let body = parse_body(
        Some("application/x-www-form-urlencoded"),
        b"name=John+Doe&lang=ja",
    );

    let mut expected = HashMap::new();
    expected.insert("name".to_string(), "John Doe".to_string());
    expected.insert("lang".to_string(), "ja".to_string());
    assert_eq!(body, Body::Form(expected));
}

#[test]
fn test_parse_body_unknown_content_type_passes_through() {
    let raw = b"<note>hello</note>";
    let body = parse_body(Some("application/xml"), raw);

    assert_eq!(body, Body::Raw(raw.to_vec()));
}

#[test]
fn test_parse_body_missing_content_type_passes_through() {
    let raw = b"opaque bytes";
    let body = parse_body(None, raw);

    assert_eq!(body, Body::Raw(raw.to_vec()));
}

#[test]
fn test_parse_body_malformed_json_falls_back_to_raw() {
    // 解析失敗は致命的ではなく、生ボディがそのまま残る
    let raw = br#"{"a": "#;
    let body = parse_body(Some("application/json"), raw);

    assert_eq!(body, Body::Raw(raw.to_vec()));
}

#[test]
fn test_parse_body_empty() {
    assert_eq!(parse_body(Some("application/json"), b""), Body::Empty);
    assert_eq!(parse_body(None, b""), Body::Empty);
}

#[test]
fn test_serialize_body_empty_and_text() {
    assert_eq!(serialize_body(&Body::Empty).unwrap(), "");
    // 文字列はそのまま通す（再エンコードしない）
    assert_eq!(
        serialize_body(&Body::Text(r#"{"already": "encoded"}"#.to_string())).unwrap(),
        r#"{"already": "encoded"}"#
    );
}

#[test]
fn test_serialize_body_json_string_is_verbatim() {
    let body = Body::Json(serde_json::Value::String("plain".to_string()));

    assert_eq!(serialize_body(&body).unwrap(), "plain");
}

#[test]
fn test_serialize_body_structured_json() {
    let body = Body::Json(serde_json::json!({"a": 1, "b": [true, null]}));
    let serialized = serialize_body(&body).unwrap();

    let reparsed: serde_json::Value = serde_json::from_str(&serialized).unwrap();
    assert_eq!(reparsed, serde_json::json!({"a": 1, "b": [true, null]}));
}

#[test]
fn test_json_body_roundtrip() {
    // parse(serialize(x)) == x が非文字列のJSON値について成り立つ
    let value = serde_json::json!({"id": "42", "tags": ["a", "b"], "count": 3});
    let serialized = serialize_body(&Body::Json(value.clone())).unwrap();
    let reparsed = parse_body(Some("application/json"), serialized.as_bytes());

    assert_eq!(reparsed, Body::Json(value));
}

#[test]
fn test_serialize_body_form() {
    let mut params = HashMap::new();
    params.insert("name".to_string(), "John Doe".to_string());
    params.insert("lang".to_string(), "ja".to_string());

    assert_eq!(
        serialize_body(&Body::Form(params)).unwrap(),
        "lang=ja&name=John+Doe"
    );
}

#[tokio::test]
async fn test_handler_fn_adapts_async_closures() {
    let handler = handler_fn(|mut ctx: ApiContext| async move {
        ctx.response = ApiResponse::ok().text("handled");
        Ok(ctx)
    });

    let ctx = ApiContext::new(ApiRequest::new(Method::GET, "/test".to_string()));
    let ctx = handler.handle(ctx).await.unwrap();

    assert_eq!(ctx.response.status, Some(200));
    assert_eq!(ctx.response.body, Body::Text("handled".to_string()));
}

#[tokio::test]
async fn test_handler_fn_propagates_errors() {
    let handler = handler_fn(|_ctx: ApiContext| async move {
        Err(Error::HandlerError("boom".to_string()))
    });

    let ctx = ApiContext::new(ApiRequest::new(Method::GET, "/test".to_string()));
    let result = handler.handle(ctx).await;

    assert!(matches!(result, Err(Error::HandlerError(_))));
}
