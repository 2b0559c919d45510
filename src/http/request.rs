use axum::body::to_bytes;
use axum::extract::Request as HttpRequest;
use axum::http::Method;
use serde_json::{Map, Value};
use tracing::debug;

use crate::resource::body::is_form;
use crate::resource::query::parse_query;
use crate::resource::ReceivedHeaders;

const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// An incoming request reduced to what resource matching looks at.
#[derive(Debug, Clone)]
pub struct IncomingRequest {
    pub method: Method,
    pub path: String,
    pub raw_query: Option<String>,
    pub query: Map<String, Value>,
    pub headers: ReceivedHeaders,
    pub body: Option<Value>,
}

impl IncomingRequest {
    pub async fn read(request: HttpRequest) -> Result<Self, axum::Error> {
        let (parts, body) = request.into_parts();
        let bytes = to_bytes(body, MAX_BODY_BYTES).await?;

        let headers = ReceivedHeaders::from(&parts.headers);
        let raw_query = parts.uri.query().map(str::to_string);
        let query = raw_query.as_deref().map(parse_query).unwrap_or_default();
        let body = decode_body(&bytes, headers.first("content-type"));

        debug!(method = %parts.method, path = parts.uri.path(), "request received");
        Ok(IncomingRequest {
            method: parts.method,
            path: parts.uri.path().to_string(),
            raw_query,
            query,
            headers,
            body,
        })
    }

    /// Body as seen by type validation: a missing body is `null`.
    pub fn body_or_null(&self) -> Value {
        self.body.clone().unwrap_or(Value::Null)
    }

    pub fn body_text(&self) -> String {
        match &self.body {
            None => String::new(),
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
        }
    }
}

/// Form bodies become maps. JSON (or untyped) bodies are parsed when they
/// parse. Anything else stays text.
pub fn decode_body(bytes: &[u8], content_type: Option<&str>) -> Option<Value> {
    if bytes.is_empty() {
        return None;
    }
    let text = String::from_utf8_lossy(bytes);
    if is_form(content_type) {
        return Some(Value::Object(parse_query(&text)));
    }
    if !is_json_or_untyped(content_type) {
        return Some(Value::String(text.into_owned()));
    }
    match serde_json::from_slice::<Value>(bytes) {
        Ok(value) => Some(value),
        Err(_) => Some(Value::String(text.into_owned())),
    }
}

fn is_json_or_untyped(content_type: Option<&str>) -> bool {
    match content_type {
        None => true,
        Some(ct) => {
            let essence = ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
            essence.is_empty() || essence == "application/json" || essence.ends_with("+json")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_by_content_type() {
        assert_eq!(decode_body(b"", None), None);
        assert_eq!(decode_body(br#"{"a":1}"#, Some("application/json")), Some(json!({ "a": 1 })));
        assert_eq!(decode_body(b"plain words", None), Some(json!("plain words")));
        assert_eq!(decode_body(b"5", None), Some(json!(5)));
        assert_eq!(decode_body(b"5", Some("application/vnd.api+json")), Some(json!(5)));
        assert_eq!(
            decode_body(b"a=1&b=x", Some("application/x-www-form-urlencoded; charset=utf-8")),
            Some(json!({ "a": "1", "b": "x" }))
        );
    }

    #[test]
    fn text_content_types_are_not_parsed() {
        assert_eq!(decode_body(b"5", Some("text/plain")), Some(json!("5")));
        assert_eq!(
            decode_body(br#"{"raw": true}"#, Some("text/plain; charset=utf-8")),
            Some(json!(r#"{"raw": true}"#))
        );
    }

    #[tokio::test]
    async fn reads_an_axum_request() {
        let request = HttpRequest::builder()
            .method("POST")
            .uri("/api/books?tag=a&tag=b")
            .header("Content-Type", "application/json")
            .body(axum::body::Body::from(r#"{"title":"Dune"}"#))
            .unwrap();

        let incoming = IncomingRequest::read(request).await.unwrap();
        assert_eq!(incoming.method, Method::POST);
        assert_eq!(incoming.path, "/api/books");
        assert_eq!(incoming.query.get("tag"), Some(&json!(["a", "b"])));
        assert_eq!(incoming.body, Some(json!({ "title": "Dune" })));
        assert_eq!(incoming.headers.first("content-type"), Some("application/json"));
    }
}
