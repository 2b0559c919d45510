use serde::Serialize;
use serde_json::{Map, Value};
use url::form_urlencoded;

use super::query::parse_query;

pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// A configured request or response body.
///
/// `data` is the structured value read from configuration or a fixture file.
/// The content type hint decides the wire format.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Body {
    data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_type: Option<String>,
}

impl Body {
    pub fn new(data: Value, content_type: Option<&str>) -> Self {
        Body {
            data,
            content_type: content_type.map(str::to_string),
        }
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    fn is_form(&self) -> bool {
        is_form(self.content_type.as_deref())
    }

    /// Render to the text sent over the wire.
    pub fn to_wire(&self) -> Result<String, serde_json::Error> {
        if self.is_form() {
            if let Value::Object(map) = &self.data {
                return Ok(encode_form(map));
            }
        }
        match &self.data {
            Value::String(text) => Ok(text.clone()),
            other => serde_json::to_string(other),
        }
    }

    /// Structural equality against a received body.
    ///
    /// Textual input is decoded the way the content type says: form
    /// encoding becomes a map, anything else is tried as JSON. A configured
    /// string compares as text, so a received value decoded from the same
    /// bytes still matches it.
    pub fn matches(&self, received: &Value) -> bool {
        if self.is_form() {
            let expected = match &self.data {
                Value::Object(map) => Value::Object(parse_query(&encode_form(map))),
                other => other.clone(),
            };
            return match received {
                Value::String(text) => expected == Value::Object(parse_query(text)),
                other => expected == *other,
            };
        }

        if self.data == *received {
            return true;
        }
        match (&self.data, received) {
            (Value::String(_), Value::String(_)) => false,
            (Value::String(expected), decoded) => serde_json::from_str::<Value>(expected)
                .map(|value| value == *decoded)
                .unwrap_or(false),
            (expected, Value::String(text)) => serde_json::from_str::<Value>(text)
                .map(|decoded| decoded == *expected)
                .unwrap_or(false),
            _ => false,
        }
    }
}

pub fn is_form(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| ct.to_ascii_lowercase().starts_with(FORM_URLENCODED))
        .unwrap_or(false)
}

fn encode_form(map: &Map<String, Value>) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in map {
        append_form(&mut serializer, key, value);
    }
    serializer.finish()
}

fn append_form(serializer: &mut form_urlencoded::Serializer<'_, String>, key: &str, value: &Value) {
    match value {
        Value::Null => {
            serializer.append_pair(key, "");
        }
        Value::String(s) => {
            serializer.append_pair(key, s);
        }
        Value::Array(items) => {
            for item in items {
                append_form(serializer, key, item);
            }
        }
        Value::Object(fields) => {
            for (nested, item) in fields {
                append_form(serializer, &format!("{key}[{nested}]"), item);
            }
        }
        scalar => {
            serializer.append_pair(key, &scalar.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_serializes_as_json_and_parses_back() {
        let data = json!({ "ISBN": "123", "tags": ["a", "b"], "pages": 42 });
        let body = Body::new(data.clone(), None);
        let wire = body.to_wire().unwrap();
        assert_eq!(serde_json::from_str::<Value>(&wire).unwrap(), data);
    }

    #[test]
    fn string_serializes_raw() {
        let body = Body::new(json!("hello world"), Some("text/plain"));
        assert_eq!(body.to_wire().unwrap(), "hello world");
    }

    #[test]
    fn form_content_type_encodes_fields() {
        let body = Body::new(json!({ "name": "a b", "ids": [1, 2] }), Some(FORM_URLENCODED));
        assert_eq!(body.to_wire().unwrap(), "ids=1&ids=2&name=a+b");
    }

    #[test]
    fn matches_is_deep_equality() {
        let body = Body::new(json!({ "a": { "b": [1, 2] } }), None);
        assert!(body.matches(&json!({ "a": { "b": [1, 2] } })));
        assert!(!body.matches(&json!({ "a": { "b": [2, 1] } })));
        assert!(!body.matches(&json!({ "a": { "b": [1, 2] }, "c": true })));
    }

    #[test]
    fn matches_decodes_textual_json() {
        let body = Body::new(json!({ "title": "Dune" }), None);
        assert!(body.matches(&json!("{\"title\":\"Dune\"}")));
        assert!(!body.matches(&json!("not json")));
    }

    #[test]
    fn string_bodies_match_the_same_text_however_it_was_decoded() {
        use crate::http::request::decode_body;

        let number_text = Body::new(json!("5"), Some("text/plain"));
        for content_type in [Some("text/plain"), Some("application/json"), None] {
            let received = decode_body(b"5", content_type).unwrap();
            assert!(number_text.matches(&received), "{content_type:?}");
        }
        assert!(!number_text.matches(&json!(6)));

        let json_text = Body::new(json!("{\"raw\": true}"), None);
        let received = decode_body(br#"{"raw": true}"#, Some("text/plain")).unwrap();
        assert!(json_text.matches(&received));
        assert!(json_text.matches(&json!({ "raw": true })));
        assert!(!json_text.matches(&json!({ "raw": false })));
    }

    #[test]
    fn matches_decodes_form_text() {
        let body = Body::new(json!({ "user": "jo", "age": 5 }), Some(FORM_URLENCODED));
        assert!(body.matches(&json!("age=5&user=jo")));
        assert!(!body.matches(&json!("age=6&user=jo")));
    }
}
