use serde::Serialize;

use super::{Body, Headers};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<Body>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    type_name: Option<String>,
    headers: Headers,
}

impl Response {
    pub fn new(code: u16, body: Option<Body>, type_name: Option<String>, headers: Headers) -> Self {
        Response {
            code,
            body,
            type_name,
            headers,
        }
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }
}
