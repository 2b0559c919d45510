use serde::Serialize;

use super::{Body, Headers, HttpMethod, Query, ResourceError};

/// The request half of a resource: everything an incoming request is
/// matched against.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    method: HttpMethod,
    endpoint: String,
    path_name: String,
    query: Query,
    headers: Headers,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    type_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<Body>,
}

impl Request {
    pub fn new(
        method: HttpMethod,
        endpoint: impl Into<String>,
        headers: Headers,
        type_name: Option<String>,
        body: Option<Body>,
    ) -> Result<Self, ResourceError> {
        let endpoint = endpoint.into();
        let path_name = endpoint
            .split_once('?')
            .map(|(path, _)| path)
            .unwrap_or(&endpoint)
            .to_string();
        if path_name.is_empty() {
            return Err(ResourceError::EmptyPath { endpoint });
        }

        Ok(Request {
            method,
            query: Query::from_endpoint(&endpoint),
            path_name,
            endpoint,
            headers,
            type_name,
            body,
        })
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn path_name(&self) -> &str {
        &self.path_name
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }
}
