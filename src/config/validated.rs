use std::collections::BTreeMap;

use serde_json::Value;

use crate::resource::HttpMethod;

/// Where a body comes from once the configuration is known to be well formed.
#[derive(Debug, Clone, PartialEq)]
pub enum BodySource {
    Inline(Value),
    Fixture(String),
}

impl BodySource {
    pub fn fixture_path(&self) -> Option<&str> {
        match self {
            BodySource::Fixture(path) => Some(path),
            BodySource::Inline(_) => None,
        }
    }
}

/// A configuration item that passed validation. Converting it into
/// resources cannot fail on shape, only on I/O.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedConfig {
    pub name: String,
    pub serve_only: bool,
    pub request: ValidatedRequest,
    pub response: ValidatedResponse,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    pub method: HttpMethod,
    pub endpoints: Vec<String>,
    pub serve_endpoint: Option<String>,
    pub type_name: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub body: Option<BodySource>,
}

impl ValidatedRequest {
    /// Endpoints registered when serving mocks.
    pub fn serve_endpoints(&self) -> Vec<&str> {
        match &self.serve_endpoint {
            Some(endpoint) => vec![endpoint.as_str()],
            None => self.endpoints.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedResponse {
    pub code: u16,
    pub type_name: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub body: Option<BodySource>,
    pub serve_body: Option<BodySource>,
}

impl ValidatedResponse {
    /// Body sent when serving: `serveBody`/`serveBodyPath` win over `body`.
    pub fn served_body(&self) -> Option<&BodySource> {
        self.serve_body.as_ref().or(self.body.as_ref())
    }
}

impl ValidatedConfig {
    /// Every fixture path this item references, relative as written.
    pub fn fixture_refs(&self) -> impl Iterator<Item = &str> {
        [
            self.request.body.as_ref(),
            self.response.body.as_ref(),
            self.response.serve_body.as_ref(),
        ]
        .into_iter()
        .flatten()
        .filter_map(BodySource::fixture_path)
    }
}
