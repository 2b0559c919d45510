//! Immutable request/response rules built from configuration.
//!
//! A [`Resource`] pairs one matchable [`Request`] with the [`Response`]
//! served for it. Each value type owns one concern: [`Headers`] and
//! [`Query`] decide whether an incoming request qualifies, [`Body`] both
//! matches received payloads and renders the configured one.

pub mod body;
pub mod headers;
pub mod method;
pub mod query;
pub mod request;
pub mod response;

use serde::Serialize;

pub use body::Body;
pub use headers::{Headers, ReceivedHeaders};
pub use method::HttpMethod;
pub use query::Query;
pub use request::Request;
pub use response::Response;

#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("endpoint {endpoint:?} has an empty path")]
    EmptyPath { endpoint: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resource {
    name: String,
    request: Request,
    response: Response,
    /// Served as a mock but never sent as a contract check.
    #[serde(rename = "serveOnly", skip_serializing_if = "std::ops::Not::not")]
    serve_only: bool,
}

impl Resource {
    pub fn new(name: impl Into<String>, request: Request, response: Response) -> Self {
        Resource {
            name: name.into(),
            request,
            response,
            serve_only: false,
        }
    }

    pub fn with_serve_only(mut self, serve_only: bool) -> Self {
        self.serve_only = serve_only;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn serve_only(&self) -> bool {
        self.serve_only
    }

    pub fn summary(&self) -> ResourceSummary<'_> {
        ResourceSummary {
            name: &self.name,
            method: self.request.method(),
            endpoint: self.request.endpoint(),
            code: self.response.code(),
        }
    }
}

/// Short description of a resource, listed on the root route.
#[derive(Debug, Serialize)]
pub struct ResourceSummary<'a> {
    pub name: &'a str,
    pub method: HttpMethod,
    pub endpoint: &'a str,
    pub code: u16,
}
