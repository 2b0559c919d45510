use std::fmt;
use std::str::FromStr;

use axum::http::Method;
use serde::{Serialize, Serializer};

/// HTTP verbs a resource may be registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

const METHOD_TABLE: [(HttpMethod, &str); 7] = [
    (HttpMethod::Get, "GET"),
    (HttpMethod::Post, "POST"),
    (HttpMethod::Put, "PUT"),
    (HttpMethod::Delete, "DELETE"),
    (HttpMethod::Patch, "PATCH"),
    (HttpMethod::Head, "HEAD"),
    (HttpMethod::Options, "OPTIONS"),
];

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        METHOD_TABLE
            .iter()
            .find(|(m, _)| m == self)
            .map(|(_, name)| *name)
            .unwrap_or("GET")
    }

    pub fn to_http(self) -> Method {
        match self {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Head => Method::HEAD,
            HttpMethod::Options => Method::OPTIONS,
        }
    }

    /// Whether an incoming request method is served by this verb. `GET`
    /// resources also answer `HEAD`.
    pub fn accepts(&self, method: &Method) -> bool {
        self.to_http() == *method || (*self == HttpMethod::Get && *method == Method::HEAD)
    }

    pub fn supported() -> impl Iterator<Item = &'static str> {
        METHOD_TABLE.iter().map(|(_, name)| *name)
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        METHOD_TABLE
            .iter()
            .find(|(_, name)| *name == upper)
            .map(|(m, _)| *m)
            .ok_or_else(|| format!("unsupported method {s}"))
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for HttpMethod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
