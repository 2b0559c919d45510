//! Checks the raw configuration document and turns it into
//! [`ValidatedConfig`] items.
//!
//! Validation never stops at the first problem: every field-level error in
//! every item is collected and rendered with its path, e.g.
//! `config[Books].request.endpoints must start with /`.

use std::collections::BTreeMap;

use serde_json::Value;

use super::raw::{RawConfigItem, RawEndpoints, RawHeaders, RawRequest, RawResponse};
use super::validated::{BodySource, ValidatedConfig, ValidatedRequest, ValidatedResponse};
use crate::resource::HttpMethod;

pub fn validate_document(doc: serde_yaml::Value) -> Result<Vec<ValidatedConfig>, Vec<String>> {
    let items = match doc {
        serde_yaml::Value::Null => return Ok(Vec::new()),
        serde_yaml::Value::Sequence(items) => items,
        _ => return Err(vec!["config must be a list of resources".to_string()]),
    };

    let mut errors = Vec::new();
    let mut validated = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let label = item
            .get("name")
            .and_then(|n| n.as_str())
            .filter(|n| !n.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| index.to_string());

        match serde_yaml::from_value::<RawConfigItem>(item) {
            Ok(raw) => {
                if let Some(config) = validate_item(raw, &label, &mut errors) {
                    validated.push(config);
                }
            }
            Err(e) => errors.push(format!("config[{label}] {e}")),
        }
    }

    if errors.is_empty() {
        Ok(validated)
    } else {
        Err(errors)
    }
}

/// Collects the errors of one item; returns the validated item only when it
/// contributed no errors.
fn validate_item(
    raw: RawConfigItem,
    label: &str,
    errors: &mut Vec<String>,
) -> Option<ValidatedConfig> {
    let before = errors.len();
    let prefix = format!("config[{label}]");

    let name = match raw.name {
        Some(name) if !name.trim().is_empty() => Some(name),
        _ => {
            errors.push(format!("{prefix}.name is required"));
            None
        }
    };

    let request = match raw.request {
        Some(request) => validate_request(request, &prefix, errors),
        None => {
            errors.push(format!("{prefix}.request is required"));
            None
        }
    };

    let response = match raw.response {
        Some(response) => validate_response(response, &prefix, errors),
        None => {
            errors.push(format!("{prefix}.response is required"));
            None
        }
    };

    if errors.len() != before {
        return None;
    }
    Some(ValidatedConfig {
        name: name?,
        serve_only: raw.serve_only,
        request: request?,
        response: response?,
    })
}

fn validate_request(
    raw: RawRequest,
    prefix: &str,
    errors: &mut Vec<String>,
) -> Option<ValidatedRequest> {
    let before = errors.len();

    let method = match raw.method.as_deref() {
        None => {
            errors.push(format!("{prefix}.request.method is required"));
            None
        }
        Some(m) => match m.parse::<HttpMethod>() {
            Ok(method) => Some(method),
            Err(_) => {
                let allowed: Vec<&str> = HttpMethod::supported().collect();
                errors.push(format!(
                    "{prefix}.request.method must be one of {}",
                    allowed.join(", ")
                ));
                None
            }
        },
    };

    let endpoints = match raw.endpoints {
        Some(RawEndpoints::One(endpoint)) => {
            check_endpoint(&endpoint, &format!("{prefix}.request.endpoints"), errors);
            vec![endpoint]
        }
        Some(RawEndpoints::Many(endpoints)) => {
            if endpoints.is_empty() && raw.serve_endpoint.is_none() {
                errors.push(format!("{prefix}.request.endpoints must not be empty"));
            }
            for (i, endpoint) in endpoints.iter().enumerate() {
                check_endpoint(endpoint, &format!("{prefix}.request.endpoints[{i}]"), errors);
            }
            endpoints
        }
        None => {
            if raw.serve_endpoint.is_none() {
                errors.push(format!("{prefix}.request.endpoints is required"));
            }
            Vec::new()
        }
    };

    if let Some(serve_endpoint) = &raw.serve_endpoint {
        check_endpoint(serve_endpoint, &format!("{prefix}.request.serveEndpoint"), errors);
    }

    check_type_name(raw.type_name.as_deref(), &format!("{prefix}.request.type"), errors);
    let body = body_source(
        raw.body,
        raw.body_path,
        &format!("{prefix}.request"),
        ("body", "bodyPath"),
        errors,
    );

    if errors.len() != before {
        return None;
    }
    Some(ValidatedRequest {
        method: method?,
        endpoints,
        serve_endpoint: raw.serve_endpoint,
        type_name: raw.type_name,
        headers: header_map(raw.headers),
        body,
    })
}

fn validate_response(
    raw: RawResponse,
    prefix: &str,
    errors: &mut Vec<String>,
) -> Option<ValidatedResponse> {
    let before = errors.len();

    let code = match raw.code {
        None => {
            errors.push(format!("{prefix}.response.code is required"));
            None
        }
        Some(code) if (100..=599).contains(&code) => u16::try_from(code).ok(),
        Some(_) => {
            errors.push(format!("{prefix}.response.code must be between 100 and 599"));
            None
        }
    };

    check_type_name(raw.type_name.as_deref(), &format!("{prefix}.response.type"), errors);
    let field = format!("{prefix}.response");
    let body = body_source(raw.body, raw.body_path, &field, ("body", "bodyPath"), errors);
    let serve_body = body_source(
        raw.serve_body,
        raw.serve_body_path,
        &field,
        ("serveBody", "serveBodyPath"),
        errors,
    );

    if errors.len() != before {
        return None;
    }
    Some(ValidatedResponse {
        code: code?,
        type_name: raw.type_name,
        headers: header_map(raw.headers),
        body,
        serve_body,
    })
}

fn check_endpoint(endpoint: &str, field: &str, errors: &mut Vec<String>) {
    if !endpoint.starts_with('/') {
        errors.push(format!("{field} must start with /"));
    }
}

fn check_type_name(type_name: Option<&str>, field: &str, errors: &mut Vec<String>) {
    if matches!(type_name, Some(t) if t.trim().is_empty()) {
        errors.push(format!("{field} must not be empty"));
    }
}

fn body_source(
    inline: Option<Value>,
    path: Option<String>,
    field: &str,
    (inline_key, path_key): (&str, &str),
    errors: &mut Vec<String>,
) -> Option<BodySource> {
    match (inline, path) {
        (Some(_), Some(_)) => {
            errors.push(format!("{field} cannot have both {inline_key} and {path_key}"));
            None
        }
        (Some(value), None) => Some(BodySource::Inline(value)),
        (None, Some(path)) if path.trim().is_empty() => {
            errors.push(format!("{field}.{path_key} must not be empty"));
            None
        }
        (None, Some(path)) => Some(BodySource::Fixture(path)),
        (None, None) => None,
    }
}

fn header_map(headers: Option<RawHeaders>) -> BTreeMap<String, String> {
    headers
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| (k, v.to_string()))
        .collect()
}
