use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde_json::Value;
use tracing::debug;

use super::error::LoadError;
use super::fixture::{self, ReadError};
use super::validated::{BodySource, ValidatedConfig};
use super::validation::validate_document;
use crate::resource::{Body, Headers, Request, Resource, Response};
use crate::schema::TypeValidator;

#[derive(Clone, Default)]
pub struct LoadOptions {
    /// Validator for bodies of resources declaring a `type`. Without one,
    /// typed bodies are not checked.
    pub validator: Option<Arc<dyn TypeValidator>>,
    /// Validate request bodies against their type even when no body is
    /// configured. Used when requests are sent rather than served.
    pub force_request_validation: bool,
}

/// One successful load: the resources to serve and every file they were
/// built from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub resources: Vec<Resource>,
    pub fixture_paths: BTreeSet<PathBuf>,
}

pub fn load(config_path: &Path, options: &LoadOptions) -> Result<LoadedConfig, LoadError> {
    let document = read_document(config_path)?;
    let items = validate_document(document).map_err(|messages| LoadError::ConfigInvalid {
        path: config_path.to_path_buf(),
        messages,
    })?;

    if items.is_empty() {
        return Err(LoadError::NoResources {
            path: config_path.to_path_buf(),
        });
    }

    let base = config_path.parent().unwrap_or_else(|| Path::new("."));
    let mut fixture_paths = BTreeSet::from([config_path.to_path_buf()]);
    let mut resources = Vec::new();
    for item in &items {
        fixture_paths.extend(
            item.fixture_refs()
                .map(|reference| fixture::resolve_path(base, reference)),
        );
        resources.extend(build_resources(item, base)?);
    }

    match &options.validator {
        Some(validator) => {
            check_bodies(&resources, validator.as_ref(), options.force_request_validation)?
        }
        None => {
            let typed = resources
                .iter()
                .filter(|r| r.request().type_name().is_some() || r.response().type_name().is_some())
                .count();
            if typed > 0 {
                debug!(typed, "no type validator configured, skipping body type checks");
            }
        }
    }

    debug!(
        resources = resources.len(),
        fixtures = fixture_paths.len(),
        path = %config_path.display(),
        "configuration loaded"
    );
    Ok(LoadedConfig {
        resources,
        fixture_paths,
    })
}

fn read_document(path: &Path) -> Result<serde_yaml::Value, LoadError> {
    let read_error = |source: ReadError| LoadError::ConfigRead {
        path: path.to_path_buf(),
        source,
    };
    let content = fs::read_to_string(path).map_err(|e| read_error(e.into()))?;
    if content.trim().is_empty() {
        return Ok(serde_yaml::Value::Null);
    }
    serde_yaml::from_str(&content).map_err(|e| read_error(e.into()))
}

/// One resource per serve endpoint; names get an index suffix when an item
/// expands to more than one.
fn build_resources(item: &ValidatedConfig, base: &Path) -> Result<Vec<Resource>, LoadError> {
    let request_headers = Headers::new(&item.request.headers);
    let response_headers = Headers::new(&item.response.headers);

    let request_body = resolve_body(item, item.request.body.as_ref(), base)?
        .map(|data| Body::new(data, request_headers.content_type()));
    let response_body = resolve_body(item, item.response.served_body(), base)?
        .map(|data| Body::new(data, response_headers.content_type()));

    let endpoints = item.request.serve_endpoints();
    let expanded = endpoints.len() > 1;
    endpoints
        .into_iter()
        .enumerate()
        .map(|(index, endpoint)| {
            let name = if expanded {
                format!("{} [{index}]", item.name)
            } else {
                item.name.clone()
            };
            let request = Request::new(
                item.request.method,
                endpoint,
                request_headers.clone(),
                item.request.type_name.clone(),
                request_body.clone(),
            )
            .map_err(|source| LoadError::InvalidResource {
                resource: name.clone(),
                source,
            })?;
            let response = Response::new(
                item.response.code,
                response_body.clone(),
                item.response.type_name.clone(),
                response_headers.clone(),
            );
            Ok(Resource::new(name, request, response).with_serve_only(item.serve_only))
        })
        .collect()
}

fn resolve_body(
    item: &ValidatedConfig,
    source: Option<&BodySource>,
    base: &Path,
) -> Result<Option<Value>, LoadError> {
    match source {
        None => Ok(None),
        Some(BodySource::Inline(value)) => Ok(Some(value.clone())),
        Some(BodySource::Fixture(reference)) => fixture::read(base, reference)
            .map(Some)
            .map_err(|source| LoadError::FixtureRead {
                resource: item.name.clone(),
                path: fixture::resolve_path(base, reference),
                source,
            }),
    }
}

/// Type-checks every typed body, gathering all mismatches into one error.
fn check_bodies(
    resources: &[Resource],
    validator: &dyn TypeValidator,
    force_request_validation: bool,
) -> Result<(), LoadError> {
    let mut failures = Vec::new();

    for resource in resources {
        let request = resource.request();
        if let Some(type_name) = request.type_name() {
            let data = match request.body() {
                Some(body) => Some(body.data().clone()),
                None if force_request_validation => Some(Value::Null),
                None => None,
            };
            if let Some(data) = data {
                let check = validator
                    .validate(&data, type_name)
                    .map_err(LoadError::BodyValidationInternal)?;
                if !check.success() {
                    failures.push(format!(
                        "config[{}].request.body is not a valid {type_name}\n{}",
                        resource.name(),
                        check.errors.join("\n")
                    ));
                }
            }
        }

        let response = resource.response();
        if let (Some(type_name), Some(body)) = (response.type_name(), response.body()) {
            let check = validator
                .validate(body.data(), type_name)
                .map_err(LoadError::BodyValidationInternal)?;
            if !check.success() {
                failures.push(format!(
                    "config[{}].response.body is not a valid {type_name}\n{}",
                    resource.name(),
                    check.errors.join("\n")
                ));
            }
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(LoadError::BodyValidation { failures })
    }
}
