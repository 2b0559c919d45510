use std::path::PathBuf;

use super::fixture::ReadError;
use crate::resource::ResourceError;
use crate::schema::SchemaError;

/// Everything that can stop a configuration from becoming a set of
/// resources.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("could not read config file {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: ReadError,
    },

    #[error("could not validate config file {}\n{}", .path.display(), .messages.join("\n"))]
    ConfigInvalid { path: PathBuf, messages: Vec<String> },

    #[error("No mocks to serve")]
    NoResources { path: PathBuf },

    #[error("could not read fixture {} for config[{resource}]: {source}", .path.display())]
    FixtureRead {
        resource: String,
        path: PathBuf,
        #[source]
        source: ReadError,
    },

    #[error("config[{resource}] is invalid: {source}")]
    InvalidResource {
        resource: String,
        #[source]
        source: ResourceError,
    },

    #[error("one or more fixture bodies did not match their declared type\n{}", .failures.join("\n"))]
    BodyValidation { failures: Vec<String> },

    #[error("an error occurred while validating a fixture body: {0}")]
    BodyValidationInternal(#[source] SchemaError),
}
