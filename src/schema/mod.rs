//! Type validation seam.
//!
//! Resources may name a type for their request or response body. A
//! [`SchemaProvider`] resolves that name to a JSON Schema document and a
//! [`TypeValidator`] checks values against it. The defaults read schemas
//! from a directory of `<Type>.json` files and validate with `jsonschema`.

pub mod provider;
pub mod validator;

use std::path::PathBuf;

use serde_json::Value;

pub use provider::FsSchemaProvider;
pub use validator::JsonSchemaValidator;

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("{type_name} did not match:\n{message}")]
    Mismatch { type_name: String, message: String },

    #[error("no schema directory is configured to resolve type {0}")]
    NoSchemaDir(String),

    #[error("no schema found for type {type_name} at {}", .path.display())]
    MissingSchema { type_name: String, path: PathBuf },

    #[error("could not read schema {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse schema {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("schema for type {type_name} is invalid: {message}")]
    InvalidSchema { type_name: String, message: String },
}

/// Outcome of checking one value against one type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeCheck {
    pub errors: Vec<String>,
}

impl TypeCheck {
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }
}

pub trait SchemaProvider: Send + Sync {
    fn load(&self, type_name: &str) -> Result<Value, SchemaError>;
}

pub trait TypeValidator: Send + Sync {
    /// Check `data` against `type_name`. `Err` means the check itself could
    /// not run (missing or broken schema), not that the data mismatched.
    fn validate(&self, data: &Value, type_name: &str) -> Result<TypeCheck, SchemaError>;

    /// Like [`TypeValidator::validate`] but a mismatch is an error too.
    fn assert(&self, data: &Value, type_name: &str) -> Result<(), SchemaError> {
        let check = self.validate(data, type_name)?;
        if check.success() {
            Ok(())
        } else {
            Err(SchemaError::Mismatch {
                type_name: type_name.to_string(),
                message: check.errors.join("\n"),
            })
        }
    }
}
