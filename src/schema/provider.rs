use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use serde_json::{json, Value};
use tracing::debug;

use super::{SchemaError, SchemaProvider};

const BUILTIN_TYPES: [&str; 7] = [
    "string", "number", "integer", "boolean", "object", "array", "null",
];

/// Reads `<dir>/<Type>.json` schema files. Primitive type names are
/// answered without a directory.
#[derive(Debug, Clone, Default)]
pub struct FsSchemaProvider {
    dir: Option<PathBuf>,
}

impl FsSchemaProvider {
    pub fn new(dir: Option<PathBuf>) -> Self {
        FsSchemaProvider { dir }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }
}

impl SchemaProvider for FsSchemaProvider {
    fn load(&self, type_name: &str) -> Result<Value, SchemaError> {
        if BUILTIN_TYPES.contains(&type_name) {
            return Ok(json!({ "type": type_name }));
        }

        let dir = self
            .dir
            .as_ref()
            .ok_or_else(|| SchemaError::NoSchemaDir(type_name.to_string()))?;
        let path = dir.join(format!("{type_name}.json"));
        debug!(type_name, path = %path.display(), "loading schema");

        let content = fs::read_to_string(&path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                SchemaError::MissingSchema {
                    type_name: type_name.to_string(),
                    path: path.clone(),
                }
            } else {
                SchemaError::Io {
                    path: path.clone(),
                    source: e,
                }
            }
        })?;
        serde_json::from_str(&content).map_err(|source| SchemaError::Parse { path, source })
    }
}
