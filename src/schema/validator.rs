use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use serde_json::Value;

use super::{SchemaError, SchemaProvider, TypeCheck, TypeValidator};

/// Validates values with compiled JSON Schemas.
///
/// Compiled schemas are cached for the lifetime of the validator; a new
/// validator is built for every configuration load so edited schema files
/// are picked up.
pub struct JsonSchemaValidator<P> {
    provider: P,
    compiled: Mutex<HashMap<String, Arc<jsonschema::Validator>>>,
}

impl<P: SchemaProvider> JsonSchemaValidator<P> {
    pub fn new(provider: P) -> Self {
        JsonSchemaValidator {
            provider,
            compiled: Mutex::new(HashMap::new()),
        }
    }

    fn compiled(&self, type_name: &str) -> Result<Arc<jsonschema::Validator>, SchemaError> {
        let mut cache = self.compiled.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(found) = cache.get(type_name) {
            return Ok(Arc::clone(found));
        }

        let schema = self.provider.load(type_name)?;
        let validator =
            jsonschema::validator_for(&schema).map_err(|e| SchemaError::InvalidSchema {
                type_name: type_name.to_string(),
                message: e.to_string(),
            })?;
        let validator = Arc::new(validator);
        cache.insert(type_name.to_string(), Arc::clone(&validator));
        Ok(validator)
    }
}

impl<P: SchemaProvider> TypeValidator for JsonSchemaValidator<P> {
    fn validate(&self, data: &Value, type_name: &str) -> Result<TypeCheck, SchemaError> {
        let validator = self.compiled(type_name)?;
        let errors = validator
            .iter_errors(data)
            .map(|e| {
                let location = e.instance_path.to_string();
                let location = if location.is_empty() { "/".to_string() } else { location };
                format!("{location} {e}")
            })
            .collect();
        Ok(TypeCheck { errors })
    }
}
