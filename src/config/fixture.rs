use std::{
    env, fs, io,
    path::{Component, Path, PathBuf},
};

use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("{0}")]
    Io(#[from] io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Makes `path` absolute against the current working directory.
pub fn absolute_path(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(env::current_dir()?.join(path))
    }
}

/// Resolves a fixture reference relative to the directory holding the
/// configuration file.
pub fn resolve_path(base: &Path, reference: &str) -> PathBuf {
    base.join(reference.trim())
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Reads a fixture file. `.json` is parsed as JSON, `.yml`/`.yaml` as YAML,
/// anything else is returned as text.
pub fn read(base: &Path, reference: &str) -> Result<Value, ReadError> {
    read_file(&resolve_path(base, reference))
}

pub fn read_file(path: &Path) -> Result<Value, ReadError> {
    let content = fs::read_to_string(path)?;
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("json") => Ok(serde_json::from_str(&content)?),
        Some("yml") | Some("yaml") => Ok(serde_yaml::from_str(&content)?),
        _ => Ok(Value::String(content)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn format_follows_extension() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("book.json"), r#"{"ISBN":"123"}"#).unwrap();
        fs::write(tmp.path().join("book.yml"), "ISBN: '456'\npages: 3\n").unwrap();
        fs::write(tmp.path().join("book.txt"), "{\"raw\": true}").unwrap();

        assert_eq!(read(tmp.path(), "book.json").unwrap(), json!({ "ISBN": "123" }));
        assert_eq!(
            read(tmp.path(), "./book.yml").unwrap(),
            json!({ "ISBN": "456", "pages": 3 })
        );
        assert_eq!(read(tmp.path(), "book.txt").unwrap(), json!("{\"raw\": true}"));
    }

    #[test]
    fn absolute_references_ignore_base() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("abs.json");
        fs::write(&file, "[1, 2]").unwrap();

        let value = read(Path::new("/nowhere"), file.to_str().unwrap()).unwrap();
        assert_eq!(value, json!([1, 2]));
    }

    #[test]
    fn malformed_json_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("bad.json"), "{nope").unwrap();
        assert!(matches!(read(tmp.path(), "bad.json"), Err(ReadError::Json(_))));
        assert!(matches!(read(tmp.path(), "missing.json"), Err(ReadError::Io(_))));
    }
}
