//! Shared helpers for the end-to-end tests.

use std::{
    fs,
    future::Future,
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use ncdc::reload::{ControllerHandle, ReloadController, ServeError, ServeOptions};
use tokio::task::JoinHandle;

pub const BOOKS_CONFIG: &str = r#"
- name: Books
  request:
    method: GET
    endpoints:
      - /api/books/*
  response:
    code: 200
    headers:
      content-type: application/json
    bodyPath: ./book.json
"#;

pub fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

pub fn options(config: &Path, watch: bool) -> ServeOptions {
    ServeOptions {
        config_path: config.to_path_buf(),
        address: "127.0.0.1:0".parse().unwrap(),
        schema_dir: None,
        watch,
    }
}

/// Starts a controller with the file system watcher and runs it in the
/// background.
pub async fn serve(options: ServeOptions) -> (ControllerHandle, JoinHandle<Result<(), ServeError>>) {
    let (controller, handle) = ReloadController::start(options).await.unwrap();
    (handle, tokio::spawn(controller.run()))
}

pub fn address(handle: &ControllerHandle) -> SocketAddr {
    handle.status().address.unwrap()
}

pub fn url(address: SocketAddr, path: &str) -> String {
    format!("http://{address}{path}")
}

/// Retries `check` until it returns true or ten seconds pass.
#[allow(dead_code)]
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    false
}

/// Body of a GET to `path`, or `None` when nothing is listening.
#[allow(dead_code)]
pub async fn fetch(address: SocketAddr, path: &str) -> Option<(u16, String)> {
    let response = reqwest::get(url(address, path)).await.ok()?;
    let status = response.status().as_u16();
    Some((status, response.text().await.ok()?))
}
