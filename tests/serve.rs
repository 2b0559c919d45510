mod common;

use common::{address, fetch, options, serve, url, write, BOOKS_CONFIG};
use ncdc::http::not_found_message;
use ncdc::reload::{base_url, ReloadController, ServeError};
use serde_json::{json, Value};

#[tokio::test]
async fn serves_configured_resources() {
    let tmp = tempfile::tempdir().unwrap();
    write(tmp.path(), "book.json", r#"{"ISBN":"123"}"#);
    let config = write(tmp.path(), "config.yml", BOOKS_CONFIG);

    let (handle, task) = serve(options(&config, false)).await;
    let addr = address(&handle);

    let response = reqwest::get(url(addr, "/api/books/42")).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["content-type"], "application/json");
    assert_eq!(response.json::<Value>().await.unwrap(), json!({ "ISBN": "123" }));

    let client = reqwest::Client::new();
    let response = client.post(url(addr, "/api/books/42")).send().await.unwrap();
    assert_eq!(response.status(), 404);
    assert_eq!(response.text().await.unwrap(), not_found_message(&base_url(addr)));

    handle.shutdown();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn root_lists_resources() {
    let tmp = tempfile::tempdir().unwrap();
    write(tmp.path(), "book.json", "{}");
    let config = write(tmp.path(), "config.yml", BOOKS_CONFIG);

    let (handle, task) = serve(options(&config, false)).await;
    let (status, body) = fetch(address(&handle), "/").await.unwrap();
    assert_eq!(status, 200);
    assert_eq!(
        serde_json::from_str::<Value>(&body).unwrap(),
        json!([{ "name": "Books", "method": "GET", "endpoint": "/api/books/*", "code": 200 }])
    );

    handle.shutdown();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn typed_requests_are_checked_against_schemas() {
    let tmp = tempfile::tempdir().unwrap();
    let schemas = tmp.path().join("schemas");
    std::fs::create_dir(&schemas).unwrap();
    write(
        &schemas,
        "NewBook.json",
        r#"{"type":"object","properties":{"title":{"type":"string"}},"required":["title"]}"#,
    );
    let config = write(
        tmp.path(),
        "config.yml",
        r#"
- name: Create
  request:
    method: POST
    endpoints: /api/books
    type: NewBook
  response:
    code: 201
    body: created
"#,
    );

    let mut opts = options(&config, false);
    opts.schema_dir = Some(schemas);
    let (handle, task) = serve(opts).await;
    let addr = address(&handle);
    let client = reqwest::Client::new();

    let accepted = client
        .post(url(addr, "/api/books"))
        .json(&json!({ "title": "Dune" }))
        .send()
        .await
        .unwrap();
    assert_eq!(accepted.status(), 201);
    assert_eq!(accepted.text().await.unwrap(), "created");

    let rejected = client
        .post(url(addr, "/api/books"))
        .json(&json!({ "pages": 412 }))
        .send()
        .await
        .unwrap();
    assert_eq!(rejected.status(), 404);

    handle.shutdown();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn invalid_config_is_fatal_at_startup() {
    let tmp = tempfile::tempdir().unwrap();
    let config = write(
        tmp.path(),
        "config.yml",
        "- name: Broken\n  request:\n    method: GET\n  response:\n    code: 200\n",
    );

    match ReloadController::start(options(&config, true)).await {
        Err(ServeError::Load(e)) => {
            assert!(e.to_string().contains("config[Broken].request.endpoints is required"))
        }
        Err(other) => panic!("unexpected error {other}"),
        Ok(_) => panic!("broken configuration was served"),
    }
}
