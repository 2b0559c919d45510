use std::sync::Arc;

use axum::{
    extract::{Request as HttpRequest, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response as HttpResponse},
    Router,
};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::request::IncomingRequest;
use super::router::RouteTable;
use crate::resource::{Resource, Response};
use crate::schema::{TypeCheck, TypeValidator};

const LOG_BODY_LIMIT: usize = 200;

/// Everything one listener serves: built once per configuration load and
/// never mutated.
pub struct Generation {
    pub routes: RouteTable,
    pub validator: Option<Arc<dyn TypeValidator>>,
    pub base_url: String,
}

impl Generation {
    pub fn new(
        resources: Vec<Resource>,
        validator: Option<Arc<dyn TypeValidator>>,
        base_url: impl Into<String>,
    ) -> Self {
        Generation {
            routes: RouteTable::build(resources),
            validator,
            base_url: base_url.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReplyError {
    #[error("invalid status code {0}")]
    Status(u16),

    #[error("invalid header name {name:?}: {source}")]
    HeaderName {
        name: String,
        #[source]
        source: axum::http::header::InvalidHeaderName,
    },

    #[error("invalid value for header {name}: {source}")]
    HeaderValue {
        name: String,
        #[source]
        source: axum::http::header::InvalidHeaderValue,
    },

    #[error("could not serialize body: {0}")]
    Body(#[from] serde_json::Error),
}

/// Status or message recorded by a route that declined a request, used by
/// the catch-all in place of the plain 404.
#[derive(Debug, Default)]
struct Fallthrough {
    recorded: Option<(StatusCode, String)>,
}

impl Fallthrough {
    fn record(&mut self, status: StatusCode, message: String) {
        self.recorded = Some((status, message));
    }
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

impl IntoResponse for Reply {
    fn into_response(self) -> HttpResponse {
        (self.status, self.headers, self.body).into_response()
    }
}

pub fn router(generation: Arc<Generation>) -> Router {
    Router::new().fallback(dispatch).with_state(generation)
}

pub fn not_found_message(base_url: &str) -> String {
    format!(
        "NCDC ERROR: Could not find an endpoint to serve this request.\n\n\
         Go to {base_url} to see a list of available endpoints."
    )
}

async fn dispatch(
    State(generation): State<Arc<Generation>>,
    request: HttpRequest,
) -> HttpResponse {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let incoming = match IncomingRequest::read(request).await {
        Ok(incoming) => incoming,
        Err(e) => {
            error!(method = %method, uri = %uri, error = %e, "could not read request");
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    };

    if incoming.method == Method::GET && incoming.path == "/" {
        return root_listing(&generation);
    }

    let mut fallthrough = Fallthrough::default();
    for resource in generation.routes.candidates(&incoming.method, &incoming.path) {
        let validator = generation.validator.as_ref();
        if !request_matches(resource, &incoming, validator, &mut fallthrough).await {
            continue;
        }

        return match build_reply(resource.response()) {
            Ok(reply) => {
                log_exchange(&incoming, Some(resource.name()), reply.status, &reply.body);
                reply.into_response()
            }
            Err(e) => {
                error!(
                    resource = resource.name(),
                    method = %incoming.method,
                    path = %incoming.path,
                    query = incoming.raw_query.as_deref().unwrap_or(""),
                    headers = ?incoming.headers,
                    body = %truncate(&incoming.body_text(), LOG_BODY_LIMIT),
                    error = %e,
                    "could not build response"
                );
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
            }
        };
    }

    let (status, message) = fallthrough
        .recorded
        .unwrap_or_else(|| (StatusCode::NOT_FOUND, not_found_message(&generation.base_url)));
    log_exchange(&incoming, None, status, &message);
    (status, message).into_response()
}

/// Headers, then query, then either the declared type or the configured
/// body. The first failing step rejects the request for this resource.
async fn request_matches(
    resource: &Resource,
    incoming: &IncomingRequest,
    validator: Option<&Arc<dyn TypeValidator>>,
    fallthrough: &mut Fallthrough,
) -> bool {
    let request = resource.request();
    let name = resource.name();

    if !request.headers().matches(&incoming.headers) {
        debug!(resource = name, "headers did not match");
        return false;
    }

    if !request.query().matches(&incoming.query) {
        debug!(resource = name, "query did not match");
        return false;
    }

    if let (Some(type_name), Some(validator)) = (request.type_name(), validator) {
        return match check_type(validator, incoming.body_or_null(), type_name).await {
            Ok(check) if check.success() => true,
            Ok(check) => {
                debug!(resource = name, errors = ?check.errors, "body did not match the type");
                false
            }
            Err(message) => {
                warn!(resource = name, error = %message, "could not validate request body");
                fallthrough.record(StatusCode::INTERNAL_SERVER_ERROR, message);
                false
            }
        };
    }

    if let Some(expected) = request.body() {
        let matched = incoming
            .body
            .as_ref()
            .map(|received| expected.matches(received))
            .unwrap_or(false);
        if !matched {
            debug!(resource = name, "body did not match");
            return false;
        }
    }

    true
}

/// Schema lookups may hit the disk, so checks run on the blocking pool.
async fn check_type(
    validator: &Arc<dyn TypeValidator>,
    body: Value,
    type_name: &str,
) -> Result<TypeCheck, String> {
    let validator = Arc::clone(validator);
    let type_name = type_name.to_string();
    match tokio::task::spawn_blocking(move || validator.validate(&body, &type_name)).await {
        Ok(result) => result.map_err(|e| e.to_string()),
        Err(e) => Err(format!("type validation task failed: {e}")),
    }
}

fn build_reply(response: &Response) -> Result<Reply, ReplyError> {
    let status =
        StatusCode::from_u16(response.code()).map_err(|_| ReplyError::Status(response.code()))?;

    let mut headers = HeaderMap::new();
    for (name, value) in response.headers().iter() {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|source| ReplyError::HeaderName {
                name: name.to_string(),
                source,
            })?;
        let header_value =
            HeaderValue::from_str(value).map_err(|source| ReplyError::HeaderValue {
                name: name.to_string(),
                source,
            })?;
        headers.append(header_name, header_value);
    }

    let body = match response.body() {
        Some(body) => {
            if !headers.contains_key(header::CONTENT_TYPE) {
                let default_type = match body.data() {
                    Value::String(_) => "text/plain; charset=utf-8",
                    _ => "application/json",
                };
                headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(default_type));
            }
            body.to_wire()?
        }
        None => String::new(),
    };

    Ok(Reply {
        status,
        headers,
        body,
    })
}

fn root_listing(generation: &Generation) -> HttpResponse {
    let summaries: Vec<_> = generation.routes.resources().map(Resource::summary).collect();
    axum::Json(summaries).into_response()
}

fn log_exchange(incoming: &IncomingRequest, resource: Option<&str>, status: StatusCode, body: &str) {
    info!(
        resource = resource.unwrap_or("-"),
        method = %incoming.method,
        path = %incoming.path,
        query = incoming.raw_query.as_deref().unwrap_or(""),
        request_body = %truncate(&incoming.body_text(), LOG_BODY_LIMIT),
        status = status.as_u16(),
        response_body = %truncate(body, LOG_BODY_LIMIT),
        "{} {}",
        incoming.method,
        incoming.path
    );
}

fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Body, Headers, HttpMethod, Request};
    use crate::schema::{FsSchemaProvider, JsonSchemaValidator};
    use axum::body::Body as HttpBody;
    use http_body_util::BodyExt;
    use serde_json::json;
    use tower::ServiceExt;

    const BASE: &str = "http://localhost:4000";

    fn resource(
        name: &str,
        method: HttpMethod,
        endpoint: &str,
        request: impl FnOnce(Headers) -> (Headers, Option<String>, Option<Body>),
        response: Response,
    ) -> Resource {
        let (headers, type_name, body) = request(Headers::default());
        Resource::new(
            name,
            Request::new(method, endpoint, headers, type_name, body).unwrap(),
            response,
        )
    }

    fn plain(code: u16, body: Value) -> Response {
        Response::new(code, Some(Body::new(body, None)), None, Headers::default())
    }

    fn app(resources: Vec<Resource>, validator: Option<Arc<dyn TypeValidator>>) -> Router {
        router(Arc::new(Generation::new(resources, validator, BASE)))
    }

    async fn send(app: Router, request: HttpRequest) -> (StatusCode, HeaderMap, String) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn get(uri: &str) -> HttpRequest {
        HttpRequest::builder().uri(uri).body(HttpBody::empty()).unwrap()
    }

    #[tokio::test]
    async fn serves_matching_resource() {
        let books = resource(
            "Books",
            HttpMethod::Get,
            "/api/books/*",
            |h| (h, None, None),
            plain(200, json!({ "ISBN": "123" })),
        );

        let (status, headers, body) = send(app(vec![books.clone()], None), get("/api/books/42")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        assert_eq!(serde_json::from_str::<Value>(&body).unwrap(), json!({ "ISBN": "123" }));

        let post = HttpRequest::builder()
            .method("POST")
            .uri("/api/books/42")
            .body(HttpBody::empty())
            .unwrap();
        let (status, _, body) = send(app(vec![books], None), post).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, not_found_message(BASE));
    }

    #[tokio::test]
    async fn head_requests_reach_get_resources() {
        let books = resource(
            "Books",
            HttpMethod::Get,
            "/api/books",
            |h| (h, None, None),
            plain(200, json!({ "ISBN": "123" })),
        );
        let head = HttpRequest::builder()
            .method("HEAD")
            .uri("/api/books")
            .body(HttpBody::empty())
            .unwrap();

        let (status, headers, _) = send(app(vec![books], None), head).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    }

    #[tokio::test]
    async fn falls_through_to_the_next_matching_resource() {
        let with_header = resource(
            "Secret",
            HttpMethod::Get,
            "/api/books",
            |_| (Headers::new([("x-api-key", "k")]), None, None),
            plain(200, json!("secret")),
        );
        let with_query = resource(
            "Query",
            HttpMethod::Get,
            "/api/books?author=*",
            |h| (h, None, None),
            plain(200, json!("by author")),
        );
        let fallback = resource(
            "All",
            HttpMethod::Get,
            "/api/books",
            |h| (h, None, None),
            plain(200, json!("all")),
        );
        let resources = vec![with_header, with_query, fallback];

        let (_, _, body) = send(app(resources.clone(), None), get("/api/books?author=x")).await;
        assert_eq!(body, "by author");

        let keyed = HttpRequest::builder()
            .uri("/api/books")
            .header("X-API-KEY", "k")
            .body(HttpBody::empty())
            .unwrap();
        let (_, _, body) = send(app(resources.clone(), None), keyed).await;
        assert_eq!(body, "secret");

        let (_, headers, body) = send(app(resources, None), get("/api/books")).await;
        assert_eq!(body, "all");
        assert_eq!(headers[header::CONTENT_TYPE], "text/plain; charset=utf-8");
    }

    #[tokio::test]
    async fn matches_request_bodies() {
        let create = resource(
            "Create",
            HttpMethod::Post,
            "/api/books",
            |h| (h, None, Some(Body::new(json!({ "title": "Dune" }), None))),
            plain(201, json!({ "id": 1 })),
        );

        let request = |body: &'static str| {
            HttpRequest::builder()
                .method("POST")
                .uri("/api/books")
                .header("content-type", "application/json")
                .body(HttpBody::from(body))
                .unwrap()
        };

        let (status, _, _) = send(app(vec![create.clone()], None), request(r#"{"title":"Dune"}"#)).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _, _) = send(app(vec![create], None), request(r#"{"title":"Emma"}"#)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn typed_requests_use_the_validator() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("NewBook.json"),
            r#"{"type":"object","required":["title"]}"#,
        )
        .unwrap();
        let validator: Arc<dyn TypeValidator> = Arc::new(JsonSchemaValidator::new(
            FsSchemaProvider::new(Some(tmp.path().to_path_buf())),
        ));

        let typed = resource(
            "Create",
            HttpMethod::Post,
            "/api/books",
            |h| (h, Some("NewBook".to_string()), Some(Body::new(json!("ignored"), None))),
            plain(201, json!("created")),
        );
        let broken = resource(
            "Broken",
            HttpMethod::Post,
            "/api/authors",
            |h| (h, Some("Missing".to_string()), None),
            plain(201, json!("never")),
        );
        let resources = vec![typed, broken];

        let post = |uri: &str, body: &'static str| {
            HttpRequest::builder()
                .method("POST")
                .uri(uri)
                .body(HttpBody::from(body))
                .unwrap()
        };

        let (status, _, _) = send(
            app(resources.clone(), Some(validator.clone())),
            post("/api/books", r#"{"title":"Dune"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _, _) = send(
            app(resources.clone(), Some(validator.clone())),
            post("/api/books", r#"{"author":"Herbert"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _, body) = send(
            app(resources, Some(validator)),
            post("/api/authors", "{}"),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("Missing"));
    }

    struct ThreadRecorder {
        threads: std::sync::Mutex<Vec<std::thread::ThreadId>>,
    }

    impl TypeValidator for ThreadRecorder {
        fn validate(&self, _: &Value, _: &str) -> Result<TypeCheck, crate::schema::SchemaError> {
            self.threads.lock().unwrap().push(std::thread::current().id());
            Ok(TypeCheck::default())
        }
    }

    #[tokio::test]
    async fn type_checks_run_off_the_request_thread() {
        let recorder = Arc::new(ThreadRecorder {
            threads: std::sync::Mutex::new(Vec::new()),
        });
        let typed = resource(
            "Create",
            HttpMethod::Post,
            "/api/books",
            |h| (h, Some("NewBook".to_string()), None),
            plain(201, json!("created")),
        );
        let post = HttpRequest::builder()
            .method("POST")
            .uri("/api/books")
            .body(HttpBody::from("{}"))
            .unwrap();

        let validator: Arc<dyn TypeValidator> = recorder.clone();
        let (status, _, _) = send(app(vec![typed], Some(validator)), post).await;
        assert_eq!(status, StatusCode::CREATED);

        let threads = recorder.threads.lock().unwrap();
        assert_eq!(threads.len(), 1);
        assert_ne!(threads[0], std::thread::current().id());
    }

    #[tokio::test]
    async fn broken_response_headers_answer_500() {
        let broken = resource(
            "Broken",
            HttpMethod::Get,
            "/broken",
            |h| (h, None, None),
            Response::new(200, None, None, Headers::new([("bad header", "x")])),
        );

        let (status, _, body) = send(app(vec![broken], None), get("/broken")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("invalid header name"));
    }

    #[tokio::test]
    async fn root_lists_resources() {
        let books = resource(
            "Books",
            HttpMethod::Get,
            "/api/books",
            |h| (h, None, None),
            plain(200, json!([])),
        );
        let (status, _, body) = send(app(vec![books], None), get("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            serde_json::from_str::<Value>(&body).unwrap(),
            json!([{ "name": "Books", "method": "GET", "endpoint": "/api/books", "code": 200 }])
        );
    }

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ééééé", 2), "éé...");
    }
}
