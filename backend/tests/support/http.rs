use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use buildtrack::http::{create_router, AppState};
use buildtrack::rpc::Services;

pub fn router(services: Services) -> Router {
    create_router(AppState::new(services))
}

/// POST `body` to `/api/trpc/{paths}` as `user` (no session when `None`).
pub fn post(paths: &str, batch: bool, user: Option<&str>, body: &Value) -> Request<Body> {
    let uri = if batch {
        format!("/api/trpc/{}?batch=1", paths)
    } else {
        format!("/api/trpc/{}", paths)
    };
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(user) = user {
        builder = builder
            .header("x-user-id", user)
            .header("x-user-name", format!("User {}", user))
            .header("x-user-email", format!("{}@example.test", user));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// GET `/api/trpc/{path}` with `input` in the query string.
pub fn get(path: &str, user: &str, input: &Value) -> Request<Body> {
    let url = reqwest::Url::parse_with_params(
        &format!("http://localhost/api/trpc/{}", path),
        &[("input", input.to_string())],
    )
    .unwrap();
    Request::builder()
        .method("GET")
        .uri(format!("{}?{}", url.path(), url.query().unwrap_or_default()))
        .header("x-user-id", user)
        .body(Body::empty())
        .unwrap()
}

pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

/// `result.data` of a single-call response.
pub fn data(body: &Value) -> &Value {
    &body["result"]["data"]
}
