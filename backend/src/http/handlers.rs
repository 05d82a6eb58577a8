//! HTTP handlers.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

use super::dto::{batch_calls, parse_input, split_paths, HealthResponse, RpcQuery};
use super::error::AppError;
use super::state::AppState;
use crate::api::{User, UserId};
use crate::rpc::{self, batch_status, Session};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_NAME_HEADER: &str = "x-user-name";
pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const USER_IMAGE_HEADER: &str = "x-user-image";

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match state.services.repo.health_check().await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "disconnected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database,
    })
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Session asserted by the auth proxy, if the request carries a user id.
pub fn session_from_headers(headers: &HeaderMap) -> Option<Session> {
    let id = header(headers, USER_ID_HEADER)?;
    Some(Session::new(User {
        id: UserId::new(id),
        name: header(headers, USER_NAME_HEADER),
        email: header(headers, USER_EMAIL_HEADER),
        image: header(headers, USER_IMAGE_HEADER),
    }))
}

async fn run(
    state: &AppState,
    headers: &HeaderMap,
    paths: &str,
    query: &RpcQuery,
    input: Value,
) -> Result<Response, AppError> {
    let paths = split_paths(paths);
    if paths.is_empty() {
        return Err(AppError::BadRequest("No procedure path given".to_string()));
    }

    let ctx = state.context(session_from_headers(headers));
    rpc::refresh_session_user(&ctx).await;

    if query.is_batch() {
        let calls = batch_calls(paths, input)?;
        let envelopes = rpc::call_batch(&ctx, calls).await;
        let status = StatusCode::from_u16(batch_status(&envelopes)).unwrap_or(StatusCode::OK);
        return Ok((status, Json(envelopes)).into_response());
    }

    if paths.len() > 1 {
        return Err(AppError::BadRequest(
            "Multiple procedures require batch=1".to_string(),
        ));
    }
    let envelope = rpc::call_procedure(&ctx, &paths[0], input).await;
    let status =
        StatusCode::from_u16(envelope.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    Ok((status, Json(envelope)).into_response())
}

/// POST /api/trpc/{paths}
pub async fn rpc_post(
    State(state): State<AppState>,
    Path(paths): Path<String>,
    Query(query): Query<RpcQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let input = parse_input(&body)?;
    run(&state, &headers, &paths, &query, input).await
}

/// GET /api/trpc/{paths}?input=...
pub async fn rpc_get(
    State(state): State<AppState>,
    Path(paths): Path<String>,
    Query(query): Query<RpcQuery>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let input = match &query.input {
        Some(raw) => parse_input(raw.as_bytes())?,
        None => Value::Null,
    };
    run(&state, &headers, &paths, &query, input).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_session_requires_user_id() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_NAME_HEADER, HeaderValue::from_static("Ada"));
        assert!(session_from_headers(&headers).is_none());

        headers.insert(USER_ID_HEADER, HeaderValue::from_static("u1"));
        headers.insert(USER_EMAIL_HEADER, HeaderValue::from_static(" "));
        let session = session_from_headers(&headers).unwrap();
        assert_eq!(session.user.id.as_str(), "u1");
        assert_eq!(session.user.name.as_deref(), Some("Ada"));
        assert_eq!(session.user.email, None);
    }
}
