//! Transport-level failures, before any procedure runs.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::rpc::{Envelope, ErrorCode, ProcedureError};

#[derive(Debug)]
pub enum AppError {
    /// Malformed request: bad JSON, bad batch object, no procedure path.
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::BadRequest(msg) => {
                tracing::debug!(error = %msg, "rejected rpc request");
                let envelope =
                    Envelope::from(("", ProcedureError::new(ErrorCode::BadRequest, msg)));
                (StatusCode::BAD_REQUEST, Json(envelope)).into_response()
            }
        }
    }
}
