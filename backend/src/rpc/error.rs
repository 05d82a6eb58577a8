//! Procedure error codes and the error half of the wire envelope.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::routes::InputError;

/// Error codes a procedure can fail with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    InternalServerError,
    NotImplemented,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::InternalServerError => "INTERNAL_SERVER_ERROR",
            ErrorCode::NotImplemented => "NOT_IMPLEMENTED",
        }
    }

    /// HTTP status reported for this code. An unknown procedure is a 404.
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorCode::BadRequest => 400,
            ErrorCode::Unauthorized => 401,
            ErrorCode::Forbidden => 403,
            ErrorCode::NotFound | ErrorCode::NotImplemented => 404,
            ErrorCode::InternalServerError => 500,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed procedure call as seen by the caller.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{code}: {message}")]
pub struct ProcedureError {
    pub code: ErrorCode,
    pub message: String,
}

pub type ProcedureResult<T> = Result<T, ProcedureError>;

impl ProcedureError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(ErrorCode::Unauthorized, "UNAUTHORIZED")
    }

    pub fn not_implemented(path: &str) -> Self {
        Self::new(
            ErrorCode::NotImplemented,
            format!("No procedure found on path \"{}\"", path),
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalServerError, message)
    }
}

impl From<InputError> for ProcedureError {
    fn from(err: InputError) -> Self {
        ProcedureError::bad_request(err.message)
    }
}

impl From<serde_json::Error> for ProcedureError {
    fn from(err: serde_json::Error) -> Self {
        ProcedureError::bad_request(err.to_string())
    }
}

/// Serialized error body: `{"message", "code", "httpStatus", "path"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorShape {
    pub message: String,
    pub code: ErrorCode,
    pub http_status: u16,
    pub path: String,
}

impl ErrorShape {
    pub fn from_error(err: &ProcedureError, path: &str) -> Self {
        Self {
            message: err.message.clone(),
            code: err.code,
            http_status: err.code.http_status(),
            path: path.to_string(),
        }
    }

    pub fn into_error(self) -> ProcedureError {
        ProcedureError::new(self.code, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_shape_wire_form() {
        let err = ProcedureError::new(ErrorCode::NotFound, "Failed to get task");
        let value = serde_json::to_value(ErrorShape::from_error(&err, "task.getTask")).unwrap();
        assert_eq!(
            value,
            json!({
                "message": "Failed to get task",
                "code": "NOT_FOUND",
                "httpStatus": 404,
                "path": "task.getTask"
            })
        );
    }

    #[test]
    fn test_input_error_is_bad_request() {
        let err: ProcedureError = InputError {
            field: "projectName",
            message: "A project name is required".to_string(),
        }
        .into();
        assert_eq!(err.code, ErrorCode::BadRequest);
        assert_eq!(err.message, "A project name is required");
    }

    #[test]
    fn test_unknown_procedure_status() {
        assert_eq!(ErrorCode::NotImplemented.http_status(), 404);
        assert_eq!(ErrorCode::InternalServerError.as_str(), "INTERNAL_SERVER_ERROR");
    }
}
