//! The wrapper every procedure body runs through.
//!
//! A procedure body returns [`ServiceError`] for anything that goes wrong.
//! [`try_catch`] logs the underlying error and hands the caller a
//! [`ProcedureError`] carrying the procedure's fixed, user-facing messages
//! instead of the internal error text.

use std::future::Future;
use thiserror::Error;

use super::extraction::ExtractionError;
use super::storage::StorageError;
use crate::api::ProjectId;
use crate::db::RepositoryError;
use crate::routes::InputError;
use crate::rpc::error::{ErrorCode, ProcedureError, ProcedureResult};

/// Message added to storage procedures when the caller is not on the project.
pub const NO_PERMISSION_MESSAGE: &str = "You do not have permission to this project";

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid input: {0}")]
    Invalid(#[from] InputError),

    #[error("user is not a member of project {0}")]
    NotMember(ProjectId),

    #[error("user is not the creator of project {0}")]
    NotCreator(ProjectId),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    /// Wire code of the error: missing rows are `NOT_FOUND`, denied access
    /// is `UNAUTHORIZED`, rejected input is `BAD_REQUEST`.
    pub fn code(&self) -> ErrorCode {
        match self {
            ServiceError::Repository(err) => match err {
                RepositoryError::NotFound { .. } => ErrorCode::NotFound,
                RepositoryError::PermissionDenied { .. } => ErrorCode::Unauthorized,
                RepositoryError::ValidationError { .. } => ErrorCode::BadRequest,
                _ => ErrorCode::InternalServerError,
            },
            ServiceError::Storage(err) => match err {
                StorageError::OutsideProject { .. } => ErrorCode::Unauthorized,
                err if err.is_not_found() => ErrorCode::NotFound,
                _ => ErrorCode::InternalServerError,
            },
            ServiceError::Extraction(ExtractionError::EmptyText) => ErrorCode::BadRequest,
            ServiceError::Extraction(_) | ServiceError::Csv(_) => ErrorCode::InternalServerError,
            ServiceError::Invalid(_) => ErrorCode::BadRequest,
            ServiceError::NotMember(_) | ServiceError::NotCreator(_) => ErrorCode::Unauthorized,
        }
    }
}

/// Join the procedure's messages into the text shown to the user.
pub fn error_message(messages: &[&str]) -> String {
    messages.join(". ")
}

/// Run `work`, replacing any error with the procedure's `messages`.
pub async fn try_catch<T, F>(messages: &[&str], work: F) -> ProcedureResult<T>
where
    F: Future<Output = ServiceResult<T>>,
{
    match work.await {
        Ok(value) => Ok(value),
        Err(err) => {
            let code = err.code();
            tracing::error!(error = %err, code = %code, "{}", error_message(messages));
            Err(ProcedureError::new(code, error_message(messages)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_success_passes_through() {
        let value = try_catch(&["Failed to get task"], async { Ok::<_, ServiceError>(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_messages_are_joined() {
        let err = try_catch::<(), _>(
            &["Failed to delete S3 object", NO_PERMISSION_MESSAGE],
            async { Err(ServiceError::NotMember(ProjectId::new("p1"))) },
        )
        .await
        .unwrap_err();
        assert_eq!(
            err.message,
            "Failed to delete S3 object. You do not have permission to this project"
        );
        assert_eq!(err.code, ErrorCode::Unauthorized);
    }

    #[tokio::test]
    async fn test_internal_text_is_hidden() {
        let err = try_catch::<(), _>(&["Failed to create task"], async {
            Err(RepositoryError::connection("pool timed out after 30s").into())
        })
        .await
        .unwrap_err();
        assert_eq!(err.message, "Failed to create task");
        assert_eq!(err.code, ErrorCode::InternalServerError);
    }

    #[test]
    fn test_error_codes() {
        let not_found: ServiceError = RepositoryError::entity_not_found("task", "t1").into();
        assert_eq!(not_found.code(), ErrorCode::NotFound);
        let invalid: ServiceError = RepositoryError::validation("duplicate").into();
        assert_eq!(invalid.code(), ErrorCode::BadRequest);
        let denied: ServiceError = RepositoryError::permission_denied("nope").into();
        assert_eq!(denied.code(), ErrorCode::Unauthorized);
        let outside: ServiceError = StorageError::OutsideProject {
            project_id: "p1".to_string(),
            key: "p2/x".to_string(),
        }
        .into();
        assert_eq!(outside.code(), ErrorCode::Unauthorized);
    }
}
