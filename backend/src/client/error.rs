//! Client-side failures.

use thiserror::Error;

use crate::rpc::ProcedureError;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The server ran the procedure and it failed.
    #[error(transparent)]
    Procedure(#[from] ProcedureError),

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected response status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Response did not match the request batch")]
    BatchMismatch,

    /// The query was cancelled while its fetch was in flight.
    #[error("Query was cancelled")]
    Cancelled,
}

pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    /// Text shown to the user. Procedure failures show the server message.
    pub fn message(&self) -> String {
        match self {
            ClientError::Procedure(err) => err.message.clone(),
            other => other.to_string(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ClientError::Cancelled)
    }
}
