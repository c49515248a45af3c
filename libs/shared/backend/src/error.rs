use reqwest::StatusCode;
use thiserror::Error;

use shared_models::error::AppError;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Request to clinic backend failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Clinic backend returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// The backend answered `{"success": false, "message": ...}`.
    #[error("{0}")]
    Rejected(String),

    #[error("Unexpected response from clinic backend: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid header value for {0}")]
    InvalidHeader(&'static str),
}

impl BackendError {
    /// Server-provided message suitable for a toast, if there is one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            BackendError::Rejected(message) => Some(message),
            _ => None,
        }
    }
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Rejected(message) => AppError::Rejected(message),
            BackendError::Status { status, body } if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN => {
                AppError::Auth(if body.is_empty() { "Not authorized".to_string() } else { body })
            }
            other => AppError::ExternalService(other.to_string()),
        }
    }
}
