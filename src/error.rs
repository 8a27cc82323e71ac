//! Error types for the Docserve HTTP surface

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::document::DocumentError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Document(#[from] DocumentError),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) | AppError::Document(DocumentError::NotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            AppError::BadRequest(_) | AppError::Document(DocumentError::InvalidInput(_)) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error_type, message) = match &self {
            AppError::NotFound(msg) => ("not_found", msg.clone()),
            AppError::BadRequest(msg) => ("bad_request", msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ("internal_error", "An internal error occurred".to_string())
            }
            AppError::Document(e) => match e {
                DocumentError::NotFound(msg) => ("not_found", msg.clone()),
                DocumentError::InvalidInput(msg) => ("bad_request", msg.clone()),
                DocumentError::ExternalTool(msg) => {
                    tracing::error!("External tool error: {}", msg);
                    ("tool_error", "Document processing failed".to_string())
                }
                DocumentError::Io(msg) => {
                    tracing::error!("IO error: {}", msg);
                    ("io_error", "IO error".to_string())
                }
                DocumentError::Internal(msg) => {
                    tracing::error!("Internal error: {}", msg);
                    ("internal_error", "An internal error occurred".to_string())
                }
            },
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
            details: if cfg!(debug_assertions) {
                Some(self.to_string())
            } else {
                None
            },
        });

        (status, body).into_response()
    }
}
