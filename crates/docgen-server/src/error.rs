//! Error types for the HTTP surface.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use docgen_core::EngineError;
use serde::Serialize;

use crate::store::RecordError;

/// Application-level errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("No template configured for {0}; pass template_id")]
    NoTemplate(&'static str),

    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] JsonRejection),

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Document {document_id} was generated but not recorded: {source}")]
    Record {
        document_id: String,
        #[source]
        source: RecordError,
    },
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Engine(e) => match e {
                EngineError::Resolution(_) => (StatusCode::BAD_REQUEST, "INVALID_PAYLOAD"),
                EngineError::Copy { .. } => (StatusCode::BAD_GATEWAY, "COPY_FAILED"),
                EngineError::Fetch { .. } => (StatusCode::BAD_GATEWAY, "FETCH_FAILED"),
                EngineError::Commit { .. } => (StatusCode::BAD_GATEWAY, "COMMIT_REJECTED"),
                EngineError::RichContent { .. } => {
                    (StatusCode::BAD_GATEWAY, "RICH_CONTENT_REJECTED")
                }
            },
            ApiError::NoTemplate(_) => (StatusCode::BAD_REQUEST, "NO_TEMPLATE"),
            ApiError::InvalidJson(_) => (StatusCode::BAD_REQUEST, "INVALID_JSON"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Record { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    /// Copied document left behind by a failed request.
    fn document_id(&self) -> Option<&str> {
        match self {
            ApiError::Engine(e) => e.document_id(),
            ApiError::Record { document_id, .. } => Some(document_id),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorBody<'a> {
            error: String,
            code: &'static str,
            #[serde(skip_serializing_if = "Option::is_none")]
            document_id: Option<&'a str>,
        }

        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(code, "{}", self);
        }

        let body = ErrorBody {
            error: self.to_string(),
            code,
            document_id: self.document_id(),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
