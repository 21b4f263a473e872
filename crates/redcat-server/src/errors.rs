//! HTTP error mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use redcat_embeddings::EmbeddingError;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Errors returned by request handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The embedding pipeline failed.
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
}

impl ApiError {
    /// Status code for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Embedding(EmbeddingError::Tokenization(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Embedding(EmbeddingError::DimensionMismatch { .. }) => StatusCode::BAD_REQUEST,
            Self::Embedding(EmbeddingError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            Self::Embedding(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Embedding(e) => e.kind(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        if status.is_server_error() {
            error!(status = status.as_u16(), kind = self.kind(), error = %message, "request failed");
        } else {
            warn!(status = status.as_u16(), kind = self.kind(), error = %message, "request rejected");
        }
        (status, Json(json!({ "error": message, "kind": self.kind() }))).into_response()
    }
}
