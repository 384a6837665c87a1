//! API error types and response formatting.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// API error type that converts to appropriate HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A pipeline run failed.
    #[error("pipeline error: {0}")]
    Pipeline(#[from] gazette_ingest::Error),
}

/// JSON error response body.
#[derive(Debug, Clone, Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            Self::Pipeline(err @ gazette_ingest::Error::Config(_)) => {
                tracing::error!(error = %err, "configuration error");
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            Self::Pipeline(err) => {
                tracing::error!(error = %err, "pipeline run failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to process RSS feeds.".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse { error })).into_response()
    }
}
