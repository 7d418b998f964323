use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lectern_pipeline::PipelineError;
use tracing::error;

/// JSON error body for every non-2xx response: `{"error": code, "message": text}`.
pub fn error_response(status: StatusCode, code: &str, message: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[derive(Debug)]
pub struct ApiError(PipelineError);

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self.0 {
            PipelineError::NotFound(_) => {
                error_response(StatusCode::NOT_FOUND, "not_found", self.0.to_string())
            }
            PipelineError::NotReady(_) => error_response(
                StatusCode::NOT_FOUND,
                "not_ready",
                "document not found or not ready",
            ),
            PipelineError::EmptyInput(_) => {
                error_response(StatusCode::BAD_REQUEST, "invalid_request", self.0.to_string())
            }
            PipelineError::Generation(_) => {
                error_response(StatusCode::BAD_GATEWAY, "generation_failed", self.0.to_string())
            }
            PipelineError::Storage(err) => {
                error!(error = %format!("{err:#}"), "storage failure");
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal",
                    "internal storage error",
                )
            }
        }
    }
}
