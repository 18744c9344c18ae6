use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use fin_verify_core::VerifyError;
use serde_json::json;

/// Handler error: wraps [`VerifyError`] and renders `{"error", "kind"}`.
///
/// Provider and storage detail goes to the log only; the body carries the
/// public message.
#[derive(Debug)]
pub struct AppError(pub VerifyError);

impl From<VerifyError> for AppError {
    fn from(err: VerifyError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status =
            StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        match &err {
            VerifyError::Persistence(_) | VerifyError::Internal(_) => {
                tracing::error!(kind = err.kind(), error = %err, "request failed");
            }
            VerifyError::Transport(_) | VerifyError::Upstream { .. } => {
                tracing::warn!(kind = err.kind(), error = %err, "provider call failed");
            }
            _ => tracing::debug!(kind = err.kind(), error = %err, "request rejected"),
        }

        let body = json!({
            "error": err.public_message(),
            "kind": err.kind(),
        });
        (status, Json(body)).into_response()
    }
}
