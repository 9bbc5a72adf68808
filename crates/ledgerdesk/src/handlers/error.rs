use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ledgerdesk_core::blob::{blob_error_to_status_code, BlobError};
use ledgerdesk_core::storage::{repository_error_to_status_code, RepositoryError};

/// Application error that wraps `anyhow::Error`.
///
/// Lets handlers use `?` on anything convertible to `anyhow::Error`; the
/// response status is recovered by downcasting to the domain error types.
/// Bodies are JSON `{ "error": <message> }`.
pub struct AppError(pub anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status_code = if let Some(repo_error) = self.0.downcast_ref::<RepositoryError>() {
            repository_error_to_status_code(repo_error)
        } else if let Some(blob_error) = self.0.downcast_ref::<BlobError>() {
            blob_error_to_status_code(blob_error)
        } else {
            500
        };
        let status =
            StatusCode::from_u16(status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::warn!(error = %self.0, status = %status, "request rejected");
        }

        (
            status,
            Json(serde_json::json!({ "error": self.0.to_string() })),
        )
            .into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
