//! Health check endpoint for Kubernetes-style probes.

use axum::http::StatusCode;

/// GET /livez - Basic liveness probe.
///
/// Returns 200 immediately. Used to check if the server is accepting
/// connections; no backend calls are made.
#[axum::debug_handler]
pub async fn livez() -> StatusCode {
    StatusCode::OK
}
