pub mod error;
pub mod health;
pub mod inquiries;
pub mod ledgers;
pub mod services;

pub use error::AppError;

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};

/// 403 response for privileged routes; nothing is written before this check.
pub(crate) fn forbidden() -> Response {
    tracing::warn!("non-admin caller on privileged route");
    (
        StatusCode::FORBIDDEN,
        Json(serde_json::json!({ "error": "admin privileges required" })),
    )
        .into_response()
}
