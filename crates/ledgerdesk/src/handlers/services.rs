//! Service-master handlers: listing, spreadsheet lifecycle, downloads.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use ledgerdesk_core::blob::{BlobError, BlobObject};
use ledgerdesk_core::service::{self, ServiceSummary};

use crate::{
    handlers::AppError,
    master::{apply_error_to_status_code, apply_master},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct MasterKeyQuery {
    pub key: String,
}

/// Request body for applying an uploaded spreadsheet.
#[derive(Debug, Deserialize)]
pub struct ApplyMaster {
    pub key: String,
}

/// Current service-master rows, display fields only (GET /services).
pub async fn list_services(
    State(state): State<AppState>,
) -> Result<Json<Vec<ServiceSummary>>, AppError> {
    let entries = state.services.list().await?;
    Ok(Json(entries.into_iter().map(ServiceSummary::from).collect()))
}

/// Blob listings go out as `{ "files": [...] }`, the shape existing
/// consumers of these endpoints already parse.
#[derive(Debug, Serialize)]
pub struct FileListing {
    pub files: Vec<BlobObject>,
}

/// Uploaded spreadsheets not yet applied, newest first
/// (GET /services/master/uploads).
pub async fn list_master_uploads(
    State(state): State<AppState>,
) -> Result<Json<FileListing>, AppError> {
    let files = state.blobs.list(service::UPLOADS_PREFIX).await?;
    Ok(Json(FileListing { files }))
}

/// The currently applied spreadsheet (GET /services/master/latest).
pub async fn list_master_latest(
    State(state): State<AppState>,
) -> Result<Json<FileListing>, AppError> {
    let files = state.blobs.list(service::LATEST_PREFIX).await?;
    Ok(Json(FileListing { files }))
}

/// Presigned download URL for a master file (GET /services/master?key=).
///
/// The key must live inside the service-master key space; anything else is
/// rejected before touching the blob store.
pub async fn presign_master(
    State(state): State<AppState>,
    Query(query): Query<MasterKeyQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !service::is_master_key(&query.key) {
        return Err(BlobError::InvalidKey(query.key).into());
    }

    let url = state
        .blobs
        .presign_get(&query.key, state.config.presign_ttl())
        .await?;
    Ok(Json(serde_json::json!({ "url": url })))
}

/// Apply an uploaded spreadsheet as the new service master
/// (POST /services/master).
///
/// 200 when the table rebuild is complete, 207 when some rows failed; the
/// apply report carries the per-row outcome either way.
pub async fn apply_master_upload(
    State(state): State<AppState>,
    Json(body): Json<ApplyMaster>,
) -> Response {
    match apply_master(
        state.blobs.as_ref(),
        state.services.as_ref(),
        &body.key,
        Utc::now(),
    )
    .await
    {
        Ok(report) => {
            let status = if report.outcome.is_complete() {
                StatusCode::OK
            } else {
                StatusCode::MULTI_STATUS
            };
            (status, Json(report)).into_response()
        }
        Err(err) => {
            let status = StatusCode::from_u16(apply_error_to_status_code(&err))
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            if status.is_server_error() {
                tracing::error!(key = %body.key, error = %err, "master apply failed");
            } else {
                tracing::warn!(key = %body.key, error = %err, "master apply rejected");
            }
            (status, Json(serde_json::json!({ "error": err.to_string() }))).into_response()
        }
    }
}
