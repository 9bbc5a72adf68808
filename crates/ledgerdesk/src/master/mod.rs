//! Service-master lifecycle: promoting an uploaded spreadsheet to the
//! latest slot, archiving what it replaces, and rebuilding the table.

mod workbook;

use chrono::{DateTime, Utc};
use ledgerdesk_core::batch::BatchOutcome;
use ledgerdesk_core::blob::{blob_error_to_status_code, BlobError, BlobStore};
use ledgerdesk_core::service::{self, entries_from_rows};
use ledgerdesk_core::storage::{
    repository_error_to_status_code, RepositoryError, ServiceMasterRepository,
};
use serde::Serialize;
use thiserror::Error;

pub use workbook::parse_workbook;

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("Invalid master key: {0}")]
    InvalidKey(String),
    #[error("Invalid spreadsheet: {0}")]
    InvalidWorkbook(String),
    #[error(transparent)]
    Blob(#[from] BlobError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub fn apply_error_to_status_code(error: &ApplyError) -> u16 {
    match error {
        ApplyError::InvalidKey(_) | ApplyError::InvalidWorkbook(_) => 400,
        ApplyError::Blob(e) => blob_error_to_status_code(e),
        ApplyError::Repository(e) => repository_error_to_status_code(e),
    }
}

/// Result of applying an uploaded master file.
#[derive(Debug, Serialize)]
pub struct ApplyReport {
    /// Key the upload was promoted to under the latest prefix.
    pub applied_key: String,
    /// Number of service rows written after filtering.
    pub count: usize,
    /// Per-service outcome of the table rebuild.
    pub outcome: BatchOutcome,
}

/// Promotes an upload to the latest slot and archives whatever held it.
///
/// The copy happens first so the latest prefix is never empty mid-swap.
/// Returns the key the upload now lives under.
pub async fn promote_upload(
    blobs: &dyn BlobStore,
    key: &str,
    now: DateTime<Utc>,
) -> Result<String, ApplyError> {
    if !service::is_upload_key(key) {
        return Err(ApplyError::InvalidKey(key.to_string()));
    }

    let file = service::file_name(key);
    let latest_key = format!("{}{file}", service::LATEST_PREFIX);
    blobs.copy(key, &latest_key).await?;

    let stamp = now.format("%Y%m%dT%H%M%SZ");
    for object in blobs.list(service::LATEST_PREFIX).await? {
        if object.key == latest_key {
            continue;
        }
        let archived = format!(
            "{}{stamp}_{}",
            service::ARCHIVE_PREFIX,
            service::file_name(&object.key)
        );
        blobs.copy(&object.key, &archived).await?;
        blobs.delete(&object.key).await?;
        tracing::info!(from = %object.key, to = %archived, "archived previous master file");
    }

    Ok(latest_key)
}

/// Applies an uploaded master spreadsheet: promote, parse, rebuild the table.
///
/// Each step is idempotent per key, so a failed apply is recovered by
/// re-applying the same upload. There is no compensation for earlier steps.
pub async fn apply_master(
    blobs: &dyn BlobStore,
    services: &dyn ServiceMasterRepository,
    key: &str,
    now: DateTime<Utc>,
) -> Result<ApplyReport, ApplyError> {
    let applied_key = promote_upload(blobs, key, now).await?;

    let bytes = blobs.get(key).await?;
    let rows = parse_workbook(&bytes)?;
    let entries = entries_from_rows(rows, now);
    let count = entries.len();
    let outcome = services.replace_all(&entries).await?;

    tracing::info!(key, count, failed = outcome.failed.len(), "applied service master");
    Ok(ApplyReport { applied_key, count, outcome })
}
