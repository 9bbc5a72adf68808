use thiserror::Error;

/// Errors that can occur during blob-store operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BlobError {
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("Invalid key: {0}")]
    InvalidKey(String),
    #[error("Blob operation failed: {0}")]
    OperationFailed(String),
}

/// Result type for blob-store operations.
pub type Result<T> = std::result::Result<T, BlobError>;

/// Maps a [`BlobError`] to an HTTP status code.
pub fn blob_error_to_status_code(error: &BlobError) -> u16 {
    match error {
        BlobError::NotFound(_) => 404,
        BlobError::InvalidKey(_) => 400,
        BlobError::OperationFailed(_) => 500,
    }
}
