mod error;
mod traits;

pub use error::{blob_error_to_status_code, BlobError, Result};
pub use traits::{BlobObject, BlobStore};
