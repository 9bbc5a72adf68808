use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Result;

/// Metadata of one stored object, as returned by prefix listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobObject {
    pub key: String,
    #[serde(rename = "lastModified")]
    pub last_modified: DateTime<Utc>,
    pub size: u64,
}

/// Path-addressed blob storage.
///
/// Records reference blobs by stored key; blob content is never embedded in
/// table items.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Lists objects under `prefix`, newest first.
    async fn list(&self, prefix: &str) -> Result<Vec<BlobObject>>;

    /// Reads the full content of `key`.
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Copies `src` to `dst` within the store.
    async fn copy(&self, src: &str, dst: &str) -> Result<()>;

    /// Deletes `key`. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Issues a time-limited download URL for `key`.
    async fn presign_get(&self, key: &str, ttl: Duration) -> Result<String>;
}
