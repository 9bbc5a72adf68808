//! In-memory blob store (for testing and local development).

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use ledgerdesk_core::blob::{BlobError, BlobObject, BlobStore, Result};

#[derive(Debug, Clone)]
struct StoredBlob {
    data: Vec<u8>,
    last_modified: DateTime<Utc>,
}

/// In-memory blob store backed by a key-sorted map.
///
/// Presigned URLs are fake but stable (`memblob://<key>?expires=<secs>`),
/// which is enough for handlers and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBlobStore {
    blobs: Arc<RwLock<BTreeMap<String, StoredBlob>>>,
}

impl InMemoryBlobStore {
    /// Creates a new empty blob store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a blob directly; used to seed uploads in tests.
    pub async fn put(&self, key: impl Into<String>, data: Vec<u8>) {
        self.put_at(key, data, Utc::now()).await;
    }

    /// Writes a blob with an explicit modification time.
    pub async fn put_at(&self, key: impl Into<String>, data: Vec<u8>, at: DateTime<Utc>) {
        self.blobs.write().await.insert(
            key.into(),
            StoredBlob {
                data,
                last_modified: at,
            },
        );
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn list(&self, prefix: &str) -> Result<Vec<BlobObject>> {
        let blobs = self.blobs.read().await;
        let mut objects: Vec<BlobObject> = blobs
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, blob)| BlobObject {
                key: key.clone(),
                last_modified: blob.last_modified,
                size: blob.data.len() as u64,
            })
            .collect();

        objects.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
        Ok(objects)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let blobs = self.blobs.read().await;
        blobs
            .get(key)
            .map(|blob| blob.data.clone())
            .ok_or_else(|| BlobError::NotFound(key.to_string()))
    }

    async fn copy(&self, src: &str, dst: &str) -> Result<()> {
        let mut blobs = self.blobs.write().await;
        let blob = blobs
            .get(src)
            .cloned()
            .ok_or_else(|| BlobError::NotFound(src.to_string()))?;
        blobs.insert(
            dst.to_string(),
            StoredBlob {
                data: blob.data,
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.blobs.write().await.remove(key);
        Ok(())
    }

    async fn presign_get(&self, key: &str, ttl: Duration) -> Result<String> {
        let blobs = self.blobs.read().await;
        if !blobs.contains_key(key) {
            return Err(BlobError::NotFound(key.to_string()));
        }
        Ok(format!("memblob://{key}?expires={}", ttl.as_secs()))
    }
}
