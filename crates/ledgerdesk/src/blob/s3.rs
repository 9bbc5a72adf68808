//! S3 blob-store backend.
//!
//! Implements the `BlobStore` trait from `ledgerdesk_core::blob` against a
//! single bucket. Presigned URLs carry the TTL from configuration.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};

use ledgerdesk_core::blob::{BlobError, BlobObject, BlobStore, Result};

/// S3-based blob store.
pub struct S3BlobStore {
    client: Client,
    bucket: String,
}

impl S3BlobStore {
    /// Creates a new blob store with the given S3 client and bucket.
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Get the bucket name.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

fn map_sdk_error(operation: &str, err: impl std::fmt::Display) -> BlobError {
    BlobError::OperationFailed(format!("{operation} failed: {err}"))
}

fn to_chrono(dt: &aws_sdk_s3::primitives::DateTime) -> DateTime<Utc> {
    DateTime::from_timestamp(dt.secs(), dt.subsec_nanos()).unwrap_or_default()
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn list(&self, prefix: &str) -> Result<Vec<BlobObject>> {
        let result = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .send()
            .await
            .map_err(|e| map_sdk_error("ListObjectsV2", e))?;

        let mut objects: Vec<BlobObject> = result
            .contents
            .unwrap_or_default()
            .into_iter()
            .filter_map(|item| {
                Some(BlobObject {
                    key: item.key?,
                    last_modified: item.last_modified.as_ref().map(to_chrono)?,
                    size: item.size.unwrap_or(0).max(0) as u64,
                })
            })
            .collect();

        // Newest first, matching the listing contract.
        objects.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
        Ok(objects)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let service_err = e.into_service_error();
                if service_err.is_no_such_key() {
                    BlobError::NotFound(key.to_string())
                } else {
                    map_sdk_error("GetObject", service_err)
                }
            })?;

        let bytes = result
            .body
            .collect()
            .await
            .map_err(|e| map_sdk_error("GetObject body", e))?;
        Ok(bytes.into_bytes().to_vec())
    }

    async fn copy(&self, src: &str, dst: &str) -> Result<()> {
        self.client
            .copy_object()
            .bucket(&self.bucket)
            .copy_source(format!("{}/{}", self.bucket, src))
            .key(dst)
            .send()
            .await
            .map_err(|e| map_sdk_error("CopyObject", e))?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| map_sdk_error("DeleteObject", e))?;

        Ok(())
    }

    async fn presign_get(&self, key: &str, ttl: Duration) -> Result<String> {
        let presigning = PresigningConfig::expires_in(ttl)
            .map_err(|e| map_sdk_error("PresigningConfig", e))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| map_sdk_error("GetObject presign", e))?;

        Ok(request.uri().to_string())
    }
}
