use std::{env, time::Duration};

/// Application configuration loaded from environment variables.
///
/// Resolved once at startup and carried in [`crate::state::AppState`]; no
/// module-level globals.
#[derive(Debug, Clone)]
pub struct Config {
    /// DynamoDB table holding all entity records (default: "ledgerdesk")
    pub table_name: String,
    /// S3 bucket holding uploads and service-master spreadsheets
    /// (default: "ledgerdesk")
    pub bucket_name: String,
    /// Lifetime of presigned download URLs in seconds (default: 300)
    pub presign_ttl_seconds: u64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `TABLE_NAME` - DynamoDB table name (default: "ledgerdesk")
    /// - `BUCKET_NAME` - S3 bucket name (default: "ledgerdesk")
    /// - `PRESIGN_TTL_SECONDS` - presigned URL lifetime (default: 300)
    pub fn from_env() -> Self {
        Self {
            table_name: env::var("TABLE_NAME").unwrap_or_else(|_| "ledgerdesk".to_string()),
            bucket_name: env::var("BUCKET_NAME").unwrap_or_else(|_| "ledgerdesk".to_string()),
            presign_ttl_seconds: env::var("PRESIGN_TTL_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
        }
    }

    /// Get the presign TTL as a Duration.
    pub fn presign_ttl(&self) -> Duration {
        Duration::from_secs(self.presign_ttl_seconds)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
