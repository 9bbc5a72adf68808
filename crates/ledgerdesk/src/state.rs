//! Application state with repository-based storage.
//!
//! The shared state passed to every request handler: repository and
//! blob-store trait objects plus the resolved configuration. Backends are
//! selected at compile time via feature flags.

use std::sync::Arc;

use ledgerdesk_core::blob::BlobStore;
use ledgerdesk_core::storage::{InquiryRepository, LedgerRepository, ServiceMasterRepository};

use crate::config::Config;

// ============================================================================
// Compile-time feature validation
// ============================================================================

// Table backends: exactly one must be enabled, they are mutually exclusive
#[cfg(all(feature = "inmemory", feature = "dynamodb"))]
compile_error!("Cannot enable both 'inmemory' and 'dynamodb' table backends");

#[cfg(not(any(feature = "inmemory", feature = "dynamodb")))]
compile_error!("Must enable exactly one table backend: 'inmemory' or 'dynamodb'");

// Blob backends: exactly one must be enabled, they are mutually exclusive
#[cfg(all(feature = "memblob", feature = "s3"))]
compile_error!("Cannot enable both 'memblob' and 's3' blob backends");

#[cfg(not(any(feature = "memblob", feature = "s3")))]
compile_error!("Must enable exactly one blob backend: 'memblob' or 's3'");

/// Shared application state.
///
/// Cloned for each request handler; all fields are cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Inquiry records (META + MESSAGE children).
    pub inquiries: Arc<dyn InquiryRepository>,
    /// Ledger records (META + USER/SERVICE children).
    pub ledgers: Arc<dyn LedgerRepository>,
    /// Service-master reference rows.
    pub services: Arc<dyn ServiceMasterRepository>,
    /// Uploaded files and service-master spreadsheets.
    pub blobs: Arc<dyn BlobStore>,
    /// Configuration resolved once at startup.
    pub config: Config,
}

impl AppState {
    /// Builds state with explicit backends (used by tests).
    pub fn new(
        inquiries: Arc<dyn InquiryRepository>,
        ledgers: Arc<dyn LedgerRepository>,
        services: Arc<dyn ServiceMasterRepository>,
        blobs: Arc<dyn BlobStore>,
        config: Config,
    ) -> Self {
        Self {
            inquiries,
            ledgers,
            services,
            blobs,
            config,
        }
    }

    /// Builds state from configuration using the compiled-in backends.
    #[cfg(all(feature = "inmemory", feature = "memblob"))]
    pub async fn from_config(config: Config) -> anyhow::Result<Self> {
        use crate::blob::inmemory::InMemoryBlobStore;
        use crate::storage::inmemory::InMemoryRepository;

        let repo = Arc::new(InMemoryRepository::new());
        Ok(Self {
            inquiries: repo.clone(),
            ledgers: repo.clone(),
            services: repo,
            blobs: Arc::new(InMemoryBlobStore::new()),
            config,
        })
    }

    #[cfg(all(feature = "dynamodb", feature = "s3"))]
    pub async fn from_config(config: Config) -> anyhow::Result<Self> {
        use crate::blob::s3::S3BlobStore;
        use crate::storage::dynamodb::DynamoDbRepository;

        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let repo = Arc::new(DynamoDbRepository::new(
            aws_sdk_dynamodb::Client::new(&sdk_config),
            config.table_name.clone(),
        ));
        let blobs = Arc::new(S3BlobStore::new(
            aws_sdk_s3::Client::new(&sdk_config),
            config.bucket_name.clone(),
        ));

        Ok(Self {
            inquiries: repo.clone(),
            ledgers: repo.clone(),
            services: repo,
            blobs,
            config,
        })
    }

    // Mixed backends (e.g. DynamoDB table with in-memory blobs) are useful
    // when running against dynamodb-local without S3.
    #[cfg(all(feature = "dynamodb", feature = "memblob"))]
    pub async fn from_config(config: Config) -> anyhow::Result<Self> {
        use crate::blob::inmemory::InMemoryBlobStore;
        use crate::storage::dynamodb::DynamoDbRepository;

        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let repo = Arc::new(DynamoDbRepository::new(
            aws_sdk_dynamodb::Client::new(&sdk_config),
            config.table_name.clone(),
        ));

        Ok(Self {
            inquiries: repo.clone(),
            ledgers: repo.clone(),
            services: repo,
            blobs: Arc::new(InMemoryBlobStore::new()),
            config,
        })
    }

    #[cfg(all(feature = "inmemory", feature = "s3"))]
    pub async fn from_config(config: Config) -> anyhow::Result<Self> {
        use crate::blob::s3::S3BlobStore;
        use crate::storage::inmemory::InMemoryRepository;

        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let repo = Arc::new(InMemoryRepository::new());
        let blobs = Arc::new(S3BlobStore::new(
            aws_sdk_s3::Client::new(&sdk_config),
            config.bucket_name.clone(),
        ));

        Ok(Self {
            inquiries: repo.clone(),
            ledgers: repo.clone(),
            services: repo,
            blobs,
            config,
        })
    }
}

#[cfg(all(test, feature = "inmemory", feature = "memblob"))]
impl AppState {
    /// Fresh in-memory state for router tests.
    pub fn for_tests() -> Self {
        use crate::blob::inmemory::InMemoryBlobStore;
        use crate::storage::inmemory::InMemoryRepository;

        let repo = Arc::new(InMemoryRepository::new());
        Self {
            inquiries: repo.clone(),
            ledgers: repo.clone(),
            services: repo,
            blobs: Arc::new(InMemoryBlobStore::new()),
            config: Config {
                table_name: "test".to_string(),
                bucket_name: "test".to_string(),
                presign_ttl_seconds: 300,
            },
        }
    }
}
