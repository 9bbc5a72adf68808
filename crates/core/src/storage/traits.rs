use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::batch::BatchOutcome;
use crate::inquiry::{InquiryDetail, InquiryMeta, InquiryStatus, Message};
use crate::ledger::{LedgerDetail, LedgerMeta, LedgerUser, ServiceGrant};
use crate::service::ServiceEntry;

use super::Result;

/// Repository for inquiry records (META plus MESSAGE children).
#[async_trait]
pub trait InquiryRepository: Send + Sync {
    /// Gets the META record of an inquiry.
    async fn get_meta(&self, id: &str) -> Result<Option<InquiryMeta>>;

    /// Gets the full partition: META merged with its message thread.
    async fn get_detail(&self, id: &str) -> Result<Option<InquiryDetail>>;

    /// Lists every inquiry META via the type index.
    async fn list_all(&self) -> Result<Vec<InquiryMeta>>;

    /// Lists inquiry METAs owned by `email` via the owner index.
    async fn list_for_owner(&self, email: &str) -> Result<Vec<InquiryMeta>>;

    /// Creates the META record and the initial messages, tagging them with
    /// the type and owner index attributes. `owner` is the creating caller.
    async fn create(&self, meta: &InquiryMeta, messages: &[Message], owner: &str) -> Result<()>;

    /// Overwrites status and `updated_at` on an existing META. Fails with
    /// `NotFound` instead of fabricating a META for an unknown id.
    async fn update_status(
        &self,
        id: &str,
        status: InquiryStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Writes a message under the inquiry partition, then re-reads the META
    /// and rewrites it with a fresh `updated_at`. The META touch is best
    /// effort: a missing META does not fail the message write.
    async fn append_message(&self, id: &str, message: &Message, owner: &str) -> Result<()>;
}

/// Repository for ledger records (META plus USER/SERVICE children).
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    /// Gets the full partition split into META, users, and service grants.
    async fn get_detail(&self, approval_id: &str) -> Result<Option<LedgerDetail>>;

    /// Lists every ledger META via the type index.
    async fn list_all(&self) -> Result<Vec<LedgerMeta>>;

    /// Lists METAs of ledgers where `email` holds the manager flag.
    ///
    /// Resolved through the owner index filtered on `is_manager`, then one
    /// META lookup per approval id. The per-id re-fetch is the documented
    /// access pattern for this query.
    async fn list_managed(&self, email: &str) -> Result<Vec<LedgerMeta>>;

    /// Lists approval ids where `email` holds the manager flag.
    async fn managed_ids(&self, email: &str) -> Result<Vec<String>>;

    /// Creates the META record. Children are written separately so the
    /// caller can assemble a per-item [`BatchOutcome`].
    async fn create_meta(&self, meta: &LedgerMeta) -> Result<()>;

    /// Upserts a user child, tagged with the owner index for manager lookup.
    async fn put_user(&self, approval_id: &str, user: &LedgerUser) -> Result<()>;

    /// Upserts a service-grant child.
    async fn put_service(&self, approval_id: &str, grant: &ServiceGrant) -> Result<()>;
}

/// Repository for the service-master reference rows.
#[async_trait]
pub trait ServiceMasterRepository: Send + Sync {
    /// Lists the current service-master rows.
    async fn list(&self) -> Result<Vec<ServiceEntry>>;

    /// Replaces the whole master: deletes every existing row, then writes
    /// the new set. Each delete and put is independent; the outcome records
    /// per-item results rather than aborting on first failure.
    async fn replace_all(&self, entries: &[ServiceEntry]) -> Result<BatchOutcome>;
}
