//! In-memory repository implementation.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use ledgerdesk_core::batch::BatchOutcome;
use ledgerdesk_core::inquiry::{InquiryDetail, InquiryMeta, InquiryStatus, Message};
use ledgerdesk_core::ledger::{LedgerDetail, LedgerMeta, LedgerUser, ServiceGrant};
use ledgerdesk_core::service::ServiceEntry;
use ledgerdesk_core::storage::{
    InquiryRepository, LedgerRepository, RepositoryError, Result, ServiceMasterRepository,
};

/// In-memory storage backend for testing and local development.
///
/// Mirrors the single-table semantics: one META per partition, children
/// keyed by their sort key (so message timestamps and user emails collide
/// exactly like they do in the real table). Data is lost on drop.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    inner: Arc<RwLock<Tables>>,
}

#[derive(Debug, Default)]
struct Tables {
    /// Inquiry META records plus the owner they are indexed under.
    inquiries: HashMap<String, (InquiryMeta, String)>,
    /// Message children keyed by timestamp, per inquiry partition. Equal
    /// timestamps overwrite, like the real sort key.
    messages: HashMap<String, BTreeMap<DateTime<Utc>, Message>>,
    ledgers: HashMap<String, LedgerMeta>,
    ledger_users: HashMap<String, BTreeMap<String, LedgerUser>>,
    ledger_services: HashMap<String, BTreeMap<String, ServiceGrant>>,
    services: BTreeMap<String, ServiceEntry>,
}

impl InMemoryRepository {
    /// Creates a new empty in-memory repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InquiryRepository for InMemoryRepository {
    async fn get_meta(&self, id: &str) -> Result<Option<InquiryMeta>> {
        let tables = self.inner.read().await;
        Ok(tables.inquiries.get(id).map(|(meta, _)| meta.clone()))
    }

    async fn get_detail(&self, id: &str) -> Result<Option<InquiryDetail>> {
        let tables = self.inner.read().await;
        let Some((meta, _)) = tables.inquiries.get(id) else {
            return Ok(None);
        };
        let messages = tables
            .messages
            .get(id)
            .map(|thread| thread.values().cloned().collect())
            .unwrap_or_default();

        Ok(Some(InquiryDetail {
            meta: meta.clone(),
            messages,
        }))
    }

    async fn list_all(&self) -> Result<Vec<InquiryMeta>> {
        let tables = self.inner.read().await;
        Ok(tables
            .inquiries
            .values()
            .map(|(meta, _)| meta.clone())
            .collect())
    }

    async fn list_for_owner(&self, email: &str) -> Result<Vec<InquiryMeta>> {
        let tables = self.inner.read().await;
        Ok(tables
            .inquiries
            .values()
            .filter(|(_, owner)| owner == email)
            .map(|(meta, _)| meta.clone())
            .collect())
    }

    async fn create(&self, meta: &InquiryMeta, messages: &[Message], owner: &str) -> Result<()> {
        let mut tables = self.inner.write().await;
        tables
            .inquiries
            .insert(meta.id.clone(), (meta.clone(), owner.to_string()));
        let thread = tables.messages.entry(meta.id.clone()).or_default();
        for message in messages {
            thread.insert(message.created_at, message.clone());
        }
        Ok(())
    }

    async fn update_status(
        &self,
        id: &str,
        status: InquiryStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut tables = self.inner.write().await;
        let Some((meta, _)) = tables.inquiries.get_mut(id) else {
            return Err(RepositoryError::NotFound {
                entity_type: "Inquiry",
                id: id.to_string(),
            });
        };
        meta.status = status;
        meta.updated_at = updated_at;
        Ok(())
    }

    async fn append_message(&self, id: &str, message: &Message, _owner: &str) -> Result<()> {
        let mut tables = self.inner.write().await;
        tables
            .messages
            .entry(id.to_string())
            .or_default()
            .insert(message.created_at, message.clone());

        // Best-effort META touch, matching the table backend.
        if let Some((meta, _)) = tables.inquiries.get_mut(id) {
            meta.updated_at = Utc::now();
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerRepository for InMemoryRepository {
    async fn get_detail(&self, approval_id: &str) -> Result<Option<LedgerDetail>> {
        let tables = self.inner.read().await;
        let Some(meta) = tables.ledgers.get(approval_id) else {
            return Ok(None);
        };

        Ok(Some(LedgerDetail {
            meta: meta.clone(),
            users: tables
                .ledger_users
                .get(approval_id)
                .map(|users| users.values().cloned().collect())
                .unwrap_or_default(),
            allowed_services: tables
                .ledger_services
                .get(approval_id)
                .map(|grants| grants.values().cloned().collect())
                .unwrap_or_default(),
        }))
    }

    async fn list_all(&self) -> Result<Vec<LedgerMeta>> {
        let tables = self.inner.read().await;
        Ok(tables.ledgers.values().cloned().collect())
    }

    async fn list_managed(&self, email: &str) -> Result<Vec<LedgerMeta>> {
        let ids = self.managed_ids(email).await?;
        let tables = self.inner.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.ledgers.get(id).cloned())
            .collect())
    }

    async fn managed_ids(&self, email: &str) -> Result<Vec<String>> {
        let tables = self.inner.read().await;
        Ok(tables
            .ledger_users
            .iter()
            .filter(|(_, users)| users.get(email).is_some_and(|u| u.is_manager))
            .map(|(approval_id, _)| approval_id.clone())
            .collect())
    }

    async fn create_meta(&self, meta: &LedgerMeta) -> Result<()> {
        let mut tables = self.inner.write().await;
        tables
            .ledgers
            .insert(meta.approval_id.clone(), meta.clone());
        Ok(())
    }

    async fn put_user(&self, approval_id: &str, user: &LedgerUser) -> Result<()> {
        let mut tables = self.inner.write().await;
        tables
            .ledger_users
            .entry(approval_id.to_string())
            .or_default()
            .insert(user.email.clone(), user.clone());
        Ok(())
    }

    async fn put_service(&self, approval_id: &str, grant: &ServiceGrant) -> Result<()> {
        let mut tables = self.inner.write().await;
        tables
            .ledger_services
            .entry(approval_id.to_string())
            .or_default()
            .insert(grant.name.clone(), grant.clone());
        Ok(())
    }
}

#[async_trait]
impl ServiceMasterRepository for InMemoryRepository {
    async fn list(&self) -> Result<Vec<ServiceEntry>> {
        let tables = self.inner.read().await;
        Ok(tables.services.values().cloned().collect())
    }

    async fn replace_all(&self, entries: &[ServiceEntry]) -> Result<BatchOutcome> {
        let mut tables = self.inner.write().await;
        let mut outcome = BatchOutcome::new();

        tables.services.clear();
        for entry in entries {
            tables.services.insert(entry.name.clone(), entry.clone());
            outcome.ok(entry.name.clone());
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn meta(id: &str) -> InquiryMeta {
        InquiryMeta {
            id: id.to_string(),
            status: InquiryStatus::Open,
            title: "VPN access".to_string(),
            created_at: Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap(),
        }
    }

    fn message(at_hour: u32) -> Message {
        Message {
            sender: "Yamada Taro".to_string(),
            sender_email: "taro@example.com".to_string(),
            sender_role: "user".to_string(),
            content: format!("message at {at_hour}"),
            created_at: Utc.with_ymd_and_hms(2025, 6, 1, at_hour, 0, 0).unwrap(),
            attachments: vec![],
            reactions: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_detail_contains_created_and_appended_messages() {
        let repo = InMemoryRepository::new();
        repo.create(&meta("inq-1"), &[message(9)], "taro@example.com")
            .await
            .unwrap();
        repo.append_message("inq-1", &message(10), "taro@example.com")
            .await
            .unwrap();

        let detail = InquiryRepository::get_detail(&repo, "inq-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(detail.messages.len(), 2);
        assert_eq!(detail.messages[0].content, "message at 9");
        assert_eq!(detail.messages[1].content, "message at 10");
    }

    #[tokio::test]
    async fn test_same_timestamp_message_overwrites() {
        let repo = InMemoryRepository::new();
        repo.create(&meta("inq-1"), &[message(9)], "taro@example.com")
            .await
            .unwrap();

        let mut replacement = message(9);
        replacement.content = "edited".to_string();
        repo.append_message("inq-1", &replacement, "taro@example.com")
            .await
            .unwrap();

        let detail = InquiryRepository::get_detail(&repo, "inq-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(detail.messages.len(), 1);
        assert_eq!(detail.messages[0].content, "edited");
    }

    #[tokio::test]
    async fn test_update_status_on_missing_inquiry_leaves_no_record() {
        let repo = InMemoryRepository::new();
        let result = repo
            .update_status("ghost", InquiryStatus::Closed, Utc::now())
            .await;

        assert!(matches!(result, Err(RepositoryError::NotFound { .. })));
        assert!(repo.get_meta("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_for_owner_scopes_by_email() {
        let repo = InMemoryRepository::new();
        repo.create(&meta("inq-1"), &[], "taro@example.com")
            .await
            .unwrap();
        repo.create(&meta("inq-2"), &[], "hanako@example.com")
            .await
            .unwrap();

        let mine = repo.list_for_owner("taro@example.com").await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, "inq-1");
        assert_eq!(
            InquiryRepository::list_all(&repo).await.unwrap().len(),
            2
        );
    }

    #[tokio::test]
    async fn test_managed_ids_requires_manager_flag() {
        let repo = InMemoryRepository::new();
        let ledger = LedgerMeta {
            approval_id: "APR-1".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        repo.create_meta(&ledger).await.unwrap();

        let manager = LedgerUser {
            email: "boss@example.com".to_string(),
            last_name: "Suzuki".to_string(),
            first_name: "Ichiro".to_string(),
            section: "Infra".to_string(),
            department: "IT".to_string(),
            is_manager: true,
            start_date: None,
            end_date: None,
        };
        let member = LedgerUser {
            email: "taro@example.com".to_string(),
            is_manager: false,
            ..manager.clone()
        };
        repo.put_user("APR-1", &manager).await.unwrap();
        repo.put_user("APR-1", &member).await.unwrap();

        assert_eq!(
            repo.managed_ids("boss@example.com").await.unwrap(),
            vec!["APR-1"]
        );
        assert!(repo.managed_ids("taro@example.com").await.unwrap().is_empty());

        let managed = repo.list_managed("boss@example.com").await.unwrap();
        assert_eq!(managed.len(), 1);
        assert_eq!(managed[0].approval_id, "APR-1");
    }

    #[tokio::test]
    async fn test_replace_all_is_destructive() {
        let repo = InMemoryRepository::new();
        let entry = |name: &str| ServiceEntry {
            name: name.to_string(),
            display_name: name.to_string(),
            description: String::new(),
            url: String::new(),
            uploaded_at: Utc::now(),
        };

        repo.replace_all(&[entry("vpn"), entry("wiki")]).await.unwrap();
        repo.replace_all(&[entry("mail")]).await.unwrap();

        let names: Vec<String> = repo
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["mail"]);
    }
}
