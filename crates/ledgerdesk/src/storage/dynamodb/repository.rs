//! DynamoDB repository implementation.
//!
//! Implements the repository traits from `ledgerdesk_core::storage` against
//! the single table described in the key layout (`keys` module). All three
//! entity families share one table and one client.

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use chrono::{DateTime, Utc};

use ledgerdesk_core::batch::BatchOutcome;
use ledgerdesk_core::inquiry::{InquiryDetail, InquiryMeta, InquiryStatus, Message};
use ledgerdesk_core::ledger::{LedgerDetail, LedgerMeta, LedgerUser, ServiceGrant};
use ledgerdesk_core::service::ServiceEntry;
use ledgerdesk_core::storage::{
    InquiryRepository, LedgerRepository, RepositoryError, Result, ServiceMasterRepository,
};

use super::conversions::{
    inquiry_meta_to_item, item_to_inquiry_meta, item_to_ledger_meta, item_to_ledger_user,
    item_to_message, item_to_service_entry, item_to_service_grant, ledger_meta_to_item,
    ledger_user_to_item, message_to_item, service_entry_to_item, service_grant_to_item,
};
use super::error::{
    map_delete_item_error, map_get_item_error, map_put_item_error, map_query_error,
};
use super::keys;

/// DynamoDB-based repository implementation.
pub struct DynamoDbRepository {
    client: Client,
    table_name: String,
}

impl DynamoDbRepository {
    /// Creates a new repository with the given DynamoDB client and table name.
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    /// Get the table name.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Fetches every item in one partition, in sort-key order.
    async fn query_partition(
        &self,
        pk: String,
    ) -> Result<Vec<std::collections::HashMap<String, AttributeValue>>> {
        let result = self
            .client
            .query()
            .table_name(&self.table_name)
            .key_condition_expression("pk = :pk")
            .expression_attribute_values(":pk", AttributeValue::S(pk))
            .send()
            .await
            .map_err(map_query_error)?;

        Ok(result.items.unwrap_or_default())
    }

    async fn get_item(
        &self,
        pk: String,
        sk: &str,
        entity_type: &'static str,
        id: &str,
    ) -> Result<Option<std::collections::HashMap<String, AttributeValue>>> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("pk", AttributeValue::S(pk))
            .key("sk", AttributeValue::S(sk.to_string()))
            .send()
            .await
            .map_err(|e| map_get_item_error(e, entity_type, id.to_string()))?;

        Ok(result.item)
    }
}

// ============================================================================
// InquiryRepository implementation
// ============================================================================

#[async_trait]
impl InquiryRepository for DynamoDbRepository {
    async fn get_meta(&self, id: &str) -> Result<Option<InquiryMeta>> {
        let item = self
            .get_item(keys::inquiry_pk(id), keys::META_SK, "Inquiry", id)
            .await?;

        match item {
            Some(item) => Ok(Some(item_to_inquiry_meta(&item)?)),
            None => Ok(None),
        }
    }

    async fn get_detail(&self, id: &str) -> Result<Option<InquiryDetail>> {
        let items = self.query_partition(keys::inquiry_pk(id)).await?;

        let mut meta = None;
        let mut messages = Vec::new();
        for item in &items {
            match item.get("sk").and_then(|v| v.as_s().ok()) {
                Some(sk) if sk == keys::META_SK => meta = Some(item_to_inquiry_meta(item)?),
                Some(sk) if sk.starts_with(keys::MESSAGE_PREFIX) => {
                    messages.push(item_to_message(item)?)
                }
                _ => {}
            }
        }

        Ok(meta.map(|meta| InquiryDetail { meta, messages }))
    }

    async fn list_all(&self) -> Result<Vec<InquiryMeta>> {
        let result = self
            .client
            .query()
            .table_name(&self.table_name)
            .index_name("gsi1")
            .key_condition_expression("gsi1pk = :pk and gsi1sk = :sk")
            .expression_attribute_values(":pk", AttributeValue::S(keys::INQUIRY_TYPE.to_string()))
            .expression_attribute_values(":sk", AttributeValue::S(keys::META_SK.to_string()))
            .send()
            .await
            .map_err(map_query_error)?;

        let items = result.items.unwrap_or_default();
        items.iter().map(item_to_inquiry_meta).collect()
    }

    async fn list_for_owner(&self, email: &str) -> Result<Vec<InquiryMeta>> {
        let result = self
            .client
            .query()
            .table_name(&self.table_name)
            .index_name("gsi4")
            .key_condition_expression("gsi4pk = :owner and gsi4sk = :sk")
            .expression_attribute_values(":owner", AttributeValue::S(keys::owner_key(email)))
            .expression_attribute_values(":sk", AttributeValue::S(keys::META_SK.to_string()))
            .send()
            .await
            .map_err(map_query_error)?;

        let items = result.items.unwrap_or_default();
        items.iter().map(item_to_inquiry_meta).collect()
    }

    async fn create(&self, meta: &InquiryMeta, messages: &[Message], owner: &str) -> Result<()> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(inquiry_meta_to_item(meta, owner)))
            .send()
            .await
            .map_err(|e| map_put_item_error(e, "Inquiry", meta.id.clone()))?;

        for message in messages {
            self.client
                .put_item()
                .table_name(&self.table_name)
                .set_item(Some(message_to_item(&meta.id, message, owner)))
                .send()
                .await
                .map_err(|e| map_put_item_error(e, "Message", meta.id.clone()))?;
        }

        Ok(())
    }

    async fn update_status(
        &self,
        id: &str,
        status: InquiryStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let existing = self
            .get_item(keys::inquiry_pk(id), keys::META_SK, "Inquiry", id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound {
                entity_type: "Inquiry",
                id: id.to_string(),
            })?;

        // Full-item overwrite of the merged record, conditioned on the META
        // still existing so a concurrent delete cannot resurrect it.
        let mut item = existing;
        item.insert(
            "status".to_string(),
            AttributeValue::S(status.to_string()),
        );
        item.insert(
            "updated_at".to_string(),
            AttributeValue::S(updated_at.to_rfc3339()),
        );

        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression("attribute_exists(pk)")
            .send()
            .await
            .map_err(|e| map_put_item_error(e, "Inquiry", id.to_string()))?;

        Ok(())
    }

    async fn append_message(&self, id: &str, message: &Message, owner: &str) -> Result<()> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(message_to_item(id, message, owner)))
            .send()
            .await
            .map_err(|e| map_put_item_error(e, "Message", id.to_string()))?;

        // Touch the META's updated_at. Best effort: a missing META does not
        // undo the message write.
        let meta = self
            .get_item(keys::inquiry_pk(id), keys::META_SK, "Inquiry", id)
            .await?;
        if let Some(mut item) = meta {
            item.insert(
                "updated_at".to_string(),
                AttributeValue::S(Utc::now().to_rfc3339()),
            );
            self.client
                .put_item()
                .table_name(&self.table_name)
                .set_item(Some(item))
                .send()
                .await
                .map_err(|e| map_put_item_error(e, "Inquiry", id.to_string()))?;
        } else {
            tracing::warn!(inquiry_id = %id, "message appended to inquiry without META");
        }

        Ok(())
    }
}

// ============================================================================
// LedgerRepository implementation
// ============================================================================

#[async_trait]
impl LedgerRepository for DynamoDbRepository {
    async fn get_detail(&self, approval_id: &str) -> Result<Option<LedgerDetail>> {
        let items = self.query_partition(keys::ledger_pk(approval_id)).await?;

        let mut meta = None;
        let mut users = Vec::new();
        let mut allowed_services = Vec::new();
        for item in &items {
            match item.get("sk").and_then(|v| v.as_s().ok()) {
                Some(sk) if sk == keys::META_SK => meta = Some(item_to_ledger_meta(item)?),
                Some(sk) if sk.starts_with(keys::USER_PREFIX) => {
                    users.push(item_to_ledger_user(item)?)
                }
                Some(sk) if sk.starts_with(keys::SERVICE_PREFIX) => {
                    allowed_services.push(item_to_service_grant(item)?)
                }
                _ => {}
            }
        }

        Ok(meta.map(|meta| LedgerDetail {
            meta,
            users,
            allowed_services,
        }))
    }

    async fn list_all(&self) -> Result<Vec<LedgerMeta>> {
        let result = self
            .client
            .query()
            .table_name(&self.table_name)
            .index_name("gsi2")
            .key_condition_expression("gsi2pk = :pk and gsi2sk = :sk")
            .expression_attribute_values(":pk", AttributeValue::S(keys::LEDGER_TYPE.to_string()))
            .expression_attribute_values(":sk", AttributeValue::S(keys::META_SK.to_string()))
            .send()
            .await
            .map_err(map_query_error)?;

        let items = result.items.unwrap_or_default();
        items.iter().map(item_to_ledger_meta).collect()
    }

    async fn list_managed(&self, email: &str) -> Result<Vec<LedgerMeta>> {
        // One META lookup per approval id; the extra round trips are the
        // documented access pattern for this query.
        let ids = self.managed_ids(email).await?;

        let mut metas = Vec::with_capacity(ids.len());
        for id in ids {
            let item = self
                .get_item(keys::ledger_pk(&id), keys::META_SK, "Ledger", &id)
                .await?;
            if let Some(item) = item {
                metas.push(item_to_ledger_meta(&item)?);
            }
        }

        Ok(metas)
    }

    async fn managed_ids(&self, email: &str) -> Result<Vec<String>> {
        let result = self
            .client
            .query()
            .table_name(&self.table_name)
            .index_name("gsi3")
            .key_condition_expression("gsi3pk = :owner")
            .filter_expression("is_manager = :true_val")
            .expression_attribute_values(":owner", AttributeValue::S(keys::owner_key(email)))
            .expression_attribute_values(":true_val", AttributeValue::Bool(true))
            .send()
            .await
            .map_err(map_query_error)?;

        let items = result.items.unwrap_or_default();
        Ok(items
            .iter()
            .filter_map(|item| item.get("pk").and_then(|v| v.as_s().ok()))
            .map(|pk| keys::approval_id_from_pk(pk).to_string())
            .collect())
    }

    async fn create_meta(&self, meta: &LedgerMeta) -> Result<()> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(ledger_meta_to_item(meta)))
            .send()
            .await
            .map_err(|e| map_put_item_error(e, "Ledger", meta.approval_id.clone()))?;

        Ok(())
    }

    async fn put_user(&self, approval_id: &str, user: &LedgerUser) -> Result<()> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(ledger_user_to_item(approval_id, user)))
            .send()
            .await
            .map_err(|e| map_put_item_error(e, "LedgerUser", user.email.clone()))?;

        Ok(())
    }

    async fn put_service(&self, approval_id: &str, grant: &ServiceGrant) -> Result<()> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(service_grant_to_item(approval_id, grant)))
            .send()
            .await
            .map_err(|e| map_put_item_error(e, "ServiceGrant", grant.name.clone()))?;

        Ok(())
    }
}

// ============================================================================
// ServiceMasterRepository implementation
// ============================================================================

#[async_trait]
impl ServiceMasterRepository for DynamoDbRepository {
    async fn list(&self) -> Result<Vec<ServiceEntry>> {
        let items = self
            .query_partition(keys::SERVICE_MASTER_PK.to_string())
            .await?;
        items.iter().map(item_to_service_entry).collect()
    }

    async fn replace_all(&self, entries: &[ServiceEntry]) -> Result<BatchOutcome> {
        let mut outcome = BatchOutcome::new();

        // Delete-then-put, item by item. A failed delete leaves a stale row
        // behind; it is reported rather than retried.
        let existing = self
            .query_partition(keys::SERVICE_MASTER_PK.to_string())
            .await?;
        for item in existing {
            let Some(sk) = item.get("sk").and_then(|v| v.as_s().ok()).cloned() else {
                continue;
            };
            let result = self
                .client
                .delete_item()
                .table_name(&self.table_name)
                .key(
                    "pk",
                    AttributeValue::S(keys::SERVICE_MASTER_PK.to_string()),
                )
                .key("sk", AttributeValue::S(sk.clone()))
                .send()
                .await
                .map_err(|e| map_delete_item_error(e, "ServiceEntry", sk.clone()));
            if let Err(e) = result {
                tracing::warn!(sort_key = %sk, error = %e, "failed to delete stale service row");
                outcome.fail(sk, e);
            }
        }

        for entry in entries {
            let result = self
                .client
                .put_item()
                .table_name(&self.table_name)
                .set_item(Some(service_entry_to_item(entry)))
                .send()
                .await
                .map_err(|e| map_put_item_error(e, "ServiceEntry", entry.name.clone()));
            match result {
                Ok(_) => outcome.ok(entry.name.clone()),
                Err(e) => {
                    tracing::warn!(service = %entry.name, error = %e, "failed to write service row");
                    outcome.fail(entry.name.clone(), e);
                }
            }
        }

        Ok(outcome)
    }
}
