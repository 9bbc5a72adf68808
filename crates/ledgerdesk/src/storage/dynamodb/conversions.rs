//! DynamoDB attribute conversion functions.
//!
//! Pure functions for converting between DynamoDB AttributeValue maps and
//! domain types. These are testable in isolation without DynamoDB access.
//!
//! Attribute names are lowercase (`pk`, `sk`, `gsi1pk`, ...) to stay
//! compatible with the table layout existing tooling reads.

use std::collections::{BTreeMap, HashMap};

use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, NaiveDate, Utc};
use ledgerdesk_core::inquiry::{Attachment, InquiryMeta, InquiryStatus, Message};
use ledgerdesk_core::ledger::{LedgerMeta, LedgerUser, ServiceGrant};
use ledgerdesk_core::service::ServiceEntry;
use ledgerdesk_core::storage::RepositoryError;

use super::keys;

type Item = HashMap<String, AttributeValue>;

// ============================================================================
// Inquiry conversions
// ============================================================================

/// Convert an InquiryMeta to a DynamoDB item, tagged with the type index and
/// the owner index of the creating caller.
pub fn inquiry_meta_to_item(meta: &InquiryMeta, owner: &str) -> Item {
    let mut item = HashMap::new();

    item.insert("pk".to_string(), s(keys::inquiry_pk(&meta.id)));
    item.insert("sk".to_string(), s(keys::META_SK));
    item.insert("gsi1pk".to_string(), s(keys::INQUIRY_TYPE));
    item.insert("gsi1sk".to_string(), s(keys::META_SK));
    item.insert("gsi4pk".to_string(), s(keys::owner_key(owner)));
    item.insert("gsi4sk".to_string(), s(keys::META_SK));

    item.insert("id".to_string(), s(&meta.id));
    item.insert("status".to_string(), s(meta.status.to_string()));
    item.insert("title".to_string(), s(&meta.title));
    item.insert("created_at".to_string(), s(meta.created_at.to_rfc3339()));
    item.insert("updated_at".to_string(), s(meta.updated_at.to_rfc3339()));

    item
}

/// Convert a DynamoDB item to an InquiryMeta.
pub fn item_to_inquiry_meta(item: &Item) -> Result<InquiryMeta, RepositoryError> {
    Ok(InquiryMeta {
        id: get_string(item, "id")?,
        status: get_string(item, "status")?
            .parse::<InquiryStatus>()
            .map_err(RepositoryError::Serialization)?,
        title: get_string(item, "title")?,
        created_at: get_datetime(item, "created_at")?,
        updated_at: get_datetime(item, "updated_at")?,
    })
}

/// Convert a Message to a DynamoDB item under the inquiry partition.
pub fn message_to_item(inquiry_id: &str, message: &Message, owner: &str) -> Item {
    let mut item = HashMap::new();

    item.insert("pk".to_string(), s(keys::inquiry_pk(inquiry_id)));
    item.insert("sk".to_string(), s(keys::message_sk(message.created_at)));
    item.insert("gsi1pk".to_string(), s(keys::INQUIRY_TYPE));
    item.insert("gsi1sk".to_string(), s(keys::MESSAGE_TAG));
    item.insert("gsi4pk".to_string(), s(keys::owner_key(owner)));
    item.insert("gsi4sk".to_string(), s(keys::MESSAGE_TAG));

    item.insert("sender".to_string(), s(&message.sender));
    item.insert("sender_email".to_string(), s(&message.sender_email));
    item.insert("sender_role".to_string(), s(&message.sender_role));
    item.insert("content".to_string(), s(&message.content));
    item.insert(
        "created_at".to_string(),
        s(message.created_at.to_rfc3339()),
    );
    item.insert(
        "attachments".to_string(),
        AttributeValue::L(
            message
                .attachments
                .iter()
                .map(attachment_to_attribute)
                .collect(),
        ),
    );
    item.insert(
        "reactions".to_string(),
        AttributeValue::M(
            message
                .reactions
                .iter()
                .map(|(emoji, emails)| {
                    (
                        emoji.clone(),
                        AttributeValue::L(emails.iter().map(s).collect()),
                    )
                })
                .collect(),
        ),
    );

    item
}

/// Convert a DynamoDB item to a Message.
pub fn item_to_message(item: &Item) -> Result<Message, RepositoryError> {
    let attachments = match item.get("attachments") {
        Some(AttributeValue::L(list)) => list
            .iter()
            .map(attribute_to_attachment)
            .collect::<Result<Vec<_>, _>>()?,
        _ => Vec::new(),
    };

    let mut reactions = BTreeMap::new();
    if let Some(AttributeValue::M(map)) = item.get("reactions") {
        for (emoji, value) in map {
            if let AttributeValue::L(list) = value {
                let emails = list
                    .iter()
                    .filter_map(|v| v.as_s().ok().cloned())
                    .collect();
                reactions.insert(emoji.clone(), emails);
            }
        }
    }

    Ok(Message {
        sender: get_string(item, "sender")?,
        sender_email: get_string_or_default(item, "sender_email"),
        sender_role: get_string_or_default(item, "sender_role"),
        content: get_string(item, "content")?,
        created_at: get_datetime(item, "created_at")?,
        attachments,
        reactions,
    })
}

fn attachment_to_attribute(attachment: &Attachment) -> AttributeValue {
    let mut map = HashMap::new();
    map.insert("file_name".to_string(), s(&attachment.file_name));
    map.insert("path".to_string(), s(&attachment.path));
    map.insert("content_type".to_string(), s(&attachment.content_type));
    AttributeValue::M(map)
}

fn attribute_to_attachment(value: &AttributeValue) -> Result<Attachment, RepositoryError> {
    let map = value.as_m().map_err(|_| {
        RepositoryError::Serialization("attachment is not a map".to_string())
    })?;
    Ok(Attachment {
        file_name: get_string(map, "file_name")?,
        path: get_string(map, "path")?,
        content_type: get_string_or_default(map, "content_type"),
    })
}

// ============================================================================
// Ledger conversions
// ============================================================================

/// Convert a LedgerMeta to a DynamoDB item, tagged with the type index.
pub fn ledger_meta_to_item(meta: &LedgerMeta) -> Item {
    let mut item = HashMap::new();

    item.insert("pk".to_string(), s(keys::ledger_pk(&meta.approval_id)));
    item.insert("sk".to_string(), s(keys::META_SK));
    item.insert("gsi2pk".to_string(), s(keys::LEDGER_TYPE));
    item.insert("gsi2sk".to_string(), s(keys::META_SK));

    item.insert("approval_id".to_string(), s(&meta.approval_id));
    item.insert("created_at".to_string(), s(meta.created_at.to_rfc3339()));
    item.insert("updated_at".to_string(), s(meta.updated_at.to_rfc3339()));

    item
}

/// Convert a DynamoDB item to a LedgerMeta.
pub fn item_to_ledger_meta(item: &Item) -> Result<LedgerMeta, RepositoryError> {
    Ok(LedgerMeta {
        approval_id: get_string(item, "approval_id")?,
        created_at: get_datetime(item, "created_at")?,
        updated_at: get_datetime(item, "updated_at")?,
    })
}

/// Convert a LedgerUser to a DynamoDB item, tagged with the owner index so
/// manager-lookup queries find it.
pub fn ledger_user_to_item(approval_id: &str, user: &LedgerUser) -> Item {
    let mut item = HashMap::new();

    item.insert("pk".to_string(), s(keys::ledger_pk(approval_id)));
    item.insert("sk".to_string(), s(keys::ledger_user_sk(&user.email)));
    item.insert("gsi3pk".to_string(), s(keys::owner_key(&user.email)));

    item.insert("email".to_string(), s(&user.email));
    item.insert("last_name".to_string(), s(&user.last_name));
    item.insert("first_name".to_string(), s(&user.first_name));
    item.insert("section".to_string(), s(&user.section));
    item.insert("department".to_string(), s(&user.department));
    item.insert(
        "is_manager".to_string(),
        AttributeValue::Bool(user.is_manager),
    );
    if let Some(date) = user.start_date {
        item.insert("start_date".to_string(), s(date.to_string()));
    }
    if let Some(date) = user.end_date {
        item.insert("end_date".to_string(), s(date.to_string()));
    }

    item
}

/// Convert a DynamoDB item to a LedgerUser.
pub fn item_to_ledger_user(item: &Item) -> Result<LedgerUser, RepositoryError> {
    Ok(LedgerUser {
        email: get_string(item, "email")?,
        last_name: get_string_or_default(item, "last_name"),
        first_name: get_string_or_default(item, "first_name"),
        section: get_string_or_default(item, "section"),
        department: get_string_or_default(item, "department"),
        is_manager: matches!(item.get("is_manager"), Some(AttributeValue::Bool(true))),
        start_date: get_optional_date(item, "start_date")?,
        end_date: get_optional_date(item, "end_date")?,
    })
}

/// Convert a ServiceGrant to a DynamoDB item under the ledger partition.
pub fn service_grant_to_item(approval_id: &str, grant: &ServiceGrant) -> Item {
    let mut item = HashMap::new();

    item.insert("pk".to_string(), s(keys::ledger_pk(approval_id)));
    item.insert("sk".to_string(), s(keys::ledger_service_sk(&grant.name)));

    item.insert("name".to_string(), s(&grant.name));
    item.insert("display_name".to_string(), s(&grant.display_name));
    item.insert("url".to_string(), s(&grant.url));

    item
}

/// Convert a DynamoDB item to a ServiceGrant.
pub fn item_to_service_grant(item: &Item) -> Result<ServiceGrant, RepositoryError> {
    Ok(ServiceGrant {
        name: get_string(item, "name")?,
        display_name: get_string_or_default(item, "display_name"),
        url: get_string_or_default(item, "url"),
    })
}

// ============================================================================
// Service master conversions
// ============================================================================

/// Convert a ServiceEntry to a DynamoDB item in the fixed master partition.
pub fn service_entry_to_item(entry: &ServiceEntry) -> Item {
    let mut item = HashMap::new();

    item.insert("pk".to_string(), s(keys::SERVICE_MASTER_PK));
    item.insert("sk".to_string(), s(keys::service_master_sk(&entry.name)));

    item.insert("name".to_string(), s(&entry.name));
    item.insert("display_name".to_string(), s(&entry.display_name));
    item.insert("description".to_string(), s(&entry.description));
    item.insert("url".to_string(), s(&entry.url));
    item.insert(
        "uploaded_at".to_string(),
        s(entry.uploaded_at.to_rfc3339()),
    );

    item
}

/// Convert a DynamoDB item to a ServiceEntry.
pub fn item_to_service_entry(item: &Item) -> Result<ServiceEntry, RepositoryError> {
    Ok(ServiceEntry {
        name: get_string(item, "name")?,
        display_name: get_string_or_default(item, "display_name"),
        description: get_string_or_default(item, "description"),
        url: get_string_or_default(item, "url"),
        uploaded_at: get_datetime(item, "uploaded_at")?,
    })
}

// ============================================================================
// Attribute helpers
// ============================================================================

fn s(value: impl AsRef<str>) -> AttributeValue {
    AttributeValue::S(value.as_ref().to_string())
}

fn get_string(item: &Item, key: &str) -> Result<String, RepositoryError> {
    item.get(key)
        .and_then(|v| v.as_s().ok())
        .cloned()
        .ok_or_else(|| RepositoryError::Serialization(format!("missing attribute: {key}")))
}

fn get_string_or_default(item: &Item, key: &str) -> String {
    item.get(key)
        .and_then(|v| v.as_s().ok())
        .cloned()
        .unwrap_or_default()
}

fn get_datetime(item: &Item, key: &str) -> Result<DateTime<Utc>, RepositoryError> {
    let raw = get_string(item, key)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Serialization(format!("bad timestamp in {key}: {e}")))
}

fn get_optional_date(item: &Item, key: &str) -> Result<Option<NaiveDate>, RepositoryError> {
    match item.get(key).and_then(|v| v.as_s().ok()) {
        Some(raw) => raw
            .parse::<NaiveDate>()
            .map(Some)
            .map_err(|e| RepositoryError::Serialization(format!("bad date in {key}: {e}"))),
        None => Ok(None),
    }
}
