//! Inquiry (support ticket) types.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of an inquiry.
///
/// Transitions are bidirectional; the rule that only privileged users may
/// reopen a closed inquiry is a UI convention and is not enforced here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InquiryStatus {
    Open,
    Closed,
}

impl fmt::Display for InquiryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InquiryStatus::Open => write!(f, "open"),
            InquiryStatus::Closed => write!(f, "closed"),
        }
    }
}

impl FromStr for InquiryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(InquiryStatus::Open),
            "closed" => Ok(InquiryStatus::Closed),
            other => Err(format!("unknown inquiry status: {other}")),
        }
    }
}

/// The single META record summarizing an inquiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InquiryMeta {
    pub id: String,
    pub status: InquiryStatus,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A file attached to a message, stored in the blob store and referenced by
/// path only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub file_name: String,
    pub path: String,
    #[serde(default)]
    pub content_type: String,
}

/// One message in an inquiry thread.
///
/// The `created_at` timestamp doubles as the sort-key discriminator, so two
/// messages written with the same timestamp silently collide (last writer
/// wins). Re-posting a message with an existing timestamp overwrites it,
/// which is how reaction updates are applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: String,
    #[serde(default)]
    pub sender_email: String,
    #[serde(default)]
    pub sender_role: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Reaction emoji mapped to the emails of users who reacted.
    #[serde(default)]
    pub reactions: BTreeMap<String, Vec<String>>,
}

/// Full view of an inquiry: the META record plus its message thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InquiryDetail {
    #[serde(flatten)]
    pub meta: InquiryMeta,
    pub messages: Vec<Message>,
}
