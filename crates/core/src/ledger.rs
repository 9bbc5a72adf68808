//! Ledger (approval record) types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The single META record summarizing a ledger.
///
/// A ledger is identified by the approval id of the request that created it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerMeta {
    pub approval_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user attached to a ledger, keyed by email within the partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerUser {
    pub email: String,
    pub last_name: String,
    pub first_name: String,
    pub section: String,
    pub department: String,
    #[serde(default)]
    pub is_manager: bool,
    /// First day the grant is effective.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    /// Last day the grant is effective; open-ended when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

/// A service granted under a ledger, keyed by service name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceGrant {
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub url: String,
}

/// Full view of a ledger: META plus its user and service children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerDetail {
    #[serde(flatten)]
    pub meta: LedgerMeta,
    pub users: Vec<LedgerUser>,
    pub allowed_services: Vec<ServiceGrant>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_lifecycle_dates_are_optional() {
        let user: LedgerUser = serde_json::from_str(
            r#"{
                "email": "taro@example.com",
                "last_name": "Yamada",
                "first_name": "Taro",
                "section": "Infra",
                "department": "IT"
            }"#,
        )
        .unwrap();

        assert!(!user.is_manager);
        assert!(user.start_date.is_none());

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("start_date").is_none());
        assert!(json.get("end_date").is_none());
    }

    #[test]
    fn test_detail_flattens_meta() {
        let detail = LedgerDetail {
            meta: LedgerMeta {
                approval_id: "APR-42".to_string(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            users: vec![],
            allowed_services: vec![],
        };

        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["approval_id"], "APR-42");
        assert!(json["users"].as_array().unwrap().is_empty());
        assert!(json["allowed_services"].as_array().unwrap().is_empty());
    }
}
