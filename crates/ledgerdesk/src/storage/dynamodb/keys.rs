//! DynamoDB key generation functions.
//!
//! Pure functions for generating partition and sort keys following the
//! single-table design. All functions are sync and have no side effects.

use chrono::{DateTime, SecondsFormat, Utc};

// ============================================================================
// Key prefixes and fixed keys
// ============================================================================

pub const INQUIRY_PREFIX: &str = "INQUIRY#";
pub const LEDGER_PREFIX: &str = "LEDGER#";
pub const MESSAGE_PREFIX: &str = "MESSAGE#";
pub const USER_PREFIX: &str = "USER#";
pub const SERVICE_PREFIX: &str = "SERVICE#";

/// The single summary record of a partition.
pub const META_SK: &str = "META";
/// Fixed partition holding every service-master row.
pub const SERVICE_MASTER_PK: &str = "SERVICE_MASTER";

// Type tags carried on the gsi1/gsi2 type indexes.
pub const INQUIRY_TYPE: &str = "INQUIRY";
pub const LEDGER_TYPE: &str = "LEDGER";
pub const MESSAGE_TAG: &str = "MESSAGE";

// ============================================================================
// Inquiry keys
// ============================================================================

/// Partition key for an inquiry.
///
/// Pattern: `INQUIRY#<id>`
pub fn inquiry_pk(id: &str) -> String {
    format!("{INQUIRY_PREFIX}{id}")
}

/// Sort key for one message in an inquiry thread.
///
/// Pattern: `MESSAGE#<created_at>` with millisecond RFC 3339 timestamps so
/// lexicographic order matches chronological order. Two messages with the
/// same timestamp collide; the later write wins.
pub fn message_sk(created_at: DateTime<Utc>) -> String {
    format!(
        "{MESSAGE_PREFIX}{}",
        created_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}

// ============================================================================
// Ledger keys
// ============================================================================

/// Partition key for a ledger.
///
/// Pattern: `LEDGER#<approval_id>`
pub fn ledger_pk(approval_id: &str) -> String {
    format!("{LEDGER_PREFIX}{approval_id}")
}

/// Sort key for a user attached to a ledger.
///
/// Pattern: `USER#<email>`
pub fn ledger_user_sk(email: &str) -> String {
    format!("{USER_PREFIX}{email}")
}

/// Sort key for a service granted under a ledger.
///
/// Pattern: `SERVICE#<name>`
pub fn ledger_service_sk(name: &str) -> String {
    format!("{SERVICE_PREFIX}{name}")
}

/// Approval id recovered from a ledger partition key.
pub fn approval_id_from_pk(pk: &str) -> &str {
    pk.strip_prefix(LEDGER_PREFIX).unwrap_or(pk)
}

// ============================================================================
// Service master keys
// ============================================================================

/// Sort key for a service-master row.
///
/// Pattern: `SERVICE#<name>`
pub fn service_master_sk(name: &str) -> String {
    format!("{SERVICE_PREFIX}{name}")
}

// ============================================================================
// Index keys
// ============================================================================

/// Owner index key (gsi3pk/gsi4pk) for "mine" queries.
///
/// Pattern: `USER#<email>`
pub fn owner_key(email: &str) -> String {
    format!("{USER_PREFIX}{email}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_inquiry_pk() {
        assert_eq!(inquiry_pk("inq-1"), "INQUIRY#inq-1");
    }

    #[test]
    fn test_message_sk_uses_millisecond_rfc3339() {
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 30, 45).unwrap();
        assert_eq!(message_sk(at), "MESSAGE#2025-06-01T12:30:45.000Z");
    }

    #[test]
    fn test_message_sk_orders_chronologically() {
        let earlier = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();
        assert!(message_sk(earlier) < message_sk(later));
    }

    #[test]
    fn test_ledger_keys() {
        assert_eq!(ledger_pk("APR-42"), "LEDGER#APR-42");
        assert_eq!(ledger_user_sk("taro@example.com"), "USER#taro@example.com");
        assert_eq!(ledger_service_sk("vpn"), "SERVICE#vpn");
    }

    #[test]
    fn test_approval_id_from_pk() {
        assert_eq!(approval_id_from_pk("LEDGER#APR-42"), "APR-42");
        assert_eq!(approval_id_from_pk("APR-42"), "APR-42");
    }

    #[test]
    fn test_service_master_sk() {
        assert_eq!(service_master_sk("vpn"), "SERVICE#vpn");
    }

    #[test]
    fn test_owner_key() {
        assert_eq!(owner_key("taro@example.com"), "USER#taro@example.com");
    }
}
