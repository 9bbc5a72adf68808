//! Service master types and the spreadsheet row filter.
//!
//! The service master is reference data: the full set of services users can
//! be granted, replaced wholesale each time an uploaded spreadsheet is
//! applied.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Blob-store key space for service-master spreadsheets.
pub const MASTER_PREFIX: &str = "service-masters/";
/// Where the UI drops new spreadsheets.
pub const UPLOADS_PREFIX: &str = "service-masters/uploads/";
/// The currently applied spreadsheet (at most one file).
pub const LATEST_PREFIX: &str = "service-masters/latest/";
/// Superseded spreadsheets, timestamped on archive.
pub const ARCHIVE_PREFIX: &str = "service-masters/archive/";

/// Longest service name accepted from a spreadsheet row.
pub const MAX_SERVICE_NAME_LEN: usize = 50;

/// One row of the service master.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEntry {
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Projection of a [`ServiceEntry`] to display fields only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSummary {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub url: String,
}

impl From<ServiceEntry> for ServiceSummary {
    fn from(entry: ServiceEntry) -> Self {
        Self {
            name: entry.name,
            display_name: entry.display_name,
            description: entry.description,
            url: entry.url,
        }
    }
}

/// A raw spreadsheet row before filtering, as read from the first worksheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MasterRow {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub url: String,
}

/// Converts raw spreadsheet rows into service-master entries.
///
/// Rows with an empty name or a name longer than [`MAX_SERVICE_NAME_LEN`]
/// characters are dropped. A blank display name falls back to the service
/// name. Row order is preserved as read.
pub fn entries_from_rows(rows: Vec<MasterRow>, uploaded_at: DateTime<Utc>) -> Vec<ServiceEntry> {
    rows.into_iter()
        .filter(|row| !row.name.is_empty() && row.name.chars().count() <= MAX_SERVICE_NAME_LEN)
        .map(|row| ServiceEntry {
            display_name: if row.display_name.is_empty() {
                row.name.clone()
            } else {
                row.display_name
            },
            name: row.name,
            description: row.description,
            url: row.url,
            uploaded_at,
        })
        .collect()
}

/// Whether `key` points inside the service-master key space.
pub fn is_master_key(key: &str) -> bool {
    key.starts_with(MASTER_PREFIX)
}

/// Whether `key` points to an uploaded (not yet applied) spreadsheet.
pub fn is_upload_key(key: &str) -> bool {
    key.starts_with(UPLOADS_PREFIX) && key.len() > UPLOADS_PREFIX.len()
}

/// The bare file name of a blob key (everything after the last `/`).
pub fn file_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str) -> MasterRow {
        MasterRow {
            name: name.to_string(),
            display_name: String::new(),
            description: "desc".to_string(),
            url: "https://example.com".to_string(),
        }
    }

    #[test]
    fn test_rows_without_name_are_dropped() {
        let entries = entries_from_rows(vec![row(""), row("vpn")], Utc::now());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "vpn");
    }

    #[test]
    fn test_name_length_bound() {
        let at_limit = "a".repeat(MAX_SERVICE_NAME_LEN);
        let over_limit = "a".repeat(MAX_SERVICE_NAME_LEN + 1);
        let entries = entries_from_rows(vec![row(&at_limit), row(&over_limit)], Utc::now());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, at_limit);
    }

    #[test]
    fn test_blank_display_name_falls_back_to_name() {
        let entries = entries_from_rows(vec![row("vpn")], Utc::now());
        assert_eq!(entries[0].display_name, "vpn");

        let named = MasterRow {
            display_name: "Corporate VPN".to_string(),
            ..row("vpn")
        };
        let entries = entries_from_rows(vec![named], Utc::now());
        assert_eq!(entries[0].display_name, "Corporate VPN");
    }

    #[test]
    fn test_key_space_checks() {
        assert!(is_master_key("service-masters/latest/m.xlsx"));
        assert!(!is_master_key("uploads/m.xlsx"));
        assert!(is_upload_key("service-masters/uploads/m.xlsx"));
        assert!(!is_upload_key("service-masters/uploads/"));
        assert!(!is_upload_key("service-masters/latest/m.xlsx"));
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("service-masters/uploads/m.xlsx"), "m.xlsx");
        assert_eq!(file_name("m.xlsx"), "m.xlsx");
    }

    #[test]
    fn test_summary_projection() {
        let entry = ServiceEntry {
            name: "vpn".to_string(),
            display_name: "Corporate VPN".to_string(),
            description: "remote access".to_string(),
            url: "https://vpn.example.com".to_string(),
            uploaded_at: Utc::now(),
        };
        let summary = ServiceSummary::from(entry);
        assert_eq!(summary.name, "vpn");
        assert_eq!(summary.display_name, "Corporate VPN");
    }
}
