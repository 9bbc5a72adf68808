//! Caller identity derived from identity-provider claims.

use serde::{Deserialize, Serialize};

/// Group name that grants administrative privileges.
pub const ADMIN_GROUP: &str = "admin";

/// The identity of the caller for the current request.
///
/// Built once per request by the authentication adapter from the claims the
/// identity provider attached to the request. An anonymous caller carries an
/// empty email and no groups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub email: String,
    #[serde(default)]
    pub given_name: String,
    #[serde(default)]
    pub family_name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub groups: Vec<String>,
}

impl Caller {
    /// Whether the caller belongs to the admin group.
    pub fn is_admin(&self) -> bool {
        self.groups.iter().any(|g| g == ADMIN_GROUP)
    }

    /// Display name for message attribution; falls back to the email.
    pub fn display_name(&self) -> String {
        if self.given_name.is_empty() && self.family_name.is_empty() {
            self.email.clone()
        } else {
            format!("{} {}", self.family_name, self.given_name)
                .trim()
                .to_string()
        }
    }
}
