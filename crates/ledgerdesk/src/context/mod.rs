//! Request-scoped context: caller identity and request id.

mod extractor;
mod types;

pub use types::{RequestContext, RequestId};

#[cfg(test)]
pub(crate) mod testutil {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    /// Builds an unsigned JWT with the given JSON claims payload, shaped
    /// like the tokens the gateway forwards after verification.
    pub(crate) fn token_with_claims(claims: serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());
        format!("{header}.{payload}.")
    }

    /// Claims payload for an admin-group member.
    pub(crate) fn admin_token() -> String {
        token_with_claims(serde_json::json!({
            "email": "admin@example.com",
            "given_name": "Admin",
            "family_name": "User",
            "cognito:username": "admin",
            "cognito:groups": ["admin"],
        }))
    }

    /// Claims payload for a regular (non-admin) user.
    pub(crate) fn user_token(email: &str) -> String {
        token_with_claims(serde_json::json!({
            "email": email,
            "cognito:username": email,
            "cognito:groups": [],
        }))
    }
}
