//! Axum extractor for RequestContext.
//!
//! The caller identity comes from the JWT the API gateway attaches to the
//! `Authorization` header. Signature verification happens at the gateway;
//! this adapter only decodes the claims payload. A missing or malformed
//! token yields the anonymous caller rather than a rejection, mirroring how
//! the handlers treat identity as coarse scoping input.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use ledgerdesk_core::identity::Caller;
use serde::Deserialize;
use uuid::Uuid;

use super::types::{RequestContext, RequestId};

/// Group claims arrive either as a JSON array (ID token) or as the
/// comma-joined string the gateway context flattens them into.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GroupsClaim {
    List(Vec<String>),
    Csv(String),
}

impl GroupsClaim {
    fn into_vec(self) -> Vec<String> {
        match self {
            GroupsClaim::List(groups) => groups,
            GroupsClaim::Csv(csv) => csv
                .split(',')
                .map(str::trim)
                .filter(|g| !g.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    #[serde(default)]
    email: String,
    #[serde(default)]
    given_name: String,
    #[serde(default)]
    family_name: String,
    #[serde(default, rename = "cognito:username")]
    username: String,
    #[serde(default, rename = "cognito:groups")]
    groups: Option<GroupsClaim>,
}

impl From<IdTokenClaims> for Caller {
    fn from(claims: IdTokenClaims) -> Self {
        Caller {
            email: claims.email,
            given_name: claims.given_name,
            family_name: claims.family_name,
            username: claims.username,
            groups: claims.groups.map(GroupsClaim::into_vec).unwrap_or_default(),
        }
    }
}

fn extract_caller(headers: &HeaderMap) -> Caller {
    let Some(token) = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    else {
        return Caller::default();
    };

    decode_claims(token).unwrap_or_default()
}

/// Decodes the claims payload of a JWT without verifying the signature.
fn decode_claims(token: &str) -> Option<Caller> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let claims: IdTokenClaims = serde_json::from_slice(&bytes).ok()?;
    Some(claims.into())
}

fn extract_request_id(headers: &HeaderMap) -> RequestId {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .map(RequestId::from_uuid)
        .unwrap_or_else(RequestId::new)
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(RequestContext {
            caller: extract_caller(&parts.headers),
            request_id: extract_request_id(&parts.headers),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testutil::token_with_claims;

    fn headers_with_token(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", format!("Bearer {token}").parse().unwrap());
        headers
    }

    #[test]
    fn test_caller_from_id_token_claims() {
        let token = token_with_claims(serde_json::json!({
            "email": "taro@example.com",
            "given_name": "Taro",
            "family_name": "Yamada",
            "cognito:username": "taro",
            "cognito:groups": ["admin", "staff"],
        }));

        let caller = extract_caller(&headers_with_token(&token));
        assert_eq!(caller.email, "taro@example.com");
        assert_eq!(caller.username, "taro");
        assert!(caller.is_admin());
    }

    #[test]
    fn test_groups_as_csv_string() {
        let token = token_with_claims(serde_json::json!({
            "email": "taro@example.com",
            "cognito:groups": "staff, admin",
        }));

        let caller = extract_caller(&headers_with_token(&token));
        assert_eq!(caller.groups, vec!["staff", "admin"]);
        assert!(caller.is_admin());
    }

    #[test]
    fn test_missing_header_is_anonymous() {
        let caller = extract_caller(&HeaderMap::new());
        assert_eq!(caller, Caller::default());
        assert!(!caller.is_admin());
    }

    #[test]
    fn test_garbage_token_is_anonymous() {
        let caller = extract_caller(&headers_with_token("not-a-jwt"));
        assert_eq!(caller, Caller::default());
    }

    #[test]
    fn test_extract_request_id_from_header() {
        let mut headers = HeaderMap::new();
        let id = "550e8400-e29b-41d4-a716-446655440000";
        headers.insert("x-request-id", id.parse().unwrap());

        let request_id = extract_request_id(&headers);
        assert_eq!(request_id.to_string(), id);
    }

    #[test]
    fn test_extract_request_id_generates_when_missing() {
        let request_id = extract_request_id(&HeaderMap::new());
        Uuid::parse_str(&request_id.to_string()).expect("should be a valid UUID");
    }
}
