use std::time::Duration;

use axum::{
    http::{header, Method, StatusCode},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::{
    handlers::{
        health::livez,
        inquiries::{
            append_message, create_inquiry, get_inquiry, list_inquiries, update_inquiry_status,
        },
        ledgers::{
            create_ledger, get_ledger, list_ledgers, managed_by, put_ledger_service,
            put_ledger_user,
        },
        services::{
            apply_master_upload, list_master_latest, list_master_uploads, list_services,
            presign_master,
        },
    },
    state::AppState,
};

/// Create the application router with all routes and middleware.
pub fn create_app(state: AppState) -> Router {
    // The gateway in front of this service terminates auth; CORS here only
    // needs to let the UI origin through with its bearer token.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let api_routes = Router::new()
        // Inquiry routes
        .route("/inquiries", get(list_inquiries).post(create_inquiry))
        .route(
            "/inquiries/{id}",
            get(get_inquiry).post(update_inquiry_status),
        )
        .route("/inquiries/{id}/messages", post(append_message))
        // Ledger routes
        .route("/ledgers", get(list_ledgers).post(create_ledger))
        .route("/ledgers/managed-by", get(managed_by))
        .route("/ledgers/{approval_id}", get(get_ledger))
        .route("/ledgers/{approval_id}/users", post(put_ledger_user))
        .route("/ledgers/{approval_id}/services", post(put_ledger_service))
        // Service-master routes
        .route("/services", get(list_services))
        .route(
            "/services/master",
            get(presign_master).post(apply_master_upload),
        )
        .route("/services/master/uploads", get(list_master_uploads))
        .route("/services/master/latest", get(list_master_latest))
        .layer(cors);

    Router::new()
        .route("/livez", get(livez))
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(10),
        ))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{body::Body, http::Request};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use ledgerdesk_core::blob::BlobStore;
    use ledgerdesk_core::ledger::{LedgerDetail, LedgerMeta, LedgerUser, ServiceGrant};
    use ledgerdesk_core::storage::{LedgerRepository, RepositoryError, Result as RepoResult};

    use crate::blob::inmemory::InMemoryBlobStore;
    use crate::config::Config;
    use crate::context::testutil::{admin_token, user_token};
    use crate::state::AppState;
    use crate::storage::inmemory::InMemoryRepository;

    fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    fn post_request(uri: &str, token: Option<&str>, body: serde_json::Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_livez() {
        let app = create_app(AppState::for_tests());

        let response = app.oneshot(get_request("/livez", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_inquiry_detail_returns_created_and_appended_messages() {
        let app = create_app(AppState::for_tests());
        let token = user_token("taro@example.com");

        let response = app
            .clone()
            .oneshot(post_request(
                "/inquiries",
                Some(&token),
                serde_json::json!({
                    "title": "VPN access",
                    "messages": [{ "content": "Please grant VPN access." }],
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let meta = json_body(response).await;
        let id = meta["id"].as_str().unwrap().to_string();
        assert_eq!(meta["status"], "open");

        let response = app
            .clone()
            .oneshot(post_request(
                &format!("/inquiries/{id}/messages"),
                Some(&token),
                serde_json::json!({ "content": "Any update on this?" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .oneshot(get_request(&format!("/inquiries/{id}"), Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let detail = json_body(response).await;
        let messages = detail["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["content"], "Please grant VPN access.");
        assert_eq!(messages[1]["content"], "Any update on this?");
        assert_eq!(messages[0]["sender_email"], "taro@example.com");
    }

    #[tokio::test]
    async fn test_inquiry_listing_is_scoped_to_the_caller() {
        let app = create_app(AppState::for_tests());
        let taro = user_token("taro@example.com");
        let hanako = user_token("hanako@example.com");

        for (token, title) in [(&taro, "VPN access"), (&hanako, "New laptop")] {
            let response = app
                .clone()
                .oneshot(post_request(
                    "/inquiries",
                    Some(token),
                    serde_json::json!({ "title": title }),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        let response = app
            .clone()
            .oneshot(get_request("/inquiries", Some(&taro)))
            .await
            .unwrap();
        let mine = json_body(response).await;
        assert_eq!(mine.as_array().unwrap().len(), 1);
        assert_eq!(mine[0]["title"], "VPN access");

        let response = app
            .oneshot(get_request("/inquiries", Some(&admin_token())))
            .await
            .unwrap();
        let all = json_body(response).await;
        assert_eq!(all.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_status_update_on_missing_inquiry_leaves_no_record() {
        let app = create_app(AppState::for_tests());
        let token = user_token("taro@example.com");

        let response = app
            .clone()
            .oneshot(post_request(
                "/inquiries/no-such-id",
                Some(&token),
                serde_json::json!({ "status": "closed" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().contains("no-such-id"));

        // Nothing was fabricated by the failed update.
        let response = app
            .oneshot(get_request("/inquiries", Some(&admin_token())))
            .await
            .unwrap();
        assert!(json_body(response).await.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_status_update_round_trip() {
        let app = create_app(AppState::for_tests());
        let token = user_token("taro@example.com");

        let response = app
            .clone()
            .oneshot(post_request(
                "/inquiries",
                Some(&token),
                serde_json::json!({ "id": "inq-1", "title": "VPN access" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .oneshot(post_request(
                "/inquiries/inq-1",
                Some(&token),
                serde_json::json!({ "status": "closed" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "closed");
    }

    #[tokio::test]
    async fn test_non_admin_ledger_create_is_forbidden_and_writes_nothing() {
        let app = create_app(AppState::for_tests());

        let response = app
            .clone()
            .oneshot(post_request(
                "/ledgers",
                Some(&user_token("taro@example.com")),
                serde_json::json!({ "approval_id": "APR-1" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .oneshot(get_request("/ledgers", Some(&admin_token())))
            .await
            .unwrap();
        assert!(json_body(response).await.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_anonymous_caller_is_not_admin() {
        let app = create_app(AppState::for_tests());

        let response = app
            .oneshot(post_request(
                "/ledgers",
                None,
                serde_json::json!({ "approval_id": "APR-1" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_ledger_create_and_detail_round_trip() {
        let app = create_app(AppState::for_tests());
        let token = admin_token();

        let response = app
            .clone()
            .oneshot(post_request(
                "/ledgers",
                Some(&token),
                serde_json::json!({
                    "approval_id": "APR-42",
                    "users": [{
                        "email": "taro@example.com",
                        "last_name": "Yamada",
                        "first_name": "Taro",
                        "section": "Infra",
                        "department": "IT",
                        "is_manager": true,
                    }],
                    "allowed_services": [{
                        "name": "vpn",
                        "display_name": "Corporate VPN",
                    }],
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert_eq!(body["outcome"]["succeeded"].as_array().unwrap().len(), 2);

        let response = app
            .clone()
            .oneshot(get_request("/ledgers/APR-42", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let detail = json_body(response).await;
        assert_eq!(detail["approval_id"], "APR-42");
        assert_eq!(detail["users"][0]["email"], "taro@example.com");
        assert_eq!(detail["allowed_services"][0]["name"], "vpn");

        // The manager shows up in managed-by and in their own listing.
        let response = app
            .clone()
            .oneshot(get_request(
                "/ledgers/managed-by?email=taro@example.com",
                Some(&token),
            ))
            .await
            .unwrap();
        assert_eq!(json_body(response).await, serde_json::json!(["APR-42"]));

        let response = app
            .oneshot(get_request(
                "/ledgers",
                Some(&user_token("taro@example.com")),
            ))
            .await
            .unwrap();
        let managed = json_body(response).await;
        assert_eq!(managed.as_array().unwrap().len(), 1);
        assert_eq!(managed[0]["approval_id"], "APR-42");
    }

    /// Delegating ledger backend that rejects writes for chosen user emails.
    struct RejectingLedgers {
        inner: Arc<InMemoryRepository>,
        reject: Vec<String>,
    }

    #[async_trait]
    impl LedgerRepository for RejectingLedgers {
        async fn get_detail(&self, approval_id: &str) -> RepoResult<Option<LedgerDetail>> {
            self.inner.get_detail(approval_id).await
        }

        async fn list_all(&self) -> RepoResult<Vec<LedgerMeta>> {
            self.inner.list_all().await
        }

        async fn list_managed(&self, email: &str) -> RepoResult<Vec<LedgerMeta>> {
            self.inner.list_managed(email).await
        }

        async fn managed_ids(&self, email: &str) -> RepoResult<Vec<String>> {
            self.inner.managed_ids(email).await
        }

        async fn create_meta(&self, meta: &LedgerMeta) -> RepoResult<()> {
            self.inner.create_meta(meta).await
        }

        async fn put_user(&self, approval_id: &str, user: &LedgerUser) -> RepoResult<()> {
            if self.reject.contains(&user.email) {
                return Err(RepositoryError::QueryFailed(
                    "throughput exceeded".to_string(),
                ));
            }
            self.inner.put_user(approval_id, user).await
        }

        async fn put_service(&self, approval_id: &str, grant: &ServiceGrant) -> RepoResult<()> {
            self.inner.put_service(approval_id, grant).await
        }
    }

    #[tokio::test]
    async fn test_partial_ledger_create_reports_the_failures() {
        let repo = Arc::new(InMemoryRepository::new());
        let ledgers = Arc::new(RejectingLedgers {
            inner: repo.clone(),
            reject: vec!["jiro@example.com".to_string()],
        });
        let state = AppState::new(
            repo.clone(),
            ledgers,
            repo,
            Arc::new(InMemoryBlobStore::new()),
            test_config(),
        );
        let app = create_app(state);

        let user = |email: &str| {
            serde_json::json!({
                "email": email,
                "last_name": "Yamada",
                "first_name": "Taro",
                "section": "Infra",
                "department": "IT",
            })
        };
        let response = app
            .clone()
            .oneshot(post_request(
                "/ledgers",
                Some(&admin_token()),
                serde_json::json!({
                    "approval_id": "APR-7",
                    "users": [
                        user("taro@example.com"),
                        user("jiro@example.com"),
                        user("hanako@example.com"),
                    ],
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::MULTI_STATUS);
        let body = json_body(response).await;
        assert_eq!(body["outcome"]["succeeded"].as_array().unwrap().len(), 2);
        assert_eq!(body["outcome"]["failed"][0]["key"], "jiro@example.com");

        // Meta and the writable users persisted despite the failure.
        let response = app
            .oneshot(get_request("/ledgers/APR-7", Some(&admin_token())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let detail = json_body(response).await;
        assert_eq!(detail["users"].as_array().unwrap().len(), 2);
    }

    fn test_config() -> Config {
        Config {
            table_name: "test".to_string(),
            bucket_name: "test".to_string(),
            presign_ttl_seconds: 300,
        }
    }

    fn state_with_blobs(blobs: InMemoryBlobStore) -> AppState {
        let repo = Arc::new(InMemoryRepository::new());
        AppState::new(
            repo.clone(),
            repo.clone(),
            repo,
            Arc::new(blobs),
            test_config(),
        )
    }

    #[tokio::test]
    async fn test_presign_rejects_keys_outside_the_master_space() {
        let app = create_app(AppState::for_tests());

        let response = app
            .oneshot(get_request(
                "/services/master?key=secrets/prod.env",
                Some(&admin_token()),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().contains("secrets/prod.env"));
    }

    #[tokio::test]
    async fn test_presign_returns_a_url_for_a_master_key() {
        let blobs = InMemoryBlobStore::new();
        blobs
            .put("service-masters/latest/m.xlsx", b"bytes".to_vec())
            .await;
        let app = create_app(state_with_blobs(blobs));

        let response = app
            .oneshot(get_request(
                "/services/master?key=service-masters/latest/m.xlsx",
                Some(&admin_token()),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert!(body["url"]
            .as_str()
            .unwrap()
            .contains("service-masters/latest/m.xlsx"));
    }

    #[tokio::test]
    async fn test_master_listings_are_prefix_scoped() {
        let blobs = InMemoryBlobStore::new();
        blobs
            .put("service-masters/uploads/new.xlsx", b"a".to_vec())
            .await;
        blobs
            .put("service-masters/latest/current.xlsx", b"b".to_vec())
            .await;
        let app = create_app(state_with_blobs(blobs));

        let response = app
            .clone()
            .oneshot(get_request("/services/master/uploads", Some(&admin_token())))
            .await
            .unwrap();
        let uploads = json_body(response).await;
        let files = uploads["files"].as_array().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0]["key"], "service-masters/uploads/new.xlsx");

        let response = app
            .oneshot(get_request("/services/master/latest", Some(&admin_token())))
            .await
            .unwrap();
        let latest = json_body(response).await;
        let files = latest["files"].as_array().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0]["key"], "service-masters/latest/current.xlsx");
    }

    const MASTER_FIXTURE: &[u8] = include_bytes!("../testdata/service_master.xlsx");

    #[tokio::test]
    async fn test_apply_populates_the_service_listing() {
        let blobs = InMemoryBlobStore::new();
        blobs
            .put("service-masters/uploads/m.xlsx", MASTER_FIXTURE.to_vec())
            .await;
        let app = create_app(state_with_blobs(blobs));

        let response = app
            .clone()
            .oneshot(post_request(
                "/services/master",
                Some(&admin_token()),
                serde_json::json!({ "key": "service-masters/uploads/m.xlsx" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let report = json_body(response).await;
        assert_eq!(report["applied_key"], "service-masters/latest/m.xlsx");
        assert_eq!(report["count"], 2);

        // Exactly the rows with a usable name survive; the blank display
        // name fell back to the service name.
        let response = app
            .oneshot(get_request("/services", Some(&admin_token())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let services = json_body(response).await;
        let services = services.as_array().unwrap();
        assert_eq!(services.len(), 2);
        assert_eq!(services[0]["name"], "vpn");
        assert_eq!(services[0]["display_name"], "Corporate VPN");
        assert_eq!(services[1]["name"], "wiki");
        assert_eq!(services[1]["display_name"], "wiki");
    }

    #[tokio::test]
    async fn test_second_apply_archives_the_previous_master() {
        let blobs = InMemoryBlobStore::new();
        blobs
            .put("service-masters/uploads/first.xlsx", MASTER_FIXTURE.to_vec())
            .await;
        blobs
            .put("service-masters/uploads/second.xlsx", MASTER_FIXTURE.to_vec())
            .await;
        let app = create_app(state_with_blobs(blobs.clone()));

        for key in [
            "service-masters/uploads/first.xlsx",
            "service-masters/uploads/second.xlsx",
        ] {
            let response = app
                .clone()
                .oneshot(post_request(
                    "/services/master",
                    Some(&admin_token()),
                    serde_json::json!({ "key": key }),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        // The second file is the sole latest entry; the first was archived
        // exactly once.
        let response = app
            .oneshot(get_request("/services/master/latest", Some(&admin_token())))
            .await
            .unwrap();
        let latest = json_body(response).await;
        let files = latest["files"].as_array().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0]["key"], "service-masters/latest/second.xlsx");

        let archived = blobs
            .list(ledgerdesk_core::service::ARCHIVE_PREFIX)
            .await
            .unwrap();
        assert_eq!(archived.len(), 1);
        assert!(archived[0].key.ends_with("_first.xlsx"));
    }

    #[tokio::test]
    async fn test_apply_rejects_keys_outside_uploads() {
        let app = create_app(AppState::for_tests());

        let response = app
            .oneshot(post_request(
                "/services/master",
                Some(&admin_token()),
                serde_json::json!({ "key": "service-masters/latest/m.xlsx" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_apply_rejects_unparseable_uploads() {
        let blobs = InMemoryBlobStore::new();
        blobs
            .put("service-masters/uploads/m.xlsx", b"not a workbook".to_vec())
            .await;
        let app = create_app(state_with_blobs(blobs));

        let response = app
            .oneshot(post_request(
                "/services/master",
                Some(&admin_token()),
                serde_json::json!({ "key": "service-masters/uploads/m.xlsx" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_services_listing_is_empty_before_any_apply() {
        let app = create_app(AppState::for_tests());

        let response = app
            .oneshot(get_request("/services", Some(&admin_token())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(json_body(response).await.as_array().unwrap().is_empty());
    }
}
