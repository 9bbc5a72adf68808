//! Ledger (approval record) handlers.
//!
//! Ledger creation and service grants are admin-only. Creation writes the
//! META record first and then each user and service child independently;
//! the per-item outcome goes back to the client so a partial write is
//! visible rather than silently half-applied.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Deserialize;

use ledgerdesk_core::batch::BatchOutcome;
use ledgerdesk_core::ledger::{LedgerDetail, LedgerMeta, LedgerUser, ServiceGrant};
use ledgerdesk_core::storage::RepositoryError;

use crate::{
    context::RequestContext,
    handlers::{forbidden, AppError},
    state::AppState,
};

/// Request body for creating a ledger with its initial children.
#[derive(Debug, Deserialize)]
pub struct CreateLedger {
    pub approval_id: String,
    #[serde(default)]
    pub users: Vec<LedgerUser>,
    #[serde(default)]
    pub allowed_services: Vec<ServiceGrant>,
}

#[derive(Debug, Deserialize)]
pub struct ManagedByQuery {
    pub email: String,
}

/// List ledgers (GET /ledgers).
///
/// Admins get every ledger via the type index; other callers get the
/// ledgers they manage.
pub async fn list_ledgers(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> Result<Json<Vec<LedgerMeta>>, AppError> {
    let metas = if ctx.caller.is_admin() {
        state.ledgers.list_all().await?
    } else {
        state.ledgers.list_managed(&ctx.caller.email).await?
    };
    Ok(Json(metas))
}

/// Create a ledger with users and service grants (POST /ledgers).
///
/// Admin only. The META write must land; a failure there aborts with 500.
/// Children are then written best effort: 201 when every item landed, 207
/// with the outcome listing the failures otherwise.
pub async fn create_ledger(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(body): Json<CreateLedger>,
) -> Result<Response, AppError> {
    if !ctx.caller.is_admin() {
        return Ok(forbidden());
    }

    let now = Utc::now();
    let meta = LedgerMeta {
        approval_id: body.approval_id,
        created_at: now,
        updated_at: now,
    };

    if let Err(e) = state.ledgers.create_meta(&meta).await {
        tracing::error!(approval_id = %meta.approval_id, error = %e, "ledger meta write failed");
        let mut outcome = BatchOutcome::new();
        outcome.fail("META", &e);
        return Ok((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({
                "error": format!("failed to create ledger {}", meta.approval_id),
                "outcome": outcome,
            })),
        )
            .into_response());
    }

    let mut outcome = BatchOutcome::new();
    for user in &body.users {
        match state.ledgers.put_user(&meta.approval_id, user).await {
            Ok(()) => outcome.ok(&user.email),
            Err(e) => outcome.fail(&user.email, e),
        }
    }
    for grant in &body.allowed_services {
        match state.ledgers.put_service(&meta.approval_id, grant).await {
            Ok(()) => outcome.ok(&grant.name),
            Err(e) => outcome.fail(&grant.name, e),
        }
    }

    let status = if outcome.is_complete() {
        StatusCode::CREATED
    } else {
        StatusCode::MULTI_STATUS
    };
    tracing::info!(
        approval_id = %meta.approval_id,
        succeeded = outcome.succeeded.len(),
        failed = outcome.failed.len(),
        "created ledger"
    );
    Ok((
        status,
        Json(serde_json::json!({
            "approval_id": meta.approval_id,
            "outcome": outcome,
        })),
    )
        .into_response())
}

/// Approval ids managed by a user (GET /ledgers/managed-by?email=).
pub async fn managed_by(
    State(state): State<AppState>,
    Query(query): Query<ManagedByQuery>,
) -> Result<Json<Vec<String>>, AppError> {
    let ids = state.ledgers.managed_ids(&query.email).await?;
    Ok(Json(ids))
}

/// Fetch one ledger with users and service grants (GET /ledgers/{approval_id}).
pub async fn get_ledger(
    State(state): State<AppState>,
    Path(approval_id): Path<String>,
) -> Result<Json<LedgerDetail>, AppError> {
    let detail = state
        .ledgers
        .get_detail(&approval_id)
        .await?
        .ok_or_else(|| RepositoryError::NotFound {
            entity_type: "Ledger",
            id: approval_id.clone(),
        })?;
    Ok(Json(detail))
}

/// Upsert a user on a ledger (POST /ledgers/{approval_id}/users).
pub async fn put_ledger_user(
    State(state): State<AppState>,
    Path(approval_id): Path<String>,
    Json(user): Json<LedgerUser>,
) -> Result<(StatusCode, Json<LedgerUser>), AppError> {
    state.ledgers.put_user(&approval_id, &user).await?;
    tracing::info!(approval_id = %approval_id, email = %user.email, "upserted ledger user");
    Ok((StatusCode::CREATED, Json(user)))
}

/// Upsert a service grant on a ledger (POST /ledgers/{approval_id}/services).
///
/// Admin only.
pub async fn put_ledger_service(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(approval_id): Path<String>,
    Json(grant): Json<ServiceGrant>,
) -> Result<Response, AppError> {
    if !ctx.caller.is_admin() {
        return Ok(forbidden());
    }

    state.ledgers.put_service(&approval_id, &grant).await?;
    tracing::info!(approval_id = %approval_id, service = %grant.name, "upserted service grant");
    Ok((StatusCode::CREATED, Json(grant)).into_response())
}
