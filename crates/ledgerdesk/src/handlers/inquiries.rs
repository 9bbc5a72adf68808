//! Inquiry (support ticket) handlers.
//!
//! Listing is scoped by the caller: admins see every inquiry, everyone else
//! sees only their own. Message attribution comes from the caller identity,
//! never from the request body.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use ledgerdesk_core::identity::Caller;
use ledgerdesk_core::inquiry::{Attachment, InquiryDetail, InquiryMeta, InquiryStatus, Message};
use ledgerdesk_core::storage::RepositoryError;

use crate::{context::RequestContext, handlers::AppError, state::AppState};

/// A message as submitted by the client. Sender fields are filled in from
/// the caller identity. A `created_at` is accepted so re-posting an existing
/// message (same timestamp) can update its reactions.
#[derive(Debug, Deserialize)]
pub struct NewMessage {
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub reactions: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl NewMessage {
    fn into_message(self, caller: &Caller, now: DateTime<Utc>) -> Message {
        Message {
            sender: caller.display_name(),
            sender_email: caller.email.clone(),
            sender_role: if caller.is_admin() { "admin" } else { "user" }.to_string(),
            content: self.content,
            created_at: self.created_at.unwrap_or(now),
            attachments: self.attachments,
            reactions: self.reactions,
        }
    }
}

/// Request body for creating an inquiry.
#[derive(Debug, Deserialize)]
pub struct CreateInquiry {
    /// Client-supplied id; generated when absent.
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    /// Initial thread, usually a single message.
    #[serde(default)]
    pub messages: Vec<NewMessage>,
}

/// Request body for updating an inquiry's status.
#[derive(Debug, Deserialize)]
pub struct UpdateInquiryStatus {
    pub status: InquiryStatus,
}

/// List inquiries (GET /inquiries).
///
/// Admins get every inquiry via the type index; other callers get the
/// inquiries they own via the owner index.
pub async fn list_inquiries(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> Result<Json<Vec<InquiryMeta>>, AppError> {
    let metas = if ctx.caller.is_admin() {
        state.inquiries.list_all().await?
    } else {
        state.inquiries.list_for_owner(&ctx.caller.email).await?
    };
    Ok(Json(metas))
}

/// Create an inquiry with its initial messages (POST /inquiries).
pub async fn create_inquiry(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(body): Json<CreateInquiry>,
) -> Result<(StatusCode, Json<InquiryMeta>), AppError> {
    let now = Utc::now();
    let meta = InquiryMeta {
        id: body.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
        status: InquiryStatus::Open,
        title: body.title,
        created_at: now,
        updated_at: now,
    };
    let messages: Vec<Message> = body
        .messages
        .into_iter()
        .map(|m| m.into_message(&ctx.caller, now))
        .collect();

    state
        .inquiries
        .create(&meta, &messages, &ctx.caller.email)
        .await?;

    tracing::info!(id = %meta.id, messages = messages.len(), "created inquiry");
    Ok((StatusCode::CREATED, Json(meta)))
}

/// Fetch one inquiry with its message thread (GET /inquiries/{id}).
pub async fn get_inquiry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<InquiryDetail>, AppError> {
    let detail = state
        .inquiries
        .get_detail(&id)
        .await?
        .ok_or_else(|| RepositoryError::NotFound {
            entity_type: "Inquiry",
            id: id.clone(),
        })?;
    Ok(Json(detail))
}

/// Update an inquiry's status (POST /inquiries/{id}).
///
/// Conditional on the META record existing; a status update must never
/// fabricate an inquiry, so a missing id is a plain 404.
pub async fn update_inquiry_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateInquiryStatus>,
) -> Result<Json<InquiryMeta>, AppError> {
    let now = Utc::now();
    state.inquiries.update_status(&id, body.status, now).await?;

    let meta = state
        .inquiries
        .get_meta(&id)
        .await?
        .ok_or_else(|| RepositoryError::NotFound {
            entity_type: "Inquiry",
            id: id.clone(),
        })?;

    tracing::info!(id = %id, status = %body.status, "updated inquiry status");
    Ok(Json(meta))
}

/// Append a message to an inquiry thread (POST /inquiries/{id}/messages).
///
/// The META `updated_at` bump is best effort inside the repository.
pub async fn append_message(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<NewMessage>,
) -> Result<(StatusCode, Json<Message>), AppError> {
    let message = body.into_message(&ctx.caller, Utc::now());
    state
        .inquiries
        .append_message(&id, &message, &ctx.caller.email)
        .await?;

    tracing::info!(id = %id, sender = %message.sender_email, "appended inquiry message");
    Ok((StatusCode::CREATED, Json(message)))
}
