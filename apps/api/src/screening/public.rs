//! Candidate-facing routes. The path token is the only credential; every
//! credential failure surfaces as the same `AccessDenied` body.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use tracing::debug;

use crate::access::resolve_public;
use crate::access::token::is_well_formed;
use crate::errors::AppError;
use crate::models::session::SessionView;
use crate::screening::handlers::SendMessageRequest;
use crate::screening::prompts::PUBLIC_INSTRUCTIONS;
use crate::screening::service::{IngestOutcome, PublicStatus};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicChatView {
    #[serde(flatten)]
    pub session: SessionView,
    pub instructions: &'static str,
}

/// GET /api/v1/public/chat/:token
pub async fn handle_get_chat(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<PublicChatView>, AppError> {
    let resolved = resolve_public(state.screening.store(), &token, Utc::now()).await?;
    Ok(Json(PublicChatView {
        session: state.screening.view(&resolved),
        instructions: PUBLIC_INSTRUCTIONS,
    }))
}

/// POST /api/v1/public/chat/:token
pub async fn handle_send_message(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<IngestOutcome>, AppError> {
    // Only well-formed tokens get a limiter slot.
    if !is_well_formed(&token) {
        debug!("Public token rejected: malformed");
        return Err(AppError::AccessDenied);
    }
    if !state.rate_limiter.check(&format!("public_chat:{token}")).await? {
        debug!("Public chat message rate limited");
        return Err(AppError::RateLimited);
    }
    let resolved = resolve_public(state.screening.store(), &token, Utc::now()).await?;
    let outcome = state
        .screening
        .ingest_message(&resolved, &req.content)
        .await?;
    Ok(Json(outcome))
}

/// GET /api/v1/public/chat/:token/status
pub async fn handle_status(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<PublicStatus>, AppError> {
    let resolved = resolve_public(state.screening.store(), &token, Utc::now()).await?;
    Ok(Json(state.screening.status(&resolved)))
}
