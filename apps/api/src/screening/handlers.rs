use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::access::bearer::Bearer;
use crate::access::resolve_authenticated;
use crate::errors::AppError;
use crate::models::session::SessionView;
use crate::screening::service::{IngestOutcome, StartOutcome};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    /// Defaults to the job the candidate applied for.
    pub job_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    #[serde(alias = "message")]
    pub content: String,
}

/// POST /api/v1/candidates/:candidate_id/screening
pub async fn handle_start(
    State(state): State<AppState>,
    Bearer(claims): Bearer,
    Path(candidate_id): Path<Uuid>,
    body: Option<Json<StartRequest>>,
) -> Result<(StatusCode, Json<StartOutcome>), AppError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let outcome = state
        .screening
        .start(&claims, candidate_id, req.job_id)
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// GET /api/v1/screening/:session_id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Bearer(claims): Bearer,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let resolved = resolve_authenticated(state.screening.store(), &claims, session_id).await?;
    Ok(Json(state.screening.view(&resolved)))
}

/// POST /api/v1/screening/:session_id/messages
pub async fn handle_send_message(
    State(state): State<AppState>,
    Bearer(claims): Bearer,
    Path(session_id): Path<Uuid>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<IngestOutcome>, AppError> {
    let resolved = resolve_authenticated(state.screening.store(), &claims, session_id).await?;
    let outcome = state
        .screening
        .ingest_message(&resolved, &req.content)
        .await?;
    Ok(Json(outcome))
}

/// POST /api/v1/screening/:session_id/close
pub async fn handle_close(
    State(state): State<AppState>,
    Bearer(claims): Bearer,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let resolved = resolve_authenticated(state.screening.store(), &claims, session_id).await?;
    Ok(Json(state.screening.close(&resolved).await?))
}
