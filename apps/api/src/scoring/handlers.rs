use axum::{
    extract::{Path, State},
    Json,
};
use tracing::warn;
use uuid::Uuid;

use crate::access::bearer::Bearer;
use crate::errors::AppError;
use crate::scoring::ScoreView;
use crate::state::AppState;

/// GET /api/v1/candidates/:candidate_id/ai-score
///
/// Scoring service failures degrade to an `unavailable` score; only access
/// and lookup failures are errors.
pub async fn handle_get_score(
    State(state): State<AppState>,
    Bearer(claims): Bearer,
    Path(candidate_id): Path<Uuid>,
) -> Result<Json<ScoreView>, AppError> {
    let (candidate, job) = state
        .screening
        .authorize_candidate(&claims, candidate_id, None)
        .await?;

    let record = match state.scores.fetch(&candidate, &job).await {
        Ok(record) => Some(record),
        Err(e) => {
            warn!("Score lookup for candidate {candidate_id} failed: {e}");
            None
        }
    };
    Ok(Json(ScoreView::build(
        candidate.id,
        &candidate.name,
        record.as_ref(),
    )))
}
