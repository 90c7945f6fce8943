use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::candidate::{CandidateRow, JobPostingRow};
use crate::scoring::ScoreRecord;

const SCORING_TIMEOUT: Duration = Duration::from_secs(5);

/// Source of raw candidate scores.
#[async_trait]
pub trait ScoreProvider: Send + Sync {
    async fn fetch(
        &self,
        candidate: &CandidateRow,
        job: &JobPostingRow,
    ) -> Result<ScoreRecord, AppError>;
}

/// Client for the external scoring service.
pub struct HttpScoreProvider {
    client: Client,
    base_url: String,
}

impl HttpScoreProvider {
    pub fn new(base_url: &str) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(SCORING_TIMEOUT)
            .build()
            .map_err(|e| AppError::Internal(e.into()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ScoreProvider for HttpScoreProvider {
    async fn fetch(
        &self,
        candidate: &CandidateRow,
        job: &JobPostingRow,
    ) -> Result<ScoreRecord, AppError> {
        let url = format!("{}/candidates/{}/score", self.base_url, candidate.id);
        debug!("Fetching score for candidate {} from {url}", candidate.id);

        let response = self
            .client
            .get(&url)
            .query(&[("jobPostingId", job.id.to_string())])
            .send()
            .await
            .map_err(|e| AppError::Transient(format!("scoring service: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Transient(format!(
                "scoring service returned {status}"
            )));
        }
        response
            .json::<ScoreRecord>()
            .await
            .map_err(|e| AppError::Transient(format!("scoring payload: {e}")))
    }
}

/// In-process scores for the memory backend. Unknown candidates have no
/// score yet.
#[derive(Default)]
pub struct MemoryScoreProvider {
    records: RwLock<HashMap<Uuid, ScoreRecord>>,
}

impl MemoryScoreProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, candidate_id: Uuid, record: ScoreRecord) {
        self.records.write().await.insert(candidate_id, record);
    }
}

#[async_trait]
impl ScoreProvider for MemoryScoreProvider {
    async fn fetch(
        &self,
        candidate: &CandidateRow,
        _job: &JobPostingRow,
    ) -> Result<ScoreRecord, AppError> {
        Ok(self
            .records
            .read()
            .await
            .get(&candidate.id)
            .cloned()
            .unwrap_or_default())
    }
}
