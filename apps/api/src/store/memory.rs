use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use super::{apply_commit, CandidateDirectory, Commit, SessionStore};
use crate::errors::AppError;
use crate::models::candidate::{CandidateRow, JobPostingRow};
use crate::models::session::ChatSession;

/// In-process session store. One mutex guards all sessions, which also
/// serializes appends per session.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<Uuid, ChatSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert(&self, session: &ChatSession) -> Result<(), AppError> {
        let mut sessions = self.sessions.lock().await;
        if sessions.contains_key(&session.session_id) {
            return Err(AppError::Internal(anyhow::anyhow!(
                "session {} already exists",
                session.session_id
            )));
        }
        sessions.insert(session.session_id, session.clone());
        Ok(())
    }

    async fn get(&self, session_id: Uuid) -> Result<Option<ChatSession>, AppError> {
        Ok(self.sessions.lock().await.get(&session_id).cloned())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<ChatSession>, AppError> {
        Ok(self
            .sessions
            .lock()
            .await
            .values()
            .find(|s| s.access_token.as_deref() == Some(token))
            .cloned())
    }

    async fn commit(&self, session_id: Uuid, commit: Commit) -> Result<ChatSession, AppError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(&session_id)
            .ok_or_else(|| AppError::NotFound(format!("Session {session_id} not found")))?;

        // Work on a copy so a rejected commit leaves the stored record untouched.
        let mut updated = session.clone();
        apply_commit(&mut updated, commit, Utc::now())?;
        *session = updated.clone();
        Ok(updated)
    }

    async fn set_summary(&self, session_id: Uuid, summary: &str) -> Result<(), AppError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(&session_id)
            .ok_or_else(|| AppError::NotFound(format!("Session {session_id} not found")))?;
        session.summary = Some(summary.to_string());
        Ok(())
    }
}

/// In-process candidate/job directory, seeded explicitly.
#[derive(Default)]
pub struct MemoryDirectory {
    candidates: RwLock<HashMap<Uuid, CandidateRow>>,
    jobs: RwLock<HashMap<Uuid, JobPostingRow>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_candidate(&self, candidate: CandidateRow) {
        self.candidates.write().await.insert(candidate.id, candidate);
    }

    pub async fn insert_job(&self, job: JobPostingRow) {
        self.jobs.write().await.insert(job.id, job);
    }
}

#[async_trait]
impl CandidateDirectory for MemoryDirectory {
    async fn find_candidate(&self, candidate_id: Uuid) -> Result<Option<CandidateRow>, AppError> {
        Ok(self.candidates.read().await.get(&candidate_id).cloned())
    }

    async fn find_job(&self, job_id: Uuid) -> Result<Option<JobPostingRow>, AppError> {
        Ok(self.jobs.read().await.get(&job_id).cloned())
    }
}
