//! Persistence adapters for screening sessions and the candidate/job directory.
//!
//! The backing engine belongs to an external service; this module only fixes the
//! contract. `PgSessionStore` is the production adapter, `MemorySessionStore`
//! backs local runs and tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::candidate::{CandidateRow, JobPostingRow};
use crate::models::session::{ChatSession, Message, MessageRole, SessionStatus};
use crate::screening::lifecycle::{self, SessionEvent};
use crate::screening::prompts::COMPLETION_NOTICE;

pub use memory::{MemoryDirectory, MemorySessionStore};
pub use postgres::{PgDirectory, PgSessionStore};

/// A message that has not been assigned a log position yet.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// One atomic write against a session: messages to append plus the events they imply.
#[derive(Debug, Clone, Default)]
pub struct Commit {
    pub messages: Vec<NewMessage>,
    pub events: Vec<SessionEvent>,
    /// Counts this exchange as one more screening question answered.
    pub count_question: bool,
    /// Completes the session once the stored question count reaches this value.
    /// Checked against the locked record, after `count_question` is applied.
    pub question_cap: Option<i32>,
}

impl Commit {
    pub fn event(event: SessionEvent) -> Self {
        Commit {
            events: vec![event],
            ..Default::default()
        }
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, session: &ChatSession) -> Result<(), AppError>;

    async fn get(&self, session_id: Uuid) -> Result<Option<ChatSession>, AppError>;

    async fn find_by_token(&self, token: &str) -> Result<Option<ChatSession>, AppError>;

    /// Applies `commit` under a per-session lock and returns the updated record.
    ///
    /// Fails with `SessionClosed` if the stored status is terminal at commit time,
    /// and `NotFound` if the session does not exist.
    async fn commit(&self, session_id: Uuid, commit: Commit) -> Result<ChatSession, AppError>;

    async fn set_summary(&self, session_id: Uuid, summary: &str) -> Result<(), AppError>;
}

/// Read access to candidates and job postings owned by other services.
#[async_trait]
pub trait CandidateDirectory: Send + Sync {
    async fn find_candidate(&self, candidate_id: Uuid) -> Result<Option<CandidateRow>, AppError>;

    async fn find_job(&self, job_id: Uuid) -> Result<Option<JobPostingRow>, AppError>;
}

/// Applies a commit to an in-memory session. Shared by every store backend so the
/// status rules live in one place. Returns the messages that were appended.
pub(crate) fn apply_commit(
    session: &mut ChatSession,
    commit: Commit,
    now: DateTime<Utc>,
) -> Result<Vec<Message>, AppError> {
    if session.status.is_terminal() {
        return Err(AppError::SessionClosed(format!(
            "This screening session is already {}.",
            session.status
        )));
    }
    let mut status = session.status;
    for event in &commit.events {
        status = lifecycle::apply(status, *event)?;
    }

    let mut sequence = session.next_sequence();
    let mut appended: Vec<Message> = commit
        .messages
        .into_iter()
        .map(|m| {
            let message = Message {
                role: m.role,
                content: m.content,
                timestamp: m.timestamp,
                sequence,
            };
            sequence += 1;
            message
        })
        .collect();

    let questions_asked = session.questions_asked + i32::from(commit.count_question);
    let cap_reached = commit
        .question_cap
        .is_some_and(|cap| questions_asked >= cap);
    if cap_reached && !status.is_terminal() {
        status = lifecycle::apply(status, SessionEvent::InterviewerCompleted)?;
        if let Some(reply) = appended
            .iter_mut()
            .rev()
            .find(|m| m.role == MessageRole::Assistant)
        {
            reply.content.push_str(COMPLETION_NOTICE);
        }
    }

    if commit.events.contains(&SessionEvent::CandidateReplied)
        && session.first_response_at.is_none()
    {
        session.first_response_at = Some(now);
    }
    if status == SessionStatus::Completed && session.completed_at.is_none() {
        session.completed_at = Some(now);
    }
    session.questions_asked = questions_asked;
    session.status = status;
    session.last_activity_at = Some(now);
    session.messages.extend(appended.iter().cloned());

    Ok(appended)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn pending_session() -> ChatSession {
        let now = Utc::now();
        ChatSession {
            session_id: Uuid::new_v4(),
            candidate_id: Uuid::new_v4(),
            job_id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            candidate_name: "Ada Lovelace".into(),
            job_title: "Backend Engineer".into(),
            status: SessionStatus::PendingCandidateResponse,
            messages: vec![Message {
                role: MessageRole::Assistant,
                content: "Hello!".into(),
                timestamp: now,
                sequence: 0,
            }],
            created_at: now,
            completed_at: None,
            expires_at: Some(now + chrono::Duration::hours(72)),
            access_token: Some("tok".into()),
            questions_asked: 0,
            first_response_at: None,
            last_activity_at: None,
            summary: None,
        }
    }

    pub fn text(role: MessageRole, content: &str) -> NewMessage {
        NewMessage {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}
