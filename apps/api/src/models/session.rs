use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a screening session. See `screening::lifecycle` for the transition graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    PendingCandidateResponse,
    InProgress,
    Completed,
    Expired,
    Abandoned,
}

impl SessionStatus {
    pub const ALL: [SessionStatus; 5] = [
        SessionStatus::PendingCandidateResponse,
        SessionStatus::InProgress,
        SessionStatus::Completed,
        SessionStatus::Expired,
        SessionStatus::Abandoned,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::PendingCandidateResponse => "pending_candidate_response",
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Completed => "completed",
            SessionStatus::Expired => "expired",
            SessionStatus::Abandoned => "abandoned",
        }
    }

    /// Completed, expired and abandoned sessions accept no further writes.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionStatus::Completed | SessionStatus::Expired | SessionStatus::Abandoned
        )
    }

    /// Display vocabulary used by list rows and badges.
    pub fn label(self) -> &'static str {
        match self {
            SessionStatus::PendingCandidateResponse => "Ready",
            SessionStatus::InProgress => "Active",
            SessionStatus::Completed => "Done",
            SessionStatus::Expired | SessionStatus::Abandoned => "Closed",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SessionStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown session status '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    Candidate,
    Assistant,
    Recruiter,
}

impl MessageRole {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageRole::Candidate => "candidate",
            MessageRole::Assistant => "assistant",
            MessageRole::Recruiter => "recruiter",
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "candidate" => Ok(MessageRole::Candidate),
            "assistant" => Ok(MessageRole::Assistant),
            "recruiter" => Ok(MessageRole::Recruiter),
            other => Err(format!("unknown message role '{other}'")),
        }
    }
}

/// One turn in the transcript. Never mutated after append.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Position in the server-side log, assigned at append time.
    pub sequence: i32,
}

/// The server-held screening session record.
#[derive(Debug, Clone)]
pub struct ChatSession {
    pub session_id: Uuid,
    pub candidate_id: Uuid,
    pub job_id: Uuid,
    pub tenant_id: Uuid,
    pub candidate_name: String,
    pub job_title: String,
    pub status: SessionStatus,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub access_token: Option<String>,
    pub questions_asked: i32,
    pub first_response_at: Option<DateTime<Utc>>,
    pub last_activity_at: Option<DateTime<Utc>>,
    pub summary: Option<String>,
}

impl ChatSession {
    pub fn next_sequence(&self) -> i32 {
        self.messages.last().map(|m| m.sequence + 1).unwrap_or(0)
    }
}

/// The single read shape served by both the authenticated and the public path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub session_id: Uuid,
    pub candidate_id: Uuid,
    pub job_id: Uuid,
    pub candidate_name: String,
    pub job_title: String,
    pub company_name: String,
    pub status: SessionStatus,
    pub status_label: String,
    pub is_active: bool,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub questions_asked: i32,
    /// Recruiter-facing assessment. Only populated for authenticated callers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Only populated for authenticated (recruiter) callers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

impl SessionView {
    /// `for_recruiter` controls the recruiter-only fields: the access token and
    /// the interview summary.
    pub fn from_session(session: &ChatSession, company_name: &str, for_recruiter: bool) -> Self {
        SessionView {
            session_id: session.session_id,
            candidate_id: session.candidate_id,
            job_id: session.job_id,
            candidate_name: session.candidate_name.clone(),
            job_title: session.job_title.clone(),
            company_name: company_name.to_string(),
            status: session.status,
            status_label: session.status.label().to_string(),
            is_active: !session.status.is_terminal(),
            messages: session.messages.clone(),
            created_at: session.created_at,
            completed_at: session.completed_at,
            expires_at: session.expires_at,
            questions_asked: session.questions_asked,
            summary: if for_recruiter {
                session.summary.clone()
            } else {
                None
            },
            access_token: if for_recruiter {
                session.access_token.clone()
            } else {
                None
            },
        }
    }
}
