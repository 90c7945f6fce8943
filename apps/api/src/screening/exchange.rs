//! Server side of the message exchange: content rules and how one inbound
//! message plus the interviewer's answer become a single atomic commit.

use chrono::{DateTime, Utc};

use crate::errors::AppError;
use crate::models::session::MessageRole;
use crate::screening::interviewer::InterviewerTurn;
use crate::screening::lifecycle::SessionEvent;
use crate::screening::prompts::COMPLETION_NOTICE;
use crate::store::{Commit, NewMessage};

/// Default bound on message length, in characters.
pub const DEFAULT_MAX_MESSAGE_CHARS: usize = 2000;

/// Validates and normalizes message content. Used both by the server and by
/// `crate::client` before any network call.
pub fn validate_content(content: &str, max_chars: usize) -> Result<String, AppError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("Message cannot be empty.".to_string()));
    }
    if trimmed.chars().count() > max_chars {
        return Err(AppError::Validation(format!(
            "Message is too long. Please keep responses under {max_chars} characters."
        )));
    }
    Ok(trimmed.to_string())
}

/// Builds the commit for one exchange: the caller's message, then the reply.
///
/// Candidate answers carry `question_cap`; the store closes the session when
/// its locked count reaches it.
pub fn build_exchange(
    role: MessageRole,
    content: String,
    turn: InterviewerTurn,
    question_cap: u32,
    received_at: DateTime<Utc>,
) -> Commit {
    let mut events = vec![match role {
        MessageRole::Candidate => SessionEvent::CandidateReplied,
        MessageRole::Recruiter | MessageRole::Assistant => SessionEvent::RecruiterReplied,
    }];

    let mut reply = turn.reply;
    if turn.screening_complete {
        reply.push_str(COMPLETION_NOTICE);
        events.push(SessionEvent::InterviewerCompleted);
    }

    Commit {
        messages: vec![
            NewMessage {
                role,
                content,
                timestamp: received_at,
            },
            NewMessage {
                role: MessageRole::Assistant,
                content: reply,
                timestamp: Utc::now(),
            },
        ],
        events,
        count_question: role == MessageRole::Candidate,
        question_cap: (role == MessageRole::Candidate)
            .then(|| i32::try_from(question_cap).unwrap_or(i32::MAX)),
    }
}
