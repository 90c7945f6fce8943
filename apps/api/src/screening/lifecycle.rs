//! Session status state machine.
//!
//! ```text
//! pending_candidate_response ──candidate replies──▶ in_progress
//!          │  │  │                                   │  │  │
//!          │  │  └────────── interviewer done ───────┼──┼──┴─▶ completed
//!          │  └───────────── token expired ──────────┼──┴────▶ expired
//!          └──────────────── recruiter close ────────┴───────▶ abandoned
//! ```
//!
//! Terminal states have no outgoing edges.

use crate::errors::AppError;
use crate::models::session::SessionStatus;

/// Something that happened to a session and may move its status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A message from the candidate was appended.
    CandidateReplied,
    /// A message from the recruiter was appended. Never changes status on its own.
    RecruiterReplied,
    /// The interviewer flagged the screening as finished.
    InterviewerCompleted,
    /// The public token was found past its expiry.
    TokenExpired,
    /// The recruiter explicitly closed the session.
    RecruiterClosed,
}

/// Whether `from → to` is an edge of the transition graph.
/// Staying in the same non-terminal state counts as valid.
pub fn is_valid_transition(from: SessionStatus, to: SessionStatus) -> bool {
    use SessionStatus::*;

    if from.is_terminal() {
        return false;
    }
    match (from, to) {
        (PendingCandidateResponse, PendingCandidateResponse) => true,
        (PendingCandidateResponse, InProgress) => true,
        (InProgress, InProgress) => true,
        (_, Completed | Expired | Abandoned) => true,
        _ => false,
    }
}

/// Applies `event` to `current` and returns the resulting status.
///
/// Returns `AppError::SessionClosed` if `current` is terminal.
pub fn apply(current: SessionStatus, event: SessionEvent) -> Result<SessionStatus, AppError> {
    if current.is_terminal() {
        return Err(AppError::SessionClosed(format!(
            "This screening session is already {current}."
        )));
    }

    let next = match event {
        SessionEvent::CandidateReplied => SessionStatus::InProgress,
        SessionEvent::RecruiterReplied => current,
        SessionEvent::InterviewerCompleted => SessionStatus::Completed,
        SessionEvent::TokenExpired => SessionStatus::Expired,
        SessionEvent::RecruiterClosed => SessionStatus::Abandoned,
    };

    debug_assert!(is_valid_transition(current, next));
    Ok(next)
}

/// Checks an observed status sequence, e.g. successive polls of one session.
/// Repeated observations of the same status are allowed; every change must be an edge.
pub fn is_valid_history(statuses: &[SessionStatus]) -> bool {
    statuses
        .windows(2)
        .all(|pair| pair[0] == pair[1] || is_valid_transition(pair[0], pair[1]))
}
