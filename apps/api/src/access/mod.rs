//! Identity resolution for screening sessions.
//!
//! Two independent paths converge on the same stored record:
//! a recruiter's bearer credential plus a session id, or a candidate's
//! public token. Neither path carries any session logic of its own.

pub mod bearer;
pub mod rate_limit;
pub mod token;

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::session::ChatSession;
use crate::screening::lifecycle::SessionEvent;
use crate::store::{Commit, SessionStore};

use self::bearer::Claims;

/// Who is acting on a resolved session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    Recruiter { subject: String },
    Candidate,
}

/// A session together with the identity that resolved it.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub session: ChatSession,
    pub actor: Actor,
}

/// Authenticated path. `Forbidden` on a bad role or foreign tenant,
/// `NotFound` when an authorized caller names an unknown session.
pub async fn resolve_authenticated(
    store: &dyn SessionStore,
    claims: &Claims,
    session_id: Uuid,
) -> Result<Resolved, AppError> {
    if !claims.role.can_screen() {
        return Err(AppError::Forbidden);
    }
    let session = store
        .get(session_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Screening session {session_id} not found")))?;
    claims.authorize(session.tenant_id)?;

    Ok(Resolved {
        session,
        actor: Actor::Recruiter {
            subject: claims.sub.clone(),
        },
    })
}

/// Public path. Every failure is the same `AccessDenied`.
///
/// Token expiry takes precedence over session status: an expired token is
/// denied even if the session is still open, and an open session is moved
/// to `expired` on the way out.
pub async fn resolve_public(
    store: &dyn SessionStore,
    token: &str,
    now: DateTime<Utc>,
) -> Result<Resolved, AppError> {
    if !token::is_well_formed(token) {
        debug!("Public token rejected: malformed");
        return Err(AppError::AccessDenied);
    }

    let Some(session) = store.find_by_token(token).await? else {
        debug!("Public token rejected: unknown");
        return Err(AppError::AccessDenied);
    };

    if session.expires_at.is_some_and(|expires_at| expires_at <= now) {
        debug!("Public token for session {} rejected: expired", session.session_id);
        if !session.status.is_terminal() {
            match store
                .commit(session.session_id, Commit::event(SessionEvent::TokenExpired))
                .await
            {
                Ok(_) => info!("Screening session {} expired", session.session_id),
                // Another writer closed it first; the denial stands either way.
                Err(AppError::SessionClosed(_)) => {}
                Err(e) => return Err(e),
            }
        }
        return Err(AppError::AccessDenied);
    }

    Ok(Resolved {
        session,
        actor: Actor::Candidate,
    })
}
