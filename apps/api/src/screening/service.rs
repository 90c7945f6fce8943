use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::access::bearer::Claims;
use crate::access::{token, Actor, Resolved};
use crate::config::Config;
use crate::errors::AppError;
use crate::models::candidate::{CandidateRow, JobPostingRow};
use crate::models::session::{ChatSession, Message, MessageRole, SessionStatus, SessionView};
use crate::screening::exchange::{build_exchange, validate_content};
use crate::screening::interviewer::{InterviewContext, Interviewer, InterviewerTurn, ScriptedInterviewer};
use crate::screening::lifecycle::SessionEvent;
use crate::screening::prompts::{opening_message, SUMMARY_FALLBACK};
use crate::store::{CandidateDirectory, Commit, SessionStore};

#[derive(Debug, Clone)]
pub struct ScreeningSettings {
    pub company_name: String,
    pub token_ttl: chrono::Duration,
    pub max_message_chars: usize,
    pub max_questions: u32,
    /// Upper bound on one interviewer call. Kept below the client's request
    /// timeout so a slow engine degrades to a fallback question instead.
    pub interviewer_timeout: Duration,
}

impl ScreeningSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            company_name: config.company_name.clone(),
            token_ttl: chrono::Duration::hours(config.public_token_ttl_hours),
            max_message_chars: config.max_message_chars,
            max_questions: config.max_screening_questions,
            interviewer_timeout: Duration::from_secs(8),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartOutcome {
    pub session_id: Uuid,
    pub first_message: String,
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    pub status: SessionStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestOutcome {
    /// The caller's message as stored, with its log position.
    pub message: Message,
    pub reply: Message,
    pub status: SessionStatus,
    pub is_completed: bool,
    pub questions_asked: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicStatus {
    pub status: SessionStatus,
    pub status_label: String,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub message_count: usize,
    pub last_activity: Option<DateTime<Utc>>,
}

/// Owns the session lifecycle: creation, message ingestion, reads and closing.
/// Callers resolve identity through `crate::access` first.
#[derive(Clone)]
pub struct ScreeningService {
    store: Arc<dyn SessionStore>,
    directory: Arc<dyn CandidateDirectory>,
    interviewer: Arc<dyn Interviewer>,
    settings: ScreeningSettings,
}

impl ScreeningService {
    pub fn new(
        store: Arc<dyn SessionStore>,
        directory: Arc<dyn CandidateDirectory>,
        interviewer: Arc<dyn Interviewer>,
        settings: ScreeningSettings,
    ) -> Self {
        Self {
            store,
            directory,
            interviewer,
            settings,
        }
    }

    pub fn store(&self) -> &dyn SessionStore {
        self.store.as_ref()
    }

    pub fn settings(&self) -> &ScreeningSettings {
        &self.settings
    }

    /// Creates a session for `candidate_id` seeded with the opening message.
    /// `job_id` defaults to the job the candidate applied for.
    pub async fn start(
        &self,
        claims: &Claims,
        candidate_id: Uuid,
        job_id: Option<Uuid>,
    ) -> Result<StartOutcome, AppError> {
        let (candidate, job) = self.authorize_candidate(claims, candidate_id, job_id).await?;
        let job_id = job.id;

        let now = Utc::now();
        let first_message = opening_message(&candidate.name, &job.title);
        let access_token = token::issue_token();
        let expires_at = now + self.settings.token_ttl;

        let session = ChatSession {
            session_id: Uuid::new_v4(),
            candidate_id,
            job_id,
            tenant_id: job.tenant_id,
            candidate_name: candidate.name.clone(),
            job_title: job.title.clone(),
            status: SessionStatus::PendingCandidateResponse,
            messages: vec![Message {
                role: MessageRole::Assistant,
                content: first_message.clone(),
                timestamp: now,
                sequence: 0,
            }],
            created_at: now,
            completed_at: None,
            expires_at: Some(expires_at),
            access_token: Some(access_token.clone()),
            questions_asked: 0,
            first_response_at: None,
            last_activity_at: Some(now),
            summary: None,
        };
        self.store.insert(&session).await?;

        info!(
            "Started screening session {} for candidate {candidate_id} on job {job_id} (by {})",
            session.session_id, claims.sub
        );

        Ok(StartOutcome {
            session_id: session.session_id,
            first_message,
            access_token,
            expires_at,
            status: session.status,
        })
    }

    /// Looks up a candidate and the job they are screened for, checking that the
    /// caller may act on that job's tenant.
    pub async fn authorize_candidate(
        &self,
        claims: &Claims,
        candidate_id: Uuid,
        job_id: Option<Uuid>,
    ) -> Result<(CandidateRow, JobPostingRow), AppError> {
        if !claims.role.can_screen() {
            return Err(AppError::Forbidden);
        }
        let candidate = self
            .directory
            .find_candidate(candidate_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Candidate {candidate_id} not found")))?;
        let job_id = job_id.unwrap_or(candidate.job_posting_id);
        let job = self
            .directory
            .find_job(job_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Job posting {job_id} not found")))?;
        claims.authorize(job.tenant_id)?;
        Ok((candidate, job))
    }

    /// Appends the caller's message, asks the interviewer for a reply and
    /// commits both in one write.
    pub async fn ingest_message(
        &self,
        resolved: &Resolved,
        content: &str,
    ) -> Result<IngestOutcome, AppError> {
        let content = validate_content(content, self.settings.max_message_chars)?;
        let session = &resolved.session;
        if session.status.is_terminal() {
            return Err(AppError::SessionClosed(format!(
                "This screening session is already {}.",
                session.status
            )));
        }

        let role = match resolved.actor {
            Actor::Candidate => MessageRole::Candidate,
            Actor::Recruiter { .. } => MessageRole::Recruiter,
        };
        let received_at = Utc::now();

        let mut transcript = session.messages.clone();
        transcript.push(Message {
            role,
            content: content.clone(),
            timestamp: received_at,
            sequence: session.next_sequence(),
        });

        let context = InterviewContext {
            job_context: self.job_context(session).await?,
            questions_asked: session.questions_asked,
            max_questions: self.settings.max_questions,
        };
        let turn = self.next_turn(&context, &transcript).await;

        let commit = build_exchange(
            role,
            content,
            turn,
            self.settings.max_questions,
            received_at,
        );
        let updated = self.store.commit(session.session_id, commit).await?;

        if updated.status == SessionStatus::Completed {
            info!("Screening session {} completed", updated.session_id);
            self.spawn_summary(updated.clone());
        }

        let [.., message, reply] = updated.messages.as_slice() else {
            return Err(AppError::Internal(anyhow::anyhow!(
                "session {} is missing the committed exchange",
                updated.session_id
            )));
        };

        Ok(IngestOutcome {
            message: message.clone(),
            reply: reply.clone(),
            status: updated.status,
            is_completed: updated.status == SessionStatus::Completed,
            questions_asked: updated.questions_asked,
        })
    }

    pub fn view(&self, resolved: &Resolved) -> SessionView {
        let for_recruiter = matches!(resolved.actor, Actor::Recruiter { .. });
        SessionView::from_session(&resolved.session, &self.settings.company_name, for_recruiter)
    }

    /// Recruiter close. Moves an open session to `abandoned`.
    pub async fn close(&self, resolved: &Resolved) -> Result<SessionView, AppError> {
        let Actor::Recruiter { subject } = &resolved.actor else {
            return Err(AppError::Forbidden);
        };
        let updated = self
            .store
            .commit(
                resolved.session.session_id,
                Commit::event(SessionEvent::RecruiterClosed),
            )
            .await?;
        info!(
            "Screening session {} closed by {subject}",
            updated.session_id
        );
        Ok(SessionView::from_session(
            &updated,
            &self.settings.company_name,
            true,
        ))
    }

    pub fn status(&self, resolved: &Resolved) -> PublicStatus {
        let session = &resolved.session;
        PublicStatus {
            status: session.status,
            status_label: session.status.label().to_string(),
            is_active: !session.status.is_terminal(),
            expires_at: session.expires_at,
            message_count: session.messages.len(),
            last_activity: session.last_activity_at,
        }
    }

    async fn job_context(&self, session: &ChatSession) -> Result<String, AppError> {
        Ok(match self.directory.find_job(session.job_id).await? {
            Some(job) => job.context_text(&session.candidate_name),
            None => {
                warn!(
                    "Job {} for session {} no longer exists; using stored title",
                    session.job_id, session.session_id
                );
                format!(
                    "Job Title: {}\n\nCandidate: {}",
                    session.job_title, session.candidate_name
                )
            }
        })
    }

    /// The interviewer never fails an exchange: errors and timeouts fall back
    /// to a scripted follow-up question.
    async fn next_turn(&self, context: &InterviewContext, transcript: &[Message]) -> InterviewerTurn {
        let call = self.interviewer.next_turn(context, transcript);
        match tokio::time::timeout(self.settings.interviewer_timeout, call).await {
            Ok(Ok(turn)) => turn,
            Ok(Err(e)) => {
                warn!("Interviewer failed, using fallback question: {e}");
                fallback_turn(context)
            }
            Err(_) => {
                warn!(
                    "Interviewer timed out after {:?}, using fallback question",
                    self.settings.interviewer_timeout
                );
                fallback_turn(context)
            }
        }
    }

    /// Writes the summary off the request path; the completing send does not wait for it.
    fn spawn_summary(&self, session: ChatSession) {
        let store = Arc::clone(&self.store);
        let interviewer = Arc::clone(&self.interviewer);
        let timeout = self.settings.interviewer_timeout;
        tokio::spawn(async move {
            record_summary(store.as_ref(), interviewer.as_ref(), timeout, &session).await;
        });
    }
}

async fn record_summary(
    store: &dyn SessionStore,
    interviewer: &dyn Interviewer,
    timeout: Duration,
    session: &ChatSession,
) {
    let call = interviewer.summarize(&session.messages);
    let summary = match tokio::time::timeout(timeout, call).await {
        Ok(Ok(summary)) => summary,
        Ok(Err(e)) => {
            warn!("Summary for session {} failed: {e}", session.session_id);
            SUMMARY_FALLBACK.to_string()
        }
        Err(_) => {
            warn!("Summary for session {} timed out", session.session_id);
            SUMMARY_FALLBACK.to_string()
        }
    };
    match store.set_summary(session.session_id, &summary).await {
        Ok(()) => info!("Stored summary for session {}", session.session_id),
        Err(e) => warn!("Could not store summary for session {}: {e}", session.session_id),
    }
}

fn fallback_turn(context: &InterviewContext) -> InterviewerTurn {
    InterviewerTurn {
        reply: ScriptedInterviewer::question_for(context.questions_asked).to_string(),
        screening_complete: false,
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::access::bearer::Role;
    use crate::access::{resolve_authenticated, resolve_public};
    use crate::screening::lifecycle::is_valid_history;
    use crate::screening::prompts::{COMPLETION_NOTICE, FALLBACK_QUESTIONS};

    async fn started(fx: &Fixture) -> StartOutcome {
        fx.service
            .start(&fx.recruiter(), fx.candidate_id, None)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_start_seeds_opening_message() {
        let fx = fixture(Arc::new(FakeInterviewer::asking("Next?")), settings()).await;
        let outcome = started(&fx).await;

        assert!(outcome.first_message.starts_with("Hello Ada Lovelace!"));
        assert_eq!(outcome.status, SessionStatus::PendingCandidateResponse);
        let stored = fx.store.get(outcome.session_id).await.unwrap().unwrap();
        assert_eq!(stored.messages.len(), 1);
        assert_eq!(stored.messages[0].role, MessageRole::Assistant);
        assert_eq!(stored.job_id, fx.job_id);
        assert_eq!(stored.access_token.as_deref(), Some(outcome.access_token.as_str()));
    }

    #[tokio::test]
    async fn test_start_unknown_candidate_or_job_is_not_found() {
        let fx = fixture(Arc::new(FakeInterviewer::asking("Next?")), settings()).await;

        let unknown_candidate = fx.service.start(&fx.recruiter(), Uuid::new_v4(), None).await;
        let unknown_job = fx
            .service
            .start(&fx.recruiter(), fx.candidate_id, Some(Uuid::new_v4()))
            .await;

        assert!(matches!(unknown_candidate, Err(AppError::NotFound(_))));
        assert!(matches!(unknown_job, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_start_other_tenant_is_forbidden() {
        let fx = fixture(Arc::new(FakeInterviewer::asking("Next?")), settings()).await;
        let mut claims = fx.recruiter();
        claims.tenant_id = Uuid::new_v4();
        let result = fx.service.start(&claims, fx.candidate_id, None).await;
        assert!(matches!(result, Err(AppError::Forbidden)));

        claims = fx.recruiter();
        claims.role = Role::Employee;
        let result = fx.service.start(&claims, fx.candidate_id, None).await;
        assert!(matches!(result, Err(AppError::Forbidden)));
    }

    #[tokio::test]
    async fn test_first_candidate_message_moves_to_in_progress() {
        let fx = fixture(
            Arc::new(FakeInterviewer::asking("Which stack did you use?")),
            settings(),
        )
        .await;
        let outcome = started(&fx).await;
        let resolved = resolve_public(fx.store.as_ref(), &outcome.access_token, Utc::now())
            .await
            .unwrap();

        let result = fx
            .service
            .ingest_message(&resolved, "I have 5 years of experience")
            .await
            .unwrap();

        assert_eq!(result.status, SessionStatus::InProgress);
        assert!(!result.is_completed);
        assert_eq!(result.message.role, MessageRole::Candidate);
        assert_eq!(result.message.sequence, 1);
        assert_eq!(result.reply.role, MessageRole::Assistant);
        assert_eq!(result.reply.content, "Which stack did you use?");
        assert_eq!(result.reply.sequence, 2);
        assert_eq!(result.questions_asked, 1);

        let stored = fx.store.get(outcome.session_id).await.unwrap().unwrap();
        assert_eq!(stored.messages.len(), 3);
        assert!(stored.first_response_at.is_some());
    }

    fn finishing_turn() -> Result<InterviewerTurn, String> {
        Ok(InterviewerTurn {
            reply: "Thanks, that's everything.".into(),
            screening_complete: true,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_interviewer_completion_closes_session_and_summarizes() {
        let interviewer = FakeInterviewer::new(vec![finishing_turn()]);
        let fx = fixture(Arc::new(interviewer), settings()).await;
        let outcome = started(&fx).await;
        let resolved = resolve_public(fx.store.as_ref(), &outcome.access_token, Utc::now())
            .await
            .unwrap();

        let result = fx.service.ingest_message(&resolved, "Done").await.unwrap();

        assert!(result.is_completed);
        assert_eq!(result.status, SessionStatus::Completed);
        assert!(result.reply.content.ends_with(COMPLETION_NOTICE));
        tokio::time::sleep(Duration::from_millis(10)).await;
        let stored = fx.store.get(outcome.session_id).await.unwrap().unwrap();
        assert!(stored.completed_at.is_some());
        assert_eq!(stored.summary.as_deref(), Some("Strong backend candidate."));
    }

    #[tokio::test(start_paused = true)]
    async fn test_completing_send_does_not_wait_for_summary() {
        let interviewer =
            FakeInterviewer::new(vec![finishing_turn()]).with_delay(Duration::from_secs(7));
        let fx = fixture(Arc::new(interviewer), settings()).await;
        let outcome = started(&fx).await;
        let resolved = resolve_public(fx.store.as_ref(), &outcome.access_token, Utc::now())
            .await
            .unwrap();

        let began = tokio::time::Instant::now();
        let result = fx.service.ingest_message(&resolved, "Done").await.unwrap();

        assert!(result.is_completed);
        assert!(began.elapsed() < crate::client::DEFAULT_REQUEST_TIMEOUT);
        let stored = fx.store.get(outcome.session_id).await.unwrap().unwrap();
        assert!(stored.summary.is_none());

        tokio::time::sleep(Duration::from_secs(10)).await;
        let stored = fx.store.get(outcome.session_id).await.unwrap().unwrap();
        assert_eq!(stored.summary.as_deref(), Some("Strong backend candidate."));
    }

    #[tokio::test]
    async fn test_question_cap_forces_completion() {
        let mut s = settings();
        s.max_questions = 2;
        let fx = fixture(Arc::new(FakeInterviewer::asking("Next?")), s).await;
        let outcome = started(&fx).await;

        let mut statuses = vec![SessionStatus::PendingCandidateResponse];
        for answer in ["first", "second"] {
            let resolved = resolve_public(fx.store.as_ref(), &outcome.access_token, Utc::now())
                .await
                .unwrap();
            let result = fx.service.ingest_message(&resolved, answer).await.unwrap();
            statuses.push(result.status);
        }

        assert_eq!(statuses.last(), Some(&SessionStatus::Completed));
        assert!(is_valid_history(&statuses));
        let stored = fx.store.get(outcome.session_id).await.unwrap().unwrap();
        assert!(stored.messages.last().unwrap().content.ends_with(COMPLETION_NOTICE));
    }

    #[tokio::test]
    async fn test_ingest_on_terminal_session_is_closed() {
        let fx = fixture(Arc::new(FakeInterviewer::asking("Next?")), settings()).await;
        let outcome = started(&fx).await;
        let recruiter =
            resolve_authenticated(fx.store.as_ref(), &fx.recruiter(), outcome.session_id)
                .await
                .unwrap();
        fx.service.close(&recruiter).await.unwrap();

        let resolved = resolve_public(fx.store.as_ref(), &outcome.access_token, Utc::now())
            .await
            .unwrap();
        let result = fx.service.ingest_message(&resolved, "hello?").await;

        assert!(matches!(result, Err(AppError::SessionClosed(_))));
        let stored = fx.store.get(outcome.session_id).await.unwrap().unwrap();
        assert_eq!(stored.status, SessionStatus::Abandoned);
        assert_eq!(stored.messages.len(), 1);
    }

    #[tokio::test]
    async fn test_close_twice_is_session_closed() {
        let fx = fixture(Arc::new(FakeInterviewer::asking("Next?")), settings()).await;
        let outcome = started(&fx).await;
        let recruiter =
            resolve_authenticated(fx.store.as_ref(), &fx.recruiter(), outcome.session_id)
                .await
                .unwrap();

        let view = fx.service.close(&recruiter).await.unwrap();
        assert_eq!(view.status_label, "Closed");
        let again = fx.service.close(&recruiter).await;
        assert!(matches!(again, Err(AppError::SessionClosed(_))));
    }

    #[tokio::test]
    async fn test_candidate_cannot_close() {
        let fx = fixture(Arc::new(FakeInterviewer::asking("Next?")), settings()).await;
        let outcome = started(&fx).await;
        let resolved = resolve_public(fx.store.as_ref(), &outcome.access_token, Utc::now())
            .await
            .unwrap();
        assert!(matches!(
            fx.service.close(&resolved).await,
            Err(AppError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn test_validation_happens_before_interviewer_call() {
        let interviewer = Arc::new(FakeInterviewer::asking("Next?"));
        let fx = fixture(interviewer.clone(), settings()).await;
        let outcome = started(&fx).await;
        let resolved = resolve_public(fx.store.as_ref(), &outcome.access_token, Utc::now())
            .await
            .unwrap();

        let empty = fx.service.ingest_message(&resolved, "   ").await;
        let long = fx.service.ingest_message(&resolved, &"x".repeat(2001)).await;

        assert!(matches!(empty, Err(AppError::Validation(_))));
        assert!(matches!(long, Err(AppError::Validation(_))));
        assert_eq!(*interviewer.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_interviewer_failure_uses_fallback_question() {
        let interviewer = FakeInterviewer::new(vec![Err("engine down".into())]);
        let fx = fixture(Arc::new(interviewer), settings()).await;
        let outcome = started(&fx).await;
        let resolved = resolve_public(fx.store.as_ref(), &outcome.access_token, Utc::now())
            .await
            .unwrap();

        let result = fx.service.ingest_message(&resolved, "Hi").await.unwrap();

        assert_eq!(result.reply.content, FALLBACK_QUESTIONS[0]);
        assert_eq!(result.status, SessionStatus::InProgress);
    }

    #[tokio::test]
    async fn test_recruiter_injection_keeps_pending_status() {
        let fx = fixture(Arc::new(FakeInterviewer::asking("Noted.")), settings()).await;
        let outcome = started(&fx).await;
        let recruiter =
            resolve_authenticated(fx.store.as_ref(), &fx.recruiter(), outcome.session_id)
                .await
                .unwrap();

        let result = fx
            .service
            .ingest_message(&recruiter, "Please also ask about on-call.")
            .await
            .unwrap();

        assert_eq!(result.message.role, MessageRole::Recruiter);
        assert_eq!(result.status, SessionStatus::PendingCandidateResponse);
        assert_eq!(result.questions_asked, 0);
    }

    #[tokio::test]
    async fn test_views_share_shape_but_token_only_for_recruiter() {
        let fx = fixture(Arc::new(FakeInterviewer::asking("Next?")), settings()).await;
        let outcome = started(&fx).await;
        let recruiter =
            resolve_authenticated(fx.store.as_ref(), &fx.recruiter(), outcome.session_id)
                .await
                .unwrap();
        let candidate = resolve_public(fx.store.as_ref(), &outcome.access_token, Utc::now())
            .await
            .unwrap();

        let recruiter_view = fx.service.view(&recruiter);
        let candidate_view = fx.service.view(&candidate);

        assert_eq!(recruiter_view.access_token.as_deref(), Some(outcome.access_token.as_str()));
        assert!(candidate_view.access_token.is_none());
        assert_eq!(recruiter_view.messages, candidate_view.messages);
        assert_eq!(candidate_view.status_label, "Ready");
        assert!(candidate_view.is_active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_session_summary_only_for_recruiter() {
        let interviewer = FakeInterviewer::new(vec![finishing_turn()]);
        let fx = fixture(Arc::new(interviewer), settings()).await;
        let outcome = started(&fx).await;
        let candidate = resolve_public(fx.store.as_ref(), &outcome.access_token, Utc::now())
            .await
            .unwrap();
        fx.service.ingest_message(&candidate, "Done").await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let recruiter =
            resolve_authenticated(fx.store.as_ref(), &fx.recruiter(), outcome.session_id)
                .await
                .unwrap();
        let candidate = resolve_public(fx.store.as_ref(), &outcome.access_token, Utc::now())
            .await
            .unwrap();
        let recruiter_view = fx.service.view(&recruiter);
        let candidate_view = fx.service.view(&candidate);

        assert_eq!(candidate_view.status, SessionStatus::Completed);
        assert_eq!(
            recruiter_view.summary.as_deref(),
            Some("Strong backend candidate.")
        );
        assert!(candidate_view.summary.is_none());
        assert!(candidate_view.access_token.is_none());
        assert_eq!(recruiter_view.messages, candidate_view.messages);
    }
}
