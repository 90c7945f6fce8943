//! Client-side synchronization for recruiter and candidate screens.
//!
//! A `ConversationView` owns one transcript with optimistic sends; a
//! `SessionPoller` keeps a recruiter's view fresh until the session ends.

pub mod api;
pub mod error;
pub mod poller;
pub mod transcript;

use std::future::Future;
use std::time::Duration;

use self::error::ClientError;

pub use self::api::{HttpScreeningClient, Identity, ScreeningApi};
pub use self::poller::{PollHandle, PollState, SessionPoller, DEFAULT_POLL_INTERVAL};
pub use self::transcript::{ConversationView, Transcript};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Bounds one client call. Expiry is a `Transient` failure.
pub(crate) async fn bounded<T, F>(timeout: Duration, call: F) -> Result<T, ClientError>
where
    F: Future<Output = Result<T, ClientError>>,
{
    tokio::time::timeout(timeout, call)
        .await
        .map_err(|_| ClientError::Transient(format!("request timed out after {timeout:?}")))?
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Utc;

    use super::api::{Identity, ScreeningApi};
    use super::error::ClientError;
    use crate::models::session::{Message, MessageRole, SessionStatus, SessionView};
    use crate::screening::service::IngestOutcome;
    use crate::store::test_support::pending_session;

    fn message(role: MessageRole, sequence: i32) -> Message {
        Message {
            role,
            content: format!("message {sequence}"),
            timestamp: Utc::now(),
            sequence,
        }
    }

    /// A session view with `count` messages numbered from zero.
    pub fn view(status: SessionStatus, count: i32) -> SessionView {
        let mut session = pending_session();
        session.status = status;
        session.messages = (0..count)
            .map(|seq| {
                let role = if seq % 2 == 0 {
                    MessageRole::Assistant
                } else {
                    MessageRole::Candidate
                };
                message(role, seq)
            })
            .collect();
        SessionView::from_session(&session, "AuraHR", false)
    }

    /// Outcome whose candidate message sits at `sequence` and reply right after.
    pub fn outcome(sequence: i32, status: SessionStatus) -> IngestOutcome {
        IngestOutcome {
            message: message(MessageRole::Candidate, sequence),
            reply: message(MessageRole::Assistant, sequence + 1),
            status,
            is_completed: status == SessionStatus::Completed,
            questions_asked: 1,
        }
    }

    /// Scripted API. Fetches replay `views` in order and repeat the last one.
    pub struct FakeApi {
        views: Mutex<VecDeque<Result<SessionView, ClientError>>>,
        send: Mutex<Option<Result<IngestOutcome, ClientError>>>,
        hang: bool,
        fetches: AtomicUsize,
        sends: AtomicUsize,
    }

    impl FakeApi {
        pub fn with_views(views: Vec<Result<SessionView, ClientError>>) -> Self {
            Self {
                views: Mutex::new(views.into()),
                send: Mutex::new(None),
                hang: false,
                fetches: AtomicUsize::new(0),
                sends: AtomicUsize::new(0),
            }
        }

        /// Every call waits forever.
        pub fn hanging() -> Self {
            Self {
                hang: true,
                ..Self::with_views(Vec::new())
            }
        }

        pub fn set_send(&self, result: Result<IngestOutcome, ClientError>) {
            *self.send.lock().unwrap() = Some(result);
        }

        pub fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }

        pub fn sends(&self) -> usize {
            self.sends.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ScreeningApi for FakeApi {
        async fn fetch_session(&self, _identity: &Identity) -> Result<SessionView, ClientError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.hang {
                std::future::pending::<()>().await;
            }
            let mut views = self.views.lock().unwrap();
            match views.len() {
                0 => Err(ClientError::Unexpected("no scripted view".into())),
                1 => views[0].clone(),
                _ => views.pop_front().unwrap(),
            }
        }

        async fn send_message(
            &self,
            _identity: &Identity,
            _content: &str,
        ) -> Result<IngestOutcome, ClientError> {
            self.sends.fetch_add(1, Ordering::SeqCst);
            if self.hang {
                std::future::pending::<()>().await;
            }
            self.send
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| Err(ClientError::Unexpected("no scripted send".into())))
        }
    }
}
