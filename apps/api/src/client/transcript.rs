use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::client::api::{Identity, ScreeningApi};
use crate::client::error::ClientError;
use crate::client::{bounded, DEFAULT_REQUEST_TIMEOUT};
use crate::models::session::{Message, SessionStatus, SessionView};
use crate::screening::exchange::{validate_content, DEFAULT_MAX_MESSAGE_CHARS};
use crate::screening::service::IngestOutcome;

/// Locally displayed transcript: the last server snapshot plus at most one
/// provisional message awaiting confirmation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    confirmed: Vec<Message>,
    provisional: Option<Message>,
}

impl Transcript {
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.confirmed.iter().chain(self.provisional.iter())
    }

    pub fn len(&self) -> usize {
        self.confirmed.len() + usize::from(self.provisional.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_pending(&self) -> bool {
        self.provisional.is_some()
    }

    /// Replaces the whole transcript with the server's log. Any pending message
    /// is dropped: the snapshot either already holds it or it was never stored.
    pub fn overwrite(&mut self, messages: Vec<Message>) {
        self.confirmed = messages;
        self.provisional = None;
    }

    pub fn begin(&mut self, message: Message) {
        self.provisional = Some(message);
    }

    /// Swaps the provisional message for the server's copy and appends the reply.
    /// Messages a concurrent snapshot already delivered are not duplicated.
    pub fn confirm(&mut self, outcome: &IngestOutcome) {
        self.provisional = None;
        for message in [&outcome.message, &outcome.reply] {
            let newest = self.confirmed.last().map(|m| m.sequence);
            if newest.map_or(true, |seq| message.sequence > seq) {
                self.confirmed.push(message.clone());
            }
        }
    }

    pub fn rollback(&mut self) {
        self.provisional = None;
    }
}

/// One screen's worth of conversation state, for either identity.
///
/// `send` takes `&mut self`, so at most one message is in flight per view.
pub struct ConversationView {
    api: Arc<dyn ScreeningApi>,
    identity: Identity,
    transcript: Transcript,
    status: Option<SessionStatus>,
    max_message_chars: usize,
    timeout: Duration,
}

impl ConversationView {
    pub fn new(api: Arc<dyn ScreeningApi>, identity: Identity) -> Self {
        Self {
            api,
            identity,
            transcript: Transcript::default(),
            status: None,
            max_message_chars: DEFAULT_MAX_MESSAGE_CHARS,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn status(&self) -> Option<SessionStatus> {
        self.status
    }

    /// Fetches the session and overwrites local state with it.
    pub async fn refresh(&mut self) -> Result<SessionView, ClientError> {
        let view = bounded(self.timeout, self.api.fetch_session(&self.identity)).await?;
        self.apply(&view);
        Ok(view)
    }

    /// Applies a snapshot from `refresh` or a poller.
    pub fn apply(&mut self, view: &SessionView) {
        self.transcript.overwrite(view.messages.clone());
        self.status = Some(view.status);
    }

    /// Sends `content` with an optimistic local append. On failure the
    /// transcript is returned to exactly its prior state.
    pub async fn send(&mut self, content: &str) -> Result<Message, ClientError> {
        let content = validate_content(content, self.max_message_chars)?;
        if let Some(status) = self.status.filter(|s| s.is_terminal()) {
            return Err(ClientError::SessionClosed(format!(
                "This screening session is already {status}."
            )));
        }

        let next_sequence = self
            .transcript
            .messages()
            .last()
            .map(|m| m.sequence + 1)
            .unwrap_or(0);
        self.transcript.begin(Message {
            role: self.identity.role(),
            content: content.clone(),
            timestamp: Utc::now(),
            sequence: next_sequence,
        });

        let sent = bounded(self.timeout, self.api.send_message(&self.identity, &content)).await;
        match sent {
            Ok(outcome) => {
                self.transcript.confirm(&outcome);
                self.status = Some(outcome.status);
                Ok(outcome.reply)
            }
            Err(e) => {
                self.transcript.rollback();
                if matches!(e, ClientError::SessionClosed(_)) {
                    // Our snapshot is stale; the next refresh brings the real status.
                    self.status = None;
                }
                Err(e)
            }
        }
    }
}
