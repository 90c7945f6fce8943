use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::api::{Identity, ScreeningApi};
use crate::client::error::ClientError;
use crate::client::{bounded, DEFAULT_REQUEST_TIMEOUT};
use crate::models::session::SessionView;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// What a poll subscriber sees.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollState {
    pub view: Option<SessionView>,
    /// Most recent failed fetch, cleared by the next success.
    pub last_error: Option<ClientError>,
    /// Set once polling has ended for any reason.
    pub finished: bool,
}

/// Periodically re-reads a session for the recruiter view until it reaches a
/// terminal status.
pub struct SessionPoller {
    api: Arc<dyn ScreeningApi>,
    identity: Identity,
    period: Duration,
    timeout: Duration,
}

impl SessionPoller {
    pub fn new(api: Arc<dyn ScreeningApi>, identity: Identity) -> Self {
        Self {
            api,
            identity,
            period: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_interval(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Starts polling. The first fetch happens immediately.
    pub fn spawn(self) -> PollHandle {
        let cancel = CancellationToken::new();
        let (tx, rx) = watch::channel(PollState::default());
        let task = tokio::spawn(self.run(cancel.clone(), tx));
        PollHandle {
            cancel,
            updates: rx,
            task,
        }
    }

    async fn run(self, cancel: CancellationToken, tx: watch::Sender<PollState>) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let fetch = bounded(self.timeout, self.api.fetch_session(&self.identity));
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                result = fetch => result,
            };

            match result {
                Ok(view) => {
                    let terminal = view.status.is_terminal();
                    let status = view.status;
                    tx.send_modify(|state| {
                        state.view = Some(view);
                        state.last_error = None;
                    });
                    if terminal {
                        info!("Session reached {status}; polling stopped");
                        break;
                    }
                }
                Err(e) if e.is_retryable() => {
                    debug!("Poll failed, retrying next tick: {e}");
                    tx.send_modify(|state| state.last_error = Some(e));
                }
                Err(e) => {
                    warn!("Poll failed permanently: {e}");
                    tx.send_modify(|state| state.last_error = Some(e));
                    break;
                }
            }
        }

        tx.send_modify(|state| state.finished = true);
    }
}

/// Owner of a running poll. Dropping the handle cancels the poll, including
/// a fetch in flight.
pub struct PollHandle {
    cancel: CancellationToken,
    updates: watch::Receiver<PollState>,
    task: JoinHandle<()>,
}

impl PollHandle {
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn updates(&self) -> watch::Receiver<PollState> {
        self.updates.clone()
    }

    pub fn latest(&self) -> PollState {
        self.updates.borrow().clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
