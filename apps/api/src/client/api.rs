use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use uuid::Uuid;

use crate::client::error::ClientError;
use crate::models::session::{MessageRole, SessionView};
use crate::screening::service::IngestOutcome;

/// Who a view speaks as. Each identity reaches the same session through its
/// own route family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Recruiter { bearer: String, session_id: Uuid },
    Candidate { token: String },
}

impl Identity {
    pub fn role(&self) -> MessageRole {
        match self {
            Identity::Recruiter { .. } => MessageRole::Recruiter,
            Identity::Candidate { .. } => MessageRole::Candidate,
        }
    }
}

/// The two calls a screening view makes against the server.
#[async_trait]
pub trait ScreeningApi: Send + Sync {
    async fn fetch_session(&self, identity: &Identity) -> Result<SessionView, ClientError>;

    async fn send_message(
        &self,
        identity: &Identity,
        content: &str,
    ) -> Result<IngestOutcome, ClientError>;
}

pub struct HttpScreeningClient {
    client: Client,
    base_url: String,
}

impl HttpScreeningClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn session_url(&self, identity: &Identity) -> String {
        match identity {
            Identity::Recruiter { session_id, .. } => {
                format!("{}/api/v1/screening/{session_id}", self.base_url)
            }
            Identity::Candidate { token } => {
                format!("{}/api/v1/public/chat/{token}", self.base_url)
            }
        }
    }

    fn authorize(request: RequestBuilder, identity: &Identity) -> RequestBuilder {
        match identity {
            Identity::Recruiter { bearer, .. } => request.bearer_auth(bearer),
            Identity::Candidate { .. } => request,
        }
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ClientError::from_response(status, &body));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| ClientError::Unexpected(format!("malformed response: {e}")))
}

#[async_trait]
impl ScreeningApi for HttpScreeningClient {
    async fn fetch_session(&self, identity: &Identity) -> Result<SessionView, ClientError> {
        let request = Self::authorize(self.client.get(self.session_url(identity)), identity);
        decode(request.send().await?).await
    }

    async fn send_message(
        &self,
        identity: &Identity,
        content: &str,
    ) -> Result<IngestOutcome, ClientError> {
        let url = match identity {
            Identity::Recruiter { .. } => format!("{}/messages", self.session_url(identity)),
            Identity::Candidate { .. } => self.session_url(identity),
        };
        let request = Self::authorize(self.client.post(url), identity)
            .json(&json!({ "content": content }));
        decode(request.send().await?).await
    }
}
