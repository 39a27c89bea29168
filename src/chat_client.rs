use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// Default request timeout of the chat service.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Body of `POST /chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

/// Successful reply of `POST /chat`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatReply {
    pub response: String,
    pub conversation_id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

/// Ways a call to the chat service can fail.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChatServiceError {
    #[error("the chat service did not answer in time")]
    Timeout,

    /// The service answered with a non-success status. `detail` holds the
    /// `detail` field of the body when it was a string.
    #[error("the chat service answered with status {status}")]
    Server { status: u16, detail: Option<String> },

    /// A success status whose body is not a chat reply.
    #[error("the chat service sent an unreadable reply: {0}")]
    InvalidReply(String),

    #[error("the chat service is unreachable: {0}")]
    Unreachable(String),
}

/// The remote side of a conversation.
#[async_trait]
pub trait ChatService: Send + Sync {
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply, ChatServiceError>;
}

/// [`ChatService`] speaking JSON over HTTP.
pub struct ChatClient {
    endpoint: Url,
    client: reqwest::Client,
}

impl ChatClient {
    pub fn new(base_url: &Url, timeout: Duration) -> eyre::Result<Self> {
        let endpoint = chat_endpoint(base_url)?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self { endpoint, client })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ChatService for ChatClient {
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply, ChatServiceError> {
        debug!(
            "Sending request to {}: {}",
            self.endpoint,
            serde_json::to_string(request).unwrap_or_default()
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        let body = response.text().await.map_err(classify)?;
        debug!("Received {} from chat service: {}", status, body);

        if !status.is_success() {
            warn!("Chat request failed with status {}", status);
            return Err(ChatServiceError::Server {
                status: status.as_u16(),
                detail: error_detail(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            warn!("Could not decode chat reply: {}", e);
            ChatServiceError::InvalidReply(e.to_string())
        })
    }
}

/// `{base_url}/chat`, keeping any path prefix the base URL carries.
fn chat_endpoint(base_url: &Url) -> eyre::Result<Url> {
    let mut base = base_url.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base.join("chat")?)
}

fn classify(err: reqwest::Error) -> ChatServiceError {
    if err.is_timeout() {
        warn!("Chat request timed out: {}", err);
        ChatServiceError::Timeout
    } else {
        warn!("Chat request failed: {}", err);
        ChatServiceError::Unreachable(err.to_string())
    }
}

fn error_detail(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match parsed.detail? {
        serde_json::Value::String(detail) if !detail.is_empty() => Some(detail),
        _ => None,
    }
}
