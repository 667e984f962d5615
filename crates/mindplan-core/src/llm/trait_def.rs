//! The `LlmClient` trait and its request/error types.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// One message of a chat completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// A provider-neutral chat completion request. The model name is a property
/// of the client, not of the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
}

/// Failures talking to the model provider.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("AI API key is not configured")]
    MissingApiKey,

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

/// A chat-completion backend.
///
/// Object-safe so it can be shared as `Arc<dyn LlmClient>`.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Model identifier sent with each request (e.g. `gpt-4o-mini`).
    fn model(&self) -> &str;

    /// Run one completion and return the text of the first choice, or
    /// `None` when the provider answered without any content.
    async fn complete(&self, request: &ChatRequest) -> Result<Option<String>, LlmError>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn LlmClient) {}
};
