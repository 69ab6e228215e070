use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, instrument};

use crate::constants;

pub const EMPTY_REPLY: &str = "No response content";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Body of a Messages API call.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionReply {
    pub text: String,
    pub usage: TokenUsage,
}

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("ANTHROPIC_API_KEY is not set")]
    MissingApiKey,
    #[error("failed to reach the completion API: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("completion API returned {status}: {message}")]
    Api { status: StatusCode, message: String },
}

/// Anything that can turn a transcript into the next assistant reply.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: &CompletionRequest)
        -> Result<CompletionReply, CompletionError>;
}

// Structures matching the Messages API response
#[derive(Deserialize, Debug)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: TokenUsage,
}

#[derive(Deserialize, Debug)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Deserialize, Debug)]
struct ErrorEnvelope {
    error: ErrorInfo,
}

#[derive(Deserialize, Debug)]
struct ErrorInfo {
    message: String,
}

/// Client for Anthropic's `/v1/messages` endpoint.
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    client: Client,
    base_url: String,
    api_key: String,
    api_version: String,
}

impl AnthropicClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            api_version: constants::ANTHROPIC_VERSION.clone(),
        }
    }

    /// Client configured from `ANTHROPIC_API_URL` and `ANTHROPIC_API_KEY`.
    pub fn from_env() -> Self {
        Self::new(
            constants::ANTHROPIC_API_URL.as_str(),
            constants::ANTHROPIC_API_KEY.as_str(),
        )
    }
}

#[async_trait]
impl CompletionService for AnthropicClient {
    #[instrument(skip(self, request), fields(model = %request.model, messages = request.messages.len()))]
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionReply, CompletionError> {
        if self.api_key.is_empty() {
            return Err(CompletionError::MissingApiKey);
        }

        let url = format!("{}/v1/messages", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.api_version)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(%status, %body, "Completion API request failed");
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|envelope| envelope.error.message)
                .unwrap_or(body);
            return Err(CompletionError::Api { status, message });
        }

        let parsed = response.json::<MessagesResponse>().await?;
        debug!(usage = ?parsed.usage, "Received completion");

        let text = parsed
            .content
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("");
        let text = if text.is_empty() {
            EMPTY_REPLY.to_string()
        } else {
            text
        };

        Ok(CompletionReply {
            text,
            usage: parsed.usage,
        })
    }
}
