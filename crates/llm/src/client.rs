//! Chat-completion HTTP client.
//!
//! Thin wrapper over the OpenAI-compatible `/chat/completions` endpoint.
//! Higher-level callers ([`crate::ContentGenerator`], [`crate::TitleExtractor`])
//! own prompts, retry policy, and error translation; this type only moves
//! bytes and validates the response shape.

use std::fmt;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use topicforge_shared::{AppConfig, OpenAiConfig, Result, TopicForgeError};

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

/// Why a single chat completion did not produce text.
///
/// Kept separate from [`TopicForgeError`] because completion failures are
/// consumed in-band by the pipeline (embedded in the result text) rather
/// than propagated, and callers need to branch on the transport case for
/// retry decisions.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CompletionFailure {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Reusable chat-completion client. Cheap to clone.
#[derive(Clone)]
pub struct ChatClient {
    http: Client,
    api_key: String,
    base_url: String,
}

impl ChatClient {
    /// Build a client from an explicit API key and connection options.
    pub fn new(api_key: String, options: &OpenAiConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(options.timeout_secs))
            .danger_accept_invalid_certs(options.accept_invalid_certs)
            .build()
            .map_err(|e| {
                TopicForgeError::Transport(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            http,
            api_key,
            base_url: options.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Build a client from the application config, reading the API key from
    /// the configured environment variable.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let api_key = std::env::var(&config.openai.api_key_env).map_err(|_| {
            TopicForgeError::config(format!(
                "environment variable {} is not set",
                config.openai.api_key_env
            ))
        })?;
        Self::new(api_key, &config.openai)
    }

    /// One chat completion: system prompt, user message, first choice back.
    pub async fn chat(
        &self,
        model: &str,
        system: &str,
        user: &str,
    ) -> std::result::Result<String, CompletionFailure> {
        let request = ChatRequest {
            model: model.to_string(),
            messages: vec![
                Message {
                    role: "system".into(),
                    content: system.to_string(),
                },
                Message {
                    role: "user".into(),
                    content: user.to_string(),
                },
            ],
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| CompletionFailure::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionFailure::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| CompletionFailure::Transport(e.to_string()))?;
        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| CompletionFailure::MalformedResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| {
                CompletionFailure::MalformedResponse("response contains no choices".into())
            })
    }
}

impl fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatClient")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}
