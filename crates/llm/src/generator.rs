//! Per-title content generation.

use std::time::Duration;

use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use tracing::{instrument, warn};

use crate::client::{ChatClient, CompletionFailure};

const SYSTEM_PROMPT: &str = "You are a research assistant. Write a concise, well-organized brief \
    about the given topic. Cover what it is, why it matters, and the key facts a reader should \
    know. When search snippets are provided, use them for grounding but do not quote them \
    verbatim. Respond with plain prose only.";

/// Maximum transport-error retries per generation.
const MAX_RETRIES: u32 = 2;

/// Initial retry delay in milliseconds.
const RETRY_INITIAL_MS: u64 = 250;

fn retry_policy() -> ExponentialBackoff<backoff::SystemClock> {
    ExponentialBackoff {
        current_interval: Duration::from_millis(RETRY_INITIAL_MS),
        initial_interval: Duration::from_millis(RETRY_INITIAL_MS),
        max_interval: Duration::from_secs(2),
        multiplier: 2.0,
        max_elapsed_time: Some(Duration::from_secs(5)),
        ..Default::default()
    }
}

fn build_user_message(title: &str, snippets: &[String]) -> String {
    let mut message = format!("Topic: {title}");
    if !snippets.is_empty() {
        message.push_str("\n\nSearch snippets:\n");
        message.push_str(&snippets.join("\n"));
    }
    message
}

/// Turns a title plus optional search snippets into generated text.
#[derive(Debug, Clone)]
pub struct ContentGenerator {
    client: ChatClient,
    model: String,
}

impl ContentGenerator {
    pub fn new(client: ChatClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Generate content for one title. Transport errors are retried a
    /// bounded number of times; status and parse failures are returned
    /// immediately since repeating the identical request cannot fix them.
    #[instrument(skip_all, fields(title = %title, snippets = snippets.len()))]
    pub async fn generate(
        &self,
        title: &str,
        snippets: &[String],
    ) -> Result<String, CompletionFailure> {
        let user = build_user_message(title, snippets);

        let mut backoff = retry_policy();
        let mut attempt: u32 = 0;
        loop {
            match self.client.chat(&self.model, SYSTEM_PROMPT, &user).await {
                Ok(text) => return Ok(text),
                Err(failure @ CompletionFailure::Transport(_)) if attempt < MAX_RETRIES => {
                    let Some(delay) = backoff.next_backoff() else {
                        return Err(failure);
                    };
                    attempt += 1;
                    warn!(
                        attempt,
                        error = %failure,
                        "generation transport error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(failure) => return Err(failure),
            }
        }
    }
}
