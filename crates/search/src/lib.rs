//! Web-search snippet augmentation for TopicForge.
//!
//! [`SearchClient`] issues one Programmable Search query per title and returns
//! the top-ranked snippets. Search is strictly best-effort: any transport,
//! authentication, quota, or response-shape failure degrades to an empty
//! snippet list and is logged, never propagated to the caller.

use std::time::Duration;

use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use reqwest::Client;
use serde::Deserialize;
use topicforge_shared::{AppConfig, CancelFlag, Result, SearchConfig, TopicForgeError};
use tracing::{debug, instrument, warn};

/// Maximum number of snippets retained per query.
pub const MAX_SNIPPETS: usize = 3;

/// Maximum transport-error retries per query.
const MAX_RETRIES: u32 = 2;

/// Initial retry delay in milliseconds.
const RETRY_INITIAL_MS: u64 = 250;

/// User-Agent string for search requests.
const USER_AGENT: &str = concat!("TopicForge/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Response shape
// ---------------------------------------------------------------------------

/// Programmable Search response body. `items` is absent when the query
/// matched nothing.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    snippet: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Stateless web-search client.
pub struct SearchClient {
    http: Client,
    api_key: String,
    engine_id: String,
    base_url: String,
}

impl SearchClient {
    /// Build a client from explicit credentials and connection options.
    pub fn new(api_key: String, options: &SearchConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(options.timeout_secs))
            .build()
            .map_err(|e| {
                TopicForgeError::Transport(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            http,
            api_key,
            engine_id: options.engine_id.clone(),
            base_url: options.base_url.clone(),
        })
    }

    /// Build a client from the application config, reading the API key from
    /// the configured environment variable. A missing key is not an error
    /// here; it degrades every query to an empty result.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let api_key = std::env::var(&config.search.api_key_env).unwrap_or_default();
        Self::new(api_key, &config.search)
    }

    /// Query the search backend for `text`, returning at most
    /// [`MAX_SNIPPETS`] snippets. Never fails: failures are logged and yield
    /// an empty list. Skipped entirely, with no network round-trip, when the
    /// run is already cancelled or credentials are not configured.
    #[instrument(skip_all, fields(query = %text))]
    pub async fn query(&self, text: &str, cancel: &CancelFlag) -> Vec<String> {
        if self.api_key.is_empty() || self.engine_id.is_empty() {
            debug!("search credentials not configured, skipping augmentation");
            return Vec::new();
        }

        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: Duration::from_millis(RETRY_INITIAL_MS),
            initial_interval: Duration::from_millis(RETRY_INITIAL_MS),
            max_interval: Duration::from_secs(2),
            multiplier: 2.0,
            max_elapsed_time: Some(Duration::from_secs(5)),
            ..Default::default()
        };

        for attempt in 0..=MAX_RETRIES {
            // Cancellation is re-checked before every request, retries included
            if cancel.is_cancelled() {
                debug!("run cancelled, skipping search");
                return Vec::new();
            }

            match self.fetch(text).await {
                Ok(snippets) => {
                    debug!(count = snippets.len(), "search returned snippets");
                    return snippets;
                }
                Err(e @ TopicForgeError::Transport(_)) if attempt < MAX_RETRIES => {
                    match backoff.next_backoff() {
                        Some(delay) => {
                            warn!(
                                attempt = attempt + 1,
                                error = %e,
                                "search transport error, retrying"
                            );
                            tokio::time::sleep(delay).await;
                        }
                        None => {
                            warn!(error = %e, "search failed, continuing without augmentation");
                            return Vec::new();
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "search failed, continuing without augmentation");
                    return Vec::new();
                }
            }
        }

        Vec::new()
    }

    /// One request and one validation pass.
    async fn fetch(&self, text: &str) -> Result<Vec<String>> {
        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.engine_id.as_str()),
                ("q", text),
            ])
            .send()
            .await
            .map_err(|e| TopicForgeError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TopicForgeError::ApiStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| TopicForgeError::MalformedResponse(e.to_string()))?;

        Ok(parsed
            .items
            .into_iter()
            .filter_map(|item| item.snippet)
            .take(MAX_SNIPPETS)
            .collect())
    }
}
