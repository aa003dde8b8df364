//! Title extraction from free-form text.

use topicforge_shared::{Result, TopicForgeError};
use tracing::instrument;

use crate::client::ChatClient;

const EXTRACTION_PROMPT: &str = "Extract the distinct topic titles mentioned in the user's text. \
    Respond with one title per line, in the order they appear. Do not number the lines, do not \
    add bullets, and do not add any commentary.";

/// Extracts a title list from free-form input text.
///
/// Unlike generation, extraction is a single attempt: it runs interactively
/// before a pipeline starts, so the caller would rather see the failure at
/// once than wait out a retry schedule.
#[derive(Debug, Clone)]
pub struct TitleExtractor {
    client: ChatClient,
    model: String,
}

impl TitleExtractor {
    pub fn new(client: ChatClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Split `raw_text` into titles, one per model output line. Lines are
    /// passed through as-is, blanks included; downstream consumers decide
    /// how to treat blank entries.
    #[instrument(skip_all, fields(chars = raw_text.len()))]
    pub async fn extract(&self, raw_text: &str) -> Result<Vec<String>> {
        let content = self
            .client
            .chat(&self.model, EXTRACTION_PROMPT, raw_text)
            .await
            .map_err(|failure| TopicForgeError::Extraction(failure.to_string()))?;

        Ok(content.lines().map(str::to_string).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use topicforge_shared::OpenAiConfig;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_extractor(base_url: String) -> TitleExtractor {
        let client = ChatClient::new(
            "test-key".into(),
            &OpenAiConfig {
                base_url,
                timeout_secs: 2,
                ..Default::default()
            },
        )
        .expect("build chat client");
        TitleExtractor::new(client, "gpt-3.5-turbo")
    }

    fn completion_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [
                { "message": { "role": "assistant", "content": content } }
            ]
        })
    }

    #[tokio::test]
    async fn extraction_preserves_line_order_and_blanks() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_string_contains("notes about several topics"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("A\n\nB\nC")))
            .mount(&server)
            .await;

        let extractor = test_extractor(server.uri());
        let titles = extractor
            .extract("notes about several topics")
            .await
            .expect("extraction succeeds");

        assert_eq!(titles, vec!["A", "", "B", "C"]);
    }

    #[tokio::test]
    async fn extraction_failure_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model overloaded"))
            .mount(&server)
            .await;

        let extractor = test_extractor(server.uri());
        let error = extractor
            .extract("anything")
            .await
            .expect_err("extraction fails");

        let message = error.to_string();
        assert!(message.contains("HTTP 500"));
        assert!(message.contains("model overloaded"));
    }
}
