// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Extraction provider backed by an OpenAI-compatible chat-completions API.
//!
//! The provider makes exactly one request per call. Retries, timeouts
//! beyond the client's own and degradation are the orchestrator's job.

use std::time::Duration;

use async_trait::async_trait;
use recollect_config::model::ExtractionConfig;
use recollect_core::{
    AdapterType, CandidateFact, ExtractionProvider, HealthStatus, PluginAdapter, RecollectError,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::parse::parse_extraction_response;

const MAX_TOKENS: u32 = 400;

/// Build the extraction prompt for one turn.
pub fn extraction_prompt(text: &str, turn: u64) -> String {
    format!(
        "You are extracting durable memories. Return ONLY JSON array. Turn {turn}: {text}\n\
         Schema: [{{\"type\":\"preference|fact|constraint|commitment\",\"key\":\"name\",\"value\":\"val\",\"confidence\":0.7}}]\n\
         Extract only if confidence >= 0.70."
    )
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// HTTP extraction provider.
#[derive(Debug, Clone)]
pub struct HttpExtractionProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl HttpExtractionProvider {
    /// Build a provider from the `[extraction]` section. Requires `api_base`.
    pub fn new(config: &ExtractionConfig) -> Result<Self, RecollectError> {
        let api_base = config.api_base.as_deref().ok_or_else(|| {
            RecollectError::Config("extraction.api_base is required for the http provider".into())
        })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| RecollectError::Extraction {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", api_base.trim_end_matches('/')),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl PluginAdapter for HttpExtractionProvider {
    fn name(&self) -> &str {
        "http"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Extraction
    }

    async fn health_check(&self) -> Result<HealthStatus, RecollectError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl ExtractionProvider for HttpExtractionProvider {
    async fn extract(&self, text: &str, turn: u64) -> Result<Vec<CandidateFact>, RecollectError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: extraction_prompt(text, turn),
            }],
            temperature: 0.0,
            max_tokens: MAX_TOKENS,
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| RecollectError::Extraction {
            message: format!("HTTP request failed: {e}"),
            source: Some(Box::new(e)),
        })?;

        let status = response.status();
        debug!(status = %status, turn, "extraction response received");
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RecollectError::Extraction {
                message: format!("API returned {status}: {body}"),
                source: None,
            });
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| RecollectError::Extraction {
            message: format!("failed to decode chat response: {e}"),
            source: Some(Box::new(e)),
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        Ok(parse_extraction_response(&content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recollect_config::model::ExtractionProviderKind;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base: &str) -> ExtractionConfig {
        ExtractionConfig {
            provider: ExtractionProviderKind::Http,
            api_base: Some(base.to_string()),
            api_key: Some("sk-test".into()),
            model: "test-model".into(),
            ..ExtractionConfig::default()
        }
    }

    fn chat_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })
    }

    #[test]
    fn prompt_mentions_turn_and_threshold() {
        let prompt = extraction_prompt("Call me after 9 AM", 12);
        assert!(prompt.contains("Turn 12: Call me after 9 AM"));
        assert!(prompt.contains("\"type\":\"preference|fact|constraint|commitment\""));
        assert!(prompt.ends_with("Extract only if confidence >= 0.70."));
    }

    #[test]
    fn requires_api_base() {
        let config = ExtractionConfig::default();
        assert!(matches!(
            HttpExtractionProvider::new(&config),
            Err(RecollectError::Config(_))
        ));
    }

    #[tokio::test]
    async fn sends_chat_request_and_parses_candidates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "test-model",
                "temperature": 0.0,
                "max_tokens": 400
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(
                "```json\n[{\"type\":\"preference\",\"key\":\"call_time\",\"value\":\"after 9 am\",\"confidence\":0.9}]\n```",
            )))
            .expect(1)
            .mount(&server)
            .await;

        let provider = HttpExtractionProvider::new(&config(&format!("{}/v1/", server.uri()))).unwrap();
        let facts = provider.extract("Call me after 9 AM", 3).await.unwrap();
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].key, "call_time");
    }

    #[tokio::test]
    async fn unparseable_content_is_ok_and_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("no memories here")))
            .mount(&server)
            .await;

        let provider = HttpExtractionProvider::new(&config(&server.uri())).unwrap();
        assert!(provider.extract("hi", 1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn error_status_is_an_extraction_error_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .expect(1)
            .mount(&server)
            .await;

        let provider = HttpExtractionProvider::new(&config(&server.uri())).unwrap();
        let err = provider.extract("hi", 1).await.unwrap_err();
        assert!(err.is_transient());
        assert!(err.to_string().contains("429"));
    }
}
