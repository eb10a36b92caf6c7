use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::SummarizerConfig;

/// Substituted by callers when a summarization call fails.
pub const SUMMARY_PLACEHOLDER: &str = "（摘要暂不可用）";

/// Failure modes of a summarization call. The gateway always returns one of
/// these instead of letting a transport fault escape; callers treat any of
/// them as "no summary available" and carry on.
#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("request failed: {0}")]
    Network(String),
    #[error("request timed out")]
    Timeout,
    #[error("provider returned status {0}")]
    Status(u16),
    #[error("malformed provider response: {0}")]
    Malformed(String),
}

pub type SummaryResult = Result<String, SummarizeError>;

/// Capability interface for message enrichment. The classifier depends on
/// this rather than the concrete HTTP gateway so tests can stub it out.
#[async_trait]
pub trait Summarize: Send + Sync {
    /// Summarize `text`. `context` is a short origin label used for tracing.
    async fn summarize(&self, text: &str, context: &str) -> SummaryResult;
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

/// HTTP gateway to an OpenAI-compatible chat-completions provider. The
/// provider (Deepseek or OpenAI) is a configuration choice; both speak the
/// same request envelope and differ only in URL and model.
pub struct SummaryGateway {
    client: reqwest::Client,
    config: SummarizerConfig,
}

impl SummaryGateway {
    pub fn new(config: SummarizerConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client, config }
    }
}

#[async_trait]
impl Summarize for SummaryGateway {
    async fn summarize(&self, text: &str, context: &str) -> SummaryResult {
        let url = format!("{}/chat/completions", self.config.effective_base_url());

        debug!("Summarizing message from {} via {}", context, url);

        let request = ChatRequest {
            model: self.config.effective_model().to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: format!("请总结以下内容：{}", text),
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SummarizeError::Timeout
                } else {
                    SummarizeError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SummarizeError::Status(status.as_u16()));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                SummarizeError::Timeout
            } else {
                SummarizeError::Malformed(e.to_string())
            }
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| SummarizeError::Malformed("no choices in response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SummaryProvider;
    use serde_json::json;
    use std::time::Instant;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gateway_for(server: &MockServer, timeout_secs: u64) -> SummaryGateway {
        SummaryGateway::new(SummarizerConfig {
            provider: SummaryProvider::Deepseek,
            model: String::new(),
            base_url: server.uri(),
            api_key: "test-key".to_string(),
            timeout_secs,
        })
    }

    #[tokio::test]
    async fn test_summarize_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .and(body_partial_json(json!({ "model": "deepseek-chat" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": { "role": "assistant", "content": "一条合租消息" }
                }]
            })))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server, 5);
        let summary = gateway.summarize("有人合租Netflix吗", "test").await.unwrap();
        assert_eq!(summary, "一条合租消息");
    }

    #[tokio::test]
    async fn test_non_2xx_is_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server, 5);
        match gateway.summarize("hello", "test").await {
            Err(SummarizeError::Status(503)) => {}
            other => panic!("expected Status(503), got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_malformed_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server, 5);
        assert!(matches!(
            gateway.summarize("hello", "test").await,
            Err(SummarizeError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_choices_is_malformed_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server, 5);
        assert!(matches!(
            gateway.summarize("hello", "test").await,
            Err(SummarizeError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_slow_provider_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_secs(5))
                    .set_body_json(json!({
                        "choices": [{ "message": { "content": "too late" } }]
                    })),
            )
            .mount(&server)
            .await;

        let gateway = gateway_for(&server, 1);
        let started = Instant::now();
        let result = gateway.summarize("hello", "test").await;

        assert!(matches!(result, Err(SummarizeError::Timeout)));
        // The caller must never be held past the configured timeout plus
        // small overhead.
        assert!(started.elapsed() < Duration::from_secs(3));
    }
}
