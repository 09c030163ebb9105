/// LLM Client Adapter — the single point of entry for completion calls.
///
/// No other module talks to the model vendor directly. Callers get one
/// canonical `Completion { text }` no matter how the vendor shapes its reply.
/// `AnthropicClient` makes exactly one HTTP call per `complete`; retrying is
/// `RetryingClient`'s job.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;
pub mod retry;

pub use retry::RetryingClient;

use prompts::JSON_ONLY_SYSTEM;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 8192;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Quota exhausted: still rate limited after {attempts} attempt(s)")]
    Quota { attempts: u32 },
}

impl LlmError {
    /// Transport failures (timeouts included), 429 and 5xx.
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::Http(_) => true,
            LlmError::Api { status, .. } => is_retryable(*status),
            LlmError::Quota { .. } => false,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, LlmError::Api { status: 429, .. })
    }
}

fn is_retryable(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

/// The canonical shape of a completion, regardless of vendor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
}

impl Completion {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Text-in/text-out completion service. Carried in `AppState` as
/// `Arc<dyn CompletionClient>` so tests can substitute a mock.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<Completion, LlmError>;

    fn model(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

impl AnthropicResponse {
    /// Concatenates every text block in order. Non-text blocks are skipped.
    fn into_completion(self) -> Completion {
        let text = self
            .content
            .into_iter()
            .filter(|b| b.block_type == "text")
            .filter_map(|b| b.text)
            .collect::<Vec<_>>()
            .join("");
        Completion::new(text)
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// Wraps the Anthropic Messages API. The timeout bounds each call.
#[derive(Clone)]
pub struct AnthropicClient {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl AnthropicClient {
    pub fn new(
        api_url: String,
        api_key: String,
        model: String,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_url,
            api_key,
            model,
        })
    }
}

#[async_trait]
impl CompletionClient for AnthropicClient {
    async fn complete(&self, prompt: &str) -> Result<Completion, LlmError> {
        let request_body = AnthropicRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            system: JSON_ONLY_SYSTEM,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("LLM API returned {}: {}", status, body);
            let message = serde_json::from_str::<AnthropicError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let llm_response: AnthropicResponse = response.json().await?;

        debug!(
            "LLM call succeeded: input_tokens={}, output_tokens={}",
            llm_response.usage.input_tokens, llm_response.usage.output_tokens
        );

        Ok(llm_response.into_completion())
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use axum::{extract::State, http::StatusCode, routing::post, Router};

    const OK_BODY: &str = r#"{
        "content": [{"type": "text", "text": "{\"overall_score\": 7"}, {"type": "text", "text": "0}"}],
        "usage": {"input_tokens": 12, "output_tokens": 4}
    }"#;

    /// Local stand-in for the Messages endpoint. Replies follow `script`;
    /// the last entry repeats once the script runs out.
    #[derive(Clone)]
    struct Stub {
        script: Arc<Vec<(StatusCode, &'static str)>>,
        delay: Duration,
        hits: Arc<AtomicUsize>,
    }

    impl Stub {
        fn new(script: Vec<(StatusCode, &'static str)>) -> Self {
            Self {
                script: Arc::new(script),
                delay: Duration::ZERO,
                hits: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn hits(&self) -> usize {
            self.hits.load(Ordering::SeqCst)
        }
    }

    async fn stub_reply(State(stub): State<Stub>) -> (StatusCode, &'static str) {
        let hit = stub.hits.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(stub.delay).await;
        let index = hit.min(stub.script.len() - 1);
        stub.script[index]
    }

    async fn serve_stub(stub: Stub) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new()
            .route("/v1/messages", post(stub_reply))
            .with_state(stub);
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}/v1/messages")
    }

    fn client(api_url: String, timeout: Duration) -> AnthropicClient {
        AnthropicClient::new(api_url, "key".to_string(), "model-x".to_string(), timeout).unwrap()
    }

    #[test]
    fn test_into_completion_joins_text_blocks_in_order() {
        let json = r#"{
            "content": [
                {"type": "text", "text": "{\"a\":"},
                {"type": "tool_use"},
                {"type": "text", "text": "1}"}
            ],
            "usage": {"input_tokens": 10, "output_tokens": 3}
        }"#;
        let response: AnthropicResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.into_completion(), Completion::new("{\"a\":1}"));
    }

    #[test]
    fn test_into_completion_without_text_blocks_is_empty() {
        let json = r#"{"content": [], "usage": {"input_tokens": 1, "output_tokens": 0}}"#;
        let response: AnthropicResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.into_completion().text, "");
    }

    #[test]
    fn test_transient_errors() {
        let api = |status| LlmError::Api {
            status,
            message: String::new(),
        };
        assert!(api(429).is_transient());
        assert!(api(503).is_transient());
        assert!(!api(400).is_transient());
        assert!(!api(401).is_transient());
        assert!(!LlmError::Quota { attempts: 3 }.is_transient());
        assert!(api(429).is_rate_limited());
        assert!(!api(503).is_rate_limited());
    }

    #[tokio::test]
    async fn test_complete_returns_joined_text() {
        let stub = Stub::new(vec![(StatusCode::OK, OK_BODY)]);
        let url = serve_stub(stub.clone()).await;

        let completion = client(url, Duration::from_secs(5))
            .complete("prompt")
            .await
            .unwrap();
        assert_eq!(completion.text, "{\"overall_score\": 70}");
        assert_eq!(stub.hits(), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_is_reported_after_a_single_call() {
        let stub = Stub::new(vec![(StatusCode::TOO_MANY_REQUESTS, "slow down")]);
        let url = serve_stub(stub.clone()).await;

        let err = client(url, Duration::from_secs(5))
            .complete("prompt")
            .await
            .unwrap_err();
        assert!(err.is_rate_limited());
        assert_eq!(stub.hits(), 1);
    }

    #[tokio::test]
    async fn test_api_error_message_is_extracted() {
        let body = r#"{"type": "error", "error": {"type": "invalid_request_error", "message": "prompt is too long"}}"#;
        let stub = Stub::new(vec![(StatusCode::BAD_REQUEST, body)]);
        let url = serve_stub(stub.clone()).await;

        let err = client(url, Duration::from_secs(5))
            .complete("prompt")
            .await
            .unwrap_err();
        match err {
            LlmError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "prompt is too long");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_slow_reply_times_out_as_transport_error() {
        let mut stub = Stub::new(vec![(StatusCode::OK, OK_BODY)]);
        stub.delay = Duration::from_secs(5);
        let url = serve_stub(stub.clone()).await;

        let err = client(url, Duration::from_millis(100))
            .complete("prompt")
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Http(ref e) if e.is_timeout()));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_retrying_client_recovers_from_server_error() {
        let stub = Stub::new(vec![
            (StatusCode::SERVICE_UNAVAILABLE, "overloaded"),
            (StatusCode::OK, OK_BODY),
        ]);
        let url = serve_stub(stub.clone()).await;

        let retrying = RetryingClient::new(client(url, Duration::from_secs(5)), 3);
        let completion = retrying.complete("prompt").await.unwrap();
        assert_eq!(completion.text, "{\"overall_score\": 70}");
        assert_eq!(stub.hits(), 2);
    }

    #[tokio::test]
    async fn test_retrying_client_turns_persistent_rate_limit_into_quota() {
        let stub = Stub::new(vec![(StatusCode::TOO_MANY_REQUESTS, "slow down")]);
        let url = serve_stub(stub.clone()).await;

        let retrying = RetryingClient::new(client(url, Duration::from_secs(5)), 2);
        let err = retrying.complete("prompt").await.unwrap_err();
        assert!(matches!(err, LlmError::Quota { attempts: 2 }));
        assert_eq!(stub.hits(), 2);
    }
}
