//! Test doubles shared by handler and route tests.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Duration;

use crate::analysis::normalizer::SchemaPolicy;
use crate::auth::{
    revocation::InMemoryRevocationList, tokens::TokenIssuer, users::InMemoryUserStore, AuthService,
};
use crate::config::{Config, DEFAULT_LLM_API_URL, DEFAULT_LLM_MODEL};
use crate::extraction::{ExtractionError, TextExtractor};
use crate::llm_client::{Completion, CompletionClient, LlmError};
use crate::state::AppState;
use crate::store::InMemoryAnalysisStore;

/// Counts calls and replies with a canned completion (or a failure).
pub struct MockCompletionClient {
    reply: Option<String>,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl MockCompletionClient {
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(text.to_string()),
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: None,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for MockCompletionClient {
    async fn complete(&self, prompt: &str) -> Result<Completion, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
        match &self.reply {
            Some(text) => Ok(Completion::new(text.clone())),
            None => Err(LlmError::Api {
                status: 401,
                message: "invalid x-api-key".to_string(),
            }),
        }
    }

    fn model(&self) -> &str {
        "mock-model"
    }
}

/// Treats the upload bytes as the document's only page.
pub struct EchoExtractor;

#[async_trait]
impl TextExtractor for EchoExtractor {
    async fn extract(&self, _document: &'static str, data: Bytes) -> Result<String, ExtractionError> {
        Ok(crate::extraction::join_pages([String::from_utf8_lossy(&data)]))
    }
}

pub fn test_config() -> Config {
    Config {
        database_url: None,
        redis_url: None,
        anthropic_api_key: "test-key".to_string(),
        llm_model: DEFAULT_LLM_MODEL.to_string(),
        llm_api_url: DEFAULT_LLM_API_URL.to_string(),
        llm_timeout_secs: 5,
        llm_max_attempts: 1,
        jwt_secret: "test-secret".to_string(),
        token_ttl_minutes: 30,
        require_auth: false,
        schema_policy: SchemaPolicy::Trust,
        max_upload_bytes: 1024 * 1024,
        port: 0,
        rust_log: "debug".to_string(),
    }
}

/// App state over in-memory backends; the store is returned for inspection.
pub fn test_state(llm: Arc<MockCompletionClient>) -> (AppState, Arc<InMemoryAnalysisStore>) {
    let store = Arc::new(InMemoryAnalysisStore::new());
    let auth = AuthService::new(
        Arc::new(InMemoryUserStore::new()),
        Arc::new(InMemoryRevocationList::new()),
        TokenIssuer::new("test-secret", Duration::minutes(30)),
    );
    let state = AppState {
        extractor: Arc::new(EchoExtractor),
        llm,
        store: store.clone(),
        auth,
        config: test_config(),
    };
    (state, store)
}
