use std::sync::Arc;

use crate::auth::AuthService;
use crate::config::Config;
use crate::extraction::TextExtractor;
use crate::llm_client::CompletionClient;
use crate::store::AnalysisStore;

/// Shared application state injected into all route handlers via Axum extractors.
/// Collaborators are trait objects so tests can swap in mocks.
#[derive(Clone)]
pub struct AppState {
    pub extractor: Arc<dyn TextExtractor>,
    pub llm: Arc<dyn CompletionClient>,
    pub store: Arc<dyn AnalysisStore>,
    pub auth: AuthService,
    pub config: Config,
}
