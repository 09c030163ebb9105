mod analysis;
mod auth;
mod config;
mod db;
mod errors;
mod extraction;
mod llm_client;
mod models;
mod routes;
mod state;
mod store;
#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::prompts::PROMPT_VERSION;
use crate::auth::revocation::{InMemoryRevocationList, RedisRevocationList, RevocationList};
use crate::auth::tokens::TokenIssuer;
use crate::auth::users::{InMemoryUserStore, PgUserStore, UserStore};
use crate::auth::AuthService;
use crate::config::Config;
use crate::db::{create_pool, ensure_schema};
use crate::extraction::PdfTextExtractor;
use crate::llm_client::{AnthropicClient, CompletionClient, RetryingClient};
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::{AnalysisStore, InMemoryAnalysisStore, PgAnalysisStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resume Analyzer API v{}", env!("CARGO_PKG_VERSION"));

    // Persistence: PostgreSQL when configured, otherwise process memory
    let (store, users): (Arc<dyn AnalysisStore>, Arc<dyn UserStore>) = match &config.database_url
    {
        Some(url) => {
            let pool = create_pool(url).await?;
            ensure_schema(&pool).await?;
            (
                Arc::new(PgAnalysisStore::new(pool.clone())),
                Arc::new(PgUserStore::new(pool)),
            )
        }
        None => {
            warn!("DATABASE_URL not set; analyses and users are kept in memory only");
            (
                Arc::new(InMemoryAnalysisStore::new()),
                Arc::new(InMemoryUserStore::new()),
            )
        }
    };

    // Token revocation: Redis when configured
    let revocations: Arc<dyn RevocationList> = match &config.redis_url {
        Some(url) => {
            let client = redis::Client::open(url.as_str()).context("Invalid REDIS_URL")?;
            info!("Redis client initialized");
            Arc::new(RedisRevocationList::new(client))
        }
        None => {
            warn!("REDIS_URL not set; token revocations reset on restart");
            Arc::new(InMemoryRevocationList::new())
        }
    };

    let auth = AuthService::new(
        users,
        revocations,
        TokenIssuer::new(
            &config.jwt_secret,
            chrono::Duration::minutes(config.token_ttl_minutes),
        ),
    );

    // Initialize LLM client; retries wrap the single-shot adapter
    let anthropic = AnthropicClient::new(
        config.llm_api_url.clone(),
        config.anthropic_api_key.clone(),
        config.llm_model.clone(),
        Duration::from_secs(config.llm_timeout_secs),
    )
    .context("Failed to build LLM HTTP client")?;
    let llm = RetryingClient::new(anthropic, config.llm_max_attempts);
    info!(
        "LLM client initialized (model: {}, timeout: {}s, attempts: {}, prompt: {PROMPT_VERSION})",
        llm.model(),
        config.llm_timeout_secs,
        config.llm_max_attempts
    );
    info!("Response schema policy: {:?}", config.schema_policy);

    // Build app state
    let state = AppState {
        extractor: Arc::new(PdfTextExtractor),
        llm: Arc::new(llm),
        store,
        auth,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
