use std::str::FromStr;

use anyhow::{Context, Result};

use crate::analysis::normalizer::SchemaPolicy;

pub const DEFAULT_LLM_MODEL: &str = "claude-sonnet-4-5";
pub const DEFAULT_LLM_API_URL: &str = "https://api.anthropic.com/v1/messages";

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    /// When unset, analysis records and users are kept in memory.
    pub database_url: Option<String>,
    /// When unset, revoked tokens are tracked in memory.
    pub redis_url: Option<String>,
    pub anthropic_api_key: String,
    pub llm_model: String,
    pub llm_api_url: String,
    pub llm_timeout_secs: u64,
    pub llm_max_attempts: u32,
    pub jwt_secret: String,
    pub token_ttl_minutes: i64,
    pub require_auth: bool,
    pub schema_policy: SchemaPolicy,
    pub max_upload_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let strict_schema: bool = optional_env("STRICT_SCHEMA_VALIDATION", false)?;

        Ok(Config {
            database_url: non_empty_env("DATABASE_URL"),
            redis_url: non_empty_env("REDIS_URL"),
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            llm_model: non_empty_env("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            llm_api_url: non_empty_env("LLM_API_URL")
                .unwrap_or_else(|| DEFAULT_LLM_API_URL.to_string()),
            llm_timeout_secs: optional_env("LLM_TIMEOUT_SECS", 60)?,
            llm_max_attempts: optional_env::<u32>("LLM_MAX_ATTEMPTS", 3)?.max(1),
            jwt_secret: require_env("JWT_SECRET")?,
            token_ttl_minutes: optional_env("TOKEN_TTL_MINUTES", 30)?,
            require_auth: optional_env("REQUIRE_AUTH", false)?,
            schema_policy: if strict_schema {
                SchemaPolicy::Validate
            } else {
                SchemaPolicy::Trust
            },
            max_upload_bytes: optional_env("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            port: optional_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn optional_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match non_empty_env(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse::<T>()
        .with_context(|| format!("Environment variable '{key}' has an invalid value: '{raw}'"))
}
