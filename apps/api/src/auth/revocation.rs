use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use redis::Client as RedisClient;
use tokio::sync::RwLock;

use crate::auth::AuthError;

const KEY_PREFIX: &str = "revoked_token:";
const MAX_TTL_SECS: i64 = 366 * 24 * 60 * 60;

/// Revoked token ids, each remembered until its token would have expired anyway.
#[async_trait]
pub trait RevocationList: Send + Sync {
    async fn revoke(&self, jti: &str, ttl_secs: u64) -> Result<(), AuthError>;

    async fn is_revoked(&self, jti: &str) -> Result<bool, AuthError>;
}

/// Redis-backed list; entries expire with `SET .. EX`, so it survives restarts
/// and is shared by every replica.
pub struct RedisRevocationList {
    client: RedisClient,
}

impl RedisRevocationList {
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }
}

fn redis_err(e: redis::RedisError) -> AuthError {
    AuthError::Revocation(e.to_string())
}

#[async_trait]
impl RevocationList for RedisRevocationList {
    async fn revoke(&self, jti: &str, ttl_secs: u64) -> Result<(), AuthError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(redis_err)?;
        redis::cmd("SET")
            .arg(format!("{KEY_PREFIX}{jti}"))
            .arg(1)
            .arg("EX")
            .arg(ttl_secs.max(1))
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(redis_err)
    }

    async fn is_revoked(&self, jti: &str) -> Result<bool, AuthError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(redis_err)?;
        redis::cmd("EXISTS")
            .arg(format!("{KEY_PREFIX}{jti}"))
            .query_async::<_, bool>(&mut conn)
            .await
            .map_err(redis_err)
    }
}

/// Process-local fallback when no Redis is configured.
#[derive(Default)]
pub struct InMemoryRevocationList {
    entries: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl InMemoryRevocationList {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RevocationList for InMemoryRevocationList {
    async fn revoke(&self, jti: &str, ttl_secs: u64) -> Result<(), AuthError> {
        let now = Utc::now();
        let secs = i64::try_from(ttl_secs.max(1)).unwrap_or(i64::MAX).min(MAX_TTL_SECS);
        let ttl = Duration::seconds(secs);
        let mut entries = self.entries.write().await;
        entries.retain(|_, expires_at| *expires_at > now);
        entries.insert(jti.to_string(), now + ttl);
        Ok(())
    }

    async fn is_revoked(&self, jti: &str) -> Result<bool, AuthError> {
        let now = Utc::now();
        Ok(self
            .entries
            .read()
            .await
            .get(jti)
            .map(|expires_at| *expires_at > now)
            .unwrap_or(false))
    }
}
