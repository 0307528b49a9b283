use std::time::Duration;

use async_trait::async_trait;
use common::error::WalletError;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::domain::cache::IdempotencyCache;

/// Redis-backed idempotency cache. Keys are namespaced with the configured
/// prefix, mirroring `{REDIS_KEY_IDEMPOTENCY}:{idempotency_key}`.
pub struct RedisIdempotencyCache {
    conn: ConnectionManager,
    key_prefix: String,
}

impl RedisIdempotencyCache {
    pub async fn connect(dsn: &str, key_prefix: String) -> Result<Self, WalletError> {
        let client =
            redis::Client::open(dsn).map_err(|e| WalletError::CacheError(e.to_string()))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| WalletError::CacheError(e.to_string()))?;
        Ok(Self { conn, key_prefix })
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }
}

#[async_trait]
impl IdempotencyCache for RedisIdempotencyCache {
    async fn exists(&self, key: &str) -> Result<bool, WalletError> {
        let mut conn = self.conn.clone();
        conn.exists(self.namespaced(key))
            .await
            .map_err(|e| WalletError::CacheError(e.to_string()))
    }

    async fn remember(&self, key: &str, payload: &str, ttl: Duration) -> Result<(), WalletError> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(self.namespaced(key), payload, ttl.as_secs())
            .await
            .map_err(|e| WalletError::CacheError(e.to_string()))
    }

    async fn get(&self, key: &str) -> Result<Option<String>, WalletError> {
        let mut conn = self.conn.clone();
        conn.get(self.namespaced(key))
            .await
            .map_err(|e| WalletError::CacheError(e.to_string()))
    }
}
