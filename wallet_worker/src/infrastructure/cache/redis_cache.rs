use std::time::Duration;

use async_trait::async_trait;
use common::error::WalletError;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::domain::cache::IdempotencyCache;

/// Same Redis instance and key namespace as the orchestrator's cache; the
/// worker only ever writes the key the orchestrator already admitted.
pub struct RedisIdempotencyCache {
    conn: ConnectionManager,
    key_prefix: String,
}

impl RedisIdempotencyCache {
    pub async fn connect(dsn: &str, key_prefix: String) -> Result<Self, WalletError> {
        let client = redis::Client::open(dsn).map_err(|e| WalletError::CacheError(e.to_string()))?;
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
    async fn remember(&self, key: &str, payload: &str, ttl: Duration) -> Result<(), WalletError> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(self.namespaced(key), payload, ttl.as_secs())
            .await
            .map_err(|e| WalletError::CacheError(e.to_string()))
    }
}
