use async_trait::async_trait;
use common::error::WalletError;
use std::time::Duration;

/// §4.2: a fast path, never a source of truth. Absence past the TTL must
/// never be read as "never happened"; only the transaction row is
/// authoritative.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdempotencyCache: Send + Sync {
    async fn exists(&self, key: &str) -> Result<bool, WalletError>;

    async fn remember(&self, key: &str, payload: &str, ttl: Duration) -> Result<(), WalletError>;

    async fn get(&self, key: &str) -> Result<Option<String>, WalletError>;
}
