use async_trait::async_trait;
use common::error::WalletError;
use std::time::Duration;

/// §4.2: the worker's side of the idempotency cache is write-only; it
/// stores the terminal result of an already-admitted operation so a later
/// replay of the same work item returns the same answer without redoing it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdempotencyCache: Send + Sync {
    async fn remember(&self, key: &str, payload: &str, ttl: Duration) -> Result<(), WalletError>;
}
