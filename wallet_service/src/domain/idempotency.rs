use std::time::Duration;

use common::error::WalletError;

use crate::domain::cache::IdempotencyCache;

/// §4.2's admission gate: a cache hit rejects outright. A miss does not
/// guarantee freshness (the cache is a fast path, not the source of truth);
/// the `wallet_transactions_idempotency_key_key` unique constraint is the
/// backstop callers fall back on when `save()` fails.
pub async fn admit(
    cache: &dyn IdempotencyCache,
    key: &str,
    ttl: Duration,
) -> Result<(), WalletError> {
    if cache.exists(key).await? {
        return Err(WalletError::IdempotentlyDone(key.to_string()));
    }
    cache.remember(key, "admitted", ttl).await
}
