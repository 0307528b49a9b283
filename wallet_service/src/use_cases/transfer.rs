use std::sync::Arc;

use common::entities::WalletTransaction;
use common::enums::{CurrencyCode, OperationType, TransactionStatus};
use common::error::WalletError;
use common::ids::{TransactionId, UserId};
use common::messages::WalletTransactionRequest;
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::domain::bus::BusProducer;
use crate::domain::cache::IdempotencyCache;
use crate::domain::idempotency;
use crate::domain::repository::{TransactionRepository, WalletRepository};

pub struct TransferOutput {
    pub correlation_id: uuid::Uuid,
    pub status: TransactionStatus,
}

/// §4.6 `Transfer`: admits the request, hands the actual ledger movement to
/// the worker, and records the transaction as `processed` rather than
/// `completed`; the worker's own database transaction drives the final
/// `processed → completed` step (§4.7, step 9).
pub struct TransferUseCase {
    pool: PgPool,
    wallets: Arc<dyn WalletRepository>,
    transactions: Arc<dyn TransactionRepository>,
    cache: Arc<dyn IdempotencyCache>,
    bus: Arc<dyn BusProducer>,
    idempotency_ttl: std::time::Duration,
}

impl TransferUseCase {
    pub fn new(
        pool: PgPool,
        wallets: Arc<dyn WalletRepository>,
        transactions: Arc<dyn TransactionRepository>,
        cache: Arc<dyn IdempotencyCache>,
        bus: Arc<dyn BusProducer>,
        idempotency_ttl: std::time::Duration,
    ) -> Self {
        Self {
            pool,
            wallets,
            transactions,
            cache,
            bus,
            idempotency_ttl,
        }
    }

    #[tracing::instrument(skip(self))]
    #[allow(clippy::too_many_arguments)]
    pub async fn execute(
        &self,
        from_user: UserId,
        to_user: UserId,
        amount: Decimal,
        currency: CurrencyCode,
        idempotency_key: String,
    ) -> Result<TransferOutput, WalletError> {
        idempotency::admit(self.cache.as_ref(), &idempotency_key, self.idempotency_ttl).await?;

        let mut tx = self.pool.begin().await?;

        let from_wallet = self
            .wallets
            .find_by_user_id(&mut tx, from_user)
            .await?
            .ok_or(WalletError::NoWallet(from_user))?;
        let to_wallet = self
            .wallets
            .find_by_user_id(&mut tx, to_user)
            .await?
            .ok_or(WalletError::NoWallet(to_user))?;

        let draft = WalletTransaction::new(
            TransactionId(0),
            from_user,
            from_wallet.id(),
            Some(from_wallet.id()),
            Some(to_wallet.id()),
            Some(currency),
            None,
            None,
            amount,
            OperationType::Transfer,
            idempotency_key.clone(),
            None,
        )?;
        let mut stored = self.transactions.create(&mut tx, &draft).await?;
        stored.transition_to(TransactionStatus::Processed)?;
        self.transactions
            .update_status(&mut tx, stored.id(), TransactionStatus::Processed, None)
            .await?;

        self.bus
            .publish_request(&WalletTransactionRequest {
                operation: OperationType::Transfer,
                amount,
                currency,
                to_currency: None,
                wallet_id: from_wallet.id(),
                to_wallet_id: Some(to_wallet.id()),
                idempotency_key,
                correlation_id: stored.correlation_id(),
                transaction_id: stored.id(),
                retries: 0,
            })
            .await?;

        tx.commit().await?;

        Ok(TransferOutput {
            correlation_id: stored.correlation_id().0,
            status: stored.status(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bus::MockBusProducer;
    use crate::domain::cache::MockIdempotencyCache;
    use crate::infrastructure::persistence::transaction_repository::PostgresTransactionRepository;
    use crate::infrastructure::persistence::wallet_repository::PostgresWalletRepository;
    use std::time::Duration;

    #[sqlx::test]
    async fn rejects_when_sender_has_no_wallet(pool: PgPool) {
        let mut cache = MockIdempotencyCache::new();
        cache.expect_exists().returning(|_| Ok(false));
        cache.expect_remember().returning(|_, _, _| Ok(()));
        let mut bus = MockBusProducer::new();
        bus.expect_publish_request().times(0);

        let use_case = TransferUseCase::new(
            pool,
            Arc::new(PostgresWalletRepository::new()),
            Arc::new(PostgresTransactionRepository::new()),
            Arc::new(cache),
            Arc::new(bus),
            Duration::from_secs(3600),
        );

        let result = use_case
            .execute(UserId(1), UserId(2), Decimal::from(10), CurrencyCode::USD, "k1".into())
            .await;

        assert!(matches!(result, Err(WalletError::NoWallet(_))));
    }

    #[tokio::test]
    async fn rejects_duplicate_idempotency_key_before_touching_the_database() {
        let mut cache = MockIdempotencyCache::new();
        cache.expect_exists().returning(|_| Ok(true));

        let result = idempotency::admit(&cache, "dup-key", Duration::from_secs(3600)).await;
        assert!(matches!(result, Err(WalletError::IdempotentlyDone(_))));
    }
}
