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

pub struct ConvertOutput {
    pub correlation_id: uuid::Uuid,
    pub status: TransactionStatus,
}

/// §4.6 `Convert`: same admission pattern as `Transfer`, but within a single
/// wallet, carrying both currency legs on one work item.
pub struct ConvertUseCase {
    pool: PgPool,
    wallets: Arc<dyn WalletRepository>,
    transactions: Arc<dyn TransactionRepository>,
    cache: Arc<dyn IdempotencyCache>,
    bus: Arc<dyn BusProducer>,
    idempotency_ttl: std::time::Duration,
}

impl ConvertUseCase {
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
        user_id: UserId,
        amount: Decimal,
        from_currency: CurrencyCode,
        to_currency: CurrencyCode,
        idempotency_key: String,
    ) -> Result<ConvertOutput, WalletError> {
        idempotency::admit(self.cache.as_ref(), &idempotency_key, self.idempotency_ttl).await?;

        let mut tx = self.pool.begin().await?;

        let wallet = self
            .wallets
            .find_by_user_id(&mut tx, user_id)
            .await?
            .ok_or(WalletError::NoWallet(user_id))?;

        let draft = WalletTransaction::new(
            TransactionId(0),
            user_id,
            wallet.id(),
            None,
            None,
            None,
            Some(from_currency),
            Some(to_currency),
            amount,
            OperationType::Convert,
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
                operation: OperationType::Convert,
                amount,
                currency: from_currency,
                to_currency: Some(to_currency),
                wallet_id: wallet.id(),
                to_wallet_id: None,
                idempotency_key,
                correlation_id: stored.correlation_id(),
                transaction_id: stored.id(),
                retries: 0,
            })
            .await?;

        tx.commit().await?;

        Ok(ConvertOutput {
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
    async fn publishes_a_convert_work_item_and_marks_the_transaction_processed(pool: PgPool) {
        let wallets = Arc::new(PostgresWalletRepository::new());
        let mut tx = pool.begin().await.unwrap();
        let wallet = wallets.create(&mut tx, UserId(9)).await.unwrap();
        tx.commit().await.unwrap();

        let mut cache = MockIdempotencyCache::new();
        cache.expect_exists().returning(|_| Ok(false));
        cache.expect_remember().returning(|_, _, _| Ok(()));
        let mut bus = MockBusProducer::new();
        bus.expect_publish_request()
            .withf(|req| req.operation == OperationType::Convert && req.to_currency == Some(CurrencyCode::EUR))
            .times(1)
            .returning(|_| Ok(()));

        let use_case = ConvertUseCase::new(
            pool,
            wallets,
            Arc::new(PostgresTransactionRepository::new()),
            Arc::new(cache),
            Arc::new(bus),
            Duration::from_secs(3600),
        );

        let output = use_case
            .execute(UserId(9), Decimal::from(50), CurrencyCode::USD, CurrencyCode::EUR, "conv-1".into())
            .await
            .unwrap();

        assert_eq!(output.status, TransactionStatus::Processed);
        let _ = wallet;
    }
}
