use std::sync::Arc;
use std::time::Duration;

use common::enums::{OperationType, Provider, TransactionStatus};
use common::error::WalletError;
use common::messages::{NormalizedProviderEvent, WalletTransactionRequest};
use sqlx::PgPool;

use crate::domain::bus::BusProducer;
use crate::domain::cache::IdempotencyCache;
use crate::domain::provider_balance::ProviderBalanceManager;
use crate::domain::repository::TransactionRepository;

pub struct HandleStripePayoutOutput {
    pub success: bool,
    pub message: String,
}

/// §4.6 withdraw webhook. Mirrors `HandleStripePaymentUseCase` with the
/// provider-balance delta negated and `operation: withdraw` on the work item.
pub struct HandleStripePayoutUseCase {
    pool: PgPool,
    transactions: Arc<dyn TransactionRepository>,
    cache: Arc<dyn IdempotencyCache>,
    bus: Arc<dyn BusProducer>,
    provider_balance: ProviderBalanceManager,
    idempotency_ttl: Duration,
}

impl HandleStripePayoutUseCase {
    pub fn new(
        pool: PgPool,
        transactions: Arc<dyn TransactionRepository>,
        cache: Arc<dyn IdempotencyCache>,
        bus: Arc<dyn BusProducer>,
        provider_balance: ProviderBalanceManager,
        idempotency_ttl: Duration,
    ) -> Self {
        Self {
            pool,
            transactions,
            cache,
            bus,
            provider_balance,
            idempotency_ttl,
        }
    }

    #[tracing::instrument(skip(self, event))]
    pub async fn execute(
        &self,
        event: NormalizedProviderEvent,
    ) -> Result<HandleStripePayoutOutput, WalletError> {
        if self.cache.exists(&event.idempotency_key).await? {
            return Ok(HandleStripePayoutOutput {
                success: true,
                message: "payout already processed".to_string(),
            });
        }

        let mut tx = self.pool.begin().await?;

        let transaction = self
            .transactions
            .find_by_id(&mut tx, event.transaction_id)
            .await?
            .ok_or_else(|| {
                WalletError::InvalidData(format!(
                    "webhook references unknown transaction {}",
                    event.transaction_id
                ))
            })?;

        self.provider_balance
            .change_amount(&mut tx, Provider::Stripe, -event.amount, event.currency)
            .await?;

        self.transactions
            .update_status(
                &mut tx,
                event.transaction_id,
                TransactionStatus::Processed,
                Some(&event.external_payment_id),
            )
            .await?;

        self.bus
            .publish_request(&WalletTransactionRequest {
                operation: OperationType::Withdraw,
                amount: event.amount,
                currency: event.currency,
                to_currency: None,
                wallet_id: event.wallet_id,
                to_wallet_id: None,
                idempotency_key: event.idempotency_key.clone(),
                correlation_id: transaction.correlation_id(),
                transaction_id: event.transaction_id,
                retries: 0,
            })
            .await?;

        tx.commit().await?;

        self.cache
            .remember(&event.idempotency_key, "processed", self.idempotency_ttl)
            .await?;

        Ok(HandleStripePayoutOutput {
            success: true,
            message: "payout processed".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bus::MockBusProducer;
    use crate::domain::cache::MockIdempotencyCache;
    use crate::infrastructure::persistence::currency_repository::PostgresCurrencyRepository;
    use crate::infrastructure::persistence::provider_balance_repository::PostgresProviderBalanceRepository;
    use crate::infrastructure::persistence::transaction_repository::PostgresTransactionRepository;
    use common::entities::WalletTransaction;
    use common::ids::{TransactionId, UserId, WalletId};
    use rust_decimal::Decimal;

    #[sqlx::test]
    async fn replays_as_success_without_touching_anything_when_already_processed(pool: PgPool) {
        let mut cache = MockIdempotencyCache::new();
        cache.expect_exists().returning(|_| Ok(true));

        let mut bus = MockBusProducer::new();
        bus.expect_publish_request().times(0);

        let use_case = HandleStripePayoutUseCase::new(
            pool.clone(),
            Arc::new(PostgresTransactionRepository::new()),
            Arc::new(cache),
            Arc::new(bus),
            ProviderBalanceManager::new(
                Arc::new(PostgresProviderBalanceRepository::new()),
                Arc::new(PostgresCurrencyRepository::new()),
            ),
            Duration::from_secs(3600),
        );

        let output = use_case
            .execute(NormalizedProviderEvent {
                idempotency_key: "payout-1".into(),
                external_payment_id: "po_1".into(),
                amount: Decimal::from(15),
                currency: common::enums::CurrencyCode::USD,
                status: "paid".into(),
                livemode: false,
                transaction_id: TransactionId(1),
                wallet_id: WalletId(1),
            })
            .await
            .unwrap();

        assert!(output.success);
        assert_eq!(output.message, "payout already processed");
    }

    #[sqlx::test]
    async fn debits_provider_balance_and_forwards_the_withdraw_to_the_worker(pool: PgPool) {
        sqlx::query("INSERT INTO wallets (user_id) VALUES ($1)")
            .bind(UserId(11))
            .execute(&pool)
            .await
            .unwrap();

        let transactions_repo = Arc::new(PostgresTransactionRepository::new());
        let draft = WalletTransaction::new(
            TransactionId(0),
            UserId(11),
            WalletId(1),
            None,
            None,
            Some(common::enums::CurrencyCode::USD),
            None,
            None,
            Decimal::from(15),
            OperationType::Withdraw,
            "payout-2".into(),
            Some(Provider::Stripe),
        )
        .unwrap();
        let mut tx = pool.begin().await.unwrap();
        let stored = transactions_repo.create(&mut tx, &draft).await.unwrap();
        tx.commit().await.unwrap();

        let mut cache = MockIdempotencyCache::new();
        cache.expect_exists().returning(|_| Ok(false));
        cache.expect_remember().times(1).returning(|_, _, _| Ok(()));

        let mut bus = MockBusProducer::new();
        bus.expect_publish_request()
            .withf(|r| r.operation == OperationType::Withdraw)
            .times(1)
            .returning(|_| Ok(()));

        let use_case = HandleStripePayoutUseCase::new(
            pool,
            transactions_repo,
            Arc::new(cache),
            Arc::new(bus),
            ProviderBalanceManager::new(
                Arc::new(PostgresProviderBalanceRepository::new()),
                Arc::new(PostgresCurrencyRepository::new()),
            ),
            Duration::from_secs(3600),
        );

        let output = use_case
            .execute(NormalizedProviderEvent {
                idempotency_key: "payout-2".into(),
                external_payment_id: "po_2".into(),
                amount: Decimal::from(15),
                currency: common::enums::CurrencyCode::USD,
                status: "paid".into(),
                livemode: false,
                transaction_id: stored.id(),
                wallet_id: WalletId(1),
            })
            .await
            .unwrap();

        assert!(output.success);
    }
}
