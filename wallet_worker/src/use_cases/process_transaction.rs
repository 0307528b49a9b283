use std::sync::Arc;
use std::time::Duration;

use common::enums::{CurrencyCode, OperationType, TransactionStatus};
use common::error::WalletError;
use common::ids::WalletId;
use common::messages::{ResultStatus, WalletTransactionRequest, WalletTransactionResult};
use common::money::convert;
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::domain::bus::BusProducer;
use crate::domain::cache::IdempotencyCache;
use crate::domain::repository::{CurrencyRepository, Tx, TransactionRepository, WalletAccountRepository};

pub const MAX_RETRIES: u32 = 3;

/// §4.7: settles one work item from `wallet.transaction.request` inside a
/// single database transaction, then either completes it or routes it to the
/// DLQ when retries are exhausted. The consumer loop owns offset commits;
/// this use case never touches Kafka offsets.
pub struct ProcessTransactionUseCase {
    pool: PgPool,
    accounts: Arc<dyn WalletAccountRepository>,
    transactions: Arc<dyn TransactionRepository>,
    currencies: Arc<dyn CurrencyRepository>,
    cache: Arc<dyn IdempotencyCache>,
    bus: Arc<dyn BusProducer>,
    idempotency_ttl: Duration,
}

impl ProcessTransactionUseCase {
    pub fn new(
        pool: PgPool,
        accounts: Arc<dyn WalletAccountRepository>,
        transactions: Arc<dyn TransactionRepository>,
        currencies: Arc<dyn CurrencyRepository>,
        cache: Arc<dyn IdempotencyCache>,
        bus: Arc<dyn BusProducer>,
        idempotency_ttl: Duration,
    ) -> Self {
        Self {
            pool,
            accounts,
            transactions,
            currencies,
            cache,
            bus,
            idempotency_ttl,
        }
    }

    /// Mutates the ledger, marks the transaction `completed`, stores the
    /// result under the idempotency key and publishes it, then commits,
    /// in that order, matching the work item's numbered lifecycle.
    #[tracing::instrument(skip(self, request))]
    pub async fn settle(&self, request: &WalletTransactionRequest) -> Result<(), WalletError> {
        request.validate()?;

        let mut tx = self.pool.begin().await?;

        self.dispatch(&mut tx, request).await?;

        self.transactions
            .update_status(&mut tx, request.transaction_id, TransactionStatus::Completed, None)
            .await?;

        let result = WalletTransactionResult {
            status: ResultStatus::Success,
            operation: request.operation,
            wallet_id: request.wallet_id,
            amount: request.amount,
            idempotency_key: request.idempotency_key.clone(),
            correlation_id: request.correlation_id,
        };
        let payload = serde_json::to_string(&result)
            .map_err(|e| WalletError::InvalidData(format!("failed to serialize result: {e}")))?;
        self.cache
            .remember(&request.idempotency_key, &payload, self.idempotency_ttl)
            .await?;
        self.bus.publish_result(&result).await?;

        tx.commit().await?;
        Ok(())
    }

    /// §4.7 step 2: a work item that has already exhausted its retries is
    /// routed to the DLQ instead of being settled. The referenced
    /// transaction moves to `failed` in its own short transaction.
    #[tracing::instrument(skip(self, request))]
    pub async fn fail_via_dlq(&self, request: &WalletTransactionRequest) -> Result<(), WalletError> {
        let mut tx = self.pool.begin().await?;
        self.transactions
            .update_status(&mut tx, request.transaction_id, TransactionStatus::Failed, None)
            .await?;
        tx.commit().await?;

        self.bus.publish_to_dlq(request).await
    }

    /// Called by the consumer loop when `settle` fails or times out: bumps
    /// `retries` and republishes onto the request topic. The original
    /// Kafka offset is committed regardless of the outcome here; the
    /// consumer moves on rather than reprocessing the same delivery.
    #[tracing::instrument(skip(self, request))]
    pub async fn requeue(&self, request: &WalletTransactionRequest) -> Result<(), WalletError> {
        self.bus.republish_request(&request.with_retry()).await
    }

    async fn dispatch(&self, tx: &mut Tx<'_>, request: &WalletTransactionRequest) -> Result<(), WalletError> {
        match request.operation {
            OperationType::Deposit => {
                self.credit(tx, request.wallet_id, request.currency, request.amount).await
            }
            OperationType::Withdraw => {
                self.debit(tx, request.wallet_id, request.currency, request.amount).await
            }
            OperationType::Transfer => {
                let to_wallet_id = request.to_wallet_id.ok_or_else(|| {
                    WalletError::InvalidData("transfer work item missing to_wallet_id".into())
                })?;
                self.move_funds(tx, request.wallet_id, to_wallet_id, request.currency, request.amount)
                    .await
            }
            OperationType::Convert => {
                let to_currency = request.to_currency.ok_or_else(|| {
                    WalletError::InvalidData("convert work item missing to_currency".into())
                })?;
                self.convert_funds(tx, request.wallet_id, request.currency, to_currency, request.amount)
                    .await
            }
        }
    }

    async fn debit(
        &self,
        tx: &mut Tx<'_>,
        wallet_id: WalletId,
        currency: CurrencyCode,
        amount: Decimal,
    ) -> Result<(), WalletError> {
        let mut account = self
            .accounts
            .find_for_update(tx, wallet_id, currency)
            .await?
            .ok_or(WalletError::InsufficientFunds(wallet_id))?;
        account.debit(amount)?;
        self.accounts.save_amount(tx, &account).await
    }

    async fn credit(
        &self,
        tx: &mut Tx<'_>,
        wallet_id: WalletId,
        currency: CurrencyCode,
        amount: Decimal,
    ) -> Result<(), WalletError> {
        let mut account = match self.accounts.find_for_update(tx, wallet_id, currency).await? {
            Some(account) => account,
            None => self.accounts.create(tx, wallet_id, currency, currency.kind()).await?,
        };
        account.credit(amount);
        self.accounts.save_amount(tx, &account).await
    }

    /// Locks both legs in `(wallet_id, currency)` order before mutating
    /// either, so two moves touching the same pair of accounts from
    /// opposite directions can never deadlock.
    async fn move_funds(
        &self,
        tx: &mut Tx<'_>,
        from_wallet_id: WalletId,
        to_wallet_id: WalletId,
        currency: CurrencyCode,
        amount: Decimal,
    ) -> Result<(), WalletError> {
        let (first, second) = order_legs(from_wallet_id, currency, to_wallet_id, currency);
        self.lock_leg(tx, first.0, first.1).await?;
        self.lock_leg(tx, second.0, second.1).await?;

        self.debit(tx, from_wallet_id, currency, amount).await?;
        self.credit(tx, to_wallet_id, currency, amount).await
    }

    async fn convert_funds(
        &self,
        tx: &mut Tx<'_>,
        wallet_id: WalletId,
        from_currency: CurrencyCode,
        to_currency: CurrencyCode,
        amount: Decimal,
    ) -> Result<(), WalletError> {
        let (first, second) = order_legs(wallet_id, from_currency, wallet_id, to_currency);
        self.lock_leg(tx, first.0, first.1).await?;
        self.lock_leg(tx, second.0, second.1).await?;

        let rate_from = self.rate(tx, from_currency).await?;
        let rate_to = self.rate(tx, to_currency).await?;
        let converted = convert(amount, rate_from, rate_to);

        self.debit(tx, wallet_id, from_currency, amount).await?;
        self.credit(tx, wallet_id, to_currency, converted).await
    }

    /// Takes the `FOR UPDATE` lock (creating the account if it doesn't
    /// exist yet) ahead of the debit/credit that follows, so both legs of a
    /// two-account move are locked in the same canonical order.
    async fn lock_leg(&self, tx: &mut Tx<'_>, wallet_id: WalletId, currency: CurrencyCode) -> Result<(), WalletError> {
        if self.accounts.find_for_update(tx, wallet_id, currency).await?.is_none() {
            self.accounts.create(tx, wallet_id, currency, currency.kind()).await?;
        }
        Ok(())
    }

    async fn rate(&self, tx: &mut Tx<'_>, code: CurrencyCode) -> Result<Decimal, WalletError> {
        self.currencies
            .find(tx, code)
            .await?
            .map(|c| c.rate_to_base())
            .ok_or_else(|| WalletError::InvalidData(format!("no FX rate on file for {code:?}")))
    }
}

/// Deterministic lock order for a pair of `(wallet_id, currency)` legs, so
/// concurrent opposite-direction moves over the same accounts always
/// request their locks in the same order.
fn order_legs(
    wallet_a: WalletId,
    currency_a: CurrencyCode,
    wallet_b: WalletId,
    currency_b: CurrencyCode,
) -> ((WalletId, CurrencyCode), (WalletId, CurrencyCode)) {
    let key_a = (wallet_a.0, currency_a.as_str());
    let key_b = (wallet_b.0, currency_b.as_str());
    if key_a <= key_b {
        ((wallet_a, currency_a), (wallet_b, currency_b))
    } else {
        ((wallet_b, currency_b), (wallet_a, currency_a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bus::MockBusProducer;
    use crate::domain::cache::MockIdempotencyCache;
    use crate::domain::repository::MockTransactionRepository;
    use crate::infrastructure::persistence::currency_repository::PostgresCurrencyRepository;
    use crate::infrastructure::persistence::wallet_account_repository::PostgresWalletAccountRepository;
    use common::ids::{CorrelationId, TransactionId};
    use rstest::rstest;

    fn sample_request(operation: OperationType) -> WalletTransactionRequest {
        WalletTransactionRequest {
            operation,
            amount: Decimal::from(10),
            currency: CurrencyCode::USD,
            to_currency: if operation == OperationType::Convert {
                Some(CurrencyCode::EUR)
            } else {
                None
            },
            wallet_id: WalletId(1),
            to_wallet_id: if operation == OperationType::Transfer {
                Some(WalletId(2))
            } else {
                None
            },
            idempotency_key: "k1".into(),
            correlation_id: CorrelationId::new(),
            transaction_id: TransactionId(1),
            retries: 0,
        }
    }

    #[rstest]
    #[case(OperationType::Deposit)]
    #[case(OperationType::Withdraw)]
    #[case(OperationType::Transfer)]
    #[case(OperationType::Convert)]
    fn every_operation_shape_passes_its_own_validation(#[case] operation: OperationType) {
        assert!(sample_request(operation).validate().is_ok());
    }

    #[sqlx::test(migrations = "../wallet_service/migrations")]
    async fn deposit_credits_a_fresh_account(pool: PgPool) {
        let mut cache = MockIdempotencyCache::new();
        cache.expect_remember().returning(|_, _, _| Ok(()));
        let mut bus = MockBusProducer::new();
        bus.expect_publish_result().returning(|_| Ok(()));
        let mut transactions = MockTransactionRepository::new();
        transactions
            .expect_update_status()
            .withf(|_, status, _| *status == TransactionStatus::Completed)
            .returning(|_, _, _| Ok(()));

        let use_case = ProcessTransactionUseCase::new(
            pool,
            Arc::new(PostgresWalletAccountRepository::new()),
            Arc::new(transactions),
            Arc::new(PostgresCurrencyRepository::new()),
            Arc::new(cache),
            Arc::new(bus),
            Duration::from_secs(3600),
        );

        let request = sample_request(OperationType::Deposit);
        use_case.settle(&request).await.unwrap();
    }

    #[sqlx::test(migrations = "../wallet_service/migrations")]
    async fn withdraw_without_an_existing_account_fails_insufficient_funds(pool: PgPool) {
        let use_case = ProcessTransactionUseCase::new(
            pool,
            Arc::new(PostgresWalletAccountRepository::new()),
            Arc::new(MockTransactionRepository::new()),
            Arc::new(PostgresCurrencyRepository::new()),
            Arc::new(MockIdempotencyCache::new()),
            Arc::new(MockBusProducer::new()),
            Duration::from_secs(3600),
        );

        let request = sample_request(OperationType::Withdraw);
        let result = use_case.settle(&request).await;
        assert!(matches!(result, Err(WalletError::InsufficientFunds(_))));
    }

    #[sqlx::test(migrations = "../wallet_service/migrations")]
    async fn fail_via_dlq_marks_the_transaction_failed_and_publishes_to_the_dlq(pool: PgPool) {
        let mut transactions = MockTransactionRepository::new();
        transactions
            .expect_update_status()
            .withf(|_, status, _| *status == TransactionStatus::Failed)
            .returning(|_, _, _| Ok(()));
        let mut bus = MockBusProducer::new();
        bus.expect_publish_to_dlq().times(1).returning(|_| Ok(()));

        let use_case = ProcessTransactionUseCase::new(
            pool,
            Arc::new(PostgresWalletAccountRepository::new()),
            Arc::new(transactions),
            Arc::new(PostgresCurrencyRepository::new()),
            Arc::new(MockIdempotencyCache::new()),
            Arc::new(bus),
            Duration::from_secs(3600),
        );

        let mut request = sample_request(OperationType::Deposit);
        request.retries = MAX_RETRIES;
        use_case.fail_via_dlq(&request).await.unwrap();
    }

    #[sqlx::test(migrations = "../wallet_service/migrations")]
    async fn requeue_increments_retries_before_republishing(pool: PgPool) {
        let mut bus = MockBusProducer::new();
        bus.expect_republish_request()
            .withf(|req| req.retries == 1)
            .times(1)
            .returning(|_| Ok(()));

        let use_case = ProcessTransactionUseCase::new(
            pool,
            Arc::new(PostgresWalletAccountRepository::new()),
            Arc::new(MockTransactionRepository::new()),
            Arc::new(PostgresCurrencyRepository::new()),
            Arc::new(MockIdempotencyCache::new()),
            Arc::new(bus),
            Duration::from_secs(3600),
        );

        let request = sample_request(OperationType::Deposit);
        use_case.requeue(&request).await.unwrap();
    }
}
