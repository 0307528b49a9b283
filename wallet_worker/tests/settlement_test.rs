use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::enums::{CurrencyCode, OperationType, TransactionStatus, WalletAccountType};
use common::error::WalletError;
use common::ids::{CorrelationId, TransactionId, UserId, WalletId};
use common::messages::{WalletTransactionRequest, WalletTransactionResult};
use rust_decimal::Decimal;
use sqlx::PgPool;

use wallet_worker::domain::bus::BusProducer;
use wallet_worker::domain::cache::IdempotencyCache;
use wallet_worker::domain::repository::{TransactionRepository, WalletAccountRepository};
use wallet_worker::infrastructure::persistence::currency_repository::PostgresCurrencyRepository;
use wallet_worker::infrastructure::persistence::transaction_repository::PostgresTransactionRepository;
use wallet_worker::infrastructure::persistence::wallet_account_repository::PostgresWalletAccountRepository;
use wallet_worker::use_cases::process_transaction::ProcessTransactionUseCase;

/// Integration tests link against the crate's non-`cfg(test)` rlib, so the
/// `mockall::automock`-generated mocks (gated behind `cfg(test)` for the
/// unit-test build) aren't visible here. These hand-rolled fakes stand in
/// for them instead.
#[derive(Default)]
struct RecordingBus {
    results_published: AtomicUsize,
}

#[async_trait]
impl BusProducer for RecordingBus {
    async fn publish_result(&self, _result: &WalletTransactionResult) -> Result<(), WalletError> {
        self.results_published.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn publish_to_dlq(&self, _request: &WalletTransactionRequest) -> Result<(), WalletError> {
        Ok(())
    }

    async fn republish_request(&self, _request: &WalletTransactionRequest) -> Result<(), WalletError> {
        Ok(())
    }
}

#[derive(Default)]
struct NullCache;

#[async_trait]
impl IdempotencyCache for NullCache {
    async fn remember(&self, _key: &str, _payload: &str, _ttl: Duration) -> Result<(), WalletError> {
        Ok(())
    }
}

async fn seed_wallet(pool: &PgPool, user_id: i64) -> WalletId {
    let row: (i64,) = sqlx::query_as("INSERT INTO wallets (user_id) VALUES ($1) RETURNING id")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .unwrap();
    WalletId(row.0)
}

async fn seed_transaction(
    pool: &PgPool,
    wallet_id: WalletId,
    from_wallet_id: Option<WalletId>,
    to_wallet_id: Option<WalletId>,
    operation: OperationType,
    idempotency_key: &str,
) -> TransactionId {
    let row: (i64,) = sqlx::query_as(
        r#"
        INSERT INTO wallet_transactions (
            user_id, wallet_id, from_wallet_id, to_wallet_id, currency,
            amount, operation, status, correlation_id, idempotency_key
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, 'processed', $8, $9)
        RETURNING id
        "#,
    )
    .bind(UserId(1))
    .bind(wallet_id)
    .bind(from_wallet_id)
    .bind(to_wallet_id)
    .bind(CurrencyCode::USD)
    .bind(Decimal::from(25))
    .bind(operation)
    .bind(CorrelationId::new())
    .bind(idempotency_key)
    .fetch_one(pool)
    .await
    .unwrap();
    TransactionId(row.0)
}

#[sqlx::test(migrations = "../wallet_service/migrations")]
async fn transfer_moves_funds_between_two_wallets_and_completes_the_transaction(pool: PgPool) {
    let accounts = Arc::new(PostgresWalletAccountRepository::new());
    let transactions = Arc::new(PostgresTransactionRepository::new());

    let from_wallet = seed_wallet(&pool, 1).await;
    let to_wallet = seed_wallet(&pool, 2).await;

    let mut tx = pool.begin().await.unwrap();
    let mut source = accounts
        .create(&mut tx, from_wallet, CurrencyCode::USD, WalletAccountType::Fiat)
        .await
        .unwrap();
    source.credit(Decimal::from(100));
    accounts.save_amount(&mut tx, &source).await.unwrap();
    tx.commit().await.unwrap();

    let transaction_id = seed_transaction(
        &pool,
        from_wallet,
        Some(from_wallet),
        Some(to_wallet),
        OperationType::Transfer,
        "transfer-1",
    )
    .await;

    let bus = Arc::new(RecordingBus::default());

    let use_case = ProcessTransactionUseCase::new(
        pool.clone(),
        accounts.clone(),
        transactions.clone(),
        Arc::new(PostgresCurrencyRepository::new()),
        Arc::new(NullCache),
        bus.clone(),
        Duration::from_secs(3600),
    );

    let request = WalletTransactionRequest {
        operation: OperationType::Transfer,
        amount: Decimal::from(25),
        currency: CurrencyCode::USD,
        to_currency: None,
        wallet_id: from_wallet,
        to_wallet_id: Some(to_wallet),
        idempotency_key: "transfer-1".into(),
        correlation_id: CorrelationId::new(),
        transaction_id,
        retries: 0,
    };

    use_case.settle(&request).await.unwrap();

    let mut tx = pool.begin().await.unwrap();
    let from_account = accounts
        .find_for_update(&mut tx, from_wallet, CurrencyCode::USD)
        .await
        .unwrap()
        .unwrap();
    let to_account = accounts
        .find_for_update(&mut tx, to_wallet, CurrencyCode::USD)
        .await
        .unwrap()
        .unwrap();
    let transaction = transactions.find_by_id(&mut tx, transaction_id).await.unwrap().unwrap();
    tx.commit().await.unwrap();

    assert_eq!(from_account.amount(), Decimal::from(75));
    assert_eq!(to_account.amount(), Decimal::from(25));
    assert_eq!(transaction.status(), TransactionStatus::Completed);
    assert_eq!(bus.results_published.load(Ordering::SeqCst), 1);
}

#[sqlx::test(migrations = "../wallet_service/migrations")]
async fn transfer_with_insufficient_funds_leaves_the_ledger_untouched(pool: PgPool) {
    let accounts = Arc::new(PostgresWalletAccountRepository::new());
    let transactions = Arc::new(PostgresTransactionRepository::new());

    let from_wallet = seed_wallet(&pool, 3).await;
    let to_wallet = seed_wallet(&pool, 4).await;
    let transaction_id = seed_transaction(
        &pool,
        from_wallet,
        Some(from_wallet),
        Some(to_wallet),
        OperationType::Transfer,
        "transfer-2",
    )
    .await;

    let use_case = ProcessTransactionUseCase::new(
        pool.clone(),
        accounts,
        transactions,
        Arc::new(PostgresCurrencyRepository::new()),
        Arc::new(NullCache),
        Arc::new(RecordingBus::default()),
        Duration::from_secs(3600),
    );

    let request = WalletTransactionRequest {
        operation: OperationType::Transfer,
        amount: Decimal::from(25),
        currency: CurrencyCode::USD,
        to_currency: None,
        wallet_id: from_wallet,
        to_wallet_id: Some(to_wallet),
        idempotency_key: "transfer-2".into(),
        correlation_id: CorrelationId::new(),
        transaction_id,
        retries: 0,
    };

    let result = use_case.settle(&request).await;
    assert!(result.is_err());
}
