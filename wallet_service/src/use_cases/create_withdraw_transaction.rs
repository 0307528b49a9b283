use std::sync::Arc;
use std::time::Duration;

use common::entities::WalletTransaction;
use common::enums::{CurrencyCode, OperationType, Provider, TransactionStatus};
use common::error::WalletError;
use common::ids::{TransactionId, UserId};
use common::money::convert;
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::domain::cache::IdempotencyCache;
use crate::domain::gateway::ProviderGateways;
use crate::domain::idempotency;
use crate::domain::repository::{
    CurrencyRepository, ProviderBalanceRepository, ProviderLinkedAccountRepository,
    TransactionRepository, WalletAccountRepository, WalletRepository,
};

pub struct CreateWithdrawTransactionOutput {
    pub correlation_id: uuid::Uuid,
    pub status: TransactionStatus,
}

/// §4.6 `CreateWithdrawTransaction`: the one synchronous payout path, unlike
/// `Transfer`/`Convert`, the ledger debit itself is deferred to the worker
/// once `HandleStripePayoutUseCase` confirms the payout via webhook; this use
/// case only admits the request and kicks off the provider-side payout.
pub struct CreateWithdrawTransactionUseCase {
    pool: PgPool,
    wallets: Arc<dyn WalletRepository>,
    accounts: Arc<dyn WalletAccountRepository>,
    transactions: Arc<dyn TransactionRepository>,
    provider_balances: Arc<dyn ProviderBalanceRepository>,
    currencies: Arc<dyn CurrencyRepository>,
    linked_accounts: Arc<dyn ProviderLinkedAccountRepository>,
    cache: Arc<dyn IdempotencyCache>,
    gateways: ProviderGateways,
    idempotency_ttl: Duration,
}

impl CreateWithdrawTransactionUseCase {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: PgPool,
        wallets: Arc<dyn WalletRepository>,
        accounts: Arc<dyn WalletAccountRepository>,
        transactions: Arc<dyn TransactionRepository>,
        provider_balances: Arc<dyn ProviderBalanceRepository>,
        currencies: Arc<dyn CurrencyRepository>,
        linked_accounts: Arc<dyn ProviderLinkedAccountRepository>,
        cache: Arc<dyn IdempotencyCache>,
        gateways: ProviderGateways,
        idempotency_ttl: Duration,
    ) -> Self {
        Self {
            pool,
            wallets,
            accounts,
            transactions,
            provider_balances,
            currencies,
            linked_accounts,
            cache,
            gateways,
            idempotency_ttl,
        }
    }

    #[tracing::instrument(skip(self))]
    #[allow(clippy::too_many_arguments)]
    pub async fn execute(
        &self,
        user_id: UserId,
        amount: Decimal,
        currency: CurrencyCode,
        gateway: Provider,
        idempotency_key: String,
    ) -> Result<CreateWithdrawTransactionOutput, WalletError> {
        idempotency::admit(self.cache.as_ref(), &idempotency_key, self.idempotency_ttl).await?;

        let mut tx = self.pool.begin().await?;

        let wallet = self
            .wallets
            .find_by_user_id(&mut tx, user_id)
            .await?
            .ok_or(WalletError::NoWallet(user_id))?;

        let account = self
            .accounts
            .find(&mut tx, wallet.id(), currency)
            .await?
            .ok_or(WalletError::InsufficientFunds(wallet.id()))?;
        if account.amount() < amount {
            return Err(WalletError::InsufficientFunds(wallet.id()));
        }

        let balance = self
            .provider_balances
            .find_for_update(&mut tx, gateway)
            .await?
            .ok_or(WalletError::ProviderLiquidityExhausted)?;
        let amount_in_settlement = if currency == balance.currency() {
            amount
        } else {
            let rate_from = self.rate(&mut tx, currency).await?;
            let rate_to = self.rate(&mut tx, balance.currency()).await?;
            convert(amount, rate_from, rate_to)
        };
        if balance.available_amount() < amount_in_settlement {
            return Err(WalletError::ProviderLiquidityExhausted);
        }

        let linked_account = self
            .linked_accounts
            .find_by_user(&mut tx, user_id, gateway)
            .await?
            .ok_or(WalletError::NoProviderAccount(user_id))?;
        self.gateways.get(gateway).verify_account_ready(&linked_account).await?;

        let draft = WalletTransaction::new(
            TransactionId(0),
            user_id,
            wallet.id(),
            None,
            None,
            Some(currency),
            None,
            None,
            amount,
            OperationType::Withdraw,
            idempotency_key,
            Some(gateway),
        )?;
        let stored = self.transactions.create(&mut tx, &draft).await?;

        let payout = self
            .gateways
            .get(gateway)
            .payout(&linked_account, amount, currency)
            .await?;

        self.transactions
            .update_status(&mut tx, stored.id(), stored.status(), Some(&payout.payout_id))
            .await?;

        tx.commit().await?;

        Ok(CreateWithdrawTransactionOutput {
            correlation_id: stored.correlation_id().0,
            status: stored.status(),
        })
    }

    async fn rate(
        &self,
        tx: &mut crate::domain::repository::Tx<'_>,
        code: CurrencyCode,
    ) -> Result<Decimal, WalletError> {
        self.currencies
            .find(tx, code)
            .await?
            .map(|c| c.rate_to_base())
            .ok_or_else(|| WalletError::InvalidData(format!("no FX rate on file for {code:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::MockIdempotencyCache;
    use crate::domain::gateway::{MockProviderGateway, PayoutResult};
    use crate::infrastructure::persistence::currency_repository::PostgresCurrencyRepository;
    use crate::infrastructure::persistence::provider_balance_repository::PostgresProviderBalanceRepository;
    use crate::infrastructure::persistence::provider_linked_account_repository::PostgresProviderLinkedAccountRepository;
    use crate::infrastructure::persistence::transaction_repository::PostgresTransactionRepository;
    use crate::infrastructure::persistence::wallet_account_repository::PostgresWalletAccountRepository;
    use crate::infrastructure::persistence::wallet_repository::PostgresWalletRepository;

    fn use_case(
        pool: PgPool,
        stripe: MockProviderGateway,
        cache: MockIdempotencyCache,
    ) -> CreateWithdrawTransactionUseCase {
        CreateWithdrawTransactionUseCase::new(
            pool,
            Arc::new(PostgresWalletRepository::new()),
            Arc::new(PostgresWalletAccountRepository::new()),
            Arc::new(PostgresTransactionRepository::new()),
            Arc::new(PostgresProviderBalanceRepository::new()),
            Arc::new(PostgresCurrencyRepository::new()),
            Arc::new(PostgresProviderLinkedAccountRepository::new()),
            Arc::new(cache),
            ProviderGateways {
                stripe: Arc::new(stripe),
                cloudpayments: Arc::new(MockProviderGateway::new()),
            },
            Duration::from_secs(3600),
        )
    }

    #[sqlx::test]
    async fn rejects_when_the_account_balance_is_below_the_withdrawal_amount(pool: PgPool) {
        sqlx::query("INSERT INTO wallets (user_id) VALUES ($1)")
            .bind(UserId(20))
            .execute(&pool)
            .await
            .unwrap();
        let wallets = PostgresWalletRepository::new();
        let accounts = PostgresWalletAccountRepository::new();
        let mut tx = pool.begin().await.unwrap();
        let wallet = wallets.find_by_user_id(&mut tx, UserId(20)).await.unwrap().unwrap();
        let mut account = accounts
            .create(&mut tx, wallet.id(), CurrencyCode::USD, CurrencyCode::USD.kind())
            .await
            .unwrap();
        account.credit(Decimal::from(5));
        accounts.save_amount(&mut tx, &account).await.unwrap();
        tx.commit().await.unwrap();

        let mut cache = MockIdempotencyCache::new();
        cache.expect_exists().returning(|_| Ok(false));
        cache.expect_remember().returning(|_, _, _| Ok(()));

        let mut stripe = MockProviderGateway::new();
        stripe.expect_payout().times(0);

        let result = use_case(pool, stripe, cache)
            .execute(UserId(20), Decimal::from(50), CurrencyCode::USD, Provider::Stripe, "w1".into())
            .await;

        assert!(matches!(result, Err(WalletError::InsufficientFunds(_))));
    }

    #[sqlx::test]
    async fn pays_out_once_funds_liquidity_and_account_readiness_all_check_out(pool: PgPool) {
        sqlx::query("INSERT INTO wallets (user_id) VALUES ($1)")
            .bind(UserId(21))
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO payment_provider_balances (provider, currency, available_amount) VALUES ($1, $2, $3)",
        )
        .bind(Provider::Stripe)
        .bind(CurrencyCode::USD)
        .bind(Decimal::from(1000))
        .execute(&pool)
        .await
        .unwrap();

        let wallets = PostgresWalletRepository::new();
        let accounts = PostgresWalletAccountRepository::new();
        let linked_accounts = PostgresProviderLinkedAccountRepository::new();

        let mut tx = pool.begin().await.unwrap();
        let wallet = wallets.find_by_user_id(&mut tx, UserId(21)).await.unwrap().unwrap();
        let mut account = accounts
            .create(&mut tx, wallet.id(), CurrencyCode::USD, CurrencyCode::USD.kind())
            .await
            .unwrap();
        account.credit(Decimal::from(100));
        accounts.save_amount(&mut tx, &account).await.unwrap();
        linked_accounts
            .create(&mut tx, UserId(21), Provider::Stripe, "acct_withdraw".into())
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let mut cache = MockIdempotencyCache::new();
        cache.expect_exists().returning(|_| Ok(false));
        cache.expect_remember().returning(|_, _, _| Ok(()));

        let mut stripe = MockProviderGateway::new();
        stripe.expect_verify_account_ready().times(1).returning(|_| Ok(()));
        stripe.expect_payout().times(1).returning(|_, _, _| {
            Ok(PayoutResult {
                transfer_id: "tr_1".into(),
                payout_id: "po_1".into(),
                status: "pending".into(),
            })
        });

        let output = use_case(pool, stripe, cache)
            .execute(UserId(21), Decimal::from(50), CurrencyCode::USD, Provider::Stripe, "w2".into())
            .await
            .unwrap();

        assert_eq!(output.status, TransactionStatus::Pending);
    }
}
