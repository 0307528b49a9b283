use std::sync::Arc;
use std::time::Duration;

use common::entities::WalletTransaction;
use common::enums::{CurrencyCode, OperationType, Provider};
use common::error::WalletError;
use common::ids::{TransactionId, UserId};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::domain::cache::IdempotencyCache;
use crate::domain::gateway::ProviderGateways;
use crate::domain::idempotency;
use crate::domain::repository::{TransactionRepository, WalletRepository};

pub struct CreatePaymentTransactionOutput {
    pub redirect_url: String,
}

/// §4.6 deposit init: creates the `pending` transaction row first so the
/// checkout session's metadata can carry a real `transaction_id`.
pub struct CreatePaymentTransactionUseCase {
    pool: PgPool,
    wallets: Arc<dyn WalletRepository>,
    transactions: Arc<dyn TransactionRepository>,
    cache: Arc<dyn IdempotencyCache>,
    gateways: ProviderGateways,
    idempotency_ttl: Duration,
}

impl CreatePaymentTransactionUseCase {
    pub fn new(
        pool: PgPool,
        wallets: Arc<dyn WalletRepository>,
        transactions: Arc<dyn TransactionRepository>,
        cache: Arc<dyn IdempotencyCache>,
        gateways: ProviderGateways,
        idempotency_ttl: Duration,
    ) -> Self {
        Self {
            pool,
            wallets,
            transactions,
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
    ) -> Result<CreatePaymentTransactionOutput, WalletError> {
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
            Some(currency),
            None,
            None,
            amount,
            OperationType::Deposit,
            idempotency_key,
            Some(gateway),
        )?;
        let stored = self.transactions.create(&mut tx, &draft).await?;

        let session = self
            .gateways
            .get(gateway)
            .create_checkout_session(wallet.id(), stored.id(), amount, currency)
            .await?;

        self.transactions
            .update_status(&mut tx, stored.id(), stored.status(), Some(&session.external_id))
            .await?;

        tx.commit().await?;

        Ok(CreatePaymentTransactionOutput {
            redirect_url: session.redirect_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::MockIdempotencyCache;
    use crate::domain::gateway::{CheckoutSession, MockProviderGateway};
    use crate::infrastructure::persistence::transaction_repository::PostgresTransactionRepository;
    use crate::infrastructure::persistence::wallet_repository::PostgresWalletRepository;
    use std::time::Duration;

    #[sqlx::test]
    async fn rejects_when_the_user_has_no_wallet(pool: PgPool) {
        let mut cache = MockIdempotencyCache::new();
        cache.expect_exists().returning(|_| Ok(false));
        cache.expect_remember().returning(|_, _, _| Ok(()));

        let mut stripe = MockProviderGateway::new();
        stripe.expect_create_checkout_session().times(0);
        let gateways = ProviderGateways {
            stripe: Arc::new(stripe),
            cloudpayments: Arc::new(MockProviderGateway::new()),
        };

        let use_case = CreatePaymentTransactionUseCase::new(
            pool,
            Arc::new(PostgresWalletRepository::new()),
            Arc::new(PostgresTransactionRepository::new()),
            Arc::new(cache),
            gateways,
            Duration::from_secs(3600),
        );

        let result = use_case
            .execute(UserId(1), Decimal::from(10), CurrencyCode::USD, Provider::Stripe, "k1".into())
            .await;

        assert!(matches!(result, Err(WalletError::NoWallet(_))));
    }

    #[sqlx::test]
    async fn stores_the_checkout_session_external_id_against_the_transaction(pool: PgPool) {
        sqlx::query("INSERT INTO wallets (user_id) VALUES ($1)")
            .bind(UserId(7))
            .execute(&pool)
            .await
            .unwrap();

        let mut cache = MockIdempotencyCache::new();
        cache.expect_exists().returning(|_| Ok(false));
        cache.expect_remember().returning(|_, _, _| Ok(()));

        let mut stripe = MockProviderGateway::new();
        stripe.expect_create_checkout_session().times(1).returning(|_, transaction_id, _, _| {
            Ok(CheckoutSession {
                redirect_url: "https://checkout.stripe.com/session".into(),
                external_id: format!("cs_{transaction_id}"),
            })
        });
        let gateways = ProviderGateways {
            stripe: Arc::new(stripe),
            cloudpayments: Arc::new(MockProviderGateway::new()),
        };

        let use_case = CreatePaymentTransactionUseCase::new(
            pool,
            Arc::new(PostgresWalletRepository::new()),
            Arc::new(PostgresTransactionRepository::new()),
            Arc::new(cache),
            gateways,
            Duration::from_secs(3600),
        );

        let output = use_case
            .execute(UserId(7), Decimal::from(25), CurrencyCode::USD, Provider::Stripe, "k2".into())
            .await
            .unwrap();

        assert_eq!(output.redirect_url, "https://checkout.stripe.com/session");
    }
}
