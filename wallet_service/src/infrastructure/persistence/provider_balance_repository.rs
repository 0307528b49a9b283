use async_trait::async_trait;
use common::entities::PaymentProviderBalance;
use common::enums::Provider;
use common::error::WalletError;

use crate::domain::repository::{ProviderBalanceRepository, Tx};
use crate::infrastructure::persistence::models::ProviderBalanceModel;

#[derive(Default)]
pub struct PostgresProviderBalanceRepository;

impl PostgresProviderBalanceRepository {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProviderBalanceRepository for PostgresProviderBalanceRepository {
    async fn find_for_update(
        &self,
        tx: &mut Tx<'_>,
        provider: Provider,
    ) -> Result<Option<PaymentProviderBalance>, WalletError> {
        let model = sqlx::query_as::<_, ProviderBalanceModel>(
            r#"
            SELECT id, provider, currency, available_amount, updated_at
            FROM payment_provider_balances
            WHERE provider = $1
            FOR UPDATE
            "#,
        )
        .bind(provider)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(model.map(Into::into))
    }

    async fn create(
        &self,
        tx: &mut Tx<'_>,
        provider: Provider,
    ) -> Result<PaymentProviderBalance, WalletError> {
        let model = sqlx::query_as::<_, ProviderBalanceModel>(
            r#"
            INSERT INTO payment_provider_balances (provider, currency, available_amount, updated_at)
            VALUES ($1, $2, 0, now())
            ON CONFLICT (provider) DO UPDATE SET provider = EXCLUDED.provider
            RETURNING id, provider, currency, available_amount, updated_at
            "#,
        )
        .bind(provider)
        .bind(provider.settlement_currency())
        .fetch_one(&mut **tx)
        .await?;

        Ok(model.into())
    }

    async fn save(&self, tx: &mut Tx<'_>, balance: &PaymentProviderBalance) -> Result<(), WalletError> {
        sqlx::query(
            r#"UPDATE payment_provider_balances SET available_amount = $1, updated_at = $2 WHERE id = $3"#,
        )
        .bind(balance.available_amount())
        .bind(balance.updated_at())
        .bind(balance.id())
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}
