use async_trait::async_trait;
use common::entities::Currency;
use common::enums::CurrencyCode;
use common::error::WalletError;
use rust_decimal::Decimal;

use crate::domain::repository::{CurrencyRepository, Tx};
use crate::infrastructure::persistence::models::CurrencyModel;

#[derive(Default)]
pub struct PostgresCurrencyRepository;

impl PostgresCurrencyRepository {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CurrencyRepository for PostgresCurrencyRepository {
    async fn find(&self, tx: &mut Tx<'_>, code: CurrencyCode) -> Result<Option<Currency>, WalletError> {
        let model = sqlx::query_as::<_, CurrencyModel>(
            r#"SELECT id, code, rate_to_base, updated_at FROM currencies WHERE code = $1"#,
        )
        .bind(code)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(model.map(Into::into))
    }

    async fn find_all(&self, tx: &mut Tx<'_>) -> Result<Vec<Currency>, WalletError> {
        let models = sqlx::query_as::<_, CurrencyModel>(
            r#"SELECT id, code, rate_to_base, updated_at FROM currencies"#,
        )
        .fetch_all(&mut **tx)
        .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn upsert(
        &self,
        tx: &mut Tx<'_>,
        code: CurrencyCode,
        rate_to_base: Decimal,
    ) -> Result<Currency, WalletError> {
        let model = sqlx::query_as::<_, CurrencyModel>(
            r#"
            INSERT INTO currencies (code, rate_to_base, updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (code) DO UPDATE SET rate_to_base = EXCLUDED.rate_to_base, updated_at = now()
            RETURNING id, code, rate_to_base, updated_at
            "#,
        )
        .bind(code)
        .bind(rate_to_base)
        .fetch_one(&mut **tx)
        .await?;

        Ok(model.into())
    }
}
