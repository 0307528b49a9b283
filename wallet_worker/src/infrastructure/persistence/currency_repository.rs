use async_trait::async_trait;
use common::entities::Currency;
use common::enums::CurrencyCode;
use common::error::WalletError;

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
}
