use async_trait::async_trait;
use common::entities::ProviderLinkedAccount;
use common::enums::Provider;
use common::error::WalletError;
use common::ids::UserId;

use crate::domain::repository::{ProviderLinkedAccountRepository, Tx};
use crate::infrastructure::persistence::models::ProviderLinkedAccountModel;

#[derive(Default)]
pub struct PostgresProviderLinkedAccountRepository;

impl PostgresProviderLinkedAccountRepository {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProviderLinkedAccountRepository for PostgresProviderLinkedAccountRepository {
    async fn find_by_user(
        &self,
        tx: &mut Tx<'_>,
        user_id: UserId,
        provider: Provider,
    ) -> Result<Option<ProviderLinkedAccount>, WalletError> {
        let model = sqlx::query_as::<_, ProviderLinkedAccountModel>(
            r#"
            SELECT id, user_id, provider, external_account_id
            FROM provider_linked_accounts
            WHERE user_id = $1 AND provider = $2
            "#,
        )
        .bind(user_id)
        .bind(provider)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(model.map(Into::into))
    }

    async fn create(
        &self,
        tx: &mut Tx<'_>,
        user_id: UserId,
        provider: Provider,
        external_account_id: String,
    ) -> Result<ProviderLinkedAccount, WalletError> {
        let model = sqlx::query_as::<_, ProviderLinkedAccountModel>(
            r#"
            INSERT INTO provider_linked_accounts (user_id, provider, external_account_id)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, provider, external_account_id
            "#,
        )
        .bind(user_id)
        .bind(provider)
        .bind(external_account_id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(model.into())
    }
}
