use async_trait::async_trait;
use common::entities::WalletAccount;
use common::enums::{CurrencyCode, WalletAccountType};
use common::error::WalletError;
use common::ids::WalletId;

use crate::domain::repository::{Tx, WalletAccountRepository};
use crate::infrastructure::persistence::models::WalletAccountModel;

#[derive(Default)]
pub struct PostgresWalletAccountRepository;

impl PostgresWalletAccountRepository {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl WalletAccountRepository for PostgresWalletAccountRepository {
    async fn find(
        &self,
        tx: &mut Tx<'_>,
        wallet_id: WalletId,
        currency: CurrencyCode,
    ) -> Result<Option<WalletAccount>, WalletError> {
        let model = sqlx::query_as::<_, WalletAccountModel>(
            r#"
            SELECT id, wallet_id, currency, kind, amount
            FROM wallet_accounts
            WHERE wallet_id = $1 AND currency = $2
            "#,
        )
        .bind(wallet_id)
        .bind(currency)
        .fetch_optional(&mut **tx)
        .await?;

        model.map(TryInto::try_into).transpose()
    }

    async fn find_all_for_wallet(
        &self,
        tx: &mut Tx<'_>,
        wallet_id: WalletId,
    ) -> Result<Vec<WalletAccount>, WalletError> {
        let models = sqlx::query_as::<_, WalletAccountModel>(
            r#"
            SELECT id, wallet_id, currency, kind, amount
            FROM wallet_accounts
            WHERE wallet_id = $1
            "#,
        )
        .bind(wallet_id)
        .fetch_all(&mut **tx)
        .await?;

        models.into_iter().map(TryInto::try_into).collect()
    }

    async fn find_for_update(
        &self,
        tx: &mut Tx<'_>,
        wallet_id: WalletId,
        currency: CurrencyCode,
    ) -> Result<Option<WalletAccount>, WalletError> {
        let model = sqlx::query_as::<_, WalletAccountModel>(
            r#"
            SELECT id, wallet_id, currency, kind, amount
            FROM wallet_accounts
            WHERE wallet_id = $1 AND currency = $2
            FOR UPDATE
            "#,
        )
        .bind(wallet_id)
        .bind(currency)
        .fetch_optional(&mut **tx)
        .await?;

        model.map(TryInto::try_into).transpose()
    }

    async fn create(
        &self,
        tx: &mut Tx<'_>,
        wallet_id: WalletId,
        currency: CurrencyCode,
        kind: WalletAccountType,
    ) -> Result<WalletAccount, WalletError> {
        let model = sqlx::query_as::<_, WalletAccountModel>(
            r#"
            INSERT INTO wallet_accounts (wallet_id, currency, kind, amount)
            VALUES ($1, $2, $3, 0)
            ON CONFLICT (wallet_id, currency, kind) DO UPDATE SET currency = EXCLUDED.currency
            RETURNING id, wallet_id, currency, kind, amount
            "#,
        )
        .bind(wallet_id)
        .bind(currency)
        .bind(kind)
        .fetch_one(&mut **tx)
        .await?;

        model.try_into()
    }

    async fn save_amount(&self, tx: &mut Tx<'_>, account: &WalletAccount) -> Result<(), WalletError> {
        let result = sqlx::query(
            r#"UPDATE wallet_accounts SET amount = $1 WHERE id = $2 AND amount >= 0"#,
        )
        .bind(account.amount())
        .bind(account.id())
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            if e.to_string().contains("amount_chk") || e.to_string().contains("positive_amount") {
                WalletError::InsufficientFunds(account.wallet_id())
            } else {
                WalletError::StorageError(e.to_string())
            }
        })?;

        if result.rows_affected() == 0 {
            return Err(WalletError::InsufficientFunds(account.wallet_id()));
        }
        Ok(())
    }
}
