use async_trait::async_trait;
use common::entities::Wallet;
use common::error::WalletError;
use common::ids::{UserId, WalletId};

use crate::domain::repository::{Tx, WalletRepository};
use crate::infrastructure::persistence::models::WalletModel;

/// PostgreSQL-backed `WalletRepository`. Holds no connection of its own;
/// every method operates on the caller's transaction, per §4.1.
#[derive(Default)]
pub struct PostgresWalletRepository;

impl PostgresWalletRepository {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl WalletRepository for PostgresWalletRepository {
    async fn find_by_id(&self, tx: &mut Tx<'_>, id: WalletId) -> Result<Option<Wallet>, WalletError> {
        let model = sqlx::query_as::<_, WalletModel>(
            r#"SELECT id, user_id, created_at FROM wallets WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(model.map(Into::into))
    }

    async fn find_by_user_id(
        &self,
        tx: &mut Tx<'_>,
        user_id: UserId,
    ) -> Result<Option<Wallet>, WalletError> {
        let model = sqlx::query_as::<_, WalletModel>(
            r#"SELECT id, user_id, created_at FROM wallets WHERE user_id = $1"#,
        )
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(model.map(Into::into))
    }

    async fn create(&self, tx: &mut Tx<'_>, user_id: UserId) -> Result<Wallet, WalletError> {
        let model = sqlx::query_as::<_, WalletModel>(
            r#"
            INSERT INTO wallets (user_id, created_at)
            VALUES ($1, now())
            RETURNING id, user_id, created_at
            "#,
        )
        .bind(user_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| {
            if e.to_string().contains("wallets_user_id_key") {
                WalletError::InvalidData(format!("user {user_id} already has a wallet"))
            } else {
                WalletError::StorageError(e.to_string())
            }
        })?;

        Ok(model.into())
    }
}
