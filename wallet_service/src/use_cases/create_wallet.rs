use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::error::WalletError;
use common::ids::{UserId, WalletId};
use sqlx::PgPool;

use crate::domain::repository::WalletRepository;

pub struct CreateWalletOutput {
    pub wallet_id: WalletId,
    pub created_at: DateTime<Utc>,
}

/// `CreateWallet` is naturally idempotent by the `wallets_user_id_key`
/// constraint: a second call for the same user returns the existing wallet
/// instead of erroring.
pub struct CreateWalletUseCase {
    pool: PgPool,
    wallets: Arc<dyn WalletRepository>,
}

impl CreateWalletUseCase {
    pub fn new(pool: PgPool, wallets: Arc<dyn WalletRepository>) -> Self {
        Self { pool, wallets }
    }

    #[tracing::instrument(skip(self))]
    pub async fn execute(&self, user_id: UserId) -> Result<CreateWalletOutput, WalletError> {
        let mut tx = self.pool.begin().await?;

        let wallet = match self.wallets.find_by_user_id(&mut tx, user_id).await? {
            Some(existing) => existing,
            None => self.wallets.create(&mut tx, user_id).await?,
        };

        tx.commit().await?;

        Ok(CreateWalletOutput {
            wallet_id: wallet.id(),
            created_at: wallet.created_at(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::persistence::wallet_repository::PostgresWalletRepository;

    /// `#[sqlx::test]` provisions a fresh, migrated database per test and
    /// hands back a connected pool, the only practical way to exercise a
    /// use case that owns its own transaction boundary.
    #[sqlx::test]
    async fn second_call_for_the_same_user_returns_the_first_wallet(pool: PgPool) {
        let use_case = CreateWalletUseCase::new(pool, Arc::new(PostgresWalletRepository::new()));
        let user_id = UserId(42);

        let first = use_case.execute(user_id).await.unwrap();
        let second = use_case.execute(user_id).await.unwrap();

        assert_eq!(first.wallet_id, second.wallet_id);
    }
}
