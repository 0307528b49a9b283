use std::sync::Arc;

use common::enums::CurrencyCode;
use common::error::WalletError;
use common::ids::{UserId, WalletId};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::domain::repository::{WalletAccountRepository, WalletRepository};

pub struct Balance {
    pub currency: CurrencyCode,
    pub amount: Decimal,
}

pub struct GetBalanceOutput {
    pub user_id: UserId,
    pub wallet_id: WalletId,
    pub balances: Vec<Balance>,
}

pub struct GetBalanceUseCase {
    pool: PgPool,
    wallets: Arc<dyn WalletRepository>,
    accounts: Arc<dyn WalletAccountRepository>,
}

impl GetBalanceUseCase {
    pub fn new(
        pool: PgPool,
        wallets: Arc<dyn WalletRepository>,
        accounts: Arc<dyn WalletAccountRepository>,
    ) -> Self {
        Self {
            pool,
            wallets,
            accounts,
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn execute(
        &self,
        user_id: UserId,
        currency: Option<CurrencyCode>,
    ) -> Result<GetBalanceOutput, WalletError> {
        let mut tx = self.pool.begin().await?;

        let wallet = self
            .wallets
            .find_by_user_id(&mut tx, user_id)
            .await?
            .ok_or(WalletError::NoWallet(user_id))?;

        let accounts = match currency {
            Some(code) => self
                .accounts
                .find(&mut tx, wallet.id(), code)
                .await?
                .into_iter()
                .collect(),
            None => self.accounts.find_all_for_wallet(&mut tx, wallet.id()).await?,
        };

        tx.commit().await?;

        Ok(GetBalanceOutput {
            user_id,
            wallet_id: wallet.id(),
            balances: accounts
                .into_iter()
                .map(|account| Balance {
                    currency: account.currency(),
                    amount: account.amount(),
                })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::persistence::wallet_account_repository::PostgresWalletAccountRepository;
    use crate::infrastructure::persistence::wallet_repository::PostgresWalletRepository;
    use common::enums::WalletAccountType;

    #[sqlx::test]
    async fn errors_with_no_wallet_when_user_has_none(pool: PgPool) {
        let use_case = GetBalanceUseCase::new(
            pool,
            Arc::new(PostgresWalletRepository::new()),
            Arc::new(PostgresWalletAccountRepository::new()),
        );

        let result = use_case.execute(UserId(1), None).await;
        assert!(matches!(result, Err(WalletError::NoWallet(_))));
    }

    #[sqlx::test]
    async fn returns_only_the_requested_currency_when_filtered(pool: PgPool) {
        let wallets = Arc::new(PostgresWalletRepository::new());
        let accounts = Arc::new(PostgresWalletAccountRepository::new());
        let use_case = GetBalanceUseCase::new(pool.clone(), wallets.clone(), accounts.clone());

        let user_id = UserId(2);
        let mut tx = pool.begin().await.unwrap();
        let wallet = wallets.create(&mut tx, user_id).await.unwrap();
        accounts
            .create(&mut tx, wallet.id(), CurrencyCode::USD, WalletAccountType::Fiat)
            .await
            .unwrap();
        accounts
            .create(&mut tx, wallet.id(), CurrencyCode::EUR, WalletAccountType::Fiat)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let output = use_case
            .execute(user_id, Some(CurrencyCode::USD))
            .await
            .unwrap();

        assert_eq!(output.balances.len(), 1);
        assert_eq!(output.balances[0].currency, CurrencyCode::USD);
    }
}
