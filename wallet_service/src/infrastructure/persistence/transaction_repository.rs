use async_trait::async_trait;
use common::entities::WalletTransaction;
use common::enums::TransactionStatus;
use common::error::WalletError;
use common::ids::TransactionId;

use crate::domain::repository::{Tx, TransactionRepository};
use crate::infrastructure::persistence::models::TransactionModel;

#[derive(Default)]
pub struct PostgresTransactionRepository;

impl PostgresTransactionRepository {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TransactionRepository for PostgresTransactionRepository {
    async fn find_by_id(
        &self,
        tx: &mut Tx<'_>,
        id: TransactionId,
    ) -> Result<Option<WalletTransaction>, WalletError> {
        let model = sqlx::query_as::<_, TransactionModel>(
            r#"
            SELECT id, user_id, wallet_id, from_wallet_id, to_wallet_id, currency,
                   from_currency, to_currency, amount, operation, status, correlation_id,
                   external_id, idempotency_key, provider, date
            FROM wallet_transactions WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(model.map(Into::into))
    }

    async fn find_by_idempotency_key(
        &self,
        tx: &mut Tx<'_>,
        idempotency_key: &str,
    ) -> Result<Option<WalletTransaction>, WalletError> {
        let model = sqlx::query_as::<_, TransactionModel>(
            r#"
            SELECT id, user_id, wallet_id, from_wallet_id, to_wallet_id, currency,
                   from_currency, to_currency, amount, operation, status, correlation_id,
                   external_id, idempotency_key, provider, date
            FROM wallet_transactions WHERE idempotency_key = $1
            "#,
        )
        .bind(idempotency_key)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(model.map(Into::into))
    }

    async fn create(
        &self,
        tx: &mut Tx<'_>,
        transaction: &WalletTransaction,
    ) -> Result<WalletTransaction, WalletError> {
        let model = sqlx::query_as::<_, TransactionModel>(
            r#"
            INSERT INTO wallet_transactions (
                user_id, wallet_id, from_wallet_id, to_wallet_id, currency,
                from_currency, to_currency, amount, operation, status, correlation_id,
                external_id, idempotency_key, provider, date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING id, user_id, wallet_id, from_wallet_id, to_wallet_id, currency,
                      from_currency, to_currency, amount, operation, status, correlation_id,
                      external_id, idempotency_key, provider, date
            "#,
        )
        .bind(transaction.user_id())
        .bind(transaction.wallet_id())
        .bind(transaction.from_wallet_id())
        .bind(transaction.to_wallet_id())
        .bind(transaction.currency())
        .bind(transaction.from_currency())
        .bind(transaction.to_currency())
        .bind(transaction.amount())
        .bind(transaction.operation())
        .bind(transaction.status())
        .bind(transaction.correlation_id())
        .bind(transaction.external_id())
        .bind(transaction.idempotency_key())
        .bind(transaction.provider())
        .bind(transaction.date())
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| {
            if e.to_string().contains("wallet_transactions_idempotency_key_key") {
                WalletError::IdempotentlyDone(transaction.idempotency_key().to_string())
            } else {
                WalletError::StorageError(e.to_string())
            }
        })?;

        Ok(model.into())
    }

    async fn update_status(
        &self,
        tx: &mut Tx<'_>,
        id: TransactionId,
        status: TransactionStatus,
        external_id: Option<&str>,
    ) -> Result<(), WalletError> {
        let result = sqlx::query(
            r#"
            UPDATE wallet_transactions
            SET status = $1, external_id = COALESCE($2, external_id)
            WHERE id = $3
            "#,
        )
        .bind(status)
        .bind(external_id)
        .bind(id)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(WalletError::InvalidData(format!(
                "transaction {id} not found for status update"
            )));
        }
        Ok(())
    }
}
