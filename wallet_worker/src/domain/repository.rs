use async_trait::async_trait;
use common::entities::{Currency, WalletAccount, WalletTransaction};
use common::enums::{CurrencyCode, TransactionStatus, WalletAccountType};
use common::error::WalletError;
use common::ids::{TransactionId, WalletId};
use sqlx::{Postgres, Transaction};

/// §4.1: every mutation happens inside a caller-managed transaction; commit
/// is the use case's responsibility, never the repository's. Mirrors the
/// orchestrator's own repository boundary, since both sides write the same
/// tables.
pub type Tx<'a> = Transaction<'a, Postgres>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WalletAccountRepository: Send + Sync {
    /// Locks the row with `SELECT ... FOR UPDATE` so concurrent settlements
    /// against the same account serialize. Returns `None` if the account
    /// does not exist yet.
    async fn find_for_update(
        &self,
        tx: &mut Tx<'_>,
        wallet_id: WalletId,
        currency: CurrencyCode,
    ) -> Result<Option<WalletAccount>, WalletError>;

    async fn create(
        &self,
        tx: &mut Tx<'_>,
        wallet_id: WalletId,
        currency: CurrencyCode,
        kind: WalletAccountType,
    ) -> Result<WalletAccount, WalletError>;

    async fn save_amount(&self, tx: &mut Tx<'_>, account: &WalletAccount) -> Result<(), WalletError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn find_by_id(
        &self,
        tx: &mut Tx<'_>,
        id: TransactionId,
    ) -> Result<Option<WalletTransaction>, WalletError>;

    async fn update_status(
        &self,
        tx: &mut Tx<'_>,
        id: TransactionId,
        status: TransactionStatus,
        external_id: Option<&str>,
    ) -> Result<(), WalletError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CurrencyRepository: Send + Sync {
    async fn find(&self, tx: &mut Tx<'_>, code: CurrencyCode) -> Result<Option<Currency>, WalletError>;
}
