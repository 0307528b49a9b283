use async_trait::async_trait;
use common::entities::{
    Currency, PaymentProviderBalance, ProviderLinkedAccount, Wallet, WalletAccount,
    WalletTransaction,
};
use common::enums::{CurrencyCode, Provider, WalletAccountType};
use common::error::WalletError;
use common::ids::{TransactionId, UserId, WalletId};
use sqlx::{Postgres, Transaction};

/// §4.1: every mutation happens inside a caller-managed transaction; commit
/// is the use case's responsibility, never the repository's.
pub type Tx<'a> = Transaction<'a, Postgres>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WalletRepository: Send + Sync {
    async fn find_by_id(&self, tx: &mut Tx<'_>, id: WalletId) -> Result<Option<Wallet>, WalletError>;
    async fn find_by_user_id(
        &self,
        tx: &mut Tx<'_>,
        user_id: UserId,
    ) -> Result<Option<Wallet>, WalletError>;
    async fn create(&self, tx: &mut Tx<'_>, user_id: UserId) -> Result<Wallet, WalletError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WalletAccountRepository: Send + Sync {
    async fn find(
        &self,
        tx: &mut Tx<'_>,
        wallet_id: WalletId,
        currency: CurrencyCode,
    ) -> Result<Option<WalletAccount>, WalletError>;

    async fn find_all_for_wallet(
        &self,
        tx: &mut Tx<'_>,
        wallet_id: WalletId,
    ) -> Result<Vec<WalletAccount>, WalletError>;

    /// Locks the row with `SELECT ... FOR UPDATE` so concurrent mutations
    /// against the same account serialize. Returns `None` if the account
    /// does not exist yet (the caller creates it lazily on credit).
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

    async fn find_by_idempotency_key(
        &self,
        tx: &mut Tx<'_>,
        idempotency_key: &str,
    ) -> Result<Option<WalletTransaction>, WalletError>;

    /// Inserts a freshly-built (not-yet-persisted) transaction and returns
    /// the stored row with its DB-assigned id (`transaction.id()` on the
    /// input is ignored, since `wallet_transactions.id` is an identity
    /// column the database allocates).
    async fn create(
        &self,
        tx: &mut Tx<'_>,
        transaction: &WalletTransaction,
    ) -> Result<WalletTransaction, WalletError>;

    async fn update_status(
        &self,
        tx: &mut Tx<'_>,
        id: TransactionId,
        status: common::enums::TransactionStatus,
        external_id: Option<&str>,
    ) -> Result<(), WalletError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CurrencyRepository: Send + Sync {
    async fn find(&self, tx: &mut Tx<'_>, code: CurrencyCode) -> Result<Option<Currency>, WalletError>;
    async fn find_all(&self, tx: &mut Tx<'_>) -> Result<Vec<Currency>, WalletError>;
    async fn upsert(
        &self,
        tx: &mut Tx<'_>,
        code: CurrencyCode,
        rate_to_base: rust_decimal::Decimal,
    ) -> Result<Currency, WalletError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProviderBalanceRepository: Send + Sync {
    async fn find_for_update(
        &self,
        tx: &mut Tx<'_>,
        provider: Provider,
    ) -> Result<Option<PaymentProviderBalance>, WalletError>;

    async fn create(
        &self,
        tx: &mut Tx<'_>,
        provider: Provider,
    ) -> Result<PaymentProviderBalance, WalletError>;

    async fn save(
        &self,
        tx: &mut Tx<'_>,
        balance: &PaymentProviderBalance,
    ) -> Result<(), WalletError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProviderLinkedAccountRepository: Send + Sync {
    async fn find_by_user(
        &self,
        tx: &mut Tx<'_>,
        user_id: UserId,
        provider: Provider,
    ) -> Result<Option<ProviderLinkedAccount>, WalletError>;

    async fn create(
        &self,
        tx: &mut Tx<'_>,
        user_id: UserId,
        provider: Provider,
        external_account_id: String,
    ) -> Result<ProviderLinkedAccount, WalletError>;
}
