use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

use common::entities::{
    Currency, PaymentProviderBalance, ProviderLinkedAccount, Wallet, WalletAccount,
    WalletTransaction,
};
use common::enums::{CurrencyCode, OperationType, Provider, TransactionStatus, WalletAccountType};
use common::error::WalletError;
use common::ids::{
    CorrelationId, CurrencyId, ProviderBalanceId, ProviderLinkedAccountId, TransactionId, UserId,
    WalletAccountId, WalletId,
};

#[derive(Debug, FromRow)]
pub struct WalletModel {
    pub id: WalletId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl From<WalletModel> for Wallet {
    fn from(m: WalletModel) -> Self {
        Wallet::reconstitute(m.id, m.user_id, m.created_at)
    }
}

#[derive(Debug, FromRow)]
pub struct WalletAccountModel {
    pub id: WalletAccountId,
    pub wallet_id: WalletId,
    pub currency: CurrencyCode,
    pub kind: WalletAccountType,
    pub amount: Decimal,
}

impl TryFrom<WalletAccountModel> for WalletAccount {
    type Error = WalletError;

    fn try_from(m: WalletAccountModel) -> Result<Self, Self::Error> {
        WalletAccount::reconstitute(m.id, m.wallet_id, m.currency, m.kind, m.amount)
    }
}

#[derive(Debug, FromRow)]
pub struct TransactionModel {
    pub id: TransactionId,
    pub user_id: UserId,
    pub wallet_id: WalletId,
    pub from_wallet_id: Option<WalletId>,
    pub to_wallet_id: Option<WalletId>,
    pub currency: Option<CurrencyCode>,
    pub from_currency: Option<CurrencyCode>,
    pub to_currency: Option<CurrencyCode>,
    pub amount: Decimal,
    pub operation: OperationType,
    pub status: TransactionStatus,
    pub correlation_id: CorrelationId,
    pub external_id: Option<String>,
    pub idempotency_key: String,
    pub provider: Option<Provider>,
    pub date: DateTime<Utc>,
}

impl From<TransactionModel> for WalletTransaction {
    fn from(m: TransactionModel) -> Self {
        WalletTransaction::reconstitute(
            m.id,
            m.user_id,
            m.wallet_id,
            m.from_wallet_id,
            m.to_wallet_id,
            m.currency,
            m.from_currency,
            m.to_currency,
            m.amount,
            m.operation,
            m.status,
            m.correlation_id,
            m.external_id,
            m.idempotency_key,
            m.provider,
            m.date,
        )
    }
}

#[derive(Debug, FromRow)]
pub struct CurrencyModel {
    pub id: CurrencyId,
    pub code: CurrencyCode,
    pub rate_to_base: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl From<CurrencyModel> for Currency {
    fn from(m: CurrencyModel) -> Self {
        Currency::reconstitute(m.id, m.code, m.rate_to_base, m.updated_at)
    }
}

#[derive(Debug, FromRow)]
pub struct ProviderBalanceModel {
    pub id: ProviderBalanceId,
    pub provider: Provider,
    pub currency: CurrencyCode,
    pub available_amount: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl From<ProviderBalanceModel> for PaymentProviderBalance {
    fn from(m: ProviderBalanceModel) -> Self {
        PaymentProviderBalance::reconstitute(m.id, m.provider, m.currency, m.available_amount, m.updated_at)
    }
}

#[derive(Debug, FromRow)]
pub struct ProviderLinkedAccountModel {
    pub id: ProviderLinkedAccountId,
    pub user_id: UserId,
    pub provider: Provider,
    pub external_account_id: String,
}

impl From<ProviderLinkedAccountModel> for ProviderLinkedAccount {
    fn from(m: ProviderLinkedAccountModel) -> Self {
        ProviderLinkedAccount::reconstitute(m.id, m.user_id, m.provider, m.external_account_id)
    }
}
