use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::enums::{CurrencyCode, OperationType, Provider, TransactionStatus, WalletAccountType};
use crate::error::WalletError;
use crate::ids::{
    CorrelationId, CurrencyId, ProviderBalanceId, ProviderLinkedAccountId, TransactionId, UserId,
    WalletAccountId, WalletId,
};

/// Per-user container of multi-currency accounts. Exactly one per user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    id: WalletId,
    user_id: UserId,
    created_at: DateTime<Utc>,
}

impl Wallet {
    pub fn new(id: WalletId, user_id: UserId) -> Self {
        Self {
            id,
            user_id,
            created_at: Utc::now(),
        }
    }

    pub fn reconstitute(id: WalletId, user_id: UserId, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id,
            created_at,
        }
    }

    pub fn id(&self) -> WalletId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Currency-and-kind-specific balance within a wallet. Created lazily on
/// first credit; never negative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletAccount {
    id: WalletAccountId,
    wallet_id: WalletId,
    currency: CurrencyCode,
    kind: WalletAccountType,
    amount: Decimal,
}

impl WalletAccount {
    /// Opens a fresh account at zero balance; callers credit it in the same
    /// transaction that creates it.
    pub fn open(id: WalletAccountId, wallet_id: WalletId, currency: CurrencyCode) -> Self {
        Self {
            id,
            wallet_id,
            currency,
            kind: currency.kind(),
            amount: Decimal::ZERO,
        }
    }

    pub fn reconstitute(
        id: WalletAccountId,
        wallet_id: WalletId,
        currency: CurrencyCode,
        kind: WalletAccountType,
        amount: Decimal,
    ) -> Result<Self, WalletError> {
        if amount < Decimal::ZERO {
            return Err(WalletError::InvalidData(format!(
                "account {id} loaded with negative balance {amount}"
            )));
        }
        Ok(Self {
            id,
            wallet_id,
            currency,
            kind,
            amount,
        })
    }

    pub fn id(&self) -> WalletAccountId {
        self.id
    }

    pub fn wallet_id(&self) -> WalletId {
        self.wallet_id
    }

    pub fn currency(&self) -> CurrencyCode {
        self.currency
    }

    pub fn kind(&self) -> WalletAccountType {
        self.kind
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// Credits the account; always succeeds since the invariant only bounds
    /// the lower end.
    pub fn credit(&mut self, delta: Decimal) {
        self.amount += delta;
    }

    /// Debits the account, rejecting the mutation rather than letting the
    /// balance go negative.
    pub fn debit(&mut self, delta: Decimal) -> Result<(), WalletError> {
        if self.amount < delta {
            return Err(WalletError::InsufficientFunds(self.wallet_id));
        }
        self.amount -= delta;
        Ok(())
    }
}

/// Immutable record of an intent to move funds; append-only except for
/// `status` and `external_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletTransaction {
    id: TransactionId,
    user_id: UserId,
    wallet_id: WalletId,
    from_wallet_id: Option<WalletId>,
    to_wallet_id: Option<WalletId>,
    currency: Option<CurrencyCode>,
    from_currency: Option<CurrencyCode>,
    to_currency: Option<CurrencyCode>,
    amount: Decimal,
    operation: OperationType,
    status: TransactionStatus,
    correlation_id: CorrelationId,
    external_id: Option<String>,
    idempotency_key: String,
    provider: Option<Provider>,
    date: DateTime<Utc>,
}

#[allow(clippy::too_many_arguments)]
impl WalletTransaction {
    pub fn new(
        id: TransactionId,
        user_id: UserId,
        wallet_id: WalletId,
        from_wallet_id: Option<WalletId>,
        to_wallet_id: Option<WalletId>,
        currency: Option<CurrencyCode>,
        from_currency: Option<CurrencyCode>,
        to_currency: Option<CurrencyCode>,
        amount: Decimal,
        operation: OperationType,
        idempotency_key: String,
        provider: Option<Provider>,
    ) -> Result<Self, WalletError> {
        if idempotency_key.trim().is_empty() {
            return Err(WalletError::InvalidData(
                "idempotency_key is required".into(),
            ));
        }
        if amount <= Decimal::ZERO {
            return Err(WalletError::InvalidData(
                "transaction amount must be positive".into(),
            ));
        }
        Ok(Self {
            id,
            user_id,
            wallet_id,
            from_wallet_id,
            to_wallet_id,
            currency,
            from_currency,
            to_currency,
            amount,
            operation,
            status: TransactionStatus::Pending,
            correlation_id: CorrelationId::new(),
            external_id: None,
            idempotency_key,
            provider,
            date: Utc::now(),
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: TransactionId,
        user_id: UserId,
        wallet_id: WalletId,
        from_wallet_id: Option<WalletId>,
        to_wallet_id: Option<WalletId>,
        currency: Option<CurrencyCode>,
        from_currency: Option<CurrencyCode>,
        to_currency: Option<CurrencyCode>,
        amount: Decimal,
        operation: OperationType,
        status: TransactionStatus,
        correlation_id: CorrelationId,
        external_id: Option<String>,
        idempotency_key: String,
        provider: Option<Provider>,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            wallet_id,
            from_wallet_id,
            to_wallet_id,
            currency,
            from_currency,
            to_currency,
            amount,
            operation,
            status,
            correlation_id,
            external_id,
            idempotency_key,
            provider,
            date,
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }
    pub fn user_id(&self) -> UserId {
        self.user_id
    }
    pub fn wallet_id(&self) -> WalletId {
        self.wallet_id
    }
    pub fn from_wallet_id(&self) -> Option<WalletId> {
        self.from_wallet_id
    }
    pub fn to_wallet_id(&self) -> Option<WalletId> {
        self.to_wallet_id
    }
    pub fn currency(&self) -> Option<CurrencyCode> {
        self.currency
    }
    pub fn from_currency(&self) -> Option<CurrencyCode> {
        self.from_currency
    }
    pub fn to_currency(&self) -> Option<CurrencyCode> {
        self.to_currency
    }
    pub fn amount(&self) -> Decimal {
        self.amount
    }
    pub fn operation(&self) -> OperationType {
        self.operation
    }
    pub fn status(&self) -> TransactionStatus {
        self.status
    }
    pub fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }
    pub fn external_id(&self) -> Option<&str> {
        self.external_id.as_deref()
    }
    pub fn idempotency_key(&self) -> &str {
        &self.idempotency_key
    }
    pub fn provider(&self) -> Option<Provider> {
        self.provider
    }
    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    /// Valid forward transitions per the orchestrator's state machine
    /// (`created→pending→processed→{completed|failed|reversed}`,
    /// `pending→cancelled`). Anything else is a programming error, not a
    /// runtime condition callers are expected to recover from.
    pub fn transition_to(&mut self, next: TransactionStatus) -> Result<(), WalletError> {
        use TransactionStatus::*;
        let allowed = matches!(
            (self.status, next),
            (Pending, Processed)
                | (Pending, Cancelled)
                | (Pending, Failed)
                | (Processed, Completed)
                | (Processed, Failed)
                | (Processed, Reversed)
        );
        if !allowed {
            return Err(WalletError::InvalidData(format!(
                "illegal transaction status transition {:?} -> {:?}",
                self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }

    pub fn set_external_id(&mut self, external_id: String) {
        self.external_id = Some(external_id);
    }
}

/// Per-currency scalar to the base currency (RUB), maintained by the FX
/// refresher. "1 unit of code = rate_to_base units of base."
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Currency {
    id: CurrencyId,
    code: CurrencyCode,
    rate_to_base: Decimal,
    updated_at: DateTime<Utc>,
}

impl Currency {
    pub fn reconstitute(
        id: CurrencyId,
        code: CurrencyCode,
        rate_to_base: Decimal,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            code,
            rate_to_base,
            updated_at,
        }
    }

    pub fn id(&self) -> CurrencyId {
        self.id
    }
    pub fn code(&self) -> CurrencyCode {
        self.code
    }
    pub fn rate_to_base(&self) -> Decimal {
        self.rate_to_base
    }
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// Liquidity the system holds inside a provider, denominated in that
/// provider's settlement currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentProviderBalance {
    id: ProviderBalanceId,
    provider: Provider,
    currency: CurrencyCode,
    available_amount: Decimal,
    updated_at: DateTime<Utc>,
}

impl PaymentProviderBalance {
    pub fn open(id: ProviderBalanceId, provider: Provider) -> Self {
        Self {
            id,
            provider,
            currency: provider.settlement_currency(),
            available_amount: Decimal::ZERO,
            updated_at: Utc::now(),
        }
    }

    pub fn reconstitute(
        id: ProviderBalanceId,
        provider: Provider,
        currency: CurrencyCode,
        available_amount: Decimal,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            provider,
            currency,
            available_amount,
            updated_at,
        }
    }

    pub fn id(&self) -> ProviderBalanceId {
        self.id
    }
    pub fn provider(&self) -> Provider {
        self.provider
    }
    pub fn currency(&self) -> CurrencyCode {
        self.currency
    }
    pub fn available_amount(&self) -> Decimal {
        self.available_amount
    }
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// No lower-bound check here; withdraw admission in the orchestrator is
    /// what enforces liquidity.
    pub fn apply_delta(&mut self, delta_settlement: Decimal) {
        self.available_amount += delta_settlement;
        self.updated_at = Utc::now();
    }
}

/// A user's onboarded account with an external provider (e.g. a Stripe
/// connected account).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderLinkedAccount {
    id: ProviderLinkedAccountId,
    user_id: UserId,
    provider: Provider,
    external_account_id: String,
}

impl ProviderLinkedAccount {
    pub fn reconstitute(
        id: ProviderLinkedAccountId,
        user_id: UserId,
        provider: Provider,
        external_account_id: String,
    ) -> Self {
        Self {
            id,
            user_id,
            provider,
            external_account_id,
        }
    }

    pub fn id(&self) -> ProviderLinkedAccountId {
        self.id
    }
    pub fn user_id(&self) -> UserId {
        self.user_id
    }
    pub fn provider(&self) -> Provider {
        self.provider
    }
    pub fn external_account_id(&self) -> &str {
        &self.external_account_id
    }
}
