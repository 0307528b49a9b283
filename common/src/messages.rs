use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::enums::{CurrencyCode, OperationType};
use crate::error::WalletError;
use crate::ids::{CorrelationId, TransactionId, WalletId};

/// Work item published to `wallet.transaction.request` and, on retry,
/// republished to the same topic with `retries` incremented.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletTransactionRequest {
    pub operation: OperationType,
    pub amount: Decimal,
    pub currency: CurrencyCode,
    pub to_currency: Option<CurrencyCode>,
    pub wallet_id: WalletId,
    pub to_wallet_id: Option<WalletId>,
    pub idempotency_key: String,
    pub correlation_id: CorrelationId,
    pub transaction_id: TransactionId,
    pub retries: u32,
}

impl WalletTransactionRequest {
    /// Mirrors the shape-level validation the orchestrator performs before
    /// publishing: `convert` always carries `to_currency`, `transfer` always
    /// carries `to_wallet_id`.
    pub fn validate(&self) -> Result<(), WalletError> {
        match self.operation {
            OperationType::Convert if self.to_currency.is_none() => Err(WalletError::InvalidData(
                "convert work item missing to_currency".into(),
            )),
            OperationType::Transfer if self.to_wallet_id.is_none() => Err(WalletError::InvalidData(
                "transfer work item missing to_wallet_id".into(),
            )),
            _ => Ok(()),
        }
    }

    pub fn with_retry(&self) -> Self {
        Self {
            retries: self.retries + 1,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Success,
    Error,
}

/// Published by the worker to `wallet.transaction.result`, and cached verbatim
/// in the idempotency cache under the idempotency key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletTransactionResult {
    pub status: ResultStatus,
    pub operation: OperationType,
    pub wallet_id: WalletId,
    pub amount: Decimal,
    pub idempotency_key: String,
    pub correlation_id: CorrelationId,
}

/// Normalized form of a provider webhook payload, after signature
/// verification and minor-units-to-decimal conversion. Providers never hand
/// us this shape directly; each `ProviderGateway` impl builds one from its
/// own wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedProviderEvent {
    pub idempotency_key: String,
    pub external_payment_id: String,
    pub amount: Decimal,
    pub currency: CurrencyCode,
    pub status: String,
    pub livemode: bool,
    pub transaction_id: TransactionId,
    pub wallet_id: WalletId,
}
