use thiserror::Error;

use crate::ids::{UserId, WalletId};

/// Semantic error kinds shared by the orchestrator and the worker. Transport
/// mapping (tonic status codes, HTTP status codes) happens at the RPC
/// boundary, not here; this enum only carries the domain classification.
#[derive(Error, Debug)]
pub enum WalletError {
    #[error("no wallet for user {0}")]
    NoWallet(UserId),

    #[error("wallet {0} not found")]
    WalletNotFound(WalletId),

    #[error("idempotency key already settled: {0}")]
    IdempotentlyDone(String),

    #[error("no linked provider account for user {0}")]
    NoProviderAccount(UserId),

    #[error("insufficient funds in wallet {0}")]
    InsufficientFunds(WalletId),

    #[error("provider liquidity exhausted")]
    ProviderLiquidityExhausted,

    #[error("unsupported gateway or operation: {0}")]
    Unsupported(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("message bus error: {0}")]
    BusError(String),

    #[error("idempotency cache error: {0}")]
    CacheError(String),

    #[error("provider error: {0}")]
    ProviderError(String),

    #[error("invalid data: {0}")]
    InvalidData(String),
}

impl From<sqlx::Error> for WalletError {
    fn from(err: sqlx::Error) -> Self {
        WalletError::StorageError(err.to_string())
    }
}
