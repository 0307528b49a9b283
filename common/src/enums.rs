use serde::{Deserialize, Serialize};

/// Supported currency codes. `.kind()` tells fiat from crypto, which decides
/// which `WalletAccountType` a balance for that currency lives under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "currency_code", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum CurrencyCode {
    RUB,
    USD,
    EUR,
    BTC,
    ETH,
    USDT,
}

impl CurrencyCode {
    pub fn kind(self) -> WalletAccountType {
        match self {
            CurrencyCode::BTC | CurrencyCode::ETH | CurrencyCode::USDT => {
                WalletAccountType::Crypto
            }
            CurrencyCode::RUB | CurrencyCode::USD | CurrencyCode::EUR => WalletAccountType::Fiat,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CurrencyCode::RUB => "RUB",
            CurrencyCode::USD => "USD",
            CurrencyCode::EUR => "EUR",
            CurrencyCode::BTC => "BTC",
            CurrencyCode::ETH => "ETH",
            CurrencyCode::USDT => "USDT",
        }
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "RUB" => Ok(CurrencyCode::RUB),
            "USD" => Ok(CurrencyCode::USD),
            "EUR" => Ok(CurrencyCode::EUR),
            "BTC" => Ok(CurrencyCode::BTC),
            "ETH" => Ok(CurrencyCode::ETH),
            "USDT" => Ok(CurrencyCode::USDT),
            other => Err(format!("unrecognized currency code: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "wallet_account_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WalletAccountType {
    Fiat,
    Crypto,
}

/// Kinds of ledger-mutating operations a work item can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "operation_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Deposit,
    Withdraw,
    Transfer,
    Convert,
}

/// `pending → processed → {completed | failed | reversed}`; `cancelled` only from `pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Processed,
    Completed,
    Failed,
    Reversed,
    Cancelled,
}

/// External payment providers. Tagged-variant so gateway dispatch is
/// compile-time exhaustive instead of keyed by a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "provider", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Stripe,
    Cloudpayments,
}

impl Provider {
    /// Each provider settles in a single fixed currency; other currencies that
    /// flow through it are FX-normalized against this one.
    pub fn settlement_currency(self) -> CurrencyCode {
        match self {
            Provider::Stripe => CurrencyCode::USD,
            Provider::Cloudpayments => CurrencyCode::RUB,
        }
    }
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stripe" => Ok(Provider::Stripe),
            "cloudpayments" => Ok(Provider::Cloudpayments),
            other => Err(format!("unrecognized provider: {other}")),
        }
    }
}
