use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Wallet account balances are stored with 2 fractional digits.
pub const ACCOUNT_SCALE: u32 = 2;

/// FX rates are stored with 6 fractional digits.
pub const RATE_SCALE: u32 = 6;

/// Intermediate conversion arithmetic keeps at least this many fractional
/// digits before the final round at `ACCOUNT_SCALE`.
pub const CONVERSION_SCALE: u32 = 12;

/// Rounds a monetary amount to account scale using round-half-to-even, the
/// rule `WalletAccount.amount` and `PaymentProviderBalance.available_amount`
/// are persisted under.
pub fn round_to_account_scale(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(ACCOUNT_SCALE, RoundingStrategy::MidpointNearestEven)
}

/// `amount * rate(from) / rate(to)`, computed at wide precision and rounded
/// only at the end, as the worker's convert operation requires.
pub fn convert(amount: Decimal, rate_from: Decimal, rate_to: Decimal) -> Decimal {
    let wide = amount
        .round_dp_with_strategy(CONVERSION_SCALE, RoundingStrategy::MidpointNearestEven)
        * rate_from
        / rate_to;
    round_to_account_scale(wide)
}

/// Minor units (e.g. Stripe cents) to canonical decimal: exact division by 100.
pub fn from_minor_units(minor: i64) -> Decimal {
    Decimal::new(minor, 2)
}

/// Canonical decimal to minor units, for building provider API payloads.
pub fn to_minor_units(amount: Decimal) -> i64 {
    (round_to_account_scale(amount) * Decimal::from(100))
        .round()
        .to_i64()
        .unwrap_or(i64::MAX)
}
