use std::sync::Arc;

use common::enums::{CurrencyCode, Provider};
use common::error::WalletError;
use common::money::convert;
use rust_decimal::Decimal;

use crate::domain::repository::{CurrencyRepository, ProviderBalanceRepository, Tx};

/// §4.5: maintains per-provider available liquidity, FX-normalizing any
/// delta into the provider's fixed settlement currency before applying it.
#[derive(Clone)]
pub struct ProviderBalanceManager {
    balances: Arc<dyn ProviderBalanceRepository>,
    currencies: Arc<dyn CurrencyRepository>,
}

impl ProviderBalanceManager {
    pub fn new(
        balances: Arc<dyn ProviderBalanceRepository>,
        currencies: Arc<dyn CurrencyRepository>,
    ) -> Self {
        Self {
            balances,
            currencies,
        }
    }

    pub async fn change_amount(
        &self,
        tx: &mut Tx<'_>,
        provider: Provider,
        delta: Decimal,
        currency: CurrencyCode,
    ) -> Result<(), WalletError> {
        let mut balance = match self.balances.find_for_update(tx, provider).await? {
            Some(balance) => balance,
            None => self.balances.create(tx, provider).await?,
        };

        let settlement_currency = balance.currency();
        let delta_settlement = if currency == settlement_currency {
            delta
        } else {
            let rate_from = self.rate(tx, currency).await?;
            let rate_to = self.rate(tx, settlement_currency).await?;
            convert(delta, rate_from, rate_to)
        };

        balance.apply_delta(delta_settlement);
        self.balances.save(tx, &balance).await
    }

    async fn rate(&self, tx: &mut Tx<'_>, code: CurrencyCode) -> Result<Decimal, WalletError> {
        self.currencies
            .find(tx, code)
            .await?
            .map(|c| c.rate_to_base())
            .ok_or_else(|| WalletError::InvalidData(format!("no FX rate on file for {code:?}")))
    }
}
