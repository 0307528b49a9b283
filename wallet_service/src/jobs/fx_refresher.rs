use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use common::enums::CurrencyCode;
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::{error, info, warn};

use crate::domain::repository::CurrencyRepository;

const MAX_ATTEMPTS: u32 = 3;
const BACKOFF: Duration = Duration::from_secs(10);

/// Response shape of the FX source: `rate_to_base` is RUB-denominated, so
/// `rates.USD` is read as "RUB per 1 USD" directly, matching how
/// `common::money::convert` uses it.
#[derive(Deserialize)]
struct FxRatesResponse {
    rates: HashMap<String, serde_json::Value>,
}

/// §4.8: hourly background task spawned the same way as the worker's
/// `RetryFailedTransactionJob`, a `.new()` holding its collaborators and a
/// `.run()` the caller ticks on an interval.
pub struct FxRefresherJob {
    pool: PgPool,
    currencies: Arc<dyn CurrencyRepository>,
    client: reqwest::Client,
    source_url: String,
}

impl FxRefresherJob {
    pub fn new(pool: PgPool, currencies: Arc<dyn CurrencyRepository>, source_url: String) -> Self {
        Self {
            pool,
            currencies,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("reqwest client builds with static config"),
            source_url,
        }
    }

    pub async fn run(&self) {
        for attempt in 1..=MAX_ATTEMPTS {
            match self.refresh_once().await {
                Ok(updated) => {
                    info!("fx refresher updated {updated} currencies");
                    return;
                }
                Err(e) if attempt < MAX_ATTEMPTS => {
                    warn!("fx refresh attempt {attempt} failed: {e}, retrying in {BACKOFF:?}");
                    tokio::time::sleep(BACKOFF).await;
                }
                Err(e) => {
                    error!("fx refresh failed after {MAX_ATTEMPTS} attempts: {e}");
                }
            }
        }
    }

    async fn refresh_once(&self) -> Result<usize, String> {
        let body: FxRatesResponse = self
            .client
            .get(&self.source_url)
            .send()
            .await
            .map_err(|e| e.to_string())?
            .json()
            .await
            .map_err(|e| e.to_string())?;

        let mut tx = self.pool.begin().await.map_err(|e| e.to_string())?;
        let mut updated = 0;

        self.currencies
            .upsert(&mut tx, CurrencyCode::RUB, Decimal::ONE)
            .await
            .map_err(|e| e.to_string())?;
        updated += 1;

        for (code, value) in body.rates {
            let Ok(currency) = CurrencyCode::from_str(&code) else {
                continue;
            };
            if currency == CurrencyCode::RUB {
                continue;
            }
            let Some(rate) = decimal_from_json(&value) else {
                warn!("fx refresher: unreadable rate for {code}, skipping");
                continue;
            };

            self.currencies
                .upsert(&mut tx, currency, rate)
                .await
                .map_err(|e| e.to_string())?;
            updated += 1;
        }

        tx.commit().await.map_err(|e| e.to_string())?;
        Ok(updated)
    }
}

fn decimal_from_json(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        serde_json::Value::String(s) => Decimal::from_str(s).ok(),
        serde_json::Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        _ => None,
    }
}
